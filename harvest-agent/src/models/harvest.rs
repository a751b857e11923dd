// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use crate::models::crawler::{CrawlState, CrawlStats};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to crawl a site and publish its images
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarvestRequest {
    #[serde(default)]
    pub seed_url: String,
    /// Logical folder the images and metadata log are uploaded under
    #[serde(default)]
    pub destination_folder: String,
}

/// Result of the upload phase
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReport {
    pub uploaded: usize,
    pub failed: usize,
}

/// Human-readable and machine-readable summary of one harvest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestSummary {
    pub run_id: Uuid,
    pub seed_url: String,
    pub destination_folder: String,
    pub state: CrawlState,
    pub stats: CrawlStats,
    /// Reference to the uploaded metadata log, if its upload succeeded
    pub metadata_reference: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub message: String,
}

impl HarvestSummary {
    /// Render the one-paragraph message shown to the user
    pub fn describe(state: CrawlState, stats: &CrawlStats) -> String {
        let headline = match state {
            CrawlState::Completed => "Crawl completed",
            CrawlState::LimitReached => "Crawl stopped at its page or image limit",
            CrawlState::Cancelled => "Crawl cancelled",
            CrawlState::FatalError => "Crawl aborted",
            CrawlState::Idle | CrawlState::Running => "Crawl did not finish",
        };

        let mut message = format!(
            "{}: visited {} pages, found {} images, downloaded {}, uploaded {}.",
            headline,
            stats.pages_visited,
            stats.images_found,
            stats.images_downloaded,
            stats.images_uploaded
        );

        if stats.upload_failures > 0 {
            message.push_str(&format!(" {} uploads failed.", stats.upload_failures));
        }
        if matches!(state, CrawlState::LimitReached | CrawlState::Cancelled) {
            message.push_str(" Results may be partial.");
        }
        message
    }
}
