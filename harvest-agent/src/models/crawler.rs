// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Which links discovered on a page may enter the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPolicy {
    /// Same host as the seed URL
    SameHost,
    /// Same host, and the link must start with the seed URL
    PathPrefix,
}

impl BoundaryPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "same_host" => Some(BoundaryPolicy::SameHost),
            "path_prefix" => Some(BoundaryPolicy::PathPrefix),
            _ => None,
        }
    }
}

impl std::fmt::Display for BoundaryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoundaryPolicy::SameHost => write!(f, "same_host"),
            BoundaryPolicy::PathPrefix => write!(f, "path_prefix"),
        }
    }
}

/// Configuration for a single crawl invocation
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Absolute URL the crawl starts from
    pub seed_url: String,
    /// Directory the downloaded image bytes are written into
    pub image_dir: PathBuf,
    pub max_pages: usize,
    /// Maximum number of image download attempts
    pub max_images: usize,
    /// Pending frontier entries beyond this are dropped
    pub max_queue: usize,
    pub page_timeout: Duration,
    pub image_timeout: Duration,
    /// Fixed delay between page fetches
    pub delay: Duration,
    pub boundary: BoundaryPolicy,
    /// Case-insensitive substrings; matching image URLs are recorded as skipped
    pub denylist: Vec<String>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            seed_url: String::new(),
            image_dir: PathBuf::from("images"),
            max_pages: 100,
            max_images: 500,
            max_queue: 10_000,
            page_timeout: Duration::from_secs(20),
            image_timeout: Duration::from_secs(20),
            delay: Duration::ZERO,
            boundary: BoundaryPolicy::PathPrefix,
            denylist: Vec::new(),
        }
    }
}

/// Lifecycle of a crawl engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlState {
    Idle,
    Running,
    /// Frontier exhausted
    Completed,
    /// `max_pages` or `max_images` cut the crawl short; results may be partial
    LimitReached,
    /// Stopped by the caller's cancellation signal
    Cancelled,
    /// Continuing was impossible, e.g. the working directory could not be created
    FatalError,
}

impl CrawlState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CrawlState::Idle | CrawlState::Running)
    }
}

impl std::fmt::Display for CrawlState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CrawlState::Idle => write!(f, "idle"),
            CrawlState::Running => write!(f, "running"),
            CrawlState::Completed => write!(f, "completed"),
            CrawlState::LimitReached => write!(f, "limit_reached"),
            CrawlState::Cancelled => write!(f, "cancelled"),
            CrawlState::FatalError => write!(f, "fatal_error"),
        }
    }
}

/// Counters collected during a crawl
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlStats {
    pub pages_visited: usize,
    pub pages_failed: usize,
    /// Number of metadata records written
    pub images_found: usize,
    pub images_downloaded: usize,
    pub images_failed: usize,
    pub images_skipped: usize,
    pub images_uploaded: usize,
    pub upload_failures: usize,
}

/// A file written to the working directory during the crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedImage {
    pub image_name: String,
    pub local_path: PathBuf,
}

/// What a finished crawl hands back to its caller
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub state: CrawlState,
    pub stats: CrawlStats,
    /// Downloaded files in download order
    pub downloaded: Vec<DownloadedImage>,
    /// Cause of a `FatalError`
    pub error: Option<String>,
}
