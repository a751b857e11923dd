// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! One harvest invocation: validate, crawl into a private working
//! directory, then publish the images and the metadata log.

use crate::models::crawler::{CrawlState, CrawlStats, DownloadedImage};
use crate::models::harvest::{HarvestRequest, HarvestSummary, UploadReport};
use crate::models::settings::{HarvestSettings, UploadMode};
use crate::services::engine::CrawlEngine;
use crate::services::fetcher::{FetchError, Fetcher};
use crate::services::frontier::normalize_page_url;
use crate::services::metadata::{CsvMetadataSink, MetadataSink, SinkError};
use crate::services::upload::{
    metadata_destination, normalize_destination, spawn_image_uploads, Uploader,
    METADATA_FILE_NAME,
};
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("failed to prepare working directory: {0}")]
    Workspace(#[from] std::io::Error),
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error("failed to create HTTP client: {0}")]
    Client(#[from] FetchError),
}

/// Check a request before any network activity.
/// Returns the normalized seed URL and destination folder.
pub fn validate_request(request: &HarvestRequest) -> Result<(String, String), HarvestError> {
    let seed = request.seed_url.trim();
    if seed.is_empty() {
        return Err(HarvestError::InvalidRequest(
            "Please provide a seed URL".to_string(),
        ));
    }
    let seed_url = normalize_page_url(seed).ok_or_else(|| {
        HarvestError::InvalidRequest(format!(
            "Seed URL must be an absolute http(s) URL, got: {}",
            seed
        ))
    })?;

    let folder = normalize_destination(request.destination_folder.trim());
    if folder.is_empty() {
        return Err(HarvestError::InvalidRequest(
            "Please provide a destination folder".to_string(),
        ));
    }
    if folder.split('/').any(|segment| segment == "." || segment == "..") {
        return Err(HarvestError::InvalidRequest(format!(
            "Destination folder must not contain '.' or '..' segments: {}",
            request.destination_folder
        )));
    }

    Ok((seed_url, folder))
}

/// Crawl `request.seed_url` and upload what was found under
/// `request.destination_folder`.
///
/// Individual page, image and upload failures are counted in the summary and
/// never turn into an `Err`. Errors are reserved for invalid input and for a
/// working directory or metadata log that cannot be created.
pub async fn run_harvest(
    request: &HarvestRequest,
    settings: &HarvestSettings,
    uploader: Arc<dyn Uploader>,
    cancel: CancellationToken,
) -> Result<HarvestSummary, HarvestError> {
    let (seed_url, folder) = validate_request(request)?;
    let run_id = Uuid::now_v7();
    let started_at = Utc::now();

    tracing::info!(
        run_id = %run_id,
        seed = %seed_url,
        folder = %folder,
        backend = uploader.name(),
        upload_mode = %settings.upload_mode,
        "Starting harvest"
    );

    let workspace = tempfile::Builder::new().prefix("harvest-").tempdir()?;
    let metadata_path = workspace.path().join(METADATA_FILE_NAME);
    let inline = settings.upload_mode == UploadMode::Inline;
    let mut sink = CsvMetadataSink::create(&metadata_path, inline)?;

    let fetcher = Fetcher::new(&settings.user_agent, settings.max_body_bytes)?;
    let config = settings.crawl_config(&seed_url, workspace.path().join("images"));
    let mut engine = CrawlEngine::new(config, fetcher);
    if inline {
        engine = engine.with_inline_upload(Arc::clone(&uploader), &folder);
    }

    let outcome = engine.run(&mut sink, &cancel).await;
    let handle = sink.finalize()?;
    tracing::debug!(rows = handle.rows, "Metadata log finalized");

    let mut stats = outcome.stats;
    let mut metadata_reference = None;
    if outcome.state != CrawlState::FatalError {
        if !inline {
            let report = deferred_upload(&uploader, outcome.downloaded, &folder).await;
            stats.images_uploaded += report.uploaded;
            stats.upload_failures += report.failed;
        }
        metadata_reference = upload_metadata(&uploader, &metadata_path, &folder, &mut stats).await;
    }

    let mut message = HarvestSummary::describe(outcome.state, &stats);
    if let Some(error) = &outcome.error {
        message.push(' ');
        message.push_str(error);
    }

    tracing::info!(run_id = %run_id, state = %outcome.state, "{}", message);

    Ok(HarvestSummary {
        run_id,
        seed_url,
        destination_folder: folder,
        state: outcome.state,
        stats,
        metadata_reference,
        started_at,
        finished_at: Utc::now(),
        message,
    })
}

/// Hand the downloaded files to a worker task and wait for its report
async fn deferred_upload(
    uploader: &Arc<dyn Uploader>,
    downloaded: Vec<DownloadedImage>,
    folder: &str,
) -> UploadReport {
    let count = downloaded.len();
    let task = spawn_image_uploads(Arc::clone(uploader), downloaded, folder.to_string());

    match task.await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(error = %e, "Upload task did not complete");
            UploadReport {
                failed: count,
                ..UploadReport::default()
            }
        }
    }
}

async fn upload_metadata(
    uploader: &Arc<dyn Uploader>,
    metadata_path: &Path,
    folder: &str,
    stats: &mut CrawlStats,
) -> Option<String> {
    let destination = metadata_destination(folder);

    match uploader.upload(metadata_path, &destination).await {
        Ok(reference) => {
            tracing::info!(destination = %destination, "Uploaded metadata log");
            Some(reference)
        }
        Err(e) => {
            tracing::warn!(destination = %destination, error = %e, "Metadata log upload failed");
            stats.upload_failures += 1;
            None
        }
    }
}
