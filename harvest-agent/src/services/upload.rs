// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Upload collaborator seam and the upload phase that drives it.
//!
//! Backends live in their own modules (`local_storage`, `storage`, `dropbox`)
//! and are chosen from configuration by [`build_uploader`].

use crate::models::crawler::DownloadedImage;
use crate::models::harvest::UploadReport;
use crate::models::storage::StorageBackend;
use crate::services::dropbox::{DropboxConfig, DropboxUploader};
use crate::services::local_storage::{LocalConfig, LocalFsUploader};
use crate::services::storage::{S3Config, S3Uploader};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;

/// File name of the metadata log, locally and at the destination
pub const METADATA_FILE_NAME: &str = "image_metadata.csv";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid destination path: {0}")]
    InvalidDestination(String),
    #[error("storage backend rejected upload: {0}")]
    Backend(String),
}

/// Places a local file at a logical destination path and returns a reference to it.
///
/// Implementations overwrite whatever already exists at the destination, so
/// re-running a harvest into the same folder replaces earlier content.
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, local_path: &Path, destination: &str) -> Result<String, UploadError>;

    /// Backend name used in logs
    fn name(&self) -> &'static str;
}

/// Collapse duplicate slashes and drop leading/trailing ones
pub fn normalize_destination(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Destination of a downloaded image under the caller's folder
pub fn image_destination(folder: &str, image_name: &str) -> String {
    normalize_destination(&format!("{}/images/{}", folder, image_name))
}

/// Destination of the metadata log under the caller's folder
pub fn metadata_destination(folder: &str) -> String {
    normalize_destination(&format!("{}/{}", folder, METADATA_FILE_NAME))
}

/// Backend configuration selected by STORAGE_BACKEND
#[derive(Debug, Clone)]
pub enum StorageConfig {
    Local(LocalConfig),
    S3(S3Config),
    Dropbox(DropboxConfig),
}

impl StorageConfig {
    /// Load the configured backend's settings from environment variables
    pub fn from_env() -> Result<Self> {
        let value = std::env::var("STORAGE_BACKEND").unwrap_or_else(|_| "local".to_string());
        let backend = StorageBackend::parse(&value).ok_or_else(|| {
            anyhow!(
                "STORAGE_BACKEND must be 'local', 's3' or 'dropbox', got: {}",
                value
            )
        })?;

        Ok(match backend {
            StorageBackend::Local => StorageConfig::Local(LocalConfig::from_env()),
            StorageBackend::S3 => StorageConfig::S3(S3Config::from_env()?),
            StorageBackend::Dropbox => StorageConfig::Dropbox(DropboxConfig::from_env()?),
        })
    }

    pub fn backend(&self) -> StorageBackend {
        match self {
            StorageConfig::Local(_) => StorageBackend::Local,
            StorageConfig::S3(_) => StorageBackend::S3,
            StorageConfig::Dropbox(_) => StorageBackend::Dropbox,
        }
    }
}

/// Construct a fresh upload collaborator for one invocation
pub async fn build_uploader(config: &StorageConfig) -> Result<Arc<dyn Uploader>> {
    Ok(match config {
        StorageConfig::Local(local) => Arc::new(LocalFsUploader::new(local.clone())),
        StorageConfig::S3(s3) => Arc::new(S3Uploader::new(s3.clone()).await?),
        StorageConfig::Dropbox(dropbox) => Arc::new(DropboxUploader::new(dropbox.clone())?),
    })
}

/// Upload every downloaded image under `folder`, one at a time.
/// A failed upload is logged and counted; the rest of the batch continues.
pub async fn upload_images(
    uploader: Arc<dyn Uploader>,
    images: Vec<DownloadedImage>,
    folder: String,
) -> UploadReport {
    let mut report = UploadReport::default();

    for image in images {
        let destination = image_destination(&folder, &image.image_name);
        match uploader.upload(&image.local_path, &destination).await {
            Ok(reference) => {
                tracing::info!(
                    backend = uploader.name(),
                    destination = %destination,
                    reference = %reference,
                    "Uploaded image"
                );
                report.uploaded += 1;
            }
            Err(e) => {
                tracing::warn!(
                    backend = uploader.name(),
                    destination = %destination,
                    error = %e,
                    "Image upload failed"
                );
                report.failed += 1;
            }
        }
    }

    report
}

/// Run [`upload_images`] on a worker task; the handle resolves to its report
pub fn spawn_image_uploads(
    uploader: Arc<dyn Uploader>,
    images: Vec<DownloadedImage>,
    folder: String,
) -> JoinHandle<UploadReport> {
    tokio::spawn(upload_images(uploader, images, folder))
}
