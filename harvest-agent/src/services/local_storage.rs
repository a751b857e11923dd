// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use crate::services::upload::{normalize_destination, UploadError, Uploader};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use url::Url;

/// Configuration for the filesystem sink
#[derive(Debug, Clone)]
pub struct LocalConfig {
    /// Directory destinations are resolved under; may be a mounted shared folder
    pub root: PathBuf,
}

impl LocalConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let root = std::env::var("LOCAL_STORAGE_ROOT")
            .unwrap_or_else(|_| "./harvest-output".to_string());
        Self {
            root: PathBuf::from(root),
        }
    }
}

/// Copies files into a directory tree, replacing existing files
pub struct LocalFsUploader {
    root: PathBuf,
}

impl LocalFsUploader {
    pub fn new(config: LocalConfig) -> Self {
        Self { root: config.root }
    }

    fn target_path(&self, destination: &str) -> Result<PathBuf, UploadError> {
        let normalized = normalize_destination(destination);
        if normalized.is_empty()
            || normalized
                .split('/')
                .any(|segment| segment == "." || segment == "..")
        {
            return Err(UploadError::InvalidDestination(destination.to_string()));
        }
        Ok(self.root.join(normalized))
    }
}

#[async_trait]
impl Uploader for LocalFsUploader {
    async fn upload(&self, local_path: &Path, destination: &str) -> Result<String, UploadError> {
        let target = self.target_path(destination)?;

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                UploadError::Backend(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        tokio::fs::copy(local_path, &target)
            .await
            .map_err(|e| UploadError::Read {
                path: local_path.display().to_string(),
                source: e,
            })?;

        let absolute = tokio::fs::canonicalize(&target).await.unwrap_or(target);
        Ok(Url::from_file_path(&absolute)
            .map(String::from)
            .unwrap_or_else(|_| absolute.display().to_string()))
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uploader(root: &Path) -> LocalFsUploader {
        LocalFsUploader::new(LocalConfig {
            root: root.to_path_buf(),
        })
    }

    #[tokio::test]
    async fn test_upload_copies_file_under_root() {
        let source_dir = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let source = source_dir.path().join("a.png");
        std::fs::write(&source, b"png-bytes").unwrap();

        let reference = uploader(root.path())
            .upload(&source, "/site//images/a.png")
            .await
            .unwrap();

        let copied = root.path().join("site/images/a.png");
        assert_eq!(std::fs::read(&copied).unwrap(), b"png-bytes");
        assert!(reference.starts_with("file://"));
        assert!(reference.ends_with("site/images/a.png"));
    }

    #[tokio::test]
    async fn test_upload_overwrites_existing_file() {
        let source_dir = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let source = source_dir.path().join("a.png");
        let uploader = uploader(root.path());

        std::fs::write(&source, b"first").unwrap();
        uploader.upload(&source, "site/a.png").await.unwrap();
        std::fs::write(&source, b"second").unwrap();
        uploader.upload(&source, "site/a.png").await.unwrap();

        assert_eq!(
            std::fs::read(root.path().join("site/a.png")).unwrap(),
            b"second"
        );
    }

    #[tokio::test]
    async fn test_upload_rejects_parent_traversal() {
        let root = tempfile::tempdir().unwrap();
        let result = uploader(root.path())
            .upload(Path::new("/nonexistent"), "site/../../etc/passwd")
            .await;

        assert!(matches!(result, Err(UploadError::InvalidDestination(_))));
    }

    #[tokio::test]
    async fn test_upload_missing_source_fails() {
        let root = tempfile::tempdir().unwrap();
        let result = uploader(root.path())
            .upload(Path::new("/nonexistent/a.png"), "site/a.png")
            .await;

        assert!(matches!(result, Err(UploadError::Read { .. })));
    }
}
