// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use crate::models::storage::content_type_for;
use crate::services::logging::redact_secret;
use crate::services::upload::{normalize_destination, UploadError, Uploader};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use s3::creds::Credentials;
use s3::Bucket;
use s3::Region;
use std::path::Path;

/// Configuration for S3-compatible storage
#[derive(Clone)]
pub struct S3Config {
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    /// Key prefix every destination is placed under
    pub prefix: String,
}

impl std::fmt::Debug for S3Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Config")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("access_key", &self.access_key)
            .field("secret_key", &redact_secret(&self.secret_key))
            .field("prefix", &self.prefix)
            .finish()
    }
}

impl S3Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let endpoint = std::env::var("S3_ENDPOINT")
            .map_err(|_| anyhow!("S3_ENDPOINT environment variable not set"))?;
        let bucket = std::env::var("S3_BUCKET")
            .map_err(|_| anyhow!("S3_BUCKET environment variable not set"))?;
        let access_key = std::env::var("S3_ACCESS_KEY")
            .map_err(|_| anyhow!("S3_ACCESS_KEY environment variable not set"))?;
        let secret_key = std::env::var("S3_SECRET_KEY")
            .map_err(|_| anyhow!("S3_SECRET_KEY environment variable not set"))?;

        let region = std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string());
        let prefix = std::env::var("S3_PREFIX").unwrap_or_default();

        Ok(Self {
            endpoint,
            region,
            bucket,
            access_key,
            secret_key,
            prefix,
        })
    }

    /// Object key for a logical destination
    pub fn object_key(&self, destination: &str) -> String {
        normalize_destination(&format!("{}/{}", self.prefix, destination))
    }

    /// Path-style URL of an object
    pub fn object_url(&self, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.endpoint.trim_end_matches('/'),
            self.bucket,
            key
        )
    }
}

/// S3-compatible object store sink; puts replace existing objects
pub struct S3Uploader {
    bucket: Box<Bucket>,
    config: S3Config,
}

impl S3Uploader {
    /// Create a new S3 upload client
    pub async fn new(config: S3Config) -> Result<Self> {
        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };

        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| anyhow!("Failed to create S3 credentials: {}", e))?;

        let bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| anyhow!("Failed to create S3 bucket: {}", e))?
            .with_path_style();

        tracing::info!(bucket = %config.bucket, endpoint = %config.endpoint, "Using S3 storage");

        Ok(Self { bucket, config })
    }
}

#[async_trait]
impl Uploader for S3Uploader {
    async fn upload(&self, local_path: &Path, destination: &str) -> Result<String, UploadError> {
        let key = self.config.object_key(destination);
        if key.is_empty() {
            return Err(UploadError::InvalidDestination(destination.to_string()));
        }

        let data = tokio::fs::read(local_path)
            .await
            .map_err(|e| UploadError::Read {
                path: local_path.display().to_string(),
                source: e,
            })?;

        let response = self
            .bucket
            .put_object_with_content_type(&key, &data, content_type_for(&key))
            .await
            .map_err(|e| UploadError::Backend(format!("Failed to upload to S3: {}", e)))?;

        let status = response.status_code();
        if !(200..300).contains(&status) {
            return Err(UploadError::Backend(format!(
                "S3 put of {} returned status {}",
                key, status
            )));
        }

        tracing::debug!(key = %key, bytes = data.len(), "Uploaded object to S3");
        Ok(self.config.object_url(&key))
    }

    fn name(&self) -> &'static str {
        "s3"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(prefix: &str) -> S3Config {
        S3Config {
            endpoint: "http://localhost:9000/".to_string(),
            region: "us-east-1".to_string(),
            bucket: "harvest".to_string(),
            access_key: "minioadmin".to_string(),
            secret_key: "minio-secret".to_string(),
            prefix: prefix.to_string(),
        }
    }

    #[test]
    fn test_object_key_without_prefix() {
        assert_eq!(
            config("").object_key("/site/images/a.png"),
            "site/images/a.png"
        );
    }

    #[test]
    fn test_object_key_with_prefix() {
        assert_eq!(
            config("exports/").object_key("site/image_metadata.csv"),
            "exports/site/image_metadata.csv"
        );
    }

    #[test]
    fn test_object_url_is_path_style() {
        assert_eq!(
            config("").object_url("site/images/a.png"),
            "http://localhost:9000/harvest/site/images/a.png"
        );
    }

    #[test]
    fn test_debug_redacts_secret_key() {
        let rendered = format!("{:?}", config(""));
        assert!(!rendered.contains("minio-secret"));
        assert!(rendered.contains("minioadmin"));
    }

    #[tokio::test]
    #[ignore] // Requires MinIO running
    async fn test_upload_to_minio() {
        let config = S3Config::from_env().unwrap();
        let uploader = S3Uploader::new(config).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        std::fs::write(&path, b"png-bytes").unwrap();

        let reference = uploader.upload(&path, "harvest-test/images/a.png").await.unwrap();
        assert!(reference.ends_with("harvest-test/images/a.png"));
    }
}
