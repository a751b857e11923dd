// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Dropbox sink over the HTTP API v2.
//!
//! Files are uploaded with `mode=overwrite`; the returned reference is a
//! shared link rewritten to serve the raw file.

use crate::services::logging::redact_secret;
use crate::services::upload::{normalize_destination, UploadError, Uploader};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::time::Duration;

const DEFAULT_API_URL: &str = "https://api.dropboxapi.com";
const DEFAULT_CONTENT_URL: &str = "https://content.dropboxapi.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Configuration for the Dropbox sink
#[derive(Clone)]
pub struct DropboxConfig {
    pub access_token: String,
    /// Folder every destination is placed under, e.g. "/Share/SME"
    pub base_path: String,
    pub api_url: String,
    pub content_url: String,
}

impl std::fmt::Debug for DropboxConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DropboxConfig")
            .field("access_token", &redact_secret(&self.access_token))
            .field("base_path", &self.base_path)
            .field("api_url", &self.api_url)
            .field("content_url", &self.content_url)
            .finish()
    }
}

impl DropboxConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let access_token = std::env::var("DROPBOX_ACCESS_TOKEN")
            .map_err(|_| anyhow!("DROPBOX_ACCESS_TOKEN environment variable not set"))?;
        let base_path = std::env::var("DROPBOX_BASE_PATH").unwrap_or_default();

        Ok(Self {
            access_token,
            base_path,
            api_url: DEFAULT_API_URL.to_string(),
            content_url: DEFAULT_CONTENT_URL.to_string(),
        })
    }

    /// Absolute Dropbox path for a logical destination
    pub fn dropbox_path(&self, destination: &str) -> String {
        format!(
            "/{}",
            normalize_destination(&format!("{}/{}", self.base_path, destination))
        )
    }
}

#[derive(Debug, Deserialize)]
struct SharedLink {
    url: String,
}

#[derive(Debug, Deserialize)]
struct SharedLinkList {
    links: Vec<SharedLink>,
}

/// Dropbox upload client, constructed per invocation
pub struct DropboxUploader {
    client: Client,
    config: DropboxConfig,
}

impl DropboxUploader {
    pub fn new(config: DropboxConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| anyhow!("Failed to build Dropbox client: {}", e))?;

        Ok(Self { client, config })
    }

    async fn put_file(&self, dropbox_path: &str, data: Vec<u8>) -> Result<(), UploadError> {
        let arg = json!({ "path": dropbox_path, "mode": "overwrite", "mute": true });

        let response = self
            .client
            .post(format!("{}/2/files/upload", self.config.content_url))
            .bearer_auth(&self.config.access_token)
            .header("Dropbox-API-Arg", header_safe_json(&arg))
            .header("Content-Type", "application/octet-stream")
            .body(data)
            .send()
            .await
            .map_err(|e| {
                UploadError::Backend(format!("Dropbox upload request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::Backend(format!(
                "Dropbox upload of {} returned {}: {}",
                dropbox_path, status, body
            )));
        }
        Ok(())
    }

    /// Create a shared link, or reuse the existing one
    async fn shared_link(&self, dropbox_path: &str) -> Result<String, UploadError> {
        let response = self
            .api_call(
                "sharing/create_shared_link_with_settings",
                json!({ "path": dropbox_path }),
            )
            .await?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            UploadError::Backend(format!("Failed to read Dropbox response: {}", e))
        })?;

        if status.is_success() {
            let link: SharedLink = parse_json(&body)?;
            return Ok(link.url);
        }

        let already_exists = status.as_u16() == 409
            && String::from_utf8_lossy(&body).contains("shared_link_already_exists");
        if already_exists {
            return self.existing_shared_link(dropbox_path).await;
        }

        Err(UploadError::Backend(format!(
            "Dropbox shared link for {} returned {}: {}",
            dropbox_path,
            status,
            String::from_utf8_lossy(&body)
        )))
    }

    async fn existing_shared_link(&self, dropbox_path: &str) -> Result<String, UploadError> {
        let response = self
            .api_call(
                "sharing/list_shared_links",
                json!({ "path": dropbox_path, "direct_only": true }),
            )
            .await?;

        if !response.status().is_success() {
            return Err(UploadError::Backend(format!(
                "Dropbox list_shared_links for {} returned {}",
                dropbox_path,
                response.status()
            )));
        }

        let body = response.bytes().await.map_err(|e| {
            UploadError::Backend(format!("Failed to read Dropbox response: {}", e))
        })?;
        let list: SharedLinkList = parse_json(&body)?;

        list.links
            .into_iter()
            .next()
            .map(|link| link.url)
            .ok_or_else(|| {
                UploadError::Backend(format!("No shared link exists for {}", dropbox_path))
            })
    }

    async fn api_call(
        &self,
        endpoint: &str,
        body: serde_json::Value,
    ) -> Result<reqwest::Response, UploadError> {
        self.client
            .post(format!("{}/2/{}", self.config.api_url, endpoint))
            .bearer_auth(&self.config.access_token)
            .header("Content-Type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| {
                UploadError::Backend(format!("Dropbox {} request failed: {}", endpoint, e))
            })
    }
}

#[async_trait]
impl Uploader for DropboxUploader {
    async fn upload(&self, local_path: &Path, destination: &str) -> Result<String, UploadError> {
        let dropbox_path = self.config.dropbox_path(destination);
        if dropbox_path == "/" {
            return Err(UploadError::InvalidDestination(destination.to_string()));
        }

        let data = tokio::fs::read(local_path)
            .await
            .map_err(|e| UploadError::Read {
                path: local_path.display().to_string(),
                source: e,
            })?;

        self.put_file(&dropbox_path, data).await?;
        let link = self.shared_link(&dropbox_path).await?;
        Ok(raw_link(&link))
    }

    fn name(&self) -> &'static str {
        "dropbox"
    }
}

/// Rewrite a shared link so it serves the file itself instead of a preview page
pub fn raw_link(url: &str) -> String {
    url.replace("?dl=0", "?raw=1").replace("&dl=0", "&raw=1")
}

/// JSON for the Dropbox-API-Arg header, which must be plain ASCII
fn header_safe_json(value: &serde_json::Value) -> String {
    let mut out = String::new();
    for c in value.to_string().chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    out
}

fn parse_json<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, UploadError> {
    serde_json::from_slice(body)
        .map_err(|e| UploadError::Backend(format!("Unexpected Dropbox response: {}", e)))
}
