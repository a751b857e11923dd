// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use serde::{Deserialize, Serialize};

/// Raw `<img>` reference as it appears in the page markup, not yet resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub src: String,
    /// Empty when the tag has no `alt` attribute
    pub alt: String,
}

/// Raw `<a href>` reference as it appears in the page markup, not yet resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRef {
    pub href: String,
}

/// Why an image was recorded without being fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// URL matched an entry of the configured denylist
    Denylisted,
    /// An image with the same `image_name` was already downloaded this run
    DuplicateName,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Denylisted => write!(f, "denylisted"),
            SkipReason::DuplicateName => write!(f, "duplicate_name"),
        }
    }
}

/// Outcome of the download attempt for one image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    Downloaded,
    /// Download was attempted and failed; carries the fetch error text
    Failed(String),
    Skipped(SkipReason),
}

impl std::fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DownloadStatus::Downloaded => write!(f, "downloaded"),
            DownloadStatus::Failed(cause) => write!(f, "failed ({})", cause),
            DownloadStatus::Skipped(reason) => write!(f, "skipped ({})", reason),
        }
    }
}

/// One row of the metadata log: an image reference discovered on a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Page on which the `<img>` tag was found
    pub page_url: String,
    /// Absolute image URL after proxy unwrapping
    pub image_url: String,
    /// Final path segment of `image_url`, query stripped
    pub image_name: String,
    pub alt_text: String,
    pub download_status: DownloadStatus,
    /// Reference returned by the upload collaborator, when the image was uploaded inline
    pub sink_reference: Option<String>,
}

impl ImageRecord {
    pub fn alt_text_present(&self) -> bool {
        !self.alt_text.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(alt: &str) -> ImageRecord {
        ImageRecord {
            page_url: "https://x.com/".to_string(),
            image_url: "https://x.com/a.png".to_string(),
            image_name: "a.png".to_string(),
            alt_text: alt.to_string(),
            download_status: DownloadStatus::Downloaded,
            sink_reference: None,
        }
    }

    #[test]
    fn test_alt_text_present_follows_alt_text() {
        assert!(record("A cat").alt_text_present());
        assert!(!record("").alt_text_present());
    }

    #[test]
    fn test_download_status_display() {
        assert_eq!(DownloadStatus::Downloaded.to_string(), "downloaded");
        assert_eq!(
            DownloadStatus::Failed("HTTP status 404".to_string()).to_string(),
            "failed (HTTP status 404)"
        );
        assert_eq!(
            DownloadStatus::Skipped(SkipReason::DuplicateName).to_string(),
            "skipped (duplicate_name)"
        );
    }
}
