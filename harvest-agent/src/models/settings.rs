// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use crate::models::crawler::{BoundaryPolicy, CrawlConfig};
use anyhow::{anyhow, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// When downloaded images are handed to the upload collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMode {
    /// Upload after the crawl finishes, on a separate worker task
    Deferred,
    /// Upload each image right after it is downloaded; the metadata log
    /// carries the returned reference
    Inline,
}

impl UploadMode {
    pub fn parse(mode: &str) -> Option<Self> {
        match mode {
            "deferred" => Some(UploadMode::Deferred),
            "inline" => Some(UploadMode::Inline),
            _ => None,
        }
    }
}

impl std::fmt::Display for UploadMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadMode::Deferred => write!(f, "deferred"),
            UploadMode::Inline => write!(f, "inline"),
        }
    }
}

/// Process-wide crawl settings, loaded once and copied into each invocation
#[derive(Debug, Clone)]
pub struct HarvestSettings {
    pub max_pages: usize,
    pub max_images: usize,
    pub max_queue: usize,
    pub page_timeout: Duration,
    pub image_timeout: Duration,
    pub max_body_bytes: usize,
    pub crawl_delay: Duration,
    pub denylist: Vec<String>,
    pub boundary: BoundaryPolicy,
    pub upload_mode: UploadMode,
    pub user_agent: String,
}

impl Default for HarvestSettings {
    fn default() -> Self {
        let crawl = CrawlConfig::default();
        Self {
            max_pages: crawl.max_pages,
            max_images: crawl.max_images,
            max_queue: crawl.max_queue,
            page_timeout: crawl.page_timeout,
            image_timeout: crawl.image_timeout,
            max_body_bytes: 20 * 1024 * 1024,
            crawl_delay: crawl.delay,
            denylist: crawl.denylist,
            boundary: crawl.boundary,
            upload_mode: UploadMode::Deferred,
            user_agent: format!("ImageHarvester/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HarvestSettings {
    /// Load settings from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let boundary = match std::env::var("HARVEST_BOUNDARY") {
            Ok(value) => BoundaryPolicy::parse(&value).ok_or_else(|| {
                anyhow!(
                    "HARVEST_BOUNDARY must be 'path_prefix' or 'same_host', got: {}",
                    value
                )
            })?,
            Err(_) => defaults.boundary,
        };

        let upload_mode = match std::env::var("HARVEST_UPLOAD_MODE") {
            Ok(value) => UploadMode::parse(&value).ok_or_else(|| {
                anyhow!(
                    "HARVEST_UPLOAD_MODE must be 'deferred' or 'inline', got: {}",
                    value
                )
            })?,
            Err(_) => defaults.upload_mode,
        };

        let denylist = std::env::var("HARVEST_IMAGE_DENYLIST")
            .map(|value| parse_denylist(&value))
            .unwrap_or(defaults.denylist);

        Ok(Self {
            max_pages: env_or("HARVEST_MAX_PAGES", defaults.max_pages)?,
            max_images: env_or("HARVEST_MAX_IMAGES", defaults.max_images)?,
            max_queue: env_or("HARVEST_MAX_QUEUE", defaults.max_queue)?,
            page_timeout: Duration::from_secs(env_or(
                "HARVEST_PAGE_TIMEOUT_SECS",
                defaults.page_timeout.as_secs(),
            )?),
            image_timeout: Duration::from_secs(env_or(
                "HARVEST_IMAGE_TIMEOUT_SECS",
                defaults.image_timeout.as_secs(),
            )?),
            max_body_bytes: env_or("HARVEST_MAX_BODY_BYTES", defaults.max_body_bytes)?,
            crawl_delay: Duration::from_millis(env_or(
                "HARVEST_CRAWL_DELAY_MS",
                defaults.crawl_delay.as_millis() as u64,
            )?),
            denylist,
            boundary,
            upload_mode,
            user_agent: std::env::var("USER_AGENT").unwrap_or(defaults.user_agent),
        })
    }

    /// Build the per-invocation crawl configuration
    pub fn crawl_config(&self, seed_url: &str, image_dir: PathBuf) -> CrawlConfig {
        CrawlConfig {
            seed_url: seed_url.to_string(),
            image_dir,
            max_pages: self.max_pages,
            max_images: self.max_images,
            max_queue: self.max_queue,
            page_timeout: self.page_timeout,
            image_timeout: self.image_timeout,
            delay: self.crawl_delay,
            boundary: self.boundary,
            denylist: self.denylist.clone(),
        }
    }
}

/// Split a comma-separated denylist, dropping blanks and lowercasing entries
pub fn parse_denylist(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn env_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|e| anyhow!("{} has an invalid value '{}': {}", name, value, e)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_mode_parse() {
        assert_eq!(UploadMode::parse("deferred"), Some(UploadMode::Deferred));
        assert_eq!(UploadMode::parse("inline"), Some(UploadMode::Inline));
        assert_eq!(UploadMode::parse("background"), None);
    }

    #[test]
    fn test_upload_mode_display() {
        assert_eq!(UploadMode::Deferred.to_string(), "deferred");
        assert_eq!(UploadMode::Inline.to_string(), "inline");
    }

    #[test]
    fn test_parse_denylist_trims_and_lowercases() {
        assert_eq!(
            parse_denylist(" Logo, icon ,,AVATAR "),
            vec!["logo".to_string(), "icon".to_string(), "avatar".to_string()]
        );
    }

    #[test]
    fn test_parse_denylist_empty() {
        assert!(parse_denylist("").is_empty());
        assert!(parse_denylist(" , ").is_empty());
    }

    #[test]
    fn test_defaults_bound_every_network_call() {
        let settings = HarvestSettings::default();
        assert!(settings.page_timeout > Duration::ZERO);
        assert!(settings.image_timeout > Duration::ZERO);
        assert!(settings.max_pages > 0);
        assert!(settings.max_images > 0);
    }

    #[test]
    fn test_crawl_config_copies_limits() {
        let settings = HarvestSettings {
            max_pages: 7,
            max_images: 3,
            denylist: vec!["logo".to_string()],
            ..HarvestSettings::default()
        };
        let config = settings.crawl_config("https://x.com/", PathBuf::from("/tmp/images"));

        assert_eq!(config.seed_url, "https://x.com/");
        assert_eq!(config.max_pages, 7);
        assert_eq!(config.max_images, 3);
        assert_eq!(config.denylist, vec!["logo".to_string()]);
        assert_eq!(config.image_dir, PathBuf::from("/tmp/images"));
    }
}
