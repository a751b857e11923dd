// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Turns raw `<img src>` values into absolute, fetchable image URLs.
//!
//! Image-rewriting endpoints (for example Next.js `/_next/image?url=...`)
//! are unwrapped so the record points at the real asset rather than the
//! transformation proxy.

use thiserror::Error;
use url::Url;

/// An image-rewriting endpoint whose true source travels in a query parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRule {
    /// Substring of the URL path identifying the endpoint
    pub path_marker: String,
    /// Query parameter carrying the wrapped source
    pub param: String,
}

impl ProxyRule {
    pub fn new(path_marker: &str, param: &str) -> Self {
        Self {
            path_marker: path_marker.to_string(),
            param: param.to_string(),
        }
    }
}

/// Why a raw `src` produced no image
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("empty image source")]
    Empty,
    #[error("inline data URI")]
    DataUri,
    #[error("invalid image URL: {0}")]
    InvalidUrl(String),
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),
    #[error("image URL has no file name")]
    EmptyName,
}

/// A resolved image reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub url: Url,
    /// Final path segment of `url`, without the query string
    pub name: String,
}

/// Resolves `src` attributes relative to the page they were found on
#[derive(Debug, Clone)]
pub struct ImageResolver {
    proxies: Vec<ProxyRule>,
}

impl Default for ImageResolver {
    fn default() -> Self {
        Self::new(vec![
            ProxyRule::new("/_next/image", "url"),
            ProxyRule::new("/_vercel/image", "url"),
        ])
    }
}

impl ImageResolver {
    pub fn new(proxies: Vec<ProxyRule>) -> Self {
        Self { proxies }
    }

    /// Resolve `raw_src` against `page_url`; `None` when the source must not be fetched
    pub fn resolve(&self, page_url: &Url, raw_src: &str) -> Option<ResolvedImage> {
        self.try_resolve(page_url, raw_src).ok()
    }

    /// Like [`ImageResolver::resolve`], but reports why a source was rejected
    pub fn try_resolve(
        &self,
        page_url: &Url,
        raw_src: &str,
    ) -> Result<ResolvedImage, ResolveError> {
        let mut url = join_source(page_url, raw_src)?;

        if let Some(inner) = self.unwrap_proxy(&url) {
            url = join_source(page_url, &inner)?;
        }

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ResolveError::UnsupportedScheme(url.scheme().to_string()));
        }

        let name = image_name(&url).ok_or(ResolveError::EmptyName)?;
        Ok(ResolvedImage { url, name })
    }

    /// Value of the proxy parameter if `url` points at a known rewriting endpoint
    fn unwrap_proxy(&self, url: &Url) -> Option<String> {
        let rule = self
            .proxies
            .iter()
            .find(|rule| url.path().contains(&rule.path_marker))?;

        url.query_pairs()
            .find(|(key, _)| key == rule.param.as_str())
            .map(|(_, value)| value.into_owned())
    }
}

fn join_source(page_url: &Url, raw_src: &str) -> Result<Url, ResolveError> {
    let src = raw_src.trim();
    if src.is_empty() {
        return Err(ResolveError::Empty);
    }
    if src
        .get(..5)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("data:"))
    {
        return Err(ResolveError::DataUri);
    }

    page_url
        .join(src)
        .map_err(|e| ResolveError::InvalidUrl(format!("{}: {}", src, e)))
}

/// Final path segment of `url`, percent-decoded, or `None` when it is empty.
/// Decoded separators are replaced so the name stays a single file name.
pub fn image_name(url: &Url) -> Option<String> {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())?;

    let decoded = urlencoding::decode(segment)
        .map(|name| name.replace(['/', '\\'], "_"))
        .unwrap_or_else(|_| segment.to_string());

    match decoded.as_str() {
        "" | "." | ".." => None,
        _ => Some(decoded),
    }
}

/// Case-insensitive substring denylist for image URLs
#[derive(Debug, Clone, Default)]
pub struct Denylist {
    entries: Vec<String>,
}

impl Denylist {
    pub fn new(entries: &[String]) -> Self {
        Self {
            entries: entries
                .iter()
                .map(|e| e.trim().to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    /// The first entry contained in `image_url`, if any
    pub fn matches(&self, image_url: &str) -> Option<&str> {
        let lowered = image_url.to_lowercase();
        self.entries
            .iter()
            .find(|entry| lowered.contains(entry.as_str()))
            .map(String::as_str)
    }
}
