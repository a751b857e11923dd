// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use reqwest::{redirect, Client};
use std::time::Duration;
use thiserror::Error;

/// Redirect hops followed before a fetch fails
const MAX_REDIRECTS: usize = 10;

/// Why a fetch produced no body
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("timed out")]
    Timeout,
    #[error("HTTP status {0}")]
    HttpStatus(u16),
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("body exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

/// HTTP GET for pages and images alike.
///
/// Never retries: a failed fetch is reported once and the caller decides what
/// to do with it.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    max_body_bytes: usize,
}

impl Fetcher {
    /// Create a fetcher sending `user_agent` and refusing bodies above `max_body_bytes`
    pub fn new(user_agent: &str, max_body_bytes: usize) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| {
                FetchError::ConnectionFailed(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            max_body_bytes,
        })
    }

    /// GET `url` and return its body; the whole exchange is bounded by `timeout`
    pub async fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError> {
        let mut response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        if let Some(length) = response.content_length() {
            if length > self.max_body_bytes as u64 {
                return Err(FetchError::TooLarge {
                    limit: self.max_body_bytes,
                });
            }
        }

        // Content-Length may be absent or wrong, so the cap is enforced while reading
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(classify)? {
            if body.len() + chunk.len() > self.max_body_bytes {
                return Err(FetchError::TooLarge {
                    limit: self.max_body_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }
}

fn classify(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout
    } else if let Some(status) = error.status() {
        FetchError::HttpStatus(status.as_u16())
    } else {
        FetchError::ConnectionFailed(error.to_string())
    }
}
