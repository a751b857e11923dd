// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Same-site checks applied to links before they enter the frontier.

use url::Url;

/// True when `candidate` has no host (a relative URL) or its host equals the host of `base_url`.
///
/// Hosts are compared as exact strings: no subdomain matching, and neither
/// scheme nor port take part in the comparison.
pub fn is_internal(candidate: &str, base_url: &str) -> bool {
    let candidate_host = match Url::parse(candidate) {
        Ok(url) => url.host_str().map(str::to_string),
        // Relative references fail to parse on their own
        Err(url::ParseError::RelativeUrlWithoutBase) => None,
        Err(_) => return false,
    };

    let Some(candidate_host) = candidate_host else {
        return true;
    };

    Url::parse(base_url)
        .ok()
        .and_then(|base| base.host_str().map(|h| h == candidate_host))
        .unwrap_or(false)
}

/// True when `candidate` lies under `base_url` by plain string prefix.
pub fn within_boundary(candidate: &str, base_url: &str) -> bool {
    candidate.starts_with(base_url)
}
