// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Logging setup and helpers for keeping credentials out of log output.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,harvest_agent=info";

/// Install the global tracing subscriber. `RUST_LOG` overrides the default filter.
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Mask a secret for logging.
/// Shows the first four characters of long secrets and hides the rest: "sl.B***"
pub fn redact_secret(secret: &str) -> String {
    if secret.chars().count() <= 8 {
        return "***".to_string();
    }
    let visible: String = secret.chars().take(4).collect();
    format!("{}***", visible)
}
