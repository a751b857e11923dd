// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Application state, route handlers, and router construction.
//!
//! This module is `pub` so that integration tests can build a test router directly
//! without starting the full binary.

use crate::models::harvest::{HarvestRequest, HarvestSummary};
use crate::models::settings::HarvestSettings;
use crate::models::version::VersionResponse;
use crate::services::harvest::{run_harvest, validate_request, HarvestError};
use crate::services::upload::{build_uploader, StorageConfig};
use axum::{
    extract::State,
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Form, Json, Router,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Application version extracted from `Cargo.toml` at compile time.
/// The patch segment can be overridden via `HARVEST_PATCH_VERSION` (see `build.rs`).
pub const VERSION: &str = env!("HARVEST_VERSION");

/// Shared application state injected into every route handler via `State<AppState>`.
///
/// Holds configuration only. Each request builds its own upload client.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<HarvestSettings>,
    pub storage: Arc<StorageConfig>,
}

impl AppState {
    pub fn new(settings: HarvestSettings, storage: StorageConfig) -> Self {
        Self {
            settings: Arc::new(settings),
            storage: Arc::new(storage),
        }
    }
}

const FORM_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Image Harvester</title></head>
<body>
<h1>Image Harvester</h1>
<form method="post" action="/">
  <p><label>Seed URL <input type="url" name="seed_url" size="60" required></label></p>
  <p><label>Destination folder <input type="text" name="destination_folder" size="40" required></label></p>
  <p><button type="submit">Harvest images</button></p>
</form>
</body>
</html>
"#;

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

pub async fn version_handler(State(state): State<AppState>) -> Json<VersionResponse> {
    Json(VersionResponse {
        agent: "harvest-agent".to_string(),
        version: VERSION.to_string(),
        storage_backend: state.storage.backend().to_string(),
        upload_mode: state.settings.upload_mode.to_string(),
    })
}

pub async fn form_handler() -> Html<&'static str> {
    Html(FORM_PAGE)
}

/// Form submission from the index page; always answers with a readable message
pub async fn submit_form_handler(
    State(state): State<AppState>,
    Form(payload): Form<HarvestRequest>,
) -> (StatusCode, Html<String>) {
    match execute(&state, &payload).await {
        Ok(summary) => (StatusCode::OK, Html(message_page(&summary.message))),
        Err((status, message)) => (status, Html(message_page(&message))),
    }
}

pub async fn harvest_handler(
    State(state): State<AppState>,
    Json(payload): Json<HarvestRequest>,
) -> Result<Json<HarvestSummary>, (StatusCode, String)> {
    execute(&state, &payload).await.map(Json)
}

async fn execute(
    state: &AppState,
    request: &HarvestRequest,
) -> Result<HarvestSummary, (StatusCode, String)> {
    // Reject bad input before any backend client is built
    validate_request(request).map_err(error_response)?;

    let uploader = build_uploader(&state.storage).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to create upload client");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Storage backend unavailable: {e}"),
        )
    })?;

    run_harvest(request, &state.settings, uploader, CancellationToken::new())
        .await
        .map_err(error_response)
}

fn error_response(error: HarvestError) -> (StatusCode, String) {
    match error {
        HarvestError::InvalidRequest(message) => (StatusCode::BAD_REQUEST, message),
        other => {
            tracing::error!(error = %other, "Harvest failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Harvest failed: {other}"),
            )
        }
    }
}

fn message_page(message: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>Image Harvester</title></head>\n\
         <body>\n<p>{}</p>\n<p><a href=\"/\">Start another harvest</a></p>\n</body>\n</html>\n",
        escape_html(message)
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(form_handler).post(submit_form_handler))
        .route("/version", get(version_handler))
        .route("/api/harvest", post(harvest_handler))
        .with_state(state)
}
