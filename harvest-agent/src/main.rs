// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use harvest_agent::app::{create_router, AppState, VERSION};
use harvest_agent::models::crawler::CrawlState;
use harvest_agent::models::harvest::HarvestRequest;
use harvest_agent::models::settings::HarvestSettings;
use harvest_agent::services::harvest::run_harvest;
use harvest_agent::services::logging;
use harvest_agent::services::upload::{build_uploader, StorageConfig};
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "harvest-agent", version = VERSION)]
#[command(about = "Crawl a site, collect its images and publish them with a metadata log")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Crawl one site and upload its images under DESTINATION_FOLDER
    Crawl {
        seed_url: String,
        destination_folder: String,
    },
    /// Start the HTTP front-end
    Serve {
        #[arg(long, default_value = "3000")]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let cli = Cli::parse();
    let settings = HarvestSettings::from_env().context("Invalid crawl settings")?;
    let storage = StorageConfig::from_env().context("Invalid storage configuration")?;
    tracing::debug!(?settings, ?storage, "Loaded configuration");

    match cli.command {
        Command::Crawl {
            seed_url,
            destination_folder,
        } => {
            let request = HarvestRequest {
                seed_url,
                destination_folder,
            };
            crawl(request, settings, storage).await
        }
        Command::Serve { port } => serve(port, AppState::new(settings, storage)).await,
    }
}

async fn crawl(
    request: HarvestRequest,
    settings: HarvestSettings,
    storage: StorageConfig,
) -> Result<()> {
    let uploader = build_uploader(&storage).await?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping crawl");
            on_interrupt.cancel();
        }
    });

    let summary = run_harvest(&request, &settings, uploader, cancel).await?;

    println!("{}", summary.message);
    if let Some(reference) = &summary.metadata_reference {
        println!("Metadata log: {}", reference);
    }

    if summary.state == CrawlState::FatalError {
        return Err(anyhow!("Harvest of {} failed", summary.seed_url));
    }
    Ok(())
}

async fn serve(port: u16, state: AppState) -> Result<()> {
    let app = create_router(state);

    // Bind to 0.0.0.0 to accept connections from any network interface (required for Docker)
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(version = VERSION, %addr, "harvest-agent listening");

    axum::serve(listener, app).await?;
    Ok(())
}
