//! SLR screening server
//!
//! Run with: cargo run -p slr-web

use std::sync::Arc;

use anyhow::Context;
use slr_ingestion::sources::PubMedClient;
use slr_screening::{CsvSink, Services};
use slr_web::config::Config;
use slr_web::state::AppState;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("slr=debug,info")),
        )
        .init();

    info!("Starting SLR screening server...");

    let config = Config::load().context("loading configuration")?;
    let services = build_services(&config)?;
    let run_cfg = config.run_config()?;
    info!(layers = ?run_cfg.layers, "Cascade configured");

    let state = AppState::new(services, run_cfg)
        .with_output_dir(&config.export.output_dir)
        .with_job_retention(config.server.max_finished_jobs);
    let app = slr_web::router::build_router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn build_services(config: &Config) -> anyhow::Result<Services> {
    let source = Arc::new(PubMedClient::new(config.pubmed_config())?);

    let classifier = match config.classifier_config() {
        Some(cfg) => Some(slr_models::build_classifier(cfg)?),
        None => {
            warn!("No [classifier] section; ML layer disabled");
            None
        }
    };

    let cache_capacity = config.embedding.as_ref().map_or(0, |e| e.cache_capacity);
    let embedder = match config.embedding_config() {
        Some(cfg) => Some(slr_models::build_embedder(cfg, cache_capacity)?),
        None => {
            warn!("No [embedding] section; semantic layer and near-duplicate detection disabled");
            None
        }
    };

    let sink = Arc::new(CsvSink::new(&config.export.output_dir));
    Ok(Services { source, classifier, embedder, sink })
}
