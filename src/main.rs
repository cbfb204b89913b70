use anyhow::Result;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;

mod clients;
mod config;
mod error;
mod logging;
mod routes;
mod services;

use clients::GeminiClient;
use services::analysis::build_profile;
use services::analysis::types::{Dataset, DatasetProfile};
use services::answerer::Answerer;
use services::cache::AnswerCache;
use services::session::SessionStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    logging::init_logging()?;

    // Load configuration
    let config = config::Config::new()?;

    // Load and profile every configured dataset once; profiles are immutable
    // afterwards and shared read-only across requests.
    let mut datasets = Vec::new();
    for source in &config.dataset_sources {
        let dataset = match services::csv_loader::load_dataset(source).await {
            Ok(dataset) => dataset,
            Err(e) => {
                tracing::warn!(source = %source, error = %e, "failed to load dataset; skipping");
                continue;
            }
        };
        match build_profile(&dataset) {
            Some(profile) => {
                let name = dataset_name(source);
                tracing::info!(
                    dataset = %name,
                    rows = profile.row_count,
                    columns = profile.column_count,
                    "dataset loaded and profiled"
                );
                datasets.push(LoadedDataset {
                    name,
                    dataset,
                    profile,
                });
            }
            None => {
                tracing::warn!(source = %source, "dataset has no rows; skipping");
            }
        }
    }
    if datasets.is_empty() {
        anyhow::bail!("No usable datasets loaded");
    }

    let answerer = Answerer::new(GeminiClient::new(
        &config.gemini_api_key,
        &config.gemini_model,
    ));

    // Build our application state
    let state = Arc::new(AppState {
        datasets,
        cache: AnswerCache::new(config.answer_cache_capacity),
        sessions: SessionStore::new(),
        answerer,
    });

    // Build our application with a route
    let app = Router::new()
        .merge(routes::routes())
        .merge(routes::chat::routes())
        .with_state(state);

    // Run it
    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// One dataset with its startup-built profile.
pub struct LoadedDataset {
    pub name: String,
    pub dataset: Dataset,
    pub profile: DatasetProfile,
}

// Application state
pub struct AppState {
    pub datasets: Vec<LoadedDataset>,
    pub cache: AnswerCache,
    pub sessions: SessionStore,
    pub answerer: Answerer,
}

fn dataset_name(source: &str) -> String {
    source
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(source)
        .trim_end_matches(".csv")
        .to_string()
}
