use axum::extract::Path;
use axum::http::StatusCode;
use axum::{
    Json, Router,
    extract::Extension,
    middleware,
    routing::{get, post, put},
};
use clap::Parser;
use content_search::app::App;
use content_search::config::{Config, DEFAULT_FEED_TOPIC};
use content_search::index::projector::ProjectorRegistry;
use content_search::ingestion::handlers::handle_emit;
use content_search::ratelimit::middleware::rate_limit;
use content_search::search::handlers::{handle_autocomplete, handle_health, handle_search};
use content_search::storage::memory::MemorySourceStore;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "content-search",
    about = "Indexing and search service for user-generated content"
)]
struct Cli {
    /// Address the HTTP server listens on
    #[arg(long, env = "CONTENT_SEARCH_BIND")]
    bind: Option<SocketAddr>,

    /// JSON file with the full configuration; flags override its values
    #[arg(long, env = "CONTENT_SEARCH_CONFIG")]
    config: Option<PathBuf>,

    /// Change-feed topic the ingestion worker subscribes to
    #[arg(long, env = "CONTENT_SEARCH_FEED_TOPIC")]
    feed_topic: Option<String>,

    /// Steady search rate per client, requests per second
    #[arg(long, env = "CONTENT_SEARCH_RATE")]
    rate: Option<f64>,

    /// Search burst capacity per client
    #[arg(long, env = "CONTENT_SEARCH_BURST")]
    burst: Option<u32>,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                serde_json::from_str::<Config>(&raw)?
            }
            None => Config::default(),
        };

        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        if let Some(topic) = self.feed_topic {
            config.feed_topic = topic;
        }
        if let Some(rate) = self.rate {
            config.rate_limit.rate_per_sec = rate;
        }
        if let Some(burst) = self.burst {
            config.rate_limit.burst = burst;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_config()?;
    let bind_addr = config.bind;
    if config.feed_topic != DEFAULT_FEED_TOPIC {
        tracing::info!("Using feed topic '{}'", config.feed_topic);
    }

    // 1. Stores and components:
    let source = MemorySourceStore::new();
    let registry = ProjectorRegistry::with_defaults();
    tracing::info!(
        "Registered {} projectors, searchable types: {:?}",
        registry.projector_count(),
        registry.index_types()
    );
    let app = App::in_memory(config, source.clone(), registry);

    // 2. Ingestion worker:
    app.spawn_worker().await?;

    // 3. HTTP Router:
    let search_routes = Router::new()
        .route("/api/v1/search/:entity_type", get(handle_search))
        .route_layer(middleware::from_fn(rate_limit));

    let router = Router::new()
        .route("/health", get(handle_health))
        .route("/api/v1/ac", get(handle_autocomplete))
        .route("/api/v1/emitted", post(handle_emit))
        .route("/api/v1/records/:entity_type/:id", put(handle_put_record))
        .merge(search_routes)
        .layer(Extension(app.service.clone()))
        .layer(Extension(app.limiter.clone()))
        .layer(Extension(source));

    // 4. Start HTTP server:
    tracing::info!("HTTP server listening on {}", bind_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Stands in for the upstream document store: records written here are what
/// the worker projects when a change event names them.
async fn handle_put_record(
    Path((entity_type, id)): Path<(String, String)>,
    Extension(source): Extension<Arc<MemorySourceStore>>,
    Json(record): Json<serde_json::Value>,
) -> StatusCode {
    tracing::debug!("Stored source record {}/{}", entity_type, id);
    source.insert(&entity_type, &id, record);
    StatusCode::NO_CONTENT
}
