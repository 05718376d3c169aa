use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use scantrad_backend::api::{self, AppState};
use scantrad_backend::inference::RemoteTransformer;
use scantrad_backend::pipeline::batch_orchestrator::BatchOrchestrator;
use scantrad_backend::rendering::TextRenderer;
use scantrad_backend::store::memory::MemoryStore;
use scantrad_backend::{Config, Metrics, NotificationHub};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Arc::new(Config::new()?);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("scantrad_backend={}", config.log_level())));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting scan translation backend v{}", env!("CARGO_PKG_VERSION"));

    let store: Arc<dyn scantrad_backend::BatchStore> = Arc::new(MemoryStore::default());
    let transformer = Arc::new(RemoteTransformer::new(&config.transformer));
    let renderer = Arc::new(TextRenderer::new(
        std::path::Path::new(config.font_dir()),
        config.font_size(),
    ));
    let hub = NotificationHub::default();
    let metrics = Metrics::new();

    let orchestrator = Arc::new(BatchOrchestrator::new(
        Arc::clone(&store),
        transformer,
        renderer,
        hub.clone(),
        metrics.clone(),
    ));

    let state = AppState {
        config: Arc::clone(&config),
        store,
        orchestrator,
        hub,
        metrics,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = api::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(config.max_body_bytes()));

    let addr = format!("{}:{}", config.server_host(), config.server_port());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Server running at http://{addr}");
    info!("  POST /auth/login                     - login or register a pseudo");
    info!("  POST /upload-batch                   - submit a batch of pages");
    info!("  GET  /result/{{batch_id}}              - batch status and page results");
    info!("  GET  /user/{{pseudo}}/batches          - batches for a user");
    info!("  GET  /user/{{pseudo}}/translated-pages - translation history");
    info!("  GET  /batch/{{batch_id}}/translated-pages - translated pages of a batch");
    info!("  GET  /ws                             - progress event stream");
    info!("  GET  /health                         - health check");
    info!("  GET  /stats                          - processing metrics");

    axum::serve(listener, app).await?;

    Ok(())
}
