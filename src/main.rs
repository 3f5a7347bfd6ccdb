use axum::routing::get;
use axum_prometheus::PrometheusMetricLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bookmark_server::config::Config;
use bookmark_server::routes;
use bookmark_server::state::AppState;

#[tokio::main]
async fn main() {
    // Load configuration — fatal if a numeric or boolean setting does not parse.
    let config = Config::from_env().expect("Failed to load configuration");

    // Initialize tracing — JSON in production, human-readable in dev.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bookmark_server=info,tower_http=info".parse().unwrap());

    if config.is_production {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("🚀 Bookmark server starting...");
    info!(
        summarizer = %config.summarizer_url,
        fetch_timeout_secs = config.fetch_timeout.as_secs(),
        fetch_max_retries = config.fetch_max_retries,
        "📝 Configuration loaded"
    );
    if config.allow_private_targets {
        tracing::warn!("🔓 Private and loopback targets may be fetched directly");
    }

    let addr = config.server_addr();
    let app_state = AppState::from_config(&config).expect("Failed to build HTTP client");

    // Prometheus metrics layer
    let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();

    let app = routes::router(app_state)
        .route(
            "/metrics",
            get(move || async move { metric_handle.render() }),
        )
        .layer(prometheus_layer);

    info!("🎧 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}
