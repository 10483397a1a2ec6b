use std::sync::Arc;

use actix_web::{
    middleware::{from_fn, Logger},
    web, App, HttpServer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use merchant_gateway::{
    classify::RouteClassifier, config::GatewayConfig, db::Database, metrics::register_metrics,
    middleware::{api_gate, Gate},
    routes,
    state::AppState,
};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = GatewayConfig::from_env().expect("Failed to load configuration");
    let port = config.port;
    let admin_origins = config.admin_allowed_origins.clone();

    tracing::info!("Starting merchant-gateway on port {}", port);
    tracing::info!("Internal path prefixes: {:?}", config.internal_prefixes);
    tracing::info!(
        "Admin auth: {}",
        if config.admin_token.is_some() {
            "enabled"
        } else {
            "disabled (dev mode)"
        }
    );

    // Initialize database
    let db = Arc::new(Database::new(&config.db_path).expect("Failed to initialize database"));
    tracing::info!("Database initialized at: {}", config.db_path);

    // Drop audit rows past retention
    let retention_secs = config.failed_attempt_retention_secs;
    match db.purge_failed_attempts(retention_secs).await {
        Ok(0) => {}
        Ok(n) => tracing::info!("Purged {n} failed attempts older than {retention_secs}s"),
        Err(e) => tracing::warn!("Failed to purge failed attempts: {e}"),
    }

    // Register Prometheus metrics
    register_metrics();

    let gate = web::Data::new(Gate::new(
        Arc::clone(&db),
        RouteClassifier::new(config.internal_prefixes.clone()),
        config.cors.clone(),
    ));
    let state_data = web::Data::new(AppState::new(config, db));

    // Start HTTP server
    HttpServer::new(move || {
        App::new()
            .app_data(state_data.clone())
            .app_data(gate.clone())
            .wrap(from_fn(api_gate::<Database, _>))
            .wrap(Logger::default())
            .configure(routes::health::configure)
            .configure(routes::admin::configure(admin_origins.clone()))
            .configure(routes::api::configure)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
