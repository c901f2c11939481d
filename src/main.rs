//! RESQ Server
//!
//! Main entry point: wires the classification loop, dispatch monitor and
//! web API around the shared state store.

use resq_server::{
    classification_loop::ClassificationLoop,
    detector_client::DetectorClient,
    dispatch::DispatchCoordinator,
    dispatch_monitor::DispatchMonitor,
    incident::IncidentRegistry,
    messaging::TwilioTransport,
    report_client::ReportClient,
    report_log::ReportLogService,
    resources::ResourceDirectory,
    state::{AppConfig, AppState},
    store::{FrameCache, SharedStore},
    web_api,
};
use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "resq_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::default();
    tracing::info!(host = %config.host, port = config.port, "RESQ server starting");

    // Report persistence is best effort; run in-memory when the DB is down
    let pool = match &config.database_url {
        Some(url) => match MySqlPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await
        {
            Ok(pool) => {
                tracing::info!("Connected to report database");
                Some(pool)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Report database unavailable, running in-memory");
                None
            }
        },
        None => {
            tracing::warn!("DATABASE_URL not set, reports kept in-memory only");
            None
        }
    };
    let db_connected = pool.is_some();

    let directory = Arc::new(ResourceDirectory::load(config.resource_config.as_deref())?);
    directory.validate()?;

    let store = Arc::new(SharedStore::new());
    let frames = Arc::new(FrameCache::new());
    let registry = Arc::new(RwLock::new(IncidentRegistry::new()));
    let report_log = Arc::new(ReportLogService::new(2000, pool));

    let transport = Arc::new(TwilioTransport::new(config.twilio.clone()));
    let coordinator = Arc::new(DispatchCoordinator::new(
        transport,
        Arc::clone(&directory),
        Arc::clone(&store),
        Arc::clone(&report_log),
    ));

    let classification = Arc::new(ClassificationLoop::new(
        Arc::new(DetectorClient::new(config.detector_url.clone())),
        Arc::new(ReportClient::new(config.report_api_url.clone())),
        Arc::clone(&directory),
        Arc::clone(&store),
        Arc::clone(&frames),
        Arc::clone(&registry),
        config.location_gps.clone(),
        Duration::from_millis(config.classification_tick_ms),
    ));
    classification.start().await;

    let monitor = Arc::new(DispatchMonitor::new(
        Arc::clone(&store),
        Arc::clone(&coordinator),
    ));
    monitor.start().await;

    let state = AppState {
        config: config.clone(),
        store,
        frames,
        registry,
        coordinator,
        report_log,
        directory,
        db_connected,
    };

    let app = web_api::create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
