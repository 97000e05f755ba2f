//! attendance-gateway server entry point.
//!
//! Starts the Axum HTTP server with REST and SSE endpoints.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use attendance_gateway::api;
use attendance_gateway::app_state::AppState;
use attendance_gateway::config::GatewayConfig;
use attendance_gateway::external::email::SmtpNotifier;
use attendance_gateway::external::import::DelimitedTextImporter;
use attendance_gateway::external::postgres::{PgEventGateway, PgRoleDirectory, PgUserDirectory};
use attendance_gateway::external::qr::PngQrEncoder;
use attendance_gateway::external::{
    EmailNotifier, EventGateway, FileImporter, QrEncoder, RoleDirectory, UserDirectory,
};
use attendance_gateway::hub::NotificationHub;
use attendance_gateway::persistence::AttendantStore;
use attendance_gateway::persistence::postgres::PgAttendantStore;
use attendance_gateway::service::{CheckInService, RosterService};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = GatewayConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting attendance-gateway");

    // Database pool + migrations
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("database migrations applied");

    // Storage and collaborators
    let store: Arc<dyn AttendantStore> = Arc::new(PgAttendantStore::new(pool.clone()));
    let events: Arc<dyn EventGateway> = Arc::new(PgEventGateway::new(pool.clone()));
    let users: Arc<dyn UserDirectory> = Arc::new(PgUserDirectory::new(pool.clone()));
    let roles: Arc<dyn RoleDirectory> = Arc::new(PgRoleDirectory::new(pool));
    let mailer: Arc<dyn EmailNotifier> = Arc::new(SmtpNotifier::from_config(&config)?);
    let importer: Arc<dyn FileImporter> = Arc::new(DelimitedTextImporter);
    let qr: Arc<dyn QrEncoder> = Arc::new(PngQrEncoder);

    // Live notification fan-out
    let hub = Arc::new(NotificationHub::new(config.hub_channel_capacity));

    // Service layer
    let check_in_service = Arc::new(CheckInService::new(
        Arc::clone(&users),
        Arc::clone(&events),
        Arc::clone(&store),
        Arc::clone(&hub),
    ));
    let roster_service = Arc::new(RosterService::new(
        store,
        Arc::clone(&users),
        events,
        Arc::clone(&roles),
        mailer,
        importer,
        qr,
        config.api_prefix.clone(),
    ));

    // Build application state
    let app_state = AppState {
        check_in_service,
        roster_service,
        hub,
        users,
        roles,
    };

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
