use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::anyhow;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use appointment_cell::services::{
    AppointmentBookingService, LogDispatcher, NotificationDispatcher, ReminderSweeper, WebhookDispatcher,
};
use availability_cell::handlers::AvailabilityState;
use shared_config::AppConfig;
use shared_database::{InMemoryStore, SchedulingStore, SupabaseStore};
use shared_utils::clock::{Clock, SystemClock};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting scheduling API server");

    // Load configuration
    let config = AppConfig::from_env();
    config
        .scheduling
        .validate()
        .map_err(|e| anyhow!("Invalid scheduling configuration: {}", e))?;

    let store: Arc<dyn SchedulingStore> = if config.is_database_configured() {
        info!("Using Supabase storage at {}", config.supabase_url);
        Arc::new(SupabaseStore::new(&config))
    } else {
        warn!("No database configured, appointments will not survive a restart");
        Arc::new(InMemoryStore::new())
    };

    let notifier: Arc<dyn NotificationDispatcher> = match WebhookDispatcher::from_config(&config) {
        Some(webhook) => Arc::new(webhook),
        None => Arc::new(LogDispatcher),
    };
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let availability = Arc::new(AvailabilityState::new(Arc::clone(&store), &config.scheduling));
    let appointments = Arc::new(AppointmentBookingService::new(
        Arc::clone(&store),
        Arc::clone(&notifier),
        Arc::clone(&clock),
        &config.scheduling,
    ));

    // Reminder sweep runs beside the server until shutdown
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let sweeper = ReminderSweeper::new(store, notifier, clock, &config.scheduling);
    let sweeper_handle = tokio::spawn(async move {
        sweeper
            .run(async move {
                let _ = shutdown_rx.changed().await;
            })
            .await;
    });

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the application router
    let app = router::create_router(availability, appointments)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new()
                    .level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new()
                    .level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.api_port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown signal received");
        })
        .await?;

    let _ = shutdown_tx.send(true);
    sweeper_handle.await?;

    Ok(())
}
