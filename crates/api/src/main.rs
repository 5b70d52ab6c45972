use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use courier_api::config::Config;
use courier_api::router::build_app_router;
use courier_api::state::AppState;
use courier_broker::BrokerGateway;
use courier_cache::CacheGateway;
use courier_clients::{RetryPolicy, TemplateClient, UserPreferencesClient};
use courier_orchestrator::recovery::PendingRecovery;
use courier_orchestrator::retry::FailedRetry;
use courier_orchestrator::Orchestrator;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courier_api=debug,courier_orchestrator=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = Config::from_env();
    tracing::info!(port = config.server.port, "Loaded configuration");

    // --- Database ---
    let pool = courier_db::create_pool(&config.connect_settings())
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    courier_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    courier_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Cache ---
    let cache = CacheGateway::new(&config.redis.address, &config.redis.password, config.redis.db)
        .expect("Invalid Redis configuration");
    cache.ping().await.expect("Failed to connect to Redis");
    tracing::info!(address = %config.redis.address, "Connected to Redis");

    // --- Broker ---
    let broker = BrokerGateway::connect(&config.broker_settings())
        .await
        .expect("Failed to connect to broker");

    // --- Remote service clients ---
    let user_client = UserPreferencesClient::new(
        config.external_services.user_service_base.clone(),
        RetryPolicy::default(),
    );
    let template_client = TemplateClient::new(
        config.external_services.template_service_base.clone(),
        RetryPolicy::default(),
    );

    // --- Orchestrator + background sweepers ---
    let orchestrator = Arc::new(Orchestrator::new(
        pool.clone(),
        cache.clone(),
        broker,
        user_client,
        template_client,
    ));

    let sweeper_cancel = CancellationToken::new();
    let recovery_handle = tokio::spawn(
        PendingRecovery::new(Arc::clone(&orchestrator)).run(sweeper_cancel.clone()),
    );
    let retry_handle =
        tokio::spawn(FailedRetry::new(Arc::clone(&orchestrator)).run(sweeper_cancel.clone()));
    tracing::info!("Background sweepers started (pending recovery, failed retry)");

    // --- App state & router ---
    let config = Arc::new(config);
    let state = AppState {
        pool: pool.clone(),
        cache,
        orchestrator,
        config: Arc::clone(&config),
    };
    let app = build_app_router(state, &config.server);

    // --- Start server ---
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    sweeper_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), recovery_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), retry_handle).await;
    tracing::info!("Background sweepers stopped");

    pool.close().await;
    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server shuts
/// down cleanly whether stopped interactively or by a process manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
