use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use bookit_api::{
    app,
    state::{AppState, AuthConfig, Backends},
    worker,
};
use bookit_core::notify::TracingNotifier;
use bookit_store::{
    Config, DbClient, PgInventoryStore, PgLockLedger, PgReservationStore, RedisClient,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "bookit_api=debug,bookit_core=debug,tower_http=debug,axum::rejection=trace".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Bookit API on port {}", config.server.port);

    let db = DbClient::new(&config.database)
        .await
        .context("Failed to connect to Postgres")?;
    db.migrate().await.context("Failed to run migrations")?;

    let redis = RedisClient::new(&config.redis.url)
        .await
        .context("Failed to connect to Redis")?;

    let inventory = Arc::new(PgInventoryStore::new(db.pool.clone()));
    let backends = Backends {
        users: inventory.clone(),
        inventory,
        ledger: Arc::new(PgLockLedger::new(db.pool.clone())),
        reservations: Arc::new(PgReservationStore::new(db.pool.clone())),
        cooldowns: Arc::new(redis),
        notifier: Arc::new(TracingNotifier),
    };

    let state = AppState::new(
        backends,
        config.booking_rules.to_lock_policy(),
        AuthConfig {
            secret: config.auth.jwt_secret.clone(),
        },
    );

    let sweep_every = config.booking_rules.lock_sweep_interval_seconds;
    if sweep_every > 0 {
        tokio::spawn(worker::start_lock_sweeper(
            state.locks.clone(),
            Duration::from_secs(sweep_every),
        ));
    }

    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
