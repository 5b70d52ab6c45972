//! Datastore gateway: pooled Postgres connections, embedded migrations, and
//! the repository layer for notifications and their audit events.

use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};

pub mod models;
pub mod repositories;

pub type DbPool = sqlx::PgPool;

/// Connection settings for the notification datastore.
///
/// Built by the API crate from environment configuration and handed to
/// [`create_pool`].
#[derive(Debug, Clone)]
pub struct ConnectSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub ssl_mode: String,
    pub max_open_conns: u32,
    pub max_idle_conns: u32,
    pub conn_max_lifetime: Duration,
    pub conn_max_idle_time: Duration,
}

/// Create a connection pool from typed settings.
pub async fn create_pool(settings: &ConnectSettings) -> Result<DbPool, sqlx::Error> {
    let ssl_mode: PgSslMode = settings.ssl_mode.parse().unwrap_or(PgSslMode::Prefer);

    let options = PgConnectOptions::new()
        .host(&settings.host)
        .port(settings.port)
        .username(&settings.user)
        .password(&settings.password)
        .database(&settings.database)
        .ssl_mode(ssl_mode);

    PgPoolOptions::new()
        .max_connections(settings.max_open_conns)
        .min_connections(settings.max_idle_conns)
        .max_lifetime(settings.conn_max_lifetime)
        .idle_timeout(settings.conn_max_idle_time)
        .connect_with(options)
        .await
}

/// Verify the database answers a trivial query.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await?;
    Ok(())
}

/// Apply the embedded migrations in `./migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!().run(pool).await
}

/// Whether an error is a Postgres unique-constraint violation (SQLSTATE
/// 23505). The idempotency-key race resolves through this check: the losing
/// insert observes the violation and loads the winner's row instead.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}
