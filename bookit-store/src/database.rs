use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::info;

use crate::app_config::DatabaseConfig;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("Migrations completed successfully.");
        Ok(())
    }
}

/// SQLSTATE of a failed statement, if the driver reported one.
pub(crate) fn sql_state(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) => db.code().map(|c| c.into_owned()),
        _ => None,
    }
}

pub(crate) const UNIQUE_VIOLATION: &str = "23505";
pub(crate) const EXCLUSION_VIOLATION: &str = "23P01";

pub(crate) fn backend(err: sqlx::Error) -> bookit_core::StoreError {
    bookit_core::StoreError::backend(err)
}
