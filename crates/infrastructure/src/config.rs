use std::env;

use mercat_core::{AppError, AppResult};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

/// Connection settings for the PostgreSQL adapters.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Maximum pool size.
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// Loads settings from the environment, reading `.env` when present.
    pub fn load() -> AppResult<Self> {
        dotenvy::dotenv().ok();

        let database_url = required_env("DATABASE_URL")?;
        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(10);

        Ok(Self {
            database_url,
            max_connections,
        })
    }

    /// Opens a connection pool with these settings.
    pub async fn connect(&self) -> AppResult<PgPool> {
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .connect(self.database_url.as_str())
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to connect to database: {error}"))
            })?;

        info!(max_connections = self.max_connections, "database pool ready");
        Ok(pool)
    }
}

fn required_env(name: &str) -> AppResult<String> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} must be set")))
}
