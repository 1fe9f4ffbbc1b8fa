pub mod entities;
pub mod migrator;
pub mod repositories;

pub use repositories::SeaOrmRepositoryProvider;

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use tracing::info;

use crate::shared::retry::{retry_with_backoff, RetryConfig};

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database URL (e.g., "sqlite://./court-booking.db?mode=rwc")
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://./court-booking.db?mode=rwc".to_string(),
            max_connections: 10,
            connect_timeout: Duration::from_secs(8),
        }
    }
}

/// Initialize database connection, retrying while the server comes up.
pub async fn init_database(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    info!("Connecting to database: {}", config.url);

    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .connect_timeout(config.connect_timeout)
        .sqlx_logging(false);

    let db = retry_with_backoff(
        RetryConfig::default(),
        || Database::connect(options.clone()),
        |e| matches!(e, DbErr::Conn(_) | DbErr::ConnectionAcquire(_)),
        "database_connect",
    )
    .await?;

    info!("Database connected successfully");
    Ok(db)
}
