//! Infrastructure layer - external concerns

pub mod database;
pub mod payment;
pub mod storage;

pub use database::{init_database, DatabaseConfig, SeaOrmRepositoryProvider};
pub use payment::{SnapConfig, SnapGateway};
pub use storage::InMemoryRepositoryProvider;
