//! # Court Booking Service
//!
//! Hourly court slot reservations with hosted payment checkout.
//!
//! - **domain**: slots, courts, bookings, payment types and repository traits
//! - **application**: slot ledger, reservation coordinator, settlement
//!   reconciler, catalog, background tasks
//! - **infrastructure**: SeaORM and in-memory stores, payment gateway client
//! - **interfaces**: REST API with Swagger documentation
//! - **server**: process lifecycle shared by the binaries

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig};
pub use infrastructure::{init_database, DatabaseConfig, InMemoryRepositoryProvider, SeaOrmRepositoryProvider};
pub use interfaces::create_api_router;
pub use server::{init_tracing, ServerHandle, ServerOptions};
