//! Server runtime
//!
//! [`ServerHandle`] owns the whole process lifecycle: database init and
//! migrations, demo seed, background tasks, the REST API and graceful
//! shutdown. The CLI binary and the plain service binary both use it.

use std::sync::{Arc, OnceLock};

use chrono::Utc;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::application::{start_hold_expiry_task, start_slot_window_task, BookingServices};
use crate::config::AppConfig;
use crate::domain::{PaymentGateway, RepositoryProvider};
use crate::infrastructure::database::migrator::Migrator;
use crate::infrastructure::{init_database, InMemoryRepositoryProvider, SeaOrmRepositoryProvider, SnapGateway};
use crate::interfaces::{create_api_router, ApiOptions};
use crate::shared::shutdown::{ShutdownCoordinator, ShutdownSignal};

pub struct ServerOptions {
    pub config: AppConfig,
    /// Run database migrations on startup
    pub auto_migrate: bool,
    /// Create the demo courts on an empty database
    pub seed: bool,
    /// Keep everything in process memory instead of the SQL store
    pub in_memory: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            auto_migrate: true,
            seed: true,
            in_memory: false,
        }
    }
}

/// Handle to a running booking service.
pub struct ServerHandle {
    pub services: BookingServices,
    pub config: AppConfig,
    /// Port actually bound, useful when the configured port is 0
    pub port: u16,

    db: Option<DatabaseConnection>,
    shutdown: ShutdownCoordinator,
    api_task: JoinHandle<()>,
    background: Vec<JoinHandle<()>>,
}

/// The global recorder can only be installed once per process.
fn prometheus_handle() -> Option<PrometheusHandle> {
    static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
    if let Some(handle) = HANDLE.get() {
        return Some(handle.clone());
    }
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            info!("📊 Prometheus metrics recorder installed");
            Some(HANDLE.get_or_init(|| handle).clone())
        }
        Err(e) => {
            warn!(error = %e, "Prometheus recorder unavailable; /metrics disabled");
            None
        }
    }
}

impl ServerHandle {
    /// Start the service.
    ///
    /// 1. Install the Prometheus recorder
    /// 2. Connect to the database and run migrations (or use the in-memory store)
    /// 3. Seed demo courts and fill the slot window
    /// 4. Start the hold expiry and slot window tasks
    /// 5. Serve the REST API
    pub async fn start(opts: ServerOptions) -> Result<Self, Box<dyn std::error::Error>> {
        let cfg = opts.config;
        info!("Starting court booking service...");

        let metrics = prometheus_handle();

        // ── Storage ────────────────────────────────────────────
        let db = if opts.in_memory {
            warn!("Using the in-memory store; data is lost on exit");
            None
        } else {
            let db = init_database(&cfg.database_config()).await?;
            if opts.auto_migrate {
                info!("Running database migrations...");
                Migrator::up(&db, None).await?;
                info!("Migrations completed");
            }
            Some(db)
        };
        let repos: Arc<dyn RepositoryProvider> = match &db {
            Some(db) => Arc::new(SeaOrmRepositoryProvider::new(db.clone())),
            None => Arc::new(InMemoryRepositoryProvider::new()),
        };

        // ── Services ───────────────────────────────────────────
        if cfg.payment.server_key.is_empty() {
            warn!("payment.server_key is empty; the provider will reject checkouts");
        }
        let gateway: Arc<dyn PaymentGateway> = Arc::new(SnapGateway::new(cfg.snap_config())?);
        let services = BookingServices::new(
            repos,
            gateway,
            cfg.ledger_config(),
            cfg.checkout_config(),
            cfg.catalog_config(),
        );

        if opts.seed && cfg.catalog.seed_demo {
            services.catalog.seed_if_empty().await?;
        }
        services
            .catalog
            .extend_slot_window(Utc::now().date_naive())
            .await?;

        // ── Background tasks ───────────────────────────────────
        let shutdown = ShutdownCoordinator::new(cfg.server.shutdown_timeout);
        let signal = shutdown.signal();

        let background = vec![
            start_hold_expiry_task(
                services.ledger.clone(),
                signal.clone(),
                cfg.booking.sweep_interval_secs,
            ),
            start_slot_window_task(
                services.catalog.clone(),
                signal.clone(),
                cfg.catalog.refresh_interval_secs,
            ),
        ];

        // ── REST API ───────────────────────────────────────────
        let router = create_api_router(
            services.clone(),
            ApiOptions {
                db: db.clone(),
                cors_origins: cfg.server.cors_origins.clone(),
                verify_signature: cfg.payment.verify_signature,
                server_key: cfg.payment.server_key.clone(),
                metrics,
            },
        );

        let listener = tokio::net::TcpListener::bind(cfg.listen_address()).await?;
        let addr = listener.local_addr()?;
        info!("REST API listening on http://{}", addr);
        info!("Swagger UI available at http://{}/docs/", addr);

        let api_shutdown = signal.clone();
        let api_task = tokio::spawn(async move {
            let server = axum::serve(listener, router).with_graceful_shutdown(async move {
                api_shutdown.wait().await;
                info!("🛑 REST API received shutdown signal");
            });
            if let Err(e) = server.await {
                error!("REST API server error: {}", e);
            }
        });

        info!("🚀 Court booking service started");

        Ok(Self {
            services,
            config: cfg,
            port: addr.port(),
            db,
            shutdown,
            api_task,
            background,
        })
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Trigger shutdown on SIGTERM / SIGINT.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Wait for the API and background tasks to stop, bounded by the grace
    /// period, then close the database.
    pub async fn wait(self) {
        let Self {
            db,
            shutdown,
            api_task,
            background,
            ..
        } = self;

        shutdown
            .drain(async move {
                if let Err(e) = api_task.await {
                    error!("REST API task panicked: {}", e);
                }
                for task in background {
                    if let Err(e) = task.await {
                        error!("Background task panicked: {}", e);
                    }
                }
            })
            .await;

        if let Some(db) = db {
            match db.close().await {
                Ok(()) => info!("✅ Database connection closed"),
                Err(e) => warn!("Error closing database connection: {}", e),
            }
        }
        info!("👋 Court booking service stopped");
    }

    /// Trigger shutdown and wait for completion.
    pub async fn shutdown(self) {
        self.trigger_shutdown();
        self.wait().await;
    }

    pub fn is_running(&self) -> bool {
        !self.api_task.is_finished()
    }
}

/// Initialize tracing from the configuration. Call once per process.
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    let result = match config.logging.format.to_lowercase().as_str() {
        "json" => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        _ => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init(),
    };
    if let Err(e) = result {
        eprintln!("tracing already initialized: {}", e);
    }
}
