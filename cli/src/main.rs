//! Court booking service CLI
//!
//! ```sh
//! # default config (~/.config/court-booking/config.toml)
//! court-booking
//!
//! # custom config and port
//! court-booking --config /etc/court-booking/config.toml --port 9000
//!
//! # throwaway instance without a database
//! court-booking --in-memory
//!
//! # validate config without starting
//! court-booking --check
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use courtbook::config::AppConfig;
use courtbook::server::{init_tracing, ServerHandle, ServerOptions};

/// Court slot booking with hosted payment checkout.
#[derive(Parser, Debug)]
#[command(
    name = "court-booking",
    version,
    about = "Court slot booking service",
    long_about = "REST API for booking hourly court slots and settling payments.\n\n\
                  Default config: ~/.config/court-booking/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "COURTBOOK_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listen port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,

    /// Skip database migrations on startup.
    #[arg(long)]
    no_migrate: bool,

    /// Do not create the demo courts.
    #[arg(long)]
    no_seed: bool,

    /// Use the in-memory store instead of the database.
    #[arg(long)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(courtbook::default_config_path);
    let (mut config, load_error) = match AppConfig::load(&config_path) {
        Ok(cfg) => (cfg, None),
        Err(e) => {
            let mut cfg = AppConfig::default();
            cfg.apply_env_overrides();
            (cfg, Some(e))
        }
    };

    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }

    init_tracing(&config);
    match &load_error {
        None => info!("Configuration loaded from {}", config_path.display()),
        Some(e) => error!("Failed to load config from {}: {}. Using defaults.", config_path.display(), e),
    }

    if let Err(e) = config.validate() {
        error!("{}", e);
        return Err(e.into());
    }

    if cli.check {
        if load_error.is_some() {
            return Err(format!("cannot load {}", config_path.display()).into());
        }
        println!("✅ Configuration is valid");
        println!("   Config file : {}", config_path.display());
        println!("   Listen      : {}", config.listen_address());
        println!("   Database    : {}", config.database.url);
        println!("   Hold TTL    : {}s", config.booking.hold_ttl_secs);
        println!("   Log level   : {}", config.logging.level);
        return Ok(());
    }

    let handle = ServerHandle::start(ServerOptions {
        config,
        auto_migrate: !cli.no_migrate,
        seed: !cli.no_seed,
        in_memory: cli.in_memory,
    })
    .await?;

    handle.install_signal_handler();
    info!("🚀 Press Ctrl+C to shut down gracefully.");

    handle.shutdown_signal().wait().await;
    handle.wait().await;
    Ok(())
}
