#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! # warbler
//!
//! A small Twitter-style social network: users sign up, post short messages
//! ("warbles"), follow each other and like messages. Pages are server-rendered
//! HTML; state lives in SQLite.
//!
//! ## Subcommands
//!
//! - `warbler serve` (default): run the HTTP server
//! - `warbler init-db [--reset]`: create the schema, optionally dropping it first
//!
//! ## Pages
//!
//! | Method   | Path                          | Login | Description                     |
//! |----------|-------------------------------|-------|---------------------------------|
//! | GET      | `/`                           | No    | Timeline, or the landing page   |
//! | GET/POST | `/signup`, `/login`           | No    | Account forms                   |
//! | GET      | `/logout`                     | No    | End the session                 |
//! | GET      | `/users?q=`                   | No    | User search                     |
//! | GET      | `/users/{id}`                 | No    | Profile and messages            |
//! | GET      | `/users/{id}/following`       | Yes   | Who they follow                 |
//! | GET      | `/users/{id}/followers`       | Yes   | Who follows them                |
//! | GET      | `/users/{id}/likes`           | Yes   | Messages they liked             |
//! | POST     | `/users/follow/{id}`          | Yes   | Follow                          |
//! | POST     | `/users/stop-following/{id}`  | Yes   | Unfollow                        |
//! | GET/POST | `/users/profile`              | Yes   | Edit own profile                |
//! | POST     | `/users/delete`               | Yes   | Delete own account              |
//! | GET/POST | `/messages/new`               | Yes   | Post a message                  |
//! | GET      | `/messages/{id}`              | No    | One message                     |
//! | POST     | `/messages/{id}/delete`       | Owner | Delete a message                |
//! | POST     | `/messages/{id}/like`         | Yes   | Toggle a like                   |
//! | GET      | `/api/health`                 | No    | Liveness status (JSON)          |

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use warbler::config::{Config, DEFAULT_SECRET_KEY};
use warbler::{AppState, Store};

/// Twitter-style microblog server.
#[derive(Parser)]
#[command(name = "warbler", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default when no subcommand given).
    Serve {
        /// Path to TOML config file.
        #[arg(long)]
        config: Option<String>,
    },
    /// Create the database schema.
    InitDb {
        /// Path to TOML config file.
        #[arg(long)]
        config: Option<String>,
        /// Drop every table first. Destroys all data.
        #[arg(long)]
        reset: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        Some(Commands::InitDb { config, reset }) => init_db(config.as_deref(), reset).await,
        Some(Commands::Serve { config }) => run_server(config.as_deref()).await,
        None => run_server(None).await,
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("warbler: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(config_path: Option<&str>) -> Result<Config, Box<dyn std::error::Error>> {
    let config = Config::load(config_path)?;

    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| config.logging.level.clone());
    tracing_subscriber::fmt().with_env_filter(log_filter).init();
    Ok(config)
}

async fn init_db(config_path: Option<&str>, reset: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let store = Store::open(&config.database.path)?;
    if reset {
        warn!("Dropping all tables in {}", config.database.path);
        store.drop_all().await?;
    }
    store.create_all().await?;
    info!("Schema ready in {}", config.database.path);
    Ok(())
}

async fn run_server(config_path: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;

    info!("warbler v{} starting", env!("CARGO_PKG_VERSION"));
    info!("Database: {}", config.database.path);
    info!("Listening on {}", config.server.listen);

    if config.auth.secret_key == DEFAULT_SECRET_KEY {
        warn!("Using default secret key: set WARBLER_SECRET_KEY or update config");
    }
    if !config.auth.csrf_enabled {
        warn!("CSRF protection is disabled");
    }

    let store = Store::open(&config.database.path)?;
    store.create_all().await?;

    let listen = config.server.listen.clone();
    let state = AppState::new(config, store)?;
    let app = warbler::app(state);

    let listener = TcpListener::bind(&listen).await?;
    info!("Server ready");

    // Graceful shutdown
    let shutdown = async {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => info!("Received SIGINT"),
                        _ = sigterm.recv() => info!("Received SIGTERM"),
                    }
                }
                Err(e) => {
                    warn!("Failed to register SIGTERM: {e}");
                    ctrl_c.await.ok();
                    info!("Received SIGINT");
                }
            }
        }
        #[cfg(not(unix))]
        {
            ctrl_c.await.ok();
            info!("Received SIGINT");
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Goodbye");
    Ok(())
}
