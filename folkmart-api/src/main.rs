//! folkmart-api - Folk-artist marketplace booking service
//!
//! Serves the JSON API by default. Two operator subcommands work directly on
//! the database: `token` prints a bearer token for an existing user and
//! `promote` makes a user an admin.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use folkmart_api::booking::TransitionPolicy;
use folkmart_api::db::users;
use folkmart_api::models::Role;
use folkmart_api::{build_router, AppState, ServiceOptions};
use folkmart_common::api::auth::{issue_token, load_shared_secret};
use folkmart_common::config::{database_path, load_toml_config, resolve_root_folder};
use folkmart_common::db::init_database;

/// Command-line arguments for folkmart-api
#[derive(Parser, Debug)]
#[command(name = "folkmart-api")]
#[command(about = "Folk-artist marketplace booking service")]
#[command(version)]
struct Args {
    /// TOML config file (default: ~/.config/folkmart/config.toml)
    #[arg(short, long, env = "FOLKMART_CONFIG")]
    config: Option<PathBuf>,

    /// Folder holding folkmart.db
    #[arg(short, long, env = "FOLKMART_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "FOLKMART_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, env = "FOLKMART_BIND_ADDRESS")]
    bind: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Print a bearer token for an existing user
    Token {
        #[arg(long)]
        user: Uuid,
    },
    /// Give an existing user the admin role
    Promote {
        #[arg(long)]
        user: Uuid,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is read before tracing starts so the file can set the log level
    let toml_config = load_toml_config(args.config.as_deref());
    let level = toml_config
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Build identification immediately after tracing init
    info!(
        "Starting folkmart-api v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let toml_config = toml_config.context("Failed to load configuration")?;

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), &toml_config);
    let db_path = database_path(&root_folder);
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let shared_secret = load_shared_secret(&pool)
        .await
        .context("Failed to load shared secret")?;
    if shared_secret == 0 {
        warn!("API authentication disabled (shared_secret = 0)");
    } else {
        info!("Loaded shared secret for API authentication");
    }

    match args.command.unwrap_or(Command::Serve) {
        Command::Token { user } => {
            users::find_user(&pool, user)
                .await?
                .ok_or_else(|| anyhow!("No user with id {}", user))?;
            println!("{}", issue_token(user, shared_secret));
            Ok(())
        }
        Command::Promote { user } => {
            if !users::set_role(&pool, user, Role::Admin).await? {
                bail!("No user with id {}", user);
            }
            info!(user_id = %user, "User promoted to admin");
            Ok(())
        }
        Command::Serve => {
            let policy = match toml_config.bookings.transition_policy.parse::<TransitionPolicy>() {
                Ok(policy) => policy,
                Err(e) => {
                    warn!("{}; falling back to strict transitions", e);
                    TransitionPolicy::Strict
                }
            };
            info!("Session transition policy: {}", policy);

            let token_ttl_ms: i64 = toml_config
                .auth
                .token_ttl_hours
                .saturating_mul(3_600_000)
                .try_into()
                .unwrap_or(i64::MAX);

            let options = ServiceOptions {
                token_ttl_ms,
                transition_policy: policy,
                max_lock_wait_ms: toml_config.database.max_lock_wait_ms,
                max_duration_minutes: i64::from(toml_config.bookings.max_duration_minutes),
            };

            let state = AppState::new(pool, shared_secret, options);
            let app = build_router(state);

            let bind = args.bind.unwrap_or_else(|| toml_config.bind_address());
            let port = args.port.unwrap_or_else(|| toml_config.port());
            let addr = format!("{}:{}", bind, port);

            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind to {}", addr))?;
            info!("folkmart-api listening on http://{}", addr);
            info!("Health check: http://{}/health", addr);

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("Server error")?;

            info!("Server shutdown complete");
            Ok(())
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
