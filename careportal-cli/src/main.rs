//! CarePortal - session client for the healthcare portal
//!
//! Every invocation behaves like one application start: storage is opened,
//! the session is hydrated, then the requested command runs.

mod commands;
mod config;
mod mint;

use std::sync::Arc;

use clap::Parser;
use tracing::{debug, error, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use careportal_session::storage::{FileStorage, StorageMedium};
use careportal_session::PortalContext;

use commands::{ConsoleNavigator, MintArgs};
use config::{Args, Command};
use mint::MintInput;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("careportal={0},careportal_session={0}", log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    debug!("======================================");
    debug!("  CarePortal session client");
    debug!("======================================");
    debug!("API: {}", args.api_url);
    debug!("Session key: {}", args.session_key);

    // Client storage is optional: without it every session is ephemeral
    let medium: Option<Arc<dyn StorageMedium>> = match args.storage_dir() {
        Some(dir) => match FileStorage::open(&dir) {
            Ok(storage) => {
                debug!("Storage: {}", dir.display());
                Some(Arc::new(storage))
            }
            Err(e) => {
                warn!("Storage unavailable at {} (continuing without): {}", dir.display(), e);
                None
            }
        },
        None => {
            debug!("Storage: disabled");
            None
        }
    };

    let ctx = PortalContext::new(args.portal_config(), medium, Arc::new(ConsoleNavigator))?;
    let outcome = ctx.start();
    debug!(?outcome, "Hydrated");

    match args.command {
        Command::Inspect { token, within } => commands::inspect(&token, within),
        Command::Status => commands::status(&ctx),
        Command::Import { file } => commands::import(&ctx, &file),
        Command::Login { email, password } => {
            let backend = commands::backend(&args.api_url);
            commands::login(&ctx, backend.as_ref(), &email, &password).await
        }
        Command::Logout => commands::logout(&ctx),
        Command::Guard { path, roles, public } => commands::guard(&ctx, &path, roles, public),
        Command::Mint {
            role,
            user_id,
            name,
            ttl,
            no_expiry,
            secret,
            save,
        } => commands::mint(
            &ctx,
            MintArgs {
                input: MintInput {
                    role,
                    user_id,
                    name,
                    ttl_seconds: (!no_expiry).then_some(ttl),
                },
                secret,
                save,
            },
        ),
        Command::Meeting { url, join } => {
            commands::meeting(&ctx, commands::backend(&args.api_url), &url, join).await
        }
    }
}
