//! # roster-bridge
//!
//! CLI for mirroring LMS course rosters into chat channels.
//!
//! ## Commands
//!
//! - `import`: Load a roster snapshot (JSON) into the local database
//! - `sync`: Sync every pending course
//! - `course`: Sync one course right now
//! - `set-course-sync`: Flag or unflag a course for the next sync pass
//! - `set-event-sync`: Toggle event-based sync for a course
//! - `set-role-sync`: Toggle channel subscriptions for a role
//! - `status`: Show per-course sync state and role flags
//! - `link-account`: Verify a user's own chat credentials
//! - `serve`: Run the periodic sync task in the foreground
//!
//! ## Example
//!
//! ```bash
//! # Load the roster exported from the LMS
//! roster-bridge import roster.json
//!
//! # Flag the relevant role, then sync one course immediately
//! roster-bridge set-role-sync --role 5 --required true
//! roster-bridge course 42
//!
//! # Inspect the outcome
//! roster-bridge status
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use bridge_core::config::Config;
use bridge_core::storage::SqliteStorage;
use bridge_core::transport::HttpTransport;

mod commands;

use commands::{import, link, serve, status, sync};

/// Mirror LMS course group membership into chat channels.
#[derive(Parser, Debug)]
#[command(name = "roster-bridge")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true, default_value = "bridge.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load a roster snapshot (JSON) into the local database
    Import {
        /// Path to the snapshot file
        file: PathBuf,
    },

    /// Sync every pending course
    Sync,

    /// Sync one course right now
    Course {
        /// Course to sync
        course: i64,
    },

    /// Flag or unflag a course for the next sync pass
    SetCourseSync {
        /// Course to change
        #[arg(long)]
        course: i64,

        /// New flag value
        #[arg(long, action = clap::ArgAction::Set)]
        pending: bool,
    },

    /// Toggle event-based sync for a course
    SetEventSync {
        /// Course to change
        #[arg(long)]
        course: i64,

        /// New flag value
        #[arg(long, action = clap::ArgAction::Set)]
        enabled: bool,
    },

    /// Toggle channel subscriptions for members holding a role
    SetRoleSync {
        /// Role to change
        #[arg(long)]
        role: i64,

        /// New flag value
        #[arg(long, action = clap::ArgAction::Set)]
        required: bool,
    },

    /// Show per-course sync state and role flags
    Status,

    /// Verify a user's own chat credentials against the backend
    LinkAccount {
        /// Chat username to log in with
        #[arg(long)]
        username: String,

        /// Password (will prompt if not provided)
        #[arg(long)]
        password: Option<String>,
    },

    /// Run the periodic sync task in the foreground
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config = Config::from_file(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;

    let storage = SqliteStorage::new(&config.storage.database)
        .await
        .context("Failed to open the bridge database")?;

    match cli.command {
        Commands::Import { file } => {
            import::run(&storage, &file).await?;
        }
        Commands::Sync => {
            let transport = Arc::new(HttpTransport::new(config.chat.instance_url()));
            sync::run(&config, &storage, transport, None).await?;
        }
        Commands::Course { course } => {
            let transport = Arc::new(HttpTransport::new(config.chat.instance_url()));
            sync::run(&config, &storage, transport, Some(course)).await?;
        }
        Commands::SetCourseSync { course, pending } => {
            bridge_core::ops::set_course_sync(&storage, course, pending).await?;
            println!(
                "course {} is now {}flagged for sync",
                course,
                if pending { "" } else { "not " }
            );
        }
        Commands::SetEventSync { course, enabled } => {
            bridge_core::ops::set_event_based_sync(&storage, course, enabled).await?;
            println!(
                "event-based sync for course {} is now {}",
                course,
                if enabled { "on" } else { "off" }
            );
        }
        Commands::SetRoleSync { role, required } => {
            bridge_core::ops::set_role_sync(&storage, role, required).await?;
            println!(
                "role {} is now {}synced to channels",
                role,
                if required { "" } else { "not " }
            );
        }
        Commands::Status => {
            status::run(&storage).await?;
        }
        Commands::LinkAccount { username, password } => {
            let transport = Arc::new(HttpTransport::new(config.chat.instance_url()));
            link::run(&config, transport, &username, password.as_deref()).await?;
        }
        Commands::Serve => {
            serve::run(config, storage).await?;
        }
    }

    Ok(())
}
