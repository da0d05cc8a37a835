//! fq-gm - FarmQuest gamification store operator CLI
//!
//! Opens (creating if needed) the store in the resolved root folder, runs one
//! operation and prints its response as JSON. Failures print the public error
//! response and exit with status 1.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fq_common::config::{LoggingConfig, RootFolderInitializer, RootFolderResolver};
use fq_common::db::init_database;
use fq_common::events::EventBus;
use fq_gm::GamificationService;
use serde::Serialize;
use serde_json::{json, Value};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "fq-gm")]
#[command(about = "FarmQuest gamification store", long_about = None)]
#[command(version)]
struct Args {
    /// Root folder holding farmquest.db
    #[arg(short = 'r', long, global = true)]
    root_folder: Option<PathBuf>,

    /// TOML bootstrap configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Seed the sample mission catalog if it is empty
    Seed,

    /// List active missions, optionally with a user's progress
    Missions {
        #[arg(short, long)]
        user: Option<String>,
        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// Record progress on a mission
    Progress {
        #[arg(short, long)]
        user: String,
        #[arg(short, long)]
        mission: String,
        #[arg(short, long, allow_negative_numbers = true)]
        percentage: i64,
    },

    /// Complete a mission (idempotent)
    Complete {
        #[arg(short, long)]
        user: String,
        #[arg(short, long)]
        mission: String,
        /// Evidence payload as a JSON document
        #[arg(short, long)]
        evidence: Option<String>,
    },

    /// Show a page of the leaderboard
    Leaderboard {
        #[arg(short, long)]
        limit: Option<u64>,
        #[arg(short, long, default_value_t = 0)]
        offset: u64,
        /// Include level and profile fields
        #[arg(short, long)]
        with_users: bool,
    },

    /// List a user's badges
    Badges {
        #[arg(short, long)]
        user: String,
    },

    /// Show recent achievements across all users
    Recent {
        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// Show catalog and completion counts
    Stats,

    /// Check the leaderboard against completion facts and repair drift
    Reconcile,
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    Ok(())
}

fn to_json<T: Serialize>(value: T) -> fq_gm::Result<Value> {
    Ok(serde_json::to_value(value)?)
}

async fn run(service: &GamificationService, command: Command) -> fq_gm::Result<Value> {
    match command {
        Command::Seed => {
            let inserted = service.seed_catalog().await?;
            let total = service.catalog().count_all().await?;
            Ok(json!({ "missions_inserted": inserted, "total_missions": total }))
        }
        Command::Missions { user, limit } => {
            to_json(service.list_missions(user.as_deref(), limit).await?)
        }
        Command::Progress {
            user,
            mission,
            percentage,
        } => to_json(service.update_progress(&user, &mission, percentage).await?),
        Command::Complete {
            user,
            mission,
            evidence,
        } => {
            let evidence = evidence
                .map(|raw| {
                    serde_json::from_str::<Value>(&raw).map_err(|e| {
                        fq_gm::Error::InvalidInput(format!("evidence is not valid JSON: {}", e))
                    })
                })
                .transpose()?;
            to_json(service.complete_mission(&mission, &user, evidence).await?)
        }
        Command::Leaderboard {
            limit,
            offset,
            with_users: true,
        } => to_json(service.get_leaderboard_with_users(limit, offset).await?),
        Command::Leaderboard { limit, offset, .. } => {
            to_json(service.get_leaderboard(limit, offset).await?)
        }
        Command::Badges { user } => to_json(service.get_user_badges(&user).await?),
        Command::Recent { limit } => to_json(service.get_recent_achievements(limit).await?),
        Command::Stats => to_json(service.get_mission_stats().await?),
        Command::Reconcile => to_json(service.reconcile_leaderboard().await?),
    }
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let resolver = RootFolderResolver::new("gamification")
        .with_cli_override(args.root_folder.clone())
        .with_config_path(args.config.clone());
    let toml_config = resolver.load_config();

    init_tracing(&toml_config.logging)?;

    info!(
        "Starting FarmQuest gamification store (fq-gm) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let initializer = RootFolderInitializer::new(resolver.resolve());
    initializer
        .ensure_directory_exists()
        .context("Failed to create root folder")?;

    let db_path = initializer.database_path();
    if initializer.database_exists() {
        info!("Database: {}", db_path.display());
    } else {
        info!("Creating new database: {}", db_path.display());
    }

    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let outcome = match GamificationService::open(pool.clone(), EventBus::new(100)).await {
        Ok(service) => run(&service, args.command).await,
        Err(e) => Err(e),
    };

    pool.close().await;

    match outcome {
        Ok(value) => print_json(&value),
        Err(e) => {
            print_json(&e.to_response())?;
            std::process::exit(1);
        }
    }
}
