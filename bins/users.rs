use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use serde::Serialize;
use tracing::info;

use common::utils::logging::{init_logging, LogFormat};
use configs::AppConfig;
use models::{User, UserId};
use service::{ServiceError, SharedUserStore};

#[derive(Parser)]
#[command(name = "users")]
#[command(version, about = "Inspect and edit the JSON-backed user store")]
struct Cli {
    /// Config file (defaults to $CONFIG_PATH, then config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Snapshot file, overriding the configured one
    #[arg(long)]
    snapshot: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print every user keyed by id
    #[command(alias = "ls")]
    List,

    /// Print one user
    Get { id: UserId },

    /// Create a user and print it with its new id
    Create { first_name: String, last_name: String },

    /// Replace both names of an existing user
    Update { id: UserId, first_name: String, last_name: String },

    /// Delete a user
    #[command(alias = "rm")]
    Delete { id: UserId },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(configs::config_path);
    let mut cfg = AppConfig::load_or_default(&config_path)?;
    cfg.normalize_and_validate_with(cli.snapshot)?;

    // Logging
    let format = LogFormat::from_name(&cfg.logging.format).unwrap_or_default();
    init_logging(format, cfg.logging.filter.as_deref());

    if cfg.store.create_parent_dirs {
        service::runtime::ensure_env(&cfg.store.snapshot_path).await?;
    }

    let store = SharedUserStore::open(&cfg.store.snapshot_path).await;
    info!(snapshot = %cfg.store.snapshot_path.display(), "user store ready");

    run(&store, cli.command).await
}

async fn run(store: &SharedUserStore, command: Command) -> anyhow::Result<()> {
    match command {
        Command::List => print_json(&store.list().await),
        Command::Get { id } => {
            let user = store.get(id).await.ok_or_else(|| user_not_found(id))?;
            print_json(&user)
        }
        Command::Create { first_name, last_name } => {
            let user = store.create(first_name, last_name).await?;
            store.try_save().await?;
            info!(user_id = %user.id, "created");
            print_json(&user)
        }
        Command::Update { id, first_name, last_name } => {
            let user = User { id, first_name: first_name.clone(), last_name: last_name.clone() };
            if !store.update(id, first_name, last_name).await {
                return Err(user_not_found(id).into());
            }
            store.try_save().await?;
            info!(user_id = %id, "updated");
            print_json(&user)
        }
        Command::Delete { id } => {
            if !store.delete(id).await {
                return Err(user_not_found(id).into());
            }
            store.try_save().await?;
            info!(user_id = %id, "deleted");
            print_json(&serde_json::json!({ "deleted": id }))
        }
    }
}

fn user_not_found(id: UserId) -> ServiceError {
    ServiceError::not_found(&format!("user {id}"))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
