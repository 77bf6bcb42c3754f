//! `depot`: command-line front end for the Depot office inventory.
//!
//! Reads `depot.toml` (or the path given with `--config`), overlays `DEPOT_*`
//! environment variables, opens the SQLite preference store and runs one
//! subcommand.
//!
//! ```text
//! depot onboard
//! depot storage add --family furniture "Conference Room A" --location "3rd Floor"
//! depot achievements --check
//! ```

mod commands;
mod services;
mod settings;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use depot_core::storage::{Condition, Family};
use services::Services;
use settings::Settings;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "depot", author, version, about = "Office furniture and equipment inventory")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "depot.toml", value_name = "FILE")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Ask for notifications, resolve addresses, run the server check and mark
  /// onboarding complete.
  Onboard {
    /// Push token to report, as hex.
    #[arg(long, value_name = "HEX")]
    device_token: Option<String>,
  },
  /// Show the cached public addresses.
  Ip {
    /// Clear the cache and resolve again.
    #[arg(long)]
    refresh: bool,
  },
  /// Manage storages.
  #[command(subcommand)]
  Storage(StorageCommand),
  /// Manage the items in a storage.
  #[command(subcommand)]
  Item(ItemCommand),
  /// Inventory totals, globally or for one storage.
  Stats {
    #[arg(long, requires = "storage")]
    family:  Option<Family>,
    #[arg(long, requires = "family")]
    storage: Option<Uuid>,
  },
  /// List achievements and points.
  Achievements {
    /// Unlock anything whose requirement is now met first.
    #[arg(long)]
    check: bool,
  },
  #[command(subcommand)]
  Profile(ProfileCommand),
  /// Show the persisted redirect state.
  Redirect,
}

#[derive(Subcommand)]
pub enum StorageCommand {
  Add {
    #[arg(long)]
    family:      Family,
    name:        String,
    #[arg(long, default_value = "")]
    location:    String,
    #[arg(long, default_value = "")]
    description: String,
  },
  List {
    /// Only this family; both when omitted.
    #[arg(long)]
    family: Option<Family>,
  },
  Show {
    #[arg(long)]
    family: Family,
    id:     Uuid,
  },
  Rename {
    #[arg(long)]
    family:   Family,
    id:       Uuid,
    name:     String,
    #[arg(long)]
    location: Option<String>,
  },
  Delete {
    #[arg(long)]
    family: Family,
    id:     Uuid,
  },
}

/// Item fields settable from the command line.
#[derive(clap::Args)]
pub struct ItemFields {
  #[arg(long)]
  pub model:     Option<String>,
  #[arg(long)]
  pub condition: Option<Condition>,
  #[arg(long)]
  pub quantity:  Option<i64>,
  #[arg(long)]
  pub value:     Option<f64>,
  #[arg(long)]
  pub notes:     Option<String>,
  #[arg(long)]
  pub emoji:     Option<String>,
}

#[derive(Subcommand)]
pub enum ItemCommand {
  Add {
    #[arg(long)]
    family:   Family,
    #[arg(long)]
    storage:  Uuid,
    name:     String,
    /// Category within the family, e.g. `chairs` or `office-supplies`.
    #[arg(long)]
    category: String,
    #[command(flatten)]
    fields:   ItemFields,
  },
  Update {
    #[arg(long)]
    family:   Family,
    #[arg(long)]
    storage:  Uuid,
    #[arg(long)]
    item:     Uuid,
    #[arg(long)]
    name:     Option<String>,
    #[arg(long)]
    category: Option<String>,
    #[command(flatten)]
    fields:   ItemFields,
  },
  Remove {
    #[arg(long)]
    family:  Family,
    #[arg(long)]
    storage: Uuid,
    #[arg(long)]
    item:    Uuid,
  },
}

#[derive(Subcommand)]
pub enum ProfileCommand {
  Show,
  Set {
    #[arg(long)]
    name:     Option<String>,
    #[arg(long)]
    age:      Option<String>,
    #[arg(long)]
    position: Option<String>,
  },
  /// Forget the profile fields and photo.
  Reset {
    /// Also delete every storage.
    #[arg(long)]
    all: bool,
  },
  /// Set, show or delete the profile photo.
  Photo {
    #[arg(conflicts_with = "delete")]
    path:   Option<PathBuf>,
    #[arg(long)]
    delete: bool,
  },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let settings = Settings::load(&cli.config)?;
  let services = Services::open(settings).await?;

  match cli.command {
    Command::Onboard { device_token } => {
      commands::onboard(&services, device_token.as_deref()).await
    }
    Command::Ip { refresh } => commands::ip(&services, refresh).await,
    Command::Storage(cmd) => commands::storage(&services, cmd).await,
    Command::Item(cmd) => commands::item(&services, cmd).await,
    Command::Stats { family, storage } => commands::stats(&services, family.zip(storage)).await,
    Command::Achievements { check } => commands::achievements(&services, check).await,
    Command::Profile(cmd) => commands::profile(&services, cmd).await,
    Command::Redirect => commands::redirect(&services).await,
  }
}
