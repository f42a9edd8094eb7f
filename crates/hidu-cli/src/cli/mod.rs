mod config;
mod init;
mod item;
mod seed;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hidu::services::{ConfigService, MenuService};
use hidu::validation::Validator;
use std::path::PathBuf;

/// An initialized project: its config plus a service over its store
pub struct Project {
    pub service: MenuService,
    pub validator: Validator,
}

impl Project {
    /// Open the project rooted at the working directory
    pub async fn open() -> Result<Self> {
        let project_root = PathBuf::from(".");
        let config_service = ConfigService::new(&project_root);
        if !config_service.exists() {
            return Err(anyhow::anyhow!(
                "Hidu project not initialized. Run 'hidu init' first."
            ));
        }

        let config = config_service.load()?;
        let storage_uri = config_service.resolve_storage_uri(&project_root)?;
        tracing::info!("Opening menu store at {}", storage_uri);
        let db = hidu::db::open(&config.storage, &storage_uri).await?;

        Ok(Self {
            service: MenuService::new(db),
            validator: Validator::default(),
        })
    }
}

/// Read a JSON payload given inline or from a file
pub fn read_payload(json: Option<String>, file: Option<PathBuf>) -> Result<serde_json::Value> {
    let raw = match (json, file) {
        (Some(json), None) => json,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        _ => return Err(anyhow::anyhow!("Provide exactly one of --json or --file")),
    };
    serde_json::from_str(&raw).context("Payload is not valid JSON")
}

#[derive(Parser)]
#[command(name = "hidu")]
#[command(about = "Manage the Hidu Drinks menu", long_about = None)]
pub struct Cli {
    /// Enable verbose output (debug logs)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new Hidu project
    Init(init::InitArgs),

    /// Create a menu item
    Add(item::AddArgs),

    /// Show a menu item by its id
    Get(item::GetArgs),

    /// Partially update a menu item
    Update(item::UpdateArgs),

    /// Delete a menu item
    Remove(item::RemoveArgs),

    /// Flip a menu item's availability
    Toggle(item::ToggleArgs),

    /// List menu items
    List(item::ListArgs),

    /// List distinct categories
    Categories,

    /// Bulk import a JSON or YAML catalog
    Seed(seed::SeedArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

/// Execute the CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init(args) => init::execute(args).await,
        Commands::Add(args) => item::execute_add(args).await,
        Commands::Get(args) => item::execute_get(args).await,
        Commands::Update(args) => item::execute_update(args).await,
        Commands::Remove(args) => item::execute_remove(args).await,
        Commands::Toggle(args) => item::execute_toggle(args).await,
        Commands::List(args) => item::execute_list(args).await,
        Commands::Categories => item::execute_categories().await,
        Commands::Seed(args) => seed::execute(args).await,
        Commands::Config(args) => config::execute(args).await,
    }
}
