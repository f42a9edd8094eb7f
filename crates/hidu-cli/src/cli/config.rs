use anyhow::Result;
use clap::{Args, Subcommand};
use hidu::services::ConfigService;
use std::path::PathBuf;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Get a configuration value
    Get {
        /// Configuration key (e.g. storage.uri)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Configuration value
        value: String,
    },
}

pub async fn execute(args: ConfigArgs) -> Result<()> {
    let project_root = PathBuf::from(".");
    let config_service = ConfigService::new(&project_root);

    if !config_service.exists() {
        return Err(anyhow::anyhow!(
            "Hidu project not initialized. Run 'hidu init' first."
        ));
    }

    match args.command {
        ConfigCommands::Get { key } => {
            println!("{}", config_service.get(&key)?);
        },

        ConfigCommands::Set { key, value } => {
            config_service.set(&key, value.clone())?;
            println!("Set {} = {}", key, value);
        },
    }

    Ok(())
}
