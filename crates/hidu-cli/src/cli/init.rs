use anyhow::Result;
use clap::Args;
use hidu::services::{ConfigService, StorageBackend};
use std::path::PathBuf;

#[derive(Args)]
pub struct InitArgs {
    /// Storage URI (MongoDB, local path or s3://). Defaults to a local store.
    #[arg(long, value_name = "URI")]
    storage: Option<String>,

    /// Project root directory
    #[arg(default_value = ".")]
    path: PathBuf,
}

pub async fn execute(args: InitArgs) -> Result<()> {
    let project_root = args.path;

    tokio::fs::create_dir_all(project_root.join(".hidu")).await?;

    let config_service = ConfigService::new(&project_root);
    let config = config_service.init(args.storage)?;

    // Opening the store creates the table or indexes
    let storage_uri = config_service.resolve_storage_uri(&project_root)?;
    hidu::db::open(&config.storage, &storage_uri).await?;

    println!("Initialized Hidu project at {}", project_root.display());
    println!(
        "  Storage: {} ({})",
        storage_uri,
        StorageBackend::for_uri(&storage_uri)
    );

    Ok(())
}
