use super::Project;
use anyhow::{Context, Result};
use clap::Args;
use hidu::services::SeedMode;
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct SeedArgs {
    /// Catalog file: a JSON or YAML array of menu items
    file: PathBuf,

    /// Fail on the first id that already exists instead of skipping it
    #[arg(long)]
    strict: bool,
}

/// Parse a catalog by file extension; anything not `.yaml`/`.yml` is read as JSON
fn read_catalog(path: &Path) -> Result<Vec<Value>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    );
    if is_yaml {
        serde_yaml::from_str(&content).context("Catalog is not a YAML list of items")
    } else {
        serde_json::from_str(&content).context("Catalog is not a JSON array of items")
    }
}

pub async fn execute(args: SeedArgs) -> Result<()> {
    let entries = read_catalog(&args.file)?;
    let project = Project::open().await?;

    let mode = if args.strict {
        SeedMode::Strict
    } else {
        SeedMode::SkipExisting
    };
    let report = project
        .service
        .seed(&project.validator, entries, mode)
        .await?;

    println!(
        "Seeded {} menu items ({} skipped)",
        report.created.len(),
        report.skipped.len()
    );
    for id in &report.skipped {
        println!("  skipped existing: {}", id);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn reads_yaml_and_json_catalogs() {
        let dir = TempDir::new().unwrap();

        let yaml = dir.path().join("menu.yaml");
        std::fs::write(&yaml, "- id: cf-001\n  price: 25000\n- id: tr-001\n  price: 30000\n").unwrap();
        let entries = read_catalog(&yaml).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["id"], "cf-001");
        assert_eq!(entries[1]["price"], 30000);

        let json = dir.path().join("menu.json");
        std::fs::write(&json, r#"[{"id": "cf-001"}]"#).unwrap();
        assert_eq!(read_catalog(&json).unwrap()[0]["id"], "cf-001");
    }

    #[test]
    fn rejects_catalog_that_is_not_a_list() {
        let dir = TempDir::new().unwrap();
        let json = dir.path().join("menu.json");
        std::fs::write(&json, r#"{"id": "cf-001"}"#).unwrap();

        assert!(read_catalog(&json).is_err());
    }
}
