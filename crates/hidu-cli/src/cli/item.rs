use super::{read_payload, Project};
use anyhow::Result;
use clap::Args;
use hidu::services::{MenuFilters, MenuItem};
use std::path::PathBuf;

#[derive(Args)]
pub struct AddArgs {
    /// Item as a JSON object
    #[arg(long, conflicts_with = "file")]
    json: Option<String>,

    /// Read the item from a JSON file
    #[arg(long)]
    file: Option<PathBuf>,
}

#[derive(Args)]
pub struct GetArgs {
    /// Business id (e.g. cf-001)
    id: String,
}

#[derive(Args)]
pub struct UpdateArgs {
    /// Business id
    id: String,

    /// Fields to change as a JSON object
    #[arg(long)]
    json: String,
}

#[derive(Args)]
pub struct RemoveArgs {
    /// Business id
    id: String,
}

#[derive(Args)]
pub struct ToggleArgs {
    /// Business id
    id: String,
}

#[derive(Args)]
pub struct ListArgs {
    /// Only items in this category
    #[arg(long)]
    category: Option<String>,

    /// Only available (true) or unavailable (false) items
    #[arg(long)]
    available: Option<bool>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

fn print_item(item: &MenuItem) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(item)?);
    Ok(())
}

fn format_price(item: &MenuItem) -> String {
    match item.price_large {
        Some(large) => format!("{} / {}", item.price, large),
        None => item.price.to_string(),
    }
}

pub async fn execute_add(args: AddArgs) -> Result<()> {
    let project = Project::open().await?;
    let payload = read_payload(args.json, args.file)?;

    let input = project.validator.parse_create(payload)?;
    let item = project.service.create_item(input).await?;

    println!("Added menu item: {}", item.business_id);
    print_item(&item)
}

pub async fn execute_get(args: GetArgs) -> Result<()> {
    let project = Project::open().await?;
    let item = project.service.get_item(&args.id).await?;
    print_item(&item)
}

pub async fn execute_update(args: UpdateArgs) -> Result<()> {
    let project = Project::open().await?;
    let payload = read_payload(Some(args.json), None)?;

    let patch = project.validator.parse_update(payload)?;
    let item = project.service.update_item(&args.id, patch).await?;

    println!("Updated menu item: {}", item.business_id);
    print_item(&item)
}

pub async fn execute_remove(args: RemoveArgs) -> Result<()> {
    let project = Project::open().await?;
    project.service.delete_item(&args.id).await?;
    println!("Removed menu item: {}", args.id);
    Ok(())
}

pub async fn execute_toggle(args: ToggleArgs) -> Result<()> {
    let project = Project::open().await?;
    let item = project.service.toggle_availability(&args.id).await?;
    println!(
        "{} is now {}",
        item.business_id,
        if item.is_available { "available" } else { "unavailable" }
    );
    Ok(())
}

pub async fn execute_list(args: ListArgs) -> Result<()> {
    let project = Project::open().await?;
    let filters = MenuFilters {
        category: args.category,
        is_available: args.available,
    };
    let items = project.service.list_items(filters).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    println!("Found {} menu items:", items.len());
    for item in items {
        println!(
            "  {:<10} {:<28} {:<12} {:>14}{}",
            item.business_id,
            item.name,
            item.category,
            format_price(&item),
            if item.is_available { "" } else { "  (unavailable)" }
        );
    }
    Ok(())
}

pub async fn execute_categories() -> Result<()> {
    let project = Project::open().await?;
    for category in project.service.list_categories().await? {
        println!("{}", category);
    }
    Ok(())
}
