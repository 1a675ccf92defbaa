//! Library command handlers.

use anyhow::Result;
use workdl_core::{FixReport, FixSelection, ItemKind};

use crate::bootstrap::CliContext;
use crate::commands::LibraryCommand;
use crate::error::CliError;
use crate::presentation::{print_separator, truncate_string};

pub async fn execute(ctx: &CliContext, command: LibraryCommand) -> Result<()> {
    match command {
        LibraryCommand::List => list(ctx).await,
        LibraryCommand::Remove { item } => {
            let removed = ctx.engine.remove_library_item(&item).await?;
            println!(
                "Removed {} ({}) from {}",
                removed.name,
                removed.id,
                removed.path.display()
            );
            Ok(())
        }
        LibraryCommand::Mismatches => mismatches(ctx).await,
        LibraryCommand::Fix { ids, all } => fix(ctx, ids, all).await,
    }
}

const fn kind_label(kind: ItemKind) -> &'static str {
    match kind {
        ItemKind::Map => "map",
        ItemKind::Mod => "mod",
    }
}

async fn list(ctx: &CliContext) -> Result<()> {
    let items = ctx.engine.library_items().await?;
    if items.is_empty() {
        println!("No installed items found.");
        return Ok(());
    }

    println!("Found {} installed item(s):\n", items.len());
    println!(
        "{:<12} {:<32} {:<5} {:<10} {:<24} Fix",
        "ID", "Name", "Kind", "Size", "Folder"
    );
    print_separator(92);
    for item in &items {
        println!(
            "{:<12} {:<32} {:<5} {:<10} {:<24} {}",
            truncate_string(&item.id, 12),
            truncate_string(&item.name, 31),
            kind_label(item.kind),
            item.size,
            truncate_string(&item.folder_name, 23),
            if item.needs_fix { "yes" } else { "" }
        );
    }
    Ok(())
}

async fn mismatches(ctx: &CliContext) -> Result<()> {
    let items = ctx.engine.mismatches().await?;
    if items.is_empty() {
        println!("All installed items follow the naming convention.");
        return Ok(());
    }

    println!(
        "{:<12} {:<5} {:<28} Expected",
        "ID", "Kind", "Folder"
    );
    print_separator(72);
    for item in &items {
        println!(
            "{:<12} {:<5} {:<28} {}",
            truncate_string(&item.id, 12),
            kind_label(item.kind),
            truncate_string(&item.folder_name, 27),
            item.expected_folder
        );
    }
    println!("\nRun 'workdl library fix --all' to rename them.");
    Ok(())
}

async fn fix(ctx: &CliContext, ids: Vec<String>, all: bool) -> Result<()> {
    let selection = selection_from_args(ids, all)?;
    let report = ctx.engine.fix_compatibility(&selection).await?;
    print_report(&report);
    if report.failed.is_empty() {
        Ok(())
    } else {
        Err(CliError::Failed(format!("{} item(s) could not be renamed", report.failed.len())).into())
    }
}

fn selection_from_args(ids: Vec<String>, all: bool) -> Result<FixSelection, CliError> {
    if all {
        return Ok(FixSelection::All);
    }
    if ids.is_empty() {
        return Err(CliError::Validation(
            "pass item ids to fix, or --all".to_string(),
        ));
    }
    Ok(FixSelection::from_items(&ids)?)
}

fn print_report(report: &FixReport) {
    for fixed in &report.fixed {
        println!("✓ {}: {} -> {}", fixed.id, fixed.old_name, fixed.new_name);
    }
    for failed in &report.failed {
        println!("✗ {} ({}): {}", failed.id, failed.folder_name, failed.reason);
    }
    if !report.missing.is_empty() {
        println!("Not installed: {}", report.missing.join(", "));
    }
    println!("Fixed {} item(s).", report.fixed_count);
}
