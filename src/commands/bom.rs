//! BOM commands - inspect and export normalized production BOMs.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::style::Style, Table, Tabled};

use pcb_bomtune::bom;
use pcb_bomtune::config::Settings;

/// Table row for a BOM listing.
#[derive(Tabled)]
struct BomRow {
    #[tabled(rename = "Ref")]
    reference: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Unit")]
    unit: String,
    #[tabled(rename = "Tolerance")]
    tolerance: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Rating")]
    rating: String,
}

/// JSON output for one BOM entry.
#[derive(Serialize)]
struct BomEntryJson<'a> {
    reference: &'a str,
    #[serde(flatten)]
    entry: &'a bom::BomEntry,
}

/// Execute the BOM show command.
pub fn execute_show(path: &Path, settings: &Settings, json: bool) -> Result<()> {
    let table = bom::import(path, settings.header_scan_rows)
        .with_context(|| format!("Failed to load BOM {}", path.display()))?;

    if json {
        let rows: Vec<BomEntryJson> = table
            .listing()
            .into_iter()
            .map(|(reference, entry)| BomEntryJson { reference, entry })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if table.is_empty() {
        println!("{} No BOM entries found", "✗".red());
        return Ok(());
    }

    let dash = || "—".to_string();
    let rows: Vec<BomRow> = table
        .listing()
        .into_iter()
        .map(|(reference, entry)| BomRow {
            reference: reference.to_string(),
            value: if entry.has_value() {
                entry.value.clone()
            } else {
                "absent".dimmed().to_string()
            },
            unit: entry.unit.clone(),
            tolerance: entry.tolerance.clone().unwrap_or_else(dash),
            size: entry.size_code.clone().unwrap_or_else(dash),
            rating: entry.power_rating.clone().unwrap_or_else(dash),
        })
        .collect();

    println!("\n{}", Table::new(rows).with(Style::rounded()));

    let absent = table.iter().filter(|(_, e)| !e.has_value()).count();
    println!(
        "\n{} {} refs, {} without a value",
        "Summary:".bold(),
        table.len().to_string().green(),
        absent.to_string().yellow()
    );

    Ok(())
}

/// Execute the BOM export command.
pub fn execute_export(path: &Path, output: &Path, settings: &Settings) -> Result<()> {
    let table = bom::import(path, settings.header_scan_rows)
        .with_context(|| format!("Failed to load BOM {}", path.display()))?;

    table
        .export(output)
        .context("Failed to write output file")?;

    println!(
        "{} Exported {} refs to {}",
        "✓".green().bold(),
        table.len(),
        output.display().to_string().cyan()
    );

    Ok(())
}
