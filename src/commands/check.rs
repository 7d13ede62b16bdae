//! Check command - classify every placed part against a reference.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::style::Style, Table, Tabled};

use pcb_bomtune::config::Settings;
use pcb_bomtune::normalize::join_value_unit;
use pcb_bomtune::{Intent, Session, Status};

/// What the live values are checked against.
#[derive(Debug, Clone)]
pub enum Reference {
    /// A production BOM file
    Bom(PathBuf),
    /// A saved version of the same board
    Version(String),
}

fn symbol(status: Status) -> colored::ColoredString {
    match status {
        Status::Ok => "■".green(),
        Status::Missing => "■".red(),
        Status::Mismatch => "■".yellow(),
    }
}

/// Table row for check results.
#[derive(Tabled)]
struct CheckRow {
    #[tabled(rename = "")]
    indicator: String,
    #[tabled(rename = "Ref")]
    reference: String,
    #[tabled(rename = "Live")]
    live: String,
    #[tabled(rename = "Expected")]
    expected: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Status")]
    status: String,
}

/// JSON output for one check result.
#[derive(Serialize)]
struct CheckJson {
    reference: String,
    status: Status,
    value: String,
    unit: String,
    no_component: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    expected: Option<String>,
}

/// Execute the check command.
pub fn execute(
    board: &Path,
    version: Option<&str>,
    reference: &Reference,
    nc: &[String],
    settings: &Settings,
    json: bool,
) -> Result<()> {
    let mut session =
        Session::open(board).with_context(|| format!("Failed to load board {}", board.display()))?;

    let live_version = version
        .map(str::to_string)
        .or_else(|| session.board().latest().map(|v| v.name.clone()))
        .context("Board has no versions to check; save one with `board snapshot`")?;
    session.checkout(&live_version)?;

    match reference {
        Reference::Bom(path) => {
            session
                .load_reference(path, settings.header_scan_rows)
                .with_context(|| format!("Failed to load BOM {}", path.display()))?;
        }
        Reference::Version(name) => session.set_reference_version(name)?,
    }

    for r in nc {
        session.apply(Intent::MarkNoComponent {
            reference: r.clone(),
            angle: None,
        })?;
    }

    let statuses = session.statuses();
    let expected_of = |r: &str| {
        session
            .details(r)
            .filter(|e| e.has_value())
            .map(|e| join_value_unit(&e.value, &e.unit))
    };

    if json {
        let rows: Vec<CheckJson> = statuses
            .iter()
            .filter_map(|(r, status)| {
                let record = session.record(r)?;
                Some(CheckJson {
                    reference: r.clone(),
                    status: *status,
                    value: record.value.clone(),
                    unit: record.unit.clone(),
                    no_component: record.no_component,
                    expected: expected_of(r),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let mut ok_count = 0;
    let mut missing_count = 0;
    let mut mismatch_count = 0;

    let rows: Vec<CheckRow> = statuses
        .iter()
        .filter_map(|(r, status)| {
            let record = session.record(r)?;
            match status {
                Status::Ok => ok_count += 1,
                Status::Missing => missing_count += 1,
                Status::Mismatch => mismatch_count += 1,
            }

            let live = if record.no_component {
                "N/C".dimmed().to_string()
            } else {
                join_value_unit(&record.value, &record.unit)
            };

            Some(CheckRow {
                indicator: symbol(*status).to_string(),
                reference: r.clone(),
                live,
                expected: expected_of(r).unwrap_or_else(|| "—".to_string()),
                size: session
                    .details(r)
                    .and_then(|e| e.size_code.clone())
                    .unwrap_or_default(),
                status: status.label().to_string(),
            })
        })
        .collect();

    let against = match reference {
        Reference::Bom(path) => path.display().to_string(),
        Reference::Version(name) => name.clone(),
    };
    println!(
        "\n{} {} vs {}",
        session.board().name().bold(),
        live_version.cyan(),
        against.cyan()
    );
    println!("{}", Table::new(rows).with(Style::rounded()));
    println!(
        "{} Ok  {} Mismatch  {} Missing",
        "■".green(),
        "■".yellow(),
        "■".red()
    );

    println!();
    println!(
        "{} OK: {}, Mismatch: {}, Missing: {}",
        "Summary:".bold(),
        ok_count.to_string().green(),
        mismatch_count.to_string().yellow(),
        missing_count.to_string().red()
    );

    Ok(())
}
