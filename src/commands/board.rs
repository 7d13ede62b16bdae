//! Board commands - create board files, snapshot tuning versions, diff them.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use colored::Colorize;
use serde::Serialize;
use tabled::{
    settings::{object::Columns, style::Style, Alignment, Modify},
    Table, Tabled,
};

use pcb_bomtune::bom::{self, compare_refs};
use pcb_bomtune::config::Settings;
use pcb_bomtune::normalize::{join_value_unit, normalize, TypeHint};
use pcb_bomtune::placement;
use pcb_bomtune::{Board, ComponentType, Intent, Placement, Session};

/// Edits applied before a snapshot is saved.
#[derive(Debug, Default)]
pub struct SnapshotOptions {
    /// Version to start from (default: latest)
    pub from: Option<String>,
    /// Production BOM applied to the working set
    pub bom: Option<PathBuf>,
    /// `REF=VALUE` assignments
    pub set: Vec<String>,
    /// Resistors fitted as zero-ohm jumpers
    pub jumper: Vec<String>,
    /// Refs marked N/C
    pub nc: Vec<String>,
    pub notes: Option<String>,
}

/// Table row for a board listing.
#[derive(Tabled)]
struct PlacementRow {
    #[tabled(rename = "Ref")]
    reference: String,
    #[tabled(rename = "X")]
    x: String,
    #[tabled(rename = "Y")]
    y: String,
    #[tabled(rename = "Angle")]
    angle: String,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled)]
struct VersionRow {
    #[tabled(rename = "Version")]
    name: String,
    #[tabled(rename = "Values")]
    count: usize,
    #[tabled(rename = "Timestamp")]
    timestamp: String,
    #[tabled(rename = "Notes")]
    notes: String,
}

#[derive(Tabled)]
struct DiffRow {
    #[tabled(rename = "Ref")]
    reference: String,
    #[tabled(rename = "From")]
    a: String,
    #[tabled(rename = "To")]
    b: String,
}

/// JSON output for one placed part.
#[derive(Serialize)]
struct PlacementJson<'a> {
    reference: &'a str,
    #[serde(flatten)]
    placement: &'a Placement,
    value: String,
}

fn load_board(path: &Path) -> Result<Board> {
    Board::load(path).with_context(|| format!("Failed to load board {}", path.display()))
}

/// Execute the board create command.
pub fn execute_create(xy: &Path, output: &Path) -> Result<()> {
    if output.exists() {
        bail!(
            "{} already exists; refusing to overwrite its version history",
            output.display()
        );
    }

    let placements = placement::load(xy)
        .with_context(|| format!("Failed to load coordinate file {}", xy.display()))?;
    if placements.is_empty() {
        bail!("No placements found in {}", xy.display());
    }

    let name = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "board".to_string());
    let board = Board::from_placements(name, placements);
    board.save(output).context("Failed to write board file")?;

    println!(
        "{} Created {} with {} placements",
        "✓".green().bold(),
        output.display().to_string().cyan(),
        board.placements().len()
    );

    Ok(())
}

/// Execute the board show command.
pub fn execute_show(path: &Path, version: Option<&str>, json: bool) -> Result<()> {
    let board = load_board(path)?;

    let shown = match version {
        Some(name) => Some(
            board
                .version(name)
                .with_context(|| format!("Board has no version '{}'", name))?,
        ),
        None => board.latest(),
    };

    let mut refs: Vec<&String> = board.placements().keys().collect();
    refs.sort_by(|a, b| compare_refs(a, b));

    let value_of = |reference: &str| -> String {
        shown
            .and_then(|v| v.entries.get(reference))
            .map(|e| join_value_unit(&e.value, &e.unit))
            .unwrap_or_default()
    };

    if json {
        let rows: Vec<PlacementJson> = refs
            .iter()
            .map(|r| PlacementJson {
                reference: r,
                placement: &board.placements()[*r],
                value: value_of(r),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let rows: Vec<PlacementRow> = refs
        .iter()
        .map(|r| {
            let p = &board.placements()[*r];
            PlacementRow {
                reference: r.to_string(),
                x: p.x.to_string(),
                y: p.y.to_string(),
                angle: p.angle_deg.to_string(),
                value: value_of(r),
            }
        })
        .collect();

    println!(
        "\n{} {}",
        board.name().bold(),
        shown
            .map(|v| format!("({})", v.name))
            .unwrap_or_else(|| "(no versions)".to_string())
            .dimmed()
    );
    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..=3)).with(Alignment::right()))
        .to_string();
    println!("{}", table);

    if !board.versions().is_empty() {
        let versions: Vec<VersionRow> = board
            .versions()
            .iter()
            .map(|v| VersionRow {
                name: v.name.clone(),
                count: v.entries.len(),
                timestamp: v.timestamp.clone().unwrap_or_default(),
                notes: v.notes.clone().unwrap_or_default(),
            })
            .collect();
        println!("\n{}", Table::new(versions).with(Style::rounded()));
    }

    Ok(())
}

/// Split a `REF=VALUE` argument.
fn parse_assignment(arg: &str) -> Result<(String, String)> {
    match arg.split_once('=') {
        Some((reference, value)) if !reference.trim().is_empty() => {
            Ok((reference.trim().to_string(), value.trim().to_string()))
        }
        _ => bail!("Expected REF=VALUE, got '{}'", arg),
    }
}

/// Edit for a `REF=VALUE` argument. The family comes from the ref prefix,
/// so a bare "0" reads as no value; jumpers go through [`jumper_intent`].
fn assignment_intent(arg: &str) -> Result<Intent> {
    let (reference, raw) = parse_assignment(arg)?;
    let vu = normalize(&raw, TypeHint::from_ref(&reference));
    Ok(Intent::Edit {
        reference,
        value: vu.value,
        unit: vu.unit,
        angle: None,
    })
}

/// Edit fitting a zero-ohm jumper on a resistor ref.
fn jumper_intent(reference: &str) -> Result<Intent> {
    let reference = reference.trim();
    if ComponentType::from_ref(reference) != ComponentType::Resistor {
        bail!("{} is not a resistor; only R refs can be jumpers", reference);
    }
    let vu = normalize("0", TypeHint::explicit(ComponentType::Resistor));
    Ok(Intent::Edit {
        reference: reference.to_string(),
        value: vu.value,
        unit: vu.unit,
        angle: None,
    })
}

/// Execute the board snapshot command.
pub fn execute_snapshot(path: &Path, options: &SnapshotOptions, settings: &Settings) -> Result<()> {
    let mut session = Session::open(path).with_context(|| format!("Failed to load board {}", path.display()))?;

    let base = options
        .from
        .clone()
        .or_else(|| session.board().latest().map(|v| v.name.clone()));
    if let Some(name) = &base {
        session.checkout(name)?;
    }

    if let Some(bom_path) = &options.bom {
        let table = bom::import(bom_path, settings.header_scan_rows)
            .with_context(|| format!("Failed to load BOM {}", bom_path.display()))?;
        let changed = session.apply_bom(&table);
        println!(
            "{} Applied {} ({} values changed)",
            "✓".green(),
            bom_path.display(),
            changed
        );
        session.set_reference(table);
    }

    for arg in &options.set {
        session.apply(assignment_intent(arg)?)?;
    }

    for reference in &options.jumper {
        session.apply(jumper_intent(reference)?)?;
    }

    for reference in &options.nc {
        session.apply(Intent::MarkNoComponent {
            reference: reference.clone(),
            angle: None,
        })?;
    }

    let version = session.snapshot_now(options.notes.clone());
    let (name, count) = (version.name.clone(), version.entries.len());

    session
        .board()
        .save(path)
        .context("Failed to write board file")?;

    println!(
        "{} Saved {} ({} values) to {}",
        "✓".green().bold(),
        name.bold(),
        count,
        path.display().to_string().cyan()
    );

    Ok(())
}

/// Execute the board diff command.
pub fn execute_diff(path: &Path, a: &str, b: &str, json: bool) -> Result<()> {
    let board = load_board(path)?;
    let diff = board.diff(a, b)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&diff)?);
        return Ok(());
    }

    if diff.is_empty() {
        println!("{} {} and {} are identical", "✓".green(), a, b);
        return Ok(());
    }

    let rows: Vec<DiffRow> = diff
        .into_iter()
        .map(|d| DiffRow {
            reference: d.reference,
            a: if d.a.is_empty() { "—".to_string() } else { d.a },
            b: if d.b.is_empty() { "—".to_string() } else { d.b },
        })
        .collect();
    let count = rows.len();

    println!("\n{} {} → {}", board.name().bold(), a.cyan(), b.cyan());
    println!("{}", Table::new(rows).with(Style::rounded()));

    println!("\n{} {} refs differ", "Summary:".bold(), count.to_string().yellow());

    Ok(())
}

/// Execute the board check-xy command.
pub fn execute_check_xy(path: &Path, xy: &Path, settings: &Settings) -> Result<()> {
    let board = load_board(path)?;
    let placements = placement::load(xy)
        .with_context(|| format!("Failed to load coordinate file {}", xy.display()))?;

    match placement::check_same_layout(board.placements(), &placements, settings.layout_tolerance) {
        Ok(()) => {
            println!(
                "{} {} matches {} ({} placements)",
                "✓".green().bold(),
                xy.display(),
                board.name(),
                placements.len()
            );
            Ok(())
        }
        Err(e) => {
            println!("{} {}", "✗".red().bold(), e);
            bail!("Coordinate file does not match board {}", board.name())
        }
    }
}
