//! Coordinate (XY / pick-and-place) file ingestion.

use std::collections::BTreeMap;
use std::path::Path;

use log::{debug, info};

use crate::component::Placement;
use crate::error::{Error, Result};
use crate::sheet::{self, CellGrid};

/// Accepted designator headers, in priority order.
pub const REF_ALIASES: &[&str] = &["referenceid", "reference id", "reference", "ref", "designator"];
const ANGLE_ALIASES: &[&str] = &["angle", "rotation", "rot"];

pub type Placements = BTreeMap<String, Placement>;

/// Placement columns resolved from a header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementColumns {
    pub reference: usize,
    pub x: usize,
    pub y: usize,
    pub angle: Option<usize>,
}

impl PlacementColumns {
    /// Resolve from the cells of `row`, matching headers case-insensitively.
    pub fn resolve<G: CellGrid + ?Sized>(grid: &G, row: usize) -> Result<Self> {
        let headers: Vec<String> = (0..grid.row_width(row))
            .map(|c| grid.cell(row, c).trim().to_lowercase())
            .collect();
        let find = |aliases: &[&str]| -> Option<usize> {
            aliases
                .iter()
                .find_map(|alias| headers.iter().position(|h| h == alias))
        };

        let missing = || Error::HeaderNotFound {
            labels: "'ReferenceID', 'X', 'Y'".to_string(),
            limit: row + 1,
        };

        Ok(Self {
            reference: find(REF_ALIASES).ok_or_else(missing)?,
            x: find(&["x"]).ok_or_else(missing)?,
            y: find(&["y"]).ok_or_else(missing)?,
            angle: find(ANGLE_ALIASES),
        })
    }

    /// Read one data row. `None` for a blank designator or unparseable X/Y;
    /// an absent or unparseable angle reads as 0.
    pub fn read<G: CellGrid + ?Sized>(&self, grid: &G, row: usize) -> Option<(String, Placement)> {
        let reference = grid.text(row, self.reference)?;

        let x = parse_coord(grid.cell(row, self.x));
        let y = parse_coord(grid.cell(row, self.y));
        let (Some(x), Some(y)) = (x, y) else {
            debug!("Skipping malformed placement row {} ({})", row + 1, reference);
            return None;
        };

        let angle_deg = self
            .angle
            .and_then(|c| parse_coord(grid.cell(row, c)))
            .unwrap_or(0.0);

        Some((reference.to_string(), Placement { x, y, angle_deg }))
    }
}

fn parse_coord(text: &str) -> Option<f64> {
    let value: f64 = text.trim().parse().ok()?;
    value.is_finite().then_some(value)
}

/// Read placements from a grid whose first row is the header.
pub fn from_grid<G: CellGrid + ?Sized>(grid: &G) -> Result<Placements> {
    let columns = PlacementColumns::resolve(grid, 0)?;
    Ok((1..grid.row_count())
        .filter_map(|row| columns.read(grid, row))
        .collect())
}

/// Load a coordinate file (CSV or workbook).
pub fn load(path: &Path) -> Result<Placements> {
    let grid = sheet::load_grid(path)?;
    let placements = from_grid(&grid)?;
    info!("Loaded {} placements from {}", placements.len(), path.display());
    Ok(placements)
}

/// Check that two placement sets describe the same board revision.
///
/// The ref sets must be identical and every position must agree within
/// `tolerance` on both axes.
pub fn check_same_layout(a: &Placements, b: &Placements, tolerance: f64) -> Result<()> {
    let only_a: Vec<&str> = a.keys().filter(|r| !b.contains_key(*r)).map(String::as_str).collect();
    let only_b: Vec<&str> = b.keys().filter(|r| !a.contains_key(*r)).map(String::as_str).collect();
    if !only_a.is_empty() || !only_b.is_empty() {
        return Err(Error::LayoutMismatch(format!(
            "component sets differ (only in first: [{}]; only in second: [{}])",
            only_a.join(", "),
            only_b.join(", ")
        )));
    }

    for (reference, pa) in a {
        let pb = &b[reference];
        if (pa.x - pb.x).abs() > tolerance || (pa.y - pb.y).abs() > tolerance {
            return Err(Error::LayoutMismatch(format!(
                "position of {} differs: ({}, {}) vs ({}, {})",
                reference, pa.x, pa.y, pb.x, pb.y
            )));
        }
    }

    Ok(())
}
