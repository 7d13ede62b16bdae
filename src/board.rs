//! Boards: placements plus an append-only history of tuning versions.
//!
//! A board file is one flat table: `ReferenceID, X, Y, Angle`, then for each
//! version `Vn` a value column holding joined "value+unit" text and the
//! `Vn_Timestamp` / `Vn_Notes` metadata columns.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::LazyLock;

use log::{info, warn};
use regex::Regex;
use serde::Serialize;

use crate::bom::{compare_refs, BomEntry, BomTable};
use crate::component::Placement;
use crate::error::{Error, Result};
use crate::normalize::{join_value_unit, split_value_unit};
use crate::placement::{PlacementColumns, Placements};
use crate::reconcile::LiveEntry;
use crate::sheet::{self, CellGrid, Grid};

/// A named snapshot of value assignments.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardVersion {
    pub name: String,
    pub entries: BomTable,
    pub timestamp: Option<String>,
    pub notes: Option<String>,
}

/// One ref whose value differs between two versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionDiff {
    pub reference: String,
    /// Joined value+unit in the first version, empty when absent
    pub a: String,
    /// Joined value+unit in the second version, empty when absent
    pub b: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    name: String,
    placements: Placements,
    versions: Vec<BoardVersion>,
}

impl Board {
    /// Start a board with no versions.
    pub fn from_placements(name: impl Into<String>, placements: Placements) -> Self {
        Self {
            name: name.into(),
            placements,
            versions: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn placements(&self) -> &Placements {
        &self.placements
    }

    pub fn placement(&self, reference: &str) -> Option<&Placement> {
        self.placements.get(reference)
    }

    /// Update the stored rotation of a placed part. Returns false for an unknown ref.
    pub fn set_angle(&mut self, reference: &str, angle_deg: f64) -> bool {
        match self.placements.get_mut(reference) {
            Some(p) => {
                p.angle_deg = angle_deg;
                true
            }
            None => false,
        }
    }

    pub fn versions(&self) -> &[BoardVersion] {
        &self.versions
    }

    pub fn version(&self, name: &str) -> Option<&BoardVersion> {
        self.versions
            .iter()
            .find(|v| v.name.eq_ignore_ascii_case(name))
    }

    pub fn latest(&self) -> Option<&BoardVersion> {
        self.versions.last()
    }

    /// Name the next appended version will get.
    pub fn next_version_name(&self) -> String {
        let next = self
            .versions
            .iter()
            .filter_map(|v| version_index(&v.name))
            .max()
            .map_or(self.versions.len(), |max| (max + 1).max(self.versions.len()));
        format!("V{}", next)
    }

    /// Snapshot the live working set as a new version.
    ///
    /// Refs marked N/C, refs with neither value nor unit, and refs that are
    /// not placed on this board are left out. Earlier versions are untouched.
    pub fn append_version<I>(
        &mut self,
        live: I,
        timestamp: Option<String>,
        notes: Option<String>,
    ) -> &BoardVersion
    where
        I: IntoIterator<Item = (String, LiveEntry)>,
    {
        let mut entries = BomTable::new();
        for (reference, entry) in live {
            if entry.no_component {
                continue;
            }
            let value = entry.value.trim();
            let unit = entry.unit.trim();
            if value.is_empty() && unit.is_empty() {
                continue;
            }
            if !self.placements.contains_key(&reference) {
                warn!("{} has no placement on {}; not saved", reference, self.name);
                continue;
            }
            entries.insert(reference, BomEntry::new(value, unit));
        }

        let version = BoardVersion {
            name: self.next_version_name(),
            entries,
            timestamp: timestamp.filter(|t| !t.is_empty()),
            notes: notes.filter(|n| !n.is_empty()),
        };
        info!(
            "Saved {} on {} with {} values",
            version.name,
            self.name,
            version.entries.len()
        );

        self.versions.push(version);
        &self.versions[self.versions.len() - 1]
    }

    /// Diff two versions by name.
    pub fn diff(&self, a: &str, b: &str) -> Result<Vec<VersionDiff>> {
        let va = self
            .version(a)
            .ok_or_else(|| Error::UnknownVersion(a.to_string()))?;
        let vb = self
            .version(b)
            .ok_or_else(|| Error::UnknownVersion(b.to_string()))?;
        Ok(diff_versions(va, vb))
    }

    /// Render the board in its persisted table form.
    pub fn to_grid(&self) -> Grid {
        let mut headers: Vec<String> = ["ReferenceID", "X", "Y", "Angle"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        for version in &self.versions {
            headers.push(version.name.clone());
            headers.push(format!("{}_Timestamp", version.name));
            headers.push(format!("{}_Notes", version.name));
        }

        let mut grid = Grid::new();
        grid.push_row(headers);

        let mut refs: Vec<&String> = self.placements.keys().collect();
        refs.sort_by(|a, b| compare_refs(a, b));

        for reference in refs {
            let p = &self.placements[reference];
            let mut row = vec![
                reference.clone(),
                p.x.to_string(),
                p.y.to_string(),
                p.angle_deg.to_string(),
            ];
            for version in &self.versions {
                let value = version
                    .entries
                    .get(reference)
                    .map(|e| join_value_unit(&e.value, &e.unit))
                    .unwrap_or_default();
                row.push(value);
                row.push(version.timestamp.clone().unwrap_or_default());
                row.push(version.notes.clone().unwrap_or_default());
            }
            grid.push_row(row);
        }

        grid
    }

    /// Write the board file as CSV or .xlsx, by extension.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.to_grid().save(path)?;
        info!(
            "Wrote {} ({} placements, {} versions)",
            path.display(),
            self.placements.len(),
            self.versions.len()
        );
        Ok(())
    }

    /// Parse a persisted board table.
    pub fn from_grid<G: CellGrid + ?Sized>(name: impl Into<String>, grid: &G) -> Result<Self> {
        let name = name.into();
        let columns = PlacementColumns::resolve(grid, 0)?;
        let version_columns = VersionColumns::resolve(grid);

        let mut board = Board::from_placements(name, Placements::new());
        board.versions = version_columns
            .iter()
            .map(|vc| BoardVersion {
                name: vc.name.clone(),
                entries: BomTable::new(),
                timestamp: None,
                notes: None,
            })
            .collect();

        for row in 1..grid.row_count() {
            let Some((reference, placement)) = columns.read(grid, row) else {
                continue;
            };

            for (vc, version) in version_columns.iter().zip(board.versions.iter_mut()) {
                if let Some(raw) = grid.text(row, vc.value) {
                    let vu = split_value_unit(raw);
                    version.entries.insert(reference.clone(), BomEntry::from(vu));
                }
                // timestamp and notes come as a pair from the first row carrying either
                if version.timestamp.is_none() && version.notes.is_none() {
                    let timestamp = vc.timestamp.and_then(|c| grid.text(row, c));
                    let notes = vc.notes.and_then(|c| grid.text(row, c));
                    version.timestamp = timestamp.map(str::to_string);
                    version.notes = notes.map(str::to_string);
                }
            }

            board.placements.insert(reference, placement);
        }

        Ok(board)
    }

    /// Load a board file (CSV or workbook). The board is named after the file.
    pub fn load(path: &Path) -> Result<Self> {
        let grid = sheet::load_grid(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let board = Board::from_grid(name, &grid)?;
        info!(
            "Loaded board {} ({} placements, versions: {})",
            board.name,
            board.placements.len(),
            board
                .versions
                .iter()
                .map(|v| v.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(board)
    }
}

/// Refs whose joined value+unit text differs between two versions.
///
/// Comparison is on text, so "2.5" and "2.50" differ. A ref present in only
/// one version shows as empty on the other side.
pub fn diff_versions(a: &BoardVersion, b: &BoardVersion) -> Vec<VersionDiff> {
    let refs: BTreeSet<&String> = a.entries.refs().chain(b.entries.refs()).collect();
    let mut refs: Vec<&String> = refs.into_iter().collect();
    refs.sort_by(|x, y| compare_refs(x, y));

    let joined = |v: &BoardVersion, r: &str| {
        v.entries
            .get(r)
            .map(|e| join_value_unit(&e.value, &e.unit))
            .unwrap_or_default()
    };

    refs.into_iter()
        .filter_map(|reference| {
            let va = joined(a, reference);
            let vb = joined(b, reference);
            (va != vb).then(|| VersionDiff {
                reference: reference.clone(),
                a: va,
                b: vb,
            })
        })
        .collect()
}

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(v\d+)(?:_(timestamp|notes))?$").expect("static regex")
});

fn version_index(name: &str) -> Option<usize> {
    name.strip_prefix(['V', 'v'])?.parse().ok()
}

#[derive(Debug, Clone)]
struct VersionColumns {
    name: String,
    value: usize,
    timestamp: Option<usize>,
    notes: Option<usize>,
}

impl VersionColumns {
    /// Version column groups in the order their value columns appear.
    fn resolve<G: CellGrid + ?Sized>(grid: &G) -> Vec<Self> {
        let mut values: Vec<(String, usize)> = Vec::new();
        let mut meta: BTreeMap<(String, String), usize> = BTreeMap::new();

        for col in 0..grid.row_width(0) {
            let Some(caps) = grid.text(0, col).and_then(|h| VERSION_RE.captures(h)) else {
                continue;
            };
            let name = caps[1].to_uppercase();
            match caps.get(2) {
                Some(kind) => {
                    meta.entry((name, kind.as_str().to_lowercase()))
                        .or_insert(col);
                }
                None => {
                    if !values.iter().any(|(n, _)| *n == name) {
                        values.push((name, col));
                    }
                }
            }
        }

        values
            .into_iter()
            .map(|(name, value)| Self {
                timestamp: meta.get(&(name.clone(), "timestamp".to_string())).copied(),
                notes: meta.get(&(name.clone(), "notes".to_string())).copied(),
                name,
                value,
            })
            .collect()
    }
}
