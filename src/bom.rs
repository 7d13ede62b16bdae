//! BOM tables: building them from sheets and writing them back out.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::component::ComponentType;
use crate::error::{Error, Result};
use crate::header::{self, labels, HeaderMatch};
use crate::normalize::{canonical_unit, normalize, TypeHint, ValueUnit};
use crate::refs;
use crate::sheet::{self, CellGrid, Grid};

/// Labels a production BOM header must carry.
pub const REQUIRED_LABELS: &[&str] = &[labels::REFERENCE, labels::VALUE];

/// Labels picked up from the header row when present.
pub const OPTIONAL_LABELS: &[&str] = &[
    labels::TOLERANCE,
    labels::SIZE,
    labels::RATING,
    labels::TYPE,
    labels::UNIT,
];

/// Intended value of one reference designator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BomEntry {
    /// Numeric text, possibly empty
    pub value: String,
    /// Canonical unit symbol, possibly empty
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<String>,
    /// EIA package size code (e.g., "0402")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_rating: Option<String>,
}

impl BomEntry {
    pub fn new(value: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            unit: unit.into(),
            ..Default::default()
        }
    }

    pub fn value_unit(&self) -> ValueUnit {
        ValueUnit::new(self.value.clone(), self.unit.clone())
    }

    /// Whether the entry states anything to compare against.
    pub fn has_value(&self) -> bool {
        !self.value.trim().is_empty() || !self.unit.trim().is_empty()
    }
}

impl From<ValueUnit> for BomEntry {
    fn from(vu: ValueUnit) -> Self {
        BomEntry::new(vu.value, vu.unit)
    }
}

/// Where each column sat in the sheet a table was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLayout {
    pub headers: Vec<String>,
    pub reference: usize,
    pub value: usize,
    pub unit: Option<usize>,
    pub tolerance: Option<usize>,
    pub size: Option<usize>,
    pub rating: Option<usize>,
}

/// Mapping from reference designator to [`BomEntry`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BomTable {
    entries: BTreeMap<String, BomEntry>,
    source: Option<SourceLayout>,
}

impl BomTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite an entry, returning the previous one.
    pub fn insert(&mut self, reference: impl Into<String>, entry: BomEntry) -> Option<BomEntry> {
        self.entries.insert(reference.into(), entry)
    }

    pub fn get(&self, reference: &str) -> Option<&BomEntry> {
        self.entries.get(reference)
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.entries.contains_key(reference)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BomEntry)> {
        self.entries.iter()
    }

    pub fn refs(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// Layout of the sheet this table was read from, if any.
    pub fn source(&self) -> Option<&SourceLayout> {
        self.source.as_ref()
    }

    /// Entries in natural reference order (R2 before R10).
    pub fn listing(&self) -> Vec<(&str, &BomEntry)> {
        let mut rows: Vec<(&str, &BomEntry)> =
            self.entries.iter().map(|(r, e)| (r.as_str(), e)).collect();
        rows.sort_by(|a, b| compare_refs(a.0, b.0));
        rows
    }

    /// Render as a sheet, keeping the source header layout when known.
    pub fn to_grid(&self) -> Grid {
        let (headers, layout) = match &self.source {
            Some(source) => {
                let mut headers = source.headers.clone();
                let unit = source.unit.unwrap_or_else(|| {
                    headers.push("Unit".to_string());
                    headers.len() - 1
                });
                let layout = SourceLayout {
                    headers: Vec::new(),
                    unit: Some(unit),
                    ..source.clone()
                };
                (headers, layout)
            }
            None => default_export_layout(self),
        };

        let width = headers.len();
        let mut grid = Grid::new();
        grid.push_row(headers);

        for (reference, entry) in self.listing() {
            let mut row = vec![String::new(); width];
            row[layout.reference] = reference.to_string();
            row[layout.value] = entry.value.clone();
            if let Some(col) = layout.unit {
                row[col] = entry.unit.clone();
            }
            for (col, text) in [
                (layout.tolerance, &entry.tolerance),
                (layout.size, &entry.size_code),
                (layout.rating, &entry.power_rating),
            ] {
                if let (Some(col), Some(text)) = (col, text) {
                    row[col] = text.clone();
                }
            }
            grid.push_row(row);
        }

        grid
    }

    /// Write the table as CSV or .xlsx, by extension.
    pub fn export(&self, path: &Path) -> Result<()> {
        self.to_grid().save(path)?;
        info!("Exported {} BOM entries to {}", self.len(), path.display());
        Ok(())
    }
}

impl FromIterator<(String, BomEntry)> for BomTable {
    fn from_iter<I: IntoIterator<Item = (String, BomEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
            source: None,
        }
    }
}

fn default_export_layout(table: &BomTable) -> (Vec<String>, SourceLayout) {
    let mut headers = vec![
        "Reference Designator".to_string(),
        "Value".to_string(),
        "Unit".to_string(),
    ];
    let mut layout = SourceLayout {
        headers: Vec::new(),
        reference: 0,
        value: 1,
        unit: Some(2),
        tolerance: None,
        size: None,
        rating: None,
    };

    let mut optional = |present: bool, title: &str| -> Option<usize> {
        if !present {
            return None;
        }
        headers.push(title.to_string());
        Some(headers.len() - 1)
    };
    layout.tolerance = optional(table.iter().any(|(_, e)| e.tolerance.is_some()), "Tolerance");
    layout.size = optional(table.iter().any(|(_, e)| e.size_code.is_some()), "Size (EIA)");
    layout.rating = optional(table.iter().any(|(_, e)| e.power_rating.is_some()), "Rating");

    (headers, layout)
}

/// Natural ordering of reference designators.
pub fn compare_refs(a: &str, b: &str) -> Ordering {
    natord::compare(a, b)
}

/// Decides the component family used to normalize one BOM row.
pub trait TypeClassifier {
    /// `first_ref` is the first designator listed in the row; `type_cell` and
    /// `unit_cell` are the row's "Type" and "Unit" cells when the sheet has them.
    fn hint(&self, first_ref: &str, type_cell: Option<&str>, unit_cell: Option<&str>) -> TypeHint;
}

impl<F> TypeClassifier for F
where
    F: Fn(&str, Option<&str>, Option<&str>) -> TypeHint,
{
    fn hint(&self, first_ref: &str, type_cell: Option<&str>, unit_cell: Option<&str>) -> TypeHint {
        self(first_ref, type_cell, unit_cell)
    }
}

/// The family always comes from the first designator. A "Type" cell, or
/// failing that a "Unit" cell, that names the same family only confirms it,
/// which is what lets a zero-ohm jumper through.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardClassifier;

impl TypeClassifier for StandardClassifier {
    fn hint(&self, first_ref: &str, type_cell: Option<&str>, unit_cell: Option<&str>) -> TypeHint {
        let hint = TypeHint::from_ref(first_ref);

        let stated = match type_cell.and_then(ComponentType::from_type_label) {
            Some(kind) => Some(kind),
            None => unit_cell
                .and_then(canonical_unit)
                .and_then(ComponentType::from_unit),
        };

        match stated {
            Some(kind) if kind == hint.kind => TypeHint::explicit(kind),
            Some(kind) => {
                debug!(
                    "{} is a {} but its row says {}; using the designator",
                    first_ref,
                    hint.kind.label(),
                    kind.label()
                );
                hint
            }
            None => hint,
        }
    }
}

/// Column indices [`build`] reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BomColumns {
    pub header_row: usize,
    pub reference: usize,
    pub value: usize,
    pub unit: Option<usize>,
    pub component_type: Option<usize>,
    pub tolerance: Option<usize>,
    pub size: Option<usize>,
    pub rating: Option<usize>,
}

impl BomColumns {
    /// Resolve columns from a located header.
    ///
    /// A cell reading exactly "Unit" beats substring matches such as
    /// "Unit Price". Returns `None` when a required column is missing.
    pub fn resolve<G: CellGrid + ?Sized>(grid: &G, header: &HeaderMatch) -> Option<Self> {
        let exact_unit = (0..grid.row_width(header.row)).find(|&col| {
            grid.text(header.row, col)
                .is_some_and(|t| t.eq_ignore_ascii_case(labels::UNIT))
        });

        Some(Self {
            header_row: header.row,
            reference: header.column(labels::REFERENCE)?,
            value: header.column(labels::VALUE)?,
            unit: exact_unit.or_else(|| header.column(labels::UNIT)),
            component_type: header.column(labels::TYPE),
            tolerance: header.column(labels::TOLERANCE),
            size: header.column(labels::SIZE),
            rating: header.column(labels::RATING),
        })
    }
}

/// Turn the data rows below a header into a [`BomTable`].
///
/// Rows with a blank designator cell are skipped. Every designator in a
/// multi-ref cell gets the same entry, normalized with the type of the first
/// listed ref. Later rows overwrite earlier ones for the same ref.
pub fn build<G, C>(grid: &G, columns: &BomColumns, classifier: &C) -> BomTable
where
    G: CellGrid + ?Sized,
    C: TypeClassifier + ?Sized,
{
    let mut table = BomTable::new();

    for row in columns.header_row + 1..grid.row_count() {
        let Some(ref_cell) = grid.text(row, columns.reference) else {
            continue;
        };
        let refs = refs::expand(ref_cell);
        let Some(first_ref) = refs.first() else {
            continue;
        };

        let raw_value = grid.cell(row, columns.value).trim();
        let type_cell = columns.component_type.and_then(|c| grid.text(row, c));
        let unit_cell = columns
            .unit
            .and_then(|c| grid.text(row, c))
            .filter(|u| canonical_unit(u).is_some());

        let hint = classifier.hint(first_ref, type_cell, unit_cell);

        let value = match unit_cell {
            Some(unit) if ends_in_number(raw_value) => normalize(&format!("{} {}", raw_value, unit), hint),
            _ => normalize(raw_value, hint),
        };

        let optional = |col: Option<usize>| col.and_then(|c| grid.text(row, c)).map(str::to_string);
        let entry = BomEntry {
            tolerance: optional(columns.tolerance),
            size_code: optional(columns.size),
            power_rating: optional(columns.rating),
            ..BomEntry::from(value)
        };

        for reference in refs {
            if table.insert(reference.clone(), entry.clone()).is_some() {
                debug!("Row {} overwrites earlier entry for {}", row + 1, reference);
            }
        }
    }

    table.source = Some(SourceLayout {
        headers: (0..grid.row_width(columns.header_row))
            .map(|c| grid.cell(columns.header_row, c).trim().to_string())
            .collect(),
        reference: columns.reference,
        value: columns.value,
        unit: columns.unit,
        tolerance: columns.tolerance,
        size: columns.size,
        rating: columns.rating,
    });

    table
}

fn ends_in_number(raw: &str) -> bool {
    raw.ends_with(|c: char| c.is_ascii_digit() || c == '.')
}

/// Locate the header and build a table from a grid.
pub fn from_grid<G: CellGrid + ?Sized>(grid: &G, scan_rows: usize) -> Result<BomTable> {
    let header = header::locate(grid, scan_rows, REQUIRED_LABELS, OPTIONAL_LABELS)?;
    let columns = BomColumns::resolve(grid, &header).ok_or_else(|| Error::HeaderNotFound {
        labels: REQUIRED_LABELS.join(", "),
        limit: scan_rows,
    })?;
    Ok(build(grid, &columns, &StandardClassifier))
}

/// Read a BOM spreadsheet or CSV file.
///
/// Nothing is returned unless the whole file was read and a header found.
pub fn import(path: &Path, scan_rows: usize) -> Result<BomTable> {
    let grid = sheet::load_grid(path)?;
    let table = from_grid(&grid, scan_rows)?;
    info!("Loaded {} BOM entries from {}", table.len(), path.display());
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::DEFAULT_SCAN_ROWS;
    use tempfile::TempDir;

    fn production_sheet() -> Grid {
        Grid::from_rows(vec![
            vec!["ACME Tuner Board", "", "", "", "", ""],
            vec!["Rev B", "", "", "", "", ""],
            vec!["Item", "Reference Designator", "Value", "Tolerance", "Size (EIA)", "Rating"],
            vec!["1", "R1", "4.7k", "1%", "0402", "1/16W"],
            vec!["2", "C1, C2/C3", "10nF", "10%", "0603", "50V"],
            vec!["3", "", "", "", "", ""],
            vec!["4", "C4", "0", "", "0402", ""],
            vec!["5", "R2 R3", "0R", "", "0402", ""],
            vec!["6", "L1", "3.3nH", "", "0402", ""],
            vec!["7", "C1", "22pF", "", "0402", ""],
        ])
    }

    #[test]
    fn test_build_production_bom() {
        let table = from_grid(&production_sheet(), DEFAULT_SCAN_ROWS).unwrap();

        assert_eq!(table.get("R1").unwrap().value_unit(), ("4700", "Ohms"));
        assert_eq!(table.get("R1").unwrap().tolerance.as_deref(), Some("1%"));
        assert_eq!(table.get("R1").unwrap().size_code.as_deref(), Some("0402"));
        assert_eq!(table.get("R1").unwrap().power_rating.as_deref(), Some("1/16W"));

        assert_eq!(table.get("C2").unwrap().value_unit(), ("10", "nF"));
        assert_eq!(table.get("C3").unwrap().value_unit(), ("10", "nF"));
        assert_eq!(table.get("L1").unwrap().value_unit(), ("3.3", "nH"));
    }

    #[test]
    fn test_last_row_wins() {
        let table = from_grid(&production_sheet(), DEFAULT_SCAN_ROWS).unwrap();
        let c1 = table.get("C1").unwrap();
        assert_eq!(c1.value_unit(), ("22", "pF"));
        assert_eq!(c1.tolerance, None);
    }

    #[test]
    fn test_zero_without_type_column_is_absent() {
        let table = from_grid(&production_sheet(), DEFAULT_SCAN_ROWS).unwrap();
        assert!(table.contains("C4"));
        assert!(!table.get("C4").unwrap().has_value());
        // No Type column: the ref prefix alone does not keep a zero-ohm part
        assert!(!table.get("R2").unwrap().has_value());
    }

    #[test]
    fn test_type_column_keeps_zero_ohm() {
        let grid = Grid::from_rows(vec![
            vec!["Reference Designator", "Type", "Value"],
            vec!["R2, R3", "Res", "0"],
            vec!["C4", "Cap", "0"],
            vec!["R9", "", "0"],
        ]);
        let table = from_grid(&grid, DEFAULT_SCAN_ROWS).unwrap();
        assert_eq!(table.get("R2").unwrap().value_unit(), ("0", "Ohms"));
        assert_eq!(table.get("R3").unwrap().value_unit(), ("0", "Ohms"));
        assert!(!table.get("C4").unwrap().has_value());
        assert!(!table.get("R9").unwrap().has_value());
    }

    #[test]
    fn test_type_column_never_overrides_designator() {
        let grid = Grid::from_rows(vec![
            vec!["Reference Designator", "Type", "Value"],
            vec!["R5", "Cap", "10"],
            vec!["C5, R6", "Res", "0"],
            vec!["C7, R7", "Res", "22"],
            vec!["R8", "", "0"],
        ]);
        let table = from_grid(&grid, DEFAULT_SCAN_ROWS).unwrap();

        assert_eq!(table.get("R5").unwrap().value_unit(), ("10", "Ohms"));
        // a capacitor-led row is not a jumper, whatever the Type cell says
        assert!(!table.get("C5").unwrap().has_value());
        assert!(!table.get("R6").unwrap().has_value());
        assert_eq!(table.get("C7").unwrap().value_unit(), ("22", "nF"));
        assert_eq!(table.get("R7").unwrap().value_unit(), ("22", "nF"));
        assert!(!table.get("R8").unwrap().has_value());
    }

    #[test]
    fn test_unit_column_confirms_jumper() {
        let grid = Grid::from_rows(vec![
            vec!["Reference Designator", "Value", "Unit"],
            vec!["R1", "0", "Ohms"],
            vec!["C1", "0", "Ohms"],
        ]);
        let table = from_grid(&grid, DEFAULT_SCAN_ROWS).unwrap();
        assert_eq!(table.get("R1").unwrap().value_unit(), ("0", "Ohms"));
        assert!(!table.get("C1").unwrap().has_value());
    }

    #[test]
    fn test_first_ref_governs_mixed_row() {
        let grid = Grid::from_rows(vec![
            vec!["Reference Designator", "Value"],
            vec!["C5, R5", "22"],
        ]);
        let table = from_grid(&grid, DEFAULT_SCAN_ROWS).unwrap();
        assert_eq!(table.get("R5").unwrap().value_unit(), ("22", "nF"));
    }

    #[test]
    fn test_custom_classifier() {
        let grid = Grid::from_rows(vec![
            vec!["Reference Designator", "Value"],
            vec!["X1", "0"],
        ]);
        let header = header::locate(&grid, 5, REQUIRED_LABELS, OPTIONAL_LABELS).unwrap();
        let columns = BomColumns::resolve(&grid, &header).unwrap();
        let all_resistors =
            |_: &str, _: Option<&str>, _: Option<&str>| TypeHint::explicit(ComponentType::Resistor);
        let table = build(&grid, &columns, &all_resistors);
        assert_eq!(table.get("X1").unwrap().value_unit(), ("0", "Ohms"));
    }

    #[test]
    fn test_unit_column_prefers_exact_label() {
        let grid = Grid::from_rows(vec![
            vec!["Reference Designator", "Value", "Unit Price", "Unit"],
            vec!["C1", "100", "0.02", "pF"],
        ]);
        let table = from_grid(&grid, DEFAULT_SCAN_ROWS).unwrap();
        assert_eq!(table.get("C1").unwrap().value_unit(), ("100", "pF"));
    }

    #[test]
    fn test_header_not_found() {
        let grid = Grid::from_rows(vec![vec!["Part", "Qty"], vec!["R1", "1"]]);
        assert!(matches!(
            from_grid(&grid, DEFAULT_SCAN_ROWS),
            Err(Error::HeaderNotFound { .. })
        ));
    }

    #[test]
    fn test_export_reimport_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("export.csv");

        let grid = Grid::from_rows(vec![
            vec!["Reference Designator", "Type", "Value", "Tolerance"],
            vec!["R1", "", "4.7k", "1%"],
            vec!["R2", "Res", "0", ""],
            vec!["C1", "", "2.50", ""],
            vec!["U1", "", "5", ""],
            vec!["C9", "", "0", ""],
        ]);
        let original = from_grid(&grid, DEFAULT_SCAN_ROWS).unwrap();
        original.export(&path).unwrap();

        let exported = sheet::load_grid(&path).unwrap();
        assert_eq!(
            exported.rows()[0],
            vec!["Reference Designator", "Type", "Value", "Tolerance", "Unit"]
        );
        assert_eq!(exported.rows()[1][0], "C1");

        let reimported = import(&path, DEFAULT_SCAN_ROWS).unwrap();
        assert_eq!(reimported.len(), original.len());
        for (reference, entry) in original.iter() {
            let other = reimported.get(reference).unwrap();
            assert_eq!(other.value_unit(), entry.value_unit(), "{}", reference);
        }
    }

    #[test]
    fn test_xlsx_export_reimport() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("production.xlsx");

        let original = from_grid(&production_sheet(), DEFAULT_SCAN_ROWS).unwrap();
        original.export(&path).unwrap();

        let reimported = import(&path, DEFAULT_SCAN_ROWS).unwrap();
        assert_eq!(reimported.len(), original.len());
        assert_eq!(reimported.get("R1").unwrap().value_unit(), ("4700", "Ohms"));
        assert_eq!(reimported.get("R1").unwrap().tolerance.as_deref(), Some("1%"));
        assert_eq!(reimported.get("C3").unwrap().value_unit(), ("10", "nF"));
    }

    #[test]
    fn test_default_export_layout() {
        let mut table = BomTable::new();
        table.insert("R10", BomEntry::new("1", "Ohms"));
        table.insert("R2", BomEntry::new("2", "Ohms"));
        let grid = table.to_grid();
        assert_eq!(grid.rows()[0], vec!["Reference Designator", "Value", "Unit"]);
        assert_eq!(grid.rows()[1], vec!["R2", "2", "Ohms"]);
        assert_eq!(grid.rows()[2], vec!["R10", "1", "Ohms"]);
    }
}
