//! Header row detection for schemaless spreadsheets.
//!
//! Production BOMs carry title blocks, revision tables and logos above the
//! actual table, so the header row has to be found rather than assumed.

use std::collections::BTreeMap;

use log::debug;

use crate::error::{Error, Result};
use crate::sheet::CellGrid;

/// Rows scanned for a header when nothing else is configured.
pub const DEFAULT_SCAN_ROWS: usize = 20;

/// Label keys, matched as case-insensitive substrings of header cells.
pub mod labels {
    pub const REFERENCE: &str = "reference designator";
    pub const VALUE: &str = "value";
    pub const TOLERANCE: &str = "tolerance";
    pub const SIZE: &str = "size (eia)";
    pub const RATING: &str = "rating";
    pub const TYPE: &str = "type";
    pub const UNIT: &str = "unit";
}

/// Resolved header row and the column of every label found in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMatch {
    /// 0-based row index of the header
    pub row: usize,
    columns: BTreeMap<String, usize>,
}

impl HeaderMatch {
    /// Column index for a label key, if the header row carries it.
    pub fn column(&self, label: &str) -> Option<usize> {
        self.columns.get(&label.to_lowercase()).copied()
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, usize)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Find the first row within `limit` rows holding every `required` label.
///
/// A label matches the first cell (left to right) whose trimmed, lowercased
/// text contains it. `optional` labels are picked up from the same row when
/// present and never prevent a match.
pub fn locate<G: CellGrid + ?Sized>(
    grid: &G,
    limit: usize,
    required: &[&str],
    optional: &[&str],
) -> Result<HeaderMatch> {
    let scan = limit.min(grid.row_count());

    for row in 0..scan {
        let cells: Vec<(usize, String)> = (0..grid.row_width(row))
            .filter_map(|col| grid.text(row, col).map(|t| (col, t.to_lowercase())))
            .collect();
        if cells.is_empty() {
            continue;
        }

        let find = |label: &str| -> Option<usize> {
            let key = label.to_lowercase();
            cells
                .iter()
                .find(|(_, text)| text.contains(&key))
                .map(|(col, _)| *col)
        };

        let mut columns = BTreeMap::new();
        let mut complete = true;
        for label in required {
            match find(label) {
                Some(col) => {
                    columns.insert(label.to_lowercase(), col);
                }
                None => {
                    complete = false;
                    break;
                }
            }
        }
        if !complete {
            continue;
        }

        for label in optional {
            if let Some(col) = find(label) {
                columns.insert(label.to_lowercase(), col);
            }
        }

        debug!("Header found on row {}: {:?}", row + 1, columns);
        return Ok(HeaderMatch { row, columns });
    }

    Err(Error::HeaderNotFound {
        labels: required
            .iter()
            .map(|l| format!("'{}'", l))
            .collect::<Vec<_>>()
            .join(", "),
        limit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::Grid;

    const REQUIRED: &[&str] = &[labels::REFERENCE, labels::VALUE];
    const OPTIONAL: &[&str] = &[labels::TOLERANCE, labels::SIZE, labels::RATING, labels::TYPE];

    fn sheet_with_header_at(header_row: usize) -> Grid {
        let mut grid = Grid::new();
        for i in 0..header_row {
            grid.push_row(vec![format!("Title block line {}", i)]);
        }
        grid.push_row(
            ["Item", "Qty", "Reference Designator(s)", "Value", "Tolerance", "Size (EIA)"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );
        grid.push_row(vec![
            "1".into(),
            "1".into(),
            "R1".into(),
            "4.7k".into(),
            "1%".into(),
            "0402".into(),
        ]);
        grid
    }

    #[test]
    fn test_locate_first_row() {
        let grid = sheet_with_header_at(0);
        let header = locate(&grid, DEFAULT_SCAN_ROWS, REQUIRED, OPTIONAL).unwrap();
        assert_eq!(header.row, 0);
        assert_eq!(header.column(labels::REFERENCE), Some(2));
        assert_eq!(header.column(labels::VALUE), Some(3));
        assert_eq!(header.column(labels::TOLERANCE), Some(4));
        assert_eq!(header.column(labels::SIZE), Some(5));
        assert_eq!(header.column(labels::RATING), None);
        assert_eq!(header.column(labels::TYPE), None);
    }

    #[test]
    fn test_columns_independent_of_header_position() {
        let top = locate(&sheet_with_header_at(0), DEFAULT_SCAN_ROWS, REQUIRED, OPTIONAL).unwrap();
        let lower = locate(&sheet_with_header_at(14), DEFAULT_SCAN_ROWS, REQUIRED, OPTIONAL).unwrap();
        assert_eq!(lower.row, 14);
        assert_eq!(
            top.columns().collect::<Vec<_>>(),
            lower.columns().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_header_beyond_limit() {
        let grid = sheet_with_header_at(24);
        let err = locate(&grid, DEFAULT_SCAN_ROWS, REQUIRED, OPTIONAL).unwrap_err();
        assert!(matches!(err, Error::HeaderNotFound { limit: 20, .. }));
    }

    #[test]
    fn test_requires_all_labels_in_one_row() {
        let grid = Grid::from_rows(vec![
            vec!["Reference Designator", ""],
            vec!["", "Value"],
            vec!["REFERENCE DESIGNATOR", "VALUE"],
        ]);
        let header = locate(&grid, 10, REQUIRED, OPTIONAL).unwrap();
        assert_eq!(header.row, 2);
    }

    #[test]
    fn test_empty_grid() {
        let grid = Grid::new();
        assert!(locate(&grid, 10, REQUIRED, &[]).is_err());
    }
}
