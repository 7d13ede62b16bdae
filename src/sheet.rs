//! Cell grid abstraction over CSV files and spreadsheet workbooks.
//!
//! Everything downstream (header location, BOM building, board loading)
//! reads through [`CellGrid`], so it never cares which file format a sheet
//! came from. Rows and columns are 0-based here; messages shown to users add
//! one.

use std::fs;
use std::io::Read;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use log::debug;
use rust_xlsxwriter::Workbook;

use crate::error::{Error, Result};

/// Read access to a rectangular-ish block of text cells.
pub trait CellGrid {
    fn row_count(&self) -> usize;

    fn row_width(&self, row: usize) -> usize;

    /// Cell text, or `""` when the cell is outside the data.
    fn cell(&self, row: usize, col: usize) -> &str;

    /// Trimmed cell text, `None` when blank.
    fn text(&self, row: usize, col: usize) -> Option<&str> {
        let s = self.cell(row, col).trim();
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    }
}

/// Owned grid of text cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    rows: Vec<Vec<String>>,
}

impl Grid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows<R, C>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|r| r.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Parse CSV text. Rows may have differing widths.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut grid = Grid::new();
        for record in csv_reader.records() {
            let record = record?;
            grid.push_row(record.iter().map(str::to_string).collect());
        }

        // Excel writes a UTF-8 byte order mark in front of the first header
        if let Some(first) = grid.rows.first_mut().and_then(|r| r.first_mut()) {
            if let Some(stripped) = first.strip_prefix('\u{feff}') {
                *first = stripped.to_string();
            }
        }

        Ok(grid)
    }

    /// Serialize to CSV bytes.
    pub fn to_csv(&self) -> Result<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(Vec::new());
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer
            .into_inner()
            .map_err(|e| Error::Csv(csv::Error::from(e.into_error())))
    }

    /// Write the grid to a CSV file.
    pub fn save_csv(&self, path: &Path) -> Result<()> {
        let bytes = self.to_csv()?;
        fs::write(path, bytes).map_err(|source| Error::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the grid as the single worksheet of an .xlsx workbook.
    ///
    /// Every cell is written as text so values read back exactly as stored.
    pub fn save_xlsx(&self, path: &Path) -> Result<()> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();

        for (row, cells) in self.rows.iter().enumerate() {
            for (col, text) in cells.iter().enumerate() {
                if text.is_empty() {
                    continue;
                }
                sheet.write_string(row as u32, col as u16, text)?;
            }
        }

        workbook.save(path)?;
        debug!("Wrote {} worksheet rows to {}", self.rows.len(), path.display());
        Ok(())
    }

    /// Write CSV or .xlsx depending on the file extension.
    pub fn save(&self, path: &Path) -> Result<()> {
        match SheetFormat::writable(path) {
            Some(SheetFormat::Csv) => self.save_csv(path),
            Some(SheetFormat::Workbook) => self.save_xlsx(path),
            None => Err(Error::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

impl CellGrid for Grid {
    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn row_width(&self, row: usize) -> usize {
        self.rows.get(row).map_or(0, Vec::len)
    }

    fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map_or("", String::as_str)
    }
}

/// Supported tabular file kinds, by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Csv,
    Workbook,
}

impl SheetFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "csv" | "txt" => Some(SheetFormat::Csv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(SheetFormat::Workbook),
            _ => None,
        }
    }

    /// Format for writing. Workbooks are only written as .xlsx.
    pub fn writable(path: &Path) -> Option<Self> {
        let format = Self::from_path(path)?;
        let is_xlsx = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("xlsx"));
        match format {
            SheetFormat::Workbook if !is_xlsx => None,
            other => Some(other),
        }
    }
}

/// Load the first worksheet of a workbook, or a whole CSV file, as a grid.
pub fn load_grid(path: &Path) -> Result<Grid> {
    let format = SheetFormat::from_path(path).ok_or_else(|| Error::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;

    match format {
        SheetFormat::Csv => {
            let file = fs::File::open(path).map_err(|source| Error::Open {
                path: path.to_path_buf(),
                source,
            })?;
            let grid = Grid::from_csv_reader(file)?;
            debug!("Read {} CSV rows from {}", grid.row_count(), path.display());
            Ok(grid)
        }
        SheetFormat::Workbook => load_workbook_grid(path),
    }
}

fn load_workbook_grid(path: &Path) -> Result<Grid> {
    fs::metadata(path).map_err(|source| Error::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::EmptySheet {
            path: path.to_path_buf(),
        })??;

    // calamine ranges start at the first used cell; pad so indices stay absolute
    let (row_offset, col_offset) = range
        .start()
        .map_or((0, 0), |(r, c)| (r as usize, c as usize));

    let mut grid = Grid::new();
    for _ in 0..row_offset {
        grid.push_row(Vec::new());
    }
    for row in range.rows() {
        let mut cells = vec![String::new(); col_offset];
        cells.extend(row.iter().map(cell_text));
        grid.push_row(cells);
    }

    debug!(
        "Read {} worksheet rows from {}",
        grid.row_count(),
        path.display()
    );
    Ok(grid)
}

fn cell_text(data: &Data) -> String {
    match data {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => format_number(*f),
        Data::Int(i) => i.to_string(),
        other => other.to_string(),
    }
}

/// Render a numeric cell the way it reads in the sheet (10, not 10.0).
fn format_number(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}
