//! User settings.
//!
//! Read from `~/.pcb/bomtune/config.json`. Every field is optional; a missing
//! file means defaults.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::header::DEFAULT_SCAN_ROWS;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Rows searched for a BOM header
    pub header_scan_rows: usize,
    /// Largest X/Y drift, in coordinate-file units, still counted as the same layout
    pub layout_tolerance: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            header_scan_rows: DEFAULT_SCAN_ROWS,
            layout_tolerance: 0.1,
        }
    }
}

impl Settings {
    /// Default config location.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".pcb")
            .join("bomtune")
            .join("config.json")
    }

    /// Load from the default location.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(Error::Config {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })
            }
        };

        let settings: Settings = serde_json::from_str(&content).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        if settings.header_scan_rows == 0 {
            return Err(Error::Config {
                path: path.to_path_buf(),
                message: "header_scan_rows must be at least 1".to_string(),
            });
        }

        Ok(settings)
    }
}
