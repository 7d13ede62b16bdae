//! pcb-bomtune - BOM value normalization and tuning-version reconciliation.
//!
//! The library ingests placement (XY) data and loosely structured BOM
//! spreadsheets, normalizes component values into `(value, unit)` pairs,
//! keeps an append-only history of tuning versions per board and classifies
//! every placed component against a reference BOM.
//!
//! Everything here is plain data and pure functions, except [`session`],
//! which owns the live working set and is the single place mutations happen.

pub mod board;
pub mod bom;
pub mod component;
pub mod config;
pub mod error;
pub mod header;
pub mod normalize;
pub mod placement;
pub mod reconcile;
pub mod refs;
pub mod session;
pub mod sheet;

pub use board::{Board, BoardVersion, VersionDiff};
pub use bom::{BomEntry, BomTable};
pub use component::{ComponentRecord, ComponentType, Placement};
pub use error::{Error, Result};
pub use normalize::{normalize, TypeHint, ValueUnit};
pub use reconcile::{classify, LiveEntry, Status};
pub use session::{Intent, Session};
