//! The live working set of a board.
//!
//! A [`Session`] owns one [`Board`], the live value of every placed part and
//! the reference BOM the parts are checked against. Every mutation goes
//! through `&mut self`, so the working set has exactly one writer.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::Local;
use log::{debug, info};

use crate::board::{Board, BoardVersion};
use crate::bom::{self, compare_refs, BomEntry, BomTable};
use crate::component::ComponentRecord;
use crate::error::{Error, Result};
use crate::reconcile::{classify, LiveEntry, Status};

/// Timestamp format stored with snapshots.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A user edit to the working set.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// Set value and unit, optionally rotating the part.
    /// An empty unit with a value takes the part type's default unit.
    Edit {
        reference: String,
        value: String,
        unit: String,
        angle: Option<f64>,
    },
    MarkNoComponent {
        reference: String,
        angle: Option<f64>,
    },
    ClearNoComponent {
        reference: String,
    },
}

impl Intent {
    pub fn reference(&self) -> &str {
        match self {
            Intent::Edit { reference, .. }
            | Intent::MarkNoComponent { reference, .. }
            | Intent::ClearNoComponent { reference } => reference,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    board: Board,
    working: BTreeMap<String, ComponentRecord>,
    reference: Option<BomTable>,
}

impl Session {
    /// Start with every placed part unassigned and no reference BOM.
    pub fn new(board: Board) -> Self {
        let working = board
            .placements()
            .iter()
            .map(|(r, p)| (r.clone(), ComponentRecord::new(r.clone(), *p)))
            .collect();
        Self {
            board,
            working,
            reference: None,
        }
    }

    /// Load a board file into a fresh session.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(Board::load(path)?))
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn into_board(self) -> Board {
        self.board
    }

    pub fn record(&self, reference: &str) -> Option<&ComponentRecord> {
        self.working.get(reference)
    }

    /// Working records in natural ref order.
    pub fn records(&self) -> Vec<&ComponentRecord> {
        let mut records: Vec<&ComponentRecord> = self.working.values().collect();
        records.sort_by(|a, b| compare_refs(&a.reference, &b.reference));
        records
    }

    pub fn reference(&self) -> Option<&BomTable> {
        self.reference.as_ref()
    }

    /// Apply one edit. Returns whether the working set changed.
    pub fn apply(&mut self, intent: Intent) -> Result<bool> {
        let record = self
            .working
            .get_mut(intent.reference())
            .ok_or_else(|| Error::UnknownRef(intent.reference().to_string()))?;

        let (changed, angle) = match intent {
            Intent::Edit {
                value, unit, angle, ..
            } => {
                let value = value.trim();
                let mut unit = unit.trim();
                if unit.is_empty() && !value.is_empty() {
                    unit = record.component_type().default_unit();
                }
                if record.no_component {
                    debug!("{} is N/C; value edit ignored", record.reference);
                }
                (record.assign(value, unit), angle)
            }
            Intent::MarkNoComponent { angle, .. } => {
                let changed = !record.no_component;
                record.mark_no_component();
                (changed, angle)
            }
            Intent::ClearNoComponent { .. } => {
                let changed = record.no_component;
                record.no_component = false;
                (changed, None)
            }
        };

        let rotated = match angle {
            Some(angle) if record.placement.angle_deg != angle => {
                record.placement.angle_deg = angle;
                self.board.set_angle(&record.reference, angle);
                true
            }
            _ => false,
        };

        Ok(changed || rotated)
    }

    /// Copy BOM values onto every placed part the BOM lists.
    ///
    /// Parts marked N/C keep their override. Returns the number of parts
    /// whose value changed.
    pub fn apply_bom(&mut self, table: &BomTable) -> usize {
        let mut changed = 0;
        for record in self.working.values_mut() {
            let Some(entry) = table.get(&record.reference) else {
                continue;
            };
            if record.assign(&entry.value, &entry.unit) {
                changed += 1;
            }
        }
        info!("Applied BOM: {} values changed", changed);
        changed
    }

    /// Replace the reference BOM.
    pub fn set_reference(&mut self, table: BomTable) {
        self.reference = Some(table);
    }

    /// Use a saved version as the reference BOM.
    pub fn set_reference_version(&mut self, name: &str) -> Result<()> {
        let version = self
            .board
            .version(name)
            .ok_or_else(|| Error::UnknownVersion(name.to_string()))?;
        self.reference = Some(version.entries.clone());
        Ok(())
    }

    /// Import a production BOM as the reference. On failure the current
    /// reference is kept.
    pub fn load_reference(&mut self, path: &Path, scan_rows: usize) -> Result<&BomTable> {
        let table = bom::import(path, scan_rows)?;
        Ok(self.reference.insert(table))
    }

    /// Load a version's values into the working set. N/C overrides stay.
    pub fn checkout(&mut self, name: &str) -> Result<()> {
        let version = self
            .board
            .version(name)
            .ok_or_else(|| Error::UnknownVersion(name.to_string()))?;

        for record in self.working.values_mut() {
            match version.entries.get(&record.reference) {
                Some(entry) => record.assign(&entry.value, &entry.unit),
                None => record.assign("", ""),
            };
        }
        info!("Checked out {}", version.name);
        Ok(())
    }

    fn live_entries(&self) -> impl Iterator<Item = (String, LiveEntry)> + '_ {
        self.working
            .iter()
            .map(|(r, record)| (r.clone(), LiveEntry::from(record)))
    }

    /// Save the working set as a new board version.
    pub fn snapshot(&mut self, timestamp: Option<String>, notes: Option<String>) -> &BoardVersion {
        let live: Vec<(String, LiveEntry)> = self.live_entries().collect();
        self.board.append_version(live, timestamp, notes)
    }

    /// Snapshot stamped with the current local time.
    pub fn snapshot_now(&mut self, notes: Option<String>) -> &BoardVersion {
        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        self.snapshot(Some(timestamp), notes)
    }

    /// Status of every placed part, in natural ref order.
    pub fn statuses(&self) -> Vec<(String, Status)> {
        self.records()
            .into_iter()
            .map(|record| {
                let expected = self.reference.as_ref().and_then(|t| t.get(&record.reference));
                (
                    record.reference.clone(),
                    classify(&LiveEntry::from(record), expected),
                )
            })
            .collect()
    }

    /// Reference BOM details (tolerance, size, rating) for a part.
    pub fn details(&self, reference: &str) -> Option<&BomEntry> {
        self.reference.as_ref()?.get(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Placement;
    use crate::placement::Placements;
    use tempfile::TempDir;

    fn session() -> Session {
        let mut placements = Placements::new();
        for (i, r) in ["R1", "R2", "C3", "L1"].iter().enumerate() {
            placements.insert(
                r.to_string(),
                Placement {
                    x: i as f64,
                    y: 0.0,
                    angle_deg: 0.0,
                },
            );
        }
        Session::new(Board::from_placements("tuner", placements))
    }

    fn production() -> BomTable {
        let mut table = BomTable::new();
        table.insert("R1", BomEntry::new("4700", "Ohms"));
        table.insert("R2", BomEntry::new("0", "Ohms"));
        table.insert(
            "C3",
            BomEntry {
                tolerance: Some("10%".into()),
                size_code: Some("0402".into()),
                ..BomEntry::new("10", "nF")
            },
        );
        table
    }

    fn edit(reference: &str, value: &str, unit: &str) -> Intent {
        Intent::Edit {
            reference: reference.into(),
            value: value.into(),
            unit: unit.into(),
            angle: None,
        }
    }

    fn status(session: &Session, reference: &str) -> Status {
        session
            .statuses()
            .into_iter()
            .find(|(r, _)| r == reference)
            .map(|(_, s)| s)
            .unwrap()
    }

    #[test]
    fn test_apply_bom_and_classify() {
        let mut session = session();
        let bom = production();
        assert_eq!(session.apply_bom(&bom), 3);
        session.set_reference(bom);

        assert_eq!(status(&session, "R1"), Status::Ok);
        assert_eq!(status(&session, "R2"), Status::Ok);
        assert_eq!(status(&session, "L1"), Status::Missing);

        session.apply(edit("R1", "4.7", "Ohms")).unwrap();
        assert_eq!(status(&session, "R1"), Status::Mismatch);
    }

    #[test]
    fn test_no_component_survives_bom() {
        let mut session = session();
        session
            .apply(Intent::MarkNoComponent {
                reference: "C3".into(),
                angle: None,
            })
            .unwrap();
        let bom = production();
        session.apply_bom(&bom);
        session.set_reference(bom);

        let c3 = session.record("C3").unwrap();
        assert!(c3.no_component);
        assert_eq!(c3.value, "");
        assert_eq!(status(&session, "C3"), Status::Ok);

        session
            .apply(Intent::ClearNoComponent {
                reference: "C3".into(),
            })
            .unwrap();
        assert_eq!(status(&session, "C3"), Status::Missing);
    }

    #[test]
    fn test_edit_defaults_unit_and_rotates() {
        let mut session = session();
        let changed = session
            .apply(Intent::Edit {
                reference: "L1".into(),
                value: "3.3".into(),
                unit: "".into(),
                angle: Some(90.0),
            })
            .unwrap();
        assert!(changed);
        let l1 = session.record("L1").unwrap();
        assert_eq!((l1.value.as_str(), l1.unit.as_str()), ("3.3", "nH"));
        assert_eq!(l1.placement.angle_deg, 90.0);
        assert_eq!(session.board().placement("L1").unwrap().angle_deg, 90.0);

        assert!(!session.apply(edit("L1", "3.3", "nH")).unwrap());
    }

    #[test]
    fn test_unknown_ref() {
        let mut session = session();
        assert!(matches!(
            session.apply(edit("U1", "1", "")),
            Err(Error::UnknownRef(_))
        ));
    }

    #[test]
    fn test_snapshot_and_checkout() {
        let mut session = session();
        session.apply_bom(&production());
        session
            .apply(Intent::MarkNoComponent {
                reference: "C3".into(),
                angle: None,
            })
            .unwrap();
        let v0 = session.snapshot(None, Some("baseline".into()));
        assert_eq!(v0.name, "V0");
        assert!(!v0.entries.contains("C3"));

        session.apply(edit("R1", "5100", "Ohms")).unwrap();
        session.snapshot_now(None);
        assert!(session.board().latest().unwrap().timestamp.is_some());

        session.checkout("V0").unwrap();
        assert_eq!(session.record("R1").unwrap().value, "4700");
        assert!(session.record("C3").unwrap().no_component);

        assert!(matches!(session.checkout("V9"), Err(Error::UnknownVersion(_))));
    }

    #[test]
    fn test_reference_version_and_details() {
        let mut session = session();
        session.apply_bom(&production());
        session.snapshot(None, None);
        session.apply(edit("R2", "10", "Ohms")).unwrap();

        session.set_reference_version("V0").unwrap();
        assert_eq!(status(&session, "R2"), Status::Mismatch);
        assert_eq!(status(&session, "R1"), Status::Ok);

        session.set_reference(production());
        let details = session.details("C3").unwrap();
        assert_eq!(details.size_code.as_deref(), Some("0402"));
        assert!(session.details("L1").is_none());
    }

    #[test]
    fn test_failed_reference_load_keeps_state() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.csv");
        std::fs::write(&path, "Part,Qty\nR1,1\n").unwrap();

        let mut session = session();
        session.set_reference(production());
        assert!(session.load_reference(&path, 20).is_err());
        assert_eq!(session.reference().unwrap().len(), 3);
    }
}
