//! Per-component reconciliation of live values against a reference BOM.

use serde::Serialize;

use crate::bom::BomEntry;
use crate::component::ComponentRecord;

/// Outcome of comparing one placed component with the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
    /// No live value and none expected to be absent
    Missing,
    /// Live value differs from the reference
    Mismatch,
}

impl Status {
    pub fn label(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Missing => "MISSING",
            Status::Mismatch => "MISMATCH",
        }
    }
}

/// The live state of one ref.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LiveEntry {
    pub value: String,
    pub unit: String,
    pub no_component: bool,
}

impl LiveEntry {
    pub fn new(value: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            unit: unit.into(),
            no_component: false,
        }
    }

    pub fn no_component() -> Self {
        Self {
            no_component: true,
            ..Default::default()
        }
    }
}

impl From<&ComponentRecord> for LiveEntry {
    fn from(record: &ComponentRecord) -> Self {
        Self {
            value: record.value.clone(),
            unit: record.unit.clone(),
            no_component: record.no_component,
        }
    }
}

/// Classify a live entry against its reference entry, if any.
///
/// Rules apply in order. An N/C part is always OK. A part with no value is
/// missing (a zero-ohm part has the value "0"). A part whose reference states
/// a value and differs from it in value or unit text is a mismatch. Anything
/// else is OK, including a part the reference does not list.
pub fn classify(live: &LiveEntry, reference: Option<&BomEntry>) -> Status {
    if live.no_component {
        return Status::Ok;
    }

    if live.value.trim().is_empty() {
        return Status::Missing;
    }

    match reference.filter(|r| r.has_value()) {
        Some(r) if r.value.trim() != live.value.trim() || r.unit.trim() != live.unit.trim() => {
            Status::Mismatch
        }
        _ => Status::Ok,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_component_is_ok() {
        let reference = BomEntry::new("10", "nF");
        assert_eq!(classify(&LiveEntry::no_component(), Some(&reference)), Status::Ok);
        assert_eq!(classify(&LiveEntry::no_component(), None), Status::Ok);
    }

    #[test]
    fn test_missing_value() {
        let reference = BomEntry::new("10", "nF");
        assert_eq!(classify(&LiveEntry::default(), Some(&reference)), Status::Missing);
        assert_eq!(classify(&LiveEntry::new("", "nF"), None), Status::Missing);
    }

    #[test]
    fn test_zero_ohm_is_a_value() {
        let reference = BomEntry::new("0", "Ohms");
        assert_eq!(classify(&LiveEntry::new("0", "Ohms"), Some(&reference)), Status::Ok);
    }

    #[test]
    fn test_mismatch_on_value_or_unit() {
        let reference = BomEntry::new("4700", "Ohms");
        assert_eq!(classify(&LiveEntry::new("4700", "Ohms"), Some(&reference)), Status::Ok);
        assert_eq!(classify(&LiveEntry::new(" 4700 ", "Ohms "), Some(&reference)), Status::Ok);
        assert_eq!(classify(&LiveEntry::new("4.7", "Ohms"), Some(&reference)), Status::Mismatch);
        assert_eq!(classify(&LiveEntry::new("4700", "nF"), Some(&reference)), Status::Mismatch);
    }

    #[test]
    fn test_comparison_is_textual() {
        let reference = BomEntry::new("2.5", "nF");
        assert_eq!(classify(&LiveEntry::new("2.50", "nF"), Some(&reference)), Status::Mismatch);
    }

    #[test]
    fn test_unlisted_or_valueless_reference_is_ok() {
        assert_eq!(classify(&LiveEntry::new("1", "uF"), None), Status::Ok);
        let blank = BomEntry::new("", "");
        assert_eq!(classify(&LiveEntry::new("1", "uF"), Some(&blank)), Status::Ok);
    }
}
