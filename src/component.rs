//! Component classification and placement records.

use serde::{Deserialize, Serialize};

/// Canonical unit symbols produced by the normalizer.
pub const OHMS: &str = "Ohms";
pub const PICOFARAD: &str = "pF";
pub const NANOFARAD: &str = "nF";
pub const MICROFARAD: &str = "uF";
pub const PICOHENRY: &str = "pH";
pub const NANOHENRY: &str = "nH";
pub const MICROHENRY: &str = "uH";

/// Component family, as far as value normalization is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    Resistor,
    Capacitor,
    Inductor,
    Unknown,
}

impl ComponentType {
    /// Classify a reference designator by its first character.
    pub fn from_ref(reference: &str) -> Self {
        match reference.trim().chars().next().map(|c| c.to_ascii_uppercase()) {
            Some('R') => ComponentType::Resistor,
            Some('C') => ComponentType::Capacitor,
            Some('L') => ComponentType::Inductor,
            _ => ComponentType::Unknown,
        }
    }

    /// Classify the text of a BOM "Type" cell ("Res", "CAP", "Inductor", ...).
    ///
    /// Returns `None` when the cell does not name a supported family.
    pub fn from_type_label(label: &str) -> Option<Self> {
        let label = label.trim().to_lowercase();
        if label.starts_with("res") {
            Some(ComponentType::Resistor)
        } else if label.starts_with("cap") {
            Some(ComponentType::Capacitor)
        } else if label.starts_with("ind") {
            Some(ComponentType::Inductor)
        } else {
            None
        }
    }

    /// Family implied by a canonical unit symbol.
    pub fn from_unit(unit: &str) -> Option<Self> {
        match unit {
            OHMS => Some(ComponentType::Resistor),
            PICOFARAD | NANOFARAD | MICROFARAD => Some(ComponentType::Capacitor),
            PICOHENRY | NANOHENRY | MICROHENRY => Some(ComponentType::Inductor),
            _ => None,
        }
    }

    /// Unit assigned to a bare number of this family.
    pub fn default_unit(&self) -> &'static str {
        match self {
            ComponentType::Resistor => OHMS,
            ComponentType::Capacitor => NANOFARAD,
            ComponentType::Inductor => NANOHENRY,
            ComponentType::Unknown => "",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ComponentType::Resistor => "Resistor",
            ComponentType::Capacitor => "Capacitor",
            ComponentType::Inductor => "Inductor",
            ComponentType::Unknown => "Unknown",
        }
    }
}

/// Physical position of a component, in coordinate-file units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub angle_deg: f64,
}

/// A placed component together with its live value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentRecord {
    pub reference: String,
    pub placement: Placement,
    /// Numeric text, empty when unassigned
    pub value: String,
    /// Canonical unit symbol, empty when unassigned
    pub unit: String,
    /// Explicit "no component" override
    pub no_component: bool,
}

impl ComponentRecord {
    pub fn new(reference: impl Into<String>, placement: Placement) -> Self {
        Self {
            reference: reference.into(),
            placement,
            value: String::new(),
            unit: String::new(),
            no_component: false,
        }
    }

    pub fn component_type(&self) -> ComponentType {
        ComponentType::from_ref(&self.reference)
    }

    /// Set value and unit unless the component is marked N/C.
    ///
    /// Returns whether the record changed.
    pub fn assign(&mut self, value: &str, unit: &str) -> bool {
        if self.no_component || (self.value == value && self.unit == unit) {
            return false;
        }
        self.value = value.to_string();
        self.unit = unit.to_string();
        true
    }

    /// Flag the position as intentionally unpopulated.
    pub fn mark_no_component(&mut self) {
        self.no_component = true;
        self.value.clear();
        self.unit.clear();
    }

    /// Text shown next to the component box ("R4 4700Ohms").
    pub fn label(&self) -> String {
        if self.no_component {
            format!("{} N/C", self.reference)
        } else if !self.value.is_empty() && !self.unit.is_empty() {
            format!("{} {}{}", self.reference, self.value, self.unit)
        } else {
            self.reference.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_ref() {
        assert_eq!(ComponentType::from_ref("R4"), ComponentType::Resistor);
        assert_eq!(ComponentType::from_ref("c12"), ComponentType::Capacitor);
        assert_eq!(ComponentType::from_ref("L1"), ComponentType::Inductor);
        assert_eq!(ComponentType::from_ref("U3"), ComponentType::Unknown);
        assert_eq!(ComponentType::from_ref(""), ComponentType::Unknown);
    }

    #[test]
    fn test_from_type_label() {
        assert_eq!(ComponentType::from_type_label("Res"), Some(ComponentType::Resistor));
        assert_eq!(ComponentType::from_type_label(" CAPACITOR "), Some(ComponentType::Capacitor));
        assert_eq!(ComponentType::from_type_label("ind"), Some(ComponentType::Inductor));
        assert_eq!(ComponentType::from_type_label("IC"), None);
    }

    #[test]
    fn test_no_component_blocks_assign() {
        let mut record = ComponentRecord::new("C3", Placement::default());
        assert!(record.assign("10", NANOFARAD));
        record.mark_no_component();
        assert_eq!(record.value, "");
        assert!(!record.assign("22", NANOFARAD));
        assert_eq!(record.unit, "");
        assert_eq!(record.label(), "C3 N/C");
    }
}
