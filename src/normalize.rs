//! Engineering value normalization.
//!
//! Free-form BOM cells ("4.7k", "0402 10nF", "100 n", "0R") are reduced to a
//! canonical `(numeric text, unit)` pair. The numeric part stays text so the
//! precision the engineer typed survives ("2.50" is not "2.5").

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::component::{
    ComponentType, MICROFARAD, MICROHENRY, NANOFARAD, NANOHENRY, OHMS, PICOFARAD, PICOHENRY,
};

/// Where the component type used for normalization came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeSource {
    /// A "Type" or "Unit" column, or a caller that knows the family.
    Explicit,
    /// Guessed from the first letter of the reference designator.
    RefPrefix,
}

/// Component family hint handed to [`normalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeHint {
    pub kind: ComponentType,
    pub source: TypeSource,
}

impl TypeHint {
    pub fn explicit(kind: ComponentType) -> Self {
        Self {
            kind,
            source: TypeSource::Explicit,
        }
    }

    pub fn from_ref(reference: &str) -> Self {
        Self {
            kind: ComponentType::from_ref(reference),
            source: TypeSource::RefPrefix,
        }
    }

    pub fn is_explicit(&self) -> bool {
        self.source == TypeSource::Explicit
    }
}

impl From<ComponentType> for TypeHint {
    fn from(kind: ComponentType) -> Self {
        TypeHint::explicit(kind)
    }
}

/// A normalized value. Both fields empty means "no value".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct ValueUnit {
    pub value: String,
    pub unit: String,
}

impl ValueUnit {
    pub fn new(value: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            unit: unit.into(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty() && self.unit.is_empty()
    }

    /// A deliberate zero-ohm jumper.
    pub fn is_zero_ohm(&self) -> bool {
        self.value == "0" && self.unit == OHMS
    }

    /// Persisted text form, e.g. "4700Ohms".
    pub fn joined(&self) -> String {
        join_value_unit(&self.value, &self.unit)
    }
}

impl PartialEq<(&str, &str)> for ValueUnit {
    fn eq(&self, other: &(&str, &str)) -> bool {
        self.value == other.0 && self.unit == other.1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scale {
    One,
    Kilo,
}

/// Normalize a raw value cell into `(numeric text, canonical unit)`.
///
/// Only the last whitespace-separated token is considered ("0402 10nF" reads
/// "10nF"); a trailing unit-only token is glued back onto its number ("10 nF").
/// A zero value means "component absent" and yields an empty pair, except for
/// a resistor whose family came from an explicit signal: "0", "0R" and
/// "0 Ohm" are then kept as a jumper.
pub fn normalize(raw: &str, hint: impl Into<TypeHint>) -> ValueUnit {
    let hint = hint.into();

    let Some(token) = select_token(raw) else {
        return ValueUnit::empty();
    };
    let Some((numeric, unit, scale)) = parse_token(&token, hint.kind) else {
        return ValueUnit::empty();
    };

    let Some(number) = parse_decimal(&numeric) else {
        return ValueUnit::empty();
    };

    if number.is_zero() {
        if hint.is_explicit() && hint.kind == ComponentType::Resistor && unit == OHMS {
            return ValueUnit::new("0", OHMS);
        }
        return ValueUnit::empty();
    }

    let value = match scale {
        Scale::One => numeric,
        Scale::Kilo => match number.checked_mul(Decimal::from(1000)) {
            Some(scaled) => scaled.normalize().to_string(),
            None => return ValueUnit::empty(),
        },
    };

    ValueUnit::new(value, unit)
}

/// Pick the token that carries the value.
fn select_token(raw: &str) -> Option<String> {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    let last = *tokens.last()?;

    if !has_digit(last) && tokens.len() >= 2 {
        let prev = tokens[tokens.len() - 2];
        if has_digit(prev) {
            return Some(format!("{}{}", prev, last));
        }
    }

    Some(last.to_string())
}

fn has_digit(s: &str) -> bool {
    s.chars().any(|c| c.is_ascii_digit())
}

static RKM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d*)([kr])(\d+)$").expect("static regex"));

/// Split a single token into numeric text, unit and scale.
fn parse_token(token: &str, kind: ComponentType) -> Option<(String, &'static str, Scale)> {
    let lower = fold_unit_chars(&token.to_lowercase());

    // Resistor codes with the multiplier in place of the decimal point: 4k7, 4R7, R47
    if matches!(kind, ComponentType::Resistor | ComponentType::Unknown) {
        if let Some(caps) = RKM_RE.captures(&lower) {
            let whole = if caps[1].is_empty() { "0" } else { &caps[1] };
            let numeric = format!("{}.{}", whole, &caps[3]);
            let scale = if &caps[2] == "k" { Scale::Kilo } else { Scale::One };
            return Some((numeric, OHMS, scale));
        }
    }

    let numeric = extract_numeric(&lower)?;

    let suffix: String = match lower.rfind(|c: char| c.is_ascii_digit()) {
        Some(idx) => lower[idx + 1..].chars().filter(|c| c.is_alphabetic()).collect(),
        None => String::new(),
    };

    let (unit, scale) = resolve_unit(&suffix, kind).unwrap_or((kind.default_unit(), Scale::One));
    Some((numeric, unit, scale))
}

/// Map micro and omega spellings onto ASCII so one table covers them.
fn fold_unit_chars(s: &str) -> String {
    s.replace(['µ', 'μ'], "u").replace('ω', "ohm")
}

/// Keep digits and the first decimal point, drop everything else.
fn extract_numeric(s: &str) -> Option<String> {
    let mut out = String::new();
    let mut seen_dot = false;
    for c in s.chars() {
        if c.is_ascii_digit() {
            out.push(c);
        } else if c == '.' && !seen_dot {
            seen_dot = true;
            out.push(c);
        }
    }

    let out = out.trim_end_matches('.').to_string();
    if has_digit(&out) {
        Some(out)
    } else {
        None
    }
}

fn parse_decimal(numeric: &str) -> Option<Decimal> {
    if numeric.starts_with('.') {
        Decimal::from_str(&format!("0{}", numeric)).ok()
    } else {
        Decimal::from_str(numeric).ok()
    }
}

/// Resolve a lowercase unit suffix, preferring the hinted family's spellings.
fn resolve_unit(suffix: &str, kind: ComponentType) -> Option<(&'static str, Scale)> {
    if suffix.is_empty() {
        return None;
    }

    let family = match kind {
        ComponentType::Capacitor => match suffix {
            "p" => Some(PICOFARAD),
            "n" => Some(NANOFARAD),
            "u" => Some(MICROFARAD),
            _ => None,
        },
        _ => None,
    };
    if let Some(unit) = family {
        return Some((unit, Scale::One));
    }

    match suffix {
        "k" if kind != ComponentType::Capacitor && kind != ComponentType::Inductor => {
            Some((OHMS, Scale::Kilo))
        }
        "kohm" | "kohms" => Some((OHMS, Scale::Kilo)),
        _ => canonical_unit(suffix).map(|unit| (unit, Scale::One)),
    }
}

/// Canonical symbol for a unit spelling, case-insensitive.
pub fn canonical_unit(raw: &str) -> Option<&'static str> {
    let key = fold_unit_chars(&raw.trim().to_lowercase());
    match key.as_str() {
        "pf" => Some(PICOFARAD),
        "nf" => Some(NANOFARAD),
        "uf" => Some(MICROFARAD),
        "ohm" | "ohms" | "r" => Some(OHMS),
        "ph" => Some(PICOHENRY),
        "nh" => Some(NANOHENRY),
        "uh" => Some(MICROHENRY),
        _ => None,
    }
}

static SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([0-9]*\.?[0-9]+)\s*([a-zA-ZµμΩω]*)\s*$").expect("static regex")
});

/// Split persisted "value+unit" text back into its parts.
///
/// Unlike [`normalize`] this applies no defaults, scaling or zero policy: it
/// is the inverse of [`join_value_unit`]. Unknown unit spellings are kept.
pub fn split_value_unit(raw: &str) -> ValueUnit {
    let s = raw.trim();
    if s.is_empty() {
        return ValueUnit::empty();
    }

    if let Some(caps) = SPLIT_RE.captures(s) {
        let unit = &caps[2];
        let unit = canonical_unit(unit).map(str::to_string).unwrap_or_else(|| unit.to_string());
        return ValueUnit::new(&caps[1], unit);
    }

    let value: String = s.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
    let rest = s.replace(&value, "");
    let rest = rest.trim();
    let unit = canonical_unit(rest).map(str::to_string).unwrap_or_else(|| rest.to_string());
    ValueUnit::new(value, unit)
}

/// Join value and unit for persistence; an empty value yields empty text.
pub fn join_value_unit(value: &str, unit: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        return String::new();
    }
    format!("{}{}", value, unit.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentType::*;

    #[test]
    fn test_resistor_kilo() {
        assert_eq!(normalize("4.7k", Resistor), ("4700", "Ohms"));
        assert_eq!(normalize("10K", Resistor), ("10000", "Ohms"));
        assert_eq!(normalize("0.1k", Resistor), ("100", "Ohms"));
        assert_eq!(normalize("1.2345k", Resistor), ("1234.5", "Ohms"));
        assert_eq!(normalize("2.2 kOhm", Resistor), ("2200", "Ohms"));
    }

    #[test]
    fn test_resistor_ohm_spellings() {
        assert_eq!(normalize("100R", Resistor), ("100", "Ohms"));
        assert_eq!(normalize("47 ohms", Resistor), ("47", "Ohms"));
        assert_eq!(normalize("22Ω", Resistor), ("22", "Ohms"));
        assert_eq!(normalize("330", Resistor), ("330", "Ohms"));
    }

    #[test]
    fn test_resistor_rkm_codes() {
        assert_eq!(normalize("4k7", Resistor), ("4700", "Ohms"));
        assert_eq!(normalize("4R7", Resistor), ("4.7", "Ohms"));
        assert_eq!(normalize("R47", Resistor), ("0.47", "Ohms"));
    }

    #[test]
    fn test_capacitor_units() {
        assert_eq!(normalize("10nF", Capacitor), ("10", "nF"));
        assert_eq!(normalize("100 pf", Capacitor), ("100", "pF"));
        assert_eq!(normalize("4.7uF", Capacitor), ("4.7", "uF"));
        assert_eq!(normalize("1µF", Capacitor), ("1", "uF"));
        assert_eq!(normalize("100n", Capacitor), ("100", "nF"));
        assert_eq!(normalize("22", Capacitor), ("22", "nF"));
    }

    #[test]
    fn test_inductor_units() {
        assert_eq!(normalize("3.3nH", Inductor), ("3.3", "nH"));
        assert_eq!(normalize("10UH", Inductor), ("10", "uH"));
        assert_eq!(normalize("12", Inductor), ("12", "nH"));
    }

    #[test]
    fn test_unknown_type_has_no_default_unit() {
        assert_eq!(normalize("5", Unknown), ("5", ""));
        assert_eq!(normalize("10nF", Unknown), ("10", "nF"));
    }

    #[test]
    fn test_last_token_wins() {
        assert_eq!(normalize("0402 10nF", Capacitor), ("10", "nF"));
        assert_eq!(normalize("2 2.5pF", Capacitor), ("2.5", "pF"));
        assert_eq!(normalize("  10 nF ", Capacitor), ("10", "nF"));
    }

    #[test]
    fn test_text_precision_preserved() {
        assert_eq!(normalize("2.50", Capacitor), ("2.50", "nF"));
        assert_eq!(normalize("1,000pF", Capacitor), ("1000", "pF"));
    }

    #[test]
    fn test_zero_value_policy() {
        assert_eq!(normalize("0", Resistor), ("0", "Ohms"));
        assert_eq!(normalize("0R", Resistor), ("0", "Ohms"));
        assert_eq!(normalize("0 Ohm", Resistor), ("0", "Ohms"));
        assert_eq!(normalize("0", Capacitor), ("", ""));
        assert_eq!(normalize("0.0", Inductor), ("", ""));

        // Ref prefix alone is not an explicit signal
        assert_eq!(normalize("0", TypeHint::from_ref("R7")), ("", ""));
        assert_eq!(normalize("0R", TypeHint::from_ref("R7")), ("", ""));
        assert_eq!(normalize("4.7k", TypeHint::from_ref("R7")), ("4700", "Ohms"));
    }

    #[test]
    fn test_no_digits() {
        assert!(normalize("", Resistor).is_empty());
        assert!(normalize("DNP", Resistor).is_empty());
        assert!(normalize("n/a", Capacitor).is_empty());
        assert!(normalize("   ", Unknown).is_empty());
    }

    #[test]
    fn test_kilo_overflow_reads_as_no_value() {
        assert!(normalize("99999999999999999999999999k", Resistor).is_empty());
        assert!(normalize("9999999999999999999999999999999k", Resistor).is_empty());
        assert_eq!(
            normalize("1000000000000000000000000k", Resistor),
            ("1000000000000000000000000000", "Ohms")
        );
    }

    #[test]
    fn test_split_and_join() {
        assert_eq!(split_value_unit("4700Ohms"), ("4700", "Ohms"));
        assert_eq!(split_value_unit("10 nf"), ("10", "nF"));
        assert_eq!(split_value_unit("0Ohms"), ("0", "Ohms"));
        assert_eq!(split_value_unit("5"), ("5", ""));
        assert_eq!(split_value_unit(""), ("", ""));
        assert_eq!(join_value_unit("2.50", "nF"), "2.50nF");
        assert_eq!(join_value_unit("", "nF"), "");
    }

    #[test]
    fn test_canonical_unit() {
        assert_eq!(canonical_unit("OHMS"), Some("Ohms"));
        assert_eq!(canonical_unit("r"), Some("Ohms"));
        assert_eq!(canonical_unit("µF"), Some("uF"));
        assert_eq!(canonical_unit("V"), None);
    }
}
