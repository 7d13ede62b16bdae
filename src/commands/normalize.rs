//! Normalize command - show how a single value cell is read.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use pcb_bomtune::normalize::{normalize, TypeHint, TypeSource};
use pcb_bomtune::ComponentType;

#[derive(Serialize)]
struct NormalizeJson<'a> {
    raw: &'a str,
    component_type: ComponentType,
    explicit: bool,
    value: String,
    unit: String,
}

/// Execute the normalize command.
pub fn execute(raw: &str, kind: ComponentType, explicit: bool, json: bool) -> Result<()> {
    let hint = TypeHint {
        kind,
        source: if explicit {
            TypeSource::Explicit
        } else {
            TypeSource::RefPrefix
        },
    };
    let result = normalize(raw, hint);

    if json {
        let out = NormalizeJson {
            raw,
            component_type: kind,
            explicit,
            value: result.value,
            unit: result.unit,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if result.is_empty() {
        println!(
            "{} {:?} ({}) reads as no value",
            "✗".yellow(),
            raw,
            kind.label()
        );
    } else {
        println!(
            "{} {:?} ({}) → {} {}",
            "✓".green(),
            raw,
            kind.label(),
            result.value.bold(),
            result.unit.cyan()
        );
    }

    Ok(())
}
