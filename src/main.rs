//! pcb-bomtune - BOM value normalization and tuning-version tracking for pcb.
//!
//! A standalone CLI that plugs into the pcb workflow (executables named
//! `pcb-<command>` become available as `pcb <command>`). It reads production
//! BOM spreadsheets and coordinate files, keeps per-board tuning versions and
//! reports which placed parts are missing or differ from a reference.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Env;

use pcb_bomtune::config::Settings;
use pcb_bomtune::ComponentType;

mod commands;

#[derive(Parser)]
#[command(name = "pcb-bomtune")]
#[command(author, version, about = "BOM value normalization and tuning-version tracking for pcb")]
#[command(propagate_version = true)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Rows searched for a BOM header (overrides the config file)
    #[arg(long, global = true, value_name = "N")]
    scan_rows: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a single value cell (e.g., "4.7k", "0402 10nF")
    Normalize {
        /// Raw cell text
        value: String,

        /// Component family used for unit defaults
        #[arg(short = 't', long = "type", value_enum, default_value = "unknown")]
        kind: TypeArg,

        /// Treat the family as coming from an explicit Type column
        #[arg(long)]
        explicit: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Production BOM operations
    Bom {
        #[command(subcommand)]
        command: BomCommands,
    },

    /// Board file operations (placements and tuning versions)
    Board {
        #[command(subcommand)]
        command: BoardCommands,
    },

    /// Check a board's values against a production BOM or another version
    Check {
        /// Board file (.csv or workbook)
        board: PathBuf,

        /// Version to check (default: latest)
        #[arg(long)]
        version: Option<String>,

        /// Production BOM to check against
        #[arg(long, conflicts_with = "against", required_unless_present = "against")]
        bom: Option<PathBuf>,

        /// Saved version to check against
        #[arg(long)]
        against: Option<String>,

        /// Mark a ref as intentionally unpopulated (repeatable)
        #[arg(long, value_name = "REF")]
        nc: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum BomCommands {
    /// Show the normalized contents of a production BOM
    Show {
        /// BOM spreadsheet (.xlsx, .xls, .ods) or CSV
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export a normalized production BOM as CSV or .xlsx
    Export {
        /// BOM spreadsheet (.xlsx, .xls, .ods) or CSV
        file: PathBuf,

        /// Output CSV file path
        #[arg(short, long, default_value = "bom_normalized.csv")]
        output: PathBuf,
    },
}

#[derive(Subcommand)]
enum BoardCommands {
    /// Create a board file from a coordinate (XY) file
    Create {
        /// Coordinate file with ReferenceID, X, Y and Angle columns
        xy: PathBuf,

        /// Board file to write (.csv)
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show placements and the values of one version
    Show {
        board: PathBuf,

        /// Version to show (default: latest)
        #[arg(long)]
        version: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Save the current values as a new version
    Snapshot {
        board: PathBuf,

        /// Start from this version (default: latest)
        #[arg(long)]
        from: Option<String>,

        /// Apply a production BOM before saving
        #[arg(long)]
        bom: Option<PathBuf>,

        /// Set a value, e.g. R4=4.7k (repeatable). The ref prefix picks the
        /// family, so R4=0 clears the value; use --jumper for zero-ohm parts
        #[arg(long, value_name = "REF=VALUE")]
        set: Vec<String>,

        /// Fit a resistor as a zero-ohm jumper (repeatable)
        #[arg(long, value_name = "REF")]
        jumper: Vec<String>,

        /// Mark a ref as intentionally unpopulated (repeatable)
        #[arg(long, value_name = "REF")]
        nc: Vec<String>,

        /// Notes stored with the version
        #[arg(long)]
        notes: Option<String>,
    },

    /// Show refs whose values differ between two versions
    Diff {
        board: PathBuf,
        a: String,
        b: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Verify a coordinate file matches the board's layout
    CheckXy {
        board: PathBuf,
        xy: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TypeArg {
    Resistor,
    Capacitor,
    Inductor,
    Unknown,
}

impl From<TypeArg> for ComponentType {
    fn from(arg: TypeArg) -> Self {
        match arg {
            TypeArg::Resistor => ComponentType::Resistor,
            TypeArg::Capacitor => ComponentType::Capacitor,
            TypeArg::Inductor => ComponentType::Inductor,
            TypeArg::Unknown => ComponentType::Unknown,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Default level depends on --debug; RUST_LOG still wins
    let env = if cli.debug {
        Env::default().default_filter_or("debug")
    } else {
        Env::default().default_filter_or("warn")
    };
    env_logger::Builder::from_env(env).init();

    let mut settings = Settings::load()?;
    if let Some(rows) = cli.scan_rows {
        settings.header_scan_rows = rows;
    }

    match cli.command {
        Commands::Normalize {
            value,
            kind,
            explicit,
            json,
        } => commands::normalize::execute(&value, kind.into(), explicit, json),

        Commands::Bom { command } => match command {
            BomCommands::Show { file, json } => commands::bom::execute_show(&file, &settings, json),
            BomCommands::Export { file, output } => {
                commands::bom::execute_export(&file, &output, &settings)
            }
        },

        Commands::Board { command } => match command {
            BoardCommands::Create { xy, output } => commands::board::execute_create(&xy, &output),
            BoardCommands::Show {
                board,
                version,
                json,
            } => commands::board::execute_show(&board, version.as_deref(), json),
            BoardCommands::Snapshot {
                board,
                from,
                bom,
                set,
                jumper,
                nc,
                notes,
            } => {
                let options = commands::board::SnapshotOptions {
                    from,
                    bom,
                    set,
                    jumper,
                    nc,
                    notes,
                };
                commands::board::execute_snapshot(&board, &options, &settings)
            }
            BoardCommands::Diff { board, a, b, json } => {
                commands::board::execute_diff(&board, &a, &b, json)
            }
            BoardCommands::CheckXy { board, xy } => {
                commands::board::execute_check_xy(&board, &xy, &settings)
            }
        },

        Commands::Check {
            board,
            version,
            bom,
            against,
            nc,
            json,
        } => {
            let reference = match (bom, against) {
                (Some(path), _) => commands::check::Reference::Bom(path),
                (None, Some(name)) => commands::check::Reference::Version(name),
                (None, None) => anyhow::bail!("either --bom or --against is required"),
            };
            commands::check::execute(&board, version.as_deref(), &reference, &nc, &settings, json)
        }
    }
}
