//! Swimroll CLI - swim course rosters from class spreadsheets
//!
//! # Main Commands
//!
//! ```bash
//! swimroll serve                         # Start HTTP server (port 3000)
//! swimroll export roster.xlsx -c 四年一班  # One class as xlsx
//! swimroll bundle roster.xlsx            # Every class in one zip
//! swimroll template                      # Blank roster template
//! ```
//!
//! # Inspection Commands
//!
//! ```bash
//! swimroll parse roster.xlsx             # Raw table as JSON
//! swimroll normalize roster.xlsx         # Canonical records as JSON
//! swimroll classes roster.xlsx           # Class list
//! swimroll view roster.xlsx -c 1A -n wang  # Filtered class view
//! swimroll stats roster.xlsx             # Per-class tallies
//! ```
//!
//! `stats`, `view`, `export` and `bundle` accept `--edits edits.json`, an
//! array of `{"row", "participation", "level"}` objects applied before the
//! command runs.

use clap::{Parser, Subcommand};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use swimroll::{
    all_class_stats, apply_edits_file, class_stats, config, export_bundle, export_class,
    load_roster_file, parse_file_auto, project, write_template, LoadedRoster, ServerConfig,
};

#[derive(Parser)]
#[command(name = "swimroll")]
#[command(about = "Swim course rosters: normalize, review and export class sheets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a roster file and output its raw table as JSON
    Parse {
        /// Input roster (xlsx, xls or csv)
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Normalize a roster and output canonical records as JSON
    Normalize {
        /// Input roster (xlsx, xls or csv)
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the classes of a roster
    Classes {
        /// Input roster (xlsx, xls or csv)
        input: PathBuf,
    },

    /// Show the filtered view of one class
    View {
        /// Input roster (xlsx, xls or csv)
        input: PathBuf,

        /// Class to show
        #[arg(short, long)]
        class: String,

        /// Case-insensitive name substring
        #[arg(short, long)]
        name: Option<String>,

        /// JSON edits applied first
        #[arg(long)]
        edits: Option<PathBuf>,
    },

    /// Per-class participation and level tallies
    Stats {
        /// Input roster (xlsx, xls or csv)
        input: PathBuf,

        /// Only this class
        #[arg(short, long)]
        class: Option<String>,

        /// JSON edits applied first
        #[arg(long)]
        edits: Option<PathBuf>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export one class as xlsx
    Export {
        /// Input roster (xlsx, xls or csv)
        input: PathBuf,

        /// Class to export
        #[arg(short, long)]
        class: String,

        /// JSON edits applied first
        #[arg(long)]
        edits: Option<PathBuf>,

        /// Output file (default: <class>.xlsx)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export every class into one zip archive
    Bundle {
        /// Input roster (xlsx, xls or csv)
        input: PathBuf,

        /// JSON edits applied first
        #[arg(long)]
        edits: Option<PathBuf>,

        /// Output file (default: 全部班級_游泳課名單.zip)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write the blank roster template
    Template {
        /// Rows covered by the dropdowns (default: SWIMROLL_TEMPLATE_ROWS or 500)
        #[arg(long)]
        rows: Option<u32>,

        /// Output file (default: 學生名單_樣板.xlsx)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: SWIMROLL_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),

        Commands::Normalize { input, output } => cmd_normalize(&input, output.as_deref()),

        Commands::Classes { input } => cmd_classes(&input),

        Commands::View {
            input,
            class,
            name,
            edits,
        } => cmd_view(&input, &class, name.as_deref(), edits.as_deref()),

        Commands::Stats {
            input,
            class,
            edits,
            output,
        } => cmd_stats(&input, class.as_deref(), edits.as_deref(), output.as_deref()),

        Commands::Export {
            input,
            class,
            edits,
            output,
        } => cmd_export(&input, &class, edits.as_deref(), output.as_deref()),

        Commands::Bundle {
            input,
            edits,
            output,
        } => cmd_bundle(&input, edits.as_deref(), output.as_deref()),

        Commands::Template { rows, output } => cmd_template(rows, output.as_deref()),

        Commands::Serve { port } => cmd_serve(port).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Reading roster: {}", input.display());

    let doc = parse_file_auto(input)?;

    eprintln!("   Format: {:?}", doc.format);
    if let Some(sheet) = &doc.sheet {
        eprintln!("   Sheet: {}", sheet);
    }
    if let Some(encoding) = &doc.encoding {
        eprintln!("   Encoding: {}", encoding);
    }
    eprintln!("   Columns: {}", doc.table.headers.join(", "));
    eprintln!("✅ Read {} rows", doc.table.rows.len());

    let json = serde_json::to_string_pretty(&doc.table.to_maps())?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_normalize(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let loaded = load_roster_file(input)?;

    let json = serde_json::to_string_pretty(&json!({
        "records": loaded.roster.records(),
        "report": loaded.report,
    }))?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_classes(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let loaded = load_roster_file(input)?;
    for class_id in loaded.roster.list_classes() {
        println!("{}", class_id);
    }
    Ok(())
}

fn cmd_view(
    input: &Path,
    class_id: &str,
    name: Option<&str>,
    edits: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let loaded = load_with_edits(input, edits)?;

    let class = loaded.roster.class_roster(class_id);
    if class.is_empty() {
        return Err(format!("Class not found: {}", class_id).into());
    }

    let rows = project(&loaded.roster, class_id, name);
    let stats = class_stats(&class);
    eprintln!(
        "📋 {}: {} of {} students shown, {} joining",
        class_id,
        rows.len(),
        stats.total,
        stats.joined
    );

    let json = serde_json::to_string_pretty(&json!({ "rows": rows, "stats": stats }))?;
    write_output(&json, None)?;

    Ok(())
}

fn cmd_stats(
    input: &Path,
    class_id: Option<&str>,
    edits: Option<&Path>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let loaded = load_with_edits(input, edits)?;

    let stats = match class_id {
        Some(c) => {
            let class = loaded.roster.class_roster(c);
            if class.is_empty() {
                return Err(format!("Class not found: {}", c).into());
            }
            vec![class_stats(&class)]
        }
        None => all_class_stats(&loaded.roster),
    };

    for s in &stats {
        eprintln!(
            "📊 {}: {} students, {} joining, {} not joining, levels 3-5: {}",
            s.class_id,
            s.total,
            s.joined,
            s.not_joined,
            s.upper_levels()
        );
    }

    let json = serde_json::to_string_pretty(&stats)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_export(
    input: &Path,
    class_id: &str,
    edits: Option<&Path>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let loaded = load_with_edits(input, edits)?;
    let bytes = export_class(&loaded.roster, class_id)?;

    let default_name = config::class_file_name(class_id);
    write_bytes(&bytes, output.unwrap_or_else(|| Path::new(&default_name)))?;

    Ok(())
}

fn cmd_bundle(
    input: &Path,
    edits: Option<&Path>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let loaded = load_with_edits(input, edits)?;

    eprintln!("📦 Bundling {} classes...", loaded.roster.list_classes().len());
    let summary = export_bundle(&loaded.roster)?;
    if !summary.skipped.is_empty() {
        eprintln!("   ⚠️  Skipped: {}", summary.skipped.join(", "));
    }

    write_bytes(
        &summary.bytes,
        output.unwrap_or_else(|| Path::new(config::BUNDLE_FILE_NAME)),
    )?;
    eprintln!("✅ {} class sheets archived", summary.entries.len());

    Ok(())
}

fn cmd_template(rows: Option<u32>, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let rows = match rows {
        Some(r) => r,
        None => ServerConfig::from_env()?.template_rows,
    };

    let bytes = write_template(rows)?;
    write_bytes(
        &bytes,
        output.unwrap_or_else(|| Path::new(config::TEMPLATE_FILE_NAME)),
    )?;

    Ok(())
}

async fn cmd_serve(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ServerConfig::from_env()?;
    if let Some(port) = port {
        config = config.with_port(port);
    }
    swimroll::server::start_server(config).await
}

fn load_with_edits(
    input: &Path,
    edits: Option<&Path>,
) -> Result<LoadedRoster, Box<dyn std::error::Error>> {
    let mut loaded = load_roster_file(input)?;
    if let Some(path) = edits {
        eprintln!("✏️  Applying edits from: {}", path.display());
        apply_edits_file(&mut loaded.roster, path)?;
    }
    Ok(loaded)
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}

fn write_bytes(bytes: &[u8], path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    fs::write(path, bytes)?;
    eprintln!("💾 Saved to: {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}
