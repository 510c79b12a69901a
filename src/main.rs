use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use slambana_dashboard::{decode_upload, Config, ReconcileOptions, RosterStore};

/// Offline roster maintenance for the Slambana dashboard
#[derive(Parser, Debug)]
#[command(name = "slambana", version, about)]
struct Cli {
    /// Roster snapshot path (defaults to SLAMBANA_ROSTER_PATH or local-data/players.json)
    #[arg(long, global = true)]
    roster: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every player
    List,

    /// Find players by tag or alias (case-insensitive)
    Search { query: String },

    /// Merge a JSON, CSV/TSV or Excel export into the roster
    Import {
        file: PathBuf,

        /// Fold repeated tags in the file into a single player
        #[arg(long)]
        collapse_duplicates: bool,
    },

    /// Remove a player by exact tag
    Delete { tag: String },

    /// Remove every player
    Clear,
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env();
    let roster_path = cli.roster.unwrap_or(config.roster_path);

    let store = RosterStore::open(&roster_path)
        .with_context(|| format!("Failed to open roster at {}", roster_path.display()))?;

    match cli.command {
        Command::List => {
            let players = store.list_all();
            println!("📋 {} players", players.len());
            for player in &players {
                print_player(player);
            }
        }
        Command::Search { query } => {
            let players = store.search(&query);
            println!("🔍 {} matches for \"{}\"", players.len(), query);
            for player in &players {
                print_player(player);
            }
        }
        Command::Import {
            file,
            collapse_duplicates,
        } => {
            run_import(
                &store,
                &file,
                ReconcileOptions {
                    collapse_duplicates: collapse_duplicates || config.collapse_duplicate_imports,
                },
            )?;
        }
        Command::Delete { tag } => {
            store.delete(&tag)?;
            println!("🗑️  Deleted {} (if present)", tag);
        }
        Command::Clear => {
            let removed = store.clear()?;
            println!("🧹 Cleared roster: {} players removed", removed);
        }
    }

    Ok(())
}

fn run_import(store: &RosterStore, file: &Path, options: ReconcileOptions) -> Result<()> {
    println!("📂 Loading {}...", file.display());

    let bytes = std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let filename = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    let (source, rows) = decode_upload(filename, &bytes)?;
    println!("✓ Decoded {} rows ({})", rows.len(), source.name());

    let report = store.import(&rows, source, options)?;

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ New players:     {}", report.new_players);
    println!("✅ Updated players: {}", report.updated_players);
    println!("   Skipped rows:    {}", report.skipped);
    println!("   Roster size:     {}", store.count());

    Ok(())
}

fn print_player(player: &slambana_dashboard::PlayerRecord) {
    let methods = &player.payment_methods;
    let mut handles = Vec::new();
    if !methods.venmo.is_empty() {
        handles.push(format!("venmo={}", methods.venmo));
    }
    if !methods.paypal.is_empty() {
        handles.push(format!("paypal={}", methods.paypal));
    }
    if !methods.zelle.is_empty() {
        handles.push(format!("zelle={}", methods.zelle));
    }

    print!("  • {}", player.tag);
    if !player.aliases.is_empty() {
        print!(" (aka {})", player.aliases.join(", "));
    }
    if !handles.is_empty() {
        print!(" [{}]", handles.join(" "));
    }
    if !player.notes.is_empty() {
        print!(": {}", player.notes);
    }
    println!();
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    // Logs go to stderr so command output stays clean
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
