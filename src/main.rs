//! # Timeline Curator CLI (`tlc`)
//!
//! ## Usage
//!
//! ```bash
//! tlc --config ./config/tlc.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `tlc init` | Create the SQLite database and run schema migrations |
//! | `tlc import <file>` | Load sources and their dated facts |
//! | `tlc curate <entity\|all>` | Classify and merge pending facts |
//! | `tlc dedupe <entity\|all>` | Fold duplicate timeline points |
//! | `tlc show <entity>` | Print curated category documents as JSON |
//! | `tlc stats` | Database overview |
//! | `tlc taxonomy` | Print the active taxonomy |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use timeline_curator::curate::CurateOptions;
use timeline_curator::progress::ProgressMode;
use timeline_curator::{config, curate, dedupe_cmd, import, logging, migrate, show, stats};

/// Timeline Curator: incremental, oracle-assisted curation of per-entity
/// event timelines.
#[derive(Parser)]
#[command(
    name = "tlc",
    about = "Timeline Curator: build per-entity event timelines from dated facts",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/tlc.toml")]
    config: PathBuf,

    /// Log at debug level unless RUST_LOG is set.
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Progress output on stderr: off, human, or json.
    /// Defaults to human when stderr is a terminal.
    #[arg(long, global = true, value_parser = parse_progress)]
    progress: Option<ProgressMode>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// Import sources with their dated facts from a JSON file.
    ///
    /// Sources whose id already exists are left untouched.
    Import {
        /// Path to the JSON file.
        file: PathBuf,
    },

    /// Classify and merge the facts of unprocessed sources.
    Curate {
        /// Entity id, or `all` for every entity with pending sources.
        target: String,

        /// Compute decisions without writing documents or marking sources.
        #[arg(long)]
        dry_run: bool,

        /// Reprocess sources already marked processed.
        #[arg(long)]
        force: bool,
    },

    /// Merge duplicate same-date timeline points within events.
    Dedupe {
        /// Entity id, or `all`.
        target: String,

        /// Report what would merge without writing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Print an entity's curated timeline as JSON.
    Show {
        entity: String,

        /// Only this main category.
        #[arg(long)]
        category: Option<String>,
    },

    /// Show counts of entities, events, points, and pending sources.
    Stats,

    /// Print the active category taxonomy as JSON.
    Taxonomy,
}

fn parse_progress(s: &str) -> Result<ProgressMode, String> {
    ProgressMode::parse(s)
        .ok_or_else(|| format!("invalid progress mode '{}': use off, human, or json", s))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // The taxonomy can be printed without a config file
    if let Commands::Taxonomy = cli.command {
        let taxonomy = if cli.config.exists() {
            config::load_config(&cli.config)?.taxonomy()?
        } else {
            timeline_curator_core::taxonomy::Taxonomy::builtin()
        };
        println!("{}", serde_json::to_string_pretty(&taxonomy.to_json())?);
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;
    logging::init(&cfg.logging.level, cli.verbose);
    let progress = cli.progress.unwrap_or_else(ProgressMode::default_for_tty);

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Import { file } => {
            import::run_import(&cfg, &file).await?;
        }
        Commands::Curate {
            target,
            dry_run,
            force,
        } => {
            curate::run_curate(&cfg, &target, CurateOptions { dry_run, force }, progress).await?;
        }
        Commands::Dedupe { target, dry_run } => {
            dedupe_cmd::run_dedupe(&cfg, &target, dry_run, progress).await?;
        }
        Commands::Show { entity, category } => {
            show::run_show(&cfg, &entity, category.as_deref()).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Taxonomy => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
