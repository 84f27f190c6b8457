//! ISAM order store CLI
//!
//! Builds a sparse-indexed order store from a CSV export and runs lookups,
//! edits, maintenance and reports against it.
//!
//! ## Usage
//!
//! ```bash
//! # Bulk build from the export (replaces any existing store)
//! isam --data-dir data build jewelry.csv
//!
//! # Point lookup, insert, delete
//! isam get 2297876563486622000
//! isam insert --order-id 42 --product-id 7 --category-id 3 --price 99.9
//! isam delete 42 --yes
//!
//! # Maintenance and reports
//! isam rebuild
//! isam reorganize
//! isam stats
//! isam top-items --limit 5
//!
//! # Interactive menu
//! isam shell
//! ```

mod input;
mod render;
mod shell;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use isam::{IsamConfig, Store};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::input::NewOrder;
use crate::shell::Shell;

/// Sparse-indexed sequential order store
#[derive(Parser)]
#[command(name = "isam")]
#[command(about = "Bulk-built order store with a sparse index and overflow area")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding the store files
    #[arg(short, long, global = true, default_value = "data")]
    data_dir: PathBuf,

    /// JSON file with store tunables
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    tuning: Tuning,

    #[command(subcommand)]
    command: Commands,
}

/// Per-run overrides of the configuration file.
#[derive(Args, Debug, Default)]
struct Tuning {
    /// Records between sparse index entries
    #[arg(long, global = true)]
    index_gap: Option<usize>,

    /// Records per block before inserts go to overflow
    #[arg(long, global = true)]
    block_size: Option<usize>,

    /// Records held in memory per sorted run
    #[arg(long, global = true)]
    memory_limit: Option<usize>,

    /// Deletions between automatic index rebuilds
    #[arg(long, global = true)]
    rebuild_threshold: Option<usize>,

    /// Merge output buffer, in records
    #[arg(long, global = true)]
    write_buffer: Option<usize>,
}

impl Tuning {
    fn apply(&self, config: &mut IsamConfig) {
        let overrides = [
            (self.index_gap, &mut config.index_gap),
            (self.block_size, &mut config.block_size),
            (self.memory_limit, &mut config.memory_limit),
            (self.rebuild_threshold, &mut config.rebuild_threshold),
            (self.write_buffer, &mut config.write_buffer),
        ];
        for (value, slot) in overrides {
            if let Some(v) = value {
                *slot = v;
            }
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build the store from a CSV export, replacing existing files
    Build {
        /// Source file with a header line
        source: PathBuf,
    },

    /// Print one order
    Get { key: i64 },

    /// Insert one order
    Insert(NewOrder),

    /// Remove one order
    Delete {
        key: i64,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Rebuild the order index and category totals
    Rebuild,

    /// Rewrite the primary file in key order and empty the overflow area
    Reorganize,

    /// File and record statistics
    Stats,

    /// First and last orders of the primary file
    Show {
        #[arg(short = 'n', long, default_value = "5")]
        count: usize,
    },

    /// First and last catalog items
    Items {
        #[arg(short = 'n', long, default_value = "5")]
        count: usize,
    },

    /// Live records in the overflow area
    Overflow,

    /// Categories with the most units sold
    TopCategories {
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Products with the most units sold
    TopItems {
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Calendar month with the most units sold
    BestMonth,

    /// Interactive menu
    Shell,
}

fn load_config(path: Option<&Path>, tuning: &Tuning) -> Result<IsamConfig> {
    let mut config = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => IsamConfig::default(),
    };
    tuning.apply(&mut config);
    config.validate()?;
    debug!(?config, "configuration resolved");
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();

    let config = load_config(cli.config.as_deref(), &cli.tuning)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Build { source } => {
            let (store, report) = Store::build_from_path(&source, &cli.data_dir, config)
                .with_context(|| format!("building store in {}", cli.data_dir.display()))?;
            render::build_report(&mut out, &report)?;
            store.close()?;
        }
        command => {
            let mut store = Store::open(&cli.data_dir, config)
                .with_context(|| format!("opening store in {}", cli.data_dir.display()))?;
            run(command, &mut store, &mut out)?;
            store.close()?;
        }
    }
    Ok(())
}

/// Runs one command against an open store.
fn run<W: Write>(command: Commands, store: &mut Store, out: &mut W) -> Result<()> {
    match command {
        Commands::Build { .. } => bail!("build does not run against an open store"),
        Commands::Get { key } => match store.lookup(key)? {
            Some(order) => render::order(out, &order)?,
            None => writeln!(out, "order {key} not found")?,
        },
        Commands::Insert(new) => {
            let order = new.into_order();
            let key = order.order_id;
            let outcome = store.insert(order)?;
            render::insert_outcome(out, key, &outcome)?;
        }
        Commands::Delete { key, yes } => {
            let Some(order) = store.lookup(key)? else {
                writeln!(out, "order {key} not found")?;
                return Ok(());
            };
            render::order(out, &order)?;
            if yes || shell::confirm(&mut io::stdin().lock(), out, "remove this order?")? {
                if let Some(outcome) = store.delete(key)? {
                    render::delete_outcome(out, &outcome)?;
                }
            } else {
                writeln!(out, "cancelled")?;
            }
        }
        Commands::Rebuild => {
            let (index, categories) = store.rebuild_all()?;
            render::rebuild(out, &index, categories)?;
        }
        Commands::Reorganize => {
            let report = store.reorganize()?;
            render::reorganization(out, &report)?;
        }
        Commands::Stats => render::stats(out, &store.stats()?)?,
        Commands::Show { count } => render::order_samples(out, &store.samples(count)?)?,
        Commands::Items { count } => render::item_samples(out, &store.item_samples(count)?)?,
        Commands::Overflow => render::overflow(out, &store.overflow_records()?)?,
        Commands::TopCategories { limit } => render::top_categories(out, &store.top_categories(limit)?)?,
        Commands::TopItems { limit } => render::top_items(out, &store.top_items(limit)?)?,
        Commands::BestMonth => render::best_month(out, store.best_month()?.as_ref())?,
        Commands::Shell => Shell::new(store, io::stdin().lock(), out).run()?,
    }
    Ok(())
}
