mod formatter;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use formatter::Formatter;
use ripple::{Engine, MessageQueue, WorkerPool};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "ripple")]
#[command(about = "Ripple: an incremental, reactive evaluation kernel")]
#[command(
    long_about = "Load rules files, resolve them into products, and inspect the dependency graph.\nRules are keyed expressions that may reference each other by symbol; resolution\nrecomputes only what an edit invalidated."
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a workspace and display the products
    ///
    /// Loads the given .ripple file (or every .ripple file under a
    /// directory), resolves all rules, and prints a table of products.
    Run {
        /// A rules file, or a directory to scan for .ripple files
        #[arg(default_value = ".")]
        target: PathBuf,
        /// Resolve on a worker pool with this many threads
        #[arg(short, long)]
        jobs: Option<usize>,
        /// Output the products as JSON
        #[arg(long)]
        json: bool,
        /// Output raw values only (for piping to other tools)
        #[arg(short, long)]
        raw: bool,
    },
    /// Show the rules and their dependency edges
    Show {
        /// A rules file, or a directory to scan for .ripple files
        #[arg(default_value = ".")]
        target: PathBuf,
    },
    /// Evaluate one expression against a resolved workspace
    Eval {
        /// The expression source text
        source: String,
        /// A rules file, or a directory to scan for .ripple files
        #[arg(short = 'd', long = "dir", default_value = ".")]
        target: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Run {
            target,
            jobs,
            json,
            raw,
        } => run_command(target, *jobs, *json, *raw),
        Commands::Show { target } => show_command(target),
        Commands::Eval { source, target } => eval_command(source, target),
    }
}

fn run_command(target: &Path, jobs: Option<usize>, json: bool, raw: bool) -> Result<()> {
    let mut engine = Engine::new();
    load_workspace(&mut engine, target)?;

    match jobs {
        Some(workers) => {
            let queue = MessageQueue::new();
            let pool = WorkerPool::with_listener(workers.max(1), Arc::new(queue.clone()));
            engine.resolve_concurrent(&pool, &queue);
        }
        None => {
            engine.resolve();
        }
    }

    let formatter = Formatter;
    if json {
        println!("{}", ripple::serializers::json::context_to_string(engine.products()));
    } else if raw {
        print!("{}", formatter.format_raw(engine.products()));
    } else {
        print!("{}", formatter.format_products(&engine.snapshot()));
    }

    Ok(())
}

fn show_command(target: &Path) -> Result<()> {
    let mut engine = Engine::new();
    load_workspace(&mut engine, target)?;

    let formatter = Formatter;
    print!("{}", formatter.format_rules(engine.rules()));

    Ok(())
}

fn eval_command(source: &str, target: &Path) -> Result<()> {
    let mut engine = Engine::new();
    load_workspace(&mut engine, target)?;
    engine.resolve();

    let e = ripple::parse(source)?;
    let resolved = e.resolve(engine.products(), &ripple::DefaultAdapter);
    println!("{}", resolved);

    Ok(())
}

/// Load a single rules file, or every .ripple file under a directory
fn load_workspace(engine: &mut Engine, target: &Path) -> Result<()> {
    if target.is_file() {
        return load_file(engine, target);
    }

    let mut loaded = 0;
    for entry in WalkDir::new(target) {
        let entry = entry?;
        if entry.path().extension().and_then(|s| s.to_str()) == Some("ripple") {
            load_file(engine, entry.path())?;
            loaded += 1;
        }
    }

    if loaded == 0 {
        eprintln!("No .ripple files found under {}", target.display());
    }
    Ok(())
}

fn load_file(engine: &mut Engine, path: &Path) -> Result<()> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    engine
        .load(&source)
        .with_context(|| format!("failed to load {}", path.display()))
}
