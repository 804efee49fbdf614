mod script;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{reload, Registry};
use undo_cell_config::AppConfig;
use undo_cell_mod_history::config::capacity_from_env;

use crate::script::{parse_steps, Session, Step};

/// Replays writes, undos, and redos against a bounded value history.
#[derive(Parser, Debug)]
#[command(name = "undo-cell", version, about)]
struct Cli {
    /// Steps to replay in order: set=VALUE, undo, redo, cap=N, clear, show.
    steps: Vec<String>,

    /// Config file to use instead of `undo-cell.json` next to the executable.
    #[arg(long)]
    config: Option<PathBuf>,

    /// History capacity (overrides UNDO_CELL_CAPACITY and the config file).
    #[arg(long)]
    capacity: Option<usize>,

    /// Initial value of the tracked cell (overrides the config file).
    #[arg(long)]
    initial: Option<String>,

    /// Print snapshots as JSON.
    #[arg(long)]
    json: bool,

    /// Include record timestamps in text output.
    #[arg(long)]
    timestamps: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging comes up before the config is read so load warnings are seen.
    let filter_handle = init_logging();

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::config_path);
    let mut config = AppConfig::load_or_create(&config_path);
    apply_overrides(&mut config, &cli, capacity_from_env());

    if let Some(handle) = filter_handle {
        match EnvFilter::try_new(&config.log_filter) {
            Ok(filter) => handle
                .reload(filter)
                .context("Failed to apply the configured log filter")?,
            Err(e) => tracing::warn!("Ignoring invalid log_filter {:?}: {e}", config.log_filter),
        }
    }

    tracing::info!(
        "Starting undo-cell with capacity {} ({})",
        config.capacity,
        config_path.display()
    );

    let steps = parse_steps(&cli.steps)?;
    let session = Session::new(config.initial_value.clone(), config.capacity);

    for step in &steps {
        if let Some(snapshot) = session.apply(step) {
            print_snapshot(&snapshot, cli.json, config.show_timestamps)?;
        }
    }

    // Always end with the final state unless the script already showed it.
    if steps.last() != Some(&Step::Show) {
        print_snapshot(&session.snapshot(), cli.json, config.show_timestamps)?;
    }

    Ok(())
}

/// Installs the fmt subscriber on stderr.
///
/// `RUST_LOG` wins when set. Otherwise logging starts at `info` and the
/// returned handle lets the caller swap in the configured filter.
fn init_logging() -> Option<reload::Handle<EnvFilter, Registry>> {
    let (filter, from_env) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (EnvFilter::new("info"), false),
    };
    let (filter, handle) = reload::Layer::new(filter);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    (!from_env).then_some(handle)
}

/// Layers command-line and environment settings over the config file.
///
/// Capacity precedence: `--capacity`, then a valid `UNDO_CELL_CAPACITY`
/// (`env_capacity`), then the file.
fn apply_overrides(config: &mut AppConfig, cli: &Cli, env_capacity: Option<usize>) {
    if let Some(capacity) = cli.capacity.or(env_capacity) {
        config.capacity = capacity;
    }
    if let Some(initial) = cli.initial.clone() {
        config.initial_value = initial;
    }
    config.show_timestamps |= cli.timestamps;
    config.sanitize();
}

fn print_snapshot(snapshot: &script::Snapshot, json: bool, show_timestamps: bool) -> Result<()> {
    if json {
        let out = serde_json::to_string_pretty(snapshot).context("Failed to serialize snapshot")?;
        println!("{out}");
    } else {
        print!("{}", snapshot.to_text(show_timestamps));
    }
    Ok(())
}
