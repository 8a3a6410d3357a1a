//! `tasksync pairs list` and `tasksync pairs add`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tabled::{settings::Style, Table, Tabled};

use tasksync_core::{
    config::{self, CollectionRef, PairConfig},
    ConfigError, Direction, ReconcileMode,
};

/// Manage configured collection pairs.
#[derive(Subcommand, Debug)]
pub enum PairsCommand {
    /// List configured pairs with their sync policy.
    List {
        /// Pair config file (default: ~/.tasksync/pairs.yaml).
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Add a pair of collections to keep in sync.
    Add(AddArgs),
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// First collection, as WORKSPACE/COLLECTION.
    #[arg(long = "a", value_name = "WORKSPACE/COLLECTION")]
    pub a: CollectionRef,

    /// Second collection, as WORKSPACE/COLLECTION.
    #[arg(long = "b", value_name = "WORKSPACE/COLLECTION")]
    pub b: CollectionRef,

    /// Only copy from A to B.
    #[arg(long)]
    pub one_way: bool,

    /// Only create missing items; never update matched ones.
    #[arg(long)]
    pub create_only: bool,

    /// Pair config file (default: ~/.tasksync/pairs.yaml).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Tabled)]
struct PairRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "a")]
    a: String,
    #[tabled(rename = "b")]
    b: String,
    #[tabled(rename = "direction")]
    direction: String,
    #[tabled(rename = "mode")]
    mode: String,
    #[tabled(rename = "memberships")]
    membership: String,
    #[tabled(rename = "missing section")]
    missing_section: String,
}

pub fn run(cmd: PairsCommand) -> Result<()> {
    match cmd {
        PairsCommand::List { config } => list(config),
        PairsCommand::Add(args) => add(args),
    }
}

fn list(path: Option<PathBuf>) -> Result<()> {
    let path = resolve_path(path)?;
    let config = match config::load_from(&path) {
        Ok(config) => config,
        Err(ConfigError::ConfigNotFound { .. }) => Default::default(),
        Err(e) => return Err(e).context("failed to load pair config"),
    };

    if config.pairs.is_empty() {
        println!("No pairs configured.");
        println!("Run: tasksync pairs add --a WORKSPACE/COLLECTION --b WORKSPACE/COLLECTION");
        return Ok(());
    }

    let rows: Vec<PairRow> = config
        .pairs
        .iter()
        .enumerate()
        .map(|(i, pair)| PairRow {
            index: i + 1,
            a: pair.a.to_string(),
            b: pair.b.to_string(),
            direction: policy_label(&pair.direction),
            mode: policy_label(&pair.mode),
            membership: policy_label(&pair.membership_policy),
            missing_section: policy_label(&pair.missing_section),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

fn add(args: AddArgs) -> Result<()> {
    let path = resolve_path(args.config)?;
    let mut pair = PairConfig::new(args.a, args.b);
    if args.one_way {
        pair.direction = Direction::AToB;
    }
    if args.create_only {
        pair.mode = ReconcileMode::CreateOnly;
    }

    let before = match config::load_from(&path) {
        Ok(config) => config.pairs.len(),
        Err(ConfigError::ConfigNotFound { .. }) => 0,
        Err(e) => return Err(e).context("failed to load pair config"),
    };
    let label = pair.label();
    let config = config::add_pair_to(&path, pair)
        .with_context(|| format!("failed to add pair {label}"))?;

    if config.pairs.len() == before {
        println!("· {label} is already configured");
    } else {
        println!("✓ Added {label} ({})", path.display());
    }
    Ok(())
}

fn resolve_path(path: Option<PathBuf>) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(path),
        None => config::config_path().context("could not determine home directory"),
    }
}

/// The YAML spelling of a policy value.
fn policy_label<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}
