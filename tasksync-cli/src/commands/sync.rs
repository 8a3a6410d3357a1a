//! `tasksync sync` — reconcile configured pairs.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use tasksync_sync::{run_all, ItemStatus, PairOverrides, PairResult, PassReport};

use super::{load_config, Backend};

/// Arguments for `tasksync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Pair config file (default: ~/.tasksync/pairs.yaml).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Only sync the Nth pair, as numbered by `tasksync pairs list`.
    #[arg(long, value_name = "N")]
    pub pair: Option<usize>,

    /// Show what would change without changing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Only create missing items; leave matched items untouched.
    #[arg(long)]
    pub create_only: bool,

    /// Run against a JSON store snapshot instead of Asana.
    #[arg(long, value_name = "FILE")]
    pub snapshot: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let mut config = load_config(self.config.as_deref())?;
        if let Some(n) = self.pair {
            let total = config.pairs.len();
            if n == 0 || n > total {
                bail!("--pair {n} is out of range; {total} pair(s) configured");
            }
            config.pairs = vec![config.pairs.swap_remove(n - 1)];
        }
        if config.pairs.is_empty() {
            println!("No pairs configured. Run `tasksync pairs add` first.");
            return Ok(());
        }

        let mut backend = Backend::open(self.snapshot.as_deref())?;
        let overrides = PairOverrides {
            dry_run: self.dry_run,
            create_only: self.create_only,
        };
        let results = run_all(backend.store_mut(), &config, overrides);
        if !self.dry_run {
            backend.persist()?;
        }

        if self.json {
            print_json(&results)?;
        } else {
            print_results(&results, self.dry_run);
        }

        let failed = results.iter().filter(|r| r.result.is_err()).count();
        if failed > 0 {
            bail!("{failed} of {} pair(s) failed", results.len());
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct PairJson<'a> {
    pair: &'a str,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    passes: &'a [PassReport],
}

#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "item")]
    item: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "changes")]
    changes: String,
}

fn print_json(results: &[PairResult]) -> Result<()> {
    let payload: Vec<PairJson<'_>> = results
        .iter()
        .map(|r| match &r.result {
            Ok(report) => PairJson {
                pair: &r.label,
                ok: true,
                error: None,
                passes: &report.passes,
            },
            Err(e) => PairJson {
                pair: &r.label,
                ok: false,
                error: Some(e.to_string()),
                passes: &[],
            },
        })
        .collect();
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize sync report")?
    );
    Ok(())
}

fn print_results(results: &[PairResult], dry_run: bool) {
    for result in results {
        match &result.result {
            Ok(report) => {
                for pass in &report.passes {
                    print_pass(pass, dry_run);
                }
            }
            Err(e) => eprintln!("{} {}: {e}", "✗".red().bold(), result.label),
        }
    }
}

fn print_pass(pass: &PassReport, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    let route = format!("{} → {}", pass.source, pass.destination);
    if pass.mutation_count() == 0 {
        println!("{prefix}✓ {route}: nothing to do ({} items)", pass.outcomes.len());
        return;
    }

    println!(
        "{prefix}✓ {route}: {} created, {} updated, {} unchanged ({} changes)",
        pass.created(),
        pass.reconciled() - pass.unchanged(),
        pass.unchanged(),
        pass.mutation_count(),
    );
    let rows: Vec<OutcomeRow> = pass
        .outcomes
        .iter()
        .filter(|o| !o.mutations.is_empty())
        .map(|o| OutcomeRow {
            item: o.name.clone(),
            status: status_label(o.status),
            changes: o
                .mutations
                .iter()
                .map(|m| m.op())
                .collect::<Vec<_>>()
                .join(", "),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

fn status_label(status: ItemStatus) -> String {
    match status {
        ItemStatus::Created => "CREATED".green().bold().to_string(),
        ItemStatus::Reconciled => "UPDATED".yellow().bold().to_string(),
    }
}
