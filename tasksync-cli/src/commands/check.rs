//! `tasksync check` — setup-time validation of configured pairs.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use tasksync_sync::preflight;

use super::{load_config, Backend};

/// Arguments for `tasksync check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Pair config file (default: ~/.tasksync/pairs.yaml).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Check against a JSON store snapshot instead of Asana.
    #[arg(long, value_name = "FILE")]
    pub snapshot: Option<PathBuf>,
}

#[derive(Tabled)]
struct MissingRow {
    #[tabled(rename = "from")]
    source: String,
    #[tabled(rename = "to")]
    destination: String,
    #[tabled(rename = "missing section")]
    section: String,
    #[tabled(rename = "items affected")]
    items: usize,
}

impl CheckArgs {
    pub fn run(self) -> Result<()> {
        let config = load_config(self.config.as_deref())?;
        if config.pairs.is_empty() {
            println!("No pairs configured. Run `tasksync pairs add` first.");
            return Ok(());
        }
        let backend = Backend::open(self.snapshot.as_deref())?;

        let mut problems = 0;
        for pair in &config.pairs {
            let report = match preflight(backend.store(), pair) {
                Ok(report) => report,
                Err(e) => {
                    problems += 1;
                    eprintln!("{} {}: {e}", "✗".red().bold(), pair.label());
                    continue;
                }
            };
            if report.is_clean() {
                println!("{} {}: sections line up", "✓".green().bold(), report.label);
                continue;
            }

            problems += 1;
            println!(
                "{} {}: {} section(s) missing on the other side",
                "!".yellow().bold(),
                report.label,
                report.missing_sections.len()
            );
            let rows: Vec<MissingRow> = report
                .missing_sections
                .into_iter()
                .map(|m| MissingRow {
                    source: m.source,
                    destination: m.destination,
                    section: m.section,
                    items: m.items,
                })
                .collect();
            let mut table = Table::new(rows);
            table.with(Style::rounded());
            println!("{table}");
        }

        if problems > 0 {
            bail!(
                "{problems} of {} pair(s) need attention; create the missing sections or set \
                 `missing_section: skip_and_log`",
                config.pairs.len()
            );
        }
        Ok(())
    }
}
