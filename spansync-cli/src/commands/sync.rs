//! `spansync sync`: refresh dependency markers and reconcile peer markers.

use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use spansync_core::{RecordId, RecordStore, Sid};
use spansync_sync::{
    pipeline::{self, SyncScope},
    ConflictResolver, FixedResolution, RecordOutcome, Resolution, SyncReport,
};

use super::{sync_context, Prefer};
use crate::open_store;

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Record to sync in both directions (omit when using `--all`).
    pub id: Option<RecordId>,

    /// Only sync field N (zero-based) of the record.
    #[arg(long, value_name = "N", requires = "id")]
    pub field: Option<usize>,

    /// Refresh dependency markers in every record.
    #[arg(long, conflicts_with = "id")]
    pub all: bool,

    /// Show what would change without writing the collection.
    #[arg(long)]
    pub dry_run: bool,

    /// Settle incoherent peer groups this way instead of asking.
    #[arg(long, value_enum, value_name = "SIDE")]
    pub prefer: Option<Prefer>,
}

impl SyncArgs {
    pub fn run(self, home: &Path) -> Result<()> {
        let mut store = open_store(home)?;
        let scope = match (self.all, self.id, self.field) {
            (true, _, _) => SyncScope::All,
            (false, Some(id), None) => SyncScope::Record(id),
            (false, Some(id), Some(idx)) => {
                let record = store
                    .get(id)
                    .with_context(|| format!("cannot sync record {id}"))?;
                if idx >= record.fields.len() {
                    bail!(
                        "record {id} has {} fields; --field {idx} is out of range",
                        record.fields.len()
                    );
                }
                SyncScope::Field(id, idx)
            }
            (false, None, _) => bail!("provide a record id or use --all"),
        };

        let mut resolver = resolver_for(self.prefer);
        let mut ctx = sync_context(home);
        let report = pipeline::run(&mut ctx, &mut store, scope, resolver.as_mut(), self.dry_run)
            .with_context(|| match scope {
                SyncScope::All => "sync --all failed".to_owned(),
                SyncScope::Record(id) | SyncScope::Field(id, _) => {
                    format!("sync failed for record {id}")
                }
            })?;

        print_report(&report, self.dry_run);
        Ok(())
    }
}

pub fn resolver_for(prefer: Option<Prefer>) -> Box<dyn ConflictResolver> {
    match prefer {
        Some(p) => Box::new(FixedResolution(p.into())),
        None => Box::new(PromptResolver::new(io::stdin().lock(), io::stderr())),
    }
}

fn print_report(report: &SyncReport, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    let failed = report.failures().count();
    let unchanged = report.outcomes.len() - report.records_changed() - failed;

    if report.outcomes.is_empty() {
        println!("{prefix}{} nothing to do", "✓".green());
        return;
    }

    let mark = if failed == 0 { "✓".green() } else { "!".yellow() };
    println!(
        "{prefix}{mark} synced {} records ({} changed, {unchanged} unchanged, {failed} failed)",
        report.outcomes.len(),
        report.records_changed(),
    );

    for outcome in &report.outcomes {
        match outcome {
            RecordOutcome::Changed { id } => println!("  ✎  record {id}"),
            RecordOutcome::WouldChange { id } => println!("  ~  record {id}"),
            RecordOutcome::Unchanged { id } => println!("  ·  record {id}"),
            RecordOutcome::Failed { id, error } => {
                println!("  {}  record {id}: {error}", "✗".red())
            }
        }
    }

    let peers: Vec<String> = report
        .touched
        .iter()
        .filter(|id| !report.outcomes.iter().any(|o| o.id() == **id))
        .map(ToString::to_string)
        .collect();
    if !peers.is_empty() {
        println!("  ~  peers: {}", peers.join(", "));
    }
}

// ---------------------------------------------------------------------------
// Interactive conflict prompt
// ---------------------------------------------------------------------------

/// Asks on `output` and reads the answer from `input`. End of input, read
/// errors and an empty answer all mean download.
pub struct PromptResolver<I, O> {
    input: I,
    output: O,
}

impl<I: BufRead, O: Write> PromptResolver<I, O> {
    pub fn new(input: I, output: O) -> Self {
        Self { input, output }
    }
}

impl<I: BufRead, O: Write> ConflictResolver for PromptResolver<I, O> {
    fn resolve(&mut self, sid: &Sid) -> Resolution {
        loop {
            let _ = write!(
                self.output,
                "Markers with sid {} differ. [u]pload this one or [d]ownload a peer's? [d] ",
                sid.as_str().bold()
            );
            let _ = self.output.flush();

            let mut line = String::new();
            match self.input.read_line(&mut line) {
                Ok(0) | Err(_) => return Resolution::Download,
                Ok(_) => {}
            }
            match line.trim().to_ascii_lowercase().as_str() {
                "" | "d" | "download" => return Resolution::Download,
                "u" | "upload" => return Resolution::Upload,
                other => {
                    let _ = writeln!(self.output, "unrecognized answer '{other}'");
                }
            }
        }
    }
}
