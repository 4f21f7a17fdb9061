//! Shared sync pipeline entrypoint used by the CLI.

use rand::Rng;

use spansync_core::{RecordId, RecordStore};

use crate::bidir::ConflictResolver;
use crate::context::SyncContext;
use crate::dry_run::DryRunStore;
use crate::SyncError;

/// Scope for a sync pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncScope {
    /// Refresh dependency markers in every record holding one.
    All,
    /// Both directions, every field of one record.
    Record(RecordId),
    /// Both directions, one field of one record.
    Field(RecordId, usize),
}

/// Outcome for one record in scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The record was rewritten.
    Changed { id: RecordId },
    /// Nothing to do.
    Unchanged { id: RecordId },
    /// `--dry-run` mode: the record *would* have been rewritten.
    WouldChange { id: RecordId },
    /// The record could not be loaded or saved; the run went on.
    Failed { id: RecordId, error: String },
}

impl RecordOutcome {
    pub fn id(&self) -> RecordId {
        match self {
            RecordOutcome::Changed { id }
            | RecordOutcome::Unchanged { id }
            | RecordOutcome::WouldChange { id }
            | RecordOutcome::Failed { id, .. } => *id,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub outcomes: Vec<RecordOutcome>,
    /// Records written, or that would be. In dry-run this also lists peers
    /// touched by uploads.
    pub touched: Vec<RecordId>,
}

impl SyncReport {
    pub fn records_changed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, RecordOutcome::Changed { .. } | RecordOutcome::WouldChange { .. }))
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &RecordOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, RecordOutcome::Failed { .. }))
    }
}

/// Run the sync pipeline for a scope.
///
/// With `dry_run`, every write is captured by a [`DryRunStore`] and `store`
/// is left untouched. A record named by `Record`/`Field` that does not exist
/// is an error; in `All` scope failing records are reported and skipped.
pub fn run<S, R, C>(
    ctx: &mut SyncContext<R>,
    store: &mut S,
    scope: SyncScope,
    resolver: &mut C,
    dry_run: bool,
) -> Result<SyncReport, SyncError>
where
    S: RecordStore + ?Sized,
    R: Rng,
    C: ConflictResolver + ?Sized,
{
    if dry_run {
        let mut overlay = DryRunStore::new(&*store);
        let mut report = run_scope(ctx, &mut overlay, scope, resolver, true)?;
        report.touched = overlay.pending().keys().copied().collect();
        return Ok(report);
    }
    run_scope(ctx, store, scope, resolver, false)
}

fn run_scope<S, R, C>(
    ctx: &mut SyncContext<R>,
    store: &mut S,
    scope: SyncScope,
    resolver: &mut C,
    dry_run: bool,
) -> Result<SyncReport, SyncError>
where
    S: RecordStore + ?Sized,
    R: Rng,
    C: ConflictResolver + ?Sized,
{
    let changed = |id: RecordId| {
        if dry_run {
            RecordOutcome::WouldChange { id }
        } else {
            RecordOutcome::Changed { id }
        }
    };
    let outcome = |id: RecordId, result: Result<bool, SyncError>| match result {
        Ok(true) => changed(id),
        Ok(false) => RecordOutcome::Unchanged { id },
        Err(e) => {
            tracing::warn!("skipping record {id}: {e}");
            RecordOutcome::Failed {
                id,
                error: e.to_string(),
            }
        }
    };

    let outcomes = match scope {
        SyncScope::All => {
            let ids = store.find(&spansync_core::SearchQuery::DependencyMarkers)?;
            ctx.unidir
                .sync_records(store, &ids)
                .into_iter()
                .map(|(id, result)| outcome(id, result))
                .collect()
        }
        SyncScope::Record(id) => {
            let mut record = store.get(id)?;
            let result = ctx.sync_record(store, &mut record, resolver)?;
            vec![outcome(id, Ok(result))]
        }
        SyncScope::Field(id, idx) => {
            let mut record = store.get(id)?;
            let result = ctx.sync_field(store, &mut record, idx, resolver)?;
            vec![outcome(id, Ok(result))]
        }
    };

    let touched = outcomes
        .iter()
        .filter(|o| matches!(o, RecordOutcome::Changed { .. } | RecordOutcome::WouldChange { .. }))
        .map(RecordOutcome::id)
        .collect();
    Ok(SyncReport { outcomes, touched })
}
