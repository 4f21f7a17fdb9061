//! Dry-run unified diff support for `spansync diff`.

use rand::Rng;
use similar::TextDiff;

use spansync_core::{RecordId, RecordStore};

use crate::bidir::ConflictResolver;
use crate::context::SyncContext;
use crate::dry_run::DryRunStore;
use crate::pipeline::{run, SyncScope};
use crate::SyncError;

/// A single changed field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDiff {
    pub id: RecordId,
    pub field: String,
    pub unified_diff: String,
}

/// Diff result for one record's sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRecordResult {
    pub id: RecordId,
    /// One entry per changed field of every record the sync would write,
    /// peers included, ordered by record id then field.
    pub diffs: Vec<FieldDiff>,
}

/// Sync `id` against an overlay and compare what would be written with what
/// `store` holds now.
///
/// Nothing is written.
pub fn diff_record<S, R, C>(
    ctx: &mut SyncContext<R>,
    store: &S,
    id: RecordId,
    resolver: &mut C,
) -> Result<DiffRecordResult, SyncError>
where
    S: RecordStore + ?Sized,
    R: Rng,
    C: ConflictResolver + ?Sized,
{
    let mut overlay = DryRunStore::new(store);
    run(ctx, &mut overlay, SyncScope::Record(id), resolver, false)?;

    let mut diffs = Vec::new();
    for (changed_id, updated) in overlay.into_pending() {
        let current = store.get(changed_id)?;
        let names = store
            .record_type(&current.record_type)
            .map(|t| t.fields)
            .unwrap_or_default();

        for (idx, new) in updated.fields.iter().enumerate() {
            let old = current.field(idx).unwrap_or("");
            if old == new {
                continue;
            }
            let field = names.get(idx).cloned().unwrap_or_else(|| idx.to_string());
            let old_header = format!("a/{changed_id}/{field}");
            let new_header = format!("b/{changed_id}/{field}");
            let unified = TextDiff::from_lines(old, new.as_str())
                .unified_diff()
                .header(&old_header, &new_header)
                .context_radius(3)
                .to_string();
            diffs.push(FieldDiff {
                id: changed_id,
                field,
                unified_diff: unified,
            });
        }
    }

    Ok(DiffRecordResult { id, diffs })
}
