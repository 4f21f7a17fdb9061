//! Entry points for a host editor.
//!
//! - [`on_field_unfocused`]: the user left a field; sync it.
//! - [`on_collection_sync_start`]: the collection is about to be synced
//!   elsewhere; refresh every dependency marker first.
//!
//! Hooks never fail; errors are logged and reported as "nothing changed".

use rand::Rng;

use spansync_core::{Record, RecordStore};

use crate::bidir::ConflictResolver;
use crate::context::SyncContext;

/// Returns `changed` OR whether this sync changed the field.
pub fn on_field_unfocused<S, R, C>(
    ctx: &mut SyncContext<R>,
    store: &mut S,
    changed: bool,
    record: &mut Record,
    idx: usize,
    resolver: &mut C,
) -> bool
where
    S: RecordStore + ?Sized,
    R: Rng,
    C: ConflictResolver + ?Sized,
{
    match ctx.sync_field(store, record, idx, resolver) {
        Ok(synced) => changed | synced,
        Err(e) => {
            tracing::warn!("sync of record {} field {idx} failed: {e}", record.id);
            changed
        }
    }
}

/// Number of records changed.
pub fn on_collection_sync_start<S, R>(ctx: &mut SyncContext<R>, store: &mut S) -> usize
where
    S: RecordStore + ?Sized,
    R: Rng,
{
    ctx.unidir.sync_all(store).unwrap_or_else(|e| {
        tracing::warn!("collection sync failed: {e}");
        0
    })
}
