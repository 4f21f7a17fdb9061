//! [`SyncContext`] bundles the engine state shared by every sync entry point.

use rand::rngs::ThreadRng;
use rand::Rng;

use spansync_core::{Record, RecordStore};
use spansync_renderer::TemplateEngine;

use crate::bidir::{BidirSync, ConflictResolver};
use crate::error::SyncError;
use crate::unidir::UnidirSync;

pub struct SyncContext<R = ThreadRng> {
    pub unidir: UnidirSync,
    pub bidir: BidirSync<R>,
}

impl SyncContext<ThreadRng> {
    pub fn new(engine: TemplateEngine) -> Self {
        Self::with_rng(engine, rand::thread_rng())
    }
}

impl<R: Rng> SyncContext<R> {
    pub fn with_rng(engine: TemplateEngine, rng: R) -> Self {
        Self {
            unidir: UnidirSync::new(engine),
            bidir: BidirSync::new(rng),
        }
    }

    /// Dependency markers first, then peer markers, on one field.
    pub fn sync_field<S, C>(
        &mut self,
        store: &mut S,
        record: &mut Record,
        idx: usize,
        resolver: &mut C,
    ) -> Result<bool, SyncError>
    where
        S: RecordStore + ?Sized,
        C: ConflictResolver + ?Sized,
    {
        let mut changed = self.unidir.sync_field(store, record, idx)?;
        changed |= self.bidir.sync_field(store, record, idx, resolver)?;
        Ok(changed)
    }

    /// [`SyncContext::sync_field`] over every field of `record`.
    pub fn sync_record<S, C>(
        &mut self,
        store: &mut S,
        record: &mut Record,
        resolver: &mut C,
    ) -> Result<bool, SyncError>
    where
        S: RecordStore + ?Sized,
        C: ConflictResolver + ?Sized,
    {
        let mut changed = false;
        for idx in 0..record.fields.len() {
            changed |= self.sync_field(store, record, idx, resolver)?;
        }
        Ok(changed)
    }
}
