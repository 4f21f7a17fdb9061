//! [`DryRunStore`]: a write-capturing overlay over a read-only store.
//!
//! Reads see pending writes; nothing reaches the underlying store.

use std::collections::BTreeMap;

use spansync_core::{Record, RecordId, RecordStore, RecordType, SearchQuery, StoreError, TypeName};

pub struct DryRunStore<'a, S: ?Sized> {
    inner: &'a S,
    pending: BTreeMap<RecordId, Record>,
}

impl<'a, S: RecordStore + ?Sized> DryRunStore<'a, S> {
    pub fn new(inner: &'a S) -> Self {
        Self {
            inner,
            pending: BTreeMap::new(),
        }
    }

    /// Records that would have been written, by id.
    pub fn pending(&self) -> &BTreeMap<RecordId, Record> {
        &self.pending
    }

    pub fn into_pending(self) -> BTreeMap<RecordId, Record> {
        self.pending
    }
}

impl<S: RecordStore + ?Sized> RecordStore for DryRunStore<'_, S> {
    fn get(&self, id: RecordId) -> Result<Record, StoreError> {
        match self.pending.get(&id) {
            Some(record) => Ok(record.clone()),
            None => self.inner.get(id),
        }
    }

    fn update(&mut self, record: &Record) -> Result<(), StoreError> {
        if !self.pending.contains_key(&record.id) {
            self.inner.get(record.id)?;
        }
        tracing::info!("[dry-run] would update record {}", record.id);
        self.pending.insert(record.id, record.clone());
        Ok(())
    }

    fn find(&self, query: &SearchQuery) -> Result<Vec<RecordId>, StoreError> {
        let mut ids: Vec<RecordId> = self
            .inner
            .find(query)?
            .into_iter()
            .filter(|id| !self.pending.contains_key(id))
            .collect();
        ids.extend(
            self.pending
                .values()
                .filter(|r| query.matches(r))
                .map(|r| r.id),
        );
        ids.sort();
        Ok(ids)
    }

    fn record_type(&self, name: &TypeName) -> Result<RecordType, StoreError> {
        self.inner.record_type(name)
    }
}
