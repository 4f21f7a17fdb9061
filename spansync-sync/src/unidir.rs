//! One-way sync of dependency markers.
//!
//! A dependency marker `<span class="sync" note="ID">` in a field is refilled
//! with record `ID` rendered through its type's template. Failures are
//! written into the marker as `<div>Unknown model</div>`,
//! `<div>Cycle detected</div>` or `<div>Invalid note ID</div>`.
//! Only markers directly inside the field are touched, so references are not
//! followed transitively.

use spansync_core::scanner;
use spansync_core::{Element, Fragment, Node, Record, RecordId, RecordStore, SearchQuery};
use spansync_renderer::{RenderError, TemplateEngine};

use crate::error::SyncError;

pub struct UnidirSync {
    engine: TemplateEngine,
}

impl UnidirSync {
    pub fn new(engine: TemplateEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &TemplateEngine {
        &self.engine
    }

    /// Refresh every dependency marker in field `idx` of `record`.
    ///
    /// Returns `Ok(false)` without touching anything for unsaved records and
    /// out-of-range indices. When a marker changed, the field is rewritten in
    /// `record` and the record is written to `store` once.
    pub fn sync_field<S: RecordStore + ?Sized>(
        &mut self,
        store: &mut S,
        record: &mut Record,
        idx: usize,
    ) -> Result<bool, SyncError> {
        if !record.id.is_persisted() || idx >= record.fields.len() {
            return Ok(false);
        }

        let mut fragment = Fragment::parse(&record.fields[idx]);
        let mut changed = false;
        for (i, note) in scanner::dependency_markers(&fragment) {
            let Some(marker) = fragment.element_mut(i) else {
                continue;
            };
            let mut refreshed = marker.emptied();
            match self.render(&*store, record.id, &note) {
                Ok(rendered) => refreshed.children = rendered.nodes,
                Err(e) => {
                    tracing::debug!("record {} field {idx}: note={note}: {e}", record.id);
                    refreshed
                        .children
                        .push(Node::Element(Element::with_text("div", e.placeholder())));
                }
            }
            if refreshed.to_html() != marker.to_html() {
                *marker = refreshed;
                changed = true;
            }
        }

        if changed {
            record.fields[idx] = fragment.to_html();
            store.update(record)?;
            tracing::info!("updated record {} field {idx}", record.id);
        }
        Ok(changed)
    }

    /// [`UnidirSync::sync_field`] over every field; true if any changed.
    pub fn sync_record<S: RecordStore + ?Sized>(
        &mut self,
        store: &mut S,
        record: &mut Record,
    ) -> Result<bool, SyncError> {
        let mut changed = false;
        for idx in 0..record.fields.len() {
            changed |= self.sync_field(store, record, idx)?;
        }
        Ok(changed)
    }

    /// Sync each record in `ids`, loading it from `store` first.
    pub fn sync_records<S: RecordStore + ?Sized>(
        &mut self,
        store: &mut S,
        ids: &[RecordId],
    ) -> Vec<(RecordId, Result<bool, SyncError>)> {
        let mut results = Vec::with_capacity(ids.len());
        for &id in ids {
            let result = match store.get(id) {
                Ok(mut record) => self.sync_record(store, &mut record),
                Err(e) => Err(e.into()),
            };
            results.push((id, result));
        }
        results
    }

    /// Sync every record holding a dependency marker. Returns how many
    /// records changed; records that fail to load or save are skipped.
    pub fn sync_all<S: RecordStore + ?Sized>(&mut self, store: &mut S) -> Result<usize, SyncError> {
        let ids = store.find(&SearchQuery::DependencyMarkers)?;
        let mut n_changed = 0;
        for (id, result) in self.sync_records(store, &ids) {
            match result {
                Ok(true) => n_changed += 1,
                Ok(false) => {}
                Err(e) => tracing::warn!("skipping record {id}: {e}"),
            }
        }
        tracing::info!("synced {} records, {n_changed} changed", ids.len());
        Ok(n_changed)
    }

    fn render<S: RecordStore + ?Sized>(
        &mut self,
        store: &S,
        target: RecordId,
        note: &str,
    ) -> Result<Fragment, RenderError> {
        let invalid = || RenderError::InvalidId(note.to_owned());
        let id = note
            .parse::<RecordId>()
            .ok()
            .filter(|id| id.is_persisted())
            .ok_or_else(invalid)?;
        let source = store.get(id).map_err(|_| invalid())?;
        let record_type = store
            .record_type(&source.record_type)
            .map_err(|_| RenderError::UnknownType(source.record_type.clone()))?;
        self.engine.evaluate(&record_type, &source, target)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use spansync_core::{MemoryStore, RecordType, TypeName};

    fn setup() -> (UnidirSync, MemoryStore) {
        (
            UnidirSync::new(TemplateEngine::with_overrides(None)),
            MemoryStore::with_default_types(),
        )
    }

    fn basic() -> TypeName {
        TypeName::from("Basic")
    }

    #[test]
    fn unsaved_record_is_noop() {
        let (mut sync, mut store) = setup();
        let mut record = Record::unsaved("Basic", vec![r#"<span class="sync" note="1"></span>"#.into(), String::new()]);
        assert!(!sync.sync_field(&mut store, &mut record, 0).unwrap());
    }

    #[test]
    fn out_of_range_field_is_noop() {
        let (mut sync, mut store) = setup();
        let id = store.add(&basic(), [r#"<span class="sync" note="foo"></span>"#]).unwrap();
        let mut record = store.get(id).unwrap();
        assert!(!sync.sync_field(&mut store, &mut record, 42).unwrap());
    }

    #[test]
    fn unknown_type_placeholder() {
        let (mut sync, mut store) = setup();
        store.add_record_type(RecordType::new("NoTemplate", ["A"]));
        let src = store.add(&TypeName::from("NoTemplate"), ["x"]).unwrap();
        let id = store
            .add(&basic(), [format!(r#"<span class="sync" note="{src}"></span>"#)])
            .unwrap();
        let mut record = store.get(id).unwrap();
        assert!(sync.sync_field(&mut store, &mut record, 0).unwrap());
        assert_eq!(
            store.get(id).unwrap().fields[0],
            format!(r#"<span class="sync" note="{src}"><div>Unknown model</div></span>"#)
        );
    }

    #[test]
    fn zero_id_is_invalid() {
        let (mut sync, mut store) = setup();
        let id = store.add(&basic(), [r#"<span class="sync" note="0"></span>"#]).unwrap();
        let mut record = store.get(id).unwrap();
        sync.sync_field(&mut store, &mut record, 0).unwrap();
        assert_eq!(
            record.fields[0],
            r#"<span class="sync" note="0"><div>Invalid note ID</div></span>"#
        );
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let (mut sync, mut store) = setup();
        let id = store.add(&basic(), ["placeholder"]).unwrap();
        let mut record = store.get(id).unwrap();
        record.fields[0] = format!(r#"<span class="sync" note="{id}"></span>"#);
        store.update(&record).unwrap();

        sync.sync_field(&mut store, &mut record, 0).unwrap();
        assert_eq!(
            record.fields[0],
            format!(r#"<span class="sync" note="{id}"><div>Cycle detected</div></span>"#)
        );
    }

    #[test]
    fn sync_all_counts_changed_records() {
        let (mut sync, mut store) = setup();
        let src = store.add(&TypeName::from("Cloze"), ["{{c1::one}}"]).unwrap();
        store
            .add(&basic(), [format!(r#"<span class="sync" note="{src}"></span>"#)])
            .unwrap();
        assert_eq!(sync.sync_all(&mut store).unwrap(), 1);
        assert_eq!(sync.sync_all(&mut store).unwrap(), 0, "second pass is idempotent");
    }
}
