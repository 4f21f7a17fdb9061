//! Record store abstraction and the two stores shipped with spansync.
//!
//! The sync engine only needs four things from storage: load a record, write
//! a record back, look up a record type, and find records whose field text
//! contains a marker. [`RecordStore`] captures exactly that.
//!
//! - [`MemoryStore`] keeps a [`Collection`] in memory.
//! - [`FileStore`] wraps a [`MemoryStore`] and rewrites
//!   `<home>/.spansync/collection.yaml` after every update.

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::collection;
use crate::error::StoreError;
use crate::types::{Collection, Record, RecordId, RecordType, Sid, TypeName};

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Searches understood by every store. Each is a plain substring test over
/// every field of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchQuery {
    /// Records containing any dependency marker.
    DependencyMarkers,
    /// Records containing a peer marker written exactly as
    /// `<span class="sync" sid="TOKEN">`.
    PeerMarkers(Sid),
    /// Records mentioning `sid="TOKEN"` anywhere.
    SidToken(Sid),
}

impl SearchQuery {
    /// The text a field must contain to match.
    pub fn pattern(&self) -> String {
        match self {
            SearchQuery::DependencyMarkers => r#"<span class="sync" note="#.to_string(),
            SearchQuery::PeerMarkers(sid) => format!(r#"<span class="sync" sid="{sid}">"#),
            SearchQuery::SidToken(sid) => format!(r#"sid="{sid}""#),
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        let pattern = self.pattern();
        record.fields.iter().any(|f| f.contains(&pattern))
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Storage collaborator used by the sync engine.
///
/// `update` is atomic for a single record; nothing spans several records.
pub trait RecordStore {
    /// Load a record, `StoreError::NotFound` if absent.
    fn get(&self, id: RecordId) -> Result<Record, StoreError>;

    /// Replace the stored copy of `record` (matched by id).
    fn update(&mut self, record: &Record) -> Result<(), StoreError>;

    /// Ids of all records matching `query`, ascending.
    fn find(&self, query: &SearchQuery) -> Result<Vec<RecordId>, StoreError>;

    /// Schema for `name`, `StoreError::UnknownType` if absent.
    fn record_type(&self, name: &TypeName) -> Result<RecordType, StoreError>;
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collection: Collection,
}

impl MemoryStore {
    pub fn new(collection: Collection) -> Self {
        Self { collection }
    }

    /// An empty store knowing the stock `Basic` and `Cloze` types.
    pub fn with_default_types() -> Self {
        Self::new(Collection::with_default_types())
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn into_collection(self) -> Collection {
        self.collection
    }

    /// Register a record type, replacing any type with the same name.
    pub fn add_record_type(&mut self, record_type: RecordType) {
        self.collection.record_types.retain(|t| t.name != record_type.name);
        self.collection.record_types.push(record_type);
    }

    /// Insert a new record and return its freshly assigned id.
    ///
    /// Missing trailing field values are filled with empty strings.
    pub fn add<I, S>(&mut self, record_type: &TypeName, values: I) -> Result<RecordId, StoreError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let schema = self
            .collection
            .record_type(record_type)
            .ok_or_else(|| StoreError::UnknownType(record_type.clone()))?;
        let mut fields: Vec<String> = values.into_iter().map(Into::into).collect();
        if fields.len() > schema.fields.len() {
            return Err(StoreError::FieldCount {
                record_type: record_type.clone(),
                expected: schema.fields.len(),
                got: fields.len(),
            });
        }
        fields.resize(schema.fields.len(), String::new());

        let id = self.collection.next_id;
        self.collection.next_id = RecordId(id.0 + 1);
        let now = Utc::now();
        self.collection.records.push(Record {
            id,
            record_type: record_type.clone(),
            fields,
            updated_at: now,
        });
        self.collection.updated_at = now;
        Ok(id)
    }

    pub fn records(&self) -> &[Record] {
        &self.collection.records
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, id: RecordId) -> Result<Record, StoreError> {
        self.collection
            .records
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    fn update(&mut self, record: &Record) -> Result<(), StoreError> {
        let slot = self
            .collection
            .records
            .iter_mut()
            .find(|r| r.id == record.id)
            .ok_or(StoreError::NotFound(record.id))?;
        let now = Utc::now();
        *slot = Record {
            updated_at: now,
            ..record.clone()
        };
        self.collection.updated_at = now;
        Ok(())
    }

    fn find(&self, query: &SearchQuery) -> Result<Vec<RecordId>, StoreError> {
        let mut ids: Vec<RecordId> = self
            .collection
            .records
            .iter()
            .filter(|r| query.matches(r))
            .map(|r| r.id)
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn record_type(&self, name: &TypeName) -> Result<RecordType, StoreError> {
        self.collection
            .record_type(name)
            .cloned()
            .ok_or_else(|| StoreError::UnknownType(name.clone()))
    }
}

// ---------------------------------------------------------------------------
// FileStore
// ---------------------------------------------------------------------------

/// A [`MemoryStore`] persisted to `<home>/.spansync/collection.yaml`.
///
/// Every successful [`RecordStore::update`] and [`FileStore::add`] rewrites
/// the whole file atomically (`.tmp` sibling + rename).
#[derive(Debug)]
pub struct FileStore {
    home: PathBuf,
    inner: MemoryStore,
}

impl FileStore {
    /// Open the collection under `home`, `StoreError::CollectionNotFound` if
    /// `spansync init` has not been run.
    pub fn open_at(home: &Path) -> Result<Self, StoreError> {
        let collection = collection::load_at(home)?;
        Ok(Self {
            home: home.to_path_buf(),
            inner: MemoryStore::new(collection),
        })
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn add<I, S>(&mut self, record_type: &TypeName, values: I) -> Result<RecordId, StoreError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = self.inner.add(record_type, values)?;
        self.save()?;
        Ok(id)
    }

    fn save(&self) -> Result<(), StoreError> {
        collection::save_at(&self.home, self.inner.collection())
    }
}

impl RecordStore for FileStore {
    fn get(&self, id: RecordId) -> Result<Record, StoreError> {
        self.inner.get(id)
    }

    fn update(&mut self, record: &Record) -> Result<(), StoreError> {
        self.inner.update(record)?;
        self.save()
    }

    fn find(&self, query: &SearchQuery) -> Result<Vec<RecordId>, StoreError> {
        self.inner.find(query)
    }

    fn record_type(&self, name: &TypeName) -> Result<RecordType, StoreError> {
        self.inner.record_type(name)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
