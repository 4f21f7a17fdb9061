//! Domain types for the spansync collection.
//!
//! All types are serializable/deserializable via serde + serde_yaml so a
//! [`Collection`] can be persisted as a single YAML document.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Stable identifier of a record. Zero means "not yet persisted".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl RecordId {
    /// Id carried by records that were never written to a store.
    pub const UNSAVED: RecordId = RecordId(0);

    pub fn is_persisted(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u64> for RecordId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl FromStr for RecordId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(Self)
    }
}

/// Name of a record type (schema), e.g. `"Basic"` or `"Cloze"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeName(pub String);

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for TypeName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TypeName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Opaque token shared by every marker of one peer group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sid(pub String);

impl Sid {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Sid {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Sid {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// Schema of a record: its type name and ordered field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordType {
    pub name: TypeName,
    pub fields: Vec<String>,
}

impl RecordType {
    pub fn new<I, S>(name: impl Into<TypeName>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Position of the field called `name`, if the type has one.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == name)
    }
}

/// A record: typed, ordered field values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub record_type: TypeName,
    #[serde(default)]
    pub fields: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl Record {
    /// A record that has not been added to any store yet.
    pub fn unsaved(record_type: impl Into<TypeName>, fields: Vec<String>) -> Self {
        Self {
            id: RecordId::UNSAVED,
            record_type: record_type.into(),
            fields,
            updated_at: Utc::now(),
        }
    }

    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }
}

/// Root of the YAML collection document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub version: u32,
    #[serde(default)]
    pub record_types: Vec<RecordType>,
    #[serde(default)]
    pub records: Vec<Record>,
    /// Next id handed out by [`crate::store::MemoryStore::add`]; never zero.
    pub next_id: RecordId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Collection {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            version: 1,
            record_types: vec![],
            records: vec![],
            next_id: RecordId(1),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Collection {
    /// A collection seeded with the stock `Basic` and `Cloze` types.
    pub fn with_default_types() -> Self {
        Self {
            record_types: vec![
                RecordType::new("Basic", ["Front", "Back"]),
                RecordType::new("Cloze", ["Text", "Back Extra"]),
            ],
            ..Self::default()
        }
    }

    pub fn record_type(&self, name: &TypeName) -> Option<&RecordType> {
        self.record_types.iter().find(|t| &t.name == name)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
