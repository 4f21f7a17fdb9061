//! Error types for spansync-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{RecordId, TypeName};

/// All errors that can arise from record store and collection operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record with this id exists in the store.
    #[error("record {0} not found")]
    NotFound(RecordId),

    /// The collection has no record type with this name.
    #[error("unknown record type '{0}'")]
    UnknownType(TypeName),

    /// More field values were supplied than the record type declares.
    #[error("record type '{record_type}' has {expected} fields, got {got}")]
    FieldCount {
        record_type: TypeName,
        expected: usize,
        got: usize,
    },

    /// Underlying I/O failure (permission denied, disk full, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error (save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load: includes file path and line context from serde_yaml.
    #[error("failed to parse collection at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`: cannot locate `~/.spansync/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// The collection YAML file did not exist at the expected path.
    #[error("collection not found at {path}")]
    CollectionNotFound { path: PathBuf },
}
