//! Error types for spansync-renderer.

use std::path::PathBuf;

use thiserror::Error;

use spansync_core::{RecordId, TypeName};

/// All errors that can arise while loading, compiling or evaluating a template.
#[derive(Debug, Error)]
pub enum RenderError {
    /// No template is registered or loadable for the record type.
    #[error("no template for record type '{0}'")]
    UnknownType(TypeName),

    /// A field read from the source record points back at the target record.
    #[error("field links back to record {target}")]
    CycleDetected { target: RecordId },

    /// A `note` attribute does not name an existing record.
    #[error("invalid record id '{0}'")]
    InvalidId(String),

    /// A template references a field its record type does not declare.
    #[error("record type '{record_type}' has no field '{field}'")]
    UnknownField { record_type: TypeName, field: String },

    /// Filesystem error while loading a template file.
    #[error("template io error at {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
}

impl RenderError {
    /// Text shown inline, inside a `<div>`, in place of content that failed to render.
    pub fn placeholder(&self) -> &'static str {
        match self {
            RenderError::UnknownType(_) => "Unknown model",
            RenderError::CycleDetected { .. } => "Cycle detected",
            _ => "Invalid note ID",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_map_to_fixed_texts() {
        assert_eq!(RenderError::UnknownType("Foo".into()).placeholder(), "Unknown model");
        assert_eq!(
            RenderError::CycleDetected { target: RecordId(3) }.placeholder(),
            "Cycle detected"
        );
        assert_eq!(RenderError::InvalidId("x".into()).placeholder(), "Invalid note ID");
        assert_eq!(
            RenderError::UnknownField {
                record_type: "Basic".into(),
                field: "Nope".into()
            }
            .placeholder(),
            "Invalid note ID"
        );
    }
}
