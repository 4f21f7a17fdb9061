//! Where template definitions come from.
//!
//! | Source                | Lookup                                         |
//! |-----------------------|------------------------------------------------|
//! | [`EmbeddedTemplates`] | `Basic`, `Cloze` baked in via `include_str!`   |
//! | [`DirTemplates`]      | `<dir>/<Type>.html`                            |
//! | [`LayeredTemplates`]  | directory first, embedded second               |
//! | [`MemoryTemplates`]   | in-memory map                                  |

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use spansync_core::TypeName;

use crate::error::RenderError;

// ---------------------------------------------------------------------------
// Embedded templates: baked into the binary at compile time via include_str!
// ---------------------------------------------------------------------------

const TPLS: &[(&str, &str)] = &[
    ("Basic", include_str!("templates/Basic.html")),
    ("Cloze", include_str!("templates/Cloze.html")),
];

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RenderError {
    RenderError::Io {
        path: path.into(),
        source,
    }
}

/// Repository of raw template definitions, keyed by record type name.
pub trait TemplateSource {
    /// The template text for `record_type`, `RenderError::UnknownType` if there
    /// is none.
    fn load(&self, record_type: &TypeName) -> Result<String, RenderError>;
}

impl<T: TemplateSource + ?Sized> TemplateSource for Box<T> {
    fn load(&self, record_type: &TypeName) -> Result<String, RenderError> {
        (**self).load(record_type)
    }
}

// ---------------------------------------------------------------------------
// EmbeddedTemplates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedTemplates;

impl EmbeddedTemplates {
    /// Names of every embedded template.
    pub fn names() -> impl Iterator<Item = &'static str> {
        TPLS.iter().map(|(name, _)| *name)
    }
}

impl TemplateSource for EmbeddedTemplates {
    fn load(&self, record_type: &TypeName) -> Result<String, RenderError> {
        TPLS.iter()
            .find(|(name, _)| *name == record_type.0)
            .map(|(_, body)| (*body).to_owned())
            .ok_or_else(|| RenderError::UnknownType(record_type.clone()))
    }
}

// ---------------------------------------------------------------------------
// DirTemplates
// ---------------------------------------------------------------------------

/// User templates, one `<Type>.html` file per record type.
#[derive(Debug, Clone)]
pub struct DirTemplates {
    dir: PathBuf,
}

impl DirTemplates {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, record_type: &TypeName) -> PathBuf {
        self.dir.join(format!("{record_type}.html"))
    }
}

impl TemplateSource for DirTemplates {
    fn load(&self, record_type: &TypeName) -> Result<String, RenderError> {
        let path = self.path_for(record_type);
        match std::fs::read_to_string(&path) {
            Ok(body) => Ok(body),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(RenderError::UnknownType(record_type.clone()))
            }
            Err(e) => Err(io_err(path, e)),
        }
    }
}

// ---------------------------------------------------------------------------
// LayeredTemplates
// ---------------------------------------------------------------------------

/// User overrides from a directory, falling back to the embedded defaults.
#[derive(Debug, Clone)]
pub struct LayeredTemplates {
    overrides: Option<DirTemplates>,
}

impl LayeredTemplates {
    /// `user_template_dir` may be absent or missing on disk; both mean
    /// "embedded only".
    pub fn new(user_template_dir: Option<&Path>) -> Self {
        Self {
            overrides: user_template_dir.map(DirTemplates::new),
        }
    }
}

impl TemplateSource for LayeredTemplates {
    fn load(&self, record_type: &TypeName) -> Result<String, RenderError> {
        if let Some(dir) = &self.overrides {
            match dir.load(record_type) {
                Ok(body) => {
                    tracing::debug!("template override for '{record_type}' from {}", dir.dir().display());
                    return Ok(body);
                }
                Err(RenderError::UnknownType(_)) => {}
                Err(e) => return Err(e),
            }
        }
        EmbeddedTemplates.load(record_type)
    }
}

// ---------------------------------------------------------------------------
// MemoryTemplates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct MemoryTemplates {
    templates: HashMap<TypeName, String>,
}

impl MemoryTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, record_type: impl Into<TypeName>, body: impl Into<String>) -> Self {
        self.insert(record_type, body);
        self
    }

    pub fn insert(&mut self, record_type: impl Into<TypeName>, body: impl Into<String>) {
        self.templates.insert(record_type.into(), body.into());
    }
}

impl TemplateSource for MemoryTemplates {
    fn load(&self, record_type: &TypeName) -> Result<String, RenderError> {
        self.templates
            .get(record_type)
            .cloned()
            .ok_or_else(|| RenderError::UnknownType(record_type.clone()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
