//! # spansync-renderer
//!
//! Small template language used to render one record's fields into a sync
//! marker of another record.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use spansync_core::{Record, RecordId, RecordType};
//! use spansync_renderer::TemplateEngine;
//!
//! fn render(record_type: &RecordType, source: &Record, target: RecordId) {
//!     let mut engine = TemplateEngine::with_overrides(None);
//!     match engine.evaluate(record_type, source, target) {
//!         Ok(fragment) => println!("{}", fragment.to_html()),
//!         Err(e) => println!("<div>{}</div>", e.placeholder()),
//!     }
//! }
//! ```

pub mod engine;
pub mod error;
pub mod source;
pub mod template;
pub mod transform;

pub use engine::{TemplateCache, TemplateEngine};
pub use error::RenderError;
pub use source::{DirTemplates, EmbeddedTemplates, LayeredTemplates, MemoryTemplates, TemplateSource};
pub use template::{Template, Token};
pub use transform::Transform;
