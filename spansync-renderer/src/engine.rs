//! Template evaluation: [`TemplateCache`] and [`TemplateEngine`].
//!
//! Evaluating a template for a source record builds one string:
//!
//! 1. start with a single `"\n"`;
//! 2. `StartIf(label)` reads its field and, if empty, skips every step until
//!    the `EndIf` carrying the same label;
//! 3. field steps read the raw value, check it for a dependency marker that
//!    points back at the target record, transform it, and append it;
//! 4. text steps are appended as is.
//!
//! The result is parsed into a [`Fragment`].

use std::collections::HashMap;
use std::path::Path;

use spansync_core::scanner;
use spansync_core::{Fragment, Record, RecordId, RecordType, TypeName};

use crate::error::RenderError;
use crate::source::{LayeredTemplates, TemplateSource};
use crate::template::{Step, Template};

// ---------------------------------------------------------------------------
// TemplateCache
// ---------------------------------------------------------------------------

/// Compiled templates keyed by record type name.
///
/// Entries are never invalidated; a template is compiled at most once for
/// the lifetime of the cache.
#[derive(Debug, Default)]
pub struct TemplateCache {
    compiled: HashMap<TypeName, Template>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }

    pub fn contains(&self, record_type: &TypeName) -> bool {
        self.compiled.contains_key(record_type)
    }

    /// The cached template for `record_type`, compiling it from `source` on
    /// first use. Failures are not cached.
    pub fn get_or_compile(
        &mut self,
        source: &dyn TemplateSource,
        record_type: &RecordType,
    ) -> Result<&Template, RenderError> {
        if !self.compiled.contains_key(&record_type.name) {
            let body = source.load(&record_type.name)?;
            let template = Template::compile(record_type, &body)?;
            tracing::debug!(
                "compiled template for '{}' ({} steps)",
                record_type.name,
                template.steps.len()
            );
            self.compiled.insert(record_type.name.clone(), template);
        }
        self.compiled
            .get(&record_type.name)
            .ok_or_else(|| RenderError::UnknownType(record_type.name.clone()))
    }
}

// ---------------------------------------------------------------------------
// TemplateEngine
// ---------------------------------------------------------------------------

/// Renders a source record through its type's template.
pub struct TemplateEngine {
    source: Box<dyn TemplateSource>,
    cache: TemplateCache,
}

impl TemplateEngine {
    pub fn new(source: impl TemplateSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            cache: TemplateCache::new(),
        }
    }

    /// Embedded defaults, overridden by `<Type>.html` files in
    /// `user_template_dir` when given.
    pub fn with_overrides(user_template_dir: Option<&Path>) -> Self {
        Self::new(LayeredTemplates::new(user_template_dir))
    }

    pub fn cache(&self) -> &TemplateCache {
        &self.cache
    }

    /// Render `source` (of type `record_type`) for insertion into a marker in
    /// record `target`.
    ///
    /// Fails with `UnknownType` when no template exists for the type and with
    /// `CycleDetected` when any field read during evaluation holds a
    /// top-level dependency marker whose `note` is `target`.
    pub fn evaluate(
        &mut self,
        record_type: &RecordType,
        source: &Record,
        target: RecordId,
    ) -> Result<Fragment, RenderError> {
        let template = self.cache.get_or_compile(self.source.as_ref(), record_type)?;
        let target_note = target.to_string();
        let fetch = |index: usize| fetch_field(source, index, &target_note, target);

        let mut out = String::from("\n");
        let mut skip: Option<&str> = None;
        for step in &template.steps {
            if let Some(label) = skip {
                match step {
                    Step::EndIf { label: end } if end == label => skip = None,
                    _ => {}
                }
                continue;
            }
            match step {
                Step::StartIf { label, index } => {
                    if fetch(*index)?.is_empty() {
                        skip = Some(label.as_str());
                    }
                }
                Step::EndIf { .. } => {}
                Step::Field { index, transform } => {
                    out.push_str(&transform.apply(fetch(*index)?));
                }
                Step::Text(text) => out.push_str(text),
            }
        }

        Ok(Fragment::parse(&out))
    }
}

// Raw field value, rejected if it links straight back to `target`.
fn fetch_field<'r>(
    source: &'r Record,
    index: usize,
    target_note: &str,
    target: RecordId,
) -> Result<&'r str, RenderError> {
    let value = source.field(index).unwrap_or("");
    let fragment = Fragment::parse(value);
    if scanner::dependency_markers(&fragment)
        .iter()
        .any(|(_, note)| note == target_note)
    {
        return Err(RenderError::CycleDetected { target });
    }
    Ok(value)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
