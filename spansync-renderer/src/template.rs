//! Template tokenizer and compiler.
//!
//! | Syntax                 | Token                              |
//! |------------------------|------------------------------------|
//! | `{{#Field}}`           | [`Token::StartIf`]                 |
//! | `{{/Field}}`           | [`Token::EndIf`]                   |
//! | `{{Field}}`            | [`Token::Field`], `Normal`         |
//! | `{{Field:cloze}}` etc. | [`Token::Field`] with a transform  |
//! | anything else          | [`Token::Text`], runs merged       |
//!
//! A `{{…}}` that is not a valid field reference (`{{}}`, `{{a:b:c}}`) is
//! kept as literal text. Field names are taken verbatim, whitespace included.

use std::sync::LazyLock;

use regex::Regex;

use spansync_core::{RecordType, TypeName};

use crate::error::RenderError;
use crate::transform::Transform;

static TOKENS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)(?P<startif>\{\{#.*?\}\})|(?P<endif>\{\{/.*?\}\})|(?P<field>\{\{.*?\}\})")
        .expect("valid token regex")
});

static FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\A\{\{(?P<field>[^:]+?)(?::(?P<type>\w*))?\}\}\z").expect("valid field regex")
});

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Text(String),
    Field { name: String, transform: Transform },
    StartIf(String),
    EndIf(String),
}

/// Split a template definition into tokens.
pub fn tokenize(template: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut last = 0;

    for caps in TOKENS.captures_iter(template) {
        let Some(whole) = caps.get(0) else { continue };
        text.push_str(&template[last..whole.start()]);
        last = whole.end();

        let tag = whole.as_str();
        let token = if caps.name("startif").is_some() {
            Some(Token::StartIf(label(tag)))
        } else if caps.name("endif").is_some() {
            Some(Token::EndIf(label(tag)))
        } else {
            field_token(tag)
        };

        match token {
            Some(token) => {
                if !text.is_empty() {
                    tokens.push(Token::Text(std::mem::take(&mut text)));
                }
                tokens.push(token);
            }
            None => text.push_str(tag),
        }
    }

    text.push_str(&template[last..]);
    if !text.is_empty() {
        tokens.push(Token::Text(text));
    }
    tokens
}

// `{{#Label}}` / `{{/Label}}` → `Label`
fn label(tag: &str) -> String {
    tag[3..tag.len() - 2].to_owned()
}

fn field_token(tag: &str) -> Option<Token> {
    let caps = FIELD.captures(tag)?;
    let name = caps.name("field")?.as_str().to_owned();
    let transform = Transform::from_suffix(caps.name("type").map(|m| m.as_str()));
    Some(Token::Field { name, transform })
}

// ---------------------------------------------------------------------------
// Compiled template
// ---------------------------------------------------------------------------

/// A token with its field name resolved to an index into the record's values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Text(String),
    Field { index: usize, transform: Transform },
    StartIf { label: String, index: usize },
    EndIf { label: String },
}

/// The token stream for one record type, ready to evaluate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub record_type: TypeName,
    pub steps: Vec<Step>,
}

impl Template {
    /// Tokenize `source` and resolve every field reference against
    /// `record_type`.
    pub fn compile(record_type: &RecordType, source: &str) -> Result<Self, RenderError> {
        let resolve = |name: &str| {
            record_type
                .field_index(name)
                .ok_or_else(|| RenderError::UnknownField {
                    record_type: record_type.name.clone(),
                    field: name.to_owned(),
                })
        };

        let steps = tokenize(source)
            .into_iter()
            .map(|token| {
                Ok(match token {
                    Token::Text(text) => Step::Text(text),
                    Token::Field { name, transform } => Step::Field {
                        index: resolve(&name)?,
                        transform,
                    },
                    Token::StartIf(label) => Step::StartIf {
                        index: resolve(&label)?,
                        label,
                    },
                    Token::EndIf(label) => Step::EndIf { label },
                })
            })
            .collect::<Result<Vec<_>, RenderError>>()?;

        Ok(Self {
            record_type: record_type.name.clone(),
            steps,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Token {
        Token::Text(s.to_owned())
    }

    fn field(name: &str, transform: Transform) -> Token {
        Token::Field {
            name: name.to_owned(),
            transform,
        }
    }

    #[test]
    fn tokenizes_basic_template() {
        let tokens = tokenize("<div>\n{{#Front}}  {{Front}}\n  {{/Front}}<hr>\n  {{Back}}\n</div>\n");
        assert_eq!(
            tokens,
            vec![
                text("<div>\n"),
                Token::StartIf("Front".into()),
                text("  "),
                field("Front", Transform::Normal),
                text("\n  "),
                Token::EndIf("Front".into()),
                text("<hr>\n  "),
                field("Back", Transform::Normal),
                text("\n</div>\n"),
            ]
        );
    }

    #[test]
    fn field_types_map_to_transforms() {
        let tokens = tokenize("{{A:cloze}}{{B:cloze_overlapping}}{{C:assumptions}}{{D:with_im_eq_hint}}{{E:other}}{{F:}}");
        assert_eq!(
            tokens,
            vec![
                field("A", Transform::Cloze),
                field("B", Transform::ClozeOverlapping),
                field("C", Transform::Assumptions),
                field("D", Transform::ImEqHint),
                field("E", Transform::Normal),
                field("F", Transform::Normal),
            ]
        );
    }

    #[test]
    fn invalid_field_forms_stay_text() {
        assert_eq!(tokenize("a{{}}b"), vec![text("a{{}}b")]);
        assert_eq!(tokenize("x{{a:b:c}}"), vec![text("x{{a:b:c}}")]);
        assert_eq!(tokenize("{{unterminated"), vec![text("{{unterminated")]);
    }

    #[test]
    fn names_are_not_trimmed() {
        assert_eq!(tokenize("{{ Front }}"), vec![field(" Front ", Transform::Normal)]);
    }

    #[test]
    fn compile_resolves_indices() {
        let t = RecordType::new("Basic", ["Front", "Back"]);
        let compiled = Template::compile(&t, "{{#Back}}{{Front:cloze}}{{/Back}}").unwrap();
        assert_eq!(
            compiled.steps,
            vec![
                Step::StartIf {
                    label: "Back".into(),
                    index: 1
                },
                Step::Field {
                    index: 0,
                    transform: Transform::Cloze
                },
                Step::EndIf {
                    label: "Back".into()
                },
            ]
        );
    }

    #[test]
    fn compile_rejects_unknown_fields() {
        let t = RecordType::new("Basic", ["Front", "Back"]);
        let err = Template::compile(&t, "{{Missing}}").unwrap_err();
        assert!(matches!(err, RenderError::UnknownField { ref field, .. } if field == "Missing"));
    }
}
