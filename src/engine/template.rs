//! `${key}` SQL templates.
//!
//! A template is parsed once into literal and placeholder segments. It can
//! then be rendered two ways:
//! - [`SqlTemplate::splice`] substitutes parameter text directly into the SQL
//! - [`SqlTemplate::bind`] emits vendor placeholders and collects the values in
//!   binding order
//!
//! Splicing does no escaping. Callers that accept untrusted input should use
//! the bound form.

use crate::error::{GatewayError, GatewayResult};
use crate::models::{Params, QueryParam, VendorKind};
use std::fmt::Write as _;

const OPEN: &str = "${";
const CLOSE: char = '}';

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A parsed SQL template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlTemplate {
    segments: Vec<Segment>,
}

/// Positional parameter syntax of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?` (MySQL, SQLite)
    QuestionMark,
    /// `$1`, `$2`, ... (PostgreSQL)
    Numbered,
}

impl PlaceholderStyle {
    pub fn for_vendor(vendor: VendorKind) -> Self {
        match vendor {
            VendorKind::PostgreSql => Self::Numbered,
            _ => Self::QuestionMark,
        }
    }

    /// Placeholder for the 1-based parameter `index`.
    fn write(&self, out: &mut String, index: usize) {
        match self {
            Self::QuestionMark => out.push('?'),
            Self::Numbered => {
                let _ = write!(out, "${index}");
            }
        }
    }
}

/// SQL with positional placeholders and the values to bind, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundStatement {
    pub sql: String,
    pub params: Vec<QueryParam>,
}

impl SqlTemplate {
    /// Split `text` into literals and `${key}` placeholders.
    ///
    /// An opener with no closing brace is literal text. When another opener
    /// appears before the closing brace, the outer one is literal and parsing
    /// resumes at the inner one.
    pub fn parse(text: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = text;

        while let Some(start) = rest.find(OPEN) {
            literal.push_str(&rest[..start]);
            let after = &rest[start + OPEN.len()..];

            let Some(end) = after.find(CLOSE) else {
                literal.push_str(OPEN);
                rest = after;
                break;
            };

            let key = &after[..end];
            if key.contains(OPEN) {
                literal.push_str(OPEN);
                rest = after;
                continue;
            }

            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Placeholder(key.to_string()));
            rest = &after[end + 1..];
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Self { segments }
    }

    /// Placeholder keys in order of appearance, repeats included.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder(key) => Some(key.as_str()),
            Segment::Literal(_) => None,
        })
    }

    pub fn has_placeholders(&self) -> bool {
        self.placeholders().next().is_some()
    }

    /// Substitute each placeholder with the text of its parameter.
    /// Missing keys and nulls become empty text.
    pub fn splice(&self, params: &Params) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(key) => {
                    if let Some(value) = params.get(key) {
                        out.push_str(&value.to_template_text());
                    }
                }
            }
        }
        out
    }

    /// Replace each placeholder with a positional marker and collect its value.
    ///
    /// Every placeholder must have a parameter; a missing key is a validation error.
    pub fn bind(&self, params: &Params, style: PlaceholderStyle) -> GatewayResult<BoundStatement> {
        let mut sql = String::new();
        let mut bound = Vec::new();

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => sql.push_str(text),
                Segment::Placeholder(key) => {
                    let value = params.get(key).ok_or_else(|| {
                        GatewayError::validation(format!("Missing parameter '{key}'"))
                    })?;
                    bound.push(value.clone());
                    style.write(&mut sql, bound.len());
                }
            }
        }

        Ok(BoundStatement { sql, params: bound })
    }
}
