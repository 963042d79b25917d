//! # Document Template Renderer
//!
//! One renderer for every printable document (receipt, invoice, quote; thermal
//! or A4). Templates are user-editable HTML strings with three constructs:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  {{key}}                        scalar substitution                     │
//! │  {{#key}} … {{/key}}            kept only when data[key] is truthy      │
//! │  {{#each list}} … {{/each}}     repeated once per element of data[list] │
//! └─────────────────────────────────────────────────────────────────────────┘
//!
//!   source ──► parse() ──► Template (node tree) ──► render(&data) ──► String
//!                 │
//!                 └──► TemplateError { offset } on malformed input
//! ```
//!
//! ## Rules
//! - Missing or null keys render as the empty string, never as the raw token.
//! - Strings are inserted verbatim. There is no HTML escaping; templates and
//!   data are both owned by the tenant.
//! - Truthy: non-empty string, non-zero number, `true`, non-empty list, object.
//! - Inside an each block keys resolve against the current element only; a
//!   key the element lacks renders empty, a section on it is dropped.
//! - Nothing is evaluated. `{{a + b}}` is just a key that is never present.
//!
//! Rendering is deterministic and infallible once parsing succeeded.

mod context;
mod parser;

pub use context::{CurrencyFormat, DocumentContext, SymbolPosition};

use serde_json::Value;

use crate::error::TemplateError;
use parser::Node;

/// A parsed template, reusable across renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    /// Compiles template source.
    ///
    /// ## Errors
    /// Any malformed tag or unbalanced block, with its byte offset.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        Ok(Template {
            nodes: parser::parse(source)?,
        })
    }

    /// Renders against a data bag (normally a JSON object).
    pub fn render(&self, data: &Value) -> String {
        let mut out = String::new();
        render_nodes(&self.nodes, data, &mut out);
        out
    }
}

/// Parses and renders in one step.
///
/// ```rust
/// use serde_json::json;
/// use tillbook_core::template::render;
///
/// let html = render("{{#each items}}{{name}};{{/each}}", &json!({
///     "items": [{ "name": "a" }, { "name": "b" }]
/// })).unwrap();
/// assert_eq!(html, "a;b;");
/// ```
pub fn render(source: &str, data: &Value) -> Result<String, TemplateError> {
    Ok(Template::parse(source)?.render(data))
}

// =============================================================================
// Rendering
// =============================================================================

fn render_nodes(nodes: &[Node], scope: &Value, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Var(key) => {
                if let Some(value) = lookup(scope, key) {
                    write_scalar(value, out);
                }
            }
            Node::Section { key, body } => {
                if lookup(scope, key).is_some_and(is_truthy) {
                    render_nodes(body, scope, out);
                }
            }
            Node::Each { key, body } => {
                if let Some(Value::Array(elements)) = lookup(scope, key) {
                    for element in elements {
                        render_nodes(body, element, out);
                    }
                }
            }
        }
    }
}

/// Non-object scopes contribute nothing.
fn lookup<'a>(scope: &'a Value, key: &str) -> Option<&'a Value> {
    scope.as_object().and_then(|map| map.get(key))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

fn write_scalar(value: &Value, out: &mut String) {
    match value {
        Value::Null => {}
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::String(s) => out.push_str(s),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                out.push_str(&i.to_string());
            } else if let Some(u) = n.as_u64() {
                out.push_str(&u.to_string());
            } else if let Some(f) = n.as_f64() {
                out.push_str(&format_float(f));
            }
        }
        // Lists and objects have no sensible scalar form.
        Value::Array(_) | Value::Object(_) => {}
    }
}

/// Whole floats print without a fraction: `3.0` → `3`.
fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        format!("{}", f)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
