//! Template substitution
//!
//! Raw evaluator snippets may contain `{{ name }}` or `{{ name.path }}`
//! placeholders that are replaced with literals before evaluation. The two
//! evaluator languages share this pipeline but differ in how values become
//! literals:
//!
//! - **Script target**: rhai-native literals - double-quoted strings,
//!   lowercase booleans, `()` for null, `#{ ... }` object maps - so the
//!   substituted text is a valid expression.
//! - **Cypher target**: JSON serialization - nodes render as their property
//!   maps, relationships as `{type, start, end, properties}`, paths as lists
//!   of element ids.
//!
//! After substitution both targets are quote-normalized: any remaining
//! single-quoted string literal (authors write `'Yes'`) is rewritten to
//! double-quoted form, which both the graph dialect and rhai require.
//! Normalization is escape-aware and leaves spans inside double-quoted
//! literals untouched.
//!
//! The async, lazily-resolving half of substitution (looking placeholder
//! roots up in the walk context and triggering variable resolution) lives in
//! [`crate::eval`]; this module is pure text machinery.

use askflow_graph::GraphValue;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Which evaluator the substituted snippet is destined for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Script,
    Cypher,
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{\s*([\w\.]+)\s*\}\}").expect("placeholder pattern is valid")
    })
}

/// All placeholder expressions (dotted paths included) in `text`, in order
/// of first appearance, deduplicated.
pub fn placeholders(text: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for caps in placeholder_re().captures_iter(text) {
        let expr = caps[1].to_string();
        if !seen.contains(&expr) {
            seen.push(expr);
        }
    }
    seen
}

/// If `text` is exactly one placeholder (e.g. `{{ current_applicant }}`),
/// return the root variable name.
pub fn bare_placeholder(text: &str) -> Option<&str> {
    let caps = placeholder_re().captures(text.trim())?;
    if caps.get(0)?.as_str() == text.trim() {
        caps.get(1).map(|m| {
            let expr = m.as_str();
            expr.split('.').next().unwrap_or(expr)
        })
    } else {
        None
    }
}

/// Replace every placeholder with its rendered literal. `values` maps full
/// placeholder expressions (dotted form included) to their resolved values;
/// unresolved expressions render as the dialect's null literal.
pub fn substitute(text: &str, values: &BTreeMap<String, GraphValue>, dialect: Dialect) -> String {
    placeholder_re()
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let value = values.get(&caps[1]).unwrap_or(&GraphValue::Null);
            render_literal(value, dialect)
        })
        .into_owned()
}

/// Render a value as a literal of the target dialect.
pub fn render_literal(value: &GraphValue, dialect: Dialect) -> String {
    match dialect {
        Dialect::Cypher => serde_json::to_string(&value.to_json())
            .unwrap_or_else(|_| "null".to_string()),
        Dialect::Script => render_script_literal(value),
    }
}

fn render_script_literal(value: &GraphValue) -> String {
    match value {
        GraphValue::Null => "()".to_string(),
        GraphValue::Bool(b) => b.to_string(),
        GraphValue::Int(i) => i.to_string(),
        GraphValue::Float(f) => {
            // Keep a decimal point so the literal stays a float in rhai.
            if f.fract() == 0.0 && f.is_finite() {
                format!("{f:.1}")
            } else {
                f.to_string()
            }
        }
        GraphValue::String(s) => quote_json_string(s),
        GraphValue::List(items) => {
            let rendered: Vec<String> = items.iter().map(render_script_literal).collect();
            format!("[{}]", rendered.join(", "))
        }
        GraphValue::Map(entries) => render_script_map(entries.iter()),
        GraphValue::Node(node) => render_script_map(node.properties.iter()),
        GraphValue::Relationship(rel) => {
            let entries: BTreeMap<String, GraphValue> = BTreeMap::from([
                ("type".to_string(), GraphValue::from(rel.rel_type.clone())),
                (
                    "start".to_string(),
                    GraphValue::from(rel.start_element_id.clone()),
                ),
                (
                    "end".to_string(),
                    GraphValue::from(rel.end_element_id.clone()),
                ),
                ("properties".to_string(), GraphValue::Map(rel.properties.clone())),
            ]);
            render_script_map(entries.iter())
        }
        GraphValue::Path(path) => {
            let ids: Vec<String> = path
                .nodes
                .iter()
                .map(|n| quote_json_string(&n.element_id))
                .collect();
            format!("[{}]", ids.join(", "))
        }
    }
}

fn render_script_map<'a, I>(entries: I) -> String
where
    I: Iterator<Item = (&'a String, &'a GraphValue)>,
{
    let rendered: Vec<String> = entries
        .map(|(k, v)| format!("{}: {}", quote_json_string(k), render_script_literal(v)))
        .collect();
    format!("#{{{}}}", rendered.join(", "))
}

fn quote_json_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{s}\""))
}

/// Rewrite single-quoted string literals to double-quoted form.
///
/// Escape-aware: `\'` inside a single-quoted literal becomes a plain quote,
/// embedded `"` characters are escaped in the output, and spans inside
/// double-quoted literals pass through untouched. An unterminated single
/// quote is left as-is.
pub fn normalize_quotes(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '"' => {
                out.push('"');
                i += 1;
                while i < chars.len() {
                    let c = chars[i];
                    out.push(c);
                    i += 1;
                    if c == '\\' && i < chars.len() {
                        out.push(chars[i]);
                        i += 1;
                    } else if c == '"' {
                        break;
                    }
                }
            }
            '\'' => {
                let mut j = i + 1;
                let mut content = String::new();
                let mut closed = false;
                while j < chars.len() {
                    let c = chars[j];
                    if c == '\\' && j + 1 < chars.len() {
                        let escaped = chars[j + 1];
                        if escaped == '\'' || escaped == '"' {
                            content.push(escaped);
                        } else {
                            content.push(c);
                            content.push(escaped);
                        }
                        j += 2;
                    } else if c == '\'' {
                        closed = true;
                        break;
                    } else {
                        content.push(c);
                        j += 1;
                    }
                }
                if closed {
                    out.push('"');
                    for c in content.chars() {
                        if c == '"' {
                            out.push('\\');
                        }
                        out.push(c);
                    }
                    out.push('"');
                    i = j + 1;
                } else {
                    out.push('\'');
                    i += 1;
                }
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}
