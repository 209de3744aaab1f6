//! Evaluation entry points for the two expression languages.
//!
//! Both share the same pipeline: lazily resolve `{{ ... }}` placeholders
//! against the walk context, substitute dialect-appropriate literals,
//! normalize quotes, strip the optional language prefix, then dispatch - to
//! the gateway (row-capped) for graph queries, to the sandbox for script
//! expressions. Results go through single-value extraction and
//! parse-if-JSON, so a query returning one cell yields that cell's value and
//! a string cell holding `"[1,2]"` yields a list.

use crate::context::Context;
use crate::engine::FlowEngine;
use crate::error::Result;
use crate::template::{self, Dialect};
use askflow_graph::{GraphValue, Record};
use futures::future::BoxFuture;
use serde_json::Value as Json;
use std::time::Duration;

impl FlowEngine {
    /// Resolve placeholders in `text`, render literals for `dialect`, and
    /// quote-normalize the result. Placeholder roots are looked up in the
    /// evaluator scope first and lazily resolved as variables otherwise.
    pub(crate) fn substitute<'a>(
        &'a self,
        ctx: &'a mut Context,
        text: String,
        dialect: Dialect,
    ) -> BoxFuture<'a, String> {
        Box::pin(async move {
            let mut values = std::collections::BTreeMap::new();
            for expr in template::placeholders(&text) {
                let root = expr.split('.').next().unwrap_or(&expr).to_string();
                let mut value = ctx.scope_value(&root);
                if value.is_null() {
                    value = self.resolve_var(ctx, root).await;
                }
                for part in expr.split('.').skip(1) {
                    value = value.access(part).cloned().unwrap_or(GraphValue::Null);
                }
                values.insert(expr, value);
            }
            template::normalize_quotes(&template::substitute(&text, &values, dialect))
        })
    }

    /// Evaluate a graph-query snippet (optionally `cypher:`-prefixed)
    /// against the store, with the evaluator row cap applied.
    pub(crate) async fn eval_cypher(
        &self,
        ctx: &mut Context,
        snippet: &str,
    ) -> Result<GraphValue> {
        let text = self
            .substitute(ctx, snippet.to_string(), Dialect::Cypher)
            .await;
        let statement = strip_eval_prefix(&text, &["cypher:"]);
        tracing::debug!(statement = %statement, "evaluating graph query expression");
        let rows = self
            .gateway
            .run_bounded(&statement, ctx.eval_scope(), self.config.row_cap)
            .await?;
        Ok(extract_rows(rows))
    }

    /// Evaluate a script snippet (optionally `python:`/`script:`-prefixed)
    /// in the sandbox within `timeout`.
    ///
    /// Defined variables referenced by bare name are resolved and bound
    /// into the scope first, so `address_count < 3` works the same as
    /// `{{ address_count }} < 3`. Names with no definition stay unbound
    /// and fail as sandbox violations.
    pub(crate) async fn eval_script(
        &self,
        ctx: &mut Context,
        snippet: &str,
        timeout: Duration,
    ) -> Result<GraphValue> {
        let text = self
            .substitute(ctx, snippet.to_string(), Dialect::Script)
            .await;
        let expression = strip_eval_prefix(&text, &["python:", "script:"]);
        tracing::debug!(expression = %expression, "evaluating sandbox expression");

        for name in referenced_names(&expression) {
            if ctx.slot(&name).is_none() && ctx.def(&name).is_some() {
                self.resolve_var(ctx, name).await;
            }
        }

        let scope: Vec<(String, Json)> = ctx
            .eval_scope()
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect();
        let result = self.sandbox.eval(&expression, scope, timeout).await?;
        Ok(json_parse_if_possible(GraphValue::from_json(&result)))
    }
}

/// Identifier-shaped tokens in an expression, in order, deduplicated.
fn referenced_names(expression: &str) -> Vec<String> {
    use std::sync::OnceLock;
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        regex::Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("identifier pattern is valid")
    });
    let mut seen = Vec::new();
    for token in re.find_iter(expression) {
        let token = token.as_str().to_string();
        if !seen.contains(&token) {
            seen.push(token);
        }
    }
    seen
}

/// Strip the first matching case-insensitive prefix, if any.
fn strip_eval_prefix(text: &str, prefixes: &[&str]) -> String {
    let trimmed = text.trim();
    for prefix in prefixes {
        if let Some(head) = trimmed.get(..prefix.len()) {
            if head.eq_ignore_ascii_case(prefix) {
                return trimmed[prefix.len()..].trim_start().to_string();
            }
        }
    }
    trimmed.to_string()
}

/// Single-value extraction over a whole result set: one record extracts
/// directly, anything else becomes a list of per-record extractions.
fn extract_rows(rows: Vec<Record>) -> GraphValue {
    match rows.len() {
        1 => json_parse_if_possible(rows[0].extract()),
        _ => GraphValue::List(
            rows.iter()
                .map(|row| json_parse_if_possible(row.extract()))
                .collect(),
        ),
    }
}

/// Strings that parse as JSON are replaced by their parsed value; map
/// entries are checked one level deep. Everything else passes through.
fn json_parse_if_possible(value: GraphValue) -> GraphValue {
    match value {
        GraphValue::String(s) => match serde_json::from_str::<Json>(&s) {
            Ok(parsed) => GraphValue::from_json(&parsed),
            Err(_) => GraphValue::String(s),
        },
        GraphValue::Map(entries) => GraphValue::Map(
            entries
                .into_iter()
                .map(|(key, value)| match value {
                    GraphValue::String(s) => match serde_json::from_str::<Json>(&s) {
                        Ok(parsed) => (key, GraphValue::from_json(&parsed)),
                        Err(_) => (key, GraphValue::String(s)),
                    },
                    other => (key, other),
                })
                .collect(),
        ),
        other => other,
    }
}
