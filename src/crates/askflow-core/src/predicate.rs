//! `askWhen` predicate evaluation.
//!
//! Absent or empty predicates default to true. A `cypher:` prefix routes to
//! the graph, `python:`/`script:` (or no prefix) to the sandbox, and the
//! result is coerced to a boolean. Failures are fatal to the walk unless
//! the engine runs with lenient predicates, which restores the historical
//! log-and-treat-as-false behavior.

use crate::context::Context;
use crate::engine::FlowEngine;
use crate::error::{FlowError, Result};
use crate::model::has_prefix;
use askflow_graph::GraphValue;

impl FlowEngine {
    /// Evaluate an edge's `askWhen` property.
    pub(crate) async fn evaluate_ask_when(
        &self,
        ctx: &mut Context,
        expr: Option<&GraphValue>,
    ) -> Result<bool> {
        let text = match expr {
            None | Some(GraphValue::Null) => return Ok(true),
            Some(GraphValue::String(s)) => s.trim().to_string(),
            Some(other) => {
                return Err(FlowError::Contract(format!(
                    "askWhen must be a string expression, got {other:?}"
                )))
            }
        };
        if text.is_empty() {
            return Ok(true);
        }

        let result = if has_prefix(&text, "cypher:") {
            self.eval_cypher(ctx, &text).await
        } else {
            self.eval_script(ctx, &text, self.config.eval_timeout).await
        };

        match result {
            Ok(value) => Ok(value.is_truthy()),
            Err(err) if self.config.lenient_predicates => {
                tracing::warn!(
                    expression = %text,
                    error = %err,
                    "askWhen evaluation failed, lenient mode treats it as false"
                );
                Ok(false)
            }
            Err(err) => {
                tracing::warn!(expression = %text, error = %err, "askWhen evaluation failed");
                Err(err)
            }
        }
    }
}
