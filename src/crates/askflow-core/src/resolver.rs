//! Lazy, memoized variable resolution.
//!
//! Variables are declared on Sections and edges but evaluated only when
//! something reads them - a template placeholder, a bare `{{ var }}` source
//! expression, or a script scope lookup that falls through. Within one walk
//! each variable's evaluator runs at most once; the slot machine in
//! [`Context`] memoizes the outcome, including failures.
//!
//! Resolution never fails the walk. Evaluator errors (timeouts included)
//! are captured as response warnings carrying the variable name, the error
//! message, and a truncated copy of the offending snippet; the variable
//! then reads as null.

use crate::context::{Context, VarSlot};
use crate::engine::FlowEngine;
use crate::model::EvaluatorKind;
use askflow_graph::GraphValue;
use futures::future::BoxFuture;
use std::time::Duration;

impl FlowEngine {
    /// Resolve `name` to its (memoized) value.
    pub(crate) fn resolve_var<'a>(
        &'a self,
        ctx: &'a mut Context,
        name: String,
    ) -> BoxFuture<'a, GraphValue> {
        Box::pin(async move {
            match ctx.slot(&name) {
                Some(VarSlot::Resolved(value)) => return value.clone(),
                Some(VarSlot::Failed) => return GraphValue::Null,
                Some(VarSlot::Resolving) => {
                    tracing::warn!(variable = %name, "circular variable reference");
                    ctx.warn(&name, "circular variable reference", None);
                    return GraphValue::Null;
                }
                None => {}
            }

            let Some(def) = ctx.def(&name) else {
                tracing::warn!(variable = %name, "variable not found in definitions");
                ctx.store_failed(&name);
                return GraphValue::Null;
            };
            let Some(snippet) = def.snippet().map(str::to_string) else {
                tracing::warn!(variable = %name, "variable declares no evaluator");
                ctx.store_failed(&name);
                return GraphValue::Null;
            };

            let timeout = def
                .timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(self.config.variable_timeout);

            ctx.mark_resolving(&name);
            tracing::debug!(variable = %name, "resolving variable");

            let result = match def.evaluator_kind().unwrap_or(EvaluatorKind::Script) {
                EvaluatorKind::Cypher => self.eval_cypher(ctx, &snippet).await,
                EvaluatorKind::Script => self.eval_script(ctx, &snippet, timeout).await,
            };

            match result {
                Ok(value) => {
                    tracing::debug!(variable = %name, "variable resolved");
                    ctx.store_resolved(&name, value.clone());
                    value
                }
                Err(err) => {
                    tracing::warn!(variable = %name, error = %err, "variable evaluation failed");
                    ctx.warn(&name, err.to_string(), Some(&snippet));
                    ctx.store_failed(&name);
                    GraphValue::Null
                }
            }
        })
    }
}
