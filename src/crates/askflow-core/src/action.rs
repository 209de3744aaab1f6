//! Action execution.
//!
//! Action nodes embed control flow and side effects in the questionnaire
//! graph. Three kinds exist: `CreateNode` runs a graph-query snippet and
//! collects the first column of each row as created node ids, `GotoSection`
//! redirects the caller to another Section, and `CompleteSection` runs its
//! snippet for effect and marks the walk complete. Unknown kinds are warned
//! about and ignored.
//!
//! `returnImmediately` (default true) decides whether the action's response
//! is returned as-is or traversal continues through the action's own
//! outgoing edges, in which case downstream created-node ids are appended
//! to this action's.

use crate::context::Context;
use crate::engine::FlowEngine;
use crate::error::Result;
use crate::model::{ActionKind, EngineResponse};
use askflow_graph::GraphNode;
use futures::future::BoxFuture;
use serde_json::Value as Json;

impl FlowEngine {
    pub(crate) fn execute_action<'a>(
        &'a self,
        ctx: &'a mut Context,
        action: GraphNode,
        section_id: &'a str,
    ) -> BoxFuture<'a, Result<EngineResponse>> {
        Box::pin(async move {
            if let Some(expr) = action
                .property("sourceNode")
                .and_then(|value| value.as_str())
                .map(str::to_string)
            {
                self.resolve_prefixed_source(ctx, &expr).await;
            }

            let action_id = action
                .property("actionId")
                .and_then(|value| value.as_str())
                .unwrap_or("<unknown>")
                .to_string();
            let action_type = action
                .property("actionType")
                .and_then(|value| value.as_str())
                .unwrap_or_default()
                .to_string();
            // UI layers store this both as a boolean and as "true"/"false".
            let return_immediately = action
                .property("returnImmediately")
                .and_then(|value| value.as_bool_lenient())
                .unwrap_or(true);

            let mut created_node_ids: Vec<Json> = Vec::new();
            let mut next_section_id: Option<String> = None;
            let mut completed = false;

            match ActionKind::parse(&action_type) {
                Some(ActionKind::CreateNode) => {
                    if let Some(statement) =
                        action.property("cypher").and_then(|value| value.as_str())
                    {
                        tracing::debug!(action_id = %action_id, "running CreateNode statement");
                        let rows = self.gateway.run(statement, ctx.eval_scope()).await?;
                        created_node_ids = rows
                            .iter()
                            .filter_map(|row| row.first())
                            .map(|value| value.to_json())
                            .collect();
                    }
                }
                Some(ActionKind::GotoSection) => {
                    next_section_id = action
                        .property("nextSectionId")
                        .and_then(|value| value.as_str())
                        .map(str::to_string);
                    tracing::debug!(
                        action_id = %action_id,
                        next_section = next_section_id.as_deref().unwrap_or(""),
                        "GotoSection"
                    );
                }
                Some(ActionKind::CompleteSection) => {
                    if let Some(statement) =
                        action.property("cypher").and_then(|value| value.as_str())
                    {
                        tracing::debug!(action_id = %action_id, "running CompleteSection statement");
                        self.gateway.run(statement, ctx.eval_scope()).await?;
                    }
                    completed = true;
                }
                None => {
                    tracing::warn!(
                        action_id = %action_id,
                        action_type = %action_type,
                        "unknown action type, ignoring"
                    );
                }
            }

            if !return_immediately {
                tracing::debug!(action_id = %action_id, "action continues traversal");
                let mut follow = self.traverse(ctx, action, section_id).await?;
                let mut merged = created_node_ids;
                merged.extend(follow.created_node_ids);
                follow.created_node_ids = merged;
                return Ok(follow);
            }

            Ok(ctx.response(section_id, None, next_section_id, created_node_ids, completed))
        })
    }
}
