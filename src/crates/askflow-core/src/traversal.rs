//! Depth-first traversal
//!
//! The heart of the engine. From a starting node, outgoing `PRECEDES` and
//! `TRIGGERS` edges are visited in ascending `(orderInForm|order,
//! creation-order)` order. Per edge, strictly in this sequence:
//!
//! 1. edge-level variable definitions merge into the context (shadowing
//!    Section-level ones),
//! 2. the edge's source-node expression resolves and propagates - even when
//!    the edge is later skipped, the new source remains visible downstream,
//! 3. the `askWhen` predicate gates the edge; false moves on to the next
//!    edge in order.
//!
//! A surviving edge dispatches on its target:
//!
//! - **Question** (`PRECEDES` edge, `Question` label): `allowMultiple`
//!   questions stop the walk unconditionally - their repetition is bounded
//!   by edge predicates, never by prior answers. Other questions stop only
//!   if unanswered; answered ones are descended into, their outgoing edges
//!   driving the flow further.
//! - **Action** (any edge, `actionType` property): executed, optionally
//!   continuing traversal per `returnImmediately`.
//! - Anything else: the edge is passed over.
//!
//! When no edge matches, the walk reports completion.

use crate::context::Context;
use crate::engine::FlowEngine;
use crate::error::{FlowError, Result};
use crate::model::{parse_variable_defs, EngineResponse};
use askflow_graph::{statements, GraphNode, GraphRel, GraphValue, Params};
use futures::future::BoxFuture;

impl FlowEngine {
    /// Depth-first walk from `node`, returning the first stop condition.
    pub(crate) fn traverse<'a>(
        &'a self,
        ctx: &'a mut Context,
        node: GraphNode,
        section_id: &'a str,
    ) -> BoxFuture<'a, Result<EngineResponse>> {
        Box::pin(async move {
            let edges = self.fetch_outgoing(&node).await?;

            for (edge, target) in edges {
                if let Some(raw) = edge.property("variables") {
                    ctx.merge_defs(parse_variable_defs(raw));
                }

                self.resolve_edge_source(ctx, &edge).await;

                if !self.evaluate_ask_when(ctx, edge.property("askWhen")).await? {
                    continue;
                }

                if edge.rel_type == statements::PRECEDES && target.has_label("Question") {
                    let question_id = target
                        .property("questionId")
                        .and_then(|value| value.as_str())
                        .ok_or_else(|| {
                            FlowError::Contract("Question node missing questionId".to_string())
                        })?
                        .to_string();
                    let allow_multiple = target
                        .property("allowMultiple")
                        .and_then(|value| value.as_bool_lenient())
                        .unwrap_or(false);

                    if allow_multiple {
                        // Repetition is bounded by the edge predicates, so
                        // prior answers never skip the question.
                        tracing::debug!(question_id = %question_id, "stopping at allowMultiple question");
                        return Ok(ctx.stop_response(section_id, &question_id));
                    }

                    if self.question_answered(ctx, &question_id).await? {
                        tracing::debug!(question_id = %question_id, "question answered, descending");
                        return self.traverse(ctx, target, section_id).await;
                    }

                    tracing::debug!(question_id = %question_id, "stopping at unanswered question");
                    return Ok(ctx.stop_response(section_id, &question_id));
                }

                if target.property("actionType").is_some() {
                    return self.execute_action(ctx, target, section_id).await;
                }
            }

            tracing::debug!(node_id = node.id, "no matching edges, walk completed");
            Ok(ctx.completed_response(section_id))
        })
    }

    /// Ordered outgoing `PRECEDES`/`TRIGGERS` edges of `node`, paired with
    /// their targets.
    async fn fetch_outgoing(&self, node: &GraphNode) -> Result<Vec<(GraphRel, GraphNode)>> {
        let (statement, id) = match node.identity() {
            GraphValue::String(element_id) => (
                statements::OUTGOING_EDGES_BY_ELEMENT_ID,
                GraphValue::String(element_id),
            ),
            other => (statements::OUTGOING_EDGES_BY_ID, other),
        };
        let mut params = Params::new();
        params.insert("nodeId".to_string(), id);
        let rows = self.gateway.run(statement, params).await?;

        rows.into_iter()
            .map(|row| {
                let edge = match row.get("e") {
                    Some(GraphValue::Relationship(rel)) => rel.clone(),
                    _ => {
                        return Err(FlowError::Contract(
                            "edge row missing relationship column".to_string(),
                        ))
                    }
                };
                let target = row
                    .get("t")
                    .and_then(|value| value.as_node())
                    .cloned()
                    .ok_or_else(|| {
                        FlowError::Contract("edge row missing target node".to_string())
                    })?;
                Ok((edge, target))
            })
            .collect()
    }
}
