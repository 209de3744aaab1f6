//! Answered-question detection.
//!
//! A Question counts as answered relative to the walk's source node when a
//! Datapoint exists under either supply pattern:
//!
//! ```text
//! direct:     (source)-[:SUPPLIES]->(dp)-[:ANSWERS]->(question)
//! mediated:   (source)-[:HAS_HISTORY_PROPERTY]->(container)
//!                      -[:SUPPLIES]->(dp)-[:ANSWERS]->(question)
//! ```
//!
//! If the source itself is a container node (its label matches the
//! configured container label), the check is anchored to the owning parent
//! instead - answering from inside a container context must see the same
//! history the parent sees.
//!
//! The *current-context* variant checks only the direct pattern and is the
//! tool for `allowMultiple` questions: a fresh container has not supplied
//! the answer yet even when its siblings have.

use crate::context::Context;
use crate::engine::FlowEngine;
use crate::error::Result;
use askflow_graph::{statements, GraphNode, GraphValue, Params};

impl FlowEngine {
    /// Is `question_id` answered under the current source, via either
    /// supply pattern? Container sources are redirected to their owner.
    pub(crate) async fn question_answered(
        &self,
        ctx: &Context,
        question_id: &str,
    ) -> Result<bool> {
        let source = ctx.source();
        if source.is_null() {
            return Ok(false);
        }

        let effective = match source.as_node() {
            Some(node) if node.has_label(&self.config.container_label) => {
                tracing::debug!("source is a container node, checking from its owner");
                match self.container_parent(node).await? {
                    Some(owner) => GraphValue::Node(owner),
                    None => {
                        tracing::warn!("container node has no owning parent");
                        return Ok(false);
                    }
                }
            }
            _ => source.clone(),
        };

        let Some(source_id) = identity_of(&effective) else {
            return Ok(false);
        };
        self.answered_check(source_id, question_id, true).await
    }

    /// Is `question_id` answered by the current source itself (direct
    /// pattern only)?
    pub(crate) async fn question_answered_direct(
        &self,
        ctx: &Context,
        question_id: &str,
    ) -> Result<bool> {
        let source = ctx.source();
        if source.is_null() {
            return Ok(false);
        }
        let Some(source_id) = identity_of(source) else {
            return Ok(false);
        };
        self.answered_check(source_id, question_id, false).await
    }

    async fn container_parent(&self, container: &GraphNode) -> Result<Option<GraphNode>> {
        let (statement, id) = match container.identity() {
            GraphValue::String(element_id) => (
                statements::CONTAINER_PARENT_BY_ELEMENT_ID,
                GraphValue::String(element_id),
            ),
            GraphValue::Int(id) => (statements::CONTAINER_PARENT_BY_ID, GraphValue::Int(id)),
            _ => return Ok(None),
        };
        let mut params = Params::new();
        params.insert("containerId".to_string(), id);
        let rows = self.gateway.run(statement, params).await?;
        Ok(rows
            .first()
            .and_then(|row| row.get("owner"))
            .and_then(|value| value.as_node())
            .cloned())
    }

    async fn answered_check(
        &self,
        source_id: GraphValue,
        question_id: &str,
        include_container: bool,
    ) -> Result<bool> {
        let statement = match (&source_id, include_container) {
            (GraphValue::Int(_), true) => statements::ANSWERED_BY_ID,
            (GraphValue::Int(_), false) => statements::ANSWERED_DIRECT_BY_ID,
            (GraphValue::String(_), true) => statements::ANSWERED_BY_ELEMENT_ID,
            (GraphValue::String(_), false) => statements::ANSWERED_DIRECT_BY_ELEMENT_ID,
            _ => return Ok(false),
        };
        let mut params = Params::new();
        params.insert("sourceId".to_string(), source_id);
        params.insert("questionId".to_string(), GraphValue::from(question_id));
        let rows = self.gateway.run(statement, params).await?;
        Ok(rows
            .first()
            .and_then(|row| row.get("answered"))
            .and_then(|value| value.as_bool())
            .unwrap_or(false))
    }
}

/// Identifier usable in an answered check: node identity, a map's `id`
/// entry, or a scalar already acting as an identifier.
fn identity_of(value: &GraphValue) -> Option<GraphValue> {
    match value {
        GraphValue::Node(node) => Some(node.identity()),
        GraphValue::Map(entries) => entries.get("id").cloned(),
        GraphValue::String(_) | GraphValue::Int(_) => Some(value.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use askflow_graph::MemoryGraph;
    use std::sync::Arc;

    struct Fixture {
        store: Arc<MemoryGraph>,
        engine: FlowEngine,
        applicant: i64,
        history: i64,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryGraph::new());
        let applicant = store.add_node(&["Applicant"], &[("applicantId", GraphValue::from("ap1"))]);
        let history = store.add_node(&["AddressHistory"], &[]);
        store.add_relationship(applicant, history, statements::HAS_HISTORY_PROPERTY, &[]);
        let engine = FlowEngine::new(store.clone());
        Fixture {
            store,
            engine,
            applicant,
            history,
        }
    }

    fn answer(store: &MemoryGraph, source: i64, question_id: &str) {
        let q = store.add_node(&["Question"], &[("questionId", GraphValue::from(question_id))]);
        let dp = store.add_node(&["Datapoint"], &[]);
        store.add_relationship(source, dp, statements::SUPPLIES, &[]);
        store.add_relationship(dp, q, statements::ANSWERS, &[]);
    }

    fn ctx_with_node(store: &MemoryGraph, id: i64) -> Context {
        let mut ctx = Context::new(Default::default());
        ctx.set_source(GraphValue::Node(store.node(id).unwrap()));
        ctx
    }

    #[tokio::test]
    async fn test_null_source_is_never_answered() {
        let f = fixture();
        let ctx = Context::new(Default::default());
        assert!(!f.engine.question_answered(&ctx, "Q1").await.unwrap());
        assert!(!f
            .engine
            .question_answered_direct(&ctx, "Q1")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_direct_pattern() {
        let f = fixture();
        answer(&f.store, f.applicant, "Q1");
        let ctx = ctx_with_node(&f.store, f.applicant);
        assert!(f.engine.question_answered(&ctx, "Q1").await.unwrap());
        assert!(!f.engine.question_answered(&ctx, "Q2").await.unwrap());
    }

    #[tokio::test]
    async fn test_container_mediated_pattern() {
        let f = fixture();
        answer(&f.store, f.history, "Q_Addr");
        let ctx = ctx_with_node(&f.store, f.applicant);
        assert!(f.engine.question_answered(&ctx, "Q_Addr").await.unwrap());
        // The current-context variant only sees direct supplies.
        assert!(!f
            .engine
            .question_answered_direct(&ctx, "Q_Addr")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_container_source_is_redirected_to_owner() {
        let f = fixture();
        // Answered directly by the applicant, but the walk's source is the
        // container: the check must hop to the owner and still see it.
        answer(&f.store, f.applicant, "Q1");
        let ctx = ctx_with_node(&f.store, f.history);
        assert!(f.engine.question_answered(&ctx, "Q1").await.unwrap());
    }

    #[tokio::test]
    async fn test_orphan_container_is_not_answered() {
        let f = fixture();
        let orphan = f.store.add_node(&["AddressHistory"], &[]);
        answer(&f.store, orphan, "Q1");
        let ctx = ctx_with_node(&f.store, orphan);
        assert!(!f.engine.question_answered(&ctx, "Q1").await.unwrap());
    }

    #[tokio::test]
    async fn test_direct_check_from_container_context() {
        let f = fixture();
        answer(&f.store, f.history, "Q_Addr");
        let ctx = ctx_with_node(&f.store, f.history);
        // Direct variant anchored at the container itself.
        assert!(f
            .engine
            .question_answered_direct(&ctx, "Q_Addr")
            .await
            .unwrap());
    }
}
