//! Walk context
//!
//! A [`Context`] is the mutable state of one walk: the caller's input
//! parameters, the current source node, the variable-definition table, the
//! lazy variable slots, and any recovered warnings. Everything else in the
//! engine is immutable and shared; contexts are never shared across walks.
//!
//! Variable state follows a small machine per name:
//!
//! ```text
//! (absent) ──resolve──▶ Resolving ──ok──▶ Resolved(value)
//!                           │
//!                           └──error / re-entry──▶ Failed   (value = null)
//! ```
//!
//! Re-entering a name already in `Resolving` (a definition that references
//! itself through a template) resolves to null with a warning instead of
//! recursing forever.

use crate::model::{EngineResponse, QuestionRef, VarValue, VariableDef, Warning};
use askflow_graph::{GraphValue, Params};
use serde_json::Value as Json;
use std::collections::BTreeMap;

/// Evaluator snippets quoted in warnings are truncated to this length.
const EVALUATOR_SNIPPET_LIMIT: usize = 200;

/// Resolution state of one named variable.
#[derive(Debug, Clone, PartialEq)]
pub enum VarSlot {
    /// Resolution in progress; re-entry means a circular reference.
    Resolving,
    /// Resolved (and memoized) value.
    Resolved(GraphValue),
    /// Resolution failed; the variable reads as null.
    Failed,
}

/// Mutable state of a single walk.
#[derive(Debug)]
pub struct Context {
    input_params: BTreeMap<String, GraphValue>,
    source_node: GraphValue,
    var_defs: BTreeMap<String, VariableDef>,
    slots: BTreeMap<String, VarSlot>,
    warnings: Vec<Warning>,
}

impl Context {
    pub fn new(input: serde_json::Map<String, Json>) -> Self {
        Self {
            input_params: input
                .iter()
                .map(|(k, v)| (k.clone(), GraphValue::from_json(v)))
                .collect(),
            source_node: GraphValue::Null,
            var_defs: BTreeMap::new(),
            slots: BTreeMap::new(),
            warnings: Vec::new(),
        }
    }

    // -- source node ------------------------------------------------------

    pub fn source(&self) -> &GraphValue {
        &self.source_node
    }

    pub fn set_source(&mut self, node: GraphValue) {
        self.source_node = node;
    }

    /// Identifier of the current source node: element id (or numeric id) for
    /// nodes, the `id` entry for maps, the value itself for scalars already
    /// acting as identifiers.
    pub fn source_node_id(&self) -> GraphValue {
        match &self.source_node {
            GraphValue::Null => GraphValue::Null,
            GraphValue::Node(node) => node.identity(),
            GraphValue::Map(entries) => entries.get("id").cloned().unwrap_or(GraphValue::Null),
            other => other.clone(),
        }
    }

    // -- variable definitions and slots -----------------------------------

    /// Merge definitions into the table. Later definitions shadow earlier
    /// ones (edge-level definitions override Section-level ones), but an
    /// already-resolved slot keeps its memoized value.
    pub fn merge_defs(&mut self, defs: Vec<VariableDef>) {
        for def in defs {
            self.var_defs.insert(def.name.clone(), def);
        }
    }

    pub fn def(&self, name: &str) -> Option<VariableDef> {
        self.var_defs.get(name).cloned()
    }

    pub fn slot(&self, name: &str) -> Option<&VarSlot> {
        self.slots.get(name)
    }

    pub fn mark_resolving(&mut self, name: &str) {
        self.slots.insert(name.to_string(), VarSlot::Resolving);
    }

    pub fn store_resolved(&mut self, name: &str, value: GraphValue) {
        self.slots
            .insert(name.to_string(), VarSlot::Resolved(value));
    }

    pub fn store_failed(&mut self, name: &str) {
        self.slots.insert(name.to_string(), VarSlot::Failed);
    }

    // -- warnings ---------------------------------------------------------

    pub fn warn(&mut self, variable: &str, message: impl Into<String>, evaluator: Option<&str>) {
        self.warnings.push(Warning {
            variable: variable.to_string(),
            message: message.into(),
            evaluator: evaluator.map(truncate_snippet),
        });
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    // -- evaluator scope --------------------------------------------------

    /// The scope evaluators see: input parameters, the source node and its
    /// derived id, and every variable with a slot. Failed and in-flight
    /// (`Resolving`) variables read as null, matching [`Self::scope_value`],
    /// so a circular reference reached by bare name degrades to null instead
    /// of an unresolved-name violation.
    pub fn eval_scope(&self) -> Params {
        let mut scope: Params = self.input_params.clone();
        scope.insert("sourceNode".to_string(), self.source_node.clone());
        scope.insert("sourceNodeId".to_string(), self.source_node_id());
        for (name, slot) in &self.slots {
            match slot {
                VarSlot::Resolved(value) => {
                    scope.insert(name.clone(), value.clone());
                }
                VarSlot::Failed | VarSlot::Resolving => {
                    scope.insert(name.clone(), GraphValue::Null);
                }
            }
        }
        scope
    }

    /// Single-name scope lookup; null when absent.
    pub fn scope_value(&self, name: &str) -> GraphValue {
        match name {
            "sourceNode" => self.source_node.clone(),
            "sourceNodeId" => self.source_node_id(),
            _ => match self.slots.get(name) {
                Some(VarSlot::Resolved(value)) => value.clone(),
                Some(_) => GraphValue::Null,
                None => self
                    .input_params
                    .get(name)
                    .cloned()
                    .unwrap_or(GraphValue::Null),
            },
        }
    }

    // -- response assembly ------------------------------------------------

    fn vars_snapshot(&self) -> BTreeMap<String, VarValue> {
        self.slots
            .iter()
            .filter_map(|(name, slot)| match slot {
                VarSlot::Resolved(value) => Some((
                    name.clone(),
                    VarValue {
                        value: value.to_json(),
                    },
                )),
                VarSlot::Failed => Some((name.clone(), VarValue { value: Json::Null })),
                VarSlot::Resolving => None,
            })
            .collect()
    }

    fn request_variables(&self) -> serde_json::Map<String, Json> {
        self.input_params
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect()
    }

    /// Assemble a response around the context's current state.
    pub fn response(
        &self,
        section_id: &str,
        question: Option<QuestionRef>,
        next_section_id: Option<String>,
        created_node_ids: Vec<Json>,
        completed: bool,
    ) -> EngineResponse {
        let source_node = match self.source_node_id() {
            GraphValue::Null => None,
            id => Some(id.to_json()),
        };
        EngineResponse {
            section_id: section_id.to_string(),
            question,
            next_section_id,
            created_node_ids,
            completed,
            request_variables: self.request_variables(),
            source_node,
            vars: self.vars_snapshot(),
            warnings: self.warnings.clone(),
            trace_id: None,
        }
    }

    /// Stop response: traversal halted at an unanswered question.
    pub fn stop_response(&self, section_id: &str, question_id: &str) -> EngineResponse {
        self.response(
            section_id,
            Some(QuestionRef {
                question_id: question_id.to_string(),
            }),
            None,
            Vec::new(),
            false,
        )
    }

    /// Completion response: no edge matched.
    pub fn completed_response(&self, section_id: &str) -> EngineResponse {
        self.response(section_id, None, None, Vec::new(), true)
    }
}

fn truncate_snippet(snippet: &str) -> String {
    if snippet.chars().count() <= EVALUATOR_SNIPPET_LIMIT {
        snippet.to_string()
    } else {
        let truncated: String = snippet.chars().take(EVALUATOR_SNIPPET_LIMIT).collect();
        format!("{truncated}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use askflow_graph::GraphNode;
    use serde_json::json;

    fn input(params: Json) -> serde_json::Map<String, Json> {
        params.as_object().cloned().unwrap_or_default()
    }

    fn applicant_node() -> GraphNode {
        GraphNode {
            id: 7,
            element_id: "mem:7".into(),
            labels: vec!["Applicant".into()],
            properties: BTreeMap::from([(
                "applicantId".to_string(),
                GraphValue::from("ap1"),
            )]),
        }
    }

    #[test]
    fn test_scope_merges_params_source_and_vars() {
        let mut ctx = Context::new(input(json!({"applicantId": "ap1"})));
        ctx.set_source(GraphValue::Node(applicant_node()));
        ctx.store_resolved("age", GraphValue::Int(30));
        ctx.store_failed("broken");
        ctx.mark_resolving("pending");

        let scope = ctx.eval_scope();
        assert_eq!(scope.get("applicantId"), Some(&GraphValue::from("ap1")));
        assert_eq!(scope.get("sourceNodeId"), Some(&GraphValue::from("mem:7")));
        assert_eq!(scope.get("age"), Some(&GraphValue::Int(30)));
        assert_eq!(scope.get("broken"), Some(&GraphValue::Null));
        assert_eq!(scope.get("pending"), Some(&GraphValue::Null));
        assert!(matches!(scope.get("sourceNode"), Some(GraphValue::Node(_))));
    }

    #[test]
    fn test_source_node_id_shapes() {
        let mut ctx = Context::new(Default::default());
        assert_eq!(ctx.source_node_id(), GraphValue::Null);

        ctx.set_source(GraphValue::Node(applicant_node()));
        assert_eq!(ctx.source_node_id(), GraphValue::from("mem:7"));

        ctx.set_source(GraphValue::Map(BTreeMap::from([(
            "id".to_string(),
            GraphValue::Int(12),
        )])));
        assert_eq!(ctx.source_node_id(), GraphValue::Int(12));

        ctx.set_source(GraphValue::from("4:abc:17"));
        assert_eq!(ctx.source_node_id(), GraphValue::from("4:abc:17"));
    }

    #[test]
    fn test_edge_defs_shadow_but_memoized_values_survive() {
        let mut ctx = Context::new(Default::default());
        ctx.merge_defs(vec![VariableDef {
            name: "x".into(),
            cypher: None,
            python: Some("1".into()),
            script: None,
            timeout_ms: None,
        }]);
        ctx.store_resolved("x", GraphValue::Int(1));

        ctx.merge_defs(vec![VariableDef {
            name: "x".into(),
            cypher: None,
            python: Some("2".into()),
            script: None,
            timeout_ms: None,
        }]);
        assert_eq!(ctx.def("x").unwrap().python.as_deref(), Some("2"));
        assert_eq!(ctx.scope_value("x"), GraphValue::Int(1));
    }

    #[test]
    fn test_warning_snippet_truncation() {
        let mut ctx = Context::new(Default::default());
        let long = "x".repeat(300);
        ctx.warn("v", "boom", Some(&long));
        let evaluator = ctx.warnings()[0].evaluator.as_ref().unwrap();
        assert_eq!(evaluator.len(), 203);
        assert!(evaluator.ends_with("..."));
    }

    #[test]
    fn test_response_snapshot() {
        let mut ctx = Context::new(input(json!({"applicationId": "app1"})));
        ctx.set_source(GraphValue::Node(applicant_node()));
        ctx.store_resolved("has_coapplicant", GraphValue::from("No"));
        ctx.store_failed("broken");

        let response = ctx.stop_response("S", "Q1");
        assert_eq!(response.section_id, "S");
        assert_eq!(response.question.as_ref().unwrap().question_id, "Q1");
        assert!(!response.completed);
        assert_eq!(response.source_node, Some(json!("mem:7")));
        assert_eq!(response.request_variables["applicationId"], json!("app1"));
        assert_eq!(response.vars["has_coapplicant"].value, json!("No"));
        assert_eq!(response.vars["broken"].value, Json::Null);

        let done = ctx.completed_response("S");
        assert!(done.completed);
        assert!(done.question.is_none());
    }
}
