//! Domain contracts: variable definitions, action kinds, and the engine
//! response shape.
//!
//! These mirror what is persisted in the questionnaire graph (spec'd wire
//! names, hence the camelCase serde renames): `variables` properties on
//! Sections and edges hold JSON lists of variable definitions, Action nodes
//! carry an `actionType` discriminator, and every walk produces one
//! [`EngineResponse`].

use askflow_graph::GraphValue;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::BTreeMap;

/// A named, lazily-evaluated expression declared on a Section or edge.
///
/// Exactly one evaluator should be present: `cypher` for graph queries,
/// `python`/`script` for sandbox expressions (`python` is the authoring
/// spelling carried by existing questionnaire graphs, `script` the native
/// one - they are synonyms).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cypher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub python: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl VariableDef {
    /// The declared snippet, preferring `cypher`, then `script`, then
    /// `python`.
    pub fn snippet(&self) -> Option<&str> {
        self.cypher
            .as_deref()
            .or(self.script.as_deref())
            .or(self.python.as_deref())
    }

    /// Which evaluator runs this definition. A snippet carrying an explicit
    /// `cypher:` prefix goes to the graph regardless of which field holds it.
    pub fn evaluator_kind(&self) -> Option<EvaluatorKind> {
        let snippet = self.snippet()?;
        if self.cypher.is_some() || has_prefix(snippet, "cypher:") {
            Some(EvaluatorKind::Cypher)
        } else {
            Some(EvaluatorKind::Script)
        }
    }
}

/// The two evaluator languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluatorKind {
    /// Graph query, executed through the gateway.
    Cypher,
    /// Sandboxed expression.
    Script,
}

/// Case-insensitive prefix check on a trimmed expression.
pub(crate) fn has_prefix(expr: &str, prefix: &str) -> bool {
    expr.trim_start()
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Parse a `variables` graph property (a JSON string, or an already-decoded
/// list) into variable definitions. Malformed payloads resolve to an empty
/// list rather than failing the walk.
pub fn parse_variable_defs(value: &GraphValue) -> Vec<VariableDef> {
    let parsed = match value {
        GraphValue::String(raw) => serde_json::from_str(raw),
        other => serde_json::from_value(other.to_json()),
    };
    match parsed {
        Ok(defs) => defs,
        Err(err) => {
            tracing::debug!(error = %err, "ignoring malformed variables property");
            Vec::new()
        }
    }
}

/// The three graph-embedded action kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Run a graph-query snippet and collect created node ids.
    CreateNode,
    /// Jump to another Section.
    GotoSection,
    /// Run a graph-query snippet and mark the walk completed.
    CompleteSection,
}

impl ActionKind {
    pub fn parse(action_type: &str) -> Option<Self> {
        match action_type {
            "CreateNode" => Some(ActionKind::CreateNode),
            "GotoSection" => Some(ActionKind::GotoSection),
            "CompleteSection" => Some(ActionKind::CompleteSection),
            _ => None,
        }
    }
}

/// Reference to the question a walk stopped at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRef {
    pub question_id: String,
}

/// A recovered variable-resolution failure attached to a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    pub variable: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluator: Option<String>,
}

/// A resolved variable as exposed in the response snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarValue {
    pub value: Json,
}

/// The result of one walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineResponse {
    pub section_id: String,
    pub question: Option<QuestionRef>,
    pub next_section_id: Option<String>,
    pub created_node_ids: Vec<Json>,
    pub completed: bool,
    pub request_variables: serde_json::Map<String, Json>,
    pub source_node: Option<Json>,
    pub vars: BTreeMap<String, VarValue>,
    pub warnings: Vec<Warning>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}
