//! Seed loading and answer recording for the in-memory dev backend.
//!
//! A seed file is a JSON graph description: nodes keyed by a symbolic name
//! (so relationships can reference them before ids exist) plus typed
//! relationships. Answer recording implements the answer-writing
//! collaborator against the memory store: it verifies the Question, finds
//! or creates the Applicant, and supplies a fresh Datapoint.

use askflow_graph::{statements, GraphValue, MemoryGraph};
use serde::Deserialize;
use serde_json::Value as Json;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid seed file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("relationship references unknown node key '{0}'")]
    UnknownNodeKey(String),
}

/// A JSON graph description.
#[derive(Debug, Deserialize)]
pub struct SeedFile {
    pub nodes: Vec<SeedNode>,
    #[serde(default)]
    pub relationships: Vec<SeedRelationship>,
}

#[derive(Debug, Deserialize)]
pub struct SeedNode {
    /// Symbolic key used by relationships in the same file.
    pub key: String,
    pub labels: Vec<String>,
    #[serde(default)]
    pub properties: serde_json::Map<String, Json>,
}

#[derive(Debug, Deserialize)]
pub struct SeedRelationship {
    pub start: String,
    pub end: String,
    #[serde(rename = "type")]
    pub rel_type: String,
    #[serde(default)]
    pub properties: serde_json::Map<String, Json>,
}

impl SeedFile {
    pub fn from_path(path: &Path) -> Result<Self, SeedError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Load a seed into the store. Returns `(node_count, relationship_count)`.
pub fn load(store: &MemoryGraph, seed: &SeedFile) -> Result<(usize, usize), SeedError> {
    let mut ids: HashMap<&str, i64> = HashMap::new();

    for node in &seed.nodes {
        let labels: Vec<&str> = node.labels.iter().map(String::as_str).collect();
        let properties: Vec<(&str, GraphValue)> = node
            .properties
            .iter()
            .map(|(k, v)| (k.as_str(), GraphValue::from_json(v)))
            .collect();
        let id = store.add_node(&labels, &properties);
        ids.insert(node.key.as_str(), id);
    }

    for rel in &seed.relationships {
        let start = *ids
            .get(rel.start.as_str())
            .ok_or_else(|| SeedError::UnknownNodeKey(rel.start.clone()))?;
        let end = *ids
            .get(rel.end.as_str())
            .ok_or_else(|| SeedError::UnknownNodeKey(rel.end.clone()))?;
        let properties: Vec<(&str, GraphValue)> = rel
            .properties
            .iter()
            .map(|(k, v)| (k.as_str(), GraphValue::from_json(v)))
            .collect();
        store.add_relationship(start, end, &rel.rel_type, &properties);
    }

    Ok((seed.nodes.len(), seed.relationships.len()))
}

#[derive(Debug, Error)]
pub enum AnswerError {
    #[error("Question '{0}' not found")]
    QuestionNotFound(String),
}

/// Record an answer: find or create the Applicant, then supply a Datapoint
/// answering the Question. Re-answering the same `(applicant, question)`
/// pair updates the existing Datapoint in place rather than creating a
/// duplicate. Returns the datapoint node id.
pub fn record_answer(
    store: &MemoryGraph,
    applicant_id: &str,
    question_id: &str,
    value: &Json,
) -> Result<i64, AnswerError> {
    let question = store
        .find_node("Question", "questionId", &GraphValue::from(question_id))
        .ok_or_else(|| AnswerError::QuestionNotFound(question_id.to_string()))?;

    let applicant = store
        .find_node("Applicant", "applicantId", &GraphValue::from(applicant_id))
        .unwrap_or_else(|| {
            store.add_node(
                &["Applicant"],
                &[("applicantId", GraphValue::from(applicant_id))],
            )
        });

    let now = GraphValue::from(chrono::Utc::now().to_rfc3339());

    let existing = store
        .neighbors_out(applicant, statements::SUPPLIES, "Datapoint")
        .into_iter()
        .find(|dp| {
            store
                .neighbors_out(*dp, statements::ANSWERS, "Question")
                .contains(&question)
        });
    if let Some(datapoint) = existing {
        store.set_property(datapoint, "typedValue", GraphValue::from_json(value));
        store.set_property(datapoint, "updatedAt", now);
        return Ok(datapoint);
    }

    let datapoint = store.add_node(
        &["Datapoint"],
        &[
            ("typedValue", GraphValue::from_json(value)),
            ("createdAt", now),
        ],
    );
    store.add_relationship(applicant, datapoint, statements::SUPPLIES, &[]);
    store.add_relationship(datapoint, question, statements::ANSWERS, &[]);
    Ok(datapoint)
}
