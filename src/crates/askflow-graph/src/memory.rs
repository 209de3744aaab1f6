//! In-memory graph store.
//!
//! [`MemoryGraph`] is the bundled [`GraphStore`] backend used by the test
//! suites and the dev server. It holds nodes and relationships in plain
//! maps, interprets the engine's fixed statement catalog
//! ([`crate::statements`]) structurally, and answers any other statement
//! from caller-registered canned responses - which is how tests script the
//! ad-hoc snippets embedded in questionnaire graphs (variable evaluators,
//! action queries).
//!
//! Every `run` call is recorded; tests assert on the call log to verify
//! side-effect queries executed exactly once.

use crate::error::{Result, StoreError};
use crate::record::Record;
use crate::statements;
use crate::store::GraphStore;
use crate::value::{GraphNode, GraphRel, GraphValue, Params};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// One recorded `run` invocation.
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub statement: String,
    pub params: Params,
}

#[derive(Debug, Clone)]
struct NodeData {
    id: i64,
    labels: Vec<String>,
    properties: BTreeMap<String, GraphValue>,
}

#[derive(Debug, Clone)]
struct RelData {
    id: i64,
    rel_type: String,
    start: i64,
    end: i64,
    properties: BTreeMap<String, GraphValue>,
}

struct Canned {
    fragment: String,
    rows: Vec<Record>,
}

#[derive(Default)]
struct Inner {
    nodes: BTreeMap<i64, NodeData>,
    rels: Vec<RelData>,
    next_node_id: i64,
    next_rel_id: i64,
    canned: Vec<Canned>,
    calls: Vec<CallRecord>,
}

/// In-memory labeled property graph.
#[derive(Default)]
pub struct MemoryGraph {
    inner: Mutex<Inner>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node and return its numeric id.
    pub fn add_node(&self, labels: &[&str], properties: &[(&str, GraphValue)]) -> i64 {
        let mut inner = self.inner.lock();
        inner.next_node_id += 1;
        let id = inner.next_node_id;
        inner.nodes.insert(
            id,
            NodeData {
                id,
                labels: labels.iter().map(|l| l.to_string()).collect(),
                properties: properties
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
            },
        );
        id
    }

    /// Insert a relationship and return its numeric id. Relationship ids
    /// double as creation order, which is what the catalog's `id(e)`
    /// ordering tie-break keys on.
    pub fn add_relationship(
        &self,
        start: i64,
        end: i64,
        rel_type: &str,
        properties: &[(&str, GraphValue)],
    ) -> i64 {
        let mut inner = self.inner.lock();
        inner.next_rel_id += 1;
        let id = inner.next_rel_id;
        inner.rels.push(RelData {
            id,
            rel_type: rel_type.to_string(),
            start,
            end,
            properties: properties
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        });
        id
    }

    /// Set (or overwrite) a property on an existing node.
    pub fn set_property(&self, node_id: i64, key: &str, value: GraphValue) {
        let mut inner = self.inner.lock();
        if let Some(node) = inner.nodes.get_mut(&node_id) {
            node.properties.insert(key.to_string(), value);
        }
    }

    /// Register canned rows for any statement containing `fragment`.
    /// Fragments are checked in registration order; the first match wins.
    pub fn respond(&self, fragment: &str, rows: Vec<Record>) {
        self.inner.lock().canned.push(Canned {
            fragment: fragment.to_string(),
            rows,
        });
    }

    /// Snapshot of a node, if it exists.
    pub fn node(&self, id: i64) -> Option<GraphNode> {
        let inner = self.inner.lock();
        inner.nodes.get(&id).map(to_graph_node)
    }

    /// First node carrying `label` whose property `key` equals `value`.
    pub fn find_node(&self, label: &str, key: &str, value: &GraphValue) -> Option<i64> {
        let inner = self.inner.lock();
        inner
            .nodes
            .values()
            .find(|n| n.labels.iter().any(|l| l == label) && n.properties.get(key) == Some(value))
            .map(|n| n.id)
    }

    /// Ids of `label`-carrying nodes reachable from `start` via an outgoing
    /// `rel_type` relationship, in creation order.
    pub fn neighbors_out(&self, start: i64, rel_type: &str, label: &str) -> Vec<i64> {
        let inner = self.inner.lock();
        inner
            .rels
            .iter()
            .filter(|r| r.start == start && r.rel_type == rel_type)
            .filter_map(|r| inner.nodes.get(&r.end))
            .filter(|n| n.labels.iter().any(|l| l == label))
            .map(|n| n.id)
            .collect()
    }

    /// All recorded calls.
    pub fn calls(&self) -> Vec<CallRecord> {
        self.inner.lock().calls.clone()
    }

    /// Number of recorded calls whose statement contains `fragment`.
    pub fn call_count(&self, fragment: &str) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| c.statement.contains(fragment))
            .count()
    }

    /// Element id scheme for this store.
    pub fn element_id(node_id: i64) -> String {
        format!("mem:{node_id}")
    }

    fn parse_element_id(element_id: &str) -> Option<i64> {
        element_id.strip_prefix("mem:")?.parse().ok()
    }
}

fn to_graph_node(data: &NodeData) -> GraphNode {
    GraphNode {
        id: data.id,
        element_id: MemoryGraph::element_id(data.id),
        labels: data.labels.clone(),
        properties: data.properties.clone(),
    }
}

fn to_graph_rel(data: &RelData) -> GraphRel {
    GraphRel {
        id: data.id,
        element_id: format!("mem:r{}", data.id),
        rel_type: data.rel_type.clone(),
        start_element_id: MemoryGraph::element_id(data.start),
        end_element_id: MemoryGraph::element_id(data.end),
        properties: data.properties.clone(),
    }
}

/// Resolve a node-addressing parameter of either identifier shape.
fn resolve_node_param(value: Option<&GraphValue>) -> Option<i64> {
    match value? {
        GraphValue::Int(id) => Some(*id),
        GraphValue::String(element_id) => MemoryGraph::parse_element_id(element_id),
        _ => None,
    }
}

impl Inner {
    fn fetch_section(&self, params: &Params) -> Vec<Record> {
        let Some(wanted) = params.get("sectionId") else {
            return Vec::new();
        };
        self.nodes
            .values()
            .find(|n| {
                n.labels.iter().any(|l| l == "Section")
                    && n.properties.get("sectionId") == Some(wanted)
            })
            .map(|n| {
                vec![Record::from_pairs(vec![(
                    "s".to_string(),
                    GraphValue::Node(to_graph_node(n)),
                )])]
            })
            .unwrap_or_default()
    }

    fn outgoing_edges(&self, params: &Params) -> Vec<Record> {
        let Some(node_id) = resolve_node_param(params.get("nodeId")) else {
            return Vec::new();
        };
        let mut edges: Vec<&RelData> = self
            .rels
            .iter()
            .filter(|r| {
                r.start == node_id
                    && (r.rel_type == statements::PRECEDES || r.rel_type == statements::TRIGGERS)
            })
            .collect();

        // coalesce(e.orderInForm, e.order) ascending, nulls last, then id(e).
        edges.sort_by(|a, b| {
            let ka = order_key(a);
            let kb = order_key(b);
            ka.0.cmp(&kb.0)
                .then(ka.1.partial_cmp(&kb.1).unwrap_or(Ordering::Equal))
                .then(a.id.cmp(&b.id))
        });

        edges
            .into_iter()
            .filter_map(|rel| {
                let target = self.nodes.get(&rel.end)?;
                Some(Record::from_pairs(vec![
                    ("e".to_string(), GraphValue::Relationship(to_graph_rel(rel))),
                    ("t".to_string(), GraphValue::Node(to_graph_node(target))),
                ]))
            })
            .collect()
    }

    fn supplies_answer(&self, source: i64, question_id: &GraphValue) -> bool {
        self.rels.iter().any(|supply| {
            supply.start == source
                && supply.rel_type == statements::SUPPLIES
                && self
                    .nodes
                    .get(&supply.end)
                    .is_some_and(|dp| dp.labels.iter().any(|l| l == "Datapoint"))
                && self.rels.iter().any(|answers| {
                    answers.start == supply.end
                        && answers.rel_type == statements::ANSWERS
                        && self.nodes.get(&answers.end).is_some_and(|q| {
                            q.properties.get("questionId") == Some(question_id)
                        })
                })
        })
    }

    fn answered(&self, params: &Params, include_container: bool) -> Vec<Record> {
        let source = resolve_node_param(params.get("sourceId"));
        let question_id = params.get("questionId");
        let answered = match (source, question_id) {
            (Some(source), Some(question_id)) => {
                let direct = self.supplies_answer(source, question_id);
                let mediated = include_container
                    && self.rels.iter().any(|h| {
                        h.start == source
                            && h.rel_type == statements::HAS_HISTORY_PROPERTY
                            && self.supplies_answer(h.end, question_id)
                    });
                direct || mediated
            }
            _ => false,
        };
        vec![Record::from_pairs(vec![(
            "answered".to_string(),
            GraphValue::Bool(answered),
        )])]
    }

    fn container_parent(&self, params: &Params) -> Vec<Record> {
        let Some(container) = resolve_node_param(params.get("containerId")) else {
            return Vec::new();
        };
        self.rels
            .iter()
            .find(|r| r.rel_type == statements::HAS_HISTORY_PROPERTY && r.end == container)
            .and_then(|r| self.nodes.get(&r.start))
            .map(|owner| {
                vec![Record::from_pairs(vec![(
                    "owner".to_string(),
                    GraphValue::Node(to_graph_node(owner)),
                )])]
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl GraphStore for MemoryGraph {
    async fn run(&self, statement: &str, params: Params) -> Result<Vec<Record>> {
        let mut inner = self.inner.lock();
        inner.calls.push(CallRecord {
            statement: statement.to_string(),
            params: params.clone(),
        });

        match statement {
            statements::FETCH_SECTION => Ok(inner.fetch_section(&params)),
            statements::OUTGOING_EDGES_BY_ID | statements::OUTGOING_EDGES_BY_ELEMENT_ID => {
                Ok(inner.outgoing_edges(&params))
            }
            statements::ANSWERED_BY_ID | statements::ANSWERED_BY_ELEMENT_ID => {
                Ok(inner.answered(&params, true))
            }
            statements::ANSWERED_DIRECT_BY_ID | statements::ANSWERED_DIRECT_BY_ELEMENT_ID => {
                Ok(inner.answered(&params, false))
            }
            statements::CONTAINER_PARENT_BY_ID | statements::CONTAINER_PARENT_BY_ELEMENT_ID => {
                Ok(inner.container_parent(&params))
            }
            other => inner
                .canned
                .iter()
                .find(|c| other.contains(&c.fragment))
                .map(|c| c.rows.clone())
                .ok_or_else(|| StoreError::Query(format!("unsupported statement: {other}"))),
        }
    }
}

fn order_key(rel: &RelData) -> (bool, f64) {
    let explicit = rel
        .properties
        .get("orderInForm")
        .or_else(|| rel.properties.get("order"))
        .and_then(|v| v.as_f64());
    match explicit {
        Some(v) => (false, v),
        None => (true, 0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supply_answer(graph: &MemoryGraph, source: i64, question: i64) {
        let dp = graph.add_node(&["Datapoint"], &[("typedValue", GraphValue::from("Yes"))]);
        graph.add_relationship(source, dp, statements::SUPPLIES, &[]);
        graph.add_relationship(dp, question, statements::ANSWERS, &[]);
    }

    #[tokio::test]
    async fn test_fetch_section_by_property() {
        let graph = MemoryGraph::new();
        let s = graph.add_node(
            &["Section"],
            &[("sectionId", GraphValue::from("Get a Quote"))],
        );

        let mut params = Params::new();
        params.insert("sectionId".into(), GraphValue::from("Get a Quote"));
        let rows = graph.run(statements::FETCH_SECTION, params).await.unwrap();
        assert_eq!(rows.len(), 1);
        let node = rows[0].get("s").and_then(|v| v.as_node()).unwrap().clone();
        assert_eq!(node.id, s);
        assert!(node.has_label("Section"));

        let mut missing = Params::new();
        missing.insert("sectionId".into(), GraphValue::from("Nope"));
        let rows = graph.run(statements::FETCH_SECTION, missing).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_edge_ordering_and_tiebreak() {
        let graph = MemoryGraph::new();
        let s = graph.add_node(&["Section"], &[("sectionId", GraphValue::from("S"))]);
        let a = graph.add_node(&["Question"], &[("questionId", GraphValue::from("A"))]);
        let b = graph.add_node(&["Question"], &[("questionId", GraphValue::from("B"))]);
        let c = graph.add_node(&["Question"], &[("questionId", GraphValue::from("C"))]);
        let d = graph.add_node(&["Question"], &[("questionId", GraphValue::from("D"))]);

        // Insertion order deliberately scrambled relative to orderInForm.
        graph.add_relationship(s, c, statements::PRECEDES, &[("orderInForm", GraphValue::Int(2))]);
        graph.add_relationship(s, a, statements::PRECEDES, &[("orderInForm", GraphValue::Int(1))]);
        // Same explicit order as `a`: creation order breaks the tie.
        graph.add_relationship(s, b, statements::PRECEDES, &[("order", GraphValue::Int(1))]);
        // No ordering property: sorts last.
        graph.add_relationship(s, d, statements::PRECEDES, &[]);

        let mut params = Params::new();
        params.insert("nodeId".into(), GraphValue::Int(s));
        let rows = graph
            .run(statements::OUTGOING_EDGES_BY_ID, params)
            .await
            .unwrap();

        let targets: Vec<String> = rows
            .iter()
            .map(|r| {
                r.get("t")
                    .and_then(|v| v.as_node())
                    .and_then(|n| n.property("questionId"))
                    .and_then(|v| v.as_str())
                    .unwrap()
                    .to_string()
            })
            .collect();
        assert_eq!(targets, vec!["A", "B", "C", "D"]);
    }

    #[tokio::test]
    async fn test_answered_direct_and_container_patterns() {
        let graph = MemoryGraph::new();
        let applicant = graph.add_node(&["Applicant"], &[("applicantId", GraphValue::from("ap1"))]);
        let q1 = graph.add_node(&["Question"], &[("questionId", GraphValue::from("Q1"))]);
        let q2 = graph.add_node(&["Question"], &[("questionId", GraphValue::from("Q2"))]);

        supply_answer(&graph, applicant, q1);

        let history = graph.add_node(&["AddressHistory"], &[]);
        graph.add_relationship(applicant, history, statements::HAS_HISTORY_PROPERTY, &[]);
        supply_answer(&graph, history, q2);

        let ask = |qid: &str, stmt: &'static str| {
            let mut params = Params::new();
            params.insert("sourceId".into(), GraphValue::Int(applicant));
            params.insert("questionId".into(), GraphValue::from(qid));
            (stmt, params)
        };

        // Direct pattern visible to both variants.
        let (stmt, params) = ask("Q1", statements::ANSWERED_BY_ID);
        let rows = graph.run(stmt, params).await.unwrap();
        assert_eq!(rows[0].get("answered"), Some(&GraphValue::Bool(true)));

        // Container-mediated pattern visible only to the full check.
        let (stmt, params) = ask("Q2", statements::ANSWERED_BY_ID);
        let rows = graph.run(stmt, params).await.unwrap();
        assert_eq!(rows[0].get("answered"), Some(&GraphValue::Bool(true)));

        let (stmt, params) = ask("Q2", statements::ANSWERED_DIRECT_BY_ID);
        let rows = graph.run(stmt, params).await.unwrap();
        assert_eq!(rows[0].get("answered"), Some(&GraphValue::Bool(false)));

        // Unanswered question.
        let (stmt, params) = ask("Q9", statements::ANSWERED_BY_ID);
        let rows = graph.run(stmt, params).await.unwrap();
        assert_eq!(rows[0].get("answered"), Some(&GraphValue::Bool(false)));
    }

    #[tokio::test]
    async fn test_container_parent_lookup_by_element_id() {
        let graph = MemoryGraph::new();
        let applicant = graph.add_node(&["Applicant"], &[]);
        let history = graph.add_node(&["AddressHistory"], &[]);
        graph.add_relationship(applicant, history, statements::HAS_HISTORY_PROPERTY, &[]);

        let mut params = Params::new();
        params.insert(
            "containerId".into(),
            GraphValue::String(MemoryGraph::element_id(history)),
        );
        let rows = graph
            .run(statements::CONTAINER_PARENT_BY_ELEMENT_ID, params)
            .await
            .unwrap();
        assert_eq!(
            rows[0].get("owner").and_then(|v| v.as_node()).unwrap().id,
            applicant
        );
    }

    #[tokio::test]
    async fn test_neighbors_out() {
        let graph = MemoryGraph::new();
        let applicant = graph.add_node(&["Applicant"], &[]);
        let q = graph.add_node(&["Question"], &[("questionId", GraphValue::from("Q1"))]);
        supply_answer(&graph, applicant, q);
        // A second supplied node with the wrong label is filtered out.
        let other = graph.add_node(&["AddressHistory"], &[]);
        graph.add_relationship(applicant, other, statements::SUPPLIES, &[]);

        let datapoints = graph.neighbors_out(applicant, statements::SUPPLIES, "Datapoint");
        assert_eq!(datapoints.len(), 1);
        assert_eq!(
            graph.neighbors_out(datapoints[0], statements::ANSWERS, "Question"),
            vec![q]
        );
        assert!(graph
            .neighbors_out(applicant, statements::ANSWERS, "Question")
            .is_empty());
    }

    #[tokio::test]
    async fn test_canned_responses_and_call_log() {
        let graph = MemoryGraph::new();
        graph.respond(
            "RETURN count(a)",
            vec![Record::from_pairs(vec![(
                "value".to_string(),
                GraphValue::Int(3),
            )])],
        );

        let rows = graph
            .run("MATCH (a:Applicant) RETURN count(a)", Params::new())
            .await
            .unwrap();
        assert_eq!(rows[0].extract(), GraphValue::Int(3));
        assert_eq!(graph.call_count("RETURN count(a)"), 1);

        let err = graph.run("MATCH (x) RETURN x", Params::new()).await;
        assert!(matches!(err, Err(StoreError::Query(_))));
    }
}
