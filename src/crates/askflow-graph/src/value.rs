//! Graph value model
//!
//! Everything the store can hand back to the engine is a [`GraphValue`]:
//! scalars, containers, and graph entities (nodes, relationships, paths).
//! Keeping entities first-class matters because the engine treats some values
//! both as data and as potential source nodes — a variable that resolved to a
//! node can later be promoted to the walk's source node. Flattening to JSON
//! happens only at the response boundary via [`GraphValue::to_json`].
//!
//! Element identity follows the store contract: every node and relationship
//! carries both a numeric id and an opaque element-id string, and downstream
//! code prefers the element id when it is non-empty.

use serde_json::{Map as JsonMap, Number, Value as Json};
use std::collections::BTreeMap;

/// Named parameters for a graph statement.
///
/// A `BTreeMap` keeps iteration (and therefore logging and test output)
/// deterministic.
pub type Params = BTreeMap<String, GraphValue>;

/// A node returned by the graph store.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    /// Store-assigned numeric id.
    pub id: i64,
    /// Opaque stable element identifier; may be empty for stores that only
    /// expose numeric ids.
    pub element_id: String,
    /// Label set, used for shape dispatch (Question, container nodes, ...).
    pub labels: Vec<String>,
    /// Node properties.
    pub properties: BTreeMap<String, GraphValue>,
}

impl GraphNode {
    /// True if the node carries `label`.
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// Look up a property by name.
    pub fn property(&self, name: &str) -> Option<&GraphValue> {
        self.properties.get(name)
    }

    /// The identifier downstream code should use for this node: the element
    /// id when present, the numeric id otherwise.
    pub fn identity(&self) -> GraphValue {
        if self.element_id.is_empty() {
            GraphValue::Int(self.id)
        } else {
            GraphValue::String(self.element_id.clone())
        }
    }
}

/// A relationship returned by the graph store.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphRel {
    pub id: i64,
    pub element_id: String,
    /// Relationship type, e.g. `PRECEDES` or `TRIGGERS`.
    pub rel_type: String,
    pub start_element_id: String,
    pub end_element_id: String,
    pub properties: BTreeMap<String, GraphValue>,
}

impl GraphRel {
    pub fn property(&self, name: &str) -> Option<&GraphValue> {
        self.properties.get(name)
    }
}

/// A path returned by the graph store.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphPath {
    pub nodes: Vec<GraphNode>,
    pub relationships: Vec<GraphRel>,
}

/// Any value flowing between the graph store and the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<GraphValue>),
    Map(BTreeMap<String, GraphValue>),
    Node(GraphNode),
    Relationship(GraphRel),
    Path(GraphPath),
}

impl GraphValue {
    pub fn is_null(&self) -> bool {
        matches!(self, GraphValue::Null)
    }

    /// True for nodes, relationships, and paths — the shapes a graph driver
    /// will not accept back as statement parameters.
    pub fn is_graph_entity(&self) -> bool {
        matches!(
            self,
            GraphValue::Node(_) | GraphValue::Relationship(_) | GraphValue::Path(_)
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            GraphValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&GraphNode> {
        match self {
            GraphValue::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            GraphValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            GraphValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view used for edge-ordering keys.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            GraphValue::Int(i) => Some(*i as f64),
            GraphValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Boolean-ish graph properties arrive either as booleans or as the
    /// strings "true"/"false" depending on which tool authored them.
    pub fn as_bool_lenient(&self) -> Option<bool> {
        match self {
            GraphValue::Bool(b) => Some(*b),
            GraphValue::String(s) => match s.to_ascii_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Truthiness for predicate coercion: null, `false`, zero, the empty
    /// string, and empty containers are false; everything else (including
    /// graph entities) is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            GraphValue::Null => false,
            GraphValue::Bool(b) => *b,
            GraphValue::Int(i) => *i != 0,
            GraphValue::Float(f) => *f != 0.0,
            GraphValue::String(s) => !s.is_empty(),
            GraphValue::List(items) => !items.is_empty(),
            GraphValue::Map(entries) => !entries.is_empty(),
            GraphValue::Node(_) | GraphValue::Relationship(_) | GraphValue::Path(_) => true,
        }
    }

    /// Dotted-path step: map-key access on maps, property access on nodes
    /// and relationships.
    pub fn access(&self, key: &str) -> Option<&GraphValue> {
        match self {
            GraphValue::Map(entries) => entries.get(key),
            GraphValue::Node(node) => node.properties.get(key),
            GraphValue::Relationship(rel) => rel.properties.get(key),
            _ => None,
        }
    }

    /// Convert a JSON value into a graph value. Lossless except that JSON
    /// numbers outside `i64` become floats.
    pub fn from_json(value: &Json) -> GraphValue {
        match value {
            Json::Null => GraphValue::Null,
            Json::Bool(b) => GraphValue::Bool(*b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    GraphValue::Int(i)
                } else {
                    GraphValue::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            Json::String(s) => GraphValue::String(s.clone()),
            Json::Array(items) => GraphValue::List(items.iter().map(Self::from_json).collect()),
            Json::Object(entries) => GraphValue::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Render as JSON-safe data: nodes flatten to their property maps,
    /// relationships to `{type, start, end, properties}`, paths to the list
    /// of node element ids.
    pub fn to_json(&self) -> Json {
        match self {
            GraphValue::Null => Json::Null,
            GraphValue::Bool(b) => Json::Bool(*b),
            GraphValue::Int(i) => Json::Number(Number::from(*i)),
            GraphValue::Float(f) => Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            GraphValue::String(s) => Json::String(s.clone()),
            GraphValue::List(items) => Json::Array(items.iter().map(|v| v.to_json()).collect()),
            GraphValue::Map(entries) => Json::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            GraphValue::Node(node) => Json::Object(
                node.properties
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            GraphValue::Relationship(rel) => {
                let mut obj = JsonMap::new();
                obj.insert("type".into(), Json::String(rel.rel_type.clone()));
                obj.insert("start".into(), Json::String(rel.start_element_id.clone()));
                obj.insert("end".into(), Json::String(rel.end_element_id.clone()));
                obj.insert(
                    "properties".into(),
                    Json::Object(
                        rel.properties
                            .iter()
                            .map(|(k, v)| (k.clone(), v.to_json()))
                            .collect(),
                    ),
                );
                Json::Object(obj)
            }
            GraphValue::Path(path) => Json::Array(
                path.nodes
                    .iter()
                    .map(|n| Json::String(n.element_id.clone()))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for GraphValue {
    fn from(s: &str) -> Self {
        GraphValue::String(s.to_string())
    }
}

impl From<String> for GraphValue {
    fn from(s: String) -> Self {
        GraphValue::String(s)
    }
}

impl From<i64> for GraphValue {
    fn from(i: i64) -> Self {
        GraphValue::Int(i)
    }
}

impl From<bool> for GraphValue {
    fn from(b: bool) -> Self {
        GraphValue::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(id: i64, labels: &[&str]) -> GraphNode {
        GraphNode {
            id,
            element_id: format!("mem:{id}"),
            labels: labels.iter().map(|l| l.to_string()).collect(),
            properties: BTreeMap::from([
                ("name".to_string(), GraphValue::from("Alice")),
                ("age".to_string(), GraphValue::Int(42)),
            ]),
        }
    }

    #[test]
    fn test_truthiness() {
        assert!(!GraphValue::Null.is_truthy());
        assert!(!GraphValue::Bool(false).is_truthy());
        assert!(!GraphValue::Int(0).is_truthy());
        assert!(!GraphValue::String(String::new()).is_truthy());
        assert!(!GraphValue::List(vec![]).is_truthy());
        assert!(GraphValue::Int(7).is_truthy());
        assert!(GraphValue::from("No").is_truthy());
        assert!(GraphValue::Node(node(1, &["Applicant"])).is_truthy());
    }

    #[test]
    fn test_node_flattens_to_property_map() {
        let value = GraphValue::Node(node(1, &["Applicant"]));
        assert_eq!(value.to_json(), json!({"name": "Alice", "age": 42}));
    }

    #[test]
    fn test_relationship_json_shape() {
        let rel = GraphRel {
            id: 9,
            element_id: "mem:r9".into(),
            rel_type: "SUPPLIES".into(),
            start_element_id: "mem:1".into(),
            end_element_id: "mem:2".into(),
            properties: BTreeMap::from([("since".to_string(), GraphValue::Int(2021))]),
        };
        assert_eq!(
            GraphValue::Relationship(rel).to_json(),
            json!({
                "type": "SUPPLIES",
                "start": "mem:1",
                "end": "mem:2",
                "properties": {"since": 2021}
            })
        );
    }

    #[test]
    fn test_path_renders_element_ids() {
        let path = GraphPath {
            nodes: vec![node(1, &[]), node(2, &[])],
            relationships: vec![],
        };
        assert_eq!(GraphValue::Path(path).to_json(), json!(["mem:1", "mem:2"]));
    }

    #[test]
    fn test_json_round_trip_scalars() {
        let json = json!({"a": 1, "b": [true, null, "x"], "c": 1.5});
        let value = GraphValue::from_json(&json);
        assert_eq!(value.to_json(), json);
    }

    #[test]
    fn test_access_drills_into_nodes_and_maps() {
        let value = GraphValue::Node(node(1, &[]));
        assert_eq!(value.access("name"), Some(&GraphValue::from("Alice")));
        assert_eq!(value.access("missing"), None);

        let map = GraphValue::Map(BTreeMap::from([(
            "inner".to_string(),
            GraphValue::Int(3),
        )]));
        assert_eq!(map.access("inner"), Some(&GraphValue::Int(3)));
    }

    #[test]
    fn test_bool_lenient_accepts_strings() {
        assert_eq!(GraphValue::from("true").as_bool_lenient(), Some(true));
        assert_eq!(GraphValue::from("False").as_bool_lenient(), Some(false));
        assert_eq!(GraphValue::from("yes").as_bool_lenient(), None);
        assert_eq!(GraphValue::Bool(true).as_bool_lenient(), Some(true));
    }

    #[test]
    fn test_identity_prefers_element_id() {
        let mut n = node(5, &[]);
        assert_eq!(n.identity(), GraphValue::from("mem:5"));
        n.element_id.clear();
        assert_eq!(n.identity(), GraphValue::Int(5));
    }
}
