//! The engine's fixed statement catalog.
//!
//! Centralizing the statements the traversal engine issues keeps the query
//! dialect in one place and gives the bundled [`MemoryGraph`]
//! (crate::memory::MemoryGraph) a closed set to interpret. Statements that
//! address a node come in two variants because stores expose two identifier
//! shapes: a numeric id and an opaque element-id string.

/// Relationship type for sequencing edges.
pub const PRECEDES: &str = "PRECEDES";
/// Relationship type for action-invocation edges.
pub const TRIGGERS: &str = "TRIGGERS";
/// Relationship connecting a source node to a datapoint it supplied.
pub const SUPPLIES: &str = "SUPPLIES";
/// Relationship connecting a datapoint to the question it answers.
pub const ANSWERS: &str = "ANSWERS";
/// Relationship connecting a source to an owned container node.
pub const HAS_HISTORY_PROPERTY: &str = "HAS_HISTORY_PROPERTY";

/// Fetch a Section node by its `sectionId` property.
pub const FETCH_SECTION: &str = "\
MATCH (s:Section {sectionId: $sectionId})
RETURN s
LIMIT 1";

/// Outgoing `PRECEDES`/`TRIGGERS` edges of a node addressed by numeric id,
/// in traversal order.
pub const OUTGOING_EDGES_BY_ID: &str = "\
MATCH (n) WHERE id(n) = $nodeId
MATCH (n)-[e]->(t)
WHERE type(e) IN ['PRECEDES', 'TRIGGERS']
RETURN e, t
ORDER BY coalesce(e.orderInForm, e.order), id(e)";

/// Outgoing `PRECEDES`/`TRIGGERS` edges of a node addressed by element id,
/// in traversal order.
pub const OUTGOING_EDGES_BY_ELEMENT_ID: &str = "\
MATCH (n) WHERE elementId(n) = $nodeId
MATCH (n)-[e]->(t)
WHERE type(e) IN ['PRECEDES', 'TRIGGERS']
RETURN e, t
ORDER BY coalesce(e.orderInForm, e.order), id(e)";

/// Answered check covering both the direct and the container-mediated
/// supply pattern, source addressed by numeric id.
pub const ANSWERED_BY_ID: &str = "\
MATCH (src) WHERE id(src) = $sourceId
OPTIONAL MATCH (src)-[:SUPPLIES]->(d1:Datapoint)-[:ANSWERS]->(q1 {questionId: $questionId})
OPTIONAL MATCH (src)-[:HAS_HISTORY_PROPERTY]->(c)-[:SUPPLIES]->(d2:Datapoint)-[:ANSWERS]->(q2 {questionId: $questionId})
RETURN q1 IS NOT NULL OR q2 IS NOT NULL AS answered";

/// Answered check covering both supply patterns, source addressed by
/// element id.
pub const ANSWERED_BY_ELEMENT_ID: &str = "\
MATCH (src) WHERE elementId(src) = $sourceId
OPTIONAL MATCH (src)-[:SUPPLIES]->(d1:Datapoint)-[:ANSWERS]->(q1 {questionId: $questionId})
OPTIONAL MATCH (src)-[:HAS_HISTORY_PROPERTY]->(c)-[:SUPPLIES]->(d2:Datapoint)-[:ANSWERS]->(q2 {questionId: $questionId})
RETURN q1 IS NOT NULL OR q2 IS NOT NULL AS answered";

/// Answered check restricted to the direct supply pattern (current-context
/// variant), source addressed by numeric id.
pub const ANSWERED_DIRECT_BY_ID: &str = "\
MATCH (src) WHERE id(src) = $sourceId
OPTIONAL MATCH (src)-[:SUPPLIES]->(d:Datapoint)-[:ANSWERS]->(q {questionId: $questionId})
RETURN q IS NOT NULL AS answered";

/// Answered check restricted to the direct supply pattern, source addressed
/// by element id.
pub const ANSWERED_DIRECT_BY_ELEMENT_ID: &str = "\
MATCH (src) WHERE elementId(src) = $sourceId
OPTIONAL MATCH (src)-[:SUPPLIES]->(d:Datapoint)-[:ANSWERS]->(q {questionId: $questionId})
RETURN q IS NOT NULL AS answered";

/// Owning parent of a container node, container addressed by numeric id.
pub const CONTAINER_PARENT_BY_ID: &str = "\
MATCH (c) WHERE id(c) = $containerId
MATCH (owner)-[:HAS_HISTORY_PROPERTY]->(c)
RETURN owner
LIMIT 1";

/// Owning parent of a container node, container addressed by element id.
pub const CONTAINER_PARENT_BY_ELEMENT_ID: &str = "\
MATCH (c) WHERE elementId(c) = $containerId
MATCH (owner)-[:HAS_HISTORY_PROPERTY]->(c)
RETURN owner
LIMIT 1";
