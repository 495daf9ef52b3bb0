//! The organizational agent graph container.
//!
//! [`Oag`] owns the metadata, budget, nodes and edges of one plan. Nodes
//! keep insertion order and are indexed by id; edges are a plain list.
//! The only mutators, [`Oag::add_node`] and [`Oag::add_edge`], refuse
//! duplicate ids and dangling endpoints, so a graph built through them is
//! always referentially intact.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use super::model::{AgentSpec, BudgetModel, Edge, Node, OrgMeta, RoleLevel, TaskSpec};

/// Errors raised by graph mutators and integrity checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("duplicate node id: {0}")]
    DuplicateId(String),

    #[error("edge {edge_id} references missing node {missing}")]
    DanglingEdge { edge_id: String, missing: String },

    #[error("node keyed {key} carries id {id}")]
    KeyMismatch { key: String, id: String },
}

/// Errors raised when loading a serialized graph.
#[derive(Debug, Error)]
pub enum OagDocumentError {
    #[error("invalid graph JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("graph integrity violation: {0}")]
    Graph(#[from] GraphError),
}

// ---------------------------------------------------------------------------
// Ordered node map
// ---------------------------------------------------------------------------

/// Insertion-ordered id -> node map. Serialized as a JSON object whose
/// keys appear in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
struct NodeMap {
    entries: Vec<Node>,
    index: HashMap<String, usize>,
}

impl NodeMap {
    fn insert(&mut self, node: Node) -> Result<(), GraphError> {
        if self.index.contains_key(node.id()) {
            return Err(GraphError::DuplicateId(node.id().to_owned()));
        }
        self.index.insert(node.id().to_owned(), self.entries.len());
        self.entries.push(node);
        Ok(())
    }

    fn get(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.entries[i])
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Node> {
        match self.index.get(id) {
            Some(&i) => self.entries.get_mut(i),
            None => None,
        }
    }
}

impl Serialize for NodeMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|n| (n.id(), n)))
    }
}

impl<'de> Deserialize<'de> for NodeMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct NodeMapVisitor;

        impl<'de> Visitor<'de> for NodeMapVisitor {
            type Value = NodeMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of node id to node")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<NodeMap, A::Error> {
                let mut map = NodeMap::default();
                while let Some((key, node)) = access.next_entry::<String, Node>()? {
                    if key != node.id() {
                        return Err(de::Error::custom(GraphError::KeyMismatch {
                            key,
                            id: node.id().to_owned(),
                        }));
                    }
                    map.insert(node).map_err(de::Error::custom)?;
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(NodeMapVisitor)
    }
}

// ---------------------------------------------------------------------------
// Oag
// ---------------------------------------------------------------------------

/// An organizational agent graph: the plan handed to the execution runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Oag {
    pub meta: OrgMeta,
    pub budget: BudgetModel,
    nodes: NodeMap,
    #[serde(default)]
    edges: Vec<Edge>,
}

impl Oag {
    /// Create an empty graph.
    pub fn new(meta: OrgMeta, budget: BudgetModel) -> Self {
        Self {
            meta,
            budget,
            nodes: NodeMap::default(),
            edges: Vec::new(),
        }
    }

    // -- Mutators -----------------------------------------------------------

    /// Insert a node. Fails with [`GraphError::DuplicateId`] if the id is
    /// already present; the graph is left unchanged in that case.
    pub fn add_node(&mut self, node: impl Into<Node>) -> Result<(), GraphError> {
        self.nodes.insert(node.into())
    }

    /// Insert an edge. Both endpoints must already be nodes and the edge id
    /// must not collide with an existing edge.
    pub fn add_edge(&mut self, edge: Edge) -> Result<(), GraphError> {
        for endpoint in [&edge.from_id, &edge.to_id] {
            if !self.nodes.index.contains_key(endpoint.as_str()) {
                return Err(GraphError::DanglingEdge {
                    edge_id: edge.id.clone(),
                    missing: endpoint.clone(),
                });
            }
        }
        if self.edges.iter().any(|e| e.id == edge.id) {
            return Err(GraphError::DuplicateId(edge.id));
        }
        self.edges.push(edge);
        Ok(())
    }

    /// Mutable access to an agent, used to attach OKRs and KPIs after the
    /// structure has been built.
    pub fn agent_mut(&mut self, id: &str) -> Option<&mut AgentSpec> {
        match self.nodes.get_mut(id) {
            Some(Node::Agent(a)) => Some(a),
            _ => None,
        }
    }

    // -- Queries ------------------------------------------------------------

    /// Agents in insertion order.
    pub fn get_agents(&self) -> Vec<&AgentSpec> {
        self.nodes.entries.iter().filter_map(Node::as_agent).collect()
    }

    /// Tasks in insertion order.
    pub fn get_tasks(&self) -> Vec<&TaskSpec> {
        self.nodes.entries.iter().filter_map(Node::as_task).collect()
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.entries.iter()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn agent(&self, id: &str) -> Option<&AgentSpec> {
        self.nodes.get(id).and_then(Node::as_agent)
    }

    pub fn task(&self, id: &str) -> Option<&TaskSpec> {
        self.nodes.get(id).and_then(Node::as_task)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.index.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.entries.len()
    }

    /// Agents at `level`, in insertion order.
    pub fn agents_by_level(&self, level: RoleLevel) -> Vec<&AgentSpec> {
        self.get_agents()
            .into_iter()
            .filter(|a| a.level == level)
            .collect()
    }

    /// Edges whose endpoints are both agents.
    pub fn reporting_edges(&self) -> Vec<&Edge> {
        self.edges
            .iter()
            .filter(|e| self.is_agent(&e.from_id) && self.is_agent(&e.to_id))
            .collect()
    }

    /// Edges whose endpoints are both tasks.
    pub fn dependency_edges(&self) -> Vec<&Edge> {
        self.edges
            .iter()
            .filter(|e| self.task(&e.from_id).is_some() && self.task(&e.to_id).is_some())
            .collect()
    }

    /// Agents with no incoming reporting edge.
    pub fn roots(&self) -> Vec<&AgentSpec> {
        let managed: HashSet<&str> = self
            .reporting_edges()
            .into_iter()
            .map(|e| e.to_id.as_str())
            .collect();
        self.get_agents()
            .into_iter()
            .filter(|a| !managed.contains(a.id.as_str()))
            .collect()
    }

    /// Tasks whose `agent_id` does not name an agent in this graph.
    pub fn unassigned_tasks(&self) -> Vec<&TaskSpec> {
        self.get_tasks()
            .into_iter()
            .filter(|t| !self.is_agent(&t.agent_id))
            .collect()
    }

    /// Tasks owned by `agent_id`, in insertion order.
    pub fn tasks_for(&self, agent_id: &str) -> Vec<&TaskSpec> {
        self.get_tasks()
            .into_iter()
            .filter(|t| t.agent_id == agent_id)
            .collect()
    }

    fn is_agent(&self, id: &str) -> bool {
        self.agent(id).is_some()
    }

    // -- Integrity and serialization -----------------------------------------

    /// Verify that every edge endpoint names a node and that edge ids are
    /// unique. Graphs built through the mutators always pass; documents
    /// loaded from disk might not.
    pub fn check_integrity(&self) -> Result<(), GraphError> {
        let mut seen = HashSet::new();
        for edge in &self.edges {
            if !seen.insert(edge.id.as_str()) {
                return Err(GraphError::DuplicateId(edge.id.clone()));
            }
            for endpoint in [&edge.from_id, &edge.to_id] {
                if !self.contains(endpoint) {
                    return Err(GraphError::DanglingEdge {
                        edge_id: edge.id.clone(),
                        missing: endpoint.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse a serialized graph and check its integrity.
    pub fn from_json(s: &str) -> Result<Self, OagDocumentError> {
        let oag: Oag = serde_json::from_str(s)?;
        oag.check_integrity()?;
        Ok(oag)
    }
}
