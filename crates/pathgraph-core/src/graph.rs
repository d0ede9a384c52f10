//! Local mirror of the server's graph.
//!
//! The mirror only changes in response to server messages. Every apply
//! method is a single atomic step: a removed node takes its incident
//! connections with it in the same call, so a renderer can never observe
//! a dangling connection.
//!
//! Messages that reference unknown ids, or re-add existing ones, are
//! protocol anomalies. They are logged and ignored.

use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::protocol::ServerMessage;

/// Server-assigned node identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub i32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A node in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub position: Point,
    /// Whether the node lies on the current path result.
    pub active: bool,
}

/// Key of a directed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionKey {
    pub from: NodeId,
    pub to: NodeId,
}

/// A directed connection between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub from: NodeId,
    pub to: NodeId,
    /// Whether the connection lies on the current path result.
    pub active: bool,
}

impl Connection {
    /// Get the lookup key for this connection.
    pub fn key(&self) -> ConnectionKey {
        ConnectionKey { from: self.from, to: self.to }
    }

    /// Check if either endpoint is `id`.
    pub fn touches(&self, id: NodeId) -> bool {
        self.from == id || self.to == id
    }
}

/// In-memory mirror of nodes and connections.
#[derive(Debug, Clone, Default)]
pub struct GraphMirror {
    nodes: HashMap<NodeId, Node>,
    /// Node insertion order.
    node_order: Vec<NodeId>,
    connections: HashMap<ConnectionKey, Connection>,
    /// Connection insertion order.
    connection_order: Vec<ConnectionKey>,
}

impl GraphMirror {
    /// Create an empty mirror.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one decoded server message.
    /// Returns true if the mirror changed.
    pub fn apply(&mut self, msg: &ServerMessage) -> bool {
        match msg {
            ServerMessage::NodeAdded { id, position } => self.apply_node_added(*id, *position),
            ServerMessage::NodeRemoved { id } => self.apply_node_removed(*id),
            ServerMessage::ConnectionAdded { from, to } => self.apply_connection_added(*from, *to),
            ServerMessage::ConnectionRemoved { from, to } => self.apply_connection_removed(*from, *to),
            ServerMessage::PathResult { nodes } => {
                self.apply_path_result(nodes);
                true
            }
        }
    }

    /// Insert a node. A duplicate id is ignored.
    pub fn apply_node_added(&mut self, id: NodeId, position: Point) -> bool {
        if self.nodes.contains_key(&id) {
            log::warn!("Protocol anomaly: node {} added twice, ignoring", id);
            return false;
        }
        self.nodes.insert(id, Node { id, position, active: false });
        self.node_order.push(id);
        true
    }

    /// Remove a node and every connection that touches it.
    pub fn apply_node_removed(&mut self, id: NodeId) -> bool {
        if self.nodes.remove(&id).is_none() {
            log::warn!("Protocol anomaly: removal of unknown node {}", id);
            return false;
        }
        self.node_order.retain(|&node_id| node_id != id);

        let connections = &mut self.connections;
        self.connection_order.retain(|key| {
            if key.from == id || key.to == id {
                connections.remove(key);
                false
            } else {
                true
            }
        });
        true
    }

    /// Insert a directed connection unless the pair already exists.
    pub fn apply_connection_added(&mut self, from: NodeId, to: NodeId) -> bool {
        let key = ConnectionKey { from, to };
        if self.connections.contains_key(&key) {
            log::debug!("Connection {} -> {} already present", from, to);
            return false;
        }
        if !self.nodes.contains_key(&from) || !self.nodes.contains_key(&to) {
            log::warn!(
                "Protocol anomaly: connection {} -> {} references an unknown node, ignoring",
                from,
                to
            );
            return false;
        }
        self.connections.insert(key, Connection { from, to, active: false });
        self.connection_order.push(key);
        true
    }

    /// Remove a directed connection.
    pub fn apply_connection_removed(&mut self, from: NodeId, to: NodeId) -> bool {
        let key = ConnectionKey { from, to };
        if self.connections.remove(&key).is_none() {
            log::warn!("Protocol anomaly: removal of unknown connection {} -> {}", from, to);
            return false;
        }
        self.connection_order.retain(|k| *k != key);
        true
    }

    /// Project a path result onto the `active` flags.
    ///
    /// All previous flags are cleared first. Ids or connections missing from
    /// the mirror are skipped.
    pub fn apply_path_result(&mut self, path: &[NodeId]) {
        self.clear_active();

        for id in path {
            if let Some(node) = self.nodes.get_mut(id) {
                node.active = true;
            }
        }

        for pair in path.windows(2) {
            let key = ConnectionKey { from: pair[0], to: pair[1] };
            match self.connections.get_mut(&key) {
                Some(connection) => connection.active = true,
                None => log::debug!("Path step {} -> {} has no mirrored connection", pair[0], pair[1]),
            }
        }
    }

    /// Clear every `active` flag.
    pub fn clear_active(&mut self) {
        self.nodes.values_mut().for_each(|n| n.active = false);
        self.connections.values_mut().for_each(|c| c.active = false);
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.node_order.clear();
        self.connections.clear();
        self.connection_order.clear();
    }

    /// Look up a node by id.
    pub fn find_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Look up a directed connection.
    pub fn find_connection(&self, from: NodeId, to: NodeId) -> Option<&Connection> {
        self.connections.get(&ConnectionKey { from, to })
    }

    /// Nodes in mirror (insertion) order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.node_order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Connections in mirror (insertion) order.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connection_order.iter().filter_map(|key| self.connections.get(key))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
