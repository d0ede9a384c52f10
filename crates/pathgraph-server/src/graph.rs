//! Authoritative graph store.

use std::collections::BTreeMap;

use kurbo::Point;
use pathgraph_core::graph::NodeId;
use pathgraph_core::protocol::{Algorithm, ClientMessage, ServerMessage};
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use tracing::{debug, warn};

use crate::pathfinding;

/// Node weight in the petgraph store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServerNode {
    pub id: NodeId,
    pub position: Point,
}

/// What the connection handler should do with the result of a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Mutations every client must see, the sender included.
    Broadcast(Vec<ServerMessage>),
    /// An answer for the requesting client only.
    Reply(ServerMessage),
    /// The command was rejected and changed nothing.
    Ignored,
}

/// The graph every client mirrors.
///
/// Edge weights are the euclidean length of the connection, fixed at
/// insertion since nodes never move.
#[derive(Debug, Default)]
pub struct ServerGraph {
    graph: StableDiGraph<ServerNode, f64>,
    /// Id to index, ordered by id for snapshots.
    index: BTreeMap<NodeId, NodeIndex>,
    next_id: i32,
}

impl ServerGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn connection_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains_connection(&self, from: NodeId, to: NodeId) -> bool {
        match (self.index.get(&from), self.index.get(&to)) {
            (Some(&a), Some(&b)) => self.graph.find_edge(a, b).is_some(),
            _ => false,
        }
    }

    /// Apply one client command.
    pub fn apply(&mut self, msg: ClientMessage) -> Outcome {
        match msg {
            ClientMessage::AddNode { position } => self.add_node(position),
            ClientMessage::RemoveNode { id } => self.remove_node(id),
            ClientMessage::AddConnection { from, to } => self.add_connection(from, to),
            ClientMessage::RemoveConnection { from, to } => self.remove_connection(from, to),
            ClientMessage::FindPath { start, goal, algorithm } => Outcome::Reply(ServerMessage::PathResult {
                nodes: self.find_path(start, goal, algorithm),
            }),
        }
    }

    fn add_node(&mut self, position: Point) -> Outcome {
        if !(position.x.is_finite() && position.y.is_finite()) {
            warn!("Rejecting node at non-finite position {:?}", position);
            return Outcome::Ignored;
        }
        let id = NodeId(self.next_id);
        let Some(next_id) = self.next_id.checked_add(1) else {
            warn!("Node id space exhausted");
            return Outcome::Ignored;
        };
        self.next_id = next_id;

        let idx = self.graph.add_node(ServerNode { id, position });
        self.index.insert(id, idx);
        debug!("Added node {} at {:?}", id, position);
        Outcome::Broadcast(vec![ServerMessage::NodeAdded { id, position }])
    }

    fn remove_node(&mut self, id: NodeId) -> Outcome {
        let Some(idx) = self.index.remove(&id) else {
            warn!("Cannot remove unknown node {}", id);
            return Outcome::Ignored;
        };
        // Incident edges go with it; clients cascade on their own
        self.graph.remove_node(idx);
        debug!("Removed node {}", id);
        Outcome::Broadcast(vec![ServerMessage::NodeRemoved { id }])
    }

    fn add_connection(&mut self, from: NodeId, to: NodeId) -> Outcome {
        if from == to {
            warn!("Rejecting self-loop on node {}", from);
            return Outcome::Ignored;
        }
        let (Some(&a), Some(&b)) = (self.index.get(&from), self.index.get(&to)) else {
            warn!("Cannot connect {} -> {}: unknown node", from, to);
            return Outcome::Ignored;
        };
        if self.graph.find_edge(a, b).is_some() {
            debug!("Connection {} -> {} already exists", from, to);
            return Outcome::Ignored;
        }

        let length = self.graph[a].position.distance(self.graph[b].position);
        self.graph.add_edge(a, b, length);
        debug!("Added connection {} -> {}", from, to);
        Outcome::Broadcast(vec![ServerMessage::ConnectionAdded { from, to }])
    }

    fn remove_connection(&mut self, from: NodeId, to: NodeId) -> Outcome {
        let edge = match (self.index.get(&from), self.index.get(&to)) {
            (Some(&a), Some(&b)) => self.graph.find_edge(a, b),
            _ => None,
        };
        let Some(edge) = edge else {
            warn!("Cannot remove unknown connection {} -> {}", from, to);
            return Outcome::Ignored;
        };

        self.graph.remove_edge(edge);
        debug!("Removed connection {} -> {}", from, to);
        Outcome::Broadcast(vec![ServerMessage::ConnectionRemoved { from, to }])
    }

    /// Node ids from `start` to `goal`, both included. Empty when either id
    /// is unknown or the goal is unreachable.
    pub fn find_path(&self, start: NodeId, goal: NodeId, algorithm: Algorithm) -> Vec<NodeId> {
        let (Some(&a), Some(&b)) = (self.index.get(&start), self.index.get(&goal)) else {
            warn!("Path request {} -> {} names an unknown node", start, goal);
            return Vec::new();
        };

        match pathfinding::find_path(&self.graph, a, b, algorithm) {
            Some(path) => path.into_iter().map(|idx| self.graph[idx].id).collect(),
            None => {
                debug!("No path from {} to {} ({:?})", start, goal, algorithm);
                Vec::new()
            }
        }
    }

    /// Messages that rebuild this graph in an empty mirror: every node,
    /// then every connection.
    pub fn snapshot(&self) -> Vec<ServerMessage> {
        let nodes = self.index.values().map(|&idx| {
            let node = self.graph[idx];
            ServerMessage::NodeAdded {
                id: node.id,
                position: node.position,
            }
        });
        let connections = self.graph.edge_indices().filter_map(|edge| {
            let (a, b) = self.graph.edge_endpoints(edge)?;
            Some(ServerMessage::ConnectionAdded {
                from: self.graph[a].id,
                to: self.graph[b].id,
            })
        });
        nodes.chain(connections).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(graph: &mut ServerGraph, x: f64, y: f64) -> NodeId {
        match graph.apply(ClientMessage::AddNode { position: Point::new(x, y) }) {
            Outcome::Broadcast(msgs) => match msgs.as_slice() {
                [ServerMessage::NodeAdded { id, .. }] => *id,
                _ => panic!("unexpected broadcast {:?}", msgs),
            },
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_ids_are_sequential_from_zero() {
        let mut graph = ServerGraph::new();
        assert_eq!(add(&mut graph, 0.0, 0.0), NodeId(0));
        assert_eq!(add(&mut graph, 1.0, 0.0), NodeId(1));
        graph.apply(ClientMessage::RemoveNode { id: NodeId(1) });
        // Ids are never reused
        assert_eq!(add(&mut graph, 2.0, 0.0), NodeId(2));
    }

    #[test]
    fn test_connection_rules() {
        let mut graph = ServerGraph::new();
        let a = add(&mut graph, 0.0, 0.0);
        let b = add(&mut graph, 10.0, 0.0);

        assert_eq!(
            graph.apply(ClientMessage::AddConnection { from: a, to: b }),
            Outcome::Broadcast(vec![ServerMessage::ConnectionAdded { from: a, to: b }])
        );
        // Duplicate, self-loop and unknown endpoint are all rejected
        assert_eq!(graph.apply(ClientMessage::AddConnection { from: a, to: b }), Outcome::Ignored);
        assert_eq!(graph.apply(ClientMessage::AddConnection { from: a, to: a }), Outcome::Ignored);
        assert_eq!(
            graph.apply(ClientMessage::AddConnection { from: a, to: NodeId(99) }),
            Outcome::Ignored
        );
        // The reverse direction is a distinct connection
        assert!(matches!(
            graph.apply(ClientMessage::AddConnection { from: b, to: a }),
            Outcome::Broadcast(_)
        ));
        assert_eq!(graph.connection_count(), 2);
    }

    #[test]
    fn test_remove_node_drops_incident_connections() {
        let mut graph = ServerGraph::new();
        let a = add(&mut graph, 0.0, 0.0);
        let b = add(&mut graph, 10.0, 0.0);
        let c = add(&mut graph, 20.0, 0.0);
        graph.apply(ClientMessage::AddConnection { from: a, to: b });
        graph.apply(ClientMessage::AddConnection { from: b, to: c });
        graph.apply(ClientMessage::AddConnection { from: a, to: c });

        assert_eq!(
            graph.apply(ClientMessage::RemoveNode { id: b }),
            Outcome::Broadcast(vec![ServerMessage::NodeRemoved { id: b }])
        );
        assert_eq!(graph.connection_count(), 1);
        assert!(graph.contains_connection(a, c));
        assert_eq!(graph.apply(ClientMessage::RemoveNode { id: b }), Outcome::Ignored);
    }

    #[test]
    fn test_remove_connection() {
        let mut graph = ServerGraph::new();
        let a = add(&mut graph, 0.0, 0.0);
        let b = add(&mut graph, 10.0, 0.0);
        graph.apply(ClientMessage::AddConnection { from: a, to: b });

        assert_eq!(
            graph.apply(ClientMessage::RemoveConnection { from: b, to: a }),
            Outcome::Ignored
        );
        assert_eq!(
            graph.apply(ClientMessage::RemoveConnection { from: a, to: b }),
            Outcome::Broadcast(vec![ServerMessage::ConnectionRemoved { from: a, to: b }])
        );
        assert_eq!(graph.connection_count(), 0);
    }

    #[test]
    fn test_find_path_is_a_reply() {
        let mut graph = ServerGraph::new();
        let a = add(&mut graph, 0.0, 0.0);
        let b = add(&mut graph, 10.0, 0.0);
        graph.apply(ClientMessage::AddConnection { from: a, to: b });

        let outcome = graph.apply(ClientMessage::FindPath {
            start: a,
            goal: b,
            algorithm: Algorithm::BreadthFirst,
        });
        assert_eq!(outcome, Outcome::Reply(ServerMessage::PathResult { nodes: vec![a, b] }));

        // Unknown ids and unreachable goals give an empty path
        assert!(graph.find_path(a, NodeId(42), Algorithm::Dijkstra).is_empty());
        assert!(graph.find_path(b, a, Algorithm::AStar).is_empty());
    }

    #[test]
    fn test_snapshot_rebuilds_graph() {
        let mut graph = ServerGraph::new();
        let a = add(&mut graph, 0.0, 0.0);
        let b = add(&mut graph, 10.0, 5.0);
        graph.apply(ClientMessage::AddConnection { from: b, to: a });

        assert_eq!(
            graph.snapshot(),
            vec![
                ServerMessage::NodeAdded { id: a, position: Point::new(0.0, 0.0) },
                ServerMessage::NodeAdded { id: b, position: Point::new(10.0, 5.0) },
                ServerMessage::ConnectionAdded { from: b, to: a },
            ]
        );
    }

    #[test]
    fn test_rejects_non_finite_position() {
        let mut graph = ServerGraph::new();
        let outcome = graph.apply(ClientMessage::AddNode {
            position: Point::new(f64::NAN, 0.0),
        });
        assert_eq!(outcome, Outcome::Ignored);
        assert_eq!(graph.node_count(), 0);
    }
}
