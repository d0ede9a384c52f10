//! Path search over the authoritative graph.

use pathgraph_core::protocol::Algorithm;
use petgraph::algo::astar;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};

use crate::graph::ServerNode;

/// Find a directed path from `start` to `goal`, both included.
///
/// Breadth-first minimizes hops; Dijkstra and A* minimize total euclidean
/// length. Returns `None` when the goal is unreachable.
pub fn find_path(
    graph: &StableDiGraph<ServerNode, f64>,
    start: NodeIndex,
    goal: NodeIndex,
    algorithm: Algorithm,
) -> Option<Vec<NodeIndex>> {
    match algorithm {
        // Unit edge cost counts hops
        Algorithm::BreadthFirst => astar(graph, start, |n| n == goal, |_| 1u32, |_| 0).map(|(_, path)| path),
        // A* without a heuristic is Dijkstra
        Algorithm::Dijkstra => astar(graph, start, |n| n == goal, |e| *e.weight(), |_| 0.0).map(|(_, path)| path),
        Algorithm::AStar => {
            let target = graph[goal].position;
            astar(
                graph,
                start,
                |n| n == goal,
                |e| *e.weight(),
                |n| graph[n].position.distance(target),
            )
            .map(|(_, path)| path)
        }
    }
}
