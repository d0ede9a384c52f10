//! Hit testing: world point → node lookup.

use kurbo::Point;

use crate::graph::{Node, NodeId};

/// Default pick radius in world units.
pub const DEFAULT_PICK_RADIUS: f64 = 32.0;

/// Find the node under `point`.
///
/// A node is hit when its center is strictly closer than `radius`; a point
/// exactly on the boundary misses. Overlapping nodes are not ranked by
/// distance: the first hit in iteration (mirror) order wins.
pub fn hit_test<'a>(
    point: Point,
    nodes: impl IntoIterator<Item = &'a Node>,
    radius: f64,
) -> Option<NodeId> {
    nodes
        .into_iter()
        .find(|node| node.position.distance(point) < radius)
        .map(|node| node.id)
}
