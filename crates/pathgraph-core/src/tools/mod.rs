//! Tool system for graph editing.
//!
//! A click is interpreted against the current tool and produces at most one
//! outbound command. Tools never touch the mirror; every visible change
//! waits for the server's echo.

use kurbo::Point;
use serde::{Deserialize, Serialize};

use crate::graph::NodeId;
use crate::protocol::{Algorithm, ClientMessage};

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ToolKind {
    #[default]
    None,
    AddNode,
    RemoveNode,
    AddConnection,
    RemoveConnection,
    SetStart,
    SetGoal,
}

/// State of a two-click gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolState {
    /// No endpoint picked yet.
    #[default]
    Idle,
    /// The first endpoint of a connection gesture has been picked.
    EndpointSelected { first: NodeId },
}

/// Manages the current tool, the pending gesture and the path endpoints.
#[derive(Debug, Clone, Default)]
pub struct ToolManager {
    /// Currently selected tool.
    pub current_tool: ToolKind,
    /// Current state of the tool.
    pub state: ToolState,
    /// Start of the next path request.
    pub path_start: Option<NodeId>,
    /// Goal of the next path request.
    pub path_goal: Option<NodeId>,
    /// Search strategy for path requests.
    pub algorithm: Algorithm,
}

impl ToolManager {
    /// Create a new tool manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the current tool. Any pending gesture is dropped.
    pub fn set_tool(&mut self, tool: ToolKind) {
        self.current_tool = tool;
        self.state = ToolState::Idle;
    }

    /// Abort a pending two-click gesture.
    pub fn cancel(&mut self) {
        self.state = ToolState::Idle;
    }

    /// The first endpoint of a pending gesture, if any.
    pub fn selected_node(&self) -> Option<NodeId> {
        match self.state {
            ToolState::Idle => None,
            ToolState::EndpointSelected { first } => Some(first),
        }
    }

    /// Handle a primary click at `world` with `hovered` under the pointer.
    pub fn click(&mut self, world: Point, hovered: Option<NodeId>) -> Option<ClientMessage> {
        match self.current_tool {
            ToolKind::None => None,
            ToolKind::AddNode => Some(ClientMessage::AddNode { position: world }),
            ToolKind::RemoveNode => hovered.map(|id| ClientMessage::RemoveNode { id }),
            ToolKind::AddConnection => {
                let (from, to) = self.advance_pair(hovered?)?;
                Some(ClientMessage::AddConnection { from, to })
            }
            ToolKind::RemoveConnection => {
                let (from, to) = self.advance_pair(hovered?)?;
                Some(ClientMessage::RemoveConnection { from, to })
            }
            ToolKind::SetStart => {
                self.path_start = Some(hovered?);
                None
            }
            ToolKind::SetGoal => {
                self.path_goal = Some(hovered?);
                None
            }
        }
    }

    /// Step the two-click gesture. Returns the pair once both ends are known.
    fn advance_pair(&mut self, node: NodeId) -> Option<(NodeId, NodeId)> {
        match self.state {
            ToolState::Idle => {
                self.state = ToolState::EndpointSelected { first: node };
                None
            }
            ToolState::EndpointSelected { first } => {
                self.state = ToolState::Idle;
                Some((first, node))
            }
        }
    }

    /// Build a path request if both endpoints are set.
    pub fn find_path(&self) -> Option<ClientMessage> {
        Some(ClientMessage::FindPath {
            start: self.path_start?,
            goal: self.path_goal?,
            algorithm: self.algorithm,
        })
    }

    /// Drop every reference to a node that left the graph.
    /// Returns true if anything was cleared.
    pub fn forget_node(&mut self, id: NodeId) -> bool {
        let mut changed = false;
        if self.path_start == Some(id) {
            self.path_start = None;
            changed = true;
        }
        if self.path_goal == Some(id) {
            self.path_goal = None;
            changed = true;
        }
        if self.selected_node() == Some(id) {
            self.state = ToolState::Idle;
            changed = true;
        }
        changed
    }
}
