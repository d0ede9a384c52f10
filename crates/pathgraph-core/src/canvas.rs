//! Canvas state: mirror, camera, tools and hover.

use kurbo::{Point, Rect, Size};

use crate::camera::Camera;
use crate::config::EditorConfig;
use crate::graph::{GraphMirror, NodeId};
use crate::hit::hit_test;
use crate::tools::{ToolKind, ToolManager};

/// Everything a frame needs to draw, plus the interaction session.
#[derive(Debug, Clone)]
pub struct Canvas {
    /// Local mirror of the server graph.
    pub graph: GraphMirror,
    /// Camera for view transform.
    pub camera: Camera,
    /// Tool manager.
    pub tool_manager: ToolManager,
    /// Node under the pointer, recomputed on every pointer move.
    pub hovered: Option<NodeId>,
    /// Viewport size.
    pub viewport_size: Size,
    /// Hit-test radius in world units.
    pub pick_radius: f64,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas {
    /// Create an empty canvas with default settings.
    pub fn new() -> Self {
        Self::from_config(&EditorConfig::default())
    }

    /// Create an empty canvas from configuration.
    pub fn from_config(config: &EditorConfig) -> Self {
        let mut tool_manager = ToolManager::new();
        tool_manager.algorithm = config.algorithm;
        Self {
            graph: GraphMirror::new(),
            camera: Camera::new(),
            tool_manager,
            hovered: None,
            viewport_size: Size::new(config.viewport_width, config.viewport_height),
            pick_radius: config.pick_radius,
        }
    }

    /// Set the viewport size.
    pub fn set_viewport_size(&mut self, width: f64, height: f64) {
        self.viewport_size = Size::new(width, height);
    }

    /// Set the current tool.
    pub fn set_tool(&mut self, tool: ToolKind) {
        self.tool_manager.set_tool(tool);
    }

    /// Node under a world point.
    pub fn node_at(&self, world: Point) -> Option<NodeId> {
        hit_test(world, self.graph.nodes(), self.pick_radius)
    }

    /// Recompute the hovered node. Returns true if it changed.
    pub fn update_hover(&mut self, world: Point) -> bool {
        let hovered = self.node_at(world);
        let changed = hovered != self.hovered;
        self.hovered = hovered;
        changed
    }

    /// Whether `id` is the pending first endpoint of a gesture.
    pub fn is_selected(&self, id: NodeId) -> bool {
        self.tool_manager.selected_node() == Some(id)
    }

    pub fn is_hovered(&self, id: NodeId) -> bool {
        self.hovered == Some(id)
    }

    /// The visible part of the world.
    pub fn visible_world_rect(&self) -> Rect {
        let top_left = self.camera.screen_to_world(Point::ZERO);
        Rect::from_origin_size(top_left, self.viewport_size)
    }

    /// Drop the mirror and every id that pointed into it.
    pub fn reset_graph(&mut self) {
        self.graph.clear();
        self.hovered = None;
        self.tool_manager.cancel();
        self.tool_manager.path_start = None;
        self.tool_manager.path_goal = None;
    }
}
