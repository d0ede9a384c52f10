//! Backend-agnostic draw list.
//!
//! [`SceneRecorder`] turns a frame into a flat list of [`DrawOp`]s in
//! screen space. Backends replay the list; tests inspect it directly.

use kurbo::{Point, Rect, Size, Vec2};
use pathgraph_core::graph::Connection;
use peniko::Color;

use crate::renderer::{GridStyle, Palette, RenderContext, Renderer};

/// Arrowhead length in screen pixels.
const ARROW_LENGTH: f64 = 10.0;
/// Arrowhead half-width in screen pixels.
const ARROW_HALF_WIDTH: f64 = 5.0;
const CONNECTION_WIDTH: f64 = 2.0;
const LABEL_SIZE: f64 = 12.0;
const BANNER_HEIGHT: f64 = 28.0;
const BANNER_TEXT: &str = "Connection to server lost";
/// Most grid lines drawn along one axis. Denser grids are skipped.
const MAX_GRID_LINES: i64 = 256;

/// One drawing command in screen coordinates.
#[derive(Debug, Clone)]
pub enum DrawOp {
    /// Fill the whole viewport.
    Clear { size: Size, color: Color },
    Line { from: Point, to: Point, width: f64, color: Color },
    /// Filled closed polygon.
    Polygon { points: Vec<Point>, color: Color },
    Circle {
        center: Point,
        radius: f64,
        fill: Option<Color>,
        stroke: Option<(Color, f64)>,
    },
    FillRect { rect: Rect, color: Color },
    /// Text centered on `position`.
    Text { position: Point, text: String, size: f64, color: Color },
}

/// Records a frame as a list of draw ops.
#[derive(Debug, Default)]
pub struct SceneRecorder {
    ops: Vec<DrawOp>,
}

impl SceneRecorder {
    /// Create a new recorder with an empty draw list.
    pub fn new() -> Self {
        Self::default()
    }

    /// The ops of the last built frame.
    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Take ownership of the draw list, leaving an empty one.
    pub fn take_ops(&mut self) -> Vec<DrawOp> {
        std::mem::take(&mut self.ops)
    }

    fn push(&mut self, op: DrawOp) {
        self.ops.push(op);
    }
}

impl Renderer for SceneRecorder {
    fn build_scene(&mut self, ctx: &RenderContext) {
        self.ops.clear();

        self.push(DrawOp::Clear {
            size: ctx.viewport_size,
            color: self.background_color(ctx),
        });
        self.render_grid(ctx);
        self.render_connections(ctx);
        self.render_nodes(ctx);
        self.render_path_endpoints(ctx);

        if ctx.connection_error {
            self.render_error_banner(ctx);
        }
    }
}

impl SceneRecorder {
    /// Grid lines anchored to world coordinates, so they move with the camera.
    fn render_grid(&mut self, ctx: &RenderContext) {
        let spacing = ctx.grid_spacing;
        if ctx.grid_style == GridStyle::None || !spacing.is_finite() || spacing <= 0.0 {
            return;
        }

        let camera = &ctx.canvas.camera;
        let visible = ctx.canvas.visible_world_rect();
        let (first_x, last_x) = grid_range(visible.x0, visible.x1, spacing);
        let (first_y, last_y) = grid_range(visible.y0, visible.y1, spacing);
        if last_x - first_x > MAX_GRID_LINES || last_y - first_y > MAX_GRID_LINES {
            log::debug!("Skipping grid: spacing {} is too dense for the viewport", spacing);
            return;
        }
        let (start_x, end_x) = (first_x as f64 * spacing, last_x as f64 * spacing);
        let (start_y, end_y) = (first_y as f64 * spacing, last_y as f64 * spacing);
        let color = ctx.palette.grid;

        match ctx.grid_style {
            GridStyle::None => {}
            GridStyle::Lines => {
                // Vertical lines
                for i in first_x..=last_x {
                    let x = i as f64 * spacing;
                    self.push(DrawOp::Line {
                        from: camera.world_to_screen(Point::new(x, start_y)),
                        to: camera.world_to_screen(Point::new(x, end_y)),
                        width: 0.5,
                        color,
                    });
                }
                // Horizontal lines
                for j in first_y..=last_y {
                    let y = j as f64 * spacing;
                    self.push(DrawOp::Line {
                        from: camera.world_to_screen(Point::new(start_x, y)),
                        to: camera.world_to_screen(Point::new(end_x, y)),
                        width: 0.5,
                        color,
                    });
                }
            }
            GridStyle::Dots => {
                for i in first_x..=last_x {
                    for j in first_y..=last_y {
                        self.push(DrawOp::Circle {
                            center: camera.world_to_screen(Point::new(i as f64 * spacing, j as f64 * spacing)),
                            radius: 1.5,
                            fill: Some(color),
                            stroke: None,
                        });
                    }
                }
            }
        }
    }

    fn render_connections(&mut self, ctx: &RenderContext) {
        let graph = &ctx.canvas.graph;
        for connection in graph.connections() {
            let (Some(from), Some(to)) = (graph.find_node(connection.from), graph.find_node(connection.to)) else {
                log::warn!(
                    "Skipping connection {} -> {}: endpoint missing from mirror",
                    connection.from,
                    connection.to
                );
                continue;
            };

            let camera = &ctx.canvas.camera;
            self.render_connection(
                connection,
                camera.world_to_screen(from.position),
                camera.world_to_screen(to.position),
                ctx.node_radius,
                &ctx.palette,
            );
        }
    }

    /// A directed line between two node rims with an arrowhead at the target.
    fn render_connection(&mut self, connection: &Connection, from: Point, to: Point, radius: f64, palette: &Palette) {
        let color = palette.connection_stroke(connection.active);
        let span = to - from;
        let length = span.hypot();

        if connection.from == connection.to || length <= radius * 2.0 {
            // Self-loop or overlapping nodes: a small ring above the node
            self.push(DrawOp::Circle {
                center: to - Vec2::new(0.0, radius),
                radius: radius * 0.6,
                fill: None,
                stroke: Some((color, CONNECTION_WIDTH)),
            });
            return;
        }

        let dir = span / length;
        let start = from + dir * radius;
        let tip = to - dir * radius;
        let base = tip - dir * ARROW_LENGTH;
        let normal = Vec2::new(-dir.y, dir.x) * ARROW_HALF_WIDTH;

        self.push(DrawOp::Line {
            from: start,
            to: base,
            width: CONNECTION_WIDTH,
            color,
        });
        self.push(DrawOp::Polygon {
            points: vec![tip, base + normal, base - normal],
            color,
        });
    }

    fn render_nodes(&mut self, ctx: &RenderContext) {
        let canvas = ctx.canvas;
        for node in canvas.graph.nodes() {
            let center = canvas.camera.world_to_screen(node.position);
            let fill = ctx
                .palette
                .node_fill(canvas.is_selected(node.id), canvas.is_hovered(node.id), node.active);

            self.push(DrawOp::Circle {
                center,
                radius: ctx.node_radius,
                fill: Some(fill),
                stroke: Some((ctx.palette.node_outline, 1.0)),
            });
            self.push(DrawOp::Text {
                position: center,
                text: node.id.to_string(),
                size: LABEL_SIZE,
                color: ctx.palette.label,
            });
        }
    }

    /// Rings around the chosen path start and goal.
    fn render_path_endpoints(&mut self, ctx: &RenderContext) {
        let canvas = ctx.canvas;
        let tools = &canvas.tool_manager;
        let markers = [
            (tools.path_start, ctx.palette.start_marker),
            (tools.path_goal, ctx.palette.goal_marker),
        ];

        for (id, color) in markers {
            let Some(node) = id.and_then(|id| canvas.graph.find_node(id)) else {
                continue;
            };
            self.push(DrawOp::Circle {
                center: canvas.camera.world_to_screen(node.position),
                radius: ctx.node_radius + 4.0,
                fill: None,
                stroke: Some((color, 2.0)),
            });
        }
    }

    fn render_error_banner(&mut self, ctx: &RenderContext) {
        let width = ctx.viewport_size.width;
        self.push(DrawOp::FillRect {
            rect: Rect::new(0.0, 0.0, width, BANNER_HEIGHT),
            color: ctx.palette.error_banner,
        });
        self.push(DrawOp::Text {
            position: Point::new(width / 2.0, BANNER_HEIGHT / 2.0),
            text: BANNER_TEXT.to_string(),
            size: LABEL_SIZE,
            color: ctx.palette.error_text,
        });
    }
}

/// Indices of the first and last grid line covering `[min, max]`.
fn grid_range(min: f64, max: f64, spacing: f64) -> (i64, i64) {
    ((min / spacing).floor() as i64, (max / spacing).ceil() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathgraph_core::canvas::Canvas;
    use pathgraph_core::graph::NodeId;
    use pathgraph_core::protocol::ServerMessage;
    use pathgraph_core::tools::ToolKind;

    fn canvas_with_edge() -> Canvas {
        let mut canvas = Canvas::new();
        canvas.set_viewport_size(500.0, 500.0);
        canvas.graph.apply_node_added(NodeId(1), Point::new(100.0, 100.0));
        canvas.graph.apply_node_added(NodeId(2), Point::new(300.0, 100.0));
        canvas.graph.apply_connection_added(NodeId(1), NodeId(2));
        canvas
    }

    fn build(ctx: &RenderContext) -> Vec<DrawOp> {
        let mut recorder = SceneRecorder::new();
        recorder.build_scene(ctx);
        recorder.take_ops()
    }

    fn kind(op: &DrawOp) -> &'static str {
        match op {
            DrawOp::Clear { .. } => "clear",
            DrawOp::Line { .. } => "line",
            DrawOp::Polygon { .. } => "polygon",
            DrawOp::Circle { .. } => "circle",
            DrawOp::FillRect { .. } => "rect",
            DrawOp::Text { .. } => "text",
        }
    }

    #[test]
    fn test_empty_canvas_without_grid() {
        let canvas = Canvas::new();
        let ctx = RenderContext::new(&canvas, Size::new(800.0, 600.0)).with_grid(GridStyle::None);
        let ops = build(&ctx);
        assert_eq!(ops.len(), 1);
        assert!(matches!(ops[0], DrawOp::Clear { size, .. } if size == Size::new(800.0, 600.0)));
    }

    #[test]
    fn test_draw_order() {
        let canvas = canvas_with_edge();
        let ctx = RenderContext::new(&canvas, Size::new(512.0, 512.0)).with_grid(GridStyle::None);
        let kinds: Vec<_> = build(&ctx).iter().map(kind).collect();
        assert_eq!(
            kinds,
            ["clear", "line", "polygon", "circle", "text", "circle", "text"]
        );
    }

    #[test]
    fn test_grid_comes_before_graph() {
        let canvas = canvas_with_edge();
        let mut ctx = RenderContext::new(&canvas, Size::new(500.0, 500.0));
        ctx.grid_spacing = 50.0;
        let ops = build(&ctx);

        let first_polygon = ops.iter().position(|op| matches!(op, DrawOp::Polygon { .. })).unwrap();
        let grid_lines = ops[1..first_polygon]
            .iter()
            .filter(|op| matches!(op, DrawOp::Line { width, .. } if *width < 1.0))
            .count();
        // 10 cells, so 11 lines each way
        assert_eq!(grid_lines, 22);
    }

    #[test]
    fn test_dense_grid_is_skipped() {
        let canvas = canvas_with_edge();
        for style in [GridStyle::Lines, GridStyle::Dots] {
            let mut ctx = RenderContext::new(&canvas, Size::new(500.0, 500.0)).with_grid(style);
            ctx.grid_spacing = 0.01;
            let kinds: Vec<_> = build(&ctx).iter().map(kind).collect();
            assert_eq!(kinds, ["clear", "line", "polygon", "circle", "text", "circle", "text"]);
        }
    }

    #[test]
    fn test_dots_grid_within_limit() {
        let canvas = Canvas::new();
        let mut ctx = RenderContext::new(&canvas, canvas.viewport_size).with_grid(GridStyle::Dots);
        ctx.grid_spacing = 4.0;
        // 512 / 4 = 128 cells, so 129 dots each way
        assert_eq!(build(&ctx).len(), 1 + 129 * 129);
    }

    #[test]
    fn test_arrow_stops_at_target_rim() {
        let canvas = canvas_with_edge();
        let ctx = RenderContext::new(&canvas, Size::new(512.0, 512.0)).with_grid(GridStyle::None);
        let ops = build(&ctx);

        let DrawOp::Line { from, .. } = &ops[1] else {
            panic!("expected connection line, got {:?}", ops[1]);
        };
        assert_eq!(*from, Point::new(116.0, 100.0));

        let DrawOp::Polygon { points, .. } = &ops[2] else {
            panic!("expected arrowhead, got {:?}", ops[2]);
        };
        assert_eq!(points[0], Point::new(284.0, 100.0));
    }

    #[test]
    fn test_camera_offset_applies() {
        let mut canvas = canvas_with_edge();
        canvas.camera.pan(Vec2::new(10.0, 20.0));
        let ctx = RenderContext::new(&canvas, Size::new(512.0, 512.0)).with_grid(GridStyle::None);

        let centers: Vec<_> = build(&ctx)
            .into_iter()
            .filter_map(|op| match op {
                DrawOp::Circle { center, fill: Some(_), .. } => Some(center),
                _ => None,
            })
            .collect();
        assert_eq!(centers, vec![Point::new(110.0, 120.0), Point::new(310.0, 120.0)]);
    }

    #[test]
    fn test_node_colors_follow_state() {
        let mut canvas = canvas_with_edge();
        canvas.set_tool(ToolKind::AddConnection);
        canvas.tool_manager.click(Point::new(100.0, 100.0), Some(NodeId(1)));
        canvas.hovered = Some(NodeId(2));
        canvas.graph.apply(&ServerMessage::PathResult {
            nodes: vec![NodeId(1), NodeId(2)],
        });

        let palette = Palette::default();
        let ctx = RenderContext::new(&canvas, Size::new(512.0, 512.0)).with_grid(GridStyle::None);
        let fills: Vec<_> = build(&ctx)
            .into_iter()
            .filter_map(|op| match op {
                DrawOp::Circle { fill: Some(fill), .. } => Some(fill.to_rgba8()),
                _ => None,
            })
            .collect();
        assert_eq!(
            fills,
            vec![
                palette.node_selected_on_path.to_rgba8(),
                palette.node_hovered_on_path.to_rgba8(),
            ]
        );
    }

    #[test]
    fn test_path_endpoint_markers() {
        let mut canvas = canvas_with_edge();
        canvas.tool_manager.path_start = Some(NodeId(1));
        canvas.tool_manager.path_goal = Some(NodeId(2));
        let ctx = RenderContext::new(&canvas, Size::new(512.0, 512.0)).with_grid(GridStyle::None);

        let rings = build(&ctx)
            .iter()
            .filter(|op| matches!(op, DrawOp::Circle { fill: None, .. }))
            .count();
        assert_eq!(rings, 2);
    }

    #[test]
    fn test_error_banner_drawn_last() {
        let canvas = Canvas::new();
        let ctx = RenderContext::new(&canvas, Size::new(400.0, 300.0))
            .with_grid(GridStyle::None)
            .with_connection_error(true);
        let ops = build(&ctx);
        assert!(matches!(ops[ops.len() - 2], DrawOp::FillRect { .. }));
        assert!(matches!(&ops[ops.len() - 1], DrawOp::Text { text, .. } if text == BANNER_TEXT));
    }

    #[test]
    fn test_rebuild_replaces_previous_frame() {
        let canvas = canvas_with_edge();
        let ctx = RenderContext::new(&canvas, Size::new(512.0, 512.0)).with_grid(GridStyle::None);
        let mut recorder = SceneRecorder::new();
        recorder.build_scene(&ctx);
        let first = recorder.ops().len();
        recorder.build_scene(&ctx);
        assert_eq!(recorder.ops().len(), first);
    }
}
