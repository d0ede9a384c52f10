//! Renderer trait abstraction.

use kurbo::Size;
use pathgraph_core::canvas::Canvas;
use pathgraph_core::config::EditorConfig;
use pathgraph_core::editor::Editor;
use pathgraph_core::sync::Transport;
use peniko::Color;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Initialization failed: {0}")]
    InitFailed(String),
    #[error("Render failed: {0}")]
    RenderFailed(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Grid display style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GridStyle {
    /// No grid (plain background).
    None,
    /// Full grid lines.
    #[default]
    Lines,
    /// Only intersection dots.
    Dots,
}

impl GridStyle {
    /// Cycle to the next grid style.
    pub fn next(self) -> Self {
        match self {
            GridStyle::None => GridStyle::Lines,
            GridStyle::Lines => GridStyle::Dots,
            GridStyle::Dots => GridStyle::None,
        }
    }
}

/// Colors used to draw a frame.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub background: Color,
    pub grid: Color,
    pub node: Color,
    pub node_hovered: Color,
    pub node_selected: Color,
    pub node_on_path: Color,
    pub node_hovered_on_path: Color,
    pub node_selected_on_path: Color,
    pub node_outline: Color,
    pub label: Color,
    pub connection: Color,
    pub connection_on_path: Color,
    pub start_marker: Color,
    pub goal_marker: Color,
    pub error_banner: Color,
    pub error_text: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: Color::from_rgba8(250, 250, 250, 255),
            grid: Color::from_rgba8(200, 200, 200, 100),
            node: Color::from_rgba8(148, 163, 184, 255),
            node_hovered: Color::from_rgba8(96, 165, 250, 255),
            node_selected: Color::from_rgba8(59, 130, 246, 255), // Blue
            node_on_path: Color::from_rgba8(251, 146, 60, 255),
            node_hovered_on_path: Color::from_rgba8(253, 186, 116, 255),
            node_selected_on_path: Color::from_rgba8(234, 88, 12, 255),
            node_outline: Color::from_rgba8(51, 65, 85, 255),
            label: Color::from_rgba8(15, 23, 42, 255),
            connection: Color::from_rgba8(100, 116, 139, 255),
            connection_on_path: Color::from_rgba8(234, 88, 12, 255),
            start_marker: Color::from_rgba8(22, 163, 74, 255),
            goal_marker: Color::from_rgba8(220, 38, 38, 255),
            error_banner: Color::from_rgba8(220, 38, 38, 230),
            error_text: Color::from_rgba8(255, 255, 255, 255),
        }
    }
}

impl Palette {
    /// Node fill: selected beats hovered beats plain, each with an
    /// on-path variant.
    pub fn node_fill(&self, selected: bool, hovered: bool, on_path: bool) -> Color {
        match (selected, hovered, on_path) {
            (true, _, false) => self.node_selected,
            (true, _, true) => self.node_selected_on_path,
            (false, true, false) => self.node_hovered,
            (false, true, true) => self.node_hovered_on_path,
            (false, false, false) => self.node,
            (false, false, true) => self.node_on_path,
        }
    }

    pub fn connection_stroke(&self, on_path: bool) -> Color {
        if on_path {
            self.connection_on_path
        } else {
            self.connection
        }
    }
}

/// Context for a single render frame.
pub struct RenderContext<'a> {
    /// The canvas to render.
    pub canvas: &'a Canvas,
    /// Viewport size in logical pixels.
    pub viewport_size: Size,
    pub palette: Palette,
    /// Grid display style.
    pub grid_style: GridStyle,
    /// Distance between grid lines in world units.
    pub grid_spacing: f64,
    /// Drawn node radius in world units.
    pub node_radius: f64,
    /// Draw the connection-error banner.
    pub connection_error: bool,
}

impl<'a> RenderContext<'a> {
    /// Create a new render context.
    pub fn new(canvas: &'a Canvas, viewport_size: Size) -> Self {
        let defaults = EditorConfig::default();
        Self {
            canvas,
            viewport_size,
            palette: Palette::default(),
            grid_style: GridStyle::Lines,
            grid_spacing: defaults.grid_spacing,
            node_radius: defaults.node_radius,
            connection_error: false,
        }
    }

    /// Snapshot an editor for drawing.
    pub fn from_editor<T: Transport>(editor: &'a Editor<T>) -> Self {
        let canvas = editor.canvas();
        Self::new(canvas, canvas.viewport_size).with_connection_error(editor.connection_error())
    }

    /// Take grid spacing and node radius from configuration.
    pub fn with_config(mut self, config: &EditorConfig) -> Self {
        self.grid_spacing = config.grid_spacing;
        self.node_radius = config.node_radius;
        self
    }

    /// Set the grid style.
    pub fn with_grid(mut self, style: GridStyle) -> Self {
        self.grid_style = style;
        self
    }

    pub fn with_connection_error(mut self, error: bool) -> Self {
        self.connection_error = error;
        self
    }
}

/// Trait for rendering backends.
pub trait Renderer {
    /// Build the scene/command buffer for a frame.
    ///
    /// Called only on frames where something changed.
    fn build_scene(&mut self, ctx: &RenderContext);

    /// Get the background color (for clearing).
    fn background_color(&self, ctx: &RenderContext) -> Color {
        ctx.palette.background
    }
}

/// Run one animation frame: drain the transport, then draw if anything
/// changed. Returns true when a scene was built.
pub fn render_frame<T, R>(editor: &mut Editor<T>, renderer: &mut R, config: &EditorConfig) -> bool
where
    T: Transport,
    R: Renderer + ?Sized,
{
    editor.poll_transport();
    if !editor.take_redraw() {
        return false;
    }
    let ctx = RenderContext::from_editor(editor).with_config(config);
    renderer.build_scene(&ctx);
    true
}
