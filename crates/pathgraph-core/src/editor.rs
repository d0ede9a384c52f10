//! The editing engine.
//!
//! [`Editor`] is the single actor that owns the canvas and the transport.
//! Input events, transport polls and frame ticks are handled one at a time
//! and each runs to completion, so a renderer always sees the mirror
//! between two whole server messages.
//!
//! Sends are fire-and-forget. When the connection is not open the command
//! is dropped and the connection-error flag goes up; nothing is queued or
//! retried.

use kurbo::{Point, Size, Vec2};

use crate::canvas::Canvas;
use crate::config::EditorConfig;
use crate::graph::NodeId;
use crate::input::{InputEvent, InputState, MouseButton};
use crate::protocol::{Algorithm, ClientMessage, ServerMessage, encode_client_message};
use crate::sync::{ConnectionState, SyncEvent, Transport};
use crate::tools::{ToolKind, ToolManager};

/// Synchronized graph editor over a transport.
pub struct Editor<T: Transport> {
    canvas: Canvas,
    transport: T,
    input: InputState,
    /// Shown to the user while the server is unreachable.
    connection_error: bool,
    needs_redraw: bool,
    dropped_commands: usize,
}

impl<T: Transport> Editor<T> {
    /// Create an editor with an empty mirror.
    pub fn new(config: &EditorConfig, transport: T) -> Self {
        Self {
            canvas: Canvas::from_config(config),
            transport,
            input: InputState::new(),
            connection_error: false,
            // First frame
            needs_redraw: true,
            dropped_commands: 0,
        }
    }

    /// Read-only view of the canvas for drawing.
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn tools(&self) -> &ToolManager {
        &self.canvas.tool_manager
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.transport.state()
    }

    /// Whether the connection-error indicator should be shown.
    pub fn connection_error(&self) -> bool {
        self.connection_error
    }

    /// Number of commands dropped because the connection was not open.
    pub fn dropped_commands(&self) -> usize {
        self.dropped_commands
    }

    /// Pointer position in world coordinates.
    pub fn pointer_world(&self) -> Point {
        self.canvas.camera.screen_to_world(self.input.pointer_position)
    }

    // --- Redraw scheduling ---

    /// Schedule a redraw for the next frame.
    pub fn request_redraw(&mut self) {
        self.needs_redraw = true;
    }

    pub fn needs_redraw(&self) -> bool {
        self.needs_redraw
    }

    /// Take the redraw signal. Call once per animation frame and draw only
    /// when this returns true.
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.needs_redraw)
    }

    // --- Input ---

    /// Dispatch one input event.
    pub fn handle_event(&mut self, event: InputEvent) {
        match event {
            InputEvent::PointerMove { position } => self.pointer_move(position),
            InputEvent::PointerDown { position, button } => self.pointer_down(position, button),
            InputEvent::PointerUp { position, button } => self.pointer_up(position, button),
            InputEvent::Click { position, button } => self.click(position, button),
            InputEvent::SelectTool(tool) => self.select_tool(tool),
            InputEvent::Cancel => self.cancel_gesture(),
            InputEvent::FindPath => self.request_find_path(),
            InputEvent::Pan { delta } => self.pan(delta),
            InputEvent::Resize { size } => self.resize(size),
        }
    }

    /// Track the pointer and recompute the hovered node.
    pub fn pointer_move(&mut self, screen: Point) {
        if let Some(delta) = self.input.move_to(screen) {
            self.pan(delta);
        }
        self.refresh_hover();
    }

    pub fn pointer_down(&mut self, screen: Point, button: MouseButton) {
        self.input.press(screen, button);
    }

    pub fn pointer_up(&mut self, screen: Point, button: MouseButton) {
        self.input.release(screen, button);
    }

    /// Handle a click. The primary button drives the current tool, the
    /// secondary button aborts a pending gesture.
    pub fn click(&mut self, screen: Point, button: MouseButton) {
        self.input.pointer_position = screen;
        self.refresh_hover();

        match button {
            MouseButton::Left => {
                let before = self.session_snapshot();
                let world = self.canvas.camera.screen_to_world(screen);
                let hovered = self.canvas.hovered;
                if let Some(msg) = self.canvas.tool_manager.click(world, hovered) {
                    self.send(msg);
                }
                if self.session_snapshot() != before {
                    self.request_redraw();
                }
            }
            MouseButton::Right => self.cancel_gesture(),
            MouseButton::Middle => {}
        }
    }

    /// Switch tools. A pending gesture is dropped.
    pub fn select_tool(&mut self, tool: ToolKind) {
        let had_selection = self.canvas.tool_manager.selected_node().is_some();
        self.canvas.set_tool(tool);
        if had_selection {
            self.request_redraw();
        }
    }

    /// Abort a pending two-click gesture.
    pub fn cancel_gesture(&mut self) {
        if self.canvas.tool_manager.selected_node().is_some() {
            self.canvas.tool_manager.cancel();
            self.request_redraw();
        }
    }

    pub fn set_algorithm(&mut self, algorithm: Algorithm) {
        self.canvas.tool_manager.algorithm = algorithm;
    }

    /// Ask the server for a path between the chosen endpoints.
    /// Does nothing unless both are set.
    pub fn request_find_path(&mut self) {
        match self.canvas.tool_manager.find_path() {
            Some(msg) => {
                self.send(msg);
            }
            None => log::debug!("Find path requested without both endpoints"),
        }
    }

    /// Pan the camera by a screen-space delta.
    pub fn pan(&mut self, delta: Vec2) {
        if delta == Vec2::ZERO {
            return;
        }
        self.canvas.camera.pan(delta);
        self.refresh_hover();
        self.request_redraw();
    }

    pub fn resize(&mut self, size: Size) {
        self.canvas.set_viewport_size(size.width, size.height);
        self.request_redraw();
    }

    fn refresh_hover(&mut self) {
        let world = self.pointer_world();
        if self.canvas.update_hover(world) {
            self.request_redraw();
        }
    }

    /// State the renderer depends on that a click can change.
    fn session_snapshot(&self) -> [Option<NodeId>; 3] {
        let tm = &self.canvas.tool_manager;
        [tm.selected_node(), tm.path_start, tm.path_goal]
    }

    // --- Network ---

    fn send(&mut self, msg: ClientMessage) -> bool {
        if !self.transport.is_connected() {
            log::warn!("Dropping {:?}: connection is not open", msg);
            self.drop_command();
            return false;
        }

        match self.transport.send(encode_client_message(&msg)) {
            Ok(()) => {
                log::debug!("Sent {:?}", msg);
                true
            }
            Err(e) => {
                log::warn!("Dropping {:?}: {}", msg, e);
                self.drop_command();
                false
            }
        }
    }

    fn drop_command(&mut self) {
        self.dropped_commands += 1;
        self.set_connection_error(true);
    }

    fn set_connection_error(&mut self, error: bool) {
        if self.connection_error != error {
            self.connection_error = error;
            self.request_redraw();
        }
    }

    /// Drain the transport and apply everything it received.
    /// Returns the number of server messages applied.
    pub fn poll_transport(&mut self) -> usize {
        let mut applied = 0;
        for event in self.transport.poll_events() {
            match event {
                SyncEvent::Connected => {
                    log::info!("Connected to graph server");
                    // The server replays the whole graph on every connect
                    self.canvas.reset_graph();
                    self.set_connection_error(false);
                    self.request_redraw();
                }
                SyncEvent::Disconnected => {
                    log::warn!("Disconnected from graph server");
                    self.set_connection_error(true);
                }
                SyncEvent::Error { message } => {
                    log::error!("Connection error: {}", message);
                    self.set_connection_error(true);
                }
                SyncEvent::Message(msg) => {
                    self.apply_server_message(&msg);
                    applied += 1;
                }
            }
        }
        applied
    }

    /// Apply one server message as a single step.
    pub fn apply_server_message(&mut self, msg: &ServerMessage) {
        if !self.canvas.graph.apply(msg) {
            return;
        }

        match msg {
            ServerMessage::NodeRemoved { id } => {
                self.canvas.tool_manager.forget_node(*id);
                self.refresh_hover();
            }
            ServerMessage::NodeAdded { .. } => self.refresh_hover(),
            _ => {}
        }
        self.request_redraw();
    }
}
