//! Input events from the presentation layer.

use kurbo::{Point, Size, Vec2};
use serde::{Deserialize, Serialize};

use crate::tools::ToolKind;

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Everything the host can feed into the editor.
///
/// Positions are in screen coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    PointerMove { position: Point },
    PointerDown { position: Point, button: MouseButton },
    PointerUp { position: Point, button: MouseButton },
    Click { position: Point, button: MouseButton },
    SelectTool(ToolKind),
    /// Abort a pending two-click gesture (e.g. Escape).
    Cancel,
    FindPath,
    Pan { delta: Vec2 },
    Resize { size: Size },
}

/// Tracks the pointer across events.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    /// Current pointer position in screen coordinates.
    pub pointer_position: Point,
    /// Last position of an in-progress middle-button pan drag.
    pan_anchor: Option<Point>,
}

impl InputState {
    /// Create a new input state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a button press. Middle presses start a pan drag.
    pub fn press(&mut self, position: Point, button: MouseButton) {
        self.pointer_position = position;
        if button == MouseButton::Middle {
            self.pan_anchor = Some(position);
        }
    }

    /// Record a button release.
    pub fn release(&mut self, position: Point, button: MouseButton) {
        self.pointer_position = position;
        if button == MouseButton::Middle {
            self.pan_anchor = None;
        }
    }

    /// Record a pointer move and return the pan delta, if dragging.
    pub fn move_to(&mut self, position: Point) -> Option<Vec2> {
        self.pointer_position = position;
        let anchor = self.pan_anchor.as_mut()?;
        let delta = position - *anchor;
        *anchor = position;
        Some(delta)
    }

    /// Whether a pan drag is in progress.
    pub fn is_panning(&self) -> bool {
        self.pan_anchor.is_some()
    }
}
