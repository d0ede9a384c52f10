//! PathGraph Render Library
//!
//! Renderer abstraction for the PathGraph editor. Frames are recorded as a
//! backend-agnostic draw list; on wasm32 a Canvas2D backend replays it.

mod renderer;
mod scene;

#[cfg(target_arch = "wasm32")]
mod canvas2d;

pub use renderer::{GridStyle, Palette, RenderContext, RenderResult, Renderer, RendererError, render_frame};
pub use scene::{DrawOp, SceneRecorder};

#[cfg(target_arch = "wasm32")]
pub use canvas2d::Canvas2dRenderer;
