//! Canvas2D renderer.
//!
//! Replays the recorded draw list on an HTML `<canvas>` via
//! `CanvasRenderingContext2d`.

use std::f64::consts::TAU;

use peniko::Color;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::renderer::{RenderContext, RenderResult, Renderer, RendererError};
use crate::scene::{DrawOp, SceneRecorder};

/// Draws frames onto a browser canvas.
pub struct Canvas2dRenderer {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    recorder: SceneRecorder,
}

impl Canvas2dRenderer {
    /// Attach to a canvas element.
    pub fn new(canvas: &HtmlCanvasElement) -> RenderResult<Self> {
        let ctx = canvas
            .get_context("2d")
            .map_err(|e| RendererError::InitFailed(format!("{:?}", e)))?
            .ok_or_else(|| RendererError::InitFailed("2d context unavailable".to_string()))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| RendererError::InitFailed("not a 2d context".to_string()))?;

        Ok(Self {
            canvas: canvas.clone(),
            ctx,
            recorder: SceneRecorder::new(),
        })
    }

    /// Backing-store pixels per CSS pixel, so HiDPI canvases stay sharp.
    fn scale_factor(&self) -> f64 {
        let css_width = self.canvas.client_width();
        if css_width > 0 {
            f64::from(self.canvas.width()) / f64::from(css_width)
        } else {
            1.0
        }
    }

    /// Draw the ops recorded by the last `build_scene`.
    pub fn present(&self) -> RenderResult<()> {
        let ctx = &self.ctx;
        let scale = self.scale_factor();
        ctx.set_transform(scale, 0.0, 0.0, scale, 0.0, 0.0)
            .map_err(render_failed)?;

        for op in self.recorder.ops() {
            match op {
                DrawOp::Clear { size, color } => {
                    ctx.set_fill_style_str(&css_color(*color));
                    ctx.fill_rect(0.0, 0.0, size.width, size.height);
                }
                DrawOp::Line { from, to, width, color } => {
                    ctx.set_stroke_style_str(&css_color(*color));
                    ctx.set_line_width(*width);
                    ctx.begin_path();
                    ctx.move_to(from.x, from.y);
                    ctx.line_to(to.x, to.y);
                    ctx.stroke();
                }
                DrawOp::Polygon { points, color } => {
                    let Some((first, rest)) = points.split_first() else {
                        continue;
                    };
                    ctx.set_fill_style_str(&css_color(*color));
                    ctx.begin_path();
                    ctx.move_to(first.x, first.y);
                    for p in rest {
                        ctx.line_to(p.x, p.y);
                    }
                    ctx.close_path();
                    ctx.fill();
                }
                DrawOp::Circle { center, radius, fill, stroke } => {
                    ctx.begin_path();
                    ctx.arc(center.x, center.y, *radius, 0.0, TAU).map_err(render_failed)?;
                    if let Some(fill) = fill {
                        ctx.set_fill_style_str(&css_color(*fill));
                        ctx.fill();
                    }
                    if let Some((color, width)) = stroke {
                        ctx.set_stroke_style_str(&css_color(*color));
                        ctx.set_line_width(*width);
                        ctx.stroke();
                    }
                }
                DrawOp::FillRect { rect, color } => {
                    ctx.set_fill_style_str(&css_color(*color));
                    ctx.fill_rect(rect.x0, rect.y0, rect.width(), rect.height());
                }
                DrawOp::Text { position, text, size, color } => {
                    ctx.set_fill_style_str(&css_color(*color));
                    ctx.set_font(&format!("{}px sans-serif", size));
                    ctx.set_text_align("center");
                    ctx.set_text_baseline("middle");
                    ctx.fill_text(text, position.x, position.y).map_err(render_failed)?;
                }
            }
        }
        Ok(())
    }

    /// Build and draw in one go.
    pub fn render(&mut self, ctx: &RenderContext) -> RenderResult<()> {
        self.build_scene(ctx);
        self.present()
    }
}

impl Renderer for Canvas2dRenderer {
    fn build_scene(&mut self, ctx: &RenderContext) {
        self.recorder.build_scene(ctx);
    }
}

fn render_failed(e: wasm_bindgen::JsValue) -> RendererError {
    RendererError::RenderFailed(format!("{:?}", e))
}

/// CSS `rgba()` string for a color.
fn css_color(color: Color) -> String {
    let c = color.to_rgba8();
    format!("rgba({}, {}, {}, {})", c.r, c.g, c.b, c.a as f64 / 255.0)
}
