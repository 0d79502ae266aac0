//! Software 2D compositing over premultiplied RGBA.
//!
//! Drawing is expressed as a list of [`DrawOp`]s applied in order to a
//! canvas that starts fully transparent. The canvas keeps a small graphics
//! state (global alpha and blend mode) and supports isolated transparency
//! layers: a layer starts transparent, resets the graphics state, and when
//! ended is composited onto whatever is below it with the state that was
//! current when it began.
//!
//! Color channels are kept premultiplied on the 0-255 scale and alpha on
//! 0-1, so opaque 8-bit inputs blend without rounding error until the final
//! quantization.

use image::Rgba;

use crate::pixels::{CHANNELS, PixelBuffer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    #[default]
    Normal,
    /// Each channel becomes `|backdrop - source|`.
    Difference,
}

#[derive(Debug, Clone, Copy)]
pub enum DrawOp<'a> {
    SetAlpha(f32),
    SetBlendMode(BlendMode),
    BeginTransparencyLayer,
    EndTransparencyLayer,
    /// Draw an image anchored at the top-left corner, clipped to the canvas.
    DrawImage(&'a PixelBuffer),
    /// Fill the whole canvas with a straight-alpha color.
    Fill(Rgba<u8>),
}

pub trait Compositor {
    fn composite(&self, width: u32, height: u32, ops: &[DrawOp<'_>]) -> PixelBuffer;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SoftwareCompositor;

impl Compositor for SoftwareCompositor {
    fn composite(&self, width: u32, height: u32, ops: &[DrawOp<'_>]) -> PixelBuffer {
        let mut canvas = Canvas::new(width, height);
        for op in ops {
            canvas.apply(op);
        }
        canvas.finish()
    }
}

type Px = [f64; 4];

#[derive(Debug, Clone, Copy)]
struct GState {
    alpha: f64,
    blend: BlendMode,
}

impl Default for GState {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            blend: BlendMode::Normal,
        }
    }
}

struct Layer {
    pixels: Vec<Px>,
    saved: GState,
}

struct Canvas {
    width: u32,
    height: u32,
    base: Vec<Px>,
    layers: Vec<Layer>,
    state: GState,
}

impl Canvas {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            base: vec![[0.0; 4]; width as usize * height as usize],
            layers: Vec::new(),
            state: GState::default(),
        }
    }

    fn surface_mut(&mut self) -> &mut [Px] {
        match self.layers.last_mut() {
            Some(layer) => &mut layer.pixels,
            None => &mut self.base,
        }
    }

    fn apply(&mut self, op: &DrawOp<'_>) {
        match *op {
            DrawOp::SetAlpha(alpha) => self.state.alpha = f64::from(alpha.clamp(0.0, 1.0)),
            DrawOp::SetBlendMode(mode) => self.state.blend = mode,
            DrawOp::BeginTransparencyLayer => {
                self.layers.push(Layer {
                    pixels: vec![[0.0; 4]; self.base.len()],
                    saved: self.state,
                });
                self.state = GState::default();
            }
            DrawOp::EndTransparencyLayer => self.end_layer(),
            DrawOp::DrawImage(image) => self.draw_image(image),
            DrawOp::Fill(color) => self.fill(color),
        }
    }

    fn end_layer(&mut self) {
        let Some(layer) = self.layers.pop() else {
            return;
        };
        self.state = layer.saved;
        let alpha = layer.saved.alpha;
        for (dst, src) in self.surface_mut().iter_mut().zip(&layer.pixels) {
            *dst = blend(BlendMode::Normal, with_alpha(*src, alpha), *dst);
        }
    }

    fn draw_image(&mut self, image: &PixelBuffer) {
        let GState { alpha, blend: mode } = self.state;
        let canvas_width = self.width as usize;
        let image_width = image.width() as usize;
        let cols = self.width.min(image.width()) as usize;
        let rows = self.height.min(image.height()) as usize;
        let bytes = image.as_bytes();
        let surface = self.surface_mut();
        for y in 0..rows {
            for x in 0..cols {
                let i = (y * image_width + x) * CHANNELS;
                let src = with_alpha(to_px(&bytes[i..i + CHANNELS]), alpha);
                let dst = &mut surface[y * canvas_width + x];
                *dst = blend(mode, src, *dst);
            }
        }
    }

    fn fill(&mut self, Rgba([r, g, b, a]): Rgba<u8>) {
        let GState { alpha, blend: mode } = self.state;
        let a = f64::from(a) / 255.0;
        let color = [f64::from(r) * a, f64::from(g) * a, f64::from(b) * a, a];
        let src = with_alpha(color, alpha);
        for dst in self.surface_mut() {
            *dst = blend(mode, src, *dst);
        }
    }

    /// Flatten any layers left open, then quantize to 8 bits.
    fn finish(mut self) -> PixelBuffer {
        while !self.layers.is_empty() {
            self.end_layer();
        }
        let quantize = |v: f64| v.round().clamp(0.0, 255.0) as u8;
        let data: Vec<u8> = self
            .base
            .iter()
            .flat_map(|&[r, g, b, a]| [quantize(r), quantize(g), quantize(b), quantize(a * 255.0)])
            .collect();
        PixelBuffer::from_parts(self.width, self.height, data)
    }
}

fn to_px(px: &[u8]) -> Px {
    [
        f64::from(px[0]),
        f64::from(px[1]),
        f64::from(px[2]),
        f64::from(px[3]) / 255.0,
    ]
}

fn with_alpha(px: Px, alpha: f64) -> Px {
    px.map(|v| v * alpha)
}

/// Premultiplied blend of `src` onto `dst`.
fn blend(mode: BlendMode, src: Px, dst: Px) -> Px {
    let (sa, da) = (src[3], dst[3]);
    let out_alpha = sa + da - sa * da;
    match mode {
        BlendMode::Normal => [
            src[0] + dst[0] * (1.0 - sa),
            src[1] + dst[1] * (1.0 - sa),
            src[2] + dst[2] * (1.0 - sa),
            out_alpha,
        ],
        BlendMode::Difference => {
            let channel = |s: f64, d: f64| s + d - 2.0 * (s * da).min(d * sa);
            [
                channel(src[0], dst[0]),
                channel(src[1], dst[1]),
                channel(src[2], dst[2]),
                out_alpha,
            ]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    fn solid(w: u32, h: u32, px: [u8; 4]) -> PixelBuffer {
        PixelBuffer::from_raw(w, h, px.repeat((w * h) as usize)).unwrap()
    }

    fn first_pixel(buf: &PixelBuffer) -> &[u8] {
        &buf.as_bytes()[..4]
    }

    #[test]
    fn empty_op_list_is_transparent() {
        let out = SoftwareCompositor.composite(2, 2, &[]);
        assert!(out.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn opaque_draw_replaces_canvas() {
        let red = solid(2, 2, [255, 0, 0, 255]);
        let out = SoftwareCompositor.composite(2, 2, &[DrawOp::DrawImage(&red)]);
        assert_eq!(out, red);
    }

    #[test]
    fn global_alpha_scales_source() {
        let white = solid(1, 1, [255, 255, 255, 255]);
        let out = SoftwareCompositor.composite(
            1,
            1,
            &[DrawOp::SetAlpha(0.5), DrawOp::DrawImage(&white)],
        );
        assert_eq!(first_pixel(&out), &[128, 128, 128, 128]);
    }

    #[test]
    fn difference_with_white_inverts_opaque_colors() {
        let color = solid(1, 1, [255, 64, 0, 255]);
        let out = SoftwareCompositor.composite(
            1,
            1,
            &[
                DrawOp::DrawImage(&color),
                DrawOp::SetBlendMode(BlendMode::Difference),
                DrawOp::Fill(WHITE),
            ],
        );
        assert_eq!(first_pixel(&out), &[0, 191, 255, 255]);
    }

    #[test]
    fn difference_onto_transparent_is_source() {
        let out = SoftwareCompositor.composite(
            1,
            1,
            &[DrawOp::SetBlendMode(BlendMode::Difference), DrawOp::Fill(WHITE)],
        );
        assert_eq!(first_pixel(&out), &[255, 255, 255, 255]);
    }

    #[test]
    fn layer_resets_state_and_applies_saved_alpha_on_end() {
        let black = solid(1, 1, [0, 0, 0, 255]);
        let white = solid(1, 1, [255, 255, 255, 255]);
        let out = SoftwareCompositor.composite(
            1,
            1,
            &[
                DrawOp::DrawImage(&black),
                DrawOp::SetAlpha(0.5),
                DrawOp::BeginTransparencyLayer,
                // Drawn at full alpha inside the layer.
                DrawOp::DrawImage(&white),
                DrawOp::EndTransparencyLayer,
            ],
        );
        assert_eq!(first_pixel(&out), &[128, 128, 128, 255]);
    }

    #[test]
    fn end_layer_restores_blend_mode() {
        let gray = solid(1, 1, [100, 100, 100, 255]);
        let out = SoftwareCompositor.composite(
            1,
            1,
            &[
                DrawOp::DrawImage(&gray),
                DrawOp::BeginTransparencyLayer,
                DrawOp::SetBlendMode(BlendMode::Difference),
                DrawOp::EndTransparencyLayer,
                // Normal again: opaque white replaces gray.
                DrawOp::Fill(WHITE),
            ],
        );
        assert_eq!(first_pixel(&out), &[255, 255, 255, 255]);
    }

    #[test]
    fn unbalanced_layers_are_tolerated() {
        let white = solid(1, 1, [255, 255, 255, 255]);
        let out = SoftwareCompositor.composite(
            1,
            1,
            &[
                DrawOp::EndTransparencyLayer,
                DrawOp::BeginTransparencyLayer,
                DrawOp::DrawImage(&white),
            ],
        );
        assert_eq!(first_pixel(&out), &[255, 255, 255, 255]);
    }

    #[test]
    fn smaller_image_is_clipped_to_top_left() {
        let red = solid(1, 1, [255, 0, 0, 255]);
        let out = SoftwareCompositor.composite(2, 1, &[DrawOp::DrawImage(&red)]);
        assert_eq!(out.as_bytes(), &[255, 0, 0, 255, 0, 0, 0, 0]);
    }
}
