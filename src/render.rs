//! Software rendering of a controller snapshot, one point per pixel.

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageBuffer, Rgba, RgbaImage};
use log::debug;
use rusttype::{point, Font, Scale};
use std::path::Path;

use crate::controller::{CollageController, CountLabel};
use crate::geometry::Rect;
use crate::layout_config::{Color, ContentMode, LayoutConfiguration};

const LABEL_DIM: Rgba<u8> = Rgba([0, 0, 0, 110]);
const LABEL_TEXT: Rgba<u8> = Rgba([255, 255, 255, 255]);

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Not a usable font file: {0}")]
    InvalidFont(String),
}

/// Integer pixel rectangle clipped to non-negative origin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PixelRect {
    x: i64,
    y: i64,
    width: u32,
    height: u32,
}

impl PixelRect {
    fn from_frame(frame: Rect) -> Option<Self> {
        let width = frame.width.round();
        let height = frame.height.round();
        if !(width >= 1.0 && height >= 1.0) {
            return None;
        }

        Some(Self {
            x: frame.x.round() as i64,
            y: frame.y.round() as i64,
            width: width as u32,
            height: height as u32,
        })
    }
}

pub struct CollageRenderer {
    background: Rgba<u8>,
    font: Option<Font<'static>>,
}

impl Default for CollageRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl CollageRenderer {
    pub fn new() -> Self {
        Self {
            background: Rgba([0, 0, 0, 0]),
            font: None,
        }
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background = Rgba(color.to_array());
        self
    }

    /// Use the TrueType/OpenType font at `path` for the "+N" text. Without a
    /// font the label is drawn as a dimmed area only.
    pub fn with_font_file(mut self, path: impl AsRef<Path>) -> Result<Self, RenderError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let font = Font::try_from_vec(bytes)
            .ok_or_else(|| RenderError::InvalidFont(path.display().to_string()))?;

        self.font = Some(font);
        Ok(self)
    }

    pub fn render(&self, controller: &CollageController) -> RgbaImage {
        let bounds = controller.bounds();
        let width = bounds.width.round().max(1.0) as u32;
        let height = bounds.height.round().max(1.0) as u32;
        let configuration = controller.configuration();

        let mut canvas: RgbaImage = ImageBuffer::from_pixel(width, height, self.background);

        for slot in controller.slots() {
            let Some(rect) = PixelRect::from_frame(slot.frame()) else {
                continue;
            };

            let mut tile = fit_into(slot.displayed_bitmap().image(), rect, slot.content_mode());
            decorate(&mut tile, configuration);
            imageops::overlay(&mut canvas, &tile, rect.x, rect.y);
        }

        self.draw_count_label(&mut canvas, controller.count_label(), configuration);

        debug!(
            "Rendered {} slots into {}x{}",
            controller.slot_count(),
            width,
            height
        );
        canvas
    }

    fn draw_count_label(
        &self,
        canvas: &mut RgbaImage,
        label: &CountLabel,
        configuration: &LayoutConfiguration,
    ) {
        if label.hidden {
            return;
        }
        let Some(rect) = label.frame.and_then(PixelRect::from_frame) else {
            return;
        };

        let mut overlay: RgbaImage = ImageBuffer::from_pixel(rect.width, rect.height, LABEL_DIM);
        if let Some(font) = &self.font {
            draw_centered_text(&mut overlay, font, &label.text);
        }
        decorate(&mut overlay, configuration);
        imageops::overlay(canvas, &overlay, rect.x, rect.y);
    }
}

/// Scale `image` into a `rect`-sized tile according to `mode`
fn fit_into(image: &DynamicImage, rect: PixelRect, mode: ContentMode) -> RgbaImage {
    let (width, height) = (rect.width, rect.height);

    match mode {
        ContentMode::Fill => image
            .resize_to_fill(width, height, FilterType::Lanczos3)
            .to_rgba8(),
        ContentMode::Fit => {
            let resized = image.resize(width, height, FilterType::Lanczos3).to_rgba8();
            let mut tile: RgbaImage = ImageBuffer::new(width, height);
            let x = (width.saturating_sub(resized.width()) / 2) as i64;
            let y = (height.saturating_sub(resized.height()) / 2) as i64;
            imageops::overlay(&mut tile, &resized, x, y);
            tile
        }
        ContentMode::TopAlignedFill => {
            let scale = f64::max(
                width as f64 / image.width().max(1) as f64,
                height as f64 / image.height().max(1) as f64,
            );
            let scaled_width = ((image.width() as f64 * scale).ceil() as u32).max(width);
            let scaled_height = ((image.height() as f64 * scale).ceil() as u32).max(height);
            let resized = image
                .resize_exact(scaled_width, scaled_height, FilterType::Lanczos3)
                .to_rgba8();

            // Keep the top-right corner
            imageops::crop_imm(&resized, scaled_width - width, 0, width, height).to_image()
        }
    }
}

/// Border and rounded corners, applied the same way to slots and the label
fn decorate(tile: &mut RgbaImage, configuration: &LayoutConfiguration) {
    let radius = configuration.corner_radius.max(0.0);
    let border = configuration.border_width.max(0.0);
    if radius <= 0.0 && border <= 0.0 {
        return;
    }

    let border_color = Rgba(configuration.border_color.to_array());
    let (width, height) = (tile.width() as f64, tile.height() as f64);
    let radius = radius.min(width / 2.0).min(height / 2.0);

    for (x, y, pixel) in tile.enumerate_pixels_mut() {
        let px = x as f64 + 0.5;
        let py = y as f64 + 0.5;
        let inset = edge_distance(px, py, width, height, radius);

        if inset < 0.0 {
            *pixel = Rgba([0, 0, 0, 0]);
        } else if inset < border {
            *pixel = border_color;
        }
    }
}

/// Distance from a pixel centre to the rounded rectangle outline, negative
/// outside it
fn edge_distance(px: f64, py: f64, width: f64, height: f64, radius: f64) -> f64 {
    let straight = px.min(py).min(width - px).min(height - py);
    if radius <= 0.0 {
        return straight;
    }

    let cx = px.clamp(radius, width - radius);
    let cy = py.clamp(radius, height - radius);
    if cx == px || cy == py {
        return straight;
    }

    radius - ((px - cx).powi(2) + (py - cy).powi(2)).sqrt()
}

fn draw_centered_text(target: &mut RgbaImage, font: &Font<'static>, text: &str) {
    let size = (target.height().min(target.width()) as f32 * 0.4).max(8.0);
    let scale = Scale::uniform(size);
    let v_metrics = font.v_metrics(scale);

    let glyphs: Vec<_> = font.layout(text, scale, point(0.0, v_metrics.ascent)).collect();
    let text_width = glyphs
        .last()
        .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
        .unwrap_or(0.0);
    let text_height = v_metrics.ascent - v_metrics.descent;

    let offset_x = ((target.width() as f32 - text_width) / 2.0).round() as i32;
    let offset_y = ((target.height() as f32 - text_height) / 2.0).round() as i32;

    for glyph in &glyphs {
        let Some(bb) = glyph.pixel_bounding_box() else {
            continue;
        };

        glyph.draw(|gx, gy, coverage| {
            let x = offset_x + bb.min.x + gx as i32;
            let y = offset_y + bb.min.y + gy as i32;
            if x < 0 || y < 0 || x >= target.width() as i32 || y >= target.height() as i32 {
                return;
            }

            let pixel = target.get_pixel_mut(x as u32, y as u32);
            let alpha = coverage.clamp(0.0, 1.0);
            for channel in 0..3 {
                let base = pixel.0[channel] as f32;
                let ink = LABEL_TEXT.0[channel] as f32;
                pixel.0[channel] = (base + (ink - base) * alpha).round() as u8;
            }
            pixel.0[3] = pixel.0[3].max((alpha * 255.0).round() as u8);
        });
    }
}
