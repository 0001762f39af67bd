//! Terminal thumbnails for generated avatars.
//!
//! Every cell carries two vertically stacked pixels: the upper half block is
//! drawn with the top pixel as foreground and the bottom pixel as background.

use image::imageops::{self, FilterType};
use image::RgbImage;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Color;
use ratatui::widgets::Widget;

use crate::download::decode_data_uri;
use crate::error::GenerationError;
use crate::request::GeneratedImage;

/// Longest side kept in memory per preview.
const MAX_PREVIEW_SIDE: u32 = 160;

const UPPER_HALF: &str = "▀";

/// A decoded avatar, downscaled for the gallery.
#[derive(Debug, Clone)]
pub struct Preview {
    pub width: u32,
    pub height: u32,
    pixels: RgbImage,
}

impl Preview {
    pub fn decode(image: &GeneratedImage) -> Result<Self, GenerationError> {
        let decoded = decode_data_uri(&image.data_uri)?;
        let dynamic = image::load_from_memory(&decoded.bytes)?;
        let (width, height) = (dynamic.width(), dynamic.height());

        let dynamic = if width > MAX_PREVIEW_SIDE || height > MAX_PREVIEW_SIDE {
            dynamic.thumbnail(MAX_PREVIEW_SIDE, MAX_PREVIEW_SIDE)
        } else {
            dynamic
        };

        Ok(Self {
            width,
            height,
            pixels: dynamic.to_rgb8(),
        })
    }

    pub fn dimensions(&self) -> String {
        format!("{} × {}", self.width, self.height)
    }

    /// Scale to the largest size that fits `cols` x `rows` cells.
    pub fn fit(&self, cols: u16, rows: u16) -> RgbImage {
        let (w, h) = self.pixels.dimensions();
        let (max_w, max_h) = (u32::from(cols), u32::from(rows) * 2);
        if max_w == 0 || max_h == 0 || w == 0 || h == 0 {
            return RgbImage::new(0, 0);
        }

        let scale = f64::min(f64::from(max_w) / f64::from(w), f64::from(max_h) / f64::from(h));
        let target_w = ((f64::from(w) * scale).floor() as u32).clamp(1, max_w);
        let target_h = ((f64::from(h) * scale).floor() as u32).clamp(1, max_h);
        let filter = if target_w < w {
            FilterType::Triangle
        } else {
            FilterType::Nearest
        };
        imageops::resize(&self.pixels, target_w, target_h, filter)
    }
}

/// Draws an image centred in its area with half blocks.
pub struct HalfBlocks<'a> {
    pixels: &'a RgbImage,
}

impl<'a> HalfBlocks<'a> {
    pub fn new(pixels: &'a RgbImage) -> Self {
        Self { pixels }
    }
}

fn pixel_color(pixels: &RgbImage, x: u32, y: u32) -> Color {
    let [r, g, b] = pixels.get_pixel(x, y).0;
    Color::Rgb(r, g, b)
}

impl Widget for HalfBlocks<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (width, height) = self.pixels.dimensions();
        let cols = u16::try_from(width).unwrap_or(u16::MAX).min(area.width);
        let rows = u16::try_from(height.div_ceil(2)).unwrap_or(u16::MAX).min(area.height);
        let x0 = area.x + (area.width - cols) / 2;
        let y0 = area.y + (area.height - rows) / 2;

        for row in 0..rows {
            for col in 0..cols {
                let (x, top_y) = (u32::from(col), u32::from(row) * 2);
                let Some(cell) = buf.cell_mut((x0 + col, y0 + row)) else {
                    continue;
                };
                cell.set_symbol(UPPER_HALF).set_fg(pixel_color(self.pixels, x, top_y));
                if top_y + 1 < height {
                    cell.set_bg(pixel_color(self.pixels, x, top_y + 1));
                } else {
                    cell.set_bg(Color::Reset);
                }
            }
        }
    }
}
