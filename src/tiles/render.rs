//! Raster tiles: one filled marker per feature on a transparent 256×256
//! canvas, PNG encoded.

use std::sync::Arc;

use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, Rgba, RgbaImage};
use once_cell::sync::OnceCell;

use crate::core::constants::{MARKER_COLOR, MARKER_RADIUS, TILE_SIZE};
use crate::core::geo::{Point, TileCoord};
use crate::core::projection::to_tile_pixel;
use crate::{Error, Result};

static EMPTY_TILE: OnceCell<Arc<Vec<u8>>> = OnceCell::new();

/// The encoded fully transparent tile, shared by every caller.
///
/// Produced by the same encoder as rendered tiles, so it is byte-identical
/// to a canvas on which nothing was drawn.
pub fn empty_tile() -> Result<Arc<Vec<u8>>> {
    EMPTY_TILE
        .get_or_try_init(|| encode_png(&blank_image()).map(Arc::new))
        .cloned()
}

/// Renders markers for world-pixel positions into `tile`.
pub fn render_tile(tile: TileCoord, world_points: impl IntoIterator<Item = Point>) -> Result<Arc<Vec<u8>>> {
    let mut canvas = TileCanvas::new();
    for world in world_points {
        canvas.draw_marker(to_tile_pixel(tile, world));
    }
    canvas.encode()
}

/// Drawing surface allocated on the first marker.
#[derive(Debug, Default)]
pub struct TileCanvas {
    image: Option<RgbaImage>,
}

impl TileCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_blank(&self) -> bool {
        self.image.is_none()
    }

    /// Fills a disc of [`MARKER_RADIUS`] pixels centred on `center`, given in
    /// tile pixel space. Pixels are tested at their centres; parts outside
    /// the tile are clipped.
    pub fn draw_marker(&mut self, center: Point) {
        let size = f64::from(TILE_SIZE);
        let radius = MARKER_RADIUS;
        if center.x + radius < 0.0
            || center.y + radius < 0.0
            || center.x - radius >= size
            || center.y - radius >= size
        {
            return;
        }

        let image = self.image.get_or_insert_with(blank_image);
        let min_x = (center.x - radius).floor().max(0.0) as u32;
        let min_y = (center.y - radius).floor().max(0.0) as u32;
        let max_x = ((center.x + radius).ceil() as u32).min(TILE_SIZE - 1);
        let max_y = ((center.y + radius).ceil() as u32).min(TILE_SIZE - 1);

        for py in min_y..=max_y {
            for px in min_x..=max_x {
                let dx = f64::from(px) + 0.5 - center.x;
                let dy = f64::from(py) + 0.5 - center.y;
                if dx * dx + dy * dy <= radius * radius {
                    image.put_pixel(px, py, Rgba(MARKER_COLOR));
                }
            }
        }
    }

    pub fn encode(&self) -> Result<Arc<Vec<u8>>> {
        match &self.image {
            Some(image) => encode_png(image).map(Arc::new),
            None => empty_tile(),
        }
    }

    #[cfg(test)]
    fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.image.as_ref().map(|image| image.get_pixel(x, y).0).unwrap_or_default()
    }
}

fn blank_image() -> RgbaImage {
    RgbaImage::new(TILE_SIZE, TILE_SIZE)
}

fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut encoded = Vec::new();
    PngEncoder::new(&mut encoded)
        .write_image(image.as_raw(), image.width(), image.height(), ColorType::Rgba8)
        .map_err(|e| Error::Render(e.to_string()))?;
    Ok(encoded)
}
