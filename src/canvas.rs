//! The pixel buffer a signature is painted into.
//!
//! A [`Canvas`] has fixed logical dimensions and a physical buffer scaled by
//! the display's pixel ratio. Painting code works in logical coordinates and
//! applies [`Canvas::transform`] to map them onto the buffer.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use resvg::tiny_skia::{Color, Pixmap, Transform};

use crate::config::validate_pixel_ratio;
use crate::error::{Error, Result};
use crate::layer::svg::{pixmap_to_rgba_image, unpremultiply};

/// Logical canvas width in device-independent pixels.
pub const CANVAS_WIDTH: u32 = 1000;

/// Logical canvas height in device-independent pixels.
pub const CANVAS_HEIGHT: u32 = 300;

/// A 2D size in pixel units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SizePx {
    pub width: u32,
    pub height: u32,
}

impl SizePx {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Scales a logical size to physical pixels. Never returns a zero edge.
    pub fn scaled(&self, ratio: f32) -> Self {
        let scale = |v: u32| ((v as f32 * ratio).floor() as u32).max(1);
        Self::new(scale(self.width), scale(self.height))
    }
}

/// A density-aware RGBA pixel buffer.
pub struct Canvas {
    logical: SizePx,
    pixel_ratio: f32,
    pixmap: Pixmap,
}

impl Canvas {
    /// Allocates a transparent canvas.
    pub fn new(logical: SizePx, pixel_ratio: f32) -> Result<Self> {
        validate_pixel_ratio(pixel_ratio)?;
        let physical = logical.scaled(pixel_ratio);
        Ok(Self {
            logical,
            pixel_ratio,
            pixmap: allocate(physical)?,
        })
    }

    /// Allocates a canvas with the signature's fixed logical size.
    pub fn signature(pixel_ratio: f32) -> Result<Self> {
        Self::new(SizePx::new(CANVAS_WIDTH, CANVAS_HEIGHT), pixel_ratio)
    }

    pub fn logical_size(&self) -> SizePx {
        self.logical
    }

    pub fn physical_size(&self) -> SizePx {
        SizePx::new(self.pixmap.width(), self.pixmap.height())
    }

    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    /// Adjusts the physical buffer to a new pixel ratio.
    ///
    /// The logical size never changes. The buffer is only reallocated when
    /// the physical dimensions differ; its contents are undefined afterwards
    /// either way, so callers clear before painting.
    pub fn resize(&mut self, pixel_ratio: f32) -> Result<()> {
        validate_pixel_ratio(pixel_ratio)?;
        let physical = self.logical.scaled(pixel_ratio);
        if physical != self.physical_size() {
            self.pixmap = allocate(physical)?;
        }
        self.pixel_ratio = pixel_ratio;
        Ok(())
    }

    /// Resets every pixel to transparent.
    pub fn clear(&mut self) {
        self.pixmap.fill(Color::TRANSPARENT);
    }

    /// Logical-to-physical transform.
    pub fn transform(&self) -> Transform {
        Transform::from_scale(self.pixel_ratio, self.pixel_ratio)
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn pixmap_mut(&mut self) -> &mut Pixmap {
        &mut self.pixmap
    }

    /// Reads a physical pixel, un-premultiplied.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        let p = self.pixmap.pixel(x, y)?;
        let (r, g, b, a) = unpremultiply(p.red(), p.green(), p.blue(), p.alpha());
        Some(Rgba([r, g, b, a]))
    }

    /// Reads the physical pixel under a logical coordinate.
    pub fn logical_pixel(&self, x: f32, y: f32) -> Option<Rgba<u8>> {
        if x < 0.0 || y < 0.0 {
            return None;
        }
        let px = (x * self.pixel_ratio).floor() as u32;
        let py = (y * self.pixel_ratio).floor() as u32;
        self.pixel(px, py)
    }

    /// Copies the buffer into an un-premultiplied image.
    pub fn to_rgba_image(&self) -> RgbaImage {
        pixmap_to_rgba_image(&self.pixmap)
    }

    /// Encodes the current buffer as PNG.
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(self.to_rgba_image())
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| Error::Encode(e.to_string()))?;
        Ok(bytes)
    }
}

fn allocate(size: SizePx) -> Result<Pixmap> {
    Pixmap::new(size.width, size.height).ok_or_else(|| {
        Error::Canvas(format!(
            "cannot allocate a {}x{} buffer",
            size.width, size.height
        ))
    })
}
