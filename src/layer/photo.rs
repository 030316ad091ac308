//! Circular profile photo layer.
//!
//! The photo is cover-fitted into a fixed circle: scaled until its shorter
//! side matches the diameter, centered on the longer side, and clipped to the
//! circle. An accent-colored ring is then stroked on the circle's boundary.
//! Nothing is drawn, ring included, when the photo is absent or failed.

use resvg::tiny_skia::{
    FillRule, FilterQuality, Mask, Paint, PathBuilder, PixmapPaint, Stroke, Transform,
};
use tracing::debug;

use super::svg::rgba_image_to_pixmap;
use super::{PaintContext, PaintLayer};

/// Center of the photo circle, in logical pixels.
pub const PHOTO_CENTER_X: f32 = 165.0;
pub const PHOTO_CENTER_Y: f32 = 185.0;
pub const PHOTO_DIAMETER: f32 = 150.0;
pub const RING_WIDTH: f32 = 6.0;

/// Destination rectangle of a cover-fitted photo, in logical pixels.
///
/// Only the part inside the circle is visible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverFit {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl CoverFit {
    /// Fits a `src_width` × `src_height` image over a circle of `diameter`
    /// centered at (`cx`, `cy`).
    pub fn compute(src_width: u32, src_height: u32, cx: f32, cy: f32, diameter: f32) -> Self {
        let shorter = src_width.min(src_height).max(1) as f32;
        let scale = diameter / shorter;
        let width = src_width as f32 * scale;
        let height = src_height as f32 * scale;
        Self {
            x: cx - width / 2.0,
            y: cy - height / 2.0,
            width,
            height,
        }
    }

    /// Maps source pixel space onto the destination rectangle.
    fn transform(&self, src_width: u32, src_height: u32) -> Transform {
        Transform::from_row(
            self.width / src_width as f32,
            0.0,
            0.0,
            self.height / src_height as f32,
            self.x,
            self.y,
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PhotoLayer;

impl PaintLayer for PhotoLayer {
    fn name(&self) -> &'static str {
        "photo"
    }

    fn paint(&self, ctx: &mut PaintContext<'_>) {
        let resources = ctx.resources;
        let Some(photo) = resources.photo.as_ref().and_then(|p| p.image()) else {
            return;
        };
        let Some(source) = rgba_image_to_pixmap(photo) else {
            return;
        };
        let Some(circle) =
            PathBuilder::from_circle(PHOTO_CENTER_X, PHOTO_CENTER_Y, PHOTO_DIAMETER / 2.0)
        else {
            return;
        };

        let (width, height) = photo.dimensions();
        let fit = CoverFit::compute(width, height, PHOTO_CENTER_X, PHOTO_CENTER_Y, PHOTO_DIAMETER);
        let to_canvas = ctx.canvas.transform();

        let physical = ctx.canvas.physical_size();
        let Some(mut clip) = Mask::new(physical.width, physical.height) else {
            return;
        };
        clip.fill_path(&circle, FillRule::Winding, true, to_canvas);

        let paint = PixmapPaint {
            quality: FilterQuality::Bicubic,
            ..PixmapPaint::default()
        };
        ctx.canvas.pixmap_mut().draw_pixmap(
            0,
            0,
            source.as_ref(),
            &paint,
            fit.transform(width, height).post_concat(to_canvas),
            Some(&clip),
        );

        let accent = ctx.palette.accent;
        let mut ring = Paint::default();
        ring.set_color_rgba8(accent.red, accent.green, accent.blue, 255);
        ring.anti_alias = true;
        let stroke = Stroke {
            width: RING_WIDTH,
            ..Stroke::default()
        };
        ctx.canvas
            .pixmap_mut()
            .stroke_path(&circle, &ring, &stroke, to_canvas, None);

        debug!(width, height, "photo painted");
        ctx.set(fit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brand::Brand;
    use crate::canvas::Canvas;
    use crate::layer::tests::{assert_color_near, solid};
    use crate::layer::LoadedResources;
    use crate::layout::{compute_layout, FieldSet};
    use crate::loader::LoadResult;
    use crate::request::SignatureRequest;
    use image::{Rgba, RgbaImage};
    use std::sync::Arc;

    fn paint(brand: Brand, photo: Option<LoadResult>, ratio: f32) -> (Canvas, Option<CoverFit>) {
        let mut canvas = Canvas::signature(ratio).unwrap();
        let request = SignatureRequest::new(brand, "Jane");
        let resources = LoadedResources {
            background: LoadResult::Failed,
            photo,
        };
        let layout = compute_layout(FieldSet::NAME_ONLY);
        let mut ctx = PaintContext::new(&mut canvas, &request, &resources, &layout);
        PhotoLayer.paint(&mut ctx);
        let fit = ctx.take::<CoverFit>();
        (canvas, fit)
    }

    fn assert_covers_circle(fit: CoverFit) {
        assert!(fit.width >= PHOTO_DIAMETER && fit.height >= PHOTO_DIAMETER);
        assert!((fit.x + fit.width / 2.0 - PHOTO_CENTER_X).abs() < 1e-3);
        assert!((fit.y + fit.height / 2.0 - PHOTO_CENTER_Y).abs() < 1e-3);
    }

    #[test]
    fn cover_fit_landscape() {
        let fit = CoverFit::compute(300, 150, PHOTO_CENTER_X, PHOTO_CENTER_Y, PHOTO_DIAMETER);
        assert_eq!(
            fit,
            CoverFit {
                x: 15.0,
                y: 110.0,
                width: 300.0,
                height: 150.0
            }
        );
        assert_covers_circle(fit);
    }

    #[test]
    fn cover_fit_portrait_preserves_aspect() {
        let fit = CoverFit::compute(100, 200, PHOTO_CENTER_X, PHOTO_CENTER_Y, PHOTO_DIAMETER);
        assert_eq!(fit.width, 150.0);
        assert_eq!(fit.height, 300.0);
        assert!((fit.width / fit.height - 0.5).abs() < 1e-6);
        assert_covers_circle(fit);
    }

    #[test]
    fn cover_fit_small_square_is_upscaled() {
        let fit = CoverFit::compute(10, 10, PHOTO_CENTER_X, PHOTO_CENTER_Y, PHOTO_DIAMETER);
        assert_eq!(fit.width, PHOTO_DIAMETER);
        assert_eq!(fit.x, 90.0);
        assert_covers_circle(fit);
    }

    #[test]
    fn wide_photo_is_centered_and_clipped() {
        // Left half red, right half blue.
        let mut image = RgbaImage::from_pixel(300, 150, Rgba([255, 0, 0, 255]));
        for y in 0..150 {
            for x in 150..300 {
                image.put_pixel(x, y, Rgba([0, 0, 255, 255]));
            }
        }
        let (canvas, fit) = paint(Brand::Pentec, Some(LoadResult::Loaded(Arc::new(image))), 1.0);

        assert!(fit.is_some());
        assert_color_near(canvas.logical_pixel(130.0, 185.0).unwrap(), [255, 0, 0, 255]);
        assert_color_near(canvas.logical_pixel(200.0, 185.0).unwrap(), [0, 0, 255, 255]);

        // Inside the fitted rectangle but outside the circle.
        assert_eq!(canvas.logical_pixel(100.0, 120.0).unwrap().0[3], 0);
    }

    #[test]
    fn ring_uses_brand_accent() {
        let (canvas, _) = paint(Brand::Samoo, Some(solid(50, 50, [0, 0, 0, 255])), 2.0);

        // Top of the circle boundary.
        assert_color_near(canvas.logical_pixel(165.0, 110.0).unwrap(), [0xc1, 0x53, 0x84, 255]);
        // Beyond the ring's outer edge.
        assert_eq!(canvas.logical_pixel(165.0, 104.0).unwrap().0[3], 0);
    }

    #[test]
    fn failed_or_absent_photo_draws_nothing() {
        for photo in [None, Some(LoadResult::Failed)] {
            let (canvas, fit) = paint(Brand::Pentec, photo, 1.0);
            assert_eq!(fit, None);
            assert_eq!(canvas.logical_pixel(165.0, 185.0).unwrap().0[3], 0);
            assert_eq!(canvas.logical_pixel(165.0, 110.0).unwrap().0[3], 0);
        }
    }
}
