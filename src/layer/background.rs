//! Background template layer.

use resvg::tiny_skia::{Color, FilterQuality, PixmapPaint, Transform};
use tracing::debug;

use super::svg::rgba_image_to_pixmap;
use super::{PaintContext, PaintLayer};

/// How the background was painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundPaint {
    /// The template was stretched over the whole canvas. Carries its source
    /// dimensions.
    Image { width: u32, height: u32 },
    /// The template failed to load; the canvas was filled with the brand's
    /// flat fallback color.
    Fallback,
}

/// Stretches the background template to the canvas, ignoring its aspect
/// ratio.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackgroundLayer;

impl PaintLayer for BackgroundLayer {
    fn name(&self) -> &'static str {
        "background"
    }

    fn paint(&self, ctx: &mut PaintContext<'_>) {
        let template = ctx
            .resources
            .background
            .image()
            .and_then(|image| Some((image.dimensions(), rgba_image_to_pixmap(image)?)));

        let Some(((width, height), template)) = template else {
            let fill = ctx.palette.fallback_fill;
            debug!(brand = %ctx.request.brand, "painting fallback background");
            ctx.canvas
                .pixmap_mut()
                .fill(Color::from_rgba8(fill.red, fill.green, fill.blue, 255));
            ctx.set(BackgroundPaint::Fallback);
            return;
        };

        let logical = ctx.canvas.logical_size();
        let stretch = Transform::from_scale(
            logical.width as f32 / width as f32,
            logical.height as f32 / height as f32,
        )
        .post_concat(ctx.canvas.transform());

        let paint = PixmapPaint {
            quality: FilterQuality::Bicubic,
            ..PixmapPaint::default()
        };
        ctx.canvas
            .pixmap_mut()
            .draw_pixmap(0, 0, template.as_ref(), &paint, stretch, None);

        ctx.set(BackgroundPaint::Image { width, height });
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

    fn paint(brand: Brand, background: LoadResult, ratio: f32) -> (Canvas, Option<BackgroundPaint>) {
        let mut canvas = Canvas::signature(ratio).unwrap();
        let request = SignatureRequest::new(brand, "Jane");
        let resources = LoadedResources { background, photo: None };
        let layout = compute_layout(FieldSet::NAME_ONLY);
        let mut ctx = PaintContext::new(&mut canvas, &request, &resources, &layout);
        BackgroundLayer.paint(&mut ctx);
        let painted = ctx.take::<BackgroundPaint>();
        (canvas, painted)
    }

    #[test]
    fn fallback_fill_per_brand() {
        let (canvas, painted) = paint(Brand::Pentec, LoadResult::Failed, 1.0);
        assert_eq!(painted, Some(BackgroundPaint::Fallback));
        assert_eq!(canvas.pixel(500, 150), Some(Rgba([255, 255, 255, 255])));

        let (canvas, _) = paint(Brand::Samoo, LoadResult::Failed, 1.0);
        assert_eq!(canvas.pixel(999, 299), Some(Rgba([0x33, 0x33, 0x33, 255])));
    }

    #[test]
    fn template_is_stretched_over_whole_canvas() {
        let (canvas, painted) = paint(Brand::Pentec, solid(20, 20, [10, 120, 30, 255]), 2.0);

        assert_eq!(painted, Some(BackgroundPaint::Image { width: 20, height: 20 }));
        for (x, y) in [(1, 1), (1000, 300), (1998, 598)] {
            assert_color_near(canvas.pixel(x, y).unwrap(), [10, 120, 30, 255]);
        }
    }

    #[test]
    fn aspect_ratio_is_not_preserved() {
        // Left half red, right half blue: after stretching, the split lands
        // at the canvas center regardless of the source's aspect ratio.
        let mut image = RgbaImage::from_pixel(40, 40, Rgba([255, 0, 0, 255]));
        for y in 0..40 {
            for x in 20..40 {
                image.put_pixel(x, y, Rgba([0, 0, 255, 255]));
            }
        }
        let (canvas, _) = paint(Brand::Pentec, LoadResult::Loaded(Arc::new(image)), 1.0);

        assert_color_near(canvas.logical_pixel(400.0, 150.0).unwrap(), [255, 0, 0, 255]);
        assert_color_near(canvas.logical_pixel(600.0, 150.0).unwrap(), [0, 0, 255, 255]);
    }
}
