//! SVG rendering and pixel conversion utilities using resvg/usvg.
//!
//! Text runs are laid out by usvg from a generated SVG document, so glyph
//! shaping, font fallback and anti-aliasing all come from resvg. This module
//! also holds the conversions between `image` buffers (straight alpha) and
//! tiny-skia pixmaps (premultiplied alpha).

use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use image::{Rgba, RgbaImage};
use palette::{Srgb, Srgba};
use resvg::tiny_skia::{IntSize, Pixmap, Transform};
use resvg::usvg::{fontdb, Options, Tree};
use tracing::{debug, warn};

use crate::brand::hex;

// ============================================================================
// Fonts
// ============================================================================

static SYSTEM_FONTS: OnceLock<Arc<fontdb::Database>> = OnceLock::new();

fn system_fonts() -> &'static Arc<fontdb::Database> {
    SYSTEM_FONTS.get_or_init(|| {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        debug!(faces = db.len(), "loaded system fonts");
        Arc::new(db)
    })
}

/// Returns a font database with the system fonts plus every font found in
/// `extra_dirs`.
///
/// The system-only database is loaded once per process and shared.
pub fn load_font_database(extra_dirs: &[PathBuf]) -> Arc<fontdb::Database> {
    if extra_dirs.is_empty() {
        return Arc::clone(system_fonts());
    }

    let mut db = system_fonts().as_ref().clone();
    for dir in extra_dirs {
        if !dir.is_dir() {
            warn!(dir = %dir.display(), "font directory not found");
            continue;
        }
        db.load_fonts_dir(dir);
    }
    debug!(faces = db.len(), "loaded fonts");
    Arc::new(db)
}

// ============================================================================
// SVG Rendering
// ============================================================================

/// Renders an SVG document onto an existing pixmap (source-over).
///
/// Returns `None` if the SVG cannot be parsed.
pub fn render_svg_onto(
    pixmap: &mut Pixmap,
    svg_data: &str,
    transform: Transform,
    fonts: &Arc<fontdb::Database>,
) -> Option<()> {
    let opts = Options {
        fontdb: Arc::clone(fonts),
        ..Options::default()
    };

    let tree = match Tree::from_str(svg_data, &opts) {
        Ok(tree) => tree,
        Err(err) => {
            warn!(error = %err, "failed to parse generated SVG");
            return None;
        }
    };

    resvg::render(&tree, transform, &mut pixmap.as_mut());
    Some(())
}

/// Escapes text for use inside SVG character data or attribute values.
///
/// Characters XML 1.0 does not allow (most C0 controls, `U+FFFE`, `U+FFFF`)
/// are dropped, since a single one makes the whole document unparsable.
pub fn escape_xml(text: &str) -> Cow<'_, str> {
    let needs_work = text
        .chars()
        .any(|c| matches!(c, '&' | '<' | '>' | '"' | '\'') || !is_xml_char(c));
    if !needs_work {
        return Cow::Borrowed(text);
    }

    let mut escaped = String::with_capacity(text.len() + 8);
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c if !is_xml_char(c) => {}
            c => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

fn is_xml_char(ch: char) -> bool {
    matches!(
        ch,
        '\t' | '\n' | '\r'
            | '\u{20}'..='\u{D7FF}'
            | '\u{E000}'..='\u{FFFD}'
            | '\u{10000}'..='\u{10FFFF}'
    )
}

/// SVG paint attributes for an opaque color, e.g. `fill="#1e64a5"`.
pub fn paint_attr(attr: &str, color: Srgb<u8>) -> String {
    format!(r#"{attr}="{}""#, hex(color))
}

/// SVG paint attributes for a translucent color, adding `{attr}-opacity`.
pub fn paint_attr_alpha(attr: &str, color: Srgba<u8>) -> String {
    let opacity = color.alpha as f32 / 255.0;
    format!(
        r#"{} {attr}-opacity="{:.3}""#,
        paint_attr(attr, color.color),
        opacity
    )
}

// ============================================================================
// Pixel Conversion
// ============================================================================

/// Converts an `image` buffer into a premultiplied tiny-skia pixmap.
///
/// Returns `None` for zero-sized images.
pub fn rgba_image_to_pixmap(image: &RgbaImage) -> Option<Pixmap> {
    let size = IntSize::from_wh(image.width(), image.height())?;
    let mut data = Vec::with_capacity(image.as_raw().len());
    for pixel in image.pixels() {
        let [r, g, b, a] = premultiply(pixel.0);
        data.extend_from_slice(&[r, g, b, a]);
    }
    Pixmap::from_vec(data, size)
}

/// Converts a tiny_skia Pixmap to an image::RgbaImage.
pub fn pixmap_to_rgba_image(pixmap: &Pixmap) -> RgbaImage {
    let width = pixmap.width();
    let height = pixmap.height();
    let mut img = RgbaImage::new(width, height);

    for (i, pixel) in pixmap.pixels().iter().enumerate() {
        let x = i as u32 % width;
        let y = i as u32 / width;
        // tiny_skia uses premultiplied alpha, we need to unpremultiply
        let (r, g, b, a) = unpremultiply(pixel.red(), pixel.green(), pixel.blue(), pixel.alpha());
        img.put_pixel(x, y, Rgba([r, g, b, a]));
    }

    img
}

fn premultiply([r, g, b, a]: [u8; 4]) -> [u8; 4] {
    if a == 255 {
        return [r, g, b, a];
    }
    let mul = |c: u8| ((c as u16 * a as u16 + 127) / 255) as u8;
    [mul(r), mul(g), mul(b), a]
}

/// Unpremultiplies a premultiplied alpha pixel.
pub fn unpremultiply(r: u8, g: u8, b: u8, a: u8) -> (u8, u8, u8, u8) {
    if a == 0 {
        (0, 0, 0, 0)
    } else {
        let a_f = a as f32 / 255.0;
        (
            (r as f32 / a_f).round().min(255.0) as u8,
            (g as f32 / a_f).round().min(255.0) as u8,
            (b as f32 / a_f).round().min(255.0) as u8,
            a,
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"><rect x="0" y="0" width="5" height="10" fill="#ff0000"/></svg>"##;

    #[test]
    fn renders_onto_existing_content() {
        let mut pixmap = Pixmap::new(20, 20).unwrap();
        pixmap.fill(resvg::tiny_skia::Color::from_rgba8(0, 0, 255, 255));

        let fonts = Arc::new(fontdb::Database::new());
        render_svg_onto(&mut pixmap, SIMPLE_SVG, Transform::from_scale(2.0, 2.0), &fonts).unwrap();

        let img = pixmap_to_rgba_image(&pixmap);
        assert_eq!(img.get_pixel(2, 10).0, [255, 0, 0, 255]);
        assert_eq!(img.get_pixel(15, 10).0, [0, 0, 255, 255]);
    }

    #[test]
    fn invalid_svg_returns_none() {
        let mut pixmap = Pixmap::new(4, 4).unwrap();
        let fonts = Arc::new(fontdb::Database::new());
        assert!(render_svg_onto(&mut pixmap, "<not-svg", Transform::identity(), &fonts).is_none());
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_xml("R&D <lab>"), "R&amp;D &lt;lab&gt;");
        assert!(matches!(escape_xml("plain"), Cow::Borrowed("plain")));
    }

    #[test]
    fn drops_characters_xml_forbids() {
        assert_eq!(escape_xml("jane@example.com\u{0B}"), "jane@example.com");
        assert_eq!(escape_xml("a\u{0}b\u{1F}c\u{FFFF}"), "abc");
        assert!(matches!(escape_xml("tab\there"), Cow::Borrowed(_)));
    }

    #[test]
    fn control_characters_do_not_break_the_document() {
        let mut pixmap = Pixmap::new(10, 10).unwrap();
        let fonts = Arc::new(fontdb::Database::new());
        let svg = format!(
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"><text x="0" y="5">{}</text><rect x="0" y="0" width="5" height="10" fill="#ff0000"/></svg>"##,
            escape_xml("bad\u{0B}text")
        );

        render_svg_onto(&mut pixmap, &svg, Transform::identity(), &fonts).unwrap();
        assert_eq!(pixmap_to_rgba_image(&pixmap).get_pixel(2, 5).0, [255, 0, 0, 255]);
    }

    #[test]
    fn paint_attributes() {
        assert_eq!(paint_attr("fill", Srgb::new(0x1e, 0x64, 0xa5)), r##"fill="#1e64a5""##);
        assert_eq!(
            paint_attr_alpha("stroke", Srgba::new(85, 85, 85, 204)),
            r##"stroke="#555555" stroke-opacity="0.800""##
        );
    }

    #[test]
    fn pixmap_round_trip_preserves_translucent_pixels() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([200, 100, 50, 255]));
        img.put_pixel(1, 0, Rgba([0, 0, 0, 0]));

        let pixmap = rgba_image_to_pixmap(&img).unwrap();
        assert_eq!(pixmap_to_rgba_image(&pixmap), img);
        assert!(rgba_image_to_pixmap(&RgbaImage::new(0, 0)).is_none());
    }
}
