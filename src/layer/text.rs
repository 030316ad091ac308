//! Text and contact divider layer.
//!
//! The divider and every text run are emitted as small SVG documents and
//! rendered through usvg, so font selection and shaping come from the
//! configured font database. A run that fails to render is dropped on its
//! own and the rest of the block still paints.

use std::fmt::Write as _;
use std::sync::Arc;

use palette::{Srgb, Srgba};
use resvg::usvg::fontdb;
use tracing::{debug, warn};

use super::svg::{escape_xml, paint_attr_alpha, render_svg_onto};
use super::{PaintContext, PaintLayer};
use crate::brand::BrandPalette;
use crate::canvas::{CANVAS_HEIGHT, CANVAS_WIDTH};
use crate::layout::{Divider, Field, Layout};
use crate::request::SignatureRequest;

/// Left edge of the text column, in logical pixels.
pub const TEXT_COLUMN_X: f32 = 300.0;
/// Contact lines sit this far right of the text column.
pub const CONTACT_INDENT: f32 = 16.0;
pub const FONT_FAMILY: &str = "Poppins, sans-serif";
pub const DIVIDER_WIDTH: f32 = 1.2;

/// Font and color of a text run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub size: f32,
    pub weight: u16,
    pub color: Srgba<u8>,
}

impl TextStyle {
    /// The style a brand uses for `field`.
    pub fn for_field(field: Field, palette: &BrandPalette) -> Self {
        let main = opaque(palette.text_main);
        let secondary = palette.text_secondary;
        match field {
            Field::Name => Self { size: 36.0, weight: 600, color: main },
            Field::JobTitle => Self { size: 24.0, weight: 500, color: main },
            Field::Department => Self { size: 17.0, weight: 400, color: secondary },
            Field::Phone | Field::Email | Field::Website => {
                Self { size: 15.0, weight: 400, color: secondary }
            }
        }
    }
}

fn opaque(color: Srgb<u8>) -> Srgba<u8> {
    Srgba::new(color.red, color.green, color.blue, 255)
}

/// A line of text as drawn, in logical pixels. `y` is the baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub field: Field,
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub style: TextStyle,
}

/// Positions a run for every line in the layout.
pub fn text_runs(request: &SignatureRequest, palette: &BrandPalette, layout: &Layout) -> Vec<TextRun> {
    layout
        .lines
        .iter()
        .filter_map(|line| {
            let text = line.field.text(request)?;
            let x = if line.field.is_contact() {
                TEXT_COLUMN_X + CONTACT_INDENT
            } else {
                TEXT_COLUMN_X
            };
            Some(TextRun {
                field: line.field,
                text: text.to_string(),
                x,
                y: line.y,
                style: TextStyle::for_field(line.field, palette),
            })
        })
        .collect()
}

fn open_document() -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = CANVAS_WIDTH,
        h = CANVAS_HEIGHT,
    )
}

/// Builds the SVG document for the contact divider.
pub fn divider_svg(divider: Divider, palette: &BrandPalette) -> String {
    let mut svg = open_document();
    let _ = write!(
        svg,
        r#"<line x1="{x}" y1="{}" x2="{x}" y2="{}" {} stroke-width="{DIVIDER_WIDTH}"/>"#,
        divider.top,
        divider.bottom,
        paint_attr_alpha("stroke", palette.text_secondary),
        x = TEXT_COLUMN_X,
    );
    svg.push_str("</svg>");
    svg
}

/// Builds the SVG document for a single text run.
pub fn run_svg(run: &TextRun) -> String {
    let mut svg = open_document();
    let _ = write!(
        svg,
        r#"<text x="{}" y="{}" font-family="{FONT_FAMILY}" font-size="{}" font-weight="{}" {} xml:space="preserve">{}</text>"#,
        run.x,
        run.y,
        run.style.size,
        run.style.weight,
        paint_attr_alpha("fill", run.style.color),
        escape_xml(&run.text),
    );
    svg.push_str("</svg>");
    svg
}

/// Draws the text block and the contact divider.
pub struct TextLayer {
    fonts: Arc<fontdb::Database>,
}

impl TextLayer {
    pub fn new(fonts: Arc<fontdb::Database>) -> Self {
        Self { fonts }
    }
}

impl PaintLayer for TextLayer {
    fn name(&self) -> &'static str {
        "text"
    }

    fn paint(&self, ctx: &mut PaintContext<'_>) {
        let transform = ctx.canvas.transform();

        if let Some(divider) = ctx.layout.divider {
            let svg = divider_svg(divider, &ctx.palette);
            if render_svg_onto(ctx.canvas.pixmap_mut(), &svg, transform, &self.fonts).is_none() {
                warn!("contact divider not painted");
            }
        }

        let mut painted = Vec::new();
        for run in text_runs(ctx.request, &ctx.palette, ctx.layout) {
            let svg = run_svg(&run);
            if render_svg_onto(ctx.canvas.pixmap_mut(), &svg, transform, &self.fonts).is_some() {
                painted.push(run);
            } else {
                warn!(field = ?run.field, "text run not painted");
            }
        }

        debug!(runs = painted.len(), "text painted");
        ctx.set(painted);
    }
}
