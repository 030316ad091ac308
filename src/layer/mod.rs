//! Layer infrastructure for signature composition.
//!
//! The [`Compositor`] paints a fixed stack of layers onto a [`Canvas`]:
//!
//! ```text
//! ┌────────────┐
//! │ Background │ ◄── template stretched to the canvas, or brand fill
//! └─────┬──────┘
//!       ▼
//! ┌────────────┐
//! │   Photo    │ ◄── cover-fit, circular clip, accent ring
//! └─────┬──────┘
//!       ▼
//! ┌────────────┐
//! │    Text    │ ◄── name, title, department, divider, contacts
//! └────────────┘
//! ```
//!
//! Each layer implements [`PaintLayer`]. Layers record what they drew as
//! typed properties on the [`PaintContext`]; the compositor collects them
//! into a [`PaintReport`] once every layer has run.

pub mod background;
pub mod photo;
pub mod svg;
pub mod text;

pub use background::{BackgroundLayer, BackgroundPaint};
pub use photo::{CoverFit, PhotoLayer};
pub use text::{TextLayer, TextRun, TextStyle};

use std::any::{Any, TypeId};
use std::collections::HashMap;

use tracing::trace;

use crate::brand::BrandPalette;
use crate::canvas::Canvas;
use crate::layout::Layout;
use crate::loader::LoadResult;
use crate::request::SignatureRequest;

// ============================================================================
// Resources
// ============================================================================

/// The images loaded for one render.
#[derive(Debug, Clone)]
pub struct LoadedResources {
    pub background: LoadResult,
    /// `None` when the request has no photo.
    pub photo: Option<LoadResult>,
}

// ============================================================================
// Paint Context
// ============================================================================

/// Context that flows through the layer stack.
///
/// Layers read the request, palette, resources and layout, paint onto the
/// canvas, and record what they did as typed properties.
pub struct PaintContext<'a> {
    pub canvas: &'a mut Canvas,
    pub request: &'a SignatureRequest,
    pub palette: BrandPalette,
    pub resources: &'a LoadedResources,
    pub layout: &'a Layout,

    /// Typed property bag for inter-layer communication and reporting.
    properties: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl<'a> PaintContext<'a> {
    pub fn new(
        canvas: &'a mut Canvas,
        request: &'a SignatureRequest,
        resources: &'a LoadedResources,
        layout: &'a Layout,
    ) -> Self {
        Self {
            canvas,
            request,
            palette: request.brand.palette(),
            resources,
            layout,
            properties: HashMap::new(),
        }
    }

    /// Sets a typed property that downstream layers can read.
    pub fn set<T: Any + Send + Sync>(&mut self, value: T) {
        self.properties.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Gets a typed property set by an upstream layer.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.properties
            .get(&TypeId::of::<T>())
            .and_then(|b| b.downcast_ref())
    }

    /// Removes and returns a typed property.
    pub fn take<T: Any + Send + Sync>(&mut self) -> Option<T> {
        self.properties
            .remove(&TypeId::of::<T>())
            .and_then(|b| b.downcast().ok())
            .map(|b| *b)
    }

    pub fn has<T: Any + Send + Sync>(&self) -> bool {
        self.properties.contains_key(&TypeId::of::<T>())
    }
}

// ============================================================================
// Layer Trait
// ============================================================================

/// A self-contained step of the composition.
///
/// Painting is best-effort: a layer that cannot draw (missing photo, no
/// usable font) leaves the canvas as it found it instead of failing.
pub trait PaintLayer: Send + Sync {
    fn name(&self) -> &'static str;

    fn paint(&self, ctx: &mut PaintContext<'_>);
}

// ============================================================================
// Compositor
// ============================================================================

/// What a composition drew.
#[derive(Debug, Clone, PartialEq)]
pub struct PaintReport {
    pub background: BackgroundPaint,
    /// Where the photo was drawn, if it was.
    pub photo: Option<CoverFit>,
    pub text_runs: Vec<TextRun>,
}

/// Paints the full layer stack onto a canvas.
pub struct Compositor {
    layers: Vec<Box<dyn PaintLayer>>,
}

impl Compositor {
    pub fn new(text: TextLayer) -> Self {
        Self {
            layers: vec![
                Box::new(BackgroundLayer),
                Box::new(PhotoLayer),
                Box::new(text),
            ],
        }
    }

    /// Clears the canvas and paints every layer in order. Never fails.
    pub fn paint(
        &self,
        canvas: &mut Canvas,
        request: &SignatureRequest,
        resources: &LoadedResources,
        layout: &Layout,
    ) -> PaintReport {
        canvas.clear();

        let mut ctx = PaintContext::new(canvas, request, resources, layout);
        for layer in &self.layers {
            trace!(layer = layer.name(), "painting layer");
            layer.paint(&mut ctx);
        }

        PaintReport {
            background: ctx
                .take::<BackgroundPaint>()
                .unwrap_or(BackgroundPaint::Fallback),
            photo: ctx.take::<CoverFit>(),
            text_runs: ctx.take::<Vec<TextRun>>().unwrap_or_default(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
