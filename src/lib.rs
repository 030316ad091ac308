//! firma-renderer: email signature image composition
//!
//! This crate renders a personalized email signature from structured contact
//! data: a background template, a circular profile photo and a block of
//! text whose spacing adapts to which optional fields are present.
//!
//! # Example
//!
//! ```no_run
//! use firma_renderer::{Brand, ImageSource, RendererConfig, SignatureRenderer, SignatureRequest};
//!
//! # async fn demo() -> firma_renderer::Result<()> {
//! let renderer = SignatureRenderer::new(RendererConfig::default().with_pixel_ratio(2.0))?;
//!
//! let request = SignatureRequest::new(Brand::Samoo, "Jane Doe")
//!     .with_job_title("Engineer")
//!     .with_department("R&D")
//!     .with_email("jane@example.com")
//!     .with_photo(ImageSource::parse("https://example.com/jane.jpg")?);
//!
//! // Fire-and-forget: a newer request supersedes this one.
//! let pending = renderer.request_render(request);
//! pending.await.ok();
//!
//! let export = renderer.export().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Layout
//!
//! The vertical layout is a pure function of the present fields and can be
//! used without any rendering backend:
//!
//! ```
//! use firma_renderer::{compute_layout, Field, FieldSet};
//!
//! let fields = FieldSet::NAME_ONLY.with(Field::Phone);
//! let layout = compute_layout(fields);
//!
//! assert_eq!(layout.baseline_offsets(), vec![(Field::Name, 0.0), (Field::Phone, 43.0)]);
//! assert!(layout.divider.is_some());
//! ```

mod brand;
mod canvas;
mod config;
mod error;
mod layer;
mod layout;
mod loader;
mod renderer;
mod request;

pub use brand::{hex, Brand, BrandPalette};
pub use canvas::{Canvas, SizePx, CANVAS_HEIGHT, CANVAS_WIDTH};
pub use config::RendererConfig;
pub use error::{Error, Result};
pub use layer::{
    BackgroundPaint, Compositor, CoverFit, LoadedResources, PaintContext, PaintLayer,
    PaintReport, TextLayer, TextRun, TextStyle,
};
pub use layout::{compute_layout, Divider, Field, FieldSet, Layout, PlacedLine};
pub use loader::{
    decode_data_uri, decode_image, DecodedImage, ImageLoader, LoadResult, MemoryLoader,
    ResourceLoader,
};
pub use renderer::{
    CommittedFrame, RenderOutcome, RenderTicket, SignatureExport, SignatureRenderer,
};
pub use request::{ImageSource, SignatureRequest};
