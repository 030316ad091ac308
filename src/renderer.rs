//! Render orchestration with last-request-wins cancellation.

use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::canvas::Canvas;
use crate::config::{validate_pixel_ratio, RendererConfig};
use crate::error::{Error, Result};
use crate::layer::svg::load_font_database;
use crate::layer::{Compositor, LoadedResources, PaintReport, TextLayer};
use crate::layout::{compute_layout, FieldSet};
use crate::loader::{ImageLoader, ResourceLoader};
use crate::request::SignatureRequest;

// ============================================================================
// Tickets
// ============================================================================

/// Identifies one render invocation. Later invocations get larger tickets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RenderTicket(u64);

impl RenderTicket {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RenderTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a render invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The render committed its frame to the canvas.
    Painted(RenderTicket),
    /// A newer render superseded this one before it touched the canvas.
    Aborted(RenderTicket),
}

impl RenderOutcome {
    pub fn ticket(self) -> RenderTicket {
        match self {
            Self::Painted(ticket) | Self::Aborted(ticket) => ticket,
        }
    }

    pub fn is_painted(self) -> bool {
        matches!(self, Self::Painted(_))
    }
}

/// The frame currently on the canvas.
#[derive(Debug, Clone)]
pub struct CommittedFrame {
    pub ticket: RenderTicket,
    pub request: SignatureRequest,
    pub report: PaintReport,
}

/// An exported signature image.
#[derive(Debug, Clone)]
pub struct SignatureExport {
    /// Suggested file name, e.g. `firma-pentec-jane-doe.png`.
    pub file_name: String,
    pub png: Vec<u8>,
    pub ticket: RenderTicket,
}

// ============================================================================
// SignatureRenderer
// ============================================================================

struct Surface {
    canvas: Canvas,
    committed: Option<CommittedFrame>,
}

struct Inner {
    loader: Arc<dyn ImageLoader>,
    config: RendererConfig,
    compositor: Compositor,

    latest_ticket: AtomicU64,
    /// `f32` bits of the pixel ratio the next render resizes to.
    pixel_ratio: AtomicU32,

    rendering: watch::Sender<bool>,
    completed: watch::Sender<Option<RenderTicket>>,

    surface: AsyncMutex<Surface>,
    last_requested: Mutex<Option<SignatureRequest>>,
}

/// Renders signature requests onto a shared canvas.
///
/// Every call to [`request_render`](Self::request_render) issues a new
/// [`RenderTicket`] and marks the renderer as rendering. Renders run
/// concurrently, but only the holder of the latest ticket may paint: after
/// each suspension point a render compares its ticket with the latest one
/// and quietly abandons if it was superseded. Rapid successive requests
/// therefore coalesce into a single committed frame, that of the last
/// request.
///
/// The renderer is cheap to clone; clones share the canvas and the ticket
/// counter.
///
/// # Example
///
/// ```no_run
/// use firma_renderer::{Brand, RendererConfig, SignatureRenderer, SignatureRequest};
///
/// # async fn demo() -> firma_renderer::Result<()> {
/// let renderer = SignatureRenderer::new(RendererConfig::default())?;
///
/// let request = SignatureRequest::new(Brand::Pentec, "Jane Doe")
///     .with_job_title("Engineer")
///     .with_phone("+34 600 000 000");
/// renderer.render(request).await;
///
/// let export = renderer.export().await?;
/// std::fs::write(&export.file_name, &export.png)?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SignatureRenderer {
    inner: Arc<Inner>,
}

impl SignatureRenderer {
    /// Creates a renderer that loads images over HTTP, from data URIs and
    /// from the local filesystem.
    pub fn new(config: RendererConfig) -> Result<Self> {
        let loader = ResourceLoader::new(&config)?;
        Self::with_loader(loader, config)
    }

    /// Creates a renderer with a custom image loader.
    pub fn with_loader(loader: impl ImageLoader + 'static, config: RendererConfig) -> Result<Self> {
        config.validate()?;
        let canvas = Canvas::signature(config.pixel_ratio)?;
        let fonts = load_font_database(&config.font_dirs);

        let (rendering, _) = watch::channel(false);
        let (completed, _) = watch::channel(None);

        Ok(Self {
            inner: Arc::new(Inner {
                loader: Arc::new(loader),
                compositor: Compositor::new(TextLayer::new(fonts)),
                latest_ticket: AtomicU64::new(0),
                pixel_ratio: AtomicU32::new(config.pixel_ratio.to_bits()),
                rendering,
                completed,
                surface: AsyncMutex::new(Surface {
                    canvas,
                    committed: None,
                }),
                last_requested: Mutex::new(None),
                config,
            }),
        })
    }

    pub fn config(&self) -> &RendererConfig {
        &self.inner.config
    }

    /// Starts rendering `request` in the background.
    ///
    /// The ticket is issued and the rendering flag raised before this
    /// returns. Must be called from within a tokio runtime.
    pub fn request_render(&self, request: SignatureRequest) -> JoinHandle<RenderOutcome> {
        let ticket = self.inner.begin(&request);
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.run(ticket, request).await })
    }

    /// Renders `request` on the current task.
    ///
    /// Equivalent to awaiting [`request_render`](Self::request_render).
    pub async fn render(&self, request: SignatureRequest) -> RenderOutcome {
        let ticket = self.inner.begin(&request);
        self.inner.run(ticket, request).await
    }

    /// Re-renders the most recently requested signature.
    ///
    /// Returns `None` if nothing has been requested yet.
    pub fn refresh(&self) -> Option<JoinHandle<RenderOutcome>> {
        let request = self.inner.last_requested().clone()?;
        Some(self.request_render(request))
    }

    /// Changes the pixel ratio. Takes effect at the next render.
    pub fn set_pixel_ratio(&self, ratio: f32) -> Result<()> {
        validate_pixel_ratio(ratio)?;
        self.inner
            .pixel_ratio
            .store(ratio.to_bits(), Ordering::SeqCst);
        Ok(())
    }

    pub fn pixel_ratio(&self) -> f32 {
        self.inner.pixel_ratio()
    }

    /// Whether a render is outstanding.
    pub fn is_rendering(&self) -> bool {
        *self.inner.rendering.borrow()
    }

    /// The most recently issued ticket, if any.
    pub fn latest_ticket(&self) -> Option<RenderTicket> {
        match self.inner.latest_ticket.load(Ordering::SeqCst) {
            0 => None,
            n => Some(RenderTicket(n)),
        }
    }

    /// Watches the rendering flag.
    pub fn subscribe_rendering(&self) -> watch::Receiver<bool> {
        self.inner.rendering.subscribe()
    }

    /// Watches the ticket of the last committed frame.
    pub fn subscribe_completed(&self) -> watch::Receiver<Option<RenderTicket>> {
        self.inner.completed.subscribe()
    }

    /// The frame currently on the canvas.
    pub async fn last_frame(&self) -> Option<CommittedFrame> {
        self.inner.surface.lock().await.committed.clone()
    }

    /// Encodes the canvas as PNG.
    ///
    /// Refused while a render is outstanding, so a superseded or partially
    /// composed frame is never exported.
    pub async fn export(&self) -> Result<SignatureExport> {
        if self.is_rendering() {
            return Err(Error::RenderInProgress);
        }

        let surface = self.inner.surface.lock().await;
        let frame = surface.committed.as_ref().ok_or(Error::NothingRendered)?;
        let png = surface.canvas.encode_png()?;

        Ok(SignatureExport {
            file_name: frame.request.export_file_name(),
            png,
            ticket: frame.ticket,
        })
    }
}

impl Inner {
    fn pixel_ratio(&self) -> f32 {
        f32::from_bits(self.pixel_ratio.load(Ordering::SeqCst))
    }

    fn last_requested(&self) -> std::sync::MutexGuard<'_, Option<SignatureRequest>> {
        self.last_requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, ticket: RenderTicket) -> bool {
        self.latest_ticket.load(Ordering::SeqCst) == ticket.0
    }

    /// Issues a ticket, records the request for refresh and raises the
    /// rendering flag in one step.
    fn begin(&self, request: &SignatureRequest) -> RenderTicket {
        let mut issued = 0;
        self.rendering.send_modify(|rendering| {
            issued = self.latest_ticket.fetch_add(1, Ordering::SeqCst) + 1;
            *self.last_requested() = Some(request.clone());
            *rendering = true;
        });
        let ticket = RenderTicket(issued);
        debug!(%ticket, brand = %request.brand, "render requested");
        ticket
    }

    /// Lowers the rendering flag unless a newer ticket was issued.
    fn finish(&self, ticket: RenderTicket) -> bool {
        self.rendering.send_if_modified(|rendering| {
            if self.is_current(ticket) && *rendering {
                *rendering = false;
                true
            } else {
                false
            }
        })
    }

    fn abort(&self, ticket: RenderTicket, stage: &'static str) -> RenderOutcome {
        debug!(%ticket, stage, "render superseded");
        RenderOutcome::Aborted(ticket)
    }

    async fn run(&self, ticket: RenderTicket, request: SignatureRequest) -> RenderOutcome {
        let background_source = request
            .background_override
            .clone()
            .unwrap_or_else(|| self.config.default_background(request.brand));

        let photo = async {
            match &request.photo_source {
                Some(source) => Some(self.loader.load(source).await),
                None => None,
            }
        };
        let (background, photo) = tokio::join!(self.loader.load(&background_source), photo);

        if !self.is_current(ticket) {
            return self.abort(ticket, "load");
        }

        let mut surface = self.surface.lock().await;
        if !self.is_current(ticket) {
            return self.abort(ticket, "surface");
        }

        let ratio = self.pixel_ratio();
        if let Err(err) = surface.canvas.resize(ratio) {
            warn!(%ticket, ratio, error = %err, "keeping previous canvas size");
        }

        let layout = compute_layout(FieldSet::from_request(&request));
        let resources = LoadedResources { background, photo };
        let report = self
            .compositor
            .paint(&mut surface.canvas, &request, &resources, &layout);

        info!(
            %ticket,
            brand = %request.brand,
            background_loaded = resources.background.succeeded(),
            photo = report.photo.is_some(),
            lines = report.text_runs.len(),
            "signature painted"
        );

        surface.committed = Some(CommittedFrame {
            ticket,
            request,
            report,
        });
        self.completed.send_replace(Some(ticket));
        self.finish(ticket);

        RenderOutcome::Painted(ticket)
    }
}

// ============================================================================
// Tests
// ============================================================================
