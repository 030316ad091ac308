//! Error types for the signature renderer.

use thiserror::Error;

/// Result type alias for renderer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building, rendering or exporting a signature.
///
/// Image load failures never reach callers of the render pipeline: the
/// loader turns them into [`LoadResult::Failed`](crate::LoadResult::Failed).
/// The `Fetch` and `Decode` variants only surface from
/// [`ImageLoader::fetch`](crate::ImageLoader::fetch) and friends.
#[derive(Debug, Error)]
pub enum Error {
    /// The request is missing required data.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// An image reference could not be interpreted.
    #[error("Invalid image source: {0}")]
    InvalidSource(String),

    /// Fetching image bytes failed.
    #[error("Failed to fetch {source_ref}: {reason}")]
    Fetch { source_ref: String, reason: String },

    /// Image bytes could not be decoded.
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// The pixel buffer could not be allocated.
    #[error("Canvas error: {0}")]
    Canvas(String),

    /// PNG encoding failed during export.
    #[error("Failed to encode PNG: {0}")]
    Encode(String),

    /// Export was attempted while a render is still in flight.
    #[error("A render is in progress")]
    RenderInProgress,

    /// Export was attempted before any render committed.
    #[error("Nothing has been rendered yet")]
    NothingRendered,

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
