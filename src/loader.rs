//! Asynchronous image loading.
//!
//! Loading is split in two: [`ImageLoader::fetch`] produces raw bytes and
//! may fail, while [`ImageLoader::load`] decodes them and never fails. A
//! failed load is reported as [`LoadResult::Failed`] so the compositor can
//! fall back to a flat fill (background) or skip the photo entirely.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use image::RgbaImage;
use tracing::{debug, warn};

use crate::config::RendererConfig;
use crate::error::{Error, Result};
use crate::request::ImageSource;

// ============================================================================
// LoadResult
// ============================================================================

/// A decoded image, shared between the loader and the compositor.
pub type DecodedImage = Arc<RgbaImage>;

/// Outcome of loading one image.
#[derive(Debug, Clone)]
pub enum LoadResult {
    Loaded(DecodedImage),
    Failed,
}

impl LoadResult {
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    pub fn image(&self) -> Option<&RgbaImage> {
        match self {
            Self::Loaded(image) => Some(image),
            Self::Failed => None,
        }
    }
}

/// Decodes any format the `image` crate understands into RGBA8.
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

// ============================================================================
// ImageLoader
// ============================================================================

/// Source of image bytes for the render pipeline.
///
/// Implementors only provide [`fetch`](Self::fetch); the provided
/// [`load`](Self::load) adds decoding and turns every failure into
/// [`LoadResult::Failed`].
#[async_trait]
pub trait ImageLoader: Send + Sync {
    /// Fetches the raw, still-encoded bytes behind `source`.
    async fn fetch(&self, source: &ImageSource) -> Result<Vec<u8>>;

    /// Fetches and decodes `source`. Never fails.
    async fn load(&self, source: &ImageSource) -> LoadResult {
        let decoded = match self.fetch(source).await {
            Ok(bytes) => decode_image(&bytes),
            Err(err) => Err(err),
        };

        match decoded {
            Ok(image) => {
                debug!(
                    source = %source.describe(),
                    width = image.width(),
                    height = image.height(),
                    "image loaded"
                );
                LoadResult::Loaded(Arc::new(image))
            }
            Err(err) => {
                warn!(source = %source.describe(), error = %err, "image load failed");
                LoadResult::Failed
            }
        }
    }
}

// ============================================================================
// ResourceLoader
// ============================================================================

/// Loads images from remote URLs, data URIs and the local filesystem.
pub struct ResourceLoader {
    client: reqwest::Client,
}

impl ResourceLoader {
    pub fn new(config: &RendererConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    async fn fetch_remote(&self, url: &str) -> Result<Vec<u8>> {
        let fetch_err = |reason: String| Error::Fetch {
            source_ref: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_err(format!("HTTP {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ImageLoader for ResourceLoader {
    async fn fetch(&self, source: &ImageSource) -> Result<Vec<u8>> {
        match source {
            ImageSource::Url(url) => self.fetch_remote(url).await,
            ImageSource::DataUri(uri) => decode_data_uri(uri),
            ImageSource::File(path) => tokio::fs::read(path).await.map_err(|e| Error::Fetch {
                source_ref: path.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

// ============================================================================
// MemoryLoader
// ============================================================================

/// Serves images from memory. Unknown sources fail to load.
///
/// Useful for preloaded templates and for driving the renderer without I/O.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    images: HashMap<ImageSource, Arc<Vec<u8>>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers encoded image bytes for a source.
    pub fn insert(&mut self, source: ImageSource, bytes: Vec<u8>) {
        self.images.insert(source, Arc::new(bytes));
    }

    pub fn with(mut self, source: ImageSource, bytes: Vec<u8>) -> Self {
        self.insert(source, bytes);
        self
    }
}

#[async_trait]
impl ImageLoader for MemoryLoader {
    async fn fetch(&self, source: &ImageSource) -> Result<Vec<u8>> {
        self.images
            .get(source)
            .map(|bytes| bytes.as_ref().clone())
            .ok_or_else(|| Error::Fetch {
                source_ref: source.describe(),
                reason: "not registered".into(),
            })
    }
}

// ============================================================================
// Data URIs
// ============================================================================

/// Decodes the payload of a `data:` URI.
///
/// Supports base64 and percent-encoded payloads. The media type is not
/// checked; the image decoder sniffs the format from the bytes.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>> {
    let rest = uri
        .get(..5)
        .filter(|scheme| scheme.eq_ignore_ascii_case("data:"))
        .map(|_| &uri[5..])
        .ok_or_else(|| Error::InvalidSource("not a data: URI".into()))?;

    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::InvalidSource("data: URI has no payload".into()))?;

    let is_base64 = header
        .split(';')
        .any(|segment| segment.trim().eq_ignore_ascii_case("base64"));

    if is_base64 {
        let compact: String = payload
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        base64::engine::general_purpose::STANDARD
            .decode(compact)
            .map_err(|e| Error::InvalidSource(format!("invalid base64 payload: {e}")))
    } else {
        percent_decode(payload)
    }
}

fn percent_decode(input: &str) -> Result<Vec<u8>> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| Error::InvalidSource("malformed percent escape".into()))?;
            out.push(hex);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::io::Cursor;

    /// Encodes a solid-color PNG of the given size.
    pub(crate) fn png_bytes(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba(color));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn data_uri(bytes: &[u8]) -> String {
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(bytes)
        )
    }

    #[test]
    fn decodes_base64_data_uri() {
        let png = png_bytes(3, 2, [1, 2, 3, 255]);
        let decoded = decode_data_uri(&data_uri(&png)).unwrap();
        assert_eq!(decoded, png);
    }

    #[test]
    fn decodes_percent_encoded_data_uri() {
        assert_eq!(decode_data_uri("data:,a%20b").unwrap(), b"a b");
        assert!(decode_data_uri("data:,bad%2").is_err());
    }

    #[test]
    fn rejects_non_data_uri() {
        assert!(matches!(
            decode_data_uri("https://example.com"),
            Err(Error::InvalidSource(_))
        ));
        assert!(decode_data_uri("data:image/png;base64").is_err());
    }

    #[tokio::test]
    async fn resource_loader_reads_data_uri() {
        let loader = ResourceLoader::new(&RendererConfig::default()).unwrap();
        let source = ImageSource::DataUri(data_uri(&png_bytes(5, 4, [9, 9, 9, 255])));

        let result = loader.load(&source).await;
        assert!(result.succeeded());
        assert_eq!(result.image().unwrap().dimensions(), (5, 4));
    }

    #[tokio::test]
    async fn missing_file_fails_without_error() {
        let loader = ResourceLoader::new(&RendererConfig::default()).unwrap();
        let source = ImageSource::File("/definitely/not/here.png".into());

        let result = loader.load(&source).await;
        assert!(!result.succeeded());
        assert!(result.image().is_none());
    }

    #[tokio::test]
    async fn corrupt_bytes_fail_without_error() {
        let source = ImageSource::File("corrupt.png".into());
        let loader = MemoryLoader::new().with(source.clone(), b"not an image".to_vec());

        assert!(!loader.load(&source).await.succeeded());
    }

    #[tokio::test]
    async fn memory_loader_serves_registered_images() {
        let source = ImageSource::Url("https://example.com/bg.png".into());
        let loader = MemoryLoader::new().with(source.clone(), png_bytes(2, 2, [0, 0, 0, 255]));

        assert!(loader.load(&source).await.succeeded());
        assert!(
            !loader
                .load(&ImageSource::Url("https://example.com/other.png".into()))
                .await
                .succeeded()
        );
    }
}
