//! Client-side image ingestion.
//!
//! Decodes a user-selected photo, downsamples it to a bounded width and
//! re-encodes it as JPEG. The encoded bytes are uploaded as a blob; if the
//! upload fails the same bytes travel inline as base64 instead.
//!
//! Decode and encode are CPU-bound, so [`ImagePipeline::resize`] runs them on
//! the blocking pool and the calling task only suspends.

use std::io::Cursor;
use std::path::Path;

use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::GenericImageView;

use crate::error::{Error, Result};

/// Default bound on output width, in pixels.
pub const DEFAULT_MAX_WIDTH: u32 = 800;

/// JPEG quality (0.8 on a 0-1 scale).
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Content type of every encoded output.
pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";

/// A raw user-selected file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl SourceImage {
    #[must_use]
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Read a file from disk, keeping its file name for the blob key.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map_or_else(|| "image".to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self { file_name, bytes })
    }
}

/// Resized, re-encoded JPEG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    #[must_use]
    pub const fn content_type(&self) -> &'static str {
        JPEG_CONTENT_TYPE
    }

    /// Portable text encoding (standard base64, no data-URL prefix).
    #[must_use]
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }
}

/// Downscale-and-encode settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImagePipeline {
    max_width: u32,
    quality: u8,
}

impl Default for ImagePipeline {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH,
            quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl ImagePipeline {
    /// Create a pipeline with a custom width bound and JPEG quality.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a zero width or a quality outside 1-100.
    pub fn new(max_width: u32, quality: u8) -> Result<Self> {
        if max_width == 0 {
            return Err(Error::InvalidArgument("max image width must be positive".into()));
        }
        if !(1..=100).contains(&quality) {
            return Err(Error::InvalidArgument(format!(
                "JPEG quality must be 1-100, got {quality}"
            )));
        }
        Ok(Self { max_width, quality })
    }

    #[must_use]
    pub const fn max_width(&self) -> u32 {
        self.max_width
    }

    /// Decode, downsample and re-encode `source`.
    ///
    /// # Errors
    ///
    /// Returns `ImageDecode` for empty, corrupt or unsupported input and
    /// `ImageEncode` if JPEG encoding fails. Never returns an empty blob.
    pub async fn resize(&self, source: &SourceImage) -> Result<EncodedImage> {
        let bytes = source.bytes.clone();
        let (max_width, quality) = (self.max_width, self.quality);

        tokio::task::spawn_blocking(move || resize_blocking(&bytes, max_width, quality))
            .await
            .map_err(|e| Error::ImageEncode(format!("resize task failed: {e}")))?
    }

    /// Live preview of the unresized file as a data URL.
    ///
    /// Independent of [`resize`](Self::resize); it neither decodes nor
    /// fails, so the form can show something immediately.
    #[must_use]
    pub fn preview(source: &SourceImage) -> String {
        let mime = image::guess_format(&source.bytes)
            .map_or("application/octet-stream", |f| f.to_mime_type());
        let data = base64::engine::general_purpose::STANDARD.encode(&source.bytes);
        format!("data:{mime};base64,{data}")
    }
}

/// Output dimensions for a `width` x `height` source under `max_width`.
///
/// Wider sources scale so width becomes exactly `max_width` with height
/// rounded to the nearest pixel; anything else is unchanged.
#[must_use]
pub fn target_dimensions(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width {
        return (width, height);
    }
    let scaled = (u64::from(height) * u64::from(max_width) + u64::from(width) / 2) / u64::from(width);
    let scaled = u32::try_from(scaled).unwrap_or(u32::MAX).max(1);
    (max_width, scaled)
}

fn resize_blocking(bytes: &[u8], max_width: u32, quality: u8) -> Result<EncodedImage> {
    if bytes.is_empty() {
        return Err(Error::ImageDecode("empty input".into()));
    }

    let img = image::load_from_memory(bytes).map_err(|e| Error::ImageDecode(e.to_string()))?;
    let (width, height) = img.dimensions();
    let (target_w, target_h) = target_dimensions(width, height, max_width);

    let img = if (target_w, target_h) == (width, height) {
        img
    } else {
        img.resize_exact(target_w, target_h, FilterType::Triangle)
    };

    let rgb = img.to_rgb8();
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
        encoder
            .encode_image(&rgb)
            .map_err(|e| Error::ImageEncode(e.to_string()))?;
    }

    let bytes = buffer.into_inner();
    if bytes.is_empty() {
        return Err(Error::ImageEncode("encoder produced no output".into()));
    }

    tracing::debug!(
        from = %format!("{width}x{height}"),
        to = %format!("{target_w}x{target_h}"),
        size = bytes.len(),
        "Image resized"
    );

    Ok(EncodedImage {
        bytes,
        width: target_w,
        height: target_h,
    })
}
