//! Image normalization: decode, bound, and re-encode user-supplied files.

use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::types::{ImageInput, ProgressCallback};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};
use std::io::Cursor;

/// Convert a user-supplied image file into a bounded-size bitmap ready for
/// inference.
///
/// The file is validated (size, declared type) before any decode work, then
/// decoded, downscaled so its longer edge is at most `config.max_edge`
/// (never upscaled), and passed through a JPEG re-encode at
/// `config.reencode_quality` to normalize color and format quirks across
/// source formats.
///
/// Progress fires at read-start and decode-start.
///
/// # Errors
///
/// Returns [`Error::ImageTooLarge`], [`Error::UnsupportedContentType`], or
/// [`Error::ImageDecode`] for invalid input, and [`Error::ImageEncode`] if
/// the re-encode pass fails.
pub async fn normalize(
    input: &ImageInput,
    config: &PipelineConfig,
    on_progress: Option<&ProgressCallback<'_>>,
) -> Result<RgbImage> {
    if input.size() > config.max_file_size {
        return Err(Error::ImageTooLarge {
            size: input.size(),
            limit: config.max_file_size,
        });
    }

    if let Some(content_type) = &input.content_type {
        if !content_type.starts_with("image/") {
            return Err(Error::UnsupportedContentType {
                content_type: content_type.clone(),
            });
        }
    }

    if let Some(report) = on_progress {
        report("Reading image...");
    }

    if let Some(report) = on_progress {
        report("Processing image...");
    }

    let decoded = decode(&input.data)?;
    let resized = shrink_to_bound(decoded, config.max_edge);
    reencode(&resized, config.reencode_quality)
}

/// Decode encoded bytes into a bitmap.
fn decode(data: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(data).map_err(|e| Error::ImageDecode(e.to_string()))
}

/// Downscale so the longer edge is at most `max_edge`, preserving aspect
/// ratio. Images already within the bound are returned at native size.
fn shrink_to_bound(image: DynamicImage, max_edge: u32) -> DynamicImage {
    let longer = image.width().max(image.height());
    if longer <= max_edge {
        return image;
    }
    image.resize(max_edge, max_edge, FilterType::Triangle)
}

/// Run the bitmap through a lossy JPEG encode/decode cycle.
fn reencode(image: &DynamicImage, quality: u8) -> Result<RgbImage> {
    let rgb = image.to_rgb8();

    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut buffer), quality);
    rgb.write_with_encoder(encoder)
        .map_err(|e| Error::ImageEncode(e.to_string()))?;

    let roundtripped = image::load_from_memory_with_format(&buffer, image::ImageFormat::Jpeg)
        .map_err(|e| Error::ImageEncode(e.to_string()))?;

    Ok(roundtripped.to_rgb8())
}
