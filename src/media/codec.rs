use crate::error::{BedrockError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage, ImageFormat};
use std::io::Cursor;
use std::time::Duration;

/// Upper bound for images sent to a model as reference input.
pub const DEFAULT_MAX_SIZE: (u32, u32) = (2000, 2000);
/// Upper bound for images kept as raw bytes (history, previews).
pub const DEFAULT_BYTES_MAX_SIZE: (u32, u32) = (1000, 1000);
pub const JPEG_QUALITY: u8 = 90;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
}

impl OutputFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
        }
    }
}

/// Decode `image_bytes`, shrink to fit `max_size`, re-encode and base64 it.
pub fn encode_base64(
    image_bytes: &[u8],
    max_size: (u32, u32),
    format: OutputFormat,
) -> Result<String> {
    let image = load_image(image_bytes)?;
    encode_image_base64(&image, max_size, format)
}

pub fn encode_image_base64(
    image: &DynamicImage,
    max_size: (u32, u32),
    format: OutputFormat,
) -> Result<String> {
    let bytes = image_to_bytes(image, max_size, format)?;
    Ok(STANDARD.encode(bytes))
}

/// Shrinks (never enlarges) to fit `max_size`, flattens to RGB and encodes.
pub fn image_to_bytes(
    image: &DynamicImage,
    max_size: (u32, u32),
    format: OutputFormat,
) -> Result<Vec<u8>> {
    let fitted = fit_within(image, max_size);
    encode_rgb(&DynamicImage::ImageRgb8(fitted.to_rgb8()), format)
}

pub fn decode_base64(encoded: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(encoded.trim())
        .map_err(|e| BedrockError::MediaError(format!("Failed to decode base64: {}", e)))
}

pub fn base64_to_image(encoded: &str) -> Result<DynamicImage> {
    load_image(&decode_base64(encoded)?)
}

pub fn load_image(image_bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(image_bytes)
        .map_err(|e| BedrockError::MediaError(format!("Failed to read image: {}", e)))
}

/// Scale to cover `width`×`height`, then center-crop to exactly that size.
///
/// The scaled side is `floor(orig * target / orig_other)` and never smaller
/// than the target; the crop origin is `floor(excess / 2)`.
pub fn resize_cover_crop(image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    let (scaled_width, scaled_height) =
        cover_dimensions(image.width(), image.height(), width, height);
    let left = (scaled_width - width) / 2;
    let top = (scaled_height - height) / 2;

    image
        .resize_exact(scaled_width, scaled_height, FilterType::Lanczos3)
        .crop_imm(left, top, width, height)
}

/// Size the source must be scaled to so that it fully covers the target box.
pub fn cover_dimensions(orig_width: u32, orig_height: u32, width: u32, height: u32) -> (u32, u32) {
    let (ow, oh) = (orig_width.max(1) as u64, orig_height.max(1) as u64);
    let (tw, th) = (width as u64, height as u64);

    // Compare tw/th with ow/oh without floats.
    if tw * oh > ow * th {
        let scaled_height = (oh * tw / ow).max(th);
        (width, scaled_height as u32)
    } else {
        let scaled_width = (ow * th / oh).max(tw);
        (scaled_width as u32, height)
    }
}

/// Download an image and encode it like [`encode_base64`].
pub async fn fetch_image_base64(
    url: &str,
    max_size: (u32, u32),
    format: OutputFormat,
) -> Result<String> {
    let client = reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .map_err(|e| BedrockError::ConfigError(e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| {
            BedrockError::MediaError(format!("Failed to fetch image from {}: {}", url, e))
        })?;

    let bytes = response
        .bytes()
        .await
        .map_err(|e| BedrockError::MediaError(format!("Failed to read image body: {}", e)))?;

    encode_base64(&bytes, max_size, format)
}

pub(crate) fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
    DynamicImage::ImageRgb8(image.to_rgb8())
        .write_with_encoder(encoder)
        .map_err(|e| BedrockError::MediaError(format!("Failed to encode JPEG: {}", e)))?;
    Ok(bytes)
}

fn encode_rgb(image: &DynamicImage, format: OutputFormat) -> Result<Vec<u8>> {
    match format {
        OutputFormat::Jpeg => encode_jpeg(image, JPEG_QUALITY),
        OutputFormat::Png => {
            let mut bytes = Vec::new();
            image
                .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
                .map_err(|e| BedrockError::MediaError(format!("Failed to encode PNG: {}", e)))?;
            Ok(bytes)
        }
    }
}

fn fit_within(image: &DynamicImage, (max_width, max_height): (u32, u32)) -> DynamicImage {
    if image.width() <= max_width && image.height() <= max_height {
        return image.clone();
    }
    image.resize(max_width, max_height, FilterType::Lanczos3)
}
