//! Photo intake for the Aadhaar card column.
//!
//! The photo is stored inline in one sheet cell, so it is downscaled and
//! re-encoded as a JPEG `data:` URL small enough to fit the cell limit.

use std::io::Cursor;

use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader};
use serde::Serialize;

use crate::error::RollError;
use crate::types::ImageConfig;

pub const DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// A photo ready to be placed in the `aadhaarImage` field.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedPhoto {
    pub data_url: String,
    pub width: u32,
    pub height: u32,
    pub encoded_chars: usize,
    /// The save path will refuse this photo.
    pub exceeds_limit: bool,
}

/// Decode, turn upright, downscale to `max_width` (never upscale), re-encode
/// as JPEG.
pub fn encode_for_cell(bytes: &[u8], settings: &ImageConfig) -> Result<EncodedPhoto, RollError> {
    let img = decode_upright(bytes)?;

    let max_width = settings.max_width.max(1);
    let img = if img.width() > max_width {
        let scaled_height = (u64::from(img.height()) * u64::from(max_width) / u64::from(img.width())).max(1);
        img.resize_exact(max_width, scaled_height as u32, FilterType::Triangle)
    } else {
        img
    };

    // JPEG has no alpha channel.
    let rgb = img.to_rgb8();
    let mut jpeg = Vec::new();
    let quality = settings.jpeg_quality.clamp(1, 100);
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut jpeg, quality))
        .map_err(|e| RollError::ImageDecode(e.to_string()))?;

    let data_url = format!(
        "{}{}",
        DATA_URL_PREFIX,
        base64::engine::general_purpose::STANDARD.encode(&jpeg)
    );
    let encoded_chars = data_url.chars().count();
    let exceeds_limit = encoded_chars > settings.max_encoded_chars;
    if exceeds_limit {
        log::warn!(
            "Encoded photo is {} chars, over the {} char cell limit",
            encoded_chars,
            settings.max_encoded_chars
        );
    }

    Ok(EncodedPhoto {
        width: rgb.width(),
        height: rgb.height(),
        data_url,
        encoded_chars,
        exceeds_limit,
    })
}

/// Decode `bytes` and apply the EXIF orientation, so camera shots stored
/// sideways come out the way they were taken.
fn decode_upright(bytes: &[u8]) -> Result<DynamicImage, RollError> {
    let decode_err = |e: image::ImageError| RollError::ImageDecode(e.to_string());
    let mut decoder = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| RollError::ImageDecode(e.to_string()))?
        .into_decoder()
        .map_err(decode_err)?;
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let mut img = DynamicImage::from_decoder(decoder).map_err(decode_err)?;
    img.apply_orientation(orientation);
    Ok(img)
}

/// Refuse a photo that would not fit in one sheet cell.
pub fn check_cell_size(data_url: &str, limit: usize) -> Result<(), RollError> {
    let len = data_url.chars().count();
    if len > limit {
        return Err(RollError::ImageTooLarge { len, limit });
    }
    Ok(())
}

/// Raw image bytes behind a `data:` URL (any image MIME type).
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>, RollError> {
    let payload = data_url
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(";base64,"))
        .map(|(_, b64)| b64)
        .ok_or_else(|| RollError::ImageDecode("not a base64 data URL".to_string()))?;
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| RollError::ImageDecode(e.to_string()))
}
