use std::io::Cursor;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::imageops::{self, FilterType};
use image::ImageFormat;

use crate::error::EncodeError;
use crate::raster::PixelBuffer;

/// Scales the snapshot to `size`×`size` and encodes it as PNG
pub fn encode_png(snapshot: &PixelBuffer, size: u32) -> Result<Vec<u8>, EncodeError> {
    let rgba = snapshot.to_rgba_image().ok_or(EncodeError::EmptySnapshot {
        width: snapshot.width(),
        height: snapshot.height(),
    })?;
    let size = size.max(1);
    let scaled = imageops::resize(&rgba, size, size, FilterType::Triangle);

    let mut bytes = Cursor::new(Vec::new());
    scaled.write_to(&mut bytes, ImageFormat::Png)?;
    Ok(bytes.into_inner())
}

/// PNG bytes as unwrapped standard base64
pub fn encode_snapshot(snapshot: &PixelBuffer, size: u32) -> Result<String, EncodeError> {
    let png = encode_png(snapshot, size)?;
    log::debug!("Encoded snapshot: {} PNG bytes", png.len());
    Ok(STANDARD.encode(png))
}

/// Decodes a base64 image payload, tolerating surrounding whitespace and line breaks
pub fn decode_base64(text: &str) -> Option<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD.decode(compact).ok()
}
