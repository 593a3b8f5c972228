use std::io::Cursor;

use anyhow::{Context, Result};
use image::{imageops, ImageFormat, RgbaImage};

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .context("png encoding failed")?;
    Ok(buffer.into_inner())
}

/// Downscale so the longest edge is at most `max_edge`, keeping the aspect.
/// Images already small enough are encoded as-is.
pub fn encode_thumbnail(image: &RgbaImage, max_edge: u32) -> Result<Vec<u8>> {
    let (width, height) = image.dimensions();
    let longest = width.max(height);
    if longest <= max_edge || longest == 0 {
        return encode_png(image);
    }

    let scale = max_edge as f32 / longest as f32;
    let thumb_w = ((width as f32 * scale).round() as u32).max(1);
    let thumb_h = ((height as f32 * scale).round() as u32).max(1);
    let thumbnail = imageops::thumbnail(image, thumb_w, thumb_h);
    encode_png(&thumbnail)
}
