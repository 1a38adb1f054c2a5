use std::path::Path;

use anyhow::Context as _;

use crate::buffer::PixelBuffer;
use crate::foundation::error::GridfoldResult;

/// Decode encoded image bytes into an RGBA8 [`PixelBuffer`].
///
/// This is the only suspension-shaped step of the pipeline: everything past
/// it operates synchronously on the decoded samples.
pub fn decode_image(bytes: &[u8]) -> GridfoldResult<PixelBuffer> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    PixelBuffer::from_raw(width, height, rgba.into_raw())
}

/// Write `buffer` to `path` as a PNG.
pub fn encode_png(buffer: &PixelBuffer, path: &Path) -> GridfoldResult<()> {
    image::save_buffer_with_format(
        path,
        buffer.data(),
        buffer.width(),
        buffer.height(),
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", path.display()))?;
    Ok(())
}
