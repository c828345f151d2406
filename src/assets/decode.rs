use std::sync::Arc;

use anyhow::Context;

use crate::foundation::core::{Rgba8, Size};
use crate::foundation::error::{CardError, CardResult};

/// Largest edge the rasterizer can sample from.
pub const MAX_IMAGE_EDGE: u32 = u16::MAX as u32;

/// A decoded card image, premultiplied and ready for a `vello_cpu` pixmap.
#[derive(Clone, Debug)]
pub struct PreparedImage {
    pub width: u32,
    pub height: u32,
    /// Row-major premultiplied RGBA8, shared between cached copies.
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl PreparedImage {
    pub fn natural_size(&self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }
}

/// Decode PNG/JPEG/GIF/WebP/... bytes. Oversized images are rejected up front.
pub fn decode_image(bytes: &[u8]) -> CardResult<PreparedImage> {
    let decoded = image::load_from_memory(bytes)
        .context("decode card image")?
        .into_rgba8();
    let (width, height) = decoded.dimensions();
    if width == 0 || height == 0 || width > MAX_IMAGE_EDGE || height > MAX_IMAGE_EDGE {
        return Err(CardError::asset(format!(
            "image is {width}x{height}; edges must be 1..={MAX_IMAGE_EDGE}"
        )));
    }

    let mut pixels = decoded.into_raw();
    premultiply_rgba8_in_place(&mut pixels);
    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(pixels),
    })
}

pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let p = Rgba8::new(px[0], px[1], px[2], px[3]).premultiplied();
        px.copy_from_slice(&[p.r, p.g, p.b, p.a]);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
