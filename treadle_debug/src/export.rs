// Copyright 2026 the Treadle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! PNG export of component bitmaps.

use std::path::Path;

use image::ImageEncoder;
use image::codecs::png::PngEncoder;
use treadle_core::component::bitmap::Bitmap;

/// Errors from [`encode_png`] and [`write_png`].
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The bitmap has no pixels; PNG cannot represent that.
    #[error("cannot export an empty {width}x{height} bitmap")]
    Empty {
        /// Pixel width.
        width: u32,
        /// Pixel height.
        height: u32,
    },
    /// The encoder rejected the image.
    #[error("PNG encode failed")]
    Encode(#[from] image::ImageError),
    /// Writing the file failed.
    #[error("writing the PNG failed")]
    Io(#[from] std::io::Error),
}

/// Encodes `bitmap` as a straight-alpha RGBA8 PNG.
pub fn encode_png(bitmap: &Bitmap) -> Result<Vec<u8>, ExportError> {
    let (width, height) = (bitmap.width(), bitmap.height());
    if width == 0 || height == 0 {
        return Err(ExportError::Empty { width, height });
    }
    let rgba: Vec<u8> = bitmap
        .data()
        .chunks_exact(4)
        .flat_map(|px| unpremultiply([px[0], px[1], px[2], px[3]]))
        .collect();

    let mut buf = Vec::new();
    PngEncoder::new(&mut buf).write_image(&rgba, width, height, image::ExtendedColorType::Rgba8)?;
    Ok(buf)
}

/// Encodes `bitmap` and writes it to `path`.
pub fn write_png(bitmap: &Bitmap, path: impl AsRef<Path>) -> Result<(), ExportError> {
    let bytes = encode_png(bitmap)?;
    std::fs::write(path.as_ref(), bytes)?;
    tracing::debug!(path = %path.as_ref().display(), "wrote bitmap");
    Ok(())
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "a premultiplied channel never exceeds its alpha, so the quotient fits in a byte"
)]
fn unpremultiply([r, g, b, a]: [u8; 4]) -> [u8; 4] {
    if a == 0 {
        return [0; 4];
    }
    let a16 = u16::from(a);
    let un = |c: u8| ((u16::from(c) * 255 + a16 / 2) / a16).min(255) as u8;
    [un(r), un(g), un(b), a]
}
