//! Header-only image inspection.

use std::io::Cursor;

use image::{ImageFormat, ImageReader};
use tracing::trace;

use crate::archive::extension_of;
use crate::types::ImageDimensions;

/// Read the pixel dimensions of an encoded page without decoding its pixels.
///
/// The format is taken from the entry name when it maps to a known image format, otherwise it is
/// sniffed from the leading bytes. Returns `None` when neither yields a readable header.
pub fn probe_dimensions(name: &str, data: &[u8]) -> Option<ImageDimensions> {
    if data.is_empty() {
        return None;
    }

    let reader = match infer_format(name) {
        Some(format) => ImageReader::with_format(Cursor::new(data), format),
        None => ImageReader::new(Cursor::new(data)).with_guessed_format().ok()?,
    };

    match reader.into_dimensions() {
        Ok((width, height)) => Some(ImageDimensions { width, height }),
        Err(err) => {
            trace!(target: "codec::probe", entry = name, "no readable image header: {err}");
            None
        }
    }
}

fn infer_format(name: &str) -> Option<ImageFormat> {
    extension_of(name).and_then(|ext| ImageFormat::from_extension(&ext))
}
