//! Single-frame still capture.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use lumo_common::{LumoError, LumoResult};
use lumo_engine::SurfaceHandle;
use tracing::debug;

use crate::spec::{Blob, ImageSpec};

/// Encodes whatever the surface currently shows into a still image.
///
/// PNG keeps the alpha channel; JPEG flattens to RGB and honours the
/// spec's quality knob, deferring to the encoder default when none is
/// set.
pub fn capture(surface: &SurfaceHandle, spec: &ImageSpec) -> LumoResult<Blob> {
    let (rgba, width, height) = {
        let guard = surface.lock().expect("surface lock poisoned");
        let rgba = guard
            .read_rgba()
            .map_err(|e| LumoError::encode(e.to_string()))?;
        (rgba, guard.width(), guard.height())
    };

    let mime = spec.format.mime.as_str();
    debug!(mime, width, height, quality = ?spec.quality, "capturing still");

    let bytes = match mime {
        "image/png" => {
            let mut buffer = Cursor::new(Vec::new());
            PngEncoder::new(&mut buffer)
                .write_image(&rgba, width, height, ExtendedColorType::Rgba8)
                .map_err(|e| LumoError::encode(e.to_string()))?;
            buffer.into_inner()
        }
        "image/jpeg" => {
            let rgb: Vec<u8> = rgba
                .chunks_exact(4)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect();
            let mut buffer = Cursor::new(Vec::new());
            let mut encoder = match spec.quality {
                Some(quality) => {
                    JpegEncoder::new_with_quality(&mut buffer, quality_percent(quality))
                }
                None => JpegEncoder::new(&mut buffer),
            };
            encoder
                .encode(&rgb, width, height, ExtendedColorType::Rgb8)
                .map_err(|e| LumoError::encode(e.to_string()))?;
            buffer.into_inner()
        }
        other => {
            return Err(LumoError::encode(format!(
                "no still encoder for mime type {other:?}"
            )))
        }
    };

    Ok(Blob::new(bytes, mime))
}

/// Maps the unit-interval quality knob onto the encoder's 1..=100 scale.
fn quality_percent(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}
