//! Frame-accurate animated GIF encoding.
//!
//! Each animation frame is seeked while paused, read back from the
//! surface, quantized to its own local palette, and written with the
//! frame delay derived from the spec's frame rate. The encode loop
//! yields to the runtime after every frame so long animations never
//! monopolise a worker thread.

use std::borrow::Cow;

use color_quant::NeuQuant;
use lumo_common::{LumoError, LumoResult};
use lumo_engine::{AnimationEngine, SurfaceHandle};
use tracing::{debug, info};

use crate::orchestrator::CancelToken;
use crate::spec::{Blob, GifSpec};

/// Hard ceiling of the GIF colour table.
pub const MAX_PALETTE_COLORS: usize = 256;

/// NeuQuant sample factor. 10 samples every tenth pixel when training
/// the palette network.
const QUANT_SAMPLE_FACTOR: i32 = 10;

/// Per-frame colour table with an optional dedicated transparent slot.
///
/// When transparency is requested the quantizer is capped at 255
/// colours and the final slot is reserved for fully transparent pixels,
/// so the table never exceeds [`MAX_PALETTE_COLORS`] entries.
pub struct PixelPalette {
    quantizer: NeuQuant,
    colors: Vec<[u8; 4]>,
    transparent: Option<u8>,
}

impl PixelPalette {
    /// Builds a palette from RGBA pixel data.
    pub fn quantize(rgba: &[u8], with_transparency: bool) -> Self {
        let budget = if with_transparency {
            MAX_PALETTE_COLORS - 1
        } else {
            MAX_PALETTE_COLORS
        };
        let quantizer = NeuQuant::new(QUANT_SAMPLE_FACTOR, budget, rgba);
        let mut colors: Vec<[u8; 4]> = quantizer
            .color_map_rgba()
            .chunks_exact(4)
            .map(|c| [c[0], c[1], c[2], c[3]])
            .collect();
        let transparent = if with_transparency {
            colors.push([0, 0, 0, 0]);
            Some((colors.len() - 1) as u8)
        } else {
            None
        };
        Self {
            quantizer,
            colors,
            transparent,
        }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn transparent_index(&self) -> Option<u8> {
        self.transparent
    }

    /// Palette as the flat RGB triple list the GIF stream stores.
    pub fn rgb_table(&self) -> Vec<u8> {
        self.colors
            .iter()
            .flat_map(|c| [c[0], c[1], c[2]])
            .collect()
    }

    /// Maps one RGBA pixel to its palette slot. Fully transparent
    /// pixels land on the reserved slot when one exists.
    pub fn index_of(&self, pixel: &[u8]) -> u8 {
        if pixel[3] == 0 {
            if let Some(slot) = self.transparent {
                return slot;
            }
        }
        self.quantizer.index_of(pixel) as u8
    }

    /// Maps a whole RGBA frame to an indexed bitmap.
    pub fn index_frame(&self, rgba: &[u8]) -> Vec<u8> {
        rgba.chunks_exact(4).map(|px| self.index_of(px)).collect()
    }
}

/// Drives an [`AnimationEngine`] frame by frame and assembles the GIF.
pub struct PaletteCodec {
    fps: u32,
    with_transparency: bool,
}

impl PaletteCodec {
    pub fn new(spec: &GifSpec) -> Self {
        Self {
            fps: spec.fps.max(1),
            with_transparency: true,
        }
    }

    /// Disables the reserved transparent slot, freeing it for colour.
    #[must_use]
    pub fn opaque(mut self) -> Self {
        self.with_transparency = false;
        self
    }

    /// Frame delay in GIF ticks (hundredths of a second), rounded to
    /// the nearest tick.
    fn delay_cs(&self) -> u16 {
        ((1000 / self.fps + 5) / 10).max(1) as u16
    }

    /// Renders every frame of the loaded animation into a GIF blob.
    ///
    /// A frame that cannot be read back aborts the whole export; no
    /// partial stream is ever returned.
    pub async fn encode(
        &self,
        surface: &SurfaceHandle,
        engine: &mut dyn AnimationEngine,
        cancel: &CancelToken,
    ) -> LumoResult<Blob> {
        let total_frames = engine.total_frames();
        let (width, height) = {
            let guard = surface.lock().expect("surface lock poisoned");
            (guard.width(), guard.height())
        };
        debug!(total_frames, width, height, fps = self.fps, "starting gif encode");

        let mut out = Vec::new();
        {
            let mut encoder = gif::Encoder::new(&mut out, width as u16, height as u16, &[])
                .map_err(|e| LumoError::encode(e.to_string()))?;
            encoder
                .set_repeat(gif::Repeat::Infinite)
                .map_err(|e| LumoError::encode(e.to_string()))?;

            for frame_index in 0..total_frames {
                if cancel.is_cancelled() {
                    return Err(LumoError::Cancelled);
                }

                engine.seek(frame_index, true);
                let rgba = {
                    let guard = surface.lock().expect("surface lock poisoned");
                    guard
                        .read_rgba()
                        .map_err(|e| LumoError::capture(frame_index, e.to_string()))?
                };

                let palette = PixelPalette::quantize(&rgba, self.with_transparency);
                let bitmap = palette.index_frame(&rgba);

                let mut frame = gif::Frame::default();
                frame.width = width as u16;
                frame.height = height as u16;
                frame.delay = self.delay_cs();
                frame.palette = Some(palette.rgb_table());
                frame.transparent = palette.transparent_index();
                frame.buffer = Cow::Owned(bitmap);
                encoder
                    .write_frame(&frame)
                    .map_err(|e| LumoError::encode(e.to_string()))?;

                tokio::task::yield_now().await;
            }
        }

        info!(total_frames, bytes = out.len(), "gif encode complete");
        Ok(Blob::new(out, "image/gif"))
    }
}
