//! The raster surface the animation engine draws into.

use std::sync::{Arc, Mutex};

/// Why a pixel readback failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SurfaceFault {
    #[error("surface is not attached to a live container")]
    Detached,

    #[error("surface has zero width or height")]
    ZeroSized,
}

/// An RGBA raster surface.
///
/// Owned by the preview side; the export pipeline borrows it through a
/// [`SurfaceHandle`] for the duration of one export and must not retain it
/// past completion.
#[derive(Debug)]
pub struct RasterSurface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    attached: bool,
}

impl RasterSurface {
    /// Create an attached surface with zeroed (transparent) pixels.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; (width as usize) * (height as usize) * 4],
            attached: true,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Detach the surface from its container. Subsequent readbacks fail.
    pub fn detach(&mut self) {
        self.attached = false;
    }

    /// Resize the raster target. Existing content is discarded; the engine
    /// repaints on its next draw.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels = vec![0; (width as usize) * (height as usize) * 4];
    }

    /// Read the full RGBA pixel buffer at the current dimensions.
    pub fn read_rgba(&self) -> Result<Vec<u8>, SurfaceFault> {
        if !self.attached {
            return Err(SurfaceFault::Detached);
        }
        if self.width == 0 || self.height == 0 {
            return Err(SurfaceFault::ZeroSized);
        }
        Ok(self.pixels.clone())
    }

    /// Fill the whole surface with one RGBA color.
    pub fn fill(&mut self, rgba: [u8; 4]) {
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
    }

    /// Write one pixel. Out-of-bounds writes are ignored.
    pub fn put_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        self.pixels[i..i + 4].copy_from_slice(&rgba);
    }

    /// Mutable access to the raw RGBA buffer, row-major.
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }
}

/// Shared handle to a surface, as handed to the export pipeline.
pub type SurfaceHandle = Arc<Mutex<RasterSurface>>;

/// Wrap a surface in a shareable handle.
pub fn shared_surface(surface: RasterSurface) -> SurfaceHandle {
    Arc::new(Mutex::new(surface))
}
