//! The animation engine boundary and the scripted software engine.

use crate::ingest::AnimationAsset;
use crate::surface::{RasterSurface, SurfaceHandle};

/// Metadata read from a loaded animation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationMetadata {
    /// Natural raster width.
    pub width: u32,
    /// Natural raster height.
    pub height: u32,
    /// Total number of frames.
    pub total_frames: u32,
    /// Native frame rate in frames per second.
    pub frame_rate: f64,
    /// Current playback speed multiplier.
    pub speed: f64,
}

impl AnimationMetadata {
    /// Playback length in seconds at the current speed:
    /// `total_frames / (frame_rate × speed)`.
    pub fn effective_duration_secs(&self) -> f64 {
        let rate = self.frame_rate * self.speed;
        if rate <= 0.0 {
            return 0.0;
        }
        self.total_frames as f64 / rate
    }
}

/// Transport and query operations the export pipeline consumes from the
/// playback engine. The engine draws into the surface it was loaded with;
/// `seek` renders the requested frame synchronously.
pub trait AnimationEngine: Send {
    /// Metadata of the loaded animation.
    fn metadata(&self) -> AnimationMetadata;

    /// Render frame `frame` into the surface. With `force_pause` the engine
    /// stays paused at that frame; otherwise playback state is unchanged.
    fn seek(&mut self, frame: u32, force_pause: bool);

    /// Resume playback from the current frame.
    fn play(&mut self);

    /// Pause playback at the current frame.
    fn pause(&mut self);

    fn is_paused(&self) -> bool;

    /// Set the playback speed multiplier.
    fn set_speed(&mut self, multiplier: f64);

    /// Resize the render target and repaint the current frame.
    fn resize(&mut self, width: u32, height: u32);

    /// Frame index the engine last rendered.
    fn current_frame(&self) -> u32;

    fn total_frames(&self) -> u32 {
        self.metadata().total_frames
    }

    /// Playback length in seconds, adjusted for the current speed.
    fn duration_secs(&self) -> f64 {
        self.metadata().effective_duration_secs()
    }
}

/// Paints one frame of a scripted animation into the surface.
pub type FramePainter = Box<dyn FnMut(u32, &mut RasterSurface) + Send>;

/// Deterministic software engine.
///
/// Renders procedural frames on `seek`, which makes the export pipeline
/// fully testable without a real vector renderer. Production callers
/// implement [`AnimationEngine`] over their own renderer instead.
pub struct ScriptedEngine {
    surface: SurfaceHandle,
    width: u32,
    height: u32,
    total_frames: u32,
    frame_rate: f64,
    speed: f64,
    current_frame: u32,
    paused: bool,
    painter: FramePainter,
}

impl ScriptedEngine {
    /// Load an animation into the given surface container, using the
    /// default procedural painter. The surface is resized to the asset's
    /// natural dimensions and frame 0 is rendered, paused.
    pub fn load(asset: &AnimationAsset, surface: SurfaceHandle) -> Self {
        Self::load_with_painter(asset, surface, Box::new(paint_test_pattern))
    }

    /// Load with a custom frame painter.
    pub fn load_with_painter(
        asset: &AnimationAsset,
        surface: SurfaceHandle,
        painter: FramePainter,
    ) -> Self {
        let mut engine = Self {
            surface,
            width: asset.width,
            height: asset.height,
            total_frames: asset.total_frames(),
            frame_rate: asset.frame_rate,
            speed: 1.0,
            current_frame: 0,
            paused: true,
            painter,
        };
        engine.resize(engine.width, engine.height);
        engine
    }

    fn render_current(&mut self) {
        let mut surface = self.surface.lock().expect("surface lock poisoned");
        (self.painter)(self.current_frame, &mut surface);
    }
}

impl AnimationEngine for ScriptedEngine {
    fn metadata(&self) -> AnimationMetadata {
        AnimationMetadata {
            width: self.width,
            height: self.height,
            total_frames: self.total_frames,
            frame_rate: self.frame_rate,
            speed: self.speed,
        }
    }

    fn seek(&mut self, frame: u32, force_pause: bool) {
        self.current_frame = frame.min(self.total_frames.saturating_sub(1));
        if force_pause {
            self.paused = true;
        }
        self.render_current();
    }

    fn play(&mut self) {
        self.paused = false;
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn set_speed(&mut self, multiplier: f64) {
        self.speed = multiplier;
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.surface
            .lock()
            .expect("surface lock poisoned")
            .resize(width, height);
        self.render_current();
    }

    fn current_frame(&self) -> u32 {
        self.current_frame
    }
}

/// Default painter: a gradient background that shifts with the frame index
/// plus a marker block sweeping left to right, so consecutive frames are
/// distinguishable after quantization.
fn paint_test_pattern(frame: u32, surface: &mut RasterSurface) {
    let width = surface.width();
    let height = surface.height();
    if width == 0 || height == 0 {
        return;
    }

    let shift = ((frame * 23) % 256) as u8;
    for y in 0..height {
        for x in 0..width {
            let r = ((x * 255) / width.max(1)) as u8;
            let g = ((y * 255) / height.max(1)) as u8;
            surface.put_pixel(x, y, [r, g, shift, 255]);
        }
    }

    // Sweeping marker
    let block = (width.min(height) / 4).max(1);
    let span = width.saturating_sub(block).max(1);
    let x0 = (frame % span).min(width - block);
    for y in 0..block.min(height) {
        for x in x0..(x0 + block) {
            surface.put_pixel(x, y, [255, 255, 255, 255]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::shared_surface;

    fn test_asset(width: u32, height: u32, frames: u32, fps: f64) -> AnimationAsset {
        AnimationAsset {
            version: "5.7.4".to_string(),
            frame_rate: fps,
            width,
            height,
            in_point: 0.0,
            out_point: frames as f64,
        }
    }

    #[test]
    fn test_load_resizes_surface_to_natural_dimensions() {
        let surface = shared_surface(RasterSurface::new(1, 1));
        let engine = ScriptedEngine::load(&test_asset(64, 48, 10, 30.0), surface.clone());
        assert_eq!(surface.lock().unwrap().width(), 64);
        assert_eq!(surface.lock().unwrap().height(), 48);
        assert_eq!(engine.total_frames(), 10);
    }

    #[test]
    fn test_seek_clamps_and_pauses() {
        let surface = shared_surface(RasterSurface::new(1, 1));
        let mut engine = ScriptedEngine::load(&test_asset(8, 8, 5, 30.0), surface);
        engine.play();
        engine.seek(99, true);
        assert_eq!(engine.current_frame(), 4);
        assert!(engine.is_paused());
    }

    #[test]
    fn test_seek_renders_distinct_frames() {
        let surface = shared_surface(RasterSurface::new(1, 1));
        let mut engine = ScriptedEngine::load(&test_asset(16, 16, 10, 30.0), surface.clone());
        engine.seek(0, true);
        let first = surface.lock().unwrap().read_rgba().unwrap();
        engine.seek(5, true);
        let later = surface.lock().unwrap().read_rgba().unwrap();
        assert_ne!(first, later);
    }

    #[test]
    fn test_effective_duration_accounts_for_speed() {
        let mut metadata = AnimationMetadata {
            width: 100,
            height: 100,
            total_frames: 60,
            frame_rate: 30.0,
            speed: 1.0,
        };
        assert!((metadata.effective_duration_secs() - 2.0).abs() < 1e-9);
        metadata.speed = 2.0;
        assert!((metadata.effective_duration_secs() - 1.0).abs() < 1e-9);
    }
}
