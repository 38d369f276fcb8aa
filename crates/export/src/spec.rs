//! Export spec data model.
//!
//! A spec describes one exportable output shape. Specs are immutable
//! values: tweaks go through the `with_*` constructors, which return a
//! fresh spec and leave the original untouched. The [`ExportSpec`] tag
//! tells the orchestrator which pipeline to dispatch to, so no field
//! sniffing is ever needed.

use serde::{Deserialize, Serialize};

/// Container identity for one export shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Format {
    /// Human-readable label, e.g. `"mp4 (MJPEG)"`.
    pub label: String,
    /// Mime type. Acts as the identity key within a catalog.
    pub mime: String,
    /// File extension without the dot.
    pub extension: String,
}

impl Format {
    pub fn new(label: impl Into<String>, mime: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            mime: mime.into(),
            extension: extension.into(),
        }
    }
}

/// Timed video export: capture the live surface for a fixed wall-clock
/// window and mux the chunks into the container named by `format`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSpec {
    pub format: Format,
    /// Target surface width; `None` means the animation's natural size.
    pub width: Option<u32>,
    /// Target surface height; `None` means the animation's natural size.
    pub height: Option<u32>,
    /// Capture rate in frames per second.
    pub fps: u32,
    /// Intra-container codec, e.g. `"mjpeg"` or `"raw"`.
    pub codec: String,
    /// Recording window length.
    pub duration_secs: f64,
}

/// Single-frame still export of whatever the surface currently shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSpec {
    pub format: Format,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Encoder quality in `0.0..=1.0`. `None` defers to the encoder's
    /// own default. Ignored by lossless formats.
    pub quality: Option<f32>,
}

/// Frame-accurate animated GIF export: every animation frame is seeked,
/// rendered, quantized, and written with its own local palette.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GifSpec {
    pub format: Format,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Playback rate encoded into the frame delays.
    pub fps: u32,
}

/// Tagged union over the three export shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ExportSpec {
    Video(VideoSpec),
    Image(ImageSpec),
    Gif(GifSpec),
}

impl ExportSpec {
    pub fn format(&self) -> &Format {
        match self {
            ExportSpec::Video(v) => &v.format,
            ExportSpec::Image(i) => &i.format,
            ExportSpec::Gif(g) => &g.format,
        }
    }

    /// Mime type of the output blob this spec produces.
    pub fn mime(&self) -> &str {
        &self.format().mime
    }

    /// Requested dimensions, `None` where the natural size applies.
    pub fn dimensions(&self) -> (Option<u32>, Option<u32>) {
        match self {
            ExportSpec::Video(v) => (v.width, v.height),
            ExportSpec::Image(i) => (i.width, i.height),
            ExportSpec::Gif(g) => (g.width, g.height),
        }
    }

    /// Returns a copy with the requested dimensions replaced.
    #[must_use]
    pub fn with_dimensions(&self, width: Option<u32>, height: Option<u32>) -> Self {
        let mut next = self.clone();
        match &mut next {
            ExportSpec::Video(v) => {
                v.width = width;
                v.height = height;
            }
            ExportSpec::Image(i) => {
                i.width = width;
                i.height = height;
            }
            ExportSpec::Gif(g) => {
                g.width = width;
                g.height = height;
            }
        }
        next
    }

    /// Returns a copy with the encoder quality replaced. Only image
    /// specs carry a quality knob; other shapes come back unchanged.
    #[must_use]
    pub fn with_quality(&self, quality: f32) -> Self {
        let mut next = self.clone();
        if let ExportSpec::Image(i) = &mut next {
            i.quality = Some(quality);
        }
        next
    }

    /// Returns a copy with the recording window replaced. Only video
    /// specs record; other shapes come back unchanged.
    #[must_use]
    pub fn with_duration(&self, duration_secs: f64) -> Self {
        let mut next = self.clone();
        if let ExportSpec::Video(v) = &mut next {
            v.duration_secs = duration_secs;
        }
        next
    }

    pub fn quality(&self) -> Option<f32> {
        match self {
            ExportSpec::Image(i) => i.quality,
            _ => None,
        }
    }
}

/// Finished export payload, ready to hand to a sink.
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl Blob {
    pub fn new(bytes: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            bytes,
            mime: mime.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
