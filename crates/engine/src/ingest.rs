//! Animation asset ingestion.
//!
//! The pipeline never interprets the full scene description; it only parses
//! the asset header to learn natural dimensions, frame rate, and frame range.

use std::path::Path;

use lumo_common::error::{LumoError, LumoResult};
use serde::{Deserialize, Serialize};

use crate::animation::AnimationMetadata;

/// Header fields of a vector animation asset (Bodymovin-style JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationAsset {
    /// Format version string.
    #[serde(rename = "v", default)]
    pub version: String,

    /// Native frame rate.
    #[serde(rename = "fr")]
    pub frame_rate: f64,

    /// Natural width in pixels.
    #[serde(rename = "w")]
    pub width: u32,

    /// Natural height in pixels.
    #[serde(rename = "h")]
    pub height: u32,

    /// First frame of the playback range.
    #[serde(rename = "ip", default)]
    pub in_point: f64,

    /// One past the last frame of the playback range.
    #[serde(rename = "op")]
    pub out_point: f64,
}

impl AnimationAsset {
    /// Parse the asset header from JSON text. Unknown fields (layers,
    /// shapes, ...) are ignored.
    pub fn parse(json: &str) -> LumoResult<Self> {
        let asset: Self = serde_json::from_str(json)?;
        Ok(asset)
    }

    /// Total number of frames in the playback range.
    pub fn total_frames(&self) -> u32 {
        (self.out_point - self.in_point).max(0.0).round() as u32
    }

    /// Metadata at 1× playback speed.
    pub fn metadata(&self) -> AnimationMetadata {
        AnimationMetadata {
            width: self.width,
            height: self.height,
            total_frames: self.total_frames(),
            frame_rate: self.frame_rate,
            speed: 1.0,
        }
    }
}

/// Read an asset file as text.
///
/// Empty files are rejected here rather than failing later inside the
/// engine with a less useful parse error.
pub fn read_asset(path: &Path) -> LumoResult<String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| LumoError::file_read(path, e.to_string()))?;
    if text.trim().is_empty() {
        return Err(LumoError::file_read(path, "file is empty"));
    }
    Ok(text)
}
