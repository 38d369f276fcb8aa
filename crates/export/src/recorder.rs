//! Wall-clock video recording.
//!
//! The recorder opens a compressed chunk stream on the surface, starts
//! playback when an engine is attached, collects chunks until the
//! spec's recording window elapses, and muxes the result. The window is
//! measured in real time, so the output length tracks the spec's
//! duration rather than the animation's.

use std::time::Duration;

use lumo_common::{LumoError, LumoResult};
use lumo_engine::{open_stream, AnimationEngine, EncodedChunk, StreamFormat, SurfaceHandle};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::mp4::{Mp4Muxer, SampleCodec};
use crate::orchestrator::CancelToken;
use crate::spec::{Blob, VideoSpec};

/// How long to keep draining chunks the stream produced before it
/// acknowledged the stop signal.
const DRAIN_GRACE: Duration = Duration::from_millis(100);

/// Records the surface for a fixed wall-clock window.
pub struct StreamRecorder {
    spec: VideoSpec,
}

impl StreamRecorder {
    pub fn new(spec: &VideoSpec) -> Self {
        Self { spec: spec.clone() }
    }

    /// Runs the whole recording: open stream, roll playback, collect,
    /// stop, mux. The codec is validated when the stream opens, before
    /// playback starts or the timer is armed.
    pub async fn record(
        &self,
        surface: &SurfaceHandle,
        mut engine: Option<&mut (dyn AnimationEngine + '_)>,
        cancel: &CancelToken,
    ) -> LumoResult<Blob> {
        let mime = self.spec.format.mime.as_str();
        if mime != "video/mp4" {
            return Err(LumoError::unsupported_codec(mime, &self.spec.codec));
        }
        let sample_codec = match self.spec.codec.as_str() {
            "mjpeg" => SampleCodec::Mjpeg,
            "raw" => SampleCodec::Raw,
            _ => return Err(LumoError::unsupported_codec(mime, &self.spec.codec)),
        };

        let format = StreamFormat::new(mime, &self.spec.codec);
        let mut stream = open_stream(surface.clone(), self.spec.fps, &format)?;

        if let Some(engine) = engine.as_deref_mut() {
            engine.seek(0, false);
            engine.play();
        }

        let window = Duration::from_secs_f64(self.spec.duration_secs.max(0.0));
        let deadline = Instant::now() + window;
        debug!(fps = self.spec.fps, codec = %self.spec.codec, window_ms = window.as_millis() as u64, "recording started");

        let mut chunks: Vec<EncodedChunk> = Vec::new();
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    stream.finish().await;
                    return Err(LumoError::Cancelled);
                }
                () = tokio::time::sleep_until(deadline) => break,
                chunk = stream.next_chunk() => {
                    match chunk {
                        Some(chunk) => {
                            // A stream that opens but produces nothing
                            // usable means the recording is dead on
                            // arrival; bail before wasting the window.
                            if chunks.is_empty() && chunk.data.is_empty() {
                                stream.finish().await;
                                return Err(LumoError::EmptyRecording);
                            }
                            chunks.push(chunk);
                        }
                        None => break,
                    }
                }
            }
        }

        stream.stop();
        loop {
            match tokio::time::timeout(DRAIN_GRACE, stream.next_chunk()).await {
                Ok(Some(chunk)) => chunks.push(chunk),
                Ok(None) | Err(_) => break,
            }
        }
        stream.finish().await;

        // Playback stays running; pausing again is the preview side's call.

        if chunks.is_empty() {
            return Err(LumoError::EmptyRecording);
        }

        let (width, height) = {
            let guard = surface.lock().expect("surface lock poisoned");
            (guard.width(), guard.height())
        };
        let samples: Vec<Vec<u8>> = chunks.into_iter().map(|chunk| chunk.data).collect();
        let bytes = Mp4Muxer::new(width, height, self.spec.fps, sample_codec).mux(&samples);
        info!(samples = samples.len(), bytes = bytes.len(), "recording muxed");
        Ok(Blob::new(bytes, mime))
    }
}
