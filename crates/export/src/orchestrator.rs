//! Export orchestration.
//!
//! One export runs at a time. The orchestrator checks its preconditions
//! before touching anything, resizes the surface to the requested
//! export resolution, dispatches to the pipeline named by the spec tag,
//! and restores the previous resolution whether the pipeline succeeded
//! or not.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lumo_common::{LumoError, LumoResult};
use lumo_engine::{AnimationEngine, SurfaceHandle};
use tracing::{error, info};

use crate::gif::PaletteCodec;
use crate::recorder::StreamRecorder;
use crate::spec::{Blob, ExportSpec};
use crate::still;

/// Where a running export currently is. [`ExportPhase::Completed`] and
/// [`ExportPhase::Failed`] are terminal; reaching either hands control
/// back and the orchestrator settles into [`ExportPhase::Idle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportPhase {
    Idle,
    Resizing,
    Capturing,
    Finalizing,
    Completed,
    Failed,
}

/// Cooperative cancellation handle shared between the caller and a
/// running export. Cancelling is sticky.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Resolves once the token has been cancelled.
    pub async fn cancelled(&self) {
        while !self.is_cancelled() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

/// Serialises exports and tracks their lifecycle.
#[derive(Debug)]
pub struct ExportOrchestrator {
    phase: Mutex<ExportPhase>,
    in_flight: AtomicBool,
}

/// Releases the single-flight slot when the export unwinds, returning
/// the lifecycle to idle.
struct FlightSlot<'a>(&'a ExportOrchestrator);

impl Drop for FlightSlot<'_> {
    fn drop(&mut self) {
        self.0.set_phase(ExportPhase::Idle);
        self.0.in_flight.store(false, Ordering::SeqCst);
    }
}

impl ExportOrchestrator {
    pub fn new() -> Self {
        Self {
            phase: Mutex::new(ExportPhase::Idle),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Phase of the running export, or [`ExportPhase::Idle`] between
    /// submissions.
    pub fn phase(&self) -> ExportPhase {
        *self.phase.lock().expect("phase lock poisoned")
    }

    pub fn is_exporting(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn set_phase(&self, phase: ExportPhase) {
        *self.phase.lock().expect("phase lock poisoned") = phase;
    }

    /// Runs one export to completion.
    ///
    /// Fails with [`LumoError::ExportInProgress`] when another export
    /// holds the slot, and with [`LumoError::NoSurface`] or
    /// [`LumoError::NoAnimation`] before any surface mutation when the
    /// preconditions of the requested pipeline do not hold.
    pub async fn submit(
        &self,
        surface: &SurfaceHandle,
        engine: Option<&mut dyn AnimationEngine>,
        spec: &ExportSpec,
        cancel: &CancelToken,
    ) -> LumoResult<Blob> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(LumoError::ExportInProgress);
        }
        let _slot = FlightSlot(self);

        let mime = spec.mime().to_string();
        let result = self.run(surface, engine, spec, cancel).await;
        match &result {
            Ok(blob) => {
                self.set_phase(ExportPhase::Completed);
                info!(mime = %mime, bytes = blob.len(), "export completed");
            }
            Err(e) => {
                self.set_phase(ExportPhase::Failed);
                error!(mime = %mime, error = %e, "export failed");
            }
        }
        result
    }

    async fn run(
        &self,
        surface: &SurfaceHandle,
        mut engine: Option<&mut (dyn AnimationEngine + '_)>,
        spec: &ExportSpec,
        cancel: &CancelToken,
    ) -> LumoResult<Blob> {
        // Preconditions come before any side effect on the surface.
        let (prev_width, prev_height) = {
            let guard = surface.lock().expect("surface lock poisoned");
            if !guard.is_attached() {
                return Err(LumoError::NoSurface);
            }
            (guard.width(), guard.height())
        };
        if matches!(spec, ExportSpec::Gif(_)) && engine.is_none() {
            return Err(LumoError::NoAnimation);
        }

        self.set_phase(ExportPhase::Resizing);
        let (req_width, req_height) = spec.dimensions();
        let (target_width, target_height) = match engine.as_deref() {
            Some(e) => {
                let natural = e.metadata();
                (
                    req_width.unwrap_or(natural.width),
                    req_height.unwrap_or(natural.height),
                )
            }
            None => (
                req_width.unwrap_or(prev_width),
                req_height.unwrap_or(prev_height),
            ),
        };
        let resized = (target_width, target_height) != (prev_width, prev_height);
        if resized {
            apply_size(surface, engine.as_deref_mut(), target_width, target_height);
        }

        self.set_phase(ExportPhase::Capturing);
        let result = match spec {
            ExportSpec::Video(video) => {
                StreamRecorder::new(video)
                    .record(surface, engine.as_deref_mut(), cancel)
                    .await
            }
            ExportSpec::Gif(gif) => match engine.as_deref_mut() {
                Some(e) => PaletteCodec::new(gif).encode(surface, e, cancel).await,
                None => Err(LumoError::NoAnimation),
            },
            ExportSpec::Image(image) => still::capture(surface, image),
        };

        self.set_phase(ExportPhase::Finalizing);
        if resized {
            apply_size(surface, engine.as_deref_mut(), prev_width, prev_height);
        }

        result
    }
}

impl Default for ExportOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

/// Resizes through the engine when one is attached, so the current
/// frame is repainted at the new resolution, and directly otherwise.
fn apply_size(
    surface: &SurfaceHandle,
    engine: Option<&mut (dyn AnimationEngine + '_)>,
    width: u32,
    height: u32,
) {
    match engine {
        Some(engine) => engine.resize(width, height),
        None => {
            let mut guard = surface.lock().expect("surface lock poisoned");
            guard.resize(width, height);
        }
    }
}
