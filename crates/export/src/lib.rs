//! Lumo export pipeline.
//!
//! Turns a live animation surface into downloadable media blobs:
//!
//! ```text
//!                     ┌── Video ──▶ StreamRecorder ──▶ Mp4Muxer ──┐
//! ExportOrchestrator ─┼── Gif ────▶ PaletteCodec ────────────────┼──▶ Blob ──▶ DownloadSink
//!                     └── Image ──▶ still::capture ──────────────┘
//! ```
//!
//! The [`ExportCatalog`] describes the shapes on offer; callers pick an
//! entry, optionally derive a tweaked copy, and hand it to the
//! [`ExportOrchestrator`], which runs one export at a time.

pub mod catalog;
pub mod gif;
pub mod mp4;
pub mod orchestrator;
pub mod recorder;
pub mod sink;
pub mod spec;
pub mod still;

pub use catalog::ExportCatalog;
pub use self::gif::{PaletteCodec, PixelPalette, MAX_PALETTE_COLORS};
pub use mp4::{Mp4Muxer, SampleCodec};
pub use orchestrator::{CancelToken, ExportOrchestrator, ExportPhase};
pub use recorder::StreamRecorder;
pub use sink::{suggested_filename, DirectorySink, DownloadSink};
pub use spec::{Blob, ExportSpec, Format, GifSpec, ImageSpec, VideoSpec};
pub use still::capture as capture_still;
