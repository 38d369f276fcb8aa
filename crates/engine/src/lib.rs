//! Lumo Animation Engine Boundary
//!
//! The export pipeline treats the animation playback engine as a black box:
//! it receives an [`AnimationEngine`] handle plus a readable
//! [`RasterSurface`] the engine draws into, and never constructs animation
//! content itself. This crate defines that boundary:
//!
//! ```text
//! asset.json ──▶ AnimationAsset (header parse)
//!                      │
//!                      ▼
//!               AnimationEngine ──draws──▶ RasterSurface
//!                (seek/play/speed)          │        │
//!                                     read_rgba   open_stream
//!                                    (GIF/still)  (video chunks)
//! ```
//!
//! [`ScriptedEngine`] is the in-process software engine used by tests and
//! demos; production callers wrap their own renderer in the same trait.

pub mod animation;
pub mod ingest;
pub mod stream;
pub mod surface;

pub use animation::{AnimationEngine, AnimationMetadata, ScriptedEngine};
pub use ingest::{read_asset, AnimationAsset};
pub use stream::{open_stream, ChunkStream, EncodedChunk, StreamFormat};
pub use surface::{shared_surface, RasterSurface, SurfaceFault, SurfaceHandle};
