//! Slidecast Render Engine
//!
//! Turns a loaded presentation into a saved editing-timeline project.
//! Nothing here encodes video: slides with annotations are flattened into
//! still images, and everything else is referenced in place.
//!
//! # Pipeline Architecture
//!
//! ```text
//! presentation.json ──┐
//!                     ├── Slice Planner (per slide)
//! slide images ───────┘         │
//!                               ├── Composition Cache ── rasterizer
//! webcam / deskshare ───┐       │
//! credits / backdrop ───┴── Timeline Assembler
//!                                   │
//!                                   ▼
//!                           Project Emitter ── timeline library
//!                                   │
//!                                   ▼
//!                             project.json
//! ```

pub mod assembler;
pub mod assets;
pub mod compositor;
pub mod emitter;
pub mod export;

pub use assembler::{Layout, PresentationContext, TimelineAssembler};
pub use assets::{command_exists, AssetInfo, AssetStore, FfprobeAssetStore, SizeSource};
pub use compositor::{ArtifactHandle, CommandRasterizer, Composition, CompositionCache, Rasterizer};
pub use emitter::{emit_project, JsonProjectLibrary, LayerHandle, TimelineLibrary};
pub use export::*;
