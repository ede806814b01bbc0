//! Slidecast Project Model
//!
//! Defines the core data contracts for Slidecast:
//! - **Presentation:** Recorded slides, annotation shape edits, deskshare events
//! - **Geometry:** Pixel sizes, rectangles, and the aspect-preserving fit
//! - **Timeline:** Clip placements grouped by layer
//! - **Project:** The serialized timeline project handed to editors/encoders
//!
//! All times are integer [`Tick`](slidecast_common::time::Tick)s; all
//! positions are output-canvas pixels.

pub mod geometry;
pub mod presentation;
pub mod project;
pub mod timeline;

pub use geometry::*;
pub use presentation::*;
pub use project::*;
pub use timeline::*;
