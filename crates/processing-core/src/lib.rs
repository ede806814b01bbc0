//! Slidecast Processing Core
//!
//! Reconstructs what is visible on each slide over time:
//! - **Shape Intervals:** Turn raw annotation draw steps into validity intervals
//! - **Slice Planning:** Split overlapping intervals into maximal static slices,
//!   clipped to the trim window
//!
//! This crate is pure computation: no I/O and no rendering.
//! All inputs are data; all outputs are data.

pub mod shape_intervals;
pub mod slice_planner;

pub use shape_intervals::{build_shape_intervals, ShapeInterval};
pub use slice_planner::{plan_slices, plan_slide, Overlay, Slice};
