//! Shape interval reconstruction.
//!
//! A recorded shape is a run of draw steps sharing one id: each step
//! replaces the previous one, and the last step stays visible until it is
//! undone or the slide goes away. This module turns those steps into closed
//! validity intervals for one display window of a slide.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use slidecast_common::time::{Tick, TimeRange};
use slidecast_project_model::presentation::ShapeEdit;

/// A span during which one draw step of a shape is visible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeInterval {
    pub shape_id: String,
    pub valid_from: Tick,
    pub valid_to: Tick,

    /// Stacking key: the first draw time of the shape. Shapes drawn later
    /// stack on top, whatever edits happen afterwards.
    pub z_key: Tick,

    pub content: String,
}

impl ShapeInterval {
    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.valid_from, self.valid_to)
    }
}

/// Build validity intervals for every shape drawn on one slide display.
///
/// Steps that start before the display are pulled forward to its start
/// (a shape carried over from an earlier showing of the same slide). Steps
/// that would start at or after the display end are reported and skipped;
/// zero-length steps are dropped silently.
pub fn build_shape_intervals(
    slide_id: &str,
    edits: &[ShapeEdit],
    window: TimeRange,
) -> Vec<ShapeInterval> {
    let mut by_shape: BTreeMap<&str, Vec<&ShapeEdit>> = BTreeMap::new();
    for edit in edits {
        by_shape
            .entry(edit.shape_id.as_str())
            .or_default()
            .push(edit);
    }

    let mut intervals = Vec::with_capacity(edits.len());

    for (shape_id, mut steps) in by_shape {
        steps.sort_by_key(|e| e.start);
        let z_key = steps[0].start;

        for (i, step) in steps.iter().enumerate() {
            let start = step.start.max(window.start);
            let end = match steps.get(i + 1) {
                Some(next) => next.start.max(window.start),
                None if step.is_undone() => step.undo,
                None => window.end,
            };

            if start >= window.end {
                tracing::warn!(
                    slide = slide_id,
                    shape = shape_id,
                    start = %start,
                    display_end = %window.end,
                    "Shape step starts after its slide is hidden, skipping"
                );
                continue;
            }
            if end <= start {
                tracing::debug!(
                    slide = slide_id,
                    shape = shape_id,
                    start = %start,
                    end = %end,
                    "Dropping empty shape interval"
                );
                continue;
            }

            intervals.push(ShapeInterval {
                shape_id: shape_id.to_string(),
                valid_from: start,
                valid_to: end,
                z_key,
                content: step.content.clone(),
            });
        }
    }

    intervals
}
