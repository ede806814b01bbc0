//! Slice planning: from overlapping shape intervals to static slices.
//!
//! # Algorithm
//!
//! 1. **Clip** the slide's display window to the trim window; nothing is
//!    planned for slides entirely outside it.
//! 2. **Clip** every shape interval to the same range, dropping empties.
//! 3. **Sweep** the sorted union of all interval boundaries, toggling shapes
//!    on at their start and off at their end. Each gap between consecutive
//!    boundaries is internally static.
//! 4. **Coalesce** neighbouring gaps whose layer stacks are identical.
//!
//! Layers within a slice are ordered by `(z_key, shape_id, content)`, so the
//! plan does not depend on input order. The base slide image is implicit and
//! always sits below the overlays.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use slidecast_common::time::{Tick, TimeRange, TrimWindow};
use slidecast_project_model::presentation::Slide;

use crate::shape_intervals::{build_shape_intervals, ShapeInterval};

/// One shape layer drawn over the slide image.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Overlay {
    pub z_key: Tick,
    pub shape_id: String,
    pub content: String,
}

impl From<&ShapeInterval> for Overlay {
    fn from(interval: &ShapeInterval) -> Self {
        Self {
            z_key: interval.z_key,
            shape_id: interval.shape_id.clone(),
            content: interval.content.clone(),
        }
    }
}

/// A maximal span of a slide display with a constant set of visible layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slice {
    pub begin: Tick,
    pub end: Tick,

    /// Shape layers above the base image, bottom-most first.
    pub overlays: Vec<Overlay>,
}

impl Slice {
    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.begin, self.end)
    }

    pub fn duration(&self) -> Tick {
        self.end - self.begin
    }

    /// Whether only the base image is visible.
    pub fn is_bare(&self) -> bool {
        self.overlays.is_empty()
    }
}

/// Plan the slices of one slide display.
pub fn plan_slices(
    display: TimeRange,
    intervals: &[ShapeInterval],
    trim: &TrimWindow,
) -> Vec<Slice> {
    let Some(visible) = display.intersect(&trim.as_range()) else {
        return vec![];
    };

    let mut clipped: Vec<(Overlay, TimeRange)> = intervals
        .iter()
        .filter_map(|iv| {
            let range = iv.range().intersect(&visible)?;
            Some((Overlay::from(iv), range))
        })
        .collect();

    if clipped.is_empty() {
        return vec![Slice {
            begin: visible.start,
            end: visible.end,
            overlays: vec![],
        }];
    }

    // Ranking by overlay order lets the active set iterate bottom-up.
    clipped.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.start.cmp(&b.1.start)));

    let mut toggles: BTreeMap<Tick, Vec<(usize, bool)>> = BTreeMap::new();
    toggles.entry(visible.start).or_default();
    toggles.entry(visible.end).or_default();
    for (rank, (_, range)) in clipped.iter().enumerate() {
        toggles.entry(range.start).or_default().push((rank, true));
        toggles.entry(range.end).or_default().push((rank, false));
    }

    let mut slices: Vec<Slice> = vec![];
    let mut active: BTreeSet<usize> = BTreeSet::new();
    let mut points = toggles.into_iter().peekable();

    while let Some((at, changes)) = points.next() {
        for (rank, on) in changes {
            if on {
                active.insert(rank);
            } else {
                active.remove(&rank);
            }
        }

        let Some(&(next, _)) = points.peek() else {
            break;
        };

        let mut overlays: Vec<Overlay> = active.iter().map(|&r| clipped[r].0.clone()).collect();
        overlays.dedup();

        match slices.last_mut() {
            Some(last) if last.overlays == overlays => last.end = next,
            _ => slices.push(Slice {
                begin: at,
                end: next,
                overlays,
            }),
        }
    }

    slices
}

/// Build shape intervals for a slide and plan its slices in one step.
pub fn plan_slide(slide: &Slide, trim: &TrimWindow) -> Vec<Slice> {
    if slide.display.is_empty() {
        tracing::warn!(
            slide = %slide.id,
            display = %slide.display,
            "Slide has an empty display window, skipping"
        );
        return vec![];
    }
    let intervals = build_shape_intervals(&slide.id, &slide.edits, slide.display);
    plan_slices(slide.display, &intervals, trim)
}
