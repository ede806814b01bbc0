//! Timeline placement types.
//!
//! The assembler turns a presentation into [`ClipPlacement`]s grouped by
//! [`LayerKind`]; the project emitter forwards them to a timeline library.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use slidecast_common::time::Tick;

use crate::geometry::{Rect, Size};

/// Named timeline layers, top-most first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    Credits,
    Camera,
    Slides,
    Deskshare,
    Backdrop,
}

impl LayerKind {
    /// All layers in stacking order, top-most first.
    pub const ALL: [LayerKind; 5] = [
        LayerKind::Credits,
        LayerKind::Camera,
        LayerKind::Slides,
        LayerKind::Deskshare,
        LayerKind::Backdrop,
    ];

    /// Human-readable layer name stored in the project.
    pub fn name(self) -> &'static str {
        match self {
            Self::Credits => "Credits",
            Self::Camera => "Camera",
            Self::Slides => "Slides",
            Self::Deskshare => "Deskshare",
            Self::Backdrop => "Backdrop",
        }
    }
}

/// One visible media fragment on the timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipPlacement {
    pub layer: LayerKind,

    /// Media file shown by this clip.
    pub asset: PathBuf,

    /// Where the clip starts on the output timeline.
    pub timeline_start: Tick,

    /// How long the clip plays.
    pub play_duration: Tick,

    /// How far into the source media playback begins.
    pub source_skip: Tick,

    /// Position and size on the output canvas.
    pub position: Rect,
}

impl ClipPlacement {
    pub fn timeline_end(&self) -> Tick {
        self.timeline_start + self.play_duration
    }
}

/// Clips of one layer, in placement order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineLayer {
    pub kind: LayerKind,
    pub clips: Vec<ClipPlacement>,
}

/// The finished timeline handed to the project emitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssembledTimeline {
    pub canvas: Size,
    pub total_length: Tick,

    /// Only layers that received clips, top-most first.
    pub layers: Vec<TimelineLayer>,
}

impl AssembledTimeline {
    pub fn layer(&self, kind: LayerKind) -> Option<&TimelineLayer> {
        self.layers.iter().find(|l| l.kind == kind)
    }

    pub fn clip_count(&self) -> usize {
        self.layers.iter().map(|l| l.clips.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_order_is_top_most_first() {
        let mut kinds = LayerKind::ALL.to_vec();
        kinds.sort();
        assert_eq!(kinds, LayerKind::ALL.to_vec());
        assert_eq!(LayerKind::Camera.name(), "Camera");
    }

    #[test]
    fn test_clip_end() {
        let clip = ClipPlacement {
            layer: LayerKind::Slides,
            asset: PathBuf::from("a.png"),
            timeline_start: Tick(100),
            play_duration: Tick(50),
            source_skip: Tick::ZERO,
            position: Rect::new(0, 0, 10, 10),
        };
        assert_eq!(clip.timeline_end(), Tick(150));
    }
}
