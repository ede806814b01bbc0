//! Timeline assembly: where every clip goes and when.
//!
//! Source times (webcam, slides, deskshare) are shifted so the trim window
//! starts right after the opening credits:
//!
//! ```text
//! | opening credits | trim.start .. trim.end of the recording | closing credits |
//! 0                 O                                         O+T               O+T+C
//! ```
//!
//! `O` grows as opening credits are appended and `C` as closing credits are
//! appended. Everything placed after a credit reads the current `O`, so
//! opening credits must come first.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use slidecast_common::config::LayoutConfig;
use slidecast_common::error::{SlidecastError, SlidecastResult};
use slidecast_common::time::{Tick, TimeRange, TrimWindow};
use slidecast_project_model::geometry::{fit, Alignment, Rect, Size};
use slidecast_project_model::presentation::DeskshareEvent;
use slidecast_project_model::timeline::{AssembledTimeline, ClipPlacement, LayerKind, TimelineLayer};

use crate::assets::AssetInfo;

/// Running state shared by every offset computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentationContext {
    pub presentation_length: Tick,
    pub trim: TrimWindow,
    pub opening_credits_length: Tick,
    pub closing_credits_length: Tick,
    pub canvas: Size,
}

impl PresentationContext {
    pub fn new(presentation_length: Tick, trim: TrimWindow, canvas: Size) -> Self {
        Self {
            presentation_length,
            trim,
            opening_credits_length: Tick::ZERO,
            closing_credits_length: Tick::ZERO,
            canvas,
        }
    }

    /// Opening credits + trimmed recording + closing credits.
    pub fn total_length(&self) -> Tick {
        self.opening_credits_length + self.trim.duration() + self.closing_credits_length
    }

    /// Output timeline position of a source time inside the trim window.
    pub fn to_timeline(&self, source: Tick) -> Tick {
        self.opening_credits_length + (source - self.trim.start)
    }
}

/// Fit boxes for each content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub canvas: Rect,
    pub webcam: Rect,
    pub slides: Rect,
}

impl Layout {
    /// Webcam column on the right of the content area; slides (and
    /// deskshare) fill what is left, separated by the margin.
    pub fn from_config(config: &LayoutConfig) -> Self {
        let margin = config.margin;
        let content_width = config.content_width();
        let content_height = config.content_height();
        let cam_width = content_width.min(config.webcam_width.resolve(content_width));

        Self {
            canvas: Rect::new(0, 0, config.width, config.height),
            webcam: Rect::new(
                (margin + content_width - cam_width) as i32,
                margin as i32,
                cam_width,
                content_height,
            ),
            slides: Rect::new(
                margin as i32,
                margin as i32,
                content_width.saturating_sub(cam_width + margin),
                content_height,
            ),
        }
    }
}

/// Builds clip placements layer by layer.
pub struct TimelineAssembler {
    ctx: PresentationContext,
    layout: Layout,
    stretch_webcam: bool,
    layers: BTreeMap<LayerKind, Vec<ClipPlacement>>,
    deskshare_position: Option<Rect>,
    backdrop: Option<PathBuf>,
    content_placed: bool,
}

impl TimelineAssembler {
    pub fn new(
        config: &LayoutConfig,
        presentation_length: Tick,
        trim: TrimWindow,
    ) -> SlidecastResult<Self> {
        config.validate()?;
        Ok(Self {
            ctx: PresentationContext::new(
                presentation_length,
                trim,
                Size::new(config.width, config.height),
            ),
            layout: Layout::from_config(config),
            stretch_webcam: config.stretch_webcam,
            layers: BTreeMap::new(),
            deskshare_position: None,
            backdrop: None,
            content_placed: false,
        })
    }

    pub fn context(&self) -> &PresentationContext {
        &self.ctx
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    fn push(&mut self, clip: ClipPlacement) -> &ClipPlacement {
        let clips = self.layers.entry(clip.layer).or_default();
        clips.push(clip);
        &clips[clips.len() - 1]
    }

    /// Append an opening credit, shifting everything placed afterwards.
    pub fn add_opening_credit(
        &mut self,
        asset: &Path,
        source_size: Size,
        duration: Tick,
    ) -> SlidecastResult<&ClipPlacement> {
        if self.content_placed {
            return Err(SlidecastError::config(
                "opening credits must be added before any other clip",
            ));
        }
        let position = fit(source_size, self.layout.canvas, Alignment::CENTER, false)?;
        let start = self.ctx.opening_credits_length;
        self.ctx.opening_credits_length += duration;

        Ok(self.push(ClipPlacement {
            layer: LayerKind::Credits,
            asset: asset.to_path_buf(),
            timeline_start: start,
            play_duration: duration,
            source_skip: Tick::ZERO,
            position,
        }))
    }

    /// Append a closing credit after the trimmed recording.
    pub fn add_closing_credit(
        &mut self,
        asset: &Path,
        source_size: Size,
        duration: Tick,
    ) -> SlidecastResult<&ClipPlacement> {
        let position = fit(source_size, self.layout.canvas, Alignment::CENTER, false)?;
        let start = self.ctx.opening_credits_length
            + self.ctx.trim.duration()
            + self.ctx.closing_credits_length;
        self.ctx.closing_credits_length += duration;
        self.content_placed = true;

        Ok(self.push(ClipPlacement {
            layer: LayerKind::Credits,
            asset: asset.to_path_buf(),
            timeline_start: start,
            play_duration: duration,
            source_skip: Tick::ZERO,
            position,
        }))
    }

    /// Place the webcam recording over the whole trim window.
    pub fn add_webcam(&mut self, asset: &AssetInfo) -> SlidecastResult<&ClipPlacement> {
        let mut source = asset.size;
        if self.stretch_webcam {
            source.width = (source.width as u64 * 16 / 12) as u32;
        }
        let position = fit(source, self.layout.webcam, Alignment::TOP_RIGHT, false)?;
        self.content_placed = true;

        Ok(self.push(ClipPlacement {
            layer: LayerKind::Camera,
            asset: asset.path.clone(),
            timeline_start: self.ctx.opening_credits_length,
            play_duration: self.ctx.trim.duration(),
            source_skip: self.ctx.trim.start,
            position,
        }))
    }

    /// Position of a slide with the given native size.
    pub fn slide_position(&self, native: Size) -> SlidecastResult<Rect> {
        Ok(fit(native, self.layout.slides, Alignment::TOP_LEFT, false)?)
    }

    /// Place one planned slice. `range` must already lie inside the trim window.
    pub fn add_slide_slice(
        &mut self,
        asset: &Path,
        position: Rect,
        range: TimeRange,
    ) -> &ClipPlacement {
        debug_assert!(range.start >= self.ctx.trim.start && range.end <= self.ctx.trim.end);
        self.content_placed = true;

        let clip = ClipPlacement {
            layer: LayerKind::Slides,
            asset: asset.to_path_buf(),
            timeline_start: self.ctx.to_timeline(range.start),
            play_duration: range.duration(),
            source_skip: Tick::ZERO,
            position,
        };
        self.push(clip)
    }

    /// Place deskshare events, returning how many were placed.
    ///
    /// Inverted events, events outside the trim window, and events ending
    /// past the recording's duration are skipped.
    pub fn add_deskshare(
        &mut self,
        asset: &AssetInfo,
        events: &[DeskshareEvent],
    ) -> SlidecastResult<usize> {
        let position = match self.deskshare_position {
            Some(position) => position,
            None => {
                let position = fit(asset.size, self.layout.slides, Alignment::TOP_LEFT, false)?;
                self.deskshare_position = Some(position);
                position
            }
        };
        self.content_placed = true;

        let trim = self.ctx.trim.as_range();
        let mut placed = 0;
        for (index, event) in events.iter().enumerate() {
            if event.start >= event.end {
                tracing::warn!(
                    index,
                    start = %event.start,
                    end = %event.end,
                    "Deskshare event ends before it starts, skipping"
                );
                continue;
            }
            if let Some(duration) = asset.duration {
                if event.end > duration {
                    tracing::warn!(
                        index,
                        end = %event.end,
                        duration = %duration,
                        path = %asset.path.display(),
                        "Deskshare event ends after the recording, skipping"
                    );
                    continue;
                }
            }
            let Some(visible) = TimeRange::new(event.start, event.end).intersect(&trim) else {
                tracing::debug!(index, "Deskshare event outside trim window");
                continue;
            };

            let clip = ClipPlacement {
                layer: LayerKind::Deskshare,
                asset: asset.path.clone(),
                timeline_start: self.ctx.to_timeline(visible.start),
                play_duration: visible.duration(),
                source_skip: visible.start,
                position,
            };
            self.push(clip);
            placed += 1;
        }

        Ok(placed)
    }

    /// Backdrop image shown behind everything for the whole timeline.
    /// Placed by [`finish`](Self::finish) once the total length is known.
    pub fn set_backdrop(&mut self, asset: &Path) {
        self.backdrop = Some(asset.to_path_buf());
    }

    /// Close the timeline and return its layers, top-most first.
    pub fn finish(mut self) -> AssembledTimeline {
        let total_length = self.ctx.total_length();

        if let Some(backdrop) = self.backdrop.take() {
            let canvas = self.layout.canvas;
            self.push(ClipPlacement {
                layer: LayerKind::Backdrop,
                asset: backdrop,
                timeline_start: Tick::ZERO,
                play_duration: total_length,
                source_skip: Tick::ZERO,
                position: canvas,
            });
        }

        AssembledTimeline {
            canvas: self.ctx.canvas,
            total_length,
            layers: self
                .layers
                .into_iter()
                .map(|(kind, clips)| TimelineLayer { kind, clips })
                .collect(),
        }
    }
}
