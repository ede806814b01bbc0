//! Project emission.
//!
//! Hands an assembled timeline to a timeline library, layer by layer, and
//! asks it to save the result. Library failures surface unchanged.

use std::path::Path;

use slidecast_common::error::{SlidecastError, SlidecastResult};
use slidecast_common::time::Tick;
use slidecast_project_model::project::{ClipDocument, LayerDocument, OutputFormat, ProjectDocument};
use slidecast_project_model::timeline::{AssembledTimeline, ClipPlacement};

/// Opaque reference to a layer created by a [`TimelineLibrary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerHandle(pub usize);

/// An editing-timeline backend.
pub trait TimelineLibrary {
    /// Create a layer. Priority 0 is drawn on top.
    fn create_layer(&mut self, name: &str, priority: u32) -> SlidecastResult<LayerHandle>;

    fn place_clip(&mut self, layer: LayerHandle, clip: &ClipPlacement) -> SlidecastResult<()>;

    fn set_output_format(&mut self, format: OutputFormat) -> SlidecastResult<()>;

    /// Finalize the project and write it to `path`.
    fn commit_and_save(&mut self, path: &Path) -> SlidecastResult<()>;
}

/// Emit every layer of `timeline`, top-most first, then save.
pub fn emit_project(
    timeline: &AssembledTimeline,
    format: OutputFormat,
    library: &mut dyn TimelineLibrary,
    path: &Path,
) -> SlidecastResult<()> {
    library.set_output_format(format)?;

    for (priority, layer) in timeline.layers.iter().enumerate() {
        let handle = library.create_layer(layer.kind.name(), priority as u32)?;
        for clip in &layer.clips {
            library.place_clip(handle, clip)?;
        }
        tracing::debug!(
            layer = layer.kind.name(),
            clips = layer.clips.len(),
            "Emitted layer"
        );
    }

    library.commit_and_save(path)?;
    tracing::info!(
        path = %path.display(),
        clips = timeline.clip_count(),
        duration = %timeline.total_length,
        "Project saved"
    );
    Ok(())
}

/// Timeline library that writes a [`ProjectDocument`] as JSON.
pub struct JsonProjectLibrary {
    document: ProjectDocument,
}

impl JsonProjectLibrary {
    pub fn new(name: Option<String>) -> Self {
        Self {
            document: ProjectDocument::new(name, OutputFormat::new(Default::default(), None)),
        }
    }

    pub fn document(&self) -> &ProjectDocument {
        &self.document
    }
}

impl TimelineLibrary for JsonProjectLibrary {
    fn create_layer(&mut self, name: &str, priority: u32) -> SlidecastResult<LayerHandle> {
        self.document.layers.push(LayerDocument {
            name: name.to_string(),
            priority,
            clips: vec![],
        });
        Ok(LayerHandle(self.document.layers.len() - 1))
    }

    fn place_clip(&mut self, layer: LayerHandle, clip: &ClipPlacement) -> SlidecastResult<()> {
        if clip.play_duration.is_zero() {
            return Err(SlidecastError::library(format!(
                "zero-length clip of {} at {}",
                clip.asset.display(), clip.timeline_start
            )));
        }
        let target = self
            .document
            .layers
            .get_mut(layer.0)
            .ok_or_else(|| SlidecastError::library(format!("unknown layer {}", layer.0)))?;

        target.clips.push(ClipDocument {
            asset: clip.asset.clone(),
            start: clip.timeline_start,
            inpoint: clip.source_skip,
            duration: clip.play_duration,
            position: clip.position,
        });
        Ok(())
    }

    fn set_output_format(&mut self, format: OutputFormat) -> SlidecastResult<()> {
        if format.width == 0 || format.height == 0 {
            return Err(SlidecastError::library(format!(
                "output format must be non-empty, got {}x{}",
                format.width, format.height
            )));
        }
        self.document.output = format;
        Ok(())
    }

    fn commit_and_save(&mut self, path: &Path) -> SlidecastResult<()> {
        self.document.layers.sort_by_key(|l| l.priority);
        for layer in &mut self.document.layers {
            layer.clips.sort_by_key(|c| c.start);
        }
        self.document.duration = self
            .document
            .layers
            .iter()
            .flat_map(|l| &l.clips)
            .map(|c| c.start + c.duration)
            .max()
            .unwrap_or(Tick::ZERO);

        self.document
            .save(path)
            .map_err(|e| SlidecastError::library(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slidecast_project_model::geometry::{Rect, Size};
    use slidecast_project_model::timeline::{LayerKind, TimelineLayer};
    use std::path::PathBuf;

    fn clip(layer: LayerKind, asset: &str, start: u64, len: u64) -> ClipPlacement {
        ClipPlacement {
            layer,
            asset: PathBuf::from(asset),
            timeline_start: Tick::from_secs(start),
            play_duration: Tick::from_secs(len),
            source_skip: Tick::ZERO,
            position: Rect::new(0, 0, 1920, 1080),
        }
    }

    fn timeline() -> AssembledTimeline {
        AssembledTimeline {
            canvas: Size::new(1920, 1080),
            total_length: Tick::from_secs(20),
            layers: vec![
                TimelineLayer {
                    kind: LayerKind::Slides,
                    clips: vec![
                        clip(LayerKind::Slides, "b.png", 10, 10),
                        clip(LayerKind::Slides, "a.png", 0, 10),
                    ],
                },
                TimelineLayer {
                    kind: LayerKind::Backdrop,
                    clips: vec![clip(LayerKind::Backdrop, "bg.png", 0, 20)],
                },
            ],
        }
    }

    #[test]
    fn test_emit_and_reload_project() {
        let dir = std::env::temp_dir().join("slidecast_test_emit");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("lecture.json");

        let mut library = JsonProjectLibrary::new(Some("Lecture".to_string()));
        let format = OutputFormat::new(Size::new(1920, 1080), None);
        emit_project(&timeline(), format.clone(), &mut library, &path).unwrap();

        let doc = ProjectDocument::load(&path).unwrap();
        assert_eq!(doc.name.as_deref(), Some("Lecture"));
        assert_eq!(doc.output, format);
        assert_eq!(doc.duration, Tick::from_secs(20));
        assert_eq!(doc.layers.len(), 2);
        assert_eq!(doc.layers[0].name, "Slides");
        assert_eq!(doc.layers[0].priority, 0);
        assert_eq!(doc.layers[1].name, "Backdrop");

        let starts: Vec<_> = doc.layers[0].clips.iter().map(|c| c.start).collect();
        assert_eq!(starts, vec![Tick::ZERO, Tick::from_secs(10)]);
        assert_eq!(doc.clip_count(), 3);
    }

    #[test]
    fn test_unknown_layer_is_library_error() {
        let mut library = JsonProjectLibrary::new(None);
        let err = library
            .place_clip(LayerHandle(3), &clip(LayerKind::Slides, "a.png", 0, 1))
            .unwrap_err();
        assert!(matches!(err, SlidecastError::Library { .. }));
    }

    #[test]
    fn test_zero_length_clip_is_rejected() {
        let mut library = JsonProjectLibrary::new(None);
        let layer = library.create_layer("Slides", 0).unwrap();
        assert!(library
            .place_clip(layer, &clip(LayerKind::Slides, "a.png", 0, 0))
            .is_err());
        assert_eq!(library.document().clip_count(), 0);
    }

    #[test]
    fn test_empty_output_format_is_rejected() {
        let mut library = JsonProjectLibrary::new(None);
        assert!(library
            .set_output_format(OutputFormat::new(Size::new(0, 1080), None))
            .is_err());
    }
}
