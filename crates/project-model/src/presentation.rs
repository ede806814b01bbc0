//! Recorded presentation metadata.
//!
//! A presentation directory holds the recorded media plus a
//! `presentation.json` describing slides, their annotation shapes, the
//! deskshare events, and the total length. Times in the file are decimal
//! seconds (JSON strings or numbers); they are converted to [`Tick`]s once,
//! at load time.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use slidecast_common::error::SlidecastError;
use slidecast_common::time::{to_ticks, Tick, TimeParseError, TimeRange};

use crate::geometry::Size;

/// Metadata file name inside a presentation directory.
pub const METADATA_FILE: &str = "presentation.json";

/// Image name the recorder uses for "deskshare is showing" placeholder slides.
const DESKSHARE_PLACEHOLDER: &str = "deskshare.png";

/// A decimal seconds value as written in the metadata file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DecimalSeconds {
    Text(String),
    Number(serde_json::Number),
}

impl DecimalSeconds {
    pub fn as_str(&self) -> Cow<'_, str> {
        match self {
            Self::Text(s) => Cow::Borrowed(s.as_str()),
            Self::Number(n) => Cow::Owned(n.to_string()),
        }
    }

    pub fn is_negative(&self) -> bool {
        self.as_str().trim_start().starts_with('-')
    }

    pub fn to_ticks(&self) -> Result<Tick, TimeParseError> {
        to_ticks(&self.as_str())
    }
}

impl From<&str> for DecimalSeconds {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// On-disk layout of `presentation.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresentationMetadata {
    /// Meeting / recording title.
    #[serde(default)]
    pub name: Option<String>,

    /// Total recording length.
    pub length: DecimalSeconds,

    /// Webcam recording, relative to the presentation directory.
    #[serde(default)]
    pub webcam: Option<PathBuf>,

    #[serde(default)]
    pub deskshare: Option<DeskshareTrackRecord>,

    /// Slides in document order.
    #[serde(default)]
    pub slides: Vec<SlideRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeskshareTrackRecord {
    pub path: PathBuf,

    #[serde(default)]
    pub events: Vec<DeskshareEventRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeskshareEventRecord {
    pub start: DecimalSeconds,
    pub stop: DecimalSeconds,

    /// Reported capture size. Not used for layout: the recorder does not
    /// update it when the shared screen is resized mid-event.
    #[serde(default)]
    pub video_width: Option<u32>,
    #[serde(default)]
    pub video_height: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlideRecord {
    pub id: String,

    /// Slide image, relative to the presentation directory.
    pub image: PathBuf,

    #[serde(rename = "in")]
    pub start: DecimalSeconds,

    #[serde(rename = "out")]
    pub end: DecimalSeconds,

    /// Native image size; also the coordinate space of the shapes.
    pub width: u32,
    pub height: u32,

    #[serde(default)]
    pub shapes: Vec<ShapeRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeRecord {
    pub id: String,
    pub timestamp: DecimalSeconds,

    /// Erase time; absent, zero, or negative means never erased.
    #[serde(default)]
    pub undo: Option<DecimalSeconds>,

    /// SVG fragment drawing this step of the shape.
    pub svg: String,
}

/// One raw annotation draw step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeEdit {
    pub shape_id: String,
    pub start: Tick,

    /// Erase time; [`Tick::ZERO`] means never erased.
    pub undo: Tick,

    /// Renderable SVG content.
    pub content: String,
}

impl ShapeEdit {
    pub fn is_undone(&self) -> bool {
        !self.undo.is_zero()
    }
}

/// A deskshare interval in source time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeskshareEvent {
    pub start: Tick,
    pub end: Tick,
}

/// A slide image shown for one contiguous display window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slide {
    pub id: String,

    /// Absolute path of the slide image.
    pub image: PathBuf,

    pub display: TimeRange,
    pub native_size: Size,
    pub edits: Vec<ShapeEdit>,
}

impl Slide {
    /// Placeholder slides stand in for deskshare and are never shown.
    pub fn is_deskshare_placeholder(&self) -> bool {
        self.image
            .file_name()
            .is_some_and(|name| name == DESKSHARE_PLACEHOLDER)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeskshareSource {
    /// Absolute path of the deskshare recording.
    pub path: PathBuf,
    pub events: Vec<DeskshareEvent>,
}

/// A loaded presentation with all times converted to ticks and all paths
/// resolved against the presentation directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presentation {
    pub root: PathBuf,
    pub name: Option<String>,
    pub length: Tick,
    pub webcam: Option<PathBuf>,
    pub deskshare: Option<DeskshareSource>,
    pub slides: Vec<Slide>,
}

impl Presentation {
    /// Load `presentation.json` from a presentation directory.
    pub fn load(root: impl AsRef<Path>) -> Result<Self, MetadataError> {
        let root = root.as_ref().to_path_buf();
        let path = root.join(METADATA_FILE);

        let json = std::fs::read_to_string(&path).map_err(|e| MetadataError::IoError {
            path: path.clone(),
            source: e,
        })?;
        let metadata: PresentationMetadata =
            serde_json::from_str(&json).map_err(|e| MetadataError::ParseError { path, source: e })?;

        Self::from_metadata(root, metadata)
    }

    /// Convert parsed metadata, resolving paths against `root`.
    pub fn from_metadata(
        root: impl Into<PathBuf>,
        metadata: PresentationMetadata,
    ) -> Result<Self, MetadataError> {
        let root = root.into();

        let length = time_field(&metadata.length, "presentation length")?;

        let webcam = metadata.webcam.map(|p| root.join(p));

        let deskshare = metadata
            .deskshare
            .map(|track| -> Result<DeskshareSource, MetadataError> {
                let events = track
                    .events
                    .iter()
                    .enumerate()
                    .map(|(i, event)| {
                        Ok(DeskshareEvent {
                            start: time_field(&event.start, &format!("deskshare event {i} start"))?,
                            end: time_field(&event.stop, &format!("deskshare event {i} stop"))?,
                        })
                    })
                    .collect::<Result<Vec<_>, MetadataError>>()?;
                Ok(DeskshareSource {
                    path: root.join(track.path),
                    events,
                })
            })
            .transpose()?;

        let slides = metadata
            .slides
            .iter()
            .map(|record| slide_from_record(&root, record))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            root,
            name: metadata.name,
            length,
            webcam,
            deskshare,
            slides,
        })
    }
}

fn slide_from_record(root: &Path, record: &SlideRecord) -> Result<Slide, MetadataError> {
    let ctx = |field: &str| format!("slide {} {field}", record.id);

    if record.width == 0 || record.height == 0 {
        return Err(MetadataError::Invalid {
            message: format!(
                "slide {} has an empty native size {}x{}",
                record.id, record.width, record.height
            ),
        });
    }

    let start = time_field(&record.start, &ctx("in"))?;
    let end = time_field(&record.end, &ctx("out"))?;

    let edits = record
        .shapes
        .iter()
        .map(|shape| {
            let start = time_field(
                &shape.timestamp,
                &ctx(&format!("shape {} timestamp", shape.id)),
            )?;
            let undo = match &shape.undo {
                Some(undo) if !undo.is_negative() => {
                    time_field(undo, &ctx(&format!("shape {} undo", shape.id)))?
                }
                _ => Tick::ZERO,
            };
            Ok(ShapeEdit {
                shape_id: shape.id.clone(),
                start,
                undo,
                content: shape.svg.clone(),
            })
        })
        .collect::<Result<Vec<_>, MetadataError>>()?;

    Ok(Slide {
        id: record.id.clone(),
        image: root.join(&record.image),
        display: TimeRange::new(start, end),
        native_size: Size::new(record.width, record.height),
        edits,
    })
}

fn time_field(value: &DecimalSeconds, context: &str) -> Result<Tick, MetadataError> {
    value.to_ticks().map_err(|source| MetadataError::TimeError {
        context: context.to_string(),
        source,
    })
}

/// Errors that can occur while loading presentation metadata.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Bad time in {context}: {source}")]
    TimeError {
        context: String,
        source: TimeParseError,
    },

    #[error("Invalid presentation: {message}")]
    Invalid { message: String },
}

impl From<MetadataError> for SlidecastError {
    fn from(err: MetadataError) -> Self {
        match err {
            MetadataError::IoError { path, source } => {
                SlidecastError::asset(path, source.to_string())
            }
            other => SlidecastError::parse(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "name": "Weekly sync",
        "length": "120.5",
        "webcam": "video/webcams.webm",
        "deskshare": {
            "path": "deskshare/deskshare.webm",
            "events": [{"start": 30, "stop": "45.25", "video_width": 1280, "video_height": 720}]
        },
        "slides": [
            {
                "id": "image1", "image": "presentation/slide-1.png",
                "in": 0, "out": "60.0", "width": 1600, "height": 1200,
                "shapes": [
                    {"id": "s1", "timestamp": "2.5", "undo": "-1", "svg": "<path d='M0 0'/>"},
                    {"id": "s2", "timestamp": 4, "undo": "8.0005", "svg": "<circle r='3'/>"}
                ]
            },
            {
                "id": "image2", "image": "presentation/deskshare.png",
                "in": "60.0", "out": "120.5", "width": 1280, "height": 720
            }
        ]
    }"#;

    fn sample() -> Presentation {
        let metadata: PresentationMetadata = serde_json::from_str(SAMPLE).unwrap();
        Presentation::from_metadata("/data/rec", metadata).unwrap()
    }

    #[test]
    fn test_load_converts_times_and_paths() {
        let p = sample();
        assert_eq!(p.name.as_deref(), Some("Weekly sync"));
        assert_eq!(p.length, Tick(120_500_000_000));
        assert_eq!(
            p.webcam,
            Some(PathBuf::from("/data/rec/video/webcams.webm"))
        );

        let desk = p.deskshare.unwrap();
        assert_eq!(
            desk.path,
            PathBuf::from("/data/rec/deskshare/deskshare.webm")
        );
        assert_eq!(
            desk.events,
            vec![DeskshareEvent {
                start: Tick::from_secs(30),
                end: Tick(45_250_000_000),
            }]
        );
    }

    #[test]
    fn test_shape_undo_conventions() {
        let p = sample();
        let edits = &p.slides[0].edits;
        assert_eq!(edits[0].undo, Tick::ZERO);
        assert!(!edits[0].is_undone());
        // Tie at the fourth digit rounds to even.
        assert_eq!(edits[1].undo, Tick(8_000_000_000));
        assert_eq!(edits[1].start, Tick::from_secs(4));
    }

    #[test]
    fn test_deskshare_placeholder_detection() {
        let p = sample();
        assert!(!p.slides[0].is_deskshare_placeholder());
        assert!(p.slides[1].is_deskshare_placeholder());
    }

    #[test]
    fn test_bad_time_names_the_field() {
        let json = SAMPLE.replace("\"2.5\"", "\"soon\"");
        let metadata: PresentationMetadata = serde_json::from_str(&json).unwrap();
        let err = Presentation::from_metadata("/data/rec", metadata).unwrap_err();
        let message = err.to_string();
        assert!(
            message.contains("slide image1 shape s1 timestamp"),
            "{message}"
        );
        assert!(matches!(SlidecastError::from(err), SlidecastError::Parse { .. }));
    }

    #[test]
    fn test_empty_native_size_is_invalid() {
        let json = SAMPLE.replace("\"width\": 1600", "\"width\": 0");
        let metadata: PresentationMetadata = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            Presentation::from_metadata("/data/rec", metadata),
            Err(MetadataError::Invalid { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_an_asset_error() {
        let err = Presentation::load("/nonexistent/slidecast").unwrap_err();
        assert!(matches!(SlidecastError::from(err), SlidecastError::Asset { .. }));
    }
}
