//! Serialized timeline project.
//!
//! A project document is what the JSON timeline library writes: output
//! format, encoding profile, and every layer with its clips. Editors and
//! encoders downstream read this file; Slidecast never renders video itself.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use slidecast_common::time::Tick;

use crate::geometry::{Rect, Size};

/// Current document schema version.
pub const PROJECT_VERSION: &str = "1.0";

/// Top-level project file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectDocument {
    /// Schema version.
    pub version: String,

    /// Human-readable project name.
    pub name: Option<String>,

    /// Creation timestamp (RFC 3339).
    pub created_at: String,

    /// Output caps and encoding profile.
    pub output: OutputFormat,

    /// Total timeline length.
    pub duration: Tick,

    /// Layers, top-most first.
    pub layers: Vec<LayerDocument>,
}

/// Output restriction caps and encoding profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputFormat {
    pub width: u32,
    pub height: u32,

    /// Frame rate as a fraction, taken from the webcam when known.
    #[serde(default)]
    pub framerate: Option<Framerate>,

    /// Audio track restriction, taken from the webcam's audio stream.
    #[serde(default)]
    pub audio: Option<AudioCaps>,

    pub encoding: EncodingProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Framerate {
    pub num: u32,
    pub den: u32,
}

/// Sample rate and channel count of the audio track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioCaps {
    pub sample_rate: u32,
    pub channels: u32,
}

/// Container and codec choices for the final render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingProfile {
    pub name: String,
    pub container: String,
    pub video_codec: String,
    pub audio_codec: String,
}

impl Default for EncodingProfile {
    fn default() -> Self {
        Self {
            name: "slidecast encoding profile".to_string(),
            container: "video/quicktime,variant=iso".to_string(),
            video_codec: "video/x-h264,profile=high".to_string(),
            audio_codec: "audio/mpeg,mpegversion=4,base-profile=lc".to_string(),
        }
    }
}

impl OutputFormat {
    pub fn new(canvas: Size, framerate: Option<Framerate>) -> Self {
        Self {
            width: canvas.width,
            height: canvas.height,
            framerate,
            audio: None,
            encoding: EncodingProfile::default(),
        }
    }

    pub fn with_audio(mut self, audio: Option<AudioCaps>) -> Self {
        self.audio = audio;
        self
    }
}

/// One named layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerDocument {
    pub name: String,

    /// Stacking priority; 0 is on top.
    pub priority: u32,

    pub clips: Vec<ClipDocument>,
}

/// One clip on a layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipDocument {
    pub asset: PathBuf,
    pub start: Tick,
    pub inpoint: Tick,
    pub duration: Tick,
    pub position: Rect,
}

impl ProjectDocument {
    /// Create an empty project stamped with the current time.
    pub fn new(name: Option<String>, output: OutputFormat) -> Self {
        Self {
            version: PROJECT_VERSION.to_string(),
            name,
            created_at: chrono::Utc::now().to_rfc3339(),
            output,
            duration: Tick::ZERO,
            layers: vec![],
        }
    }

    /// Load a project file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ProjectError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&json).map_err(|e| ProjectError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Write the project file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ProjectError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ProjectError::IoError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| ProjectError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        std::fs::write(path, json).map_err(|e| ProjectError::IoError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn clip_count(&self) -> usize {
        self.layers.iter().map(|l| l.clips.len()).sum()
    }
}

/// Errors that can occur when reading or writing project files.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
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
}
