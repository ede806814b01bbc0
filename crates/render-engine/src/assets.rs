//! Source asset lookup.
//!
//! Every media file the timeline references is probed once for its native
//! size and duration. The default store shells out to `ffprobe`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Mutex, PoisonError};

use serde::Deserialize;
use slidecast_common::error::{SlidecastError, SlidecastResult};
use slidecast_common::time::{to_ticks, Tick};
use slidecast_project_model::geometry::Size;
use slidecast_project_model::project::{AudioCaps, Framerate};

use crate::compositor::ArtifactHandle;

/// What the timeline needs to know about a media file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetInfo {
    pub path: PathBuf,
    pub size: Size,

    /// Native duration; `None` for still images.
    pub duration: Option<Tick>,

    pub is_image: bool,
    pub framerate: Option<Framerate>,

    /// Caps of the first audio stream, if any.
    pub audio: Option<AudioCaps>,
}

/// Resolves media files to their properties.
pub trait AssetStore {
    /// Probe a file. A missing or unreadable file is an [`SlidecastError::Asset`].
    fn probe(&self, path: &Path) -> SlidecastResult<AssetInfo>;
}

/// Where a layout size comes from, resolved once at the call boundary.
#[derive(Debug, Clone, Copy)]
pub enum SizeSource<'a> {
    /// A media file on disk, probed through the asset store.
    FileReference(&'a Path),
    /// A composition already rendered by the cache.
    Artifact(&'a ArtifactHandle),
    /// A size known from metadata.
    RawSize(Size),
}

impl SizeSource<'_> {
    pub fn resolve(&self, assets: &dyn AssetStore) -> SlidecastResult<Size> {
        match self {
            Self::FileReference(path) => Ok(assets.probe(path)?.size),
            Self::Artifact(handle) => Ok(handle.size),
            Self::RawSize(size) => Ok(*size),
        }
    }
}

/// Asset store backed by `ffprobe`, caching one probe per path.
pub struct FfprobeAssetStore {
    command: String,
    cache: Mutex<HashMap<PathBuf, AssetInfo>>,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    format_name: Option<String>,
    duration: Option<String>,
}

impl FfprobeAssetStore {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_available(&self) -> bool {
        command_exists(&self.command)
    }

    fn run_probe(&self, path: &Path) -> SlidecastResult<AssetInfo> {
        let output = Command::new(&self.command)
            .args([
                "-v",
                "error",
                "-show_entries",
                "stream=codec_type,width,height,r_frame_rate,sample_rate,channels\
                 :format=format_name,duration",
                "-of",
                "json",
            ])
            .arg(path)
            .output()
            .map_err(|e| {
                SlidecastError::asset(path, format!("failed to run {}: {e}", self.command))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SlidecastError::asset(
                path,
                format!("{} failed: {}", self.command, stderr.trim()),
            ));
        }

        let parsed: ProbeOutput = serde_json::from_slice(&output.stdout)
            .map_err(|e| SlidecastError::asset(path, format!("unreadable probe output: {e}")))?;
        parse_probe(path, parsed)
    }
}

impl AssetStore for FfprobeAssetStore {
    fn probe(&self, path: &Path) -> SlidecastResult<AssetInfo> {
        if let Some(info) = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
        {
            return Ok(info.clone());
        }

        if !path.exists() {
            return Err(SlidecastError::asset(path, "file not found"));
        }

        let info = self.run_probe(path)?;
        tracing::debug!(
            path = %path.display(),
            width = info.size.width,
            height = info.size.height,
            duration = ?info.duration,
            image = info.is_image,
            "Probed asset"
        );
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_path_buf(), info.clone());
        Ok(info)
    }
}

fn parse_probe(path: &Path, probe: ProbeOutput) -> SlidecastResult<AssetInfo> {
    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| SlidecastError::asset(path, "no video stream"))?;

    let size = match (video.width, video.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => Size::new(w, h),
        _ => return Err(SlidecastError::asset(path, "video stream has no size")),
    };

    let format_name = probe
        .format
        .as_ref()
        .and_then(|f| f.format_name.as_deref())
        .unwrap_or_default();
    let is_image = format_name == "image2" || format_name.ends_with("_pipe");

    let duration = if is_image {
        None
    } else {
        probe
            .format
            .as_ref()
            .and_then(|f| f.duration.as_deref())
            .filter(|d| *d != "N/A")
            .map(to_ticks)
            .transpose()
            .map_err(|e| SlidecastError::asset(path, format!("bad duration: {e}")))?
    };

    let framerate = video
        .r_frame_rate
        .as_deref()
        .and_then(|r| r.split_once('/'))
        .and_then(|(n, d)| Some((n.parse::<u32>().ok()?, d.parse::<u32>().ok()?)))
        .filter(|&(n, d)| n > 0 && d > 0)
        .map(|(num, den)| Framerate { num, den });

    let audio = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"))
        .and_then(|a| {
            let sample_rate = a.sample_rate.as_deref()?.parse::<u32>().ok()?;
            let channels = a.channels?;
            (sample_rate > 0 && channels > 0).then_some(AudioCaps {
                sample_rate,
                channels,
            })
        });

    Ok(AssetInfo {
        path: path.to_path_buf(),
        size,
        duration,
        is_image,
        framerate: if is_image { None } else { framerate },
        audio: if is_image { None } else { audio },
    })
}

/// Whether `binary` is an executable path or resolves on `PATH`.
pub fn command_exists(binary: &str) -> bool {
    if binary.is_empty() {
        return false;
    }
    if binary.contains(std::path::MAIN_SEPARATOR) {
        return is_executable(Path::new(binary));
    }
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| is_executable(&dir.join(binary))))
        .unwrap_or(false)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}
