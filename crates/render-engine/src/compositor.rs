//! Slide compositions and the rendering cache.
//!
//! A composition is a slide image with the shape overlays visible during one
//! slice, flattened into a standalone SVG document and rasterized at the
//! size it will occupy on the canvas. Identical compositions recur often
//! (a slide shown twice, an annotation undone), so rasterized artifacts are
//! cached by content and each distinct composition is rendered once.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use slidecast_common::error::{SlidecastError, SlidecastResult};
use slidecast_processing_core::slice_planner::Overlay;
use slidecast_project_model::geometry::Size;

/// Content identity of a rendered slide state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Composition {
    /// Base slide image.
    pub base: PathBuf,

    /// Native size of the base image; the coordinate space of the overlays.
    pub base_size: Size,

    /// Overlay SVG fragments, bottom-most first.
    pub overlays: Vec<String>,

    /// Raster size to produce.
    pub output_size: Size,
}

impl Composition {
    pub fn new(base: &Path, base_size: Size, overlays: &[Overlay], output_size: Size) -> Self {
        Self {
            base: base.to_path_buf(),
            base_size,
            overlays: overlays.iter().map(|o| o.content.clone()).collect(),
            output_size,
        }
    }

    /// Flatten into an SVG document: the base image first, then each overlay.
    pub fn to_svg(&self) -> String {
        let Size {
            width: bw,
            height: bh,
        } = self.base_size;
        let mut svg = format!(
            r#"<svg version="1.1" xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{}" height="{}" viewBox="0 0 {bw} {bh}">"#,
            self.output_size.width, self.output_size.height
        );
        let _ = write!(
            svg,
            r#"<image x="0" y="0" width="{bw}" height="{bh}" xlink:href="{}"/>"#,
            escape_attr(&file_uri(&self.base))
        );
        for overlay in &self.overlays {
            svg.push_str(overlay);
        }
        svg.push_str("</svg>");
        svg
    }

    /// Stable 64-bit fingerprint of the flattened document and output size.
    pub fn fingerprint(&self) -> u64 {
        let mut hash = fnv1a_64(FNV_OFFSET, self.to_svg().as_bytes());
        hash = fnv1a_64(hash, &self.output_size.width.to_le_bytes());
        fnv1a_64(hash, &self.output_size.height.to_le_bytes())
    }

    /// Artifact file name derived from the fingerprint.
    pub fn artifact_name(&self) -> String {
        format!("slide-{:016x}.png", self.fingerprint())
    }
}

/// A rendered composition on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactHandle {
    pub path: PathBuf,
    pub size: Size,
}

/// External SVG rasterizer.
pub trait Rasterizer: Send + Sync {
    /// Rasterize `svg` at `size` into a PNG at `output`.
    fn rasterize(&self, svg: &str, size: Size, output: &Path) -> SlidecastResult<()>;

    /// Check if this rasterizer is available on the system.
    fn is_available(&self) -> bool;

    /// Rasterizer name.
    fn name(&self) -> &str;
}

/// Rasterizer that runs an `rsvg-convert` compatible command.
///
/// The SVG is written next to the output (image references are resolved
/// relative to the document) and removed once the raster exists.
pub struct CommandRasterizer {
    command: String,
}

impl CommandRasterizer {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Rasterizer for CommandRasterizer {
    fn rasterize(&self, svg: &str, size: Size, output: &Path) -> SlidecastResult<()> {
        let svg_path = output.with_extension("svg");
        std::fs::write(&svg_path, svg)?;

        let result = Command::new(&self.command)
            .arg("-w")
            .arg(size.width.to_string())
            .arg("-h")
            .arg(size.height.to_string())
            .arg("-o")
            .arg(output)
            .arg(&svg_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output();

        let output_result = match result {
            Ok(out) if out.status.success() => Ok(()),
            Ok(out) => Err(SlidecastError::render(format!(
                "{} exited with {}: {}",
                self.command, out.status, String::from_utf8_lossy(&out.stderr).trim()
            ))),
            Err(e) => Err(SlidecastError::render(format!("failed to run {}: {e}", self.command))),
        };

        if output_result.is_ok() {
            std::fs::remove_file(&svg_path).ok();
        }
        output_result
    }

    fn is_available(&self) -> bool {
        crate::assets::command_exists(&self.command)
    }

    fn name(&self) -> &str {
        &self.command
    }
}

type Slot = Arc<Mutex<Option<ArtifactHandle>>>;

/// Process-wide cache from composition to rendered artifact.
///
/// Lookups may come from several threads: the map lock is held only to find
/// the per-composition slot, and the slot lock is held across rendering, so
/// concurrent misses on one composition render it exactly once.
pub struct CompositionCache<R: Rasterizer> {
    rasterizer: R,
    artifact_dir: PathBuf,
    reuse_existing: bool,
    slots: Mutex<HashMap<Composition, Slot>>,
    renders: AtomicUsize,
}

impl<R: Rasterizer> CompositionCache<R> {
    pub fn new(rasterizer: R, artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            rasterizer,
            artifact_dir: artifact_dir.into(),
            reuse_existing: true,
            slots: Mutex::new(HashMap::new()),
            renders: AtomicUsize::new(0),
        }
    }

    /// Whether an artifact already on disk under the composition's name is
    /// reused instead of rendered again.
    pub fn reuse_existing(mut self, reuse: bool) -> Self {
        self.reuse_existing = reuse;
        self
    }

    pub fn rasterizer(&self) -> &R {
        &self.rasterizer
    }

    /// Number of rasterizer invocations so far.
    pub fn render_count(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    /// Number of distinct compositions seen.
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the artifact for `composition`, rendering it on first use.
    pub fn get_or_render(&self, composition: &Composition) -> SlidecastResult<ArtifactHandle> {
        if composition.output_size.is_empty() {
            return Err(SlidecastError::geometry(format!(
                "cannot render {} at {}x{}",
                composition.base.display(),
                composition.output_size.width,
                composition.output_size.height
            )));
        }

        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(composition.clone()).or_default())
        };

        let mut entry = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = entry.as_ref() {
            return Ok(handle.clone());
        }

        let path = self.artifact_dir.join(composition.artifact_name());
        if self.reuse_existing && path.exists() {
            tracing::debug!(path = %path.display(), "Reusing rendered composition");
        } else {
            std::fs::create_dir_all(&self.artifact_dir)?;
            tracing::debug!(
                base = %composition.base.display(),
                overlays = composition.overlays.len(),
                path = %path.display(),
                rasterizer = self.rasterizer.name(),
                "Rendering composition"
            );
            self.rasterizer
                .rasterize(&composition.to_svg(), composition.output_size, &path)?;
            self.renders.fetch_add(1, Ordering::SeqCst);
        }

        let handle = ArtifactHandle {
            path,
            size: composition.output_size,
        };
        *entry = Some(handle.clone());
        Ok(handle)
    }
}

const FNV_OFFSET: u64 = 0xcbf29ce484222325;

fn fnv1a_64(mut hash: u64, bytes: &[u8]) -> u64 {
    for byte in bytes {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

fn file_uri(path: &Path) -> String {
    let absolute = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    format!("file://{}", absolute.display())
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
