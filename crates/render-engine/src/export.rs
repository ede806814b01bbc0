//! Conversion jobs: from a presentation directory to a saved project.

use std::path::PathBuf;

use slidecast_common::config::{CreditSpec, ExternalTools, LayoutConfig};
use slidecast_common::error::{SlidecastError, SlidecastResult};
use slidecast_common::time::{Tick, TrimWindow};
use slidecast_processing_core::slice_planner::plan_slide;
use slidecast_project_model::presentation::{Presentation, Slide};
use slidecast_project_model::project::OutputFormat;

use crate::assembler::TimelineAssembler;
use crate::assets::{AssetInfo, AssetStore, FfprobeAssetStore, SizeSource};
use crate::compositor::{CommandRasterizer, Composition, CompositionCache, Rasterizer};
use crate::emitter::{emit_project, JsonProjectLibrary, TimelineLibrary};

/// A conversion ready to run.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    /// Presentation directory containing `presentation.json`.
    pub presentation_dir: PathBuf,

    /// Project file to write.
    pub output_path: PathBuf,

    pub layout: LayoutConfig,

    /// Trim start in source time; defaults to the beginning.
    pub trim_start: Option<Tick>,

    /// Trim end in source time; defaults to the presentation length.
    pub trim_end: Option<Tick>,

    /// Render shape annotations onto slides.
    pub annotations: bool,

    pub opening_credits: Vec<CreditSpec>,
    pub closing_credits: Vec<CreditSpec>,

    /// Image shown behind everything.
    pub backdrop: Option<PathBuf>,

    /// How long a still-image credit without explicit duration is shown.
    pub still_credit_duration: Tick,

    /// Where rendered compositions go; defaults to the presentation directory.
    pub artifact_dir: Option<PathBuf>,
}

impl ConversionJob {
    pub fn new(
        presentation_dir: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        layout: LayoutConfig,
    ) -> Self {
        Self {
            presentation_dir: presentation_dir.into(),
            output_path: output_path.into(),
            layout,
            trim_start: None,
            trim_end: None,
            annotations: false,
            opening_credits: vec![],
            closing_credits: vec![],
            backdrop: None,
            still_credit_duration: Tick::from_secs(3),
            artifact_dir: None,
        }
    }

    /// Resolve the trim window against the presentation length.
    pub fn trim_window(&self, presentation_length: Tick) -> SlidecastResult<TrimWindow> {
        Ok(TrimWindow::new(
            self.trim_start.unwrap_or(Tick::ZERO),
            self.trim_end.unwrap_or(presentation_length),
            presentation_length,
        )?)
    }

    pub fn artifact_dir(&self) -> PathBuf {
        self.artifact_dir
            .clone()
            .unwrap_or_else(|| self.presentation_dir.clone())
    }
}

/// Progress callback for conversions.
pub type ProgressCallback = Box<dyn Fn(ConversionProgress) + Send>;

/// Conversion progress report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionProgress {
    pub stage: ConversionStage,

    /// Slides handled so far.
    pub slides_done: usize,

    pub slides_total: usize,
}

/// Stages of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionStage {
    Preparing,
    Slides,
    Deskshare,
    Saving,
    Complete,
}

/// What a conversion produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionSummary {
    pub opening_credits: usize,
    pub closing_credits: usize,

    /// Slides with at least one visible clip.
    pub slides_shown: usize,

    /// Slide clips placed; one per slice with annotations, one per slide without.
    pub slide_clips: usize,

    /// Rasterizer invocations during this conversion.
    pub compositions_rendered: usize,

    pub deskshare_clips: usize,
    pub has_webcam: bool,
    pub total_length: Tick,
    pub total_clips: usize,
}

/// Convert a loaded presentation with the given collaborators.
pub fn convert_presentation<R: Rasterizer>(
    job: &ConversionJob,
    presentation: &Presentation,
    assets: &dyn AssetStore,
    cache: &CompositionCache<R>,
    library: &mut dyn TimelineLibrary,
    progress: Option<&ProgressCallback>,
) -> SlidecastResult<ConversionSummary> {
    let trim = job.trim_window(presentation.length)?;
    let mut assembler = TimelineAssembler::new(&job.layout, presentation.length, trim)?;
    let mut summary = ConversionSummary::default();
    let renders_before = cache.render_count();

    let report = |stage, slides_done| {
        if let Some(cb) = progress {
            cb(ConversionProgress {
                stage,
                slides_done,
                slides_total: presentation.slides.len(),
            });
        }
    };
    report(ConversionStage::Preparing, 0);

    tracing::info!(
        presentation = %presentation.root.display(),
        length = %presentation.length,
        trim_start = %trim.start,
        trim_end = %trim.end,
        annotations = job.annotations,
        "Starting conversion"
    );

    if let Some(backdrop) = &job.backdrop {
        assets.probe(backdrop)?;
        assembler.set_backdrop(backdrop);
    }

    for credit in &job.opening_credits {
        let info = assets.probe(&credit.path)?;
        let duration = credit_duration(credit, &info, job.still_credit_duration)?;
        assembler.add_opening_credit(&info.path, info.size, duration)?;
        summary.opening_credits += 1;
    }

    let mut framerate = None;
    let mut audio = None;
    match &presentation.webcam {
        Some(webcam) => {
            let info = assets.probe(webcam)?;
            framerate = info.framerate;
            audio = info.audio;
            assembler.add_webcam(&info)?;
            summary.has_webcam = true;
        }
        None => tracing::warn!("Presentation has no webcam recording"),
    }

    for (index, slide) in presentation.slides.iter().enumerate() {
        report(ConversionStage::Slides, index);
        let placed = if job.annotations {
            place_annotated_slide(&mut assembler, slide, &trim, assets, cache)?
        } else {
            place_plain_slide(&mut assembler, slide, &trim, assets)?
        };
        if placed > 0 {
            summary.slides_shown += 1;
            summary.slide_clips += placed;
        }
    }

    report(ConversionStage::Deskshare, presentation.slides.len());
    if let Some(deskshare) = &presentation.deskshare {
        if deskshare.events.is_empty() {
            tracing::debug!("No deskshare events");
        } else {
            let info = assets.probe(&deskshare.path)?;
            summary.deskshare_clips = assembler.add_deskshare(&info, &deskshare.events)?;
        }
    }

    for credit in &job.closing_credits {
        let info = assets.probe(&credit.path)?;
        let duration = credit_duration(credit, &info, job.still_credit_duration)?;
        assembler.add_closing_credit(&info.path, info.size, duration)?;
        summary.closing_credits += 1;
    }

    report(ConversionStage::Saving, presentation.slides.len());
    let timeline = assembler.finish();
    let format = OutputFormat::new(timeline.canvas, framerate).with_audio(audio);
    emit_project(&timeline, format, library, &job.output_path)?;

    summary.compositions_rendered = cache.render_count() - renders_before;
    summary.total_length = timeline.total_length;
    summary.total_clips = timeline.clip_count();
    report(ConversionStage::Complete, presentation.slides.len());

    tracing::info!(
        output = %job.output_path.display(),
        slides = summary.slides_shown,
        clips = summary.total_clips,
        rendered = summary.compositions_rendered,
        length = %summary.total_length,
        "Conversion complete"
    );
    Ok(summary)
}

/// Place one slide as its raw image, one clip for the visible window.
fn place_plain_slide(
    assembler: &mut TimelineAssembler,
    slide: &Slide,
    trim: &TrimWindow,
    assets: &dyn AssetStore,
) -> SlidecastResult<usize> {
    if slide.is_deskshare_placeholder() {
        tracing::debug!(slide = %slide.id, "Skipping deskshare placeholder");
        return Ok(0);
    }
    if slide.display.is_empty() {
        tracing::warn!(
            slide = %slide.id,
            display = %slide.display,
            "Slide has an empty display window, skipping"
        );
        return Ok(0);
    }
    let Some(visible) = slide.display.intersect(&trim.as_range()) else {
        return Ok(0);
    };

    let native = SizeSource::FileReference(&slide.image).resolve(assets)?;
    let position = assembler
        .slide_position(native)
        .map_err(|e| e.with_context(format!("slide {}", slide.id)))?;
    assembler.add_slide_slice(&slide.image, position, visible);
    tracing::debug!(slide = %slide.id, range = %visible, "Placed slide");
    Ok(1)
}

/// Place one slide as rendered compositions, one clip per slice.
fn place_annotated_slide<R: Rasterizer>(
    assembler: &mut TimelineAssembler,
    slide: &Slide,
    trim: &TrimWindow,
    assets: &dyn AssetStore,
    cache: &CompositionCache<R>,
) -> SlidecastResult<usize> {
    if slide.is_deskshare_placeholder() {
        tracing::debug!(slide = %slide.id, "Skipping deskshare placeholder");
        return Ok(0);
    }

    let slices = plan_slide(slide, trim);
    if slices.is_empty() {
        return Ok(0);
    }

    let native = SizeSource::RawSize(slide.native_size).resolve(assets)?;
    let position = assembler
        .slide_position(native)
        .map_err(|e| e.with_context(format!("slide {}", slide.id)))?;

    for slice in &slices {
        let composition = Composition::new(&slide.image, native, &slice.overlays, position.size());
        let artifact = cache
            .get_or_render(&composition)
            .map_err(|e| e.with_context(format!("slide {} at {}", slide.id, slice.begin)))?;
        assembler.add_slide_slice(&artifact.path, position, slice.range());
    }

    tracing::debug!(slide = %slide.id, slices = slices.len(), "Placed annotated slide");
    Ok(slices.len())
}

/// Explicit duration, else the default for stills, else the media's own length.
fn credit_duration(credit: &CreditSpec, info: &AssetInfo, still: Tick) -> SlidecastResult<Tick> {
    let duration = match (credit.duration, info.is_image, info.duration) {
        (Some(explicit), _, _) => explicit,
        (None, true, _) => still,
        (None, false, Some(native)) => native,
        (None, false, None) => {
            return Err(SlidecastError::asset(
                &credit.path,
                "credit has no duration; give one as FILE:SECONDS",
            ))
        }
    };
    if duration.is_zero() {
        return Err(SlidecastError::asset(&credit.path, "credit duration is zero"));
    }
    Ok(duration)
}

/// Convert a presentation directory using the external tools.
///
/// This is the main entry point for conversion.
pub fn export_presentation(
    job: &ConversionJob,
    tools: &ExternalTools,
    progress: Option<ProgressCallback>,
) -> SlidecastResult<ConversionSummary> {
    if !job.presentation_dir.is_dir() {
        return Err(SlidecastError::asset(
            &job.presentation_dir,
            "presentation directory does not exist",
        ));
    }

    let presentation = Presentation::load(&job.presentation_dir)?;

    let assets = FfprobeAssetStore::new(&tools.probe);
    if !assets.is_available() {
        return Err(SlidecastError::config(format!(
            "media probe {:?} not found in PATH",
            tools.probe
        )));
    }

    let rasterizer = CommandRasterizer::new(&tools.rasterizer);
    if job.annotations && !rasterizer.is_available() {
        return Err(SlidecastError::config(format!(
            "rasterizer {:?} not found in PATH (needed for --annotations)",
            tools.rasterizer
        )));
    }
    let cache = CompositionCache::new(rasterizer, job.artifact_dir());
    let mut library = JsonProjectLibrary::new(presentation.name.clone());

    convert_presentation(
        job,
        &presentation,
        &assets,
        &cache,
        &mut library,
        progress.as_ref(),
    )
}
