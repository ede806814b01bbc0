use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use slidecast_common::config::{CreditSpec, LayoutConfig, RenderDefaults};
use slidecast_common::error::{SlidecastError, SlidecastResult};
use slidecast_common::time::Tick;
use slidecast_project_model::geometry::{Rect, Size};
use slidecast_project_model::presentation::Presentation;
use slidecast_project_model::project::{AudioCaps, Framerate, OutputFormat, ProjectDocument};
use slidecast_project_model::timeline::ClipPlacement;
use slidecast_render_engine::{
    convert_presentation, AssetInfo, AssetStore, CompositionCache, ConversionJob,
    ConversionProgress, ConversionStage, JsonProjectLibrary, LayerHandle, Rasterizer,
    TimelineLibrary,
};

const WEBCAM_AUDIO: AudioCaps = AudioCaps {
    sample_rate: 48_000,
    channels: 2,
};

fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("fixtures")
        .join("sample-presentation")
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("slidecast_it_{name}"));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("scratch dir should be creatable");
    dir
}

/// Media known by file name.
struct FakeAssets {
    media: HashMap<&'static str, (Size, Option<u64>, bool)>,
}

impl FakeAssets {
    fn new() -> Self {
        let slide = (Size::new(1600, 1200), None, true);
        Self {
            media: HashMap::from([
                ("webcams.webm", (Size::new(640, 480), Some(60), false)),
                ("deskshare.webm", (Size::new(1280, 720), Some(60), false)),
                ("slide-1.png", slide),
                ("slide-2.png", slide),
                ("slide-3.png", slide),
                ("intro.png", (Size::new(1920, 1080), None, true)),
                ("outro.webm", (Size::new(1280, 720), Some(5), false)),
                ("backdrop.png", (Size::new(800, 600), None, true)),
            ]),
        }
    }

    fn without(mut self, name: &str) -> Self {
        self.media.remove(name);
        self
    }
}

impl AssetStore for FakeAssets {
    fn probe(&self, path: &Path) -> SlidecastResult<AssetInfo> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let (size, duration, is_image) = *self
            .media
            .get(name)
            .ok_or_else(|| SlidecastError::asset(path, "file not found"))?;
        Ok(AssetInfo {
            path: path.to_path_buf(),
            size,
            duration: duration.map(Tick::from_secs),
            is_image,
            framerate: (!is_image).then_some(Framerate { num: 30, den: 1 }),
            audio: (name == "webcams.webm").then_some(WEBCAM_AUDIO),
        })
    }
}

#[derive(Default)]
struct RecordingRasterizer {
    svgs: Mutex<Vec<String>>,
    fail: bool,
}

impl Rasterizer for RecordingRasterizer {
    fn rasterize(&self, svg: &str, _size: Size, _output: &Path) -> SlidecastResult<()> {
        if self.fail {
            return Err(SlidecastError::render("rasterizer crashed"));
        }
        self.svgs.lock().unwrap().push(svg.to_string());
        Ok(())
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Library whose save always fails.
struct ReadOnlyLibrary {
    placed: usize,
}

impl TimelineLibrary for ReadOnlyLibrary {
    fn create_layer(&mut self, _name: &str, priority: u32) -> SlidecastResult<LayerHandle> {
        Ok(LayerHandle(priority as usize))
    }

    fn place_clip(&mut self, _layer: LayerHandle, _clip: &ClipPlacement) -> SlidecastResult<()> {
        self.placed += 1;
        Ok(())
    }

    fn set_output_format(&mut self, _format: OutputFormat) -> SlidecastResult<()> {
        Ok(())
    }

    fn commit_and_save(&mut self, path: &Path) -> SlidecastResult<()> {
        Err(SlidecastError::library(format!("{} is read-only", path.display())))
    }
}

fn load() -> Presentation {
    Presentation::load(fixture_dir()).expect("fixture presentation should load")
}

fn job(out: &Path) -> ConversionJob {
    let mut job = ConversionJob::new(
        fixture_dir(),
        out.join("project.json"),
        LayoutConfig::from_defaults(&RenderDefaults::default()),
    );
    job.artifact_dir = Some(out.join("artifacts"));
    job
}

fn cache(out: &Path, rasterizer: RecordingRasterizer) -> CompositionCache<RecordingRasterizer> {
    CompositionCache::new(rasterizer, out.join("artifacts")).reuse_existing(false)
}

fn layer_names(doc: &ProjectDocument) -> Vec<&str> {
    doc.layers.iter().map(|l| l.name.as_str()).collect()
}

#[test]
fn fixture_loads_with_ticks_and_absolute_paths() {
    let presentation = load();
    assert_eq!(presentation.name.as_deref(), Some("Sample Lecture"));
    assert_eq!(presentation.length, Tick::from_secs(60));
    assert_eq!(presentation.slides.len(), 4);
    assert!(presentation.slides[2].is_deskshare_placeholder());
    assert!(presentation.slides[0].image.starts_with(fixture_dir()));

    let edits = &presentation.slides[0].edits;
    assert_eq!(edits.len(), 3);
    assert_eq!(edits[2].start, Tick(9_500_000_000));
    assert!(!edits[1].is_undone());
}

#[test]
fn plain_conversion_with_credits_and_backdrop() {
    let out = scratch_dir("plain");
    let mut job = job(&out);
    job.opening_credits = vec!["intro.png".parse::<CreditSpec>().unwrap()];
    job.closing_credits = vec!["outro.webm".parse::<CreditSpec>().unwrap()];
    job.backdrop = Some(PathBuf::from("backdrop.png"));

    let cache = cache(&out, RecordingRasterizer::default());
    let mut library = JsonProjectLibrary::new(Some("Sample Lecture".to_string()));
    let summary = convert_presentation(
        &job,
        &load(),
        &FakeAssets::new(),
        &cache,
        &mut library,
        None,
    )
    .unwrap();

    assert_eq!(summary.slides_shown, 3);
    assert_eq!(summary.slide_clips, 3);
    assert_eq!(summary.compositions_rendered, 0);
    assert_eq!(summary.deskshare_clips, 1);
    assert_eq!(summary.total_length, Tick::from_secs(68));

    let doc = ProjectDocument::load(&job.output_path).unwrap();
    assert_eq!(
        layer_names(&doc),
        vec!["Credits", "Camera", "Slides", "Deskshare", "Backdrop"]
    );
    assert_eq!(doc.duration, Tick::from_secs(68));
    assert_eq!(doc.output.framerate, Some(Framerate { num: 30, den: 1 }));
    assert_eq!(doc.output.audio, Some(WEBCAM_AUDIO));

    let credits: Vec<_> = doc.layers[0]
        .clips
        .iter()
        .map(|c| (c.start, c.duration))
        .collect();
    assert_eq!(
        credits,
        vec![
            (Tick::ZERO, Tick::from_secs(3)),
            (Tick::from_secs(63), Tick::from_secs(5)),
        ]
    );

    let webcam = &doc.layers[1].clips[0];
    assert_eq!(
        (webcam.start, webcam.inpoint, webcam.duration),
        (Tick::from_secs(3), Tick::ZERO, Tick::from_secs(60))
    );

    let slide_starts: Vec<_> = doc.layers[2].clips.iter().map(|c| c.start).collect();
    assert_eq!(
        slide_starts,
        vec![Tick::from_secs(3), Tick::from_secs(23), Tick::from_secs(53)]
    );
    assert!(doc.layers[2]
        .clips
        .iter()
        .all(|c| c.position == Rect::new(0, 0, 1440, 1080)));

    let desk = &doc.layers[3].clips[0];
    assert_eq!(desk.start, Tick::from_secs(43));
    assert_eq!(desk.inpoint, Tick::from_secs(40));
    assert_eq!(desk.duration, Tick::from_secs(10));

    let backdrop = &doc.layers[4].clips[0];
    assert_eq!(backdrop.duration, Tick::from_secs(68));
    assert_eq!(backdrop.position, Rect::new(0, 0, 1920, 1080));
}

#[test]
fn annotated_conversion_renders_each_composition_once() {
    let out = scratch_dir("annotated");
    let mut job = job(&out);
    job.annotations = true;

    let presentation = load();
    let cache = cache(&out, RecordingRasterizer::default());

    let assets = FakeAssets::new();
    let mut library = JsonProjectLibrary::new(None);
    let first =
        convert_presentation(&job, &presentation, &assets, &cache, &mut library, None).unwrap();

    // image1: bare, draw1, draw1+draw2, draw1+draw2', draw2'. image2 and image3 bare.
    assert_eq!(first.slide_clips, 7);
    assert_eq!(first.compositions_rendered, 7);

    let doc = ProjectDocument::load(&job.output_path).unwrap();
    let slides_at = layer_names(&doc).iter().position(|n| *n == "Slides");
    let slides = &doc.layers[slides_at.unwrap()];
    let spans: Vec<_> = slides
        .clips
        .iter()
        .map(|c| (c.start.0 / 100_000_000, c.duration.0 / 100_000_000))
        .collect();
    assert_eq!(
        spans,
        vec![
            (0, 50),
            (50, 30),
            (80, 15),
            (95, 25),
            (120, 80),
            (200, 200),
            (500, 100),
        ]
    );
    assert!(slides
        .clips
        .iter()
        .all(|c| c.asset.starts_with(out.join("artifacts"))));

    let svgs = cache.rasterizer().svgs.lock().unwrap().clone();
    let stacked = svgs
        .iter()
        .find(|svg| svg.contains("draw1") && svg.contains("width=\"50\""))
        .expect("draw1 and the first draw2 step share a slice");
    assert!(stacked.find("draw1").unwrap() < stacked.find("draw2").unwrap());

    let mut library = JsonProjectLibrary::new(None);
    let second =
        convert_presentation(&job, &presentation, &assets, &cache, &mut library, None).unwrap();
    assert_eq!(second.slide_clips, 7);
    assert_eq!(second.compositions_rendered, 0);
}

#[test]
fn trimmed_annotated_conversion() {
    let out = scratch_dir("trimmed");
    let mut job = job(&out);
    job.annotations = true;
    job.trim_start = Some(Tick::from_secs(10));
    job.trim_end = Some(Tick::from_secs(45));

    let cache = cache(&out, RecordingRasterizer::default());
    let mut library = JsonProjectLibrary::new(None);
    let summary = convert_presentation(
        &job,
        &load(),
        &FakeAssets::new(),
        &cache,
        &mut library,
        None,
    )
    .unwrap();

    assert_eq!(summary.slides_shown, 2);
    assert_eq!(summary.slide_clips, 3);
    assert_eq!(summary.total_length, Tick::from_secs(35));

    let doc = library.document();
    let layer = |name: &str| doc.layers.iter().position(|l| l.name == name).unwrap();
    let desk = &doc.layers[layer("Deskshare")].clips[0];
    assert_eq!(desk.start, Tick::from_secs(30));
    assert_eq!(desk.inpoint, Tick::from_secs(40));
    assert_eq!(desk.duration, Tick::from_secs(5));

    let webcam = &doc.layers[layer("Camera")].clips[0];
    assert_eq!(webcam.inpoint, Tick::from_secs(10));
    assert_eq!(webcam.duration, Tick::from_secs(35));
}

#[test]
fn progress_reports_every_stage_in_order() {
    let out = scratch_dir("progress");
    let job = job(&out);
    let stages = std::sync::Arc::new(Mutex::new(Vec::new()));
    let sink = std::sync::Arc::clone(&stages);
    let callback: slidecast_render_engine::ProgressCallback =
        Box::new(move |p: ConversionProgress| sink.lock().unwrap().push(p.stage));

    let cache = cache(&out, RecordingRasterizer::default());
    let mut library = JsonProjectLibrary::new(None);
    convert_presentation(
        &job,
        &load(),
        &FakeAssets::new(),
        &cache,
        &mut library,
        Some(&callback),
    )
    .unwrap();

    let mut seen = stages.lock().unwrap().clone();
    seen.dedup();
    assert_eq!(
        seen,
        vec![
            ConversionStage::Preparing,
            ConversionStage::Slides,
            ConversionStage::Deskshare,
            ConversionStage::Saving,
            ConversionStage::Complete,
        ]
    );
}

#[test]
fn missing_webcam_is_an_asset_error() {
    let out = scratch_dir("missing_webcam");
    let cache = cache(&out, RecordingRasterizer::default());
    let mut library = JsonProjectLibrary::new(None);
    let err = convert_presentation(
        &job(&out),
        &load(),
        &FakeAssets::new().without("webcams.webm"),
        &cache,
        &mut library,
        None,
    )
    .unwrap_err();

    match err {
        SlidecastError::Asset { path, .. } => assert!(path.ends_with("video/webcams.webm")),
        other => panic!("expected asset error, got {other}"),
    }
    assert!(!job(&out).output_path.exists());
}

#[test]
fn render_failure_names_the_slide() {
    let out = scratch_dir("render_failure");
    let mut job = job(&out);
    job.annotations = true;

    let cache = cache(
        &out,
        RecordingRasterizer {
            fail: true,
            ..Default::default()
        },
    );
    let mut library = JsonProjectLibrary::new(None);
    let err = convert_presentation(
        &job,
        &load(),
        &FakeAssets::new(),
        &cache,
        &mut library,
        None,
    )
    .unwrap_err();

    assert!(matches!(err, SlidecastError::Render { .. }));
    assert!(err.to_string().contains("image1"));
}

#[test]
fn unwritable_artifact_dir_names_the_slide() {
    let out = scratch_dir("unwritable_artifacts");
    let mut job = job(&out);
    job.annotations = true;

    let blocker = out.join("not-a-dir");
    std::fs::write(&blocker, b"").unwrap();
    let cache = CompositionCache::new(RecordingRasterizer::default(), blocker.join("artifacts"))
        .reuse_existing(false);

    let mut library = JsonProjectLibrary::new(None);
    let err = convert_presentation(
        &job,
        &load(),
        &FakeAssets::new(),
        &cache,
        &mut library,
        None,
    )
    .unwrap_err();

    assert!(matches!(err, SlidecastError::Io(_)));
    assert!(err.to_string().contains("slide image1"));
    assert_eq!(cache.render_count(), 0);
}

#[test]
fn library_failure_is_surfaced_unchanged() {
    let out = scratch_dir("library_failure");
    let cache = cache(&out, RecordingRasterizer::default());
    let mut library = ReadOnlyLibrary { placed: 0 };
    let err = convert_presentation(
        &job(&out),
        &load(),
        &FakeAssets::new(),
        &cache,
        &mut library,
        None,
    )
    .unwrap_err();

    assert!(matches!(err, SlidecastError::Library { .. }));
    assert!(err.to_string().contains("read-only"));
    assert_eq!(library.placed, 5);
}
