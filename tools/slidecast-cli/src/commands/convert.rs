//! Convert a presentation into a timeline project.

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use slidecast_common::config::{AppConfig, CreditSpec, LayoutConfig, WebcamWidth};
use slidecast_common::time::Tick;
use slidecast_render_engine::export::{
    export_presentation, ConversionJob, ConversionProgress, ConversionStage, ProgressCallback,
};

use crate::parse_seconds;

#[derive(Args)]
pub struct ConvertArgs {
    /// Path to the presentation directory
    path: PathBuf,

    /// Project file to write
    output: PathBuf,

    /// Trim start (seconds)
    #[arg(long, value_parser = parse_seconds)]
    start: Option<Tick>,

    /// Trim end (seconds); defaults to the presentation length
    #[arg(long, value_parser = parse_seconds)]
    end: Option<Tick>,

    /// Output width
    #[arg(long)]
    width: Option<u32>,

    /// Output height
    #[arg(long)]
    height: Option<u32>,

    /// Margin around and between the content boxes (pixels)
    #[arg(long)]
    margin: Option<u32>,

    /// Webcam column width as a percentage of the content width
    #[arg(long, conflicts_with = "webcam_width_px")]
    webcam_size: Option<u32>,

    /// Webcam column width in pixels
    #[arg(long)]
    webcam_width_px: Option<u32>,

    /// Stretch the webcam picture from 4:3 to 16:9
    #[arg(long)]
    stretch_webcam: bool,

    /// Image shown behind everything
    #[arg(long)]
    backdrop: Option<PathBuf>,

    /// Opening credit, FILE[:SECONDS]; repeatable
    #[arg(long = "opening-credits", value_name = "FILE[:SECONDS]")]
    opening_credits: Vec<CreditSpec>,

    /// Closing credit, FILE[:SECONDS]; repeatable
    #[arg(long = "closing-credits", value_name = "FILE[:SECONDS]")]
    closing_credits: Vec<CreditSpec>,

    /// Draw whiteboard annotations onto the slides
    #[arg(long)]
    annotations: bool,

    /// Directory for rendered slide images (defaults to the presentation directory)
    #[arg(long)]
    artifact_dir: Option<PathBuf>,
}

pub fn run(args: ConvertArgs, config: &AppConfig) -> anyhow::Result<()> {
    println!("Converting presentation at: {}", args.path.display());

    let defaults = &config.render;
    let layout = LayoutConfig {
        width: args.width.unwrap_or(defaults.width),
        height: args.height.unwrap_or(defaults.height),
        margin: args.margin.unwrap_or(defaults.margin),
        webcam_width: match (args.webcam_width_px, args.webcam_size) {
            (Some(px), _) => WebcamWidth::Pixels(px),
            (None, Some(percent)) => WebcamWidth::Percent(percent),
            (None, None) => defaults.webcam_width,
        },
        stretch_webcam: args.stretch_webcam,
    };
    layout
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid layout: {e}"))?;

    println!("  Output: {}", args.output.display());
    println!("  Resolution: {}x{}", layout.width, layout.height);
    println!(
        "  Annotations: {}",
        if args.annotations { "on" } else { "off" }
    );

    tracing::info!(
        presentation = %args.path.display(),
        output = %args.output.display(),
        annotations = args.annotations,
        "Starting conversion"
    );

    let mut job = ConversionJob::new(&args.path, &args.output, layout);
    job.trim_start = args.start;
    job.trim_end = args.end;
    job.annotations = args.annotations;
    job.opening_credits = args.opening_credits;
    job.closing_credits = args.closing_credits;
    job.backdrop = args.backdrop;
    job.still_credit_duration = defaults
        .still_credit_duration()
        .map_err(|e| anyhow::anyhow!("Invalid config: {e}"))?;
    job.artifact_dir = args.artifact_dir;

    let progress_cb: ProgressCallback = Box::new(|p: ConversionProgress| {
        match p.stage {
            ConversionStage::Slides => {
                print!("\r  Slides: {}/{}  ", p.slides_done + 1, p.slides_total)
            }
            ConversionStage::Saving => print!("\r  Saving project...      "),
            _ => return,
        }
        std::io::stdout().flush().ok();
    });

    let summary = export_presentation(&job, &config.tools, Some(progress_cb)).map_err(|e| {
        println!();
        tracing::error!(error = %e, "Conversion failed");
        anyhow::anyhow!("Conversion failed: {e}")
    })?;

    tracing::info!(
        length = %summary.total_length,
        clips = summary.total_clips,
        "Conversion finished"
    );

    println!();
    println!("Conversion complete: {}", args.output.display());
    println!("  Length: {}", summary.total_length);
    println!(
        "  Slides: {} shown, {} clips ({} rendered)",
        summary.slides_shown, summary.slide_clips, summary.compositions_rendered
    );
    println!(
        "  Webcam: {}",
        if summary.has_webcam { "yes" } else { "no" }
    );
    println!("  Deskshare clips: {}", summary.deskshare_clips);
    println!(
        "  Credits: {} opening, {} closing",
        summary.opening_credits, summary.closing_credits
    );
    println!("  Total clips: {}", summary.total_clips);

    Ok(())
}
