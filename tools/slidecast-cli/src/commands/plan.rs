//! Print the slice plan of a presentation.

use std::path::PathBuf;

use slidecast_common::time::{Tick, TrimWindow};
use slidecast_processing_core::slice_planner::plan_slide;
use slidecast_project_model::presentation::Presentation;

pub fn run(path: PathBuf, start: Option<Tick>, end: Option<Tick>) -> anyhow::Result<()> {
    let presentation = Presentation::load(&path)
        .map_err(|e| anyhow::anyhow!("Failed to load presentation: {e}"))?;

    let trim = TrimWindow::new(
        start.unwrap_or(Tick::ZERO),
        end.unwrap_or(presentation.length),
        presentation.length,
    )?;

    println!(
        "Presentation: {}",
        presentation.name.as_deref().unwrap_or("(untitled)")
    );
    println!("  Length: {}", presentation.length);
    println!("  Trim: {} .. {}", trim.start, trim.end);
    println!("  Slides: {}", presentation.slides.len());
    println!();

    let mut total = 0;
    for slide in &presentation.slides {
        if slide.is_deskshare_placeholder() {
            println!(
                "{} {} (deskshare placeholder, skipped)",
                slide.id, slide.display
            );
            continue;
        }

        let slices = plan_slide(slide, &trim);
        tracing::debug!(slide = %slide.id, slices = slices.len(), "Planned slide");
        println!(
            "{} {} {} shape edit(s), {} slice(s)",
            slide.id, slide.display, slide.edits.len(), slices.len()
        );
        for slice in &slices {
            let shapes: Vec<&str> = slice.overlays.iter().map(|o| o.shape_id.as_str()).collect();
            if shapes.is_empty() {
                println!("    {}  base", slice.range());
            } else {
                println!("    {}  base + {}", slice.range(), shapes.join(" + "));
            }
        }
        total += slices.len();
    }

    println!();
    println!("Total slide clips: {total}");
    Ok(())
}
