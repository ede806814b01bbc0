//! Check external tools.

use slidecast_common::config::AppConfig;
use slidecast_render_engine::assets::FfprobeAssetStore;
use slidecast_render_engine::compositor::{CommandRasterizer, Rasterizer};

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("Slidecast System Check");
    println!("{}", "=".repeat(50));

    let probe_ok = FfprobeAssetStore::new(&config.tools.probe).is_available();
    if probe_ok {
        println!("[OK] Media probe: {}", config.tools.probe);
    } else {
        println!(
            "[MISSING] Media probe: {} (install ffmpeg)",
            config.tools.probe
        );
    }

    let rasterizer = CommandRasterizer::new(&config.tools.rasterizer);
    if rasterizer.is_available() {
        println!("[OK] Rasterizer: {}", rasterizer.name());
    } else {
        println!(
            "[WARN] Rasterizer: {} not found (install librsvg; needed for --annotations)",
            rasterizer.name()
        );
    }

    println!();
    println!(
        "  Canvas: {}x{}, margin {}",
        config.render.width, config.render.height, config.render.margin
    );
    println!("  Webcam width: {:?}", config.render.webcam_width);

    println!();
    if probe_ok {
        println!("All required tools are available. Slidecast is ready.");
    } else {
        println!("Some required tools are missing. See above for fixes.");
    }

    Ok(())
}
