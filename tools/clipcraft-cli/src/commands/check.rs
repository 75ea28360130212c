//! Check that the external media tools are available.

use clipcraft_common::config::SettingsStore;
use clipcraft_render_engine::{FfmpegEncoder, FfprobeProber};

pub fn run(store: &SettingsStore) -> anyhow::Result<()> {
    println!("ClipCraft System Check");
    println!("{}", "=".repeat(50));

    let mut all_ok = true;
    let encoder = FfmpegEncoder::new();
    let prober = FfprobeProber::new();
    for tool in [encoder.tool(), prober.tool()] {
        let name = tool.program().display();
        if tool.is_available() {
            println!("[OK] {name} found");
        } else {
            println!("[MISSING] {name} not found on PATH");
            all_ok = false;
        }
    }

    let config = store.path();
    if config.exists() {
        println!("[OK] Config: {}", config.display());
    } else {
        println!("[WARN] Config not found: {}", config.display());
    }

    println!();
    if all_ok {
        println!("All required tools are available. ClipCraft is ready.");
    } else {
        println!("Install ffmpeg (which provides ffprobe) and try again.");
    }

    Ok(())
}
