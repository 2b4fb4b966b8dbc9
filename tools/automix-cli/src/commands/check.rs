//! Check that the audio engine is usable.

use automix_common::config::AppConfig;
use automix_mix_engine::ffmpeg::FfmpegEngine;
use automix_mix_engine::{ensure_available, AudioEngine};

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("Automix System Check");
    println!("{}", "=".repeat(50));

    let engine = FfmpegEngine::from_config(&config.engine);
    println!("  ffmpeg:  {}", engine.ffmpeg_path().display());
    println!("  ffprobe: {}", engine.ffprobe_path().display());
    println!(
        "  Workspace root: {}",
        config.mix.resolved_workspace_root().display()
    );
    println!();

    match ensure_available(&engine) {
        Ok(()) => {
            println!("[OK] Audio engine: {}", engine.name());
            println!("\nAutomix is ready.");
            Ok(())
        }
        Err(e) => {
            println!("[FAIL] ffmpeg/ffprobe could not be executed.");
            println!("       Install ffmpeg or set FFMPEG_PATH / FFPROBE_PATH.");
            Err(e.into())
        }
    }
}
