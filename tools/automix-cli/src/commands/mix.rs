//! Render a crossfaded mix.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use automix_common::config::AppConfig;
use automix_mix_engine::ffmpeg::FfmpegEngine;
use automix_mix_engine::{MixPipeline, PipelineSettings, RenderProgress};
use automix_mix_model::{parse_crossfade_field, MixRequest, Track};

pub async fn run(
    config: &AppConfig,
    files: Vec<PathBuf>,
    crossfade: Option<String>,
    output: PathBuf,
    report: bool,
) -> anyhow::Result<()> {
    let engine = FfmpegEngine::from_config(&config.engine);
    let pipeline = MixPipeline::new(Arc::new(engine), PipelineSettings::from_config(config)?);
    pipeline.ensure_engine_available()?;

    let crossfade = parse_crossfade_field(crossfade.as_deref(), config.mix.crossfade_secs);
    let tracks: Vec<Track> = files.iter().map(Track::from_path).collect();
    let request = MixRequest::new(tracks, crossfade);

    println!("Mixing {} track(s), crossfade {crossfade}s", files.len());
    for (index, file) in files.iter().enumerate() {
        println!("  {index:>2}. {}", file.display());
    }

    let progress_cb: Box<dyn Fn(RenderProgress) + Send> = Box::new(|p| {
        print!(
            "\r  Progress: {:.1}% ({:.0}s rendered, ETA: {:.0}s)  ",
            p.progress * 100.0,
            p.out_time_secs,
            p.eta_secs,
        );
        std::io::stdout().flush().ok();
    });

    let artifact = match pipeline.run_with_progress(request, Some(progress_cb)).await {
        Ok(artifact) => artifact,
        Err(e) => {
            // Details are already in the log; the caller sees the generic response.
            let response = e.to_response();
            println!();
            anyhow::bail!("{} (status {})", response.error, response.status);
        }
    };

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&output, &artifact.bytes)?;

    println!("\nMix complete: {}", output.display());
    println!(
        "  Crossfade: {}s{}",
        artifact.report.resolved_crossfade_secs,
        if artifact.report.clamped {
            " (clamped to shortest track)"
        } else {
            ""
        }
    );
    println!(
        "  Size: {} bytes ({})",
        artifact.bytes.len(),
        artifact.content_type
    );

    if report {
        println!("{}", serde_json::to_string_pretty(&artifact.report)?);
    }

    Ok(())
}
