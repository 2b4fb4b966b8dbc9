//! Show the crossfade plan for a set of tracks.

use std::path::PathBuf;
use std::sync::Arc;

use automix_common::config::AppConfig;
use automix_mix_engine::ffmpeg::FfmpegEngine;
use automix_mix_engine::{MixPipeline, PipelineSettings};
use automix_mix_model::parse_crossfade_field;

pub async fn run(
    config: &AppConfig,
    files: Vec<PathBuf>,
    crossfade: Option<String>,
) -> anyhow::Result<()> {
    let engine = Arc::new(FfmpegEngine::from_config(&config.engine));
    let pipeline = MixPipeline::new(engine, PipelineSettings::from_config(config)?);
    let requested = parse_crossfade_field(crossfade.as_deref(), config.mix.crossfade_secs);

    let plan = pipeline.plan(&files, requested).await?;

    println!("Tracks:");
    for (index, file) in files.iter().enumerate() {
        println!(
            "  {index:>2}. {} ({:.1}s)",
            file.display(),
            plan.durations.get(index).unwrap_or(0.0)
        );
    }
    println!();
    println!("  Requested crossfade: {}s", plan.crossfade.requested_secs);
    println!(
        "  Resolved crossfade:  {}s{}",
        plan.crossfade.resolved_secs,
        if plan.crossfade.clamped {
            format!(" (clamped, shortest track {:.1}s)", plan.crossfade.shortest_secs)
        } else {
            String::new()
        }
    );
    println!("  Expected length:     {:.1}s", plan.expected_duration_secs);
    println!();
    println!("Filter graph:");
    for step in plan.graph.steps() {
        println!("  {}", step.to_filter());
    }

    Ok(())
}
