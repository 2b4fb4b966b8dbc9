//! Render executor: hands the graph to the engine and waits for it.

use std::path::PathBuf;
use std::sync::Arc;

use automix_common::error::{AutomixError, AutomixResult};
use automix_mix_model::CrossfadeGraph;

use crate::engine::{AudioEngine, ProgressCallback, RenderJob};

/// Render `graph` over `inputs` into `output_path`.
///
/// `inputs[k]` is registered as engine input `k`, matching the graph's
/// input labels. Blocks (off the executor) until the engine exits; failures
/// are not retried.
pub async fn render_graph(
    engine: Arc<dyn AudioEngine>,
    inputs: Vec<PathBuf>,
    graph: &CrossfadeGraph,
    output_path: PathBuf,
    expected_duration_secs: f64,
    progress: Option<ProgressCallback>,
) -> AutomixResult<()> {
    if inputs.len() != graph.input_count() {
        return Err(AutomixError::render(format!(
            "graph references {} inputs but {} were registered",
            graph.input_count(),
            inputs.len()
        )));
    }

    let job = RenderJob {
        inputs,
        filter_graph: graph.to_filter_complex(),
        output_label: graph.output_label().to_string(),
        output_path,
        expected_duration_secs,
    };

    tracing::info!(
        engine = engine.name(),
        steps = graph.step_count(),
        output = %job.output_path.display(),
        "Rendering mix"
    );

    let job = tokio::task::spawn_blocking(move || engine.render(&job, progress).map(|()| job))
        .await
        .map_err(|e| AutomixError::render(format!("render task failed: {e}")))??;

    match tokio::fs::metadata(&job.output_path).await {
        Ok(meta) if meta.is_file() => Ok(()),
        _ => Err(AutomixError::render(format!(
            "engine reported success but wrote no output at {}",
            job.output_path.display()
        ))),
    }
}
