//! Boundary to the external audio engine.

use std::path::{Path, PathBuf};

use automix_common::error::{AutomixError, AutomixResult};

/// A fully specified render: inputs, filter graph, and export target.
#[derive(Debug, Clone)]
pub struct RenderJob {
    /// Inputs in registration order; input `k` of the graph is `inputs[k]`.
    pub inputs: Vec<PathBuf>,

    /// Declarative filter graph text.
    pub filter_graph: String,

    /// Graph label exported to `output_path`.
    pub output_label: String,

    /// Where the rendered mix is written.
    pub output_path: PathBuf,

    /// Expected mix length, used only for progress estimates.
    pub expected_duration_secs: f64,
}

/// Progress callback for rendering.
pub type ProgressCallback = Box<dyn Fn(RenderProgress) + Send>;

/// Render progress report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    /// Position of the encoder in the output stream.
    pub out_time_secs: f64,

    /// Estimated time remaining in seconds.
    pub eta_secs: f64,

    /// Whether the engine has reported the end of the stream.
    pub complete: bool,
}

/// The two operations the pipeline needs from an audio engine.
///
/// Both calls block until the engine finishes; callers run them off the
/// async executor.
pub trait AudioEngine: Send + Sync {
    /// Probe the duration of one audio file.
    ///
    /// `Ok(None)` means the engine read the file but reported no duration.
    /// `Err` means the engine could not read the file at all.
    fn probe_duration(&self, path: &Path) -> AutomixResult<Option<f64>>;

    /// Render the job, blocking until the engine exits.
    fn render(&self, job: &RenderJob, progress: Option<ProgressCallback>) -> AutomixResult<()>;

    /// Check if this engine is usable on the system.
    fn is_available(&self) -> bool;

    /// Engine name.
    fn name(&self) -> &str;
}

/// Fail with `EngineUnavailable` when `engine` cannot be executed.
pub fn ensure_available(engine: &dyn AudioEngine) -> AutomixResult<()> {
    if engine.is_available() {
        Ok(())
    } else {
        Err(AutomixError::engine_unavailable(format!(
            "{} could not be executed",
            engine.name()
        )))
    }
}
