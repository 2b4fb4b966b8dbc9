//! Duration probing.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use automix_common::error::{AutomixError, AutomixResult};
use automix_mix_model::DurationReport;
use tokio::task::JoinSet;

use crate::engine::AudioEngine;

/// Probe one persisted track.
///
/// An engine that cannot read the file fails the probe. A readable file
/// without a reported duration counts as 0 seconds.
pub fn probe_track(
    engine: &dyn AudioEngine,
    track_index: usize,
    path: &Path,
) -> AutomixResult<f64> {
    match engine.probe_duration(path) {
        Ok(Some(secs)) if secs.is_finite() && secs >= 0.0 => Ok(secs),
        Ok(other) => {
            tracing::warn!(
                track_index,
                path = %path.display(),
                reported = ?other,
                "No usable duration reported, treating as 0s"
            );
            Ok(0.0)
        }
        Err(err) => Err(AutomixError::probe(track_index, err.to_string())),
    }
}

/// Probe every track concurrently and reassemble results by track position.
///
/// All probes complete before this returns. When several fail, the failure
/// of the lowest track index is reported.
pub async fn probe_durations(
    engine: Arc<dyn AudioEngine>,
    paths: &[PathBuf],
) -> AutomixResult<DurationReport> {
    let mut tasks = JoinSet::new();
    for (index, path) in paths.iter().cloned().enumerate() {
        let engine = Arc::clone(&engine);
        tasks.spawn_blocking(move || (index, probe_track(engine.as_ref(), index, &path)));
    }

    let mut durations: Vec<Option<AutomixResult<f64>>> = (0..paths.len()).map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => durations[index] = Some(result),
            Err(err) => {
                return Err(AutomixError::Other(anyhow::anyhow!(
                    "duration probe task failed: {err}"
                )))
            }
        }
    }

    let durations = durations
        .into_iter()
        .enumerate()
        .map(|(index, result)| {
            result.unwrap_or_else(|| Err(AutomixError::probe(index, "probe never completed")))
        })
        .collect::<AutomixResult<Vec<f64>>>()?;

    tracing::debug!(?durations, "Durations probed");
    Ok(DurationReport::new(durations))
}
