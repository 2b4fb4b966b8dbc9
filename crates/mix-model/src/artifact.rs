//! Probe results and the rendered mix.

use serde::{Deserialize, Serialize};

/// Content type of every rendered mix.
pub const MIX_CONTENT_TYPE: &str = "audio/mpeg";

/// Suggested download name of a rendered mix.
pub const MIX_FILE_NAME: &str = "automix-session.mp3";

/// Probed duration of every track, indexed by track position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationReport {
    durations_secs: Vec<f64>,
}

impl DurationReport {
    /// Build from position-ordered durations. Non-finite or negative
    /// values are stored as 0.
    pub fn new(durations_secs: Vec<f64>) -> Self {
        let durations_secs = durations_secs
            .into_iter()
            .map(|d| if d.is_finite() && d > 0.0 { d } else { 0.0 })
            .collect();
        Self { durations_secs }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.durations_secs
    }

    pub fn get(&self, track_index: usize) -> Option<f64> {
        self.durations_secs.get(track_index).copied()
    }

    pub fn len(&self) -> usize {
        self.durations_secs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.durations_secs.is_empty()
    }

    /// Shortest track duration, `None` for an empty report.
    pub fn shortest(&self) -> Option<f64> {
        self.durations_secs.iter().copied().reduce(f64::min)
    }

    pub fn total(&self) -> f64 {
        self.durations_secs.iter().sum()
    }

    /// Length of the chained mix: every crossfade overlaps two tracks.
    pub fn mixed_length_secs(&self, crossfade_secs: u32) -> f64 {
        let overlaps = self.durations_secs.len().saturating_sub(1) as f64;
        (self.total() - overlaps * crossfade_secs as f64).max(0.0)
    }
}

/// How a mix was produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixReport {
    /// Number of tracks mixed.
    pub track_count: usize,

    /// Probed durations, by track position.
    pub durations: DurationReport,

    /// Crossfade the caller asked for.
    pub requested_crossfade_secs: u32,

    /// Crossfade actually used.
    pub resolved_crossfade_secs: u32,

    /// Whether the safety clamp reduced the crossfade.
    pub clamped: bool,

    /// Filter graph handed to the engine.
    pub filter_graph: String,

    /// Expected length of the mix in seconds.
    pub expected_duration_secs: f64,

    /// Wall-clock time the render finished (RFC 3339).
    pub rendered_at: String,

    /// Time spent in the renderer.
    pub render_elapsed_secs: f64,
}

/// The rendered mix returned to the caller.
#[derive(Debug, Clone)]
pub struct MixArtifact {
    /// Encoded MP3 bytes.
    pub bytes: Vec<u8>,

    pub content_type: &'static str,

    pub file_name: &'static str,

    pub report: MixReport,
}

impl MixArtifact {
    pub fn new(bytes: Vec<u8>, report: MixReport) -> Self {
        Self {
            bytes,
            content_type: MIX_CONTENT_TYPE,
            file_name: MIX_FILE_NAME,
            report,
        }
    }

    /// `Content-Disposition` header value for an attachment download.
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.file_name)
    }
}

/// Current wall-clock time as RFC 3339.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
