//! Mix requests.

use automix_common::error::{AutomixError, AutomixResult};

use crate::track::Track;

/// Fewest tracks a mix can be built from.
pub const MIN_TRACKS: usize = 2;

/// Crossfade length used when the caller does not supply a usable value.
pub const DEFAULT_CROSSFADE_SECS: u32 = 5;

/// An ordered set of tracks to be crossfaded into one mix.
///
/// Track order is playback order and is entirely caller-controlled.
#[derive(Debug, Clone)]
pub struct MixRequest {
    tracks: Vec<Track>,
    crossfade_secs: u32,
}

impl MixRequest {
    pub fn new(tracks: Vec<Track>, crossfade_secs: u32) -> Self {
        Self {
            tracks,
            crossfade_secs,
        }
    }

    /// Request using the default crossfade length.
    pub fn with_default_crossfade(tracks: Vec<Track>) -> Self {
        Self::new(tracks, DEFAULT_CROSSFADE_SECS)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Requested crossfade length in whole seconds.
    pub fn crossfade_secs(&self) -> u32 {
        self.crossfade_secs
    }

    /// Check the request can be mixed at all.
    pub fn validate(&self) -> AutomixResult<()> {
        if self.tracks.len() < MIN_TRACKS {
            return Err(AutomixError::invalid_request(format!(
                "At least {MIN_TRACKS} files are required"
            )));
        }
        Ok(())
    }

    /// Split into tracks and requested crossfade.
    pub fn into_parts(self) -> (Vec<Track>, u32) {
        (self.tracks, self.crossfade_secs)
    }
}

/// Parse a crossfade form field leniently.
///
/// Missing, blank, non-numeric, or negative input yields `default`.
/// Fractional input is truncated toward zero. `0` is kept and means a hard cut.
pub fn parse_crossfade_field(raw: Option<&str>, default: u32) -> u32 {
    let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return default;
    };

    if let Ok(value) = raw.parse::<u32>() {
        return value;
    }

    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => value.trunc().min(u32::MAX as f64) as u32,
        _ => default,
    }
}
