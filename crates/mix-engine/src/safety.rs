//! Crossfade safety clamp.
//!
//! A chained crossfade needs every interior track to supply audio for both
//! its incoming and outgoing fade. The crossfade is therefore capped at a
//! fraction (the headroom ratio) of the shortest track, rounded down to
//! whole seconds.

use automix_common::error::{AutomixError, AutomixResult};

/// Fraction of the shortest track a crossfade may occupy by default.
pub const DEFAULT_HEADROOM_RATIO: f64 = 0.9;

/// Outcome of resolving a requested crossfade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedCrossfade {
    pub requested_secs: u32,
    pub resolved_secs: u32,
    /// Shortest probed duration (0 for no tracks).
    pub shortest_secs: f64,
    /// Whether the clamp reduced the requested value.
    pub clamped: bool,
}

/// Policy for clamping crossfades to the shortest track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafetyPolicy {
    headroom_ratio: f64,
}

impl Default for SafetyPolicy {
    fn default() -> Self {
        Self {
            headroom_ratio: DEFAULT_HEADROOM_RATIO,
        }
    }
}

impl SafetyPolicy {
    /// Policy with a custom ratio in `(0, 1]`.
    pub fn new(headroom_ratio: f64) -> AutomixResult<Self> {
        if !headroom_ratio.is_finite() || headroom_ratio <= 0.0 || headroom_ratio > 1.0 {
            return Err(AutomixError::config(format!(
                "headroom ratio must be in (0, 1], got {headroom_ratio}"
            )));
        }
        Ok(Self { headroom_ratio })
    }

    pub fn headroom_ratio(&self) -> f64 {
        self.headroom_ratio
    }

    /// `floor(min(requested, shortest * ratio))`, never below 0.
    ///
    /// Non-finite or negative durations count as 0, which forces a hard cut.
    pub fn resolve(&self, requested_secs: u32, durations: &[f64]) -> ResolvedCrossfade {
        let shortest_secs = durations
            .iter()
            .map(|&d| if d.is_finite() && d > 0.0 { d } else { 0.0 })
            .reduce(f64::min)
            .unwrap_or(0.0);

        let limit = (shortest_secs * self.headroom_ratio).floor().max(0.0);
        let resolved_secs = (requested_secs as f64).min(limit) as u32;

        ResolvedCrossfade {
            requested_secs,
            resolved_secs,
            shortest_secs,
            clamped: resolved_secs < requested_secs,
        }
    }
}

/// Resolve with the default policy.
pub fn resolve(requested_secs: u32, durations: &[f64]) -> u32 {
    SafetyPolicy::default()
        .resolve(requested_secs, durations)
        .resolved_secs
}
