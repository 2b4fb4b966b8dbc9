//! Builds the chained crossfade graph.

use automix_common::error::{AutomixError, AutomixResult};
use automix_mix_model::{CrossfadeGraph, CrossfadeStep, FadeCurve, StreamLabel, MIN_TRACKS};

/// Build the N-1 step chain for `track_count` tracks.
///
/// Step `i` (1-based) merges the output of step `i-1` (track 0 for the
/// first step) with track `i`. The last step writes the terminal output.
pub fn build_graph(track_count: usize, crossfade_secs: u32) -> AutomixResult<CrossfadeGraph> {
    if track_count < MIN_TRACKS {
        return Err(AutomixError::invalid_request(format!(
            "A crossfade graph needs at least {MIN_TRACKS} tracks, got {track_count}"
        )));
    }

    let last = track_count - 1;
    let steps = (1..track_count)
        .map(|i| CrossfadeStep {
            left: if i == 1 {
                StreamLabel::Input(0)
            } else {
                StreamLabel::Intermediate(i - 1)
            },
            right: StreamLabel::Input(i),
            duration_secs: crossfade_secs,
            curve_out: FadeCurve::Triangular,
            curve_in: FadeCurve::Triangular,
            output: if i == last {
                StreamLabel::Output
            } else {
                StreamLabel::Intermediate(i)
            },
        })
        .collect();

    Ok(CrossfadeGraph::new(steps))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_two_tracks_single_step() {
        let graph = build_graph(2, 5).unwrap();
        assert_eq!(graph.step_count(), 1);
        assert_eq!(
            graph.to_filter_complex(),
            "[0:a][1:a]acrossfade=d=5:c1=tri:c2=tri[out]"
        );
    }

    #[test]
    fn test_three_tracks_chain() {
        let graph = build_graph(3, 5).unwrap();
        let steps = graph.steps();
        assert_eq!(steps.len(), 2);

        assert_eq!(steps[0].left, StreamLabel::Input(0));
        assert_eq!(steps[0].right, StreamLabel::Input(1));
        assert_eq!(steps[0].output, StreamLabel::Intermediate(1));

        assert_eq!(steps[1].left, StreamLabel::Intermediate(1));
        assert_eq!(steps[1].right, StreamLabel::Input(2));
        assert_eq!(steps[1].output, StreamLabel::Output);

        assert!(steps.iter().all(|s| s.duration_secs == 5));
    }

    #[test]
    fn test_zero_crossfade_is_allowed() {
        let graph = build_graph(2, 0).unwrap();
        assert_eq!(graph.steps()[0].duration_secs, 0);
    }

    #[test]
    fn test_fewer_than_two_tracks_rejected() {
        assert!(matches!(
            build_graph(1, 5),
            Err(AutomixError::InvalidRequest { .. })
        ));
        assert!(build_graph(0, 5).is_err());
    }

    proptest! {
        #[test]
        fn prop_graph_is_strict_linear_chain(n in 2usize..64, d in 0u32..30) {
            let graph = build_graph(n, d).unwrap();
            let steps = graph.steps();

            prop_assert_eq!(steps.len(), n - 1);
            prop_assert_eq!(graph.output_label(), StreamLabel::Output);
            prop_assert_eq!(graph.input_order(), (0..n).collect::<Vec<_>>());

            let outputs: HashSet<StreamLabel> = steps.iter().map(|s| s.output).collect();
            prop_assert_eq!(outputs.len(), steps.len());

            for (k, step) in steps.iter().enumerate() {
                prop_assert_eq!(step.right, StreamLabel::Input(k + 1));
                prop_assert_eq!(step.duration_secs, d);
                if k > 0 {
                    prop_assert_eq!(step.left, steps[k - 1].output);
                }
            }
        }
    }
}
