//! Chained crossfade graph.
//!
//! A graph for N tracks is a strict linear chain of N-1 pairwise crossfades:
//!
//! ```text
//! [0:a][1:a]acrossfade=d=5:c1=tri:c2=tri[a1];
//! [a1][2:a]acrossfade=d=5:c1=tri:c2=tri[out]
//! ```
//!
//! Step *i* merges the running mix (track 0 for the first step) with
//! track *i*, so track order fully determines merge order.

use std::fmt;

/// Label of a stream inside the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamLabel {
    /// Audio of the k-th registered input.
    Input(usize),
    /// Output of the i-th (1-based) intermediate crossfade step.
    Intermediate(usize),
    /// The terminal output exported by the renderer.
    Output,
}

impl StreamLabel {
    /// Input index when this label refers to an original track.
    pub fn input_index(self) -> Option<usize> {
        match self {
            Self::Input(index) => Some(index),
            _ => None,
        }
    }
}

impl fmt::Display for StreamLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input(index) => write!(f, "{index}:a"),
            Self::Intermediate(step) => write!(f, "a{step}"),
            Self::Output => f.write_str(OUTPUT_LABEL),
        }
    }
}

/// Label text of the terminal output.
pub const OUTPUT_LABEL: &str = "out";

/// Fade curve applied to one side of a crossfade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeCurve {
    /// Linear ramp.
    Triangular,
}

impl FadeCurve {
    /// Engine name of the curve.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Triangular => "tri",
        }
    }
}

/// One binary merge of the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossfadeStep {
    pub left: StreamLabel,
    pub right: StreamLabel,
    pub duration_secs: u32,
    /// Fade-out curve of `left`.
    pub curve_out: FadeCurve,
    /// Fade-in curve of `right`.
    pub curve_in: FadeCurve,
    pub output: StreamLabel,
}

impl CrossfadeStep {
    /// Filter expression for this step.
    pub fn to_filter(&self) -> String {
        format!(
            "[{left}][{right}]acrossfade=d={d}:c1={c1}:c2={c2}[{out}]",
            left = self.left,
            right = self.right,
            d = self.duration_secs,
            c1 = self.curve_out.as_str(),
            c2 = self.curve_in.as_str(),
            out = self.output,
        )
    }
}

/// Ordered chain of crossfade steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossfadeGraph {
    steps: Vec<CrossfadeStep>,
}

impl CrossfadeGraph {
    pub fn new(steps: Vec<CrossfadeStep>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[CrossfadeStep] {
        &self.steps
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Number of inputs the renderer must register.
    pub fn input_count(&self) -> usize {
        if self.steps.is_empty() {
            0
        } else {
            self.steps.len() + 1
        }
    }

    /// Label of the stream to export.
    pub fn output_label(&self) -> StreamLabel {
        self.steps
            .last()
            .map(|step| step.output)
            .unwrap_or(StreamLabel::Output)
    }

    /// Input indices in the order the chain consumes them.
    pub fn input_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.input_count());
        for step in &self.steps {
            for label in [step.left, step.right] {
                if let Some(index) = label.input_index() {
                    order.push(index);
                }
            }
        }
        order
    }

    /// Semicolon-joined filter graph text, evaluated left to right.
    pub fn to_filter_complex(&self) -> String {
        self.steps
            .iter()
            .map(CrossfadeStep::to_filter)
            .collect::<Vec<_>>()
            .join(";")
    }
}
