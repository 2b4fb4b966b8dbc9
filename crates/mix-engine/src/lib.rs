//! Automix Mix Engine
//!
//! Turns an ordered set of tracks into one continuous mix by chaining
//! pairwise crossfades through an external audio engine (ffmpeg).
//!
//! # Pipeline Architecture
//!
//! ```text
//! MixRequest ── validate (>= 2 tracks)
//!                   │
//!                   ├── Workspace acquire   automix-<uuid>/
//!                   │
//!                   ├── Persist tracks      (parallel, per track)
//!                   │
//!                   ├── Probe durations     (parallel, joined by position)
//!                   │
//!                   ├── Resolve crossfade   min(requested, floor(0.9 * shortest))
//!                   │
//!                   ├── Build graph         [0:a][1:a] -> a1 -> ... -> out
//!                   │
//!                   ├── Render              ffmpeg -filter_complex
//!                   │
//!                   ├── Read artifact       output.mp3
//!                   ▼
//!             Workspace release (every exit path)
//! ```

pub mod engine;
pub mod ffmpeg;
pub mod graph;
pub mod pipeline;
pub mod probe;
pub mod render;
pub mod safety;
pub mod workspace;

pub use engine::*;
pub use pipeline::*;
