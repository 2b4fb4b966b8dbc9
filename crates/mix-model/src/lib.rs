//! Automix Mix Model
//!
//! Defines the data contracts of a mix request:
//! - **Track:** An uploaded audio stream plus the name used on disk
//! - **MixRequest:** Ordered tracks and the requested crossfade length
//! - **CrossfadeGraph:** The chain of pairwise crossfades handed to the engine
//! - **MixArtifact:** The rendered mix and a report of how it was produced
//!
//! Track order is playback order. Nothing in this crate reorders tracks.

pub mod artifact;
pub mod graph;
pub mod request;
pub mod track;

pub use artifact::*;
pub use graph::*;
pub use request::*;
pub use track::*;
