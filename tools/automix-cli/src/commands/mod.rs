pub mod check;
pub mod mix;
pub mod plan;
