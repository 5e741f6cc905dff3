//! Image format helpers.

pub mod probe;

pub use probe::probe_dimensions;
