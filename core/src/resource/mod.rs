//! Ownership of materialized page bytes.

pub mod registry;

pub use registry::{Disposer, Resource, ResourceRegistry};
