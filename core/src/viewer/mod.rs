//! Presentation-facing state: the load controller, pagination, and lightbox binding.

pub mod controller;
pub mod lightbox;
pub mod paginate;

pub use controller::{LoadOutcome, PhaseKind, ViewerController, ViewerSnapshot};
pub use lightbox::{Lightbox, ZoomWidget};
pub use paginate::{PageLink, Paginator};
