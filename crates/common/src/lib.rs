//! Shared types for the diorama workspace.
//!
//! Everything here is plain data: handles, transforms and colours that the
//! kernel, renderers and tools pass between each other.

mod color;
mod types;

pub use color::Color;
pub use types::{EntityId, Transform, TransformPatch};
