//! Scene kernel: authoritative entity state, the per-frame animation step and
//! pointer picking.
//!
//! # Invariants
//! - Geometry is immutable once an entity is spawned.
//! - Material and transform change only through [`Registry`] setters.
//! - The animation step and picking are total over valid handles; neither
//!   returns an error.

pub mod animation;
pub mod camera;
pub mod entity;
pub mod geometry;
pub mod pick;
pub mod registry;

pub use animation::{AnimationRig, Bounce, Clock, Spin};
pub use camera::CameraPose;
pub use entity::{Entity, Material, ShadowFlags};
pub use geometry::{Geometry, Light, MeshData, ShadowBounds};
pub use pick::{HighlightLinks, PickHit, Ray};
pub use registry::Registry;
