//! wgpu render backend for the diorama.
//!
//! Draws the frame packet into an HDR target, overlays the grid and light
//! helpers, runs the optional bloom chain and composites onto the surface.
//! Orbit controls live here too since they only matter to an interactive
//! window.
//!
//! # Invariants
//! - The renderer never mutates the registry.
//! - GPU meshes are a cache keyed by entity; dropping them loses nothing.
//! - Camera motion from the orbit controls never goes through parameters.

mod camera;
mod gpu;
pub mod mesh;
mod shaders;

pub use camera::OrbitController;
pub use gpu::{GpuFrame, HDR_FORMAT, WgpuRenderer};

pub fn crate_info() -> &'static str {
    "diorama-render-wgpu v0.1.0"
}
