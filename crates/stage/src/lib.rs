//! Stage: builds the stock scene, wires the parameter panel to it and drives
//! the frame loop.
//!
//! # Frame order
//! 1. Apply finished asset loads.
//! 2. Animate (spins, clock, bounce, camera tracking).
//! 3. Pick under the pointer and recompute the highlight.
//! 4. Render through whatever [`diorama_render::Renderer`] the caller passes.
//!
//! # Invariants
//! - Parameter writes and pointer updates happen between frames, never during.
//! - A failed or cancelled load leaves the scene exactly as it was.

pub mod config;
pub mod scene;
mod stage;
pub mod wiring;

pub use config::{ConfigError, StageConfig};
pub use scene::{SceneHandles, SceneState};
pub use stage::Stage;

/// Errors from building a stage. All of them are configuration or wiring
/// mistakes, surfaced before the first frame.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Param(#[from] diorama_params::ParamError),
}

pub fn crate_info() -> &'static str {
    "diorama-stage v0.1.0"
}
