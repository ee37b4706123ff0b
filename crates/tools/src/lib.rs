//! Developer tooling: scene inspector and frame timing.
//!
//! # Invariants
//! - Tools only read scene state.

mod inspector;
mod timer;

pub use inspector::{CameraInfo, EntityInfo, SceneInspector, SceneSummary};
pub use timer::FrameTimer;

pub fn crate_info() -> &'static str {
    "diorama-tools v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("tools"));
    }
}
