//! Rendering adapter: the renderer-agnostic side of drawing a frame.
//!
//! # Invariants
//! - Renderers read the registry; they never mutate it.
//! - Everything a backend draws is derived from the registry, a
//!   [`RenderView`] and a [`PostProcess`] each frame. Backends keep GPU
//!   caches, never scene truth.

mod frame;
mod renderer;
mod view;

pub use frame::{DirectionalLight, DrawItem, DrawStyle, FramePacket, LightRig, extract};
pub use renderer::{DebugTextRenderer, Renderer};
pub use view::{BloomSettings, PostProcess, RenderView};

pub fn crate_info() -> &'static str {
    "diorama-render v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
