//! Window input: pointer coordinates and the actions the scene consumes.
//!
//! # Invariants
//! - The scene consumes [`Action`]s, never window-system events.
//! - Pointer positions are physical pixels with the origin at the top-left;
//!   NDC has the origin at the centre and y up.

pub mod action;

pub use action::{Action, DesktopInput, RawInput};
use glam::Vec2;

/// Drawable area in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn aspect(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        (0.0..=self.width as f32).contains(&x) && (0.0..=self.height as f32).contains(&y)
    }
}

/// Convert a pixel position to normalized device coordinates:
/// `x' = (x / width) * 2 - 1`, `y' = -(y / height) * 2 + 1`.
///
/// `None` for an empty viewport (a minimized window) or a point outside it,
/// which winit still reports while a drag leaves the window.
pub fn pointer_to_ndc(x: f32, y: f32, viewport: Viewport) -> Option<Vec2> {
    if viewport.is_empty() || !viewport.contains(x, y) {
        return None;
    }
    Some(Vec2::new(
        (x / viewport.width as f32) * 2.0 - 1.0,
        -(y / viewport.height as f32) * 2.0 + 1.0,
    ))
}

pub fn crate_info() -> &'static str {
    "diorama-input v0.1.0"
}
