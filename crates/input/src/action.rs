use crate::{Viewport, pointer_to_ndc};
use glam::Vec2;

/// Backend-neutral window events. The desktop app translates winit events
/// into these; tests build them directly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawInput {
    CursorMoved { x: f32, y: f32 },
    CursorLeft,
    /// Primary (left) mouse button.
    PrimaryButton { pressed: bool },
    /// Wheel movement in lines; positive scrolls away from the user.
    Wheel(f32),
    Resized { width: u32, height: u32 },
}

/// A high-level action the scene understands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Pointer over the viewport, in NDC.
    Point(Vec2),
    /// Pointer gone; nothing can be picked.
    ClearPoint,
    /// Orbit drag, in pixels.
    Orbit { dx: f32, dy: f32 },
    /// Zoom steps; positive moves closer.
    Zoom(f32),
    Resize { width: u32, height: u32 },
}

/// Turns raw events into actions, tracking drag state and viewport size.
#[derive(Debug, Clone)]
pub struct DesktopInput {
    viewport: Viewport,
    cursor: Option<Vec2>,
    dragging: bool,
}

impl DesktopInput {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            cursor: None,
            dragging: false,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn handle(&mut self, input: RawInput) -> Vec<Action> {
        let mut actions = Vec::new();
        match input {
            RawInput::CursorMoved { x, y } => {
                let now = Vec2::new(x, y);
                if let (true, Some(last)) = (self.dragging, self.cursor) {
                    let d = now - last;
                    if d != Vec2::ZERO {
                        actions.push(Action::Orbit { dx: d.x, dy: d.y });
                    }
                }
                self.cursor = Some(now);
                actions.push(match pointer_to_ndc(x, y, self.viewport) {
                    Some(ndc) => Action::Point(ndc),
                    None => Action::ClearPoint,
                });
            }
            RawInput::CursorLeft => {
                self.cursor = None;
                self.dragging = false;
                actions.push(Action::ClearPoint);
            }
            RawInput::PrimaryButton { pressed } => self.dragging = pressed,
            RawInput::Wheel(lines) if lines != 0.0 => actions.push(Action::Zoom(lines)),
            RawInput::Wheel(_) => {}
            RawInput::Resized { width, height } => {
                self.viewport = Viewport::new(width, height);
                actions.push(Action::Resize { width, height });
                // The same pixel is a different NDC point after a resize.
                if let Some(c) = self.cursor {
                    if let Some(ndc) = pointer_to_ndc(c.x, c.y, self.viewport) {
                        actions.push(Action::Point(ndc));
                    }
                }
            }
        }
        if !actions.is_empty() {
            tracing::trace!(?input, ?actions, "input mapped");
        }
        actions
    }
}
