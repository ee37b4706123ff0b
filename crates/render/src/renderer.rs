use crate::frame::{DrawStyle, extract};
use crate::view::{PostProcess, RenderView};
use diorama_kernel::Registry;

/// Renderer-agnostic interface. All renderers implement this trait.
///
/// A renderer reads the registry plus the frame's view and post-process
/// settings and produces output. It never mutates the registry.
pub trait Renderer {
    /// The output type produced by this renderer.
    type Output;

    /// Render one frame.
    fn render(&mut self, registry: &Registry, view: &RenderView, post: &PostProcess) -> Self::Output;
}

/// Text renderer for headless runs and tests.
///
/// Produces a human-readable listing of what a GPU backend would draw.
#[derive(Debug, Default)]
pub struct DebugTextRenderer {
    frames: u64,
}

impl DebugTextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames rendered so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Renderer for DebugTextRenderer {
    type Output = String;

    fn render(&mut self, registry: &Registry, view: &RenderView, post: &PostProcess) -> String {
        self.frames += 1;
        let packet = extract(registry);
        let mut out = String::new();

        out.push_str(&format!("=== Frame {} ===\n", self.frames));
        out.push_str(&format!(
            "Camera: eye=({:.1}, {:.1}, {:.1}) look_at=({:.1}, {:.1}, {:.1}) fov={:.0} aspect={:.2}\n",
            view.eye.x,
            view.eye.y,
            view.eye.z,
            view.look_at.x,
            view.look_at.y,
            view.look_at.z,
            view.fov_degrees,
            view.aspect
        ));
        match post.active_bloom() {
            Some(b) => out.push_str(&format!(
                "Bloom: strength={:.2} threshold={:.2} radius={:.2}\n",
                b.strength, b.threshold, b.radius
            )),
            None => out.push_str("Bloom: off\n"),
        }
        out.push_str(&format!(
            "Draws: {}  Directional lights: {}\n",
            packet.items.len(),
            packet.lights.directional.len()
        ));

        for item in &packet.items {
            let entity = registry.get(item.entity);
            let p = entity.transform().position;
            let style = match item.style {
                DrawStyle::Fill => "fill",
                DrawStyle::Wireframe => "wire",
                DrawStyle::Lines => "lines",
            };
            out.push_str(&format!(
                "  [{}] {:<10} {:<7} {:<5} pos=({:.2}, {:.2}, {:.2}) color={}{}\n",
                item.entity.short(),
                entity.name(),
                item.geometry.kind(),
                style,
                p.x,
                p.y,
                p.z,
                item.color,
                if item.highlighted { " *" } else { "" }
            ));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diorama_common::{Color, Transform};
    use diorama_kernel::{Entity, Geometry};
    use glam::Vec3;

    #[test]
    fn empty_registry() {
        let registry = Registry::new();
        let mut renderer = DebugTextRenderer::new();
        let output = renderer.render(&registry, &RenderView::default(), &PostProcess::default());

        assert!(output.contains("Frame 1"));
        assert!(output.contains("Draws: 0"));
        assert!(output.contains("Bloom: off"));
    }

    #[test]
    fn lists_entities_and_highlight() {
        let mut registry = Registry::new();
        let cube = registry.spawn(Entity::new("cube", Geometry::cuboid(2.0, 2.0, 2.0)));
        registry.spawn(
            Entity::new("sphere", Geometry::Sphere { radius: 2.0 })
                .with_transform(Transform::from_position(Vec3::new(1.0, 2.0, 3.0))),
        );
        registry.show_color(cube, Color::from_hex(0xffff00));

        let mut renderer = DebugTextRenderer::new();
        let output = renderer.render(&registry, &RenderView::default(), &PostProcess::default());

        assert!(output.contains("Draws: 2"));
        assert!(output.contains("pos=(1.00, 2.00, 3.00)"));
        assert!(output.contains("#ffff00 *"));
        assert_eq!(output.matches(" *").count(), 1);
        assert_eq!(output.lines().count(), 4 + 2);
        assert!(output.ends_with('\n'));
    }

    #[test]
    fn bloom_line_and_frame_counter() {
        let registry = Registry::new();
        let post = PostProcess {
            bloom_enabled: true,
            ..PostProcess::default()
        };
        let mut renderer = DebugTextRenderer::new();
        renderer.render(&registry, &RenderView::default(), &post);
        let output = renderer.render(&registry, &RenderView::default(), &post);
        assert!(output.contains("Frame 2"));
        assert!(output.contains("Bloom: strength=1.50"));
        assert_eq!(renderer.frames(), 2);
    }
}
