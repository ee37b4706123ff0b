use diorama_common::{Color, EntityId};
use diorama_kernel::{Geometry, Light, Registry, ShadowBounds};
use glam::{Mat4, Vec3};

/// How a draw item is rasterized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawStyle {
    /// Filled triangles.
    Fill,
    /// Triangle edges as lines (material wireframe flag).
    Wireframe,
    /// Native line geometry (box edges).
    Lines,
}

/// One visible, non-light entity, resolved for drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem {
    pub entity: EntityId,
    pub geometry: Geometry,
    pub model: Mat4,
    /// Displayed colour this frame, sRGB.
    pub color: Color,
    pub opacity: f32,
    pub style: DrawStyle,
    pub lit: bool,
    pub checker: bool,
    pub emissive: bool,
    pub double_sided: bool,
    pub casts_shadow: bool,
    pub highlighted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub position: Vec3,
    /// Unit vector the light travels along (from its position to the origin).
    pub direction: Vec3,
    pub color: Color,
    pub intensity: f32,
    pub shadow_bounds: ShadowBounds,
}

/// Scene lighting, folded from light entities.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LightRig {
    /// Summed ambient contribution, linear RGB.
    pub ambient: [f32; 3],
    pub directional: Vec<DirectionalLight>,
}

/// Everything a backend needs to draw one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FramePacket {
    pub items: Vec<DrawItem>,
    pub lights: LightRig,
}

impl FramePacket {
    /// Opaque items first, then transparent ones.
    pub fn sorted_for_blending(&self) -> Vec<&DrawItem> {
        let (mut opaque, transparent): (Vec<&DrawItem>, Vec<&DrawItem>) =
            self.items.iter().partition(|i| i.opacity >= 1.0);
        opaque.extend(transparent);
        opaque
    }
}

/// Resolve the registry into a frame packet.
pub fn extract(registry: &Registry) -> FramePacket {
    let mut packet = FramePacket::default();
    for (id, entity) in registry.iter() {
        let transform = entity.transform();
        match entity.geometry() {
            Geometry::Light(Light::Ambient { color, intensity }) => {
                let c = color.to_linear();
                for (acc, c) in packet.lights.ambient.iter_mut().zip(c) {
                    *acc += c * intensity;
                }
            }
            Geometry::Light(Light::Directional {
                color,
                intensity,
                shadow_bounds,
            }) => {
                let position = transform.position;
                packet.lights.directional.push(DirectionalLight {
                    position,
                    direction: (-position).try_normalize().unwrap_or(Vec3::NEG_Y),
                    color: *color,
                    intensity: *intensity,
                    shadow_bounds: *shadow_bounds,
                });
            }
            geometry => {
                let material = entity.material();
                let style = match geometry {
                    Geometry::Edges { .. } => DrawStyle::Lines,
                    _ if material.wireframe => DrawStyle::Wireframe,
                    _ => DrawStyle::Fill,
                };
                packet.items.push(DrawItem {
                    entity: id,
                    geometry: geometry.clone(),
                    model: transform.matrix(),
                    color: material.color,
                    opacity: if material.transparent {
                        material.opacity.clamp(0.0, 1.0)
                    } else {
                        1.0
                    },
                    style,
                    lit: material.lit,
                    checker: material.checker,
                    emissive: material.emissive,
                    double_sided: material.double_sided,
                    casts_shadow: entity.shadows().casts,
                    highlighted: material.is_highlighted(),
                });
            }
        }
    }
    tracing::trace!(
        items = packet.items.len(),
        lights = packet.lights.directional.len(),
        "extracted frame"
    );
    packet
}

#[cfg(test)]
mod tests {
    use super::*;
    use diorama_common::Transform;
    use diorama_kernel::{Entity, Material};

    fn lit_scene() -> (Registry, EntityId, EntityId) {
        let mut r = Registry::new();
        let cube = r.spawn(Entity::new("cube", Geometry::cuboid(2.0, 2.0, 2.0)));
        let edges = r.spawn(Entity::new("edges", Geometry::edges(2.0, 2.0, 2.0)));
        r.spawn(Entity::new(
            "ambient",
            Geometry::Light(Light::Ambient {
                color: Color::WHITE,
                intensity: 0.5,
            }),
        ));
        r.spawn(
            Entity::new(
                "sun",
                Geometry::Light(Light::Directional {
                    color: Color::WHITE,
                    intensity: 0.8,
                    shadow_bounds: ShadowBounds::square(10.0),
                }),
            )
            .with_transform(Transform::from_position(Vec3::new(-30.0, 50.0, 0.0))),
        );
        (r, cube, edges)
    }

    #[test]
    fn lights_fold_into_rig() {
        let (r, _, _) = lit_scene();
        let packet = extract(&r);
        assert_eq!(packet.items.len(), 2);
        for c in packet.lights.ambient {
            assert!((c - 0.5).abs() < 1e-4);
        }
        let sun = packet.lights.directional[0];
        assert!((sun.direction - Vec3::new(30.0, -50.0, 0.0).normalize()).length() < 1e-5);
    }

    #[test]
    fn styles_follow_geometry_and_wireframe() {
        let (mut r, cube, edges) = lit_scene();
        r.set_wireframe(cube, true);
        let packet = extract(&r);
        let style = |id| packet.items.iter().find(|i| i.entity == id).unwrap().style;
        assert_eq!(style(cube), DrawStyle::Wireframe);
        assert_eq!(style(edges), DrawStyle::Lines);
    }

    #[test]
    fn highlight_is_visible_in_packet() {
        let (mut r, cube, _) = lit_scene();
        r.show_color(cube, Color::from_hex(0xffff00));
        let packet = extract(&r);
        let item = packet.items.iter().find(|i| i.entity == cube).unwrap();
        assert!(item.highlighted);
        assert_eq!(item.color.to_hex(), 0xffff00);
    }

    #[test]
    fn transparent_items_sort_last() {
        let mut r = Registry::new();
        let glass = r.spawn(
            Entity::new("glass", Geometry::Sphere { radius: 1.0 })
                .with_material(Material::default().translucent(0.5)),
        );
        r.spawn(Entity::new("rock", Geometry::Sphere { radius: 1.0 }));
        let packet = extract(&r);
        let sorted = packet.sorted_for_blending();
        assert_eq!(sorted.last().unwrap().entity, glass);
        assert_eq!(sorted.last().unwrap().opacity, 0.5);
    }

    #[test]
    fn glow_and_late_translucency_reach_the_packet() {
        let mut r = Registry::new();
        let lines = r.spawn(
            Entity::new("edges", Geometry::edges(1.0, 1.0, 1.0))
                .with_material(Material::unlit(Color::WHITE).glowing()),
        );
        let ball = r.spawn(Entity::new("ball", Geometry::Sphere { radius: 1.0 }));
        r.update_material(ball, |m| *m = m.translucent(0.25));

        let packet = extract(&r);
        let lines_item = packet.items.iter().find(|i| i.entity == lines).unwrap();
        assert!(lines_item.emissive);
        let sorted = packet.sorted_for_blending();
        assert_eq!(sorted.last().unwrap().entity, ball);
        assert_eq!(sorted.last().unwrap().opacity, 0.25);
    }
}
