//! The stock scene and the state its parameter callbacks mutate.

use diorama_assets::LoadedAsset;
use diorama_common::{Color, EntityId, Transform};
use diorama_kernel::{
    AnimationRig, CameraPose, Clock, Entity, Geometry, HighlightLinks, Light, Material,
    ShadowBounds, ShadowFlags, Registry,
};
use diorama_render::PostProcess;
use glam::{Vec2, Vec3};
use std::f32::consts::PI;

/// Where the imported mesh is placed.
pub const IMPORT_POSITION: Vec3 = Vec3::new(0.0, 5.0, 0.0);
/// Rotation of the imported mesh about Y, radians.
pub const IMPORT_YAW: f32 = -0.25 * PI;
pub const IMPORT_COLOR: u32 = 0xff00ff;

/// Handles of the built-in entities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneHandles {
    pub cube: EntityId,
    pub edges: EntityId,
    pub floor: EntityId,
    pub wall_x: EntityId,
    pub wall_z: EntityId,
    pub sphere: EntityId,
    pub ambient: EntityId,
    pub sun: EntityId,
}

/// Everything the frame loop and the parameter callbacks touch.
#[derive(Debug, Clone)]
pub struct SceneState {
    pub registry: Registry,
    pub camera: CameraPose,
    pub clock: Clock,
    pub rig: AnimationRig,
    pub links: HighlightLinks,
    pub handles: SceneHandles,
    /// Imported meshes, in arrival order.
    pub imports: Vec<EntityId>,
    /// Pointer in NDC, `None` when it is outside the window.
    pub pointer: Option<Vec2>,
    pub highlight: Color,
    pub post: PostProcess,
}

impl SceneState {
    /// Build the stock scene: spinning cube with an edge overlay, three
    /// checkered planes, a bouncing sphere and two lights.
    pub fn new(highlight: Color) -> Self {
        let mut registry = Registry::new();

        let cube = registry.spawn(
            Entity::new("cube", Geometry::cuboid(2.0, 2.0, 2.0))
                .with_material(Material::unlit(Color::WHITE))
                .with_transform(Transform::from_position(Vec3::new(0.0, 10.0, 0.0)))
                .with_shadows(ShadowFlags::CASTS),
        );
        let edges = registry.spawn(
            Entity::new("edges", Geometry::edges(2.0, 2.0, 2.0))
                .with_material(Material::unlit(Color::WHITE).glowing())
                .with_transform(Transform::from_position(Vec3::new(0.0, 10.0, 0.0))),
        );

        let plane = || Geometry::Plane {
            width: 20.0,
            height: 20.0,
        };
        let checker = || Material::new(Color::WHITE).checkered().double_sided();
        let floor = registry.spawn(
            Entity::new("floor", plane())
                .with_material(checker())
                .with_transform(Transform {
                    rotation: Vec3::new(-0.5 * PI, 0.0, 0.0),
                    ..Transform::default()
                })
                .with_shadows(ShadowFlags::RECEIVES),
        );
        let wall_x = registry.spawn(
            Entity::new("wall_x", plane())
                .with_material(checker())
                .with_transform(Transform {
                    position: Vec3::new(10.0, 10.0, 0.0),
                    rotation: Vec3::new(0.0, -0.5 * PI, 0.0),
                    ..Transform::default()
                })
                .with_shadows(ShadowFlags::RECEIVES),
        );
        let wall_z = registry.spawn(
            Entity::new("wall_z", plane())
                .with_material(checker())
                .with_transform(Transform::from_position(Vec3::new(0.0, 10.0, -10.0)))
                .with_shadows(ShadowFlags::RECEIVES),
        );

        let sphere = registry.spawn(
            Entity::new("sphere", Geometry::Sphere { radius: 2.0 })
                .with_material(Material::new(Color::WHITE))
                .with_transform(Transform::from_position(Vec3::new(0.0, 15.0, 0.0)))
                .with_shadows(ShadowFlags::CASTS),
        );

        let ambient = registry.spawn(Entity::new(
            "ambient",
            Geometry::Light(Light::Ambient {
                color: Color::from_hex(0xff00dd),
                intensity: 1.0,
            }),
        ));
        let sun = registry.spawn(
            Entity::new(
                "sun",
                Geometry::Light(Light::Directional {
                    color: Color::WHITE,
                    intensity: 0.8,
                    shadow_bounds: ShadowBounds::square(10.0),
                }),
            )
            .with_transform(Transform::from_position(Vec3::new(-30.0, 50.0, 0.0)))
            .with_shadows(ShadowFlags::CASTS),
        );

        let mut links = HighlightLinks::new();
        links.link([cube, edges]);

        tracing::info!(entities = registry.len(), "built stock scene");
        Self {
            registry,
            camera: CameraPose::default(),
            clock: Clock::new(),
            rig: AnimationRig::new(cube, edges, sphere),
            links,
            handles: SceneHandles {
                cube,
                edges,
                floor,
                wall_x,
                wall_z,
                sphere,
                ambient,
                sun,
            },
            imports: Vec::new(),
            pointer: None,
            highlight,
            post: PostProcess::default(),
        }
    }

    /// Insert a loaded mesh. It becomes an ordinary entity: pickable and
    /// mutable through the registry like the built-ins.
    pub fn add_import(&mut self, asset: &LoadedAsset) -> EntityId {
        let id = self.registry.spawn(
            Entity::new(asset.mesh.name.clone(), Geometry::Mesh(asset.mesh.clone()))
                .with_material(Material::new(Color::from_hex(IMPORT_COLOR)))
                .with_transform(Transform {
                    position: IMPORT_POSITION,
                    rotation: Vec3::new(0.0, IMPORT_YAW, 0.0),
                    ..Transform::default()
                })
                .with_shadows(ShadowFlags::CASTS),
        );
        self.imports.push(id);
        tracing::info!(
            name = %asset.mesh.name,
            asset = %asset.id,
            id = %id.short(),
            "imported mesh added to scene"
        );
        id
    }

    /// Step 1 of a frame: rotations, clock, bounce, camera tracking.
    pub fn animate(&mut self, speed: f32) {
        self.rig
            .step(&mut self.registry, &mut self.clock, speed, &mut self.camera);
    }

    /// Step 2 of a frame: recompute the highlight from scratch.
    pub fn update_highlight(&mut self) -> Option<EntityId> {
        let hit = self.pointer.and_then(|ndc| {
            diorama_kernel::pick::pick(
                ndc,
                &self.camera,
                &self.registry,
                self.registry.pickable(),
            )
        });
        let set = diorama_kernel::pick::highlight_set(hit.map(|h| h.entity), &self.links);
        diorama_kernel::pick::apply_highlight(&mut self.registry, &set, self.highlight);
        hit.map(|h| h.entity)
    }

    /// Viewport resize: new aspect, projection refreshed before the next frame.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.set_viewport(width, height);
        tracing::debug!(width, height, aspect = self.camera.aspect(), "viewport resized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diorama_assets::AssetId;
    use diorama_kernel::MeshData;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn tri_asset() -> LoadedAsset {
        LoadedAsset {
            id: AssetId::of(b"tri"),
            path: PathBuf::from("tri.glb"),
            mesh: Arc::new(MeshData::new(
                "tri",
                vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                None,
                vec![0, 1, 2],
            )),
        }
    }

    #[test]
    fn stock_scene_layout() {
        let s = SceneState::new(Color::from_hex(0xffff00));
        let r = &s.registry;
        assert_eq!(r.len(), 8);
        assert_eq!(r.get(s.handles.cube).transform().position.y, 10.0);
        assert_eq!(r.get(s.handles.sphere).transform().position, Vec3::new(0.0, 15.0, 0.0));
        assert!(r.get(s.handles.sphere).shadows().casts);
        assert!(r.get(s.handles.floor).shadows().receives);
        assert!(r.get(s.handles.floor).material().checker);
        assert!(!r.get(s.handles.cube).material().lit);
        assert!(r.get(s.handles.edges).material().emissive);
        assert!(!r.get(s.handles.cube).material().emissive);
        assert_eq!(r.pickable().len(), 6);
    }

    #[test]
    fn import_gets_fixed_placement_and_colour() {
        let mut s = SceneState::new(Color::from_hex(0xffff00));
        let id = s.add_import(&tri_asset());
        let e = s.registry.get(id);
        assert_eq!(e.transform().position, IMPORT_POSITION);
        assert!((e.transform().rotation.y + 0.25 * PI).abs() < 1e-6);
        assert_eq!(e.material().base_color.to_hex(), 0xff00ff);
        assert!(e.shadows().casts);
        assert!(e.is_pickable());
        assert_eq!(s.imports, vec![id]);
    }

    #[test]
    fn no_pointer_means_no_highlight() {
        let mut s = SceneState::new(Color::from_hex(0xffff00));
        s.pointer = None;
        assert!(s.update_highlight().is_none());
        for (_, e) in s.registry.iter() {
            assert!(!e.material().is_highlighted());
        }
    }

    #[test]
    fn resize_refreshes_projection() {
        let mut s = SceneState::new(Color::WHITE);
        let before = s.camera.projection();
        s.resize(500, 1000);
        assert_eq!(s.camera.aspect(), 0.5);
        assert_ne!(s.camera.projection(), before);
    }
}
