use diorama_common::EntityId;
use diorama_kernel::{CameraPose, Clock, Registry};
use serde::Serialize;
use std::fmt;

/// Read-only queries against scene state for debugging and the inspector panel.
pub struct SceneInspector;

impl SceneInspector {
    pub fn summary(registry: &Registry, clock: &Clock, camera: &CameraPose) -> SceneSummary {
        let highlighted = registry
            .iter()
            .filter(|(_, e)| e.material().is_highlighted())
            .map(|(_, e)| e.name().to_string())
            .collect();
        SceneSummary {
            frames: clock.frames(),
            step: clock.step(),
            entity_count: registry.len(),
            pickable_count: registry.pickable().len(),
            highlighted,
            camera: CameraInfo::from(camera),
        }
    }

    pub fn inspect_entity(registry: &Registry, id: EntityId) -> Option<EntityInfo> {
        let e = registry.try_get(id)?;
        let t = e.transform();
        let m = e.material();
        Some(EntityInfo {
            id,
            name: e.name().to_string(),
            kind: e.geometry().kind(),
            position: t.position.to_array(),
            rotation: t.rotation.to_array(),
            scale: t.scale.to_array(),
            color: m.color.to_string(),
            base_color: m.base_color.to_string(),
            wireframe: m.wireframe,
            highlighted: m.is_highlighted(),
            pickable: e.is_pickable(),
            casts_shadow: e.shadows().casts,
        })
    }

    /// Every entity, in registry order.
    pub fn entities(registry: &Registry) -> Vec<EntityInfo> {
        registry
            .iter()
            .filter_map(|(id, _)| Self::inspect_entity(registry, id))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraInfo {
    pub position: [f32; 3],
    pub look_at: [f32; 3],
    pub tracking: bool,
    pub fov_degrees: f32,
    pub aspect: f32,
}

impl From<&CameraPose> for CameraInfo {
    fn from(cam: &CameraPose) -> Self {
        Self {
            position: cam.position().to_array(),
            look_at: cam.look_at().to_array(),
            tracking: cam.tracking().is_some(),
            fov_degrees: cam.fov_degrees(),
            aspect: cam.aspect(),
        }
    }
}

/// Summary of scene state for the inspector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneSummary {
    pub frames: u64,
    pub step: f64,
    pub entity_count: usize,
    pub pickable_count: usize,
    /// Names of entities showing the highlight colour.
    pub highlighted: Vec<String>,
    pub camera: CameraInfo,
}

impl fmt::Display for SceneSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Scene: frames={} step={:.3} entities={} pickable={} highlighted=[{}] fov={:.0}",
            self.frames,
            self.step,
            self.entity_count,
            self.pickable_count,
            self.highlighted.join(", "),
            self.camera.fov_degrees
        )
    }
}

/// Detailed info about a single entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityInfo {
    pub id: EntityId,
    pub name: String,
    pub kind: &'static str,
    pub position: [f32; 3],
    /// XYZ Euler angles, radians.
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
    pub color: String,
    pub base_color: String,
    pub wireframe: bool,
    pub highlighted: bool,
    pub pickable: bool,
    pub casts_shadow: bool,
}

impl fmt::Display for EntityInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({}) pos=({:.2}, {:.2}, {:.2}) scale=({:.2}, {:.2}, {:.2}) color={}",
            self.id.short(),
            self.name,
            self.kind,
            self.position[0],
            self.position[1],
            self.position[2],
            self.scale[0],
            self.scale[1],
            self.scale[2],
            self.color,
        )?;
        if self.highlighted {
            write!(f, " (base {})", self.base_color)?;
        }
        Ok(())
    }
}
