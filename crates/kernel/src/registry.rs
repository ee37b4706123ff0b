use crate::entity::{Entity, Material};
use diorama_common::{Color, EntityId, TransformPatch};
use glam::Vec3;
use std::collections::{BTreeMap, BTreeSet};

/// The entity registry: sole owner of entity state.
///
/// All mutations go through the setters below. Each setter marks the entity
/// dirty; renderers either drain the dirty set or simply re-read every entity
/// each frame.
///
/// Handles are trusted. Passing a handle that was never spawned is a wiring
/// bug, so the setters panic instead of returning an error.
///
/// Uses BTreeMap for deterministic iteration order.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entities: BTreeMap<EntityId, Entity>,
    dirty: BTreeSet<EntityId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entities in the registry.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Insert an entity and return its handle.
    pub fn spawn(&mut self, entity: Entity) -> EntityId {
        let id = EntityId::new();
        tracing::debug!(id = %id.short(), name = entity.name(), kind = entity.geometry().kind(), "spawned entity");
        self.entities.insert(id, entity);
        self.dirty.insert(id);
        id
    }

    /// Look up an entity. Panics on an unknown handle.
    #[track_caller]
    pub fn get(&self, id: EntityId) -> &Entity {
        match self.entities.get(&id) {
            Some(e) => e,
            None => panic!("unknown entity handle {}", id.0),
        }
    }

    pub fn try_get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// All entities in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities.iter().map(|(id, e)| (*id, e))
    }

    /// Handles of every entity that may be picked.
    pub fn pickable(&self) -> Vec<EntityId> {
        self.iter()
            .filter(|(_, e)| e.is_pickable())
            .map(|(id, _)| id)
            .collect()
    }

    /// First entity with the given name.
    pub fn find(&self, name: &str) -> Option<EntityId> {
        self.iter().find(|(_, e)| e.name() == name).map(|(id, _)| id)
    }

    /// Set the base colour. Also replaces whatever colour is currently shown.
    #[track_caller]
    pub fn set_color(&mut self, id: EntityId, color: Color) {
        let m = &mut self.entry_mut(id).material;
        m.base_color = color;
        m.color = color;
    }

    /// Override the displayed colour only; the base colour is kept.
    #[track_caller]
    pub fn show_color(&mut self, id: EntityId, color: Color) {
        let entity = self.entities.get_mut(&id);
        let Some(entity) = entity else {
            panic!("unknown entity handle {}", id.0);
        };
        if entity.material.color != color {
            entity.material.color = color;
            self.dirty.insert(id);
        }
    }

    /// Put the displayed colour back to the base colour.
    #[track_caller]
    pub fn reset_color(&mut self, id: EntityId) {
        let base = self.get(id).material().base_color;
        self.show_color(id, base);
    }

    #[track_caller]
    pub fn set_transform(&mut self, id: EntityId, patch: TransformPatch) {
        patch.apply(&mut self.entry_mut(id).transform);
    }

    #[track_caller]
    pub fn set_wireframe(&mut self, id: EntityId, wireframe: bool) {
        self.entry_mut(id).material.wireframe = wireframe;
    }

    /// Uniform scale on all three axes.
    #[track_caller]
    pub fn set_scale(&mut self, id: EntityId, scale: f32) {
        self.entry_mut(id).transform.scale = Vec3::splat(scale);
    }

    /// Add `delta` (radians, XYZ Euler) to the current rotation.
    #[track_caller]
    pub fn rotate(&mut self, id: EntityId, delta: Vec3) {
        self.entry_mut(id).transform.rotation += delta;
    }

    /// Edit any material field in one go.
    #[track_caller]
    pub fn update_material(&mut self, id: EntityId, edit: impl FnOnce(&mut Material)) {
        edit(&mut self.entry_mut(id).material);
    }

    pub fn is_dirty(&self, id: EntityId) -> bool {
        self.dirty.contains(&id)
    }

    /// Drain and return the set of entities touched since the last drain.
    pub fn drain_dirty(&mut self) -> BTreeSet<EntityId> {
        std::mem::take(&mut self.dirty)
    }

    #[track_caller]
    fn entry_mut(&mut self, id: EntityId) -> &mut Entity {
        match self.entities.get_mut(&id) {
            Some(e) => {
                self.dirty.insert(id);
                e
            }
            None => panic!("unknown entity handle {}", id.0),
        }
    }
}
