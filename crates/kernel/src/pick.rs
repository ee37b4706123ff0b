//! Pointer picking and the per-frame highlight protocol.
//!
//! Highlighting is recomputed from scratch every frame:
//! 1. [`pick`] resolves the closest entity under the pointer,
//! 2. [`highlight_set`] expands it through the linked groups,
//! 3. [`apply_highlight`] resets every entity to its base colour and paints
//!    the set with the highlight colour.
//!
//! No entity carries an "is highlighted" flag between frames, so a pointer
//! that leaves an object without a final move event cannot leave a stale
//! highlight behind.

use crate::camera::CameraPose;
use crate::registry::Registry;
use diorama_common::{Color, EntityId};
use glam::{Vec2, Vec3};
use std::collections::BTreeSet;

/// A world-space ray with a unit direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Ray from the camera through a pointer position in normalized device
    /// coordinates (x right, y up, both in -1..=1).
    pub fn from_ndc(ndc: Vec2, camera: &CameraPose) -> Self {
        let inv = camera.view_projection().inverse();
        let far = inv.project_point3(Vec3::new(ndc.x, ndc.y, 1.0));
        Self::new(camera.position(), far - camera.position())
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    pub fn is_degenerate(&self) -> bool {
        self.direction == Vec3::ZERO || !self.direction.is_finite()
    }
}

/// Result of a successful pick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    pub entity: EntityId,
    pub distance: f32,
    pub point: Vec3,
}

/// Distance along `ray` to the entity's surface, if the ray hits it.
///
/// The ray is moved into the entity's local space, so rotation and
/// non-uniform scale are honoured. An entity whose transform collapses a
/// dimension (scale 0) cannot be hit.
pub fn intersect(ray: &Ray, registry: &Registry, id: EntityId) -> Option<f32> {
    let entity = registry.get(id);
    let model = entity.transform().matrix();
    if model.determinant().abs() < 1e-12 {
        return None;
    }
    let inv = model.inverse();
    let origin = inv.transform_point3(ray.origin);
    let dir = inv.transform_vector3(ray.direction);
    entity
        .geometry()
        .intersect_local(origin, dir)
        .filter(|t| *t > 0.0 && t.is_finite())
}

/// Closest candidate hit by the ray through `ndc`, or `None`.
pub fn pick(
    ndc: Vec2,
    camera: &CameraPose,
    registry: &Registry,
    candidates: impl IntoIterator<Item = EntityId>,
) -> Option<PickHit> {
    pick_ray(&Ray::from_ndc(ndc, camera), registry, candidates)
}

/// [`pick`] with an explicit ray.
pub fn pick_ray(
    ray: &Ray,
    registry: &Registry,
    candidates: impl IntoIterator<Item = EntityId>,
) -> Option<PickHit> {
    if ray.is_degenerate() {
        return None;
    }
    candidates
        .into_iter()
        .filter_map(|id| intersect(ray, registry, id).map(|t| (id, t)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(entity, distance)| PickHit {
            entity,
            distance,
            point: ray.at(distance),
        })
}

/// Groups of entities that highlight together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HighlightLinks {
    groups: Vec<Vec<EntityId>>,
}

impl HighlightLinks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Link `members` so a hit on any of them highlights all of them.
    pub fn link(&mut self, members: impl IntoIterator<Item = EntityId>) {
        let members: Vec<EntityId> = members.into_iter().collect();
        if members.len() > 1 {
            self.groups.push(members);
        }
    }

    /// Every entity highlighted alongside `id`, including `id` itself.
    pub fn group_of(&self, id: EntityId) -> BTreeSet<EntityId> {
        let mut set = BTreeSet::from([id]);
        for group in self.groups.iter().filter(|g| g.contains(&id)) {
            set.extend(group.iter().copied());
        }
        set
    }
}

/// The set of entities to highlight this frame.
pub fn highlight_set(hit: Option<EntityId>, links: &HighlightLinks) -> BTreeSet<EntityId> {
    hit.map(|id| links.group_of(id)).unwrap_or_default()
}

/// Reset every entity to its base colour, then paint `set` with `color`.
///
/// Each entity's final colour is resolved before it is written, so an
/// unchanged highlight leaves the registry clean.
pub fn apply_highlight(registry: &mut Registry, set: &BTreeSet<EntityId>, color: Color) {
    let targets: Vec<(EntityId, Color)> = registry
        .iter()
        .map(|(id, e)| {
            let shown = if set.contains(&id) {
                color
            } else {
                e.material().base_color
            };
            (id, shown)
        })
        .collect();
    for (id, shown) in targets {
        registry.show_color(id, shown);
    }
}
