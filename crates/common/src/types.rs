use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable handle for an entity in the scene registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, for log lines and inspector labels.
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

/// Spatial transform: position, rotation, scale.
///
/// Rotation is stored as XYZ Euler angles in radians so that per-axis
/// accumulation (`rotation.x += delta`) stays exact frame after frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn quat(&self) -> Quat {
        Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z)
    }

    /// Local-to-world matrix (scale, then rotate, then translate).
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.quat(), self.position)
    }
}

/// A partial transform update. Unset components are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransformPatch {
    pub position: [Option<f32>; 3],
    pub rotation: [Option<f32>; 3],
    pub scale: [Option<f32>; 3],
}

impl TransformPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_position(mut self, p: Vec3) -> Self {
        self.position = [Some(p.x), Some(p.y), Some(p.z)];
        self
    }

    pub fn with_rotation(mut self, r: Vec3) -> Self {
        self.rotation = [Some(r.x), Some(r.y), Some(r.z)];
        self
    }

    pub fn with_scale(mut self, s: Vec3) -> Self {
        self.scale = [Some(s.x), Some(s.y), Some(s.z)];
        self
    }

    pub fn position_x(mut self, v: f32) -> Self {
        self.position[0] = Some(v);
        self
    }

    pub fn position_y(mut self, v: f32) -> Self {
        self.position[1] = Some(v);
        self
    }

    pub fn position_z(mut self, v: f32) -> Self {
        self.position[2] = Some(v);
        self
    }

    pub fn rotation_y(mut self, v: f32) -> Self {
        self.rotation[1] = Some(v);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.position
            .iter()
            .chain(&self.rotation)
            .chain(&self.scale)
            .all(Option::is_none)
    }

    /// Write the set components into `t`.
    pub fn apply(&self, t: &mut Transform) {
        apply_axes(&mut t.position, &self.position);
        apply_axes(&mut t.rotation, &self.rotation);
        apply_axes(&mut t.scale, &self.scale);
    }
}

fn apply_axes(target: &mut Vec3, axes: &[Option<f32>; 3]) {
    if let Some(x) = axes[0] {
        target.x = x;
    }
    if let Some(y) = axes[1] {
        target.y = y;
    }
    if let Some(z) = axes[2] {
        target.z = z;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_uniqueness() {
        let a = EntityId::new();
        let b = EntityId::new();
        assert_ne!(a, b);
        assert_eq!(a.short().len(), 8);
    }

    #[test]
    fn transform_default_is_identity() {
        let t = Transform::default();
        assert_eq!(t.position, Vec3::ZERO);
        assert_eq!(t.rotation, Vec3::ZERO);
        assert_eq!(t.scale, Vec3::ONE);
        assert_eq!(t.matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn patch_touches_only_set_axes() {
        let mut t = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));
        TransformPatch::new().position_y(10.0).apply(&mut t);
        assert_eq!(t.position, Vec3::new(1.0, 10.0, 3.0));
        assert_eq!(t.scale, Vec3::ONE);
    }

    #[test]
    fn empty_patch_is_noop() {
        let patch = TransformPatch::new();
        assert!(patch.is_empty());
        let mut t = Transform::from_position(Vec3::X);
        patch.apply(&mut t);
        assert_eq!(t, Transform::from_position(Vec3::X));
    }

    #[test]
    fn matrix_applies_translation_last() {
        let t = Transform {
            position: Vec3::new(0.0, 5.0, 0.0),
            rotation: Vec3::new(0.0, std::f32::consts::FRAC_PI_2, 0.0),
            scale: Vec3::splat(2.0),
        };
        let p = t.matrix().transform_point3(Vec3::X);
        // +X rotated a quarter turn about Y lands on -Z, doubled, then lifted.
        assert!((p - Vec3::new(0.0, 5.0, -2.0)).length() < 1e-5);
    }
}
