use glam::{Mat4, Vec3};

/// Perspective camera pose.
///
/// The projection matrix is cached. Changing the field of view does not
/// refresh it; call [`CameraPose::update_projection`] afterwards, the same
/// way the panel's `fov` binding does. Viewport changes refresh immediately.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraPose {
    position: Vec3,
    target: Vec3,
    tracking: Option<Vec3>,
    fov_degrees: f32,
    aspect: f32,
    near: f32,
    far: f32,
    projection: Mat4,
}

impl Default for CameraPose {
    fn default() -> Self {
        Self::new(Vec3::new(-10.0, 20.0, 10.0), Vec3::ZERO, 125.0, 16.0 / 9.0)
    }
}

impl CameraPose {
    pub fn new(position: Vec3, target: Vec3, fov_degrees: f32, aspect: f32) -> Self {
        let mut cam = Self {
            position,
            target,
            tracking: None,
            fov_degrees,
            aspect,
            near: 0.1,
            far: 1000.0,
            projection: Mat4::IDENTITY,
        };
        cam.update_projection();
        cam
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Fixed aim point, used when nothing is being tracked.
    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn set_target(&mut self, target: Vec3) {
        self.target = target;
    }

    /// Dynamic aim point that overrides the fixed target while set.
    pub fn tracking(&self) -> Option<Vec3> {
        self.tracking
    }

    pub fn track(&mut self, point: Option<Vec3>) {
        self.tracking = point;
    }

    /// The point the camera aims at this frame.
    pub fn look_at(&self) -> Vec3 {
        self.tracking.unwrap_or(self.target)
    }

    pub fn fov_degrees(&self) -> f32 {
        self.fov_degrees
    }

    pub fn set_fov(&mut self, fov_degrees: f32) {
        self.fov_degrees = fov_degrees;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    /// Resize hook: recompute aspect and refresh the projection.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
        self.update_projection();
    }

    /// Recompute the cached projection from fov, aspect and clip planes.
    pub fn update_projection(&mut self) {
        let fov = self.fov_degrees.clamp(0.01, 179.99).to_radians();
        self.projection = Mat4::perspective_rh(fov, self.aspect, self.near, self.far);
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn forward(&self) -> Vec3 {
        (self.look_at() - self.position)
            .try_normalize()
            .unwrap_or(Vec3::NEG_Z)
    }

    pub fn view_matrix(&self) -> Mat4 {
        let forward = self.forward();
        // Looking straight up or down makes +Y a degenerate up vector.
        let up = if forward.cross(Vec3::Y).length_squared() < 1e-8 {
            Vec3::Z
        } else {
            Vec3::Y
        };
        Mat4::look_to_rh(self.position, forward, up)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_camera_matches_scene_start() {
        let cam = CameraPose::default();
        assert_eq!(cam.position(), Vec3::new(-10.0, 20.0, 10.0));
        assert_eq!(cam.fov_degrees(), 125.0);
        let vp = cam.view_projection();
        assert!(!vp.col(0).x.is_nan());
    }

    #[test]
    fn fov_needs_explicit_refresh() {
        let mut cam = CameraPose::default();
        let before = cam.projection();
        cam.set_fov(60.0);
        assert_eq!(cam.projection(), before);
        cam.update_projection();
        assert_ne!(cam.projection(), before);
    }

    #[test]
    fn viewport_refreshes_projection() {
        let mut cam = CameraPose::default();
        let before = cam.projection();
        cam.set_viewport(800, 800);
        assert_eq!(cam.aspect(), 1.0);
        assert_ne!(cam.projection(), before);
    }

    #[test]
    fn zero_height_viewport_is_clamped() {
        let mut cam = CameraPose::default();
        cam.set_viewport(640, 0);
        assert_eq!(cam.aspect(), 640.0);
    }

    #[test]
    fn tracking_overrides_target() {
        let mut cam = CameraPose::default();
        assert_eq!(cam.look_at(), Vec3::ZERO);
        cam.track(Some(Vec3::new(0.0, 15.0, -3.0)));
        assert_eq!(cam.look_at(), Vec3::new(0.0, 15.0, -3.0));
        cam.track(None);
        assert_eq!(cam.look_at(), Vec3::ZERO);
    }

    #[test]
    fn vertical_view_has_finite_matrix() {
        let cam = CameraPose::new(Vec3::new(0.0, 10.0, 0.0), Vec3::ZERO, 60.0, 1.0);
        let v = cam.view_matrix();
        assert!(v.is_finite());
    }
}
