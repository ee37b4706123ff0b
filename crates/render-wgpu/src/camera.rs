use diorama_kernel::CameraPose;
use glam::Vec3;

/// Orbit controls: drag rotates the camera around its fixed target, the
/// wheel dollies towards or away from it. Both are bounded.
///
/// Camera motion from here never goes through the parameter store, so the
/// panel's camera sliders keep their last written values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitController {
    /// Radians per pixel of drag.
    pub rotate_speed: f32,
    /// Distance multiplier per wheel line towards the target.
    pub zoom_factor: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Polar angle limits, radians from +Y.
    pub min_polar: f32,
    pub max_polar: f32,
}

impl Default for OrbitController {
    fn default() -> Self {
        Self {
            rotate_speed: 0.005,
            zoom_factor: 0.95,
            min_distance: 1.0,
            max_distance: 200.0,
            min_polar: 0.01,
            max_polar: std::f32::consts::PI - 0.01,
        }
    }
}

impl OrbitController {
    /// Rotate by a drag of `(dx, dy)` pixels. Dragging right swings the
    /// camera left around the target; dragging down raises it.
    pub fn orbit(&self, camera: &mut CameraPose, dx: f32, dy: f32) {
        let target = camera.target();
        let offset = camera.position() - target;
        let radius = offset.length();
        if radius < 1e-6 {
            return;
        }
        let theta = offset.x.atan2(offset.z) - dx * self.rotate_speed;
        let phi = ((offset.y / radius).clamp(-1.0, 1.0).acos() - dy * self.rotate_speed)
            .clamp(self.min_polar, self.max_polar);
        camera.set_position(target + spherical(radius, theta, phi));
    }

    /// Move `lines` wheel steps closer (negative moves away).
    pub fn zoom(&self, camera: &mut CameraPose, lines: f32) {
        let target = camera.target();
        let offset = camera.position() - target;
        let Some(dir) = offset.try_normalize() else {
            return;
        };
        let radius = (offset.length() * self.zoom_factor.powf(lines))
            .clamp(self.min_distance, self.max_distance);
        camera.set_position(target + dir * radius);
    }
}

fn spherical(radius: f32, theta: f32, phi: f32) -> Vec3 {
    Vec3::new(
        radius * phi.sin() * theta.sin(),
        radius * phi.cos(),
        radius * phi.sin() * theta.cos(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn distance(cam: &CameraPose) -> f32 {
        (cam.position() - cam.target()).length()
    }

    #[test]
    fn orbit_keeps_distance_to_target() {
        let ctl = OrbitController::default();
        let mut cam = CameraPose::default();
        let before = distance(&cam);
        ctl.orbit(&mut cam, 120.0, -40.0);
        assert!((distance(&cam) - before).abs() < 1e-3);
        assert_ne!(cam.position(), CameraPose::default().position());
    }

    #[test]
    fn no_drag_is_identity() {
        let ctl = OrbitController::default();
        let mut cam = CameraPose::default();
        ctl.orbit(&mut cam, 0.0, 0.0);
        assert!(cam.position().distance(CameraPose::default().position()) < 1e-4);
    }

    #[test]
    fn polar_angle_is_clamped() {
        let ctl = OrbitController::default();
        let mut cam = CameraPose::default();
        ctl.orbit(&mut cam, 0.0, 1.0e6);
        let offset = (cam.position() - cam.target()).normalize();
        assert!(offset.y < 1.0);
        assert!(offset.y > 0.99);
    }

    #[test]
    fn zoom_is_bounded() {
        let ctl = OrbitController::default();
        let mut cam = CameraPose::default();
        let before = distance(&cam);
        ctl.zoom(&mut cam, 1.0);
        assert!(distance(&cam) < before);
        ctl.zoom(&mut cam, 1000.0);
        assert!((distance(&cam) - ctl.min_distance).abs() < 1e-4);
        ctl.zoom(&mut cam, -1000.0);
        assert!((distance(&cam) - ctl.max_distance).abs() < 1e-2);
    }

    #[test]
    fn camera_on_target_is_left_alone() {
        let ctl = OrbitController::default();
        let mut cam = CameraPose::new(Vec3::ZERO, Vec3::ZERO, 60.0, 1.0);
        ctl.orbit(&mut cam, 10.0, 10.0);
        ctl.zoom(&mut cam, 1.0);
        assert_eq!(cam.position(), Vec3::ZERO);
    }
}
