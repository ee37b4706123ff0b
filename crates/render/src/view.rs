use diorama_kernel::CameraPose;
use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Camera matrices for one frame, captured from a [`CameraPose`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderView {
    /// Camera position in world space.
    pub eye: Vec3,
    /// Point the camera is aimed at this frame (tracked or fixed).
    pub look_at: Vec3,
    pub fov_degrees: f32,
    pub aspect: f32,
    pub view: Mat4,
    pub projection: Mat4,
}

impl RenderView {
    pub fn from_camera(camera: &CameraPose) -> Self {
        Self {
            eye: camera.position(),
            look_at: camera.look_at(),
            fov_degrees: camera.fov_degrees(),
            aspect: camera.aspect(),
            view: camera.view_matrix(),
            projection: camera.projection(),
        }
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }
}

impl Default for RenderView {
    fn default() -> Self {
        Self::from_camera(&CameraPose::default())
    }
}

/// Bloom tuning. Mirrors the usual "unreal bloom" knobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BloomSettings {
    /// Multiplier on the blurred highlights added back to the image.
    pub strength: f32,
    /// Luminance above which a pixel contributes to bloom.
    pub threshold: f32,
    /// Blur spread, in half-resolution texels per tap.
    pub radius: f32,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            strength: 1.5,
            threshold: 0.85,
            radius: 0.4,
        }
    }
}

/// Post-process chain applied after the base pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PostProcess {
    pub bloom_enabled: bool,
    pub bloom: BloomSettings,
}

impl PostProcess {
    /// Bloom settings if the pass should run this frame.
    pub fn active_bloom(&self) -> Option<BloomSettings> {
        (self.bloom_enabled && self.bloom.strength > 0.0).then_some(self.bloom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_mirrors_camera() {
        let mut cam = CameraPose::default();
        cam.track(Some(Vec3::new(0.0, 15.0, 2.0)));
        let view = RenderView::from_camera(&cam);
        assert_eq!(view.eye, cam.position());
        assert_eq!(view.look_at, Vec3::new(0.0, 15.0, 2.0));
        assert_eq!(view.view_projection(), cam.view_projection());
    }

    #[test]
    fn bloom_off_by_default() {
        let post = PostProcess::default();
        assert!(post.active_bloom().is_none());
    }

    #[test]
    fn zero_strength_skips_bloom() {
        let mut post = PostProcess {
            bloom_enabled: true,
            ..PostProcess::default()
        };
        assert!(post.active_bloom().is_some());
        post.bloom.strength = 0.0;
        assert!(post.active_bloom().is_none());
    }
}
