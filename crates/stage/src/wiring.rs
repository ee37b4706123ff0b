//! Parameter definitions and the scene mutation each one drives.

use crate::scene::SceneState;
use diorama_common::{Color, TransformPatch};
use diorama_params::{ParamError, ParamKind, ParameterStore};

pub const SPHERE_COLOR: &str = "sphere_color";
pub const WIREFRAME: &str = "wireframe";
pub const SPEED: &str = "speed";
pub const SPHERE_SIZE: &str = "sphere_size";
pub const SPHERE_X: &str = "sphere_x";
pub const SPHERE_Z: &str = "sphere_z";
pub const CUBE_Y: &str = "cube_y";
pub const CAMERA_X: &str = "camera_x";
pub const CAMERA_Y: &str = "camera_y";
pub const CAMERA_Z: &str = "camera_z";
pub const FOV: &str = "fov";
pub const TRACK_SPHERE: &str = "track_sphere";
pub const BLOOM: &str = "bloom";
pub const BLOOM_STRENGTH: &str = "bloom_strength";
pub const BLOOM_THRESHOLD: &str = "bloom_threshold";

pub type SceneParams = ParameterStore<SceneState>;

/// Define every panel parameter with its range and initial value, then bind
/// the callbacks. Initial values are stored as-is; no callback runs here.
pub fn wire(scene: &SceneState) -> Result<SceneParams, ParamError> {
    let mut p = SceneParams::new();
    let cam = scene.camera.position();

    p.define(SPHERE_COLOR, ParamKind::Color, Color::WHITE)?;
    p.define(WIREFRAME, ParamKind::Toggle, false)?;
    p.define(SPEED, ParamKind::number(0.0, 0.1), 0.01)?;
    p.define(SPHERE_SIZE, ParamKind::number(0.0, 3.5), 2.0)?;
    p.define(SPHERE_X, ParamKind::number(-20.0, 20.0), 0.0)?;
    p.define(SPHERE_Z, ParamKind::number(-20.0, 20.0), 0.0)?;
    p.define(CUBE_Y, ParamKind::number(-5.0, 20.0), 10.0)?;
    p.define(CAMERA_X, ParamKind::number(-20.0, 20.0), cam.x)?;
    p.define(CAMERA_Y, ParamKind::number(-20.0, 50.0), cam.y)?;
    p.define(CAMERA_Z, ParamKind::number(-20.0, 20.0), cam.z)?;
    p.define(
        FOV,
        ParamKind::number(1.0, 180.0).with_step(5.0),
        scene.camera.fov_degrees(),
    )?;
    p.define(TRACK_SPHERE, ParamKind::Toggle, scene.rig.track_bouncer)?;
    p.define(BLOOM, ParamKind::Toggle, scene.post.bloom_enabled)?;
    p.define(
        BLOOM_STRENGTH,
        ParamKind::number(0.0, 3.0),
        scene.post.bloom.strength,
    )?;
    p.define(
        BLOOM_THRESHOLD,
        ParamKind::number(0.0, 1.0),
        scene.post.bloom.threshold,
    )?;

    let h = scene.handles;

    p.bind_color(SPHERE_COLOR, move |s, c| s.registry.set_color(h.sphere, c))?;
    p.bind_toggle(WIREFRAME, move |s, on| s.registry.set_wireframe(h.sphere, on))?;
    p.bind_number(SPHERE_SIZE, move |s, v| s.registry.set_scale(h.sphere, v))?;
    p.bind_number(SPHERE_X, move |s, v| {
        s.registry
            .set_transform(h.sphere, TransformPatch::new().position_x(v))
    })?;
    // Overwritten by the bounce on the next frame.
    p.bind_number(SPHERE_Z, move |s, v| {
        s.registry
            .set_transform(h.sphere, TransformPatch::new().position_z(v))
    })?;
    p.bind_number(CUBE_Y, move |s, v| {
        for id in [h.cube, h.edges] {
            s.registry
                .set_transform(id, TransformPatch::new().position_y(v));
        }
    })?;

    p.bind_number(CAMERA_X, |s, v| {
        let pos = s.camera.position().with_x(v);
        s.camera.set_position(pos);
    })?;
    p.bind_number(CAMERA_Y, |s, v| {
        let pos = s.camera.position().with_y(v);
        s.camera.set_position(pos);
    })?;
    p.bind_number(CAMERA_Z, |s, v| {
        let pos = s.camera.position().with_z(v);
        s.camera.set_position(pos);
    })?;
    p.bind_number(FOV, |s, v| {
        s.camera.set_fov(v);
        s.camera.update_projection();
    })?;

    p.bind_toggle(TRACK_SPHERE, |s, on| {
        s.rig.track_bouncer = on;
        if !on {
            s.camera.track(None);
        }
    })?;
    p.bind_toggle(BLOOM, |s, on| s.post.bloom_enabled = on)?;
    p.bind_number(BLOOM_STRENGTH, |s, v| s.post.bloom.strength = v)?;
    p.bind_number(BLOOM_THRESHOLD, |s, v| s.post.bloom.threshold = v)?;

    tracing::debug!(count = p.len(), "scene parameters wired");
    Ok(p)
}
