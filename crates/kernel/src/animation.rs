//! Per-frame deterministic animation.
//!
//! Given the same registry, clock value and speed, [`AnimationRig::step`]
//! always produces the same state. Nothing here reads wall-clock time.

use crate::camera::CameraPose;
use crate::registry::Registry;
use diorama_common::{EntityId, TransformPatch};
use glam::Vec3;

/// Per-frame rotation added to the cube.
pub const CUBE_SPIN: Vec3 = Vec3::new(0.01, 0.01, 0.0);
/// Per-frame rotation added to the wireframe overlay (counter-rotating).
pub const OVERLAY_SPIN: Vec3 = Vec3::new(-0.01, -0.01, 0.0);

/// Animation clock. Starts at zero and only ever moves by the speed it is given.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Clock {
    step: f64,
    frames: u64,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Frames advanced so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn advance(&mut self, rate: f32) -> f64 {
        self.step += f64::from(rate);
        self.frames += 1;
        self.step
    }
}

/// Rectified sine bounce along one axis: `amplitude * |sin(step)| + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounce {
    pub amplitude: f32,
    pub offset: f32,
}

impl Default for Bounce {
    fn default() -> Self {
        Self {
            amplitude: 10.0,
            offset: -8.0,
        }
    }
}

impl Bounce {
    pub fn height(&self, step: f64) -> f32 {
        (f64::from(self.amplitude) * step.sin().abs() + f64::from(self.offset)) as f32
    }

    /// Closed range of [`Bounce::height`].
    pub fn range(&self) -> (f32, f32) {
        let a = self.offset;
        let b = self.offset + self.amplitude;
        (a.min(b), a.max(b))
    }
}

/// Fixed rotation applied to one entity every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spin {
    pub entity: EntityId,
    pub delta: Vec3,
}

/// Which entities move, and how.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationRig {
    pub spins: Vec<Spin>,
    /// Entity whose Z position follows the bounce.
    pub bouncer: Option<EntityId>,
    pub bounce: Bounce,
    /// Aim the camera at the bouncer every frame.
    pub track_bouncer: bool,
}

impl AnimationRig {
    /// Cube and overlay counter-rotating, sphere bouncing.
    pub fn new(cube: EntityId, overlay: EntityId, sphere: EntityId) -> Self {
        Self {
            spins: vec![
                Spin {
                    entity: cube,
                    delta: CUBE_SPIN,
                },
                Spin {
                    entity: overlay,
                    delta: OVERLAY_SPIN,
                },
            ],
            bouncer: Some(sphere),
            bounce: Bounce::default(),
            track_bouncer: false,
        }
    }

    /// Advance one frame. Returns the bouncer's new position, if there is one.
    pub fn step(
        &self,
        registry: &mut Registry,
        clock: &mut Clock,
        speed: f32,
        camera: &mut CameraPose,
    ) -> Option<Vec3> {
        for spin in &self.spins {
            registry.rotate(spin.entity, spin.delta);
        }

        let step = clock.advance(speed);

        let bounced = self.bouncer.map(|id| {
            registry.set_transform(id, TransformPatch::new().position_z(self.bounce.height(step)));
            registry.get(id).transform().position
        });

        camera.track(if self.track_bouncer { bounced } else { None });

        tracing::trace!(step, ?bounced, "animation step");
        bounced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use crate::geometry::Geometry;
    use diorama_common::Transform;

    fn scene() -> (Registry, AnimationRig) {
        let mut r = Registry::new();
        let cube = r.spawn(Entity::new("cube", Geometry::cuboid(2.0, 2.0, 2.0)));
        let edges = r.spawn(Entity::new("edges", Geometry::edges(2.0, 2.0, 2.0)));
        let sphere = r.spawn(
            Entity::new("sphere", Geometry::Sphere { radius: 2.0 })
                .with_transform(Transform::from_position(Vec3::new(0.0, 15.0, 0.0))),
        );
        (r, AnimationRig::new(cube, edges, sphere))
    }

    #[test]
    fn clock_starts_at_zero() {
        let c = Clock::new();
        assert_eq!(c.step(), 0.0);
        assert_eq!(c.frames(), 0);
    }

    #[test]
    fn clock_is_monotonic_for_non_negative_speed() {
        let mut c = Clock::new();
        let mut last = c.step();
        for i in 0..500 {
            let speed = (i % 11) as f32 * 0.01;
            let now = c.advance(speed);
            assert!(now >= last);
            last = now;
        }
        assert_eq!(c.frames(), 500);
    }

    #[test]
    fn bounce_stays_in_range() {
        let b = Bounce::default();
        assert_eq!(b.range(), (-8.0, 2.0));
        let mut step = -50.0;
        while step < 50.0 {
            let z = b.height(step);
            assert!((-8.0..=2.0).contains(&z), "z={z} at step={step}");
            step += 0.037;
        }
        assert_eq!(b.height(0.0), -8.0);
        assert!((b.height(std::f64::consts::FRAC_PI_2) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn cube_and_overlay_counter_rotate() {
        let (mut r, rig) = scene();
        let mut clock = Clock::new();
        let mut cam = CameraPose::default();
        for _ in 0..10 {
            rig.step(&mut r, &mut clock, 0.01, &mut cam);
        }
        let cube = r.get(rig.spins[0].entity).transform().rotation;
        let edges = r.get(rig.spins[1].entity).transform().rotation;
        assert!((cube.x - 0.1).abs() < 1e-5 && (cube.y - 0.1).abs() < 1e-5);
        assert!((edges.x + 0.1).abs() < 1e-5 && (edges.y + 0.1).abs() < 1e-5);
        assert_eq!(cube.z, 0.0);
    }

    #[test]
    fn sphere_moves_only_along_z() {
        let (mut r, rig) = scene();
        let mut clock = Clock::new();
        let mut cam = CameraPose::default();
        let pos = rig.step(&mut r, &mut clock, 0.5, &mut cam).unwrap();
        assert_eq!(pos.x, 0.0);
        assert_eq!(pos.y, 15.0);
        assert!((pos.z - (10.0 * 0.5f32.sin().abs() - 8.0)).abs() < 1e-5);
    }

    #[test]
    fn zero_speed_holds_the_bounce() {
        let (mut r, rig) = scene();
        let mut clock = Clock::new();
        let mut cam = CameraPose::default();
        let a = rig.step(&mut r, &mut clock, 0.0, &mut cam);
        let b = rig.step(&mut r, &mut clock, 0.0, &mut cam);
        assert_eq!(a, b);
        assert_eq!(clock.step(), 0.0);
    }

    #[test]
    fn tracking_follows_sphere() {
        let (mut r, mut rig) = scene();
        let mut clock = Clock::new();
        let mut cam = CameraPose::default();

        rig.step(&mut r, &mut clock, 0.3, &mut cam);
        assert_eq!(cam.tracking(), None);

        rig.track_bouncer = true;
        let pos = rig.step(&mut r, &mut clock, 0.3, &mut cam).unwrap();
        assert_eq!(cam.look_at(), pos);

        rig.track_bouncer = false;
        rig.step(&mut r, &mut clock, 0.3, &mut cam);
        assert_eq!(cam.look_at(), cam.target());
    }

    #[test]
    fn same_inputs_same_state() {
        let (mut r1, rig) = scene();
        let mut r2 = r1.clone();
        let (mut c1, mut c2) = (Clock::new(), Clock::new());
        let (mut cam1, mut cam2) = (CameraPose::default(), CameraPose::default());
        for _ in 0..100 {
            rig.step(&mut r1, &mut c1, 0.02, &mut cam1);
            rig.step(&mut r2, &mut c2, 0.02, &mut cam2);
        }
        for ((_, a), (_, b)) in r1.iter().zip(r2.iter()) {
            assert_eq!(a.transform(), b.transform());
        }
    }
}
