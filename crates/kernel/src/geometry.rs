use diorama_common::Color;
use glam::Vec3;
use std::sync::Arc;

/// Immutable shape data attached to an entity at spawn time.
///
/// Every shape is described in its own local space, centred on the origin.
/// Picking transforms rays into that space before calling
/// [`Geometry::intersect_local`].
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// Solid box.
    Cuboid { half_extents: Vec3 },
    /// Line outline of a box, drawn on top of a [`Geometry::Cuboid`].
    Edges { half_extents: Vec3 },
    /// Double-sided quad in the local XY plane.
    Plane { width: f32, height: f32 },
    Sphere { radius: f32 },
    /// Imported triangle mesh.
    Mesh(Arc<MeshData>),
    Light(Light),
}

impl Geometry {
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        Self::Cuboid {
            half_extents: Vec3::new(width, height, depth) * 0.5,
        }
    }

    pub fn edges(width: f32, height: f32, depth: f32) -> Self {
        Self::Edges {
            half_extents: Vec3::new(width, height, depth) * 0.5,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Cuboid { .. } => "cuboid",
            Self::Edges { .. } => "edges",
            Self::Plane { .. } => "plane",
            Self::Sphere { .. } => "sphere",
            Self::Mesh(_) => "mesh",
            Self::Light(Light::Ambient { .. }) => "ambient_light",
            Self::Light(Light::Directional { .. }) => "directional_light",
        }
    }

    pub fn is_light(&self) -> bool {
        matches!(self, Self::Light(_))
    }

    /// Closest non-negative ray parameter at which the local-space ray
    /// `origin + t * dir` meets the surface, if any.
    ///
    /// `dir` need not be normalized; `t` is expressed in units of `dir`.
    pub fn intersect_local(&self, origin: Vec3, dir: Vec3) -> Option<f32> {
        match self {
            Self::Cuboid { half_extents } | Self::Edges { half_extents } => {
                ray_aabb(origin, dir, -*half_extents, *half_extents)
            }
            Self::Plane { width, height } => ray_quad(origin, dir, *width * 0.5, *height * 0.5),
            Self::Sphere { radius } => ray_sphere(origin, dir, *radius),
            Self::Mesh(mesh) => mesh.intersect(origin, dir),
            Self::Light(_) => None,
        }
    }
}

/// Light sources. Lights are entities so the panel and inspector can see them,
/// but they are never pick candidates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    Ambient {
        color: Color,
        intensity: f32,
    },
    /// Shines from the entity position towards the origin.
    Directional {
        color: Color,
        intensity: f32,
        shadow_bounds: ShadowBounds,
    },
}

/// Orthographic extent of a directional light's shadow camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowBounds {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl ShadowBounds {
    pub fn square(half: f32) -> Self {
        Self {
            left: -half,
            right: half,
            top: half,
            bottom: -half,
        }
    }
}

/// Indexed triangle list produced by the asset importer.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    pub bounds_min: Vec3,
    pub bounds_max: Vec3,
}

impl MeshData {
    /// Build a mesh, computing bounds and (when absent) smooth vertex normals.
    ///
    /// Callers must pass indices that are in range for `positions`.
    pub fn new(
        name: impl Into<String>,
        positions: Vec<[f32; 3]>,
        normals: Option<Vec<[f32; 3]>>,
        indices: Vec<u32>,
    ) -> Self {
        debug_assert!(indices.iter().all(|&i| (i as usize) < positions.len()));
        let (bounds_min, bounds_max) = if positions.is_empty() {
            (Vec3::ZERO, Vec3::ZERO)
        } else {
            positions.iter().fold(
                (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
                |(lo, hi), p| {
                    let p = Vec3::from_array(*p);
                    (lo.min(p), hi.max(p))
                },
            )
        };
        let normals = match normals {
            Some(n) if n.len() == positions.len() => n,
            _ => smooth_normals(&positions, &indices),
        };
        Self {
            name: name.into(),
            positions,
            normals,
            indices,
            bounds_min,
            bounds_max,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    fn triangle(&self, i: usize) -> [Vec3; 3] {
        let v = |k: usize| Vec3::from_array(self.positions[self.indices[i * 3 + k] as usize]);
        [v(0), v(1), v(2)]
    }

    /// Local-space ray test: bounds first, then every triangle (both faces).
    pub fn intersect(&self, origin: Vec3, dir: Vec3) -> Option<f32> {
        ray_aabb(origin, dir, self.bounds_min, self.bounds_max)?;
        (0..self.triangle_count())
            .filter_map(|i| ray_triangle(origin, dir, self.triangle(i)))
            .min_by(f32::total_cmp)
    }
}

fn smooth_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut acc = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| i as usize);
        let face = (Vec3::from_array(positions[b]) - Vec3::from_array(positions[a]))
            .cross(Vec3::from_array(positions[c]) - Vec3::from_array(positions[a]));
        acc[a] += face;
        acc[b] += face;
        acc[c] += face;
    }
    acc.into_iter()
        .map(|n| n.try_normalize().unwrap_or(Vec3::Y).to_array())
        .collect()
}

/// Slab test against an axis-aligned box.
fn ray_aabb(origin: Vec3, dir: Vec3, min: Vec3, max: Vec3) -> Option<f32> {
    let mut t_near = f32::NEG_INFINITY;
    let mut t_far = f32::INFINITY;
    for axis in 0..3 {
        let (o, d) = (origin[axis], dir[axis]);
        if d.abs() < f32::EPSILON {
            // Parallel to this slab: must already lie between its planes.
            if o < min[axis] || o > max[axis] {
                return None;
            }
            continue;
        }
        let inv = 1.0 / d;
        let mut t0 = (min[axis] - o) * inv;
        let mut t1 = (max[axis] - o) * inv;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        t_near = t_near.max(t0);
        t_far = t_far.min(t1);
        if t_near > t_far {
            return None;
        }
    }
    if t_far < 0.0 || !t_far.is_finite() {
        return None;
    }
    Some(if t_near >= 0.0 { t_near } else { t_far })
}

fn ray_sphere(origin: Vec3, dir: Vec3, radius: f32) -> Option<f32> {
    let a = dir.dot(dir);
    let b = 2.0 * origin.dot(dir);
    let c = origin.dot(origin) - radius * radius;
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 || a == 0.0 {
        return None;
    }
    let sq = disc.sqrt();
    let t0 = (-b - sq) / (2.0 * a);
    let t1 = (-b + sq) / (2.0 * a);
    if t0 >= 0.0 {
        Some(t0)
    } else if t1 >= 0.0 {
        Some(t1)
    } else {
        None
    }
}

fn ray_quad(origin: Vec3, dir: Vec3, half_w: f32, half_h: f32) -> Option<f32> {
    if dir.z.abs() < f32::EPSILON {
        return None;
    }
    let t = -origin.z / dir.z;
    if t < 0.0 {
        return None;
    }
    let p = origin + dir * t;
    (p.x.abs() <= half_w && p.y.abs() <= half_h).then_some(t)
}

/// Möller–Trumbore, no back-face culling.
fn ray_triangle(origin: Vec3, dir: Vec3, [v0, v1, v2]: [Vec3; 3]) -> Option<f32> {
    let e1 = v1 - v0;
    let e2 = v2 - v0;
    let p = dir.cross(e2);
    let det = e1.dot(p);
    if det.abs() < 1e-9 {
        return None;
    }
    let inv_det = 1.0 / det;
    let s = origin - v0;
    let u = s.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(e1);
    let v = dir.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = e2.dot(q) * inv_det;
    (t >= 0.0).then_some(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_quad() -> MeshData {
        MeshData::new(
            "quad",
            vec![
                [-1.0, -1.0, 0.0],
                [1.0, -1.0, 0.0],
                [1.0, 1.0, 0.0],
                [-1.0, 1.0, 0.0],
            ],
            None,
            vec![0, 1, 2, 2, 3, 0],
        )
    }

    #[test]
    fn cuboid_hit_from_outside() {
        let g = Geometry::cuboid(2.0, 2.0, 2.0);
        let t = g.intersect_local(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z).unwrap();
        assert!((t - 4.0).abs() < 1e-5);
    }

    #[test]
    fn cuboid_miss_and_behind() {
        let g = Geometry::cuboid(2.0, 2.0, 2.0);
        assert!(g.intersect_local(Vec3::new(3.0, 0.0, 5.0), Vec3::NEG_Z).is_none());
        assert!(g.intersect_local(Vec3::new(0.0, 0.0, 5.0), Vec3::Z).is_none());
    }

    #[test]
    fn cuboid_from_inside_returns_exit() {
        let g = Geometry::cuboid(2.0, 2.0, 2.0);
        let t = g.intersect_local(Vec3::ZERO, Vec3::X).unwrap();
        assert!((t - 1.0).abs() < 1e-5);
    }

    #[test]
    fn sphere_hit_distance() {
        let g = Geometry::Sphere { radius: 2.0 };
        let t = g.intersect_local(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z).unwrap();
        assert!((t - 8.0).abs() < 1e-5);
        assert!(g.intersect_local(Vec3::new(0.0, 3.0, 10.0), Vec3::NEG_Z).is_none());
    }

    #[test]
    fn plane_is_bounded_and_double_sided() {
        let g = Geometry::Plane {
            width: 20.0,
            height: 20.0,
        };
        assert!(g.intersect_local(Vec3::new(0.0, 0.0, 3.0), Vec3::NEG_Z).is_some());
        assert!(g.intersect_local(Vec3::new(0.0, 0.0, -3.0), Vec3::Z).is_some());
        assert!(g.intersect_local(Vec3::new(11.0, 0.0, 3.0), Vec3::NEG_Z).is_none());
        assert!(g.intersect_local(Vec3::new(0.0, 0.0, 3.0), Vec3::X).is_none());
    }

    #[test]
    fn lights_are_never_hit() {
        let g = Geometry::Light(Light::Ambient {
            color: Color::WHITE,
            intensity: 1.0,
        });
        assert!(g.intersect_local(Vec3::Z, Vec3::NEG_Z).is_none());
    }

    #[test]
    fn mesh_bounds_and_normals() {
        let m = unit_quad();
        assert_eq!(m.bounds_min, Vec3::new(-1.0, -1.0, 0.0));
        assert_eq!(m.bounds_max, Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(m.triangle_count(), 2);
        for n in &m.normals {
            assert!((Vec3::from_array(*n) - Vec3::Z).length() < 1e-5);
        }
    }

    #[test]
    fn mesh_triangle_hit() {
        let g = Geometry::Mesh(Arc::new(unit_quad()));
        let t = g
            .intersect_local(Vec3::new(0.5, 0.5, 2.0), Vec3::NEG_Z)
            .unwrap();
        assert!((t - 2.0).abs() < 1e-5);
        assert!(g.intersect_local(Vec3::new(1.5, 0.5, 2.0), Vec3::NEG_Z).is_none());
    }
}
