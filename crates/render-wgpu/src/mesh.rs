//! CPU-side tessellation of scene geometry and helper line sets.

use bytemuck::{Pod, Zeroable};
use diorama_kernel::Geometry;
use diorama_render::LightRig;
use glam::Vec3;
use std::collections::BTreeSet;
use std::f32::consts::PI;

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

/// Triangles for filled drawing plus line indices for wireframe or native
/// line geometry. Either index list may be empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tessellation {
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<u32>,
    pub lines: Vec<u32>,
}

pub const SPHERE_SEGMENTS: u32 = 32;
pub const SPHERE_RINGS: u32 = 16;

/// Tessellate `geometry` in its local space. Lights produce nothing.
pub fn tessellate(geometry: &Geometry) -> Tessellation {
    let mut t = match geometry {
        Geometry::Cuboid { half_extents } => cuboid(*half_extents),
        Geometry::Edges { half_extents } => {
            return box_edges(*half_extents);
        }
        Geometry::Plane { width, height } => plane(*width, *height),
        Geometry::Sphere { radius } => sphere(*radius, SPHERE_SEGMENTS, SPHERE_RINGS),
        Geometry::Mesh(mesh) => Tessellation {
            vertices: mesh
                .positions
                .iter()
                .zip(&mesh.normals)
                .map(|(p, n)| Vertex {
                    position: *p,
                    normal: *n,
                    uv: [0.0, 0.0],
                })
                .collect(),
            triangles: mesh.indices.clone(),
            lines: Vec::new(),
        },
        Geometry::Light(_) => return Tessellation::default(),
    };
    t.lines = wire_edges(&t.triangles);
    t
}

/// Unique triangle edges as a line list.
pub fn wire_edges(triangles: &[u32]) -> Vec<u32> {
    let mut edges = BTreeSet::new();
    for tri in triangles.chunks_exact(3) {
        for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
            edges.insert((a.min(b), a.max(b)));
        }
    }
    edges.into_iter().flat_map(|(a, b)| [a, b]).collect()
}

fn cuboid(h: Vec3) -> Tessellation {
    // (normal, u axis, v axis) per face
    let faces = [
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
    ];
    let mut out = Tessellation::default();
    for (n, u, v) in faces {
        let base = out.vertices.len() as u32;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let p = (n + u * su + v * sv) * h;
            out.vertices.push(Vertex {
                position: p.to_array(),
                normal: n.to_array(),
                uv: [(su + 1.0) * 0.5, (sv + 1.0) * 0.5],
            });
        }
        out.triangles
            .extend([base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    out
}

fn box_corners(h: Vec3) -> [Vec3; 8] {
    let mut corners = [Vec3::ZERO; 8];
    for (i, c) in corners.iter_mut().enumerate() {
        let sx = if i & 1 == 0 { -1.0 } else { 1.0 };
        let sy = if i & 2 == 0 { -1.0 } else { 1.0 };
        let sz = if i & 4 == 0 { -1.0 } else { 1.0 };
        *c = Vec3::new(sx, sy, sz) * h;
    }
    corners
}

/// Corner pairs (as bit-indices into [`box_corners`]) that differ in one axis.
fn box_edge_pairs() -> impl Iterator<Item = (u32, u32)> {
    (0u32..8).flat_map(|a| {
        [1u32, 2, 4]
            .into_iter()
            .filter(move |bit| a & bit == 0)
            .map(move |bit| (a, a | bit))
    })
}

fn box_edges(h: Vec3) -> Tessellation {
    Tessellation {
        vertices: box_corners(h)
            .iter()
            .map(|p| Vertex {
                position: p.to_array(),
                normal: p.normalize_or_zero().to_array(),
                uv: [0.0, 0.0],
            })
            .collect(),
        triangles: Vec::new(),
        lines: box_edge_pairs().flat_map(|(a, b)| [a, b]).collect(),
    }
}

/// Quad in the local XY plane facing +Z.
fn plane(width: f32, height: f32) -> Tessellation {
    let (hw, hh) = (width * 0.5, height * 0.5);
    let vertices = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)]
        .into_iter()
        .map(|(x, y)| Vertex {
            position: [x * hw, y * hh, 0.0],
            normal: [0.0, 0.0, 1.0],
            uv: [(x + 1.0) * 0.5, (y + 1.0) * 0.5],
        })
        .collect();
    Tessellation {
        vertices,
        triangles: vec![0, 1, 2, 0, 2, 3],
        lines: Vec::new(),
    }
}

fn sphere(radius: f32, segments: u32, rings: u32) -> Tessellation {
    let mut out = Tessellation::default();
    for iy in 0..=rings {
        let v = iy as f32 / rings as f32;
        for ix in 0..=segments {
            let u = ix as f32 / segments as f32;
            let n = Vec3::new(
                -(u * 2.0 * PI).cos() * (v * PI).sin(),
                (v * PI).cos(),
                (u * 2.0 * PI).sin() * (v * PI).sin(),
            );
            out.vertices.push(Vertex {
                position: (n * radius).to_array(),
                normal: n.to_array(),
                uv: [u, 1.0 - v],
            });
        }
    }
    let row = segments + 1;
    for iy in 0..rings {
        for ix in 0..segments {
            let a = iy * row + ix + 1;
            let b = iy * row + ix;
            let c = (iy + 1) * row + ix;
            let d = (iy + 1) * row + ix + 1;
            // The pole rows collapse to fans.
            if iy != 0 {
                out.triangles.extend([a, b, d]);
            }
            if iy != rings - 1 {
                out.triangles.extend([b, c, d]);
            }
        }
    }
    out
}

const GRID_CENTER: [f32; 4] = [0.27, 0.27, 0.27, 1.0];
const GRID_LINE: [f32; 4] = [0.53, 0.53, 0.53, 1.0];
const SHADOW_FRUSTUM: [f32; 4] = [1.0, 0.67, 0.0, 1.0];
const SHADOW_NEAR: f32 = 0.5;
const SHADOW_FAR: f32 = 500.0;
/// Side of the square drawn at each directional light.
pub const LIGHT_HELPER_SIZE: f32 = 5.0;

/// Square grid on the XZ plane, `divisions` cells per side.
pub fn grid_lines(size: f32, divisions: u32) -> Vec<LineVertex> {
    let half = size * 0.5;
    let step = size / divisions.max(1) as f32;
    let mut out = Vec::new();
    for i in 0..=divisions {
        let k = -half + i as f32 * step;
        let color = if 2 * i == divisions { GRID_CENTER } else { GRID_LINE };
        for (a, b) in [([-half, 0.0, k], [half, 0.0, k]), ([k, 0.0, -half], [k, 0.0, half])] {
            out.push(LineVertex { position: a, color });
            out.push(LineVertex { position: b, color });
        }
    }
    out
}

fn light_basis(direction: Vec3) -> (Vec3, Vec3) {
    let up = if direction.cross(Vec3::Y).length_squared() < 1e-6 {
        Vec3::Z
    } else {
        Vec3::Y
    };
    let right = direction.cross(up).normalize();
    (right, right.cross(direction))
}

fn push_line(out: &mut Vec<LineVertex>, a: Vec3, b: Vec3, color: [f32; 4]) {
    out.push(LineVertex {
        position: a.to_array(),
        color,
    });
    out.push(LineVertex {
        position: b.to_array(),
        color,
    });
}

/// For every directional light: a square at the light, a line to its
/// target and the box of its shadow camera.
pub fn light_helper_lines(lights: &LightRig) -> Vec<LineVertex> {
    let mut out = Vec::new();
    for light in &lights.directional {
        let [r, g, b] = light.color.to_linear();
        let color = [r, g, b, 1.0];
        let (right, up) = light_basis(light.direction);
        let p = light.position;

        let s = LIGHT_HELPER_SIZE * 0.5;
        let square = [
            p + (right + up) * s,
            p + (up - right) * s,
            p - (right + up) * s,
            p + (right - up) * s,
        ];
        for i in 0..4 {
            push_line(&mut out, square[i], square[(i + 1) % 4], color);
        }
        push_line(&mut out, p, Vec3::ZERO, color);

        let bounds = light.shadow_bounds;
        let corner = |x: f32, y: f32, d: f32| p + right * x + up * y + light.direction * d;
        let mut corners = [Vec3::ZERO; 8];
        for (i, c) in corners.iter_mut().enumerate() {
            let x = if i & 1 == 0 { bounds.left } else { bounds.right };
            let y = if i & 2 == 0 { bounds.bottom } else { bounds.top };
            let d = if i & 4 == 0 { SHADOW_NEAR } else { SHADOW_FAR };
            *c = corner(x, y, d);
        }
        for (a, b) in box_edge_pairs() {
            push_line(&mut out, corners[a as usize], corners[b as usize], SHADOW_FRUSTUM);
        }
    }
    out
}
