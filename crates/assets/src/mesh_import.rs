//! glTF 2.0 mesh import.
//!
//! Only what a static scene needs: triangle primitives with `POSITION`,
//! optional `NORMAL` and optional indices. Node transforms are baked into the
//! vertices and every primitive is merged into one mesh, so the import can be
//! placed and coloured as a single entity.

use crate::AssetError;
use base64::Engine;
use diorama_kernel::MeshData;
use gltf::accessor::{DataType, Dimensions};
use gltf::mesh::Mode;
use gltf::{Accessor, Document, Gltf, Node};
use glam::{Mat3, Mat4, Vec3};
use std::collections::BTreeSet;
use std::path::Path;

/// Node hierarchies deeper than this are treated as cyclic.
const MAX_DEPTH: usize = 64;

/// Parse a `.gltf` or `.glb` payload.
///
/// `base_dir` resolves external buffer URIs; without it only embedded data
/// is accepted. `name` labels the resulting mesh.
pub fn import(bytes: &[u8], base_dir: Option<&Path>, name: &str) -> Result<MeshData, AssetError> {
    let file = Gltf::from_slice(bytes)?;
    let buffers = load_buffers(&file, base_dir)?;
    let scene = SceneReader {
        doc: &file.document,
        buffers: &buffers,
    };

    let mut out = Merged::default();
    for root in scene.roots() {
        scene.visit(root, Mat4::IDENTITY, 0, &mut out)?;
    }
    if out.indices.is_empty() {
        return Err(AssetError::NoGeometry(name.to_string()));
    }
    tracing::debug!(
        name,
        vertices = out.positions.len(),
        triangles = out.indices.len() / 3,
        "imported glTF mesh"
    );
    let normals = (!out.missing_normals).then_some(out.normals);
    Ok(MeshData::new(name, out.positions, normals, out.indices))
}

/// Read and parse a file from disk.
pub fn import_file(path: &Path) -> Result<MeshData, AssetError> {
    let bytes = std::fs::read(path).map_err(|source| AssetError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    import(&bytes, path.parent(), &mesh_name(path))
}

/// Mesh label derived from a file path (the file stem).
pub fn mesh_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mesh".to_string())
}

fn load_buffers(file: &Gltf, base_dir: Option<&Path>) -> Result<Vec<Vec<u8>>, AssetError> {
    let mut data = Vec::new();
    for buffer in file.buffers() {
        let bytes = match buffer.source() {
            gltf::buffer::Source::Bin => file
                .blob
                .clone()
                .ok_or_else(|| AssetError::Malformed("buffer without uri and no BIN chunk".into()))?,
            gltf::buffer::Source::Uri(uri) if uri.starts_with("data:") => decode_data_uri(uri)?,
            gltf::buffer::Source::Uri(uri) => {
                let dir = base_dir.ok_or_else(|| {
                    AssetError::Unsupported(format!("external buffer {uri} without a base directory"))
                })?;
                let path = dir.join(uri);
                std::fs::read(&path).map_err(|source| AssetError::Read { path, source })?
            }
        };
        if bytes.len() < buffer.length() {
            return Err(AssetError::Malformed(format!(
                "buffer {} holds {} bytes, declares {}",
                buffer.index(),
                bytes.len(),
                buffer.length()
            )));
        }
        data.push(bytes);
    }
    Ok(data)
}

fn decode_data_uri(uri: &str) -> Result<Vec<u8>, AssetError> {
    let (header, payload) = uri
        .split_once(',')
        .ok_or_else(|| AssetError::Malformed("data uri without payload".into()))?;
    if !header.ends_with(";base64") {
        return Err(AssetError::Unsupported(format!("data uri encoding {header}")));
    }
    Ok(base64::engine::general_purpose::STANDARD.decode(payload)?)
}

#[derive(Default)]
struct Merged {
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    indices: Vec<u32>,
    /// Some primitive had no usable normals.
    missing_normals: bool,
}

struct SceneReader<'a> {
    doc: &'a Document,
    buffers: &'a [Vec<u8>],
}

impl<'a> SceneReader<'a> {
    /// Nodes of the default scene, or every parentless node if there is no scene.
    fn roots(&self) -> Vec<Node<'a>> {
        if let Some(scene) = self.doc.default_scene().or_else(|| self.doc.scenes().next()) {
            return scene.nodes().collect();
        }
        let children: BTreeSet<usize> = self
            .doc
            .nodes()
            .flat_map(|n| n.children().map(|c| c.index()))
            .collect();
        self.doc
            .nodes()
            .filter(|n| !children.contains(&n.index()))
            .collect()
    }

    fn visit(&self, node: Node<'_>, parent: Mat4, depth: usize, out: &mut Merged) -> Result<(), AssetError> {
        if depth > MAX_DEPTH {
            return Err(AssetError::Malformed("node hierarchy too deep or cyclic".into()));
        }
        let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
        if let Some(mesh) = node.mesh() {
            self.append_mesh(&mesh, world, out)?;
        }
        for child in node.children() {
            self.visit(child, world, depth + 1, out)?;
        }
        Ok(())
    }

    fn append_mesh(&self, mesh: &gltf::Mesh<'_>, world: Mat4, out: &mut Merged) -> Result<(), AssetError> {
        let normal_matrix = Mat3::from_mat4(world).inverse().transpose();

        for prim in mesh.primitives() {
            if prim.mode() != Mode::Triangles {
                tracing::warn!(mode = ?prim.mode(), "skipping non-triangle primitive");
                continue;
            }
            let Some(pos_accessor) = prim.get(&gltf::Semantic::Positions) else {
                continue;
            };
            self.check_vec3(&pos_accessor)?;
            let normal_accessor = prim.get(&gltf::Semantic::Normals);
            if let Some(acc) = &normal_accessor {
                self.check_vec3(acc)?;
            }
            if let Some(acc) = prim.indices() {
                self.check_indices(&acc)?;
            }

            let reader = prim.reader(|b| self.buffers.get(b.index()).map(Vec::as_slice));
            let positions: Vec<[f32; 3]> = reader
                .read_positions()
                .ok_or_else(|| AssetError::Malformed("POSITION accessor has no data".into()))?
                .collect();
            let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(Iterator::collect);
            let indices: Vec<u32> = match reader.read_indices() {
                Some(read) => read.into_u32().collect(),
                None => (0..positions.len() as u32).collect(),
            };
            if indices.len() % 3 != 0 {
                return Err(AssetError::Malformed(format!(
                    "{} indices do not form triangles",
                    indices.len()
                )));
            }
            if let Some(bad) = indices.iter().find(|&&i| i as usize >= positions.len()) {
                return Err(AssetError::Malformed(format!(
                    "index {bad} exceeds {} vertices",
                    positions.len()
                )));
            }

            let base = out.positions.len() as u32;
            out.positions.extend(
                positions
                    .iter()
                    .map(|p| world.transform_point3(Vec3::from_array(*p)).to_array()),
            );
            match normals {
                Some(n) if n.len() == positions.len() => out.normals.extend(n.iter().map(|n| {
                    (normal_matrix * Vec3::from_array(*n))
                        .normalize_or_zero()
                        .to_array()
                })),
                _ => {
                    out.missing_normals = true;
                    out.normals.extend(std::iter::repeat_n([0.0; 3], positions.len()));
                }
            }
            out.indices.extend(indices.iter().map(|i| i + base));
        }
        Ok(())
    }

    fn check_vec3(&self, acc: &Accessor<'_>) -> Result<(), AssetError> {
        if acc.dimensions() != Dimensions::Vec3 || acc.data_type() != DataType::F32 {
            return Err(AssetError::Unsupported(format!(
                "{:?} accessor of {:?} where VEC3 float was expected",
                acc.dimensions(),
                acc.data_type()
            )));
        }
        self.check_range(acc)
    }

    fn check_indices(&self, acc: &Accessor<'_>) -> Result<(), AssetError> {
        let integer = matches!(acc.data_type(), DataType::U8 | DataType::U16 | DataType::U32);
        if acc.dimensions() != Dimensions::Scalar || !integer {
            return Err(AssetError::Unsupported(format!(
                "index accessor of {:?} {:?}",
                acc.dimensions(),
                acc.data_type()
            )));
        }
        self.check_range(acc)
    }

    /// The reader slices buffers directly, so every byte an accessor touches
    /// must exist before it runs.
    fn check_range(&self, acc: &Accessor<'_>) -> Result<(), AssetError> {
        if acc.sparse().is_some() {
            return Err(AssetError::Unsupported("sparse accessors".into()));
        }
        let view = acc
            .view()
            .ok_or_else(|| AssetError::Unsupported("accessor without bufferView".into()))?;
        let buffer = self.buffers.get(view.buffer().index()).ok_or_else(|| {
            AssetError::Malformed(format!("buffer {} out of range", view.buffer().index()))
        })?;
        let size = acc.size();
        let stride = view.stride().unwrap_or(size);
        if stride < size {
            return Err(AssetError::Malformed(format!(
                "stride {stride} smaller than element size {size}"
            )));
        }

        let view_end = view.offset().checked_add(view.length());
        let start = view.offset().checked_add(acc.offset());
        let needed = match acc.count() {
            0 => Some(0),
            n => (n - 1).checked_mul(stride).and_then(|s| s.checked_add(size)),
        };
        let (Some(view_end), Some(start), Some(needed)) = (view_end, start, needed) else {
            return Err(AssetError::Malformed("accessor range overflows".into()));
        };
        if start + needed > view_end || view_end > buffer.len() {
            return Err(AssetError::Malformed(format!(
                "accessor {} reads past bufferView {}",
                acc.index(),
                view.index()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Hand-built glTF payloads shared by the importer and loader tests.

    use base64::Engine;
    use serde_json::{Value, json};

    /// One triangle in the XY plane: positions then u16 indices, padded to 4.
    pub fn triangle_bin() -> Vec<u8> {
        let mut bin = Vec::new();
        for v in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            for c in v {
                bin.extend_from_slice(&c.to_le_bytes());
            }
        }
        for i in [0u16, 1, 2] {
            bin.extend_from_slice(&i.to_le_bytes());
        }
        bin.extend_from_slice(&[0, 0]);
        bin
    }

    pub fn triangle_doc(buffer: Value, node: Value) -> Value {
        json!({
            "asset": { "version": "2.0" },
            "scene": 0,
            "scenes": [{ "nodes": [0] }],
            "nodes": [node],
            "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1 }] }],
            "accessors": [
                {
                    "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                    "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
                },
                { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
            ],
            "bufferViews": [
                { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
                { "buffer": 0, "byteOffset": 36, "byteLength": 6 }
            ],
            "buffers": [buffer]
        })
    }

    /// `.gltf` JSON with the triangle buffer embedded as a data URI.
    pub fn embedded_gltf() -> Vec<u8> {
        let bin = triangle_bin();
        let uri = format!(
            "data:application/octet-stream;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&bin)
        );
        let doc = triangle_doc(
            json!({ "uri": uri, "byteLength": bin.len() }),
            json!({ "mesh": 0 }),
        );
        serde_json::to_vec(&doc).unwrap()
    }

    /// Binary `.glb` with the triangle in its BIN chunk.
    pub fn glb() -> Vec<u8> {
        let bin = triangle_bin();
        let doc = triangle_doc(json!({ "byteLength": bin.len() }), json!({ "mesh": 0 }));
        let mut json = serde_json::to_vec(&doc).unwrap();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }
        let total = 12 + 8 + json.len() + 8 + bin.len();
        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(b"glTF");
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&(json.len() as u32).to_le_bytes());
        out.extend_from_slice(b"JSON");
        out.extend_from_slice(&json);
        out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        out.extend_from_slice(b"BIN\0");
        out.extend_from_slice(&bin);
        out
    }
}
