//! Mesh assets: glTF 2.0 import and background loading.
//!
//! Assets are identified by a content hash of their source bytes, so the same
//! file loaded twice yields the same [`AssetId`]. Loads run on worker threads
//! and report back over a channel that the frame loop drains without waiting.
//!
//! # Layout
//! - [`mesh_import`]: `.gltf` (JSON with embedded or external buffers) and
//!   `.glb` parsing into a single [`MeshData`](diorama_kernel::MeshData).
//! - [`loader`]: cancellable load tasks and progress events.

use sha2::{Digest, Sha256};
use std::fmt;
use std::path::PathBuf;

pub mod mesh_import;
pub mod loader;

pub use loader::{AssetLoader, LoadEvent, LoadProgress, LoadTask, LoadedAsset};

/// Content-addressed asset ID computed from the asset bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(pub u64);

impl AssetId {
    pub fn of(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        Self(u64::from_le_bytes(head))
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Errors from asset operations. None of these are fatal to the scene.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("glTF error: {0}")]
    Gltf(#[from] gltf::Error),
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("malformed glTF: {0}")]
    Malformed(String),
    #[error("unsupported glTF feature: {0}")]
    Unsupported(String),
    #[error("{0} contains no triangle geometry")]
    NoGeometry(String),
}

pub fn crate_info() -> &'static str {
    "diorama-assets v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_id_is_content_addressed() {
        let a = AssetId::of(b"monkey");
        let b = AssetId::of(b"monkey");
        let c = AssetId::of(b"monkey2");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string().len(), 16);
    }
}
