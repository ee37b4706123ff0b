//! Background asset loading.
//!
//! [`AssetLoader::load`] starts a worker thread per request and hands back a
//! [`LoadTask`]. The worker streams the file in chunks, reporting progress,
//! then parses it and sends the result. The owner calls
//! [`AssetLoader::poll`] once per frame; it never blocks.

use crate::{AssetError, AssetId, mesh_import};
use diorama_kernel::MeshData;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

const CHUNK_SIZE: usize = 64 * 1024;

/// Handle to an in-flight load. Cloning shares the cancel flag.
#[derive(Debug, Clone)]
pub struct LoadTask {
    id: u64,
    path: PathBuf,
    cancelled: Arc<AtomicBool>,
}

impl LoadTask {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Abandon the load. Any result it still produces is discarded.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadProgress {
    pub bytes_read: u64,
    pub total: u64,
}

impl LoadProgress {
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.bytes_read as f32 / self.total as f32
        }
    }
}

/// A successfully imported mesh.
#[derive(Debug, Clone)]
pub struct LoadedAsset {
    pub id: AssetId,
    pub path: PathBuf,
    pub mesh: Arc<MeshData>,
}

#[derive(Debug)]
pub enum LoadEvent {
    Progress { task: u64, progress: LoadProgress },
    Loaded { task: u64, asset: LoadedAsset },
    Failed { task: u64, path: PathBuf, error: AssetError },
}

impl LoadEvent {
    pub fn task(&self) -> u64 {
        match self {
            Self::Progress { task, .. } | Self::Loaded { task, .. } | Self::Failed { task, .. } => {
                *task
            }
        }
    }

    fn is_final(&self) -> bool {
        !matches!(self, Self::Progress { .. })
    }
}

/// Spawns load workers and collects their events.
pub struct AssetLoader {
    tx: flume::Sender<LoadEvent>,
    rx: flume::Receiver<LoadEvent>,
    tasks: BTreeMap<u64, LoadTask>,
    next_task: u64,
}

impl Default for AssetLoader {
    fn default() -> Self {
        let (tx, rx) = flume::unbounded();
        Self {
            tx,
            rx,
            tasks: BTreeMap::new(),
            next_task: 0,
        }
    }
}

impl AssetLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads started and not yet finished or cancelled.
    pub fn in_flight(&self) -> usize {
        self.tasks.values().filter(|t| !t.is_cancelled()).count()
    }

    pub fn load(&mut self, path: impl Into<PathBuf>) -> LoadTask {
        self.next_task += 1;
        let task = LoadTask {
            id: self.next_task,
            path: path.into(),
            cancelled: Arc::new(AtomicBool::new(false)),
        };
        self.tasks.insert(task.id, task.clone());
        tracing::info!(task = task.id, path = %task.path.display(), "asset load started");

        let worker = task.clone();
        let tx = self.tx.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("asset-load-{}", task.id))
            .spawn(move || run(worker, tx));
        if let Err(error) = spawned {
            let _ = self.tx.send(LoadEvent::Failed {
                task: task.id,
                path: task.path.clone(),
                error: AssetError::Io(error),
            });
        }
        task
    }

    /// Drain whatever events have arrived. Events from cancelled tasks are
    /// dropped; finished tasks are forgotten.
    pub fn poll(&mut self) -> Vec<LoadEvent> {
        let events: Vec<LoadEvent> = self.rx.try_iter().collect();
        self.admit(events)
    }

    /// Block until every in-flight load finishes or `timeout` elapses.
    /// For headless callers; the frame loop uses [`AssetLoader::poll`].
    pub fn wait(&mut self, timeout: Duration) -> Vec<LoadEvent> {
        let deadline = Instant::now() + timeout;
        let mut out = Vec::new();
        while self.in_flight() > 0 {
            match self.rx.recv_deadline(deadline) {
                Ok(event) => out.extend(self.admit(vec![event])),
                Err(_) => break,
            }
        }
        out.extend(self.poll());
        out
    }

    fn admit(&mut self, events: Vec<LoadEvent>) -> Vec<LoadEvent> {
        let mut kept = Vec::with_capacity(events.len());
        for event in events {
            let id = event.task();
            let cancelled = self.tasks.get(&id).is_none_or(LoadTask::is_cancelled);
            if event.is_final() {
                self.tasks.remove(&id);
            }
            if cancelled {
                tracing::debug!(task = id, "discarded event from cancelled load");
                continue;
            }
            match &event {
                LoadEvent::Progress { progress, .. } => {
                    tracing::debug!(task = id, read = progress.bytes_read, total = progress.total, "asset load progress");
                }
                LoadEvent::Loaded { asset, .. } => {
                    tracing::info!(task = id, asset = %asset.id, triangles = asset.mesh.triangle_count(), "asset loaded");
                }
                LoadEvent::Failed { path, error, .. } => {
                    tracing::error!(task = id, path = %path.display(), %error, "asset load failed");
                }
            }
            kept.push(event);
        }
        self.tasks.retain(|_, t| !t.is_cancelled());
        kept
    }
}

/// Read and import synchronously.
pub fn load_blocking(path: &Path) -> Result<LoadedAsset, AssetError> {
    let bytes = std::fs::read(path).map_err(|source| AssetError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    finish(path, &bytes)
}

fn finish(path: &Path, bytes: &[u8]) -> Result<LoadedAsset, AssetError> {
    let mesh = mesh_import::import(bytes, path.parent(), &mesh_import::mesh_name(path))?;
    Ok(LoadedAsset {
        id: AssetId::of(bytes),
        path: path.to_path_buf(),
        mesh: Arc::new(mesh),
    })
}

fn run(task: LoadTask, tx: flume::Sender<LoadEvent>) {
    let result = read_with_progress(&task, &tx).and_then(|bytes| match bytes {
        Some(bytes) => finish(&task.path, &bytes).map(Some),
        None => Ok(None),
    });
    if task.is_cancelled() {
        return;
    }
    let event = match result {
        Ok(Some(asset)) => LoadEvent::Loaded {
            task: task.id,
            asset,
        },
        Ok(None) => return,
        Err(error) => LoadEvent::Failed {
            task: task.id,
            path: task.path.clone(),
            error,
        },
    };
    // The loader may have been dropped; nobody is left to tell.
    let _ = tx.send(event);
}

/// `Ok(None)` when the task was cancelled part way.
fn read_with_progress(task: &LoadTask, tx: &flume::Sender<LoadEvent>) -> Result<Option<Vec<u8>>, AssetError> {
    let read_err = |source| AssetError::Read {
        path: task.path.clone(),
        source,
    };
    let mut file = std::fs::File::open(&task.path).map_err(read_err)?;
    let total = file.metadata().map_err(read_err)?.len();
    let mut bytes = Vec::with_capacity(total as usize);
    let mut chunk = vec![0u8; CHUNK_SIZE];
    loop {
        if task.is_cancelled() {
            return Ok(None);
        }
        let n = file.read(&mut chunk).map_err(read_err)?;
        if n == 0 {
            break;
        }
        bytes.extend_from_slice(&chunk[..n]);
        let _ = tx.send(LoadEvent::Progress {
            task: task.id,
            progress: LoadProgress {
                bytes_read: bytes.len() as u64,
                total,
            },
        });
    }
    Ok(Some(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh_import::fixtures;

    const WAIT: Duration = Duration::from_secs(10);

    #[test]
    fn loads_glb_in_background() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tri.glb");
        std::fs::write(&path, fixtures::glb()).unwrap();

        let mut loader = AssetLoader::new();
        let task = loader.load(&path);
        assert_eq!(task.path(), path);

        let events = loader.wait(WAIT);
        let loaded: Vec<&LoadedAsset> = events
            .iter()
            .filter_map(|e| match e {
                LoadEvent::Loaded { asset, .. } => Some(asset),
                _ => None,
            })
            .collect();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].mesh.name, "tri");
        assert_eq!(loaded[0].id, AssetId::of(&fixtures::glb()));

        let last_progress = events.iter().rev().find_map(|e| match e {
            LoadEvent::Progress { progress, .. } => Some(*progress),
            _ => None,
        });
        let p = last_progress.unwrap();
        assert_eq!(p.bytes_read, p.total);
        assert_eq!(p.fraction(), 1.0);
        assert_eq!(loader.in_flight(), 0);
    }

    #[test]
    fn missing_file_fails_without_panicking() {
        let dir = tempfile::tempdir().unwrap();
        let mut loader = AssetLoader::new();
        loader.load(dir.path().join("nope.glb"));
        let events = loader.wait(WAIT);
        assert!(matches!(
            events.as_slice(),
            [LoadEvent::Failed {
                error: AssetError::Read { .. },
                ..
            }]
        ));
    }

    #[test]
    fn corrupt_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.gltf");
        std::fs::write(&path, b"{ not json").unwrap();
        let mut loader = AssetLoader::new();
        loader.load(&path);
        let events = loader.wait(WAIT);
        assert!(events.iter().any(|e| matches!(e, LoadEvent::Failed { .. })));
        assert!(!events.iter().any(|e| matches!(e, LoadEvent::Loaded { .. })));
    }

    #[test]
    fn cancelled_load_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tri.gltf");
        std::fs::write(&path, fixtures::embedded_gltf()).unwrap();

        let mut loader = AssetLoader::new();
        let task = loader.load(&path);
        task.cancel();
        assert_eq!(loader.in_flight(), 0);

        // Give the worker time to finish whatever it was doing.
        std::thread::sleep(Duration::from_millis(200));
        assert!(loader.poll().is_empty());
    }

    #[test]
    fn blocking_load_matches_background() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tri.gltf");
        std::fs::write(&path, fixtures::embedded_gltf()).unwrap();
        let asset = load_blocking(&path).unwrap();
        assert_eq!(asset.mesh.indices, vec![0, 1, 2]);
    }
}
