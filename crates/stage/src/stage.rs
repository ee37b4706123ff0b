use crate::config::{StageConfig, WindowConfig};
use crate::scene::SceneState;
use crate::wiring::{self, SceneParams};
use crate::StageError;
use diorama_assets::{AssetLoader, LoadEvent, LoadTask};
use diorama_common::EntityId;
use diorama_kernel::CameraPose;
use diorama_params::{ParamDescriptor, ParamError, ParamValue};
use diorama_render::{PostProcess, RenderView, Renderer};
use glam::Vec2;
use std::time::Duration;

/// The running scene: state, parameters and pending asset loads.
///
/// A frame runs in a fixed order: apply finished loads, animate, pick and
/// highlight, render. Parameter writes and pointer updates land between
/// frames.
pub struct Stage {
    scene: SceneState,
    params: SceneParams,
    loader: AssetLoader,
    loads: Vec<LoadTask>,
    hovered: Option<EntityId>,
    window: WindowConfig,
    helpers: bool,
}

impl Stage {
    pub fn new(config: &StageConfig) -> Result<Self, StageError> {
        let mut scene = SceneState::new(config.highlight()?);
        scene.post = PostProcess {
            bloom_enabled: config.bloom.enabled,
            bloom: config.bloom.settings,
        };
        scene.rig.track_bouncer = config.track_sphere;

        let mut params = wiring::wire(&scene)?;
        // Push the clamped config values back through their callbacks.
        for name in [
            wiring::TRACK_SPHERE,
            wiring::BLOOM,
            wiring::BLOOM_STRENGTH,
            wiring::BLOOM_THRESHOLD,
        ] {
            let value = params.get(name)?;
            params.set(&mut scene, name, value)?;
        }
        for (name, value) in &config.parameters {
            params.set(&mut scene, name, value.to_value()?)?;
        }

        let mut loader = AssetLoader::new();
        let loads = config
            .asset_path
            .iter()
            .map(|path| loader.load(path.clone()))
            .collect();

        tracing::info!(
            params = params.len(),
            overrides = config.parameters.len(),
            "stage ready"
        );
        Ok(Self {
            scene,
            params,
            loader,
            loads,
            hovered: None,
            window: config.window.clone(),
            helpers: config.helpers,
        })
    }

    /// Run one frame and hand the result to `renderer`.
    pub fn frame<R: Renderer>(&mut self, renderer: &mut R) -> R::Output {
        let span = tracing::trace_span!("frame", n = self.scene.clock.frames());
        let _enter = span.enter();

        let events = self.loader.poll();
        self.apply_loads(events);

        // Defined in `wiring::wire`, so the lookup cannot miss.
        let speed = self.params.number(wiring::SPEED).unwrap_or_default();
        self.scene.animate(speed);
        self.hovered = self.scene.update_highlight();

        let view = RenderView::from_camera(&self.scene.camera);
        renderer.render(&self.scene.registry, &view, &self.scene.post)
    }

    /// Block until pending loads finish or `timeout` passes, then apply them.
    /// Headless runs call this before the first frame.
    pub fn wait_for_assets(&mut self, timeout: Duration) -> Vec<EntityId> {
        let events = self.loader.wait(timeout);
        self.apply_loads(events)
    }

    fn apply_loads(&mut self, events: Vec<LoadEvent>) -> Vec<EntityId> {
        let mut added = Vec::new();
        for event in events {
            let task = event.task();
            match event {
                LoadEvent::Loaded { asset, .. } => added.push(self.scene.add_import(&asset)),
                // Already logged by the loader; the scene carries on without it.
                LoadEvent::Failed { .. } => {}
                LoadEvent::Progress { .. } => continue,
            }
            self.loads.retain(|t| t.id() != task);
        }
        added
    }

    /// Cancel every load still in flight. Their results are discarded.
    pub fn cancel_loads(&mut self) {
        for task in self.loads.drain(..) {
            tracing::info!(task = task.id(), path = %task.path().display(), "cancelling asset load");
            task.cancel();
        }
    }

    pub fn pending_loads(&self) -> usize {
        self.loads.len()
    }

    /// Pointer position in NDC, or `None` once it leaves the viewport.
    pub fn set_pointer(&mut self, ndc: Option<Vec2>) {
        self.scene.pointer = ndc;
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.scene.resize(width, height);
    }

    pub fn set_param(
        &mut self,
        name: &str,
        value: impl Into<ParamValue>,
    ) -> Result<ParamValue, ParamError> {
        self.params.set(&mut self.scene, name, value)
    }

    pub fn param(&self, name: &str) -> Result<ParamValue, ParamError> {
        self.params.get(name)
    }

    pub fn descriptors(&self) -> Vec<ParamDescriptor> {
        self.params.descriptors()
    }

    /// Entity under the pointer as of the last frame.
    pub fn hovered(&self) -> Option<EntityId> {
        self.hovered
    }

    pub fn scene(&self) -> &SceneState {
        &self.scene
    }

    /// Direct camera access for orbit controls.
    pub fn camera_mut(&mut self) -> &mut CameraPose {
        &mut self.scene.camera
    }

    pub fn window(&self) -> &WindowConfig {
        &self.window
    }

    /// Whether the backend should draw the grid and light helpers.
    pub fn helpers(&self) -> bool {
        self.helpers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParamOverride;
    use diorama_render::DebugTextRenderer;
    use glam::Vec3;
    use std::path::Path;

    fn no_assets() -> StageConfig {
        StageConfig {
            asset_path: None,
            ..StageConfig::default()
        }
    }

    /// A one-triangle `.gltf` with an external buffer.
    fn write_triangle(dir: &Path) -> std::path::PathBuf {
        let mut bin = Vec::new();
        for c in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
            bin.extend_from_slice(&c.to_le_bytes());
        }
        for i in [0u16, 1, 2, 0] {
            bin.extend_from_slice(&i.to_le_bytes());
        }
        std::fs::write(dir.join("tri.bin"), &bin).unwrap();
        let doc = r#"{
            "asset": { "version": "2.0" },
            "scene": 0,
            "scenes": [{ "nodes": [0] }],
            "nodes": [{ "mesh": 0 }],
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
            "buffers": [{ "uri": "tri.bin", "byteLength": 44 }]
        }"#;
        let path = dir.join("tri.gltf");
        std::fs::write(&path, doc).unwrap();
        path
    }

    #[test]
    fn frame_renders_stock_scene() {
        let mut stage = Stage::new(&no_assets()).unwrap();
        let mut renderer = DebugTextRenderer::new();
        let out = stage.frame(&mut renderer);
        assert!(out.starts_with("=== Frame 1 ==="));
        assert!(out.contains("Bloom: off"));
        assert_eq!(stage.scene().clock.frames(), 1);
        assert!((stage.scene().clock.step() - 0.01).abs() < 1e-6);
    }

    #[test]
    fn picking_sees_the_moved_sphere() {
        let mut stage = Stage::new(&no_assets()).unwrap();
        let sphere = stage.scene().handles.sphere;
        // Look straight down at the point the sphere bounces to on frame 1.
        let z = stage.scene().rig.bounce.height(0.01);
        let cam = stage.camera_mut();
        cam.set_position(Vec3::new(0.0, 40.0, z + 0.001));
        cam.set_target(Vec3::new(0.0, 0.0, z));
        stage.set_pointer(Some(Vec2::ZERO));

        stage.frame(&mut DebugTextRenderer::new());
        assert_eq!(stage.hovered(), Some(sphere));
        let m = stage.scene().registry.get(sphere).material();
        assert_eq!(m.color.to_hex(), 0xffff00);
        assert_eq!(m.base_color.to_hex(), 0xffffff);
    }

    #[test]
    fn highlight_clears_when_pointer_leaves() {
        let mut stage = Stage::new(&no_assets()).unwrap();
        let cube = stage.scene().handles.cube;
        let cam = stage.camera_mut();
        cam.set_position(Vec3::new(0.0, 10.0, 30.0));
        cam.set_target(Vec3::new(0.0, 10.0, 0.0));
        stage.set_pointer(Some(Vec2::ZERO));

        let mut r = DebugTextRenderer::new();
        stage.frame(&mut r);
        let edges = stage.scene().handles.edges;
        // Cube and overlay share a box; either may be the closer hit.
        assert!(matches!(stage.hovered(), Some(id) if id == cube || id == edges));
        for id in [cube, edges] {
            assert!(stage.scene().registry.get(id).material().is_highlighted());
        }

        stage.set_pointer(None);
        stage.frame(&mut r);
        assert!(stage.hovered().is_none());
        for (_, e) in stage.scene().registry.iter() {
            assert_eq!(e.material().color, e.material().base_color);
        }
    }

    #[test]
    fn speed_zero_freezes_the_clock() {
        let mut stage = Stage::new(&no_assets()).unwrap();
        stage.set_param(wiring::SPEED, 0.0).unwrap();
        stage.frame(&mut DebugTextRenderer::new());
        assert_eq!(stage.scene().clock.step(), 0.0);
        assert_eq!(stage.scene().clock.frames(), 1);
    }

    #[test]
    fn config_overrides_run_callbacks() {
        let mut config = no_assets();
        config.parameters.insert("sphere_size".into(), ParamOverride::Number(9.0));
        config
            .parameters
            .insert("sphere_color".into(), ParamOverride::Color("#00ff00".into()));
        config.bloom.enabled = true;
        config.bloom.settings.strength = 10.0;
        config.track_sphere = true;

        let stage = Stage::new(&config).unwrap();
        let sphere = stage.scene().registry.get(stage.scene().handles.sphere);
        assert_eq!(sphere.transform().scale, Vec3::splat(3.5));
        assert_eq!(sphere.material().base_color.to_hex(), 0x00ff00);
        assert_eq!(stage.scene().post.active_bloom().map(|b| b.strength), Some(3.0));
        assert_eq!(stage.param(wiring::TRACK_SPHERE).unwrap(), ParamValue::Toggle(true));
    }

    #[test]
    fn unknown_override_is_an_error() {
        let mut config = no_assets();
        config.parameters.insert("nope".into(), ParamOverride::Toggle(true));
        assert!(matches!(
            Stage::new(&config),
            Err(StageError::Param(ParamError::Unknown(name))) if name == "nope"
        ));
    }

    #[test]
    fn tracking_follows_the_sphere() {
        let mut stage = Stage::new(&no_assets()).unwrap();
        stage.set_param(wiring::TRACK_SPHERE, true).unwrap();
        stage.frame(&mut DebugTextRenderer::new());
        let sphere = stage.scene().registry.get(stage.scene().handles.sphere);
        assert_eq!(stage.scene().camera.look_at(), sphere.transform().position);
    }

    #[test]
    fn failed_load_leaves_scene_intact() {
        let dir = tempfile::tempdir().unwrap();
        let config = StageConfig {
            asset_path: Some(dir.path().join("missing.glb")),
            ..StageConfig::default()
        };
        let mut stage = Stage::new(&config).unwrap();
        assert!(stage.wait_for_assets(Duration::from_secs(5)).is_empty());
        assert_eq!(stage.pending_loads(), 0);
        assert_eq!(stage.scene().registry.len(), 8);
        assert!(stage.frame(&mut DebugTextRenderer::new()).contains("Draws:"));
    }

    #[test]
    fn loaded_mesh_joins_the_scene() {
        let dir = tempfile::tempdir().unwrap();
        let config = StageConfig {
            asset_path: Some(write_triangle(dir.path())),
            ..StageConfig::default()
        };
        let mut stage = Stage::new(&config).unwrap();
        let added = stage.wait_for_assets(Duration::from_secs(5));
        assert_eq!(added.len(), 1);
        assert_eq!(stage.scene().imports, added);
        let mesh = stage.scene().registry.get(added[0]);
        assert_eq!(mesh.name(), "tri");
        assert!(mesh.is_pickable());
    }

    #[test]
    fn cancelled_load_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let config = StageConfig {
            asset_path: Some(write_triangle(dir.path())),
            ..StageConfig::default()
        };
        let mut stage = Stage::new(&config).unwrap();
        stage.cancel_loads();
        assert!(stage.wait_for_assets(Duration::from_millis(200)).is_empty());
        assert_eq!(stage.scene().registry.len(), 8);
    }

    #[test]
    fn resize_updates_aspect() {
        let mut stage = Stage::new(&no_assets()).unwrap();
        stage.resize(1000, 500);
        assert_eq!(stage.scene().camera.aspect(), 2.0);
    }
}
