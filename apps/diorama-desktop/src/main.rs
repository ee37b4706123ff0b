use anyhow::{Context, Result, anyhow};
use clap::Parser;
use diorama_common::Color;
use diorama_input::{Action, DesktopInput, RawInput, Viewport};
use diorama_params::{ParamKind, ParamValue};
use diorama_render_wgpu::{GpuFrame, OrbitController, WgpuRenderer};
use diorama_stage::{Stage, StageConfig};
use diorama_tools::{FrameTimer, SceneInspector};
use egui::Context as EguiContext;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

/// Pixels of trackpad scroll per wheel line.
const PIXELS_PER_LINE: f32 = 40.0;

#[derive(Parser)]
#[command(name = "diorama-desktop", about = "Interactive diorama scene")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Stage configuration (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// Everything that outlives the GPU: the stage, input mapping and panel state.
struct AppState {
    stage: Stage,
    input: DesktopInput,
    orbit: OrbitController,
    timer: FrameTimer,
    last_frame: Instant,
    show_panel: bool,
}

impl AppState {
    fn new(stage: Stage) -> Self {
        let window = stage.window();
        let input = DesktopInput::new(Viewport::new(window.width, window.height));
        Self {
            stage,
            input,
            orbit: OrbitController::default(),
            timer: FrameTimer::new(120),
            last_frame: Instant::now(),
            show_panel: true,
        }
    }

    fn handle(&mut self, raw: RawInput) {
        for action in self.input.handle(raw) {
            match action {
                Action::Point(ndc) => self.stage.set_pointer(Some(ndc)),
                Action::ClearPoint => self.stage.set_pointer(None),
                Action::Orbit { dx, dy } => self.orbit.orbit(self.stage.camera_mut(), dx, dy),
                Action::Zoom(lines) => self.orbit.zoom(self.stage.camera_mut(), lines),
                Action::Resize { width, height } => self.stage.resize(width, height),
            }
        }
    }

    fn draw_ui(&mut self, ctx: &EguiContext) {
        if !self.show_panel {
            return;
        }

        egui::SidePanel::left("parameters")
            .default_width(280.0)
            .show(ctx, |ui| {
                ui.heading("Parameters");
                ui.separator();
                self.draw_params(ui);

                ui.separator();
                ui.heading("Inspector");
                self.draw_inspector(ui);

                ui.separator();
                ui.small("F1: Toggle panel | LMB drag: Orbit | Wheel: Zoom");
            });
    }

    fn draw_params(&mut self, ui: &mut egui::Ui) {
        for desc in self.stage.descriptors() {
            let mut next: Option<ParamValue> = None;
            match (desc.kind, desc.value) {
                (ParamKind::Number { min, max, step }, ParamValue::Number(mut v)) => {
                    let mut slider = egui::Slider::new(&mut v, min..=max).text(&desc.name);
                    if let Some(step) = step {
                        slider = slider.step_by(step as f64);
                    }
                    if ui.add(slider).changed() {
                        next = Some(v.into());
                    }
                }
                (ParamKind::Toggle, ParamValue::Toggle(mut on)) => {
                    if ui.checkbox(&mut on, &desc.name).changed() {
                        next = Some(on.into());
                    }
                }
                (ParamKind::Color, ParamValue::Color(color)) => {
                    let mut rgb = color.to_srgb_bytes();
                    ui.horizontal(|ui| {
                        if ui.color_edit_button_srgb(&mut rgb).changed() {
                            next = Some(Color::from_srgb_bytes(rgb).into());
                        }
                        ui.label(&desc.name);
                    });
                }
                _ => {}
            }
            if let Some(value) = next {
                if let Err(e) = self.stage.set_param(&desc.name, value) {
                    tracing::warn!(name = %desc.name, "parameter write rejected: {e}");
                }
            }
        }
    }

    fn draw_inspector(&self, ui: &mut egui::Ui) {
        let scene = self.stage.scene();
        let summary = SceneInspector::summary(&scene.registry, &scene.clock, &scene.camera);
        ui.label(format!("FPS: {:.0}", self.timer.fps()));
        ui.label(format!("Frames: {}  Step: {:.2}", summary.frames, summary.step));
        ui.label(format!(
            "Entities: {} ({} pickable)",
            summary.entity_count, summary.pickable_count
        ));
        let [x, y, z] = summary.camera.position;
        ui.label(format!("Camera: ({x:.1}, {y:.1}, {z:.1})"));
        let hovered = self
            .stage
            .hovered()
            .and_then(|id| SceneInspector::inspect_entity(&scene.registry, id))
            .map(|info| info.name)
            .unwrap_or_else(|| "-".into());
        ui.label(format!("Hovered: {hovered}"));
        if self.stage.pending_loads() > 0 {
            ui.label(format!("Loading {} asset(s)...", self.stage.pending_loads()));
        }

        ui.collapsing("Entities", |ui| {
            for info in SceneInspector::entities(&scene.registry) {
                let marker = if info.highlighted { "*" } else { " " };
                ui.monospace(format!("{marker} {:<8} {:<8} {}", info.name, info.kind, info.color));
            }
        });
    }
}

/// GPU objects, created once the event loop hands us a window.
struct Gpu {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    renderer: WgpuRenderer,
    egui_winit: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

struct GpuApp {
    state: AppState,
    gpu: Option<Gpu>,
    egui_ctx: EguiContext,
}

impl GpuApp {
    fn new(stage: Stage) -> Self {
        Self {
            state: AppState::new(stage),
            gpu: None,
            egui_ctx: EguiContext::default(),
        }
    }

    fn init_gpu(&mut self, event_loop: &ActiveEventLoop) -> Result<Gpu> {
        let window_config = self.state.stage.window();
        let attrs = Window::default_attributes()
            .with_title(window_config.title.clone())
            .with_inner_size(PhysicalSize::new(window_config.width, window_config.height));
        let window = Arc::new(event_loop.create_window(attrs).context("create window")?);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .context("create surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| anyhow!("no compatible GPU adapter"))?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("diorama_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .context("create device")?;

        let size = window.inner_size();
        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or(caps.formats.first())
            .copied()
            .ok_or_else(|| anyhow!("surface reports no formats"))?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let renderer = WgpuRenderer::new(&device, format, config.width, config.height);
        let egui_winit = egui_winit::State::new(
            self.egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&device, format, None, 1, false);

        // The real size may differ from the requested one.
        self.state.handle(RawInput::Resized {
            width: size.width,
            height: size.height,
        });

        tracing::info!(
            backend = adapter.get_info().backend.to_str(),
            ?format,
            "GPU initialized"
        );
        Ok(Gpu {
            window,
            surface,
            device,
            queue,
            config,
            renderer,
            egui_winit,
            egui_renderer,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if let Some(gpu) = &mut self.gpu {
            gpu.config.width = width.max(1);
            gpu.config.height = height.max(1);
            gpu.surface.configure(&gpu.device, &gpu.config);
            gpu.renderer
                .resize(&gpu.device, gpu.config.width, gpu.config.height);
        }
        self.state.handle(RawInput::Resized { width, height });
    }

    fn redraw(&mut self) {
        let Some(gpu) = &mut self.gpu else {
            return;
        };

        let now = Instant::now();
        self.state.timer.record(now - self.state.last_frame);
        self.state.last_frame = now;

        let output = match gpu.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.surface.configure(&gpu.device, &gpu.config);
                return;
            }
            Err(e) => {
                tracing::error!("surface error: {e}");
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let helpers = self.state.stage.helpers();
        let scene_commands = self.state.stage.frame(&mut GpuFrame {
            renderer: &mut gpu.renderer,
            device: &gpu.device,
            queue: &gpu.queue,
            target: &view,
            helpers,
        });

        let raw_input = gpu.egui_winit.take_egui_input(&gpu.window);
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            self.state.draw_ui(ctx);
        });
        gpu.egui_winit
            .handle_platform_output(&gpu.window, full_output.platform_output);

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [gpu.config.width, gpu.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        for (id, image_delta) in &full_output.textures_delta.set {
            gpu.egui_renderer
                .update_texture(&gpu.device, &gpu.queue, *id, image_delta);
        }
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("egui_encoder"),
            });
        let user_commands = gpu.egui_renderer.update_buffers(
            &gpu.device,
            &gpu.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );
        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    ..Default::default()
                })
                .forget_lifetime();
            gpu.egui_renderer
                .render(&mut pass, &paint_jobs, &screen_descriptor);
        }
        gpu.queue.submit(
            std::iter::once(scene_commands)
                .chain(user_commands)
                .chain(std::iter::once(encoder.finish())),
        );
        for id in &full_output.textures_delta.free {
            gpu.egui_renderer.free_texture(id);
        }

        output.present();
    }
}

impl ApplicationHandler for GpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }
        match self.init_gpu(event_loop) {
            Ok(gpu) => self.gpu = Some(gpu),
            Err(e) => {
                tracing::error!("failed to start renderer: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(gpu) = &mut self.gpu {
            let response = gpu.egui_winit.on_window_event(&gpu.window, &event);
            if response.consumed {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                self.state.stage.cancel_loads();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => self.resize(size.width, size.height),
            WindowEvent::CursorMoved { position, .. } => self.state.handle(RawInput::CursorMoved {
                x: position.x as f32,
                y: position.y as f32,
            }),
            WindowEvent::CursorLeft { .. } => self.state.handle(RawInput::CursorLeft),
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state,
                ..
            } => self.state.handle(RawInput::PrimaryButton {
                pressed: state == ElementState::Pressed,
            }),
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / PIXELS_PER_LINE,
                };
                self.state.handle(RawInput::Wheel(lines));
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::F1),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                self.state.show_panel = !self.state.show_panel;
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gpu) = &self.gpu {
            gpu.window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    tracing::info!("diorama-desktop starting");

    let config = match &cli.config {
        Some(path) => StageConfig::load(path)?,
        None => StageConfig::default(),
    };
    let stage = Stage::new(&config)?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = GpuApp::new(stage);
    event_loop.run_app(&mut app)?;

    Ok(())
}
