use crate::mesh::{self, LineVertex, Tessellation, Vertex};
use crate::shaders;
use bytemuck::{Pod, Zeroable};
use diorama_common::EntityId;
use diorama_kernel::Registry;
use diorama_render::{
    BloomSettings, DrawItem, DrawStyle, FramePacket, PostProcess, RenderView, Renderer, extract,
};
use glam::Mat4;
use std::collections::{BTreeMap, BTreeSet};
use std::num::NonZeroU64;
use wgpu::util::DeviceExt;

/// Offscreen colour format of the base pass and the bloom chain.
pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
/// Per-draw uniform stride. 256 is the default minimum dynamic offset alignment.
const DRAW_STRIDE: u64 = 256;
const GRID_SIZE: f32 = 10.0;
const GRID_DIVISIONS: u32 = 10;

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 3] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];
const LINE_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x4];

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
struct SceneUniform {
    view_proj: [[f32; 4]; 4],
    ambient: [f32; 4],
    light_dir: [f32; 4],
    light_color: [f32; 4],
}

impl SceneUniform {
    /// Only the first directional light shades surfaces.
    fn new(view: &RenderView, packet: &FramePacket) -> Self {
        let [ar, ag, ab] = packet.lights.ambient;
        let (light_dir, light_color) = match packet.lights.directional.first() {
            Some(light) => {
                let [r, g, b] = light.color.to_linear();
                let d = light.direction;
                let i = light.intensity;
                ([d.x, d.y, d.z, 1.0], [r * i, g * i, b * i, 1.0])
            }
            None => ([0.0, -1.0, 0.0, 0.0], [0.0; 4]),
        };
        Self {
            view_proj: view.view_projection().to_cols_array_2d(),
            ambient: [ar, ag, ab, 1.0],
            light_dir,
            light_color,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
struct DrawUniform {
    model: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 4],
    color: [f32; 4],
    flags: [f32; 4],
}

impl DrawUniform {
    fn new(item: &DrawItem) -> Self {
        let normal_matrix = if item.model.determinant().abs() > 1e-12 {
            item.model.inverse().transpose()
        } else {
            Mat4::IDENTITY
        };
        let [r, g, b] = item.color.to_linear();
        let flag = |on: bool| if on { 1.0 } else { 0.0 };
        Self {
            model: item.model.to_cols_array_2d(),
            normal_matrix: normal_matrix.to_cols_array_2d(),
            color: [r, g, b, item.opacity],
            flags: [
                flag(item.lit),
                flag(item.checker),
                flag(item.emissive),
                flag(item.double_sided),
            ],
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
struct PostUniform {
    texel: [f32; 4],
    bloom: [f32; 4],
}

impl PostUniform {
    fn new(texel: [f32; 2], bloom: BloomSettings) -> Self {
        Self {
            texel: [texel[0], texel[1], 0.0, 0.0],
            bloom: [bloom.threshold, bloom.strength, bloom.radius, 0.0],
        }
    }
}

struct IndexRange {
    buffer: wgpu::Buffer,
    count: u32,
}

/// GPU copy of one entity's tessellation. Geometry never changes after
/// spawn, so this lives until the entity leaves the frame.
struct GpuMesh {
    vertices: wgpu::Buffer,
    triangles: Option<IndexRange>,
    lines: Option<IndexRange>,
}

impl GpuMesh {
    fn upload(device: &wgpu::Device, label: &str, t: &Tessellation) -> Option<Self> {
        if t.vertices.is_empty() {
            return None;
        }
        let vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&t.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index = |indices: &[u32]| {
            (!indices.is_empty()).then(|| IndexRange {
                buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(label),
                    contents: bytemuck::cast_slice(indices),
                    usage: wgpu::BufferUsages::INDEX,
                }),
                count: indices.len() as u32,
            })
        };
        Some(Self {
            vertices,
            triangles: index(&t.triangles),
            lines: index(&t.lines),
        })
    }
}

/// Size-dependent render targets.
struct Targets {
    bloom_width: u32,
    bloom_height: u32,
    hdr: wgpu::TextureView,
    depth: wgpu::TextureView,
    bloom_a: wgpu::TextureView,
    bloom_b: wgpu::TextureView,
}

impl Targets {
    fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        let (bloom_width, bloom_height) = ((width / 2).max(1), (height / 2).max(1));
        let sampled = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
        Self {
            bloom_width,
            bloom_height,
            hdr: texture_view(device, "hdr_target", width, height, HDR_FORMAT, sampled),
            depth: texture_view(
                device,
                "depth_target",
                width,
                height,
                DEPTH_FORMAT,
                wgpu::TextureUsages::RENDER_ATTACHMENT,
            ),
            bloom_a: texture_view(device, "bloom_a", bloom_width, bloom_height, HDR_FORMAT, sampled),
            bloom_b: texture_view(device, "bloom_b", bloom_width, bloom_height, HDR_FORMAT, sampled),
        }
    }
}

struct PostUniforms {
    bright: wgpu::Buffer,
    blur_h: wgpu::Buffer,
    blur_v: wgpu::Buffer,
    composite: wgpu::Buffer,
}

impl PostUniforms {
    fn new(device: &wgpu::Device) -> Self {
        let buffer = |label| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: std::mem::size_of::<PostUniform>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };
        Self {
            bright: buffer("bloom_bright_uniform"),
            blur_h: buffer("bloom_blur_h_uniform"),
            blur_v: buffer("bloom_blur_v_uniform"),
            composite: buffer("composite_uniform"),
        }
    }
}

/// Bind groups that reference the render targets; rebuilt on resize.
struct PostBindGroups {
    bright: wgpu::BindGroup,
    blur_h: wgpu::BindGroup,
    blur_v: wgpu::BindGroup,
    composite: wgpu::BindGroup,
}

impl PostBindGroups {
    fn new(
        device: &wgpu::Device,
        post_layout: &wgpu::BindGroupLayout,
        composite_layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        targets: &Targets,
        uniforms: &PostUniforms,
    ) -> Self {
        let group = |label, source, uniform: &wgpu::Buffer| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: post_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(source),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: uniform.as_entire_binding(),
                    },
                ],
            })
        };
        let composite = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("composite_bind_group"),
            layout: composite_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&targets.hdr),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: uniforms.composite.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&targets.bloom_a),
                },
            ],
        });
        Self {
            bright: group("bloom_bright_bind_group", &targets.hdr, &uniforms.bright),
            blur_h: group("bloom_blur_h_bind_group", &targets.bloom_a, &uniforms.blur_h),
            blur_v: group("bloom_blur_v_bind_group", &targets.bloom_b, &uniforms.blur_v),
            composite,
        }
    }
}

/// wgpu scene renderer: base pass into an HDR target, optional bloom at
/// half resolution, composite onto the surface.
pub struct WgpuRenderer {
    fill_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    helper_pipeline: wgpu::RenderPipeline,
    bright_pipeline: wgpu::RenderPipeline,
    blur_pipeline: wgpu::RenderPipeline,
    composite_pipeline: wgpu::RenderPipeline,
    scene_buffer: wgpu::Buffer,
    scene_bind_group: wgpu::BindGroup,
    draw_layout: wgpu::BindGroupLayout,
    draw_buffer: wgpu::Buffer,
    draw_bind_group: wgpu::BindGroup,
    draw_capacity: u64,
    post_layout: wgpu::BindGroupLayout,
    composite_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    post_uniforms: PostUniforms,
    post_groups: PostBindGroups,
    targets: Targets,
    grid_buffer: wgpu::Buffer,
    grid_vertex_count: u32,
    meshes: BTreeMap<EntityId, GpuMesh>,
    surface_format: wgpu::TextureFormat,
}

impl WgpuRenderer {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let scene_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("scene_uniform"),
            size: std::mem::size_of::<SceneUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let scene_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scene_layout"),
            entries: &[uniform_entry(
                0,
                wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                false,
                None,
            )],
        });
        let scene_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene_bind_group"),
            layout: &scene_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: scene_buffer.as_entire_binding(),
            }],
        });

        let draw_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("draw_layout"),
            entries: &[uniform_entry(
                0,
                wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                true,
                NonZeroU64::new(std::mem::size_of::<DrawUniform>() as u64),
            )],
        });
        let draw_capacity = 16;
        let draw_buffer = create_draw_buffer(device, draw_capacity);
        let draw_bind_group = create_draw_bind_group(device, &draw_layout, &draw_buffer);

        let post_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("post_layout"),
            entries: &[
                texture_entry(0),
                sampler_entry(1),
                uniform_entry(2, wgpu::ShaderStages::FRAGMENT, false, None),
            ],
        });
        let composite_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("composite_layout"),
            entries: &[
                texture_entry(0),
                sampler_entry(1),
                uniform_entry(2, wgpu::ShaderStages::FRAGMENT, false, None),
                texture_entry(3),
            ],
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("post_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let scene_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::SCENE_SHADER.into()),
        });
        let helper_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("helper_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::HELPER_SHADER.into()),
        });
        let post_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("post_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::POST_SHADER.into()),
        });

        let scene_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene_pipeline_layout"),
            bind_group_layouts: &[&scene_layout, &draw_layout],
            push_constant_ranges: &[],
        });
        let helper_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("helper_pipeline_layout"),
                bind_group_layouts: &[&scene_layout],
                push_constant_ranges: &[],
            });
        let post_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("post_pipeline_layout"),
            bind_group_layouts: &[&post_layout],
            push_constant_ranges: &[],
        });
        let composite_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("composite_pipeline_layout"),
                bind_group_layouts: &[&composite_layout],
                push_constant_ranges: &[],
            });

        let mesh_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &VERTEX_ATTRIBUTES,
        };
        let line_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<LineVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &LINE_ATTRIBUTES,
        };

        let fill_pipeline = scene_pipeline(
            device,
            "fill_pipeline",
            &scene_pipeline_layout,
            &scene_module,
            ("vs_main", "fs_main"),
            mesh_layout.clone(),
            wgpu::PrimitiveTopology::TriangleList,
        );
        let line_pipeline = scene_pipeline(
            device,
            "line_pipeline",
            &scene_pipeline_layout,
            &scene_module,
            ("vs_line", "fs_line"),
            mesh_layout,
            wgpu::PrimitiveTopology::LineList,
        );
        let helper_pipeline = scene_pipeline(
            device,
            "helper_pipeline",
            &helper_pipeline_layout,
            &helper_module,
            ("vs_helper", "fs_helper"),
            line_layout,
            wgpu::PrimitiveTopology::LineList,
        );
        let bright_pipeline = fullscreen_pipeline(
            device,
            "bloom_bright_pipeline",
            &post_pipeline_layout,
            &post_module,
            "fs_bright",
            HDR_FORMAT,
        );
        let blur_pipeline = fullscreen_pipeline(
            device,
            "bloom_blur_pipeline",
            &post_pipeline_layout,
            &post_module,
            "fs_blur",
            HDR_FORMAT,
        );
        let composite_pipeline = fullscreen_pipeline(
            device,
            "composite_pipeline",
            &composite_pipeline_layout,
            &post_module,
            "fs_composite",
            surface_format,
        );

        let grid = mesh::grid_lines(GRID_SIZE, GRID_DIVISIONS);
        let grid_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("grid_vertex_buffer"),
            contents: bytemuck::cast_slice(&grid),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let targets = Targets::new(device, width, height);
        let post_uniforms = PostUniforms::new(device);
        let post_groups = PostBindGroups::new(
            device,
            &post_layout,
            &composite_layout,
            &sampler,
            &targets,
            &post_uniforms,
        );

        tracing::info!(?surface_format, width, height, "wgpu renderer created");
        Self {
            fill_pipeline,
            line_pipeline,
            helper_pipeline,
            bright_pipeline,
            blur_pipeline,
            composite_pipeline,
            scene_buffer,
            scene_bind_group,
            draw_layout,
            draw_buffer,
            draw_bind_group,
            draw_capacity,
            post_layout,
            composite_layout,
            sampler,
            post_uniforms,
            post_groups,
            targets,
            grid_buffer,
            grid_vertex_count: grid.len() as u32,
            meshes: BTreeMap::new(),
            surface_format,
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.targets = Targets::new(device, width, height);
        self.post_groups = PostBindGroups::new(
            device,
            &self.post_layout,
            &self.composite_layout,
            &self.sampler,
            &self.targets,
            &self.post_uniforms,
        );
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    /// Meshes currently resident on the GPU.
    pub fn cached_meshes(&self) -> usize {
        self.meshes.len()
    }

    /// Record one frame into a command buffer that draws onto `target`.
    #[allow(clippy::too_many_arguments)]
    pub fn encode(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target: &wgpu::TextureView,
        registry: &Registry,
        view: &RenderView,
        post: &PostProcess,
        helpers: bool,
    ) -> wgpu::CommandBuffer {
        let packet = extract(registry);
        queue.write_buffer(
            &self.scene_buffer,
            0,
            bytemuck::bytes_of(&SceneUniform::new(view, &packet)),
        );
        self.sync_meshes(device, &packet);

        let items = packet.sorted_for_blending();
        self.ensure_draw_capacity(device, items.len());
        let mut staging = vec![0u8; items.len() * DRAW_STRIDE as usize];
        for (i, item) in items.iter().enumerate() {
            let uniform = DrawUniform::new(item);
            let bytes = bytemuck::bytes_of(&uniform);
            let at = i * DRAW_STRIDE as usize;
            staging[at..at + bytes.len()].copy_from_slice(bytes);
        }
        if !staging.is_empty() {
            queue.write_buffer(&self.draw_buffer, 0, &staging);
        }

        let light_lines = if helpers {
            mesh::light_helper_lines(&packet.lights)
        } else {
            Vec::new()
        };
        let light_buffer = (!light_lines.is_empty()).then(|| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("light_helper_buffer"),
                contents: bytemuck::cast_slice(&light_lines),
                usage: wgpu::BufferUsages::VERTEX,
            })
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("frame_encoder"),
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("base_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.targets.hdr,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.targets.depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });
            pass.set_bind_group(0, &self.scene_bind_group, &[]);

            for (i, item) in items.iter().enumerate() {
                let Some(mesh) = self.meshes.get(&item.entity) else {
                    continue;
                };
                let (pipeline, indices) = match item.style {
                    DrawStyle::Fill => (&self.fill_pipeline, mesh.triangles.as_ref()),
                    DrawStyle::Wireframe | DrawStyle::Lines => {
                        (&self.line_pipeline, mesh.lines.as_ref())
                    }
                };
                let Some(indices) = indices else {
                    continue;
                };
                pass.set_pipeline(pipeline);
                pass.set_bind_group(1, &self.draw_bind_group, &[(i as u64 * DRAW_STRIDE) as u32]);
                pass.set_vertex_buffer(0, mesh.vertices.slice(..));
                pass.set_index_buffer(indices.buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..indices.count, 0, 0..1);
            }

            if helpers {
                pass.set_pipeline(&self.helper_pipeline);
                pass.set_vertex_buffer(0, self.grid_buffer.slice(..));
                pass.draw(0..self.grid_vertex_count, 0..1);
                if let Some(buffer) = &light_buffer {
                    pass.set_vertex_buffer(0, buffer.slice(..));
                    pass.draw(0..light_lines.len() as u32, 0..1);
                }
            }
        }

        let bloom = post.active_bloom();
        if let Some(settings) = bloom {
            let texel_w = 1.0 / self.targets.bloom_width as f32;
            let texel_h = 1.0 / self.targets.bloom_height as f32;
            let u = &self.post_uniforms;
            queue.write_buffer(&u.bright, 0, bytemuck::bytes_of(&PostUniform::new([0.0, 0.0], settings)));
            queue.write_buffer(&u.blur_h, 0, bytemuck::bytes_of(&PostUniform::new([texel_w, 0.0], settings)));
            queue.write_buffer(&u.blur_v, 0, bytemuck::bytes_of(&PostUniform::new([0.0, texel_h], settings)));

            let g = &self.post_groups;
            fullscreen_pass(&mut encoder, "bloom_bright", &self.bright_pipeline, &g.bright, &self.targets.bloom_a);
            fullscreen_pass(&mut encoder, "bloom_blur_h", &self.blur_pipeline, &g.blur_h, &self.targets.bloom_b);
            fullscreen_pass(&mut encoder, "bloom_blur_v", &self.blur_pipeline, &g.blur_v, &self.targets.bloom_a);
        }

        let composite = bloom.unwrap_or(BloomSettings {
            strength: 0.0,
            ..BloomSettings::default()
        });
        queue.write_buffer(
            &self.post_uniforms.composite,
            0,
            bytemuck::bytes_of(&PostUniform::new([0.0, 0.0], composite)),
        );
        fullscreen_pass(
            &mut encoder,
            "composite",
            &self.composite_pipeline,
            &self.post_groups.composite,
            target,
        );

        tracing::trace!(draws = items.len(), bloom = bloom.is_some(), "frame encoded");
        encoder.finish()
    }

    fn sync_meshes(&mut self, device: &wgpu::Device, packet: &FramePacket) {
        let live: BTreeSet<EntityId> = packet.items.iter().map(|i| i.entity).collect();
        self.meshes.retain(|id, _| live.contains(id));
        for item in &packet.items {
            if self.meshes.contains_key(&item.entity) {
                continue;
            }
            let label = format!("mesh_{}", item.entity.short());
            if let Some(gpu) = GpuMesh::upload(device, &label, &mesh::tessellate(&item.geometry)) {
                tracing::debug!(
                    entity = %item.entity.short(),
                    kind = item.geometry.kind(),
                    "uploaded mesh"
                );
                self.meshes.insert(item.entity, gpu);
            }
        }
    }

    fn ensure_draw_capacity(&mut self, device: &wgpu::Device, count: usize) {
        let needed = count.max(1) as u64;
        if needed <= self.draw_capacity {
            return;
        }
        let capacity = needed.next_power_of_two();
        self.draw_buffer = create_draw_buffer(device, capacity);
        self.draw_bind_group = create_draw_bind_group(device, &self.draw_layout, &self.draw_buffer);
        self.draw_capacity = capacity;
        tracing::debug!(capacity, "grew draw uniform buffer");
    }
}

/// One frame's worth of GPU context, so the wgpu backend can sit behind
/// [`Renderer`] like any other renderer.
pub struct GpuFrame<'a> {
    pub renderer: &'a mut WgpuRenderer,
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub target: &'a wgpu::TextureView,
    pub helpers: bool,
}

impl Renderer for GpuFrame<'_> {
    type Output = wgpu::CommandBuffer;

    fn render(&mut self, registry: &Registry, view: &RenderView, post: &PostProcess) -> Self::Output {
        self.renderer.encode(
            self.device,
            self.queue,
            self.target,
            registry,
            view,
            post,
            self.helpers,
        )
    }
}

fn texture_view(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
    usage: wgpu::TextureUsages,
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    });
    texture.create_view(&Default::default())
}

fn create_draw_buffer(device: &wgpu::Device, capacity: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("draw_uniforms"),
        size: capacity * DRAW_STRIDE,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_draw_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("draw_bind_group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer,
                offset: 0,
                size: NonZeroU64::new(std::mem::size_of::<DrawUniform>() as u64),
            }),
        }],
    })
}

fn uniform_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    has_dynamic_offset: bool,
    min_binding_size: Option<NonZeroU64>,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset,
            min_binding_size,
        },
        count: None,
    }
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

/// Depth-tested pipeline drawing into the HDR target. No culling: planes
/// are double-sided and closed meshes are resolved by depth.
fn scene_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    (vs, fs): (&str, &str),
    buffer: wgpu::VertexBufferLayout<'static>,
    topology: wgpu::PrimitiveTopology,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some(vs),
            compilation_options: Default::default(),
            buffers: &[buffer],
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some(fs),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: HDR_FORMAT,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: Default::default(),
            bias: Default::default(),
        }),
        multisample: Default::default(),
        multiview: None,
        cache: None,
    })
}

fn fullscreen_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    fs: &str,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_fullscreen"),
            compilation_options: Default::default(),
            buffers: &[],
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some(fs),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: Default::default(),
        multiview: None,
        cache: None,
    })
}

fn fullscreen_pass(
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    pipeline: &wgpu::RenderPipeline,
    bind_group: &wgpu::BindGroup,
    target: &wgpu::TextureView,
) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
        })],
        ..Default::default()
    });
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, bind_group, &[]);
    pass.draw(0..3, 0..1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use diorama_common::Color;
    use diorama_kernel::Geometry;
    use glam::Vec3;

    fn item(model: Mat4) -> DrawItem {
        DrawItem {
            entity: EntityId::new(),
            geometry: Geometry::Sphere { radius: 1.0 },
            model,
            color: Color::WHITE,
            opacity: 0.5,
            style: DrawStyle::Fill,
            lit: true,
            checker: false,
            emissive: true,
            double_sided: false,
            casts_shadow: true,
            highlighted: false,
        }
    }

    #[test]
    fn uniform_sizes_fit_their_slots() {
        assert_eq!(std::mem::size_of::<SceneUniform>(), 112);
        assert!(std::mem::size_of::<DrawUniform>() as u64 <= DRAW_STRIDE);
        assert_eq!(std::mem::size_of::<PostUniform>(), 32);
    }

    #[test]
    fn draw_uniform_packs_flags_and_opacity() {
        let u = DrawUniform::new(&item(Mat4::from_translation(Vec3::X)));
        assert_eq!(u.flags, [1.0, 0.0, 1.0, 0.0]);
        assert!(u.color[..3].iter().all(|c| (c - 1.0).abs() < 1e-5));
        assert_eq!(u.color[3], 0.5);
        assert_eq!(u.model[3], [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn singular_model_gets_identity_normals() {
        let u = DrawUniform::new(&item(Mat4::from_scale(Vec3::ZERO)));
        assert_eq!(u.normal_matrix, Mat4::IDENTITY.to_cols_array_2d());
    }

    #[test]
    fn scene_uniform_without_lights_is_dark() {
        let u = SceneUniform::new(&RenderView::default(), &FramePacket::default());
        assert_eq!(u.light_dir[3], 0.0);
        assert_eq!(u.light_color, [0.0; 4]);
        assert_eq!(u.ambient, [0.0, 0.0, 0.0, 1.0]);
    }
}
