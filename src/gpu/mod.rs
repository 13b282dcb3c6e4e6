//! `wgpu` implementation of [`GraphicsDevice`].
//!
//! One command encoder per frame: the compute pass that advances the
//! particles is recorded before the render pass that draws them, so the
//! simulation writes are visible to the draw without extra synchronisation.
//!
//! Both particle buffers carry `STORAGE | VERTEX` usage. Two compute bind
//! groups are built up front, one per direction (`A -> B`, `B -> A`), and the
//! frame loop picks between them with the read index.

mod quad;

use std::sync::Arc;

use wgpu::util::DeviceExt;
use winit::window::Window;

pub use quad::{quad_layout, QuadVertex, QUAD_VERTICES};

use crate::config::Config;
use crate::device::{check_roles, BufferIndex, GraphicsDevice};
use crate::error::{FrameError, ResourceError};
use crate::noise::NoiseField;
use crate::particle::ParticleRecord;
use crate::shader_utils::{render_shader, simulation_shader, WORKGROUP_SIZE};
use crate::textures::SpriteSet;
use crate::uniforms::{RenderUniforms, SimUniforms};

/// Both particle buffers and the bind groups that read one and write the other.
struct ParticleBuffers {
    buffers: [wgpu::Buffer; 2],
    /// `simulate_groups[i]` reads `buffers[i]` and writes `buffers[1 - i]`.
    simulate_groups: [wgpu::BindGroup; 2],
    capacity: u32,
}

/// Work recorded between `begin_frame` and `end_frame`.
struct FrameInFlight {
    output: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
}

pub struct WgpuDevice {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    compute_pipeline: wgpu::ComputePipeline,
    compute_layout: wgpu::BindGroupLayout,
    render_pipeline: wgpu::RenderPipeline,
    render_bind_group: wgpu::BindGroup,
    sim_uniform_buffer: wgpu::Buffer,
    render_uniform_buffer: wgpu::Buffer,
    noise_buffer: wgpu::Buffer,
    quad_buffer: wgpu::Buffer,
    particles: Option<ParticleBuffers>,
    frame: Option<FrameInFlight>,
    clear_color: wgpu::Color,
}

impl WgpuDevice {
    /// Acquire an adapter and device for `window` and build every fixed resource.
    ///
    /// Particle buffers are created separately by
    /// [`GraphicsDevice::allocate_particles`].
    pub async fn new(
        window: Arc<Window>,
        config: &Config,
        sprites: &SpriteSet,
        noise: &NoiseField,
    ) -> Result<Self, ResourceError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(ResourceError::NoAdapter)?;
        log::info!("Using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        // Setup and frames run inside error scopes; anything outside them is logged.
        device.on_uncaptured_error(Box::new(|error: wgpu::Error| {
            log::error!("Uncaptured GPU error: {error}");
        }));

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(ResourceError::SurfaceUnsupported)?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .ok_or(ResourceError::SurfaceUnsupported)?;

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let sim_uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Simulation Uniforms"),
            contents: bytemuck::bytes_of(&SimUniforms::default()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let render_uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Render Uniforms"),
            contents: bytemuck::bytes_of(&RenderUniforms::new(glam::Mat4::IDENTITY, config.size, sprites.len())),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let noise_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Noise Field"),
            contents: bytemuck::cast_slice(noise.texels()),
            usage: wgpu::BufferUsages::STORAGE,
        });

        let quad_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Quad Vertices"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        // Sprite array
        check_sprite_limits(sprites.width(), sprites.height(), sprites.len(), &device.limits())?;
        let sprite_data: Vec<u8> = sprites.layers().flatten().copied().collect();
        let sprite_texture = with_validation_scope(&device, || {
            device.create_texture_with_data(
                &queue,
                &wgpu::TextureDescriptor {
                    label: Some("Sprite Array"),
                    size: wgpu::Extent3d {
                        width: sprites.width(),
                        height: sprites.height(),
                        depth_or_array_layers: sprites.len(),
                    },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: wgpu::TextureFormat::Rgba8UnormSrgb,
                    usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                    view_formats: &[],
                },
                wgpu::util::TextureDataOrder::LayerMajor,
                &sprite_data,
            )
        })
        .map_err(|error| ResourceError::Texture(error.to_string()))?;
        // A single layer would otherwise default to a plain 2D view.
        let sprite_view = sprite_texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Sprite Array View"),
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..Default::default()
        });
        let sprite_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Sprite Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        // Compute pipeline
        let storage_entry = |binding: u32, read_only: bool| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let compute_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Simulation Bind Group Layout"),
            entries: &[
                storage_entry(0, true),
                storage_entry(1, false),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                storage_entry(3, true),
            ],
        });

        let compute_pipeline = with_validation_scope(&device, || {
            let compute_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Simulation Shader"),
                source: wgpu::ShaderSource::Wgsl(simulation_shader().into()),
            });

            let compute_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Simulation Pipeline Layout"),
                bind_group_layouts: &[&compute_layout],
                push_constant_ranges: &[],
            });

            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("Simulation Pipeline"),
                layout: Some(&compute_pipeline_layout),
                module: &compute_shader,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                cache: None,
            })
        })
        .map_err(|error| ResourceError::Shader {
            stage: "simulation",
            reason: error.to_string(),
        })?;

        // Render pipeline
        let render_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Render Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2Array,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let render_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Render Bind Group"),
            layout: &render_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: render_uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&sprite_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&sprite_sampler),
                },
            ],
        });

        let render_pipeline = with_validation_scope(&device, || {
            let render_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Render Shader"),
                source: wgpu::ShaderSource::Wgsl(render_shader().into()),
            });

            let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Render Pipeline Layout"),
                bind_group_layouts: &[&render_layout],
                push_constant_ranges: &[],
            });

            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Render Pipeline"),
                layout: Some(&render_pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &render_shader,
                    entry_point: Some("vs_main"),
                    buffers: &[quad_layout(), ParticleRecord::instance_layout()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &render_shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: surface_config.format,
                        blend: Some(config.blend.to_blend_state()),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })
        .map_err(|error| ResourceError::Shader {
            stage: "render",
            reason: error.to_string(),
        })?;

        let [r, g, b, a] = config.clear_color;
        log::info!(
            "GPU ready: {}x{} {:?}, {} sprites of {}x{}",
            surface_config.width,
            surface_config.height,
            surface_config.format,
            sprites.len(),
            sprites.width(),
            sprites.height()
        );

        Ok(Self {
            surface,
            device,
            queue,
            config: surface_config,
            compute_pipeline,
            compute_layout,
            render_pipeline,
            render_bind_group,
            sim_uniform_buffer,
            render_uniform_buffer,
            noise_buffer,
            quad_buffer,
            particles: None,
            frame: None,
            clear_color: wgpu::Color { r, g, b, a },
        })
    }

    /// Close the error scope opened in `begin_frame`.
    fn pop_error_scope(&self, stage: &'static str) -> Result<(), FrameError> {
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(error) => Err(FrameError::Rejected {
                stage,
                reason: error.to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// Run `build` inside a validation error scope and return the first error it raised.
fn with_validation_scope<T>(device: &wgpu::Device, build: impl FnOnce() -> T) -> Result<T, wgpu::Error> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = build();
    match pollster::block_on(device.pop_error_scope()) {
        Some(error) => Err(error),
        None => Ok(value),
    }
}

/// Check that a `width x height x layers` sprite array fits the device limits.
pub fn check_sprite_limits(
    width: u32,
    height: u32,
    layers: u32,
    limits: &wgpu::Limits,
) -> Result<(), ResourceError> {
    let max = limits.max_texture_dimension_2d;
    if width > max || height > max {
        return Err(ResourceError::Texture(format!(
            "sprites are {width}x{height}, device allows at most {max}x{max}"
        )));
    }
    if layers > limits.max_texture_array_layers {
        return Err(ResourceError::Texture(format!(
            "{layers} sprite layers, device allows at most {}",
            limits.max_texture_array_layers
        )));
    }
    Ok(())
}

impl GraphicsDevice for WgpuDevice {
    fn allocate_particles(&mut self, initial: &[ParticleRecord]) -> Result<(), ResourceError> {
        if self.particles.is_some() {
            return Err(ResourceError::Buffers("already allocated"));
        }
        if initial.is_empty() {
            return Err(ResourceError::Buffers("need at least one record"));
        }

        let contents: &[u8] = bytemuck::cast_slice(initial);
        let make_buffer = |label| {
            self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::VERTEX
                    | wgpu::BufferUsages::COPY_DST,
            })
        };
        let buffers = [make_buffer("Particle Buffer A"), make_buffer("Particle Buffer B")];

        let make_group = |label, read: &wgpu::Buffer, write: &wgpu::Buffer| {
            self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &self.compute_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: read.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: write.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: self.sim_uniform_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: self.noise_buffer.as_entire_binding(),
                    },
                ],
            })
        };
        let simulate_groups = [
            make_group("Simulate A -> B", &buffers[0], &buffers[1]),
            make_group("Simulate B -> A", &buffers[1], &buffers[0]),
        ];

        log::info!(
            "Allocated 2 particle buffers of {} records ({} bytes each)",
            initial.len(),
            contents.len()
        );
        self.particles = Some(ParticleBuffers {
            buffers,
            simulate_groups,
            capacity: initial.len() as u32,
        });
        Ok(())
    }

    fn begin_frame(&mut self) -> Result<(), FrameError> {
        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(error) => {
                if matches!(error, wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) {
                    self.surface.configure(&self.device, &self.config);
                }
                return Err(error.into());
            }
        };
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Frame Encoder"),
        });

        self.frame = Some(FrameInFlight { output, view, encoder });
        Ok(())
    }

    fn simulate(
        &mut self,
        read: BufferIndex,
        write: BufferIndex,
        active_count: u32,
        uniforms: &SimUniforms,
    ) -> Result<(), FrameError> {
        check_roles(read, write)?;
        let particles = self.particles.as_ref().ok_or(FrameError::OutOfFrame("simulation"))?;
        let frame = self.frame.as_mut().ok_or(FrameError::OutOfFrame("simulation"))?;
        let active_count = active_count.min(particles.capacity);

        let mut uniforms = *uniforms;
        uniforms.active_count = active_count;
        self.queue
            .write_buffer(&self.sim_uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        if active_count == 0 {
            return Ok(());
        }

        let mut compute_pass = frame.encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Simulation Pass"),
            timestamp_writes: None,
        });
        compute_pass.set_pipeline(&self.compute_pipeline);
        compute_pass.set_bind_group(0, &particles.simulate_groups[read], &[]);
        compute_pass.dispatch_workgroups(active_count.div_ceil(WORKGROUP_SIZE), 1, 1);
        Ok(())
    }

    fn draw(
        &mut self,
        buffer: BufferIndex,
        active_count: u32,
        uniforms: &RenderUniforms,
    ) -> Result<(), FrameError> {
        let particles = self.particles.as_ref().ok_or(FrameError::OutOfFrame("render"))?;
        let instances = particles.buffers.get(buffer).ok_or_else(|| FrameError::Rejected {
            stage: "render",
            reason: format!("no particle buffer {buffer}"),
        })?;
        let active_count = active_count.min(particles.capacity);
        let frame = self.frame.as_mut().ok_or(FrameError::OutOfFrame("render"))?;

        self.queue
            .write_buffer(&self.render_uniform_buffer, 0, bytemuck::bytes_of(uniforms));

        let mut render_pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Particle Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear_color),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        if active_count > 0 {
            render_pass.set_pipeline(&self.render_pipeline);
            render_pass.set_bind_group(0, &self.render_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.quad_buffer.slice(..));
            render_pass.set_vertex_buffer(1, instances.slice(..));
            render_pass.draw(0..QUAD_VERTICES.len() as u32, 0..active_count);
        }
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), FrameError> {
        let frame = self.frame.take().ok_or(FrameError::OutOfFrame("present"))?;

        self.queue.submit(std::iter::once(frame.encoder.finish()));
        let rejected = self.pop_error_scope("frame");
        frame.output.present();
        rejected
    }

    fn abort_frame(&mut self) {
        // Dropping the encoder discards the recorded passes; the surface
        // texture goes back to the swapchain unpresented.
        if self.frame.take().is_some() {
            if let Err(error) = self.pop_error_scope("aborted frame") {
                log::debug!("{error}");
            }
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
            log::debug!("Surface resized to {width}x{height}");
        }
    }
}
