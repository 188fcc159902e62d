use std::sync::Arc;

use anyhow::Context as _;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::render::{InputLayoutDesc, ShaderBytecode};

use super::backend::{
    Backend, ClearColor, DeviceObjects, PipelineState, Resource, SwapChainDesc,
    VertexBufferBinding, Viewport,
};
use super::scope::{self, FaultLatch};
use super::surface;
use super::{GraphicsError, GraphicsResult};

/// wgpu implementation of [`Backend`], bound to one window.
///
/// The surface borrows the window, so the window must outlive every object
/// this backend hands out.
pub struct WgpuBackend<'w> {
    window: &'w Window,
    instance: wgpu::Instance,
}

/// Logical device plus the adapter it was opened on.
pub struct WgpuDevice {
    adapter: wgpu::Adapter,
    device: wgpu::Device,
}

/// Configured surface. Shared with render-target views derived from it.
pub struct WgpuSwapChain<'w> {
    surface: Arc<wgpu::Surface<'w>>,
    config: wgpu::SurfaceConfiguration,
    sync_interval: u32,
}

/// View over the swap chain's current back buffer.
///
/// wgpu hands out a new texture on every acquisition, so the concrete
/// `TextureView` is derived per frame from the surface this view refers to.
pub struct WgpuRenderTarget<'w> {
    surface: Arc<wgpu::Surface<'w>>,
    format: wgpu::TextureFormat,
}

pub struct WgpuShader {
    module: wgpu::ShaderModule,
    entry_point: String,
}

pub struct WgpuInputLayout {
    strides: Vec<u64>,
    attributes: Vec<Vec<wgpu::VertexAttribute>>,
}

/// Immediate context emulated on top of wgpu's command encoders.
///
/// State setters only record; the recorded clear, pipeline, vertex buffer and
/// viewport are turned into one render pass per draw, and the frame's encoder
/// is submitted on present.
pub struct WgpuContext<'w> {
    device: wgpu::Device,
    queue: wgpu::Queue,
    target: Option<Arc<wgpu::Surface<'w>>>,
    target_format: wgpu::TextureFormat,
    viewport: Option<Viewport>,
    pipeline: Option<wgpu::RenderPipeline>,
    strides: Vec<u64>,
    vertex_buffers: Vec<(u32, wgpu::Buffer, u64)>,
    frame: Option<PendingFrame>,
    faults: FaultLatch,
}

struct PendingFrame {
    surface_texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
    clear: Option<wgpu::Color>,
}

impl<'w> WgpuBackend<'w> {
    pub fn new(window: &'w Window) -> Self {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        Self { window, instance }
    }

    /// Adapter/device acquisition is asynchronous under wgpu.
    async fn open_device(
        &self,
        surface: &wgpu::Surface<'w>,
    ) -> anyhow::Result<(wgpu::Adapter, wgpu::Device, wgpu::Queue)> {
        let adapter = self
            .instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no compatible hardware adapter")?;

        let info = adapter.get_info();
        anyhow::ensure!(
            info.device_type != wgpu::DeviceType::Cpu,
            "adapter `{}` is a software rasterizer",
            info.name
        );

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("trigon device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        log::info!("using adapter `{}` ({:?}, {:?})", info.name, info.backend, info.device_type);
        Ok((adapter, device, queue))
    }
}

impl<'w> WgpuContext<'w> {
    /// Acquires the current back buffer if this frame has not done so yet.
    fn begin_frame(&mut self, surface: &wgpu::Surface<'w>) -> GraphicsResult<&mut PendingFrame> {
        if self.frame.is_none() {
            let surface_texture = surface
                .get_current_texture()
                .map_err(surface::map_surface_error)?;
            let view = surface_texture
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default());
            let encoder = self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("trigon frame encoder"),
                });
            self.frame = Some(PendingFrame {
                surface_texture,
                view,
                encoder,
                clear: None,
            });
        }
        self.frame
            .as_mut()
            .ok_or_else(|| GraphicsError::device_lost("no frame in flight"))
    }

    fn bound_surface(&self) -> GraphicsResult<Arc<wgpu::Surface<'w>>> {
        self.target
            .clone()
            .ok_or_else(|| GraphicsError::device_lost("no render target bound"))
    }
}

fn vertex_layout(desc: &InputLayoutDesc) -> WgpuInputLayout {
    let slots = desc.slot_count() as u32;
    let strides = (0..slots).map(|slot| desc.stride(slot)).collect();
    let attributes = (0..slots)
        .map(|slot| {
            desc.slot_elements(slot)
                .map(|e| wgpu::VertexAttribute {
                    format: e.format,
                    offset: e.offset,
                    shader_location: e.location,
                })
                .collect()
        })
        .collect();

    WgpuInputLayout { strides, attributes }
}

fn upload_vertices(device: &wgpu::Device, contents: &[u8]) -> GraphicsResult<wgpu::Buffer> {
    let size = contents.len() as u64;
    let limit = device.limits().max_buffer_size;
    if size == 0 || size > limit {
        return Err(GraphicsError::BufferAllocationFailed {
            size,
            reason: format!("size must be within 1..={limit} bytes"),
        });
    }

    let (buffer, err) = scope::capture(device, || {
        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("trigon vertex buffer"),
            contents,
            usage: wgpu::BufferUsages::VERTEX,
        })
    });
    match err {
        Some(err) => {
            buffer.destroy();
            Err(scope::buffer_error(size, err))
        }
        None => Ok(buffer),
    }
}

fn create_shader(device: &wgpu::Device, bytecode: &ShaderBytecode) -> GraphicsResult<WgpuShader> {
    let (module, err) = scope::capture(device, || {
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(bytecode.name.as_str()),
            source: wgpu::ShaderSource::Wgsl(bytecode.source.as_str().into()),
        })
    });
    if let Some(err) = err {
        return Err(scope::shader_error(bytecode.stage(), err));
    }

    Ok(WgpuShader {
        module,
        entry_point: bytecode.entry_point.clone(),
    })
}

/// Links both stages, the vertex buffer layouts and the topology into one pipeline.
fn build_pipeline(
    device: &wgpu::Device,
    vertex_shader: &WgpuShader,
    pixel_shader: &WgpuShader,
    layout: &WgpuInputLayout,
    topology: wgpu::PrimitiveTopology,
    target_format: wgpu::TextureFormat,
) -> GraphicsResult<wgpu::RenderPipeline> {
    let buffers: Vec<wgpu::VertexBufferLayout<'_>> = layout
        .strides
        .iter()
        .zip(&layout.attributes)
        .map(|(stride, attributes)| wgpu::VertexBufferLayout {
            array_stride: *stride,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes,
        })
        .collect();

    let (pipeline, err) = scope::capture(device, || {
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("trigon pipeline layout"),
            bind_group_layouts: &[],
            immediate_size: 0,
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("trigon pipeline"),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module: &vertex_shader.module,
                entry_point: Some(vertex_shader.entry_point.as_str()),
                compilation_options: Default::default(),
                buffers: &buffers,
            },

            fragment: Some(wgpu::FragmentState {
                module: &pixel_shader.module,
                entry_point: Some(pixel_shader.entry_point.as_str()),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        })
    });

    match err {
        Some(err) => Err(scope::pipeline_error(err)),
        None => Ok(pipeline),
    }
}

fn color_pass<'e>(frame: &'e mut PendingFrame, label: &str) -> wgpu::RenderPass<'e> {
    let load = match frame.clear.take() {
        Some(color) => wgpu::LoadOp::Clear(color),
        None => wgpu::LoadOp::Load,
    };

    frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: &frame.view,
            resolve_target: None,
            ops: wgpu::Operations {
                load,
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    })
}

impl<'w> Backend for WgpuBackend<'w> {
    type Device = WgpuDevice;
    type Context = WgpuContext<'w>;
    type SwapChain = WgpuSwapChain<'w>;
    type RenderTargetView = WgpuRenderTarget<'w>;
    type Buffer = wgpu::Buffer;
    type VertexShader = WgpuShader;
    type PixelShader = WgpuShader;
    type InputLayout = WgpuInputLayout;

    fn create_device(&mut self, desc: &SwapChainDesc) -> GraphicsResult<DeviceObjects<Self>> {
        let surface = self
            .instance
            .create_surface(self.window)
            .map_err(|e| GraphicsError::device_creation(format!("failed to create surface: {e}")))?;

        let (adapter, device, queue) = pollster::block_on(self.open_device(&surface))
            .map_err(|e| GraphicsError::device_creation(format!("{e:#}")))?;

        let caps = surface.get_capabilities(&adapter);
        let format = surface::choose_surface_format(&caps.formats, desc.format)
            .ok_or_else(|| GraphicsError::device_creation("surface has no supported formats"))?;
        if format != desc.format {
            log::warn!("{:?} unsupported by surface; using {format:?}", desc.format);
        }

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: desc.width,
            height: desc.height,
            present_mode: surface::choose_present_mode(&caps.present_modes, desc.sync_interval),
            alpha_mode: surface::choose_alpha_mode(&caps.alpha_modes),
            view_formats: vec![],
            desired_maximum_frame_latency: desc.buffer_count.max(1),
        };
        surface.configure(&device, &config);

        let faults = FaultLatch::default();
        device.on_uncaptured_error(faults.handler());

        // wgpu has no refresh-rate control; the mode's rate is advisory.
        log::info!(
            "swap chain {}x{} {:?}, {:?}, requested {:.0} Hz",
            config.width,
            config.height,
            config.format,
            config.present_mode,
            desc.refresh_rate.hz()
        );

        Ok(DeviceObjects {
            device: WgpuDevice {
                adapter,
                device: device.clone(),
            },
            context: WgpuContext {
                device,
                queue,
                target: None,
                target_format: format,
                viewport: None,
                pipeline: None,
                strides: Vec::new(),
                vertex_buffers: Vec::new(),
                frame: None,
                faults,
            },
            swap_chain: WgpuSwapChain {
                surface: Arc::new(surface),
                config,
                sync_interval: desc.sync_interval,
            },
        })
    }

    fn create_render_target_view(
        &mut self,
        _device: &WgpuDevice,
        swap_chain: &WgpuSwapChain<'w>,
        index: u32,
    ) -> GraphicsResult<WgpuRenderTarget<'w>> {
        if index != 0 {
            return Err(GraphicsError::BackBufferUnavailable {
                index,
                reason: "only the current back buffer can be viewed".to_string(),
            });
        }
        if !swap_chain
            .config
            .usage
            .contains(wgpu::TextureUsages::RENDER_ATTACHMENT)
        {
            return Err(GraphicsError::BackBufferUnavailable {
                index,
                reason: "back buffer is not renderable".to_string(),
            });
        }

        Ok(WgpuRenderTarget {
            surface: Arc::clone(&swap_chain.surface),
            format: swap_chain.config.format,
        })
    }

    fn create_vertex_buffer(&mut self, device: &WgpuDevice, contents: &[u8]) -> GraphicsResult<wgpu::Buffer> {
        upload_vertices(&device.device, contents)
    }

    fn create_vertex_shader(&mut self, device: &WgpuDevice, bytecode: &ShaderBytecode) -> GraphicsResult<WgpuShader> {
        create_shader(&device.device, bytecode)
    }

    fn create_pixel_shader(&mut self, device: &WgpuDevice, bytecode: &ShaderBytecode) -> GraphicsResult<WgpuShader> {
        create_shader(&device.device, bytecode)
    }

    fn create_input_layout(&mut self, _device: &WgpuDevice, desc: &InputLayoutDesc) -> GraphicsResult<WgpuInputLayout> {
        Ok(vertex_layout(desc))
    }

    fn set_render_target(&mut self, context: &mut WgpuContext<'w>, view: &WgpuRenderTarget<'w>) {
        context.target = Some(Arc::clone(&view.surface));
        context.target_format = view.format;
    }

    fn set_viewport(&mut self, context: &mut WgpuContext<'w>, viewport: Viewport) {
        context.viewport = Some(viewport);
    }

    fn set_pipeline_state(
        &mut self,
        context: &mut WgpuContext<'w>,
        state: PipelineState<'_, Self>,
    ) -> GraphicsResult<()> {
        let pipeline = build_pipeline(
            &context.device,
            state.vertex_shader,
            state.pixel_shader,
            state.input_layout,
            state.topology,
            context.target_format,
        )?;

        context.pipeline = Some(pipeline);
        context.strides = state.input_layout.strides.clone();
        Ok(())
    }

    fn clear_render_target(
        &mut self,
        context: &mut WgpuContext<'w>,
        view: &WgpuRenderTarget<'w>,
        color: ClearColor,
    ) -> GraphicsResult<()> {
        let frame = context.begin_frame(&view.surface)?;
        frame.clear = Some(color.to_wgpu());
        Ok(())
    }

    fn set_vertex_buffer(&mut self, context: &mut WgpuContext<'w>, binding: VertexBufferBinding<'_, Self>) {
        let expected = context.strides.get(binding.slot as usize).copied();
        if expected.is_some_and(|s| s != binding.stride as u64) {
            log::warn!(
                "slot {} bound with stride {} but the input layout uses {:?}",
                binding.slot,
                binding.stride,
                expected
            );
        }

        context.vertex_buffers.retain(|(slot, _, _)| *slot != binding.slot);
        context
            .vertex_buffers
            .push((binding.slot, binding.buffer.clone(), binding.offset as u64));
    }

    fn draw(&mut self, context: &mut WgpuContext<'w>, vertex_count: u32, start_vertex: u32) -> GraphicsResult<()> {
        context.faults.check()?;
        let surface = context.bound_surface()?;
        context.begin_frame(&surface)?;

        let WgpuContext {
            pipeline,
            viewport,
            vertex_buffers,
            frame,
            ..
        } = context;

        let pipeline = pipeline
            .as_ref()
            .ok_or_else(|| GraphicsError::device_lost("draw issued without pipeline state"))?;
        let Some(frame) = frame.as_mut() else {
            return Err(GraphicsError::device_lost("no frame in flight"));
        };

        let mut rpass = color_pass(frame, "trigon draw pass");
        if let Some(vp) = viewport {
            rpass.set_viewport(vp.x, vp.y, vp.width, vp.height, vp.min_depth, vp.max_depth);
        }
        rpass.set_pipeline(pipeline);
        for (slot, buffer, offset) in vertex_buffers.iter() {
            rpass.set_vertex_buffer(*slot, buffer.slice(*offset..));
        }
        rpass.draw(start_vertex..start_vertex + vertex_count, 0..1);
        Ok(())
    }

    fn present(
        &mut self,
        context: &mut WgpuContext<'w>,
        swap_chain: &WgpuSwapChain<'w>,
        sync_interval: u32,
    ) -> GraphicsResult<()> {
        if sync_interval != swap_chain.sync_interval {
            log::trace!(
                "present mode fixed at configuration ({:?}); interval {sync_interval} ignored",
                swap_chain.config.present_mode
            );
        }

        context.faults.check()?;
        context.begin_frame(&swap_chain.surface)?;
        let Some(mut frame) = context.frame.take() else {
            return Err(GraphicsError::device_lost("no frame in flight"));
        };

        // A clear with no draw after it still has to reach the back buffer.
        if frame.clear.is_some() {
            drop(color_pass(&mut frame, "trigon clear pass"));
        }

        let PendingFrame {
            surface_texture,
            view,
            encoder,
            ..
        } = frame;
        context.queue.submit(std::iter::once(encoder.finish()));
        drop(view);
        surface_texture.present();
        Ok(())
    }

    fn release(&mut self, resource: Resource<Self>) {
        let kind = resource.kind();
        match resource {
            Resource::Buffer(buffer) => buffer.destroy(),
            Resource::Device(device) => {
                log::debug!("closing device on `{}`", device.adapter.get_info().name);
                device.device.destroy();
            }
            other => drop(other),
        }
        log::debug!("released {kind}");
    }
}
