use crate::device::{
    Backend, ClearColor, DeviceContext, GraphicsError, GraphicsResult, RenderTargetBinding,
    SwapChainConfig, Viewport,
};

use super::frame::FrameDriver;
use super::geometry::{GeometryBuffer, TriangleMesh};
use super::pipeline::{PipelineDesc, ShaderPipeline};
use super::shader::ShaderCompiler;

/// Everything the graphics core needs besides the window.
#[derive(Debug, Clone)]
pub struct GraphicsConfig {
    pub swap_chain: SwapChainConfig,

    /// Color the render target is cleared to at the start of every frame.
    pub clear_color: ClearColor,

    /// Geometry uploaded once at construction.
    pub mesh: TriangleMesh,

    pub pipeline: PipelineDesc,
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            swap_chain: SwapChainConfig::default(),
            clear_color: ClearColor::rgb(32, 103, 178),
            mesh: TriangleMesh::default(),
            pipeline: PipelineDesc::default(),
        }
    }
}

/// The graphics core: sole owner of every GPU object.
///
/// Components are acquired in dependency order (device context, render target,
/// geometry, pipeline) and released in exactly the reverse order. Release only
/// touches what was actually acquired, so a failed construction and a repeated
/// `shutdown()` are both safe. Dropping the core shuts it down.
pub struct Graphics<B: Backend> {
    backend: B,
    device: Option<DeviceContext<B>>,
    target: Option<RenderTargetBinding<B>>,
    geometry: Option<GeometryBuffer<B>>,
    pipeline: Option<ShaderPipeline<B>>,
    driver: FrameDriver,
}

impl<B: Backend> Graphics<B> {
    /// Builds the full resource set for a `width` x `height` surface.
    pub fn new<C: ShaderCompiler + ?Sized>(
        backend: B,
        compiler: &mut C,
        config: &GraphicsConfig,
        width: u32,
        height: u32,
    ) -> GraphicsResult<Self> {
        let desc = config.swap_chain.describe(width, height)?;

        let mut graphics = Self {
            backend,
            device: None,
            target: None,
            geometry: None,
            pipeline: None,
            driver: FrameDriver::new(config.clear_color, config.swap_chain.sync_interval),
        };

        // On `?` below, `graphics` is dropped and releases the stages acquired so far.
        {
            let Self {
                backend,
                device,
                target,
                geometry,
                pipeline,
                ..
            } = &mut graphics;

            let dc = device.insert(DeviceContext::create(backend, desc)?);
            *target = Some(RenderTargetBinding::create(backend, dc)?);
            *geometry = Some(GeometryBuffer::create(backend, dc, &config.mesh)?);
            *pipeline = Some(ShaderPipeline::create(backend, dc, compiler, &config.pipeline)?);
        }

        log::info!("graphics initialized ({width}x{height})");
        Ok(graphics)
    }

    /// Renders and presents one frame.
    ///
    /// Blocks in present when vsync is enabled. Errors are fatal (`DeviceLost`),
    /// or `ShutDown` if called after [`Graphics::shutdown`].
    pub fn render_frame(&mut self) -> GraphicsResult<()> {
        let Self {
            backend,
            device,
            target,
            geometry,
            pipeline,
            driver,
        } = self;

        let (Some(dc), Some(target), Some(geometry), Some(_)) =
            (device.as_mut(), target.as_ref(), geometry.as_ref(), pipeline.as_ref())
        else {
            return Err(GraphicsError::ShutDown);
        };

        driver.execute(backend, dc, target, geometry)
    }

    /// Releases every GPU object in reverse acquisition order. Idempotent.
    pub fn shutdown(&mut self) {
        if !self.is_live() {
            return;
        }

        if let Some(pipeline) = self.pipeline.take() {
            pipeline.release(&mut self.backend);
        }
        if let Some(geometry) = self.geometry.take() {
            geometry.release(&mut self.backend);
        }
        if let Some(target) = self.target.take() {
            target.release(&mut self.backend);
        }
        if let Some(device) = self.device.take() {
            device.release(&mut self.backend);
        }

        log::info!("graphics shut down after {} frame(s)", self.driver.frames());
    }

    /// True while any GPU object is still held.
    pub fn is_live(&self) -> bool {
        self.device.is_some()
            || self.target.is_some()
            || self.geometry.is_some()
            || self.pipeline.is_some()
    }

    pub fn frames(&self) -> u64 {
        self.driver.frames()
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.target.as_ref().map(|t| t.viewport())
    }

    pub fn geometry(&self) -> Option<&GeometryBuffer<B>> {
        self.geometry.as_ref()
    }

    pub fn pipeline(&self) -> Option<&ShaderPipeline<B>> {
        self.pipeline.as_ref()
    }
}

impl<B: Backend> Drop for Graphics<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
