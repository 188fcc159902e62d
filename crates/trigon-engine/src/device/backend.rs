use std::fmt;

use crate::render::{InputLayoutDesc, ShaderBytecode};

use super::GraphicsResult;

/// Display refresh rate expressed as a rational (e.g. 60/1).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RefreshRate {
    pub numerator: u32,
    pub denominator: u32,
}

impl RefreshRate {
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self { numerator, denominator }
    }

    /// Returns the rate in Hz, or 0 for a degenerate denominator.
    pub fn hz(self) -> f32 {
        if self.denominator == 0 {
            0.0
        } else {
            self.numerator as f32 / self.denominator as f32
        }
    }
}

/// Parameters for creating the device, immediate context and swap chain.
///
/// Width and height are the window's client size in physical pixels. They are
/// fixed for the lifetime of the swap chain.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapChainDesc {
    pub width: u32,
    pub height: u32,
    pub refresh_rate: RefreshRate,
    pub format: wgpu::TextureFormat,
    pub buffer_count: u32,
    pub sync_interval: u32,
    pub windowed: bool,
}

/// Viewport transform applied by the rasterizer.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Viewport covering `(0, 0, width, height)` with the full depth range.
    pub fn covering(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// Straight 8-bit RGBA clear color.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ClearColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl ClearColor {
    /// Opaque color from 8-bit channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Unorm conversion (`channel / 255`), no gamma applied.
    pub fn to_wgpu(self) -> wgpu::Color {
        wgpu::Color {
            r: self.r as f64 / 255.0,
            g: self.g as f64 / 255.0,
            b: self.b as f64 / 255.0,
            a: self.a as f64 / 255.0,
        }
    }
}

/// Device, immediate context and swap chain, created together.
pub struct DeviceObjects<B: Backend + ?Sized> {
    pub device: B::Device,
    pub context: B::Context,
    pub swap_chain: B::SwapChain,
}

/// Vertex buffer bound to an input-assembler slot.
pub struct VertexBufferBinding<'a, B: Backend + ?Sized> {
    pub slot: u32,
    pub buffer: &'a B::Buffer,
    pub stride: u32,
    pub offset: u32,
}

/// The fixed pipeline state bound on the immediate context.
pub struct PipelineState<'a, B: Backend + ?Sized> {
    pub vertex_shader: &'a B::VertexShader,
    pub pixel_shader: &'a B::PixelShader,
    pub input_layout: &'a B::InputLayout,
    pub topology: wgpu::PrimitiveTopology,
}

/// Any GPU object owned by the graphics core, handed back for release.
pub enum Resource<B: Backend + ?Sized> {
    Device(B::Device),
    Context(B::Context),
    SwapChain(B::SwapChain),
    RenderTargetView(B::RenderTargetView),
    Buffer(B::Buffer),
    VertexShader(B::VertexShader),
    PixelShader(B::PixelShader),
    InputLayout(B::InputLayout),
}

impl<B: Backend + ?Sized> Resource<B> {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Device(_) => ResourceKind::Device,
            Resource::Context(_) => ResourceKind::Context,
            Resource::SwapChain(_) => ResourceKind::SwapChain,
            Resource::RenderTargetView(_) => ResourceKind::RenderTargetView,
            Resource::Buffer(_) => ResourceKind::Buffer,
            Resource::VertexShader(_) => ResourceKind::VertexShader,
            Resource::PixelShader(_) => ResourceKind::PixelShader,
            Resource::InputLayout(_) => ResourceKind::InputLayout,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ResourceKind {
    Device,
    Context,
    SwapChain,
    RenderTargetView,
    Buffer,
    VertexShader,
    PixelShader,
    InputLayout,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Device => "device",
            ResourceKind::Context => "context",
            ResourceKind::SwapChain => "swap chain",
            ResourceKind::RenderTargetView => "render target view",
            ResourceKind::Buffer => "buffer",
            ResourceKind::VertexShader => "vertex shader",
            ResourceKind::PixelShader => "pixel shader",
            ResourceKind::InputLayout => "input layout",
        };
        f.write_str(name)
    }
}

/// Native GPU API used by the graphics core.
///
/// Every object is created through the backend and handed back exactly once
/// through [`Backend::release`]. The core guarantees that dependents are
/// released before the device they were created from.
///
/// Context-state and frame operations act on the single immediate context;
/// there is no other mutable pipeline state.
pub trait Backend {
    type Device;
    type Context;
    type SwapChain;
    type RenderTargetView;
    type Buffer;
    type VertexShader;
    type PixelShader;
    type InputLayout;

    /// Creates the device, its immediate context and a swap chain.
    ///
    /// All-or-nothing: on error, nothing is left for the caller to release.
    fn create_device(&mut self, desc: &SwapChainDesc) -> GraphicsResult<DeviceObjects<Self>>;

    /// Wraps back buffer `index` of `swap_chain` in a render-target view.
    fn create_render_target_view(
        &mut self,
        device: &Self::Device,
        swap_chain: &Self::SwapChain,
        index: u32,
    ) -> GraphicsResult<Self::RenderTargetView>;

    /// Allocates an immutable vertex buffer initialized with `contents`.
    fn create_vertex_buffer(
        &mut self,
        device: &Self::Device,
        contents: &[u8],
    ) -> GraphicsResult<Self::Buffer>;

    fn create_vertex_shader(
        &mut self,
        device: &Self::Device,
        bytecode: &ShaderBytecode,
    ) -> GraphicsResult<Self::VertexShader>;

    fn create_pixel_shader(
        &mut self,
        device: &Self::Device,
        bytecode: &ShaderBytecode,
    ) -> GraphicsResult<Self::PixelShader>;

    /// Creates an input layout already validated against a vertex shader signature.
    fn create_input_layout(
        &mut self,
        device: &Self::Device,
        desc: &InputLayoutDesc,
    ) -> GraphicsResult<Self::InputLayout>;

    /// Binds `view` as the sole render target.
    fn set_render_target(&mut self, context: &mut Self::Context, view: &Self::RenderTargetView);

    fn set_viewport(&mut self, context: &mut Self::Context, viewport: Viewport);

    /// Binds shaders, input layout and topology as the active pipeline state.
    fn set_pipeline_state(
        &mut self,
        context: &mut Self::Context,
        state: PipelineState<'_, Self>,
    ) -> GraphicsResult<()>;

    fn clear_render_target(
        &mut self,
        context: &mut Self::Context,
        view: &Self::RenderTargetView,
        color: ClearColor,
    ) -> GraphicsResult<()>;

    fn set_vertex_buffer(&mut self, context: &mut Self::Context, binding: VertexBufferBinding<'_, Self>);

    fn draw(
        &mut self,
        context: &mut Self::Context,
        vertex_count: u32,
        start_vertex: u32,
    ) -> GraphicsResult<()>;

    /// Presents the back buffer. `sync_interval = 1` waits for vertical blank.
    fn present(
        &mut self,
        context: &mut Self::Context,
        swap_chain: &Self::SwapChain,
        sync_interval: u32,
    ) -> GraphicsResult<()>;

    fn release(&mut self, resource: Resource<Self>);
}
