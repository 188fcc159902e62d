//! GPU device layer.
//!
//! This module is responsible for:
//! - the `Backend` seam over the native GPU API, and its wgpu implementation
//! - creating the device, immediate context and swap chain
//! - deriving the render-target view and viewport from the back buffer

mod backend;
mod context;
mod error;
mod gpu;
mod scope;
mod surface;
mod target;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{
    Backend, ClearColor, DeviceObjects, PipelineState, RefreshRate, Resource, ResourceKind,
    SwapChainDesc, VertexBufferBinding, Viewport,
};
pub use context::{DeviceContext, SwapChainConfig};
pub use error::{GraphicsError, GraphicsResult};
pub use gpu::{WgpuBackend, WgpuContext, WgpuDevice, WgpuInputLayout, WgpuRenderTarget, WgpuShader, WgpuSwapChain};
pub use target::RenderTargetBinding;
