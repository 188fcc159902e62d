use super::backend::{Backend, DeviceObjects, RefreshRate, Resource, SwapChainDesc};
use super::{GraphicsError, GraphicsResult};

/// Surface-independent swap chain parameters.
///
/// The client size comes from the window; everything else is fixed at
/// construction and never changes.
#[derive(Debug, Clone)]
pub struct SwapChainConfig {
    /// Display refresh rate requested for the back buffer mode.
    pub refresh_rate: RefreshRate,

    /// Back buffer pixel format.
    pub format: wgpu::TextureFormat,

    /// Number of back buffers.
    pub buffer_count: u32,

    /// Present sync interval; 1 locks presentation to vertical blank.
    pub sync_interval: u32,
}

impl Default for SwapChainConfig {
    fn default() -> Self {
        Self {
            refresh_rate: RefreshRate::new(60, 1),
            format: wgpu::TextureFormat::Bgra8Unorm,
            buffer_count: 1,
            sync_interval: 1,
        }
    }
}

impl SwapChainConfig {
    /// Builds the windowed swap chain descriptor for a `width` x `height` client area.
    pub fn describe(&self, width: u32, height: u32) -> GraphicsResult<SwapChainDesc> {
        if width == 0 || height == 0 {
            return Err(GraphicsError::InvalidSurfaceSize { width, height });
        }

        Ok(SwapChainDesc {
            width,
            height,
            refresh_rate: self.refresh_rate,
            format: self.format,
            buffer_count: self.buffer_count,
            sync_interval: self.sync_interval,
            windowed: true,
        })
    }
}

/// Owns the device, its immediate context and the swap chain.
///
/// The device must outlive everything created from it, so this is the first
/// component acquired and the last one released.
pub struct DeviceContext<B: Backend> {
    pub(crate) device: B::Device,
    pub(crate) context: B::Context,
    pub(crate) swap_chain: B::SwapChain,
    desc: SwapChainDesc,
}

impl<B: Backend> DeviceContext<B> {
    pub fn create(backend: &mut B, desc: SwapChainDesc) -> GraphicsResult<Self> {
        log::debug!(
            "creating device: {}x{} {:?} @ {:.0} Hz, {} buffer(s), sync interval {}",
            desc.width,
            desc.height,
            desc.format,
            desc.refresh_rate.hz(),
            desc.buffer_count,
            desc.sync_interval,
        );

        let DeviceObjects {
            device,
            context,
            swap_chain,
        } = backend.create_device(&desc)?;

        Ok(Self {
            device,
            context,
            swap_chain,
            desc,
        })
    }

    /// Returns the descriptor the swap chain was created with.
    pub fn desc(&self) -> &SwapChainDesc {
        &self.desc
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    /// Releases swap chain, context and device, in that order.
    pub fn release(self, backend: &mut B) {
        backend.release(Resource::SwapChain(self.swap_chain));
        backend.release(Resource::Context(self.context));
        backend.release(Resource::Device(self.device));
        log::debug!("device context released");
    }
}
