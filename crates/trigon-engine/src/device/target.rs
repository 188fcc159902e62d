use super::backend::{Backend, Resource, Viewport};
use super::context::DeviceContext;
use super::{GraphicsError, GraphicsResult};

/// Render-target view over the swap chain's back buffer plus the viewport.
///
/// The view is tied to the back buffer it was derived from. With a fixed-size
/// swap chain the back buffer is never replaced, so the view stays valid for
/// the lifetime of the binding.
pub struct RenderTargetBinding<B: Backend> {
    view: B::RenderTargetView,
    back_buffer: u32,
    viewport: Viewport,
}

impl<B: Backend> RenderTargetBinding<B> {
    /// Derives the view from back buffer 0, binds it and sets a full-surface viewport.
    pub fn create(backend: &mut B, dc: &mut DeviceContext<B>) -> GraphicsResult<Self> {
        let back_buffer = 0;
        let (width, height, buffer_count) = {
            let desc = dc.desc();
            (desc.width, desc.height, desc.buffer_count)
        };

        if buffer_count == 0 {
            return Err(GraphicsError::BackBufferUnavailable {
                index: back_buffer,
                reason: "swap chain has no buffers".to_string(),
            });
        }

        let view = backend.create_render_target_view(&dc.device, &dc.swap_chain, back_buffer)?;
        backend.set_render_target(&mut dc.context, &view);

        let viewport = Viewport::covering(width, height);
        backend.set_viewport(&mut dc.context, viewport);

        log::debug!("render target bound to back buffer {back_buffer}, viewport {width}x{height}");

        Ok(Self {
            view,
            back_buffer,
            viewport,
        })
    }

    pub fn view(&self) -> &B::RenderTargetView {
        &self.view
    }

    pub fn back_buffer(&self) -> u32 {
        self.back_buffer
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn release(self, backend: &mut B) {
        backend.release(Resource::RenderTargetView(self.view));
    }
}
