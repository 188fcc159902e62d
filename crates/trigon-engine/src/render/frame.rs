use crate::device::{Backend, ClearColor, DeviceContext, GraphicsResult, RenderTargetBinding};

use super::geometry::GeometryBuffer;

/// Slot the triangle's vertex buffer is bound to.
pub const GEOMETRY_SLOT: u32 = 0;

/// Executes one render iteration: clear, bind geometry, draw, present.
///
/// Pipeline state is bound once at construction and not touched here.
#[derive(Debug, Clone)]
pub struct FrameDriver {
    clear_color: ClearColor,
    sync_interval: u32,
    frames: u64,
}

impl FrameDriver {
    pub fn new(clear_color: ClearColor, sync_interval: u32) -> Self {
        Self {
            clear_color,
            sync_interval,
            frames: 0,
        }
    }

    /// Frames presented so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn execute<B: Backend>(
        &mut self,
        backend: &mut B,
        dc: &mut DeviceContext<B>,
        target: &RenderTargetBinding<B>,
        geometry: &GeometryBuffer<B>,
    ) -> GraphicsResult<()> {
        backend.clear_render_target(&mut dc.context, target.view(), self.clear_color)?;
        backend.set_vertex_buffer(&mut dc.context, geometry.binding(GEOMETRY_SLOT));
        backend.draw(&mut dc.context, geometry.vertex_count(), 0)?;
        backend.present(&mut dc.context, &dc.swap_chain, self.sync_interval)?;

        self.frames += 1;
        if self.frames % 600 == 0 {
            log::debug!("presented {} frames", self.frames);
        }
        Ok(())
    }
}
