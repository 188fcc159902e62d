//! Recording backend and stub compiler for unit tests.

use std::cell::RefCell;
use std::rc::Rc;

use crate::render::{
    InputElement, InputLayoutDesc, InputSignature, ShaderBytecode, ShaderCompiler, ShaderProfile,
    ShaderSource, ShaderStage, SignatureParameter,
};

use super::backend::{
    Backend, ClearColor, DeviceObjects, PipelineState, Resource, ResourceKind, SwapChainDesc,
    VertexBufferBinding, Viewport,
};
use super::{GraphicsError, GraphicsResult};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Acquire(ResourceKind),
    Release(ResourceKind),
    SetRenderTarget,
    SetViewport(Viewport),
    SetPipelineState(wgpu::PrimitiveTopology),
    Clear(ClearColor),
    SetVertexBuffer {
        slot: u32,
        stride: u32,
        offset: u32,
        vertices: u32,
    },
    Draw {
        vertex_count: u32,
        start_vertex: u32,
    },
    Present {
        sync_interval: u32,
    },
}

/// Shared view of everything the backend was asked to do.
#[derive(Clone, Default)]
pub(crate) struct CallLog(Rc<RefCell<Vec<Call>>>);

impl CallLog {
    fn push(&self, call: Call) {
        self.0.borrow_mut().push(call);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.0.borrow().clone()
    }

    pub(crate) fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    pub(crate) fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.0.borrow().iter().filter(|c| pred(c)).count()
    }

    pub(crate) fn acquired(&self) -> Vec<ResourceKind> {
        self.0
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Acquire(kind) => Some(*kind),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn released(&self) -> Vec<ResourceKind> {
        self.0
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Release(kind) => Some(*kind),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn last_viewport(&self) -> Option<Viewport> {
        self.0.borrow().iter().rev().find_map(|c| match c {
            Call::SetViewport(vp) => Some(*vp),
            _ => None,
        })
    }
}

/// Creation steps that should fail.
#[derive(Debug, Default)]
pub(crate) struct Failures {
    pub device: bool,
    pub render_target_view: bool,
    pub vertex_buffer: bool,
    pub vertex_shader: bool,
    pub pixel_shader: bool,
    pub input_layout: bool,
    pub pipeline_state: bool,
    /// Present fails once this many frames have been presented.
    pub present_after: Option<usize>,
}

#[derive(Debug)]
pub(crate) struct FakeObject {
    kind: ResourceKind,
    bytes: usize,
}

pub(crate) struct RecordingBackend {
    log: CallLog,
    pub fail: Failures,
    presents: usize,
}

impl RecordingBackend {
    pub(crate) fn new() -> Self {
        Self {
            log: CallLog::default(),
            fail: Failures::default(),
            presents: 0,
        }
    }

    pub(crate) fn log(&self) -> CallLog {
        self.log.clone()
    }

    fn acquire(&mut self, kind: ResourceKind, bytes: usize) -> FakeObject {
        self.log.push(Call::Acquire(kind));
        FakeObject { kind, bytes }
    }

    /// Fails with the error the native call for `kind` would report.
    fn check(&self, fail: bool, kind: ResourceKind) -> GraphicsResult<()> {
        if !fail {
            return Ok(());
        }
        let reason = format!("injected {kind} failure");
        Err(match kind {
            ResourceKind::VertexShader => GraphicsError::compilation(ShaderStage::Vertex, reason),
            ResourceKind::PixelShader => GraphicsError::compilation(ShaderStage::Pixel, reason),
            ResourceKind::InputLayout => GraphicsError::InputLayoutMismatch(reason),
            _ => GraphicsError::device_creation(reason),
        })
    }
}

impl Backend for RecordingBackend {
    type Device = FakeObject;
    type Context = FakeObject;
    type SwapChain = FakeObject;
    type RenderTargetView = FakeObject;
    type Buffer = FakeObject;
    type VertexShader = FakeObject;
    type PixelShader = FakeObject;
    type InputLayout = FakeObject;

    fn create_device(&mut self, _desc: &SwapChainDesc) -> GraphicsResult<DeviceObjects<Self>> {
        self.check(self.fail.device, ResourceKind::Device)?;
        Ok(DeviceObjects {
            device: self.acquire(ResourceKind::Device, 0),
            context: self.acquire(ResourceKind::Context, 0),
            swap_chain: self.acquire(ResourceKind::SwapChain, 0),
        })
    }

    fn create_render_target_view(
        &mut self,
        _device: &FakeObject,
        _swap_chain: &FakeObject,
        index: u32,
    ) -> GraphicsResult<FakeObject> {
        if self.fail.render_target_view {
            return Err(GraphicsError::BackBufferUnavailable {
                index,
                reason: "injected failure".to_string(),
            });
        }
        Ok(self.acquire(ResourceKind::RenderTargetView, 0))
    }

    fn create_vertex_buffer(&mut self, _device: &FakeObject, contents: &[u8]) -> GraphicsResult<FakeObject> {
        if self.fail.vertex_buffer {
            return Err(GraphicsError::BufferAllocationFailed {
                size: contents.len() as u64,
                reason: "injected failure".to_string(),
            });
        }
        Ok(self.acquire(ResourceKind::Buffer, contents.len()))
    }

    fn create_vertex_shader(
        &mut self,
        _device: &FakeObject,
        bytecode: &ShaderBytecode,
    ) -> GraphicsResult<FakeObject> {
        assert_eq!(bytecode.stage(), ShaderStage::Vertex);
        self.check(self.fail.vertex_shader, ResourceKind::VertexShader)?;
        Ok(self.acquire(ResourceKind::VertexShader, 0))
    }

    fn create_pixel_shader(
        &mut self,
        _device: &FakeObject,
        bytecode: &ShaderBytecode,
    ) -> GraphicsResult<FakeObject> {
        assert_eq!(bytecode.stage(), ShaderStage::Pixel);
        self.check(self.fail.pixel_shader, ResourceKind::PixelShader)?;
        Ok(self.acquire(ResourceKind::PixelShader, 0))
    }

    fn create_input_layout(
        &mut self,
        _device: &FakeObject,
        desc: &InputLayoutDesc,
    ) -> GraphicsResult<FakeObject> {
        self.check(self.fail.input_layout, ResourceKind::InputLayout)?;
        Ok(self.acquire(ResourceKind::InputLayout, desc.stride(0) as usize))
    }

    fn set_render_target(&mut self, _context: &mut FakeObject, view: &FakeObject) {
        assert_eq!(view.kind, ResourceKind::RenderTargetView);
        self.log.push(Call::SetRenderTarget);
    }

    fn set_viewport(&mut self, _context: &mut FakeObject, viewport: Viewport) {
        self.log.push(Call::SetViewport(viewport));
    }

    fn set_pipeline_state(
        &mut self,
        _context: &mut FakeObject,
        state: PipelineState<'_, Self>,
    ) -> GraphicsResult<()> {
        if self.fail.pipeline_state {
            return Err(GraphicsError::device_lost("injected pipeline failure"));
        }
        assert_eq!(state.vertex_shader.kind, ResourceKind::VertexShader);
        assert_eq!(state.pixel_shader.kind, ResourceKind::PixelShader);
        assert_eq!(state.input_layout.kind, ResourceKind::InputLayout);
        self.log.push(Call::SetPipelineState(state.topology));
        Ok(())
    }

    fn clear_render_target(
        &mut self,
        _context: &mut FakeObject,
        _view: &FakeObject,
        color: ClearColor,
    ) -> GraphicsResult<()> {
        self.log.push(Call::Clear(color));
        Ok(())
    }

    fn set_vertex_buffer(&mut self, _context: &mut FakeObject, binding: VertexBufferBinding<'_, Self>) {
        self.log.push(Call::SetVertexBuffer {
            slot: binding.slot,
            stride: binding.stride,
            offset: binding.offset,
            vertices: (binding.buffer.bytes / binding.stride as usize) as u32,
        });
    }

    fn draw(&mut self, _context: &mut FakeObject, vertex_count: u32, start_vertex: u32) -> GraphicsResult<()> {
        self.log.push(Call::Draw {
            vertex_count,
            start_vertex,
        });
        Ok(())
    }

    fn present(
        &mut self,
        _context: &mut FakeObject,
        _swap_chain: &FakeObject,
        sync_interval: u32,
    ) -> GraphicsResult<()> {
        if self.fail.present_after.is_some_and(|n| self.presents >= n) {
            return Err(GraphicsError::device_lost("injected present failure"));
        }
        self.presents += 1;
        self.log.push(Call::Present { sync_interval });
        Ok(())
    }

    fn release(&mut self, resource: Resource<Self>) {
        let kind = resource.kind();
        let object = match resource {
            Resource::Device(o)
            | Resource::Context(o)
            | Resource::SwapChain(o)
            | Resource::RenderTargetView(o)
            | Resource::Buffer(o)
            | Resource::VertexShader(o)
            | Resource::PixelShader(o)
            | Resource::InputLayout(o) => o,
        };
        assert_eq!(object.kind, kind);
        self.log.push(Call::Release(kind));
    }
}

/// Compiler stand-in whose vertex signature is one `position` input at location 0.
#[derive(Debug)]
pub(crate) struct StubCompiler {
    pub compiled: Vec<ShaderStage>,
    pub fail: Option<ShaderStage>,

    /// Format reported for `position`; `Float32x3` matches the declared element.
    pub position_format: wgpu::VertexFormat,
}

impl Default for StubCompiler {
    fn default() -> Self {
        Self {
            compiled: Vec::new(),
            fail: None,
            position_format: InputElement::POSITION.format,
        }
    }
}

impl StubCompiler {
    pub(crate) fn failing(stage: ShaderStage) -> Self {
        Self {
            fail: Some(stage),
            ..Self::default()
        }
    }

    pub(crate) fn with_position_format(format: wgpu::VertexFormat) -> Self {
        Self {
            position_format: format,
            ..Self::default()
        }
    }
}

impl ShaderCompiler for StubCompiler {
    fn compile(
        &mut self,
        source: &ShaderSource,
        entry_point: &str,
        profile: ShaderProfile,
    ) -> GraphicsResult<ShaderBytecode> {
        let stage = profile.stage;
        self.compiled.push(stage);

        if self.fail == Some(stage) {
            return Err(GraphicsError::compilation(stage, "error X3000: syntax error"));
        }

        let signature = match stage {
            ShaderStage::Vertex => InputSignature::new(vec![SignatureParameter {
                name: "position".to_string(),
                location: InputElement::POSITION.location,
                format: self.position_format,
            }]),
            ShaderStage::Pixel => InputSignature::default(),
        };

        Ok(ShaderBytecode {
            name: source.name().into_owned(),
            profile,
            entry_point: entry_point.to_string(),
            source: String::new(),
            signature,
        })
    }
}
