use crate::device::{Backend, DeviceContext, GraphicsResult, PipelineState, Resource};

use super::layout::{InputElement, InputLayoutDesc, InputSignature};
use super::shader::{ShaderCompiler, ShaderProfile, ShaderSource};

/// Entry point expected in both shader sources.
pub const ENTRY_POINT: &str = "main";

/// Shader sources and fixed-function state for the single pipeline.
#[derive(Debug, Clone)]
pub struct PipelineDesc {
    pub vertex_shader: ShaderSource,
    pub pixel_shader: ShaderSource,

    /// Declared per-vertex elements; validated against the vertex shader signature.
    pub elements: Vec<InputElement>,

    pub topology: wgpu::PrimitiveTopology,
}

impl Default for PipelineDesc {
    fn default() -> Self {
        Self {
            vertex_shader: ShaderSource::default_vertex(),
            pixel_shader: ShaderSource::default_pixel(),
            elements: vec![InputElement::POSITION],
            topology: wgpu::PrimitiveTopology::TriangleList,
        }
    }
}

/// Compiled shaders, the signature-derived input layout, and the bound topology.
///
/// Built in a fixed order: vertex shader, its signature, pixel shader, input
/// layout, then one bind of the whole state on the immediate context. A
/// failure at any step releases what this component already created and
/// stops; later steps are never attempted.
pub struct ShaderPipeline<B: Backend> {
    vertex_shader: B::VertexShader,
    pixel_shader: B::PixelShader,
    input_layout: B::InputLayout,
    signature: InputSignature,
    topology: wgpu::PrimitiveTopology,
}

impl<B: Backend> ShaderPipeline<B> {
    pub fn create<C: ShaderCompiler + ?Sized>(
        backend: &mut B,
        dc: &mut DeviceContext<B>,
        compiler: &mut C,
        desc: &PipelineDesc,
    ) -> GraphicsResult<Self> {
        let vs_bytecode = compiler.compile(&desc.vertex_shader, ENTRY_POINT, ShaderProfile::VS_4_0)?;
        let signature = vs_bytecode.input_signature().clone();
        let vertex_shader = backend.create_vertex_shader(dc.device(), &vs_bytecode)?;

        let pixel_shader = match compiler
            .compile(&desc.pixel_shader, ENTRY_POINT, ShaderProfile::PS_4_0)
            .and_then(|bytecode| backend.create_pixel_shader(dc.device(), &bytecode))
        {
            Ok(ps) => ps,
            Err(e) => {
                backend.release(Resource::VertexShader(vertex_shader));
                return Err(e);
            }
        };

        let input_layout = match InputLayoutDesc::from_signature(&signature, &desc.elements)
            .and_then(|layout| backend.create_input_layout(dc.device(), &layout))
        {
            Ok(layout) => layout,
            Err(e) => {
                backend.release(Resource::PixelShader(pixel_shader));
                backend.release(Resource::VertexShader(vertex_shader));
                return Err(e);
            }
        };

        let pipeline = Self {
            vertex_shader,
            pixel_shader,
            input_layout,
            signature,
            topology: desc.topology,
        };

        if let Err(e) = backend.set_pipeline_state(&mut dc.context, pipeline.state()) {
            pipeline.release(backend);
            return Err(e);
        }

        log::debug!(
            "pipeline bound: {} input(s), {:?}",
            pipeline.signature.parameters().len(),
            pipeline.topology
        );
        Ok(pipeline)
    }

    /// The state tuple bound on the context.
    pub fn state(&self) -> PipelineState<'_, B> {
        PipelineState {
            vertex_shader: &self.vertex_shader,
            pixel_shader: &self.pixel_shader,
            input_layout: &self.input_layout,
            topology: self.topology,
        }
    }

    /// Input signature reflected from the compiled vertex shader.
    pub fn signature(&self) -> &InputSignature {
        &self.signature
    }

    /// Releases input layout, pixel shader and vertex shader, in that order.
    pub fn release(self, backend: &mut B) {
        backend.release(Resource::InputLayout(self.input_layout));
        backend.release(Resource::PixelShader(self.pixel_shader));
        backend.release(Resource::VertexShader(self.vertex_shader));
    }
}
