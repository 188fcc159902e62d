use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;

use crate::device::{GraphicsError, GraphicsResult};

use super::layout::{InputSignature, SignatureParameter};

/// Programmable pipeline stage.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Pixel,
}

impl ShaderStage {
    fn naga_stage(self) -> naga::ShaderStage {
        match self {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Pixel => naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Pixel => f.write_str("pixel"),
        }
    }
}

/// Compilation target: stage plus shader model, written as `vs_4_0` / `ps_4_0`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ShaderProfile {
    pub stage: ShaderStage,
    pub major: u8,
    pub minor: u8,
}

impl ShaderProfile {
    pub const VS_4_0: ShaderProfile = ShaderProfile {
        stage: ShaderStage::Vertex,
        major: 4,
        minor: 0,
    };

    pub const PS_4_0: ShaderProfile = ShaderProfile {
        stage: ShaderStage::Pixel,
        major: 4,
        minor: 0,
    };
}

impl fmt::Display for ShaderProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.stage {
            ShaderStage::Vertex => "vs",
            ShaderStage::Pixel => "ps",
        };
        write!(f, "{prefix}_{}_{}", self.major, self.minor)
    }
}

/// Where a shader's WGSL text comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ShaderSource {
    /// Text compiled into the binary.
    Embedded {
        name: &'static str,
        text: &'static str,
    },
    /// File read when the pipeline is built.
    File(PathBuf),
}

impl ShaderSource {
    pub fn default_vertex() -> Self {
        ShaderSource::Embedded {
            name: "vertex.wgsl",
            text: include_str!("shaders/vertex.wgsl"),
        }
    }

    pub fn default_pixel() -> Self {
        ShaderSource::Embedded {
            name: "pixel.wgsl",
            text: include_str!("shaders/pixel.wgsl"),
        }
    }

    pub fn name(&self) -> Cow<'_, str> {
        match self {
            ShaderSource::Embedded { name, .. } => Cow::Borrowed(*name),
            ShaderSource::File(path) => path.to_string_lossy(),
        }
    }

    /// Returns the source text. Read failures are reported as compilation failures.
    pub fn load(&self, stage: ShaderStage) -> GraphicsResult<Cow<'_, str>> {
        match self {
            ShaderSource::Embedded { text, .. } => Ok(Cow::Borrowed(*text)),
            ShaderSource::File(path) => std::fs::read_to_string(path)
                .map(Cow::Owned)
                .map_err(|e| {
                    GraphicsError::compilation(stage, format!("failed to read {}: {e}", path.display()))
                }),
        }
    }
}

/// A validated shader ready for object creation.
///
/// Vertex shaders carry the input signature reflected from the compiled
/// module; pixel shaders carry an empty one.
#[derive(Debug, Clone)]
pub struct ShaderBytecode {
    pub name: String,
    pub profile: ShaderProfile,
    pub entry_point: String,
    pub source: String,
    pub(crate) signature: InputSignature,
}

impl ShaderBytecode {
    pub fn stage(&self) -> ShaderStage {
        self.profile.stage
    }

    /// Input signature of the entry point, as seen by the compiler.
    pub fn input_signature(&self) -> &InputSignature {
        &self.signature
    }
}

/// `compile(source, entry_point, profile) -> bytecode | diagnostic`.
pub trait ShaderCompiler {
    fn compile(
        &mut self,
        source: &ShaderSource,
        entry_point: &str,
        profile: ShaderProfile,
    ) -> GraphicsResult<ShaderBytecode>;
}

/// WGSL compiler backed by naga (parse + validate + reflect).
#[derive(Debug, Default)]
pub struct NagaCompiler;

impl NagaCompiler {
    pub fn new() -> Self {
        Self
    }
}

impl ShaderCompiler for NagaCompiler {
    fn compile(
        &mut self,
        source: &ShaderSource,
        entry_point: &str,
        profile: ShaderProfile,
    ) -> GraphicsResult<ShaderBytecode> {
        let stage = profile.stage;
        let text = source.load(stage)?;

        let module = naga::front::wgsl::parse_str(&text)
            .map_err(|e| GraphicsError::compilation(stage, e.emit_to_string(&text)))?;

        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::empty(),
        )
        .validate(&module)
        .map_err(|e| GraphicsError::compilation(stage, e.emit_to_string(&text)))?;

        let entry = module
            .entry_points
            .iter()
            .find(|ep| ep.name == entry_point && ep.stage == stage.naga_stage())
            .ok_or_else(|| {
                GraphicsError::compilation(
                    stage,
                    format!("{}: no {stage} entry point named `{entry_point}`", source.name()),
                )
            })?;

        let signature = match stage {
            ShaderStage::Vertex => reflect_inputs(&module, entry)
                .map_err(|msg| GraphicsError::compilation(stage, format!("{}: {msg}", source.name())))?,
            ShaderStage::Pixel => InputSignature::default(),
        };

        log::debug!(
            "compiled {} ({profile}, entry `{entry_point}`), {} input(s)",
            source.name(),
            signature.parameters().len()
        );

        Ok(ShaderBytecode {
            name: source.name().into_owned(),
            profile,
            entry_point: entry_point.to_string(),
            source: text.into_owned(),
            signature,
        })
    }
}

fn reflect_inputs(module: &naga::Module, entry: &naga::EntryPoint) -> Result<InputSignature, String> {
    let mut parameters = Vec::new();

    for arg in &entry.function.arguments {
        match &arg.binding {
            Some(binding) => push_input(module, arg.name.as_deref(), arg.ty, binding, &mut parameters)?,
            None => {
                let naga::TypeInner::Struct { members, .. } = &module.types[arg.ty].inner else {
                    return Err(format!(
                        "entry point argument `{}` has no binding",
                        arg.name.as_deref().unwrap_or("_")
                    ));
                };
                for member in members {
                    if let Some(binding) = &member.binding {
                        push_input(module, member.name.as_deref(), member.ty, binding, &mut parameters)?;
                    }
                }
            }
        }
    }

    parameters.sort_by_key(|p| p.location);
    Ok(InputSignature::new(parameters))
}

fn push_input(
    module: &naga::Module,
    name: Option<&str>,
    ty: naga::Handle<naga::Type>,
    binding: &naga::Binding,
    out: &mut Vec<SignatureParameter>,
) -> Result<(), String> {
    // Builtins (vertex_index, instance_index) are not fed from vertex buffers.
    let naga::Binding::Location { location, .. } = *binding else {
        return Ok(());
    };

    let name = name.unwrap_or("_").to_string();
    let format = vertex_format(&module.types[ty].inner).ok_or_else(|| {
        format!("input `{name}` at location {location} cannot be sourced from a vertex buffer")
    })?;

    out.push(SignatureParameter {
        name,
        location,
        format,
    });
    Ok(())
}

fn vertex_format(inner: &naga::TypeInner) -> Option<wgpu::VertexFormat> {
    use naga::{ScalarKind, TypeInner, VectorSize};
    use wgpu::VertexFormat as F;

    let (scalar, size) = match *inner {
        TypeInner::Scalar(scalar) => (scalar, None),
        TypeInner::Vector { size, scalar } => (scalar, Some(size)),
        _ => return None,
    };
    if scalar.width != 4 {
        return None;
    }

    let format = match (scalar.kind, size) {
        (ScalarKind::Float, None) => F::Float32,
        (ScalarKind::Float, Some(VectorSize::Bi)) => F::Float32x2,
        (ScalarKind::Float, Some(VectorSize::Tri)) => F::Float32x3,
        (ScalarKind::Float, Some(VectorSize::Quad)) => F::Float32x4,
        (ScalarKind::Sint, None) => F::Sint32,
        (ScalarKind::Sint, Some(VectorSize::Bi)) => F::Sint32x2,
        (ScalarKind::Sint, Some(VectorSize::Tri)) => F::Sint32x3,
        (ScalarKind::Sint, Some(VectorSize::Quad)) => F::Sint32x4,
        (ScalarKind::Uint, None) => F::Uint32,
        (ScalarKind::Uint, Some(VectorSize::Bi)) => F::Uint32x2,
        (ScalarKind::Uint, Some(VectorSize::Tri)) => F::Uint32x3,
        (ScalarKind::Uint, Some(VectorSize::Quad)) => F::Uint32x4,
        _ => return None,
    };
    Some(format)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(text: &'static str, profile: ShaderProfile) -> GraphicsResult<ShaderBytecode> {
        let source = ShaderSource::Embedded { name: "test.wgsl", text };
        NagaCompiler::new().compile(&source, "main", profile)
    }

    #[test]
    fn profiles_display_like_shader_models() {
        assert_eq!(ShaderProfile::VS_4_0.to_string(), "vs_4_0");
        assert_eq!(ShaderProfile::PS_4_0.to_string(), "ps_4_0");
    }

    #[test]
    fn shipped_vertex_shader_exposes_position_at_location_zero() {
        let bytecode = NagaCompiler::new()
            .compile(&ShaderSource::default_vertex(), "main", ShaderProfile::VS_4_0)
            .unwrap();

        let params = bytecode.input_signature().parameters();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].location, 0);
        assert_eq!(params[0].format, wgpu::VertexFormat::Float32x3);
        assert_eq!(bytecode.stage(), ShaderStage::Vertex);
    }

    #[test]
    fn shipped_pixel_shader_compiles_without_inputs() {
        let bytecode = NagaCompiler::new()
            .compile(&ShaderSource::default_pixel(), "main", ShaderProfile::PS_4_0)
            .unwrap();
        assert!(bytecode.input_signature().parameters().is_empty());
        assert_eq!(bytecode.entry_point, "main");
    }

    #[test]
    fn struct_inputs_are_reflected_and_builtins_skipped() {
        let text = "
            struct In {
                @location(1) uv: vec2<f32>,
                @location(0) pos: vec3<f32>,
                @builtin(vertex_index) idx: u32,
            }
            @vertex
            fn main(input: In) -> @builtin(position) vec4<f32> {
                return vec4<f32>(input.pos + vec3<f32>(input.uv, 0.0), 1.0);
            }
        ";
        let bytecode = compile(text, ShaderProfile::VS_4_0).unwrap();
        let params = bytecode.input_signature().parameters();
        assert_eq!(params.len(), 2);
        assert_eq!((params[0].location, params[0].format), (0, wgpu::VertexFormat::Float32x3));
        assert_eq!((params[1].location, params[1].format), (1, wgpu::VertexFormat::Float32x2));
    }

    #[test]
    fn syntax_error_reports_diagnostic() {
        let err = compile("@vertex fn main( -> {", ShaderProfile::VS_4_0).unwrap_err();
        match err {
            GraphicsError::ShaderCompilationFailed { stage, diagnostic } => {
                assert_eq!(stage, ShaderStage::Vertex);
                assert!(!diagnostic.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn entry_point_must_match_stage() {
        let text = "@fragment fn main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }";
        let err = compile(text, ShaderProfile::VS_4_0).unwrap_err();
        assert!(matches!(
            err,
            GraphicsError::ShaderCompilationFailed { stage: ShaderStage::Vertex, .. }
        ));
    }

    #[test]
    fn missing_file_is_a_compilation_failure() {
        let source = ShaderSource::File(PathBuf::from("/nonexistent/trigon/pixel.wgsl"));
        let err = NagaCompiler::new()
            .compile(&source, "main", ShaderProfile::PS_4_0)
            .unwrap_err();
        assert!(matches!(
            err,
            GraphicsError::ShaderCompilationFailed { stage: ShaderStage::Pixel, .. }
        ));
    }
}
