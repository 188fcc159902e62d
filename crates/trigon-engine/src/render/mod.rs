//! Graphics core.
//!
//! Geometry upload, shader compilation and pipeline binding, and the per-frame
//! driver, composed by [`Graphics`] which owns every GPU object.
//!
//! Convention:
//! - one triangle list, one vertex buffer at slot 0
//! - shaders are WGSL, entry point `main` in each stage's own module

mod frame;
mod geometry;
mod graphics;
mod layout;
mod pipeline;
mod shader;

pub use frame::{FrameDriver, GEOMETRY_SLOT};
pub use geometry::{GeometryBuffer, TriangleMesh, Vertex};
pub use graphics::{Graphics, GraphicsConfig};
pub use layout::{InputElement, InputLayoutDesc, InputSignature, SignatureParameter};
pub use pipeline::{PipelineDesc, ShaderPipeline, ENTRY_POINT};
pub use shader::{NagaCompiler, ShaderBytecode, ShaderCompiler, ShaderProfile, ShaderSource, ShaderStage};
