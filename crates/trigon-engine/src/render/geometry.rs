use bytemuck::{Pod, Zeroable};

use crate::device::{Backend, DeviceContext, GraphicsResult, Resource, VertexBufferBinding};

/// Object-space position, three f32 components.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
}

impl Vertex {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { position: [x, y, z] }
    }

    /// Byte stride of one vertex in a buffer.
    pub const STRIDE: u32 = std::mem::size_of::<Vertex>() as u32;
}

/// Exactly three vertices forming one triangle.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TriangleMesh {
    pub vertices: [Vertex; 3],
}

impl TriangleMesh {
    pub const fn new(vertices: [Vertex; 3]) -> Self {
        Self { vertices }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub const fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }
}

impl Default for TriangleMesh {
    fn default() -> Self {
        Self::new([
            Vertex::new(0.0, 0.0, 0.0),
            Vertex::new(1.0, 0.0, 0.0),
            Vertex::new(0.0, 1.0, 0.0),
        ])
    }
}

/// Immutable GPU vertex buffer holding one triangle.
///
/// Uploaded once; bound read-only every frame.
pub struct GeometryBuffer<B: Backend> {
    buffer: B::Buffer,
    vertex_count: u32,
    size: u64,
}

impl<B: Backend> GeometryBuffer<B> {
    pub fn create(backend: &mut B, dc: &DeviceContext<B>, mesh: &TriangleMesh) -> GraphicsResult<Self> {
        let bytes = mesh.as_bytes();
        let buffer = backend.create_vertex_buffer(dc.device(), bytes)?;

        log::debug!(
            "uploaded {} vertices ({} bytes) to vertex buffer",
            mesh.vertex_count(),
            bytes.len()
        );

        Ok(Self {
            buffer,
            vertex_count: mesh.vertex_count(),
            size: bytes.len() as u64,
        })
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Buffer size in bytes (`vertex_count * size_of::<Vertex>()`).
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Binding for input-assembler `slot` with the vertex stride and no offset.
    pub fn binding(&self, slot: u32) -> VertexBufferBinding<'_, B> {
        VertexBufferBinding {
            slot,
            buffer: &self.buffer,
            stride: Vertex::STRIDE,
            offset: 0,
        }
    }

    pub fn release(self, backend: &mut B) {
        backend.release(Resource::Buffer(self.buffer));
    }
}
