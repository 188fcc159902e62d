use crate::device::{GraphicsError, GraphicsResult};

/// One input parameter of a compiled vertex shader.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureParameter {
    pub name: String,
    pub location: u32,
    pub format: wgpu::VertexFormat,
}

/// Inputs a compiled vertex shader expects, ordered by location.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSignature {
    parameters: Vec<SignatureParameter>,
}

impl InputSignature {
    pub fn new(parameters: Vec<SignatureParameter>) -> Self {
        Self { parameters }
    }

    pub fn parameters(&self) -> &[SignatureParameter] {
        &self.parameters
    }
}

/// Declared per-vertex element: where it lives in the buffer and which shader
/// input it feeds.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct InputElement {
    pub semantic: &'static str,
    pub semantic_index: u32,
    pub format: wgpu::VertexFormat,
    pub slot: u32,
    pub offset: u64,
    pub location: u32,
}

impl InputElement {
    /// 3 x f32 position at slot 0, offset 0, shader location 0.
    pub const POSITION: InputElement = InputElement {
        semantic: "POSITION",
        semantic_index: 0,
        format: wgpu::VertexFormat::Float32x3,
        slot: 0,
        offset: 0,
        location: 0,
    };
}

/// Input layout validated against a vertex shader's signature.
///
/// Can only be built through [`InputLayoutDesc::from_signature`]; a layout that
/// disagrees with the shader is a configuration error, not a draw-time one.
#[derive(Debug, Clone, PartialEq)]
pub struct InputLayoutDesc {
    elements: Vec<InputElement>,
    strides: Vec<u64>,
}

impl InputLayoutDesc {
    pub fn from_signature(
        signature: &InputSignature,
        elements: &[InputElement],
    ) -> GraphicsResult<Self> {
        for (i, a) in elements.iter().enumerate() {
            if elements[..i].iter().any(|b| b.location == a.location) {
                return Err(GraphicsError::InputLayoutMismatch(format!(
                    "location {} is declared by more than one element",
                    a.location
                )));
            }
        }

        for param in signature.parameters() {
            let Some(element) = elements.iter().find(|e| e.location == param.location) else {
                return Err(GraphicsError::InputLayoutMismatch(format!(
                    "shader input `{}` at location {} has no declared element",
                    param.name, param.location
                )));
            };
            if element.format != param.format {
                return Err(GraphicsError::InputLayoutMismatch(format!(
                    "element {}{} is {:?} but shader input `{}` expects {:?}",
                    element.semantic, element.semantic_index, element.format, param.name, param.format
                )));
            }
        }

        for element in elements {
            let used = signature
                .parameters()
                .iter()
                .any(|p| p.location == element.location);
            if !used {
                log::debug!(
                    "element {}{} (location {}) is not read by the vertex shader",
                    element.semantic,
                    element.semantic_index,
                    element.location
                );
            }
        }

        let slot_count = elements.iter().map(|e| e.slot + 1).max().unwrap_or(0) as usize;
        let mut strides = vec![0u64; slot_count];
        for e in elements {
            let end = e.offset + e.format.size();
            let stride = &mut strides[e.slot as usize];
            *stride = (*stride).max(end);
        }

        Ok(Self {
            elements: elements.to_vec(),
            strides,
        })
    }

    pub fn elements(&self) -> &[InputElement] {
        &self.elements
    }

    /// Number of vertex buffer slots referenced by the layout.
    pub fn slot_count(&self) -> usize {
        self.strides.len()
    }

    /// Byte stride of one vertex in `slot`; 0 for unused slots.
    pub fn stride(&self, slot: u32) -> u64 {
        self.strides.get(slot as usize).copied().unwrap_or(0)
    }

    /// Elements sourced from `slot`.
    pub fn slot_elements(&self, slot: u32) -> impl Iterator<Item = &InputElement> {
        self.elements.iter().filter(move |e| e.slot == slot)
    }
}
