use crate::render::ShaderStage;

/// Fatal conditions raised by the graphics core.
///
/// None of these are recovered locally. Construction-time variants abort
/// initialization (after releasing whatever was already acquired); `DeviceLost`
/// is raised by the frame driver and is expected to terminate the host loop.
#[derive(thiserror::Error, Debug)]
pub enum GraphicsError {
    /// No compatible hardware adapter, or the device/swap chain could not be created.
    #[error("device creation failed: {0}")]
    DeviceCreationFailed(String),

    /// The swap chain has no buffer at `index`, or the buffer cannot be viewed.
    #[error("back buffer {index} unavailable: {reason}")]
    BackBufferUnavailable { index: u32, reason: String },

    /// GPU memory for a buffer could not be allocated.
    #[error("buffer allocation of {size} bytes failed: {reason}")]
    BufferAllocationFailed { size: u64, reason: String },

    /// A shader source failed to load or compile.
    #[error("{stage} shader compilation failed:\n{diagnostic}")]
    ShaderCompilationFailed {
        stage: ShaderStage,
        diagnostic: String,
    },

    /// Declared vertex elements disagree with the vertex shader's input signature.
    #[error("input layout does not match the vertex shader signature: {0}")]
    InputLayoutMismatch(String),

    /// Compiled shaders and input layout were rejected together at pipeline creation,
    /// e.g. a pixel shader input the vertex shader does not output.
    #[error("pipeline creation failed: {0}")]
    PipelineLinkFailed(String),

    /// The surface was requested with a zero dimension.
    #[error("invalid surface size {width}x{height}")]
    InvalidSurfaceSize { width: u32, height: u32 },

    /// A draw or present failed; the device is no longer usable.
    #[error("device lost: {0}")]
    DeviceLost(String),

    /// A frame was requested after `shutdown()`.
    #[error("graphics core has been shut down")]
    ShutDown,
}

impl GraphicsError {
    pub fn device_creation<T: ToString>(msg: T) -> Self {
        GraphicsError::DeviceCreationFailed(msg.to_string())
    }

    pub fn device_lost<T: ToString>(msg: T) -> Self {
        GraphicsError::DeviceLost(msg.to_string())
    }

    pub fn compilation<T: ToString>(stage: ShaderStage, diagnostic: T) -> Self {
        GraphicsError::ShaderCompilationFailed {
            stage,
            diagnostic: diagnostic.to_string(),
        }
    }
}

/// Result type alias for graphics core operations.
pub type GraphicsResult<T> = Result<T, GraphicsError>;
