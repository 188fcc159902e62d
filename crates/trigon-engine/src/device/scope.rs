use std::sync::{Arc, Mutex};

use crate::render::ShaderStage;

use super::{GraphicsError, GraphicsResult};

/// Runs `f` with validation and out-of-memory errors captured in error scopes.
///
/// Errors raised inside never reach the device's uncaptured-error handler.
/// At most one error is returned; out-of-memory wins over validation.
pub(crate) fn capture<T>(device: &wgpu::Device, f: impl FnOnce() -> T) -> (T, Option<wgpu::Error>) {
    let validation = device.push_error_scope(wgpu::ErrorFilter::Validation);
    let out_of_memory = device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);

    let value = f();

    let oom = pollster::block_on(out_of_memory.pop());
    let invalid = pollster::block_on(validation.pop());
    (value, oom.or(invalid))
}

pub(crate) fn buffer_error(size: u64, err: wgpu::Error) -> GraphicsError {
    GraphicsError::BufferAllocationFailed {
        size,
        reason: err.to_string(),
    }
}

pub(crate) fn shader_error(stage: ShaderStage, err: wgpu::Error) -> GraphicsError {
    GraphicsError::compilation(stage, err)
}

/// Pipeline validation failures are configuration errors; anything else means
/// the device is unusable.
pub(crate) fn pipeline_error(err: wgpu::Error) -> GraphicsError {
    match err {
        wgpu::Error::Validation { description, .. } => GraphicsError::PipelineLinkFailed(description),
        other => GraphicsError::device_lost(other),
    }
}

/// First error that escaped every error scope, kept until the device is dropped.
///
/// Installed as the device's uncaptured-error handler so that stray validation
/// errors fail the next frame instead of panicking inside the event loop.
#[derive(Clone, Default)]
pub(crate) struct FaultLatch(Arc<Mutex<Option<String>>>);

impl FaultLatch {
    pub(crate) fn handler(&self) -> Arc<dyn wgpu::UncapturedErrorHandler> {
        let slot = Arc::clone(&self.0);
        Arc::new(move |err: wgpu::Error| {
            log::error!("uncaptured wgpu error: {err}");
            if let Ok(mut slot) = slot.lock() {
                slot.get_or_insert_with(|| err.to_string());
            }
        })
    }

    /// `DeviceLost` once any uncaptured error was seen.
    pub(crate) fn check(&self) -> GraphicsResult<()> {
        let fault = match self.0.lock() {
            Ok(slot) => slot.clone(),
            Err(_) => Some("error latch poisoned".to_string()),
        };
        match fault {
            Some(reason) => Err(GraphicsError::device_lost(reason)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validation(description: &str) -> wgpu::Error {
        wgpu::Error::Validation {
            source: Box::new(std::fmt::Error),
            description: description.to_string(),
        }
    }

    fn out_of_memory() -> wgpu::Error {
        wgpu::Error::OutOfMemory {
            source: Box::new(std::fmt::Error),
        }
    }

    #[test]
    fn out_of_memory_on_upload_is_allocation_failure() {
        let err = buffer_error(36, out_of_memory());
        assert!(matches!(err, GraphicsError::BufferAllocationFailed { size: 36, .. }));
    }

    #[test]
    fn rejected_module_carries_stage_and_diagnostic() {
        match shader_error(ShaderStage::Pixel, validation("bad module")) {
            GraphicsError::ShaderCompilationFailed { stage, diagnostic } => {
                assert_eq!(stage, ShaderStage::Pixel);
                assert_eq!(diagnostic, "bad module");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn pipeline_validation_is_a_link_failure() {
        assert!(matches!(
            pipeline_error(validation("location 0 not provided")),
            GraphicsError::PipelineLinkFailed(ref d) if d == "location 0 not provided"
        ));
        assert!(matches!(pipeline_error(out_of_memory()), GraphicsError::DeviceLost(_)));
    }

    #[test]
    fn uncaptured_error_fails_later_checks() {
        let latch = FaultLatch::default();
        assert!(latch.check().is_ok());

        let handler = latch.handler();
        handler(validation("first"));
        handler(validation("second"));

        for _ in 0..2 {
            match latch.check() {
                Err(GraphicsError::DeviceLost(reason)) => assert_eq!(reason, "first"),
                other => panic!("unexpected result: {other:?}"),
            }
        }
    }
}
