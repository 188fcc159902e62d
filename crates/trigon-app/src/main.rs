use std::env;
use std::path::PathBuf;

use anyhow::Result;

use trigon_engine::logging::{init_logging, LoggingConfig};
use trigon_engine::render::{GraphicsConfig, ShaderSource};
use trigon_engine::window::{Runtime, RuntimeConfig};

/// Replaces an embedded shader with a file when `var` is set.
fn shader_override(var: &str, fallback: ShaderSource) -> ShaderSource {
    match env::var_os(var) {
        Some(path) if !path.is_empty() => {
            let path = PathBuf::from(path);
            log::info!("{var}: loading shader from {}", path.display());
            ShaderSource::File(path)
        }
        _ => fallback,
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let mut graphics = GraphicsConfig::default();
    graphics.pipeline.vertex_shader = shader_override("TRIGON_VERTEX_SHADER", graphics.pipeline.vertex_shader);
    graphics.pipeline.pixel_shader = shader_override("TRIGON_PIXEL_SHADER", graphics.pipeline.pixel_shader);

    Runtime::run(RuntimeConfig::default(), graphics)?;

    log::info!("exited cleanly");
    Ok(())
}
