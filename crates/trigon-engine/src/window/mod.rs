//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and the single window, and drives the graphics
//! core from it.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
