//! Trigon engine crate.
//!
//! A minimal graphics core: one device, one swap chain, one vertex buffer and
//! one pipeline, drawing a single triangle per frame. The window runtime and
//! logging setup used by the host binary live here too.

pub mod device;
pub mod render;
pub mod window;

pub mod logging;
