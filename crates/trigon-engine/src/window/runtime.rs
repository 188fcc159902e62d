use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::device::WgpuBackend;
use crate::render::{Graphics, GraphicsConfig, NagaCompiler};

/// Window configuration.
///
/// The client area is fixed: the window is not resizable and the swap chain
/// is created once at this size.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "trigon".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Entry point for the runtime.
///
/// Creates the window, builds the graphics core on it, renders continuously
/// until the window is closed, then shuts the core down before the window goes
/// away. A fatal graphics error stops the loop and is returned.
pub struct Runtime;

impl Runtime {
    pub fn run(config: RuntimeConfig, graphics: GraphicsConfig) -> Result<()> {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, graphics);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.fatal.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[self_referencing]
struct SurfaceEntry {
    window: Window,

    #[borrows(window)]
    #[not_covariant]
    graphics: Graphics<WgpuBackend<'this>>,
}

struct AppState {
    config: RuntimeConfig,
    graphics_config: GraphicsConfig,
    entry: Option<SurfaceEntry>,
    fatal: Option<anyhow::Error>,
}

impl AppState {
    fn new(config: RuntimeConfig, graphics_config: GraphicsConfig) -> Self {
        Self {
            config,
            graphics_config,
            entry: None,
            fatal: None,
        }
    }

    fn create_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height))
            .with_resizable(false);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let size = window.inner_size();
        let graphics_config = &self.graphics_config;

        let entry = SurfaceEntryTryBuilder {
            window,
            graphics_builder: |w| {
                let mut compiler = NagaCompiler::new();
                Graphics::new(
                    WgpuBackend::new(w),
                    &mut compiler,
                    graphics_config,
                    size.width,
                    size.height,
                )
            },
        }
        .try_build()
        .context("graphics initialization failed")?;

        entry.with_window(|w| w.request_redraw());
        self.entry = Some(entry);
        Ok(())
    }

    /// Shuts the graphics core down, then drops the window.
    fn destroy_entry(&mut self) {
        if let Some(mut entry) = self.entry.take() {
            entry.with_graphics_mut(|g| g.shutdown());
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.destroy_entry();
        self.fatal.get_or_insert(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() || self.fatal.is_some() {
            return;
        }

        if let Err(e) = self.create_entry(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous redraw; present blocks on vsync.
        if let Some(entry) = &self.entry {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                self.destroy_entry();
                event_loop.exit();
            }

            WindowEvent::RedrawRequested => {
                let Some(entry) = self.entry.as_mut() else {
                    return;
                };

                let result = entry.with_mut(|fields| {
                    fields.window.pre_present_notify();
                    fields.graphics.render_frame()
                });

                if let Err(e) = result {
                    self.fail(event_loop, anyhow::Error::new(e).context("frame failed"));
                }
            }

            WindowEvent::Resized(size) => {
                log::trace!("ignoring resize to {}x{}; swap chain size is fixed", size.width, size.height);
            }

            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.destroy_entry();
    }
}
