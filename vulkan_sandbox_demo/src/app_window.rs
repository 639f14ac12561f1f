/// winit window driving the sandbox frame loop
///
/// The event loop is pumped from the render loop instead of owning it:
/// `poll_events` drains pending events without blocking and `wait_events`
/// blocks until something happens (used while the window is minimized).

use std::time::Duration;

use vulkan_sandbox::sandbox::log::Log;
use vulkan_sandbox::sandbox::{Config, Error, Result, WindowSurface};
use vulkan_sandbox::{sandbox_debug, sandbox_trace};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowAttributes, WindowId};

/// Number of zero-timeout pumps allowed before the window must exist
const STARTUP_PUMPS: u32 = 64;

/// Event state shared with winit
struct WindowEvents {
    attributes: WindowAttributes,
    /// Created on the first `resumed`, taken by `AppWindow::new`
    window: Option<Window>,
    create_error: Option<String>,
    close_requested: bool,
    resized: bool,
    log: Log,
}

impl ApplicationHandler for WindowEvents {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.create_error.is_some() {
            return;
        }
        match event_loop.create_window(self.attributes.clone()) {
            Ok(window) => self.window = Some(window),
            Err(e) => self.create_error = Some(e.to_string()),
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                sandbox_debug!(self.log, "Close requested");
                self.close_requested = true;
            }
            WindowEvent::Resized(size) => {
                sandbox_trace!(self.log, "Resized to {}x{}", size.width, size.height);
                self.resized = true;
            }
            _ => {}
        }
    }
}

/// Application window
pub struct AppWindow {
    event_loop: EventLoop<()>,
    events: WindowEvents,
    window: Window,
}

impl AppWindow {
    /// Open the window described by `config`
    pub fn new(config: &Config, log: Log) -> Result<Self> {
        let mut event_loop = EventLoop::new()
            .map_err(|e| Error::InitializationFailed(format!("Failed to create event loop: {}", e)))?;

        let attributes = Window::default_attributes()
            .with_title(config.app_name.clone())
            .with_inner_size(PhysicalSize::new(config.window_width, config.window_height))
            .with_resizable(config.resizable);

        let mut events = WindowEvents {
            attributes,
            window: None,
            create_error: None,
            close_requested: false,
            resized: false,
            log,
        };

        for _ in 0..STARTUP_PUMPS {
            if let PumpStatus::Exit(code) = event_loop.pump_app_events(Some(Duration::ZERO), &mut events) {
                return Err(Error::InitializationFailed(format!(
                    "Event loop exited during startup (code {})",
                    code
                )));
            }
            if let Some(message) = events.create_error.take() {
                return Err(Error::InitializationFailed(format!("Failed to create window: {}", message)));
            }
            if let Some(window) = events.window.take() {
                // Startup resizes are part of the initial size
                events.resized = false;
                return Ok(Self {
                    event_loop,
                    events,
                    window,
                });
            }
        }

        Err(Error::InitializationFailed("Window was never created".to_string()))
    }

    /// Process pending events without blocking
    pub fn poll_events(&mut self) {
        self.pump(Some(Duration::ZERO));
    }

    /// Underlying winit window (surface creation)
    pub fn window(&self) -> &Window {
        &self.window
    }

    fn pump(&mut self, timeout: Option<Duration>) {
        if let PumpStatus::Exit(_) = self.event_loop.pump_app_events(timeout, &mut self.events) {
            self.events.close_requested = true;
        }
    }
}

impl WindowSurface for AppWindow {
    fn should_close(&self) -> bool {
        self.events.close_requested
    }

    fn frame_buffer_size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    fn has_resized(&self) -> bool {
        self.events.resized
    }

    fn reset_resized(&mut self) {
        self.events.resized = false;
    }

    fn wait_events(&mut self) {
        self.pump(None);
    }
}
