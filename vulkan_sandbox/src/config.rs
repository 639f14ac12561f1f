/// Sandbox configuration

use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::graphics_device::{ColorSpace, Format, PresentMode, SurfaceFormat};
use crate::log::LogSeverity;
use crate::swapchain::SwapchainPreferences;

/// Validation layer message severities forwarded to the log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugSeverity {
    /// Only errors
    ErrorsOnly,
    /// Errors and warnings
    ErrorsAndWarnings,
    /// Everything (info, verbose)
    All,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Application name (window title, Vulkan application info)
    pub app_name: String,
    /// Initial window width in pixels
    pub window_width: u32,
    /// Initial window height in pixels
    pub window_height: u32,
    /// Allow the user to resize the window
    pub resizable: bool,
    /// Enable the Khronos validation layer and the debug messenger
    pub enable_validation: bool,
    /// Validation messages forwarded to the log
    pub debug_severity: DebugSeverity,
    /// Panic on the first validation error
    pub panic_on_validation_error: bool,
    /// Number of frames the CPU may record ahead of the GPU (N)
    pub frames_in_flight: usize,
    /// Ordered swap chain format and present mode preferences
    pub swapchain_preferences: SwapchainPreferences,
    /// Compiled SPIR-V vertex shader
    pub vertex_shader_path: PathBuf,
    /// Compiled SPIR-V fragment shader
    pub fragment_shader_path: PathBuf,
    /// Color the swap chain image is cleared to (RGBA)
    pub clear_color: [f32; 4],
    /// Minimum severity written by the console logger
    pub log_severity: LogSeverity,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "Vulkan Sandbox".to_string(),
            window_width: 800,
            window_height: 600,
            resizable: true,
            enable_validation: cfg!(debug_assertions),
            debug_severity: DebugSeverity::ErrorsAndWarnings,
            panic_on_validation_error: false,
            frames_in_flight: 2,
            swapchain_preferences: SwapchainPreferences::new()
                .add_surface_format(SurfaceFormat::new(Format::B8G8R8A8_SRGB, ColorSpace::SrgbNonLinear))
                .add_surface_format(SurfaceFormat::new(Format::B8G8R8A8_UNORM, ColorSpace::SrgbNonLinear))
                .add_present_mode(PresentMode::Mailbox)
                .add_present_mode(PresentMode::Fifo),
            vertex_shader_path: PathBuf::from("shaders/quad.vert.spv"),
            fragment_shader_path: PathBuf::from("shaders/quad.frag.spv"),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            log_severity: if cfg!(debug_assertions) {
                LogSeverity::Info
            } else {
                LogSeverity::Warn
            },
        }
    }
}

impl Config {
    /// Reject configurations the sandbox cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.frames_in_flight == 0 {
            return Err(Error::InvalidResource("frames_in_flight must be at least 1".to_string()));
        }
        if self.window_width == 0 || self.window_height == 0 {
            return Err(Error::InvalidResource(format!(
                "Window size {}x{} is empty",
                self.window_width, self.window_height
            )));
        }
        if self.swapchain_preferences.surface_formats().is_empty() {
            return Err(Error::InvalidResource("No preferred surface format".to_string()));
        }
        if self.swapchain_preferences.present_modes().is_empty() {
            return Err(Error::InvalidResource("No preferred present mode".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
