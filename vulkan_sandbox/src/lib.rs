/*!
# Vulkan Sandbox

Platform-agnostic core of a small Vulkan rendering sandbox.

The interesting part is the per-frame render loop: N frames in flight guarded
by fences and semaphores, swap chain acquire/present, and swap chain
recreation when the surface goes stale.

## Architecture

- **GraphicsDevice**: driver boundary trait over opaque handles (Vulkan backend lives in
  `vulkan_sandbox_renderer_vulkan`)
- **SwapchainPreferences / select_config**: deterministic swap chain negotiation
- **SwapchainTargets**: swap chain, image views and framebuffers of one generation
- **FrameContext**: per-slot command buffer, semaphores and fence
- **FrameRenderer**: the acquire / record / submit / present state machine
- **upload**: one-shot staging to device-local copies
- **QuadScene**: the fixed geometry drawn every frame

Every component receives an explicit [`log::Log`] context; there is no global logger.
*/

// Internal modules
mod error;
pub mod log;
pub mod config;
pub mod graphics_device;
pub mod swapchain;
pub mod frame;
pub mod upload;
pub mod shader;
pub mod window;
pub mod scene;

// Crate root re-exports (used by the sandbox_* macros)
pub use error::{Error, Result};

// Main sandbox namespace module
pub mod sandbox {
    // Error types
    pub use crate::error::{Error, Result};

    // Configuration
    pub use crate::config::{Config, DebugSeverity};

    // Logging sub-module (types only, macros live at the crate root)
    pub mod log {
        pub use crate::log::{DefaultLogger, Log, LogEntry, LogSeverity, Logger, NullLogger};
    }

    // Driver boundary types and traits
    pub mod render {
        pub use crate::graphics_device::*;
    }

    // Swap chain negotiation and render targets
    pub mod swapchain {
        pub use crate::swapchain::*;
    }

    // Frame loop
    pub mod frame {
        pub use crate::frame::*;
    }

    // Collaborators
    pub use crate::shader::load_spirv;
    pub use crate::upload::{download, upload};
    pub use crate::window::WindowSurface;

    // Scene sub-module
    pub mod scene {
        pub use crate::scene::*;
    }
}

// Re-export math library at crate root
pub use glam;
