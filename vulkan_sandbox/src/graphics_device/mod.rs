/// Graphics device module - the driver boundary trait and its value types

// Module declarations
pub mod graphics_device;
pub mod handles;
pub mod buffer;
pub mod command_list;
pub mod pipeline;
pub mod swapchain;
pub mod device_selection;

// Re-export everything from graphics_device.rs
pub use graphics_device::*;

// Re-export from other modules
pub use handles::*;
pub use buffer::*;
pub use command_list::*;
pub use pipeline::*;
pub use swapchain::*;
pub use device_selection::*;

// Mock graphics device for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;
