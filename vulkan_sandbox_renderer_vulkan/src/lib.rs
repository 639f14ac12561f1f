/*!
# Vulkan Sandbox - Vulkan Backend

Vulkan implementation of the `vulkan_sandbox` GraphicsDevice trait.

Uses ash for the Vulkan bindings, ash-window for surface creation,
gpu-allocator for buffer memory and spirq to check shader uniform
bindings against the descriptor set layout before a pipeline is built.

```no_run
use vulkan_sandbox::sandbox::Config;
use vulkan_sandbox::sandbox::log::{Log, LogSeverity};
use vulkan_sandbox_renderer_vulkan::VulkanGraphicsDevice;
# fn run(window: &winit::window::Window) -> vulkan_sandbox::Result<()> {
let log = Log::console("sandbox", LogSeverity::Info);
let device = VulkanGraphicsDevice::new(window, &Config::default(), log)?;
println!("Running on {}", device.device_name());
# Ok(())
# }
```
*/

// Vulkan implementation modules
mod vulkan;
mod vulkan_buffer;
mod vulkan_pipeline;
mod vulkan_render_pass;
mod vulkan_swapchain;
mod vulkan_device_selection;
mod debug;

// Conversions and error mapping
mod vulkan_format;
mod vulkan_error;

pub use vulkan::VulkanGraphicsDevice;

// Re-export debug utilities
pub use debug::{print_validation_stats_report, ValidationStats};
