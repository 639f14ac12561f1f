/// Swap chain render targets - one swap chain generation
///
/// Owns the swap chain, one image view per swap chain image and one
/// framebuffer per view. The images themselves belong to the swap chain.
/// Rebuilt as a whole on every recreation.

use crate::error::Result;
use crate::graphics_device::{
    Extent2D, FramebufferHandle, GraphicsDevice, ImageHandle, ImageViewHandle, RenderPassHandle,
    SwapchainConfig, SwapchainHandle,
};
use crate::log::Log;
use crate::{sandbox_debug, sandbox_error};

/// Swap chain with its image views and framebuffers
#[derive(Debug)]
pub struct SwapchainTargets {
    swapchain: SwapchainHandle,
    config: SwapchainConfig,
    images: Vec<ImageHandle>,
    image_views: Vec<ImageViewHandle>,
    framebuffers: Vec<FramebufferHandle>,
}

impl SwapchainTargets {
    /// Create the swap chain, its image views and framebuffers
    ///
    /// On failure everything created so far is destroyed before the error is
    /// returned.
    pub fn create(
        device: &mut dyn GraphicsDevice,
        config: SwapchainConfig,
        render_pass: RenderPassHandle,
        log: &Log,
    ) -> Result<Self> {
        let swapchain = device.create_swapchain(&config).map_err(|e| {
            sandbox_error!(log, "Failed to create swap chain: {}", e);
            e
        })?;

        let images = match device.swapchain_images(swapchain) {
            Ok(images) => images,
            Err(e) => {
                device.destroy_swapchain(swapchain);
                return Err(e);
            }
        };

        let mut targets = Self {
            swapchain,
            config,
            images,
            image_views: Vec::new(),
            framebuffers: Vec::new(),
        };

        if let Err(e) = targets.create_views_and_framebuffers(device, render_pass) {
            sandbox_error!(log, "Failed to create swap chain render targets: {}", e);
            targets.destroy(device);
            return Err(e);
        }

        sandbox_debug!(
            log,
            "Swap chain created: {} images, {}x{}, {:?}, {:?}",
            targets.images.len(),
            targets.config.extent.width,
            targets.config.extent.height,
            targets.config.surface_format.format,
            targets.config.present_mode
        );

        Ok(targets)
    }

    fn create_views_and_framebuffers(
        &mut self,
        device: &mut dyn GraphicsDevice,
        render_pass: RenderPassHandle,
    ) -> Result<()> {
        let format = self.config.surface_format.format;
        let extent = self.config.extent;

        for image in &self.images {
            let view = device.create_image_view(*image, format)?;
            self.image_views.push(view);

            let framebuffer = device.create_framebuffer(render_pass, view, extent)?;
            self.framebuffers.push(framebuffer);
        }
        Ok(())
    }

    /// Destroy framebuffers, then image views, then the swap chain
    pub fn destroy(self, device: &mut dyn GraphicsDevice) {
        for framebuffer in self.framebuffers {
            device.destroy_framebuffer(framebuffer);
        }
        for view in self.image_views {
            device.destroy_image_view(view);
        }
        device.destroy_swapchain(self.swapchain);
    }

    pub fn swapchain(&self) -> SwapchainHandle {
        self.swapchain
    }

    pub fn config(&self) -> &SwapchainConfig {
        &self.config
    }

    pub fn extent(&self) -> Extent2D {
        self.config.extent
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Framebuffer of a swap chain image
    pub fn framebuffer(&self, image_index: u32) -> Option<FramebufferHandle> {
        self.framebuffers.get(image_index as usize).copied()
    }
}

#[cfg(test)]
#[path = "swapchain_targets_tests.rs"]
mod tests;
