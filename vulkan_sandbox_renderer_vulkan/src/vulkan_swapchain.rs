/// Swapchain - surface queries, creation, acquire and present
///
/// Only the driver calls live here. Format, present mode, image count and
/// extent were already negotiated by `vulkan_sandbox::swapchain`.

use ash::vk;
use vulkan_sandbox::sandbox::log::Log;
use vulkan_sandbox::sandbox::render::{
    AcquireOutcome, PresentOutcome, SharingMode, SwapchainConfig, SwapchainSupportInfo,
};
use vulkan_sandbox::sandbox::Result;

use crate::vulkan_error::vk_error;
use crate::vulkan_format::{
    capabilities_from_vk, color_space_to_vk, extent_to_vk, format_to_vk, present_mode_from_vk,
    present_mode_to_vk, surface_format_from_vk, transform_to_vk,
};

/// Query what the surface supports right now
///
/// # Safety
///
/// `surface` must belong to the instance `surface_loader` was created from.
pub(crate) unsafe fn query_support(
    surface_loader: &ash::khr::surface::Instance,
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    log: &Log,
) -> Result<SwapchainSupportInfo> {
    let capabilities = surface_loader
        .get_physical_device_surface_capabilities(physical_device, surface)
        .map_err(|e| vk_error(log, "Failed to get surface capabilities", e))?;
    let formats = surface_loader
        .get_physical_device_surface_formats(physical_device, surface)
        .map_err(|e| vk_error(log, "Failed to get surface formats", e))?;
    let present_modes = surface_loader
        .get_physical_device_surface_present_modes(physical_device, surface)
        .map_err(|e| vk_error(log, "Failed to get surface present modes", e))?;

    Ok(SwapchainSupportInfo {
        capabilities: capabilities_from_vk(&capabilities),
        formats: formats.iter().map(surface_format_from_vk).collect(),
        present_modes: present_modes.into_iter().map(present_mode_from_vk).collect(),
    })
}

/// Create a swap chain from a negotiated configuration
///
/// # Returns
///
/// The swap chain and its images
pub(crate) unsafe fn create_swapchain(
    swapchain_loader: &ash::khr::swapchain::Device,
    surface: vk::SurfaceKHR,
    config: &SwapchainConfig,
    log: &Log,
) -> Result<(vk::SwapchainKHR, Vec<vk::Image>)> {
    let (sharing_mode, families): (vk::SharingMode, &[u32]) = match &config.sharing_mode {
        SharingMode::Exclusive => (vk::SharingMode::EXCLUSIVE, &[]),
        SharingMode::Concurrent(families) => (vk::SharingMode::CONCURRENT, families.as_slice()),
    };

    let create_info = vk::SwapchainCreateInfoKHR::default()
        .surface(surface)
        .min_image_count(config.image_count)
        .image_format(format_to_vk(config.surface_format.format))
        .image_color_space(color_space_to_vk(config.surface_format.color_space))
        .image_extent(extent_to_vk(config.extent))
        .image_array_layers(1)
        .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
        .image_sharing_mode(sharing_mode)
        .queue_family_indices(families)
        .pre_transform(transform_to_vk(config.pre_transform))
        .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
        .present_mode(present_mode_to_vk(config.present_mode))
        .clipped(true);

    let swapchain = swapchain_loader
        .create_swapchain(&create_info, None)
        .map_err(|e| vk_error(log, "Failed to create swapchain", e))?;

    match swapchain_loader.get_swapchain_images(swapchain) {
        Ok(images) => Ok((swapchain, images)),
        Err(e) => {
            swapchain_loader.destroy_swapchain(swapchain, None);
            Err(vk_error(log, "Failed to get swapchain images", e))
        }
    }
}

/// Acquire the next image, signaling `semaphore` when it is ready
pub(crate) unsafe fn acquire_next_image(
    swapchain_loader: &ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,
    semaphore: vk::Semaphore,
    log: &Log,
) -> Result<AcquireOutcome> {
    match swapchain_loader.acquire_next_image(swapchain, u64::MAX, semaphore, vk::Fence::null()) {
        Ok((image_index, suboptimal)) => Ok(AcquireOutcome::Acquired { image_index, suboptimal }),
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::OutOfDate),
        Err(e) => Err(vk_error(log, "Failed to acquire swapchain image", e)),
    }
}

/// Queue an image for presentation after `wait` is signaled
pub(crate) unsafe fn present(
    swapchain_loader: &ash::khr::swapchain::Device,
    present_queue: vk::Queue,
    swapchain: vk::SwapchainKHR,
    image_index: u32,
    wait: vk::Semaphore,
    log: &Log,
) -> Result<PresentOutcome> {
    let wait_semaphores = [wait];
    let swapchains = [swapchain];
    let image_indices = [image_index];
    let present_info = vk::PresentInfoKHR::default()
        .wait_semaphores(&wait_semaphores)
        .swapchains(&swapchains)
        .image_indices(&image_indices);

    match swapchain_loader.queue_present(present_queue, &present_info) {
        Ok(false) => Ok(PresentOutcome::Presented),
        Ok(true) => Ok(PresentOutcome::Suboptimal),
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::OutOfDate),
        Err(e) => Err(vk_error(log, "Failed to present swapchain image", e)),
    }
}
