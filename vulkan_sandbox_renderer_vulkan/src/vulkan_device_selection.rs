/// Physical device discovery - describes every physical device for the
/// platform-independent scoring in `vulkan_sandbox`

use ash::vk;
use vulkan_sandbox::sandbox::log::Log;
use vulkan_sandbox::sandbox::render::{
    select_physical_device, PhysicalDeviceInfo, PhysicalDeviceType, QueueAssignment,
    QueueCapabilities, QueueFamilyInfo, QueuePlan,
};
use vulkan_sandbox::sandbox::Result;
use vulkan_sandbox::{sandbox_debug, sandbox_error, sandbox_info};

use crate::vulkan_error::init_error;

/// Device extensions the sandbox cannot run without
pub(crate) const REQUIRED_DEVICE_EXTENSIONS: [&std::ffi::CStr; 1] = [ash::khr::swapchain::NAME];

/// Chosen physical device with its queue families
pub(crate) struct SelectedDevice {
    pub physical_device: vk::PhysicalDevice,
    pub info: PhysicalDeviceInfo,
    pub queues: QueueAssignment,
}

pub(crate) fn queue_capabilities(flags: vk::QueueFlags) -> QueueCapabilities {
    let mut capabilities = QueueCapabilities::empty();
    if flags.contains(vk::QueueFlags::GRAPHICS) {
        capabilities |= QueueCapabilities::GRAPHICS;
    }
    if flags.contains(vk::QueueFlags::COMPUTE) {
        capabilities |= QueueCapabilities::COMPUTE;
    }
    if flags.contains(vk::QueueFlags::TRANSFER) {
        capabilities |= QueueCapabilities::TRANSFER;
    }
    capabilities
}

pub(crate) fn device_type(device_type: vk::PhysicalDeviceType) -> PhysicalDeviceType {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => PhysicalDeviceType::DiscreteGpu,
        vk::PhysicalDeviceType::INTEGRATED_GPU => PhysicalDeviceType::IntegratedGpu,
        vk::PhysicalDeviceType::VIRTUAL_GPU => PhysicalDeviceType::VirtualGpu,
        vk::PhysicalDeviceType::CPU => PhysicalDeviceType::Cpu,
        _ => PhysicalDeviceType::Other,
    }
}

/// Query everything scoring needs about one physical device
///
/// # Safety
///
/// `physical_device` and `surface` must belong to `instance`.
pub(crate) unsafe fn describe_physical_device(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
    physical_device: vk::PhysicalDevice,
) -> PhysicalDeviceInfo {
    let properties = instance.get_physical_device_properties(physical_device);
    let name = properties
        .device_name_as_c_str()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "Unknown device".to_string());

    let queue_families = instance
        .get_physical_device_queue_family_properties(physical_device)
        .iter()
        .enumerate()
        .map(|(index, family)| QueueFamilyInfo {
            capabilities: queue_capabilities(family.queue_flags),
            queue_count: family.queue_count,
            supports_present: surface_loader
                .get_physical_device_surface_support(physical_device, index as u32, surface)
                .unwrap_or(false),
        })
        .collect();

    let supported_extensions = instance
        .enumerate_device_extension_properties(physical_device)
        .unwrap_or_default()
        .iter()
        .filter_map(|ext| ext.extension_name_as_c_str().ok())
        .map(|name| name.to_string_lossy().into_owned())
        .collect();

    let surface_format_count = surface_loader
        .get_physical_device_surface_formats(physical_device, surface)
        .map(|formats| formats.len())
        .unwrap_or(0);
    let present_mode_count = surface_loader
        .get_physical_device_surface_present_modes(physical_device, surface)
        .map(|modes| modes.len())
        .unwrap_or(0);

    PhysicalDeviceInfo {
        name,
        device_type: device_type(properties.device_type),
        queue_families,
        supported_extensions,
        surface_format_count,
        present_mode_count,
    }
}

/// Pick the best physical device for the queue plan
///
/// # Safety
///
/// `surface` must belong to `instance`.
pub(crate) unsafe fn pick_physical_device(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
    plan: &QueuePlan,
    log: &Log,
) -> Result<SelectedDevice> {
    let physical_devices = instance
        .enumerate_physical_devices()
        .map_err(|e| init_error(log, "Failed to enumerate physical devices", e))?;

    let infos: Vec<PhysicalDeviceInfo> = physical_devices
        .iter()
        .map(|&pd| describe_physical_device(instance, surface_loader, surface, pd))
        .collect();

    let required: Vec<&str> = REQUIRED_DEVICE_EXTENSIONS
        .iter()
        .filter_map(|name| name.to_str().ok())
        .collect();

    for info in &infos {
        sandbox_debug!(
            log,
            "Candidate device '{}' ({:?}), score {}",
            info.name,
            info.device_type,
            info.score(plan, &required)
        );
    }

    let index = select_physical_device(&infos, plan, &required).map_err(|e| {
        sandbox_error!(log, "{}", e);
        e
    })?;

    let info = infos[index].clone();
    let queues = info.resolve_queue_plan(plan)?;
    sandbox_info!(log, "Selected physical device '{}'", info.name);

    Ok(SelectedDevice {
        physical_device: physical_devices[index],
        info,
        queues,
    })
}
