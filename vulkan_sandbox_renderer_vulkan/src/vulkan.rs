/// VulkanGraphicsDevice - ash implementation of the GraphicsDevice trait
///
/// Owns the instance, the optional validation messenger, the window surface,
/// the logical device with its graphics and present queues, one command pool
/// and the memory allocator. Every other object is created and destroyed
/// explicitly through the trait and is only referenced by raw handle values.

use ash::vk;
use ash::vk::Handle;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use rustc_hash::FxHashMap;
use std::ffi::{c_char, CString};
use std::mem::ManuallyDrop;
use vulkan_sandbox::sandbox::log::Log;
use vulkan_sandbox::sandbox::render::{
    AcquireOutcome, BufferDesc, BufferHandle, ClearValue, CommandBufferHandle, CommandBufferUsage,
    DescriptorBinding, DescriptorPoolHandle, DescriptorSetHandle, DescriptorSetLayoutHandle,
    Extent2D, FenceHandle, Format, FramebufferHandle, GraphicsDevice, ImageHandle,
    ImageViewHandle, IndexType, PipelineDesc, PipelineHandle, PresentOutcome, QueuePlan, Rect2D,
    RenderPassDesc, RenderPassHandle, SemaphoreHandle, SubmitDesc, SwapchainConfig,
    SwapchainHandle, SwapchainSupportInfo, Viewport, GRAPHICS_QUEUE, PRESENT_QUEUE,
};
use vulkan_sandbox::sandbox::{Config, Error, Result};
use vulkan_sandbox::{sandbox_debug, sandbox_error, sandbox_info, sandbox_warn};

use crate::debug::{DebugMessenger, ValidationStats, VALIDATION_LAYER};
use crate::vulkan_buffer::Buffer;
use crate::vulkan_device_selection::{pick_physical_device, SelectedDevice, REQUIRED_DEVICE_EXTENSIONS};
use crate::vulkan_error::{init_error, vk_error};
use crate::vulkan_format::{
    command_buffer_usage_to_vk, extent_to_vk, index_type_to_vk, pipeline_stage_to_vk,
};
use crate::{vulkan_pipeline, vulkan_render_pass, vulkan_swapchain};

fn to_vk<T: Handle>(raw: u64) -> T {
    T::from_raw(raw)
}

/// Instance-level objects, destroyed last
struct InstanceObjects {
    _entry: ash::Entry,
    instance: ash::Instance,
    debug_messenger: Option<DebugMessenger>,
    surface_loader: ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
}

impl InstanceObjects {
    unsafe fn destroy(self) {
        self.surface_loader.destroy_surface(self.surface, None);
        if let Some(messenger) = self.debug_messenger {
            messenger.destroy();
        }
        self.instance.destroy_instance(None);
    }
}

/// Vulkan graphics device
pub struct VulkanGraphicsDevice {
    /// `None` only while dropping
    instance: Option<InstanceObjects>,
    physical_device: vk::PhysicalDevice,
    device_name: String,
    device: ash::Device,
    swapchain_loader: ash::khr::swapchain::Device,

    graphics_queue: vk::Queue,
    graphics_queue_family: u32,
    present_queue: vk::Queue,
    present_queue_family: u32,

    command_pool: vk::CommandPool,
    /// Dropped before the device is destroyed
    allocator: ManuallyDrop<Allocator>,

    /// Images of each live swap chain, owned by it
    swapchain_images: FxHashMap<u64, Vec<vk::Image>>,
    /// Buffers by raw handle, with their allocations
    buffers: FxHashMap<u64, Buffer>,
    /// Pipeline layout of each pipeline
    pipeline_layouts: FxHashMap<u64, vk::PipelineLayout>,

    log: Log,
}

impl VulkanGraphicsDevice {
    /// Bring up Vulkan for a window
    ///
    /// Creates the instance (with validation when `config.enable_validation`),
    /// the surface, picks the best physical device for a graphics + present
    /// queue plan, and creates the logical device, the command pool and the
    /// memory allocator.
    ///
    /// # Arguments
    ///
    /// * `window` - Window providing the display and window handles
    /// * `config` - Application configuration
    /// * `log` - Logging context (messages are tagged `sandbox::vulkan`)
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(
        window: &W,
        config: &Config,
        log: Log,
    ) -> Result<Self> {
        let log = log.with_source("sandbox::vulkan");
        let instance_objects = Self::create_instance_objects(window, config, &log)?;

        match Self::create_device(instance_objects, &log) {
            Ok(device) => {
                sandbox_info!(log, "Vulkan device ready on '{}'", device.device_name);
                Ok(device)
            }
            Err((instance_objects, e)) => {
                unsafe { instance_objects.destroy() };
                Err(e)
            }
        }
    }

    fn create_instance_objects<W: HasDisplayHandle + HasWindowHandle>(
        window: &W,
        config: &Config,
        log: &Log,
    ) -> Result<InstanceObjects> {
        unsafe {
            let entry = ash::Entry::load().map_err(|e| {
                sandbox_error!(log, "Failed to load Vulkan library: {:?}", e);
                Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
            })?;

            if config.enable_validation && !Self::validation_layer_available(&entry) {
                sandbox_error!(log, "Validation layers requested, but not available");
                return Err(Error::InitializationFailed(
                    "Validation layers requested, but not available".to_string(),
                ));
            }

            let app_name = CString::new(config.app_name.as_str()).unwrap_or_default();
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, 1, 0, 0))
                .engine_name(c"Vulkan Sandbox")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_0);

            let display_handle = window.display_handle().map_err(|e| {
                sandbox_error!(log, "Failed to get display handle: {}", e);
                Error::InitializationFailed(format!("Failed to get display handle: {}", e))
            })?;
            let mut extension_names: Vec<*const c_char> =
                ash_window::enumerate_required_extensions(display_handle.as_raw())
                    .map_err(|e| init_error(log, "Failed to get required extensions", e))?
                    .to_vec();

            let layer_names = if config.enable_validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
                vec![VALIDATION_LAYER.as_ptr()]
            } else {
                vec![]
            };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry
                .create_instance(&create_info, None)
                .map_err(|e| init_error(log, "Failed to create Vulkan instance", e))?;

            let debug_messenger = if config.enable_validation {
                match DebugMessenger::new(
                    &entry,
                    &instance,
                    config.debug_severity,
                    config.panic_on_validation_error,
                    log.with_source("sandbox::vulkan::validation"),
                ) {
                    Ok(messenger) => Some(messenger),
                    Err(e) => {
                        instance.destroy_instance(None);
                        return Err(e);
                    }
                }
            } else {
                None
            };

            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);
            let surface = window
                .window_handle()
                .map_err(|e| {
                    sandbox_error!(log, "Failed to get window handle: {}", e);
                    Error::InitializationFailed(format!("Failed to get window handle: {}", e))
                })
                .and_then(|window_handle| {
                    ash_window::create_surface(
                        &entry,
                        &instance,
                        display_handle.as_raw(),
                        window_handle.as_raw(),
                        None,
                    )
                    .map_err(|e| init_error(log, "Failed to create surface", e))
                });

            let surface = match surface {
                Ok(surface) => surface,
                Err(e) => {
                    if let Some(messenger) = debug_messenger {
                        messenger.destroy();
                    }
                    instance.destroy_instance(None);
                    return Err(e);
                }
            };

            Ok(InstanceObjects {
                _entry: entry,
                instance,
                debug_messenger,
                surface_loader,
                surface,
            })
        }
    }

    unsafe fn validation_layer_available(entry: &ash::Entry) -> bool {
        entry
            .enumerate_instance_layer_properties()
            .unwrap_or_default()
            .iter()
            .any(|layer| layer.layer_name_as_c_str().is_ok_and(|name| name == VALIDATION_LAYER))
    }

    /// Everything that needs a physical device; hands the instance objects
    /// back on failure so the caller can destroy them
    fn create_device(
        instance_objects: InstanceObjects,
        log: &Log,
    ) -> std::result::Result<Self, (InstanceObjects, Error)> {
        let selected = match unsafe {
            pick_physical_device(
                &instance_objects.instance,
                &instance_objects.surface_loader,
                instance_objects.surface,
                &QueuePlan::graphics_and_present(),
                log,
            )
        } {
            Ok(selected) => selected,
            Err(e) => return Err((instance_objects, e)),
        };

        match unsafe { Self::create_logical_device(&instance_objects, &selected, log) } {
            Ok((device, command_pool, allocator)) => {
                let graphics_queue_family = selected.queues.family(GRAPHICS_QUEUE).unwrap_or(0);
                let present_queue_family = selected.queues.family(PRESENT_QUEUE).unwrap_or(0);
                let (graphics_queue, present_queue) = unsafe {
                    (
                        device.get_device_queue(graphics_queue_family, 0),
                        device.get_device_queue(present_queue_family, 0),
                    )
                };
                let swapchain_loader = ash::khr::swapchain::Device::new(&instance_objects.instance, &device);

                sandbox_debug!(
                    log,
                    "Queue families: graphics {}, present {}",
                    graphics_queue_family,
                    present_queue_family
                );

                Ok(Self {
                    instance: Some(instance_objects),
                    physical_device: selected.physical_device,
                    device_name: selected.info.name,
                    device,
                    swapchain_loader,
                    graphics_queue,
                    graphics_queue_family,
                    present_queue,
                    present_queue_family,
                    command_pool,
                    allocator: ManuallyDrop::new(allocator),
                    swapchain_images: FxHashMap::default(),
                    buffers: FxHashMap::default(),
                    pipeline_layouts: FxHashMap::default(),
                    log: log.clone(),
                })
            }
            Err(e) => Err((instance_objects, e)),
        }
    }

    unsafe fn create_logical_device(
        instance_objects: &InstanceObjects,
        selected: &SelectedDevice,
        log: &Log,
    ) -> Result<(ash::Device, vk::CommandPool, Allocator)> {
        let instance = &instance_objects.instance;
        let queue_priorities = [1.0];
        let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = selected
            .queues
            .distinct_families()
            .into_iter()
            .map(|family| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(family)
                    .queue_priorities(&queue_priorities)
            })
            .collect();

        let device_extension_names: Vec<*const c_char> =
            REQUIRED_DEVICE_EXTENSIONS.iter().map(|name| name.as_ptr()).collect();
        let device_features = vk::PhysicalDeviceFeatures::default();

        let device_create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&device_extension_names)
            .enabled_features(&device_features);

        let device = instance
            .create_device(selected.physical_device, &device_create_info, None)
            .map_err(|e| init_error(log, "Failed to create logical device", e))?;

        let graphics_family = selected.queues.family(GRAPHICS_QUEUE).unwrap_or(0);
        let pool_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(graphics_family)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
        let command_pool = match device.create_command_pool(&pool_info, None) {
            Ok(pool) => pool,
            Err(e) => {
                device.destroy_device(None);
                return Err(init_error(log, "Failed to create command pool", e));
            }
        };

        let allocator = match Allocator::new(&AllocatorCreateDesc {
            instance: instance.clone(),
            device: device.clone(),
            physical_device: selected.physical_device,
            debug_settings: Default::default(),
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        }) {
            Ok(allocator) => allocator,
            Err(e) => {
                device.destroy_command_pool(command_pool, None);
                device.destroy_device(None);
                sandbox_error!(log, "Failed to create GPU allocator: {:?}", e);
                return Err(Error::InitializationFailed(format!("Failed to create GPU allocator: {:?}", e)));
            }
        };

        Ok((device, command_pool, allocator))
    }

    /// Name of the selected physical device
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Validation message counters (`None` without validation)
    pub fn validation_stats(&self) -> Option<ValidationStats> {
        self.instance
            .as_ref()
            .and_then(|objects| objects.debug_messenger.as_ref())
            .map(|messenger| messenger.stats())
    }

    fn surface(&self) -> Result<(&ash::khr::surface::Instance, vk::SurfaceKHR)> {
        self.instance
            .as_ref()
            .map(|objects| (&objects.surface_loader, objects.surface))
            .ok_or_else(|| Error::InvalidResource("Vulkan instance is gone".to_string()))
    }

    fn buffer(&self, buffer: BufferHandle) -> Result<&Buffer> {
        self.buffers
            .get(&buffer.as_raw())
            .ok_or_else(|| Error::InvalidResource(format!("Unknown buffer {:?}", buffer)))
    }
}

impl GraphicsDevice for VulkanGraphicsDevice {
    // ===== SURFACE / QUEUES =====

    fn query_swapchain_support(&self) -> Result<SwapchainSupportInfo> {
        let (surface_loader, surface) = self.surface()?;
        unsafe { vulkan_swapchain::query_support(surface_loader, self.physical_device, surface, &self.log) }
    }

    fn queue_family_indices(&self) -> Vec<u32> {
        vec![self.graphics_queue_family, self.present_queue_family]
    }

    // ===== SWAP CHAIN =====

    fn create_swapchain(&mut self, config: &SwapchainConfig) -> Result<SwapchainHandle> {
        let (_, surface) = self.surface()?;
        let (swapchain, images) =
            unsafe { vulkan_swapchain::create_swapchain(&self.swapchain_loader, surface, config, &self.log)? };
        sandbox_debug!(
            self.log,
            "Swapchain created: {} images, {}x{}, {:?}",
            images.len(),
            config.extent.width,
            config.extent.height,
            config.present_mode
        );
        self.swapchain_images.insert(swapchain.as_raw(), images);
        Ok(SwapchainHandle::from_raw(swapchain.as_raw()))
    }

    fn destroy_swapchain(&mut self, swapchain: SwapchainHandle) {
        self.swapchain_images.remove(&swapchain.as_raw());
        unsafe {
            self.swapchain_loader.destroy_swapchain(to_vk(swapchain.as_raw()), None);
        }
    }

    fn swapchain_images(&self, swapchain: SwapchainHandle) -> Result<Vec<ImageHandle>> {
        self.swapchain_images
            .get(&swapchain.as_raw())
            .map(|images| images.iter().map(|image| ImageHandle::from_raw(image.as_raw())).collect())
            .ok_or_else(|| Error::InvalidResource(format!("Unknown swapchain {:?}", swapchain)))
    }

    fn acquire_next_image(
        &mut self,
        swapchain: SwapchainHandle,
        signal: SemaphoreHandle,
    ) -> Result<AcquireOutcome> {
        unsafe {
            vulkan_swapchain::acquire_next_image(
                &self.swapchain_loader,
                to_vk(swapchain.as_raw()),
                to_vk(signal.as_raw()),
                &self.log,
            )
        }
    }

    fn present(
        &mut self,
        swapchain: SwapchainHandle,
        image_index: u32,
        wait: SemaphoreHandle,
    ) -> Result<PresentOutcome> {
        unsafe {
            vulkan_swapchain::present(
                &self.swapchain_loader,
                self.present_queue,
                to_vk(swapchain.as_raw()),
                image_index,
                to_vk(wait.as_raw()),
                &self.log,
            )
        }
    }

    // ===== RENDER TARGETS =====

    fn create_image_view(&mut self, image: ImageHandle, format: Format) -> Result<ImageViewHandle> {
        let view = unsafe {
            vulkan_render_pass::create_image_view(&self.device, to_vk(image.as_raw()), format, &self.log)?
        };
        Ok(ImageViewHandle::from_raw(view.as_raw()))
    }

    fn destroy_image_view(&mut self, view: ImageViewHandle) {
        unsafe {
            self.device.destroy_image_view(to_vk(view.as_raw()), None);
        }
    }

    fn create_render_pass(&mut self, desc: &RenderPassDesc) -> Result<RenderPassHandle> {
        let render_pass = unsafe { vulkan_render_pass::create_render_pass(&self.device, desc, &self.log)? };
        Ok(RenderPassHandle::from_raw(render_pass.as_raw()))
    }

    fn destroy_render_pass(&mut self, render_pass: RenderPassHandle) {
        unsafe {
            self.device.destroy_render_pass(to_vk(render_pass.as_raw()), None);
        }
    }

    fn create_framebuffer(
        &mut self,
        render_pass: RenderPassHandle,
        view: ImageViewHandle,
        extent: Extent2D,
    ) -> Result<FramebufferHandle> {
        let framebuffer = unsafe {
            vulkan_render_pass::create_framebuffer(
                &self.device,
                to_vk(render_pass.as_raw()),
                to_vk(view.as_raw()),
                extent,
                &self.log,
            )?
        };
        Ok(FramebufferHandle::from_raw(framebuffer.as_raw()))
    }

    fn destroy_framebuffer(&mut self, framebuffer: FramebufferHandle) {
        unsafe {
            self.device.destroy_framebuffer(to_vk(framebuffer.as_raw()), None);
        }
    }

    // ===== PIPELINE / DESCRIPTORS =====

    fn create_descriptor_set_layout(
        &mut self,
        bindings: &[DescriptorBinding],
    ) -> Result<DescriptorSetLayoutHandle> {
        let layout =
            unsafe { vulkan_pipeline::create_descriptor_set_layout(&self.device, bindings, &self.log)? };
        Ok(DescriptorSetLayoutHandle::from_raw(layout.as_raw()))
    }

    fn destroy_descriptor_set_layout(&mut self, layout: DescriptorSetLayoutHandle) {
        unsafe {
            self.device.destroy_descriptor_set_layout(to_vk(layout.as_raw()), None);
        }
    }

    fn create_graphics_pipeline(&mut self, desc: &PipelineDesc) -> Result<PipelineHandle> {
        let (pipeline, layout) =
            unsafe { vulkan_pipeline::create_graphics_pipeline(&self.device, desc, &self.log)? };
        self.pipeline_layouts.insert(pipeline.as_raw(), layout);
        Ok(PipelineHandle::from_raw(pipeline.as_raw()))
    }

    fn destroy_pipeline(&mut self, pipeline: PipelineHandle) {
        unsafe {
            self.device.destroy_pipeline(to_vk(pipeline.as_raw()), None);
            if let Some(layout) = self.pipeline_layouts.remove(&pipeline.as_raw()) {
                self.device.destroy_pipeline_layout(layout, None);
            }
        }
    }

    fn create_descriptor_pool(&mut self, max_sets: u32) -> Result<DescriptorPoolHandle> {
        let pool = unsafe { vulkan_pipeline::create_descriptor_pool(&self.device, max_sets, &self.log)? };
        Ok(DescriptorPoolHandle::from_raw(pool.as_raw()))
    }

    fn destroy_descriptor_pool(&mut self, pool: DescriptorPoolHandle) {
        unsafe {
            self.device.destroy_descriptor_pool(to_vk(pool.as_raw()), None);
        }
    }

    fn allocate_descriptor_set(
        &mut self,
        pool: DescriptorPoolHandle,
        layout: DescriptorSetLayoutHandle,
        uniform_buffer: BufferHandle,
        range: u64,
    ) -> Result<DescriptorSetHandle> {
        let buffer = self.buffer(uniform_buffer)?.buffer;
        let set = unsafe {
            vulkan_pipeline::allocate_descriptor_set(
                &self.device,
                to_vk(pool.as_raw()),
                to_vk(layout.as_raw()),
                buffer,
                range,
                &self.log,
            )?
        };
        Ok(DescriptorSetHandle::from_raw(set.as_raw()))
    }

    // ===== BUFFERS =====

    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<BufferHandle> {
        let buffer = Buffer::new(&self.device, &mut self.allocator, desc, &self.log)?;
        let raw = buffer.buffer.as_raw();
        self.buffers.insert(raw, buffer);
        Ok(BufferHandle::from_raw(raw))
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        match self.buffers.remove(&buffer.as_raw()) {
            Some(buffer) => buffer.destroy(&self.device, &mut self.allocator),
            None => sandbox_warn!(self.log, "Destroying unknown buffer {:?}", buffer),
        }
    }

    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) -> Result<()> {
        self.buffers
            .get_mut(&buffer.as_raw())
            .ok_or_else(|| Error::InvalidResource(format!("Unknown buffer {:?}", buffer)))?
            .write(offset, data)
    }

    fn read_buffer(&self, buffer: BufferHandle, offset: u64, out: &mut [u8]) -> Result<()> {
        self.buffer(buffer)?.read(offset, out)
    }

    // ===== COMMAND BUFFERS =====

    fn allocate_command_buffer(&mut self) -> Result<CommandBufferHandle> {
        let allocate_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let command_buffer = unsafe { self.device.allocate_command_buffers(&allocate_info) }
            .map_err(|e| vk_error(&self.log, "Failed to allocate command buffer", e))?
            .first()
            .copied()
            .ok_or_else(|| Error::DriverError("Driver returned no command buffer".to_string()))?;
        Ok(CommandBufferHandle::from_raw(command_buffer.as_raw()))
    }

    fn free_command_buffer(&mut self, command_buffer: CommandBufferHandle) {
        unsafe {
            self.device
                .free_command_buffers(self.command_pool, &[to_vk(command_buffer.as_raw())]);
        }
    }

    fn begin_command_buffer(
        &mut self,
        command_buffer: CommandBufferHandle,
        usage: CommandBufferUsage,
    ) -> Result<()> {
        // The pool allows individual resets, begin resets implicitly
        let begin_info = vk::CommandBufferBeginInfo::default().flags(command_buffer_usage_to_vk(usage));
        unsafe { self.device.begin_command_buffer(to_vk(command_buffer.as_raw()), &begin_info) }
            .map_err(|e| vk_error(&self.log, "Failed to begin command buffer", e))
    }

    fn end_command_buffer(&mut self, command_buffer: CommandBufferHandle) -> Result<()> {
        unsafe { self.device.end_command_buffer(to_vk(command_buffer.as_raw())) }
            .map_err(|e| vk_error(&self.log, "Failed to end command buffer", e))
    }

    fn cmd_begin_render_pass(
        &mut self,
        command_buffer: CommandBufferHandle,
        render_pass: RenderPassHandle,
        framebuffer: FramebufferHandle,
        extent: Extent2D,
        clear_value: ClearValue,
    ) -> Result<()> {
        let ClearValue::Color(color) = clear_value;
        let clear_values = [vk::ClearValue {
            color: vk::ClearColorValue { float32: color },
        }];
        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(to_vk(render_pass.as_raw()))
            .framebuffer(to_vk(framebuffer.as_raw()))
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: extent_to_vk(extent),
            })
            .clear_values(&clear_values);

        unsafe {
            self.device.cmd_begin_render_pass(
                to_vk(command_buffer.as_raw()),
                &begin_info,
                vk::SubpassContents::INLINE,
            );
        }
        Ok(())
    }

    fn cmd_end_render_pass(&mut self, command_buffer: CommandBufferHandle) -> Result<()> {
        unsafe {
            self.device.cmd_end_render_pass(to_vk(command_buffer.as_raw()));
        }
        Ok(())
    }

    fn cmd_bind_pipeline(
        &mut self,
        command_buffer: CommandBufferHandle,
        pipeline: PipelineHandle,
    ) -> Result<()> {
        unsafe {
            self.device.cmd_bind_pipeline(
                to_vk(command_buffer.as_raw()),
                vk::PipelineBindPoint::GRAPHICS,
                to_vk(pipeline.as_raw()),
            );
        }
        Ok(())
    }

    fn cmd_set_viewport(&mut self, command_buffer: CommandBufferHandle, viewport: Viewport) -> Result<()> {
        let viewports = [vk::Viewport {
            x: viewport.x,
            y: viewport.y,
            width: viewport.width,
            height: viewport.height,
            min_depth: viewport.min_depth,
            max_depth: viewport.max_depth,
        }];
        unsafe {
            self.device.cmd_set_viewport(to_vk(command_buffer.as_raw()), 0, &viewports);
        }
        Ok(())
    }

    fn cmd_set_scissor(&mut self, command_buffer: CommandBufferHandle, scissor: Rect2D) -> Result<()> {
        let scissors = [vk::Rect2D {
            offset: vk::Offset2D {
                x: scissor.x,
                y: scissor.y,
            },
            extent: vk::Extent2D {
                width: scissor.width,
                height: scissor.height,
            },
        }];
        unsafe {
            self.device.cmd_set_scissor(to_vk(command_buffer.as_raw()), 0, &scissors);
        }
        Ok(())
    }

    fn cmd_bind_vertex_buffer(
        &mut self,
        command_buffer: CommandBufferHandle,
        buffer: BufferHandle,
        offset: u64,
    ) -> Result<()> {
        let buffers = [self.buffer(buffer)?.buffer];
        unsafe {
            self.device
                .cmd_bind_vertex_buffers(to_vk(command_buffer.as_raw()), 0, &buffers, &[offset]);
        }
        Ok(())
    }

    fn cmd_bind_index_buffer(
        &mut self,
        command_buffer: CommandBufferHandle,
        buffer: BufferHandle,
        offset: u64,
        index_type: IndexType,
    ) -> Result<()> {
        let vk_buffer = self.buffer(buffer)?.buffer;
        unsafe {
            self.device.cmd_bind_index_buffer(
                to_vk(command_buffer.as_raw()),
                vk_buffer,
                offset,
                index_type_to_vk(index_type),
            );
        }
        Ok(())
    }

    fn cmd_bind_descriptor_set(
        &mut self,
        command_buffer: CommandBufferHandle,
        pipeline: PipelineHandle,
        descriptor_set: DescriptorSetHandle,
    ) -> Result<()> {
        let layout = *self
            .pipeline_layouts
            .get(&pipeline.as_raw())
            .ok_or_else(|| Error::InvalidResource(format!("Unknown pipeline {:?}", pipeline)))?;
        unsafe {
            self.device.cmd_bind_descriptor_sets(
                to_vk(command_buffer.as_raw()),
                vk::PipelineBindPoint::GRAPHICS,
                layout,
                0,
                &[to_vk(descriptor_set.as_raw())],
                &[],
            );
        }
        Ok(())
    }

    fn cmd_draw_indexed(
        &mut self,
        command_buffer: CommandBufferHandle,
        index_count: u32,
        first_index: u32,
        vertex_offset: i32,
    ) -> Result<()> {
        unsafe {
            self.device.cmd_draw_indexed(
                to_vk(command_buffer.as_raw()),
                index_count,
                1,
                first_index,
                vertex_offset,
                0,
            );
        }
        Ok(())
    }

    fn cmd_copy_buffer(
        &mut self,
        command_buffer: CommandBufferHandle,
        src: BufferHandle,
        dst: BufferHandle,
        size: u64,
    ) -> Result<()> {
        let src_buffer = self.buffer(src)?;
        let dst_buffer = self.buffer(dst)?;
        if size > src_buffer.desc.size || size > dst_buffer.desc.size {
            return Err(Error::InvalidResource(format!(
                "Copy of {} bytes does not fit ({} -> {} bytes)",
                size, src_buffer.desc.size, dst_buffer.desc.size
            )));
        }

        let regions = [vk::BufferCopy {
            src_offset: 0,
            dst_offset: 0,
            size,
        }];
        unsafe {
            self.device.cmd_copy_buffer(
                to_vk(command_buffer.as_raw()),
                src_buffer.buffer,
                dst_buffer.buffer,
                &regions,
            );
        }
        Ok(())
    }

    fn submit(&mut self, desc: &SubmitDesc) -> Result<()> {
        let command_buffers = [to_vk::<vk::CommandBuffer>(desc.command_buffer.as_raw())];
        let (wait_semaphores, wait_stages): (Vec<vk::Semaphore>, Vec<vk::PipelineStageFlags>) = desc
            .wait
            .iter()
            .map(|(semaphore, stage)| (to_vk::<vk::Semaphore>(semaphore.as_raw()), pipeline_stage_to_vk(*stage)))
            .unzip();
        let signal_semaphores: Vec<vk::Semaphore> =
            desc.signal.iter().map(|semaphore| to_vk(semaphore.as_raw())).collect();
        let fence = desc
            .fence
            .map(|fence| to_vk::<vk::Fence>(fence.as_raw()))
            .unwrap_or_else(vk::Fence::null);

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe { self.device.queue_submit(self.graphics_queue, &[submit_info], fence) }
            .map_err(|e| vk_error(&self.log, "Failed to submit commands to GPU queue", e))
    }

    // ===== SYNCHRONIZATION =====

    fn create_fence(&mut self, signaled: bool) -> Result<FenceHandle> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let fence = unsafe { self.device.create_fence(&vk::FenceCreateInfo::default().flags(flags), None) }
            .map_err(|e| vk_error(&self.log, "Failed to create fence", e))?;
        Ok(FenceHandle::from_raw(fence.as_raw()))
    }

    fn destroy_fence(&mut self, fence: FenceHandle) {
        unsafe {
            self.device.destroy_fence(to_vk(fence.as_raw()), None);
        }
    }

    fn wait_for_fence(&mut self, fence: FenceHandle) -> Result<()> {
        unsafe { self.device.wait_for_fences(&[to_vk(fence.as_raw())], true, u64::MAX) }
            .map_err(|e| vk_error(&self.log, "Failed to wait for fence", e))
    }

    fn reset_fence(&mut self, fence: FenceHandle) -> Result<()> {
        unsafe { self.device.reset_fences(&[to_vk(fence.as_raw())]) }
            .map_err(|e| vk_error(&self.log, "Failed to reset fence", e))
    }

    fn create_semaphore(&mut self) -> Result<SemaphoreHandle> {
        let semaphore = unsafe { self.device.create_semaphore(&vk::SemaphoreCreateInfo::default(), None) }
            .map_err(|e| vk_error(&self.log, "Failed to create semaphore", e))?;
        Ok(SemaphoreHandle::from_raw(semaphore.as_raw()))
    }

    fn destroy_semaphore(&mut self, semaphore: SemaphoreHandle) {
        unsafe {
            self.device.destroy_semaphore(to_vk(semaphore.as_raw()), None);
        }
    }

    fn wait_idle(&mut self) -> Result<()> {
        unsafe { self.device.device_wait_idle() }
            .map_err(|e| vk_error(&self.log, "Failed to wait idle", e))
    }
}

impl Drop for VulkanGraphicsDevice {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            // 1. Objects the application leaked
            if !self.buffers.is_empty() {
                sandbox_warn!(self.log, "{} buffer(s) still alive at shutdown", self.buffers.len());
            }
            for (_, buffer) in self.buffers.drain() {
                buffer.destroy(&self.device, &mut self.allocator);
            }
            for (raw, _) in self.swapchain_images.drain() {
                sandbox_warn!(self.log, "Swapchain {:#x} still alive at shutdown", raw);
                self.swapchain_loader.destroy_swapchain(to_vk(raw), None);
            }

            // 2. Device-level objects, allocator before the device
            self.device.destroy_command_pool(self.command_pool, None);
            ManuallyDrop::drop(&mut self.allocator);
            self.device.destroy_device(None);

            // 3. Surface, messenger and instance
            if let Some(instance_objects) = self.instance.take() {
                if let Some(stats) = instance_objects.debug_messenger.as_ref().map(|m| m.stats()) {
                    sandbox_debug!(
                        self.log,
                        "Validation messages: {} errors, {} warnings",
                        stats.errors,
                        stats.warnings
                    );
                }
                instance_objects.destroy();
            }
        }
    }
}
