/// Buffer - VkBuffer with its gpu-allocator allocation

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme, Allocator};
use vulkan_sandbox::sandbox::log::Log;
use vulkan_sandbox::sandbox::render::BufferDesc;
use vulkan_sandbox::sandbox::{Error, Result};

use crate::vulkan_error::{allocation_error, vk_error};
use crate::vulkan_format::{buffer_usage_to_vk, memory_location_to_allocator};

/// Vulkan buffer implementation
pub(crate) struct Buffer {
    pub(crate) buffer: vk::Buffer,
    /// Taken on destroy
    allocation: Option<Allocation>,
    pub(crate) desc: BufferDesc,
}

impl Buffer {
    /// Create the buffer and bind freshly allocated memory to it
    pub(crate) fn new(
        device: &ash::Device,
        allocator: &mut Allocator,
        desc: &BufferDesc,
        log: &Log,
    ) -> Result<Self> {
        if desc.size == 0 {
            return Err(Error::InvalidResource("Buffer size is zero".to_string()));
        }

        unsafe {
            let create_info = vk::BufferCreateInfo::default()
                .size(desc.size)
                .usage(buffer_usage_to_vk(desc.usage))
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = device
                .create_buffer(&create_info, None)
                .map_err(|e| vk_error(log, "Failed to create buffer", e))?;

            let requirements = device.get_buffer_memory_requirements(buffer);
            let allocation = match allocator.allocate(&AllocationCreateDesc {
                name: "sandbox buffer",
                requirements,
                location: memory_location_to_allocator(desc.location),
                linear: true,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            }) {
                Ok(allocation) => allocation,
                Err(e) => {
                    device.destroy_buffer(buffer, None);
                    return Err(allocation_error(log, "Failed to allocate buffer memory", e));
                }
            };

            if let Err(e) = device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset()) {
                allocator.free(allocation).ok();
                device.destroy_buffer(buffer, None);
                return Err(vk_error(log, "Failed to bind buffer memory", e));
            }

            Ok(Self {
                buffer,
                allocation: Some(allocation),
                desc: *desc,
            })
        }
    }

    fn check_range(&self, offset: u64, len: usize) -> Result<std::ops::Range<usize>> {
        let start = offset as usize;
        let end = start
            .checked_add(len)
            .filter(|end| *end as u64 <= self.desc.size)
            .ok_or_else(|| {
                Error::InvalidResource(format!(
                    "Range {}..{} outside of a {}-byte buffer",
                    offset,
                    offset + len as u64,
                    self.desc.size
                ))
            })?;
        Ok(start..end)
    }

    /// Copy bytes into host-visible memory (coherent, no flush)
    pub(crate) fn write(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        let range = self.check_range(offset, data.len())?;
        let mapped = self
            .allocation
            .as_mut()
            .and_then(|allocation| allocation.mapped_slice_mut())
            .ok_or_else(|| Error::InvalidResource("Buffer is not host visible".to_string()))?;
        mapped[range].copy_from_slice(data);
        Ok(())
    }

    /// Copy bytes out of host-visible memory
    pub(crate) fn read(&self, offset: u64, out: &mut [u8]) -> Result<()> {
        let range = self.check_range(offset, out.len())?;
        let mapped = self
            .allocation
            .as_ref()
            .and_then(|allocation| allocation.mapped_slice())
            .ok_or_else(|| Error::InvalidResource("Buffer is not host visible".to_string()))?;
        out.copy_from_slice(&mapped[range]);
        Ok(())
    }

    /// Free the memory and the buffer (the GPU must be done with it)
    pub(crate) fn destroy(mut self, device: &ash::Device, allocator: &mut Allocator) {
        if let Some(allocation) = self.allocation.take() {
            allocator.free(allocation).ok();
        }
        unsafe {
            device.destroy_buffer(self.buffer, None);
        }
    }
}
