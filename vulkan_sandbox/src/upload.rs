//! Resource upload path
//!
//! Device-local buffers are filled through a host-visible staging buffer and
//! a single copy recorded into a one-shot command buffer. The copy is fenced
//! and the CPU blocks on that fence before the staging buffer is released.
//! `download` is the mirror image, used to read device-local data back.

use crate::error::{Error, Result};
use crate::graphics_device::{
    BufferDesc, BufferHandle, BufferUsage, CommandBufferHandle, CommandBufferUsage, FenceHandle,
    GraphicsDevice, MemoryLocation, SubmitDesc,
};
use crate::log::Log;
use crate::{sandbox_error, sandbox_trace};

/// Copy `data` into a new device-local buffer
///
/// # Arguments
///
/// * `device` - Device owning the new buffer
/// * `data` - Bytes to upload (must not be empty)
/// * `usage` - Usage of the destination buffer (`TRANSFER_DST` is added)
/// * `log` - Logging context
///
/// # Returns
///
/// The device-local buffer, owned by the caller. On failure every resource
/// created along the way has been released.
pub fn upload(
    device: &mut dyn GraphicsDevice,
    data: &[u8],
    usage: BufferUsage,
    log: &Log,
) -> Result<BufferHandle> {
    if data.is_empty() {
        return Err(Error::InvalidResource("Upload payload is empty".to_string()));
    }
    let size = data.len() as u64;

    let staging = device.create_buffer(&BufferDesc {
        size,
        usage: BufferUsage::TRANSFER_SRC,
        location: MemoryLocation::CpuToGpu,
    })?;

    if let Err(e) = device.write_buffer(staging, 0, data) {
        device.destroy_buffer(staging);
        return Err(e);
    }

    let destination = match device.create_buffer(&BufferDesc {
        size,
        usage: usage | BufferUsage::TRANSFER_DST,
        location: MemoryLocation::GpuOnly,
    }) {
        Ok(buffer) => buffer,
        Err(e) => {
            device.destroy_buffer(staging);
            return Err(e);
        }
    };

    let copied = copy_one_shot(device, staging, destination, size);
    device.destroy_buffer(staging);

    match copied {
        Ok(()) => {
            sandbox_trace!(log, "Uploaded {} bytes ({:?})", size, usage);
            Ok(destination)
        }
        Err(e) => {
            sandbox_error!(log, "Upload of {} bytes failed: {}", size, e);
            device.destroy_buffer(destination);
            Err(e)
        }
    }
}

/// Read the first `size` bytes of a buffer back to the CPU
///
/// The source buffer must have been created with `TRANSFER_SRC` usage.
pub fn download(
    device: &mut dyn GraphicsDevice,
    buffer: BufferHandle,
    size: u64,
    log: &Log,
) -> Result<Vec<u8>> {
    if size == 0 {
        return Err(Error::InvalidResource("Download size is zero".to_string()));
    }

    let staging = device.create_buffer(&BufferDesc {
        size,
        usage: BufferUsage::TRANSFER_DST,
        location: MemoryLocation::GpuToCpu,
    })?;

    let result = copy_one_shot(device, buffer, staging, size).and_then(|()| {
        let mut bytes = vec![0u8; size as usize];
        device.read_buffer(staging, 0, &mut bytes)?;
        Ok(bytes)
    });
    device.destroy_buffer(staging);

    if let Err(e) = &result {
        sandbox_error!(log, "Download of {} bytes failed: {}", size, e);
    }
    result
}

/// Record, submit and wait for a single buffer-to-buffer copy
fn copy_one_shot(
    device: &mut dyn GraphicsDevice,
    src: BufferHandle,
    dst: BufferHandle,
    size: u64,
) -> Result<()> {
    let command_buffer = device.allocate_command_buffer()?;
    let fence = match device.create_fence(false) {
        Ok(fence) => fence,
        Err(e) => {
            device.free_command_buffer(command_buffer);
            return Err(e);
        }
    };

    let result = submit_copy(device, command_buffer, fence, src, dst, size);

    device.destroy_fence(fence);
    device.free_command_buffer(command_buffer);
    result
}

fn submit_copy(
    device: &mut dyn GraphicsDevice,
    command_buffer: CommandBufferHandle,
    fence: FenceHandle,
    src: BufferHandle,
    dst: BufferHandle,
    size: u64,
) -> Result<()> {
    device.begin_command_buffer(command_buffer, CommandBufferUsage::OneTimeSubmit)?;
    device.cmd_copy_buffer(command_buffer, src, dst, size)?;
    device.end_command_buffer(command_buffer)?;

    device.submit(&SubmitDesc {
        command_buffer,
        wait: None,
        signal: None,
        fence: Some(fence),
    })?;

    device.wait_for_fence(fence)
}

#[cfg(test)]
#[path = "upload_tests.rs"]
mod tests;
