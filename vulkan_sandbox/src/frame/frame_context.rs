/// Per-frame resource set
///
/// One `FrameContext` per frame in flight. A context is reused every N-th
/// frame, and only after its `in_flight` fence proves the GPU is done with it.

use crate::error::Result;
use crate::graphics_device::{CommandBufferHandle, FenceHandle, GraphicsDevice, SemaphoreHandle};
use crate::log::Log;
use crate::sandbox_debug;

/// Synchronization objects and command buffer of one frame slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameContext {
    command_buffer: CommandBufferHandle,
    image_available: SemaphoreHandle,
    render_complete: SemaphoreHandle,
    in_flight: FenceHandle,
}

impl FrameContext {
    /// Create the objects of one slot
    ///
    /// The fence starts signaled so the first wait on it returns immediately.
    pub fn create(device: &mut dyn GraphicsDevice) -> Result<Self> {
        let command_buffer = device.allocate_command_buffer()?;

        let image_available = match device.create_semaphore() {
            Ok(semaphore) => semaphore,
            Err(e) => {
                device.free_command_buffer(command_buffer);
                return Err(e);
            }
        };

        let render_complete = match device.create_semaphore() {
            Ok(semaphore) => semaphore,
            Err(e) => {
                device.destroy_semaphore(image_available);
                device.free_command_buffer(command_buffer);
                return Err(e);
            }
        };

        let in_flight = match device.create_fence(true) {
            Ok(fence) => fence,
            Err(e) => {
                device.destroy_semaphore(render_complete);
                device.destroy_semaphore(image_available);
                device.free_command_buffer(command_buffer);
                return Err(e);
            }
        };

        Ok(Self {
            command_buffer,
            image_available,
            render_complete,
            in_flight,
        })
    }

    /// Destroy the slot's objects (the GPU must be done with them)
    pub fn destroy(self, device: &mut dyn GraphicsDevice) {
        device.destroy_fence(self.in_flight);
        device.destroy_semaphore(self.render_complete);
        device.destroy_semaphore(self.image_available);
        device.free_command_buffer(self.command_buffer);
    }

    pub fn command_buffer(&self) -> CommandBufferHandle {
        self.command_buffer
    }

    /// Signaled by acquire, waited on by the submission
    pub fn image_available(&self) -> SemaphoreHandle {
        self.image_available
    }

    /// Signaled by the submission, waited on by present
    pub fn render_complete(&self) -> SemaphoreHandle {
        self.render_complete
    }

    /// Signaled when the slot's submission has finished executing
    pub fn in_flight(&self) -> FenceHandle {
        self.in_flight
    }
}

/// Create `count` frame contexts, releasing all of them if one fails
pub fn create_frame_contexts(
    device: &mut dyn GraphicsDevice,
    count: usize,
    log: &Log,
) -> Result<Vec<FrameContext>> {
    let mut frames = Vec::with_capacity(count);

    for _ in 0..count {
        match FrameContext::create(device) {
            Ok(frame) => frames.push(frame),
            Err(e) => {
                destroy_frame_contexts(device, frames);
                return Err(e);
            }
        }
    }

    sandbox_debug!(log, "Created {} frame contexts", count);
    Ok(frames)
}

/// Destroy a set of frame contexts
pub fn destroy_frame_contexts(device: &mut dyn GraphicsDevice, frames: Vec<FrameContext>) {
    for frame in frames {
        frame.destroy(device);
    }
}
