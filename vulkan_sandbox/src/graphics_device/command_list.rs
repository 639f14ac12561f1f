/// Command recording and submission value types

use crate::graphics_device::{CommandBufferHandle, FenceHandle, SemaphoreHandle};

/// Viewport dimensions and depth range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

/// 2D rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Clear value for an attachment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    /// Color clear value (RGBA)
    Color([f32; 4]),
}

/// Index buffer element type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    /// 16-bit indices
    U16,
    /// 32-bit indices
    U32,
}

impl IndexType {
    /// Size in bytes of one index element
    pub fn size_bytes(&self) -> u32 {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

/// Pipeline stage a semaphore wait blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    TopOfPipe,
    Transfer,
    ColorAttachmentOutput,
    BottomOfPipe,
}

/// How a command buffer will be submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandBufferUsage {
    /// Re-recorded and resubmitted (per-frame buffers)
    Reusable,
    /// Submitted once, then freed (uploads)
    OneTimeSubmit,
}

/// One graphics queue submission
///
/// Semaphores express GPU to GPU ordering, the fence is signaled when the
/// GPU has finished executing the command buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitDesc {
    pub command_buffer: CommandBufferHandle,
    /// Semaphore to wait on, and the stage that waits
    pub wait: Option<(SemaphoreHandle, PipelineStage)>,
    /// Semaphore signaled on completion
    pub signal: Option<SemaphoreHandle>,
    /// Fence signaled on completion
    pub fence: Option<FenceHandle>,
}
