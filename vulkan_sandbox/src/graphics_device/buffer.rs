/// Buffer descriptor and usage flags

use bitflags::bitflags;

bitflags! {
    /// Buffer usage flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Source of a transfer (staging)
        const TRANSFER_SRC = 0x0000_0001;
        /// Destination of a transfer
        const TRANSFER_DST = 0x0000_0002;
        /// Uniform/constant buffer
        const UNIFORM = 0x0000_0010;
        /// Index buffer
        const INDEX = 0x0000_0040;
        /// Vertex buffer
        const VERTEX = 0x0000_0080;
    }
}

/// Where the buffer memory lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryLocation {
    /// Device-local, not host visible
    GpuOnly,
    /// Host-visible and coherent, written by the CPU
    CpuToGpu,
    /// Host-visible and coherent, read back by the CPU
    GpuToCpu,
}

impl MemoryLocation {
    /// True when the CPU can map the memory
    pub fn is_host_visible(&self) -> bool {
        !matches!(self, MemoryLocation::GpuOnly)
    }
}

/// Descriptor for creating a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDesc {
    /// Size in bytes
    pub size: u64,
    /// Buffer usage
    pub usage: BufferUsage,
    /// Memory placement
    pub location: MemoryLocation,
}

/// Buffer data format for vertex attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum BufferFormat {
    R32_SFLOAT,         // float (4 bytes)
    R32G32_SFLOAT,      // vec2 (8 bytes)
    R32G32B32_SFLOAT,   // vec3 (12 bytes)
    R32G32B32A32_SFLOAT, // vec4 (16 bytes)
}

impl BufferFormat {
    /// Returns size in bytes for this format
    pub fn size_bytes(&self) -> u32 {
        match self {
            BufferFormat::R32_SFLOAT => 4,
            BufferFormat::R32G32_SFLOAT => 8,
            BufferFormat::R32G32B32_SFLOAT => 12,
            BufferFormat::R32G32B32A32_SFLOAT => 16,
        }
    }
}
