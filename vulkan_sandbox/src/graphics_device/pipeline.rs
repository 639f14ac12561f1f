/// Render pass, pipeline and descriptor descriptors

use crate::graphics_device::{
    BufferFormat, DescriptorSetLayoutHandle, RenderPassHandle, SurfaceFormat,
};

/// Single color attachment render pass
///
/// The attachment is cleared on load, stored, and transitioned to the
/// presentation layout at the end of the pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderPassDesc {
    pub color_format: SurfaceFormat,
}

/// Shader stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// Descriptor binding inside a set layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorBinding {
    /// Binding index
    pub binding: u32,
    /// Stage reading the resource
    pub stage: ShaderStage,
}

/// Vertex attribute description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Attribute location in shader
    pub location: u32,
    /// Format of the attribute
    pub format: BufferFormat,
    /// Offset in bytes from the start of the vertex
    pub offset: u32,
}

/// Vertex input layout (single interleaved binding)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    /// Stride in bytes between consecutive vertices
    pub stride: u32,
    pub attributes: Vec<VertexAttribute>,
}

/// Graphics pipeline descriptor
///
/// Triangle list, back-face culling, dynamic viewport and scissor.
#[derive(Debug, Clone)]
pub struct PipelineDesc {
    /// Vertex shader SPIR-V words
    pub vertex_spirv: Vec<u32>,
    /// Fragment shader SPIR-V words
    pub fragment_spirv: Vec<u32>,
    pub vertex_layout: VertexLayout,
    pub descriptor_set_layout: DescriptorSetLayoutHandle,
    /// Uniform buffer bindings of `descriptor_set_layout` (set 0)
    pub uniform_bindings: Vec<DescriptorBinding>,
    pub render_pass: RenderPassHandle,
}
