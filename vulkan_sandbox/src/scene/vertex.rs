/// Vertex and uniform data of the quad scene

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::graphics_device::{BufferFormat, Extent2D, VertexAttribute, VertexLayout};

/// Interleaved vertex: 2D position followed by an RGB color
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub color: [f32; 3],
}

impl Vertex {
    pub const fn new(position: [f32; 2], color: [f32; 3]) -> Self {
        Self { position, color }
    }

    /// Pipeline vertex input layout matching this struct
    pub fn layout() -> VertexLayout {
        VertexLayout {
            stride: std::mem::size_of::<Vertex>() as u32,
            attributes: vec![
                VertexAttribute {
                    location: 0,
                    format: BufferFormat::R32G32_SFLOAT,
                    offset: std::mem::offset_of!(Vertex, position) as u32,
                },
                VertexAttribute {
                    location: 1,
                    format: BufferFormat::R32G32B32_SFLOAT,
                    offset: std::mem::offset_of!(Vertex, color) as u32,
                },
            ],
        }
    }
}

/// Colored quad, counter-clockwise
pub const QUAD_VERTICES: [Vertex; 4] = [
    Vertex::new([-0.5, -0.5], [1.0, 0.0, 0.0]),
    Vertex::new([0.5, -0.5], [0.0, 1.0, 0.0]),
    Vertex::new([0.5, 0.5], [0.0, 0.0, 1.0]),
    Vertex::new([-0.5, 0.5], [1.0, 1.0, 1.0]),
];

/// Two triangles
pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 3, 0];

/// Per-frame transforms read by the vertex shader (set 0, binding 0)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct UniformBufferObject {
    pub model: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
}

impl UniformBufferObject {
    /// Quad spinning at 90 degrees per second around Z, seen from (2, 2, 2)
    pub fn spinning(elapsed_seconds: f32, extent: Extent2D) -> Self {
        Self {
            model: Mat4::from_rotation_z(elapsed_seconds * 90f32.to_radians()),
            view: Mat4::look_at_rh(Vec3::new(2.0, 2.0, 2.0), Vec3::ZERO, Vec3::Z),
            projection: Self::projection(extent),
        }
    }

    /// Perspective projection for Vulkan clip space (Y points down)
    pub fn projection(extent: Extent2D) -> Mat4 {
        let mut projection = Mat4::perspective_rh(45f32.to_radians(), extent.aspect_ratio(), 0.1, 10.0);
        projection.y_axis.y *= -1.0;
        projection
    }
}
