/// Quad scene - the fixed geometry drawn every frame
///
/// Uploads the quad's vertex and index data to device-local buffers, builds
/// the graphics pipeline, and keeps one host-visible uniform buffer plus one
/// descriptor set per frame slot so a slot's uniforms can be rewritten while
/// other slots are still in flight.

use std::time::Instant;

use crate::error::{Error, Result};
use crate::frame::SceneRecorder;
use crate::graphics_device::{
    BufferDesc, BufferHandle, BufferUsage, CommandBufferHandle, DescriptorBinding,
    DescriptorPoolHandle, DescriptorSetHandle, DescriptorSetLayoutHandle, Extent2D,
    GraphicsDevice, IndexType, MemoryLocation, PipelineDesc, PipelineHandle, RenderPassHandle,
    ShaderStage,
};
use crate::log::Log;
use crate::scene::vertex::{UniformBufferObject, Vertex, QUAD_INDICES, QUAD_VERTICES};
use crate::upload::upload;
use crate::{sandbox_debug, sandbox_error};

const UNIFORM_BINDING: DescriptorBinding = DescriptorBinding {
    binding: 0,
    stage: ShaderStage::Vertex,
};

/// GPU resources of the quad
pub struct QuadScene {
    vertex_buffer: BufferHandle,
    index_buffer: BufferHandle,
    descriptor_set_layout: DescriptorSetLayoutHandle,
    pipeline: PipelineHandle,
    uniform_buffers: Vec<BufferHandle>,
    descriptor_pool: DescriptorPoolHandle,
    descriptor_sets: Vec<DescriptorSetHandle>,
    start: Instant,
    log: Log,
}

impl QuadScene {
    /// Create the quad's buffers, pipeline and per-slot uniforms
    ///
    /// # Arguments
    ///
    /// * `device` - Device owning every resource
    /// * `render_pass` - Render pass the pipeline draws in
    /// * `vertex_spirv` - Vertex shader words
    /// * `fragment_spirv` - Fragment shader words
    /// * `frames_in_flight` - Number of frame slots (one uniform buffer each)
    /// * `log` - Logging context
    pub fn new(
        device: &mut dyn GraphicsDevice,
        render_pass: RenderPassHandle,
        vertex_spirv: Vec<u32>,
        fragment_spirv: Vec<u32>,
        frames_in_flight: usize,
        log: Log,
    ) -> Result<Self> {
        let mut scene = Self {
            vertex_buffer: BufferHandle::NULL,
            index_buffer: BufferHandle::NULL,
            descriptor_set_layout: DescriptorSetLayoutHandle::NULL,
            pipeline: PipelineHandle::NULL,
            uniform_buffers: Vec::with_capacity(frames_in_flight),
            descriptor_pool: DescriptorPoolHandle::NULL,
            descriptor_sets: Vec::with_capacity(frames_in_flight),
            start: Instant::now(),
            log,
        };

        match scene.build(device, render_pass, vertex_spirv, fragment_spirv, frames_in_flight) {
            Ok(()) => {
                sandbox_debug!(scene.log, "Quad scene ready ({} uniform slots)", frames_in_flight);
                Ok(scene)
            }
            Err(e) => {
                sandbox_error!(scene.log, "Failed to create quad scene: {}", e);
                scene.destroy(device);
                Err(e)
            }
        }
    }

    fn build(
        &mut self,
        device: &mut dyn GraphicsDevice,
        render_pass: RenderPassHandle,
        vertex_spirv: Vec<u32>,
        fragment_spirv: Vec<u32>,
        frames_in_flight: usize,
    ) -> Result<()> {
        self.vertex_buffer = upload(
            device,
            bytemuck::cast_slice(&QUAD_VERTICES),
            BufferUsage::VERTEX,
            &self.log,
        )?;
        self.index_buffer = upload(
            device,
            bytemuck::cast_slice(&QUAD_INDICES),
            BufferUsage::INDEX,
            &self.log,
        )?;

        self.descriptor_set_layout = device.create_descriptor_set_layout(&[UNIFORM_BINDING])?;
        self.pipeline = device.create_graphics_pipeline(&PipelineDesc {
            vertex_spirv,
            fragment_spirv,
            vertex_layout: Vertex::layout(),
            descriptor_set_layout: self.descriptor_set_layout,
            uniform_bindings: vec![UNIFORM_BINDING],
            render_pass,
        })?;

        let ubo_size = std::mem::size_of::<UniformBufferObject>() as u64;
        for _ in 0..frames_in_flight {
            let buffer = device.create_buffer(&BufferDesc {
                size: ubo_size,
                usage: BufferUsage::UNIFORM,
                location: MemoryLocation::CpuToGpu,
            })?;
            self.uniform_buffers.push(buffer);
        }

        self.descriptor_pool = device.create_descriptor_pool(frames_in_flight as u32)?;
        for buffer in &self.uniform_buffers {
            let set = device.allocate_descriptor_set(
                self.descriptor_pool,
                self.descriptor_set_layout,
                *buffer,
                ubo_size,
            )?;
            self.descriptor_sets.push(set);
        }

        Ok(())
    }

    /// Release everything (the device must be idle)
    pub fn destroy(self, device: &mut dyn GraphicsDevice) {
        if !self.pipeline.is_null() {
            device.destroy_pipeline(self.pipeline);
        }
        // Sets go with their pool
        if !self.descriptor_pool.is_null() {
            device.destroy_descriptor_pool(self.descriptor_pool);
        }
        for buffer in self.uniform_buffers {
            device.destroy_buffer(buffer);
        }
        if !self.descriptor_set_layout.is_null() {
            device.destroy_descriptor_set_layout(self.descriptor_set_layout);
        }
        if !self.index_buffer.is_null() {
            device.destroy_buffer(self.index_buffer);
        }
        if !self.vertex_buffer.is_null() {
            device.destroy_buffer(self.vertex_buffer);
        }
    }

    pub fn pipeline(&self) -> PipelineHandle {
        self.pipeline
    }

    pub fn vertex_buffer(&self) -> BufferHandle {
        self.vertex_buffer
    }

    pub fn index_buffer(&self) -> BufferHandle {
        self.index_buffer
    }

    pub fn uniform_buffer(&self, slot: usize) -> Option<BufferHandle> {
        self.uniform_buffers.get(slot).copied()
    }

    pub fn descriptor_set(&self, slot: usize) -> Option<DescriptorSetHandle> {
        self.descriptor_sets.get(slot).copied()
    }
}

impl SceneRecorder for QuadScene {
    fn update(&mut self, device: &mut dyn GraphicsDevice, slot: usize, extent: Extent2D) -> Result<()> {
        let ubo = UniformBufferObject::spinning(self.start.elapsed().as_secs_f32(), extent);
        let buffer = self
            .uniform_buffer(slot)
            .ok_or_else(|| Error::InvalidResource(format!("No uniform buffer for slot {}", slot)))?;
        device.write_buffer(buffer, 0, bytemuck::bytes_of(&ubo))
    }

    fn record_draw(
        &self,
        device: &mut dyn GraphicsDevice,
        command_buffer: CommandBufferHandle,
        slot: usize,
    ) -> Result<()> {
        let descriptor_set = self
            .descriptor_set(slot)
            .ok_or_else(|| Error::InvalidResource(format!("No descriptor set for slot {}", slot)))?;

        device.cmd_bind_pipeline(command_buffer, self.pipeline)?;
        device.cmd_bind_vertex_buffer(command_buffer, self.vertex_buffer, 0)?;
        device.cmd_bind_index_buffer(command_buffer, self.index_buffer, 0, IndexType::U16)?;
        device.cmd_bind_descriptor_set(command_buffer, self.pipeline, descriptor_set)?;
        device.cmd_draw_indexed(command_buffer, QUAD_INDICES.len() as u32, 0, 0)
    }
}

#[cfg(test)]
#[path = "quad_scene_tests.rs"]
mod tests;
