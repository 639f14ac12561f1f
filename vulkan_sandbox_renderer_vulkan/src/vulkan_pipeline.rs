/// Pipeline - graphics pipeline, descriptor layouts, pools and sets
///
/// Shader code is reflected with spirq before the pipeline is built: every
/// uniform buffer a shader reads must be declared in the pipeline's
/// descriptor set layout (set 0).

use ash::vk;
use ash::vk::Handle;
use vulkan_sandbox::sandbox::log::Log;
use vulkan_sandbox::sandbox::render::{DescriptorBinding, PipelineDesc, ShaderStage};
use vulkan_sandbox::sandbox::{Error, Result};
use vulkan_sandbox::{sandbox_bail, sandbox_error};

use crate::vulkan_error::vk_error;
use crate::vulkan_format::{buffer_format_to_vk, shader_stage_to_vk};

/// Uniform buffer binding used by a shader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ReflectedUniform {
    pub set: u32,
    pub binding: u32,
}

/// Uniform buffer bindings referenced by a SPIR-V module
pub(crate) fn reflect_uniform_buffers(code: &[u32], log: &Log) -> Result<Vec<ReflectedUniform>> {
    let entry_points = spirq::ReflectConfig::new()
        .spv(code)
        .ref_all_rscs(true)
        .reflect()
        .map_err(|e| {
            sandbox_error!(log, "SPIR-V reflection failed: {:?}", e);
            Error::InvalidResource(format!("SPIR-V reflection failed: {:?}", e))
        })?;

    let mut uniforms = Vec::new();
    for entry_point in &entry_points {
        for var in entry_point.vars.iter() {
            if let spirq::var::Variable::Descriptor { desc_bind, desc_ty, .. } = var {
                if matches!(desc_ty, spirq::ty::DescriptorType::UniformBuffer()) {
                    let uniform = ReflectedUniform {
                        set: desc_bind.set(),
                        binding: desc_bind.bind(),
                    };
                    if !uniforms.contains(&uniform) {
                        uniforms.push(uniform);
                    }
                }
            }
        }
    }

    Ok(uniforms)
}

/// Check that every reflected uniform is declared in the layout
pub(crate) fn check_uniform_bindings(
    stage: ShaderStage,
    reflected: &[ReflectedUniform],
    declared: &[DescriptorBinding],
) -> Result<()> {
    for uniform in reflected {
        let found = uniform.set == 0
            && declared
                .iter()
                .any(|binding| binding.binding == uniform.binding && binding.stage == stage);
        if !found {
            return Err(Error::InvalidResource(format!(
                "{:?} shader reads a uniform buffer at set {} binding {} missing from the pipeline layout",
                stage, uniform.set, uniform.binding
            )));
        }
    }
    Ok(())
}

pub(crate) unsafe fn create_descriptor_set_layout(
    device: &ash::Device,
    bindings: &[DescriptorBinding],
    log: &Log,
) -> Result<vk::DescriptorSetLayout> {
    let vk_bindings: Vec<vk::DescriptorSetLayoutBinding> = bindings
        .iter()
        .map(|binding| {
            vk::DescriptorSetLayoutBinding::default()
                .binding(binding.binding)
                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                .descriptor_count(1)
                .stage_flags(shader_stage_to_vk(binding.stage))
        })
        .collect();

    let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&vk_bindings);
    device
        .create_descriptor_set_layout(&create_info, None)
        .map_err(|e| vk_error(log, "Failed to create descriptor set layout", e))
}

unsafe fn create_shader_module(device: &ash::Device, code: &[u32], log: &Log) -> Result<vk::ShaderModule> {
    let create_info = vk::ShaderModuleCreateInfo::default().code(code);
    device
        .create_shader_module(&create_info, None)
        .map_err(|e| vk_error(log, "Failed to create shader module", e))
}

/// Create the pipeline layout and graphics pipeline
///
/// # Returns
///
/// `(pipeline, layout)`; both are destroyed together
pub(crate) unsafe fn create_graphics_pipeline(
    device: &ash::Device,
    desc: &PipelineDesc,
    log: &Log,
) -> Result<(vk::Pipeline, vk::PipelineLayout)> {
    if desc.vertex_spirv.is_empty() || desc.fragment_spirv.is_empty() {
        sandbox_bail!(log, "Pipeline shader code is empty");
    }

    check_uniform_bindings(
        ShaderStage::Vertex,
        &reflect_uniform_buffers(&desc.vertex_spirv, log)?,
        &desc.uniform_bindings,
    )?;
    check_uniform_bindings(
        ShaderStage::Fragment,
        &reflect_uniform_buffers(&desc.fragment_spirv, log)?,
        &desc.uniform_bindings,
    )?;

    let vertex_module = create_shader_module(device, &desc.vertex_spirv, log)?;
    let fragment_module = match create_shader_module(device, &desc.fragment_spirv, log) {
        Ok(module) => module,
        Err(e) => {
            device.destroy_shader_module(vertex_module, None);
            return Err(e);
        }
    };

    let result = build_pipeline(device, desc, vertex_module, fragment_module, log);

    // Modules are not needed once the pipeline exists
    device.destroy_shader_module(vertex_module, None);
    device.destroy_shader_module(fragment_module, None);
    result
}

unsafe fn build_pipeline(
    device: &ash::Device,
    desc: &PipelineDesc,
    vertex_module: vk::ShaderModule,
    fragment_module: vk::ShaderModule,
    log: &Log,
) -> Result<(vk::Pipeline, vk::PipelineLayout)> {
    let set_layouts = [vk::DescriptorSetLayout::from_raw(desc.descriptor_set_layout.as_raw())];
    let layout_info = vk::PipelineLayoutCreateInfo::default().set_layouts(&set_layouts);
    let layout = device
        .create_pipeline_layout(&layout_info, None)
        .map_err(|e| vk_error(log, "Failed to create pipeline layout", e))?;

    let stages = [
        vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::VERTEX)
            .module(vertex_module)
            .name(c"main"),
        vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::FRAGMENT)
            .module(fragment_module)
            .name(c"main"),
    ];

    let vertex_bindings = [vk::VertexInputBindingDescription {
        binding: 0,
        stride: desc.vertex_layout.stride,
        input_rate: vk::VertexInputRate::VERTEX,
    }];
    let vertex_attributes: Vec<vk::VertexInputAttributeDescription> = desc
        .vertex_layout
        .attributes
        .iter()
        .map(|attribute| vk::VertexInputAttributeDescription {
            location: attribute.location,
            binding: 0,
            format: buffer_format_to_vk(attribute.format),
            offset: attribute.offset,
        })
        .collect();
    let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
        .vertex_binding_descriptions(&vertex_bindings)
        .vertex_attribute_descriptions(&vertex_attributes);

    let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
        .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
        .primitive_restart_enable(false);

    // Viewport and scissor are dynamic, only the counts are fixed
    let viewport_state = vk::PipelineViewportStateCreateInfo::default()
        .viewport_count(1)
        .scissor_count(1);

    let rasterization = vk::PipelineRasterizationStateCreateInfo::default()
        .polygon_mode(vk::PolygonMode::FILL)
        .cull_mode(vk::CullModeFlags::BACK)
        .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
        .line_width(1.0);

    let multisample = vk::PipelineMultisampleStateCreateInfo::default()
        .rasterization_samples(vk::SampleCountFlags::TYPE_1);

    let blend_attachments = [vk::PipelineColorBlendAttachmentState::default()
        .color_write_mask(vk::ColorComponentFlags::RGBA)
        .blend_enable(false)];
    let color_blend = vk::PipelineColorBlendStateCreateInfo::default().attachments(&blend_attachments);

    let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
    let dynamic_state = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

    let create_info = vk::GraphicsPipelineCreateInfo::default()
        .stages(&stages)
        .vertex_input_state(&vertex_input)
        .input_assembly_state(&input_assembly)
        .viewport_state(&viewport_state)
        .rasterization_state(&rasterization)
        .multisample_state(&multisample)
        .color_blend_state(&color_blend)
        .dynamic_state(&dynamic_state)
        .layout(layout)
        .render_pass(vk::RenderPass::from_raw(desc.render_pass.as_raw()))
        .subpass(0);

    match device.create_graphics_pipelines(vk::PipelineCache::null(), &[create_info], None) {
        Ok(pipelines) => match pipelines.first() {
            Some(&pipeline) => Ok((pipeline, layout)),
            None => {
                device.destroy_pipeline_layout(layout, None);
                sandbox_bail!(log, "Driver returned no graphics pipeline")
            }
        },
        Err((pipelines, e)) => {
            for pipeline in pipelines {
                if pipeline != vk::Pipeline::null() {
                    device.destroy_pipeline(pipeline, None);
                }
            }
            device.destroy_pipeline_layout(layout, None);
            Err(vk_error(log, "Failed to create graphics pipeline", e))
        }
    }
}

/// Pool holding `max_sets` single-uniform-buffer sets
pub(crate) unsafe fn create_descriptor_pool(
    device: &ash::Device,
    max_sets: u32,
    log: &Log,
) -> Result<vk::DescriptorPool> {
    let pool_sizes = [vk::DescriptorPoolSize {
        ty: vk::DescriptorType::UNIFORM_BUFFER,
        descriptor_count: max_sets,
    }];
    let create_info = vk::DescriptorPoolCreateInfo::default()
        .pool_sizes(&pool_sizes)
        .max_sets(max_sets);

    device
        .create_descriptor_pool(&create_info, None)
        .map_err(|e| vk_error(log, "Failed to create descriptor pool", e))
}

/// Allocate a set and point its binding 0 at `uniform_buffer[0..range]`
pub(crate) unsafe fn allocate_descriptor_set(
    device: &ash::Device,
    pool: vk::DescriptorPool,
    layout: vk::DescriptorSetLayout,
    uniform_buffer: vk::Buffer,
    range: u64,
    log: &Log,
) -> Result<vk::DescriptorSet> {
    let layouts = [layout];
    let allocate_info = vk::DescriptorSetAllocateInfo::default()
        .descriptor_pool(pool)
        .set_layouts(&layouts);

    let set = device
        .allocate_descriptor_sets(&allocate_info)
        .map_err(|e| vk_error(log, "Failed to allocate descriptor set", e))?
        .first()
        .copied()
        .ok_or_else(|| Error::DriverError("Driver returned no descriptor set".to_string()))?;

    let buffer_infos = [vk::DescriptorBufferInfo {
        buffer: uniform_buffer,
        offset: 0,
        range,
    }];
    let writes = [vk::WriteDescriptorSet::default()
        .dst_set(set)
        .dst_binding(0)
        .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
        .buffer_info(&buffer_infos)];
    device.update_descriptor_sets(&writes, &[]);

    Ok(set)
}
