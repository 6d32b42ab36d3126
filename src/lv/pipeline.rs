use crate::error::{Result, VkResultExt};
use crate::lv;
use ash::vk;
use std::ffi::CStr;
use std::ptr;
use std::sync::Arc;

const ENTRY_POINT: &CStr = unsafe { CStr::from_bytes_with_nul_unchecked(b"main\0") };

/// Owns every array the create-info structs point into; pointers are only taken in `build`.
pub struct PipelineBuilder {
    shader_stages: Vec<(vk::ShaderModule, vk::ShaderStageFlags)>,
    vertex_bindings: Vec<vk::VertexInputBindingDescription>,
    vertex_attributes: Vec<vk::VertexInputAttributeDescription>,
    pub topology: vk::PrimitiveTopology,
    pub polygon_mode: vk::PolygonMode,
    pub cull_mode: vk::CullModeFlags,
    pub front_face: vk::FrontFace,
    pub color_blend_attachment: vk::PipelineColorBlendAttachmentState,
    dynamic_states: Vec<vk::DynamicState>,
    set_layouts: Vec<vk::DescriptorSetLayout>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        PipelineBuilder {
            shader_stages: Vec::new(),
            vertex_bindings: Vec::new(),
            vertex_attributes: Vec::new(),
            topology: vk::PrimitiveTopology::TRIANGLE_LIST,
            polygon_mode: vk::PolygonMode::FILL,
            cull_mode: vk::CullModeFlags::NONE,
            front_face: vk::FrontFace::CLOCKWISE,
            color_blend_attachment: vk::PipelineColorBlendAttachmentState {
                color_write_mask: vk::ColorComponentFlags::R
                    | vk::ColorComponentFlags::G
                    | vk::ColorComponentFlags::B
                    | vk::ColorComponentFlags::A,
                blend_enable: vk::FALSE,
                src_color_blend_factor: vk::BlendFactor::ONE,
                dst_color_blend_factor: vk::BlendFactor::ZERO,
                color_blend_op: vk::BlendOp::ADD,
                src_alpha_blend_factor: vk::BlendFactor::ONE,
                dst_alpha_blend_factor: vk::BlendFactor::ZERO,
                alpha_blend_op: vk::BlendOp::ADD,
            },
            dynamic_states: vec![vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR],
            set_layouts: Vec::new(),
        }
    }

    pub fn add_shader(mut self, shader: &lv::Shader) -> Self {
        self.shader_stages.push((shader.handle, shader.stage));
        self
    }

    pub fn set_vertex_input(
        mut self,
        bindings: Vec<vk::VertexInputBindingDescription>,
        attributes: Vec<vk::VertexInputAttributeDescription>,
    ) -> Self {
        self.vertex_bindings = bindings;
        self.vertex_attributes = attributes;
        self
    }

    pub fn add_set_layout(mut self, layout: vk::DescriptorSetLayout) -> Self {
        self.set_layouts.push(layout);
        self
    }

    /// Viewport and scissor are always dynamic; the counts are fixed at one each.
    pub fn build(self, device: Arc<lv::Device>, render_pass: &lv::RenderPass) -> Result<Pipeline> {
        Pipeline::from_builder(self, device, render_pass)
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Pipeline {
    pub handle: vk::Pipeline,
    pub layout: vk::PipelineLayout,

    // Reference-counting
    device: Arc<lv::Device>,
}

impl Pipeline {
    fn from_builder(
        builder: PipelineBuilder,
        device: Arc<lv::Device>,
        render_pass: &lv::RenderPass,
    ) -> Result<Self> {
        let layout_ci = vk::PipelineLayoutCreateInfo {
            s_type: vk::StructureType::PIPELINE_LAYOUT_CREATE_INFO,
            set_layout_count: builder.set_layouts.len() as u32,
            p_set_layouts: builder.set_layouts.as_ptr(),
            push_constant_range_count: 0,
            p_push_constant_ranges: ptr::null(),
            ..Default::default()
        };
        let layout = unsafe { device.handle.create_pipeline_layout(&layout_ci, None) }
            .check("vkCreatePipelineLayout")?;
        // From here on the layout is released by Drop if pipeline creation fails.
        let mut pipeline = Pipeline {
            handle: vk::Pipeline::null(),
            layout,
            device,
        };

        let stages: Vec<vk::PipelineShaderStageCreateInfo> = builder
            .shader_stages
            .iter()
            .map(|(module, stage)| vk::PipelineShaderStageCreateInfo {
                s_type: vk::StructureType::PIPELINE_SHADER_STAGE_CREATE_INFO,
                stage: *stage,
                module: *module,
                p_name: ENTRY_POINT.as_ptr(),
                ..Default::default()
            })
            .collect();

        let vertex_input = vk::PipelineVertexInputStateCreateInfo {
            s_type: vk::StructureType::PIPELINE_VERTEX_INPUT_STATE_CREATE_INFO,
            vertex_binding_description_count: builder.vertex_bindings.len() as u32,
            p_vertex_binding_descriptions: builder.vertex_bindings.as_ptr(),
            vertex_attribute_description_count: builder.vertex_attributes.len() as u32,
            p_vertex_attribute_descriptions: builder.vertex_attributes.as_ptr(),
            ..Default::default()
        };
        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo {
            s_type: vk::StructureType::PIPELINE_INPUT_ASSEMBLY_STATE_CREATE_INFO,
            topology: builder.topology,
            primitive_restart_enable: vk::FALSE,
            ..Default::default()
        };
        let viewport_state = vk::PipelineViewportStateCreateInfo {
            s_type: vk::StructureType::PIPELINE_VIEWPORT_STATE_CREATE_INFO,
            viewport_count: 1,
            p_viewports: ptr::null(),
            scissor_count: 1,
            p_scissors: ptr::null(),
            ..Default::default()
        };
        let rasterizer = vk::PipelineRasterizationStateCreateInfo {
            s_type: vk::StructureType::PIPELINE_RASTERIZATION_STATE_CREATE_INFO,
            rasterizer_discard_enable: vk::FALSE,
            polygon_mode: builder.polygon_mode,
            line_width: 1.0f32,
            cull_mode: builder.cull_mode,
            front_face: builder.front_face,
            depth_bias_enable: vk::FALSE,
            ..Default::default()
        };
        let multisampling = vk::PipelineMultisampleStateCreateInfo {
            s_type: vk::StructureType::PIPELINE_MULTISAMPLE_STATE_CREATE_INFO,
            rasterization_samples: vk::SampleCountFlags::TYPE_1,
            ..Default::default()
        };
        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo {
            s_type: vk::StructureType::PIPELINE_DEPTH_STENCIL_STATE_CREATE_INFO,
            ..Default::default()
        };
        let color_blending = vk::PipelineColorBlendStateCreateInfo {
            s_type: vk::StructureType::PIPELINE_COLOR_BLEND_STATE_CREATE_INFO,
            logic_op_enable: vk::FALSE,
            logic_op: vk::LogicOp::COPY,
            attachment_count: 1,
            p_attachments: &builder.color_blend_attachment,
            blend_constants: [0.0f32; 4],
            ..Default::default()
        };
        let dynamic_state = vk::PipelineDynamicStateCreateInfo {
            s_type: vk::StructureType::PIPELINE_DYNAMIC_STATE_CREATE_INFO,
            dynamic_state_count: builder.dynamic_states.len() as u32,
            p_dynamic_states: builder.dynamic_states.as_ptr(),
            ..Default::default()
        };

        let pipeline_ci = vk::GraphicsPipelineCreateInfo {
            s_type: vk::StructureType::GRAPHICS_PIPELINE_CREATE_INFO,
            stage_count: stages.len() as u32,
            p_stages: stages.as_ptr(),
            p_vertex_input_state: &vertex_input,
            p_input_assembly_state: &input_assembly,
            p_viewport_state: &viewport_state,
            p_rasterization_state: &rasterizer,
            p_multisample_state: &multisampling,
            p_depth_stencil_state: &depth_stencil,
            p_color_blend_state: &color_blending,
            p_dynamic_state: &dynamic_state,
            layout: pipeline.layout,
            render_pass: render_pass.handle,
            subpass: 0,
            ..Default::default()
        };

        let pipelines = unsafe {
            pipeline.device.handle.create_graphics_pipelines(
                vk::PipelineCache::null(),
                &[pipeline_ci],
                None,
            )
        }
        .map_err(|(_, result)| result)
        .check("vkCreateGraphicsPipelines")?;
        pipeline.handle = pipelines[0];

        Ok(pipeline)
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.handle.destroy_pipeline(self.handle, None);
            self.device
                .handle
                .destroy_pipeline_layout(self.layout, None);
        }
    }
}
