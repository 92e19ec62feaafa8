use crate::vulkan::{
    core::{pipeline, pipeline_layout},
    DescriptorSetLayout, GraphicsPipeline, PipelineLayout, RenderPass, ShaderSet, VulkanContext,
};
use ash::{version::DeviceV1_0, vk};
use derive_builder::Builder;
use snafu::{ResultExt, Snafu};
use std::sync::Arc;

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility = "pub(crate)")]
pub enum Error {
    #[snafu(display("Failed to create pipeline layout: {}", source))]
    CreatePipelineLayout { source: pipeline_layout::Error },

    #[snafu(display("Failed to create graphics pipeline: {}", source))]
    CreatePipeline { source: pipeline::Error },
}

#[derive(Builder, Clone)]
#[builder(setter(into))]
pub struct RenderPipelineSettings {
    pub render_pass: Arc<RenderPass>,
    pub vertex_inputs: Vec<vk::VertexInputBindingDescription>,
    pub vertex_attributes: Vec<vk::VertexInputAttributeDescription>,
    pub descriptor_set_layouts: Vec<Arc<DescriptorSetLayout>>,
    pub shader_set: ShaderSet,

    #[builder(default = "vk::CullModeFlags::BACK")]
    pub cull_mode: vk::CullModeFlags,

    #[builder(default = "vk::FrontFace::COUNTER_CLOCKWISE")]
    pub front_face: vk::FrontFace,

    #[builder(default = "true")]
    pub depth_test_enabled: bool,

    #[builder(default = "true")]
    pub depth_write_enabled: bool,

    #[builder(default = "vk::CompareOp::LESS")]
    pub depth_compare_op: vk::CompareOp,

    #[builder(default = "false")]
    pub blended: bool,
}

pub struct RenderPipeline {
    pub pipeline: GraphicsPipeline,
    pub settings: RenderPipelineSettings,
}

impl RenderPipeline {
    pub fn new(context: Arc<VulkanContext>, settings: RenderPipelineSettings) -> Result<Self> {
        let shader_state_info = settings.shader_set.stages();

        let vertex_state_info = vk::PipelineVertexInputStateCreateInfo::builder()
            .vertex_binding_descriptions(&settings.vertex_inputs)
            .vertex_attribute_descriptions(&settings.vertex_attributes)
            .build();

        let input_assembly_create_info = vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false)
            .build();

        let rasterizer_create_info = vk::PipelineRasterizationStateCreateInfo::builder()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(settings.cull_mode)
            .front_face(settings.front_face)
            .depth_bias_enable(false)
            .depth_bias_constant_factor(0.0)
            .depth_bias_clamp(0.0)
            .depth_bias_slope_factor(0.0)
            .build();

        let multisampling_create_info = vk::PipelineMultisampleStateCreateInfo::builder()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1)
            .min_sample_shading(1.0)
            .alpha_to_coverage_enable(false)
            .alpha_to_one_enable(false)
            .build();

        let depth_stencil_info = vk::PipelineDepthStencilStateCreateInfo::builder()
            .depth_test_enable(settings.depth_test_enabled)
            .depth_write_enable(settings.depth_write_enabled)
            .depth_compare_op(settings.depth_compare_op)
            .depth_bounds_test_enable(false)
            .min_depth_bounds(0.0)
            .max_depth_bounds(1.0)
            .stencil_test_enable(false)
            .front(Default::default())
            .back(Default::default())
            .build();

        let color_blend_attachments = Self::create_color_blend_attachments(settings.blended);

        let color_blending_info = vk::PipelineColorBlendStateCreateInfo::builder()
            .logic_op_enable(false)
            .logic_op(vk::LogicOp::COPY)
            .attachments(&color_blend_attachments)
            .blend_constants([0.0, 0.0, 0.0, 0.0])
            .build();

        let pipeline_layout =
            Self::create_pipeline_layout(context.clone(), &settings.descriptor_set_layouts)?;

        let viewport_create_info = vk::PipelineViewportStateCreateInfo::builder()
            .viewport_count(1)
            .scissor_count(1)
            .build();

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state_create_info = vk::PipelineDynamicStateCreateInfo::builder()
            .flags(vk::PipelineDynamicStateCreateFlags::empty())
            .dynamic_states(&dynamic_states)
            .build();

        let pipeline_create_info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(&shader_state_info)
            .vertex_input_state(&vertex_state_info)
            .input_assembly_state(&input_assembly_create_info)
            .rasterization_state(&rasterizer_create_info)
            .multisample_state(&multisampling_create_info)
            .depth_stencil_state(&depth_stencil_info)
            .color_blend_state(&color_blending_info)
            .viewport_state(&viewport_create_info)
            .dynamic_state(&dynamic_state_create_info)
            .layout(pipeline_layout.layout())
            .render_pass(settings.render_pass.render_pass())
            .subpass(0)
            .build();

        let pipeline = GraphicsPipeline::new(context, pipeline_create_info, pipeline_layout)
            .context(CreatePipeline)?;

        Ok(Self { pipeline, settings })
    }

    pub fn create_color_blend_attachments(
        blended: bool,
    ) -> [vk::PipelineColorBlendAttachmentState; 1] {
        let color_blend_attachment = vk::PipelineColorBlendAttachmentState::builder()
            .color_write_mask(vk::ColorComponentFlags::all())
            .blend_enable(blended)
            .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
            .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
            .color_blend_op(vk::BlendOp::ADD)
            .src_alpha_blend_factor(vk::BlendFactor::ONE)
            .dst_alpha_blend_factor(vk::BlendFactor::ZERO)
            .alpha_blend_op(vk::BlendOp::ADD)
            .build();
        [color_blend_attachment]
    }

    pub fn create_pipeline_layout(
        context: Arc<VulkanContext>,
        descriptor_set_layouts: &[Arc<DescriptorSetLayout>],
    ) -> Result<PipelineLayout> {
        let descriptor_set_layouts = descriptor_set_layouts
            .iter()
            .map(|layout| layout.layout())
            .collect::<Vec<_>>();

        let pipeline_layout_create_info = vk::PipelineLayoutCreateInfo::builder()
            .set_layouts(&descriptor_set_layouts)
            .build();

        PipelineLayout::new(context, pipeline_layout_create_info).context(CreatePipelineLayout)
    }

    pub fn bind(&self, device: &ash::Device, command_buffer: vk::CommandBuffer) {
        unsafe {
            device.cmd_bind_pipeline(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                self.pipeline.pipeline(),
            );
        }
    }
}
