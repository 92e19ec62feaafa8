use crate::vulkan::{PipelineLayout, VulkanContext};
use ash::{version::DeviceV1_0, vk};
use snafu::Snafu;
use std::sync::Arc;

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility = "pub(crate)")]
pub enum Error {
    #[snafu(display("Failed to create graphics pipeline: {}", result))]
    CreateGraphicsPipeline { result: ash::vk::Result },
}

// The pipeline is declared first so it is destroyed before its layout
pub struct GraphicsPipeline {
    pipeline: vk::Pipeline,
    layout: PipelineLayout,
    context: Arc<VulkanContext>,
}

impl GraphicsPipeline {
    pub fn new(
        context: Arc<VulkanContext>,
        create_info: vk::GraphicsPipelineCreateInfo,
        layout: PipelineLayout,
    ) -> Result<Self> {
        let pipeline_create_infos = [create_info];

        let pipelines = unsafe {
            context.device().create_graphics_pipelines(
                vk::PipelineCache::null(),
                &pipeline_create_infos,
                None,
            )
        }
        .map_err(|(_, result)| Error::CreateGraphicsPipeline { result })?;

        Ok(Self {
            pipeline: pipelines[0],
            layout,
            context,
        })
    }

    pub fn pipeline(&self) -> vk::Pipeline {
        self.pipeline
    }

    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout.layout()
    }
}

impl Drop for GraphicsPipeline {
    fn drop(&mut self) {
        unsafe {
            self.context.device().destroy_pipeline(self.pipeline, None);
        }
    }
}
