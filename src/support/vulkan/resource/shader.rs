use crate::vulkan::VulkanContext;
use ash::{version::DeviceV1_0, vk};
use derive_builder::Builder;
use snafu::{ResultExt, Snafu};
use std::{ffi::CString, sync::Arc};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility = "pub(crate)")]
pub enum Error {
    #[snafu(display("Failed to create shader module: {}", source))]
    CreateShaderModule { source: ash::vk::Result },

    #[snafu(display("Invalid shader entry point name: {}", source))]
    EntryPointName { source: std::ffi::NulError },
}

#[derive(Builder, Clone)]
#[builder(pattern = "owned")]
pub struct ShaderSet {
    pub vertex_shader: Arc<Shader>,
    pub fragment_shader: Arc<Shader>,
}

impl ShaderSet {
    pub fn stages(&self) -> [vk::PipelineShaderStageCreateInfo; 2] {
        [
            self.vertex_shader.state_info(),
            self.fragment_shader.state_info(),
        ]
    }
}

pub struct Shader {
    module: vk::ShaderModule,
    stage: vk::ShaderStageFlags,
    // The stage create info points into this buffer
    entry_point_name: CString,
    context: Arc<VulkanContext>,
}

impl Shader {
    pub const ENTRY_POINT_NAME: &'static str = "main";

    pub fn from_spirv(
        context: Arc<VulkanContext>,
        words: &[u32],
        stage: vk::ShaderStageFlags,
    ) -> Result<Self> {
        let entry_point_name = CString::new(Self::ENTRY_POINT_NAME).context(EntryPointName)?;

        let shader_create_info = vk::ShaderModuleCreateInfo::builder().code(words).build();
        let module = unsafe {
            context
                .device()
                .create_shader_module(&shader_create_info, None)
                .context(CreateShaderModule)?
        };

        Ok(Self {
            module,
            stage,
            entry_point_name,
            context,
        })
    }

    pub fn state_info(&self) -> vk::PipelineShaderStageCreateInfo {
        vk::PipelineShaderStageCreateInfo::builder()
            .stage(self.stage)
            .module(self.module)
            .name(&self.entry_point_name)
            .build()
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        unsafe {
            self.context
                .device()
                .destroy_shader_module(self.module, None);
        }
    }
}
