use crate::vulkan::VulkanContext;
use ash::{version::DeviceV1_0, vk};
use snafu::{ResultExt, Snafu};
use std::sync::Arc;

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility = "pub(crate)")]
pub enum Error {
    #[snafu(display("Failed to create descriptor pool: {}", source))]
    CreateDescriptorPool { source: ash::vk::Result },

    #[snafu(display("Failed to allocate descriptor sets: {}", source))]
    AllocateDescriptorSets { source: ash::vk::Result },
}

pub struct DescriptorPool {
    pool: vk::DescriptorPool,
    context: Arc<VulkanContext>,
}

impl DescriptorPool {
    pub fn new(context: Arc<VulkanContext>, pool_info: vk::DescriptorPoolCreateInfo) -> Result<Self> {
        let pool = unsafe {
            context
                .device()
                .create_descriptor_pool(&pool_info, None)
                .context(CreateDescriptorPool)?
        };
        Ok(Self { pool, context })
    }

    pub fn allocate_descriptor_sets(
        &self,
        layout: vk::DescriptorSetLayout,
        number_of_sets: u32,
    ) -> Result<Vec<vk::DescriptorSet>> {
        let layouts = (0..number_of_sets).map(|_| layout).collect::<Vec<_>>();
        let allocation_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(self.pool)
            .set_layouts(&layouts)
            .build();
        unsafe {
            self.context
                .device()
                .allocate_descriptor_sets(&allocation_info)
                .context(AllocateDescriptorSets)
        }
    }

    /// Allocates one set whose last binding is sized at allocation time.
    pub fn allocate_variable_descriptor_set(
        &self,
        layout: vk::DescriptorSetLayout,
        descriptor_count: u32,
    ) -> Result<vk::DescriptorSet> {
        let layouts = [layout];
        let descriptor_counts = [descriptor_count];
        let mut variable_count_info = vk::DescriptorSetVariableDescriptorCountAllocateInfo::builder()
            .descriptor_counts(&descriptor_counts)
            .build();
        let allocation_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(self.pool)
            .set_layouts(&layouts)
            .push_next(&mut variable_count_info)
            .build();
        let sets = unsafe {
            self.context
                .device()
                .allocate_descriptor_sets(&allocation_info)
                .context(AllocateDescriptorSets)?
        };
        Ok(sets[0])
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        unsafe {
            self.context
                .device()
                .destroy_descriptor_pool(self.pool, None);
        }
    }
}
