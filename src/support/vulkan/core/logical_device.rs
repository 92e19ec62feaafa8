use crate::vulkan::{CurrentFrameSynchronization, PhysicalDevice};
use ash::{
    extensions::khr::Swapchain,
    version::{DeviceV1_0, InstanceV1_0},
    vk,
};
use log::error;
use snafu::{ResultExt, Snafu};

type Result<T, E = LogicalDeviceError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility = "pub(crate)")]
pub enum LogicalDeviceError {
    #[snafu(display("Failed to create logical device: {}", source))]
    LogicalDeviceCreation { source: ash::vk::Result },

    #[snafu(display("Failed to wait for fence: {}", source))]
    WaitForFence { source: ash::vk::Result },

    #[snafu(display("Failed to reset fence: {}", source))]
    ResetFence { source: ash::vk::Result },
}

pub struct LogicalDevice {
    logical_device: ash::Device,
}

impl LogicalDevice {
    pub fn new(instance: &ash::Instance, physical_device: &PhysicalDevice) -> Result<Self> {
        let queue_priorities = [1.0];
        let queue_create_infos = physical_device
            .queue_family_index_set()
            .unique_indices()
            .into_iter()
            .map(|index| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(index)
                    .queue_priorities(&queue_priorities)
                    .build()
            })
            .collect::<Vec<_>>();

        let device_extensions = [Swapchain::name().as_ptr()];

        let device_features = vk::PhysicalDeviceFeatures::builder()
            .sampler_anisotropy(physical_device.sampler_anisotropy_supported())
            .shader_sampled_image_array_dynamic_indexing(true)
            .build();

        let mut indexing_features = vk::PhysicalDeviceDescriptorIndexingFeatures::builder()
            .descriptor_binding_partially_bound(true)
            .descriptor_binding_variable_descriptor_count(true)
            .build();

        let device_create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&device_extensions)
            .enabled_features(&device_features)
            .push_next(&mut indexing_features)
            .build();

        let logical_device = unsafe {
            instance
                .create_device(
                    physical_device.physical_device(),
                    &device_create_info,
                    None,
                )
                .context(LogicalDeviceCreation)?
        };

        Ok(Self { logical_device })
    }

    pub fn logical_device(&self) -> &ash::Device {
        &self.logical_device
    }

    pub fn wait_idle(&self) {
        if let Err(error) = unsafe { self.logical_device.device_wait_idle() } {
            error!("Failed to wait for the logical device to go idle: {}", error);
        }
    }

    pub fn wait_for_fence(&self, synchronization: &CurrentFrameSynchronization) -> Result<()> {
        let fences = [synchronization.in_flight()];
        unsafe {
            self.logical_device
                .wait_for_fences(&fences, true, std::u64::MAX)
                .context(WaitForFence)
        }
    }

    pub fn reset_fence(&self, synchronization: &CurrentFrameSynchronization) -> Result<()> {
        let fences = [synchronization.in_flight()];
        unsafe {
            self.logical_device
                .reset_fences(&fences)
                .context(ResetFence)
        }
    }
}

impl Drop for LogicalDevice {
    fn drop(&mut self) {
        unsafe {
            self.logical_device.destroy_device(None);
        }
    }
}
