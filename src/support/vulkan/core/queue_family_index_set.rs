use crate::vulkan::Surface;
use ash::{version::InstanceV1_0, vk};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilyIndexSet {
    graphics: u32,
    present: u32,
}

impl QueueFamilyIndexSet {
    pub fn new(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        surface: &Surface,
    ) -> Option<Self> {
        let properties =
            unsafe { instance.get_physical_device_queue_family_properties(physical_device) };

        let mut graphics = None;
        let mut present = None;

        for (index, family) in properties.iter().enumerate() {
            if family.queue_count == 0 {
                continue;
            }
            let index = index as u32;

            if graphics.is_none() && family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
                graphics = Some(index);
            }

            let present_support = unsafe {
                surface
                    .surface()
                    .get_physical_device_surface_support(
                        physical_device,
                        index,
                        surface.surface_khr(),
                    )
                    .unwrap_or(false)
            };

            if present.is_none() && present_support {
                present = Some(index);
            }

            if graphics.is_some() && present.is_some() {
                break;
            }
        }

        match (graphics, present) {
            (Some(graphics), Some(present)) => Some(Self { graphics, present }),
            _ => None,
        }
    }

    pub fn graphics_queue_family_index(&self) -> u32 {
        self.graphics
    }

    pub fn present_queue_family_index(&self) -> u32 {
        self.present
    }

    pub fn unique_indices(&self) -> Vec<u32> {
        let mut indices = vec![self.graphics, self.present];
        indices.dedup();
        indices
    }
}
