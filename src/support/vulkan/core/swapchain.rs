use crate::vulkan::{CurrentFrameSynchronization, VulkanContext};
use ash::{extensions::khr::Swapchain as SwapchainLoader, vk};
use log::debug;
use snafu::{ResultExt, Snafu};
use std::sync::Arc;

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility = "pub(crate)")]
pub enum Error {
    #[snafu(display("Failed to query surface capabilities: {}", source))]
    SurfaceCapabilities { source: ash::vk::Result },

    #[snafu(display("Failed to query surface formats: {}", source))]
    SurfaceFormats { source: ash::vk::Result },

    #[snafu(display("Failed to query surface present modes: {}", source))]
    SurfacePresentModes { source: ash::vk::Result },

    #[snafu(display("Failed to create swapchain: {}", source))]
    CreateSwapchain { source: ash::vk::Result },

    #[snafu(display("Failed to get swapchain images: {}", source))]
    GetSwapchainImages { source: ash::vk::Result },

    #[snafu(display("The surface reported no formats"))]
    NoSurfaceFormats,
}

#[derive(Debug, Clone, Copy)]
pub struct SwapchainProperties {
    pub format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
}

impl SwapchainProperties {
    pub fn aspect_ratio(&self) -> f32 {
        let height = if self.extent.height == 0 {
            1
        } else {
            self.extent.height
        };
        self.extent.width as f32 / height as f32
    }

    fn choose_surface_format(available_formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
        let preferred = vk::SurfaceFormatKHR {
            format: vk::Format::B8G8R8A8_UNORM,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        };

        // A lone UNDEFINED entry means any format may be used
        if available_formats.len() == 1 && available_formats[0].format == vk::Format::UNDEFINED {
            return Some(preferred);
        }

        available_formats
            .iter()
            .copied()
            .find(|format| {
                format.format == preferred.format && format.color_space == preferred.color_space
            })
            .or_else(|| available_formats.first().copied())
    }

    fn choose_present_mode(available_present_modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
        if available_present_modes.contains(&vk::PresentModeKHR::MAILBOX) {
            vk::PresentModeKHR::MAILBOX
        } else {
            vk::PresentModeKHR::FIFO
        }
    }

    fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, dimensions: [u32; 2]) -> vk::Extent2D {
        if capabilities.current_extent.width != std::u32::MAX {
            return capabilities.current_extent;
        }

        let min = capabilities.min_image_extent;
        let max = capabilities.max_image_extent;
        vk::Extent2D {
            width: dimensions[0].max(min.width).min(max.width),
            height: dimensions[1].max(min.height).min(max.height),
        }
    }
}

pub struct Swapchain {
    swapchain: SwapchainLoader,
    swapchain_khr: vk::SwapchainKHR,
    properties: SwapchainProperties,
    images: Vec<vk::Image>,
    _context: Arc<VulkanContext>,
}

impl Swapchain {
    pub fn new(context: Arc<VulkanContext>, dimensions: [u32; 2]) -> Result<Self> {
        let physical_device = context.physical_device().physical_device();
        let surface = context.surface();

        let capabilities = unsafe {
            surface
                .surface()
                .get_physical_device_surface_capabilities(physical_device, surface.surface_khr())
                .context(SurfaceCapabilities)?
        };
        let formats = unsafe {
            surface
                .surface()
                .get_physical_device_surface_formats(physical_device, surface.surface_khr())
                .context(SurfaceFormats)?
        };
        let present_modes = unsafe {
            surface
                .surface()
                .get_physical_device_surface_present_modes(physical_device, surface.surface_khr())
                .context(SurfacePresentModes)?
        };

        let properties = SwapchainProperties {
            format: SwapchainProperties::choose_surface_format(&formats)
                .ok_or(Error::NoSurfaceFormats)?,
            present_mode: SwapchainProperties::choose_present_mode(&present_modes),
            extent: SwapchainProperties::choose_extent(&capabilities, dimensions),
        };

        let image_count = {
            let max = capabilities.max_image_count;
            let preferred = capabilities.min_image_count + 1;
            if max > 0 && preferred > max {
                max
            } else {
                preferred
            }
        };

        debug!(
            "Creating swapchain: {:?}, {:?}, {}x{}, {} images",
            properties.format.format,
            properties.present_mode,
            properties.extent.width,
            properties.extent.height,
            image_count
        );

        let queue_family_index_set = context.physical_device().queue_family_index_set();
        let family_indices = queue_family_index_set.unique_indices();

        let mut swapchain_create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(surface.surface_khr())
            .min_image_count(image_count)
            .image_format(properties.format.format)
            .image_color_space(properties.format.color_space)
            .image_extent(properties.extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(properties.present_mode)
            .clipped(true);

        swapchain_create_info = if family_indices.len() > 1 {
            swapchain_create_info
                .image_sharing_mode(vk::SharingMode::CONCURRENT)
                .queue_family_indices(&family_indices)
        } else {
            swapchain_create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        };

        let swapchain = SwapchainLoader::new(context.instance(), context.device());
        let swapchain_khr = unsafe {
            swapchain
                .create_swapchain(&swapchain_create_info, None)
                .context(CreateSwapchain)?
        };

        let images = unsafe {
            swapchain
                .get_swapchain_images(swapchain_khr)
                .context(GetSwapchainImages)?
        };

        Ok(Self {
            swapchain,
            swapchain_khr,
            properties,
            images,
            _context: context,
        })
    }

    pub fn properties(&self) -> &SwapchainProperties {
        &self.properties
    }

    pub fn images(&self) -> &[vk::Image] {
        &self.images
    }

    pub fn acquire_next_image(
        &self,
        semaphore: vk::Semaphore,
        fence: vk::Fence,
    ) -> ash::prelude::VkResult<(u32, bool)> {
        unsafe {
            self.swapchain
                .acquire_next_image(self.swapchain_khr, std::u64::MAX, semaphore, fence)
        }
    }

    pub fn present_rendered_image(
        &self,
        synchronization: &CurrentFrameSynchronization,
        image_indices: &[u32],
        queue: vk::Queue,
    ) -> ash::prelude::VkResult<bool> {
        let wait_semaphores = [synchronization.render_finished()];
        let swapchains = [self.swapchain_khr];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(image_indices)
            .build();

        unsafe { self.swapchain.queue_present(queue, &present_info) }
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            self.swapchain.destroy_swapchain(self.swapchain_khr, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn properties(width: u32, height: u32) -> SwapchainProperties {
        SwapchainProperties {
            format: vk::SurfaceFormatKHR::default(),
            present_mode: vk::PresentModeKHR::FIFO,
            extent: vk::Extent2D { width, height },
        }
    }

    #[test]
    fn aspect_ratio_is_width_over_height() {
        assert_relative_eq!(properties(800, 600).aspect_ratio(), 800.0 / 600.0);
    }

    #[test]
    fn aspect_ratio_survives_minimized_window() {
        assert_relative_eq!(properties(800, 0).aspect_ratio(), 800.0);
    }

    #[test]
    fn undefined_surface_format_picks_preferred() {
        let formats = [vk::SurfaceFormatKHR {
            format: vk::Format::UNDEFINED,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }];
        let chosen = SwapchainProperties::choose_surface_format(&formats).unwrap();
        assert_eq!(chosen.format, vk::Format::B8G8R8A8_UNORM);
    }

    #[test]
    fn surface_format_falls_back_to_first() {
        let formats = [vk::SurfaceFormatKHR {
            format: vk::Format::R8G8B8A8_SRGB,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }];
        let chosen = SwapchainProperties::choose_surface_format(&formats).unwrap();
        assert_eq!(chosen.format, vk::Format::R8G8B8A8_SRGB);
        assert!(SwapchainProperties::choose_surface_format(&[]).is_none());
    }

    #[test]
    fn mailbox_is_preferred_over_fifo() {
        let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX];
        assert_eq!(
            SwapchainProperties::choose_present_mode(&modes),
            vk::PresentModeKHR::MAILBOX
        );
        assert_eq!(
            SwapchainProperties::choose_present_mode(&[vk::PresentModeKHR::FIFO]),
            vk::PresentModeKHR::FIFO
        );
    }

    #[test]
    fn extent_is_clamped_when_surface_leaves_it_open() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: std::u32::MAX,
                height: std::u32::MAX,
            },
            min_image_extent: vk::Extent2D {
                width: 16,
                height: 16,
            },
            max_image_extent: vk::Extent2D {
                width: 1024,
                height: 1024,
            },
            ..Default::default()
        };
        let extent = SwapchainProperties::choose_extent(&capabilities, [4000, 8]);
        assert_eq!(extent.width, 1024);
        assert_eq!(extent.height, 16);
    }
}
