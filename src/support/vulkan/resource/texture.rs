use crate::vulkan::{
    core::image_view, resource::buffer, resource::command_pool, Buffer, CommandPool, ImageView,
    VulkanContext,
};
use ash::{version::DeviceV1_0, vk};
use log::{debug, warn};
use snafu::{ResultExt, Snafu};
use std::sync::Arc;

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility = "pub(crate)")]
pub enum Error {
    #[snafu(display("Failed to create image: {}", source))]
    CreateImage { source: vk_mem::Error },

    #[snafu(display("Failed to create staging buffer for texture: {}", source))]
    StagingBuffer { source: buffer::Error },

    #[snafu(display("Failed to run texture transfer commands: {}", source))]
    TransferCommands { source: command_pool::Error },

    #[snafu(display("Failed to create texture view: {}", source))]
    CreateView { source: image_view::Error },

    #[snafu(display(
        "Texture data has {} bytes but a {}x{} {:?} image needs {}",
        actual,
        width,
        height,
        format,
        expected
    ))]
    PixelDataSize {
        actual: usize,
        expected: usize,
        width: u32,
        height: u32,
        format: vk::Format,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct ImageLayoutTransition {
    pub old_layout: vk::ImageLayout,
    pub new_layout: vk::ImageLayout,
    pub src_access_mask: vk::AccessFlags,
    pub dst_access_mask: vk::AccessFlags,
    pub src_stage_mask: vk::PipelineStageFlags,
    pub dst_stage_mask: vk::PipelineStageFlags,
}

impl ImageLayoutTransition {
    pub fn undefined_to_transfer_destination() -> Self {
        Self {
            old_layout: vk::ImageLayout::UNDEFINED,
            new_layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            src_access_mask: vk::AccessFlags::empty(),
            dst_access_mask: vk::AccessFlags::TRANSFER_WRITE,
            src_stage_mask: vk::PipelineStageFlags::TOP_OF_PIPE,
            dst_stage_mask: vk::PipelineStageFlags::TRANSFER,
        }
    }

    pub fn transfer_destination_to_source() -> Self {
        Self {
            old_layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            new_layout: vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            src_access_mask: vk::AccessFlags::TRANSFER_WRITE,
            dst_access_mask: vk::AccessFlags::TRANSFER_READ,
            src_stage_mask: vk::PipelineStageFlags::TRANSFER,
            dst_stage_mask: vk::PipelineStageFlags::TRANSFER,
        }
    }

    pub fn transfer_source_to_shader_read() -> Self {
        Self {
            old_layout: vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            new_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            src_access_mask: vk::AccessFlags::TRANSFER_READ,
            dst_access_mask: vk::AccessFlags::SHADER_READ,
            src_stage_mask: vk::PipelineStageFlags::TRANSFER,
            dst_stage_mask: vk::PipelineStageFlags::FRAGMENT_SHADER,
        }
    }

    pub fn transfer_destination_to_shader_read() -> Self {
        Self {
            old_layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            new_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            src_access_mask: vk::AccessFlags::TRANSFER_WRITE,
            dst_access_mask: vk::AccessFlags::SHADER_READ,
            src_stage_mask: vk::PipelineStageFlags::TRANSFER,
            dst_stage_mask: vk::PipelineStageFlags::FRAGMENT_SHADER,
        }
    }
}

/// Decoded pixels of one image, ready to be uploaded.
#[derive(Debug, Clone)]
pub struct TextureDescription {
    pub format: vk::Format,
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
    pub pixels: Vec<u8>,
}

impl TextureDescription {
    /// Optimal tiling features needed to build the mip chain by blitting.
    pub fn mipmap_features() -> vk::FormatFeatureFlags {
        vk::FormatFeatureFlags::BLIT_SRC
            | vk::FormatFeatureFlags::BLIT_DST
            | vk::FormatFeatureFlags::SAMPLED_IMAGE_FILTER_LINEAR
    }

    pub fn new(format: vk::Format, width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            format,
            width,
            height,
            mip_levels: Self::calculate_mip_levels(width, height),
            pixels,
        }
    }

    pub fn calculate_mip_levels(width: u32, height: u32) -> u32 {
        let largest = width.max(height).max(1);
        // floor(log2(n)) + 1
        32 - largest.leading_zeros()
    }

    pub fn bytes_per_pixel(format: vk::Format) -> usize {
        match format {
            vk::Format::R16G16B16A16_UNORM | vk::Format::R16G16B16A16_SFLOAT => 8,
            _ => 4,
        }
    }

    fn expected_size(&self) -> usize {
        self.width as usize * self.height as usize * Self::bytes_per_pixel(self.format)
    }
}

pub struct Texture {
    image: vk::Image,
    allocation: vk_mem::Allocation,
    context: Arc<VulkanContext>,
}

impl Texture {
    pub fn new(
        context: Arc<VulkanContext>,
        allocation_create_info: &vk_mem::AllocationCreateInfo,
        image_create_info: &vk::ImageCreateInfo,
    ) -> Result<Self> {
        let (image, allocation, _allocation_info) = context
            .allocator()
            .create_image(image_create_info, allocation_create_info)
            .context(CreateImage)?;

        Ok(Self {
            image,
            allocation,
            context,
        })
    }

    pub fn image(&self) -> vk::Image {
        self.image
    }

    pub fn transition(
        &self,
        command_pool: &CommandPool,
        transition: &ImageLayoutTransition,
        base_mip_level: u32,
        level_count: u32,
    ) -> Result<()> {
        command_pool
            .execute_command_once(|command_buffer| {
                self.record_transition(command_buffer, transition, base_mip_level, level_count)
            })
            .context(TransferCommands)
    }

    fn record_transition(
        &self,
        command_buffer: vk::CommandBuffer,
        transition: &ImageLayoutTransition,
        base_mip_level: u32,
        level_count: u32,
    ) {
        let barrier = vk::ImageMemoryBarrier::builder()
            .old_layout(transition.old_layout)
            .new_layout(transition.new_layout)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(self.image)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level,
                level_count,
                base_array_layer: 0,
                layer_count: 1,
            })
            .src_access_mask(transition.src_access_mask)
            .dst_access_mask(transition.dst_access_mask)
            .build();
        let barriers = [barrier];

        unsafe {
            self.context.device().cmd_pipeline_barrier(
                command_buffer,
                transition.src_stage_mask,
                transition.dst_stage_mask,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &barriers,
            )
        };
    }

    pub fn upload_data(
        &self,
        command_pool: &CommandPool,
        description: &TextureDescription,
    ) -> Result<()> {
        let staging_buffer = Buffer::new_mapped_basic(
            self.context.clone(),
            description.pixels.len() as vk::DeviceSize,
            vk::BufferUsageFlags::TRANSFER_SRC,
            vk_mem::MemoryUsage::CpuOnly,
        )
        .context(StagingBuffer)?;
        staging_buffer
            .upload_to_buffer(&description.pixels, 0)
            .context(StagingBuffer)?;

        self.transition(
            command_pool,
            &ImageLayoutTransition::undefined_to_transfer_destination(),
            0,
            description.mip_levels,
        )?;

        let region = vk::BufferImageCopy::builder()
            .buffer_offset(0)
            .buffer_row_length(0)
            .buffer_image_height(0)
            .image_subresource(vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: 1,
            })
            .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
            .image_extent(vk::Extent3D {
                width: description.width,
                height: description.height,
                depth: 1,
            })
            .build();
        let regions = [region];

        command_pool
            .copy_buffer_to_image(staging_buffer.buffer(), self.image, &regions)
            .context(TransferCommands)?;

        Ok(())
    }

    /// Fills every mip level below the first by repeated half-size blits,
    /// leaving the whole chain in `SHADER_READ_ONLY_OPTIMAL`.
    pub fn generate_mipmaps(
        &self,
        command_pool: &CommandPool,
        description: &TextureDescription,
    ) -> Result<()> {
        if description.mip_levels <= 1 {
            return self.transition(
                command_pool,
                &ImageLayoutTransition::transfer_destination_to_shader_read(),
                0,
                1,
            );
        }

        command_pool
            .execute_command_once(|command_buffer| {
                let mut width = description.width as i32;
                let mut height = description.height as i32;

                for level in 1..description.mip_levels {
                    self.record_transition(
                        command_buffer,
                        &ImageLayoutTransition::transfer_destination_to_source(),
                        level - 1,
                        1,
                    );

                    let next_width = (width / 2).max(1);
                    let next_height = (height / 2).max(1);
                    self.record_blit(command_buffer, level, [width, height], [next_width, next_height]);

                    self.record_transition(
                        command_buffer,
                        &ImageLayoutTransition::transfer_source_to_shader_read(),
                        level - 1,
                        1,
                    );

                    width = next_width;
                    height = next_height;
                }

                self.record_transition(
                    command_buffer,
                    &ImageLayoutTransition::transfer_destination_to_shader_read(),
                    description.mip_levels - 1,
                    1,
                );
            })
            .context(TransferCommands)
    }

    fn record_blit(
        &self,
        command_buffer: vk::CommandBuffer,
        level: u32,
        source_size: [i32; 2],
        destination_size: [i32; 2],
    ) {
        let blit = vk::ImageBlit::builder()
            .src_offsets([
                vk::Offset3D { x: 0, y: 0, z: 0 },
                vk::Offset3D {
                    x: source_size[0],
                    y: source_size[1],
                    z: 1,
                },
            ])
            .src_subresource(vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: level - 1,
                base_array_layer: 0,
                layer_count: 1,
            })
            .dst_offsets([
                vk::Offset3D { x: 0, y: 0, z: 0 },
                vk::Offset3D {
                    x: destination_size[0],
                    y: destination_size[1],
                    z: 1,
                },
            ])
            .dst_subresource(vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: level,
                base_array_layer: 0,
                layer_count: 1,
            })
            .build();
        let blits = [blit];

        unsafe {
            self.context.device().cmd_blit_image(
                command_buffer,
                self.image,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                self.image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &blits,
                vk::Filter::LINEAR,
            )
        };
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        let _ = self
            .context
            .allocator()
            .destroy_image(self.image, &self.allocation);
    }
}

/// A sampled texture with its full mip chain and a view over it.
pub struct TextureBundle {
    pub view: ImageView,
    pub texture: Texture,
    pub mip_levels: u32,
}

impl TextureBundle {
    pub fn new(
        context: Arc<VulkanContext>,
        command_pool: &CommandPool,
        description: &TextureDescription,
    ) -> Result<Self> {
        let expected = description.expected_size();
        if description.pixels.len() != expected {
            return PixelDataSize {
                actual: description.pixels.len(),
                expected,
                width: description.width,
                height: description.height,
                format: description.format,
            }
            .fail();
        }

        let mut description = description.clone();
        if description.mip_levels > 1
            && !context.format_supports(
                description.format,
                vk::ImageTiling::OPTIMAL,
                TextureDescription::mipmap_features(),
            )
        {
            warn!(
                "Format {:?} cannot be linearly blitted, skipping mipmap generation",
                description.format
            );
            description.mip_levels = 1;
        }

        debug!(
            "Creating {}x{} texture with format {:?} and {} mip levels",
            description.width, description.height, description.format, description.mip_levels
        );

        let image_create_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .extent(vk::Extent3D {
                width: description.width,
                height: description.height,
                depth: 1,
            })
            .mip_levels(description.mip_levels)
            .array_layers(1)
            .format(description.format)
            .tiling(vk::ImageTiling::OPTIMAL)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(
                vk::ImageUsageFlags::TRANSFER_SRC
                    | vk::ImageUsageFlags::TRANSFER_DST
                    | vk::ImageUsageFlags::SAMPLED,
            )
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .samples(vk::SampleCountFlags::TYPE_1)
            .build();

        let allocation_create_info = vk_mem::AllocationCreateInfo {
            usage: vk_mem::MemoryUsage::GpuOnly,
            ..Default::default()
        };

        let texture = Texture::new(context.clone(), &allocation_create_info, &image_create_info)?;
        texture.upload_data(command_pool, &description)?;
        texture.generate_mipmaps(command_pool, &description)?;

        let view_create_info = vk::ImageViewCreateInfo::builder()
            .image(texture.image())
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(description.format)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: description.mip_levels,
                base_array_layer: 0,
                layer_count: 1,
            })
            .build();
        let view = ImageView::new(context, view_create_info).context(CreateView)?;

        Ok(Self {
            view,
            texture,
            mip_levels: description.mip_levels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_levels_follow_the_largest_dimension() {
        assert_eq!(TextureDescription::calculate_mip_levels(1, 1), 1);
        assert_eq!(TextureDescription::calculate_mip_levels(2, 2), 2);
        assert_eq!(TextureDescription::calculate_mip_levels(256, 256), 9);
        assert_eq!(TextureDescription::calculate_mip_levels(1024, 512), 11);
        assert_eq!(TextureDescription::calculate_mip_levels(300, 17), 9);
    }

    #[test]
    fn zero_sized_image_still_has_one_level() {
        assert_eq!(TextureDescription::calculate_mip_levels(0, 0), 1);
    }

    #[test]
    fn description_computes_mips_and_size() {
        let description =
            TextureDescription::new(vk::Format::R8G8B8A8_UNORM, 4, 2, vec![255; 4 * 2 * 4]);
        assert_eq!(description.mip_levels, 3);
        assert_eq!(description.expected_size(), description.pixels.len());
    }

    #[test]
    fn sixteen_bit_formats_use_eight_bytes_per_pixel() {
        assert_eq!(
            TextureDescription::bytes_per_pixel(vk::Format::R16G16B16A16_UNORM),
            8
        );
        assert_eq!(
            TextureDescription::bytes_per_pixel(vk::Format::R8G8B8A8_UNORM),
            4
        );
    }

    #[test]
    fn mipmap_generation_needs_both_blit_directions_and_linear_filtering() {
        let features = TextureDescription::mipmap_features();
        assert!(features.contains(vk::FormatFeatureFlags::BLIT_SRC));
        assert!(features.contains(vk::FormatFeatureFlags::BLIT_DST));
        assert!(features.contains(vk::FormatFeatureFlags::SAMPLED_IMAGE_FILTER_LINEAR));

        let linear_only = vk::FormatFeatureFlags::SAMPLED_IMAGE_FILTER_LINEAR
            | vk::FormatFeatureFlags::SAMPLED_IMAGE;
        assert!(!linear_only.contains(features));
    }
}
