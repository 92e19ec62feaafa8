use crate::vulkan::{
    core::{framebuffer, image_view, renderpass, swapchain},
    resource::texture,
    Framebuffer, ImageView, RenderPass, Swapchain, Texture, VulkanContext,
};
use ash::vk;
use snafu::{ResultExt, Snafu};
use std::sync::Arc;

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility = "pub(crate)")]
pub enum Error {
    #[snafu(display("Failed to create swapchain: {}", source))]
    CreateSwapchain { source: swapchain::Error },

    #[snafu(display("Failed to create render pass: {}", source))]
    CreateRenderPass { source: renderpass::Error },

    #[snafu(display("Failed to find a depth format: {}", source))]
    DepthFormat {
        source: crate::vulkan::core::context::ContextError,
    },

    #[snafu(display("Failed to create depth image: {}", source))]
    CreateDepthImage { source: texture::Error },

    #[snafu(display("Failed to create image view: {}", source))]
    CreateImageView { source: image_view::Error },

    #[snafu(display("Failed to create framebuffer: {}", source))]
    CreateFramebuffer { source: framebuffer::Error },
}

pub struct VulkanSwapchain {
    pub framebuffers: Vec<Framebuffer>,
    pub swapchain_image_views: Vec<ImageView>,
    pub depth_image_view: ImageView,
    pub depth_image: Texture,
    pub render_pass: Arc<RenderPass>,
    pub swapchain: Swapchain,
}

impl VulkanSwapchain {
    pub fn new(context: Arc<VulkanContext>, dimensions: [u32; 2]) -> Result<Self> {
        let swapchain = Swapchain::new(context.clone(), dimensions).context(CreateSwapchain)?;
        let properties = *swapchain.properties();

        let depth_format = context
            .determine_depth_format(
                vk::ImageTiling::OPTIMAL,
                vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
            )
            .context(DepthFormat)?;

        let render_pass = Arc::new(
            RenderPass::colour_and_depth(context.clone(), properties.format.format, depth_format)
                .context(CreateRenderPass)?,
        );

        let (depth_image, depth_image_view) =
            Self::create_depth_resources(context.clone(), properties.extent, depth_format)?;

        let swapchain_image_views = swapchain
            .images()
            .iter()
            .map(|image| {
                Self::create_view(
                    context.clone(),
                    *image,
                    properties.format.format,
                    vk::ImageAspectFlags::COLOR,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        let framebuffers = swapchain_image_views
            .iter()
            .map(|view| {
                let attachments = [view.view(), depth_image_view.view()];
                let create_info = vk::FramebufferCreateInfo::builder()
                    .render_pass(render_pass.render_pass())
                    .attachments(&attachments)
                    .width(properties.extent.width)
                    .height(properties.extent.height)
                    .layers(1)
                    .build();
                Framebuffer::new(context.clone(), create_info).context(CreateFramebuffer)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            framebuffers,
            swapchain_image_views,
            depth_image_view,
            depth_image,
            render_pass,
            swapchain,
        })
    }

    fn create_depth_resources(
        context: Arc<VulkanContext>,
        extent: vk::Extent2D,
        depth_format: vk::Format,
    ) -> Result<(Texture, ImageView)> {
        let image_create_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .format(depth_format)
            .tiling(vk::ImageTiling::OPTIMAL)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .samples(vk::SampleCountFlags::TYPE_1)
            .build();

        let allocation_create_info = vk_mem::AllocationCreateInfo {
            usage: vk_mem::MemoryUsage::GpuOnly,
            ..Default::default()
        };

        let depth_image = Texture::new(context.clone(), &allocation_create_info, &image_create_info)
            .context(CreateDepthImage)?;

        let aspect_mask = match depth_format {
            vk::Format::D32_SFLOAT_S8_UINT | vk::Format::D24_UNORM_S8_UINT => {
                vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
            }
            _ => vk::ImageAspectFlags::DEPTH,
        };
        let depth_image_view =
            Self::create_view(context, depth_image.image(), depth_format, aspect_mask)?;

        Ok((depth_image, depth_image_view))
    }

    fn create_view(
        context: Arc<VulkanContext>,
        image: vk::Image,
        format: vk::Format,
        aspect_mask: vk::ImageAspectFlags,
    ) -> Result<ImageView> {
        let create_info = vk::ImageViewCreateInfo::builder()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::IDENTITY,
                g: vk::ComponentSwizzle::IDENTITY,
                b: vk::ComponentSwizzle::IDENTITY,
                a: vk::ComponentSwizzle::IDENTITY,
            })
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            })
            .build();

        ImageView::new(context, create_info).context(CreateImageView)
    }
}
