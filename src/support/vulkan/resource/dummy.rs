use crate::vulkan::{CommandPool, TextureBundle, TextureDescription, VulkanContext};
use ash::vk;
use std::sync::Arc;

use super::texture::Error;

/// A 1x1 opaque white texture bound when an asset brings no images.
pub struct DummyImage;

impl DummyImage {
    pub fn description() -> TextureDescription {
        TextureDescription::new(vk::Format::R8G8B8A8_UNORM, 1, 1, vec![255, 255, 255, 255])
    }

    pub fn create(
        context: Arc<VulkanContext>,
        command_pool: &CommandPool,
    ) -> Result<TextureBundle, Error> {
        TextureBundle::new(context, command_pool, &Self::description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dummy_is_a_single_white_pixel() {
        let description = DummyImage::description();
        assert_eq!((description.width, description.height), (1, 1));
        assert_eq!(description.mip_levels, 1);
        assert_eq!(description.pixels, vec![255; 4]);
    }
}
