pub use self::{
    context::{ContextError, VulkanContext},
    debug_layer::{DebugLayer, DebugLayerError, LayerName, LayerNameVec},
    descriptor_pool::DescriptorPool,
    descriptor_set_layout::DescriptorSetLayout,
    framebuffer::Framebuffer,
    image_view::ImageView,
    instance::{Instance, InstanceError},
    logical_device::{LogicalDevice, LogicalDeviceError},
    physical_device::{PhysicalDevice, PhysicalDeviceError},
    pipeline::GraphicsPipeline,
    pipeline_layout::PipelineLayout,
    queue_family_index_set::QueueFamilyIndexSet,
    renderpass::RenderPass,
    sampler::Sampler,
    surface::{surface_extension_names, Surface},
    swapchain::{Swapchain, SwapchainProperties},
    sync::{
        fence::Fence,
        semaphore::Semaphore,
        synchronization_set::{
            CurrentFrameSynchronization, SynchronizationSet, SynchronizationSetConstants,
        },
    },
    vulkan_swapchain::VulkanSwapchain,
};

pub mod context;
pub mod debug_layer;
pub mod descriptor_pool;
pub mod descriptor_set_layout;
pub mod framebuffer;
pub mod image_view;
pub mod instance;
pub mod logical_device;
pub mod physical_device;
pub mod pipeline;
pub mod pipeline_layout;
pub mod queue_family_index_set;
pub mod renderpass;
pub mod sampler;
pub mod surface;
pub mod swapchain;
pub mod sync;
pub mod vulkan_swapchain;
