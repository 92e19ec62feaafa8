use crate::vulkan::{
    core::surface, surface_extension_names, DebugLayer, DebugLayerError, Instance, InstanceError,
    LayerName, LayerNameVec, LogicalDevice, LogicalDeviceError, PhysicalDevice,
    PhysicalDeviceError, Surface,
};
use ash::{
    version::{DeviceV1_0, InstanceV1_0},
    vk,
};
use log::{info, warn};
use snafu::{ResultExt, Snafu};
use winit::window::Window;

type Result<T, E = ContextError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility = "pub(crate)")]
pub enum ContextError {
    #[snafu(display("Failed to load the Vulkan library: {}", source))]
    EntryLoading { source: ash::LoadingError },

    #[snafu(display("Failed to create an instance: {}", source))]
    InstanceCreation { source: InstanceError },

    #[snafu(display("Failed to set up validation layers: {}", source))]
    DebugLayerCreation { source: DebugLayerError },

    #[snafu(display("Failed to create a surface: {}", source))]
    SurfaceCreation { source: surface::Error },

    #[snafu(display("Failed to pick a physical device: {}", source))]
    PhysicalDeviceSelection { source: PhysicalDeviceError },

    #[snafu(display("Failed to create a logical device: {}", source))]
    LogicalDeviceCreation { source: LogicalDeviceError },

    #[snafu(display("Failed to create the memory allocator: {}", source))]
    AllocatorCreation { source: vk_mem::Error },

    #[snafu(display("No supported depth format was found"))]
    NoDepthFormat,
}

// Fields drop top to bottom, so the device owners come before the instance
pub struct VulkanContext {
    allocator: vk_mem::Allocator,
    graphics_queue: vk::Queue,
    present_queue: vk::Queue,
    logical_device: LogicalDevice,
    physical_device: PhysicalDevice,
    surface: Surface,
    _debug_layer: Option<DebugLayer>,
    instance: Instance,
    _entry: ash::Entry,
}

impl VulkanContext {
    pub fn new(window: &Window, enable_validation: bool) -> Result<Self> {
        let entry = ash::Entry::new().context(EntryLoading)?;

        let mut extensions = surface_extension_names(window).context(SurfaceCreation)?;
        let mut layers = if enable_validation {
            LayerNameVec::new(&[LayerName::KhronosValidation]).context(DebugLayerCreation)?
        } else {
            LayerNameVec::empty()
        };

        if enable_validation {
            layers
                .retain_available(&entry)
                .context(DebugLayerCreation)?;
            extensions.push(DebugLayer::extension_name().as_ptr());
        }

        let instance = Instance::new(&entry, &extensions, &layers).context(InstanceCreation)?;

        let debug_layer = if enable_validation {
            info!("Validation enabled");
            Some(DebugLayer::new(&entry, instance.instance()).context(DebugLayerCreation)?)
        } else {
            None
        };

        let surface =
            Surface::new(&entry, instance.instance(), window).context(SurfaceCreation)?;

        let physical_device =
            PhysicalDevice::new(instance.instance(), &surface).context(PhysicalDeviceSelection)?;

        if !physical_device.sampler_anisotropy_supported() {
            warn!("Sampler anisotropy is not supported, textures will be sampled without it");
        }

        let logical_device = LogicalDevice::new(instance.instance(), &physical_device)
            .context(LogicalDeviceCreation)?;

        let queue_family_index_set = physical_device.queue_family_index_set();
        let graphics_queue = unsafe {
            logical_device
                .logical_device()
                .get_device_queue(queue_family_index_set.graphics_queue_family_index(), 0)
        };
        let present_queue = unsafe {
            logical_device
                .logical_device()
                .get_device_queue(queue_family_index_set.present_queue_family_index(), 0)
        };

        let allocator_create_info = vk_mem::AllocatorCreateInfo {
            physical_device: physical_device.physical_device(),
            device: logical_device.logical_device().clone(),
            instance: instance.instance().clone(),
            flags: vk_mem::AllocatorCreateFlags::NONE,
            preferred_large_heap_block_size: 0,
            frame_in_use_count: 0,
            heap_size_limits: None,
        };
        let allocator = vk_mem::Allocator::new(&allocator_create_info).context(AllocatorCreation)?;

        Ok(Self {
            allocator,
            graphics_queue,
            present_queue,
            logical_device,
            physical_device,
            surface,
            _debug_layer: debug_layer,
            instance,
            _entry: entry,
        })
    }

    pub fn instance(&self) -> &ash::Instance {
        self.instance.instance()
    }

    pub fn physical_device(&self) -> &PhysicalDevice {
        &self.physical_device
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn logical_device(&self) -> &LogicalDevice {
        &self.logical_device
    }

    pub fn device(&self) -> &ash::Device {
        self.logical_device.logical_device()
    }

    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    pub fn present_queue(&self) -> vk::Queue {
        self.present_queue
    }

    pub fn allocator(&self) -> &vk_mem::Allocator {
        &self.allocator
    }

    pub fn determine_depth_format(
        &self,
        tiling: vk::ImageTiling,
        features: vk::FormatFeatureFlags,
    ) -> Result<vk::Format> {
        let candidates = [
            vk::Format::D32_SFLOAT,
            vk::Format::D32_SFLOAT_S8_UINT,
            vk::Format::D24_UNORM_S8_UINT,
        ];
        candidates
            .iter()
            .copied()
            .find(|format| self.format_supports(*format, tiling, features))
            .ok_or(ContextError::NoDepthFormat)
    }

    pub fn format_supports(
        &self,
        format: vk::Format,
        tiling: vk::ImageTiling,
        features: vk::FormatFeatureFlags,
    ) -> bool {
        let properties = unsafe {
            self.instance().get_physical_device_format_properties(
                self.physical_device.physical_device(),
                format,
            )
        };

        match tiling {
            vk::ImageTiling::LINEAR => properties.linear_tiling_features.contains(features),
            vk::ImageTiling::OPTIMAL => properties.optimal_tiling_features.contains(features),
            _ => false,
        }
    }
}
