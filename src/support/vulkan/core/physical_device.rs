use crate::vulkan::{QueueFamilyIndexSet, Surface};
use ash::{
    extensions::khr::Swapchain,
    version::{InstanceV1_0, InstanceV1_1},
    vk,
};
use log::{debug, info};
use snafu::{ResultExt, Snafu};
use std::ffi::CStr;

type Result<T, E = PhysicalDeviceError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility = "pub(crate)")]
pub enum PhysicalDeviceError {
    #[snafu(display("Failed to enumerate physical devices: {}", source))]
    EnumeratePhysicalDevices { source: ash::vk::Result },

    #[snafu(display("No suitable physical device was found"))]
    NoSuitablePhysicalDevice,
}

pub struct PhysicalDevice {
    physical_device: vk::PhysicalDevice,
    queue_family_index_set: QueueFamilyIndexSet,
    properties: vk::PhysicalDeviceProperties,
    features: vk::PhysicalDeviceFeatures,
}

impl PhysicalDevice {
    pub fn new(instance: &ash::Instance, surface: &Surface) -> Result<Self> {
        let physical_devices = unsafe {
            instance
                .enumerate_physical_devices()
                .context(EnumeratePhysicalDevices)?
        };

        let mut candidates = physical_devices
            .into_iter()
            .filter_map(|physical_device| {
                Self::evaluate(instance, physical_device, surface)
                    .map(|queue_family_index_set| (physical_device, queue_family_index_set))
            })
            .collect::<Vec<_>>();

        // Discrete devices first
        candidates.sort_by_key(|(physical_device, _)| {
            let properties = unsafe { instance.get_physical_device_properties(*physical_device) };
            properties.device_type != vk::PhysicalDeviceType::DISCRETE_GPU
        });

        let (physical_device, queue_family_index_set) = candidates
            .into_iter()
            .next()
            .ok_or(PhysicalDeviceError::NoSuitablePhysicalDevice)?;

        let properties = unsafe { instance.get_physical_device_properties(physical_device) };
        let features = unsafe { instance.get_physical_device_features(physical_device) };

        let device_name = unsafe { CStr::from_ptr(properties.device_name.as_ptr()) };
        info!("Selected physical device: {:?}", device_name);

        Ok(Self {
            physical_device,
            queue_family_index_set,
            properties,
            features,
        })
    }

    fn evaluate(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        surface: &Surface,
    ) -> Option<QueueFamilyIndexSet> {
        let properties = unsafe { instance.get_physical_device_properties(physical_device) };
        let device_name = unsafe { CStr::from_ptr(properties.device_name.as_ptr()) };

        let queue_family_index_set =
            QueueFamilyIndexSet::new(instance, physical_device, surface)?;

        let has_swapchain_support = unsafe {
            instance
                .enumerate_device_extension_properties(physical_device)
                .map(|extensions| {
                    extensions.iter().any(|extension| {
                        CStr::from_ptr(extension.extension_name.as_ptr()) == Swapchain::name()
                    })
                })
                .unwrap_or(false)
        };

        let has_surface_formats = unsafe {
            surface
                .surface()
                .get_physical_device_surface_formats(physical_device, surface.surface_khr())
                .map(|formats| !formats.is_empty())
                .unwrap_or(false)
        };

        let supports_bindless = Self::supports_descriptor_indexing(instance, physical_device);

        let suitable = has_swapchain_support
            && has_surface_formats
            && supports_bindless
            && properties.api_version >= vk::make_version(1, 2, 0);

        debug!(
            "Physical device {:?}: swapchain {}, surface formats {}, descriptor indexing {}",
            device_name, has_swapchain_support, has_surface_formats, supports_bindless
        );

        if suitable {
            Some(queue_family_index_set)
        } else {
            None
        }
    }

    fn supports_descriptor_indexing(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
    ) -> bool {
        let mut indexing_features = vk::PhysicalDeviceDescriptorIndexingFeatures::default();
        let mut features = vk::PhysicalDeviceFeatures2::builder().build();
        features.p_next = &mut indexing_features as *mut _ as *mut std::ffi::c_void;
        unsafe { instance.get_physical_device_features2(physical_device, &mut features) };

        indexing_features.descriptor_binding_partially_bound == vk::TRUE
            && indexing_features.descriptor_binding_variable_descriptor_count == vk::TRUE
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    pub fn queue_family_index_set(&self) -> QueueFamilyIndexSet {
        self.queue_family_index_set
    }

    pub fn properties(&self) -> &vk::PhysicalDeviceProperties {
        &self.properties
    }

    pub fn sampler_anisotropy_supported(&self) -> bool {
        self.features.sampler_anisotropy == vk::TRUE
    }
}
