use ash::{extensions::ext::DebugUtils, version::EntryV1_0, vk};
use log::{debug, error, info, warn};
use snafu::{ResultExt, Snafu};
use std::{
    ffi::{CStr, CString},
    os::raw::{c_char, c_void},
};

type Result<T, E = DebugLayerError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility = "pub(crate)")]
pub enum DebugLayerError {
    #[snafu(display("Failed to create debug utils messenger: {}", source))]
    CreateDebugUtilsMessenger { source: ash::vk::Result },

    #[snafu(display("Failed to enumerate instance layer properties: {}", source))]
    EnumerateLayers { source: ash::vk::Result },

    #[snafu(display("Invalid layer name '{}': {}", name, source))]
    InvalidLayerName {
        name: String,
        source: std::ffi::NulError,
    },
}

pub enum LayerName {
    KhronosValidation,
}

impl LayerName {
    pub fn name(&self) -> &str {
        match self {
            LayerName::KhronosValidation => "VK_LAYER_KHRONOS_validation",
        }
    }
}

pub struct LayerNameVec {
    pub layer_names: Vec<CString>,
}

impl LayerNameVec {
    pub fn new(layer_names: &[LayerName]) -> Result<Self> {
        let layer_names = layer_names
            .iter()
            .map(|layer| {
                CString::new(layer.name()).context(InvalidLayerName {
                    name: layer.name(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { layer_names })
    }

    pub fn empty() -> Self {
        Self {
            layer_names: Vec::new(),
        }
    }

    pub fn layer_name_pointers(&self) -> Vec<*const c_char> {
        self.layer_names
            .iter()
            .map(|name| name.as_ptr())
            .collect::<Vec<_>>()
    }

    /// Keeps only the layers the loader reports as installed.
    pub fn retain_available(&mut self, entry: &ash::Entry) -> Result<()> {
        let properties = entry
            .enumerate_instance_layer_properties()
            .context(EnumerateLayers)?;

        self.layer_names.retain(|layer_name| {
            let available = properties.iter().any(|property| {
                let name = unsafe { CStr::from_ptr(property.layer_name.as_ptr()) };
                name == layer_name.as_c_str()
            });
            if !available {
                warn!("Requested layer {:?} is not available", layer_name);
            }
            available
        });

        Ok(())
    }
}

pub struct DebugLayer {
    debug_utils: DebugUtils,
    debug_utils_messenger: vk::DebugUtilsMessengerEXT,
}

impl DebugLayer {
    pub fn new(entry: &ash::Entry, instance: &ash::Instance) -> Result<Self> {
        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                    | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(vulkan_debug_callback))
            .build();

        let debug_utils = DebugUtils::new(entry, instance);
        let debug_utils_messenger = unsafe {
            debug_utils
                .create_debug_utils_messenger(&create_info, None)
                .context(CreateDebugUtilsMessenger)?
        };

        Ok(Self {
            debug_utils,
            debug_utils_messenger,
        })
    }

    pub fn extension_name() -> &'static CStr {
        DebugUtils::name()
    }
}

impl Drop for DebugLayer {
    fn drop(&mut self) {
        unsafe {
            self.debug_utils
                .destroy_debug_utils_messenger(self.debug_utils_messenger, None);
        }
    }
}

unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _: *mut c_void,
) -> vk::Bool32 {
    let message = CStr::from_ptr((*p_callback_data).p_message).to_string_lossy();
    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => error!("{:?} - {}", message_type, message),
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => warn!("{:?} - {}", message_type, message),
        vk::DebugUtilsMessageSeverityFlagsEXT::INFO => info!("{:?} - {}", message_type, message),
        _ => debug!("{:?} - {}", message_type, message),
    }
    vk::FALSE
}
