use crate::vulkan::LayerNameVec;
use ash::{
    version::{EntryV1_0, InstanceV1_0},
    vk,
};
use snafu::{ResultExt, Snafu};
use std::ffi::CString;
use std::os::raw::c_char;

type Result<T, E = InstanceError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility = "pub(crate)")]
pub enum InstanceError {
    #[snafu(display("Failed to create instance: {}", source))]
    InstanceCreation { source: ash::InstanceError },

    #[snafu(display("Failed to create a c-string from the application name: {}", source))]
    AppNameCreation { source: std::ffi::NulError },

    #[snafu(display("Failed to create a c-string from the engine name: {}", source))]
    EngineNameCreation { source: std::ffi::NulError },
}

pub struct Instance {
    instance: ash::Instance,
}

impl Instance {
    pub const API_VERSION: u32 = vk::make_version(1, 2, 0);

    pub fn new(
        entry: &ash::Entry,
        extensions: &[*const c_char],
        layers: &LayerNameVec,
    ) -> Result<Self> {
        let app_name = CString::new("glTF Viewer").context(AppNameCreation)?;
        let engine_name = CString::new("Support").context(EngineNameCreation)?;

        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name)
            .application_version(vk::make_version(0, 1, 0))
            .engine_name(&engine_name)
            .engine_version(vk::make_version(0, 1, 0))
            .api_version(Self::API_VERSION)
            .build();

        let layer_name_pointers = layers.layer_name_pointers();
        let instance_create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(extensions)
            .enabled_layer_names(&layer_name_pointers)
            .build();

        let instance = unsafe {
            entry
                .create_instance(&instance_create_info, None)
                .context(InstanceCreation)?
        };

        Ok(Self { instance })
    }

    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        unsafe {
            self.instance.destroy_instance(None);
        }
    }
}
