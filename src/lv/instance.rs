use crate::error::{Result, VkResultExt};
use crate::utility;
use ash::vk;
use std::ffi::{c_char, CStr, CString};
use std::ptr;
use std::sync::Arc;

pub const VALIDATION_LAYER_NAME: &str = "VK_LAYER_KHRONOS_validation";

pub struct Instance {
    pub entry: ash::Entry,
    pub instance: ash::Instance,
    pub validation_enabled: bool,
}

impl Instance {
    /// Creates the instance with the given extensions. Validation is only enabled when it is
    /// requested and the layer is installed; `VK_EXT_debug_utils` is appended in that case.
    pub fn new(
        entry: ash::Entry,
        app_name: &str,
        required_extensions: &[*const c_char],
        validation_requested: bool,
    ) -> Result<Arc<Self>> {
        let validation_enabled = validation_requested
            && Instance::check_validation_layer_support(&entry, &[VALIDATION_LAYER_NAME])?;
        if validation_requested && !validation_enabled {
            log::warn!(
                "Validation was requested, but {} is not installed",
                VALIDATION_LAYER_NAME
            );
        }

        let app_name = CString::new(app_name).unwrap_or_default();
        let engine_name = CString::new("vk_samples").unwrap_or_default();
        let app_info = vk::ApplicationInfo {
            s_type: vk::StructureType::APPLICATION_INFO,
            p_next: ptr::null(),
            p_application_name: app_name.as_ptr(),
            application_version: vk::make_api_version(0, 0, 1, 0),
            p_engine_name: engine_name.as_ptr(),
            engine_version: vk::make_api_version(0, 0, 1, 0),
            api_version: vk::make_api_version(0, 1, 1, 0),
        };

        let mut extension_names = required_extensions.to_vec();
        if validation_enabled {
            extension_names.push(ash::extensions::ext::DebugUtils::name().as_ptr());
        }

        let layer_name = CString::new(VALIDATION_LAYER_NAME).unwrap_or_default();
        let enabled_layer_names: Vec<*const c_char> = if validation_enabled {
            vec![layer_name.as_ptr()]
        } else {
            Vec::new()
        };

        let create_info = vk::InstanceCreateInfo {
            s_type: vk::StructureType::INSTANCE_CREATE_INFO,
            p_next: ptr::null(),
            flags: vk::InstanceCreateFlags::empty(),
            p_application_info: &app_info,
            enabled_layer_count: enabled_layer_names.len() as u32,
            pp_enabled_layer_names: enabled_layer_names.as_ptr(),
            enabled_extension_count: extension_names.len() as u32,
            pp_enabled_extension_names: extension_names.as_ptr(),
        };

        for name in extension_names.iter() {
            log::debug!("Instance extension: {:?}", unsafe { CStr::from_ptr(*name) });
        }

        let instance: ash::Instance =
            unsafe { entry.create_instance(&create_info, None) }.check("vkCreateInstance")?;
        log::info!(
            "Created Vulkan instance (validation {})",
            if validation_enabled { "on" } else { "off" }
        );

        Ok(Arc::new(Self {
            entry,
            instance,
            validation_enabled,
        }))
    }

    pub fn check_validation_layer_support(
        entry: &ash::Entry,
        required_layers: &[&str],
    ) -> Result<bool> {
        let layer_properties = entry
            .enumerate_instance_layer_properties()
            .check("vkEnumerateInstanceLayerProperties")?;

        if layer_properties.is_empty() {
            log::debug!("No available instance layers");
            return Ok(false);
        }

        let available: Vec<String> = layer_properties
            .iter()
            .map(|layer| utility::tools::vk_to_string(&layer.layer_name))
            .collect();
        Ok(required_layers
            .iter()
            .all(|required| available.iter().any(|name| name == required)))
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        unsafe {
            self.instance.destroy_instance(None);
        }
    }
}
