use std::ffi::{c_char, CStr};

/// Converts a fixed-size, nul-terminated Vulkan name array into a `String`.
pub fn vk_to_string(raw_string_array: &[c_char]) -> String {
    let raw_string = unsafe { CStr::from_ptr(raw_string_array.as_ptr()) };
    raw_string.to_string_lossy().into_owned()
}

pub fn device_type_name(device_type: ash::vk::PhysicalDeviceType) -> &'static str {
    use ash::vk::PhysicalDeviceType;
    match device_type {
        PhysicalDeviceType::OTHER => "Other",
        PhysicalDeviceType::INTEGRATED_GPU => "Integrated GPU",
        PhysicalDeviceType::DISCRETE_GPU => "Discrete GPU",
        PhysicalDeviceType::VIRTUAL_GPU => "Virtual GPU",
        PhysicalDeviceType::CPU => "CPU",
        _ => "Unknown",
    }
}

/// `major.minor` of a packed Vulkan version number.
pub fn version_string(version: u32) -> String {
    format!(
        "{}.{}",
        ash::vk::api_version_major(version),
        ash::vk::api_version_minor(version)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk;

    #[test]
    fn name_array_stops_at_nul() {
        let mut name = [0 as c_char; vk::MAX_EXTENSION_NAME_SIZE];
        for (dst, src) in name.iter_mut().zip(b"VK_KHR_swapchain") {
            *dst = *src as c_char;
        }
        assert_eq!(vk_to_string(&name), "VK_KHR_swapchain");
    }

    #[test]
    fn version_drops_patch() {
        assert_eq!(version_string(vk::make_api_version(0, 1, 3, 251)), "1.3");
    }

    #[test]
    fn device_types() {
        assert_eq!(
            device_type_name(vk::PhysicalDeviceType::DISCRETE_GPU),
            "Discrete GPU"
        );
        assert_eq!(device_type_name(vk::PhysicalDeviceType::CPU), "CPU");
    }
}
