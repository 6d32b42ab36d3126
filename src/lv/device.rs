use crate::error::{Error, Result, VkResultExt};
use crate::lv;
use crate::lv::SwapchainSupportDetails;
use crate::utility::tools::{device_type_name, version_string, vk_to_string};
use ash::vk;
use std::collections::HashSet;
use std::ffi::{c_char, CStr};
use std::sync::Arc;

pub struct PhysicalDevice {
    pub handle: vk::PhysicalDevice,
    pub properties: vk::PhysicalDeviceProperties,
    /// Family used for both graphics and presentation
    pub queue_family_index: Option<u32>,

    // Reference-counting
    instance: Arc<lv::Instance>,
}

impl PhysicalDevice {
    pub fn new(vk_device: vk::PhysicalDevice, instance: Arc<lv::Instance>) -> PhysicalDevice {
        let properties = unsafe { instance.instance.get_physical_device_properties(vk_device) };

        PhysicalDevice {
            handle: vk_device,
            properties,
            queue_family_index: None,
            instance,
        }
    }

    pub fn name(&self) -> String {
        vk_to_string(&self.properties.device_name)
    }

    /// Picks the first family that can draw and present to `surface`.
    pub fn find_queue_family(&mut self, surface: &lv::Surface) -> Result<Option<u32>> {
        let queue_family_properties = unsafe {
            self.instance
                .instance
                .get_physical_device_queue_family_properties(self.handle)
        };
        for (index, queue_family) in queue_family_properties.iter().enumerate() {
            if !queue_family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
                continue;
            }
            let supported = unsafe {
                surface.loader.get_physical_device_surface_support(
                    self.handle,
                    index as u32,
                    surface.handle,
                )
            }
            .check("vkGetPhysicalDeviceSurfaceSupportKHR")?;
            if supported {
                self.queue_family_index = Some(index as u32);
                return Ok(self.queue_family_index);
            }
        }
        Ok(None)
    }

    pub fn has_extensions(&self, extensions: &[&CStr]) -> Result<bool> {
        let available_extensions = unsafe {
            self.instance
                .instance
                .enumerate_device_extension_properties(self.handle)
        }
        .check("vkEnumerateDeviceExtensionProperties")?;

        let available: HashSet<String> = available_extensions
            .iter()
            .map(|extension| vk_to_string(&extension.extension_name))
            .collect();

        Ok(extensions
            .iter()
            .all(|required| available.contains(required.to_string_lossy().as_ref())))
    }

    pub fn get_swapchain_support(&self, surface: &lv::Surface) -> Result<SwapchainSupportDetails> {
        unsafe {
            Ok(SwapchainSupportDetails {
                capabilities: surface
                    .loader
                    .get_physical_device_surface_capabilities(self.handle, surface.handle)
                    .check("vkGetPhysicalDeviceSurfaceCapabilitiesKHR")?,
                formats: surface
                    .loader
                    .get_physical_device_surface_formats(self.handle, surface.handle)
                    .check("vkGetPhysicalDeviceSurfaceFormatsKHR")?,
                present_modes: surface
                    .loader
                    .get_physical_device_surface_present_modes(self.handle, surface.handle)
                    .check("vkGetPhysicalDeviceSurfacePresentModesKHR")?,
            })
        }
    }

    fn is_suitable(&mut self, surface: &lv::Surface, required_extensions: &[&CStr]) -> Result<bool> {
        if !self.has_extensions(required_extensions)? {
            return Ok(false);
        }
        if self.find_queue_family(surface)?.is_none() {
            return Ok(false);
        }
        let swapchain_support = self.get_swapchain_support(surface)?;
        Ok(!swapchain_support.formats.is_empty() && !swapchain_support.present_modes.is_empty())
    }

    /// Picks the best suitable device, preferring discrete GPUs.
    pub fn pick(
        instance: Arc<lv::Instance>,
        surface: &lv::Surface,
        required_extensions: &[&CStr],
    ) -> Result<Arc<PhysicalDevice>> {
        let physical_devices = unsafe { instance.instance.enumerate_physical_devices() }
            .check("vkEnumeratePhysicalDevices")?;

        let mut best: Option<PhysicalDevice> = None;
        for physical_device in physical_devices {
            let mut candidate = PhysicalDevice::new(physical_device, instance.clone());
            if !candidate.is_suitable(surface, required_extensions)? {
                log::debug!("Skipping unsuitable device {}", candidate.name());
                continue;
            }
            let better = best.as_ref().map_or(true, |current| {
                device_type_rank(candidate.properties.device_type)
                    > device_type_rank(current.properties.device_type)
            });
            if better {
                best = Some(candidate);
            }
        }

        let physical_device = best.ok_or(Error::NoSuitableDevice)?;
        physical_device.log_properties();
        Ok(Arc::new(physical_device))
    }

    fn log_properties(&self) {
        let properties = &self.properties;
        log::info!("Selected physical device:");
        log::info!(" - Device Name:    {}", self.name());
        log::info!(
            " - Device Type:    {}",
            device_type_name(properties.device_type)
        );
        log::info!(" - Device ID:      {:#x}", properties.device_id);
        log::info!(" - Vendor ID:      {:#x}", properties.vendor_id);
        log::info!(
            " - API Version:    {}",
            version_string(properties.api_version)
        );
        log::info!(
            " - Driver Version: {}",
            version_string(properties.driver_version)
        );
    }
}

/// Higher is better.
pub fn device_type_rank(device_type: vk::PhysicalDeviceType) -> u32 {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 4,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 3,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 2,
        vk::PhysicalDeviceType::CPU => 1,
        _ => 0,
    }
}

pub struct Device {
    pub handle: ash::Device,
    pub queue: lv::Queue,
    pub physical_device: Arc<PhysicalDevice>,

    // Reference-count
    pub instance: Arc<lv::Instance>,
}

impl Device {
    pub fn new(
        physical_device: Arc<PhysicalDevice>,
        required_extensions: &[&CStr],
        instance: Arc<lv::Instance>,
    ) -> Result<Arc<Device>> {
        let queue_family_index = physical_device
            .queue_family_index
            .ok_or(Error::NoSuitableDevice)?;

        let queue_priorities = [1.0f32];
        let queue_ci = vk::DeviceQueueCreateInfo {
            s_type: vk::StructureType::DEVICE_QUEUE_CREATE_INFO,
            queue_family_index,
            queue_count: 1,
            p_queue_priorities: queue_priorities.as_ptr(),
            ..vk::DeviceQueueCreateInfo::default()
        };

        let extension_names: Vec<*const c_char> = required_extensions
            .iter()
            .map(|name| name.as_ptr())
            .collect();

        let physical_device_features = vk::PhysicalDeviceFeatures::default();
        let device_ci = vk::DeviceCreateInfo {
            s_type: vk::StructureType::DEVICE_CREATE_INFO,
            p_queue_create_infos: &queue_ci,
            queue_create_info_count: 1,
            p_enabled_features: &physical_device_features,
            enabled_extension_count: extension_names.len() as u32,
            pp_enabled_extension_names: extension_names.as_ptr(),
            ..vk::DeviceCreateInfo::default()
        };
        let device = unsafe {
            instance
                .instance
                .create_device(physical_device.handle, &device_ci, None)
        }
        .check("vkCreateDevice")?;
        let queue = lv::Queue::new(queue_family_index, &device);
        log::debug!("Created logical device, queue family {}", queue_family_index);

        Ok(Arc::new(Device {
            handle: device,
            queue,
            physical_device,
            instance,
        }))
    }

    pub fn wait_idle(&self) -> Result<()> {
        unsafe { self.handle.device_wait_idle() }.check("vkDeviceWaitIdle")
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        unsafe { self.handle.destroy_device(None) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discrete_gpu_ranks_first() {
        let mut types = vec![
            vk::PhysicalDeviceType::CPU,
            vk::PhysicalDeviceType::DISCRETE_GPU,
            vk::PhysicalDeviceType::OTHER,
            vk::PhysicalDeviceType::INTEGRATED_GPU,
        ];
        types.sort_by_key(|ty| std::cmp::Reverse(device_type_rank(*ty)));
        assert_eq!(types[0], vk::PhysicalDeviceType::DISCRETE_GPU);
        assert_eq!(types[1], vk::PhysicalDeviceType::INTEGRATED_GPU);
        assert_eq!(types[3], vk::PhysicalDeviceType::OTHER);
    }
}
