use crate::error::{Error, Result, VkResultExt};
use crate::lv;
use crate::utility;
use ash::vk;
use std::sync::Arc;

#[derive(Clone)]
pub struct SwapchainSupportDetails {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupportDetails {
    /// First preferred format the surface offers, otherwise whatever it lists first.
    pub fn choose_format(&self, preferred_formats: &[vk::Format]) -> Option<vk::SurfaceFormatKHR> {
        preferred_formats
            .iter()
            .find_map(|preferred_format| {
                self.formats
                    .iter()
                    .find(|available| available.format == *preferred_format)
                    .copied()
            })
            .or_else(|| self.formats.first().copied())
    }

    pub fn choose_presentation_mode(
        &self,
        preferred_present_modes: &[vk::PresentModeKHR],
    ) -> vk::PresentModeKHR {
        preferred_present_modes
            .iter()
            .find(|preferred| self.present_modes.contains(preferred))
            .copied()
            .unwrap_or(vk::PresentModeKHR::FIFO)
    }

    pub fn choose_extent(&self, width: u32, height: u32) -> vk::Extent2D {
        if self.capabilities.current_extent.width != u32::MAX {
            return self.capabilities.current_extent;
        }
        vk::Extent2D {
            width: width.clamp(
                self.capabilities.min_image_extent.width,
                self.capabilities.max_image_extent.width,
            ),
            height: height.clamp(
                self.capabilities.min_image_extent.height,
                self.capabilities.max_image_extent.height,
            ),
        }
    }

    /// Lowest supported composite-alpha bit, scanning OPAQUE through INHERIT.
    pub fn choose_composite_alpha(&self) -> Option<vk::CompositeAlphaFlagsKHR> {
        (0..=4)
            .map(|bit| vk::CompositeAlphaFlagsKHR::from_raw(1 << bit))
            .find(|flag| self.capabilities.supported_composite_alpha.contains(*flag))
    }
}

pub struct SwapchainPreferred<'a> {
    pub preferred_format: &'a [vk::Format],
    pub preferred_present_modes: &'a [vk::PresentModeKHR],
    pub swapchain_support_details: SwapchainSupportDetails,
    pub width: u32,
    pub height: u32,
}

pub struct Swapchain {
    pub handle: vk::SwapchainKHR,
    pub images: Vec<vk::Image>,
    pub image_views: Vec<vk::ImageView>,
    pub extent: vk::Extent2D,
    pub surface_format: vk::SurfaceFormatKHR,
    loader: ash::extensions::khr::Swapchain,

    // Reference-counting
    device: Arc<lv::Device>,
    _surface: Arc<lv::Surface>,
}

impl Swapchain {
    pub fn new(
        device: Arc<lv::Device>,
        surface: Arc<lv::Surface>,
        preferred: SwapchainPreferred,
    ) -> Result<Swapchain> {
        let loader = ash::extensions::khr::Swapchain::new(&device.instance.instance, &device.handle);
        let support = preferred.swapchain_support_details;
        let capabilities = support.capabilities;

        if !capabilities
            .supported_usage_flags
            .contains(vk::ImageUsageFlags::COLOR_ATTACHMENT)
        {
            return Err(Error::UnsupportedSurface(
                "color attachment usage".to_string(),
            ));
        }
        let surface_format = support
            .choose_format(preferred.preferred_format)
            .ok_or_else(|| Error::UnsupportedSurface("any surface format".to_string()))?;
        let composite_alpha = support
            .choose_composite_alpha()
            .ok_or_else(|| Error::UnsupportedSurface("any composite alpha mode".to_string()))?;
        let present_mode = support.choose_presentation_mode(preferred.preferred_present_modes);
        let extent = support.choose_extent(preferred.width, preferred.height);

        let swapchain_ci = vk::SwapchainCreateInfoKHR {
            s_type: vk::StructureType::SWAPCHAIN_CREATE_INFO_KHR,
            surface: surface.handle,
            min_image_count: capabilities.min_image_count,
            image_format: surface_format.format,
            image_color_space: surface_format.color_space,
            image_extent: extent,
            image_array_layers: 1,
            image_usage: vk::ImageUsageFlags::COLOR_ATTACHMENT
                | (capabilities.supported_usage_flags & vk::ImageUsageFlags::TRANSFER_DST),
            image_sharing_mode: vk::SharingMode::EXCLUSIVE,
            pre_transform: capabilities.current_transform,
            composite_alpha,
            present_mode,
            clipped: vk::TRUE,
            old_swapchain: vk::SwapchainKHR::null(),
            ..vk::SwapchainCreateInfoKHR::default()
        };
        let swapchain =
            unsafe { loader.create_swapchain(&swapchain_ci, None) }.check("vkCreateSwapchainKHR")?;

        // Retrieve swapchain images and views
        let images = unsafe { loader.get_swapchain_images(swapchain) }
            .check("vkGetSwapchainImagesKHR")?;
        let mut image_views = Vec::<vk::ImageView>::with_capacity(images.len());
        for image in images.iter() {
            let image_view_ci = utility::init::image_view_create_info(
                surface_format.format,
                *image,
                vk::ImageAspectFlags::COLOR,
            );
            let image_view = unsafe { device.handle.create_image_view(&image_view_ci, None) }
                .check("vkCreateImageView")?;
            image_views.push(image_view);
        }

        log::info!(
            "Created swapchain: {} images, {}x{}, {:?}, {:?}",
            images.len(),
            extent.width,
            extent.height,
            surface_format.format,
            present_mode
        );

        Ok(Swapchain {
            handle: swapchain,
            loader,
            images,
            image_views,
            surface_format,
            extent,
            device,
            _surface: surface,
        })
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Requests the next image, signaling `fence` once it is ready to be rendered to.
    pub fn acquire_next_image(&self, fence: vk::Fence) -> Result<u32> {
        let (index, suboptimal) = unsafe {
            self.loader
                .acquire_next_image(self.handle, u64::MAX, vk::Semaphore::null(), fence)
        }
        .check("vkAcquireNextImageKHR")?;
        if suboptimal {
            log::warn!("Swapchain is suboptimal for the surface");
        }
        Ok(index)
    }

    pub fn present(
        &self,
        queue: &lv::Queue,
        wait_semaphore: vk::Semaphore,
        image_index: u32,
    ) -> Result<()> {
        let present_info = vk::PresentInfoKHR {
            s_type: vk::StructureType::PRESENT_INFO_KHR,
            wait_semaphore_count: 1,
            p_wait_semaphores: &wait_semaphore,
            swapchain_count: 1,
            p_swapchains: &self.handle,
            p_image_indices: &image_index,
            ..Default::default()
        };
        let suboptimal = unsafe { self.loader.queue_present(queue.handle, &present_info) }
            .check("vkQueuePresentKHR")?;
        if suboptimal {
            log::warn!("Presented to a suboptimal swapchain");
        }
        Ok(())
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            for image_view in self.image_views.drain(..) {
                self.device.handle.destroy_image_view(image_view, None);
            }
            self.loader.destroy_swapchain(self.handle, None);
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface_format(format: vk::Format) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }
    }

    fn details() -> SwapchainSupportDetails {
        SwapchainSupportDetails {
            capabilities: vk::SurfaceCapabilitiesKHR {
                min_image_count: 2,
                max_image_count: 3,
                current_extent: vk::Extent2D {
                    width: u32::MAX,
                    height: u32::MAX,
                },
                min_image_extent: vk::Extent2D {
                    width: 64,
                    height: 64,
                },
                max_image_extent: vk::Extent2D {
                    width: 1920,
                    height: 1080,
                },
                supported_composite_alpha: vk::CompositeAlphaFlagsKHR::PRE_MULTIPLIED
                    | vk::CompositeAlphaFlagsKHR::INHERIT,
                ..Default::default()
            },
            formats: vec![
                surface_format(vk::Format::B8G8R8A8_SRGB),
                surface_format(vk::Format::R8G8B8A8_UNORM),
            ],
            present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
        }
    }

    #[test]
    fn preferred_format_wins() {
        let chosen = details()
            .choose_format(&[vk::Format::R8G8B8A8_UNORM])
            .unwrap();
        assert_eq!(chosen.format, vk::Format::R8G8B8A8_UNORM);
    }

    #[test]
    fn falls_back_to_first_format() {
        let chosen = details()
            .choose_format(&[vk::Format::R16G16B16A16_SFLOAT])
            .unwrap();
        assert_eq!(chosen.format, vk::Format::B8G8R8A8_SRGB);

        let mut empty = details();
        empty.formats.clear();
        assert!(empty.choose_format(&[vk::Format::R8G8B8A8_UNORM]).is_none());
    }

    #[test]
    fn present_mode_defaults_to_fifo() {
        let details = details();
        assert_eq!(
            details.choose_presentation_mode(&[vk::PresentModeKHR::IMMEDIATE]),
            vk::PresentModeKHR::FIFO
        );
        assert_eq!(
            details.choose_presentation_mode(&[vk::PresentModeKHR::MAILBOX]),
            vk::PresentModeKHR::MAILBOX
        );
    }

    #[test]
    fn extent_is_clamped_when_surface_leaves_it_open() {
        let extent = details().choose_extent(4000, 10);
        assert_eq!((extent.width, extent.height), (1920, 64));
    }

    #[test]
    fn current_extent_is_authoritative() {
        let mut details = details();
        details.capabilities.current_extent = vk::Extent2D {
            width: 1080,
            height: 2400,
        };
        let extent = details.choose_extent(800, 600);
        assert_eq!((extent.width, extent.height), (1080, 2400));
    }

    #[test]
    fn composite_alpha_takes_lowest_supported_bit() {
        assert_eq!(
            details().choose_composite_alpha(),
            Some(vk::CompositeAlphaFlagsKHR::PRE_MULTIPLIED)
        );

        let mut none = details();
        none.capabilities.supported_composite_alpha = vk::CompositeAlphaFlagsKHR::empty();
        assert_eq!(none.choose_composite_alpha(), None);
    }
}
