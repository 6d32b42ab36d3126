use crate::assets::Texture;
use crate::error::{Error, Result, VkResultExt};
use crate::{lv, utility};
use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use std::sync::Arc;

pub struct AllocatedImage {
    handle: vk::Image,
    view: vk::ImageView,
    allocation: Allocation,
    pub extent: vk::Extent3D,
    pub format: vk::Format,

    allocator: lv::GpuAllocator,
    device: Arc<lv::Device>,
}

impl AllocatedImage {
    /// Linear, host-visible sampled image filled straight from `texture`.
    /// The image is left in `PREINITIALIZED`; the caller transitions it before sampling.
    pub fn from_texture(
        texture: &Texture,
        device: Arc<lv::Device>,
        allocator: lv::GpuAllocator,
    ) -> Result<Self> {
        let image_ci = vk::ImageCreateInfo {
            s_type: vk::StructureType::IMAGE_CREATE_INFO,
            image_type: vk::ImageType::TYPE_2D,
            format: texture.format,
            extent: texture.extent,
            mip_levels: 1,
            array_layers: 1,
            samples: vk::SampleCountFlags::TYPE_1,
            tiling: vk::ImageTiling::LINEAR,
            usage: vk::ImageUsageFlags::SAMPLED,
            sharing_mode: vk::SharingMode::EXCLUSIVE,
            initial_layout: vk::ImageLayout::PREINITIALIZED,
            ..Default::default()
        };
        let mut image = AllocatedImage::new(
            "Texture",
            image_ci,
            MemoryLocation::CpuToGpu,
            true,
            device,
            allocator,
        )?;
        image.write_rows(&texture.pixels, texture.row_pitch())?;
        Ok(image)
    }

    pub fn new(
        name: &str,
        image_ci: vk::ImageCreateInfo,
        location: MemoryLocation,
        linear: bool,
        device: Arc<lv::Device>,
        allocator: lv::GpuAllocator,
    ) -> Result<Self> {
        let handle =
            unsafe { device.handle.create_image(&image_ci, None) }.check("vkCreateImage")?;
        let requirements = unsafe { device.handle.get_image_memory_requirements(handle) };

        // Allocate image into gpu memory
        let allocation = allocator.lock().allocate(&AllocationCreateDesc {
            name,
            requirements,
            location,
            linear,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        });
        let allocation = match allocation {
            Ok(allocation) => allocation,
            Err(err) => {
                unsafe { device.handle.destroy_image(handle, None) };
                return Err(err.into());
            }
        };
        let mut image = AllocatedImage {
            handle,
            view: vk::ImageView::null(),
            allocation,
            extent: image_ci.extent,
            format: image_ci.format,
            allocator,
            device,
        };
        unsafe {
            image.device.handle.bind_image_memory(
                handle,
                image.allocation.memory(),
                image.allocation.offset(),
            )
        }
        .check("vkBindImageMemory")?;

        let view_ci =
            utility::init::image_view_create_info(image.format, handle, vk::ImageAspectFlags::COLOR);
        image.view = unsafe { image.device.handle.create_image_view(&view_ci, None) }
            .check("vkCreateImageView")?;

        Ok(image)
    }

    /// Copies tightly packed rows into the mapped image, honouring the driver's row pitch.
    pub fn write_rows(&mut self, pixels: &[u8], src_row_pitch: usize) -> Result<()> {
        let subresource = vk::ImageSubresource {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            mip_level: 0,
            array_layer: 0,
        };
        let layout = unsafe {
            self.device
                .handle
                .get_image_subresource_layout(self.handle, subresource)
        };
        let mapped = self
            .allocation
            .mapped_slice_mut()
            .ok_or(Error::Vulkan {
                call: "vkMapMemory",
                result: vk::Result::ERROR_MEMORY_MAP_FAILED,
            })?;
        copy_rows(
            mapped,
            layout.offset as usize,
            layout.row_pitch as usize,
            pixels,
            src_row_pitch,
            self.extent.height as usize,
        );
        Ok(())
    }

    pub fn get_handle(&self) -> vk::Image {
        self.handle
    }

    pub fn get_view(&self) -> vk::ImageView {
        self.view
    }
}

/// Row-by-row copy from a packed source into a destination with a wider pitch.
pub fn copy_rows(
    dst: &mut [u8],
    dst_offset: usize,
    dst_row_pitch: usize,
    src: &[u8],
    src_row_pitch: usize,
    height: usize,
) {
    for row in 0..height {
        let src_start = row * src_row_pitch;
        let dst_start = dst_offset + row * dst_row_pitch;
        dst[dst_start..dst_start + src_row_pitch]
            .copy_from_slice(&src[src_start..src_start + src_row_pitch]);
    }
}

impl Drop for AllocatedImage {
    fn drop(&mut self) {
        unsafe {
            self.device.handle.destroy_image_view(self.view, None);
            self.device.handle.destroy_image(self.handle, None);
        };
        if let Err(err) = self.allocator.lock().free(std::mem::take(&mut self.allocation)) {
            log::error!("Failed to free image memory: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_land_at_driver_pitch() {
        // 2x2 RGBA source, destination pitch padded to 16 bytes after a 4 byte offset
        let src: Vec<u8> = (0..16).collect();
        let mut dst = vec![0xffu8; 4 + 16 * 2];

        copy_rows(&mut dst, 4, 16, &src, 8, 2);

        assert_eq!(&dst[4..12], &src[0..8]);
        assert_eq!(&dst[12..20], &[0xff; 8]);
        assert_eq!(&dst[20..28], &src[8..16]);
        assert_eq!(&dst[..4], &[0xff; 4]);
    }
}
