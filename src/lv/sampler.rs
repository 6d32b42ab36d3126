use crate::error::{Result, VkResultExt};
use crate::lv;
use ash::vk;
use std::sync::Arc;

pub struct Sampler {
    pub handle: vk::Sampler,
    device: Arc<lv::Device>,
}

impl Sampler {
    pub fn new(
        device: Arc<lv::Device>,
        filter: vk::Filter,
        address_mode: vk::SamplerAddressMode,
    ) -> Result<Sampler> {
        let sampler_ci = vk::SamplerCreateInfo {
            s_type: vk::StructureType::SAMPLER_CREATE_INFO,
            mag_filter: filter,
            min_filter: filter,
            mipmap_mode: vk::SamplerMipmapMode::NEAREST,
            address_mode_u: address_mode,
            address_mode_v: address_mode,
            address_mode_w: address_mode,
            max_lod: 0.0,
            ..Default::default()
        };
        let handle =
            unsafe { device.handle.create_sampler(&sampler_ci, None) }.check("vkCreateSampler")?;
        Ok(Sampler { handle, device })
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        unsafe {
            self.device.handle.destroy_sampler(self.handle, None);
        }
    }
}
