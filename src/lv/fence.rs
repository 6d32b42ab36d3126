use crate::error::{Result, VkResultExt};
use crate::lv;
use ash::vk;
use std::sync::Arc;

pub struct Fence {
    device: Arc<lv::Device>,
    handle: vk::Fence,
}

impl Fence {
    pub fn new(device: Arc<lv::Device>, flags: Option<vk::FenceCreateFlags>) -> Result<Self> {
        let fence_ci = vk::FenceCreateInfo {
            s_type: vk::StructureType::FENCE_CREATE_INFO,
            flags: flags.unwrap_or_default(),
            ..Default::default()
        };

        let handle =
            unsafe { device.handle.create_fence(&fence_ci, None) }.check("vkCreateFence")?;

        Ok(Fence { device, handle })
    }

    pub fn get_handle(&self) -> vk::Fence {
        self.handle
    }

    /// Blocks without timeout until the fence is signaled.
    pub fn wait(&self) -> Result<()> {
        unsafe {
            self.device
                .handle
                .wait_for_fences(&[self.handle], true, u64::MAX)
        }
        .check("vkWaitForFences")
    }

    pub fn reset(&self) -> Result<()> {
        unsafe { self.device.handle.reset_fences(&[self.handle]) }.check("vkResetFences")
    }

    pub fn wait_and_reset(&self) -> Result<()> {
        self.wait()?;
        self.reset()
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.handle.destroy_fence(self.handle, None);
        };
    }
}
