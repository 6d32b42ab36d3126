use crate::error::{Result, VkResultExt};
use ash::vk;

#[derive(Clone, Copy)]
pub struct Queue {
    pub handle: vk::Queue,
    pub index: u32,
}

impl Queue {
    pub fn new(queue_family_index: u32, device: &ash::Device) -> Queue {
        let queue = unsafe { device.get_device_queue(queue_family_index, 0) };

        Queue {
            handle: queue,
            index: queue_family_index,
        }
    }

    pub fn submit(
        &self,
        device: &ash::Device,
        submit_info: &vk::SubmitInfo,
        fence: vk::Fence,
    ) -> Result<()> {
        unsafe {
            device
                .queue_submit(self.handle, std::slice::from_ref(submit_info), fence)
                .check("vkQueueSubmit")
        }
    }

    pub fn wait_idle(&self, device: &ash::Device) -> Result<()> {
        unsafe { device.queue_wait_idle(self.handle) }.check("vkQueueWaitIdle")
    }
}
