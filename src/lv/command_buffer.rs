use crate::error::{Result, VkResultExt};
use crate::lv;
use ash::vk;
use std::sync::Arc;

/// Command buffer handle; freed together with its pool.
pub struct CommandBuffer {
    handle: vk::CommandBuffer,
    device: Arc<lv::Device>,
}

impl CommandBuffer {
    pub fn from_handle(handle: vk::CommandBuffer, device: Arc<lv::Device>) -> Self {
        CommandBuffer { handle, device }
    }

    pub fn get_handle(&self) -> vk::CommandBuffer {
        self.handle
    }

    pub fn reset(&self) -> Result<()> {
        unsafe {
            self.device
                .handle
                .reset_command_buffer(self.handle, vk::CommandBufferResetFlags::empty())
        }
        .check("vkResetCommandBuffer")
    }

    pub fn begin(&self, flags: vk::CommandBufferUsageFlags) -> Result<()> {
        let begin_info = vk::CommandBufferBeginInfo {
            s_type: vk::StructureType::COMMAND_BUFFER_BEGIN_INFO,
            flags,
            ..Default::default()
        };
        unsafe {
            self.device
                .handle
                .begin_command_buffer(self.handle, &begin_info)
        }
        .check("vkBeginCommandBuffer")
    }

    pub fn end(&self) -> Result<()> {
        unsafe { self.device.handle.end_command_buffer(self.handle) }.check("vkEndCommandBuffer")
    }
}
