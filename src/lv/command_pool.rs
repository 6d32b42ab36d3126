use crate::error::{Result, VkResultExt};
use crate::lv;
use ash::vk;
use std::sync::Arc;

pub struct CommandPool {
    handle: vk::CommandPool,
    device: Arc<lv::Device>,
}

impl CommandPool {
    pub fn new(
        flags: vk::CommandPoolCreateFlags,
        queue: &lv::Queue,
        device: Arc<lv::Device>,
    ) -> Result<Self> {
        let pool_ci = vk::CommandPoolCreateInfo {
            s_type: vk::StructureType::COMMAND_POOL_CREATE_INFO,
            flags,
            queue_family_index: queue.index,
            ..Default::default()
        };
        let pool = unsafe { device.handle.create_command_pool(&pool_ci, None) }
            .check("vkCreateCommandPool")?;
        Ok(CommandPool {
            handle: pool,
            device,
        })
    }

    pub fn get_handle(&self) -> vk::CommandPool {
        self.handle
    }

    pub fn allocate(&self, level: vk::CommandBufferLevel, count: u32) -> Result<Vec<lv::CommandBuffer>> {
        let command_buffer_ai = vk::CommandBufferAllocateInfo {
            s_type: vk::StructureType::COMMAND_BUFFER_ALLOCATE_INFO,
            command_pool: self.handle,
            level,
            command_buffer_count: count,
            ..Default::default()
        };
        let handles = unsafe { self.device.handle.allocate_command_buffers(&command_buffer_ai) }
            .check("vkAllocateCommandBuffers")?;
        Ok(handles
            .into_iter()
            .map(|handle| lv::CommandBuffer::from_handle(handle, self.device.clone()))
            .collect())
    }

    /// Records `record` into a throwaway command buffer, submits it and waits for the queue.
    pub fn submit_once<F>(&self, queue: &lv::Queue, record: F) -> Result<()>
    where
        F: FnOnce(&ash::Device, vk::CommandBuffer),
    {
        let mut command_buffers = self.allocate(vk::CommandBufferLevel::PRIMARY, 1)?;
        let command_buffer = command_buffers.remove(0);
        command_buffer.begin(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)?;
        record(&self.device.handle, command_buffer.get_handle());
        command_buffer.end()?;

        let handle = command_buffer.get_handle();
        let submit_info = vk::SubmitInfo {
            s_type: vk::StructureType::SUBMIT_INFO,
            command_buffer_count: 1,
            p_command_buffers: &handle,
            ..Default::default()
        };
        queue.submit(&self.device.handle, &submit_info, vk::Fence::null())?;
        queue.wait_idle(&self.device.handle)?;

        unsafe {
            self.device
                .handle
                .free_command_buffers(self.handle, &[handle]);
        }
        Ok(())
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            self.device.handle.destroy_command_pool(self.handle, None);
        };
    }
}
