use crate::error::{Error, Result, VkResultExt};
use crate::lv;
use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use std::sync::Arc;

pub struct AllocatedBuffer {
    handle: vk::Buffer,
    allocation: Allocation,
    size: vk::DeviceSize,

    allocator: lv::GpuAllocator,
    device: Arc<lv::Device>,
}

impl AllocatedBuffer {
    pub fn new(
        name: &str,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        location: MemoryLocation,
        device: Arc<lv::Device>,
        allocator: lv::GpuAllocator,
    ) -> Result<Self> {
        let buffer_ci = vk::BufferCreateInfo {
            s_type: vk::StructureType::BUFFER_CREATE_INFO,
            size,
            usage,
            sharing_mode: vk::SharingMode::EXCLUSIVE,
            ..Default::default()
        };
        let handle =
            unsafe { device.handle.create_buffer(&buffer_ci, None) }.check("vkCreateBuffer")?;
        let requirements = unsafe { device.handle.get_buffer_memory_requirements(handle) };

        let allocation = allocator.lock().allocate(&AllocationCreateDesc {
            name,
            requirements,
            location,
            linear: true,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        });
        let allocation = match allocation {
            Ok(allocation) => allocation,
            Err(err) => {
                unsafe { device.handle.destroy_buffer(handle, None) };
                return Err(err.into());
            }
        };
        // Release through Drop from here on.
        let buffer = AllocatedBuffer {
            handle,
            allocation,
            size,
            allocator,
            device,
        };
        unsafe {
            buffer.device.handle.bind_buffer_memory(
                handle,
                buffer.allocation.memory(),
                buffer.allocation.offset(),
            )
        }
        .check("vkBindBufferMemory")?;

        Ok(buffer)
    }

    pub fn get_handle(&self) -> vk::Buffer {
        self.handle
    }

    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    /// Host view of the buffer memory; `None` for device-only allocations.
    pub fn mapped_slice_mut(&mut self) -> Option<&mut [u8]> {
        self.allocation
            .mapped_slice_mut()
            .map(|slice| &mut slice[..self.size as usize])
    }

    /// Copies `data` to the start of a host-visible buffer.
    pub fn write<T: bytemuck::Pod>(&mut self, data: &[T]) -> Result<()> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        match self.mapped_slice_mut() {
            Some(mapped) if mapped.len() >= bytes.len() => {
                mapped[..bytes.len()].copy_from_slice(bytes);
                Ok(())
            }
            _ => Err(Error::Vulkan {
                call: "vkMapMemory",
                result: vk::Result::ERROR_MEMORY_MAP_FAILED,
            }),
        }
    }
}

impl Drop for AllocatedBuffer {
    fn drop(&mut self) {
        unsafe {
            self.device.handle.destroy_buffer(self.handle, None);
        }
        if let Err(err) = self.allocator.lock().free(std::mem::take(&mut self.allocation)) {
            log::error!("Failed to free buffer memory: {}", err);
        }
    }
}
