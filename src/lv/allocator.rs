use crate::error::Result;
use crate::lv;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use gpu_allocator::{AllocationSizes, AllocatorDebugSettings};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Shared sub-allocator; every allocated resource keeps a handle to it.
#[derive(Clone)]
pub struct GpuAllocator {
    inner: Arc<Mutex<Allocator>>,
}

impl GpuAllocator {
    pub fn new(device: &lv::Device) -> Result<GpuAllocator> {
        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: device.instance.instance.clone(),
            device: device.handle.clone(),
            physical_device: device.physical_device.handle,
            debug_settings: AllocatorDebugSettings::default(),
            buffer_device_address: false,
            allocation_sizes: AllocationSizes::default(),
        })?;
        Ok(GpuAllocator {
            inner: Arc::new(Mutex::new(allocator)),
        })
    }

    pub fn lock(&self) -> MutexGuard<'_, Allocator> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
