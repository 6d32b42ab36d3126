use crate::error::{Result, VkResultExt};
use crate::lv;
use ash::vk;
use std::sync::Arc;

pub struct DescriptorLayoutBuilder {
    bindings: Vec<vk::DescriptorSetLayoutBinding>,
}

#[derive(Default, Copy, Clone, Debug)]
pub struct PoolSizeRatio {
    pub descriptor_type: vk::DescriptorType,
    pub ratio: f32,
}

impl DescriptorLayoutBuilder {
    pub fn new() -> DescriptorLayoutBuilder {
        DescriptorLayoutBuilder {
            bindings: Vec::new(),
        }
    }

    pub fn add_binding(
        mut self,
        binding: u32,
        descriptor_type: vk::DescriptorType,
        stage_flags: vk::ShaderStageFlags,
    ) -> Self {
        self.bindings.push(vk::DescriptorSetLayoutBinding {
            binding,
            descriptor_count: 1,
            descriptor_type,
            stage_flags,
            ..Default::default()
        });
        self
    }

    pub fn build(self, device: Arc<lv::Device>) -> Result<DescriptorSetLayout> {
        let descriptor_set_ci = vk::DescriptorSetLayoutCreateInfo {
            s_type: vk::StructureType::DESCRIPTOR_SET_LAYOUT_CREATE_INFO,
            p_bindings: self.bindings.as_ptr(),
            binding_count: self.bindings.len() as u32,
            flags: vk::DescriptorSetLayoutCreateFlags::empty(),
            ..Default::default()
        };
        let handle = unsafe {
            device
                .handle
                .create_descriptor_set_layout(&descriptor_set_ci, None)
        }
        .check("vkCreateDescriptorSetLayout")?;
        Ok(DescriptorSetLayout { handle, device })
    }
}

impl Default for DescriptorLayoutBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct DescriptorSetLayout {
    pub handle: vk::DescriptorSetLayout,
    device: Arc<lv::Device>,
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle
                .destroy_descriptor_set_layout(self.handle, None);
        }
    }
}

/// Per-type descriptor counts for a pool holding `max_sets` sets.
pub fn pool_sizes(max_sets: u32, pool_ratio: &[PoolSizeRatio]) -> Vec<vk::DescriptorPoolSize> {
    pool_ratio
        .iter()
        .map(|ratio| vk::DescriptorPoolSize {
            ty: ratio.descriptor_type,
            descriptor_count: ((ratio.ratio * max_sets as f32).ceil() as u32).max(1),
        })
        .collect()
}

pub struct DescriptorAllocator {
    pool: vk::DescriptorPool,
    sets: Vec<vk::DescriptorSet>,

    device: Arc<lv::Device>,
}

impl DescriptorAllocator {
    pub fn new(
        device: Arc<lv::Device>,
        max_sets: u32,
        pool_ratio: &[PoolSizeRatio],
    ) -> Result<Self> {
        let pool_sizes = pool_sizes(max_sets, pool_ratio);

        let pool_ci = vk::DescriptorPoolCreateInfo {
            s_type: vk::StructureType::DESCRIPTOR_POOL_CREATE_INFO,
            flags: vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET,
            max_sets,
            pool_size_count: pool_sizes.len() as u32,
            p_pool_sizes: pool_sizes.as_ptr(),
            ..Default::default()
        };
        let handle = unsafe { device.handle.create_descriptor_pool(&pool_ci, None) }
            .check("vkCreateDescriptorPool")?;
        Ok(Self {
            pool: handle,
            sets: Vec::new(),

            device,
        })
    }

    pub fn allocate(&mut self, layout: &DescriptorSetLayout) -> Result<vk::DescriptorSet> {
        let allocation_info = vk::DescriptorSetAllocateInfo {
            s_type: vk::StructureType::DESCRIPTOR_SET_ALLOCATE_INFO,
            descriptor_pool: self.pool,
            descriptor_set_count: 1,
            p_set_layouts: &layout.handle,
            ..Default::default()
        };
        let set = unsafe { self.device.handle.allocate_descriptor_sets(&allocation_info) }
            .check("vkAllocateDescriptorSets")?[0];
        self.sets.push(set);
        Ok(set)
    }
}

impl Drop for DescriptorAllocator {
    fn drop(&mut self) {
        unsafe {
            if !self.sets.is_empty() {
                if let Err(err) = self
                    .device
                    .handle
                    .free_descriptor_sets(self.pool, &self.sets)
                {
                    log::error!("vkFreeDescriptorSets returns {:?}", err);
                }
            }
            self.device.handle.destroy_descriptor_pool(self.pool, None)
        }
    }
}

/// Collects descriptor writes; the infos are boxed so their addresses stay put until `update`.
pub struct DescriptorWriter {
    buffer_infos: Vec<Box<vk::DescriptorBufferInfo>>,
    image_infos: Vec<Box<vk::DescriptorImageInfo>>,
    writes: Vec<vk::WriteDescriptorSet>,
}

impl DescriptorWriter {
    pub fn new() -> Self {
        Self {
            buffer_infos: Vec::new(),
            image_infos: Vec::new(),
            writes: Vec::new(),
        }
    }

    pub fn write_buffer(
        mut self,
        set: vk::DescriptorSet,
        binding: u32,
        buffer: vk::Buffer,
        descriptor_type: vk::DescriptorType,
    ) -> Self {
        let info = Box::new(vk::DescriptorBufferInfo {
            buffer,
            offset: 0,
            range: vk::WHOLE_SIZE,
        });
        self.writes.push(vk::WriteDescriptorSet {
            s_type: vk::StructureType::WRITE_DESCRIPTOR_SET,
            dst_set: set,
            dst_binding: binding,
            descriptor_count: 1,
            descriptor_type,
            p_buffer_info: &*info,
            ..Default::default()
        });
        self.buffer_infos.push(info);
        self
    }

    pub fn write_image(
        mut self,
        set: vk::DescriptorSet,
        binding: u32,
        sampler: vk::Sampler,
        image_view: vk::ImageView,
        image_layout: vk::ImageLayout,
    ) -> Self {
        let info = Box::new(vk::DescriptorImageInfo {
            sampler,
            image_view,
            image_layout,
        });
        self.writes.push(vk::WriteDescriptorSet {
            s_type: vk::StructureType::WRITE_DESCRIPTOR_SET,
            dst_set: set,
            dst_binding: binding,
            descriptor_count: 1,
            descriptor_type: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            p_image_info: &*info,
            ..Default::default()
        });
        self.image_infos.push(info);
        self
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn update(self, device: &lv::Device) {
        unsafe { device.handle.update_descriptor_sets(&self.writes, &[]) };
    }
}

impl Default for DescriptorWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_sizes_scale_with_set_count() {
        let sizes = pool_sizes(
            3,
            &[
                PoolSizeRatio {
                    descriptor_type: vk::DescriptorType::UNIFORM_BUFFER,
                    ratio: 1.0,
                },
                PoolSizeRatio {
                    descriptor_type: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                    ratio: 0.5,
                },
            ],
        );
        assert_eq!(sizes[0].ty, vk::DescriptorType::UNIFORM_BUFFER);
        assert_eq!(sizes[0].descriptor_count, 3);
        assert_eq!(sizes[1].descriptor_count, 2);
    }

    #[test]
    fn writer_pointers_follow_their_infos() {
        let set = vk::DescriptorSet::null();
        let writer = DescriptorWriter::new()
            .write_buffer(
                set,
                0,
                vk::Buffer::null(),
                vk::DescriptorType::UNIFORM_BUFFER,
            )
            .write_image(
                set,
                1,
                vk::Sampler::null(),
                vk::ImageView::null(),
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            );

        assert_eq!(writer.len(), 2);
        assert_eq!(writer.writes[0].dst_binding, 0);
        assert_eq!(
            writer.writes[0].p_buffer_info,
            &*writer.buffer_infos[0] as *const _
        );
        assert_eq!(writer.writes[1].dst_binding, 1);
        assert_eq!(
            writer.writes[1].p_image_info,
            &*writer.image_infos[0] as *const _
        );
        let range = unsafe { (*writer.writes[0].p_buffer_info).range };
        assert_eq!(range, vk::WHOLE_SIZE);
    }
}
