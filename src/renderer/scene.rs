use crate::assets::{AssetManager, Texture};
use crate::error::Result;
use crate::lv::descriptors::{
    DescriptorAllocator, DescriptorLayoutBuilder, DescriptorSetLayout, DescriptorWriter,
    PoolSizeRatio,
};
use crate::{lv, utility};
use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};
use gpu_allocator::MemoryLocation;
use std::mem::{offset_of, size_of};
use std::sync::Arc;

const TEXTURE_NAME: &str = "vulkan.png";

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub color: Vec3,
    pub uv: Vec2,
}

impl Vertex {
    pub const TRIANGLE: [Vertex; 3] = [
        Vertex {
            position: Vec3::new(0.0, -0.5, 0.0),
            color: Vec3::new(1.0, 0.0, 0.0),
            uv: Vec2::new(0.5, 0.0),
        },
        Vertex {
            position: Vec3::new(0.5, 0.5, 0.0),
            color: Vec3::new(0.0, 1.0, 0.0),
            uv: Vec2::new(1.0, 1.0),
        },
        Vertex {
            position: Vec3::new(-0.5, 0.5, 0.0),
            color: Vec3::new(0.0, 0.0, 1.0),
            uv: Vec2::new(0.0, 1.0),
        },
    ];

    pub fn binding_descriptions() -> Vec<vk::VertexInputBindingDescription> {
        vec![vk::VertexInputBindingDescription {
            binding: 0,
            stride: size_of::<Vertex>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }]
    }

    pub fn attribute_descriptions() -> Vec<vk::VertexInputAttributeDescription> {
        vec![
            vk::VertexInputAttributeDescription {
                location: 0,
                binding: 0,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: offset_of!(Vertex, position) as u32,
            },
            vk::VertexInputAttributeDescription {
                location: 1,
                binding: 0,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: offset_of!(Vertex, color) as u32,
            },
            vk::VertexInputAttributeDescription {
                location: 2,
                binding: 0,
                format: vk::Format::R32G32_SFLOAT,
                offset: offset_of!(Vertex, uv) as u32,
            },
        ]
    }
}

/// CPU mirror of the vertex shader's std140 uniform block.
///
/// `float position[2]` has a 16 byte array stride, so only the first lane of each element is
/// read by the shader. `ratio` follows at byte 32.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Uniform {
    pub position: [[f32; 4]; 2],
    pub ratio: f32,
    _padding: [f32; 3],
}

impl Uniform {
    pub const STEP: f32 = 0.01;
    pub const LIMIT: f32 = 1.5;

    /// Slides the triangle diagonally, wrapping back to the far edge, and refreshes the aspect
    /// ratio from the swapchain extent.
    pub fn advance(&mut self, extent: vk::Extent2D) {
        for element in self.position.iter_mut() {
            element[0] += Self::STEP;
            if element[0] > Self::LIMIT {
                element[0] = -Self::LIMIT;
            }
        }
        self.ratio = extent.height as f32 / extent.width as f32;
    }

    pub fn offset(&self) -> Vec2 {
        Vec2::new(self.position[0][0], self.position[1][0])
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClearColor(pub [f32; 4]);

impl Default for ClearColor {
    fn default() -> Self {
        ClearColor([0.15, 0.15, 0.15, 1.0])
    }
}

impl ClearColor {
    /// Every channel, alpha included, creeps up and wraps at 1.0.
    pub fn advance(&mut self) {
        for channel in self.0.iter_mut() {
            *channel = (*channel + 0.01) % 1.0;
        }
    }

    pub fn value(&self) -> vk::ClearValue {
        vk::ClearValue {
            color: vk::ClearColorValue { float32: self.0 },
        }
    }
}

/// Device objects a scene is built from.
pub struct SceneContext<'a> {
    pub device: &'a Arc<lv::Device>,
    pub allocator: &'a lv::GpuAllocator,
    pub command_pool: &'a lv::CommandPool,
    pub render_pass: &'a lv::RenderPass,
    pub assets: &'a AssetManager,
    pub slot_count: usize,
}

/// What gets drawn inside the render pass. Slot-indexed state lives here.
pub trait Scene {
    fn name(&self) -> &'static str;

    fn clear_color(&self) -> vk::ClearValue;

    /// Runs after the slot's submit fence has been waited on.
    fn update(&mut self, slot: usize, extent: vk::Extent2D) -> Result<()>;

    /// Records binds and draws; viewport and scissor are already set.
    fn draw(&self, device: &ash::Device, command_buffer: vk::CommandBuffer, slot: usize);
}

/// Device-local vertex buffer filled through a host-visible staging copy.
fn upload_vertices(context: &SceneContext, vertices: &[Vertex]) -> Result<lv::AllocatedBuffer> {
    let bytes: &[u8] = bytemuck::cast_slice(vertices);
    let size = bytes.len() as vk::DeviceSize;

    let mut staging = lv::AllocatedBuffer::new(
        "Vertex staging",
        size,
        vk::BufferUsageFlags::TRANSFER_SRC,
        MemoryLocation::CpuToGpu,
        context.device.clone(),
        context.allocator.clone(),
    )?;
    staging.write(vertices)?;

    let vertex_buffer = lv::AllocatedBuffer::new(
        "Vertex buffer",
        size,
        vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST,
        MemoryLocation::GpuOnly,
        context.device.clone(),
        context.allocator.clone(),
    )?;

    context
        .command_pool
        .submit_once(&context.device.queue, |device, command_buffer| {
            let region = vk::BufferCopy {
                src_offset: 0,
                dst_offset: 0,
                size,
            };
            unsafe {
                device.cmd_copy_buffer(
                    command_buffer,
                    staging.get_handle(),
                    vertex_buffer.get_handle(),
                    &[region],
                )
            };
        })?;
    log::debug!("Uploaded {} vertices ({} bytes)", vertices.len(), size);

    Ok(vertex_buffer)
}

fn bind_vertices(device: &ash::Device, command_buffer: vk::CommandBuffer, buffer: vk::Buffer) {
    unsafe { device.cmd_bind_vertex_buffers(command_buffer, 0, &[buffer], &[0]) };
}

/// Vertex-coloured triangle over a clear colour that cycles every frame.
pub struct TriangleScene {
    frame_color: ClearColor,
    next_color: ClearColor,

    vertex_buffer: lv::AllocatedBuffer,
    pipeline: lv::Pipeline,
}

impl TriangleScene {
    pub fn new(context: &SceneContext) -> Result<TriangleScene> {
        let vertex_shader = lv::Shader::from_glsl(
            context.device.clone(),
            include_str!("../../shaders/triangle.vert"),
            lv::ShaderKind::Vertex,
            "triangle.vert",
        )?;
        let fragment_shader = lv::Shader::from_glsl(
            context.device.clone(),
            include_str!("../../shaders/triangle.frag"),
            lv::ShaderKind::Fragment,
            "triangle.frag",
        )?;
        let pipeline = lv::PipelineBuilder::new()
            .add_shader(&vertex_shader)
            .add_shader(&fragment_shader)
            .set_vertex_input(Vertex::binding_descriptions(), Vertex::attribute_descriptions())
            .build(context.device.clone(), context.render_pass)?;

        let vertex_buffer = upload_vertices(context, &Vertex::TRIANGLE)?;

        Ok(TriangleScene {
            frame_color: ClearColor::default(),
            next_color: ClearColor::default(),
            vertex_buffer,
            pipeline,
        })
    }
}

impl Scene for TriangleScene {
    fn name(&self) -> &'static str {
        "triangle"
    }

    fn clear_color(&self) -> vk::ClearValue {
        self.frame_color.value()
    }

    fn update(&mut self, _slot: usize, _extent: vk::Extent2D) -> Result<()> {
        self.frame_color = self.next_color;
        self.next_color.advance();
        Ok(())
    }

    fn draw(&self, device: &ash::Device, command_buffer: vk::CommandBuffer, _slot: usize) {
        unsafe {
            device.cmd_bind_pipeline(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                self.pipeline.handle,
            )
        };
        bind_vertices(device, command_buffer, self.vertex_buffer.get_handle());
        unsafe { device.cmd_draw(command_buffer, Vertex::TRIANGLE.len() as u32, 1, 0, 0) };
    }
}

/// Per-slot uniform block and the descriptor set that points at it.
struct UniformSlot {
    uniform: Uniform,
    buffer: lv::AllocatedBuffer,
    descriptor_set: vk::DescriptorSet,
}

/// Textured triangle moved around by a per-slot uniform buffer.
pub struct TexturedScene {
    clear_color: ClearColor,
    slots: Vec<UniformSlot>,

    // Released in declaration order: sets before their pool, pool before the layout.
    _descriptor_allocator: DescriptorAllocator,
    _descriptor_layout: DescriptorSetLayout,
    _sampler: lv::Sampler,
    _texture: lv::AllocatedImage,
    vertex_buffer: lv::AllocatedBuffer,
    pipeline: lv::Pipeline,
}

impl TexturedScene {
    pub fn new(context: &SceneContext) -> Result<TexturedScene> {
        let device = context.device;

        let descriptor_layout = DescriptorLayoutBuilder::new()
            .add_binding(
                0,
                vk::DescriptorType::UNIFORM_BUFFER,
                vk::ShaderStageFlags::VERTEX,
            )
            .add_binding(
                1,
                vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                vk::ShaderStageFlags::FRAGMENT,
            )
            .build(device.clone())?;

        let vertex_shader = lv::Shader::from_glsl(
            device.clone(),
            include_str!("../../shaders/textured.vert"),
            lv::ShaderKind::Vertex,
            "textured.vert",
        )?;
        let fragment_shader = lv::Shader::from_glsl(
            device.clone(),
            include_str!("../../shaders/textured.frag"),
            lv::ShaderKind::Fragment,
            "textured.frag",
        )?;
        let pipeline = lv::PipelineBuilder::new()
            .add_shader(&vertex_shader)
            .add_shader(&fragment_shader)
            .set_vertex_input(Vertex::binding_descriptions(), Vertex::attribute_descriptions())
            .add_set_layout(descriptor_layout.handle)
            .build(device.clone(), context.render_pass)?;

        let vertex_buffer = upload_vertices(context, &Vertex::TRIANGLE)?;

        // Texture: linear host-visible image, then a single layout transition for sampling
        let texture_data = Texture::load(context.assets, TEXTURE_NAME)?;
        let texture =
            lv::AllocatedImage::from_texture(&texture_data, device.clone(), context.allocator.clone())?;
        let texture_handle = texture.get_handle();
        context
            .command_pool
            .submit_once(&device.queue, |device, command_buffer| {
                utility::transition_image(
                    device,
                    command_buffer,
                    texture_handle,
                    vk::ImageLayout::PREINITIALIZED,
                    vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                    vk::AccessFlags::empty(),
                    vk::AccessFlags::SHADER_READ,
                    vk::PipelineStageFlags::TOP_OF_PIPE,
                    vk::PipelineStageFlags::FRAGMENT_SHADER,
                );
            })?;
        log::info!(
            "Loaded texture {} ({}x{})",
            TEXTURE_NAME,
            texture.extent.width,
            texture.extent.height
        );

        let sampler = lv::Sampler::new(
            device.clone(),
            vk::Filter::NEAREST,
            vk::SamplerAddressMode::REPEAT,
        )?;

        let mut descriptor_allocator = DescriptorAllocator::new(
            device.clone(),
            context.slot_count as u32,
            &[
                PoolSizeRatio {
                    descriptor_type: vk::DescriptorType::UNIFORM_BUFFER,
                    ratio: 1.0,
                },
                PoolSizeRatio {
                    descriptor_type: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                    ratio: 1.0,
                },
            ],
        )?;

        let mut slots = Vec::with_capacity(context.slot_count);
        let mut writer = DescriptorWriter::new();
        for slot in 0..context.slot_count {
            let uniform = Uniform::default();
            let mut buffer = lv::AllocatedBuffer::new(
                &format!("Uniform {}", slot),
                size_of::<Uniform>() as vk::DeviceSize,
                vk::BufferUsageFlags::UNIFORM_BUFFER,
                MemoryLocation::CpuToGpu,
                device.clone(),
                context.allocator.clone(),
            )?;
            buffer.write(&[uniform])?;

            let descriptor_set = descriptor_allocator.allocate(&descriptor_layout)?;
            writer = writer
                .write_buffer(
                    descriptor_set,
                    0,
                    buffer.get_handle(),
                    vk::DescriptorType::UNIFORM_BUFFER,
                )
                .write_image(
                    descriptor_set,
                    1,
                    sampler.handle,
                    texture.get_view(),
                    vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                );
            slots.push(UniformSlot {
                uniform,
                buffer,
                descriptor_set,
            });
        }
        log::debug!("Writing {} descriptors", writer.len());
        writer.update(device);

        Ok(TexturedScene {
            clear_color: ClearColor::default(),
            slots,
            _descriptor_allocator: descriptor_allocator,
            _descriptor_layout: descriptor_layout,
            _sampler: sampler,
            _texture: texture,
            vertex_buffer,
            pipeline,
        })
    }
}

impl Scene for TexturedScene {
    fn name(&self) -> &'static str {
        "textured"
    }

    fn clear_color(&self) -> vk::ClearValue {
        self.clear_color.value()
    }

    fn update(&mut self, slot: usize, extent: vk::Extent2D) -> Result<()> {
        let slot = &mut self.slots[slot];
        slot.uniform.advance(extent);
        slot.buffer.write(&[slot.uniform])
    }

    fn draw(&self, device: &ash::Device, command_buffer: vk::CommandBuffer, slot: usize) {
        unsafe {
            device.cmd_bind_pipeline(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                self.pipeline.handle,
            );
            device.cmd_bind_descriptor_sets(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                self.pipeline.layout,
                0,
                &[self.slots[slot].descriptor_set],
                &[],
            );
        }
        bind_vertices(device, command_buffer, self.vertex_buffer.get_handle());
        unsafe { device.cmd_draw(command_buffer, Vertex::TRIANGLE.len() as u32, 1, 0, 0) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extent(width: u32, height: u32) -> vk::Extent2D {
        vk::Extent2D { width, height }
    }

    #[test]
    fn vertex_layout_is_tightly_packed() {
        assert_eq!(size_of::<Vertex>(), 32);
        let offsets: Vec<u32> = Vertex::attribute_descriptions()
            .iter()
            .map(|attribute| attribute.offset)
            .collect();
        assert_eq!(offsets, vec![0, 12, 24]);
        assert_eq!(Vertex::binding_descriptions()[0].stride, 32);
    }

    #[test]
    fn uniform_matches_std140_layout() {
        assert_eq!(offset_of!(Uniform, position), 0);
        assert_eq!(offset_of!(Uniform, ratio), 32);
        assert_eq!(size_of::<Uniform>() % 16, 0);

        let mut uniform = Uniform::default();
        uniform.position[1][0] = 0.25;
        uniform.ratio = 0.5;
        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&uniform));
        assert_eq!(floats[4], 0.25);
        assert_eq!(floats[8], 0.5);
    }

    #[test]
    fn uniform_advances_and_sets_ratio() {
        let mut uniform = Uniform::default();
        uniform.advance(extent(800, 600));

        assert!((uniform.offset() - Vec2::splat(0.01)).length() < 1e-6);
        assert_eq!(uniform.ratio, 0.75);
        // Unused std140 lanes stay untouched
        assert_eq!(uniform.position[0][1..], [0.0; 3]);
    }

    #[test]
    fn uniform_wraps_past_the_edge() {
        let mut uniform = Uniform::default();
        uniform.position[0][0] = 1.495;
        uniform.position[1][0] = 1.5;

        uniform.advance(extent(1080, 2400));

        assert_eq!(uniform.offset(), Vec2::splat(-1.5));
        assert!((uniform.ratio - 2400.0 / 1080.0).abs() < 1e-6);

        uniform.advance(extent(1080, 2400));
        assert!((uniform.offset() - Vec2::splat(-1.49)).length() < 1e-6);
    }

    #[test]
    fn clear_color_starts_grey_and_wraps() {
        let mut color = ClearColor::default();
        assert_eq!(color.0, [0.15, 0.15, 0.15, 1.0]);

        color.advance();
        assert!((color.0[0] - 0.16).abs() < 1e-6);
        assert!((color.0[3] - 0.01).abs() < 1e-6);

        let mut color = ClearColor([0.995, 0.5, 0.0, 0.999]);
        color.advance();
        let expected = [0.005, 0.51, 0.01, 0.009];
        for (channel, expected) in color.0.iter().zip(expected) {
            assert!((channel - expected).abs() < 1e-5, "{} != {}", channel, expected);
        }
    }

    #[test]
    fn clear_value_carries_the_colour() {
        let color = ClearColor([0.1, 0.2, 0.3, 0.4]);
        let value = color.value();
        assert_eq!(unsafe { value.color.float32 }, [0.1, 0.2, 0.3, 0.4]);
    }
}
