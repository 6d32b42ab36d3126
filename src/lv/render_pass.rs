use crate::error::{Result, VkResultExt};
use crate::lv;
use ash::vk;
use std::sync::Arc;

/// Single colour attachment, cleared on load and handed to the presentation engine.
pub struct RenderPass {
    pub handle: vk::RenderPass,
    device: Arc<lv::Device>,
}

impl RenderPass {
    pub fn new(device: Arc<lv::Device>, format: vk::Format) -> Result<RenderPass> {
        let attachment_description = vk::AttachmentDescription {
            format,
            samples: vk::SampleCountFlags::TYPE_1,
            load_op: vk::AttachmentLoadOp::CLEAR,
            store_op: vk::AttachmentStoreOp::STORE,
            stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
            stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
            initial_layout: vk::ImageLayout::UNDEFINED,
            final_layout: vk::ImageLayout::PRESENT_SRC_KHR,
            ..Default::default()
        };
        let attachment_reference = vk::AttachmentReference {
            attachment: 0,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        };
        let subpass_description = vk::SubpassDescription {
            pipeline_bind_point: vk::PipelineBindPoint::GRAPHICS,
            color_attachment_count: 1,
            p_color_attachments: &attachment_reference,
            ..Default::default()
        };
        let render_pass_ci = vk::RenderPassCreateInfo {
            s_type: vk::StructureType::RENDER_PASS_CREATE_INFO,
            attachment_count: 1,
            p_attachments: &attachment_description,
            subpass_count: 1,
            p_subpasses: &subpass_description,
            ..Default::default()
        };
        let handle = unsafe { device.handle.create_render_pass(&render_pass_ci, None) }
            .check("vkCreateRenderPass")?;

        Ok(RenderPass { handle, device })
    }
}

impl Drop for RenderPass {
    fn drop(&mut self) {
        unsafe {
            self.device.handle.destroy_render_pass(self.handle, None);
        }
    }
}

/// One framebuffer per swapchain image, indexed by the acquired image index.
pub struct Framebuffers {
    pub handles: Vec<vk::Framebuffer>,
    device: Arc<lv::Device>,
}

impl Framebuffers {
    pub fn new(
        device: Arc<lv::Device>,
        render_pass: &RenderPass,
        swapchain: &lv::Swapchain,
    ) -> Result<Framebuffers> {
        let mut framebuffers = Framebuffers {
            handles: Vec::with_capacity(swapchain.image_views.len()),
            device,
        };
        for image_view in swapchain.image_views.iter() {
            let framebuffer_ci = vk::FramebufferCreateInfo {
                s_type: vk::StructureType::FRAMEBUFFER_CREATE_INFO,
                render_pass: render_pass.handle,
                attachment_count: 1,
                p_attachments: image_view,
                width: swapchain.extent.width,
                height: swapchain.extent.height,
                layers: 1,
                ..Default::default()
            };
            let framebuffer =
                unsafe { framebuffers.device.handle.create_framebuffer(&framebuffer_ci, None) }
                    .check("vkCreateFramebuffer")?;
            framebuffers.handles.push(framebuffer);
        }
        Ok(framebuffers)
    }

    pub fn get(&self, image_index: u32) -> vk::Framebuffer {
        self.handles[image_index as usize]
    }
}

impl Drop for Framebuffers {
    fn drop(&mut self) {
        unsafe {
            for framebuffer in self.handles.drain(..) {
                self.device.handle.destroy_framebuffer(framebuffer, None);
            }
        }
    }
}
