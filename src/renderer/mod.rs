use crate::assets::AssetManager;
use crate::config::{RendererConfig, Sample};
use crate::error::{Result, VkResultExt};
use crate::frame::{FrameBackend, FrameData, FrameRing};
use crate::{lv, utility};
use ash::vk;
use raw_window_handle::{HasRawDisplayHandle, HasRawWindowHandle};
use std::ffi::CStr;
use std::sync::Arc;

pub mod scene;

use self::scene::{Scene, SceneContext, TexturedScene, TriangleScene};

const APP_NAME: &str = "vk_samples";
const PREFERRED_FORMATS: [vk::Format; 2] = [vk::Format::R8G8B8A8_UNORM, vk::Format::B8G8R8A8_UNORM];
const PREFERRED_PRESENT_MODES: [vk::PresentModeKHR; 1] = [vk::PresentModeKHR::FIFO];

/// Instance, surface, device and swapchain. Fields are dropped top to bottom.
pub struct Context {
    pub swapchain: lv::Swapchain,
    pub device: Arc<lv::Device>,
    pub physical_device: Arc<lv::PhysicalDevice>,
    pub surface: Arc<lv::Surface>,
    _debug_messenger: Option<lv::DebugMessenger>,
    pub instance: Arc<lv::Instance>,
}

impl Context {
    pub fn new<W>(window: &W, config: &RendererConfig) -> Result<Context>
    where
        W: HasRawDisplayHandle + HasRawWindowHandle,
    {
        let entry = unsafe { ash::Entry::load() }?;
        let display_handle = window.raw_display_handle();
        let window_handle = window.raw_window_handle();

        let surface_extensions = ash_window::enumerate_required_extensions(display_handle)
            .check("vkEnumerateInstanceExtensionProperties")?;
        let instance = lv::Instance::new(entry, APP_NAME, surface_extensions, config.validation)?;
        let debug_messenger = lv::DebugMessenger::new(instance.clone())?;
        let surface = lv::Surface::new(instance.clone(), display_handle, window_handle)?;

        let device_extensions: [&CStr; 1] = [ash::extensions::khr::Swapchain::name()];
        let physical_device =
            lv::PhysicalDevice::pick(instance.clone(), &surface, &device_extensions)?;
        let device = lv::Device::new(
            physical_device.clone(),
            &device_extensions,
            instance.clone(),
        )?;

        let swapchain = lv::Swapchain::new(
            device.clone(),
            surface.clone(),
            lv::SwapchainPreferred {
                preferred_format: &PREFERRED_FORMATS,
                preferred_present_modes: &PREFERRED_PRESENT_MODES,
                swapchain_support_details: physical_device.get_swapchain_support(&surface)?,
                width: config.width,
                height: config.height,
            },
        )?;

        Ok(Context {
            swapchain,
            device,
            physical_device,
            surface,
            _debug_messenger: debug_messenger,
            instance,
        })
    }
}

/// Vulkan side of the frame loop. Field order is teardown order.
struct VkFrameBackend {
    scene: Box<dyn Scene>,
    slots: Vec<FrameData>,
    framebuffers: lv::Framebuffers,
    render_pass: lv::RenderPass,
    _command_pool: lv::CommandPool,
    _allocator: lv::GpuAllocator,
    context: Context,
}

impl FrameBackend for VkFrameBackend {
    fn wait_for_slot(&mut self, slot: usize) -> Result<()> {
        self.slots[slot].submit_fence.wait_and_reset()
    }

    fn update(&mut self, slot: usize) -> Result<()> {
        self.scene.update(slot, self.context.swapchain.extent)
    }

    fn acquire(&mut self, slot: usize) -> Result<u32> {
        let acquire_fence = &self.slots[slot].acquire_fence;
        let image_index = self
            .context
            .swapchain
            .acquire_next_image(acquire_fence.get_handle())?;
        acquire_fence.wait_and_reset()?;
        Ok(image_index)
    }

    fn record(&mut self, slot: usize, image_index: u32) -> Result<()> {
        let device = &self.context.device.handle;
        let extent = self.context.swapchain.extent;
        let command_buffer = &self.slots[slot].command_buffer;
        let handle = command_buffer.get_handle();

        command_buffer.reset()?;
        command_buffer.begin(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)?;

        let clear_value = self.scene.clear_color();
        let render_pass_bi = vk::RenderPassBeginInfo {
            s_type: vk::StructureType::RENDER_PASS_BEGIN_INFO,
            render_pass: self.render_pass.handle,
            framebuffer: self.framebuffers.get(image_index),
            render_area: utility::init::scissor(extent),
            clear_value_count: 1,
            p_clear_values: &clear_value,
            ..Default::default()
        };
        unsafe {
            device.cmd_begin_render_pass(handle, &render_pass_bi, vk::SubpassContents::INLINE);
            device.cmd_set_viewport(handle, 0, &[utility::init::viewport(extent)]);
            device.cmd_set_scissor(handle, 0, &[utility::init::scissor(extent)]);
        }
        self.scene.draw(device, handle, slot);
        unsafe { device.cmd_end_render_pass(handle) };

        command_buffer.end()
    }

    fn submit(&mut self, slot: usize) -> Result<()> {
        let frame = &self.slots[slot];
        let command_buffer = frame.command_buffer.get_handle();
        let signal_semaphore = frame.semaphore.get_handle();
        let submit_info = vk::SubmitInfo {
            s_type: vk::StructureType::SUBMIT_INFO,
            command_buffer_count: 1,
            p_command_buffers: &command_buffer,
            signal_semaphore_count: 1,
            p_signal_semaphores: &signal_semaphore,
            ..Default::default()
        };
        self.context.device.queue.submit(
            &self.context.device.handle,
            &submit_info,
            frame.submit_fence.get_handle(),
        )
    }

    fn present(&mut self, slot: usize, image_index: u32) -> Result<()> {
        self.context.swapchain.present(
            &self.context.device.queue,
            self.slots[slot].semaphore.get_handle(),
            image_index,
        )
    }
}

pub struct VkRenderer {
    frames: FrameRing,
    backend: VkFrameBackend,
}

impl VkRenderer {
    pub fn new<W>(window: &W, assets: &AssetManager, config: &RendererConfig) -> Result<VkRenderer>
    where
        W: HasRawDisplayHandle + HasRawWindowHandle,
    {
        let context = Context::new(window, config)?;
        let device = context.device.clone();

        let image_count = context.swapchain.image_count();
        let slot_count = config.frame_slot_count(image_count);

        let allocator = lv::GpuAllocator::new(&device)?;
        let command_pool = lv::CommandPool::new(
            vk::CommandPoolCreateFlags::TRANSIENT
                | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
            &device.queue,
            device.clone(),
        )?;
        let slots = FrameData::create_slots(slot_count, &command_pool, device.clone())?;

        let render_pass = lv::RenderPass::new(device.clone(), context.swapchain.surface_format.format)?;
        let framebuffers = lv::Framebuffers::new(device.clone(), &render_pass, &context.swapchain)?;

        let scene_context = SceneContext {
            device: &device,
            allocator: &allocator,
            command_pool: &command_pool,
            render_pass: &render_pass,
            assets,
            slot_count,
        };
        let scene: Box<dyn Scene> = match config.sample {
            Sample::Triangle => Box::new(TriangleScene::new(&scene_context)?),
            Sample::Textured => Box::new(TexturedScene::new(&scene_context)?),
        };
        log::info!(
            "Rendering the {} sample with {} frame slots over {} swapchain images",
            scene.name(),
            slot_count,
            image_count
        );

        Ok(VkRenderer {
            frames: FrameRing::new(slot_count),
            backend: VkFrameBackend {
                scene,
                slots,
                framebuffers,
                render_pass,
                _command_pool: command_pool,
                _allocator: allocator,
                context,
            },
        })
    }

    pub fn render(&mut self) -> Result<()> {
        self.frames.render(&mut self.backend).map(|_| ())
    }
}

impl Drop for VkRenderer {
    fn drop(&mut self) {
        // Nothing may be released while the GPU still uses it.
        if let Err(err) = self.backend.context.device.wait_idle() {
            log::error!("{}", err);
        }
        log::info!(
            "Shutting down after {} frames",
            self.frames.frames_rendered()
        );
    }
}
