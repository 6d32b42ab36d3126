mod allocator;
mod buffer;
mod command_buffer;
mod command_pool;
mod debug_messenger;
pub mod descriptors;
mod device;
mod fence;
mod image;
mod instance;
mod pipeline;
mod queue;
mod render_pass;
mod sampler;
mod semaphore;
mod shader;
mod surface;
mod swapchain;

// Re-export everything
pub use self::allocator::*;
pub use self::buffer::*;
pub use self::command_buffer::*;
pub use self::command_pool::*;
pub use self::debug_messenger::*;
pub use self::device::*;
pub use self::fence::*;
pub use self::image::*;
pub use self::instance::*;
pub use self::pipeline::*;
pub use self::queue::*;
pub use self::render_pass::*;
pub use self::sampler::*;
pub use self::semaphore::*;
pub use self::shader::*;
pub use self::surface::*;
pub use self::swapchain::*;
