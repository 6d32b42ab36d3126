use ash::prelude::VkResult;
use ash::vk;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{call} returns {result:?}")]
    Vulkan {
        call: &'static str,
        result: vk::Result,
    },

    #[error("failed to load the Vulkan loader: {0}")]
    Loading(#[from] ash::LoadingError),

    #[error("gpu allocation failed: {0}")]
    Allocation(#[from] gpu_allocator::AllocationError),

    #[error("failed to compile shader `{name}`: {message}")]
    ShaderCompile { name: String, message: String },

    #[error("failed to read asset {path:?}")]
    Asset {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("no physical device supports the surface and required extensions")]
    NoSuitableDevice,

    #[error("surface does not support {0}")]
    UnsupportedSurface(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Tags a raw Vulkan result with the API call that produced it.
pub trait VkResultExt<T> {
    fn check(self, call: &'static str) -> Result<T>;
}

impl<T> VkResultExt<T> for VkResult<T> {
    fn check(self, call: &'static str) -> Result<T> {
        self.map_err(|result| Error::Vulkan { call, result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_keeps_success_value() {
        let result: VkResult<u32> = Ok(7);
        assert_eq!(result.check("vkAcquireNextImageKHR").unwrap(), 7);
    }

    #[test]
    fn check_names_the_failing_call() {
        let result: VkResult<()> = Err(vk::Result::ERROR_DEVICE_LOST);
        let error = result.check("vkQueueSubmit").unwrap_err();

        assert!(matches!(
            error,
            Error::Vulkan {
                call: "vkQueueSubmit",
                result: vk::Result::ERROR_DEVICE_LOST
            }
        ));
        assert_eq!(error.to_string(), "vkQueueSubmit returns ERROR_DEVICE_LOST");
    }
}
