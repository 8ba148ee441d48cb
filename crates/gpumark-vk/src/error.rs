// SPDX-License-Identifier: CEPL-1.0
use ash::vk;
use gpumark_core::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VkError {
    /// A device entry point failed.
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] vk::Result),

    #[error("failed to load Vulkan: {0}")]
    Loading(#[from] ash::LoadingError),

    /// Builder parameters were rejected before any device call was made.
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no physical device with a graphics queue")]
    NoSuitableDevice,

    #[error("no memory type satisfies the requested properties")]
    NoMemoryType,
}

pub type VkResult<T> = std::result::Result<T, VkError>;
