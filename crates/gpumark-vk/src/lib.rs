// SPDX-License-Identifier: CEPL-1.0
//! Vulkan object lifetimes and frame submission for gpumark.
//!
//! Every device call goes through the [`Device`] trait. [`AshDevice`] is the
//! real, headless implementation; with the `recording` feature,
//! [`RecordingDevice`] stands in for it so the builder and scene protocols
//! can be exercised without a GPU.
#![deny(unsafe_op_in_unsafe_fn)]

mod error;
mod headless;
mod image;
mod managed;
mod state;

pub mod builders;
pub mod device;

pub use builders::{
    FenceBuilder, FramebufferBuilder, ImageBuilder, ImageViewBuilder, RenderPassBuilder,
    SemaphoreBuilder,
};
pub use device::ash_device::AshDevice;
#[cfg(any(test, feature = "recording"))]
pub use device::recording::{Command, ObjectKind, RecordingDevice};
pub use device::{Device, DeviceInfo};
pub use error::{VkError, VkResult};
pub use headless::HeadlessSwapchain;
pub use image::VulkanImage;
pub use managed::ManagedResource;
pub use state::VulkanState;

pub use ash::vk;
