// SPDX-License-Identifier: CEPL-1.0
//! Fluent constructors for device objects.
//!
//! A builder takes the shared `VulkanState`, accumulates parameters, and on
//! `build()` validates them, makes exactly one device call, and wraps the
//! result in a [`ManagedResource`](crate::ManagedResource) whose deleter
//! calls the matching destroy entry point. `build()` consumes the builder.

mod framebuffer;
mod image;
mod image_view;
mod render_pass;
mod sync;

pub use framebuffer::FramebufferBuilder;
pub use image::ImageBuilder;
pub use image_view::ImageViewBuilder;
pub use render_pass::RenderPassBuilder;
pub use sync::{FenceBuilder, SemaphoreBuilder};
