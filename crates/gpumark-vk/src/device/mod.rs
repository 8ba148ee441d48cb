// SPDX-License-Identifier: CEPL-1.0
//! The device seam.
//!
//! [`Device`] lists every entry point the builders, scenes and headless
//! swapchain use. Inputs are plain descriptions rather than create-info
//! structs so an implementation never has to chase raw pointers.

use std::fmt;

use ash::vk;

use crate::error::VkResult;

pub mod ash_device;
#[cfg(any(test, feature = "recording"))]
pub mod recording;

/// Attachments, references and the single dependency of a one-subpass
/// render pass.
#[derive(Clone, Copy, Debug)]
pub struct RenderPassDesc<'a> {
    pub attachments: &'a [vk::AttachmentDescription],
    pub color_refs: &'a [vk::AttachmentReference],
    pub depth_ref: Option<vk::AttachmentReference>,
    pub dependency: vk::SubpassDependency,
}

#[derive(Clone, Copy, Debug)]
pub struct ImageViewDesc {
    pub image: vk::Image,
    pub format: vk::Format,
    pub aspect_mask: vk::ImageAspectFlags,
}

#[derive(Clone, Copy, Debug)]
pub struct FramebufferDesc<'a> {
    pub render_pass: vk::RenderPass,
    pub attachments: &'a [vk::ImageView],
    pub extent: vk::Extent2D,
}

/// A 2D, single-mip, single-layer image plus the memory it should live in.
#[derive(Clone, Copy, Debug)]
pub struct ImageDesc {
    pub extent: vk::Extent2D,
    pub format: vk::Format,
    pub tiling: vk::ImageTiling,
    pub usage: vk::ImageUsageFlags,
    pub memory_properties: vk::MemoryPropertyFlags,
    pub initial_layout: vk::ImageLayout,
}

/// An image together with its dedicated allocation.
#[derive(Clone, Copy, Debug, Default)]
pub struct DeviceImage {
    pub image: vk::Image,
    pub memory: vk::DeviceMemory,
}

/// Layout transition of a whole color subresource range.
#[derive(Clone, Copy, Debug)]
pub struct ImageBarrier {
    pub image: vk::Image,
    pub old_layout: vk::ImageLayout,
    pub new_layout: vk::ImageLayout,
    pub src_access: vk::AccessFlags,
    pub dst_access: vk::AccessFlags,
    pub range: vk::ImageSubresourceRange,
}

#[derive(Clone, Copy)]
pub struct RenderPassBegin<'a> {
    pub render_pass: vk::RenderPass,
    pub framebuffer: vk::Framebuffer,
    pub render_area: vk::Rect2D,
    pub clear_values: &'a [vk::ClearValue],
}

// `vk::ClearValue` is a union, so only the count is shown.
impl fmt::Debug for RenderPassBegin<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderPassBegin")
            .field("render_pass", &self.render_pass)
            .field("framebuffer", &self.framebuffer)
            .field("render_area", &self.render_area)
            .field("clear_values", &self.clear_values.len())
            .finish()
    }
}

/// One batch for the graphics queue. `wait_semaphores` and `wait_stages`
/// are index-aligned.
#[derive(Clone, Copy, Debug, Default)]
pub struct Submission<'a> {
    pub wait_semaphores: &'a [vk::Semaphore],
    pub wait_stages: &'a [vk::PipelineStageFlags],
    pub command_buffers: &'a [vk::CommandBuffer],
    pub signal_semaphores: &'a [vk::Semaphore],
    pub fence: vk::Fence,
}

#[derive(Clone, Debug, Default)]
pub struct DeviceInfo {
    pub name: String,
    pub vendor_id: u32,
    pub device_id: u32,
    pub driver_version: u32,
    pub api_version: u32,
}

/// Logical device plus its graphics queue.
pub trait Device {
    fn info(&self) -> DeviceInfo;
    fn queue(&self) -> vk::Queue;
    fn queue_family_index(&self) -> u32;
    fn wait_idle(&self) -> VkResult<()>;

    fn create_render_pass(&self, desc: &RenderPassDesc<'_>) -> VkResult<vk::RenderPass>;
    fn destroy_render_pass(&self, render_pass: vk::RenderPass);

    fn create_image_view(&self, desc: &ImageViewDesc) -> VkResult<vk::ImageView>;
    fn destroy_image_view(&self, view: vk::ImageView);

    fn create_framebuffer(&self, desc: &FramebufferDesc<'_>) -> VkResult<vk::Framebuffer>;
    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer);

    fn create_image(&self, desc: &ImageDesc) -> VkResult<DeviceImage>;
    fn destroy_image(&self, image: DeviceImage);

    fn create_semaphore(&self) -> VkResult<vk::Semaphore>;
    fn destroy_semaphore(&self, semaphore: vk::Semaphore);

    fn create_fence(&self, signaled: bool) -> VkResult<vk::Fence>;
    fn destroy_fence(&self, fence: vk::Fence);
    fn wait_for_fence(&self, fence: vk::Fence, timeout_ns: u64) -> VkResult<()>;
    fn reset_fence(&self, fence: vk::Fence) -> VkResult<()>;

    fn create_command_pool(&self, queue_family: u32) -> VkResult<vk::CommandPool>;
    fn destroy_command_pool(&self, pool: vk::CommandPool);
    fn allocate_command_buffers(
        &self,
        pool: vk::CommandPool,
        count: u32,
    ) -> VkResult<Vec<vk::CommandBuffer>>;
    fn free_command_buffers(&self, pool: vk::CommandPool, buffers: &[vk::CommandBuffer]);

    fn begin_command_buffer(
        &self,
        cmd: vk::CommandBuffer,
        flags: vk::CommandBufferUsageFlags,
    ) -> VkResult<()>;
    fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()>;
    fn cmd_pipeline_barrier(
        &self,
        cmd: vk::CommandBuffer,
        src_stage: vk::PipelineStageFlags,
        dst_stage: vk::PipelineStageFlags,
        barrier: &ImageBarrier,
    );
    fn cmd_clear_color_image(
        &self,
        cmd: vk::CommandBuffer,
        image: vk::Image,
        layout: vk::ImageLayout,
        color: &vk::ClearColorValue,
        range: vk::ImageSubresourceRange,
    );
    fn cmd_begin_render_pass(&self, cmd: vk::CommandBuffer, begin: &RenderPassBegin<'_>);
    fn cmd_end_render_pass(&self, cmd: vk::CommandBuffer);

    fn queue_submit(&self, queue: vk::Queue, submission: &Submission<'_>) -> VkResult<()>;
}

/// Whole-image color range: mip 0, layer 0.
pub fn color_subresource_range() -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    #[test]
    fn render_pass_begin_debug_counts_clear_values() {
        let clears = [vk::ClearValue::default(); 2];
        let begin = RenderPassBegin {
            render_pass: vk::RenderPass::from_raw(3),
            framebuffer: vk::Framebuffer::from_raw(4),
            render_area: vk::Rect2D::default(),
            clear_values: &clears,
        };
        let copy = begin;
        let text = format!("{copy:?}");
        assert!(text.starts_with("RenderPassBegin"));
        assert!(text.contains("clear_values: 2"));
        assert_eq!(begin.clear_values.len(), 2);
    }
}
