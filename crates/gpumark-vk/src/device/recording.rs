// SPDX-License-Identifier: CEPL-1.0
//! A [`Device`] that hands out synthetic handles and records every call.
//!
//! Clones share one log, so a test keeps a clone while the original is
//! boxed into a `VulkanState`. Destroying a handle that is not live panics,
//! which turns any double release into a test failure.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use ash::vk::{self, Handle};

use super::{
    Device, DeviceImage, DeviceInfo, FramebufferDesc, ImageBarrier, ImageDesc, ImageViewDesc,
    RenderPassBegin, RenderPassDesc, Submission,
};
use crate::error::VkResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    RenderPass,
    ImageView,
    Framebuffer,
    Image,
    DeviceMemory,
    Semaphore,
    Fence,
    CommandPool,
    CommandBuffer,
}

/// One recorded command-buffer entry.
#[derive(Clone, Debug)]
pub enum Command {
    Begin(vk::CommandBufferUsageFlags),
    PipelineBarrier {
        src_stage: vk::PipelineStageFlags,
        dst_stage: vk::PipelineStageFlags,
        barrier: ImageBarrier,
    },
    ClearColorImage {
        image: vk::Image,
        layout: vk::ImageLayout,
        color: [f32; 4],
    },
    BeginRenderPass {
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        render_area: vk::Rect2D,
        clear_colors: Vec<[f32; 4]>,
    },
    EndRenderPass,
    End,
}

#[derive(Clone, Debug)]
pub struct RecordedRenderPass {
    pub attachments: Vec<vk::AttachmentDescription>,
    pub color_refs: Vec<vk::AttachmentReference>,
    pub depth_ref: Option<vk::AttachmentReference>,
    pub dependency: vk::SubpassDependency,
}

#[derive(Clone, Debug)]
pub struct RecordedFramebuffer {
    pub render_pass: vk::RenderPass,
    pub attachments: Vec<vk::ImageView>,
    pub extent: vk::Extent2D,
}

#[derive(Clone, Debug)]
pub struct RecordedSubmission {
    pub queue: vk::Queue,
    pub wait_semaphores: Vec<vk::Semaphore>,
    pub wait_stages: Vec<vk::PipelineStageFlags>,
    pub command_buffers: Vec<vk::CommandBuffer>,
    pub signal_semaphores: Vec<vk::Semaphore>,
    pub fence: vk::Fence,
}

#[derive(Default)]
struct Log {
    next_handle: u64,
    live: BTreeMap<u64, ObjectKind>,
    created: HashMap<ObjectKind, usize>,
    render_passes: HashMap<vk::RenderPass, RecordedRenderPass>,
    framebuffers: HashMap<vk::Framebuffer, RecordedFramebuffer>,
    image_views: HashMap<vk::ImageView, ImageViewDesc>,
    images: HashMap<vk::Image, ImageDesc>,
    commands: HashMap<vk::CommandBuffer, Vec<Command>>,
    submissions: Vec<RecordedSubmission>,
    fence_waits: Vec<vk::Fence>,
    wait_idle_calls: usize,
}

impl Log {
    fn create(&mut self, kind: ObjectKind) -> u64 {
        self.next_handle += 1;
        let raw = self.next_handle;
        self.live.insert(raw, kind);
        *self.created.entry(kind).or_default() += 1;
        raw
    }

    fn destroy(&mut self, kind: ObjectKind, raw: u64) {
        if raw == 0 {
            return;
        }
        match self.live.remove(&raw) {
            Some(k) if k == kind => {}
            Some(k) => panic!("destroyed {raw:#x} as {kind:?} but it is a {k:?}"),
            None => panic!("{kind:?} {raw:#x} destroyed twice or never created"),
        }
    }

    fn push(&mut self, cmd: vk::CommandBuffer, command: Command) {
        self.commands.entry(cmd).or_default().push(command);
    }
}

fn clear_color(value: &vk::ClearColorValue) -> [f32; 4] {
    // SAFETY: every clear value the scenes produce is written through `float32`.
    unsafe { value.float32 }
}

#[derive(Clone, Default)]
pub struct RecordingDevice {
    log: Rc<RefCell<Log>>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_count(&self, kind: ObjectKind) -> usize {
        self.log.borrow().live.values().filter(|&&k| k == kind).count()
    }

    pub fn live_total(&self) -> usize {
        self.log.borrow().live.len()
    }

    pub fn created_count(&self, kind: ObjectKind) -> usize {
        self.log.borrow().created.get(&kind).copied().unwrap_or(0)
    }

    pub fn created_total(&self) -> usize {
        self.log.borrow().created.values().sum()
    }

    pub fn render_pass(&self, render_pass: vk::RenderPass) -> Option<RecordedRenderPass> {
        self.log.borrow().render_passes.get(&render_pass).cloned()
    }

    pub fn framebuffer(&self, framebuffer: vk::Framebuffer) -> Option<RecordedFramebuffer> {
        self.log.borrow().framebuffers.get(&framebuffer).cloned()
    }

    pub fn image_view(&self, view: vk::ImageView) -> Option<ImageViewDesc> {
        self.log.borrow().image_views.get(&view).copied()
    }

    pub fn image(&self, image: vk::Image) -> Option<ImageDesc> {
        self.log.borrow().images.get(&image).copied()
    }

    /// Commands recorded into `cmd` since its last `begin`.
    pub fn commands(&self, cmd: vk::CommandBuffer) -> Vec<Command> {
        self.log
            .borrow()
            .commands
            .get(&cmd)
            .cloned()
            .unwrap_or_default()
    }

    pub fn submissions(&self) -> Vec<RecordedSubmission> {
        self.log.borrow().submissions.clone()
    }

    pub fn fence_waits(&self) -> Vec<vk::Fence> {
        self.log.borrow().fence_waits.clone()
    }

    pub fn wait_idle_calls(&self) -> usize {
        self.log.borrow().wait_idle_calls
    }
}

impl Device for RecordingDevice {
    fn info(&self) -> DeviceInfo {
        DeviceInfo {
            name: "recording device".into(),
            ..Default::default()
        }
    }

    fn queue(&self) -> vk::Queue {
        vk::Queue::from_raw(0x51)
    }

    fn queue_family_index(&self) -> u32 {
        0
    }

    fn wait_idle(&self) -> VkResult<()> {
        self.log.borrow_mut().wait_idle_calls += 1;
        Ok(())
    }

    fn create_render_pass(&self, desc: &RenderPassDesc<'_>) -> VkResult<vk::RenderPass> {
        let mut log = self.log.borrow_mut();
        let render_pass = vk::RenderPass::from_raw(log.create(ObjectKind::RenderPass));
        log.render_passes.insert(
            render_pass,
            RecordedRenderPass {
                attachments: desc.attachments.to_vec(),
                color_refs: desc.color_refs.to_vec(),
                depth_ref: desc.depth_ref,
                dependency: desc.dependency,
            },
        );
        Ok(render_pass)
    }

    fn destroy_render_pass(&self, render_pass: vk::RenderPass) {
        self.log
            .borrow_mut()
            .destroy(ObjectKind::RenderPass, render_pass.as_raw());
    }

    fn create_image_view(&self, desc: &ImageViewDesc) -> VkResult<vk::ImageView> {
        let mut log = self.log.borrow_mut();
        let view = vk::ImageView::from_raw(log.create(ObjectKind::ImageView));
        log.image_views.insert(view, *desc);
        Ok(view)
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        self.log
            .borrow_mut()
            .destroy(ObjectKind::ImageView, view.as_raw());
    }

    fn create_framebuffer(&self, desc: &FramebufferDesc<'_>) -> VkResult<vk::Framebuffer> {
        let mut log = self.log.borrow_mut();
        let framebuffer = vk::Framebuffer::from_raw(log.create(ObjectKind::Framebuffer));
        log.framebuffers.insert(
            framebuffer,
            RecordedFramebuffer {
                render_pass: desc.render_pass,
                attachments: desc.attachments.to_vec(),
                extent: desc.extent,
            },
        );
        Ok(framebuffer)
    }

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        self.log
            .borrow_mut()
            .destroy(ObjectKind::Framebuffer, framebuffer.as_raw());
    }

    fn create_image(&self, desc: &ImageDesc) -> VkResult<DeviceImage> {
        let mut log = self.log.borrow_mut();
        let image = vk::Image::from_raw(log.create(ObjectKind::Image));
        let memory = vk::DeviceMemory::from_raw(log.create(ObjectKind::DeviceMemory));
        log.images.insert(image, *desc);
        Ok(DeviceImage { image, memory })
    }

    fn destroy_image(&self, image: DeviceImage) {
        let mut log = self.log.borrow_mut();
        log.destroy(ObjectKind::Image, image.image.as_raw());
        log.destroy(ObjectKind::DeviceMemory, image.memory.as_raw());
    }

    fn create_semaphore(&self) -> VkResult<vk::Semaphore> {
        let raw = self.log.borrow_mut().create(ObjectKind::Semaphore);
        Ok(vk::Semaphore::from_raw(raw))
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        self.log
            .borrow_mut()
            .destroy(ObjectKind::Semaphore, semaphore.as_raw());
    }

    fn create_fence(&self, _signaled: bool) -> VkResult<vk::Fence> {
        let raw = self.log.borrow_mut().create(ObjectKind::Fence);
        Ok(vk::Fence::from_raw(raw))
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        self.log
            .borrow_mut()
            .destroy(ObjectKind::Fence, fence.as_raw());
    }

    fn wait_for_fence(&self, fence: vk::Fence, _timeout_ns: u64) -> VkResult<()> {
        self.log.borrow_mut().fence_waits.push(fence);
        Ok(())
    }

    fn reset_fence(&self, _fence: vk::Fence) -> VkResult<()> {
        Ok(())
    }

    fn create_command_pool(&self, _queue_family: u32) -> VkResult<vk::CommandPool> {
        let raw = self.log.borrow_mut().create(ObjectKind::CommandPool);
        Ok(vk::CommandPool::from_raw(raw))
    }

    fn destroy_command_pool(&self, pool: vk::CommandPool) {
        self.log
            .borrow_mut()
            .destroy(ObjectKind::CommandPool, pool.as_raw());
    }

    fn allocate_command_buffers(
        &self,
        _pool: vk::CommandPool,
        count: u32,
    ) -> VkResult<Vec<vk::CommandBuffer>> {
        let mut log = self.log.borrow_mut();
        Ok((0..count)
            .map(|_| vk::CommandBuffer::from_raw(log.create(ObjectKind::CommandBuffer)))
            .collect())
    }

    fn free_command_buffers(&self, _pool: vk::CommandPool, buffers: &[vk::CommandBuffer]) {
        let mut log = self.log.borrow_mut();
        for cmd in buffers {
            log.destroy(ObjectKind::CommandBuffer, cmd.as_raw());
            log.commands.remove(cmd);
        }
    }

    fn begin_command_buffer(
        &self,
        cmd: vk::CommandBuffer,
        flags: vk::CommandBufferUsageFlags,
    ) -> VkResult<()> {
        let mut log = self.log.borrow_mut();
        log.commands.insert(cmd, vec![Command::Begin(flags)]);
        Ok(())
    }

    fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()> {
        self.log.borrow_mut().push(cmd, Command::End);
        Ok(())
    }

    fn cmd_pipeline_barrier(
        &self,
        cmd: vk::CommandBuffer,
        src_stage: vk::PipelineStageFlags,
        dst_stage: vk::PipelineStageFlags,
        barrier: &ImageBarrier,
    ) {
        self.log.borrow_mut().push(
            cmd,
            Command::PipelineBarrier {
                src_stage,
                dst_stage,
                barrier: *barrier,
            },
        );
    }

    fn cmd_clear_color_image(
        &self,
        cmd: vk::CommandBuffer,
        image: vk::Image,
        layout: vk::ImageLayout,
        color: &vk::ClearColorValue,
        _range: vk::ImageSubresourceRange,
    ) {
        self.log.borrow_mut().push(
            cmd,
            Command::ClearColorImage {
                image,
                layout,
                color: clear_color(color),
            },
        );
    }

    fn cmd_begin_render_pass(&self, cmd: vk::CommandBuffer, begin: &RenderPassBegin<'_>) {
        // SAFETY: see `clear_color`.
        let clear_colors = begin
            .clear_values
            .iter()
            .map(|v| clear_color(unsafe { &v.color }))
            .collect();
        self.log.borrow_mut().push(
            cmd,
            Command::BeginRenderPass {
                render_pass: begin.render_pass,
                framebuffer: begin.framebuffer,
                render_area: begin.render_area,
                clear_colors,
            },
        );
    }

    fn cmd_end_render_pass(&self, cmd: vk::CommandBuffer) {
        self.log.borrow_mut().push(cmd, Command::EndRenderPass);
    }

    fn queue_submit(&self, queue: vk::Queue, submission: &Submission<'_>) -> VkResult<()> {
        self.log.borrow_mut().submissions.push(RecordedSubmission {
            queue,
            wait_semaphores: submission.wait_semaphores.to_vec(),
            wait_stages: submission.wait_stages.to_vec(),
            command_buffers: submission.command_buffers.to_vec(),
            signal_semaphores: submission.signal_semaphores.to_vec(),
            fence: submission.fence,
        });
        Ok(())
    }
}
