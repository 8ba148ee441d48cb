// SPDX-License-Identifier: CEPL-1.0
use std::rc::Rc;

use gpumark_core::{split, ConfigError};
use gpumark_vk::device::{
    color_subresource_range, DeviceImage, ImageBarrier, RenderPassBegin, Submission,
};
use gpumark_vk::{
    vk, FramebufferBuilder, ImageBuilder, ImageViewBuilder, ManagedResource, RenderPassBuilder,
    SemaphoreBuilder, VulkanImage, VulkanState,
};
use tracing::{debug, info};

use crate::error::{SceneError, SceneResult};
use crate::scene::{Scene, SceneBase};

/// Microseconds for one full trip around the hue circle.
const CYCLE_PERIOD_US: u64 = 5_000_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ClearMode {
    Cmd,
    LoadOp,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct ClearConfig {
    mode: ClearMode,
    /// `None` when the color cycles.
    color: Option<[f32; 4]>,
    num_rts: u32,
}

/// Clears every frame to a solid color, either with a transfer command or
/// as the load op of an otherwise empty render pass.
pub struct ClearScene {
    base: SceneBase,
    vulkan: Option<Rc<VulkanState>>,
    extent: vk::Extent2D,
    format: vk::Format,
    mode: ClearMode,
    cycle: bool,
    clear_color: [f32; 4],
    command_buffers: Vec<vk::CommandBuffer>,
    submit_semaphore: ManagedResource<vk::Semaphore>,
    rt_images: Vec<ManagedResource<DeviceImage>>,
    render_pass: ManagedResource<vk::RenderPass>,
    image_views: Vec<Vec<ManagedResource<vk::ImageView>>>,
    framebuffers: Vec<ManagedResource<vk::Framebuffer>>,
}

impl ClearScene {
    pub fn new() -> Self {
        let mut base = SceneBase::new("clear");
        base.options.add(
            "color",
            "cycle",
            "The normalized (0.0-1.0) \"r,g,b,a\" color to use or \"cycle\" to cycle",
            "",
        );
        base.options.add(
            "clear-mode",
            "cmd",
            "The operation to perform the clear by",
            "cmd,loadop",
        );
        base.options
            .add("num-rts", "1", "The number of render targets", "");
        Self {
            base,
            vulkan: None,
            extent: vk::Extent2D::default(),
            format: vk::Format::UNDEFINED,
            mode: ClearMode::Cmd,
            cycle: true,
            clear_color: cycle_color(0),
            command_buffers: Vec::new(),
            submit_semaphore: ManagedResource::default(),
            rt_images: Vec::new(),
            render_pass: ManagedResource::default(),
            image_views: Vec::new(),
            framebuffers: Vec::new(),
        }
    }

    /// The color the next `draw` clears to.
    pub fn clear_color(&self) -> [f32; 4] {
        self.clear_color
    }

    fn parse_config(&self) -> Result<ClearConfig, ConfigError> {
        let opts = &self.base.options;

        let color = match opts.value("color") {
            "cycle" => None,
            spec => Some(parse_color(spec)?),
        };

        let mode = match opts.value("clear-mode") {
            "cmd" => ClearMode::Cmd,
            "loadop" => ClearMode::LoadOp,
            other => {
                return Err(ConfigError::InvalidValue {
                    option: "clear-mode".into(),
                    value: other.to_owned(),
                    accepted: Some("cmd,loadop".into()),
                })
            }
        };

        let raw_rts = opts.value("num-rts");
        let num_rts = raw_rts
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|&n| n >= 1)
            .ok_or_else(|| ConfigError::InvalidValue {
                option: "num-rts".into(),
                value: raw_rts.to_owned(),
                accepted: None,
            })?;
        if mode == ClearMode::Cmd && num_rts > 1 {
            return Err(ConfigError::Incompatible {
                option: "num-rts".into(),
                value: raw_rts.to_owned(),
                requires: "clear-mode=loadop".into(),
            });
        }

        Ok(ClearConfig {
            mode,
            color,
            num_rts,
        })
    }

    fn setup_rts(&mut self, vulkan: &Rc<VulkanState>, num_rts: u32) -> SceneResult<()> {
        for _ in 1..num_rts {
            self.rt_images.push(
                ImageBuilder::new(vulkan)
                    .set_extent(self.extent)
                    .set_format(self.format)
                    .set_tiling(vk::ImageTiling::OPTIMAL)
                    .set_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
                    .set_memory_properties(vk::MemoryPropertyFlags::DEVICE_LOCAL)
                    .set_initial_layout(vk::ImageLayout::PREINITIALIZED)
                    .build()?,
            );
        }
        Ok(())
    }

    fn setup_render_pass(&mut self, vulkan: &Rc<VulkanState>, num_rts: u32) -> SceneResult<()> {
        let builder = (0..num_rts).fold(RenderPassBuilder::new(vulkan), |b, _| {
            b.set_color_format(self.format)
                .set_color_load_op(vk::AttachmentLoadOp::CLEAR)
        });
        self.render_pass = builder.build()?;
        Ok(())
    }

    fn setup_framebuffers(
        &mut self,
        vulkan: &Rc<VulkanState>,
        images: &[VulkanImage],
    ) -> SceneResult<()> {
        for image in images {
            let mut views = vec![ImageViewBuilder::new(vulkan)
                .set_image(image.image)
                .set_format(image.format)
                .set_aspect_mask(vk::ImageAspectFlags::COLOR)
                .build()?];
            for rt in &self.rt_images {
                views.push(
                    ImageViewBuilder::new(vulkan)
                        .set_image(rt.image)
                        .set_format(self.format)
                        .set_aspect_mask(vk::ImageAspectFlags::COLOR)
                        .build()?,
                );
            }
            self.image_views.push(views);
        }

        for views in &self.image_views {
            let raw: Vec<vk::ImageView> = views.iter().map(|v| v.raw()).collect();
            self.framebuffers.push(
                FramebufferBuilder::new(vulkan)
                    .set_render_pass(*self.render_pass)
                    .set_image_views(&raw)
                    .set_extent(self.extent)
                    .build()?,
            );
        }
        Ok(())
    }

    fn allocate(
        &mut self,
        vulkan: &Rc<VulkanState>,
        images: &[VulkanImage],
        num_rts: u32,
    ) -> SceneResult<()> {
        self.submit_semaphore = SemaphoreBuilder::new(vulkan).build()?;
        if self.mode == ClearMode::LoadOp {
            self.setup_rts(vulkan, num_rts)?;
            self.setup_render_pass(vulkan, num_rts)?;
            self.setup_framebuffers(vulkan, images)?;
        }
        self.command_buffers = vulkan
            .device()
            .allocate_command_buffers(vulkan.command_pool(), images.len() as u32)?;
        Ok(())
    }

    fn record_cmd_clear(&self, vulkan: &VulkanState, cmd: vk::CommandBuffer, image: vk::Image) {
        let device = vulkan.device();
        let range = color_subresource_range();

        device.cmd_pipeline_barrier(
            cmd,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::TRANSFER,
            &ImageBarrier {
                image,
                old_layout: vk::ImageLayout::UNDEFINED,
                new_layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                src_access: vk::AccessFlags::empty(),
                dst_access: vk::AccessFlags::TRANSFER_WRITE,
                range,
            },
        );
        device.cmd_clear_color_image(
            cmd,
            image,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            &vk::ClearColorValue {
                float32: self.clear_color,
            },
            range,
        );
        device.cmd_pipeline_barrier(
            cmd,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::BOTTOM_OF_PIPE,
            &ImageBarrier {
                image,
                old_layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                new_layout: vk::ImageLayout::PRESENT_SRC_KHR,
                src_access: vk::AccessFlags::TRANSFER_WRITE,
                dst_access: vk::AccessFlags::empty(),
                range,
            },
        );
    }

    fn record_loadop_clear(&self, vulkan: &VulkanState, cmd: vk::CommandBuffer, index: usize) {
        let clear_value = vk::ClearValue {
            color: vk::ClearColorValue {
                float32: self.clear_color,
            },
        };
        let clear_values = vec![clear_value; self.image_views[index].len()];

        let device = vulkan.device();
        device.cmd_begin_render_pass(
            cmd,
            &RenderPassBegin {
                render_pass: *self.render_pass,
                framebuffer: *self.framebuffers[index],
                render_area: vk::Rect2D {
                    offset: vk::Offset2D { x: 0, y: 0 },
                    extent: self.extent,
                },
                clear_values: &clear_values,
            },
        );
        device.cmd_end_render_pass(cmd);
    }

    fn release(&mut self) {
        self.submit_semaphore = ManagedResource::default();
        if let Some(vulkan) = &self.vulkan {
            if !self.command_buffers.is_empty() {
                vulkan
                    .device()
                    .free_command_buffers(vulkan.command_pool(), &self.command_buffers);
            }
        }
        self.command_buffers.clear();
        self.framebuffers.clear();
        self.image_views.clear();
        self.render_pass = ManagedResource::default();
        self.rt_images.clear();
        self.vulkan = None;
    }

    fn not_set_up(&self) -> SceneError {
        SceneError::NotSetUp {
            scene: self.base.name().to_owned(),
        }
    }
}

impl Default for ClearScene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene for ClearScene {
    fn base(&self) -> &SceneBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut SceneBase {
        &mut self.base
    }

    fn setup(&mut self, vulkan: &Rc<VulkanState>, images: &[VulkanImage]) -> SceneResult<()> {
        let Some(first) = images.first() else {
            return Err(ConfigError::InvalidValue {
                option: "images".into(),
                value: "0".into(),
                accepted: None,
            }
            .into());
        };
        if self.vulkan.is_some() {
            self.teardown()?;
        }

        self.base.prepare()?;
        let config = self.parse_config()?;

        self.extent = first.extent;
        self.format = first.format;
        self.mode = config.mode;
        self.cycle = config.color.is_none();
        self.clear_color = config.color.unwrap_or_else(|| cycle_color(0));
        self.vulkan = Some(Rc::clone(vulkan));

        if let Err(e) = self.allocate(vulkan, images, config.num_rts) {
            self.release();
            return Err(e);
        }

        info!(
            "clear: {} images {}x{}, mode {:?}, {} render target(s)",
            images.len(),
            self.extent.width,
            self.extent.height,
            self.mode,
            config.num_rts
        );
        self.base.start();
        Ok(())
    }

    fn update(&mut self) {
        self.base.update();
        if self.cycle {
            self.clear_color = cycle_color(self.base.elapsed_us());
        }
    }

    fn draw(&mut self, image: &VulkanImage) -> SceneResult<VulkanImage> {
        let Some(vulkan) = self.vulkan.as_deref() else {
            return Err(self.not_set_up());
        };
        let index = image.index as usize;
        let Some(&cmd) = self.command_buffers.get(index) else {
            return Err(SceneError::UnknownImage {
                index: image.index,
                count: self.command_buffers.len(),
            });
        };

        let device = vulkan.device();
        device.begin_command_buffer(cmd, vk::CommandBufferUsageFlags::SIMULTANEOUS_USE)?;
        match self.mode {
            ClearMode::Cmd => self.record_cmd_clear(vulkan, cmd, image.image),
            ClearMode::LoadOp => self.record_loadop_clear(vulkan, cmd, index),
        }
        device.end_command_buffer(cmd)?;

        let waits: &[vk::Semaphore] = if image.semaphore == vk::Semaphore::null() {
            &[]
        } else {
            std::slice::from_ref(&image.semaphore)
        };
        let stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal = [*self.submit_semaphore];
        device.queue_submit(
            vulkan.graphics_queue(),
            &Submission {
                wait_semaphores: waits,
                wait_stages: &stages[..waits.len()],
                command_buffers: std::slice::from_ref(&cmd),
                signal_semaphores: &signal,
                fence: image.fence,
            },
        )?;

        Ok(image.copy_with_semaphore(*self.submit_semaphore))
    }

    fn teardown(&mut self) -> SceneResult<()> {
        self.base.stop();
        let Some(vulkan) = self.vulkan.clone() else {
            return Ok(());
        };
        let idle = vulkan.device().wait_idle();
        self.release();
        debug!("clear: torn down");
        idle.map_err(SceneError::from)
    }
}

impl Drop for ClearScene {
    fn drop(&mut self) {
        if let Some(vulkan) = &self.vulkan {
            vulkan.device().wait_idle().ok();
        }
        self.release();
    }
}

/// Parses `"r,g,b,a"`. Missing components default to 0, alpha to 1.
fn parse_color(spec: &str) -> Result<[f32; 4], ConfigError> {
    let components = split(spec, ',');
    let mut color = [0.0, 0.0, 0.0, 1.0];
    if components.len() > color.len() {
        return Err(ConfigError::TooManyComponents {
            option: "color".into(),
            count: components.len(),
            max: color.len(),
        });
    }
    for (slot, comp) in color.iter_mut().zip(&components) {
        *slot = comp.trim().parse().map_err(|_| ConfigError::InvalidValue {
            option: "color".into(),
            value: spec.to_owned(),
            accepted: None,
        })?;
    }
    Ok(color)
}

/// Fully saturated, full-value color whose hue goes round once every
/// five seconds.
fn cycle_color(elapsed_us: u64) -> [f32; 4] {
    let h = 6.0 * (elapsed_us % CYCLE_PERIOD_US) as f64 / CYCLE_PERIOD_US as f64;
    let x = (1.0 - ((h % 2.0) - 1.0).abs()) as f32;
    let (r, g, b) = match h as u32 {
        0 => (1.0, x, 0.0),
        1 => (x, 1.0, 0.0),
        2 => (0.0, 1.0, x),
        3 => (0.0, x, 1.0),
        4 => (x, 0.0, 1.0),
        _ => (1.0, 0.0, x),
    };
    [r, g, b, 1.0]
}
