// SPDX-License-Identifier: CEPL-1.0
use ash::{vk, Entry, Instance};
use tracing::{debug, info};

use super::{
    Device, DeviceImage, DeviceInfo, FramebufferDesc, ImageBarrier, ImageDesc, ImageViewDesc,
    RenderPassBegin, RenderPassDesc, Submission,
};
use crate::error::{VkError, VkResult};

const APP_NAME: &std::ffi::CStr = c"gpumark";

/// Headless logical device: instance without surface extensions, first
/// graphics-capable queue family, one queue.
pub struct AshDevice {
    _entry: Entry,
    instance: Instance,
    device: ash::Device,
    queue_family: u32,
    queue: vk::Queue,
    memory_properties: vk::PhysicalDeviceMemoryProperties,
    info: DeviceInfo,
}

impl Drop for AshDevice {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();
            self.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
        debug!("vk: device and instance destroyed");
    }
}

fn create_instance(entry: &Entry) -> VkResult<Instance> {
    let app_info = vk::ApplicationInfo::default()
        .application_name(APP_NAME)
        .engine_name(APP_NAME)
        .api_version(vk::API_VERSION_1_0);
    let create_info = vk::InstanceCreateInfo::default().application_info(&app_info);
    Ok(unsafe { entry.create_instance(&create_info, None)? })
}

/// Prefers a discrete GPU; otherwise the first device with a graphics queue.
fn pick_device_and_queue(instance: &Instance) -> VkResult<(vk::PhysicalDevice, u32)> {
    let mut fallback = None;
    for phys in unsafe { instance.enumerate_physical_devices()? } {
        let qprops = unsafe { instance.get_physical_device_queue_family_properties(phys) };
        let Some(family) = qprops
            .iter()
            .position(|q| q.queue_flags.contains(vk::QueueFlags::GRAPHICS))
        else {
            continue;
        };
        let props = unsafe { instance.get_physical_device_properties(phys) };
        if props.device_type == vk::PhysicalDeviceType::DISCRETE_GPU {
            return Ok((phys, family as u32));
        }
        fallback.get_or_insert((phys, family as u32));
    }
    fallback.ok_or(VkError::NoSuitableDevice)
}

/// First memory type allowed by `type_bits` that has every flag in `wanted`.
pub(crate) fn find_memory_type(
    props: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    wanted: vk::MemoryPropertyFlags,
) -> Option<u32> {
    (0..props.memory_type_count).find(|&i| {
        let allowed = (type_bits & (1 << i)) != 0;
        allowed
            && props.memory_types[i as usize]
                .property_flags
                .contains(wanted)
    })
}

impl AshDevice {
    pub fn new() -> VkResult<Self> {
        let entry = unsafe { Entry::load()? };
        let instance = create_instance(&entry)?;

        let (phys, queue_family) = match pick_device_and_queue(&instance) {
            Ok(pair) => pair,
            Err(e) => {
                unsafe { instance.destroy_instance(None) };
                return Err(e);
            }
        };

        let priorities = [1.0_f32];
        let qinfo = vk::DeviceQueueCreateInfo::default()
            .queue_family_index(queue_family)
            .queue_priorities(&priorities);
        let dinfo =
            vk::DeviceCreateInfo::default().queue_create_infos(std::slice::from_ref(&qinfo));

        let device = match unsafe { instance.create_device(phys, &dinfo, None) } {
            Ok(device) => device,
            Err(e) => {
                unsafe { instance.destroy_instance(None) };
                return Err(e.into());
            }
        };
        let queue = unsafe { device.get_device_queue(queue_family, 0) };

        let props = unsafe { instance.get_physical_device_properties(phys) };
        let memory_properties = unsafe { instance.get_physical_device_memory_properties(phys) };
        let info = DeviceInfo {
            name: props
                .device_name_as_c_str()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            vendor_id: props.vendor_id,
            device_id: props.device_id,
            driver_version: props.driver_version,
            api_version: props.api_version,
        };
        info!(
            "vk: using {} (vendor 0x{:x}, device 0x{:x}), queue family {}",
            info.name, info.vendor_id, info.device_id, queue_family
        );

        Ok(Self {
            _entry: entry,
            instance,
            device,
            queue_family,
            queue,
            memory_properties,
            info,
        })
    }
}

impl Device for AshDevice {
    fn info(&self) -> DeviceInfo {
        self.info.clone()
    }

    fn queue(&self) -> vk::Queue {
        self.queue
    }

    fn queue_family_index(&self) -> u32 {
        self.queue_family
    }

    fn wait_idle(&self) -> VkResult<()> {
        Ok(unsafe { self.device.device_wait_idle()? })
    }

    fn create_render_pass(&self, desc: &RenderPassDesc<'_>) -> VkResult<vk::RenderPass> {
        let mut subpass = vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(desc.color_refs);
        if let Some(depth_ref) = desc.depth_ref.as_ref() {
            subpass = subpass.depth_stencil_attachment(depth_ref);
        }
        let subpasses = [subpass];
        let dependencies = [desc.dependency];
        let info = vk::RenderPassCreateInfo::default()
            .attachments(desc.attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);
        Ok(unsafe { self.device.create_render_pass(&info, None)? })
    }

    fn destroy_render_pass(&self, render_pass: vk::RenderPass) {
        unsafe { self.device.destroy_render_pass(render_pass, None) }
    }

    fn create_image_view(&self, desc: &ImageViewDesc) -> VkResult<vk::ImageView> {
        let info = vk::ImageViewCreateInfo::default()
            .image(desc.image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(desc.format)
            .components(vk::ComponentMapping::default())
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: desc.aspect_mask,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });
        Ok(unsafe { self.device.create_image_view(&info, None)? })
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        unsafe { self.device.destroy_image_view(view, None) }
    }

    fn create_framebuffer(&self, desc: &FramebufferDesc<'_>) -> VkResult<vk::Framebuffer> {
        let info = vk::FramebufferCreateInfo::default()
            .render_pass(desc.render_pass)
            .attachments(desc.attachments)
            .width(desc.extent.width)
            .height(desc.extent.height)
            .layers(1);
        Ok(unsafe { self.device.create_framebuffer(&info, None)? })
    }

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        unsafe { self.device.destroy_framebuffer(framebuffer, None) }
    }

    fn create_image(&self, desc: &ImageDesc) -> VkResult<DeviceImage> {
        let img_ci = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(desc.format)
            .extent(vk::Extent3D {
                width: desc.extent.width,
                height: desc.extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(desc.tiling)
            .usage(desc.usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(desc.initial_layout);
        let image = unsafe { self.device.create_image(&img_ci, None)? };

        let mem_req = unsafe { self.device.get_image_memory_requirements(image) };
        let Some(type_index) = find_memory_type(
            &self.memory_properties,
            mem_req.memory_type_bits,
            desc.memory_properties,
        ) else {
            unsafe { self.device.destroy_image(image, None) };
            return Err(VkError::NoMemoryType);
        };

        let alloc = vk::MemoryAllocateInfo::default()
            .allocation_size(mem_req.size)
            .memory_type_index(type_index);
        let memory = match unsafe { self.device.allocate_memory(&alloc, None) } {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { self.device.destroy_image(image, None) };
                return Err(e.into());
            }
        };
        if let Err(e) = unsafe { self.device.bind_image_memory(image, memory, 0) } {
            unsafe {
                self.device.destroy_image(image, None);
                self.device.free_memory(memory, None);
            }
            return Err(e.into());
        }
        Ok(DeviceImage { image, memory })
    }

    fn destroy_image(&self, image: DeviceImage) {
        unsafe {
            self.device.destroy_image(image.image, None);
            self.device.free_memory(image.memory, None);
        }
    }

    fn create_semaphore(&self) -> VkResult<vk::Semaphore> {
        let info = vk::SemaphoreCreateInfo::default();
        Ok(unsafe { self.device.create_semaphore(&info, None)? })
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        unsafe { self.device.destroy_semaphore(semaphore, None) }
    }

    fn create_fence(&self, signaled: bool) -> VkResult<vk::Fence> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let info = vk::FenceCreateInfo::default().flags(flags);
        Ok(unsafe { self.device.create_fence(&info, None)? })
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        unsafe { self.device.destroy_fence(fence, None) }
    }

    fn wait_for_fence(&self, fence: vk::Fence, timeout_ns: u64) -> VkResult<()> {
        Ok(unsafe { self.device.wait_for_fences(&[fence], true, timeout_ns)? })
    }

    fn reset_fence(&self, fence: vk::Fence) -> VkResult<()> {
        Ok(unsafe { self.device.reset_fences(&[fence])? })
    }

    fn create_command_pool(&self, queue_family: u32) -> VkResult<vk::CommandPool> {
        let info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(queue_family)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
        Ok(unsafe { self.device.create_command_pool(&info, None)? })
    }

    fn destroy_command_pool(&self, pool: vk::CommandPool) {
        unsafe { self.device.destroy_command_pool(pool, None) }
    }

    fn allocate_command_buffers(
        &self,
        pool: vk::CommandPool,
        count: u32,
    ) -> VkResult<Vec<vk::CommandBuffer>> {
        let info = vk::CommandBufferAllocateInfo::default()
            .command_pool(pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);
        Ok(unsafe { self.device.allocate_command_buffers(&info)? })
    }

    fn free_command_buffers(&self, pool: vk::CommandPool, buffers: &[vk::CommandBuffer]) {
        if !buffers.is_empty() {
            unsafe { self.device.free_command_buffers(pool, buffers) }
        }
    }

    fn begin_command_buffer(
        &self,
        cmd: vk::CommandBuffer,
        flags: vk::CommandBufferUsageFlags,
    ) -> VkResult<()> {
        let info = vk::CommandBufferBeginInfo::default().flags(flags);
        Ok(unsafe { self.device.begin_command_buffer(cmd, &info)? })
    }

    fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()> {
        Ok(unsafe { self.device.end_command_buffer(cmd)? })
    }

    fn cmd_pipeline_barrier(
        &self,
        cmd: vk::CommandBuffer,
        src_stage: vk::PipelineStageFlags,
        dst_stage: vk::PipelineStageFlags,
        barrier: &ImageBarrier,
    ) {
        let image_barrier = vk::ImageMemoryBarrier::default()
            .image(barrier.image)
            .old_layout(barrier.old_layout)
            .new_layout(barrier.new_layout)
            .src_access_mask(barrier.src_access)
            .dst_access_mask(barrier.dst_access)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .subresource_range(barrier.range);
        unsafe {
            self.device.cmd_pipeline_barrier(
                cmd,
                src_stage,
                dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                std::slice::from_ref(&image_barrier),
            )
        }
    }

    fn cmd_clear_color_image(
        &self,
        cmd: vk::CommandBuffer,
        image: vk::Image,
        layout: vk::ImageLayout,
        color: &vk::ClearColorValue,
        range: vk::ImageSubresourceRange,
    ) {
        unsafe {
            self.device
                .cmd_clear_color_image(cmd, image, layout, color, std::slice::from_ref(&range))
        }
    }

    fn cmd_begin_render_pass(&self, cmd: vk::CommandBuffer, begin: &RenderPassBegin<'_>) {
        let info = vk::RenderPassBeginInfo::default()
            .render_pass(begin.render_pass)
            .framebuffer(begin.framebuffer)
            .render_area(begin.render_area)
            .clear_values(begin.clear_values);
        unsafe {
            self.device
                .cmd_begin_render_pass(cmd, &info, vk::SubpassContents::INLINE)
        }
    }

    fn cmd_end_render_pass(&self, cmd: vk::CommandBuffer) {
        unsafe { self.device.cmd_end_render_pass(cmd) }
    }

    fn queue_submit(&self, queue: vk::Queue, submission: &Submission<'_>) -> VkResult<()> {
        let submit = vk::SubmitInfo::default()
            .wait_semaphores(submission.wait_semaphores)
            .wait_dst_stage_mask(submission.wait_stages)
            .command_buffers(submission.command_buffers)
            .signal_semaphores(submission.signal_semaphores);
        Ok(unsafe {
            self.device
                .queue_submit(queue, std::slice::from_ref(&submit), submission.fence)?
        })
    }
}
