// SPDX-License-Identifier: CEPL-1.0
use std::rc::Rc;

use ash::vk;
use gpumark_core::ConfigError;
use tracing::{debug, info};

use crate::builders::{FenceBuilder, ImageBuilder};
use crate::device::{DeviceImage, Submission};
use crate::error::VkResult;
use crate::image::VulkanImage;
use crate::managed::ManagedResource;
use crate::state::VulkanState;

/// Offscreen stand-in for a window swapchain.
///
/// Slots are handed out round-robin. Each slot owns a fence that the scene
/// attaches to its draw submission; `acquire` waits on it, so the CPU only
/// blocks when it wraps around to a slot still in flight.
pub struct HeadlessSwapchain {
    vulkan: Rc<VulkanState>,
    images: Vec<ManagedResource<DeviceImage>>,
    fences: Vec<ManagedResource<vk::Fence>>,
    slots: Vec<VulkanImage>,
    next: usize,
}

impl HeadlessSwapchain {
    pub fn new(
        vulkan: &Rc<VulkanState>,
        extent: vk::Extent2D,
        format: vk::Format,
        count: u32,
    ) -> VkResult<Self> {
        if count == 0 {
            return Err(ConfigError::InvalidValue {
                option: "images".into(),
                value: count.to_string(),
                accepted: None,
            }
            .into());
        }

        let mut images = Vec::with_capacity(count as usize);
        let mut fences = Vec::with_capacity(count as usize);
        let mut slots = Vec::with_capacity(count as usize);
        for index in 0..count {
            let image = ImageBuilder::new(vulkan)
                .set_extent(extent)
                .set_format(format)
                .set_tiling(vk::ImageTiling::OPTIMAL)
                .set_usage(
                    vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST,
                )
                .set_memory_properties(vk::MemoryPropertyFlags::DEVICE_LOCAL)
                .build()?;
            let fence = FenceBuilder::new(vulkan).set_signaled(true).build()?;
            slots.push(VulkanImage {
                index,
                image: image.image,
                format,
                extent,
                semaphore: vk::Semaphore::null(),
                fence: *fence,
            });
            images.push(image);
            fences.push(fence);
        }

        info!(
            "headless swapchain: {} x {}x{} {:?}",
            count, extent.width, extent.height, format
        );
        Ok(Self {
            vulkan: Rc::clone(vulkan),
            images,
            fences,
            slots,
            next: 0,
        })
    }

    /// Every slot in index order, as `Scene::setup` expects them.
    pub fn images(&self) -> &[VulkanImage] {
        &self.slots
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.slots[0].extent
    }

    pub fn format(&self) -> vk::Format {
        self.slots[0].format
    }

    /// Next slot, once the GPU is done with its previous frame.
    pub fn acquire(&mut self) -> VkResult<VulkanImage> {
        let slot = self.slots[self.next];
        self.next = (self.next + 1) % self.slots.len();

        let device = self.vulkan.device();
        device.wait_for_fence(slot.fence, u64::MAX)?;
        device.reset_fence(slot.fence)?;
        Ok(slot)
    }

    /// Consumes the semaphore a frame signaled.
    ///
    /// Nothing reads the image, but the binary semaphore must be waited on
    /// before the next frame may signal it again.
    pub fn present(&mut self, image: &VulkanImage) -> VkResult<()> {
        if image.semaphore == vk::Semaphore::null() {
            return Ok(());
        }
        let waits = [image.semaphore];
        let stages = [vk::PipelineStageFlags::ALL_COMMANDS];
        self.vulkan.device().queue_submit(
            self.vulkan.graphics_queue(),
            &Submission {
                wait_semaphores: &waits,
                wait_stages: &stages,
                ..Default::default()
            },
        )
    }
}

impl Drop for HeadlessSwapchain {
    fn drop(&mut self) {
        self.vulkan.device().wait_idle().ok();
        debug!("headless swapchain: releasing {} slots", self.images.len());
        self.fences.clear();
        self.images.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::test_support::recording_state;
    use crate::device::recording::ObjectKind;
    use crate::error::VkError;
    use ash::vk::Handle;

    const EXTENT: vk::Extent2D = vk::Extent2D {
        width: 64,
        height: 48,
    };

    #[test]
    fn slots_are_indexed_and_fenced() {
        let (dev, vulkan) = recording_state();
        let chain =
            HeadlessSwapchain::new(&vulkan, EXTENT, vk::Format::R16G16B16A16_SFLOAT, 3).unwrap();
        assert_eq!(chain.extent(), EXTENT);
        assert_eq!(chain.format(), vk::Format::R16G16B16A16_SFLOAT);

        let images = chain.images();
        assert_eq!(images.len(), 3);
        for (i, img) in images.iter().enumerate() {
            assert_eq!(img.index, i as u32);
            assert_eq!(img.extent, EXTENT);
            assert_eq!(img.format, vk::Format::R16G16B16A16_SFLOAT);
            assert_eq!(img.semaphore, vk::Semaphore::null());
            let desc = dev.image(img.image).unwrap();
            assert!(desc.usage.contains(vk::ImageUsageFlags::TRANSFER_DST));
            assert!(desc.usage.contains(vk::ImageUsageFlags::COLOR_ATTACHMENT));
            assert_eq!(desc.format, vk::Format::R16G16B16A16_SFLOAT);
        }
        assert_eq!(dev.live_count(ObjectKind::Fence), 3);
    }

    #[test]
    fn acquire_is_round_robin_and_waits_on_slot_fence() {
        let (dev, vulkan) = recording_state();
        let mut chain =
            HeadlessSwapchain::new(&vulkan, EXTENT, vk::Format::B8G8R8A8_SRGB, 2).unwrap();

        let order: Vec<u32> = (0..5).map(|_| chain.acquire().unwrap().index).collect();
        assert_eq!(order, [0, 1, 0, 1, 0]);

        let fences: Vec<vk::Fence> = chain.images().iter().map(|i| i.fence).collect();
        assert_eq!(
            dev.fence_waits(),
            [fences[0], fences[1], fences[0], fences[1], fences[0]]
        );
    }

    #[test]
    fn present_waits_on_frame_semaphore() {
        let (dev, vulkan) = recording_state();
        let mut chain =
            HeadlessSwapchain::new(&vulkan, EXTENT, vk::Format::B8G8R8A8_SRGB, 2).unwrap();
        let img = chain.acquire().unwrap();

        chain.present(&img).unwrap();
        assert!(dev.submissions().is_empty());

        let done = img.copy_with_semaphore(vk::Semaphore::from_raw(0x77));
        chain.present(&done).unwrap();
        let subs = dev.submissions();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].wait_semaphores, [vk::Semaphore::from_raw(0x77)]);
        assert_eq!(subs[0].wait_stages, [vk::PipelineStageFlags::ALL_COMMANDS]);
        assert!(subs[0].command_buffers.is_empty());
        assert_eq!(subs[0].fence, vk::Fence::null());
    }

    #[test]
    fn zero_images_is_rejected() {
        let (dev, vulkan) = recording_state();
        let err = HeadlessSwapchain::new(&vulkan, EXTENT, vk::Format::B8G8R8A8_SRGB, 0)
            .err()
            .unwrap();
        assert!(matches!(err, VkError::Config(ConfigError::InvalidValue { .. })));
        assert_eq!(dev.created_count(ObjectKind::Image), 0);
    }

    #[test]
    fn drop_releases_everything_but_the_pool() {
        let (dev, vulkan) = recording_state();
        let chain = HeadlessSwapchain::new(&vulkan, EXTENT, vk::Format::B8G8R8A8_SRGB, 3).unwrap();
        drop(chain);
        assert_eq!(dev.live_total(), 1);
        assert_eq!(dev.live_count(ObjectKind::CommandPool), 1);
    }
}
