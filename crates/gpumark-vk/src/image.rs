// SPDX-License-Identifier: CEPL-1.0
use ash::vk;

/// One swapchain slot as seen by a frame.
///
/// `index`, `image`, `format` and `extent` are fixed for the run. On the way
/// into `Scene::draw` the `semaphore` is what the frame must wait on (null
/// when nothing has to be waited for); the copy handed back carries the
/// semaphore the frame signals instead.
#[derive(Clone, Copy, Debug, Default)]
pub struct VulkanImage {
    pub index: u32,
    pub image: vk::Image,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
    pub semaphore: vk::Semaphore,
    pub fence: vk::Fence,
}

impl VulkanImage {
    pub fn copy_with_semaphore(&self, semaphore: vk::Semaphore) -> Self {
        Self { semaphore, ..*self }
    }
}
