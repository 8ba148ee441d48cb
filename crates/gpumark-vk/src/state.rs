// SPDX-License-Identifier: CEPL-1.0
use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::VkResult;

/// Owner of the logical device, its command pool and the graphics queue.
///
/// One per run. Scenes and builders share it through `Rc<VulkanState>`;
/// every resource deleter holds a clone, so the state outlives whatever
/// was created from it.
pub struct VulkanState {
    device: Box<dyn Device>,
    command_pool: vk::CommandPool,
    graphics_queue: vk::Queue,
}

impl VulkanState {
    pub fn new(device: Box<dyn Device>) -> VkResult<Self> {
        let command_pool = device.create_command_pool(device.queue_family_index())?;
        let graphics_queue = device.queue();
        debug!("vk: command pool {:?} on queue {:?}", command_pool, graphics_queue);
        Ok(Self {
            device,
            command_pool,
            graphics_queue,
        })
    }

    pub fn device(&self) -> &dyn Device {
        self.device.as_ref()
    }

    pub fn command_pool(&self) -> vk::CommandPool {
        self.command_pool
    }

    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }
}

impl Drop for VulkanState {
    fn drop(&mut self) {
        self.device.wait_idle().ok();
        self.device.destroy_command_pool(self.command_pool);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::recording::{ObjectKind, RecordingDevice};

    #[test]
    fn owns_exactly_one_command_pool() {
        let dev = RecordingDevice::new();
        let state = VulkanState::new(Box::new(dev.clone())).unwrap();
        assert_eq!(dev.live_count(ObjectKind::CommandPool), 1);
        assert_eq!(state.graphics_queue(), dev.queue());
        drop(state);
        assert_eq!(dev.live_total(), 0);
        assert_eq!(dev.wait_idle_calls(), 1);
    }
}
