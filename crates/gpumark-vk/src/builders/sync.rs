// SPDX-License-Identifier: CEPL-1.0
use std::rc::Rc;

use ash::vk;

use crate::error::VkResult;
use crate::managed::ManagedResource;
use crate::state::VulkanState;

/// Binary semaphore.
pub struct SemaphoreBuilder {
    vulkan: Rc<VulkanState>,
}

impl SemaphoreBuilder {
    pub fn new(vulkan: &Rc<VulkanState>) -> Self {
        Self {
            vulkan: Rc::clone(vulkan),
        }
    }

    pub fn build(self) -> VkResult<ManagedResource<vk::Semaphore>> {
        let semaphore = self.vulkan.device().create_semaphore()?;
        let vulkan = self.vulkan;
        Ok(ManagedResource::new(semaphore, move |s| {
            vulkan.device().destroy_semaphore(s)
        }))
    }
}

pub struct FenceBuilder {
    vulkan: Rc<VulkanState>,
    signaled: bool,
}

impl FenceBuilder {
    pub fn new(vulkan: &Rc<VulkanState>) -> Self {
        Self {
            vulkan: Rc::clone(vulkan),
            signaled: false,
        }
    }

    /// Start in the signaled state, so the first wait returns at once.
    pub fn set_signaled(mut self, signaled: bool) -> Self {
        self.signaled = signaled;
        self
    }

    pub fn build(self) -> VkResult<ManagedResource<vk::Fence>> {
        let fence = self.vulkan.device().create_fence(self.signaled)?;
        let vulkan = self.vulkan;
        Ok(ManagedResource::new(fence, move |f| {
            vulkan.device().destroy_fence(f)
        }))
    }
}
