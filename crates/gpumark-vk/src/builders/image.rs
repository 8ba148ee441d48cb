// SPDX-License-Identifier: CEPL-1.0
use std::rc::Rc;

use ash::vk;
use gpumark_core::ConfigError;
use tracing::debug;

use crate::device::{DeviceImage, ImageDesc};
use crate::error::VkResult;
use crate::managed::ManagedResource;
use crate::state::VulkanState;

/// 2D, single-sample image with its own memory allocation.
///
/// The managed value carries both handles; dropping it destroys the image
/// and then frees the memory.
pub struct ImageBuilder {
    vulkan: Rc<VulkanState>,
    desc: ImageDesc,
}

impl ImageBuilder {
    pub fn new(vulkan: &Rc<VulkanState>) -> Self {
        Self {
            vulkan: Rc::clone(vulkan),
            desc: ImageDesc {
                extent: vk::Extent2D::default(),
                format: vk::Format::UNDEFINED,
                tiling: vk::ImageTiling::OPTIMAL,
                usage: vk::ImageUsageFlags::empty(),
                memory_properties: vk::MemoryPropertyFlags::DEVICE_LOCAL,
                initial_layout: vk::ImageLayout::UNDEFINED,
            },
        }
    }

    pub fn set_extent(mut self, extent: vk::Extent2D) -> Self {
        self.desc.extent = extent;
        self
    }

    pub fn set_format(mut self, format: vk::Format) -> Self {
        self.desc.format = format;
        self
    }

    pub fn set_tiling(mut self, tiling: vk::ImageTiling) -> Self {
        self.desc.tiling = tiling;
        self
    }

    pub fn set_usage(mut self, usage: vk::ImageUsageFlags) -> Self {
        self.desc.usage = usage;
        self
    }

    pub fn set_memory_properties(mut self, properties: vk::MemoryPropertyFlags) -> Self {
        self.desc.memory_properties = properties;
        self
    }

    pub fn set_initial_layout(mut self, layout: vk::ImageLayout) -> Self {
        self.desc.initial_layout = layout;
        self
    }

    pub fn build(self) -> VkResult<ManagedResource<DeviceImage>> {
        if self.desc.format == vk::Format::UNDEFINED {
            return Err(missing("format").into());
        }
        if self.desc.extent.width == 0 || self.desc.extent.height == 0 {
            return Err(missing("extent").into());
        }
        if self.desc.usage.is_empty() {
            return Err(missing("usage").into());
        }

        let image = self.vulkan.device().create_image(&self.desc)?;
        debug!(
            "vk: image {:?} {}x{} {:?}",
            image.image, self.desc.extent.width, self.desc.extent.height, self.desc.format
        );

        let vulkan = self.vulkan;
        Ok(ManagedResource::new(image, move |img| {
            vulkan.device().destroy_image(img)
        }))
    }
}

fn missing(parameter: &'static str) -> ConfigError {
    ConfigError::MissingParameter {
        builder: "ImageBuilder",
        parameter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::test_support::recording_state;
    use crate::device::recording::ObjectKind;
    use crate::error::VkError;

    #[test]
    fn creates_image_with_requested_parameters() {
        let (dev, vulkan) = recording_state();
        let extent = vk::Extent2D {
            width: 16,
            height: 8,
        };
        let img = ImageBuilder::new(&vulkan)
            .set_extent(extent)
            .set_format(vk::Format::R8G8B8A8_UNORM)
            .set_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .set_initial_layout(vk::ImageLayout::PREINITIALIZED)
            .build()
            .unwrap();

        let desc = dev.image(img.image).unwrap();
        assert_eq!(desc.extent, extent);
        assert_eq!(desc.tiling, vk::ImageTiling::OPTIMAL);
        assert_eq!(desc.memory_properties, vk::MemoryPropertyFlags::DEVICE_LOCAL);
        assert_eq!(desc.initial_layout, vk::ImageLayout::PREINITIALIZED);
        assert_eq!(dev.live_count(ObjectKind::DeviceMemory), 1);
    }

    #[test]
    fn drop_releases_image_and_memory() {
        let (dev, vulkan) = recording_state();
        let img = ImageBuilder::new(&vulkan)
            .set_extent(vk::Extent2D {
                width: 4,
                height: 4,
            })
            .set_format(vk::Format::R8G8B8A8_UNORM)
            .set_usage(vk::ImageUsageFlags::TRANSFER_DST)
            .build()
            .unwrap();
        drop(img);
        assert_eq!(dev.live_count(ObjectKind::Image), 0);
        assert_eq!(dev.live_count(ObjectKind::DeviceMemory), 0);
    }

    #[test]
    fn zero_extent_is_rejected() {
        let (dev, vulkan) = recording_state();
        let err = ImageBuilder::new(&vulkan)
            .set_format(vk::Format::R8G8B8A8_UNORM)
            .set_usage(vk::ImageUsageFlags::TRANSFER_DST)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            VkError::Config(ConfigError::MissingParameter {
                builder: "ImageBuilder",
                parameter: "extent"
            })
        ));
        assert_eq!(dev.created_count(ObjectKind::Image), 0);
    }
}
