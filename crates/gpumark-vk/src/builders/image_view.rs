// SPDX-License-Identifier: CEPL-1.0
use std::rc::Rc;

use ash::vk;
use gpumark_core::ConfigError;

use crate::device::ImageViewDesc;
use crate::error::VkResult;
use crate::managed::ManagedResource;
use crate::state::VulkanState;

/// 2D view over mip 0, layer 0 of an image.
pub struct ImageViewBuilder {
    vulkan: Rc<VulkanState>,
    image: vk::Image,
    format: vk::Format,
    aspect_mask: vk::ImageAspectFlags,
}

impl ImageViewBuilder {
    pub fn new(vulkan: &Rc<VulkanState>) -> Self {
        Self {
            vulkan: Rc::clone(vulkan),
            image: vk::Image::null(),
            format: vk::Format::UNDEFINED,
            aspect_mask: vk::ImageAspectFlags::COLOR,
        }
    }

    pub fn set_image(mut self, image: vk::Image) -> Self {
        self.image = image;
        self
    }

    pub fn set_format(mut self, format: vk::Format) -> Self {
        self.format = format;
        self
    }

    pub fn set_aspect_mask(mut self, aspect_mask: vk::ImageAspectFlags) -> Self {
        self.aspect_mask = aspect_mask;
        self
    }

    pub fn build(self) -> VkResult<ManagedResource<vk::ImageView>> {
        if self.image == vk::Image::null() {
            return Err(missing("image").into());
        }
        if self.format == vk::Format::UNDEFINED {
            return Err(missing("format").into());
        }

        let view = self.vulkan.device().create_image_view(&ImageViewDesc {
            image: self.image,
            format: self.format,
            aspect_mask: self.aspect_mask,
        })?;

        let vulkan = self.vulkan;
        Ok(ManagedResource::new(view, move |v| {
            vulkan.device().destroy_image_view(v)
        }))
    }
}

fn missing(parameter: &'static str) -> ConfigError {
    ConfigError::MissingParameter {
        builder: "ImageViewBuilder",
        parameter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::test_support::recording_state;
    use crate::device::recording::ObjectKind;
    use ash::vk::Handle;

    #[test]
    fn wraps_the_given_image() {
        let (dev, vulkan) = recording_state();
        let view = ImageViewBuilder::new(&vulkan)
            .set_image(vk::Image::from_raw(0x99))
            .set_format(vk::Format::B8G8R8A8_SRGB)
            .build()
            .unwrap();

        let desc = dev.image_view(*view).unwrap();
        assert_eq!(desc.image, vk::Image::from_raw(0x99));
        assert_eq!(desc.format, vk::Format::B8G8R8A8_SRGB);
        assert_eq!(desc.aspect_mask, vk::ImageAspectFlags::COLOR);

        drop(view);
        assert_eq!(dev.live_count(ObjectKind::ImageView), 0);
    }

    #[test]
    fn missing_image_is_a_config_error() {
        let (dev, vulkan) = recording_state();
        let err = ImageViewBuilder::new(&vulkan)
            .set_format(vk::Format::B8G8R8A8_SRGB)
            .build()
            .unwrap_err();
        assert_eq!(err.to_string(), missing("image").to_string());
        assert_eq!(dev.created_count(ObjectKind::ImageView), 0);
    }
}
