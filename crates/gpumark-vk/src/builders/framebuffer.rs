// SPDX-License-Identifier: CEPL-1.0
use std::rc::Rc;

use ash::vk;
use gpumark_core::ConfigError;

use crate::device::FramebufferDesc;
use crate::error::VkResult;
use crate::managed::ManagedResource;
use crate::state::VulkanState;

/// Single-layer framebuffer binding a render pass to a list of views.
pub struct FramebufferBuilder {
    vulkan: Rc<VulkanState>,
    render_pass: vk::RenderPass,
    image_views: Vec<vk::ImageView>,
    extent: vk::Extent2D,
}

impl FramebufferBuilder {
    pub fn new(vulkan: &Rc<VulkanState>) -> Self {
        Self {
            vulkan: Rc::clone(vulkan),
            render_pass: vk::RenderPass::null(),
            image_views: Vec::new(),
            extent: vk::Extent2D::default(),
        }
    }

    pub fn set_render_pass(mut self, render_pass: vk::RenderPass) -> Self {
        self.render_pass = render_pass;
        self
    }

    /// Views in attachment order.
    pub fn set_image_views(mut self, image_views: &[vk::ImageView]) -> Self {
        self.image_views = image_views.to_vec();
        self
    }

    pub fn set_extent(mut self, extent: vk::Extent2D) -> Self {
        self.extent = extent;
        self
    }

    pub fn build(self) -> VkResult<ManagedResource<vk::Framebuffer>> {
        if self.render_pass == vk::RenderPass::null() {
            return Err(missing("render_pass").into());
        }
        if self.image_views.is_empty() {
            return Err(missing("image_views").into());
        }

        let framebuffer = self.vulkan.device().create_framebuffer(&FramebufferDesc {
            render_pass: self.render_pass,
            attachments: &self.image_views,
            extent: self.extent,
        })?;

        let vulkan = self.vulkan;
        Ok(ManagedResource::new(framebuffer, move |fb| {
            vulkan.device().destroy_framebuffer(fb)
        }))
    }
}

fn missing(parameter: &'static str) -> ConfigError {
    ConfigError::MissingParameter {
        builder: "FramebufferBuilder",
        parameter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::test_support::recording_state;
    use crate::device::recording::ObjectKind;
    use crate::error::VkError;
    use ash::vk::Handle;

    #[test]
    fn binds_views_in_order() {
        let (dev, vulkan) = recording_state();
        let views = [vk::ImageView::from_raw(0x20), vk::ImageView::from_raw(0x21)];
        let extent = vk::Extent2D {
            width: 320,
            height: 200,
        };
        let fb = FramebufferBuilder::new(&vulkan)
            .set_render_pass(vk::RenderPass::from_raw(0x10))
            .set_image_views(&views)
            .set_extent(extent)
            .build()
            .unwrap();

        let rec = dev.framebuffer(*fb).unwrap();
        assert_eq!(rec.render_pass, vk::RenderPass::from_raw(0x10));
        assert_eq!(rec.attachments, views);
        assert_eq!(rec.extent, extent);
    }

    #[test]
    fn requires_render_pass_and_views() {
        let (dev, vulkan) = recording_state();
        let err = FramebufferBuilder::new(&vulkan)
            .set_image_views(&[vk::ImageView::from_raw(1)])
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            VkError::Config(ConfigError::MissingParameter {
                parameter: "render_pass",
                ..
            })
        ));

        let err = FramebufferBuilder::new(&vulkan)
            .set_render_pass(vk::RenderPass::from_raw(1))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            VkError::Config(ConfigError::MissingParameter {
                parameter: "image_views",
                ..
            })
        ));
        assert_eq!(dev.created_count(ObjectKind::Framebuffer), 0);
    }
}
