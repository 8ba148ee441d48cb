// SPDX-License-Identifier: CEPL-1.0
use std::rc::Rc;

use ash::vk;
use gpumark_core::ConfigError;
use tracing::debug;

use crate::device::RenderPassDesc;
use crate::error::VkResult;
use crate::managed::ManagedResource;
use crate::state::VulkanState;

/// Single-subpass render pass with N color attachments and an optional depth
/// attachment.
///
/// Color formats and color load ops pair up by position: the n-th
/// `set_color_load_op` applies to the n-th `set_color_format`. A depth
/// format of `UNDEFINED` (the default) means no depth attachment.
pub struct RenderPassBuilder {
    vulkan: Rc<VulkanState>,
    color_formats: Vec<vk::Format>,
    color_load_ops: Vec<vk::AttachmentLoadOp>,
    depth_format: vk::Format,
}

impl RenderPassBuilder {
    pub fn new(vulkan: &Rc<VulkanState>) -> Self {
        Self {
            vulkan: Rc::clone(vulkan),
            color_formats: Vec::new(),
            color_load_ops: Vec::new(),
            depth_format: vk::Format::UNDEFINED,
        }
    }

    pub fn set_color_format(mut self, format: vk::Format) -> Self {
        self.color_formats.push(format);
        self
    }

    pub fn set_color_load_op(mut self, load_op: vk::AttachmentLoadOp) -> Self {
        self.color_load_ops.push(load_op);
        self
    }

    pub fn set_depth_format(mut self, format: vk::Format) -> Self {
        self.depth_format = format;
        self
    }

    pub fn build(self) -> VkResult<ManagedResource<vk::RenderPass>> {
        if self.color_formats.len() != self.color_load_ops.len() {
            return Err(ConfigError::MismatchedAttachments {
                formats: self.color_formats.len(),
                load_ops: self.color_load_ops.len(),
            }
            .into());
        }
        let use_depth = self.depth_format != vk::Format::UNDEFINED;
        if self.color_formats.is_empty() && !use_depth {
            return Err(ConfigError::EmptyRenderPass.into());
        }

        let mut attachments: Vec<_> = self
            .color_formats
            .iter()
            .zip(&self.color_load_ops)
            .map(|(&format, &load_op)| color_attachment(format, load_op))
            .collect();
        let color_refs: Vec<_> = (0..attachments.len() as u32)
            .map(|attachment| vk::AttachmentReference {
                attachment,
                layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            })
            .collect();

        let depth_ref = use_depth.then(|| {
            let depth_ref = vk::AttachmentReference {
                attachment: attachments.len() as u32,
                layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            };
            attachments.push(depth_attachment(self.depth_format));
            depth_ref
        });

        let dependency = vk::SubpassDependency::default()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .src_access_mask(vk::AccessFlags::empty())
            .dst_subpass(0)
            .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .dst_access_mask(
                vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            )
            .dependency_flags(vk::DependencyFlags::BY_REGION);

        let render_pass = self.vulkan.device().create_render_pass(&RenderPassDesc {
            attachments: &attachments,
            color_refs: &color_refs,
            depth_ref,
            dependency,
        })?;
        debug!(
            "vk: render pass {:?} ({} color, depth={})",
            render_pass,
            color_refs.len(),
            use_depth
        );

        let vulkan = self.vulkan;
        Ok(ManagedResource::new(render_pass, move |rp| {
            vulkan.device().destroy_render_pass(rp)
        }))
    }
}

fn color_attachment(format: vk::Format, load_op: vk::AttachmentLoadOp) -> vk::AttachmentDescription {
    vk::AttachmentDescription::default()
        .format(format)
        .samples(vk::SampleCountFlags::TYPE_1)
        .load_op(load_op)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::PRESENT_SRC_KHR)
}

fn depth_attachment(format: vk::Format) -> vk::AttachmentDescription {
    vk::AttachmentDescription::default()
        .format(format)
        .samples(vk::SampleCountFlags::TYPE_1)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::DONT_CARE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::test_support::recording_state;
    use crate::device::recording::ObjectKind;
    use crate::error::VkError;

    const COLOR: vk::Format = vk::Format::B8G8R8A8_SRGB;

    fn with_colors(vulkan: &Rc<VulkanState>, k: usize) -> RenderPassBuilder {
        (0..k).fold(RenderPassBuilder::new(vulkan), |b, _| {
            b.set_color_format(COLOR)
                .set_color_load_op(vk::AttachmentLoadOp::CLEAR)
        })
    }

    #[test]
    fn color_refs_are_dense_without_depth() {
        for k in 1..=4 {
            let (dev, vulkan) = recording_state();
            let rp = with_colors(&vulkan, k).build().unwrap();
            let rec = dev.render_pass(*rp).unwrap();

            assert_eq!(rec.attachments.len(), k);
            let indices: Vec<u32> = rec.color_refs.iter().map(|r| r.attachment).collect();
            assert_eq!(indices, (0..k as u32).collect::<Vec<_>>());
            assert!(rec
                .color_refs
                .iter()
                .all(|r| r.layout == vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL));
            assert!(rec.depth_ref.is_none());
        }
    }

    #[test]
    fn depth_ref_follows_color_refs() {
        for k in 0..=3 {
            let (dev, vulkan) = recording_state();
            let rp = with_colors(&vulkan, k)
                .set_depth_format(vk::Format::D32_SFLOAT)
                .build()
                .unwrap();
            let rec = dev.render_pass(*rp).unwrap();

            assert_eq!(rec.color_refs.len(), k);
            assert_eq!(rec.attachments.len(), k + 1);
            let depth = rec.depth_ref.expect("depth reference");
            assert_eq!(depth.attachment, k as u32);
            assert_eq!(depth.layout, vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

            let desc = rec.attachments[k];
            assert_eq!(desc.format, vk::Format::D32_SFLOAT);
            assert_eq!(desc.load_op, vk::AttachmentLoadOp::CLEAR);
            assert_eq!(desc.store_op, vk::AttachmentStoreOp::DONT_CARE);
        }
    }

    #[test]
    fn color_attachments_keep_their_load_ops_in_order() {
        let (dev, vulkan) = recording_state();
        let rp = RenderPassBuilder::new(&vulkan)
            .set_color_format(COLOR)
            .set_color_load_op(vk::AttachmentLoadOp::CLEAR)
            .set_color_format(vk::Format::R8G8B8A8_UNORM)
            .set_color_load_op(vk::AttachmentLoadOp::LOAD)
            .build()
            .unwrap();
        let rec = dev.render_pass(*rp).unwrap();

        assert_eq!(rec.attachments[0].format, COLOR);
        assert_eq!(rec.attachments[0].load_op, vk::AttachmentLoadOp::CLEAR);
        assert_eq!(rec.attachments[1].format, vk::Format::R8G8B8A8_UNORM);
        assert_eq!(rec.attachments[1].load_op, vk::AttachmentLoadOp::LOAD);
        for a in &rec.attachments {
            assert_eq!(a.samples, vk::SampleCountFlags::TYPE_1);
            assert_eq!(a.store_op, vk::AttachmentStoreOp::STORE);
            assert_eq!(a.initial_layout, vk::ImageLayout::UNDEFINED);
            assert_eq!(a.final_layout, vk::ImageLayout::PRESENT_SRC_KHR);
        }
    }

    #[test]
    fn single_external_dependency_by_region() {
        let (dev, vulkan) = recording_state();
        let rp = with_colors(&vulkan, 1).build().unwrap();
        let dep = dev.render_pass(*rp).unwrap().dependency;

        assert_eq!(dep.src_subpass, vk::SUBPASS_EXTERNAL);
        assert_eq!(dep.dst_subpass, 0);
        assert_eq!(dep.src_stage_mask, vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT);
        assert_eq!(dep.dst_stage_mask, vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT);
        assert_eq!(
            dep.dst_access_mask,
            vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE
        );
        assert_eq!(dep.dependency_flags, vk::DependencyFlags::BY_REGION);
    }

    #[test]
    fn mismatched_load_ops_fail_before_device_call() {
        let (dev, vulkan) = recording_state();
        let err = RenderPassBuilder::new(&vulkan)
            .set_color_format(COLOR)
            .set_color_format(COLOR)
            .set_color_load_op(vk::AttachmentLoadOp::CLEAR)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            VkError::Config(ConfigError::MismatchedAttachments {
                formats: 2,
                load_ops: 1
            })
        ));
        assert_eq!(dev.created_count(ObjectKind::RenderPass), 0);
    }

    #[test]
    fn empty_render_pass_is_rejected() {
        let (_dev, vulkan) = recording_state();
        let err = RenderPassBuilder::new(&vulkan).build().unwrap_err();
        assert!(matches!(err, VkError::Config(ConfigError::EmptyRenderPass)));
    }

    #[test]
    fn dropping_releases_render_pass() {
        let (dev, vulkan) = recording_state();
        let rp = with_colors(&vulkan, 2).build().unwrap();
        assert_eq!(dev.live_count(ObjectKind::RenderPass), 1);
        drop(rp);
        assert_eq!(dev.live_count(ObjectKind::RenderPass), 0);
    }
}
