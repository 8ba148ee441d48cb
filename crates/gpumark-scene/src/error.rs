// SPDX-License-Identifier: CEPL-1.0
use gpumark_core::ConfigError;
use gpumark_vk::VkError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SceneError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Vk(#[from] VkError),

    #[error("scene \"{scene}\" was drawn without a matching setup")]
    NotSetUp { scene: String },

    #[error("image index {index} is outside the {count} images the scene was set up with")]
    UnknownImage { index: u32, count: usize },
}

impl SceneError {
    /// True for errors the user can fix by changing scene options.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            SceneError::Config(_) | SceneError::Vk(VkError::Config(_))
        )
    }
}

pub type SceneResult<T> = std::result::Result<T, SceneError>;
