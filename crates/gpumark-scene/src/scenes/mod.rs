// SPDX-License-Identifier: CEPL-1.0
mod clear;

pub use clear::ClearScene;

use gpumark_core::ConfigError;

use crate::scene::Scene;

/// One instance of every scene gpumark knows.
pub fn all_scenes() -> Vec<Box<dyn Scene>> {
    vec![Box::new(ClearScene::new())]
}

pub fn find_scene<'a>(
    scenes: &'a mut [Box<dyn Scene>],
    name: &str,
) -> Result<&'a mut Box<dyn Scene>, ConfigError> {
    let accepted = scenes
        .iter()
        .map(|s| s.name().to_owned())
        .collect::<Vec<_>>()
        .join(",");
    scenes
        .iter_mut()
        .find(|s| s.name() == name)
        .ok_or(ConfigError::UnknownScene {
            name: name.to_owned(),
            accepted,
        })
}
