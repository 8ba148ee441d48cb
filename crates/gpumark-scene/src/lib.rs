// SPDX-License-Identifier: CEPL-1.0
//! Benchmark scenes and the lifecycle they share.
#![deny(unsafe_op_in_unsafe_fn)]

mod error;
mod options;
mod scene;
mod scenes;

pub use error::{SceneError, SceneResult};
pub use options::{SceneOption, SceneOptions};
pub use scene::{Scene, SceneBase};
pub use scenes::{all_scenes, find_scene, ClearScene};
