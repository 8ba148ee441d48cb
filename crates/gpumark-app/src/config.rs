// SPDX-License-Identifier: CEPL-1.0
use std::fs;
use std::path::{Path, PathBuf};

use gpumark_vk::vk;
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RunCfg {
    #[serde(default = "default_size")]
    pub size: [u32; 2],
    #[serde(default = "default_images")]
    pub images: u32,
    #[serde(default)]
    pub benchmarks: Vec<String>,
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Name from `bench::PIXEL_FORMATS`; unset means the first entry.
    #[serde(default)]
    pub pixel_format: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct AppCfg {
    #[serde(default)]
    pub run: RunCfg,
}

impl Default for RunCfg {
    fn default() -> Self {
        RunCfg {
            size: default_size(),
            images: default_images(),
            benchmarks: Vec::new(),
            data_dir: None,
            pixel_format: None,
        }
    }
}

impl RunCfg {
    /// Configured size, or 800x600 when either side is zero.
    pub fn extent(&self) -> vk::Extent2D {
        let [width, height] = self.size;
        if width == 0 || height == 0 {
            warn!("config: ignoring invalid size {width}x{height}, using 800x600");
            let [width, height] = default_size();
            return vk::Extent2D { width, height };
        }
        vk::Extent2D { width, height }
    }
}

fn default_size() -> [u32; 2] {
    [800, 600]
}
fn default_images() -> u32 {
    3
}

pub fn parse_cfg(src: &str) -> AppCfg {
    match toml::from_str::<AppCfg>(src) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("config: {e}; using defaults");
            AppCfg::default()
        }
    }
}

pub fn load_cfg(path: &Path) -> AppCfg {
    match fs::read_to_string(path) {
        Ok(s) => parse_cfg(&s),
        Err(_) => {
            debug!("config: {} not found, using defaults", path.display());
            AppCfg::default()
        }
    }
}
