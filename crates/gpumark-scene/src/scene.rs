// SPDX-License-Identifier: CEPL-1.0
use std::rc::Rc;

use gpumark_core::{timestamp_us, ConfigError};
use gpumark_vk::{VulkanImage, VulkanState};

use crate::error::SceneResult;
use crate::options::SceneOptions;

/// A benchmark workload.
///
/// Lifecycle per activation: `setup` once, then `update` and `draw` once
/// per frame while `is_running`, then `teardown`. After `teardown` the
/// scene may be set up again.
pub trait Scene {
    fn base(&self) -> &SceneBase;
    fn base_mut(&mut self) -> &mut SceneBase;

    /// Allocates every per-activation resource for this image set.
    ///
    /// Options are validated first; on a configuration error nothing has
    /// been created.
    fn setup(&mut self, vulkan: &Rc<VulkanState>, images: &[VulkanImage]) -> SceneResult<()>;

    /// Records and submits one frame into `image`.
    ///
    /// Returns a copy of `image` carrying the semaphore the frame signals.
    fn draw(&mut self, image: &VulkanImage) -> SceneResult<VulkanImage>;

    /// Waits for the device to go idle and releases everything `setup`
    /// allocated.
    fn teardown(&mut self) -> SceneResult<()>;

    /// Per-frame CPU work, before `draw`.
    fn update(&mut self) {
        self.base_mut().update();
    }

    fn name(&self) -> &str {
        self.base().name()
    }

    fn options(&self) -> &SceneOptions {
        &self.base().options
    }

    fn set_option(&mut self, name: &str, value: &str) -> Result<(), ConfigError> {
        let base = self.base_mut();
        base.options.set(base.name, name, value)
    }

    fn reset_options(&mut self) {
        self.base_mut().options.reset();
    }

    fn is_running(&self) -> bool {
        self.base().is_running()
    }

    fn average_fps(&self) -> f64 {
        self.base().average_fps()
    }

    fn ms_per_frame(&self) -> f64 {
        self.base().ms_per_frame()
    }

    /// `[name] opt=val:opt=val:` with the explicitly set options.
    fn info_string(&self) -> String {
        format!("[{}] {}:", self.name(), self.options().describe_set())
    }
}

/// State every scene carries: its options and frame accounting.
#[derive(Debug)]
pub struct SceneBase {
    name: &'static str,
    pub options: SceneOptions,
    start_us: u64,
    last_update_us: u64,
    duration_us: u64,
    frames: u64,
    running: bool,
}

impl SceneBase {
    pub fn new(name: &'static str) -> Self {
        let mut options = SceneOptions::new();
        options.add(
            "duration",
            "10.0",
            "The duration of each benchmark in seconds",
            "",
        );
        Self {
            name,
            options,
            start_us: 0,
            last_update_us: 0,
            duration_us: 0,
            frames: 0,
            running: false,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Parses the common options. Call before allocating anything.
    pub fn prepare(&mut self) -> Result<(), ConfigError> {
        let raw = self.options.value("duration");
        let secs: f64 = raw
            .trim()
            .parse()
            .ok()
            .filter(|s: &f64| s.is_finite() && *s >= 0.0)
            .ok_or_else(|| ConfigError::InvalidValue {
                option: "duration".into(),
                value: raw.to_owned(),
                accepted: None,
            })?;
        self.duration_us = (secs * 1_000_000.0) as u64;
        Ok(())
    }

    /// Starts the clock for a new activation.
    pub fn start(&mut self) {
        self.start_us = timestamp_us();
        self.last_update_us = self.start_us;
        self.frames = 0;
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn update(&mut self) {
        self.update_at(timestamp_us());
    }

    /// Counts one frame at `now_us` on the `timestamp_us` clock.
    pub fn update_at(&mut self, now_us: u64) {
        self.frames += 1;
        self.last_update_us = now_us;
        if self.elapsed_us() >= self.duration_us {
            self.running = false;
        }
    }

    /// Time from `start` to the latest update.
    pub fn elapsed_us(&self) -> u64 {
        self.last_update_us.saturating_sub(self.start_us)
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn average_fps(&self) -> f64 {
        match self.elapsed_us() {
            0 => 0.0,
            us => self.frames as f64 * 1_000_000.0 / us as f64,
        }
    }

    pub fn ms_per_frame(&self) -> f64 {
        match self.frames {
            0 => 0.0,
            n => self.elapsed_us() as f64 / 1000.0 / n as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_until_duration_elapses() {
        let mut base = SceneBase::new("t");
        base.options.set("t", "duration", "0.5").unwrap();
        base.prepare().unwrap();
        base.start();
        let t0 = base.start_us;

        base.update_at(t0 + 100_000);
        assert!(base.is_running());
        base.update_at(t0 + 500_000);
        assert!(!base.is_running());
        assert_eq!(base.frames(), 2);
    }

    #[test]
    fn fps_and_frame_time() {
        let mut base = SceneBase::new("t");
        base.prepare().unwrap();
        base.start();
        let t0 = base.start_us;
        for i in 1..=50 {
            base.update_at(t0 + i * 20_000);
        }
        assert!((base.average_fps() - 50.0).abs() < 1e-9);
        assert!((base.ms_per_frame() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn no_frames_reports_zero() {
        let base = SceneBase::new("t");
        assert_eq!(base.average_fps(), 0.0);
        assert_eq!(base.ms_per_frame(), 0.0);
        assert!(!base.is_running());
    }

    #[test]
    fn bad_duration_is_a_config_error() {
        let mut base = SceneBase::new("t");
        for bad in ["-1", "soon", ""] {
            base.options.set("t", "duration", bad).unwrap();
            assert!(matches!(
                base.prepare(),
                Err(ConfigError::InvalidValue { ref option, .. }) if option == "duration"
            ));
        }
    }
}
