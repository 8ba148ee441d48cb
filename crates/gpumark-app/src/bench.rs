// SPDX-License-Identifier: CEPL-1.0
use std::rc::Rc;

use anyhow::{Context, Result};
use gpumark_core::ConfigError;
use gpumark_scene::Scene;
use gpumark_vk::{vk, HeadlessSwapchain, VulkanState};
use tracing::info;

pub const DEFAULT_BENCHMARKS: &[&str] = &[
    "clear",
    "clear:color=1,0,0,1:clear-mode=loadop",
    "clear:clear-mode=loadop:num-rts=2",
];

/// `scene[:opt=val[:opt=val...]]`. An empty scene name marks a set of
/// defaults for every later benchmark.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Benchmark {
    pub scene: String,
    pub options: Vec<(String, String)>,
}

impl Benchmark {
    pub fn parse(spec: &str) -> Result<Self, ConfigError> {
        let mut parts = spec.split(':');
        let scene = parts.next().unwrap_or_default().trim().to_owned();
        let options = parts
            .filter(|p| !p.is_empty())
            .map(|p| {
                p.split_once('=')
                    .map(|(k, v)| (k.trim().to_owned(), v.trim().to_owned()))
                    .ok_or_else(|| ConfigError::InvalidValue {
                        option: "benchmark".into(),
                        value: spec.to_owned(),
                        accepted: Some("scene[:option=value...]".into()),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { scene, options })
    }

    pub fn is_defaults(&self) -> bool {
        self.scene.is_empty()
    }
}

/// Benchmarks in run order, each paired with the defaults in force when
/// it was listed.
pub fn plan(specs: &[String]) -> Result<Vec<(Benchmark, Vec<(String, String)>)>, ConfigError> {
    let mut defaults: Vec<(String, String)> = Vec::new();
    let mut out = Vec::new();
    for spec in specs {
        let bench = Benchmark::parse(spec)?;
        if bench.is_defaults() {
            for (k, v) in bench.options {
                defaults.retain(|(dk, _)| *dk != k);
                defaults.push((k, v));
            }
        } else {
            out.push((bench, defaults.clone()));
        }
    }
    Ok(out)
}

/// `WxH`, both sides non-zero.
pub fn parse_size(s: &str) -> Result<vk::Extent2D, String> {
    let invalid = || format!("invalid size \"{s}\" (expected WxH, e.g. 800x600)");
    let (w, h) = s.split_once('x').ok_or_else(invalid)?;
    let width: u32 = w.trim().parse().map_err(|_| invalid())?;
    let height: u32 = h.trim().parse().map_err(|_| invalid())?;
    if width == 0 || height == 0 {
        return Err(invalid());
    }
    Ok(vk::Extent2D { width, height })
}

/// Offscreen image formats selectable by name. The first entry is the
/// default.
pub const PIXEL_FORMATS: &[(&str, vk::Format)] = &[
    ("B8G8R8A8_SRGB", vk::Format::B8G8R8A8_SRGB),
    ("B8G8R8A8_UNORM", vk::Format::B8G8R8A8_UNORM),
    ("R8G8B8A8_SRGB", vk::Format::R8G8B8A8_SRGB),
    ("R8G8B8A8_UNORM", vk::Format::R8G8B8A8_UNORM),
    ("A2B10G10R10_UNORM_PACK32", vk::Format::A2B10G10R10_UNORM_PACK32),
    ("R16G16B16A16_SFLOAT", vk::Format::R16G16B16A16_SFLOAT),
];

/// Looks `name` up in [`PIXEL_FORMATS`], ignoring case.
pub fn parse_pixel_format(name: &str) -> Result<vk::Format, ConfigError> {
    let wanted = name.trim();
    PIXEL_FORMATS
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(wanted))
        .map(|&(_, format)| format)
        .ok_or_else(|| ConfigError::InvalidValue {
            option: "pixel-format".into(),
            value: name.to_owned(),
            accepted: Some(
                PIXEL_FORMATS
                    .iter()
                    .map(|(n, _)| *n)
                    .collect::<Vec<_>>()
                    .join(","),
            ),
        })
}

/// Applies defaults (skipping ones this scene lacks), then the
/// benchmark's own options.
pub fn configure(
    scene: &mut dyn Scene,
    bench: &Benchmark,
    defaults: &[(String, String)],
) -> Result<(), ConfigError> {
    scene.reset_options();
    for (k, v) in defaults {
        match scene.set_option(k, v) {
            Err(ConfigError::UnknownOption { .. }) => {}
            other => other?,
        }
    }
    for (k, v) in &bench.options {
        scene.set_option(k, v)?;
    }
    Ok(())
}

pub struct BenchResult {
    pub fps: f64,
    pub ms_per_frame: f64,
}

/// Runs one activation of `scene` to completion.
pub fn run(
    scene: &mut dyn Scene,
    vulkan: &Rc<VulkanState>,
    chain: &mut HeadlessSwapchain,
) -> Result<BenchResult> {
    scene
        .setup(vulkan, chain.images())
        .with_context(|| format!("setting up {}", scene.info_string()))?;
    info!("running {}", scene.info_string());

    let frames = frame_loop(scene, chain);
    let torn_down = scene.teardown();
    frames.with_context(|| format!("running {}", scene.info_string()))?;
    torn_down.context("tearing down")?;

    Ok(BenchResult {
        fps: scene.average_fps(),
        ms_per_frame: scene.ms_per_frame(),
    })
}

fn frame_loop(scene: &mut dyn Scene, chain: &mut HeadlessSwapchain) -> Result<()> {
    while scene.is_running() {
        let image = chain.acquire()?;
        scene.update();
        let done = scene.draw(&image)?;
        chain.present(&done)?;
    }
    Ok(())
}

pub fn score(results: &[f64]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    results.iter().sum::<f64>() / results.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpumark_scene::ClearScene;

    fn pairs(p: &[(&str, &str)]) -> Vec<(String, String)> {
        p.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn parses_scene_and_options() {
        let b = Benchmark::parse("clear:color=1,0,0:clear-mode=cmd").unwrap();
        assert_eq!(b.scene, "clear");
        assert_eq!(b.options, pairs(&[("color", "1,0,0"), ("clear-mode", "cmd")]));
        assert!(!b.is_defaults());

        let bare = Benchmark::parse("clear").unwrap();
        assert!(bare.options.is_empty());
    }

    #[test]
    fn leading_colon_is_defaults() {
        let b = Benchmark::parse(":duration=2").unwrap();
        assert!(b.is_defaults());
        assert_eq!(b.options, pairs(&[("duration", "2")]));
    }

    #[test]
    fn option_without_value_is_rejected() {
        assert!(matches!(
            Benchmark::parse("clear:color"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn defaults_apply_to_later_benchmarks_only() {
        let specs: Vec<String> = [
            "clear",
            ":duration=1",
            "clear:num-rts=1",
            ":duration=2",
            "clear",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let plan = plan(&specs).unwrap();
        assert_eq!(plan.len(), 3);
        assert!(plan[0].1.is_empty());
        assert_eq!(plan[1].1, pairs(&[("duration", "1")]));
        assert_eq!(plan[2].1, pairs(&[("duration", "2")]));
    }

    #[test]
    fn size_parsing() {
        assert_eq!(
            parse_size("800x600").unwrap(),
            vk::Extent2D {
                width: 800,
                height: 600
            }
        );
        for bad in ["800", "x600", "-1x600", "0x600", "800x", "axb"] {
            assert!(parse_size(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn pixel_format_names() {
        assert_eq!(
            parse_pixel_format("B8G8R8A8_SRGB").unwrap(),
            vk::Format::B8G8R8A8_SRGB
        );
        assert_eq!(
            parse_pixel_format("r16g16b16a16_sfloat").unwrap(),
            vk::Format::R16G16B16A16_SFLOAT
        );
        assert_eq!(PIXEL_FORMATS[0].1, vk::Format::B8G8R8A8_SRGB);
    }

    #[test]
    fn unknown_pixel_format_lists_accepted_names() {
        let err = parse_pixel_format("RGB565").unwrap_err();
        let ConfigError::InvalidValue {
            option,
            value,
            accepted: Some(accepted),
        } = &err
        else {
            panic!("unexpected error {err:?}");
        };
        assert_eq!(option, "pixel-format");
        assert_eq!(value, "RGB565");
        assert_eq!(accepted.split(',').count(), PIXEL_FORMATS.len());
        assert!(accepted.contains("R8G8B8A8_UNORM"));
        assert!(err.to_string().contains("A2B10G10R10_UNORM_PACK32"));
    }

    #[test]
    fn configure_skips_defaults_the_scene_lacks() {
        let mut scene = ClearScene::new();
        let bench = Benchmark::parse("clear:clear-mode=loadop").unwrap();
        configure(
            &mut scene,
            &bench,
            &pairs(&[("speed", "9"), ("duration", "0.5")]),
        )
        .unwrap();
        assert_eq!(scene.options().value("clear-mode"), "loadop");
        assert_eq!(scene.options().value("duration"), "0.5");

        let bad = Benchmark::parse("clear:speed=9").unwrap();
        assert!(configure(&mut scene, &bad, &[]).is_err());
        // reset before applying
        configure(&mut scene, &Benchmark::parse("clear").unwrap(), &[]).unwrap();
        assert_eq!(scene.options().value("clear-mode"), "cmd");
    }

    #[test]
    fn score_is_mean_fps() {
        assert_eq!(score(&[]), 0.0);
        assert_eq!(score(&[100.0, 200.0, 600.0]), 300.0);
    }
}
