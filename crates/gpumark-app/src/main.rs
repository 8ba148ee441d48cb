// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
mod bench;
mod config;

use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Parser;
use gpumark_assets::DataDir;
use gpumark_core::init_tracing;
use gpumark_scene::{all_scenes, find_scene, Scene};
use gpumark_vk::{vk, AshDevice, Device, DeviceInfo, HeadlessSwapchain, VulkanState};
use tracing::info;

use bench::{parse_pixel_format, parse_size, Benchmark, DEFAULT_BENCHMARKS, PIXEL_FORMATS};
use config::load_cfg;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Benchmark to run, as scene[:opt=val...]; a spec starting with ':'
    /// sets option defaults for every later benchmark
    #[arg(short = 'b', long = "benchmark", value_name = "SPEC")]
    benchmarks: Vec<String>,

    /// Offscreen image size as WxH
    #[arg(short, long, value_parser = parse_size)]
    size: Option<vk::Extent2D>,

    /// Offscreen image format, e.g. B8G8R8A8_SRGB or R16G16B16A16_SFLOAT
    #[arg(long, value_name = "FORMAT")]
    pixel_format: Option<String>,

    /// Number of offscreen images to cycle through
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    images: Option<u32>,

    /// List scenes and their options, then exit
    #[arg(short, long)]
    list_scenes: bool,

    /// Configuration file
    #[arg(long, default_value = "gpumark.toml")]
    config: PathBuf,

    /// Directory scenes load their assets from
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Decode an image from the data directory, print its properties and exit
    #[arg(long, value_name = "PATH")]
    decode: Option<PathBuf>,
}

fn list_scenes() {
    for scene in all_scenes() {
        println!("[Scene] {}", scene.name());
        for opt in scene.options().iter() {
            println!("  [Option] {}", opt.name);
            println!("    Description: {}", opt.description);
            println!("    Default Value: {}", opt.default_value);
            if !opt.acceptable_values.is_empty() {
                println!("    Acceptable Values: {}", opt.acceptable_values.join(","));
            }
        }
    }
}

fn print_banner(info: &DeviceInfo, chain: &HeadlessSwapchain) {
    let extent = chain.extent();
    let rule = "=".repeat(55);
    println!("{rule}");
    println!("    gpumark {}", env!("CARGO_PKG_VERSION"));
    println!("{rule}");
    println!("    Vendor ID:      {:#X}", info.vendor_id);
    println!("    Device ID:      {:#X}", info.device_id);
    println!("    Device Name:    {}", info.name);
    println!("    Driver Version: {}", info.driver_version);
    println!(
        "    API Version:    {}.{}.{}",
        vk::api_version_major(info.api_version),
        vk::api_version_minor(info.api_version),
        vk::api_version_patch(info.api_version)
    );
    println!("    Target:         headless {}x{}", extent.width, extent.height);
    println!("    Pixel Format:   {:?}", chain.format());
    println!("{rule}");
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let cfg = load_cfg(&args.config);

    if args.list_scenes {
        list_scenes();
        return Ok(());
    }

    let data_dir = DataDir::new(
        args.data_dir
            .or(cfg.run.data_dir.clone())
            .unwrap_or_else(|| PathBuf::from("data")),
    );
    if let Some(rel) = &args.decode {
        let img = data_dir
            .read_image(rel)
            .with_context(|| format!("decoding {}", rel.display()))?;
        println!(
            "{}: {}x{} {:?} ({} bytes)",
            rel.display(),
            img.width,
            img.height,
            img.format,
            img.size
        );
        return Ok(());
    }

    let extent = args.size.unwrap_or_else(|| cfg.run.extent());
    let image_count = args.images.unwrap_or(cfg.run.images).max(1);
    let pixel_format = match args.pixel_format.as_deref().or(cfg.run.pixel_format.as_deref()) {
        Some(name) => parse_pixel_format(name)?,
        None => PIXEL_FORMATS[0].1,
    };
    let specs: Vec<String> = if !args.benchmarks.is_empty() {
        args.benchmarks
    } else if !cfg.run.benchmarks.is_empty() {
        cfg.run.benchmarks.clone()
    } else {
        DEFAULT_BENCHMARKS.iter().map(|s| s.to_string()).collect()
    };

    // Reject bad specs and unknown scenes before touching the GPU.
    let plan = bench::plan(&specs)?;
    let mut scenes = all_scenes();
    for (b, _) in &plan {
        find_scene(&mut scenes, &b.scene)?;
    }
    info!(
        "{} benchmark(s), {} images, data dir {}",
        plan.len(),
        image_count,
        data_dir.root().display()
    );

    let device = AshDevice::new().context("initialising Vulkan")?;
    let device_info = device.info();
    let vulkan = Rc::new(VulkanState::new(Box::new(device))?);
    let mut chain = HeadlessSwapchain::new(&vulkan, extent, pixel_format, image_count)?;
    print_banner(&device_info, &chain);

    let mut fps = Vec::with_capacity(plan.len());
    for (b, defaults) in &plan {
        let scene: &mut dyn Scene = find_scene(&mut scenes, &b.scene)?.as_mut();
        bench::configure(scene, b, defaults).with_context(|| describe(b))?;
        let result = bench::run(scene, &vulkan, &mut chain)?;
        println!(
            "{} FPS: {:.0} FrameTime: {:.3} ms",
            scene.info_string(),
            result.fps,
            result.ms_per_frame
        );
        fps.push(result.fps);
    }

    println!("{}", "=".repeat(55));
    println!("                                  gpumark Score: {:.0}", bench::score(&fps));
    println!("{}", "=".repeat(55));
    Ok(())
}

fn describe(b: &Benchmark) -> String {
    let opts: Vec<String> = b.options.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("configuring benchmark {}:{}", b.scene, opts.join(":"))
}
