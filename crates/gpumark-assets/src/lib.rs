// SPDX-License-Identifier: CEPL-1.0
//! Texture decoding for scenes that sample images.
//!
//! Files are looked up relative to a [`DataDir`]. Paths ending in `.ktx` are
//! read as KTX1 containers holding block-compressed data; everything else
//! goes through the `image` crate and comes out as RGBA8.
#![deny(unsafe_op_in_unsafe_fn)]

mod error;
mod ktx;

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use ash::vk;
use tracing::debug;

pub use error::DecodeError;

/// Pixels ready for upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Byte length of `data`.
    pub size: usize,
    pub format: vk::Format,
}

#[derive(Clone, Debug)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.root.join(rel)
    }

    pub fn read(&self, rel: impl AsRef<Path>) -> Result<Vec<u8>, DecodeError> {
        let path = self.path(rel);
        std::fs::read(&path).map_err(|source| DecodeError::Io { path, source })
    }

    pub fn read_image(&self, rel: impl AsRef<Path>) -> Result<DecodedImage, DecodeError> {
        let rel = rel.as_ref();
        let bytes = self.read(rel)?;
        let decoded = if rel.extension() == Some(OsStr::new("ktx")) {
            ktx::decode(&bytes)?
        } else {
            decode_generic(&bytes)?
        };
        debug!(
            "assets: {} {}x{} {:?} ({} bytes)",
            rel.display(),
            decoded.width,
            decoded.height,
            decoded.format,
            decoded.size
        );
        Ok(decoded)
    }
}

/// Any format the `image` crate understands, converted to RGBA8.
pub fn decode_generic(bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
    let rgba = image::load_from_memory(bytes)?.to_rgba8();
    let (width, height) = rgba.dimensions();
    let data = rgba.into_raw();
    Ok(DecodedImage {
        size: data.len(),
        data,
        width,
        height,
        format: vk::Format::R8G8B8A8_SRGB,
    })
}

pub use ktx::decode as decode_ktx;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([x as u8 * 10, y as u8 * 10, 200])
        });
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("gpumark-assets-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn png_becomes_rgba8() {
        let img = decode_generic(&png_bytes(3, 2)).unwrap();
        assert_eq!((img.width, img.height), (3, 2));
        assert_eq!(img.format, vk::Format::R8G8B8A8_SRGB);
        assert_eq!(img.size, 3 * 2 * 4);
        assert_eq!(img.data.len(), img.size);
        // pixel (1, 1): opaque alpha added
        assert_eq!(&img.data[(3 + 1) * 4..(3 + 1) * 4 + 4], &[10, 10, 200, 255]);
    }

    #[test]
    fn garbage_is_an_image_error() {
        assert!(matches!(
            decode_generic(b"definitely not a picture"),
            Err(DecodeError::Image(_))
        ));
    }

    #[test]
    fn data_dir_dispatches_on_extension() {
        let dir = scratch_dir("dispatch");
        std::fs::write(dir.join("tex.png"), png_bytes(4, 4)).unwrap();
        let ktx_file = ktx::tests::sample_ktx(0x93B0, 8, 8, &[7; 16]);
        std::fs::write(dir.join("tex.ktx"), ktx_file).unwrap();

        let data = DataDir::new(&dir);
        let png = data.read_image("tex.png").unwrap();
        assert_eq!(png.format, vk::Format::R8G8B8A8_SRGB);
        let ktx = data.read_image("tex.ktx").unwrap();
        assert_eq!(ktx.format, vk::Format::ASTC_4X4_UNORM_BLOCK);
        assert_eq!(ktx.data, [7; 16]);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_file_names_the_path() {
        let data = DataDir::new("/nonexistent/gpumark");
        match data.read("textures/missing.png") {
            Err(DecodeError::Io { path, .. }) => {
                assert_eq!(path, Path::new("/nonexistent/gpumark/textures/missing.png"));
            }
            other => panic!("expected io error, got {other:?}"),
        }
    }
}
