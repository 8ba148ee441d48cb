// SPDX-License-Identifier: CEPL-1.0
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("not a KTX1 file")]
    NotKtx,

    #[error("KTX data truncated: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("unsupported KTX internal format {gl_internal_format:#06x}")]
    UnsupportedFormat { gl_internal_format: u32 },
}
