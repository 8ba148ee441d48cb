// SPDX-License-Identifier: CEPL-1.0
//! KTX1 container reader. Only the first mip level of the first face is
//! returned.

use ash::vk;
use bytemuck::{Pod, Zeroable};

use crate::error::DecodeError;
use crate::DecodedImage;

const IDENTIFIER: [u8; 12] = [
    0xAB, b'K', b'T', b'X', b' ', b'1', b'1', 0xBB, b'\r', b'\n', 0x1A, b'\n',
];
const ENDIAN_NATIVE: u32 = 0x0403_0201;
const ENDIAN_SWAPPED: u32 = 0x0102_0304;

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct Header {
    endianness: u32,
    gl_type: u32,
    gl_type_size: u32,
    gl_format: u32,
    gl_internal_format: u32,
    gl_base_internal_format: u32,
    pixel_width: u32,
    pixel_height: u32,
    pixel_depth: u32,
    number_of_array_elements: u32,
    number_of_faces: u32,
    number_of_mipmap_levels: u32,
    bytes_of_key_value_data: u32,
}

const HEADER_END: usize = IDENTIFIER.len() + std::mem::size_of::<Header>();

impl Header {
    fn swapped(self) -> Self {
        let mut words: [u32; 13] = bytemuck::cast(self);
        for w in &mut words {
            *w = w.swap_bytes();
        }
        bytemuck::cast(words)
    }
}

fn vk_format(gl_internal_format: u32) -> Result<vk::Format, DecodeError> {
    Ok(match gl_internal_format {
        0x83F0 => vk::Format::BC1_RGB_UNORM_BLOCK,
        0x8C4C => vk::Format::BC1_RGB_SRGB_BLOCK,
        0x93B0 => vk::Format::ASTC_4X4_UNORM_BLOCK,
        0x93D0 => vk::Format::ASTC_4X4_SRGB_BLOCK,
        other => {
            return Err(DecodeError::UnsupportedFormat {
                gl_internal_format: other,
            })
        }
    })
}

fn slice(bytes: &[u8], start: usize, len: usize) -> Result<&[u8], DecodeError> {
    let needed = start + len;
    bytes.get(start..needed).ok_or(DecodeError::Truncated {
        needed,
        available: bytes.len(),
    })
}

pub fn decode(bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
    if !bytes.starts_with(&IDENTIFIER) {
        return Err(if bytes.len() < IDENTIFIER.len() && IDENTIFIER.starts_with(bytes) {
            DecodeError::Truncated {
                needed: IDENTIFIER.len(),
                available: bytes.len(),
            }
        } else {
            DecodeError::NotKtx
        });
    }

    let header_bytes = slice(bytes, IDENTIFIER.len(), std::mem::size_of::<Header>())?;
    let raw: Header = bytemuck::pod_read_unaligned(header_bytes);
    let (header, swap) = match raw.endianness {
        ENDIAN_NATIVE => (raw, false),
        ENDIAN_SWAPPED => (raw.swapped(), true),
        _ => return Err(DecodeError::NotKtx),
    };
    let format = vk_format(header.gl_internal_format)?;

    let size_at = HEADER_END + header.bytes_of_key_value_data as usize;
    let size_bytes: [u8; 4] = slice(bytes, size_at, 4)?
        .try_into()
        .map_err(|_| DecodeError::NotKtx)?;
    let mut image_size = u32::from_ne_bytes(size_bytes);
    if swap {
        image_size = image_size.swap_bytes();
    }
    let image_size = image_size as usize;
    let data = slice(bytes, size_at + 4, image_size)?.to_vec();

    Ok(DecodedImage {
        data,
        width: header.pixel_width,
        height: header.pixel_height.max(1),
        size: image_size,
        format,
    })
}
