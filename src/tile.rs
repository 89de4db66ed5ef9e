use crate::cursor::ByteCursor;
use crate::error::{Error, Result};
use crate::format::{CompressionType, Precision};
use crate::layer::Layer;
use crate::pixel::{PixelConverter, Rgba};

const TILE_EDGE: usize = 64;

struct HierarchyRecord {
    bpp: usize,
    level_ptr: u64,
}

fn read_hierarchy(buf: &[u8], version: u32, ptr: u64) -> Result<HierarchyRecord> {
    let mut cursor = ByteCursor::at(buf, ptr)?;
    let _width = cursor.read_u32()?;
    let _height = cursor.read_u32()?;
    let bpp = cursor.read_u32()? as usize;
    let level_ptr = cursor.read_pointer(version)?;

    Ok(HierarchyRecord { bpp, level_ptr })
}

/// Only level 0 (the full-resolution mip level) is ever used; further
/// levels exist in the file for GIMP's own mipmap cache and are ignored
/// (glossary: "Hierarchy").
fn read_level(buf: &[u8], version: u32, ptr: u64) -> Result<Vec<u64>> {
    let mut cursor = ByteCursor::at(buf, ptr)?;
    let _level_width = cursor.read_u32()?;
    let _level_height = cursor.read_u32()?;

    let mut tile_ptrs = Vec::new();
    loop {
        let ptr = cursor.read_pointer(version)?;
        if ptr == 0 {
            break;
        }
        tile_ptrs.push(ptr);
    }

    Ok(tile_ptrs)
}

/// Decodes one channel-plane's RLE stream into `dst`, which must already be
/// sized to the exact number of bytes the plane is expected to hold.
/// Running past that size is the `MalformedTile` case spec.md §4.5 calls
/// out explicitly ("over-run into the next channel").
///
/// `n < 127` is a short run (one byte repeated `n + 1` times); `n == 127` is
/// a long literal run (`u16` count, then that many bytes verbatim); `n ==
/// 128` is a long fill run (`u16` count, then one byte repeated that many
/// times); `n > 128` is a short literal run (`256 - n` bytes verbatim).
fn rle_decode_plane(cursor: &mut ByteCursor<'_>, dst: &mut [u8]) -> Result<()> {
    let mut written = 0;

    while written < dst.len() {
        let n = cursor.read_u8()?;

        match n {
            0..=126 => {
                let count = n as usize + 1;
                let value = cursor.read_u8()?;
                write_run(dst, &mut written, value, count)?;
            }
            127 => {
                let count = cursor.read_u16()? as usize;
                let bytes = cursor.read_bytes(count)?;
                write_literal(dst, &mut written, bytes)?;
            }
            128 => {
                let count = cursor.read_u16()? as usize;
                let value = cursor.read_u8()?;
                write_run(dst, &mut written, value, count)?;
            }
            _ => {
                let count = 256 - n as usize;
                let bytes = cursor.read_bytes(count)?;
                write_literal(dst, &mut written, bytes)?;
            }
        }
    }

    Ok(())
}

fn write_run(dst: &mut [u8], written: &mut usize, value: u8, count: usize) -> Result<()> {
    let end = *written + count;
    let slice = dst
        .get_mut(*written..end)
        .ok_or(Error::MalformedTile("RLE run overran its channel plane"))?;
    slice.fill(value);
    *written = end;
    Ok(())
}

fn write_literal(dst: &mut [u8], written: &mut usize, bytes: &[u8]) -> Result<()> {
    let end = *written + bytes.len();
    let slice = dst
        .get_mut(*written..end)
        .ok_or(Error::MalformedTile("RLE literal overran its channel plane"))?;
    slice.copy_from_slice(bytes);
    *written = end;
    Ok(())
}

/// IEEE 754 binary16 -> f32, used only for `HALF_LINEAR`/`HALF_GAMMA`
/// samples; there is no half-float type in `core`, and pulling in a crate
/// just for this ten-line bit-twiddle isn't worth the dependency.
fn half_to_f32(bits: u16) -> f32 {
    let sign = (bits >> 15) & 1;
    let exponent = (bits >> 10) & 0x1F;
    let mantissa = bits & 0x3FF;

    let value = if exponent == 0 {
        (mantissa as f32) * 2f32.powi(-24)
    } else if exponent == 0x1F {
        if mantissa == 0 {
            f32::INFINITY
        } else {
            f32::NAN
        }
    } else {
        (1.0 + mantissa as f32 / 1024.0) * 2f32.powi(exponent as i32 - 15)
    };

    if sign == 1 {
        -value
    } else {
        value
    }
}

/// Scales one already-RLE-decoded sample down to an 8-bit channel value.
/// Integer widths take the high byte (divide by `257`/`16843009`); floating
/// precisions clamp to `[0, 1]` and scale by `255`. Linear vs. gamma is not
/// corrected here (accepted non-goal, spec.md §4.5).
///
/// Integer samples are big-endian, matching the rest of the format.
/// Floating-point samples are little-endian: this is the one place spec.md
/// flags as an open question (§9): files produced by GIMP 2.10 store
/// IEEE-754 floats little-endian even though everything else is
/// big-endian, and this crate follows that observed behavior rather than
/// the format's general endianness.
fn sample_to_u8(bytes: &[u8], precision: Precision) -> u8 {
    use Precision::*;

    match precision {
        U8Linear | U8Gamma => bytes[0],
        U16Linear | U16Gamma => {
            let v = u16::from_be_bytes([bytes[0], bytes[1]]);
            (v / 257) as u8
        }
        U32Linear | U32Gamma => {
            let v = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            (v / 16843009) as u8
        }
        HalfLinear | HalfGamma => {
            let bits = u16::from_le_bytes([bytes[0], bytes[1]]);
            float_sample_to_u8(half_to_f32(bits))
        }
        FloatLinear | FloatGamma => {
            let v = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            float_sample_to_u8(v)
        }
        DoubleLinear | DoubleGamma => {
            let v = f64::from_le_bytes(bytes.try_into().expect("8 bytes"));
            float_sample_to_u8(v as f32)
        }
    }
}

fn float_sample_to_u8(v: f32) -> u8 {
    let clamped = num_traits::clamp(v, 0.0, 1.0);
    (clamped * 255.0).round() as u8
}

/// Decodes and RGBA-converts every tile of `layer`, clipped to its own
/// bounds, into a row-major `width * height` buffer local to the layer
/// (canvas placement is the caller's job). Group layers have no pixel data
/// and decode to a fully transparent buffer without touching the buffer's
/// hierarchy pointer.
pub(crate) fn decode_layer_rgba(
    buf: &[u8],
    version: u32,
    precision: Precision,
    compression: CompressionType,
    layer: &Layer,
    colormap: &[[u8; 3]],
) -> Result<Vec<Rgba>> {
    let width = layer.width as usize;
    let height = layer.height as usize;
    let mut out = vec![Rgba::TRANSPARENT; width * height];

    if layer.is_group || layer.hierarchy_ptr == 0 {
        return Ok(out);
    }

    let channels = layer.color_mode.channel_count();
    let bytes_per_channel = precision.bytes_per_channel();

    let hierarchy = read_hierarchy(buf, version, layer.hierarchy_ptr)?;
    if hierarchy.bpp != channels * bytes_per_channel {
        return Err(Error::MalformedTile(
            "channel count inconsistent with layer type",
        ));
    }

    let tile_ptrs = read_level(buf, version, hierarchy.level_ptr)?;
    let tiles_across = width.div_ceil(TILE_EDGE).max(1);
    let bpp = channels * bytes_per_channel;

    let mut byte_planes = Vec::with_capacity(bpp * TILE_EDGE * TILE_EDGE);
    let mut scratch = Vec::with_capacity(TILE_EDGE * TILE_EDGE);
    let mut raw = Vec::with_capacity(TILE_EDGE * TILE_EDGE * 4);

    for (k, &tile_ptr) in tile_ptrs.iter().enumerate() {
        let tx = (k % tiles_across) * TILE_EDGE;
        let ty = (k / tiles_across) * TILE_EDGE;

        if tx >= width || ty >= height {
            continue;
        }

        let tile_w = (width - tx).min(TILE_EDGE);
        let tile_h = (height - ty).min(TILE_EDGE);
        let tile_pixels = tile_w * tile_h;

        raw.clear();
        raw.resize(tile_pixels * channels, 0);

        let mut cursor = ByteCursor::at(buf, tile_ptr)?;

        // A tile is `bpp` independent one-byte-per-pixel planes, not
        // `channels` planes of `bytes_per_channel`-byte samples: every
        // significant byte of every channel gets its own plane, each
        // restarting at a fresh boundary (spec.md §4.5). Only the `Rle`
        // compression actually run-length-decodes a plane; `None` tiles
        // store the same per-plane layout uncompressed.
        byte_planes.clear();
        byte_planes.resize(bpp * tile_pixels, 0);
        for plane in 0..bpp {
            let dst = &mut byte_planes[plane * tile_pixels..(plane + 1) * tile_pixels];
            match compression {
                CompressionType::Rle => {
                    scratch.clear();
                    scratch.resize(tile_pixels, 0);
                    rle_decode_plane(&mut cursor, &mut scratch)?;
                    dst.copy_from_slice(&scratch);
                }
                CompressionType::None => dst.copy_from_slice(cursor.read_bytes(tile_pixels)?),
            }
        }

        for px in 0..tile_pixels {
            for ch in 0..channels {
                let mut sample = [0u8; 8];
                for (k, slot) in sample.iter_mut().enumerate().take(bytes_per_channel) {
                    let plane = ch * bytes_per_channel + k;
                    *slot = byte_planes[plane * tile_pixels + px];
                }
                raw[px * channels + ch] = sample_to_u8(&sample[..bytes_per_channel], precision);
            }
        }

        let rgba_tile = PixelConverter::convert(&raw, layer.color_mode, colormap);

        for (j, i) in itertools::iproduct!(0..tile_h, 0..tile_w) {
            out[(ty + j) * width + (tx + i)] = rgba_tile[j * tile_w + i];
        }
    }

    Ok(out)
}
