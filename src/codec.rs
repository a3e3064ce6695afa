//! The codec engine seam and the built-in reference engine.
//!
//! The facades treat the codec as a black box reached through the [`Engine`]
//! trait: one decode entry point and one encode entry point, both working
//! over the uniform byte-stream capability from [`crate::io`].
//!
//! [`StoreEngine`] is the built-in engine: a raw container (magic, version,
//! frame table, uncompressed RGBA payloads) with power-of-two downscale and
//! per-frame progress reporting. It performs no pixel transforms or entropy
//! coding; real codecs plug in through the trait. It exists so the facade
//! layer is testable end-to-end.

use std::io::{Read, Write};

use imgref::ImgVec;
use rgb::Rgba;

use crate::error::{Error, Result};
use crate::frame::{Frame, PixelBuf};

/// Transform-description list used when encoding to a file target.
pub const FILE_TRANSFORMS: &[&str] = &[
    "PLC", "YIQ", "BND", "PLA", "PLT", "ACB", "DUP", "FRS", "FRA",
];

/// Transform-description list used when encoding to a memory target.
///
/// Identical to [`FILE_TRANSFORMS`] minus `PLC`; the difference is fixed and
/// not configurable.
pub const MEMORY_TRANSFORMS: &[&str] = &["YIQ", "BND", "PLA", "PLT", "ACB", "DUP", "FRS", "FRA"];

/// Default model-split count divisor.
pub const COUNT_DIVISOR: i32 = 30;
/// Default minimum model subtree size.
pub const MIN_SUBTREE_SIZE: i32 = 50;
/// Default model split threshold.
pub const SPLIT_THRESHOLD: i32 = 5461 * 8 * 8;

/// Largest accepted frame edge, in pixels.
pub const MAX_DIMENSION: u32 = 65_536;
/// Largest accepted pixel count per frame.
pub const MAX_PIXELS: u64 = 1 << 26;

const MAGIC: [u8; 4] = *b"LIFC";
const VERSION: u8 = 1;

/// Pixel ordering used by the encoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
    /// Sequential scanline order.
    Sequential,
    /// Interlaced (progressive) order.
    Interlaced,
}

/// Settings passed to [`Engine::decode`].
#[derive(Clone, Copy, Debug)]
pub struct DecodeParams {
    /// Decode quality, 0-100. Lower permits more aggressive partial decode
    /// on engines with progressive streams.
    pub quality: i32,
    /// Power-of-two downscale divisor; 1 is full resolution.
    pub scale: u32,
}

impl Default for DecodeParams {
    fn default() -> Self {
        Self {
            quality: 100,
            scale: 1,
        }
    }
}

/// Settings passed to [`Engine::encode`].
#[derive(Clone, Copy, Debug)]
pub struct EncodeParams {
    /// Pixel ordering.
    pub encoding: Encoding,
    /// Number of model-learning passes.
    pub learn_repeats: u32,
    /// Automatic color-bucket detection (nonzero = on).
    pub auto_color_buckets: u32,
    /// Maximum palette size before falling back to full color.
    pub palette_size: i32,
    /// Frame lookback depth for inter-frame prediction.
    pub lookback: i32,
    /// Model-split count divisor.
    pub divisor: i32,
    /// Minimum model subtree size.
    pub min_size: i32,
    /// Model split threshold.
    pub split_threshold: i32,
    /// Default delay for frames without an explicit one, in milliseconds.
    pub frame_delay: u32,
    /// Fixed transform-description list for the target kind.
    pub transforms: &'static [&'static str],
}

/// Progress callback invoked synchronously during decode.
///
/// Arguments are a 0-100 quality figure and the running byte count.
/// Report-only: the return value carries no abort authority.
pub type ProgressFn = dyn FnMut(i32, i64) -> u32;

/// The black-box codec engine the facades delegate to.
pub trait Engine {
    /// Decode a container into its frames.
    fn decode(
        &self,
        src: &mut dyn Read,
        params: &DecodeParams,
        progress: Option<&mut dyn FnMut(i32, i64) -> u32>,
    ) -> Result<Vec<Frame>>;

    /// Encode frames into a container byte stream.
    fn encode(&self, dst: &mut dyn Write, frames: &[Frame], params: &EncodeParams) -> Result<()>;
}

/// Built-in raw-storage engine; see the module docs.
#[derive(Clone, Copy, Debug, Default)]
pub struct StoreEngine;

// Frame flag bits.
const FLAG_ALPHA_ZERO_SPECIAL: u8 = 0b0000_0001;

impl Engine for StoreEngine {
    fn decode(
        &self,
        src: &mut dyn Read,
        params: &DecodeParams,
        mut progress: Option<&mut dyn FnMut(i32, i64) -> u32>,
    ) -> Result<Vec<Frame>> {
        if params.scale == 0 || !params.scale.is_power_of_two() {
            return Err(Error::InvalidArgument("scale must be a power of two"));
        }
        let mut bytes = 0usize;

        let mut magic = [0u8; 4];
        read_into(src, &mut bytes, &mut magic)?;
        if magic != MAGIC {
            return Err(Error::BadMagic);
        }
        let version = read_u8(src, &mut bytes)?;
        if version != VERSION {
            return Err(Error::UnsupportedVersion(version));
        }
        let encoding = read_u8(src, &mut bytes)?;
        if encoding > 1 {
            return Err(Error::Corrupt("bad pixel-ordering flag"));
        }
        let count = read_u32(src, &mut bytes)?;

        let mut frames = Vec::new();
        for i in 0..count {
            let frame = read_frame(src, &mut bytes, params.scale)?;
            frames.push(frame);
            if let Some(cb) = progress.as_mut() {
                let quality = ((i + 1) as i64 * 100 / count as i64) as i32;
                cb(quality, bytes as i64);
            }
        }
        Ok(frames)
    }

    fn encode(&self, dst: &mut dyn Write, frames: &[Frame], params: &EncodeParams) -> Result<()> {
        if frames.is_empty() {
            return Err(Error::NoFrames);
        }
        for frame in frames {
            if frame.is_empty() {
                return Err(Error::InvalidArgument("cannot encode an empty frame"));
            }
        }
        log::debug!(
            "store engine: encoding {} frame(s), {:?}, transforms {:?}",
            frames.len(),
            params.encoding,
            params.transforms
        );

        dst.write_all(&MAGIC)?;
        dst.write_all(&[VERSION])?;
        let ordering = match params.encoding {
            Encoding::Sequential => 0u8,
            Encoding::Interlaced => 1u8,
        };
        dst.write_all(&[ordering])?;
        dst.write_all(&(frames.len() as u32).to_le_bytes())?;

        for frame in frames {
            write_frame(dst, frame)?;
        }
        dst.flush()?;
        Ok(())
    }
}

fn read_into(src: &mut dyn Read, bytes: &mut usize, buf: &mut [u8]) -> Result<()> {
    src.read_exact(buf)?;
    *bytes += buf.len();
    Ok(())
}

fn read_u8(src: &mut dyn Read, bytes: &mut usize) -> Result<u8> {
    let mut buf = [0u8; 1];
    read_into(src, bytes, &mut buf)?;
    Ok(buf[0])
}

fn read_u32(src: &mut dyn Read, bytes: &mut usize) -> Result<u32> {
    let mut buf = [0u8; 4];
    read_into(src, bytes, &mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_frame(src: &mut dyn Read, bytes: &mut usize, scale: u32) -> Result<Frame> {
    let width = read_u32(src, bytes)?;
    let height = read_u32(src, bytes)?;
    if width > MAX_DIMENSION || height > MAX_DIMENSION || width as u64 * height as u64 > MAX_PIXELS
    {
        return Err(Error::Oversized { width, height });
    }
    if width == 0 || height == 0 {
        return Err(Error::Corrupt("zero-sized frame"));
    }
    let depth = read_u8(src, bytes)?;
    if depth != 8 && depth != 16 {
        return Err(Error::Corrupt("bad channel depth"));
    }
    let delay_ms = read_u32(src, bytes)?;
    let flags = read_u8(src, bytes)?;

    let pixel_count = width as usize * height as usize;
    let mut payload = vec![0u8; pixel_count * 4 * (depth as usize / 8)];
    read_into(src, bytes, &mut payload)?;

    let pixels = match depth {
        8 => {
            let buf: Vec<Rgba<u8>> = payload
                .chunks_exact(4)
                .map(|c| Rgba::new(c[0], c[1], c[2], c[3]))
                .collect();
            PixelBuf::Rgba8(subsample(
                ImgVec::new(buf, width as usize, height as usize),
                scale,
            ))
        }
        _ => {
            let le = |c: &[u8]| u16::from_le_bytes([c[0], c[1]]);
            let buf: Vec<Rgba<u16>> = payload
                .chunks_exact(8)
                .map(|c| Rgba::new(le(&c[0..2]), le(&c[2..4]), le(&c[4..6]), le(&c[6..8])))
                .collect();
            PixelBuf::Rgba16(subsample(
                ImgVec::new(buf, width as usize, height as usize),
                scale,
            ))
        }
    };

    let mut frame = Frame::new(pixels);
    frame.set_delay_ms(delay_ms);
    frame.set_alpha_zero_special(flags & FLAG_ALPHA_ZERO_SPECIAL != 0);
    Ok(frame)
}

fn write_frame(dst: &mut dyn Write, frame: &Frame) -> Result<()> {
    dst.write_all(&frame.width().to_le_bytes())?;
    dst.write_all(&frame.height().to_le_bytes())?;
    dst.write_all(&[frame.depth()])?;
    dst.write_all(&frame.delay_ms().to_le_bytes())?;
    let flags = if frame.alpha_zero_special() {
        FLAG_ALPHA_ZERO_SPECIAL
    } else {
        0
    };
    dst.write_all(&[flags])?;

    match frame.pixels() {
        // Empty frames are rejected before this point.
        PixelBuf::Empty => {}
        PixelBuf::Rgba8(img) => {
            for px in img.buf().iter() {
                dst.write_all(&[px.r, px.g, px.b, px.a])?;
            }
        }
        PixelBuf::Rgba16(img) => {
            for px in img.buf().iter() {
                for ch in [px.r, px.g, px.b, px.a] {
                    dst.write_all(&ch.to_le_bytes())?;
                }
            }
        }
    }
    Ok(())
}

/// Keep every `scale`-th pixel in both axes. `scale` is a power of two;
/// output dimensions round up, matching progressive-decode conventions.
fn subsample<T: Copy>(img: ImgVec<T>, scale: u32) -> ImgVec<T> {
    if scale <= 1 || img.width() == 0 || img.height() == 0 {
        return img;
    }
    let s = scale as usize;
    let (w, h) = (img.width(), img.height());
    let out_w = (w - 1) / s + 1;
    let out_h = (h - 1) / s + 1;
    let mut out = Vec::with_capacity(out_w * out_h);
    for y in (0..h).step_by(s) {
        for x in (0..w).step_by(s) {
            out.push(img.buf()[y * w + x]);
        }
    }
    ImgVec::new(out, out_w, out_h)
}
