//! Encoder facade: options, non-owning frame references, defensive copy.
//!
//! The encoder never takes ownership of caller frames — it stores shared
//! handles in call order and deep-copies every frame immediately before
//! invoking the engine, so an encode can never mutate or retain caller
//! pixel data. Added frames accumulate across encode calls; they are not
//! cleared automatically.

use std::io::Write;
use std::path::Path;

use crate::codec::{
    EncodeParams, Encoding, Engine, StoreEngine, COUNT_DIVISOR, FILE_TRANSFORMS,
    MEMORY_TRANSFORMS, MIN_SUBTREE_SIZE, SPLIT_THRESHOLD,
};
use crate::error::Result;
use crate::frame::{Frame, FrameHandle};
use crate::io::{BlobSink, FileSink};

/// Encode options, stored as wide integers for ABI portability.
#[derive(Clone, Copy, Debug)]
pub struct EncoderOptions {
    /// Interlaced pixel ordering (nonzero = on).
    pub interlaced: u32,
    /// Number of model-learning passes.
    pub learn_repeats: u32,
    /// Automatic color-bucket detection (nonzero = on).
    pub auto_color_buckets: u32,
    /// Default delay for frames without an explicit one, in milliseconds.
    pub frame_delay: u32,
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
    /// Special-case fully transparent pixels (nonzero = on).
    pub alpha_zero_special: u32,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            interlaced: 1,
            learn_repeats: 3,
            auto_color_buckets: 1,
            frame_delay: 100,
            palette_size: 512,
            lookback: 1,
            divisor: COUNT_DIVISOR,
            min_size: MIN_SUBTREE_SIZE,
            split_threshold: SPLIT_THRESHOLD,
            alpha_zero_special: 1,
        }
    }
}

/// Stateful encode facade over a codec [`Engine`].
///
/// Same threading contract as [`Decoder`](crate::Decoder): one handle, one
/// thread; independent handles are independent.
pub struct Encoder {
    options: EncoderOptions,
    frames: Vec<FrameHandle>,
    engine: Box<dyn Engine>,
}

impl Encoder {
    /// An encoder over the built-in [`StoreEngine`] with default options.
    pub fn new() -> Self {
        Self::with_engine(Box::new(StoreEngine))
    }

    /// An encoder over a caller-supplied engine.
    pub fn with_engine(engine: Box<dyn Engine>) -> Self {
        Self {
            options: EncoderOptions::default(),
            frames: Vec::new(),
            engine,
        }
    }

    /// Current option values.
    pub fn options(&self) -> &EncoderOptions {
        &self.options
    }

    /// Number of frames added so far.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Set interlaced pixel ordering (nonzero = on).
    pub fn set_interlaced(&mut self, interlaced: u32) {
        self.options.interlaced = interlaced;
    }

    /// Set the number of model-learning passes.
    pub fn set_learn_repeat(&mut self, learn_repeats: u32) {
        self.options.learn_repeats = learn_repeats;
    }

    /// Set automatic color-bucket detection (nonzero = on).
    pub fn set_auto_color_buckets(&mut self, acb: u32) {
        self.options.auto_color_buckets = acb;
    }

    /// Set the maximum palette size.
    pub fn set_palette_size(&mut self, palette_size: i32) {
        self.options.palette_size = palette_size;
    }

    /// Set the frame lookback depth.
    pub fn set_lookback(&mut self, lookback: i32) {
        self.options.lookback = lookback;
    }

    /// Set the model-split count divisor.
    pub fn set_divisor(&mut self, divisor: i32) {
        self.options.divisor = divisor;
    }

    /// Set the minimum model subtree size.
    pub fn set_min_size(&mut self, min_size: i32) {
        self.options.min_size = min_size;
    }

    /// Set the model split threshold.
    pub fn set_split_threshold(&mut self, split_threshold: i32) {
        self.options.split_threshold = split_threshold;
    }

    /// Disable alpha-zero special-casing for fully lossless alpha.
    ///
    /// One-way: there is no setter back to enabled.
    pub fn set_alpha_zero_lossless(&mut self) {
        self.options.alpha_zero_special = 0;
    }

    /// Append a non-owning reference to `frame`, in output order.
    ///
    /// If alpha-zero special-casing is disabled on this encoder at call
    /// time, the added frame's own flag is flipped off as well — a
    /// deliberate side effect on the caller's object that later encodes
    /// depend on.
    pub fn add_frame(&mut self, frame: &FrameHandle) {
        if self.options.alpha_zero_special == 0 {
            frame.set_alpha_zero_special(false);
        }
        self.frames.push(frame.clone());
    }

    /// Encode all added frames to a file.
    ///
    /// Returns `false` if the file cannot be created or the engine rejects
    /// the input. Caller frames are unchanged either way.
    pub fn encode_file(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let mut sink = match FileSink::create(path) {
            Ok(sink) => sink,
            Err(err) => {
                log::warn!("encode_file: cannot create {}: {err}", path.display());
                return false;
            }
        };
        match self
            .try_encode(&mut sink, FILE_TRANSFORMS)
            .and_then(|()| sink.finish())
        {
            Ok(()) => true,
            Err(err) => {
                log::warn!("encode failed: {err}");
                false
            }
        }
    }

    /// Encode all added frames to a fresh byte buffer.
    ///
    /// Returns `None` if the engine rejects the input.
    pub fn encode_memory(&self) -> Option<Vec<u8>> {
        let mut sink = BlobSink::new();
        match self.try_encode(&mut sink, MEMORY_TRANSFORMS) {
            Ok(()) => Some(sink.into_bytes()),
            Err(err) => {
                log::warn!("encode failed: {err}");
                None
            }
        }
    }

    fn try_encode(&self, dst: &mut dyn Write, transforms: &'static [&'static str]) -> Result<()> {
        // Clone-before-encode: the engine must never see caller-owned buffers.
        let copies: Vec<Frame> = self.frames.iter().map(FrameHandle::clone_frame).collect();
        let params = EncodeParams {
            encoding: if self.options.interlaced != 0 {
                Encoding::Interlaced
            } else {
                Encoding::Sequential
            },
            learn_repeats: self.options.learn_repeats,
            auto_color_buckets: self.options.auto_color_buckets,
            palette_size: self.options.palette_size,
            lookback: self.options.lookback,
            divisor: self.options.divisor,
            min_size: self.options.min_size,
            split_threshold: self.options.split_threshold,
            frame_delay: self.options.frame_delay,
            transforms,
        };
        self.engine.encode(dst, &copies, &params)
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}
