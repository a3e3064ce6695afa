//! Decoder facade: owns decoded frames, exposes lazy per-index handles.
//!
//! Decoded frames live in two index-aligned sequences: the internal slots
//! holding raw engine output, and the issued caller-visible handles. A
//! handle is created on first `get_frame(i)`; the internal buffer moves into
//! it exactly once, after which the slot is `Consumed` and repeat calls
//! return the same handle with stable contents.

use std::io::Read;
use std::path::Path;

use crate::codec::{DecodeParams, Engine, ProgressFn, StoreEngine};
use crate::error::Result;
use crate::frame::{Frame, FrameHandle};
use crate::io::{BlobReader, FileSource};

/// Per-index state of the internal frame storage.
enum FrameSlot {
    /// Raw decode output, not yet moved into a handle.
    Ready(Frame),
    /// Buffer already moved out; must never be moved again.
    Consumed,
}

/// Stateful decode facade over a codec [`Engine`].
///
/// Each decoder is an independently owned unit: no shared state with other
/// decoders, no internal locking. Do not call one decoder from two threads.
pub struct Decoder {
    quality: i32,
    scale: u32,
    callback: Option<Box<ProgressFn>>,
    internal: Vec<FrameSlot>,
    issued: Vec<Option<Box<FrameHandle>>>,
    engine: Box<dyn Engine>,
}

impl Decoder {
    /// A decoder over the built-in [`StoreEngine`], quality 100, full scale.
    pub fn new() -> Self {
        Self::with_engine(Box::new(StoreEngine))
    }

    /// A decoder over a caller-supplied engine.
    pub fn with_engine(engine: Box<dyn Engine>) -> Self {
        Self {
            quality: 100,
            scale: 1,
            callback: None,
            internal: Vec::new(),
            issued: Vec::new(),
            engine,
        }
    }

    /// Decode quality, 0-100. Lower permits more aggressive partial decode.
    ///
    /// Affects only subsequent decode calls, never already-decoded frames.
    pub fn set_quality(&mut self, quality: i32) {
        self.quality = quality;
    }

    /// Power-of-two downscale divisor; 1 is full resolution.
    ///
    /// Affects only subsequent decode calls.
    pub fn set_scale(&mut self, scale: u32) {
        self.scale = scale;
    }

    /// Install a progress callback, invoked synchronously during decode.
    ///
    /// Report-only: it cannot abort a decode in progress.
    pub fn set_callback(&mut self, callback: Option<Box<ProgressFn>>) {
        self.callback = callback;
    }

    /// Decode a container from a file.
    ///
    /// Clears all prior frame state first; previously issued handles become
    /// stale and are the caller's responsibility. Returns `false` if the
    /// file cannot be opened or the stream is rejected, leaving
    /// [`frame_count`](Decoder::frame_count) at zero.
    pub fn decode_file(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        self.clear();
        let mut src = match FileSource::open(path) {
            Ok(src) => src,
            Err(err) => {
                log::warn!("decode_file: cannot open {}: {err}", path.display());
                return false;
            }
        };
        self.run_decode(&mut src)
    }

    /// Decode a container from an in-memory byte range.
    ///
    /// Same contract as [`decode_file`](Decoder::decode_file), with no
    /// file-system interaction.
    pub fn decode_memory(&mut self, data: &[u8]) -> bool {
        self.clear();
        let mut src = BlobReader::new(data);
        self.run_decode(&mut src)
    }

    /// Number of frames produced by the most recent successful decode.
    ///
    /// Zero before any decode, and zero again after a failed one.
    pub fn frame_count(&self) -> usize {
        self.internal.len()
    }

    /// Caller-visible handle for frame `index`, or `None` if out of range.
    ///
    /// The first call for an index materializes the handle by moving the
    /// internal buffer into it; repeat calls return the same handle without
    /// re-moving, so its contents stay stable.
    pub fn get_frame(&mut self, index: usize) -> Option<&FrameHandle> {
        if index >= self.internal.len() {
            return None;
        }
        if self.issued.len() < self.internal.len() {
            self.issued.resize_with(self.internal.len(), || None);
        }
        let handle = self.issued[index].get_or_insert_with(|| Box::new(FrameHandle::empty()));
        if let FrameSlot::Ready(frame) =
            core::mem::replace(&mut self.internal[index], FrameSlot::Consumed)
        {
            handle.fill_from(frame);
        }
        Some(&**handle)
    }

    fn clear(&mut self) {
        self.internal.clear();
        self.issued.clear();
    }

    fn run_decode(&mut self, src: &mut dyn Read) -> bool {
        match self.try_decode(src) {
            Ok(()) => {
                log::debug!("decoded {} frame(s)", self.internal.len());
                true
            }
            Err(err) => {
                log::warn!("decode failed: {err}");
                self.clear();
                false
            }
        }
    }

    fn try_decode(&mut self, src: &mut dyn Read) -> Result<()> {
        let params = DecodeParams {
            quality: self.quality,
            scale: self.scale,
        };
        let progress: Option<&mut dyn FnMut(i32, i64) -> u32> =
            match self.callback.as_deref_mut() {
                Some(cb) => Some(cb),
                None => None,
            };
        let frames = self.engine.decode(src, &params, progress)?;
        self.internal = frames.into_iter().map(FrameSlot::Ready).collect();
        Ok(())
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{EncodeParams, Encoding, StoreEngine, MEMORY_TRANSFORMS};
    use crate::codec::{COUNT_DIVISOR, MIN_SUBTREE_SIZE, SPLIT_THRESHOLD};
    use crate::io::BlobSink;
    use std::io::Write as _;

    fn solid_frame(w: u32, h: u32, v: u8) -> Frame {
        let mut frame = Frame::rgba8(w, h);
        let row: Vec<u8> = (0..w).flat_map(|_| [v, v, v, 255]).collect();
        for y in 0..h {
            frame.write_row_rgba8(y, &row).unwrap();
        }
        frame
    }

    fn container(frames: &[Frame]) -> Vec<u8> {
        let mut sink = BlobSink::new();
        StoreEngine
            .encode(
                &mut sink,
                frames,
                &EncodeParams {
                    encoding: Encoding::Sequential,
                    learn_repeats: 3,
                    auto_color_buckets: 1,
                    palette_size: 512,
                    lookback: 1,
                    divisor: COUNT_DIVISOR,
                    min_size: MIN_SUBTREE_SIZE,
                    split_threshold: SPLIT_THRESHOLD,
                    frame_delay: 100,
                    transforms: MEMORY_TRANSFORMS,
                },
            )
            .unwrap();
        sink.into_bytes()
    }

    #[test]
    fn decode_memory_populates_frames() {
        let bytes = container(&[solid_frame(2, 2, 10), solid_frame(2, 2, 20)]);
        let mut dec = Decoder::new();
        assert_eq!(dec.frame_count(), 0);
        assert!(dec.decode_memory(&bytes));
        assert_eq!(dec.frame_count(), 2);
    }

    #[test]
    fn get_frame_in_range_never_null() {
        let bytes = container(&[solid_frame(2, 2, 1), solid_frame(2, 2, 2), solid_frame(2, 2, 3)]);
        let mut dec = Decoder::new();
        assert!(dec.decode_memory(&bytes));
        for i in 0..dec.frame_count() {
            assert!(dec.get_frame(i).is_some(), "frame {i} should be available");
        }
    }

    #[test]
    fn get_frame_out_of_range_is_none() {
        let bytes = container(&[solid_frame(2, 2, 1)]);
        let mut dec = Decoder::new();
        assert!(dec.decode_memory(&bytes));
        assert!(dec.get_frame(1).is_none());
        assert!(dec.get_frame(usize::MAX).is_none());
    }

    #[test]
    fn repeat_get_frame_is_stable() {
        let bytes = container(&[solid_frame(2, 2, 77)]);
        let mut dec = Decoder::new();
        assert!(dec.decode_memory(&bytes));

        let first = dec.get_frame(0).unwrap().clone();
        assert!(!first.is_empty());
        let mut row_a = [0u8; 8];
        first.read_row_rgba8(0, &mut row_a).unwrap();

        // Second call: same handle object, no duplicate move, no data loss.
        let second = dec.get_frame(0).unwrap();
        assert!(first.ptr_eq(second));
        let mut row_b = [0u8; 8];
        second.read_row_rgba8(0, &mut row_b).unwrap();
        assert_eq!(row_a, row_b);
        assert_eq!(&row_a[..4], &[77, 77, 77, 255]);
    }

    #[test]
    fn missing_file_returns_false_and_clears() {
        let bytes = container(&[solid_frame(2, 2, 5)]);
        let mut dec = Decoder::new();
        assert!(dec.decode_memory(&bytes));
        assert_eq!(dec.frame_count(), 1);

        let dir = tempfile::tempdir().unwrap();
        assert!(!dec.decode_file(dir.path().join("absent.lif")));
        assert_eq!(dec.frame_count(), 0);
        assert!(dec.get_frame(0).is_none());
    }

    #[test]
    fn garbage_input_returns_false_with_empty_state() {
        let mut dec = Decoder::new();
        assert!(!dec.decode_memory(b"this is not a container"));
        assert_eq!(dec.frame_count(), 0);
    }

    #[test]
    fn second_decode_clears_previous_state() {
        let three = container(&[solid_frame(2, 2, 1), solid_frame(2, 2, 2), solid_frame(2, 2, 3)]);
        let one = container(&[solid_frame(4, 4, 9)]);

        let mut dec = Decoder::new();
        assert!(dec.decode_memory(&three));
        let stale = dec.get_frame(2).unwrap().clone();
        assert_eq!(dec.frame_count(), 3);

        assert!(dec.decode_memory(&one));
        assert_eq!(dec.frame_count(), 1);
        assert!(dec.get_frame(1).is_none());
        // Fresh handle reflects the latest decode, not the stale one.
        let fresh = dec.get_frame(0).unwrap();
        assert!(!stale.ptr_eq(fresh));
        assert_eq!(fresh.width(), 4);
    }

    #[test]
    fn decode_file_roundtrip() {
        let bytes = container(&[solid_frame(3, 3, 42)]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anim.lif");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(&bytes)
            .unwrap();

        let mut dec = Decoder::new();
        assert!(dec.decode_file(&path));
        assert_eq!(dec.frame_count(), 1);
        assert_eq!(dec.get_frame(0).unwrap().width(), 3);
    }

    #[test]
    fn scale_applies_to_next_decode() {
        let bytes = container(&[solid_frame(8, 8, 1)]);
        let mut dec = Decoder::new();
        dec.set_scale(4);
        assert!(dec.decode_memory(&bytes));
        assert_eq!(dec.get_frame(0).unwrap().width(), 2);
    }

    #[test]
    fn invalid_scale_fails_decode() {
        let bytes = container(&[solid_frame(4, 4, 1)]);
        let mut dec = Decoder::new();
        dec.set_scale(3);
        assert!(!dec.decode_memory(&bytes));
        assert_eq!(dec.frame_count(), 0);
    }

    #[test]
    fn callback_sees_progress() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let bytes = container(&[solid_frame(2, 2, 1), solid_frame(2, 2, 2)]);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);

        let mut dec = Decoder::new();
        dec.set_callback(Some(Box::new(move |quality: i32, read: i64| -> u32 {
            sink.borrow_mut().push((quality, read));
            0
        }) as Box<ProgressFn>));
        assert!(dec.decode_memory(&bytes));
        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].0, 100);
    }
}
