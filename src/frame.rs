//! Frame value type and the caller-visible frame handle.
//!
//! Uses `imgref::ImgVec` for 2D pixel data with typed pixels from the `rgb`
//! crate. A [`Frame`] is the movable pixel-buffer resource; a [`FrameHandle`]
//! is the shared, caller-visible wrapper around it.
//!
//! Sharing is deliberate: the encoder stores non-owning clones of caller
//! handles, and [`Encoder::add_frame`](crate::Encoder::add_frame) may flip the
//! added frame's own alpha flag. `Rc<RefCell<..>>` gives those semantics
//! explicit, visible form. Handles are therefore `!Send`; one handle belongs
//! to one thread, independent handles may live on different threads.

use std::cell::RefCell;
use std::rc::Rc;

use imgref::ImgVec;
use rgb::Rgba;

use crate::error::{Error, Result};

/// Pixel storage for one frame.
///
/// The variant determines channel precision. All frames are RGBA; opaque
/// images carry a constant alpha plane. `Empty` is the unmaterialized
/// shell state; pixel buffers never have zero dimensions.
#[derive(Clone)]
#[non_exhaustive]
pub enum PixelBuf {
    /// No pixels yet (unmaterialized shell).
    Empty,
    /// 8-bit per channel.
    Rgba8(ImgVec<Rgba<u8>>),
    /// 16-bit per channel (HDR).
    Rgba16(ImgVec<Rgba<u16>>),
}

impl PixelBuf {
    /// Width in pixels.
    pub fn width(&self) -> u32 {
        match self {
            PixelBuf::Empty => 0,
            PixelBuf::Rgba8(img) => img.width() as u32,
            PixelBuf::Rgba16(img) => img.width() as u32,
        }
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        match self {
            PixelBuf::Empty => 0,
            PixelBuf::Rgba8(img) => img.height() as u32,
            PixelBuf::Rgba16(img) => img.height() as u32,
        }
    }

    /// Bits per channel: 8 or 16, or 0 for an empty shell.
    pub fn depth(&self) -> u8 {
        match self {
            PixelBuf::Empty => 0,
            PixelBuf::Rgba8(_) => 8,
            PixelBuf::Rgba16(_) => 16,
        }
    }

    /// Whether the buffer holds no pixels.
    pub fn is_empty(&self) -> bool {
        matches!(self, PixelBuf::Empty)
    }
}

impl core::fmt::Debug for PixelBuf {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PixelBuf")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("depth", &self.depth())
            .finish()
    }
}

/// One image in a container: a pixel buffer plus per-frame metadata.
#[derive(Clone, Debug)]
pub struct Frame {
    pixels: PixelBuf,
    delay_ms: u32,
    alpha_zero_special: bool,
}

/// Default frame delay in milliseconds.
pub const DEFAULT_FRAME_DELAY_MS: u32 = 100;

impl Frame {
    /// Wrap an existing pixel buffer with default metadata.
    pub fn new(pixels: PixelBuf) -> Self {
        Self {
            pixels,
            delay_ms: DEFAULT_FRAME_DELAY_MS,
            alpha_zero_special: true,
        }
    }

    /// A 0x0 shell, as used for not-yet-materialized handles.
    pub fn empty() -> Self {
        Self::new(PixelBuf::Empty)
    }

    /// Allocate a zeroed 8-bit RGBA frame. Zero dimensions yield a shell.
    pub fn rgba8(width: u32, height: u32) -> Self {
        if width == 0 || height == 0 {
            return Self::empty();
        }
        let buf = vec![Rgba::new(0u8, 0, 0, 0); width as usize * height as usize];
        Self::new(PixelBuf::Rgba8(ImgVec::new(buf, width as usize, height as usize)))
    }

    /// Allocate a zeroed 16-bit RGBA frame. Zero dimensions yield a shell.
    pub fn rgba16(width: u32, height: u32) -> Self {
        if width == 0 || height == 0 {
            return Self::empty();
        }
        let buf = vec![Rgba::new(0u16, 0, 0, 0); width as usize * height as usize];
        Self::new(PixelBuf::Rgba16(ImgVec::new(buf, width as usize, height as usize)))
    }

    /// Borrow the pixel storage.
    pub fn pixels(&self) -> &PixelBuf {
        &self.pixels
    }

    /// Take the pixel storage, consuming this frame.
    pub fn into_pixels(self) -> PixelBuf {
        self.pixels
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Bits per channel: 8 or 16, or 0 for an unmaterialized shell.
    pub fn depth(&self) -> u8 {
        self.pixels.depth()
    }

    /// Channel count. Frames are always stored RGBA.
    pub fn channels(&self) -> u8 {
        4
    }

    /// Whether the frame holds no pixels (an unmaterialized shell).
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Frame delay in milliseconds (animation timing).
    pub fn delay_ms(&self) -> u32 {
        self.delay_ms
    }

    /// Set the frame delay in milliseconds.
    pub fn set_delay_ms(&mut self, delay_ms: u32) {
        self.delay_ms = delay_ms;
    }

    /// Whether fully transparent pixels may be treated specially by the codec.
    pub fn alpha_zero_special(&self) -> bool {
        self.alpha_zero_special
    }

    /// Set the alpha-zero handling flag.
    pub fn set_alpha_zero_special(&mut self, on: bool) {
        self.alpha_zero_special = on;
    }

    /// Copy one row out as packed RGBA8 (`width * 4` bytes).
    ///
    /// 16-bit frames are narrowed to their high byte. Fails if `y` is out of
    /// range or `out` is shorter than one packed row.
    pub fn read_row_rgba8(&self, y: u32, out: &mut [u8]) -> Result<()> {
        let w = self.width() as usize;
        if y >= self.height() {
            return Err(Error::InvalidArgument("row index out of range"));
        }
        if out.len() < w * 4 {
            return Err(Error::InvalidArgument("row buffer too short"));
        }
        match &self.pixels {
            // Empty shells have height 0; the range check above rejects them.
            PixelBuf::Empty => {}
            PixelBuf::Rgba8(img) => {
                let row = &img.buf()[y as usize * w..y as usize * w + w];
                for (px, chunk) in row.iter().zip(out.chunks_exact_mut(4)) {
                    chunk.copy_from_slice(&[px.r, px.g, px.b, px.a]);
                }
            }
            PixelBuf::Rgba16(img) => {
                let row = &img.buf()[y as usize * w..y as usize * w + w];
                for (px, chunk) in row.iter().zip(out.chunks_exact_mut(4)) {
                    chunk.copy_from_slice(&[
                        (px.r >> 8) as u8,
                        (px.g >> 8) as u8,
                        (px.b >> 8) as u8,
                        (px.a >> 8) as u8,
                    ]);
                }
            }
        }
        Ok(())
    }

    /// Overwrite one row from packed RGBA8 (`width * 4` bytes).
    ///
    /// 16-bit frames are widened by byte replication (`0xAB` -> `0xABAB`).
    /// Fails if `y` is out of range or `row` is shorter than one packed row.
    pub fn write_row_rgba8(&mut self, y: u32, row: &[u8]) -> Result<()> {
        let w = self.width() as usize;
        if y >= self.height() {
            return Err(Error::InvalidArgument("row index out of range"));
        }
        if row.len() < w * 4 {
            return Err(Error::InvalidArgument("row buffer too short"));
        }
        match &mut self.pixels {
            PixelBuf::Empty => {}
            PixelBuf::Rgba8(img) => {
                let dst = &mut img.buf_mut()[y as usize * w..y as usize * w + w];
                for (px, chunk) in dst.iter_mut().zip(row.chunks_exact(4)) {
                    *px = Rgba::new(chunk[0], chunk[1], chunk[2], chunk[3]);
                }
            }
            PixelBuf::Rgba16(img) => {
                let dst = &mut img.buf_mut()[y as usize * w..y as usize * w + w];
                for (px, chunk) in dst.iter_mut().zip(row.chunks_exact(4)) {
                    let widen = |v: u8| u16::from(v) << 8 | u16::from(v);
                    *px = Rgba::new(widen(chunk[0]), widen(chunk[1]), widen(chunk[2]), widen(chunk[3]));
                }
            }
        }
        Ok(())
    }
}

/// Caller-visible, shared frame object.
///
/// This is the image type that crosses the C boundary. Cloning a handle
/// shares the underlying frame; use [`clone_frame`](FrameHandle::clone_frame)
/// for a deep copy.
#[derive(Clone)]
pub struct FrameHandle(Rc<RefCell<Frame>>);

impl FrameHandle {
    /// Wrap a frame in a fresh handle.
    pub fn new(frame: Frame) -> Self {
        Self(Rc::new(RefCell::new(frame)))
    }

    /// An empty shell handle (0x0 frame), to be filled lazily.
    pub fn empty() -> Self {
        Self::new(Frame::empty())
    }

    /// Move `frame` into this handle, replacing its current contents.
    ///
    /// Used by the decoder to materialize a handle exactly once.
    pub fn fill_from(&self, frame: Frame) {
        *self.0.borrow_mut() = frame;
    }

    /// Deep-copy the underlying frame.
    pub fn clone_frame(&self) -> Frame {
        self.0.borrow().clone()
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.0.borrow().width()
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.0.borrow().height()
    }

    /// Bits per channel: 8 or 16, or 0 for an unmaterialized shell.
    pub fn depth(&self) -> u8 {
        self.0.borrow().depth()
    }

    /// Channel count (always 4).
    pub fn channels(&self) -> u8 {
        self.0.borrow().channels()
    }

    /// Whether the handle still holds an unmaterialized 0x0 shell.
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Frame delay in milliseconds.
    pub fn delay_ms(&self) -> u32 {
        self.0.borrow().delay_ms()
    }

    /// Set the frame delay in milliseconds.
    pub fn set_delay_ms(&self, delay_ms: u32) {
        self.0.borrow_mut().set_delay_ms(delay_ms);
    }

    /// Whether fully transparent pixels may be treated specially.
    pub fn alpha_zero_special(&self) -> bool {
        self.0.borrow().alpha_zero_special()
    }

    /// Set the alpha-zero handling flag on the underlying frame.
    pub fn set_alpha_zero_special(&self, on: bool) {
        self.0.borrow_mut().set_alpha_zero_special(on);
    }

    /// Copy one row out as packed RGBA8.
    pub fn read_row_rgba8(&self, y: u32, out: &mut [u8]) -> Result<()> {
        self.0.borrow().read_row_rgba8(y, out)
    }

    /// Overwrite one row from packed RGBA8.
    pub fn write_row_rgba8(&self, y: u32, row: &[u8]) -> Result<()> {
        self.0.borrow_mut().write_row_rgba8(y, row)
    }

    /// Whether two handles refer to the same underlying frame.
    pub fn ptr_eq(&self, other: &FrameHandle) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl core::fmt::Debug for FrameHandle {
    // try_borrow so formatting never panics while a mutable borrow is live
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.0.try_borrow() {
            Ok(frame) => f
                .debug_struct("FrameHandle")
                .field("width", &frame.width())
                .field("height", &frame.height())
                .field("depth", &frame.depth())
                .finish(),
            Err(_) => f.write_str("FrameHandle(<borrowed>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_frame(w: u32, h: u32) -> Frame {
        let mut frame = Frame::rgba8(w, h);
        for y in 0..h {
            let row: Vec<u8> = (0..w)
                .flat_map(|x| [x as u8, y as u8, (x + y) as u8, 255])
                .collect();
            frame.write_row_rgba8(y, &row).unwrap();
        }
        frame
    }

    #[test]
    fn empty_shell() {
        let frame = Frame::empty();
        assert_eq!(frame.width(), 0);
        assert_eq!(frame.height(), 0);
        assert!(frame.is_empty());
        assert_eq!(frame.depth(), 0);
        assert_eq!(frame.delay_ms(), DEFAULT_FRAME_DELAY_MS);
        assert!(frame.alpha_zero_special());
    }

    #[test]
    fn row_roundtrip_rgba8() {
        let frame = gradient_frame(4, 3);
        let mut out = [0u8; 16];
        frame.read_row_rgba8(2, &mut out).unwrap();
        assert_eq!(&out[..4], &[0, 2, 2, 255]);
        assert_eq!(&out[12..], &[3, 2, 5, 255]);
    }

    #[test]
    fn row_bounds_checked() {
        let mut frame = Frame::rgba8(2, 2);
        let mut out = [0u8; 8];
        assert!(frame.read_row_rgba8(2, &mut out).is_err());
        assert!(frame.read_row_rgba8(0, &mut out[..7]).is_err());
        assert!(frame.write_row_rgba8(5, &[0; 8]).is_err());
        assert!(frame.write_row_rgba8(0, &[0; 3]).is_err());
    }

    #[test]
    fn rgba16_narrowing_and_widening() {
        let mut frame = Frame::rgba16(2, 1);
        frame.write_row_rgba8(0, &[0xAB, 0x00, 0xFF, 0x80, 1, 2, 3, 4]).unwrap();
        // Widened by byte replication.
        if let PixelBuf::Rgba16(img) = frame.pixels() {
            assert_eq!(img.buf()[0].r, 0xABAB);
            assert_eq!(img.buf()[0].b, 0xFFFF);
        } else {
            panic!("expected 16-bit buffer");
        }
        // Narrowed back to the high byte.
        let mut out = [0u8; 8];
        frame.read_row_rgba8(0, &mut out).unwrap();
        assert_eq!(&out[..4], &[0xAB, 0x00, 0xFF, 0x80]);
    }

    #[test]
    fn handle_shares_frame() {
        let a = FrameHandle::new(gradient_frame(2, 2));
        let b = a.clone();
        assert!(a.ptr_eq(&b));
        b.set_delay_ms(250);
        assert_eq!(a.delay_ms(), 250);
        b.set_alpha_zero_special(false);
        assert!(!a.alpha_zero_special());
    }

    #[test]
    fn clone_frame_is_deep() {
        let handle = FrameHandle::new(gradient_frame(2, 2));
        let mut copy = handle.clone_frame();
        copy.write_row_rgba8(0, &[9, 9, 9, 9, 9, 9, 9, 9]).unwrap();
        let mut out = [0u8; 8];
        handle.read_row_rgba8(0, &mut out).unwrap();
        assert_eq!(&out[..4], &[0, 0, 0, 255]);
    }

    #[test]
    fn fill_from_replaces_shell() {
        let handle = FrameHandle::empty();
        assert!(handle.is_empty());
        handle.fill_from(gradient_frame(3, 1));
        assert!(!handle.is_empty());
        assert_eq!(handle.width(), 3);
        assert_eq!(handle.height(), 1);
    }
}
