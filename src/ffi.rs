//! C ABI boundary.
//!
//! Every export is wrapped so that no internal failure — panic, allocation
//! failure, invalid argument — ever crosses into the caller's runtime. All
//! failures become the operation's documented sentinel: null for handle
//! constructors, `0` for status returns, silence for setters. Destroy
//! functions never fail.
//!
//! Handles are boxed facade objects passed as raw pointers, paired with
//! explicit create/destroy exports. Images returned by
//! [`lif_decoder_get_image`] are owned by their decoder and freed with it;
//! images from [`lif_create_image`] / [`lif_create_image_hdr`] are
//! caller-owned and must go through [`lif_destroy_image`].
//!
//! A handle must not be used from two threads at once; independent handles
//! are independent. Passing a pointer that is not a live handle of the
//! expected type is undefined behavior, as in any C API.

use std::ffi::{c_char, CStr};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::ptr;

use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::frame::{Frame, FrameHandle};
use crate::io;

/// Opaque decoder handle.
pub type LifDecoder = Decoder;
/// Opaque encoder handle.
pub type LifEncoder = Encoder;
/// Opaque image handle.
pub type LifImage = FrameHandle;

/// Decode progress callback: `(quality 0-100, bytes_read) -> reserved`.
///
/// Invoked synchronously during decode; report-only.
pub type LifProgressFn = extern "C" fn(quality: i32, bytes_read: i64) -> u32;

/// Run `f`, converting any panic into `sentinel`.
fn guard<T, F: FnOnce() -> T>(op: &'static str, sentinel: T, f: F) -> T {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            log::error!("{op}: internal failure caught at C boundary");
            sentinel
        }
    }
}

/// Borrow a NUL-terminated path argument, or `None` for null/invalid input.
unsafe fn path_arg<'a>(raw: *const c_char) -> Option<&'a Path> {
    if raw.is_null() {
        return None;
    }
    let cstr = unsafe { CStr::from_ptr(raw) };
    cstr.to_str().ok().map(Path::new)
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Create a decoder handle, or null on failure.
#[no_mangle]
pub extern "C" fn lif_create_decoder() -> *mut LifDecoder {
    guard("lif_create_decoder", ptr::null_mut(), || {
        Box::into_raw(Box::new(Decoder::new()))
    })
}

/// Destroy a decoder handle and every image it issued. Null is a no-op.
#[no_mangle]
pub extern "C" fn lif_destroy_decoder(decoder: *mut LifDecoder) {
    guard("lif_destroy_decoder", (), || {
        if !decoder.is_null() {
            drop(unsafe { Box::from_raw(decoder) });
        }
    });
}

/// Set decode quality (0-100); affects subsequent decodes only.
#[no_mangle]
pub extern "C" fn lif_decoder_set_quality(decoder: *mut LifDecoder, quality: i32) {
    guard("lif_decoder_set_quality", (), || {
        if let Some(dec) = unsafe { decoder.as_mut() } {
            dec.set_quality(quality);
        }
    });
}

/// Set the power-of-two downscale divisor; affects subsequent decodes only.
#[no_mangle]
pub extern "C" fn lif_decoder_set_scale(decoder: *mut LifDecoder, scale: u32) {
    guard("lif_decoder_set_scale", (), || {
        if let Some(dec) = unsafe { decoder.as_mut() } {
            dec.set_scale(scale);
        }
    });
}

/// Install or clear (null) the progress callback.
#[no_mangle]
pub extern "C" fn lif_decoder_set_callback(
    decoder: *mut LifDecoder,
    callback: Option<LifProgressFn>,
) {
    guard("lif_decoder_set_callback", (), || {
        if let Some(dec) = unsafe { decoder.as_mut() } {
            dec.set_callback(callback.map(|cb| {
                Box::new(move |quality: i32, bytes_read: i64| cb(quality, bytes_read))
                    as Box<crate::codec::ProgressFn>
            }));
        }
    });
}

/// Decode a container from a file. Returns nonzero on success.
#[no_mangle]
pub extern "C" fn lif_decoder_decode_file(
    decoder: *mut LifDecoder,
    filename: *const c_char,
) -> i32 {
    guard("lif_decoder_decode_file", 0, || {
        let Some(dec) = (unsafe { decoder.as_mut() }) else {
            return 0;
        };
        let Some(path) = (unsafe { path_arg(filename) }) else {
            return 0;
        };
        i32::from(dec.decode_file(path))
    })
}

/// Decode a container from memory. Returns nonzero on success.
#[no_mangle]
pub extern "C" fn lif_decoder_decode_memory(
    decoder: *mut LifDecoder,
    buffer: *const u8,
    buffer_size_bytes: usize,
) -> i32 {
    guard("lif_decoder_decode_memory", 0, || {
        let Some(dec) = (unsafe { decoder.as_mut() }) else {
            return 0;
        };
        if buffer.is_null() {
            return 0;
        }
        let data = unsafe { std::slice::from_raw_parts(buffer, buffer_size_bytes) };
        i32::from(dec.decode_memory(data))
    })
}

/// Number of frames from the last successful decode.
#[no_mangle]
pub extern "C" fn lif_decoder_num_images(decoder: *mut LifDecoder) -> usize {
    guard("lif_decoder_num_images", 0, || {
        match unsafe { decoder.as_ref() } {
            Some(dec) => dec.frame_count(),
            None => 0,
        }
    })
}

/// Fetch the image at `index`, or null if out of range.
///
/// The returned image is owned by the decoder: do not pass it to
/// [`lif_destroy_image`], and do not use it after the decoder is destroyed
/// or has decoded again.
#[no_mangle]
pub extern "C" fn lif_decoder_get_image(decoder: *mut LifDecoder, index: usize) -> *mut LifImage {
    guard("lif_decoder_get_image", ptr::null_mut(), || {
        let Some(dec) = (unsafe { decoder.as_mut() }) else {
            return ptr::null_mut();
        };
        match dec.get_frame(index) {
            Some(handle) => handle as *const LifImage as *mut LifImage,
            None => ptr::null_mut(),
        }
    })
}

// ---------------------------------------------------------------------------
// Encoder
// ---------------------------------------------------------------------------

/// Create an encoder handle, or null on failure.
#[no_mangle]
pub extern "C" fn lif_create_encoder() -> *mut LifEncoder {
    guard("lif_create_encoder", ptr::null_mut(), || {
        Box::into_raw(Box::new(Encoder::new()))
    })
}

/// Destroy an encoder handle. Added images stay caller-owned. Null is a no-op.
#[no_mangle]
pub extern "C" fn lif_destroy_encoder(encoder: *mut LifEncoder) {
    guard("lif_destroy_encoder", (), || {
        if !encoder.is_null() {
            drop(unsafe { Box::from_raw(encoder) });
        }
    });
}

/// Set interlaced pixel ordering (nonzero = on).
#[no_mangle]
pub extern "C" fn lif_encoder_set_interlaced(encoder: *mut LifEncoder, interlaced: u32) {
    guard("lif_encoder_set_interlaced", (), || {
        if let Some(enc) = unsafe { encoder.as_mut() } {
            enc.set_interlaced(interlaced);
        }
    });
}

/// Set the number of model-learning passes.
#[no_mangle]
pub extern "C" fn lif_encoder_set_learn_repeat(encoder: *mut LifEncoder, learn_repeats: u32) {
    guard("lif_encoder_set_learn_repeat", (), || {
        if let Some(enc) = unsafe { encoder.as_mut() } {
            enc.set_learn_repeat(learn_repeats);
        }
    });
}

/// Set automatic color-bucket detection (nonzero = on).
#[no_mangle]
pub extern "C" fn lif_encoder_set_auto_color_buckets(encoder: *mut LifEncoder, acb: u32) {
    guard("lif_encoder_set_auto_color_buckets", (), || {
        if let Some(enc) = unsafe { encoder.as_mut() } {
            enc.set_auto_color_buckets(acb);
        }
    });
}

/// Set the maximum palette size.
#[no_mangle]
pub extern "C" fn lif_encoder_set_palette_size(encoder: *mut LifEncoder, palette_size: i32) {
    guard("lif_encoder_set_palette_size", (), || {
        if let Some(enc) = unsafe { encoder.as_mut() } {
            enc.set_palette_size(palette_size);
        }
    });
}

/// Set the frame lookback depth.
#[no_mangle]
pub extern "C" fn lif_encoder_set_lookback(encoder: *mut LifEncoder, lookback: i32) {
    guard("lif_encoder_set_lookback", (), || {
        if let Some(enc) = unsafe { encoder.as_mut() } {
            enc.set_lookback(lookback);
        }
    });
}

/// Set the model-split count divisor.
#[no_mangle]
pub extern "C" fn lif_encoder_set_divisor(encoder: *mut LifEncoder, divisor: i32) {
    guard("lif_encoder_set_divisor", (), || {
        if let Some(enc) = unsafe { encoder.as_mut() } {
            enc.set_divisor(divisor);
        }
    });
}

/// Set the minimum model subtree size.
#[no_mangle]
pub extern "C" fn lif_encoder_set_min_size(encoder: *mut LifEncoder, min_size: i32) {
    guard("lif_encoder_set_min_size", (), || {
        if let Some(enc) = unsafe { encoder.as_mut() } {
            enc.set_min_size(min_size);
        }
    });
}

/// Set the model split threshold.
#[no_mangle]
pub extern "C" fn lif_encoder_set_split_threshold(encoder: *mut LifEncoder, split_threshold: i32) {
    guard("lif_encoder_set_split_threshold", (), || {
        if let Some(enc) = unsafe { encoder.as_mut() } {
            enc.set_split_threshold(split_threshold);
        }
    });
}

/// Disable alpha-zero special-casing. One-way; there is no re-enable.
#[no_mangle]
pub extern "C" fn lif_encoder_set_alpha_zero_lossless(encoder: *mut LifEncoder) {
    guard("lif_encoder_set_alpha_zero_lossless", (), || {
        if let Some(enc) = unsafe { encoder.as_mut() } {
            enc.set_alpha_zero_lossless();
        }
    });
}

/// Add an image to the encoder, in output order.
///
/// The encoder does not take ownership; the image must stay alive until the
/// last encode call. If alpha-zero special-casing is disabled on the
/// encoder, the image's own flag is flipped off too.
#[no_mangle]
pub extern "C" fn lif_encoder_add_image(encoder: *mut LifEncoder, image: *mut LifImage) {
    guard("lif_encoder_add_image", (), || {
        let (Some(enc), Some(img)) = (unsafe { encoder.as_mut() }, unsafe { image.as_ref() })
        else {
            return;
        };
        enc.add_frame(img);
    });
}

/// Encode all added images to a file. Returns nonzero on success.
#[no_mangle]
pub extern "C" fn lif_encoder_encode_file(
    encoder: *mut LifEncoder,
    filename: *const c_char,
) -> i32 {
    guard("lif_encoder_encode_file", 0, || {
        let Some(enc) = (unsafe { encoder.as_ref() }) else {
            return 0;
        };
        let Some(path) = (unsafe { path_arg(filename) }) else {
            return 0;
        };
        i32::from(enc.encode_file(path))
    })
}

/// Encode all added images to a fresh memory buffer.
///
/// On success returns nonzero and stores the buffer pointer and length in
/// the out-parameters; ownership transfers to the caller, who must release
/// it with [`lif_free_memory`].
#[no_mangle]
pub extern "C" fn lif_encoder_encode_memory(
    encoder: *mut LifEncoder,
    buffer: *mut *mut u8,
    buffer_size_bytes: *mut usize,
) -> i32 {
    guard("lif_encoder_encode_memory", 0, || {
        let Some(enc) = (unsafe { encoder.as_ref() }) else {
            return 0;
        };
        if buffer.is_null() || buffer_size_bytes.is_null() {
            return 0;
        }
        match enc.encode_memory() {
            Some(bytes) => {
                let (ptr, len) = io::detach_bytes(bytes);
                unsafe {
                    *buffer = ptr;
                    *buffer_size_bytes = len;
                }
                1
            }
            None => 0,
        }
    })
}

/// Free a buffer produced by [`lif_encoder_encode_memory`]. Null is a no-op.
#[no_mangle]
pub extern "C" fn lif_free_memory(buffer: *mut u8, buffer_size_bytes: usize) {
    guard("lif_free_memory", (), || unsafe {
        io::reclaim_bytes(buffer, buffer_size_bytes);
    });
}

// ---------------------------------------------------------------------------
// Image
// ---------------------------------------------------------------------------

/// Create a caller-owned 8-bit RGBA image, zero-filled, or null on failure.
#[no_mangle]
pub extern "C" fn lif_create_image(width: u32, height: u32) -> *mut LifImage {
    guard("lif_create_image", ptr::null_mut(), || {
        Box::into_raw(Box::new(FrameHandle::new(Frame::rgba8(width, height))))
    })
}

/// Create a caller-owned 16-bit RGBA (HDR) image, or null on failure.
#[no_mangle]
pub extern "C" fn lif_create_image_hdr(width: u32, height: u32) -> *mut LifImage {
    guard("lif_create_image_hdr", ptr::null_mut(), || {
        Box::into_raw(Box::new(FrameHandle::new(Frame::rgba16(width, height))))
    })
}

/// Destroy a caller-owned image. Never pass decoder-owned images. Null is a
/// no-op.
#[no_mangle]
pub extern "C" fn lif_destroy_image(image: *mut LifImage) {
    guard("lif_destroy_image", (), || {
        if !image.is_null() {
            drop(unsafe { Box::from_raw(image) });
        }
    });
}

/// Image width in pixels, or 0 for a null handle.
#[no_mangle]
pub extern "C" fn lif_image_get_width(image: *mut LifImage) -> u32 {
    guard("lif_image_get_width", 0, || {
        unsafe { image.as_ref() }.map_or(0, FrameHandle::width)
    })
}

/// Image height in pixels, or 0 for a null handle.
#[no_mangle]
pub extern "C" fn lif_image_get_height(image: *mut LifImage) -> u32 {
    guard("lif_image_get_height", 0, || {
        unsafe { image.as_ref() }.map_or(0, FrameHandle::height)
    })
}

/// Channel count (always 4), or 0 for a null handle.
#[no_mangle]
pub extern "C" fn lif_image_get_nb_channels(image: *mut LifImage) -> u8 {
    guard("lif_image_get_nb_channels", 0, || {
        unsafe { image.as_ref() }.map_or(0, FrameHandle::channels)
    })
}

/// Bits per channel (8 or 16), or 0 for a null handle.
#[no_mangle]
pub extern "C" fn lif_image_get_depth(image: *mut LifImage) -> u8 {
    guard("lif_image_get_depth", 0, || {
        unsafe { image.as_ref() }.map_or(0, FrameHandle::depth)
    })
}

/// Frame delay in milliseconds, or 0 for a null handle.
#[no_mangle]
pub extern "C" fn lif_image_get_frame_delay(image: *mut LifImage) -> u32 {
    guard("lif_image_get_frame_delay", 0, || {
        unsafe { image.as_ref() }.map_or(0, FrameHandle::delay_ms)
    })
}

/// Set the frame delay in milliseconds.
#[no_mangle]
pub extern "C" fn lif_image_set_frame_delay(image: *mut LifImage, delay_ms: u32) {
    guard("lif_image_set_frame_delay", (), || {
        if let Some(img) = unsafe { image.as_ref() } {
            img.set_delay_ms(delay_ms);
        }
    });
}

/// Copy one row out as packed RGBA8. Returns nonzero on success.
///
/// `buffer` must hold at least `width * 4` bytes.
#[no_mangle]
pub extern "C" fn lif_image_read_row_rgba8(
    image: *mut LifImage,
    row: u32,
    buffer: *mut u8,
    buffer_size_bytes: usize,
) -> i32 {
    guard("lif_image_read_row_rgba8", 0, || {
        let Some(img) = (unsafe { image.as_ref() }) else {
            return 0;
        };
        if buffer.is_null() {
            return 0;
        }
        let out = unsafe { std::slice::from_raw_parts_mut(buffer, buffer_size_bytes) };
        i32::from(img.read_row_rgba8(row, out).is_ok())
    })
}

/// Overwrite one row from packed RGBA8. Returns nonzero on success.
///
/// `buffer` must hold at least `width * 4` bytes.
#[no_mangle]
pub extern "C" fn lif_image_write_row_rgba8(
    image: *mut LifImage,
    row: u32,
    buffer: *const u8,
    buffer_size_bytes: usize,
) -> i32 {
    guard("lif_image_write_row_rgba8", 0, || {
        let Some(img) = (unsafe { image.as_ref() }) else {
            return 0;
        };
        if buffer.is_null() {
            return 0;
        }
        let data = unsafe { std::slice::from_raw_parts(buffer, buffer_size_bytes) };
        i32::from(img.write_row_rgba8(row, data).is_ok())
    })
}
