//! Handle-based facade and C API for the LIF lossless image codec.
//!
//! This crate is the object-lifecycle and boundary-safety layer around a
//! codec engine:
//!
//! - [`Decoder`] / [`Encoder`] — stateful facades with lazy frame
//!   materialization and clone-before-encode semantics
//! - [`Frame`] / [`FrameHandle`] — the pixel-buffer resource and its shared,
//!   caller-visible wrapper
//! - [`Engine`] — the black-box codec seam; [`StoreEngine`] is the built-in
//!   raw-container engine
//! - [`ffi`] — the C ABI surface: opaque handles, sentinel returns, and an
//!   unconditional no-panic-crosses-the-boundary guarantee
//! - [`io`] — file and memory adapters behind the uniform byte-stream
//!   capability
//!
//! The engine performs the actual pixel and entropy work; this crate only
//! guarantees exactly-once buffer moves, defensive copies, uniform resource
//! release, and a crash-proof exported surface.
//!
//! Handles are single-threaded by design: each decoder or encoder is an
//! independently owned unit with no shared state between handles, and no
//! internal locking.

pub mod codec;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod ffi;
pub mod frame;
pub mod io;

pub use codec::{
    DecodeParams, EncodeParams, Encoding, Engine, ProgressFn, StoreEngine, COUNT_DIVISOR,
    FILE_TRANSFORMS, MEMORY_TRANSFORMS, MIN_SUBTREE_SIZE, SPLIT_THRESHOLD,
};
pub use decoder::Decoder;
pub use encoder::{Encoder, EncoderOptions};
pub use error::{Error, Result};
pub use frame::{Frame, FrameHandle, PixelBuf, DEFAULT_FRAME_DELAY_MS};

// Re-exports for engine implementors.
pub use imgref::{Img, ImgRef, ImgVec};
pub use rgb::Rgba;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging for embedders that have no logger of their own.
///
/// Installs `env_logger` honoring `RUST_LOG`, defaulting to `warn`. Safe to
/// call more than once; later calls are no-ops.
pub fn init() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .try_init();
    log::debug!("lif {VERSION} initialized");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn init_is_idempotent() {
        init();
        init();
    }
}
