//! Error types for facade and engine operations.
//!
//! Internally everything is `Result`-based; the facades and the C boundary
//! convert every error into the documented sentinel (`false` / null / 0)
//! before it becomes caller-visible.

use thiserror::Error;

/// Errors produced by the facades, the I/O adapters, and the built-in engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Underlying I/O failure (file open, read, write).
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Input does not start with the LIF container magic.
    #[error("not a lif container (bad magic)")]
    BadMagic,

    /// Container version this build does not understand.
    #[error("unsupported container version {0}")]
    UnsupportedVersion(u8),

    /// Frame header describes dimensions beyond the decode limit.
    #[error("image dimensions too large: {width}x{height}")]
    Oversized { width: u32, height: u32 },

    /// Malformed field inside an otherwise well-formed container.
    #[error("corrupt container: {0}")]
    Corrupt(&'static str),

    /// Caller passed an argument the operation cannot accept.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Encode was asked to run with no frames added.
    #[error("no frames to encode")]
    NoFrames,
}

/// Crate-wide result alias.
pub type Result<T, E = Error> = core::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(Error::BadMagic.to_string(), "not a lif container (bad magic)");
        assert_eq!(
            Error::Oversized {
                width: 70000,
                height: 2
            }
            .to_string(),
            "image dimensions too large: 70000x2"
        );
        assert_eq!(
            Error::UnsupportedVersion(9).to_string(),
            "unsupported container version 9"
        );
    }

    #[test]
    fn from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("gone"));
    }
}
