//! I/O adapters behind the uniform `std::io::Read` / `Write` capability.
//!
//! Two variants feed the engine: file-backed ([`FileSource`] / [`FileSink`])
//! and memory-backed ([`BlobReader`] / [`BlobSink`]). The facades own an
//! adapter only for the duration of one decode/encode call.
//!
//! The memory sink can [`release`](BlobSink::release) its storage as a raw
//! pointer + length pair for the C boundary; after release the sink no longer
//! owns or frees it. [`reclaim_bytes`] returns ownership for deallocation.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::Result;

/// Buffered reader over an opened file.
///
/// The underlying file is closed exactly once when the adapter drops, on
/// every exit path.
pub struct FileSource {
    inner: BufReader<File>,
}

impl FileSource {
    /// Open `path` for binary read.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            inner: BufReader::new(File::open(path)?),
        })
    }
}

impl Read for FileSource {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

/// Buffered writer over a created file.
///
/// Call [`finish`](FileSink::finish) to flush; dropping without it still
/// closes the file but may lose buffered bytes on flush failure.
pub struct FileSink {
    inner: BufWriter<File>,
}

impl FileSink {
    /// Create (or truncate) `path` for binary write.
    pub fn create(path: &Path) -> Result<Self> {
        Ok(Self {
            inner: BufWriter::new(File::create(path)?),
        })
    }

    /// Flush buffered bytes and close the file.
    pub fn finish(mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}

impl Write for FileSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Reader over a caller-supplied byte range.
pub struct BlobReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BlobReader<'a> {
    /// Wrap an in-memory byte range.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl Read for BlobReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let remaining = &self.data[self.pos..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(n)
    }
}

/// Growable in-memory byte sink.
#[derive(Default)]
pub struct BlobSink {
    buf: Vec<u8>,
}

impl BlobSink {
    /// An empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Consume the sink and return the accumulated bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Detach the storage as a raw pointer + length pair.
    ///
    /// Ownership transfers to the caller, who must return it through
    /// [`reclaim_bytes`] to deallocate. The sink no longer owns or frees
    /// the storage.
    pub fn release(self) -> (*mut u8, usize) {
        detach_bytes(self.buf)
    }
}

impl Write for BlobSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Hand a byte vector to a foreign caller as a raw pointer + length pair.
pub fn detach_bytes(bytes: Vec<u8>) -> (*mut u8, usize) {
    let boxed = bytes.into_boxed_slice();
    let len = boxed.len();
    (Box::into_raw(boxed) as *mut u8, len)
}

/// Reclaim and deallocate a buffer produced by [`detach_bytes`].
///
/// # Safety
///
/// `ptr` and `len` must be exactly the pair returned by a single prior
/// [`detach_bytes`] call, not yet reclaimed. `ptr` may be null, in which
/// case this is a no-op.
pub unsafe fn reclaim_bytes(ptr: *mut u8, len: usize) {
    if ptr.is_null() {
        return;
    }
    drop(unsafe { Box::from_raw(core::ptr::slice_from_raw_parts_mut(ptr, len)) });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_reader_reads_in_chunks() {
        let data = [1u8, 2, 3, 4, 5];
        let mut reader = BlobReader::new(&data);
        let mut buf = [0u8; 3];
        assert_eq!(reader.read(&mut buf).unwrap(), 3);
        assert_eq!(buf, [1, 2, 3]);
        assert_eq!(reader.position(), 3);
        assert_eq!(reader.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[4, 5]);
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn blob_sink_accumulates() {
        let mut sink = BlobSink::new();
        assert!(sink.is_empty());
        sink.write_all(&[1, 2]).unwrap();
        sink.write_all(&[3]).unwrap();
        assert_eq!(sink.len(), 3);
        assert_eq!(sink.into_bytes(), vec![1, 2, 3]);
    }

    #[test]
    fn release_and_reclaim() {
        let mut sink = BlobSink::new();
        sink.write_all(b"abcdef").unwrap();
        let (ptr, len) = sink.release();
        assert!(!ptr.is_null());
        assert_eq!(len, 6);
        let copied = unsafe { core::slice::from_raw_parts(ptr, len) }.to_vec();
        assert_eq!(copied, b"abcdef");
        unsafe { reclaim_bytes(ptr, len) };
    }

    #[test]
    fn reclaim_null_is_noop() {
        unsafe { reclaim_bytes(core::ptr::null_mut(), 0) };
    }

    #[test]
    fn file_sink_then_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        let mut sink = FileSink::create(&path).unwrap();
        sink.write_all(b"roundtrip").unwrap();
        sink.finish().unwrap();

        let mut source = FileSource::open(&path).unwrap();
        let mut back = Vec::new();
        source.read_to_end(&mut back).unwrap();
        assert_eq!(back, b"roundtrip");
    }

    #[test]
    fn file_source_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FileSource::open(&dir.path().join("absent.lif")).is_err());
    }
}
