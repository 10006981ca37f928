//! Fan-out writer that hashes every byte it forwards.

use super::digest::Sha256Digest;
use sha2::{Digest, Sha256};
use std::io::{self, Write};

/// Forwards writes to an inner sink while feeding the same bytes to SHA-256.
///
/// Only bytes the sink actually accepted are hashed, so the digest always
/// describes what was written.
///
/// # Examples
///
/// ```
/// use release_cutter::archive::digest::Sha256Digest;
/// use release_cutter::archive::hashing::HashingWriter;
/// use std::io::Write;
///
/// let mut writer = HashingWriter::new(Vec::new());
/// writer.write_all(b"abc")?;
/// let (bytes, digest, written) = writer.finish();
/// assert_eq!(bytes, b"abc");
/// assert_eq!(written, 3);
/// assert_eq!(digest, Sha256Digest::of(b"abc"));
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug)]
pub struct HashingWriter<W> {
    inner: W,
    hasher: Sha256,
    written: u64,
}

impl<W: Write> HashingWriter<W> {
    /// Wrap `inner`.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            written: 0,
        }
    }

    /// Return the sink, the digest of everything written, and the byte count.
    pub fn finish(self) -> (W, Sha256Digest, u64) {
        (
            self.inner,
            Sha256Digest::from_hasher(self.hasher),
            self.written,
        )
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let accepted = self.inner.write(buf)?;
        let hashed = buf.get(..accepted).unwrap_or(buf);
        self.hasher.update(hashed);
        self.written += hashed.len() as u64;
        Ok(accepted)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
