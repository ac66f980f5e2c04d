use std::io::Write;

use sha2::{Digest, Sha256};

/// Computes the lowercase hex SHA-256 digest of a byte slice.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex_digest(hasher)
}

/// Compares a digest against an expected value, case-insensitively.
pub fn verify_digest(actual: &str, expected: &str) -> bool {
    actual.eq_ignore_ascii_case(expected)
}

/// A [`Write`] adapter that feeds every written byte into a SHA-256 hasher
/// while passing it through to the inner writer.
///
/// This allows producing a compressed artifact and its content hash in a
/// single pass over the data.
pub struct HashingWriter<W: Write> {
    inner: W,
    hasher: Sha256,
}

impl<W: Write> HashingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
        }
    }

    /// Consumes the writer, returning the inner writer and the lowercase
    /// hex digest of everything written so far.
    pub fn finish(self) -> (W, String) {
        (self.inner, hex_digest(self.hasher))
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.hasher.update(&buf[..written]);
        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

fn hex_digest(hasher: Sha256) -> String {
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}
