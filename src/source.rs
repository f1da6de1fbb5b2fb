//! Byte sources — the single capability the parser reads through.
//!
//! A [`ByteSource`] is a strictly forward, single-pass cursor over raw bytes.
//! `consume(n)` returns *up to* `n` bytes; a short (possibly empty) result
//! signals end of data and is never an error by itself.  Two implementations
//! exist: [`FileSource`] over an open file handle, and [`BufferSource`] over
//! a borrowed in-memory slice (used for the body bytes of an embedded
//! container block).

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

pub trait ByteSource {
    /// Read up to `n` bytes, advancing the cursor.  Returns fewer than `n`
    /// (possibly zero) bytes at end of data.
    fn consume(&mut self, n: usize) -> io::Result<Vec<u8>>;

    /// Total byte length of the underlying data, independent of the cursor.
    fn total_len(&self) -> u64;
}

/// File-backed source.  Owns the open handle; the file is closed when the
/// source is dropped, on success and error paths alike.
#[derive(Debug)]
pub struct FileSource {
    file: File,
    len: u64,
}

impl FileSource {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self { file, len })
    }
}

impl ByteSource for FileSource {
    fn consume(&mut self, n: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        let mut filled = 0;
        while filled < n {
            match self.file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(k) => filled += k,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        buf.truncate(filled);
        Ok(buf)
    }

    fn total_len(&self) -> u64 {
        self.len
    }
}

/// Buffer-backed source over a borrowed slice.  Owns no external resource;
/// the slice typically belongs to a parent block's body.
#[derive(Debug)]
pub struct BufferSource<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> BufferSource<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }
}

impl ByteSource for BufferSource<'_> {
    fn consume(&mut self, n: usize) -> io::Result<Vec<u8>> {
        let end = self.buf.len().min(self.pos.saturating_add(n));
        let out = self.buf[self.pos..end].to_vec();
        self.pos = end;
        Ok(out)
    }

    fn total_len(&self) -> u64 {
        self.buf.len() as u64
    }
}
