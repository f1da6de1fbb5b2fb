//! Container parser — CRC-protected block framing over a [`ByteSource`].
//!
//! # Protocol
//!
//! [`Container::open`] validates the 8-byte identification and the 16-byte
//! top-level header, then the caller iterates blocks:
//!
//! ```text
//! open → next → read_body (one call, or chunked) → next → … → next == None
//! ```
//!
//! `next()` refuses to advance while the previous block's body has unread
//! bytes — draining is an explicit, checked precondition, not an implicit
//! assumption.  The body CRC is folded incrementally as chunks are read, so
//! large bodies never need to be buffered whole; verification happens the
//! moment the last body byte is consumed, followed by the 4-byte alignment
//! padding.
//!
//! # State
//!
//! All per-block state lives in one [`Block`] value plus a bytes-remaining
//! counter and a running [`Hasher`]; nothing is shared across blocks except
//! the monotonically assigned index.

use crc32fast::Hasher;
use std::fmt;
use std::io;

use crate::block::{decode_extension, BlockHeader, ContentType, Extension, BLOCK_HEADER_LEN};
use crate::error::TiifError;
use crate::header::{ContainerHeader, CONTAINER_HEADER_LEN, IDENTIFICATION, IDENTIFICATION_LEN};
use crate::source::ByteSource;

// ── Block ─────────────────────────────────────────────────────────────────────

/// Parsed metadata of the block most recently returned by [`Container::next`].
#[derive(Debug, Clone)]
pub struct Block {
    /// 0-based position within the owning container, in read order.
    pub index: u32,
    pub content_type: ContentType,
    /// Name field with trailing null padding stripped.
    pub name: String,
    pub header_len: u16,
    pub body_len: u32,
    pub header_crc: u32,
    pub body_crc: u32,
    pub extension: Option<Extension>,
    /// Product names from the release-header body; present only after
    /// [`Container::unpack_release_body`] has run for this block.
    pub products: Option<Vec<String>>,
}

struct BlockState {
    block: Block,
    remaining: u32,
    hasher: Hasher,
    verified: bool,
}

// ── Container ─────────────────────────────────────────────────────────────────

/// One parsed TIIF instance over a forward-only byte source.
///
/// Not safe for concurrent use; one logical caller drives `next`/`read_body`
/// to completion.  Embedded containers are separate, transient instances over
/// a [`BufferSource`](crate::source::BufferSource) of the parent block body.
pub struct Container<S: ByteSource> {
    source: S,
    header: ContainerHeader,
    current: Option<BlockState>,
    next_index: u32,
}

// Manual impl: the source and the running hasher carry no useful state to
// print, and `S` need not be `Debug` itself.
impl<S: ByteSource> fmt::Debug for Container<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("header", &self.header)
            .field("block", &self.block())
            .field("next_index", &self.next_index)
            .finish_non_exhaustive()
    }
}

impl<S: ByteSource> Container<S> {
    /// Validate the identification and top-level header of `source`.
    ///
    /// Fails with [`TiifError::Format`] on a short or unrecognized
    /// identification, [`TiifError::HeaderCrc`] when the stored CRC32 does
    /// not cover the 12 header bytes after it, and
    /// [`TiifError::LengthMismatch`] when `8 + 16 + body_len` disagrees with
    /// the source's total length.
    pub fn open(mut source: S) -> Result<Self, TiifError> {
        let buf = source.consume(IDENTIFICATION_LEN + CONTAINER_HEADER_LEN)?;
        if buf.len() < IDENTIFICATION_LEN + CONTAINER_HEADER_LEN
            || &buf[..IDENTIFICATION_LEN] != IDENTIFICATION
        {
            return Err(TiifError::Format);
        }
        let header = ContainerHeader::read(&buf[IDENTIFICATION_LEN..])?;

        let mut hasher = Hasher::new();
        hasher.update(&buf[IDENTIFICATION_LEN + 4..]);
        let computed = hasher.finalize();
        if computed != header.header_crc {
            return Err(TiifError::HeaderCrc {
                at: "container header".to_owned(),
                stored: header.header_crc,
                computed,
            });
        }

        let declared = (IDENTIFICATION_LEN + CONTAINER_HEADER_LEN) as u64
            + u64::from(header.body_len);
        let actual = source.total_len();
        if declared != actual {
            return Err(TiifError::LengthMismatch { declared, actual });
        }

        Ok(Self {
            source,
            header,
            current: None,
            next_index: 0,
        })
    }

    pub fn header(&self) -> &ContainerHeader {
        &self.header
    }

    /// Metadata of the current block, if `next()` has produced one.
    pub fn block(&self) -> Option<&Block> {
        self.current.as_ref().map(|state| &state.block)
    }

    /// Advance to the next content block.
    ///
    /// Returns `Ok(None)` once the body is exhausted (zero header bytes
    /// read); that is the terminal signal, not an error.  Requires the
    /// previous block's body to be fully drained.
    pub fn next(&mut self) -> Result<Option<ContentType>, TiifError> {
        if let Some(state) = &self.current {
            if state.remaining != 0 {
                return Err(TiifError::ProtocolViolation("content still present"));
            }
        }

        let buf = self.source.consume(BLOCK_HEADER_LEN)?;
        if buf.is_empty() {
            self.current = None;
            return Ok(None);
        }
        if buf.len() < BLOCK_HEADER_LEN {
            return Err(TiifError::TruncatedHeader {
                wanted: BLOCK_HEADER_LEN,
                got: buf.len(),
            });
        }

        let fixed = BlockHeader::read(&buf[..])?;
        if (fixed.header_len as usize) < BLOCK_HEADER_LEN {
            return Err(TiifError::TruncatedHeader {
                wanted: BLOCK_HEADER_LEN,
                got: fixed.header_len as usize,
            });
        }
        let ext_len = fixed.header_len as usize - BLOCK_HEADER_LEN;
        let ext = self.source.consume(ext_len)?;
        if ext.len() < ext_len {
            return Err(TiifError::TruncatedHeader {
                wanted: fixed.header_len as usize,
                got: BLOCK_HEADER_LEN + ext.len(),
            });
        }

        // The stored CRC covers everything after itself, extension included.
        let mut hasher = Hasher::new();
        hasher.update(&buf[4..]);
        hasher.update(&ext);
        let computed = hasher.finalize();
        if computed != fixed.header_crc {
            return Err(TiifError::HeaderCrc {
                at: format!("block {} header", self.next_index),
                stored: fixed.header_crc,
                computed,
            });
        }

        let content_type = ContentType::from_code(fixed.type_code);
        let extension = decode_extension(content_type, &ext)?;

        let index = self.next_index;
        self.next_index += 1;
        self.current = Some(BlockState {
            block: Block {
                index,
                content_type,
                name: fixed.name,
                header_len: fixed.header_len,
                body_len: fixed.body_len,
                header_crc: fixed.header_crc,
                body_crc: fixed.body_crc,
                extension,
                products: None,
            },
            remaining: fixed.body_len,
            hasher: Hasher::new(),
            verified: false,
        });
        Ok(Some(content_type))
    }

    /// Read the entire remaining body of the current block.
    ///
    /// The running CRC32 is verified against the declared `body_crc` once the
    /// body is drained, then the alignment padding is consumed.  A source
    /// that runs out before `body_len` bytes is an unexpected-EOF I/O error.
    pub fn read_body(&mut self) -> Result<Vec<u8>, TiifError> {
        let remaining = match &self.current {
            Some(state) => state.remaining as usize,
            None => return Err(TiifError::ProtocolViolation("no content block pending")),
        };
        let buf = self.read_chunk_inner(remaining)?;
        if buf.len() < remaining {
            return Err(TiifError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("block body ended after {} of {} bytes", buf.len(), remaining),
            )));
        }
        Ok(buf)
    }

    /// Read up to `max_len` body bytes, for streaming large bodies without
    /// buffering them whole.  Returns an empty vector once the body is
    /// drained.  CRC verification and padding consumption happen on the call
    /// that reads the final body byte.
    pub fn read_body_chunk(&mut self, max_len: usize) -> Result<Vec<u8>, TiifError> {
        self.read_chunk_inner(max_len)
    }

    fn read_chunk_inner(&mut self, max_len: usize) -> Result<Vec<u8>, TiifError> {
        let state = match &mut self.current {
            Some(state) => state,
            None => return Err(TiifError::ProtocolViolation("no content block pending")),
        };
        let want = max_len.min(state.remaining as usize);
        let buf = self.source.consume(want)?;
        state.hasher.update(&buf);
        state.remaining -= buf.len() as u32;

        if state.remaining == 0 && !state.verified {
            let computed = state.hasher.clone().finalize();
            if computed != state.block.body_crc {
                return Err(TiifError::BodyCrc {
                    index: state.block.index,
                    stored: state.block.body_crc,
                    computed,
                });
            }
            state.verified = true;
            // Bodies are padded to the next 4-byte boundary; the padding is
            // consumed but never checksummed.
            let pad = (4 - state.block.body_len as usize % 4) % 4;
            if pad != 0 {
                self.source.consume(pad)?;
            }
        }
        Ok(buf)
    }

    /// Parse the release-header body text and attach the `products` list to
    /// the current block.
    ///
    /// Valid only while the current block is a [`ContentType::ReleaseHeader`].
    /// Non-empty lines must be `key=value`; only the `products` key is
    /// interpreted (comma-separated, order preserved).  Unrecognized keys are
    /// skipped silently for forward compatibility.
    pub fn unpack_release_body(&mut self, body: &[u8]) -> Result<(), TiifError> {
        let state = match &mut self.current {
            Some(state) => state,
            None => return Err(TiifError::ProtocolViolation("no content block pending")),
        };
        if state.block.content_type != ContentType::ReleaseHeader {
            return Err(TiifError::TypeMismatch {
                expected: ContentType::ReleaseHeader.label(),
                found: state.block.content_type.label(),
            });
        }

        let text = String::from_utf8_lossy(body);
        let mut products = Vec::new();
        for line in text.trim_matches('\0').split('\n') {
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(TiifError::MalformedPayload {
                    line: line.to_owned(),
                });
            };
            if key == "products" {
                products = value.split(',').map(str::to_owned).collect();
            }
        }
        state.block.products = Some(products);
        Ok(())
    }
}
