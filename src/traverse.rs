//! Recursive traversal — drive a container to exhaustion, descending into
//! embedded containers.
//!
//! The walk reads every block body in full, hands each block to a visitor
//! callback, and when a block's type is [`ContentType::EmbeddedContainer`]
//! opens a fresh [`Container`] over a [`BufferSource`] of that body and
//! recurses.  Release-header metadata is collected into an explicit
//! [`TraverseReport`] returned to the caller; nothing accumulates in global
//! state, so results from multiple top-level files merge wherever the caller
//! wants them.
//!
//! Nesting is capped at [`MAX_NESTING_DEPTH`] so a hostile or corrupt file
//! cannot force unbounded recursion.

use serde::Serialize;
use std::io;
use std::path::Path;

use crate::block::{ContentType, Extension};
use crate::container::{Block, Container};
use crate::error::TiifError;
use crate::source::{BufferSource, ByteSource, FileSource};

/// Maximum embedded-container nesting depth accepted by the traversal.
pub const MAX_NESTING_DEPTH: usize = 16;

// ── Results ───────────────────────────────────────────────────────────────────

/// One release header found during a traversal, tagged with the composed
/// path of the container it was found in.
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseRecord {
    pub container: String,
    pub major: u8,
    pub minor: u8,
    pub build_number: u16,
    /// Unix epoch seconds.
    pub date: i64,
    pub build_id: String,
    pub products: Vec<String>,
}

/// Everything a traversal accumulates, in encounter order.
#[derive(Debug, Default)]
pub struct TraverseReport {
    pub releases: Vec<ReleaseRecord>,
}

/// A fully-read block handed to the visitor callback.
pub struct BlockVisit<'a> {
    /// Composed container path: the top-level name, then the name of each
    /// embedded-container block on the way down, joined with `/`.
    pub container: &'a str,
    /// 0 for blocks of the top-level container.
    pub depth: usize,
    pub block: &'a Block,
    pub body: &'a [u8],
}

// ── Entry points ──────────────────────────────────────────────────────────────

/// Traverse a TIIF file on disk.  The file handle is released when the
/// traversal finishes, on success or on the first error.
pub fn traverse_file<P, F>(path: P, visit: &mut F) -> Result<TraverseReport, TiifError>
where
    P: AsRef<Path>,
    F: FnMut(&BlockVisit<'_>) -> io::Result<()>,
{
    let path = path.as_ref();
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let source = FileSource::open(path)?;
    let mut container = Container::open(source)?;
    let mut report = TraverseReport::default();
    walk(&mut container, &name, 0, &mut report, visit)?;
    Ok(report)
}

/// Traverse a TIIF byte image held in memory, labelled `name`.
pub fn traverse_buffer<F>(
    bytes: &[u8],
    name: &str,
    visit: &mut F,
) -> Result<TraverseReport, TiifError>
where
    F: FnMut(&BlockVisit<'_>) -> io::Result<()>,
{
    let mut container = Container::open(BufferSource::new(bytes))?;
    let mut report = TraverseReport::default();
    walk(&mut container, name, 0, &mut report, visit)?;
    Ok(report)
}

// ── Walk ──────────────────────────────────────────────────────────────────────

fn walk<S, F>(
    container: &mut Container<S>,
    container_name: &str,
    depth: usize,
    report: &mut TraverseReport,
    visit: &mut F,
) -> Result<(), TiifError>
where
    S: ByteSource,
    F: FnMut(&BlockVisit<'_>) -> io::Result<()>,
{
    while let Some(content_type) = container.next()? {
        let body = container.read_body()?;
        if content_type == ContentType::ReleaseHeader {
            container.unpack_release_body(&body)?;
        }
        // next() returned Some, so a block is current; anything else is a
        // parser-state bug and must surface, not be skipped over.
        let block = container
            .block()
            .cloned()
            .ok_or(TiifError::ProtocolViolation("no content block pending"))?;

        visit(&BlockVisit {
            container: container_name,
            depth,
            block: &block,
            body: &body,
        })
        .map_err(TiifError::Io)?;

        if let Some(Extension::ReleaseHeader {
            major,
            minor,
            build_number,
            date,
            ref build_id,
        }) = block.extension
        {
            report.releases.push(ReleaseRecord {
                container: container_name.to_owned(),
                major,
                minor,
                build_number,
                date,
                build_id: build_id.clone(),
                products: block.products.clone().unwrap_or_default(),
            });
        }

        if content_type == ContentType::EmbeddedContainer {
            if depth + 1 > MAX_NESTING_DEPTH {
                return Err(TiifError::NestingTooDeep {
                    limit: MAX_NESTING_DEPTH,
                });
            }
            let mut nested = Container::open(BufferSource::new(&body))?;
            let nested_name = format!("{container_name}/{}", block.name);
            walk(&mut nested, &nested_name, depth + 1, report, visit)?;
        }
    }
    Ok(())
}
