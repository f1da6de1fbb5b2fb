use std::io;
use thiserror::Error;

/// Everything that can go wrong while parsing a TIIF stream.
///
/// All variants are fatal for the container being parsed: callers may skip
/// the offending file in an outer loop but must not keep reading from the
/// same parser instance.  Underlying I/O failures pass through as [`Io`]
/// rather than being folded into a format error.
///
/// [`Io`]: TiifError::Io
#[derive(Error, Debug)]
pub enum TiifError {
    /// Identification bytes missing or not `FIITTIIF`.
    #[error("not a TIIF container")]
    Format,

    #[error("length mismatch: header declares {declared} bytes, source holds {actual}")]
    LengthMismatch { declared: u64, actual: u64 },

    /// `at` names the failing header ("container header" or "block N header").
    #[error("CRC mismatch in {at}: stored {stored:#010x}, computed {computed:#010x}")]
    HeaderCrc {
        at: String,
        stored: u32,
        computed: u32,
    },

    #[error("body CRC mismatch in block {index}: stored {stored:#010x}, computed {computed:#010x}")]
    BodyCrc {
        index: u32,
        stored: u32,
        computed: u32,
    },

    #[error("truncated block header: wanted {wanted} bytes, got {got}")]
    TruncatedHeader { wanted: usize, got: usize },

    #[error("{content_type} extension length mismatch: expected {expected} bytes, got {got}")]
    ExtensionLengthMismatch {
        content_type: &'static str,
        expected: usize,
        got: usize,
    },

    /// Caller broke the block-iteration protocol, e.g. called `next()` while
    /// the previous body was not fully drained.
    #[error("protocol violation: {0}")]
    ProtocolViolation(&'static str),

    #[error("content type is {found}, not {expected}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("malformed release header payload: line {line:?} has no '=' separator")]
    MalformedPayload { line: String },

    /// Embedded containers nested past the traversal cap.
    #[error("embedded containers nested deeper than {limit} levels")]
    NestingTooDeep { limit: usize },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
