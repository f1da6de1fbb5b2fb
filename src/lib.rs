pub mod block;
pub mod container;
pub mod error;
pub mod header;
pub mod source;
pub mod traverse;

pub use block::{decode_extension, BlockHeader, ContentType, Extension};
pub use container::{Block, Container};
pub use error::TiifError;
pub use header::ContainerHeader;
pub use source::{BufferSource, ByteSource, FileSource};
pub use traverse::{traverse_buffer, traverse_file, BlockVisit, ReleaseRecord, TraverseReport};
