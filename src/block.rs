use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Read};

use crate::error::TiifError;

/// Fixed prefix of every content block header; `header_len` may extend past
/// it with a type-specific extension.
pub const BLOCK_HEADER_LEN: usize = 32;

const RELEASE_HEADER_EXT_LEN: usize = 44;
const SOFTWARE_BLOB_EXT_LEN: usize = 32;

// ── Content types ─────────────────────────────────────────────────────────────

/// Wire content type codes 1–9.  Codes outside that range are accepted and
/// reported as [`ContentType::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    ReleaseHeader,
    VHeader,
    BinaryBlob,
    SoftwareBlob,
    VHeaderBlob,
    EmbeddedContainer,
    Signature,
    SerializedData,
    ReleaseNotes,
    Unknown(u16),
}

impl ContentType {
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => ContentType::ReleaseHeader,
            2 => ContentType::VHeader,
            3 => ContentType::BinaryBlob,
            4 => ContentType::SoftwareBlob,
            5 => ContentType::VHeaderBlob,
            6 => ContentType::EmbeddedContainer,
            7 => ContentType::Signature,
            8 => ContentType::SerializedData,
            9 => ContentType::ReleaseNotes,
            other => ContentType::Unknown(other),
        }
    }

    pub fn code(self) -> u16 {
        match self {
            ContentType::ReleaseHeader => 1,
            ContentType::VHeader => 2,
            ContentType::BinaryBlob => 3,
            ContentType::SoftwareBlob => 4,
            ContentType::VHeaderBlob => 5,
            ContentType::EmbeddedContainer => 6,
            ContentType::Signature => 7,
            ContentType::SerializedData => 8,
            ContentType::ReleaseNotes => 9,
            ContentType::Unknown(code) => code,
        }
    }

    /// Human-readable label used in listings and manifests.
    pub fn label(self) -> &'static str {
        match self {
            ContentType::ReleaseHeader => "TIIF Release Header",
            ContentType::VHeader => "TIIF VHeader",
            ContentType::BinaryBlob => "Binary Blob",
            ContentType::SoftwareBlob => "Software Blob",
            ContentType::VHeaderBlob => "VHeader Blob",
            ContentType::EmbeddedContainer => "Embedded TIIF",
            ContentType::Signature => "TIIF Signature",
            ContentType::SerializedData => "Serialized Data",
            ContentType::ReleaseNotes => "Release Notes",
            ContentType::Unknown(_) => "UNKNOWN CONTENT TYPE",
        }
    }
}

// ── Block header ──────────────────────────────────────────────────────────────

/// Fixed 32-byte content block header.  `header_crc` covers all header bytes
/// from offset 4 through `header_len`, extension included.
#[derive(Debug, Clone)]
pub struct BlockHeader {
    pub header_crc: u32,
    pub type_code: u16,
    pub header_len: u16,
    pub body_len: u32,
    pub name: String,
    pub body_crc: u32,
}

impl BlockHeader {
    pub fn read<R: Read>(mut reader: R) -> io::Result<Self> {
        let header_crc = reader.read_u32::<LittleEndian>()?;
        let type_code = reader.read_u16::<LittleEndian>()?;
        let header_len = reader.read_u16::<LittleEndian>()?;
        let body_len = reader.read_u32::<LittleEndian>()?;
        let mut name = [0u8; 16];
        reader.read_exact(&mut name)?;
        let body_crc = reader.read_u32::<LittleEndian>()?;
        Ok(Self {
            header_crc,
            type_code,
            header_len,
            body_len,
            name: text_field(&name),
            body_crc,
        })
    }
}

/// Decode a fixed-size null-padded text field, dropping the padding.
pub(crate) fn text_field(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

// ── Extensions ────────────────────────────────────────────────────────────────

/// Type-specific metadata carried in the header region past the fixed 32
/// bytes.  Only two layouts are defined; every other content type keeps its
/// extension bytes opaque (reserved for future layouts).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extension {
    ReleaseHeader {
        major: u8,
        minor: u8,
        build_number: u16,
        /// Unix epoch seconds (signed 32-bit on the wire).
        date: i64,
        build_id: String,
    },
    SoftwareBlob {
        major: u8,
        minor: u8,
        build_number: u16,
        build_id: String,
    },
}

/// Decode the extension region for `content_type`.
///
/// Pure function of its inputs: `Ok(None)` for types with no defined layout,
/// [`TiifError::ExtensionLengthMismatch`] when the region size does not
/// exactly match the fixed layout.
pub fn decode_extension(
    content_type: ContentType,
    bytes: &[u8],
) -> Result<Option<Extension>, TiifError> {
    match content_type {
        ContentType::ReleaseHeader => {
            if bytes.len() != RELEASE_HEADER_EXT_LEN {
                return Err(TiifError::ExtensionLengthMismatch {
                    content_type: content_type.label(),
                    expected: RELEASE_HEADER_EXT_LEN,
                    got: bytes.len(),
                });
            }
            let mut reader = &bytes[..8];
            let major = reader.read_u8()?;
            let minor = reader.read_u8()?;
            let build_number = reader.read_u16::<LittleEndian>()?;
            let date = reader.read_i32::<LittleEndian>()?;
            Ok(Some(Extension::ReleaseHeader {
                major,
                minor,
                build_number,
                date: i64::from(date),
                build_id: text_field(&bytes[8..]),
            }))
        }
        ContentType::SoftwareBlob => {
            if bytes.len() != SOFTWARE_BLOB_EXT_LEN {
                return Err(TiifError::ExtensionLengthMismatch {
                    content_type: content_type.label(),
                    expected: SOFTWARE_BLOB_EXT_LEN,
                    got: bytes.len(),
                });
            }
            let mut reader = &bytes[..4];
            let major = reader.read_u8()?;
            let minor = reader.read_u8()?;
            let build_number = reader.read_u16::<LittleEndian>()?;
            Ok(Some(Extension::SoftwareBlob {
                major,
                minor,
                build_number,
                build_id: text_field(&bytes[4..]),
            }))
        }
        // VHeader, VHeaderBlob, Signature and SerializedData have extension
        // layouts this parser does not decode; the remaining types carry no
        // extension at all.
        _ => Ok(None),
    }
}
