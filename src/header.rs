use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Read};

/// 8-byte identification at offset 0 of every TIIF stream.
pub const IDENTIFICATION: &[u8; 8] = b"FIITTIIF";
pub const IDENTIFICATION_LEN: usize = 8;
/// Fixed size of the top-level header that follows the identification.
pub const CONTAINER_HEADER_LEN: usize = 16;

/// Top-level container header.  `header_crc` covers the 12 bytes that follow
/// it; `8 + 16 + body_len` must equal the total source length.
#[derive(Debug, Clone)]
pub struct ContainerHeader {
    pub header_crc: u32,
    pub version: u8,
    pub reserved: u8,
    pub header_len: u16,
    pub body_len: u32,
    pub body_crc: u32,
}

impl ContainerHeader {
    pub fn read<R: Read>(mut reader: R) -> io::Result<Self> {
        Ok(Self {
            header_crc: reader.read_u32::<LittleEndian>()?,
            version: reader.read_u8()?,
            reserved: reader.read_u8()?,
            header_len: reader.read_u16::<LittleEndian>()?,
            body_len: reader.read_u32::<LittleEndian>()?,
            body_crc: reader.read_u32::<LittleEndian>()?,
        })
    }
}
