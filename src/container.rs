//! Container header — format anchor at offset 0 of the `.dat` stream.
//!
//! # On-disk layout (19 bytes, fields are little-endian except where noted)
//!
//! ```text
//! Offset  Size  Field
//!    0      8   magic        = "CroFile\0"  (8 ASCII bytes, not a numeric field)
//!    8      2   unknown16    opaque (LE u16)
//!   10      5   version      ASCII, e.g. "01.02"
//!   15      2   encoding     bit 0 = KOD obfuscation enabled  (LE u16)
//!   17      2   blocksize    extension block size: 0x0040, 0x0200, 0x0400 (LE u16)
//! ```
//!
//! Immediately following the header are `0xE9` bytes of pseudo-random
//! obfuscation padding, seeded from wall-clock at write time. It carries no
//! semantic content; this crate never reads or reproduces it — every record
//! is located by absolute offset from the index, not by scanning past the
//! header.
//!
//! # Version dispatch
//! `version` selects the offset width used throughout the index and the
//! extended-record prefix. Rather than making every downstream
//! reader match on the version string again, [`Container::offset_width`]
//! is resolved once at construction into an [`OffsetWidth`], following the
//! "small descriptor shape object" strategy over
//! generics — the variance here is exactly two cases and will not grow.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Read;

use crate::error::CroError;

pub const MAGIC: &[u8; 8] = b"CroFile\0";
pub const HEADER_SIZE: usize = 19;

/// Offset width used by the index and by extended-record next-pointers.
/// Determined once from the container version and threaded
/// through [`crate::index`] and [`crate::record`] instead of re-matching
/// the version string at every call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetWidth {
    /// `01.02`, `01.04` — 32-bit offsets, 12-byte descriptors, 8-byte
    /// extension prefixes.
    Bit32,
    /// `01.03` — 64-bit offsets, 16-byte descriptors, 12-byte extension
    /// prefixes.
    Bit64,
}

impl OffsetWidth {
    /// Width in bytes of one index descriptor tuple.
    pub fn descriptor_size(self) -> usize {
        match self {
            OffsetWidth::Bit32 => 12,
            OffsetWidth::Bit64 => 16,
        }
    }

    /// Width in bytes of the `(next_offset, total_length)` prefix carried by
    /// the first fragment of an extended record.
    pub fn extension_prefix_size(self) -> usize {
        match self {
            OffsetWidth::Bit32 => 8,
            OffsetWidth::Bit64 => 12,
        }
    }

    /// Width in bytes of the `next_offset` pointer embedded at the start of
    /// each subsequent extension block.
    pub fn block_pointer_size(self) -> usize {
        match self {
            OffsetWidth::Bit32 => 4,
            OffsetWidth::Bit64 => 8,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Container {
    pub unknown16: u16,
    pub version: String,
    pub encoding: u16,
    pub blocksize: u16,
    pub offset_width: OffsetWidth,
}

impl Container {
    /// Bit 0 of `encoding`: KOD obfuscation is applied to every record.
    pub fn kod_enabled(&self) -> bool {
        self.encoding & 0x0001 != 0
    }

    /// Read and validate the 19-byte header. Does not touch the obfuscation
    /// padding that follows it.
    pub fn read<R: Read>(mut r: R) -> Result<Self, CroError> {
        let mut magic = [0u8; 8];
        r.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(CroError::NotAnArchive);
        }

        let unknown16 = r.read_u16::<LittleEndian>()?;

        let mut version_bytes = [0u8; 5];
        r.read_exact(&mut version_bytes)?;
        let version = String::from_utf8_lossy(&version_bytes).into_owned();

        let offset_width = match version.as_str() {
            "01.02" | "01.04" => OffsetWidth::Bit32,
            "01.03" => OffsetWidth::Bit64,
            "01.11" => return Err(CroError::UnsupportedVersion(version)),
            _ => return Err(CroError::UnsupportedVersion(version)),
        };

        let encoding = r.read_u16::<LittleEndian>()?;
        let blocksize = r.read_u16::<LittleEndian>()?;

        Ok(Self {
            unknown16,
            version,
            encoding,
            blocksize,
            offset_width,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn header(version: &[u8; 5], encoding: u16, blocksize: u16) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(MAGIC);
        buf.extend_from_slice(&0x1234u16.to_le_bytes());
        buf.extend_from_slice(version);
        buf.extend_from_slice(&encoding.to_le_bytes());
        buf.extend_from_slice(&blocksize.to_le_bytes());
        buf
    }

    #[test]
    fn parses_32_bit_version() {
        let buf = header(b"01.02", 0, 0x0040);
        let c = Container::read(Cursor::new(buf)).unwrap();
        assert_eq!(c.offset_width, OffsetWidth::Bit32);
        assert!(!c.kod_enabled());
        assert_eq!(c.blocksize, 0x0040);
    }

    #[test]
    fn parses_64_bit_version() {
        let buf = header(b"01.03", 0, 0x0200);
        let c = Container::read(Cursor::new(buf)).unwrap();
        assert_eq!(c.offset_width, OffsetWidth::Bit64);
    }

    #[test]
    fn kod_bit_detected() {
        let buf = header(b"01.04", 1, 0x0400);
        let c = Container::read(Cursor::new(buf)).unwrap();
        assert!(c.kod_enabled());
    }

    #[test]
    fn rejects_bad_magic() {
        let mut buf = header(b"01.02", 0, 0x0040);
        buf[0] = b'X';
        assert!(matches!(Container::read(Cursor::new(buf)), Err(CroError::NotAnArchive)));
    }

    #[test]
    fn rejects_version_01_11() {
        let buf = header(b"01.11", 0, 0x0040);
        match Container::read(Cursor::new(buf)) {
            Err(CroError::UnsupportedVersion(v)) => assert_eq!(v, "01.11"),
            other => panic!("expected UnsupportedVersion, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_version() {
        let buf = header(b"99.99", 0, 0x0040);
        assert!(matches!(Container::read(Cursor::new(buf)), Err(CroError::UnsupportedVersion(_))));
    }
}
