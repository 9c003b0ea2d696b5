//! Index reader — parses the `.tad` companion file into descriptors.
//!
//! # On-disk layout
//! ```text
//! Offset  Size  Field
//!    0      4   nr_deleted      (LE u32)
//!    4      4   first_deleted   (LE u32)
//!    8    ...   descriptors, 16 bytes each (64-bit offsets) or 12 bytes
//!               each (32-bit offsets), to end of file
//! ```
//!
//! Descriptor contents are not validated here — only shape. Validating that
//! an `(offset, length)` pair actually falls inside the container is the
//! record reader's job, since that check needs the container
//! size, which the index reader never sees.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Read;

use crate::container::OffsetWidth;
use crate::error::CroError;

/// Sentinel `length_and_flags` value marking a deleted slot.
pub const DELETED_SENTINEL: u32 = 0xFFFF_FFFF;

#[derive(Debug, Clone, Copy)]
pub struct RecordDescriptor {
    pub offset: u64,
    pub length_and_flags: u32,
    pub checksum: u32,
}

impl RecordDescriptor {
    #[inline]
    pub fn is_deleted(&self) -> bool {
        self.length_and_flags == DELETED_SENTINEL
    }

    #[inline]
    pub fn flags(&self) -> u8 {
        (self.length_and_flags >> 24) as u8
    }

    #[inline]
    pub fn length(&self) -> u32 {
        self.length_and_flags & 0x00FF_FFFF
    }
}

#[derive(Debug, Clone)]
pub struct Index {
    pub nr_deleted: u32,
    pub first_deleted: u32,
    pub descriptors: Vec<RecordDescriptor>,
}

impl Index {
    /// Read the 8-byte index header, then the descriptor table.
    ///
    /// A trailing partial descriptor (index length not a multiple of the
    /// descriptor width) is tolerated: it is logged at `warn` level and the
    /// remainder discarded.
    pub fn read<R: Read>(mut r: R, offset_width: OffsetWidth) -> Result<Self, CroError> {
        let nr_deleted = r.read_u32::<LittleEndian>()?;
        let first_deleted = r.read_u32::<LittleEndian>()?;

        let mut raw = Vec::new();
        r.read_to_end(&mut raw)?;

        let width = offset_width.descriptor_size();
        let usable_len = (raw.len() / width) * width;
        if raw.len() % width != 0 {
            tracing::warn!(
                leftover_bytes = raw.len() - usable_len,
                descriptor_width = width,
                "trailing partial descriptor in .tad index, discarding remainder"
            );
        }

        let mut descriptors = Vec::with_capacity(usable_len / width);
        for chunk in raw[..usable_len].chunks_exact(width) {
            let mut cur = chunk;
            let offset = match offset_width {
                OffsetWidth::Bit32 => cur.read_u32::<LittleEndian>()? as u64,
                OffsetWidth::Bit64 => cur.read_u64::<LittleEndian>()?,
            };
            let length_and_flags = cur.read_u32::<LittleEndian>()?;
            let checksum = cur.read_u32::<LittleEndian>()?;
            descriptors.push(RecordDescriptor {
                offset,
                length_and_flags,
                checksum,
            });
        }

        Ok(Self {
            nr_deleted,
            first_deleted,
            descriptors,
        })
    }
}
