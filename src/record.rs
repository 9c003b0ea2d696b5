//! The record reader — the central engine.
//!
//! Reads the container header, locates record bytes via the index,
//! reassembles extended records that span multiple blocks, applies
//! deobfuscation and decompression, and exposes per-record byte access.
//! The container file handle is lazily seeked-and-read per request, while the
//! descriptor table is read eagerly once at construction and never mutated
//! afterward.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Read, Seek, SeekFrom};

use crate::chunked;
use crate::container::{Container, OffsetWidth};
use crate::error::CroError;
use crate::index::{Index, RecordDescriptor};
use crate::kod::kod_decode;

/// Default bound on extension-chain iterations, applied when a caller does
/// not override it via [`RecordReader::with_chain_limit`]. Chosen generously;
/// the real bound used per record is computed from that record's own
/// `total_length` and capped at this value so a single corrupt descriptor
/// with a huge `total_length` cannot force an unbounded loop.
pub const DEFAULT_MAX_CHAIN_ITERATIONS: u64 = 1_000_000;

/// The result of gathering one record's raw bytes off disk, before KOD and
/// decompression are applied. Exposed so [`crate::dump`] can report the
/// same facts the normal read path computes, without recomputing them.
pub struct GatherResult {
    /// Payload bytes, truncated to exactly `total_length` for extended
    /// records, or the full primary fragment otherwise.
    pub payload: Vec<u8>,
    /// Overshoot bytes beyond `total_length` from the last extension block,
    /// discarded by [`RecordReader::read_record`] but kept here for
    /// diagnostics.
    pub tail: Vec<u8>,
    /// `(start, end)` byte ranges touched in the container while gathering
    /// this record: the primary fragment plus each extension block read.
    pub touched: Vec<(u64, u64)>,
    /// Whether this record required extension-chain reassembly.
    pub was_extended: bool,
}

pub struct RecordReader<R: Read + Seek> {
    container: R,
    pub header: Container,
    pub index: Index,
    container_size: u64,
    chain_limit: u64,
}

impl<R: Read + Seek> RecordReader<R> {
    /// Open a paired container/index stream set. Reads the container header
    /// and the full descriptor table eagerly; the container itself is read
    /// lazily per subsequent request.
    pub fn open(mut container: R, index_stream: impl Read) -> Result<Self, CroError> {
        let header = Container::read(&mut container)?;
        let index = Index::read(index_stream, header.offset_width)?;

        let container_size = container.seek(SeekFrom::End(0))?;

        tracing::info!(
            version = %header.version,
            encoding = header.encoding,
            blocksize = header.blocksize,
            record_count = index.descriptors.len(),
            "opened CRONOS archive"
        );

        Ok(Self {
            container,
            header,
            index,
            container_size,
            chain_limit: DEFAULT_MAX_CHAIN_ITERATIONS,
        })
    }

    /// Override the extension-chain iteration bound. Mostly
    /// useful for tests that want to observe the `MalformedArchive` cycle
    /// guard without constructing a million-block archive.
    pub fn with_chain_limit(mut self, limit: u64) -> Self {
        self.chain_limit = limit;
        self
    }

    pub fn record_count(&self) -> usize {
        self.index.descriptors.len()
    }

    /// Absolute container read. No validation beyond seek/read.
    pub fn read_raw(&mut self, offset: u64, length: u32) -> Result<Vec<u8>, CroError> {
        self.container.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; length as usize];
        self.container.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn descriptor(&self, index_1_based: u32) -> Result<RecordDescriptor, CroError> {
        if index_1_based == 0 || index_1_based as usize > self.index.descriptors.len() {
            return Err(CroError::InvalidIndex {
                index: index_1_based,
                record_count: self.index.descriptors.len(),
            });
        }
        Ok(self.index.descriptors[index_1_based as usize - 1])
    }

    /// Gather a record's raw bytes (before KOD/decompression), or `None` if
    /// the slot is deleted. Shared by [`Self::read_record`] and
    /// [`crate::dump`].
    pub fn gather(&mut self, index_1_based: u32) -> Result<Option<GatherResult>, CroError> {
        let desc = self.descriptor(index_1_based)?;
        if desc.is_deleted() {
            return Ok(None);
        }

        let length = desc.length();
        let primary = self.read_raw(desc.offset, length)?;
        let mut touched = vec![(desc.offset, desc.offset + length as u64)];

        if primary.is_empty() {
            return Ok(Some(GatherResult {
                payload: primary,
                tail: Vec::new(),
                touched,
                was_extended: false,
            }));
        }

        if desc.flags() == 0 {
            let prefix_len = self.header.offset_width.extension_prefix_size();
            if primary.len() < prefix_len {
                return Err(CroError::MalformedArchive(format!(
                    "extended record #{index_1_based} primary fragment ({} bytes) shorter than its prefix ({prefix_len} bytes)",
                    primary.len()
                )));
            }
            let mut cur = &primary[..prefix_len];
            let next_offset = match self.header.offset_width {
                OffsetWidth::Bit32 => cur.read_u32::<LittleEndian>()? as u64,
                OffsetWidth::Bit64 => cur.read_u64::<LittleEndian>()?,
            };
            let total_length = cur.read_u32::<LittleEndian>()?;

            let (payload, tail, ext_touched) =
                self.reassemble_extended(index_1_based, next_offset, total_length, &primary[prefix_len..])?;
            touched.extend(ext_touched);

            Ok(Some(GatherResult {
                payload,
                tail,
                touched,
                was_extended: true,
            }))
        } else {
            Ok(Some(GatherResult {
                payload: primary,
                tail: Vec::new(),
                touched,
                was_extended: false,
            }))
        }
    }

    /// Walk the extension-block chain until `total_length` bytes are
    /// accumulated. Returns the truncated payload, any
    /// overshoot tail, and the byte ranges of every extension block read.
    fn reassemble_extended(
        &mut self,
        record_index: u32,
        mut next_offset: u64,
        total_length: u32,
        first_fragment: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>, Vec<(u64, u64)>), CroError> {
        let blocksize = self.header.blocksize as u64;
        let pointer_size = self.header.offset_width.block_pointer_size() as u64;
        if blocksize <= pointer_size {
            return Err(CroError::MalformedArchive(format!(
                "blocksize {blocksize} is not greater than the extension pointer size {pointer_size}"
            )));
        }
        let payload_per_block = blocksize - pointer_size;

        let mut payload = first_fragment.to_vec();
        let mut touched = Vec::new();

        let budget = (total_length as u64 / payload_per_block.max(1)) + 2;
        let max_iters = budget.min(self.chain_limit);
        let mut iterations = 0u64;

        while (payload.len() as u64) < total_length as u64 {
            iterations += 1;
            if iterations > max_iters {
                return Err(CroError::MalformedArchive(format!(
                    "record #{record_index} extension chain exceeded {max_iters} iterations, possible cycle"
                )));
            }

            let block_end = next_offset.checked_add(blocksize).ok_or_else(|| {
                CroError::MalformedArchive(format!(
                    "record #{record_index} extension offset {next_offset} overflows"
                ))
            })?;
            if block_end > self.container_size {
                return Err(CroError::MalformedArchive(format!(
                    "record #{record_index} extension block at {next_offset} (len {blocksize}) reads past end of container ({})",
                    self.container_size
                )));
            }

            let block = self.read_raw(next_offset, blocksize as u32)?;
            touched.push((next_offset, block_end));

            let mut cur = &block[..pointer_size as usize];
            next_offset = match self.header.offset_width {
                OffsetWidth::Bit32 => cur.read_u32::<LittleEndian>()? as u64,
                OffsetWidth::Bit64 => cur.read_u64::<LittleEndian>()?,
            };
            payload.extend_from_slice(&block[pointer_size as usize..]);
        }

        let tail = if payload.len() as u64 > total_length as u64 {
            payload.split_off(total_length as usize)
        } else {
            Vec::new()
        };

        Ok((payload, tail, touched))
    }

    /// Read and fully decode one record: KOD deobfuscation (if
    /// the container's encoding bit 0 is set) followed by decompression (if
    /// the post-KOD bytes match the chunk envelope shape).
    ///
    /// Returns `Ok(None)` for a deleted slot, `Err(InvalidIndex)` for index
    /// `0` or an index past the end of the descriptor table.
    pub fn read_record(&mut self, index_1_based: u32) -> Result<Option<Vec<u8>>, CroError> {
        let gathered = match self.gather(index_1_based)? {
            None => return Ok(None),
            Some(g) => g,
        };

        if gathered.payload.is_empty() {
            return Ok(Some(gathered.payload));
        }

        let mut bytes = gathered.payload;
        if self.header.kod_enabled() {
            bytes = kod_decode(index_1_based, &bytes);
        }
        if chunked::is_compressed(&bytes) {
            bytes = chunked::decompress(&bytes)?;
        }
        Ok(Some(bytes))
    }

    pub fn container_size(&self) -> u64 {
        self.container_size
    }
}
