//! High-level [`Archive`] API — the primary embedding surface.
//!
//! ```no_run
//! use cronos_core::Archive;
//!
//! let mut archive = Archive::open("CroSys.dat", "CroSys.tad")?;
//! for i in 1..=archive.record_count() as u32 {
//!     if let Some(bytes) = archive.read_record(i)? {
//!         println!("record {i}: {} bytes", bytes.len());
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! File pairing, naming convention, and discovery are the caller's concern
//! — this module only accepts two already-identified paths or
//! streams. The higher-level database object that groups several archives,
//! schema interpretation, and export formatting are explicitly out of
//! scope and live in whatever consumes this crate.

use std::fs::File;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use crate::dump::DumpReport;
use crate::error::CroError;
use crate::record::RecordReader;

/// An opened `(container, index)` pair. Immutable after construction: the
/// descriptor table is read once at [`Archive::open`] and never mutated.
/// Write support is an explicit non-goal.
pub struct Archive<R: Read + Seek> {
    container_path: Option<PathBuf>,
    reader: RecordReader<R>,
}

impl Archive<File> {
    /// Open a `.dat`/`.tad` pair from paths.
    pub fn open<P: AsRef<Path>>(container_path: P, index_path: P) -> Result<Self, CroError> {
        let container_path = container_path.as_ref().to_path_buf();
        let container = File::open(&container_path)?;
        let index = File::open(index_path.as_ref())?;
        let reader = RecordReader::open(container, index)?;
        Ok(Self {
            container_path: Some(container_path),
            reader,
        })
    }
}

impl<R: Read + Seek> Archive<R> {
    /// Open from already-opened streams. Useful for embedding in a caller that manages file
    /// discovery itself, or for in-memory tests via `std::io::Cursor`.
    pub fn from_streams(container: R, index: impl Read) -> Result<Self, CroError> {
        let reader = RecordReader::open(container, index)?;
        Ok(Self {
            container_path: None,
            reader,
        })
    }

    /// Override the extension-chain iteration bound (see
    /// [`RecordReader::with_chain_limit`]). Mostly useful for embedders that
    /// want a tighter guard than [`crate::record::DEFAULT_MAX_CHAIN_ITERATIONS`]
    /// against pathological, possibly cyclic extension chains.
    pub fn with_chain_limit(mut self, limit: u64) -> Self {
        self.reader = self.reader.with_chain_limit(limit);
        self
    }

    pub fn container_path(&self) -> Option<&Path> {
        self.container_path.as_deref()
    }

    pub fn version(&self) -> &str {
        &self.reader.header.version
    }

    pub fn kod_enabled(&self) -> bool {
        self.reader.header.kod_enabled()
    }

    pub fn blocksize(&self) -> u16 {
        self.reader.header.blocksize
    }

    pub fn record_count(&self) -> usize {
        self.reader.record_count()
    }

    /// Read and fully decode record `index` (1-based). `Ok(None)` means the
    /// slot is deleted.
    pub fn read_record(&mut self, index: u32) -> Result<Option<Vec<u8>>, CroError> {
        self.reader.read_record(index)
    }

    /// Absolute container read, bypassing the index entirely. Used by
    /// callers doing their own reverse-engineering of unreferenced ranges.
    pub fn read_raw(&mut self, offset: u64, length: u32) -> Result<Vec<u8>, CroError> {
        self.reader.read_raw(offset, length)
    }

    /// Run the diagnostic dump walk over the whole archive.
    pub fn dump(&mut self) -> Result<DumpReport, CroError> {
        crate::dump::dump(&mut self.reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn minimal_container(version: &[u8; 5], encoding: u16, blocksize: u16) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(crate::container::MAGIC);
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(version);
        buf.extend_from_slice(&encoding.to_le_bytes());
        buf.extend_from_slice(&blocksize.to_le_bytes());
        buf.resize(buf.len() + 0xE9, 0);
        buf
    }

    #[test]
    fn from_streams_reports_header_fields() {
        let container = minimal_container(b"01.02", 1, 0x0040);
        let mut index = Vec::new();
        index.extend_from_slice(&0u32.to_le_bytes());
        index.extend_from_slice(&0u32.to_le_bytes());

        let archive = Archive::from_streams(Cursor::new(container), Cursor::new(index)).unwrap();
        assert_eq!(archive.version(), "01.02");
        assert!(archive.kod_enabled());
        assert_eq!(archive.blocksize(), 0x0040);
        assert_eq!(archive.record_count(), 0);
    }

    #[test]
    fn with_chain_limit_bounds_extension_chain_walk() {
        let mut container = minimal_container(b"01.02", 0, 0x0040);
        container.resize(0x100, 0);

        // Primary fragment: prefix (next=0x200, total=68) + 8 payload bytes,
        // needing exactly one extension block read to complete.
        let mut primary = Vec::new();
        primary.extend_from_slice(&0x200u32.to_le_bytes());
        primary.extend_from_slice(&68u32.to_le_bytes());
        primary.extend_from_slice(&[0u8; 8]);
        container.extend_from_slice(&primary);

        container.resize(0x200, 0);
        let mut block = Vec::new();
        block.extend_from_slice(&0u32.to_le_bytes());
        block.extend_from_slice(&[0u8; 60]);
        container.extend_from_slice(&block);

        let mut index = Vec::new();
        index.extend_from_slice(&0u32.to_le_bytes());
        index.extend_from_slice(&0u32.to_le_bytes());
        index.extend_from_slice(&0x100u32.to_le_bytes());
        index.extend_from_slice(&(primary.len() as u32).to_le_bytes());
        index.extend_from_slice(&0u32.to_le_bytes());

        // With the default limit this record reads fine.
        let ok = Archive::from_streams(Cursor::new(container.clone()), Cursor::new(index.clone())).unwrap();
        let mut ok = ok;
        assert_eq!(ok.read_record(1).unwrap().unwrap().len(), 68);

        // A caller-imposed limit of zero iterations can't complete even one
        // extension block read.
        let mut capped =
            Archive::from_streams(Cursor::new(container), Cursor::new(index)).unwrap().with_chain_limit(0);
        assert!(matches!(capped.read_record(1), Err(CroError::MalformedArchive(_))));
    }

    #[test]
    fn unknown_magic_fails_construction() {
        let mut container = minimal_container(b"01.02", 0, 0x0040);
        container[0] = b'X';
        let index = {
            let mut v = Vec::new();
            v.extend_from_slice(&0u32.to_le_bytes());
            v.extend_from_slice(&0u32.to_le_bytes());
            v
        };
        let result = Archive::from_streams(Cursor::new(container), Cursor::new(index));
        assert!(matches!(result, Err(CroError::NotAnArchive)));
    }
}
