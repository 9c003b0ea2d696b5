//! Error kinds raised by the CRONOS archive core.
//!
//! One variant per error kind in the decoder design — see `container.rs`,
//! `index.rs`, `record.rs`, and `chunked.rs` for where each is raised.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CroError {
    #[error("not a CRONOS archive: magic mismatch")]
    NotAnArchive,

    #[error("unsupported archive format version {0:?}")]
    UnsupportedVersion(String),

    #[error("invalid record index {index} (archive has {record_count} record(s), indices are 1-based)")]
    InvalidIndex { index: u32, record_count: usize },

    #[error("malformed archive: {0}")]
    MalformedArchive(String),

    #[error("decompression failed: {0}")]
    DecompressionError(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
