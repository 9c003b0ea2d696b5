//! # cronos-core — CRONOS archive low-level decoder
//!
//! Reads proprietary CRONOS `.dat`/`.tad` archive pairs: a legacy Russian
//! desktop database format reverse-engineered from observation. This crate
//! is deliberately just the hard, low-level part:
//!
//! - the paired container-and-index file reader ([`container`], [`index`])
//! - the KOD obfuscation layer ([`kod`])
//! - extended-record reassembly across auxiliary blocks ([`record`])
//! - the bespoke chunked-DEFLATE decompressor ([`chunked`])
//! - a diagnostic dump mode that tracks referenced vs. unreferenced
//!   container bytes ([`dump`])
//!
//! Table/field schema interpretation, HTML/delimited-text rendering,
//! templating, CLI argument parsing, output-directory management, and
//! filesystem extraction are deliberately out of scope — those layers are
//! external collaborators that consume the record-level [`Archive`] API
//! exposed here.
//!
//! Non-goals: write support, format mutation, schema inference beyond raw
//! bytes, embedded-checksum verification (the reference implementation
//! explicitly skips CRC checking — see `chunked` and `index`), and formats
//! other than the three versions enumerated in `container`.

pub mod archive;
pub mod chunked;
pub mod container;
pub mod dump;
pub mod error;
pub mod index;
pub mod kod;
pub mod record;

// Flat re-exports for the most common types.
pub use archive::Archive;
pub use container::{Container, OffsetWidth};
pub use dump::{DumpEntry, DumpReport};
pub use error::CroError;
pub use index::{Index, RecordDescriptor};
pub use kod::kod_decode;
pub use record::RecordReader;
