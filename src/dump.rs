//! Diagnostic dump mode — walk every descriptor, track which
//! container bytes are referenced, and report the set-complement as
//! unreferenced ranges.
//!
//! Walks an entire archive independent of any single record request and
//! produces one structured report instead of printing as it goes. Unlike a
//! from-scratch recovery scan, this module never reconstructs a *missing*
//! index — it *uses* the already-parsed index and is purely diagnostic,
//! mostly useful for reverse-engineering the database format.

use std::io::{Read, Seek};

use crate::error::CroError;
use crate::record::RecordReader;

/// One descriptor's worth of dump output.
#[derive(Debug, Clone)]
pub struct DumpEntry {
    /// 1-based record index.
    pub index: u32,
    pub offset: u64,
    pub length_and_flags: u32,
    pub checksum: u32,
    pub deleted: bool,
    pub was_extended: bool,
    pub was_decompressed: bool,
    /// First bytes of the fully decoded payload, for a human-readable
    /// preview. Bounded so a dump over a large archive stays manageable.
    pub preview: Vec<u8>,
    /// Overshoot bytes beyond `total_length` in the last extension block of
    /// an extended record.
    pub tail: Vec<u8>,
    /// Error encountered while decoding this record, if any. A dump walk
    /// does not abort on one bad record — it records the failure and moves
    /// on, since the point of dumping is to see as much of a possibly
    /// corrupt archive as possible.
    pub error: Option<String>,
}

/// Full report produced by [`dump`].
#[derive(Debug)]
pub struct DumpReport {
    pub entries: Vec<DumpEntry>,
    /// `(start, end)` ranges referenced by at least one descriptor's primary
    /// fragment or extension chain.
    pub touched_ranges: Vec<(u64, u64)>,
    /// `(start, end)` ranges in `[0, container_size)` referenced by nothing.
    pub unreferenced_ranges: Vec<(u64, u64)>,
    pub container_size: u64,
}

impl DumpReport {
    pub fn summary(&self) -> String {
        let deleted = self.entries.iter().filter(|e| e.deleted).count();
        let extended = self.entries.iter().filter(|e| e.was_extended).count();
        let errors = self.entries.iter().filter(|e| e.error.is_some()).count();
        format!(
            "{} record(s): {} deleted, {} extended, {} error(s); {} unreferenced range(s) covering {} byte(s)",
            self.entries.len(),
            deleted,
            extended,
            errors,
            self.unreferenced_ranges.len(),
            self.unreferenced_ranges.iter().map(|(s, e)| e - s).sum::<u64>(),
        )
    }
}

const PREVIEW_LEN: usize = 64;

/// Walk every descriptor in `reader`'s index, decoding each record the same
/// way [`RecordReader::read_record`] would, and report byte-range coverage
/// plus per-record diagnostics.
pub fn dump<R: Read + Seek>(reader: &mut RecordReader<R>) -> Result<DumpReport, CroError> {
    let container_size = reader.container_size();
    let record_count = reader.record_count();

    let mut entries = Vec::with_capacity(record_count);
    let mut touched: Vec<(u64, u64)> = Vec::new();

    for i in 1..=record_count as u32 {
        let descriptor = reader.index.descriptors[i as usize - 1];

        if descriptor.is_deleted() {
            tracing::debug!(index = i, "descriptor is deleted, skipping body walk");
            entries.push(DumpEntry {
                index: i,
                offset: descriptor.offset,
                length_and_flags: descriptor.length_and_flags,
                checksum: descriptor.checksum,
                deleted: true,
                was_extended: false,
                was_decompressed: false,
                preview: Vec::new(),
                tail: Vec::new(),
                error: None,
            });
            continue;
        }

        match reader.gather(i) {
            Ok(Some(gathered)) => {
                for &range in &gathered.touched {
                    tracing::debug!(index = i, start = range.0, end = range.1, "touched range");
                }
                touched.extend(gathered.touched.iter().copied());

                let mut decoded = gathered.payload.clone();
                let mut was_decompressed = false;
                if !decoded.is_empty() {
                    if reader.header.kod_enabled() {
                        decoded = crate::kod::kod_decode(i, &decoded);
                    }
                    if crate::chunked::is_compressed(&decoded) {
                        match crate::chunked::decompress(&decoded) {
                            Ok(d) => {
                                decoded = d;
                                was_decompressed = true;
                            }
                            Err(e) => {
                                entries.push(DumpEntry {
                                    index: i,
                                    offset: descriptor.offset,
                                    length_and_flags: descriptor.length_and_flags,
                                    checksum: descriptor.checksum,
                                    deleted: false,
                                    was_extended: gathered.was_extended,
                                    was_decompressed: false,
                                    preview: Vec::new(),
                                    tail: gathered.tail,
                                    error: Some(e.to_string()),
                                });
                                continue;
                            }
                        }
                    }
                }

                let preview_len = decoded.len().min(PREVIEW_LEN);
                entries.push(DumpEntry {
                    index: i,
                    offset: descriptor.offset,
                    length_and_flags: descriptor.length_and_flags,
                    checksum: descriptor.checksum,
                    deleted: false,
                    was_extended: gathered.was_extended,
                    was_decompressed,
                    preview: decoded[..preview_len].to_vec(),
                    tail: gathered.tail,
                    error: None,
                });
            }
            Ok(None) => unreachable!("is_deleted() already handled above"),
            Err(e) => {
                entries.push(DumpEntry {
                    index: i,
                    offset: descriptor.offset,
                    length_and_flags: descriptor.length_and_flags,
                    checksum: descriptor.checksum,
                    deleted: false,
                    was_extended: false,
                    was_decompressed: false,
                    preview: Vec::new(),
                    tail: Vec::new(),
                    error: Some(e.to_string()),
                });
            }
        }
    }

    let unreferenced_ranges = unreferenced_ranges(&touched, container_size);

    Ok(DumpReport {
        entries,
        touched_ranges: touched,
        unreferenced_ranges,
        container_size,
    })
}

/// Compute the set-complement of `ranges` within `[0, container_size)`.
///
/// Mirrors the original `enumunreferenced`: sort ranges by start, then walk
/// gaps between them, finally closing the gap to `container_size` if any.
/// Overlapping or out-of-order input ranges are tolerated by clamping the
/// cursor forward — a range fully inside an already-covered span produces
/// no new gap.
pub fn unreferenced_ranges(ranges: &[(u64, u64)], container_size: u64) -> Vec<(u64, u64)> {
    let mut sorted = ranges.to_vec();
    sorted.sort_unstable();

    let mut gaps = Vec::new();
    let mut cursor = 0u64;
    for (start, end) in sorted {
        if start > cursor {
            gaps.push((cursor, start));
        }
        if end > cursor {
            cursor = end;
        }
    }
    if cursor < container_size {
        gaps.push((cursor, container_size));
    }
    gaps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_touched_ranges_means_whole_file_unreferenced() {
        let gaps = unreferenced_ranges(&[], 100);
        assert_eq!(gaps, vec![(0, 100)]);
    }

    #[test]
    fn fully_touched_means_no_gaps() {
        let gaps = unreferenced_ranges(&[(0, 100)], 100);
        assert!(gaps.is_empty());
    }

    #[test]
    fn partition_has_no_overlap_and_no_gap() {
        let touched = vec![(10, 20), (50, 60), (0, 5)];
        let container_size = 100;
        let gaps = unreferenced_ranges(&touched, container_size);

        let mut all: Vec<(u64, u64, bool)> = touched
            .iter()
            .map(|&(s, e)| (s, e, true))
            .chain(gaps.iter().map(|&(s, e)| (s, e, false)))
            .collect();
        all.sort_by_key(|&(s, _, _)| s);

        let mut cursor = 0u64;
        for (s, e, _) in &all {
            assert_eq!(*s, cursor, "gap or overlap detected at {s}");
            cursor = *e;
        }
        assert_eq!(cursor, container_size);
    }

    #[test]
    fn overlapping_touched_ranges_do_not_produce_negative_gaps() {
        let gaps = unreferenced_ranges(&[(0, 50), (40, 60)], 100);
        assert_eq!(gaps, vec![(60, 100)]);
    }
}
