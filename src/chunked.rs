//! Compressed-chunk decoder — the proprietary envelope wrapping raw DEFLATE
//! segments.
//!
//! # Endianness
//! Every chunk's `size` and `flag` fields are big-endian; the embedded
//! `crc` is little-endian. This mixing is intrinsic to the format and is not
//! a bug to "fix" — readers and writers of this envelope elsewhere must
//! match it exactly.
//!
//! # Layout
//! ```text
//! repeat:
//!   size  u16 BE   — bytes of (flag + crc + compressed payload) that follow
//!   flag  u16 BE   — always 0x0800 or 0x0008, otherwise not a chunk envelope
//!   crc   u32 LE   — CRC32 of the decompressed payload, never verified
//!   data  size-6 bytes — raw DEFLATE (no zlib/gzip wrapper)
//! terminator: 0x00 0x00 0x02  (a zero-size chunk header followed by 0x02)
//! ```

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use flate2::read::DeflateDecoder;
use std::io::Read;

use crate::error::CroError;

const TERMINATOR: [u8; 3] = [0x00, 0x00, 0x02];
const CHUNK_HEADER_LEN: usize = 8; // size(2) + flag(2) + crc(4)

/// Walk `data` as a chunk envelope without decompressing anything.
///
/// Returns `true` only if every chunk header is well-formed and the walk
/// lands exactly on the terminator with no leftover or missing bytes. This
/// is the record reader's "should I decompress this?" gate — it has no
/// false positives on raw KOD-decoded payloads in the expected corpus, but
/// the detector is inherently heuristic: a plaintext record that happens to
/// match this shape would be misidentified as compressed.
pub fn is_compressed(data: &[u8]) -> bool {
    if data.len() < 11 {
        return false;
    }
    if data[data.len() - 3..] != TERMINATOR {
        return false;
    }

    let end = data.len() - 3;
    let mut o = 0usize;
    while o < end {
        if o + 4 > data.len() {
            return false;
        }
        let size = BigEndian::read_u16(&data[o..o + 2]) as usize;
        let flag = BigEndian::read_u16(&data[o + 2..o + 4]);
        if flag != 0x0800 && flag != 0x0008 {
            return false;
        }
        match o.checked_add(size).and_then(|v| v.checked_add(2)) {
            Some(next) => o = next,
            None => return false,
        }
    }
    o == end
}

/// Inflate every chunk in `data` and concatenate the results.
///
/// `data` MUST already have passed [`is_compressed`]; this function does not
/// re-validate the envelope shape beyond what it needs to slice payloads,
/// and returns [`CroError::DecompressionError`] on any malformed chunk
/// (truncated payload, bad DEFLATE stream) rather than silently stopping.
/// The stored CRC32 is read but never checked, matching the reference
/// behavior.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, CroError> {
    let mut out = Vec::new();
    if data.len() < 3 {
        return Err(CroError::DecompressionError(
            "chunk envelope shorter than the terminator".into(),
        ));
    }
    let end = data.len() - 3;
    let mut o = 0usize;

    while o < end {
        if o + CHUNK_HEADER_LEN > data.len() {
            return Err(CroError::DecompressionError(format!(
                "truncated chunk header at offset {o}"
            )));
        }
        let size = BigEndian::read_u16(&data[o..o + 2]) as usize;
        let _flag = BigEndian::read_u16(&data[o + 2..o + 4]);
        let _stored_crc = LittleEndian::read_u32(&data[o + 4..o + 8]);

        if size < 6 {
            return Err(CroError::DecompressionError(format!(
                "chunk size {size} at offset {o} smaller than the flag+crc header"
            )));
        }
        let payload_len = size - 6;
        let payload_start = o + CHUNK_HEADER_LEN;
        let payload_end = payload_start
            .checked_add(payload_len)
            .ok_or_else(|| CroError::DecompressionError("chunk length overflow".into()))?;
        if payload_end > data.len() {
            return Err(CroError::DecompressionError(format!(
                "chunk payload at offset {o} runs past end of record"
            )));
        }

        let mut decoder = DeflateDecoder::new(&data[payload_start..payload_end]);
        decoder
            .read_to_end(&mut out)
            .map_err(|e| CroError::DecompressionError(format!("raw deflate failed: {e}")))?;

        o += size + 2;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn make_chunk(plain: &[u8], flag: u16) -> Vec<u8> {
        let mut compressed = Vec::new();
        {
            let mut enc = flate2::write::DeflateEncoder::new(&mut compressed, flate2::Compression::default());
            enc.write_all(plain).unwrap();
            enc.finish().unwrap();
        }
        let size = (compressed.len() + 6) as u16;
        let mut chunk = Vec::new();
        chunk.extend_from_slice(&size.to_be_bytes());
        chunk.extend_from_slice(&flag.to_be_bytes());
        chunk.extend_from_slice(&0u32.to_le_bytes()); // unverified crc
        chunk.extend_from_slice(&compressed);
        chunk
    }

    fn envelope(chunks: &[Vec<u8>]) -> Vec<u8> {
        let mut out = Vec::new();
        for c in chunks {
            out.extend_from_slice(c);
        }
        out.extend_from_slice(&TERMINATOR);
        out
    }

    #[test]
    fn detects_single_chunk_envelope() {
        let data = envelope(&[make_chunk(b"hello cronos", 0x0800)]);
        assert!(is_compressed(&data));
    }

    #[test]
    fn detects_multi_chunk_envelope_with_both_flags() {
        let data = envelope(&[make_chunk(b"first part", 0x0800), make_chunk(b"second part", 0x0008)]);
        assert!(is_compressed(&data));
    }

    #[test]
    fn rejects_plain_data() {
        assert!(!is_compressed(b"just some plaintext bytes here padded out"));
        assert!(!is_compressed(b"short"));
    }

    #[test]
    fn rejects_bad_terminator() {
        let mut data = envelope(&[make_chunk(b"abc", 0x0800)]);
        let len = data.len();
        data[len - 1] = 0x03;
        assert!(!is_compressed(&data));
    }

    #[test]
    fn rejects_bad_flag() {
        let data = envelope(&[make_chunk(b"abc", 0x1234)]);
        assert!(!is_compressed(&data));
    }

    #[test]
    fn decompresses_to_original_plaintext() {
        let original = b"the quick brown fox jumps over the lazy dog, repeated many times, repeated many times";
        let data = envelope(&[make_chunk(original, 0x0800)]);
        assert!(is_compressed(&data));
        let out = decompress(&data).unwrap();
        assert_eq!(out, original);
    }

    #[test]
    fn decompresses_multi_chunk_concatenation() {
        let a = b"first segment of data";
        let b = b"second segment of data";
        let data = envelope(&[make_chunk(a, 0x0800), make_chunk(b, 0x0008)]);
        let out = decompress(&data).unwrap();
        let mut expected = Vec::new();
        expected.extend_from_slice(a);
        expected.extend_from_slice(b);
        assert_eq!(out, expected);
    }

    #[test]
    fn errors_on_truncated_payload() {
        let mut data = envelope(&[make_chunk(b"some data to compress here", 0x0800)]);
        // Truncate the payload without fixing the terminator or size field.
        data.truncate(data.len() - 5);
        data.extend_from_slice(&TERMINATOR);
        assert!(decompress(&data).is_err());
    }
}
