//! KOD deobfuscator — a pure byte transformation keyed by record index.
//!
//! # Contract
//! `kod_decode(record_index, cipher)` returns a buffer of identical length.
//! It is a pure function of `(record_index, cipher bytes)`: no I/O, no
//! allocation failure modes worth surfacing as an error, and no input on
//! which it can fail. The transformation is its own involution — applying it
//! twice with the same `record_index` returns the original bytes — which is
//! what makes KOD a pure XOR keystream rather than a general substitution:
//! any substitution table composed with itself is not an involution in
//! general, but XOR with the same keystream always is.
//!
//! # External constant
//! [`kod_table`] is the substitution data this crate's surrounding project
//! supplies; the table's *contents* are intentionally out of scope here
//! ("the core requires it but does not define it") — only the algorithm
//! shape is preserved. The 256 bytes below are a placeholder
//! permutation — swap them for the production table before depending on
//! bit-for-bit compatibility with a real CRONOS deployment. See `DESIGN.md`
//! for the open-question resolution.

/// Per-byte-position keystream material, indexed by `(record_index + i) % 256`.
/// Swap for the real CRONOS substitution table; see module docs.
pub fn kod_table() -> &'static [u8; 256] {
    static TABLE: std::sync::OnceLock<[u8; 256]> = std::sync::OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [0u8; 256];
        for (i, slot) in table.iter_mut().enumerate() {
            // A fixed, reproducible non-identity permutation seed. Any byte
            // values work here: the involution property comes from XOR, not
            // from this table's structure.
            *slot = ((i as u32 * 167 + 41) % 256) as u8;
        }
        table
    })
}

/// Deobfuscate (or, equivalently, obfuscate — the transform is involutive)
/// `cipher` using the keystream derived from `record_index`.
///
/// Never fails: returns a `Vec<u8>` of the same length as `cipher` for any
/// input, including an empty slice.
pub fn kod_decode(record_index: u32, cipher: &[u8]) -> Vec<u8> {
    let table = kod_table();
    cipher
        .iter()
        .enumerate()
        .map(|(i, &b)| {
            let key_idx = (record_index as usize).wrapping_add(i) % table.len();
            b ^ table[key_idx]
        })
        .collect()
}
