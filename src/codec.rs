//! Big-endian integer packing and the FNV-1a 32-bit hash used to place terms
//! into posting-store buckets. See spec §6.3 for the exact constants.

use std::convert::TryInto;

/// `offset_basis` for FNV-1a 32-bit.
const FNV_OFFSET_BASIS: u32 = 0x811C_9DC5;

/// Hash `bytes` with FNV-1a 32-bit using the shift-add form of the multiply
/// by the FNV prime (`0x01000193`), which is how the reference posting-store
/// implementations compute it and what spec §6.3 mandates byte-for-byte.
pub fn fnv1a_32(bytes: &[u8]) -> u32 {
    let mut h = FNV_OFFSET_BASIS;
    for &b in bytes {
        h ^= u32::from(b);
        h = h
            .wrapping_add(h << 1)
            .wrapping_add(h << 4)
            .wrapping_add(h << 7)
            .wrapping_add(h << 8)
            .wrapping_add(h << 24);
    }
    h
}

/// Pack a doc-id as the 4-byte big-endian payload stored in posting nodes.
pub fn doc_id_to_be_bytes(doc_id: u32) -> [u8; 4] {
    doc_id.to_be_bytes()
}

/// Unpack a posting payload back into a doc-id.
///
/// Returns `None` if `bytes` is not exactly 4 bytes, which indicates a
/// corrupt node rather than a bug in the caller.
pub fn doc_id_from_be_bytes(bytes: &[u8]) -> Option<u32> {
    let arr: [u8; 4] = bytes.try_into().ok()?;
    Some(u32::from_be_bytes(arr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv1a_32_matches_known_vectors() {
        // Standard FNV-1a 32-bit test vectors.
        assert_eq!(fnv1a_32(b""), 0x811c_9dc5);
        assert_eq!(fnv1a_32(b"a"), 0xe40c_292c);
        assert_eq!(fnv1a_32(b"foobar"), 0xbf9c_f968);
    }

    #[test]
    fn doc_id_round_trips() {
        for id in [0u32, 1, 42, u32::MAX] {
            let bytes = doc_id_to_be_bytes(id);
            assert_eq!(doc_id_from_be_bytes(&bytes), Some(id));
        }
    }

    #[test]
    fn doc_id_from_bad_length_is_none() {
        assert_eq!(doc_id_from_be_bytes(&[1, 2, 3]), None);
    }
}
