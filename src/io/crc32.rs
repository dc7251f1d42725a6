//! 256-entry CRC32 table (component A). Standard reflected CRC-32/IEEE-802.3 polynomial
//! (0xEDB88320), used both for keyword hashing (word-id assignment, §4.E) and for
//! checkpointed file integrity checks. Built as a table, not delegated to a black-box
//! crate function, because callers need the raw table for rolling/incremental hashing
//! (infix enumeration extends a running hash byte by byte, §4.G).

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut c = i as u32;
        let mut k = 0;
        while k < 8 {
            c = if c & 1 != 0 { 0xEDB8_8320 ^ (c >> 1) } else { c >> 1 };
            k += 1;
        }
        table[i] = c;
        i += 1;
    }
    table
}

pub static CRC32_TABLE: [u32; 256] = build_table();

/// Continue a CRC32 computation from a previous (already-complemented-out) state.
/// `state` is the raw running register, not yet inverted — callers that want the final
/// published CRC must `!` the result.
#[inline]
pub fn crc32_update(mut state: u32, bytes: &[u8]) -> u32 {
    for &b in bytes {
        state = (state >> 8) ^ CRC32_TABLE[((state ^ b as u32) & 0xff) as usize];
    }
    state
}

/// Hash a byte slice the way `sphCRC32` does: init `0xffff_ffff`, update, complement out.
pub fn crc32(bytes: &[u8]) -> u32 {
    !crc32_update(0xffff_ffff, bytes)
}

/// Continue hashing more bytes given a previously published (already-complemented) CRC.
pub fn crc32_continue(prev_crc: u32, bytes: &[u8]) -> u32 {
    !crc32_update(!prev_crc, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_known_vector() {
        // "123456789" -> 0xCBF43926 is the standard CRC-32/IEEE-802.3 check value.
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn empty_input_is_zero() {
        assert_eq!(crc32(b""), 0);
    }

    #[test]
    fn continuation_matches_one_shot() {
        let one_shot = crc32(b"catdog");
        let split = crc32_continue(crc32(b"cat"), b"dog");
        assert_eq!(one_shot, split);
    }
}
