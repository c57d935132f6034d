//! Set-bit counting.

/// Number of set bits for every byte value.
pub static POPCOUNT: [u8; 256] = build_table();

const fn build_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = (i as u8).count_ones() as u8;
        i += 1;
    }
    table
}

/// Counts the set bits in `bytes`.
#[must_use]
pub fn count_ones(bytes: &[u8]) -> u64 {
    bytes.iter().map(|&b| u64::from(POPCOUNT[b as usize])).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_spot_checks() {
        assert_eq!(POPCOUNT[0x00], 0);
        assert_eq!(POPCOUNT[0x01], 1);
        assert_eq!(POPCOUNT[0x80], 1);
        assert_eq!(POPCOUNT[0x0F], 4);
        assert_eq!(POPCOUNT[0xAA], 4);
        assert_eq!(POPCOUNT[0xFE], 7);
        assert_eq!(POPCOUNT[0xFF], 8);
    }

    #[test]
    fn count_slice() {
        assert_eq!(count_ones(&[]), 0);
        assert_eq!(count_ones(&[0xFF, 0x01, 0x00, 0x81]), 11);
    }
}
