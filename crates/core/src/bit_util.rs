//! Small bit/byte helpers shared by CPU and video cores.

/// Number of set bits in `value`
#[inline]
pub fn popcount(value: u8) -> u8 {
    value.count_ones() as u8
}

/// True when `value` has an even number of set bits (Z80 parity flag sense)
#[inline]
pub fn even_parity(value: u8) -> bool {
    popcount(value) & 1 == 0
}

#[inline]
pub fn test_bit(value: u8, bit: u8) -> bool {
    value & (1 << bit) != 0
}

#[inline]
pub fn set_bit(value: u8, bit: u8) -> u8 {
    value | (1 << bit)
}

#[inline]
pub fn clear_bit(value: u8, bit: u8) -> u8 {
    value & !(1 << bit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_popcount() {
        assert_eq!(popcount(0x00), 0);
        assert_eq!(popcount(0xFF), 8);
        assert_eq!(popcount(0b1010_0001), 3);
        assert_eq!(popcount(0x00), 0);
        assert_eq!(popcount(0xFF), 8);
    }

    #[test]
    fn test_parity() {
        assert!(even_parity(0x00));
        assert!(!even_parity(0x01));
        assert!(even_parity(0x03));
        assert!(even_parity(0xFF));
    }

    #[test]
    fn test_set_clear_bit() {
        assert_eq!(set_bit(0x00, 7), 0x80);
        assert_eq!(clear_bit(0xFF, 0), 0xFE);
        assert!(test_bit(0x10, 4));
        assert!(!test_bit(0x10, 3));
    }
}
