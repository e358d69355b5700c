//! Integer arithmetic core
//!
//! All operations are total: no overflow traps, no division faults.

/// High 64 bits of the unsigned 128-bit product
#[inline]
pub fn mulh(a: u64, b: u64) -> u64 {
    ((a as u128 * b as u128) >> 64) as u64
}

/// High 64 bits of the signed 128-bit product
#[inline]
pub fn smulh(a: u64, b: u64) -> u64 {
    ((a as i64 as i128 * b as i64 as i128) >> 64) as u64
}

/// Sign-extend a 32-bit two's complement immediate to 64 bits
#[inline]
pub const fn sign_extend(imm: u32) -> u64 {
    imm as i32 as i64 as u64
}

/// Unsigned 64-by-32 division; a zero divisor is replaced by 1
#[inline]
pub fn div_u64_u32(dividend: u64, divisor: u32) -> u64 {
    let divisor = if divisor == 0 { 1 } else { divisor };
    dividend / divisor as u64
}

#[inline]
pub fn is_zero_or_power_of_two(x: u32) -> bool {
    x & x.wrapping_sub(1) == 0
}

/// Fixed-point reciprocal `2^(63 + bits(divisor)) / divisor`, truncated to 64 bits.
///
/// Only meaningful when `divisor` is neither zero nor a power of two.
pub fn reciprocal(divisor: u32) -> u64 {
    debug_assert!(!is_zero_or_power_of_two(divisor));

    const P2EXP63: u64 = 1 << 63;
    let quotient = div_u64_u32(P2EXP63, divisor);
    let remainder = P2EXP63 - quotient * divisor as u64;
    let shift = u32::BITS - divisor.leading_zeros();

    (quotient << shift).wrapping_add(div_u64_u32(remainder << shift, divisor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_carry() {
        assert_eq!(0xFFFF_FFFFu64.wrapping_add(1), 0x1_0000_0000);
    }

    #[test]
    fn test_mul_low() {
        assert_eq!(
            0xBC55_0E96_BA88_A72Bu64.wrapping_mul(0xF539_1FA9_F18D_6273),
            0x2872_3424_A910_8E51
        );
    }

    #[test]
    fn test_mulh() {
        assert_eq!(
            mulh(0xBC55_0E96_BA88_A72B, 0xF539_1FA9_F18D_6273),
            0xB467_6D31_D2B3_4883
        );
        assert_eq!(mulh(u64::MAX, u64::MAX), u64::MAX - 1);
        assert_eq!(mulh(1 << 32, 1 << 32), 1);
    }

    #[test]
    fn test_smulh() {
        assert_eq!(
            smulh(0xBC55_0E96_BA88_A72B, 0xF539_1FA9_F18D_6273),
            0x02D9_3EF1_269D_3EE5
        );
        // -1 * 1 = -1 -> high word all ones
        assert_eq!(smulh(u64::MAX, 1), u64::MAX);
    }

    #[test]
    fn test_div_u64_u32() {
        assert_eq!(div_u64_u32(8774217225983458895, 3014068202), 2911087818);
        assert_eq!(div_u64_u32(8774217225983458895, 0), 8774217225983458895);
        // divisor is taken as its low 32 bits
        assert_eq!(div_u64_u32(3014068202, 8774217225983458895u64 as u32), 2);
    }

    #[test]
    fn test_sign_extend() {
        assert_eq!(sign_extend(0xFFFF_FFFF), u64::MAX);
        assert_eq!(sign_extend(0x7FFF_FFFF), 0x7FFF_FFFF);
        assert_eq!(sign_extend(0x8000_0000), 0xFFFF_FFFF_8000_0000);
    }

    #[test]
    fn test_reciprocal() {
        assert_eq!(reciprocal(3), 12297829382473034410);
        assert_eq!(reciprocal(13), 11351842506898185609);
        assert_eq!(reciprocal(33), 17887751829051686415);
        assert_eq!(reciprocal(65537), 18446462603027742720);
        assert_eq!(reciprocal(15000001), 10316166306300415204);
        assert_eq!(reciprocal(3845182035), 10302264209224146340);
        assert_eq!(reciprocal(0xFFFF_FFFF), 9223372039002259456);
    }

    #[test]
    fn test_is_zero_or_power_of_two() {
        assert!(is_zero_or_power_of_two(0));
        assert!(is_zero_or_power_of_two(1));
        assert!(is_zero_or_power_of_two(1 << 31));
        assert!(!is_zero_or_power_of_two(3));
        assert!(!is_zero_or_power_of_two(u32::MAX));
    }
}
