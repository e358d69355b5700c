//! Deterministic double-precision arithmetic
//!
//! Programs switch the rounding mode at run time (CFROUND). Instead of
//! reprogramming the host FPU, every operation is computed with the host's
//! round-to-nearest arithmetic and then corrected by one ulp using the exact
//! residual of the operation:
//!
//! - add/sub: TwoSum error term
//! - mul: `fma(a, b, -p)`
//! - div: `fma(-q, b, a)`, signed by the divisor
//! - sqrt: `fma(-s, s, a)`
//!
//! The result is bit-identical to IEEE-754 binary64 arithmetic in the
//! selected rounding mode for all normal operands.

use serde::{Deserialize, Serialize};

pub const MANTISSA_SIZE: u32 = 52;
pub const MANTISSA_MASK: u64 = (1 << MANTISSA_SIZE) - 1;
pub const EXPONENT_MASK: u64 = 0x7FF;
pub const EXPONENT_BIAS: u64 = 1023;
pub const DYNAMIC_EXPONENT_BITS: u32 = 4;
pub const STATIC_EXPONENT_BITS: u32 = 4;
pub const CONST_EXPONENT_BITS: u64 = 0x300;
pub const DYNAMIC_MANTISSA_MASK: u64 = (1 << (MANTISSA_SIZE + DYNAMIC_EXPONENT_BITS)) - 1;

/// Sign and exponent bits flipped by FSCAL_R
pub const SCALE_MASK: u64 = 0x80F0_0000_0000_0000;

const MASK_22_BIT: u64 = (1 << 22) - 1;

/// Rounding mode selected by CFROUND
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoundingMode {
    #[default]
    Nearest,
    Down,
    Up,
    TowardZero,
}

impl RoundingMode {
    /// Mode encoded in the low two bits
    #[inline]
    pub fn from_bits(bits: u64) -> Self {
        match bits & 3 {
            0 => Self::Nearest,
            1 => Self::Down,
            2 => Self::Up,
            _ => Self::TowardZero,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::Down => "down",
            Self::Up => "up",
            Self::TowardZero => "toward-zero",
        }
    }
}

#[inline]
fn next_up(x: f64) -> f64 {
    if x == 0.0 {
        return f64::from_bits(1);
    }
    let bits = x.to_bits();
    if x > 0.0 {
        f64::from_bits(bits + 1)
    } else {
        f64::from_bits(bits - 1)
    }
}

#[inline]
fn next_down(x: f64) -> f64 {
    -next_up(-x)
}

/// Move `nearest` one ulp toward the exact result when the mode requires it.
/// `residual` carries the sign of `exact - nearest`.
#[inline]
fn correct(nearest: f64, residual: f64, mode: RoundingMode) -> f64 {
    if residual == 0.0 || residual.is_nan() {
        return nearest;
    }
    match mode {
        RoundingMode::Nearest => nearest,
        RoundingMode::Down if residual < 0.0 => next_down(nearest),
        RoundingMode::Up if residual > 0.0 => next_up(nearest),
        RoundingMode::TowardZero if nearest > 0.0 && residual < 0.0 => next_down(nearest),
        RoundingMode::TowardZero if nearest < 0.0 && residual > 0.0 => next_up(nearest),
        _ => nearest,
    }
}

/// Infinite result from finite operands: directed modes saturate at MAX
#[inline]
fn overflow(inf: f64, mode: RoundingMode) -> f64 {
    let saturate = match mode {
        RoundingMode::Nearest => false,
        RoundingMode::Down => inf > 0.0,
        RoundingMode::Up => inf < 0.0,
        RoundingMode::TowardZero => true,
    };
    if saturate {
        f64::MAX.copysign(inf)
    } else {
        inf
    }
}

/// Nonzero exact result that rounded to zero under round-to-nearest
#[inline]
fn underflow(negative: bool, mode: RoundingMode) -> f64 {
    match (mode, negative) {
        (RoundingMode::Up, false) => f64::from_bits(1),
        (RoundingMode::Down, true) => -f64::from_bits(1),
        (_, true) => -0.0,
        (_, false) => 0.0,
    }
}

pub fn add(a: f64, b: f64, mode: RoundingMode) -> f64 {
    let sum = a + b;
    if mode == RoundingMode::Nearest || a.is_nan() || b.is_nan() {
        return sum;
    }
    if sum.is_infinite() {
        return if a.is_finite() && b.is_finite() { overflow(sum, mode) } else { sum };
    }
    if sum == 0.0 {
        // Exact zero: opposite-signed operands give -0 when rounding down
        let both_positive_zero = a == 0.0 && b == 0.0 && a.is_sign_positive() && b.is_sign_positive();
        return if mode == RoundingMode::Down && !both_positive_zero { -0.0 } else { sum };
    }
    let b_virtual = sum - a;
    let residual = (a - (sum - b_virtual)) + (b - b_virtual);
    correct(sum, residual, mode)
}

#[inline]
pub fn sub(a: f64, b: f64, mode: RoundingMode) -> f64 {
    add(a, -b, mode)
}

pub fn mul(a: f64, b: f64, mode: RoundingMode) -> f64 {
    let product = a * b;
    if mode == RoundingMode::Nearest || !a.is_finite() || !b.is_finite() {
        return product;
    }
    if product.is_infinite() {
        return overflow(product, mode);
    }
    if product == 0.0 {
        if a == 0.0 || b == 0.0 {
            return product;
        }
        return underflow(product.is_sign_negative(), mode);
    }
    // residual may itself underflow for subnormal products
    correct(product, a.mul_add(b, -product), mode)
}

pub fn div(a: f64, b: f64, mode: RoundingMode) -> f64 {
    let quotient = a / b;
    if mode == RoundingMode::Nearest || b == 0.0 || !a.is_finite() || !b.is_finite() {
        return quotient;
    }
    if quotient.is_infinite() {
        return overflow(quotient, mode);
    }
    if quotient == 0.0 {
        if a == 0.0 {
            return quotient;
        }
        return underflow(quotient.is_sign_negative(), mode);
    }
    let remainder = (-quotient).mul_add(b, a);
    let residual = if b > 0.0 { remainder } else { -remainder };
    correct(quotient, residual, mode)
}

pub fn sqrt(a: f64, mode: RoundingMode) -> f64 {
    let root = a.sqrt();
    if mode == RoundingMode::Nearest || !root.is_finite() || root == 0.0 {
        return root;
    }
    correct(root, (-root).mul_add(root, a), mode)
}

/// Two double-precision lanes operated on together
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FloatPair {
    pub lo: f64,
    pub hi: f64,
}

impl FloatPair {
    #[inline]
    pub const fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    #[inline]
    pub fn from_bits(bits: [u64; 2]) -> Self {
        Self::new(f64::from_bits(bits[0]), f64::from_bits(bits[1]))
    }

    #[inline]
    pub fn to_bits(self) -> [u64; 2] {
        [self.lo.to_bits(), self.hi.to_bits()]
    }

    /// Convert two packed signed 32-bit integers (low word first)
    #[inline]
    pub fn from_i32_pair(word: u64) -> Self {
        Self::new((word as u32 as i32) as f64, ((word >> 32) as u32 as i32) as f64)
    }

    #[inline]
    pub fn add(self, other: Self, mode: RoundingMode) -> Self {
        Self::new(add(self.lo, other.lo, mode), add(self.hi, other.hi, mode))
    }

    #[inline]
    pub fn sub(self, other: Self, mode: RoundingMode) -> Self {
        Self::new(sub(self.lo, other.lo, mode), sub(self.hi, other.hi, mode))
    }

    #[inline]
    pub fn mul(self, other: Self, mode: RoundingMode) -> Self {
        Self::new(mul(self.lo, other.lo, mode), mul(self.hi, other.hi, mode))
    }

    #[inline]
    pub fn div(self, other: Self, mode: RoundingMode) -> Self {
        Self::new(div(self.lo, other.lo, mode), div(self.hi, other.hi, mode))
    }

    #[inline]
    pub fn sqrt(self, mode: RoundingMode) -> Self {
        Self::new(sqrt(self.lo, mode), sqrt(self.hi, mode))
    }

    #[inline]
    pub fn swap(self) -> Self {
        Self::new(self.hi, self.lo)
    }

    /// XOR the same mask into both lanes
    #[inline]
    pub fn xor_mask(self, mask: u64) -> Self {
        let [lo, hi] = self.to_bits();
        Self::from_bits([lo ^ mask, hi ^ mask])
    }

    /// Lane-wise XOR of the bit patterns
    #[inline]
    pub fn xor(self, other: Self) -> Self {
        let [a_lo, a_hi] = self.to_bits();
        let [b_lo, b_hi] = other.to_bits();
        Self::from_bits([a_lo ^ b_lo, a_hi ^ b_hi])
    }

    /// Keep the low mantissa and dynamic exponent bits, then force the
    /// program's exponent window
    #[inline]
    pub fn mask_exponent_mantissa(self, e_mask: [u64; 2]) -> Self {
        let [lo, hi] = self.to_bits();
        Self::from_bits([
            (lo & DYNAMIC_MANTISSA_MASK) | e_mask[0],
            (hi & DYNAMIC_MANTISSA_MASK) | e_mask[1],
        ])
    }
}

/// Bits of a positive double with a small exponent, built from entropy
pub fn small_positive_float_bits(entropy: u64) -> u64 {
    let exponent = ((entropy >> 59) + EXPONENT_BIAS) & EXPONENT_MASK;
    (exponent << MANTISSA_SIZE) | (entropy & MANTISSA_MASK)
}

/// Fixed exponent bits of the E bank window
pub fn static_exponent(entropy: u64) -> u64 {
    let exponent = CONST_EXPONENT_BITS
        | ((entropy >> (64 - STATIC_EXPONENT_BITS)) << DYNAMIC_EXPONENT_BITS);
    exponent << MANTISSA_SIZE
}

/// One lane of the E bank exponent/mantissa mask
pub fn float_mask(entropy: u64) -> u64 {
    (entropy & MASK_22_BIT) | static_exponent(entropy)
}

/// Check that host arithmetic is binary64 with round-to-nearest and exact fma.
///
/// Returns the name of the first failing check.
pub fn verify_platform() -> std::result::Result<(), &'static str> {
    let big = f64::from_bits(0x50CD_6EF8_BD06_71B2);
    let small = -2_110_701_072i64 as f64;

    if add(small, big, RoundingMode::Nearest).to_bits() != 0x50CD_6EF8_BD06_71B2 {
        return Err("add/nearest");
    }
    if add(small, big, RoundingMode::Down).to_bits() != 0x50CD_6EF8_BD06_71B1 {
        return Err("add/down");
    }
    if add(0.1, 0.2, RoundingMode::Nearest).to_bits() != 0x3FD3_3333_3333_3334 {
        return Err("add/tie");
    }
    if div(1.0, 3.0, RoundingMode::Up).to_bits() != 0x3FD5_5555_5555_5556 {
        return Err("div/up");
    }
    if sqrt(2.0, RoundingMode::TowardZero).to_bits() != 0x3FF6_A09E_667F_3BCC {
        return Err("sqrt/toward-zero");
    }
    if mul(3.0, 1.0 / 3.0, RoundingMode::Down).to_bits() != 0x3FEF_FFFF_FFFF_FFFF {
        return Err("mul/fma");
    }
    Ok(())
}
