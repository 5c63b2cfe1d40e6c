//! Fixed-point arithmetic.
//!
//! All computation is integer-only and truncating. Products that can exceed
//! 128 bits are computed at full 256-bit width and divided back down; every
//! helper returns `None` instead of wrapping.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::WAD;

const LOW_MASK: u128 = u64::MAX as u128;

/// Unsigned 256-bit integer as two 128-bit words.
///
/// Only the operations the points accumulator needs: add, sub, multiply by
/// a `u128`, divide by a `u128`, and read the high word (divide by `2^128`).
/// Field order makes the derived ordering numeric.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord,
    bincode::Encode, bincode::Decode,
)]
pub struct U256 {
    pub hi: u128,
    pub lo: u128,
}

impl U256 {
    pub const ZERO: Self = Self { hi: 0, lo: 0 };

    pub const fn from_u128(v: u128) -> Self {
        Self { hi: 0, lo: v }
    }

    /// `v * 2^128`.
    pub const fn from_high(v: u128) -> Self {
        Self { hi: v, lo: 0 }
    }

    /// `floor(self / 2^128)`.
    pub const fn high(&self) -> u128 {
        self.hi
    }

    pub const fn is_zero(&self) -> bool {
        self.hi == 0 && self.lo == 0
    }

    /// Narrow to `u128`, `None` if the high word is set.
    pub fn to_u128(self) -> Option<u128> {
        if self.hi == 0 { Some(self.lo) } else { None }
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        let (lo, carry) = self.lo.overflowing_add(rhs.lo);
        let hi = self.hi.checked_add(rhs.hi)?.checked_add(carry as u128)?;
        Some(Self { hi, lo })
    }

    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        let (lo, borrow) = self.lo.overflowing_sub(rhs.lo);
        let hi = self.hi.checked_sub(rhs.hi)?.checked_sub(borrow as u128)?;
        Some(Self { hi, lo })
    }

    pub fn checked_mul_u128(self, rhs: u128) -> Option<Self> {
        let low = full_mul(self.lo, rhs);
        let high = full_mul(self.hi, rhs);
        if high.hi != 0 {
            return None;
        }
        let hi = low.hi.checked_add(high.lo)?;
        Some(Self { hi, lo: low.lo })
    }

    /// Truncating division by a `u128`. `None` on a zero divisor.
    pub fn checked_div_u128(self, d: u128) -> Option<Self> {
        if d == 0 {
            return None;
        }
        let hi = self.hi / d;
        let (lo, _) = div_wide(self.hi % d, self.lo, d);
        Some(Self { hi, lo })
    }
}

impl fmt::Display for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hi == 0 {
            write!(f, "{}", self.lo)
        } else {
            write!(f, "0x{:x}{:032x}", self.hi, self.lo)
        }
    }
}

/// Full 128x128 -> 256-bit product.
pub fn full_mul(a: u128, b: u128) -> U256 {
    let (a0, a1) = (a & LOW_MASK, a >> 64);
    let (b0, b1) = (b & LOW_MASK, b >> 64);

    let p00 = a0 * b0;
    let p01 = a0 * b1;
    let p10 = a1 * b0;
    let p11 = a1 * b1;

    // Each term is below 2^64, so the sum cannot overflow.
    let mid = (p00 >> 64) + (p01 & LOW_MASK) + (p10 & LOW_MASK);
    let lo = (p00 & LOW_MASK) | ((mid & LOW_MASK) << 64);
    let hi = p11 + (p01 >> 64) + (p10 >> 64) + (mid >> 64);
    U256 { hi, lo }
}

/// Divide the 256-bit value `hi:lo` by `d`, requiring `hi < d`.
///
/// Restoring shift-subtract division. Returns `(quotient, remainder)`.
fn div_wide(hi: u128, lo: u128, d: u128) -> (u128, u128) {
    debug_assert!(hi < d);
    let mut rem = hi;
    let mut quot: u128 = 0;
    for i in (0..128).rev() {
        let carry = rem >> 127;
        rem = (rem << 1) | ((lo >> i) & 1);
        quot <<= 1;
        if carry == 1 || rem >= d {
            rem = rem.wrapping_sub(d);
            quot |= 1;
        }
    }
    (quot, rem)
}

/// `floor(a * b / d)` with a 256-bit intermediate.
///
/// Returns `None` when `d == 0` or the quotient does not fit in `u128`.
pub fn mul_div(a: u128, b: u128, d: u128) -> Option<u128> {
    if d == 0 {
        return None;
    }
    if let Some(p) = a.checked_mul(b) {
        return Some(p / d);
    }
    full_mul(a, b).checked_div_u128(d)?.to_u128()
}

/// `floor(amount * wad / WAD)`: apply a WAD-scaled factor to an amount.
pub fn wad_mul(amount: u128, wad: u128) -> Option<u128> {
    mul_div(amount, wad, WAD)
}

/// Parse a decimal string (`"1.5"`, `"0.65"`, `"3"`) into a WAD value.
///
/// At most 18 fractional digits. Returns `None` on anything else.
///
/// # Examples
///
/// ```
/// use tlock_core::math::parse_wad;
/// assert_eq!(parse_wad("1.5"), Some(1_500_000_000_000_000_000));
/// assert_eq!(parse_wad("0.65"), Some(650_000_000_000_000_000));
/// assert_eq!(parse_wad("abc"), None);
/// ```
pub fn parse_wad(s: &str) -> Option<u128> {
    let s = s.trim();
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, f),
        None => (s, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if frac_part.len() > 18 || !frac_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let int_value: u128 = if int_part.is_empty() {
        0
    } else {
        if !int_part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        int_part.parse().ok()?
    };
    let frac_value: u128 = if frac_part.is_empty() {
        0
    } else {
        let padded = format!("{frac_part:0<18}");
        padded.parse().ok()?
    };
    int_value.checked_mul(WAD)?.checked_add(frac_value)
}

/// Render a WAD value as a decimal string without trailing zeros.
///
/// # Examples
///
/// ```
/// use tlock_core::math::format_wad;
/// assert_eq!(format_wad(2_500_000_000_000_000_000), "2.5");
/// assert_eq!(format_wad(99_999_999_999_999_999_999), "99.999999999999999999");
/// ```
pub fn format_wad(value: u128) -> String {
    let int_part = value / WAD;
    let frac_part = value % WAD;
    if frac_part == 0 {
        return int_part.to_string();
    }
    let frac = format!("{frac_part:018}");
    format!("{int_part}.{}", frac.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn full_mul_max_values() {
        // (2^128 - 1)^2 = 2^256 - 2^129 + 1
        let p = full_mul(u128::MAX, u128::MAX);
        assert_eq!(p.hi, u128::MAX - 1);
        assert_eq!(p.lo, 1);
    }

    #[test]
    fn full_mul_small_values() {
        assert_eq!(full_mul(6, 7), U256::from_u128(42));
        assert_eq!(full_mul(0, u128::MAX), U256::ZERO);
    }

    #[test]
    fn full_mul_crosses_word_boundary() {
        // 2^64 * 2^64 = 2^128
        let p = full_mul(1u128 << 64, 1u128 << 64);
        assert_eq!(p, U256::from_high(1));
    }

    #[test]
    fn mul_div_exact_and_truncating() {
        assert_eq!(mul_div(10, 25, 10), Some(25));
        assert_eq!(mul_div(10, 3, 4), Some(7));
        assert_eq!(mul_div(1, 1, 0), None);
    }

    #[test]
    fn mul_div_wide_intermediate() {
        // 1e24 * 11e18 overflows u128 but the quotient fits.
        let amount = 1_000_000 * WAD;
        let mult = 11 * WAD;
        assert_eq!(mul_div(amount, mult, WAD), Some(11_000_000 * WAD));
    }

    #[test]
    fn mul_div_quotient_overflow() {
        assert_eq!(mul_div(u128::MAX, u128::MAX, 1), None);
    }

    #[test]
    fn high_word_is_division_by_two_pow_128() {
        let x = U256 { hi: 5, lo: u128::MAX };
        assert_eq!(x.high(), 5);
    }

    #[test]
    fn add_sub_carry() {
        let a = U256 { hi: 0, lo: u128::MAX };
        let b = U256::from_u128(1);
        let sum = a.checked_add(b).unwrap();
        assert_eq!(sum, U256::from_high(1));
        assert_eq!(sum.checked_sub(b).unwrap(), a);
        assert_eq!(b.checked_sub(a), None);
        assert_eq!(U256 { hi: u128::MAX, lo: u128::MAX }.checked_add(b), None);
    }

    #[test]
    fn div_by_zero_is_none() {
        assert_eq!(U256::from_u128(5).checked_div_u128(0), None);
    }

    #[test]
    fn points_per_share_truncates_one_unit() {
        // 100 units over 1337 shares, scaled by 2^128, then back: 100 - 1 wei.
        let amount = 100 * WAD;
        let shares = 1337 * WAD;
        let pps = U256::from_high(amount).checked_div_u128(shares).unwrap();
        let earned = pps.checked_mul_u128(shares).unwrap().high();
        assert_eq!(earned, amount - 1);
    }

    #[test]
    fn parse_and_format_wad() {
        assert_eq!(parse_wad("0"), Some(0));
        assert_eq!(parse_wad("5"), Some(5 * WAD));
        assert_eq!(parse_wad(".5"), Some(WAD / 2));
        assert_eq!(parse_wad("1.000000000000000001"), Some(WAD + 1));
        assert_eq!(parse_wad("1.0000000000000000001"), None);
        assert_eq!(parse_wad("-1"), None);
        assert_eq!(parse_wad(""), None);
        assert_eq!(parse_wad("."), None);
        assert_eq!(format_wad(0), "0");
        assert_eq!(format_wad(WAD / 4), "0.25");
    }

    #[test]
    fn display_u256() {
        assert_eq!(U256::from_u128(42).to_string(), "42");
        assert_eq!(U256::from_high(1).to_string(), format!("0x1{:032x}", 0));
    }

    // --- proptest ---

    proptest! {
        #[test]
        fn mul_div_matches_native(a in 0u128..u64::MAX as u128, b in 0u128..u64::MAX as u128, d in 1u128..u64::MAX as u128) {
            prop_assert_eq!(mul_div(a, b, d), Some(a * b / d));
        }

        #[test]
        fn division_reconstructs(hi in any::<u128>(), lo in any::<u128>(), d in 1u128..=u128::MAX) {
            let x = U256 { hi, lo };
            let q = x.checked_div_u128(d).unwrap();
            let back = q.checked_mul_u128(d).unwrap();
            prop_assert!(back <= x);
            let rem = x.checked_sub(back).unwrap();
            prop_assert!(rem < U256::from_u128(d));
        }

        #[test]
        fn full_mul_commutes(a in any::<u128>(), b in any::<u128>()) {
            prop_assert_eq!(full_mul(a, b), full_mul(b, a));
        }

        #[test]
        fn wad_roundtrip(v in 0u128..1_000_000_000u128 * WAD) {
            prop_assert_eq!(parse_wad(&format_wad(v)), Some(v));
        }
    }
}
