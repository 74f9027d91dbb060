//! 36-bit and 72-bit ones-complement words.
//!
//! Bits are numbered the way the architecture documents them: bit 0 is the
//! most significant bit of the word and bit 35 the least significant one. A
//! word is stored right-justified in a native integer and every public
//! operation masks its result back to the architectural width.
//!
//! Ones-complement has two representations of zero. Raw equality (`==`)
//! compares bit patterns, so `+0 != -0`; use [`Word36::is_zero`] or
//! [`Word36::compare`] wherever the architecture treats both zeros alike.

use std::cmp::Ordering;

use parse_display::Display;
use thiserror::Error;

/// Mask of the 36 significant bits of a word
pub const MASK36: u64 = 0o777_777_777_777;

/// Sign bit (bit 0) of a 36-bit word
pub const SIGN_BIT36: u64 = 0o400_000_000_000;

/// Mask of the 72 significant bits of a double word
pub const MASK72: u128 = (1 << 72) - 1;

/// Sign bit (bit 0) of a 72-bit double word
pub const SIGN_BIT72: u128 = 1 << 71;

/// Largest magnitude a 36-bit ones-complement word can hold
pub const MAX_MAGNITUDE36: i64 = (1 << 35) - 1;

/// Largest magnitude a 72-bit ones-complement double word can hold
pub const MAX_MAGNITUDE72: i128 = (1 << 71) - 1;

/// Errors reported by the divide primitives
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticError {
    #[error("division by zero")]
    DivideByZero,

    #[error("quotient does not fit in the destination")]
    QuotientOverflow,
}

/// Result of a ones-complement addition or subtraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddResult<T> {
    pub sum: T,

    /// End-around carry out of the sign bit
    pub carry: bool,

    /// Both operands had the same sign and the sum's sign differs
    pub overflow: bool,
}

/// Result of a successful division
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DivideResult {
    pub quotient: Word36,
    pub remainder: Word36,
}

/// Named sub-fields of a word.
///
/// Each field is a fixed bit range; the discriminant-free representation
/// keeps the field table in [`Field::range`].
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    W,
    H1,
    H2,
    T1,
    T2,
    T3,
    Q1,
    Q2,
    Q3,
    Q4,
    S1,
    S2,
    S3,
    S4,
    S5,
    S6,
}

impl Field {
    /// Every named field, whole word first
    pub const ALL: [Field; 16] = [
        Field::W,
        Field::H1,
        Field::H2,
        Field::T1,
        Field::T2,
        Field::T3,
        Field::Q1,
        Field::Q2,
        Field::Q3,
        Field::Q4,
        Field::S1,
        Field::S2,
        Field::S3,
        Field::S4,
        Field::S5,
        Field::S6,
    ];

    /// First bit (architectural numbering) and width of the field
    #[must_use]
    pub const fn range(self) -> (u32, u32) {
        match self {
            Field::W => (0, 36),
            Field::H1 => (0, 18),
            Field::H2 => (18, 18),
            Field::T1 => (0, 12),
            Field::T2 => (12, 12),
            Field::T3 => (24, 12),
            Field::Q1 => (0, 9),
            Field::Q2 => (9, 9),
            Field::Q3 => (18, 9),
            Field::Q4 => (27, 9),
            Field::S1 => (0, 6),
            Field::S2 => (6, 6),
            Field::S3 => (12, 6),
            Field::S4 => (18, 6),
            Field::S5 => (24, 6),
            Field::S6 => (30, 6),
        }
    }

    #[must_use]
    pub const fn width(self) -> u32 {
        self.range().1
    }

    /// Right-justified mask covering the field's width
    #[must_use]
    pub const fn mask(self) -> u64 {
        width_mask(self.width())
    }

    /// Distance between the field's low-order bit and bit 35
    #[must_use]
    pub const fn shift(self) -> u32 {
        let (first, width) = self.range();
        36 - first - width
    }
}

/// Right-justified mask of `width` bits
#[must_use]
pub const fn width_mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1 << width) - 1
    }
}

/// Ones-complement addition of two values of an arbitrary width (at most 63 bits).
///
/// Used for the 18-bit half-word and 12-bit third-word adders as well as for
/// index-register arithmetic.
#[must_use]
pub fn ones_complement_add(a: u64, b: u64, width: u32) -> u64 {
    let mask = width_mask(width);
    let (a, b) = (a & mask, b & mask);
    let raw = a + b;
    let sum = if raw > mask { (raw & mask) + 1 } else { raw };
    if sum == mask && !(a == mask && b == mask) {
        0
    } else {
        sum
    }
}

/// Ones-complement negation of a value of an arbitrary width
#[must_use]
pub const fn ones_complement_negate(value: u64, width: u32) -> u64 {
    !value & width_mask(width)
}

/// Interpret a `width`-bit ones-complement value as a native signed integer
#[must_use]
pub const fn ones_complement_to_i64(value: u64, width: u32) -> i64 {
    let mask = width_mask(width);
    let value = value & mask;
    if (value >> (width - 1)) & 1 == 1 {
        -((!value & mask) as i64)
    } else {
        value as i64
    }
}

/// A 36-bit ones-complement word
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Word36(u64);

macro_rules! field_accessors {
    ($($field:ident => $get:ident, $set:ident;)*) => {
        $(
            #[doc = concat!("Value of the `", stringify!($field), "` field")]
            #[must_use]
            pub const fn $get(self) -> u64 {
                (self.0 >> Field::$field.shift()) & Field::$field.mask()
            }

            #[doc = concat!("Copy of the word with the `", stringify!($field), "` field replaced")]
            #[must_use]
            pub const fn $set(self, value: u64) -> Self {
                let shift = Field::$field.shift();
                let mask = Field::$field.mask() << shift;
                Self((self.0 & !mask) | ((value << shift) & mask))
            }
        )*
    };
}

impl Word36 {
    pub const POSITIVE_ZERO: Self = Self(0);
    pub const NEGATIVE_ZERO: Self = Self(MASK36);
    pub const POSITIVE_ONE: Self = Self(1);
    pub const NEGATIVE_ONE: Self = Self(MASK36 - 1);

    /// Build a word from a raw bit pattern, dropping anything above bit 35
    #[must_use]
    pub const fn new(bits: u64) -> Self {
        Self(bits & MASK36)
    }

    /// Raw bit pattern, always below `1 << 36`
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Ones-complement encoding of a native integer.
    ///
    /// Magnitudes above [`MAX_MAGNITUDE36`] are truncated to 36 bits.
    #[must_use]
    pub const fn from_i64(value: i64) -> Self {
        if value < 0 {
            Self::new(!value.unsigned_abs())
        } else {
            Self::new(value as u64)
        }
    }

    /// Native value of the word; both zeros map to `0`
    #[must_use]
    pub const fn to_i64(self) -> i64 {
        ones_complement_to_i64(self.0, 36)
    }

    field_accessors! {
        H1 => h1, with_h1;
        H2 => h2, with_h2;
        T1 => t1, with_t1;
        T2 => t2, with_t2;
        T3 => t3, with_t3;
        Q1 => q1, with_q1;
        Q2 => q2, with_q2;
        Q3 => q3, with_q3;
        Q4 => q4, with_q4;
        S1 => s1, with_s1;
        S2 => s2, with_s2;
        S3 => s3, with_s3;
        S4 => s4, with_s4;
        S5 => s5, with_s5;
        S6 => s6, with_s6;
    }

    /// Extract a named field, right-justified
    #[must_use]
    pub const fn get(self, field: Field) -> u64 {
        (self.0 >> field.shift()) & field.mask()
    }

    /// Copy of the word with `field` replaced by the low bits of `value`
    #[must_use]
    pub const fn with(self, field: Field, value: u64) -> Self {
        let shift = field.shift();
        let mask = field.mask() << shift;
        Self((self.0 & !mask) | ((value << shift) & mask))
    }

    /// Extract a field and sign-extend it to a full word
    #[must_use]
    pub const fn get_extended(self, field: Field) -> Self {
        Self::sign_extend(self.get(field), field.width())
    }

    /// Sign-extend the low `width` bits of `value` to 36 bits
    #[must_use]
    pub const fn sign_extend(value: u64, width: u32) -> Self {
        let mask = width_mask(width);
        let value = value & mask;
        if (value >> (width - 1)) & 1 == 1 {
            Self::new(value | (MASK36 & !mask))
        } else {
            Self::new(value)
        }
    }

    #[must_use]
    pub const fn xh1(self) -> Self {
        self.get_extended(Field::H1)
    }

    #[must_use]
    pub const fn xh2(self) -> Self {
        self.get_extended(Field::H2)
    }

    #[must_use]
    pub const fn xt1(self) -> Self {
        self.get_extended(Field::T1)
    }

    #[must_use]
    pub const fn xt2(self) -> Self {
        self.get_extended(Field::T2)
    }

    #[must_use]
    pub const fn xt3(self) -> Self {
        self.get_extended(Field::T3)
    }

    /// Value of a single bit, architectural numbering
    #[must_use]
    pub const fn bit(self, bit: u32) -> bool {
        (self.0 >> (35 - bit)) & 1 == 1
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 & SIGN_BIT36 != 0
    }

    #[must_use]
    pub const fn is_positive(self) -> bool {
        !self.is_negative()
    }

    #[must_use]
    pub const fn is_positive_zero(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn is_negative_zero(self) -> bool {
        self.0 == MASK36
    }

    /// True for both representations of zero
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.is_positive_zero() || self.is_negative_zero()
    }

    #[must_use]
    pub const fn negate(self) -> Self {
        Self(!self.0 & MASK36)
    }

    /// Absolute value; `-0` becomes `+0`
    #[must_use]
    pub const fn magnitude(self) -> Self {
        if self.is_negative() {
            self.negate()
        } else {
            self
        }
    }

    /// Ones-complement addition with end-around carry.
    ///
    /// The result is negative zero only when both addends are negative zero.
    #[must_use]
    pub fn add(self, other: Self) -> AddResult<Self> {
        let raw = self.0 + other.0;
        let carry = raw > MASK36;
        let mut sum = if carry { (raw & MASK36) + 1 } else { raw };
        if sum == MASK36 && !(self.is_negative_zero() && other.is_negative_zero()) {
            sum = 0;
        }

        let sum = Self(sum);
        let overflow =
            self.is_negative() == other.is_negative() && sum.is_negative() != self.is_negative();

        AddResult {
            sum,
            carry,
            overflow,
        }
    }

    /// Ones-complement subtraction, computed as `self + (-other)`
    #[must_use]
    pub fn subtract(self, other: Self) -> AddResult<Self> {
        self.add(other.negate())
    }

    /// Full 72-bit product
    #[must_use]
    pub fn multiply(self, other: Self) -> DoubleWord72 {
        let product = i128::from(self.to_i64()) * i128::from(other.to_i64());
        DoubleWord72::from_i128(product)
    }

    /// Single-width division; the dividend is sign-extended to 72 bits
    ///
    /// # Errors
    ///
    /// Fails with [`ArithmeticError::DivideByZero`] if the divisor is either zero.
    pub fn divide(self, divisor: Self) -> Result<DivideResult, ArithmeticError> {
        DoubleWord72::sign_extend(self).divide(divisor)
    }

    /// Ones-complement ordering: both zeros compare equal
    #[must_use]
    pub fn compare(self, other: Self) -> Ordering {
        self.to_i64().cmp(&other.to_i64())
    }

    #[must_use]
    pub const fn shift_left_circular(self, count: u32) -> Self {
        let count = count % 36;
        Self(((self.0 << count) | (self.0 >> (36 - count))) & MASK36)
    }

    #[must_use]
    pub const fn shift_right_circular(self, count: u32) -> Self {
        self.shift_left_circular(36 - count % 36)
    }

    #[must_use]
    pub const fn shift_left_logical(self, count: u32) -> Self {
        if count >= 36 {
            Self::POSITIVE_ZERO
        } else {
            Self((self.0 << count) & MASK36)
        }
    }

    #[must_use]
    pub const fn shift_right_logical(self, count: u32) -> Self {
        if count >= 36 {
            Self::POSITIVE_ZERO
        } else {
            Self(self.0 >> count)
        }
    }

    /// Right shift propagating the sign bit
    #[must_use]
    pub const fn shift_right_algebraic(self, count: u32) -> Self {
        if count >= 36 {
            if self.is_negative() {
                Self::NEGATIVE_ZERO
            } else {
                Self::POSITIVE_ZERO
            }
        } else if self.is_negative() {
            Self(((self.0 >> count) | (MASK36 << (36 - count))) & MASK36)
        } else {
            Self(self.0 >> count)
        }
    }

    /// Rotate left until bit 0 and bit 1 differ.
    ///
    /// Returns the normalized word and the rotation count. A word made of a
    /// single repeated bit (either zero) cannot be normalized and yields a
    /// count of 35 with the word unchanged.
    #[must_use]
    pub const fn normalize(self) -> (Self, u32) {
        if self.is_zero() {
            return (self, 35);
        }

        let mut count = 0;
        let mut word = self;
        while word.bit(0) == word.bit(1) {
            word = word.shift_left_circular(1);
            count += 1;
        }
        (word, count)
    }

    /// Number of bits set in the word
    #[must_use]
    pub const fn count_ones(self) -> u32 {
        self.0.count_ones()
    }
}

impl From<Word36> for u64 {
    fn from(word: Word36) -> Self {
        word.0
    }
}

impl std::fmt::Display for Word36 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:012o}", self.0)
    }
}

impl std::fmt::Debug for Word36 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Word36({:#014o})", self.0)
    }
}

/// A 72-bit ones-complement double word, as held in a register pair
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DoubleWord72(u128);

impl DoubleWord72 {
    pub const POSITIVE_ZERO: Self = Self(0);
    pub const NEGATIVE_ZERO: Self = Self(MASK72);

    #[must_use]
    pub const fn new(bits: u128) -> Self {
        Self(bits & MASK72)
    }

    #[must_use]
    pub const fn bits(self) -> u128 {
        self.0
    }

    /// Join a high-order and a low-order word
    #[must_use]
    pub const fn from_words(high: Word36, low: Word36) -> Self {
        Self(((high.0 as u128) << 36) | low.0 as u128)
    }

    /// Extend a single word to 72 bits, replicating its sign
    #[must_use]
    pub const fn sign_extend(word: Word36) -> Self {
        if word.is_negative() {
            Self(((MASK36 as u128) << 36) | word.0 as u128)
        } else {
            Self(word.0 as u128)
        }
    }

    #[must_use]
    pub const fn high(self) -> Word36 {
        Word36::new((self.0 >> 36) as u64)
    }

    #[must_use]
    pub const fn low(self) -> Word36 {
        Word36::new(self.0 as u64)
    }

    /// The (high, low) register pair
    #[must_use]
    pub const fn words(self) -> (Word36, Word36) {
        (self.high(), self.low())
    }

    #[must_use]
    pub const fn from_i128(value: i128) -> Self {
        if value < 0 {
            Self::new(!value.unsigned_abs())
        } else {
            Self::new(value as u128)
        }
    }

    #[must_use]
    pub const fn to_i128(self) -> i128 {
        if self.is_negative() {
            -((!self.0 & MASK72) as i128)
        } else {
            self.0 as i128
        }
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 & SIGN_BIT72 != 0
    }

    #[must_use]
    pub const fn is_positive_zero(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn is_negative_zero(self) -> bool {
        self.0 == MASK72
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.is_positive_zero() || self.is_negative_zero()
    }

    #[must_use]
    pub const fn negate(self) -> Self {
        Self(!self.0 & MASK72)
    }

    #[must_use]
    pub const fn magnitude(self) -> Self {
        if self.is_negative() {
            self.negate()
        } else {
            self
        }
    }

    #[must_use]
    pub fn add(self, other: Self) -> AddResult<Self> {
        let raw = self.0 + other.0;
        let carry = raw > MASK72;
        let mut sum = if carry { (raw & MASK72) + 1 } else { raw };
        if sum == MASK72 && !(self.is_negative_zero() && other.is_negative_zero()) {
            sum = 0;
        }

        let sum = Self(sum);
        let overflow =
            self.is_negative() == other.is_negative() && sum.is_negative() != self.is_negative();

        AddResult {
            sum,
            carry,
            overflow,
        }
    }

    #[must_use]
    pub fn subtract(self, other: Self) -> AddResult<Self> {
        self.add(other.negate())
    }

    /// Divide by a single word.
    ///
    /// The quotient truncates toward zero and the remainder takes the sign
    /// of the dividend.
    ///
    /// # Errors
    ///
    /// [`ArithmeticError::DivideByZero`] for a `+0` or `-0` divisor,
    /// [`ArithmeticError::QuotientOverflow`] when the quotient needs more than
    /// 36 bits.
    pub fn divide(self, divisor: Word36) -> Result<DivideResult, ArithmeticError> {
        if divisor.is_zero() {
            return Err(ArithmeticError::DivideByZero);
        }

        let dividend = self.to_i128();
        let divisor = i128::from(divisor.to_i64());
        let quotient = dividend / divisor;
        let remainder = dividend % divisor;
        if quotient.abs() > i128::from(MAX_MAGNITUDE36) {
            return Err(ArithmeticError::QuotientOverflow);
        }

        Ok(DivideResult {
            quotient: Word36::from_i64(quotient as i64),
            remainder: Word36::from_i64(remainder as i64),
        })
    }

    #[must_use]
    pub fn compare(self, other: Self) -> Ordering {
        self.to_i128().cmp(&other.to_i128())
    }

    #[must_use]
    pub const fn shift_left_circular(self, count: u32) -> Self {
        let count = count % 72;
        Self(((self.0 << count) | (self.0 >> (72 - count))) & MASK72)
    }

    #[must_use]
    pub const fn shift_right_circular(self, count: u32) -> Self {
        self.shift_left_circular(72 - count % 72)
    }

    #[must_use]
    pub const fn shift_left_logical(self, count: u32) -> Self {
        if count >= 72 {
            Self::POSITIVE_ZERO
        } else {
            Self((self.0 << count) & MASK72)
        }
    }

    #[must_use]
    pub const fn shift_right_logical(self, count: u32) -> Self {
        if count >= 72 {
            Self::POSITIVE_ZERO
        } else {
            Self(self.0 >> count)
        }
    }

    #[must_use]
    pub const fn shift_right_algebraic(self, count: u32) -> Self {
        if count >= 72 {
            if self.is_negative() {
                Self::NEGATIVE_ZERO
            } else {
                Self::POSITIVE_ZERO
            }
        } else if self.is_negative() {
            Self(((self.0 >> count) | (MASK72 << (72 - count))) & MASK72)
        } else {
            Self(self.0 >> count)
        }
    }

    /// Double-word counterpart of [`Word36::normalize`]; the count is 71
    /// for either zero.
    #[must_use]
    pub const fn normalize(self) -> (Self, u32) {
        if self.is_zero() {
            return (self, 71);
        }

        let mut count = 0;
        let mut value = self;
        while (value.0 >> 71) & 1 == (value.0 >> 70) & 1 {
            value = value.shift_left_circular(1);
            count += 1;
        }
        (value, count)
    }
}

impl std::fmt::Display for DoubleWord72 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.high(), self.low())
    }
}

impl std::fmt::Debug for DoubleWord72 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DoubleWord72({} {})", self.high(), self.low())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn word() -> impl Strategy<Value = Word36> {
        prop_oneof![
            (0..=MASK36).prop_map(Word36::new),
            Just(Word36::POSITIVE_ZERO),
            Just(Word36::NEGATIVE_ZERO),
            Just(Word36::new(SIGN_BIT36)),
            Just(Word36::new(MASK36 >> 1)),
        ]
    }

    #[test]
    fn add_small_values_test() {
        let result = Word36::new(5).add(Word36::new(3));
        assert_eq!(
            result,
            AddResult {
                sum: Word36::new(0o10),
                carry: false,
                overflow: false,
            }
        );
    }

    #[test]
    fn add_zeros_test() {
        let neg = Word36::NEGATIVE_ZERO;
        let pos = Word36::POSITIVE_ZERO;
        assert_eq!(neg.add(neg).sum, neg);
        assert_eq!(neg.add(pos).sum, pos);
        assert_eq!(pos.add(neg).sum, pos);
        assert_eq!(pos.add(pos).sum, pos);

        // x + (-x) never yields negative zero
        let five = Word36::new(5);
        assert_eq!(five.add(five.negate()).sum, pos);
    }

    #[test]
    fn negate_zero_test() {
        assert_eq!(Word36::POSITIVE_ZERO.negate(), Word36::NEGATIVE_ZERO);
        assert_eq!(Word36::NEGATIVE_ZERO.negate(), Word36::POSITIVE_ZERO);
        assert_eq!(Word36::NEGATIVE_ZERO.magnitude(), Word36::POSITIVE_ZERO);
        assert_eq!(Word36::NEGATIVE_ZERO.compare(Word36::POSITIVE_ZERO), Ordering::Equal);
    }

    #[test]
    fn add_end_around_carry_test() {
        // -1 + -1 = -2, with a carry out of the sign bit
        let minus_one = Word36::NEGATIVE_ONE;
        let result = minus_one.add(minus_one);
        assert_eq!(result.sum.to_i64(), -2);
        assert!(result.carry);
        assert!(!result.overflow);

        // 5 + -3 = 2
        let result = Word36::new(5).add(Word36::from_i64(-3));
        assert_eq!(result.sum, Word36::new(2));
        assert!(result.carry);
        assert!(!result.overflow);
    }

    #[test]
    fn add_overflow_test() {
        let max = Word36::from_i64(MAX_MAGNITUDE36);
        let result = max.add(Word36::POSITIVE_ONE);
        assert!(result.overflow);
        assert!(result.sum.is_negative());

        let min = Word36::from_i64(-MAX_MAGNITUDE36);
        let result = min.add(Word36::NEGATIVE_ONE);
        assert!(result.overflow);
        assert!(result.sum.is_positive());
    }

    #[test]
    fn subtract_test() {
        let result = Word36::new(3).subtract(Word36::new(5));
        assert_eq!(result.sum.to_i64(), -2);
        assert!(!result.overflow);

        let result = Word36::from_i64(-MAX_MAGNITUDE36).subtract(Word36::POSITIVE_ONE);
        assert!(result.overflow);
    }

    #[test]
    fn native_conversion_test() {
        assert_eq!(Word36::from_i64(-1), Word36::new(0o777_777_777_776));
        assert_eq!(Word36::from_i64(-1).to_i64(), -1);
        assert_eq!(Word36::NEGATIVE_ZERO.to_i64(), 0);
        assert_eq!(Word36::from_i64(MAX_MAGNITUDE36).bits(), 0o377_777_777_777);
        assert_eq!(Word36::new(u64::MAX).bits(), MASK36);
    }

    #[test]
    fn field_test() {
        let word = Word36::new(0o123_456_701_234);
        assert_eq!(word.h1(), 0o123_456);
        assert_eq!(word.h2(), 0o701_234);
        assert_eq!(word.t1(), 0o1234);
        assert_eq!(word.t2(), 0o5670);
        assert_eq!(word.t3(), 0o1234);
        assert_eq!(word.q1(), 0o123);
        assert_eq!(word.q2(), 0o456);
        assert_eq!(word.q3(), 0o701);
        assert_eq!(word.q4(), 0o234);
        assert_eq!(word.s1(), 0o12);
        assert_eq!(word.s6(), 0o34);

        assert_eq!(word.with_h1(0o777_777).bits(), 0o777_777_701_234);
        assert_eq!(word.with_s3(0).bits(), 0o123_400_701_234);
        assert_eq!(word.with_q4(0o1777).bits(), 0o123_456_701_777);
    }

    #[test]
    fn sign_extension_test() {
        let word = Word36::new(0o000_000_400_000);
        assert_eq!(word.xh2(), Word36::new(0o777_777_400_000));
        assert_eq!(word.xh1(), Word36::POSITIVE_ZERO);
        assert_eq!(Word36::new(0o4000).xt3(), Word36::new(0o777_777_777_777 ^ 0o3777));
        assert_eq!(Word36::new(0o3777).xt3(), Word36::new(0o3777));
    }

    #[test]
    fn shift_test() {
        let word = Word36::new(0o400_000_000_001);
        assert_eq!(word.shift_left_circular(1), Word36::new(0o000_000_000_003));
        assert_eq!(word.shift_right_circular(1), Word36::new(0o600_000_000_000));
        assert_eq!(word.shift_right_logical(3), Word36::new(0o040_000_000_000));
        assert_eq!(word.shift_right_algebraic(3), Word36::new(0o740_000_000_000));
        assert_eq!(word.shift_right_algebraic(40), Word36::NEGATIVE_ZERO);
        assert_eq!(word.shift_left_logical(36), Word36::POSITIVE_ZERO);
        assert_eq!(word.shift_left_circular(36), word);
    }

    #[test]
    fn normalize_test() {
        assert_eq!(Word36::new(1).normalize(), (Word36::new(0o200_000_000_000), 34));
        assert_eq!(
            Word36::from_i64(-1).normalize(),
            (Word36::new(0o577_777_777_777), 34)
        );
        assert_eq!(Word36::NEGATIVE_ZERO.normalize(), (Word36::NEGATIVE_ZERO, 35));
        assert_eq!(Word36::new(0o200_000_000_000).normalize().1, 0);
    }

    #[test]
    fn multiply_test() {
        let product = Word36::from_i64(-6).multiply(Word36::new(7));
        assert_eq!(product.to_i128(), -42);
        assert_eq!(product.high(), Word36::NEGATIVE_ZERO);
        assert_eq!(product.low(), Word36::from_i64(-42));

        let big = Word36::from_i64(MAX_MAGNITUDE36);
        let product = big.multiply(big);
        assert_eq!(product.to_i128(), i128::from(MAX_MAGNITUDE36).pow(2));
    }

    #[test]
    fn divide_test() {
        let result = Word36::new(17).divide(Word36::new(5)).unwrap();
        assert_eq!(result.quotient, Word36::new(3));
        assert_eq!(result.remainder, Word36::new(2));

        let result = Word36::from_i64(-17).divide(Word36::new(5)).unwrap();
        assert_eq!(result.quotient.to_i64(), -3);
        assert_eq!(result.remainder.to_i64(), -2);

        let dividend = DoubleWord72::from_i128(1 << 40);
        assert_eq!(
            dividend.divide(Word36::new(2)),
            Err(ArithmeticError::QuotientOverflow)
        );
    }

    #[test]
    fn double_word_test() {
        let value = DoubleWord72::from_words(Word36::new(1), Word36::new(2));
        assert_eq!(value.to_i128(), (1 << 36) + 2);
        assert_eq!(value.words(), (Word36::new(1), Word36::new(2)));
        assert_eq!(value.negate().negate(), value);
        assert_eq!(
            DoubleWord72::sign_extend(Word36::from_i64(-3)).to_i128(),
            -3
        );

        let result = value.add(DoubleWord72::from_i128(-2));
        assert_eq!(result.sum.to_i128(), 1 << 36);
        assert_eq!(
            DoubleWord72::NEGATIVE_ZERO.add(DoubleWord72::NEGATIVE_ZERO).sum,
            DoubleWord72::NEGATIVE_ZERO
        );
        assert_eq!(
            DoubleWord72::new(1).shift_right_circular(1),
            DoubleWord72::new(SIGN_BIT72)
        );
        assert_eq!(
            DoubleWord72::new(SIGN_BIT72).shift_right_algebraic(1),
            DoubleWord72::new(SIGN_BIT72 | (SIGN_BIT72 >> 1))
        );
    }

    #[test]
    fn ones_complement_width_test() {
        assert_eq!(ones_complement_add(5, 0o777_776, 18), 4);
        assert_eq!(ones_complement_add(0, 0o777_776, 18), 0o777_776);
        assert_eq!(ones_complement_add(0o777_777, 0o777_777, 18), 0o777_777);
        assert_eq!(ones_complement_to_i64(0o777_776, 18), -1);
        assert_eq!(ones_complement_negate(1, 12), 0o7776);
    }

    proptest! {
        #[test]
        fn add_is_commutative(a in word(), b in word()) {
            prop_assert_eq!(a.add(b), b.add(a));
        }

        #[test]
        fn zero_predicates_are_consistent(a in word()) {
            prop_assert!(!(a.is_negative_zero() && a.is_positive_zero()));
            prop_assert_eq!(a.is_zero(), a.is_negative_zero() || a.is_positive_zero());
        }

        #[test]
        fn negate_is_an_involution(a in word()) {
            prop_assert_eq!(a.negate().negate(), a);
        }

        #[test]
        fn field_round_trip(a in word(), value in any::<u64>()) {
            for field in Field::ALL {
                let updated = a.with(field, value);
                prop_assert_eq!(updated.get(field), value & field.mask());

                // Bits outside the field are untouched
                let outside = !(field.mask() << field.shift()) & MASK36;
                prop_assert_eq!(updated.bits() & outside, a.bits() & outside);
            }
        }

        #[test]
        fn divide_by_zero_always_fails(a in word(), negative in any::<bool>()) {
            let zero = if negative { Word36::NEGATIVE_ZERO } else { Word36::POSITIVE_ZERO };
            prop_assert_eq!(a.divide(zero), Err(ArithmeticError::DivideByZero));
            prop_assert_eq!(
                DoubleWord72::from_words(a, a).divide(zero),
                Err(ArithmeticError::DivideByZero)
            );
        }

        #[test]
        fn add_agrees_with_native_arithmetic(a in word(), b in word()) {
            let result = a.add(b);
            let native = a.to_i64() + b.to_i64();
            if native.abs() <= MAX_MAGNITUDE36 {
                prop_assert!(!result.overflow);
                prop_assert_eq!(result.sum.to_i64(), native);
            } else {
                prop_assert!(result.overflow);
            }
        }

        #[test]
        fn compare_matches_native_order(a in word(), b in word()) {
            prop_assert_eq!(a.compare(b), a.to_i64().cmp(&b.to_i64()));
        }
    }
}
