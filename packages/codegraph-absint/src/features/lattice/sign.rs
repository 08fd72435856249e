//! Sign domain
//!
//! Elements are closed subsets of {negative, zero, positive}. `{neg, pos}`
//! is not an element: it closes to Top, so the join of Negative and Positive
//! is Top. Arithmetic is computed atom by atom and joined, which is exactly
//! the table form of the operators.

use serde::{Deserialize, Serialize};

use super::lattice::Lattice;

const NEG: u8 = 0b001;
const ZERO: u8 = 0b010;
const POS: u8 = 0b100;
const ALL: u8 = NEG | ZERO | POS;

/// Sign abstraction of an integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sign {
    Bottom,
    Negative,
    Zero,
    Positive,
    NonNegative,
    NonPositive,
    Top,
}

impl Sign {
    fn bits(self) -> u8 {
        match self {
            Sign::Bottom => 0,
            Sign::Negative => NEG,
            Sign::Zero => ZERO,
            Sign::Positive => POS,
            Sign::NonNegative => ZERO | POS,
            Sign::NonPositive => NEG | ZERO,
            Sign::Top => ALL,
        }
    }

    fn from_bits(bits: u8) -> Sign {
        match bits & ALL {
            0 => Sign::Bottom,
            NEG => Sign::Negative,
            ZERO => Sign::Zero,
            POS => Sign::Positive,
            b if b == ZERO | POS => Sign::NonNegative,
            b if b == NEG | ZERO => Sign::NonPositive,
            // {neg, pos} closes to Top
            _ => Sign::Top,
        }
    }

    fn atoms(self) -> impl Iterator<Item = u8> {
        let bits = self.bits();
        [NEG, ZERO, POS].into_iter().filter(move |a| bits & a != 0)
    }

    /// Sign of a concrete integer
    pub fn of(value: i64) -> Sign {
        match value.cmp(&0) {
            std::cmp::Ordering::Less => Sign::Negative,
            std::cmp::Ordering::Equal => Sign::Zero,
            std::cmp::Ordering::Greater => Sign::Positive,
        }
    }

    /// Concretization membership
    pub fn contains(self, value: i64) -> bool {
        self.bits() & Sign::of(value).bits() != 0
    }

    pub fn may_be_zero(self) -> bool {
        self.bits() & ZERO != 0
    }

    fn lift(a: Sign, b: Sign, op: impl Fn(u8, u8) -> u8) -> Sign {
        if a == Sign::Bottom || b == Sign::Bottom {
            return Sign::Bottom;
        }
        let mut bits = 0;
        for x in a.atoms() {
            for y in b.atoms() {
                bits |= op(x, y);
            }
        }
        Sign::from_bits(bits)
    }

    pub fn add(self, other: Sign) -> Sign {
        Sign::lift(self, other, |x, y| match (x, y) {
            (ZERO, s) | (s, ZERO) => s,
            (NEG, NEG) => NEG,
            (POS, POS) => POS,
            _ => ALL,
        })
    }

    pub fn negate(self) -> Sign {
        let bits = self.bits();
        Sign::from_bits((bits & ZERO) | ((bits & NEG) << 2) | ((bits & POS) >> 2))
    }

    pub fn sub(self, other: Sign) -> Sign {
        self.add(other.negate())
    }

    pub fn mul(self, other: Sign) -> Sign {
        Sign::lift(self, other, |x, y| match (x, y) {
            (ZERO, _) | (_, ZERO) => ZERO,
            (a, b) if a == b => POS,
            _ => NEG,
        })
    }

    /// Floor division; a divisor that may be zero gives Top
    pub fn floor_div(self, divisor: Sign) -> Sign {
        if self == Sign::Bottom || divisor == Sign::Bottom {
            return Sign::Bottom;
        }
        if divisor.may_be_zero() {
            return Sign::Top;
        }
        Sign::lift(self, divisor, |x, y| match (x, y) {
            (ZERO, _) => ZERO,
            // |x| < |y| floors to 0 when the signs agree
            (a, b) if a == b => ZERO | POS,
            _ => NEG,
        })
    }

    /// Modulo; the result takes the sign of the divisor (or is zero)
    pub fn modulo(self, divisor: Sign) -> Sign {
        if self == Sign::Bottom || divisor == Sign::Bottom {
            return Sign::Bottom;
        }
        if divisor.may_be_zero() {
            return Sign::Top;
        }
        Sign::lift(self, divisor, |x, y| match (x, y) {
            (ZERO, _) => ZERO,
            (_, d) => ZERO | d,
        })
    }
}

impl Default for Sign {
    fn default() -> Self {
        Sign::Top
    }
}

impl Lattice for Sign {
    fn bottom() -> Self {
        Sign::Bottom
    }

    fn top() -> Self {
        Sign::Top
    }

    fn join(&self, other: &Self) -> Self {
        Sign::from_bits(self.bits() | other.bits())
    }

    fn meet(&self, other: &Self) -> Self {
        Sign::from_bits(self.bits() & other.bits())
    }

    fn leq(&self, other: &Self) -> bool {
        self.bits() & !other.bits() == 0
    }
}

impl std::fmt::Display for Sign {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Sign::Bottom => "⊥",
            Sign::Negative => "-",
            Sign::Zero => "0",
            Sign::Positive => "+",
            Sign::NonNegative => "0+",
            Sign::NonPositive => "0-",
            Sign::Top => "⊤",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Sign::*;

    #[test]
    fn test_join_negative_positive_is_top() {
        assert_eq!(Negative.join(&Positive), Top);
        assert_eq!(Zero.join(&Positive), NonNegative);
        assert_eq!(NonNegative.meet(&NonPositive), Zero);
    }

    #[test]
    fn test_add_table() {
        assert_eq!(Positive.add(Positive), Positive);
        assert_eq!(Positive.add(Negative), Top);
        assert_eq!(Zero.add(Negative), Negative);
        assert_eq!(NonNegative.add(Positive), Positive);
        assert_eq!(Bottom.add(Positive), Bottom);
    }

    #[test]
    fn test_mul_table() {
        assert_eq!(Negative.mul(Negative), Positive);
        assert_eq!(Negative.mul(Positive), Negative);
        assert_eq!(Zero.mul(Top), Zero);
        assert_eq!(NonPositive.mul(Negative), NonNegative);
    }

    #[test]
    fn test_division_and_modulo() {
        assert_eq!(Positive.floor_div(Positive), NonNegative);
        assert_eq!(Negative.floor_div(Positive), Negative);
        assert_eq!(Positive.floor_div(Negative), Negative);
        assert_eq!(Positive.floor_div(NonNegative), Top);
        assert_eq!(Negative.modulo(Positive), NonNegative);
        assert_eq!(Positive.modulo(Negative), NonPositive);
    }

    #[test]
    fn test_negate_and_sub() {
        assert_eq!(Negative.negate(), Positive);
        assert_eq!(NonNegative.negate(), NonPositive);
        assert_eq!(Positive.sub(Negative), Positive);
        assert_eq!(Positive.sub(Positive), Top);
    }

    #[test]
    fn test_contains() {
        assert!(NonNegative.contains(0));
        assert!(!NonNegative.contains(-1));
        assert!(Top.contains(i64::MIN));
        assert!(!Bottom.contains(0));
    }
}
