//! Interval (range) domain
//!
//! `[lo, hi]` with ±∞ bounds. The empty interval is kept canonical as
//! `[+∞, -∞]` so that structural equality coincides with lattice equality.
//! Finite arithmetic that overflows `i64` moves to the matching infinity.

use std::cmp::{max, min};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::lattice::Lattice;
use super::sign::Sign;

/// Bound of an interval: -∞, finite value, or +∞
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Bound {
    NegInf,
    Finite(i64),
    PosInf,
}

impl Bound {
    pub fn as_finite(&self) -> Option<i64> {
        match self {
            Bound::Finite(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_finite(&self) -> bool {
        matches!(self, Bound::Finite(_))
    }

    fn overflow(positive: bool) -> Bound {
        if positive {
            Bound::PosInf
        } else {
            Bound::NegInf
        }
    }

    /// Only called on bounds of non-empty intervals, where `-∞ + +∞` cannot
    /// arise for the same side
    pub fn add(self, other: Bound) -> Bound {
        match (self, other) {
            (Bound::Finite(a), Bound::Finite(b)) => a
                .checked_add(b)
                .map(Bound::Finite)
                .unwrap_or_else(|| Bound::overflow(b > 0)),
            (Bound::NegInf, _) | (_, Bound::NegInf) => Bound::NegInf,
            (Bound::PosInf, _) | (_, Bound::PosInf) => Bound::PosInf,
        }
    }

    pub fn neg(self) -> Bound {
        match self {
            Bound::NegInf => Bound::PosInf,
            Bound::Finite(n) => n.checked_neg().map(Bound::Finite).unwrap_or(Bound::PosInf),
            Bound::PosInf => Bound::NegInf,
        }
    }

    fn signum(self) -> i8 {
        match self {
            Bound::NegInf => -1,
            Bound::Finite(n) => n.signum() as i8,
            Bound::PosInf => 1,
        }
    }

    /// Product with `0 * ∞ = 0` (the limit for interval corners)
    pub fn mul(self, other: Bound) -> Bound {
        match (self, other) {
            (Bound::Finite(a), Bound::Finite(b)) => a
                .checked_mul(b)
                .map(Bound::Finite)
                .unwrap_or_else(|| Bound::overflow((a < 0) == (b < 0))),
            (a, b) => match a.signum() * b.signum() {
                0 => Bound::Finite(0),
                s if s > 0 => Bound::PosInf,
                _ => Bound::NegInf,
            },
        }
    }

    /// Floor division by a finite non-zero divisor
    fn floor_div(self, divisor: i64) -> Bound {
        match self {
            Bound::Finite(a) => match a.checked_div(divisor) {
                Some(q) if a % divisor != 0 && ((a < 0) != (divisor < 0)) => Bound::Finite(q - 1),
                Some(q) => Bound::Finite(q),
                None => Bound::PosInf,
            },
            inf => {
                if divisor > 0 {
                    inf
                } else {
                    inf.neg()
                }
            }
        }
    }

    pub fn saturating_sub_one(self) -> Bound {
        match self {
            Bound::Finite(n) => Bound::Finite(n.saturating_sub(1)),
            other => other,
        }
    }

    pub fn saturating_add_one(self) -> Bound {
        match self {
            Bound::Finite(n) => Bound::Finite(n.saturating_add(1)),
            other => other,
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::NegInf => write!(f, "-INF"),
            Bound::Finite(n) => write!(f, "{}", n),
            Bound::PosInf => write!(f, "+INF"),
        }
    }
}

/// Interval `[lo, hi]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub lo: Bound,
    pub hi: Bound,
}

impl Range {
    /// Interval from bounds; crossing or degenerate-infinite bounds give
    /// the empty interval
    pub fn new(lo: Bound, hi: Bound) -> Self {
        if lo > hi || lo == Bound::PosInf || hi == Bound::NegInf {
            Self::bottom()
        } else {
            Self { lo, hi }
        }
    }

    /// Interval from arithmetic results, clamping a lower bound that
    /// overflowed upward (and vice versa) back to the finite extreme
    fn from_arith(lo: Bound, hi: Bound) -> Self {
        let lo = if lo == Bound::PosInf {
            Bound::Finite(i64::MAX)
        } else {
            lo
        };
        let hi = if hi == Bound::NegInf {
            Bound::Finite(i64::MIN)
        } else {
            hi
        };
        Self::new(lo, hi)
    }

    pub fn finite(lo: i64, hi: i64) -> Self {
        Self::new(Bound::Finite(lo), Bound::Finite(hi))
    }

    pub fn constant(value: i64) -> Self {
        Self::finite(value, value)
    }

    /// `[lo, +∞]`
    pub fn at_least(lo: i64) -> Self {
        Self::new(Bound::Finite(lo), Bound::PosInf)
    }

    /// `[-∞, hi]`
    pub fn at_most(hi: i64) -> Self {
        Self::new(Bound::NegInf, Bound::Finite(hi))
    }

    pub fn is_empty(&self) -> bool {
        self.lo > self.hi
    }

    pub fn contains(&self, value: i64) -> bool {
        !self.is_empty() && self.lo <= Bound::Finite(value) && Bound::Finite(value) <= self.hi
    }

    /// Single value, if the interval is a point
    pub fn as_constant(&self) -> Option<i64> {
        match (self.lo, self.hi) {
            (Bound::Finite(a), Bound::Finite(b)) if a == b => Some(a),
            _ => None,
        }
    }

    pub fn is_bounded(&self) -> bool {
        self.lo.is_finite() && self.hi.is_finite()
    }

    pub fn add(&self, other: &Range) -> Range {
        if self.is_empty() || other.is_empty() {
            return Range::bottom();
        }
        Range::from_arith(self.lo.add(other.lo), self.hi.add(other.hi))
    }

    pub fn negate(&self) -> Range {
        if self.is_empty() {
            return Range::bottom();
        }
        Range::from_arith(self.hi.neg(), self.lo.neg())
    }

    pub fn sub(&self, other: &Range) -> Range {
        self.add(&other.negate())
    }

    pub fn mul(&self, other: &Range) -> Range {
        if self.is_empty() || other.is_empty() {
            return Range::bottom();
        }
        let corners = [
            self.lo.mul(other.lo),
            self.lo.mul(other.hi),
            self.hi.mul(other.lo),
            self.hi.mul(other.hi),
        ];
        let lo = corners.iter().copied().min().unwrap_or(Bound::NegInf);
        let hi = corners.iter().copied().max().unwrap_or(Bound::PosInf);
        Range::from_arith(lo, hi)
    }

    /// Floor division; a divisor that may be zero or is unbounded gives Top
    pub fn floor_div(&self, divisor: &Range) -> Range {
        if self.is_empty() || divisor.is_empty() {
            return Range::bottom();
        }
        let (Some(dl), Some(dh)) = (divisor.lo.as_finite(), divisor.hi.as_finite()) else {
            return Range::top();
        };
        if divisor.contains(0) {
            return Range::top();
        }
        let corners = [
            self.lo.floor_div(dl),
            self.lo.floor_div(dh),
            self.hi.floor_div(dl),
            self.hi.floor_div(dh),
        ];
        let lo = corners.iter().copied().min().unwrap_or(Bound::NegInf);
        let hi = corners.iter().copied().max().unwrap_or(Bound::PosInf);
        Range::from_arith(lo, hi)
    }

    /// Modulo; the result lies between zero and the divisor (exclusive)
    pub fn modulo(&self, divisor: &Range) -> Range {
        if self.is_empty() || divisor.is_empty() {
            return Range::bottom();
        }
        if divisor.contains(0) {
            return Range::top();
        }
        if divisor.lo > Bound::Finite(0) {
            // Non-negative dividend smaller than every divisor is unchanged
            if self.lo >= Bound::Finite(0) && self.hi < divisor.lo {
                return *self;
            }
            Range::new(Bound::Finite(0), divisor.hi.saturating_sub_one())
        } else {
            Range::new(divisor.lo.saturating_add_one(), Bound::Finite(0))
        }
    }

    /// Tightest interval covering a sign
    pub fn of_sign(sign: Sign) -> Range {
        match sign {
            Sign::Bottom => Range::bottom(),
            Sign::Negative => Range::at_most(-1),
            Sign::Zero => Range::constant(0),
            Sign::Positive => Range::at_least(1),
            Sign::NonNegative => Range::at_least(0),
            Sign::NonPositive => Range::at_most(0),
            Sign::Top => Range::top(),
        }
    }

    /// Sign covering every value of the interval
    pub fn sign(&self) -> Sign {
        if self.is_empty() {
            return Sign::Bottom;
        }
        let zero = Bound::Finite(0);
        let mut sign = Sign::Bottom;
        if self.lo < zero {
            sign = sign.join(&Sign::Negative);
        }
        if self.lo <= zero && zero <= self.hi {
            sign = sign.join(&Sign::Zero);
        }
        if self.hi > zero {
            sign = sign.join(&Sign::Positive);
        }
        sign
    }
}

impl Default for Range {
    fn default() -> Self {
        Range::top()
    }
}

impl Lattice for Range {
    fn bottom() -> Self {
        Self {
            lo: Bound::PosInf,
            hi: Bound::NegInf,
        }
    }

    fn top() -> Self {
        Self {
            lo: Bound::NegInf,
            hi: Bound::PosInf,
        }
    }

    fn join(&self, other: &Self) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Range {
            lo: min(self.lo, other.lo),
            hi: max(self.hi, other.hi),
        }
    }

    fn meet(&self, other: &Self) -> Self {
        Range::new(max(self.lo, other.lo), min(self.hi, other.hi))
    }

    fn leq(&self, other: &Self) -> bool {
        if self.is_empty() {
            return true;
        }
        !other.is_empty() && other.lo <= self.lo && self.hi <= other.hi
    }

    /// Unstable bounds jump to infinity
    fn widen(&self, newer: &Self, _iteration: usize) -> Self {
        if self.is_empty() {
            return *newer;
        }
        if newer.is_empty() {
            return *self;
        }
        let lo = if newer.lo < self.lo {
            Bound::NegInf
        } else {
            self.lo
        };
        let hi = if newer.hi > self.hi {
            Bound::PosInf
        } else {
            self.hi
        };
        Range { lo, hi }
    }

    fn is_bottom(&self) -> bool {
        self.is_empty()
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "⊥")
        } else {
            write!(f, "[{}, {}]", self.lo, self.hi)
        }
    }
}
