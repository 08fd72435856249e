//! Reduced product of the three value domains
//!
//! A value is described by `(sign, nullability, range)` and concretizes to
//! the intersection of the three component concretizations. Sign and range
//! only constrain integers: any non-Top sign or range implies the value is an
//! integer (booleans count as 0/1), which in turn implies it is not None.
//! Non-integer objects and None carry Top in both numeric components.

use serde::{Deserialize, Serialize};

use super::lattice::Lattice;
use super::nullability::Nullability;
use super::range::{Bound, Range};
use super::sign::Sign;
use crate::shared::models::{BinOp, CompOp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AbstractValue {
    pub sign: Sign,
    pub nullability: Nullability,
    pub range: Range,
}

impl AbstractValue {
    pub fn new(sign: Sign, nullability: Nullability, range: Range) -> Self {
        Self {
            sign,
            nullability,
            range,
        }
        .reduce()
    }

    /// Integer constant
    pub fn constant(value: i64) -> Self {
        Self {
            sign: Sign::of(value),
            nullability: Nullability::NotNull,
            range: Range::constant(value),
        }
    }

    /// Boolean of unknown value
    pub fn boolean() -> Self {
        Self::int_in(Range::finite(0, 1))
    }

    pub fn from_bool(value: bool) -> Self {
        Self::constant(i64::from(value))
    }

    /// Integer known to lie in `range`
    pub fn int_in(range: Range) -> Self {
        Self::new(range.sign(), Nullability::NotNull, range)
    }

    /// Integer with nothing else known
    pub fn any_int() -> Self {
        Self {
            sign: Sign::Top,
            nullability: Nullability::NotNull,
            range: Range::top(),
        }
    }

    /// The `None` value
    pub fn none() -> Self {
        Self {
            sign: Sign::Top,
            nullability: Nullability::DefinitelyNull,
            range: Range::top(),
        }
    }

    /// Non-None value of unknown shape (objects, strings, lists, ...)
    pub fn not_null() -> Self {
        Self {
            sign: Sign::Top,
            nullability: Nullability::NotNull,
            range: Range::top(),
        }
    }

    /// Whether a numeric component constrains the value to integers
    pub fn is_numeric(&self) -> bool {
        self.sign != Sign::Top || self.range != Range::top()
    }

    /// Mutual refinement of the components; any empty component empties all
    pub fn reduce(self) -> Self {
        if self.sign == Sign::Bottom
            || self.nullability == Nullability::Bottom
            || self.range.is_empty()
        {
            return Self::bottom();
        }
        let range = self.range.meet(&Range::of_sign(self.sign));
        let sign = self.sign.meet(&range.sign());
        let mut nullability = self.nullability;
        if sign != Sign::Top || range != Range::top() {
            nullability = nullability.meet(&Nullability::NotNull);
        }
        if sign == Sign::Bottom || range.is_empty() || nullability == Nullability::Bottom {
            return Self::bottom();
        }
        Self {
            sign,
            nullability,
            range,
        }
    }

    /// Concretization membership for an integer
    pub fn contains_int(&self, value: i64) -> bool {
        self.nullability.may_be_non_null()
            && self.sign.contains(value)
            && self.range.contains(value)
    }

    /// Concretization membership for `None`
    pub fn contains_none(&self) -> bool {
        self.nullability.may_be_null() && self.sign == Sign::Top && self.range == Range::top()
    }

    /// Truth value, when every concrete value agrees
    pub fn truthiness(&self) -> Option<bool> {
        if self.is_bottom() {
            return None;
        }
        if self.nullability == Nullability::DefinitelyNull {
            return Some(false);
        }
        if self.is_numeric() && self.nullability == Nullability::NotNull {
            if self.range.as_constant() == Some(0) {
                return Some(false);
            }
            if !self.range.contains(0) {
                return Some(true);
            }
        }
        None
    }

    /// Arithmetic on two operands
    pub fn binary(op: BinOp, left: &Self, right: &Self) -> Self {
        if left.is_bottom() || right.is_bottom() {
            return Self::bottom();
        }
        // Arithmetic on a possibly non-integer operand (strings, lists,
        // None) yields an unconstrained value
        if !left.is_numeric() || !right.is_numeric() {
            return match op {
                BinOp::Add | BinOp::Mul => Self::top(),
                _ => Self::any_int(),
            };
        }
        let (sign, range) = match op {
            BinOp::Add => (left.sign.add(right.sign), left.range.add(&right.range)),
            BinOp::Sub => (left.sign.sub(right.sign), left.range.sub(&right.range)),
            BinOp::Mul => (left.sign.mul(right.sign), left.range.mul(&right.range)),
            BinOp::FloorDiv => (
                left.sign.floor_div(right.sign),
                left.range.floor_div(&right.range),
            ),
            BinOp::Mod => (left.sign.modulo(right.sign), left.range.modulo(&right.range)),
            BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor => return Self::any_int(),
        };
        Self::new(sign, Nullability::NotNull, range)
    }

    /// Arithmetic negation
    pub fn negate(&self) -> Self {
        if self.is_bottom() {
            return *self;
        }
        if !self.is_numeric() {
            return Self::any_int();
        }
        Self::new(self.sign.negate(), Nullability::NotNull, self.range.negate())
    }

    /// Outcome of `left op right`, when every pair of concrete values agrees
    pub fn compare(op: CompOp, left: &Self, right: &Self) -> Option<bool> {
        if left.is_bottom() || right.is_bottom() {
            return None;
        }
        match op {
            CompOp::Is | CompOp::IsNot => {
                let same = Self::identical_to_none(left, right)?;
                Some(if op == CompOp::Is { same } else { !same })
            }
            CompOp::Eq | CompOp::NotEq => {
                let equal = match Self::identical_to_none(left, right) {
                    Some(result) => Some(result),
                    None => Self::numeric_equality(left, right),
                }?;
                Some(if op == CompOp::Eq { equal } else { !equal })
            }
            CompOp::Lt | CompOp::LtE | CompOp::Gt | CompOp::GtE => {
                if !left.is_numeric() || !right.is_numeric() {
                    return None;
                }
                let (l, r) = (&left.range, &right.range);
                match op {
                    CompOp::Lt if l.hi < r.lo => Some(true),
                    CompOp::Lt if l.lo >= r.hi => Some(false),
                    CompOp::LtE if l.hi <= r.lo => Some(true),
                    CompOp::LtE if l.lo > r.hi => Some(false),
                    CompOp::Gt if l.lo > r.hi => Some(true),
                    CompOp::Gt if l.hi <= r.lo => Some(false),
                    CompOp::GtE if l.lo >= r.hi => Some(true),
                    CompOp::GtE if l.hi < r.lo => Some(false),
                    _ => None,
                }
            }
        }
    }

    /// `left is right` when one side is known to be None
    fn identical_to_none(left: &Self, right: &Self) -> Option<bool> {
        let (l, r) = (left.nullability, right.nullability);
        match (l, r) {
            (Nullability::DefinitelyNull, Nullability::DefinitelyNull) => Some(true),
            (Nullability::DefinitelyNull, Nullability::NotNull)
            | (Nullability::NotNull, Nullability::DefinitelyNull) => Some(false),
            _ => None,
        }
    }

    fn numeric_equality(left: &Self, right: &Self) -> Option<bool> {
        if !left.is_numeric() || !right.is_numeric() {
            return None;
        }
        if let (Some(a), Some(b)) = (left.range.as_constant(), right.range.as_constant()) {
            return Some(a == b);
        }
        if left.range.meet(&right.range).is_empty() {
            return Some(false);
        }
        None
    }

    /// Values admitted by `self op other` holding for some `other` value
    pub fn restrict(&self, op: CompOp, other: &Self) -> Self {
        let bound = match op {
            CompOp::Lt | CompOp::LtE | CompOp::Gt | CompOp::GtE if other.is_numeric() => {
                let r = other.range;
                match op {
                    CompOp::Lt => Range::new(Bound::NegInf, r.hi.saturating_sub_one()),
                    CompOp::LtE => Range::new(Bound::NegInf, r.hi),
                    CompOp::Gt => Range::new(r.lo.saturating_add_one(), Bound::PosInf),
                    _ => Range::new(r.lo, Bound::PosInf),
                }
            }
            _ => Range::top(),
        };
        match op {
            CompOp::Lt | CompOp::LtE | CompOp::Gt | CompOp::GtE => {
                if other.is_numeric() {
                    // Ordering comparisons only succeed between numbers here
                    self.meet(&Self::int_in(bound))
                } else {
                    *self
                }
            }
            CompOp::Eq | CompOp::Is => {
                if other.nullability == Nullability::DefinitelyNull {
                    self.meet(&Self::none())
                } else if op == CompOp::Eq && other.is_numeric() && self.is_numeric() {
                    self.meet(other)
                } else if op == CompOp::Is && other.nullability == Nullability::NotNull {
                    self.meet(&Self::not_null())
                } else {
                    *self
                }
            }
            CompOp::NotEq | CompOp::IsNot => {
                if other.nullability == Nullability::DefinitelyNull {
                    self.meet(&Self::not_null())
                } else if let (Some(c), true) = (other.range.as_constant(), self.is_numeric()) {
                    self.exclude(c)
                } else {
                    *self
                }
            }
        }
    }

    /// Drop `value` when it sits on a range endpoint
    pub fn exclude(&self, value: i64) -> Self {
        let mut range = self.range;
        if range.lo == Bound::Finite(value) {
            range = Range::new(Bound::Finite(value).saturating_add_one(), range.hi);
        }
        if range.hi == Bound::Finite(value) {
            range = Range::new(range.lo, Bound::Finite(value).saturating_sub_one());
        }
        let sign = if value == 0 && self.sign.meet(&Sign::Zero) == self.sign {
            Sign::Bottom
        } else {
            self.sign
        };
        Self::new(sign, self.nullability, range)
    }
}

impl Default for AbstractValue {
    fn default() -> Self {
        Self::top()
    }
}

impl Lattice for AbstractValue {
    fn bottom() -> Self {
        Self {
            sign: Sign::Bottom,
            nullability: Nullability::Bottom,
            range: Range::bottom(),
        }
    }

    fn top() -> Self {
        Self {
            sign: Sign::Top,
            nullability: Nullability::Top,
            range: Range::top(),
        }
    }

    fn join(&self, other: &Self) -> Self {
        if self.is_bottom() {
            return *other;
        }
        if other.is_bottom() {
            return *self;
        }
        Self {
            sign: self.sign.join(&other.sign),
            nullability: self.nullability.join(&other.nullability),
            range: self.range.join(&other.range),
        }
    }

    fn meet(&self, other: &Self) -> Self {
        Self {
            sign: self.sign.meet(&other.sign),
            nullability: self.nullability.meet(&other.nullability),
            range: self.range.meet(&other.range),
        }
        .reduce()
    }

    fn leq(&self, other: &Self) -> bool {
        self.is_bottom()
            || (self.sign.leq(&other.sign)
                && self.nullability.leq(&other.nullability)
                && self.range.leq(&other.range))
    }

    fn widen(&self, newer: &Self, iteration: usize) -> Self {
        if self.is_bottom() {
            return *newer;
        }
        if newer.is_bottom() {
            return *self;
        }
        Self {
            sign: self.sign.widen(&newer.sign, iteration),
            nullability: self.nullability.widen(&newer.nullability, iteration),
            range: self.range.widen(&newer.range, iteration),
        }
    }

    fn is_bottom(&self) -> bool {
        self.sign == Sign::Bottom
            || self.nullability == Nullability::Bottom
            || self.range.is_empty()
    }
}

impl std::fmt::Display for AbstractValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.sign, self.nullability, self.range)
    }
}
