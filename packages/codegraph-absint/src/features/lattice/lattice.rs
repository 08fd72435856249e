//! Lattice interface shared by every abstract domain

use std::fmt::Debug;

/// Complete lattice with a widening operator
///
/// Laws every implementation must satisfy:
/// - `join`/`meet` are commutative, associative and idempotent
/// - `a.leq(b)` iff `a.join(b) == b`
/// - `bottom().leq(x)` and `x.leq(top())` for all `x`
/// - `a.widen(b, k)` is above both `a` and `b`, and any chain
///   `x0, x0.widen(x1), ...` stabilizes after finitely many steps
pub trait Lattice: Clone + PartialEq + Debug {
    fn bottom() -> Self;

    fn top() -> Self;

    /// Least upper bound
    fn join(&self, other: &Self) -> Self;

    /// Greatest lower bound
    fn meet(&self, other: &Self) -> Self;

    /// Partial order
    fn leq(&self, other: &Self) -> bool;

    /// Widening of `self` (previous value) by `newer`. Domains of finite
    /// height keep the default, which is plain join.
    fn widen(&self, newer: &Self, iteration: usize) -> Self {
        let _ = iteration;
        self.join(newer)
    }

    fn is_bottom(&self) -> bool {
        *self == Self::bottom()
    }

    fn is_top(&self) -> bool {
        *self == Self::top()
    }
}

/// Join of an iterator of values (bottom when empty)
pub fn join_all<'a, L: Lattice + 'a>(values: impl IntoIterator<Item = &'a L>) -> L {
    values
        .into_iter()
        .fold(L::bottom(), |acc, value| acc.join(value))
}
