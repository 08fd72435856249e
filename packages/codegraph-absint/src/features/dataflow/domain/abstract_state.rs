//! Variable environments, one per value domain
//!
//! A variable missing from an environment reads as Top. Top values are never
//! stored, so structural equality of two environments is lattice equality.
//! The unreachable state is the Bottom element and carries no bindings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::features::lattice::{
    AbstractValue, Domain, DomainSet, Lattice, Nullability, Range, Sign,
};

/// Variable → value map of a single domain
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Environment<L> {
    values: BTreeMap<String, L>,
}

impl<L: Lattice> Environment<L> {
    pub fn new() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    pub fn get(&self, var: &str) -> L {
        self.values.get(var).cloned().unwrap_or_else(L::top)
    }

    pub fn set(&mut self, var: &str, value: L) {
        if value.is_top() {
            self.values.remove(var);
        } else {
            self.values.insert(var.to_string(), value);
        }
    }

    pub fn remove(&mut self, var: &str) {
        self.values.remove(var);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &L)> {
        self.values.iter()
    }

    /// Pointwise combination over variables bound in both maps (a variable
    /// bound on one side only is Top on the other, and stays Top)
    fn combine_shared(&self, other: &Self, op: impl Fn(&L, &L) -> L) -> Self {
        let mut values = BTreeMap::new();
        for (var, a) in &self.values {
            if let Some(b) = other.values.get(var) {
                let v = op(a, b);
                if !v.is_top() {
                    values.insert(var.clone(), v);
                }
            }
        }
        Self { values }
    }

    pub fn join(&self, other: &Self) -> Self {
        self.combine_shared(other, |a, b| a.join(b))
    }

    pub fn widen(&self, newer: &Self, iteration: usize) -> Self {
        self.combine_shared(newer, |a, b| a.widen(b, iteration))
    }

    pub fn meet(&self, other: &Self) -> Self {
        let mut values = self.values.clone();
        for (var, b) in &other.values {
            let v = match values.get(var) {
                Some(a) => a.meet(b),
                None => b.clone(),
            };
            values.insert(var.clone(), v);
        }
        Self { values }
    }

    pub fn leq(&self, other: &Self) -> bool {
        other
            .values
            .iter()
            .all(|(var, b)| self.get(var).leq(b))
    }

    /// Whether some bound variable holds Bottom
    fn has_bottom(&self) -> bool {
        self.values.values().any(|v| v.is_bottom())
    }
}

/// Per-program-point abstract state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbstractState {
    reachable: bool,
    pub sign: Environment<Sign>,
    pub nullability: Environment<Nullability>,
    pub range: Environment<Range>,
}

impl AbstractState {
    /// Reachable state with every variable Top
    pub fn new() -> Self {
        Self::top()
    }

    pub fn is_reachable(&self) -> bool {
        self.reachable
    }

    /// Reduced value of `var`; Bottom in the unreachable state
    pub fn get(&self, var: &str) -> AbstractValue {
        if !self.reachable {
            return AbstractValue::bottom();
        }
        AbstractValue::new(
            self.sign.get(var),
            self.nullability.get(var),
            self.range.get(var),
        )
    }

    /// Bind `var`, recording only the enabled domains
    pub fn set(&mut self, var: &str, value: &AbstractValue, domains: DomainSet) {
        if !self.reachable {
            return;
        }
        if value.is_bottom() {
            *self = Self::bottom();
            return;
        }
        if domains.contains(Domain::Sign) {
            self.sign.set(var, value.sign);
        }
        if domains.contains(Domain::Nullability) {
            self.nullability.set(var, value.nullability);
        }
        if domains.contains(Domain::Range) {
            self.range.set(var, value.range);
        }
    }

    /// Narrow `var` to values also described by `constraint`; an empty
    /// result makes the state unreachable
    pub fn refine(&mut self, var: &str, constraint: &AbstractValue, domains: DomainSet) {
        let narrowed = self.get(var).meet(constraint);
        self.set(var, &narrowed, domains);
    }

    pub fn forget(&mut self, var: &str) {
        self.sign.remove(var);
        self.nullability.remove(var);
        self.range.remove(var);
    }

    /// Variables bound to a non-Top value in some domain
    pub fn variables(&self) -> Vec<String> {
        let mut vars: Vec<String> = self
            .sign
            .iter()
            .map(|(k, _)| k.clone())
            .chain(self.nullability.iter().map(|(k, _)| k.clone()))
            .chain(self.range.iter().map(|(k, _)| k.clone()))
            .collect();
        vars.sort();
        vars.dedup();
        vars
    }

    fn normalized(self) -> Self {
        if !self.reachable
            || self.sign.has_bottom()
            || self.nullability.has_bottom()
            || self.range.has_bottom()
        {
            Self::bottom()
        } else {
            self
        }
    }
}

impl Default for AbstractState {
    fn default() -> Self {
        Self::new()
    }
}

impl Lattice for AbstractState {
    fn bottom() -> Self {
        Self {
            reachable: false,
            sign: Environment::new(),
            nullability: Environment::new(),
            range: Environment::new(),
        }
    }

    fn top() -> Self {
        Self {
            reachable: true,
            sign: Environment::new(),
            nullability: Environment::new(),
            range: Environment::new(),
        }
    }

    fn join(&self, other: &Self) -> Self {
        if !self.reachable {
            return other.clone();
        }
        if !other.reachable {
            return self.clone();
        }
        Self {
            reachable: true,
            sign: self.sign.join(&other.sign),
            nullability: self.nullability.join(&other.nullability),
            range: self.range.join(&other.range),
        }
    }

    fn meet(&self, other: &Self) -> Self {
        if !self.reachable || !other.reachable {
            return Self::bottom();
        }
        Self {
            reachable: true,
            sign: self.sign.meet(&other.sign),
            nullability: self.nullability.meet(&other.nullability),
            range: self.range.meet(&other.range),
        }
        .normalized()
    }

    fn leq(&self, other: &Self) -> bool {
        if !self.reachable {
            return true;
        }
        if !other.reachable {
            return false;
        }
        self.sign.leq(&other.sign)
            && self.nullability.leq(&other.nullability)
            && self.range.leq(&other.range)
    }

    fn widen(&self, newer: &Self, iteration: usize) -> Self {
        if !self.reachable {
            return newer.clone();
        }
        if !newer.reachable {
            return self.clone();
        }
        Self {
            reachable: true,
            sign: self.sign.widen(&newer.sign, iteration),
            nullability: self.nullability.widen(&newer.nullability, iteration),
            range: self.range.widen(&newer.range, iteration),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(bindings: &[(&str, AbstractValue)]) -> AbstractState {
        let mut s = AbstractState::new();
        for (var, value) in bindings {
            s.set(var, value, DomainSet::all());
        }
        s
    }

    #[test]
    fn test_missing_variable_reads_top() {
        let s = AbstractState::new();
        assert_eq!(s.get("x"), AbstractValue::top());
        assert!(AbstractState::bottom().get("x").is_bottom());
    }

    #[test]
    fn test_setting_top_keeps_map_canonical() {
        let mut s = state(&[("x", AbstractValue::constant(1))]);
        s.set("x", &AbstractValue::top(), DomainSet::all());
        assert_eq!(s, AbstractState::new());
    }

    #[test]
    fn test_join_uses_shared_keys() {
        let a = state(&[("x", AbstractValue::constant(1)), ("y", AbstractValue::none())]);
        let b = state(&[("x", AbstractValue::constant(3))]);
        let joined = a.join(&b);
        assert_eq!(joined.get("x").range, Range::finite(1, 3));
        assert_eq!(joined.get("y"), AbstractValue::top());
        assert!(a.leq(&joined));
        assert!(b.leq(&joined));
    }

    #[test]
    fn test_bottom_is_identity_for_join() {
        let a = state(&[("x", AbstractValue::constant(1))]);
        assert_eq!(a.join(&AbstractState::bottom()), a);
        assert_eq!(AbstractState::bottom().join(&a), a);
        assert!(AbstractState::bottom().leq(&a));
        assert!(!a.leq(&AbstractState::bottom()));
    }

    #[test]
    fn test_refine_to_empty_is_unreachable() {
        let mut s = state(&[("x", AbstractValue::none())]);
        s.refine("x", &AbstractValue::not_null(), DomainSet::all());
        assert!(!s.is_reachable());
    }

    #[test]
    fn test_disabled_domains_are_not_recorded() {
        let mut s = AbstractState::new();
        s.set("x", &AbstractValue::constant(-4), DomainSet::only(Domain::Sign));
        assert_eq!(s.sign.get("x"), Sign::Negative);
        assert!(s.range.is_empty());
        assert!(s.nullability.is_empty());
    }

    #[test]
    fn test_widen_loop_counter() {
        let old = state(&[("i", AbstractValue::int_in(Range::finite(0, 1)))]);
        let new = state(&[("i", AbstractValue::int_in(Range::finite(0, 2)))]);
        let widened = old.widen(&new, 3);
        assert_eq!(widened.get("i").range, Range::at_least(0));
    }
}
