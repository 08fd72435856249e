//! Abstract state at one program point: variables plus heap

use serde::Serialize;

use crate::features::dataflow::AbstractState;
use crate::features::heap_analysis::HeapState;
use crate::features::lattice::Lattice;

/// Variable holding the value a function returns
pub const RETURN_SLOT: &str = "<return>";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgramState {
    pub env: AbstractState,
    pub heap: HeapState,
}

impl ProgramState {
    pub fn new(env: AbstractState, heap: HeapState) -> Self {
        Self { env, heap }.normalized()
    }

    pub fn is_reachable(&self) -> bool {
        self.env.is_reachable() && self.heap.is_reachable()
    }

    pub fn mark_unreachable(&mut self) {
        *self = Self::bottom();
    }

    /// Either half unreachable makes the whole point unreachable
    fn normalized(self) -> Self {
        if self.is_reachable() {
            self
        } else {
            Self::bottom()
        }
    }
}

impl Default for ProgramState {
    fn default() -> Self {
        Self::top()
    }
}

impl Lattice for ProgramState {
    fn bottom() -> Self {
        Self {
            env: AbstractState::bottom(),
            heap: HeapState::bottom(),
        }
    }

    fn top() -> Self {
        Self {
            env: AbstractState::top(),
            heap: HeapState::top(),
        }
    }

    fn join(&self, other: &Self) -> Self {
        if !self.is_reachable() {
            return other.clone().normalized();
        }
        if !other.is_reachable() {
            return self.clone();
        }
        Self {
            env: self.env.join(&other.env),
            heap: self.heap.join(&other.heap),
        }
    }

    fn meet(&self, other: &Self) -> Self {
        Self {
            env: self.env.meet(&other.env),
            heap: self.heap.meet(&other.heap),
        }
        .normalized()
    }

    fn leq(&self, other: &Self) -> bool {
        if !self.is_reachable() {
            return true;
        }
        if !other.is_reachable() {
            return false;
        }
        self.env.leq(&other.env) && self.heap.leq(&other.heap)
    }

    fn widen(&self, newer: &Self, iteration: usize) -> Self {
        if !self.is_reachable() {
            return newer.clone().normalized();
        }
        if !newer.is_reachable() {
            return self.clone();
        }
        Self {
            env: self.env.widen(&newer.env, iteration),
            heap: self.heap.widen(&newer.heap, iteration),
        }
    }

    fn is_bottom(&self) -> bool {
        !self.is_reachable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::lattice::{AbstractValue, DomainSet};

    #[test]
    fn test_unreachable_env_makes_state_bottom() {
        let mut state = ProgramState::top();
        state.env.set("x", &AbstractValue::bottom(), DomainSet::all());
        assert!(state.is_bottom());
        let other = ProgramState::top();
        assert_eq!(state.join(&other), other);
        assert!(state.leq(&other));
    }

    #[test]
    fn test_join_is_componentwise() {
        let mut a = ProgramState::top();
        a.env.set("x", &AbstractValue::constant(1), DomainSet::all());
        let mut b = ProgramState::top();
        b.env.set("x", &AbstractValue::constant(3), DomainSet::all());
        let joined = a.join(&b);
        assert!(joined.env.get("x").contains_int(2));
        assert!(a.leq(&joined) && b.leq(&joined));
    }
}
