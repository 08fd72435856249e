//! Function summaries
//!
//! The bottom-up phase fixes the part callers consult (return value and heap
//! effects, computed with unknown parameters). The top-down phase fills in
//! the rest: the argument abstraction seen at call sites, the exit state
//! under that input, and diagnostics.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::diagnostic::Diagnostic;
use crate::features::heap_analysis::HeapEffects;
use crate::features::lattice::{AbstractValue, Lattice, Nullability};
use crate::shared::models::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionSummary {
    pub function: String,
    pub params: Vec<String>,
    /// Parameter values joined over every analyzed call site
    pub input: BTreeMap<String, AbstractValue>,
    pub return_value: AbstractValue,
    pub effects: HeapEffects,
    /// Call site → qualified names of the functions it may invoke
    pub call_targets: BTreeMap<NodeId, BTreeSet<String>>,
    /// Variables with a non-Top value at the exit
    pub exit_state: BTreeMap<String, AbstractValue>,
    pub diagnostics: Vec<Diagnostic>,
    /// Results were forced to Top
    pub degraded: bool,
    /// Bottom-up rounds spent on the function's SCC
    pub rounds: usize,
}

impl FunctionSummary {
    /// Starting point of recursive SCC iteration: never returns, no effects
    pub fn initial(function: impl Into<String>, params: Vec<String>) -> Self {
        Self {
            function: function.into(),
            params,
            input: BTreeMap::new(),
            return_value: AbstractValue::bottom(),
            effects: HeapEffects::default(),
            call_targets: BTreeMap::new(),
            exit_state: BTreeMap::new(),
            diagnostics: Vec::new(),
            degraded: false,
            rounds: 0,
        }
    }

    /// Whether callers would see any difference
    pub fn same_interface(&self, other: &Self) -> bool {
        self.return_value == other.return_value && self.effects == other.effects
    }

    /// Widen the caller-visible part by `newer`
    pub fn widen(&self, newer: &Self, iteration: usize) -> Self {
        Self {
            return_value: self.return_value.widen(&newer.return_value, iteration),
            effects: self.effects.widen(&newer.effects, iteration),
            ..newer.clone()
        }
    }

    /// Give up on precision: any return value, everything `effects` touches
    /// unknown
    pub fn degrade(&mut self, effects: HeapEffects) {
        self.return_value = AbstractValue::top();
        self.effects = effects;
        self.exit_state.clear();
        self.degraded = true;
    }

    pub fn returns_none(&self) -> bool {
        self.return_value.nullability == Nullability::DefinitelyNull
    }
}
