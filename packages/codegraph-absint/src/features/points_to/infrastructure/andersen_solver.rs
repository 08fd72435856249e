//! Andersen's Points-to Solver
//!
//! Inclusion-based, field-sensitive, with call constraints resolved on the
//! fly: a dispatch constraint looks up the target for every receiver object
//! as objects flow in, and passes only that object as `self`. Newly reached
//! (function, context) pairs are handed back to the caller, which generates
//! their constraints before the next round.
//!
//! Rounds re-apply every constraint until nothing grows. All sets only grow
//! and the universe of objects, fields and variables is finite, so the
//! iteration terminates.
//!
//! # References
//! - Andersen, L. O. "Program Analysis and Specialization for C" (PhD 1994)
//! - Pearce et al. "Efficient Field-Sensitive Pointer Analysis" (CC 2004)

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::FxHashMap;

use crate::features::points_to::domain::{
    CallConstraint, CallTarget, Constraint, ContextId, ContextTable, FieldKey, HeapObject,
    HeapObjectId, PointsToSet, PtrVar,
};
use crate::features::virtual_dispatch::ClassHierarchy;
use crate::shared::models::{FunctionId, NodeId, ProgramIndex};

/// Read-only program facts a round needs
pub struct SolverEnv<'e, 'a> {
    pub index: &'e ProgramIndex<'a>,
    pub hierarchy: &'e ClassHierarchy,
    pub objects: &'e [HeapObject],
}

#[derive(Debug, Default)]
pub struct AndersenSolver {
    constraints: Vec<Constraint>,
    pub(crate) pts: FxHashMap<PtrVar, PointsToSet>,
    pub(crate) field_pts: FxHashMap<(HeapObjectId, FieldKey), PointsToSet>,
    pub(crate) call_targets: BTreeMap<NodeId, BTreeSet<FunctionId>>,
}

impl AndersenSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn get(&self, var: &PtrVar) -> Option<&PointsToSet> {
        self.pts.get(var)
    }

    /// Apply every constraint once. Returns whether any set grew, and the
    /// (function, context) pairs calls reached.
    pub fn round(
        &mut self,
        env: &SolverEnv<'_, '_>,
        contexts: &mut ContextTable,
    ) -> (bool, Vec<(FunctionId, ContextId)>) {
        let constraints = std::mem::take(&mut self.constraints);
        let mut changed = false;
        let mut reached = Vec::new();

        for constraint in &constraints {
            changed |= match constraint {
                Constraint::Alloc { object, to } => self.insert(to, *object),
                Constraint::Copy { from, to } => self.copy(from, to),
                Constraint::Load { base, field, to } => {
                    let mut grew = false;
                    for object in self.objects_of(base) {
                        let source = self
                            .field_pts
                            .get(&(object, field.clone()))
                            .cloned()
                            .unwrap_or_default();
                        grew |= self.union_into(to, &source);
                    }
                    grew
                }
                Constraint::Store { base, field, from } => {
                    let source = self.pts.get(from).cloned().unwrap_or_default();
                    let mut grew = false;
                    if !source.is_empty() {
                        for object in self.objects_of(base) {
                            let slot = self.field_pts.entry((object, field.clone())).or_default();
                            let before = slot.len();
                            slot.extend(source.iter().copied());
                            grew |= slot.len() != before;
                        }
                    }
                    grew
                }
                Constraint::Call(call) => self.call(call, env, contexts, &mut reached),
            };
        }

        // Calls never add constraints themselves; the caller does between rounds
        self.constraints = constraints;
        (changed, reached)
    }

    fn call(
        &mut self,
        call: &CallConstraint,
        env: &SolverEnv<'_, '_>,
        contexts: &mut ContextTable,
        reached: &mut Vec<(FunctionId, ContextId)>,
    ) -> bool {
        let mut changed = false;
        match &call.target {
            CallTarget::Static(targets) => {
                for &target in targets {
                    changed |= self.bind(call, target, None, 0, env, contexts, reached);
                }
            }
            CallTarget::Construct { object, init } => {
                changed |= self.insert(&call.result, *object);
                if let Some(init) = *init {
                    changed |= self.bind(call, init, Some(*object), 1, env, contexts, reached);
                }
            }
            CallTarget::Dispatch { method, receiver } => {
                for object in self.objects_of(receiver) {
                    let Some(class) = env.objects[object.index()].kind.class() else {
                        continue;
                    };
                    let Some(target) = env.hierarchy.lookup(class, method) else {
                        continue;
                    };
                    changed |= self
                        .call_targets
                        .entry(call.site)
                        .or_default()
                        .insert(target);
                    changed |= self.bind(call, target, Some(object), 1, env, contexts, reached);
                }
            }
        }
        changed
    }

    /// Parameter passing for one resolved target; `receiver` goes to the
    /// first parameter and arguments start at `first_arg_param`
    #[allow(clippy::too_many_arguments)]
    fn bind(
        &mut self,
        call: &CallConstraint,
        target: FunctionId,
        receiver: Option<HeapObjectId>,
        first_arg_param: usize,
        env: &SolverEnv<'_, '_>,
        contexts: &mut ContextTable,
        reached: &mut Vec<(FunctionId, ContextId)>,
    ) -> bool {
        let callee_ctx = contexts.push(call.context, target);
        reached.push((target, callee_ctx));
        let params = &env.index.function(target).params;
        let param = |name: &String| PtrVar::Local {
            function: target,
            context: callee_ctx,
            name: name.clone(),
        };

        let mut changed = false;
        if let (Some(object), Some(self_param)) = (receiver, params.first()) {
            changed |= self.insert(&param(self_param), object);
        }
        for (arg, name) in call.args.iter().zip(params.iter().skip(first_arg_param)) {
            changed |= self.copy(arg, &param(name));
        }
        let ret = PtrVar::Return {
            function: target,
            context: callee_ctx,
        };
        changed |= self.copy(&ret, &call.result);
        changed
    }

    fn objects_of(&self, var: &PtrVar) -> Vec<HeapObjectId> {
        self.pts
            .get(var)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    fn insert(&mut self, var: &PtrVar, object: HeapObjectId) -> bool {
        self.pts.entry(var.clone()).or_default().insert(object)
    }

    fn copy(&mut self, from: &PtrVar, to: &PtrVar) -> bool {
        match self.pts.get(from) {
            Some(source) if !source.is_empty() => {
                let source = source.clone();
                self.union_into(to, &source)
            }
            _ => false,
        }
    }

    fn union_into(&mut self, to: &PtrVar, source: &PointsToSet) -> bool {
        if source.is_empty() {
            return false;
        }
        let slot = self.pts.entry(to.clone()).or_default();
        let before = slot.len();
        slot.extend(source.iter().copied());
        slot.len() != before
    }
}
