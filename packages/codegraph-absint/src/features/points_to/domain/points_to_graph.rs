//! Solved points-to relation
//!
//! Per-context facts are collapsed onto what the abstract interpreter asks
//! for: the objects a local, an expression or a return may reference in any
//! context of its function.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::abstract_location::{HeapObject, HeapObjectId};
use super::constraint::FieldKey;
use crate::shared::models::{FunctionId, NodeId};

/// Monotonically growing set of heap objects
pub type PointsToSet = BTreeSet<HeapObjectId>;

static EMPTY: PointsToSet = BTreeSet::new();

#[derive(Debug, Clone, Default, Serialize)]
pub struct PointsToStats {
    pub objects: usize,
    pub contexts: usize,
    pub constraints: usize,
    pub iterations: usize,
}

#[derive(Debug, Clone, Default)]
pub struct PointsToGraph {
    pub(crate) objects: Vec<HeapObject>,
    pub(crate) locals: BTreeMap<(FunctionId, String), PointsToSet>,
    pub(crate) nodes: BTreeMap<NodeId, PointsToSet>,
    pub(crate) returns: BTreeMap<FunctionId, PointsToSet>,
    pub(crate) fields: BTreeMap<(HeapObjectId, FieldKey), PointsToSet>,
    pub(crate) sites: BTreeMap<NodeId, Vec<HeapObjectId>>,
    pub(crate) call_targets: BTreeMap<NodeId, BTreeSet<FunctionId>>,
    pub stats: PointsToStats,
}

impl PointsToGraph {
    pub fn objects(&self) -> &[HeapObject] {
        &self.objects
    }

    pub fn object(&self, id: HeapObjectId) -> &HeapObject {
        &self.objects[id.index()]
    }

    /// Objects `var` may reference inside `function`
    pub fn points_to(&self, function: FunctionId, var: &str) -> &PointsToSet {
        self.locals
            .get(&(function, var.to_string()))
            .unwrap_or(&EMPTY)
    }

    /// Objects the expression `node` may evaluate to
    pub fn points_to_node(&self, node: NodeId) -> &PointsToSet {
        self.nodes.get(&node).unwrap_or(&EMPTY)
    }

    pub fn points_to_return(&self, function: FunctionId) -> &PointsToSet {
        self.returns.get(&function).unwrap_or(&EMPTY)
    }

    pub fn points_to_field(&self, object: HeapObjectId, field: &FieldKey) -> &PointsToSet {
        self.fields
            .get(&(object, field.clone()))
            .unwrap_or(&EMPTY)
    }

    /// Objects allocated by the expression `node`, one per context
    pub fn objects_at_site(&self, node: NodeId) -> &[HeapObjectId] {
        self.sites.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Targets found by dispatching on receiver objects
    pub fn dispatch_targets(&self, site: NodeId) -> Option<&BTreeSet<FunctionId>> {
        self.call_targets.get(&site)
    }

    /// Runtime type names of the objects `node` may evaluate to
    pub fn receiver_types(&self, node: NodeId) -> BTreeSet<&str> {
        self.points_to_node(node)
            .iter()
            .map(|&o| self.object(o).type_name())
            .collect()
    }

    pub fn may_alias(&self, a: &PointsToSet, b: &PointsToSet) -> bool {
        !a.is_disjoint(b)
    }

    /// Whether two locals of `function` may reference a common object
    pub fn may_alias_vars(&self, function: FunctionId, v1: &str, v2: &str) -> bool {
        self.may_alias(self.points_to(function, v1), self.points_to(function, v2))
    }

    /// `roots` and every object reachable from them through fields
    pub fn reachable_from<'s>(
        &self,
        roots: impl IntoIterator<Item = &'s HeapObjectId>,
    ) -> PointsToSet {
        let mut seen: PointsToSet = BTreeSet::new();
        let mut stack: Vec<HeapObjectId> = roots.into_iter().copied().collect();
        while let Some(object) = stack.pop() {
            if !seen.insert(object) {
                continue;
            }
            let first = (object, FieldKey::Attr(String::new()));
            for ((owner, _), targets) in self.fields.range(first..) {
                if *owner != object {
                    break;
                }
                stack.extend(targets.iter().copied().filter(|t| !seen.contains(t)));
            }
        }
        seen
    }
}
