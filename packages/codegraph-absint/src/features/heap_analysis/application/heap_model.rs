//! Heap operations the abstract interpreter performs
//!
//! Ties the flow-sensitive [`HeapState`] to the flow-insensitive points-to
//! relation: which objects an expression may denote comes from the pointer
//! analysis, what their fields hold comes from the heap state.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::features::heap_analysis::domain::{Field, HeapEffects, HeapState, HeapValue};
use crate::features::lattice::{AbstractValue, Lattice, Range};
use crate::features::points_to::{HeapObjectId, PointsToGraph, PointsToSet};
use crate::shared::models::{BinOp, NodeId};

/// Methods known to mutate their receiver in place
pub const KNOWN_MUTATING_METHODS: &[&str] = &[
    "append",
    "extend",
    "insert",
    "pop",
    "remove",
    "clear",
    "update",
    "setdefault",
    "sort",
    "reverse",
    "add",
    "discard",
];

pub fn is_known_mutating(method: &str) -> bool {
    KNOWN_MUTATING_METHODS.contains(&method)
}

/// Result of checking an index against a container length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoundsCheck {
    InBounds,
    /// Some index/length pair is out of range
    Possible,
    /// Every index/length pair is out of range
    Definite,
}

/// Check `container[index]` for a container of `length` elements
/// (negative indices count from the end)
///
/// Only bounded facts produce a finding: an index with no finite bound or a
/// length without a finite upper bound is assumed in range.
pub fn check_bounds(length: &AbstractValue, index: &AbstractValue) -> BoundsCheck {
    if length.is_bottom() || index.is_bottom() || !length.is_numeric() || !index.is_numeric() {
        return BoundsCheck::InBounds;
    }
    let (n, i) = (length.range, index.range);
    if !n.hi.is_finite() || (!i.lo.is_finite() && !i.hi.is_finite()) {
        return BoundsCheck::InBounds;
    }
    if i.lo >= n.hi || i.hi < n.hi.neg() {
        return BoundsCheck::Definite;
    }
    if i.hi >= n.lo || i.lo < n.lo.neg() {
        return BoundsCheck::Possible;
    }
    BoundsCheck::InBounds
}

/// Heap semantics over one pointer-analysis result
#[derive(Clone, Copy)]
pub struct HeapModel<'p> {
    pointer: &'p PointsToGraph,
}

impl<'p> HeapModel<'p> {
    pub fn new(pointer: &'p PointsToGraph) -> Self {
        Self { pointer }
    }

    pub fn pointer(&self) -> &'p PointsToGraph {
        self.pointer
    }

    /// Objects the expression `node` may evaluate to
    pub fn targets(&self, node: NodeId) -> &'p PointsToSet {
        self.pointer.points_to_node(node)
    }

    /// The single object `node` evaluates to, if there is exactly one
    pub fn referent(&self, node: NodeId) -> Option<HeapObjectId> {
        let targets = self.targets(node);
        match targets.iter().next() {
            Some(&object) if targets.len() == 1 => Some(object),
            _ => None,
        }
    }

    /// Register the objects created by the allocation site `site`
    pub fn allocate(&self, heap: &mut HeapState, site: NodeId) -> BTreeSet<HeapObjectId> {
        let objects: BTreeSet<HeapObjectId> =
            self.pointer.objects_at_site(site).iter().copied().collect();
        for &object in &objects {
            heap.allocate(object);
        }
        objects
    }

    /// Collection literal: allocate, record its length and summarize the
    /// element values
    pub fn init_collection(&self, heap: &mut HeapState, site: NodeId, elements: &[AbstractValue]) {
        let objects = self.allocate(heap, site);
        if objects.is_empty() {
            return;
        }
        let length = i64::try_from(elements.len()).unwrap_or(i64::MAX);
        heap.set_field(
            &objects,
            Field::Length,
            HeapValue::Primitive(AbstractValue::constant(length)),
        );
        if !elements.is_empty() {
            let summary = elements
                .iter()
                .fold(AbstractValue::bottom(), |acc, v| acc.join(v));
            heap.set_field(&objects, Field::Elements, HeapValue::Primitive(summary));
        }
    }

    /// Value stored in `field` of whatever `base` evaluates to
    pub fn load(&self, heap: &HeapState, base: NodeId, field: &Field) -> AbstractValue {
        heap.get_field_of(self.targets(base), field)
    }

    /// Store through `base`: strong update for a single non-summary object
    pub fn store(
        &self,
        heap: &mut HeapState,
        base: NodeId,
        field: Field,
        value: AbstractValue,
        value_node: Option<NodeId>,
    ) {
        let referent = value_node.and_then(|n| self.referent(n));
        heap.set_field(self.targets(base), field, HeapValue::from_value(value, referent));
    }

    /// `base[i] = value`: the element summary only ever grows
    pub fn store_element(
        &self,
        heap: &mut HeapState,
        base: NodeId,
        value: AbstractValue,
        value_node: Option<NodeId>,
    ) {
        let referent = value_node.and_then(|n| self.referent(n));
        let stored = HeapValue::from_value(value, referent);
        for &object in self.targets(base) {
            heap.weak_update(object, Field::Elements, stored.clone());
        }
    }

    /// Number of elements of `base` (at least zero even when unknown)
    pub fn length(&self, heap: &HeapState, base: NodeId) -> AbstractValue {
        let non_negative = AbstractValue::int_in(Range::at_least(0));
        let targets = self.targets(base);
        if targets.is_empty() {
            return non_negative;
        }
        let length = heap.get_field_of(targets, &Field::Length);
        if length.is_top() || !length.is_numeric() {
            return non_negative;
        }
        length.meet(&non_negative)
    }

    /// Effect of `receiver.method(args)` on builtin containers: sets the
    /// mutation marker, tracks `Length` and joins stored values into
    /// `Elements`
    pub fn apply_mutating_method(
        &self,
        heap: &mut HeapState,
        receiver: NodeId,
        method: &str,
        args: &[AbstractValue],
    ) {
        let targets = self.targets(receiver);
        if targets.is_empty() || !heap.is_reachable() {
            return;
        }
        heap.set_field(
            targets,
            Field::MutationMarker,
            HeapValue::Primitive(AbstractValue::from_bool(true)),
        );

        let old = heap.get_field_of(targets, &Field::Length);
        let one = AbstractValue::constant(1);
        let new_length = match method {
            "append" | "insert" => Some(AbstractValue::binary(BinOp::Add, &old, &one)),
            // Set insertion may find the element already present
            "add" | "setdefault" => Some(AbstractValue::binary(
                BinOp::Add,
                &old,
                &AbstractValue::int_in(Range::finite(0, 1)),
            )),
            "extend" | "update" => Some(AbstractValue::binary(
                BinOp::Add,
                &old,
                &AbstractValue::int_in(Range::at_least(0)),
            )),
            "pop" | "remove" => Some(AbstractValue::binary(BinOp::Sub, &old, &one)),
            "discard" => Some(AbstractValue::binary(
                BinOp::Sub,
                &old,
                &AbstractValue::int_in(Range::finite(0, 1)),
            )),
            "clear" => Some(AbstractValue::constant(0)),
            _ => None,
        };
        if let Some(length) = new_length {
            let non_negative = AbstractValue::int_in(Range::at_least(0));
            // Removing from a provably empty container raises; the length
            // afterwards is unconstrained rather than empty
            let length = match length.meet(&non_negative) {
                met if length.is_numeric() && !met.is_bottom() => met,
                _ => non_negative,
            };
            heap.set_field(targets, Field::Length, HeapValue::Primitive(length));
        }

        let stored = match method {
            "append" | "add" => args.first(),
            "insert" | "setdefault" => args.get(1),
            _ => None,
        };
        if let Some(value) = stored {
            for &object in targets {
                heap.weak_update(object, Field::Elements, HeapValue::Primitive(*value));
            }
        }
        if method == "clear" {
            // Elements of the old contents are gone; keep a sound summary
            for &object in targets {
                let top = HeapValue::Primitive(AbstractValue::top());
                heap.weak_update(object, Field::Elements, top);
            }
        }
    }

    /// Objects reachable from the values passed to an unknown call
    pub fn escaping(&self, args: &[NodeId]) -> PointsToSet {
        let roots: Vec<HeapObjectId> = args
            .iter()
            .flat_map(|&node| self.targets(node).iter().copied())
            .collect();
        self.pointer.reachable_from(&roots)
    }

    /// Everything reachable from the arguments becomes unknown
    pub fn invalidate_escaping(&self, heap: &mut HeapState, args: &[NodeId]) -> HeapEffects {
        let effects = HeapEffects::unknown(self.escaping(args));
        effects.apply(heap);
        effects
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_check_constant_index() {
        let three = AbstractValue::constant(3);
        assert_eq!(check_bounds(&three, &AbstractValue::constant(1)), BoundsCheck::InBounds);
        assert_eq!(check_bounds(&three, &AbstractValue::constant(-3)), BoundsCheck::InBounds);
        assert_eq!(check_bounds(&three, &AbstractValue::constant(3)), BoundsCheck::Definite);
        assert_eq!(check_bounds(&three, &AbstractValue::constant(-4)), BoundsCheck::Definite);
    }

    #[test]
    fn test_bounds_check_ranges() {
        let three = AbstractValue::constant(3);
        let maybe = AbstractValue::int_in(Range::finite(0, 5));
        assert_eq!(check_bounds(&three, &maybe), BoundsCheck::Possible);

        // Unbounded index or length: no claim
        assert_eq!(check_bounds(&three, &AbstractValue::any_int()), BoundsCheck::InBounds);
        let unknown_len = AbstractValue::int_in(Range::at_least(0));
        assert_eq!(
            check_bounds(&unknown_len, &AbstractValue::constant(7)),
            BoundsCheck::InBounds
        );
    }

    #[test]
    fn test_mutating_list_includes_container_methods() {
        assert!(is_known_mutating("append"));
        assert!(is_known_mutating("discard"));
        assert!(!is_known_mutating("get"));
    }
}
