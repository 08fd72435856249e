//! Heap deltas of one function, replayed at its call sites

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::heap_state::{FieldKey, HeapState};
use super::heap_value::{Field, HeapValue};
use crate::features::points_to::HeapObjectId;

/// Object allocated by the function (or by its callees)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub object: HeapObjectId,
    /// Allocated more than once per call
    pub summary: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeapWrite {
    pub object: HeapObjectId,
    pub field: Field,
    pub value: HeapValue,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeapEffects {
    pub allocations: Vec<Allocation>,
    /// Written on every path to the exit
    pub must_writes: Vec<HeapWrite>,
    /// Written on some path only
    pub may_writes: Vec<HeapWrite>,
    /// Passed to code the analysis cannot see
    pub invalidated: BTreeSet<HeapObjectId>,
}

impl HeapEffects {
    /// Delta between the entry heap of a function and its exit heap
    pub fn from_exit(entry: &HeapState, exit: &HeapState) -> Self {
        if !exit.is_reachable() {
            return Self::default();
        }

        let allocations = exit
            .allocated()
            .iter()
            .filter(|o| !entry.is_allocated(**o))
            .map(|&object| Allocation {
                object,
                summary: exit.is_summary(object),
            })
            .collect();

        let mut must_writes = Vec::new();
        for key in exit.must_written() {
            let value = exit
                .read(key.0, &key.1)
                .or_else(|| exit.may_written().get(key));
            if let Some(value) = value {
                must_writes.push(write(key, value.clone()));
            }
        }
        let may_writes = exit
            .may_written()
            .iter()
            .filter(|(key, _)| !exit.must_written().contains(*key))
            .map(|(key, value)| write(key, value.clone()))
            .collect();

        Self {
            allocations,
            must_writes,
            may_writes,
            invalidated: exit
                .invalidated()
                .iter()
                .filter(|o| !entry.invalidated().contains(*o))
                .copied()
                .collect(),
        }
    }

    /// Conservative effects of a call nothing is known about
    pub fn unknown(reachable_objects: impl IntoIterator<Item = HeapObjectId>) -> Self {
        Self {
            invalidated: reachable_objects.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
            && self.must_writes.is_empty()
            && self.may_writes.is_empty()
            && self.invalidated.is_empty()
    }

    /// Replay at a call site: allocations, then writes, then invalidation
    pub fn apply(&self, heap: &mut HeapState) {
        if !heap.is_reachable() {
            return;
        }
        for allocation in &self.allocations {
            heap.allocate(allocation.object);
            if allocation.summary {
                heap.mark_summary(allocation.object);
            }
        }
        for w in &self.must_writes {
            heap.set_field(&BTreeSet::from([w.object]), w.field.clone(), w.value.clone());
        }
        for w in &self.may_writes {
            heap.weak_update(w.object, w.field.clone(), w.value.clone());
        }
        for &object in &self.invalidated {
            heap.invalidate(object);
        }
    }

    /// Objects whose fields the effects touch
    pub fn touched(&self) -> BTreeSet<HeapObjectId> {
        self.must_writes
            .iter()
            .chain(&self.may_writes)
            .map(|w| w.object)
            .chain(self.invalidated.iter().copied())
            .collect()
    }

    pub fn join(&self, other: &Self) -> Self {
        self.merge(other, None)
    }

    pub fn widen(&self, newer: &Self, iteration: usize) -> Self {
        self.merge(newer, Some(iteration))
    }

    /// Writes both sides make on every path stay must-writes; everything
    /// else is a may-write
    fn merge(&self, other: &Self, widen: Option<usize>) -> Self {
        let combine = |a: &HeapValue, b: &HeapValue| match widen {
            Some(iteration) => a.widen(b, iteration),
            None => a.join(b),
        };

        let mut allocations: BTreeMap<HeapObjectId, bool> = BTreeMap::new();
        for allocation in self.allocations.iter().chain(&other.allocations) {
            *allocations.entry(allocation.object).or_default() |= allocation.summary;
        }

        let ours = index(&self.must_writes);
        let theirs = index(&other.must_writes);
        let mut must = BTreeMap::new();
        let mut may: BTreeMap<FieldKey, HeapValue> = BTreeMap::new();
        for (key, value) in &ours {
            match theirs.get(key) {
                Some(other_value) => {
                    must.insert(key.clone(), combine(value, other_value));
                }
                None => add_may(&mut may, key, value, &combine),
            }
        }
        for (key, value) in &theirs {
            if !ours.contains_key(key) {
                add_may(&mut may, key, value, &combine);
            }
        }
        for (key, value) in index(&self.may_writes).iter().chain(index(&other.may_writes).iter()) {
            add_may(&mut may, key, value, &combine);
        }
        may.retain(|key, _| !must.contains_key(key));

        Self {
            allocations: allocations
                .into_iter()
                .map(|(object, summary)| Allocation { object, summary })
                .collect(),
            must_writes: must.iter().map(|(k, v)| write(k, v.clone())).collect(),
            may_writes: may.iter().map(|(k, v)| write(k, v.clone())).collect(),
            invalidated: self.invalidated.union(&other.invalidated).copied().collect(),
        }
    }
}

fn write(key: &FieldKey, value: HeapValue) -> HeapWrite {
    HeapWrite {
        object: key.0,
        field: key.1.clone(),
        value,
    }
}

fn index(writes: &[HeapWrite]) -> BTreeMap<FieldKey, HeapValue> {
    writes
        .iter()
        .map(|w| ((w.object, w.field.clone()), w.value.clone()))
        .collect()
}

fn add_may(
    may: &mut BTreeMap<FieldKey, HeapValue>,
    key: &FieldKey,
    value: &HeapValue,
    combine: &impl Fn(&HeapValue, &HeapValue) -> HeapValue,
) {
    let merged = match may.get(key) {
        Some(old) => combine(old, value),
        None => value.clone(),
    };
    may.insert(key.clone(), merged);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::lattice::{AbstractValue, Lattice, Nullability};

    fn attr(name: &str) -> Field {
        Field::Attr(name.to_string())
    }

    #[test]
    fn test_effects_of_constructor_like_function() {
        let entry = HeapState::new();
        let mut exit = entry.clone();
        exit.allocate(HeapObjectId(0));
        exit.set_field(&BTreeSet::from([HeapObjectId(0)]), attr("v"), HeapValue::Null);

        let effects = HeapEffects::from_exit(&entry, &exit);
        assert_eq!(
            effects.allocations,
            vec![Allocation { object: HeapObjectId(0), summary: false }]
        );
        assert_eq!(effects.must_writes.len(), 1);
        assert!(effects.may_writes.is_empty());

        let mut caller = HeapState::new();
        effects.apply(&mut caller);
        assert!(caller.is_initialized(HeapObjectId(0)));
        assert_eq!(caller.get_field(HeapObjectId(0), &attr("v")), AbstractValue::none());
    }

    #[test]
    fn test_write_to_unknown_object_survives_as_may_write() {
        // Callee writes a parameter's field: the callee's heap cannot hold it
        // (the object is not initialized there) but the effect must carry it
        let entry = HeapState::new();
        let mut exit = entry.clone();
        let targets = BTreeSet::from([HeapObjectId(3), HeapObjectId(4)]);
        exit.set_field(&targets, attr("v"), HeapValue::Null);
        assert_eq!(exit.get_field(HeapObjectId(3), &attr("v")), AbstractValue::top());

        let effects = HeapEffects::from_exit(&entry, &exit);
        assert_eq!(effects.may_writes.len(), 2);

        let mut caller = HeapState::new();
        caller.allocate(HeapObjectId(3));
        effects.apply(&mut caller);
        // Never written before the call: only the callee's value is possible
        assert_eq!(caller.get_field(HeapObjectId(3), &attr("v")), AbstractValue::none());
    }

    #[test]
    fn test_merge_demotes_one_sided_must_writes() {
        let one = HeapEffects {
            must_writes: vec![HeapWrite {
                object: HeapObjectId(0),
                field: attr("v"),
                value: HeapValue::Null,
            }],
            ..HeapEffects::default()
        };
        let other = HeapEffects {
            must_writes: vec![HeapWrite {
                object: HeapObjectId(0),
                field: attr("w"),
                value: HeapValue::Reference(HeapObjectId(1)),
            }],
            ..HeapEffects::default()
        };
        let merged = one.join(&other);
        assert!(merged.must_writes.is_empty());
        assert_eq!(merged.may_writes.len(), 2);

        let both = one.join(&one);
        assert_eq!(both, one);
    }

    #[test]
    fn test_unknown_call_invalidates() {
        let effects = HeapEffects::unknown([HeapObjectId(2)]);
        let mut heap = HeapState::new();
        heap.allocate(HeapObjectId(2));
        heap.set_field(&BTreeSet::from([HeapObjectId(2)]), attr("v"), HeapValue::Null);
        effects.apply(&mut heap);
        assert!(heap.get_field(HeapObjectId(2), &attr("v")).is_top());
        assert!(heap.is_mutated(HeapObjectId(2)));
        assert_ne!(
            heap.get_field(HeapObjectId(2), &Field::MutationMarker).nullability,
            Nullability::DefinitelyNull
        );
    }
}
