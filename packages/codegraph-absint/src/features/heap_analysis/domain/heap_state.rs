//! Field-sensitive abstract heap
//!
//! Keyed by (heap object, field). A key missing from the map reads as:
//! - unset, when the object is *initialized* (allocated on every path here
//!   and so fully described by the map)
//! - unknown (Top) otherwise
//!
//! Sets tracked alongside the field map, with their merge rule:
//! - `initialized`: must, intersection
//! - `allocated`, `summary`, `invalidated`: may, union
//! - `must_written`: must, intersection
//! - `may_written`: may, union (keeps the join of every value written)

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::heap_value::{Field, HeapValue};
use crate::features::lattice::{AbstractValue, Lattice};
use crate::features::points_to::HeapObjectId;

pub type FieldKey = (HeapObjectId, Field);

/// Contents of one (object, field) slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    /// Never written on an initialized object
    Unset,
    Unknown,
    Value(HeapValue),
}

impl Slot {
    fn join(self, other: Self, widen: Option<usize>) -> Self {
        match (self, other) {
            (Slot::Unset, x) | (x, Slot::Unset) => x,
            (Slot::Unknown, _) | (_, Slot::Unknown) => Slot::Unknown,
            (Slot::Value(a), Slot::Value(b)) => Slot::Value(match widen {
                Some(iteration) => a.widen(&b, iteration),
                None => a.join(&b),
            }),
        }
    }

    fn leq(&self, other: &Self) -> bool {
        match (self, other) {
            (Slot::Unset, _) | (_, Slot::Unknown) => true,
            (Slot::Unknown, _) | (Slot::Value(_), Slot::Unset) => false,
            (Slot::Value(a), Slot::Value(b)) => a.leq(b),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeapState {
    reachable: bool,
    #[serde(serialize_with = "serialize_fields")]
    fields: BTreeMap<FieldKey, HeapValue>,
    initialized: BTreeSet<HeapObjectId>,
    allocated: BTreeSet<HeapObjectId>,
    summary: BTreeSet<HeapObjectId>,
    must_written: BTreeSet<FieldKey>,
    #[serde(serialize_with = "serialize_fields")]
    may_written: BTreeMap<FieldKey, HeapValue>,
    invalidated: BTreeSet<HeapObjectId>,
}

fn serialize_fields<S: serde::Serializer>(
    fields: &BTreeMap<FieldKey, HeapValue>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_map(
        fields
            .iter()
            .map(|((object, field), value)| (format!("{}{}", object, field), value)),
    )
}

impl Default for HeapState {
    fn default() -> Self {
        Self::new()
    }
}

impl HeapState {
    /// Reachable heap that knows nothing and has done nothing
    pub fn new() -> Self {
        Self {
            reachable: true,
            fields: BTreeMap::new(),
            initialized: BTreeSet::new(),
            allocated: BTreeSet::new(),
            summary: BTreeSet::new(),
            must_written: BTreeSet::new(),
            may_written: BTreeMap::new(),
            invalidated: BTreeSet::new(),
        }
    }

    /// The heap as a callee sees it on entry: the caller's field facts stay,
    /// its write and invalidation logs do not
    pub fn entry_view(&self) -> Self {
        Self {
            must_written: BTreeSet::new(),
            may_written: BTreeMap::new(),
            invalidated: BTreeSet::new(),
            ..self.clone()
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.reachable
    }

    pub fn slot(&self, object: HeapObjectId, field: &Field) -> Slot {
        match self.fields.get(&(object, field.clone())) {
            Some(value) => Slot::Value(value.clone()),
            None if self.initialized.contains(&object) => Slot::Unset,
            None => Slot::Unknown,
        }
    }

    /// Stored value, if one is known
    pub fn read(&self, object: HeapObjectId, field: &Field) -> Option<&HeapValue> {
        self.fields.get(&(object, field.clone()))
    }

    /// Abstract value of `object.field`; unset and unknown fields read as Top
    pub fn get_field(&self, object: HeapObjectId, field: &Field) -> AbstractValue {
        match self.read(object, field) {
            Some(value) => value.abstraction(),
            None => AbstractValue::top(),
        }
    }

    /// Join of `field` over every object in `targets` (Top when empty)
    pub fn get_field_of(&self, targets: &BTreeSet<HeapObjectId>, field: &Field) -> AbstractValue {
        if targets.is_empty() {
            return AbstractValue::top();
        }
        targets
            .iter()
            .map(|&o| self.get_field(o, field))
            .fold(AbstractValue::bottom(), |acc, v| acc.join(&v))
    }

    /// Register an allocation; a second allocation of the same object makes
    /// it a summary of several runtime objects
    pub fn allocate(&mut self, object: HeapObjectId) {
        if !self.allocated.insert(object) {
            self.summary.insert(object);
            return;
        }
        if !self.summary.contains(&object) {
            self.fields.retain(|(o, _), _| *o != object);
            self.initialized.insert(object);
        }
    }

    pub fn mark_summary(&mut self, object: HeapObjectId) {
        self.summary.insert(object);
    }

    /// Whether a write to `targets` replaces the old value
    pub fn can_strong_update(&self, targets: &BTreeSet<HeapObjectId>) -> bool {
        match targets.iter().next() {
            Some(object) if targets.len() == 1 => !self.summary.contains(object),
            _ => false,
        }
    }

    /// Write `value` into `field` of every object in `targets`
    pub fn set_field(&mut self, targets: &BTreeSet<HeapObjectId>, field: Field, value: HeapValue) {
        if !self.reachable || targets.is_empty() {
            return;
        }
        if self.can_strong_update(targets) {
            for &object in targets {
                let key = (object, field.clone());
                self.record_write(&key, &value);
                self.must_written.insert(key.clone());
                self.fields.insert(key, value.clone());
            }
        } else {
            for &object in targets {
                self.weak_update(object, field.clone(), value.clone());
            }
        }
    }

    /// Join `value` into the slot
    pub fn weak_update(&mut self, object: HeapObjectId, field: Field, value: HeapValue) {
        let key = (object, field);
        self.record_write(&key, &value);
        match self.slot(object, &key.1).join(Slot::Value(value), None) {
            Slot::Value(joined) => {
                self.fields.insert(key, joined);
            }
            Slot::Unknown | Slot::Unset => {
                self.fields.remove(&key);
            }
        }
    }

    fn record_write(&mut self, key: &FieldKey, value: &HeapValue) {
        let merged = match self.may_written.get(key) {
            Some(old) => old.join(value),
            None => value.clone(),
        };
        self.may_written.insert(key.clone(), merged);
    }

    /// Forget everything about `object` (passed to code we cannot see)
    pub fn invalidate(&mut self, object: HeapObjectId) {
        self.fields.retain(|(o, _), _| *o != object);
        self.initialized.remove(&object);
        self.invalidated.insert(object);
        self.fields.insert(
            (object, Field::MutationMarker),
            HeapValue::Primitive(AbstractValue::from_bool(true)),
        );
    }

    pub fn is_mutated(&self, object: HeapObjectId) -> bool {
        self.fields.contains_key(&(object, Field::MutationMarker))
            || self.invalidated.contains(&object)
    }

    pub fn is_initialized(&self, object: HeapObjectId) -> bool {
        self.initialized.contains(&object)
    }

    pub fn is_allocated(&self, object: HeapObjectId) -> bool {
        self.allocated.contains(&object)
    }

    pub fn is_summary(&self, object: HeapObjectId) -> bool {
        self.summary.contains(&object)
    }

    pub fn allocated(&self) -> &BTreeSet<HeapObjectId> {
        &self.allocated
    }

    pub fn summary_objects(&self) -> &BTreeSet<HeapObjectId> {
        &self.summary
    }

    pub fn invalidated(&self) -> &BTreeSet<HeapObjectId> {
        &self.invalidated
    }

    pub fn must_written(&self) -> &BTreeSet<FieldKey> {
        &self.must_written
    }

    pub fn may_written(&self) -> &BTreeMap<FieldKey, HeapValue> {
        &self.may_written
    }

    pub fn fields(&self) -> impl Iterator<Item = (&FieldKey, &HeapValue)> {
        self.fields.iter()
    }

    fn merge(&self, other: &Self, widen: Option<usize>) -> Self {
        if !self.reachable {
            return other.clone();
        }
        if !other.reachable {
            return self.clone();
        }

        let initialized: BTreeSet<_> =
            self.initialized.intersection(&other.initialized).copied().collect();
        let keys: BTreeSet<&FieldKey> = self.fields.keys().chain(other.fields.keys()).collect();
        let mut fields = BTreeMap::new();
        for (object, field) in keys {
            let joined = self
                .slot(*object, field)
                .join(other.slot(*object, field), widen);
            if let Slot::Value(value) = joined {
                fields.insert((*object, field.clone()), value);
            }
        }

        let mut may_written = self.may_written.clone();
        for (key, value) in &other.may_written {
            let merged = match may_written.get(key) {
                Some(old) => match widen {
                    Some(iteration) => old.widen(value, iteration),
                    None => old.join(value),
                },
                None => value.clone(),
            };
            may_written.insert(key.clone(), merged);
        }

        Self {
            reachable: true,
            fields,
            initialized,
            allocated: self.allocated.union(&other.allocated).copied().collect(),
            summary: self.summary.union(&other.summary).copied().collect(),
            must_written: self.must_written.intersection(&other.must_written).cloned().collect(),
            may_written,
            invalidated: self.invalidated.union(&other.invalidated).copied().collect(),
        }
    }
}

/// `top()` is the entry heap of a function analyzed without caller
/// information: nothing known about any field, no effects yet
impl Lattice for HeapState {
    fn bottom() -> Self {
        Self {
            reachable: false,
            ..Self::new()
        }
    }

    fn top() -> Self {
        Self::new()
    }

    fn join(&self, other: &Self) -> Self {
        self.merge(other, None)
    }

    fn widen(&self, newer: &Self, iteration: usize) -> Self {
        self.merge(newer, Some(iteration))
    }

    fn meet(&self, other: &Self) -> Self {
        if !self.reachable || !other.reachable {
            return Self::bottom();
        }
        if self.leq(other) {
            self.clone()
        } else if other.leq(self) {
            other.clone()
        } else {
            // Incomparable heaps: keep the facts both agree on being at most
            let mut met = self.clone();
            met.initialized.extend(other.initialized.iter().copied());
            met.allocated.retain(|o| other.allocated.contains(o));
            met.summary.retain(|o| other.summary.contains(o));
            met.invalidated.retain(|o| other.invalidated.contains(o));
            met
        }
    }

    fn leq(&self, other: &Self) -> bool {
        if !self.reachable {
            return true;
        }
        if !other.reachable {
            return false;
        }
        if !self.allocated.is_subset(&other.allocated)
            || !self.summary.is_subset(&other.summary)
            || !self.invalidated.is_subset(&other.invalidated)
            || !other.initialized.is_subset(&self.initialized)
            || !other.must_written.is_subset(&self.must_written)
        {
            return false;
        }
        let written_leq = self.may_written.iter().all(|(key, value)| {
            other
                .may_written
                .get(key)
                .is_some_and(|theirs| value.leq(theirs))
        });
        written_leq
            && self
                .fields
                .keys()
                .chain(other.fields.keys())
                .all(|(object, field)| {
                    self.slot(*object, field).leq(&other.slot(*object, field))
                })
    }

    fn is_bottom(&self) -> bool {
        !self.reachable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(objects: &[u32]) -> BTreeSet<HeapObjectId> {
        objects.iter().map(|&o| HeapObjectId(o)).collect()
    }

    fn attr(name: &str) -> Field {
        Field::Attr(name.to_string())
    }

    #[test]
    fn test_strong_update_on_singleton() {
        let mut heap = HeapState::new();
        heap.allocate(HeapObjectId(0));
        heap.set_field(&set(&[0]), attr("v"), HeapValue::Null);
        heap.set_field(&set(&[0]), attr("v"), HeapValue::Primitive(AbstractValue::constant(1)));
        assert_eq!(heap.get_field(HeapObjectId(0), &attr("v")), AbstractValue::constant(1));
        assert!(heap.must_written().contains(&(HeapObjectId(0), attr("v"))));
    }

    #[test]
    fn test_weak_update_on_multiple_targets() {
        let mut heap = HeapState::new();
        heap.allocate(HeapObjectId(0));
        heap.allocate(HeapObjectId(1));
        heap.set_field(&set(&[0]), attr("v"), HeapValue::Null);
        heap.set_field(&set(&[1]), attr("v"), HeapValue::Null);
        heap.set_field(&set(&[0, 1]), attr("v"), HeapValue::Reference(HeapObjectId(5)));

        let v = heap.get_field(HeapObjectId(0), &attr("v"));
        assert!(v.contains_none());
        assert!(v.nullability.may_be_non_null());
    }

    #[test]
    fn test_reallocation_makes_summary_and_disables_strong_updates() {
        let mut heap = HeapState::new();
        heap.allocate(HeapObjectId(0));
        heap.allocate(HeapObjectId(0));
        assert!(heap.is_summary(HeapObjectId(0)));
        assert!(!heap.can_strong_update(&set(&[0])));
    }

    #[test]
    fn test_merge_intersects_initialized_and_joins_values() {
        let mut base = HeapState::new();
        base.allocate(HeapObjectId(0));

        let mut left = base.clone();
        left.set_field(&set(&[0]), attr("v"), HeapValue::Null);
        let mut right = base.clone();
        right.set_field(&set(&[0]), attr("v"), HeapValue::Reference(HeapObjectId(1)));
        right.allocate(HeapObjectId(2));

        let merged = left.join(&right);
        assert_eq!(
            merged.get_field(HeapObjectId(0), &attr("v")).nullability,
            crate::features::lattice::Nullability::Nullable
        );
        assert!(merged.is_initialized(HeapObjectId(0)));
        assert!(!merged.is_initialized(HeapObjectId(2)));
        assert!(merged.is_allocated(HeapObjectId(2)));
        assert!(left.leq(&merged));
        assert!(right.leq(&merged));
    }

    #[test]
    fn test_write_on_one_path_is_may_written_only() {
        let mut base = HeapState::new();
        base.allocate(HeapObjectId(0));
        let mut written = base.clone();
        written.set_field(&set(&[0]), attr("v"), HeapValue::Null);

        let merged = written.join(&base);
        assert!(merged.must_written().is_empty());
        assert!(merged.may_written().contains_key(&(HeapObjectId(0), attr("v"))));
        // Unset on the other path: only the written value can be read
        assert_eq!(merged.get_field(HeapObjectId(0), &attr("v")), AbstractValue::none());
    }

    #[test]
    fn test_invalidate_forgets_fields_and_marks_mutation() {
        let mut heap = HeapState::new();
        heap.allocate(HeapObjectId(0));
        heap.set_field(&set(&[0]), attr("v"), HeapValue::Null);
        heap.invalidate(HeapObjectId(0));
        assert_eq!(heap.get_field(HeapObjectId(0), &attr("v")), AbstractValue::top());
        assert!(heap.is_mutated(HeapObjectId(0)));
        assert!(!heap.is_initialized(HeapObjectId(0)));
    }

    #[test]
    fn test_bottom_is_identity() {
        let mut heap = HeapState::new();
        heap.allocate(HeapObjectId(0));
        assert_eq!(heap.join(&HeapState::bottom()), heap);
        assert!(HeapState::bottom().leq(&heap));
    }
}
