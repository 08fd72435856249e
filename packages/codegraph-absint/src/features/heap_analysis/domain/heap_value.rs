//! Values stored in heap fields

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::features::lattice::{AbstractValue, Lattice, Nullability};
use crate::features::points_to::HeapObjectId;

/// Field of a heap object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Field {
    /// Named attribute (`obj.name`)
    Attr(String),
    /// Summary of all container elements (`xs[i]`)
    Elements,
    /// Number of elements of a container
    Length,
    /// Set once a known-mutating method ran on the object
    MutationMarker,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Attr(name) => write!(f, ".{}", name),
            Field::Elements => write!(f, "[*]"),
            Field::Length => write!(f, "<len>"),
            Field::MutationMarker => write!(f, "<mutated>"),
        }
    }
}

/// Tagged field contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum HeapValue {
    Null,
    Primitive(AbstractValue),
    Reference(HeapObjectId),
    /// Join of differing values; only the abstraction survives
    Merged(AbstractValue),
}

impl HeapValue {
    /// Tag an abstract value, keeping the referenced object when there is
    /// exactly one and the value cannot be None
    pub fn from_value(value: AbstractValue, referent: Option<HeapObjectId>) -> Self {
        match (value.nullability, referent) {
            (Nullability::DefinitelyNull, _) => HeapValue::Null,
            (Nullability::NotNull, Some(object)) if !value.is_numeric() => {
                HeapValue::Reference(object)
            }
            _ => HeapValue::Primitive(value),
        }
    }

    /// Value domain view of the field
    pub fn abstraction(&self) -> AbstractValue {
        match self {
            HeapValue::Null => AbstractValue::none(),
            HeapValue::Reference(_) => AbstractValue::not_null(),
            HeapValue::Primitive(v) | HeapValue::Merged(v) => *v,
        }
    }

    /// Identical values pass through; differing values merge through their
    /// abstractions (Null with non-Null gives Nullable)
    pub fn join(&self, other: &Self) -> Self {
        if self == other {
            return self.clone();
        }
        HeapValue::Merged(self.abstraction().join(&other.abstraction()))
    }

    pub fn widen(&self, newer: &Self, iteration: usize) -> Self {
        if self == newer {
            return self.clone();
        }
        HeapValue::Merged(self.abstraction().widen(&newer.abstraction(), iteration))
    }

    pub fn leq(&self, other: &Self) -> bool {
        self == other || self.abstraction().leq(&other.abstraction())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_and_reference_merge_to_nullable() {
        let merged = HeapValue::Null.join(&HeapValue::Reference(HeapObjectId(3)));
        assert_eq!(merged.abstraction().nullability, Nullability::Nullable);
        assert!(matches!(merged, HeapValue::Merged(_)));
    }

    #[test]
    fn test_identical_values_pass_through() {
        let r = HeapValue::Reference(HeapObjectId(1));
        assert_eq!(r.join(&r), r);
    }

    #[test]
    fn test_from_value_tags() {
        assert_eq!(HeapValue::from_value(AbstractValue::none(), None), HeapValue::Null);
        assert_eq!(
            HeapValue::from_value(AbstractValue::not_null(), Some(HeapObjectId(2))),
            HeapValue::Reference(HeapObjectId(2))
        );
        assert_eq!(
            HeapValue::from_value(AbstractValue::constant(4), None),
            HeapValue::Primitive(AbstractValue::constant(4))
        );
    }
}
