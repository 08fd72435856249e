//! Abstract heap objects
//!
//! Concrete objects are abstracted to their allocation site (a constructor
//! call or collection literal) paired with the k-limited context the site
//! was reached in. Objects live in an arena owned by the pointer analysis and
//! are referred to by dense [`HeapObjectId`]s everywhere else.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::context::ContextId;
use crate::shared::models::{CollectionKind, FunctionId, NodeId};

/// Arena index of a [`HeapObject`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeapObjectId(pub u32);

impl HeapObjectId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for HeapObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "o{}", self.0)
    }
}

/// What an allocation site creates
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum ObjectKind {
    /// Instance of a program class
    Instance(String),
    /// Builtin collection from a literal
    Collection(CollectionKind),
}

impl ObjectKind {
    pub fn type_name(&self) -> &str {
        match self {
            ObjectKind::Instance(class) => class,
            ObjectKind::Collection(kind) => kind.type_name(),
        }
    }

    /// Class used for method dispatch (builtins have none in the program)
    pub fn class(&self) -> Option<&str> {
        match self {
            ObjectKind::Instance(class) => Some(class),
            ObjectKind::Collection(_) => None,
        }
    }

    /// Sequences whose `Length` bounds valid subscripts
    pub fn is_indexable_sequence(&self) -> bool {
        matches!(
            self,
            ObjectKind::Collection(CollectionKind::List | CollectionKind::Tuple)
        )
    }
}

/// Allocation site × context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeapObject {
    pub id: HeapObjectId,
    /// Node of the allocating expression
    pub site: NodeId,
    pub context: ContextId,
    /// Function containing the site
    pub function: FunctionId,
    #[serde(flatten)]
    pub kind: ObjectKind,
}

impl HeapObject {
    pub fn type_name(&self) -> &str {
        self.kind.type_name()
    }
}

impl fmt::Display for HeapObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.type_name(), self.site, self.context)
    }
}
