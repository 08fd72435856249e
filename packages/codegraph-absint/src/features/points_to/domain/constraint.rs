//! Points-to constraints
//!
//! Andersen-style inclusion constraints, plus call constraints whose targets
//! are resolved while solving:
//! - ALLOC: x = C() / [..]   → pts(x) ⊇ {o}
//! - COPY:  x = y            → pts(x) ⊇ pts(y)
//! - LOAD:  x = y.f / y[i]   → ∀o ∈ pts(y): pts(x) ⊇ pts(o.f)
//! - STORE: x.f = y / x[i]=y → ∀o ∈ pts(x): pts(o.f) ⊇ pts(y)
//! - CALL:  r = f(a..)       → params ⊇ args, r ⊇ return, per resolved target

use serde::{Deserialize, Serialize};

use super::abstract_location::HeapObjectId;
use super::context::ContextId;
use crate::shared::models::{FunctionId, NodeId};

/// Pointer-valued variable
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PtrVar {
    /// Local variable or parameter
    Local {
        function: FunctionId,
        context: ContextId,
        name: String,
    },
    /// Value of an expression node
    Expr { node: NodeId, context: ContextId },
    /// Return value of a function
    Return {
        function: FunctionId,
        context: ContextId,
    },
}

/// Field of a heap object as seen by the pointer analysis
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FieldKey {
    Attr(String),
    /// Summarized container contents
    Elements,
}

/// How a call constraint finds its targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallTarget {
    /// Statically known targets; arguments map to parameters from 0
    Static(Vec<FunctionId>),
    /// Constructor: allocates `object`, passes it as `self` to `init`
    Construct {
        object: HeapObjectId,
        init: Option<FunctionId>,
    },
    /// Dispatch `method` on each object the receiver points to
    Dispatch { method: String, receiver: PtrVar },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallConstraint {
    pub site: NodeId,
    pub caller: FunctionId,
    pub context: ContextId,
    pub target: CallTarget,
    pub args: Vec<PtrVar>,
    pub result: PtrVar,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    Alloc {
        object: HeapObjectId,
        to: PtrVar,
    },
    Copy {
        from: PtrVar,
        to: PtrVar,
    },
    Load {
        base: PtrVar,
        field: FieldKey,
        to: PtrVar,
    },
    Store {
        base: PtrVar,
        field: FieldKey,
        from: PtrVar,
    },
    Call(CallConstraint),
}

impl Constraint {
    pub fn kind_str(&self) -> &'static str {
        match self {
            Constraint::Alloc { .. } => "ALLOC",
            Constraint::Copy { .. } => "COPY",
            Constraint::Load { .. } => "LOAD",
            Constraint::Store { .. } => "STORE",
            Constraint::Call(_) => "CALL",
        }
    }
}
