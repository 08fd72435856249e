//! Nullability domain
//!
//! ```text
//!            Top          (nothing known)
//!             |
//!          Nullable       (may be None)
//!          /      \
//!     NotNull   DefinitelyNull
//!          \      /
//!           Bottom
//! ```
//!
//! `Nullable` and `Top` concretize to the same values; only `Nullable`
//! carries evidence that None can flow here, so only it produces
//! possible-null diagnostics.

use serde::{Deserialize, Serialize};

use super::lattice::Lattice;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Nullability {
    Bottom,
    NotNull,
    DefinitelyNull,
    Nullable,
    Top,
}

impl Nullability {
    pub fn may_be_null(self) -> bool {
        matches!(
            self,
            Nullability::DefinitelyNull | Nullability::Nullable | Nullability::Top
        )
    }

    pub fn may_be_non_null(self) -> bool {
        matches!(
            self,
            Nullability::NotNull | Nullability::Nullable | Nullability::Top
        )
    }
}

impl Default for Nullability {
    fn default() -> Self {
        Nullability::Top
    }
}

impl Lattice for Nullability {
    fn bottom() -> Self {
        Nullability::Bottom
    }

    fn top() -> Self {
        Nullability::Top
    }

    fn join(&self, other: &Self) -> Self {
        use Nullability::*;
        match (*self, *other) {
            (Bottom, x) | (x, Bottom) => x,
            (Top, _) | (_, Top) => Top,
            (a, b) if a == b => a,
            _ => Nullable,
        }
    }

    fn meet(&self, other: &Self) -> Self {
        use Nullability::*;
        match (*self, *other) {
            (Top, x) | (x, Top) => x,
            (Nullable, x) | (x, Nullable) => x,
            (a, b) if a == b => a,
            _ => Bottom,
        }
    }

    fn leq(&self, other: &Self) -> bool {
        self.join(other) == *other
    }
}

impl std::fmt::Display for Nullability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Nullability::Bottom => "⊥",
            Nullability::NotNull => "not-null",
            Nullability::DefinitelyNull => "null",
            Nullability::Nullable => "nullable",
            Nullability::Top => "⊤",
        };
        write!(f, "{}", s)
    }
}
