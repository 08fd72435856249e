//! Findings reported by the interprocedural analysis

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::shared::models::NodeId;

/// How sure a finding is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Certainty {
    Definite,
    Possible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "certainty")]
pub enum DiagnosticKind {
    /// Attribute, method or subscript access on a value that is always None
    DefiniteNullDeref,
    /// Same, on a value that may be None
    PossibleNullDeref,
    /// Subscript index against a known container length
    OutOfBounds(Certainty),
    /// Branch condition with a fixed outcome
    UnreachableBranch,
    /// Summaries forced to Top after the iteration cap
    AnalysisDegraded,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::DefiniteNullDeref => "DEFINITE_NULL_DEREF",
            DiagnosticKind::PossibleNullDeref => "POSSIBLE_NULL_DEREF",
            DiagnosticKind::OutOfBounds(Certainty::Definite) => "OUT_OF_BOUNDS_DEFINITE",
            DiagnosticKind::OutOfBounds(Certainty::Possible) => "OUT_OF_BOUNDS_POSSIBLE",
            DiagnosticKind::UnreachableBranch => "UNREACHABLE_BRANCH",
            DiagnosticKind::AnalysisDegraded => "ANALYSIS_DEGRADED",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            DiagnosticKind::DefiniteNullDeref
            | DiagnosticKind::OutOfBounds(Certainty::Definite) => {
                Severity::Error
            }
            DiagnosticKind::PossibleNullDeref
            | DiagnosticKind::OutOfBounds(Certainty::Possible) => {
                Severity::Warning
            }
            DiagnosticKind::UnreachableBranch | DiagnosticKind::AnalysisDegraded => Severity::Info,
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Node the finding points at
    pub location: NodeId,
    /// Qualified name of the enclosing function
    pub function: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        kind: DiagnosticKind,
        location: NodeId,
        function: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            location,
            function: function.into(),
            message: message.into(),
        }
    }

    /// `access` describes the dereference, e.g. "attribute 'field'"
    pub fn null_deref(definite: bool, location: NodeId, function: &str, access: &str) -> Self {
        if definite {
            Self::new(
                DiagnosticKind::DefiniteNullDeref,
                location,
                function,
                format!("{} accessed on a value that is always None", access),
            )
        } else {
            Self::new(
                DiagnosticKind::PossibleNullDeref,
                location,
                function,
                format!("{} accessed on a value that may be None", access),
            )
        }
    }

    pub fn out_of_bounds(
        certainty: Certainty,
        location: NodeId,
        function: &str,
        index: &str,
        length: &str,
    ) -> Self {
        let verb = match certainty {
            Certainty::Definite => "is",
            Certainty::Possible => "may be",
        };
        Self::new(
            DiagnosticKind::OutOfBounds(certainty),
            location,
            function,
            format!("index {} {} out of bounds for length {}", index, verb, length),
        )
    }

    pub fn unreachable_branch(location: NodeId, function: &str, outcome: bool) -> Self {
        let (always, dead) = if outcome { ("true", "else") } else { ("false", "then") };
        Self::new(
            DiagnosticKind::UnreachableBranch,
            location,
            function,
            format!("condition is always {}; the {} branch is unreachable", always, dead),
        )
    }

    pub fn degraded(location: NodeId, function: &str, reason: &str) -> Self {
        Self::new(
            DiagnosticKind::AnalysisDegraded,
            location,
            function,
            format!("results for '{}' forced to Top: {}", function, reason),
        )
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }

    /// Key for de-duplication and stable ordering
    pub fn sort_key(&self) -> (NodeId, DiagnosticKind, &str) {
        (self.location, self.kind, &self.function)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} @{}: {}",
            self.kind, self.function, self.location, self.message
        )
    }
}
