//! Result of one analysis run

use std::collections::BTreeMap;

use serde::Serialize;

use super::diagnostic::{Diagnostic, DiagnosticKind};
use super::summary::FunctionSummary;
use crate::errors::AnalysisError;
use crate::features::call_graph::CallGraph;
use crate::features::points_to::PointsToStats;

#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisStats {
    pub functions: usize,
    pub classes: usize,
    pub sccs: usize,
    pub recursive_sccs: usize,
    pub call_sites: usize,
    pub call_edges: usize,
    pub points_to: PointsToStats,
    /// Block transfers over both phases
    pub block_visits: usize,
    /// Bottom-up SCC rounds over all SCCs
    pub summary_rounds: usize,
    pub degraded_functions: usize,
    pub elapsed_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct AnalysisReport {
    /// Keyed by qualified name; a name defined twice maps to its last
    /// definition (diagnostics of every definition are kept below)
    pub per_function: BTreeMap<String, FunctionSummary>,
    /// Every diagnostic of every function, ordered by location
    pub diagnostics: Vec<Diagnostic>,
    /// Functions that could not be analyzed
    pub errors: Vec<AnalysisError>,
    pub call_graph: CallGraph,
    pub stats: AnalysisStats,
}

impl AnalysisReport {
    pub fn summary(&self, function: &str) -> Option<&FunctionSummary> {
        self.per_function.get(function)
    }

    pub fn diagnostics_of(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind == kind)
    }

    pub fn diagnostics_in<'r>(
        &'r self,
        function: &'r str,
    ) -> impl Iterator<Item = &'r Diagnostic> + 'r {
        self.diagnostics.iter().filter(move |d| d.function == function)
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
