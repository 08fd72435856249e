//! Read-only facts shared by every function analysis of one run

use std::collections::BTreeSet;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::summary::FunctionSummary;
use crate::config::AnalysisConfig;
use crate::features::call_graph::CallGraph;
use crate::features::flow_graph::ControlFlowGraph;
use crate::features::heap_analysis::HeapModel;
use crate::features::lattice::DomainSet;
use crate::features::points_to::PointsToGraph;
use crate::features::virtual_dispatch::ClassHierarchy;
use crate::shared::models::{FunctionId, ProgramIndex};

/// Explicit analysis context threaded through every phase
pub struct AnalysisContext<'c, 'a> {
    pub index: &'c ProgramIndex<'a>,
    pub hierarchy: &'c ClassHierarchy,
    /// Call graph with virtual sites already resolved
    pub call_graph: &'c CallGraph,
    pub pointer: &'c PointsToGraph,
    /// One CFG per function; `None` for functions rejected as malformed
    pub cfgs: &'c [Option<ControlFlowGraph<'a>>],
    pub config: &'c AnalysisConfig,
}

impl<'c, 'a> AnalysisContext<'c, 'a> {
    pub fn heap_model(&self) -> HeapModel<'c> {
        HeapModel::new(self.pointer)
    }

    pub fn domains(&self) -> DomainSet {
        self.config.enabled_domains
    }

    pub fn cfg(&self, function: FunctionId) -> Option<&'c ControlFlowGraph<'a>> {
        self.cfgs.get(function.index()).and_then(Option::as_ref)
    }

    pub fn is_malformed(&self, function: FunctionId) -> bool {
        self.cfg(function).is_none()
    }

    pub fn malformed(&self) -> BTreeSet<FunctionId> {
        self.index
            .functions()
            .iter()
            .map(|f| f.id)
            .filter(|&id| self.is_malformed(id))
            .collect()
    }
}

/// Summaries published by finished SCCs
pub type PublishedSummaries = FxHashMap<FunctionId, Arc<FunctionSummary>>;

/// What a call site may consult: published summaries, overlaid with the
/// in-progress summaries of the SCC being iterated
#[derive(Clone, Copy)]
pub struct SummaryView<'s> {
    published: &'s PublishedSummaries,
    in_progress: Option<&'s FxHashMap<FunctionId, FunctionSummary>>,
}

impl<'s> SummaryView<'s> {
    pub fn published(published: &'s PublishedSummaries) -> Self {
        Self {
            published,
            in_progress: None,
        }
    }

    pub fn with_in_progress(
        published: &'s PublishedSummaries,
        in_progress: &'s FxHashMap<FunctionId, FunctionSummary>,
    ) -> Self {
        Self {
            published,
            in_progress: Some(in_progress),
        }
    }

    pub fn get(&self, function: FunctionId) -> Option<&'s FunctionSummary> {
        self.in_progress
            .and_then(|m| m.get(&function))
            .or_else(|| self.published.get(&function).map(Arc::as_ref))
    }
}
