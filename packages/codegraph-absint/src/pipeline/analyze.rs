//! End-to-end analysis of one program
//!
//! Stages, in order:
//! 1. config validation
//! 2. function index, class hierarchy, static call graph
//! 3. pointer analysis, then virtual-dispatch refinement of the call graph
//! 4. one CFG per function (malformed functions are reported and skipped)
//! 5. interprocedural bottom-up/top-down analysis
//!
//! Everything is single-shot and in memory; the syntax tree is never
//! mutated.

use std::collections::BTreeMap;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::{AnalysisConfig, Validatable};
use crate::errors::{AnalysisError, Result};
use crate::features::call_graph::CallGraphBuilder;
use crate::features::flow_graph::{CfgBuilder, ControlFlowGraph};
use crate::features::interprocedural::{
    AnalysisContext, AnalysisReport, AnalysisStats, InterproceduralAnalyzer,
};
use crate::features::points_to::PointerAnalysis;
use crate::features::virtual_dispatch::{ClassHierarchy, VirtualDispatchResolver};
use crate::shared::models::{FunctionInfo, Program, ProgramIndex};
use crate::shared::CancellationToken;

/// Analyze `program` to completion
pub fn analyze(program: &Program, config: &AnalysisConfig) -> Result<AnalysisReport> {
    analyze_with_cancellation(program, config, &CancellationToken::new())
}

/// Analyze `program`, giving up with [`AnalysisError::Cancelled`] once
/// `cancel` fires
pub fn analyze_with_cancellation(
    program: &Program,
    config: &AnalysisConfig,
    cancel: &CancellationToken,
) -> Result<AnalysisReport> {
    let start = Instant::now();
    config.validate()?;

    let index = ProgramIndex::build(program);
    let hierarchy = ClassHierarchy::build(&index);
    let mut call_graph = CallGraphBuilder::new(&index, &hierarchy).build();
    cancel.check()?;

    let depth = config.pointer_context_depth;
    let pointer = PointerAnalysis::new(&index, &hierarchy, &call_graph, depth).run(cancel)?;
    VirtualDispatchResolver::new(&hierarchy).refine(&mut call_graph, &pointer);
    debug!(
        "call graph: {} sites, {} edges, {} SCCs",
        call_graph.sites().count(),
        call_graph.num_edges(),
        call_graph.sccs().len()
    );

    let (cfgs, errors) = build_cfgs(&index);
    cancel.check()?;

    let ctx = AnalysisContext {
        index: &index,
        hierarchy: &hierarchy,
        call_graph: &call_graph,
        pointer: &pointer,
        cfgs: &cfgs,
        config,
    };
    let outcome = InterproceduralAnalyzer::new(ctx).run(cancel)?;

    let mut diagnostics: Vec<_> = outcome
        .summaries
        .iter()
        .flat_map(|s| s.diagnostics.iter().cloned())
        .collect();
    diagnostics.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    diagnostics.dedup_by(|a, b| a.sort_key() == b.sort_key());

    let stats = AnalysisStats {
        functions: index.len(),
        classes: index.classes().len(),
        sccs: call_graph.sccs().len(),
        recursive_sccs: call_graph.sccs().iter().filter(|s| s.recursive).count(),
        call_sites: call_graph.sites().count(),
        call_edges: call_graph.num_edges(),
        points_to: pointer.stats.clone(),
        block_visits: outcome.block_visits,
        summary_rounds: outcome.summary_rounds,
        degraded_functions: outcome.summaries.iter().filter(|s| s.degraded).count(),
        elapsed_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        "analyzed {} functions: {} diagnostics, {} errors in {} ms",
        stats.functions,
        diagnostics.len(),
        errors.len(),
        stats.elapsed_ms
    );

    // Summaries come in definition order, so a redefined name keeps its
    // last definition, the one calls by that name resolve to
    let per_function: BTreeMap<_, _> = outcome
        .summaries
        .into_iter()
        .map(|s| (s.function.clone(), s))
        .collect();

    Ok(AnalysisReport {
        per_function,
        diagnostics,
        errors,
        call_graph,
        stats,
    })
}

/// One CFG per function, in `FunctionId` order
fn build_cfgs<'a>(
    index: &ProgramIndex<'a>,
) -> (Vec<Option<ControlFlowGraph<'a>>>, Vec<AnalysisError>) {
    let mut errors = Vec::new();
    let cfgs = index
        .functions()
        .iter()
        .map(|info| match build_cfg(info) {
            Ok(cfg) => Some(cfg),
            Err(err) => {
                warn!("skipping {}: {}", info.name, err);
                errors.push(err);
                None
            }
        })
        .collect();
    (cfgs, errors)
}

fn build_cfg<'a>(info: &FunctionInfo<'a>) -> Result<ControlFlowGraph<'a>> {
    let builder = if info.is_module() {
        CfgBuilder::for_module(info.name.clone())
    } else {
        CfgBuilder::new(info.name.clone())
    };
    builder.build(info.body)
}
