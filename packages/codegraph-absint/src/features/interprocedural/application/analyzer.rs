//! Two-phase interprocedural analysis over the call-graph condensation
//!
//! Bottom-up (callees first): every SCC is summarized with unknown
//! parameters and an empty entry heap. Recursive SCCs iterate from the
//! optimistic "never returns" summaries until return values and heap
//! effects stop changing, widening after `widening_threshold` rounds and
//! degrading to Top after `max_scc_iterations`.
//!
//! Top-down (callers first): every function is re-solved from the join of
//! what its call sites pass in, then replayed once over the stabilized
//! states to emit diagnostics and record the inputs of its callees.
//!
//! SCCs of one level share no call edges and run on rayon workers when the
//! `parallel` feature and `AnalysisConfig::parallel` are both on.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::features::dataflow::{
    AbstractState, FixpointResult, SolverConfig, TransferFunction, WorklistSolver,
};
use crate::features::flow_graph::ControlFlowGraph;
use crate::features::heap_analysis::{HeapEffects, HeapState};
use crate::features::interprocedural::domain::{
    AnalysisContext, Diagnostic, FunctionSummary, ProgramState, PublishedSummaries, SummaryView,
    RETURN_SLOT,
};
use crate::features::interprocedural::infrastructure::{
    CallInput, CallObserver, InterproceduralTransfer, Observations,
};
use crate::features::lattice::{AbstractValue, Lattice};
use crate::features::points_to::HeapObjectId;
use crate::shared::models::{FunctionId, FunctionInfo};
use crate::shared::CancellationToken;

/// Final summaries plus work counters
#[derive(Debug)]
pub struct InterproceduralOutcome {
    /// Indexed by `FunctionId`
    pub summaries: Vec<FunctionSummary>,
    pub block_visits: usize,
    pub summary_rounds: usize,
}

/// Result of summarizing one SCC bottom-up
struct SccSummaries {
    summaries: Vec<(FunctionId, FunctionSummary)>,
    visits: usize,
    rounds: usize,
}

/// Result of the top-down pass over one function
struct FunctionReport {
    function: FunctionId,
    summary: FunctionSummary,
    calls: FxHashMap<FunctionId, CallInput>,
    visits: usize,
}

pub struct InterproceduralAnalyzer<'c, 'a> {
    ctx: AnalysisContext<'c, 'a>,
}

impl<'c, 'a> InterproceduralAnalyzer<'c, 'a> {
    pub fn new(ctx: AnalysisContext<'c, 'a>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &AnalysisContext<'c, 'a> {
        &self.ctx
    }

    pub fn run(&self, cancel: &CancellationToken) -> Result<InterproceduralOutcome> {
        let (published, bottom_up_visits, summary_rounds) = self.bottom_up(cancel)?;
        let (summaries, top_down_visits) = self.top_down(&published, cancel)?;
        Ok(InterproceduralOutcome {
            summaries,
            block_visits: bottom_up_visits + top_down_visits,
            summary_rounds,
        })
    }

    fn solver(&self) -> WorklistSolver {
        WorklistSolver::new(SolverConfig {
            widening_threshold: self.ctx.config.widening_threshold,
            max_block_visits: self.ctx.config.max_block_visits,
        })
    }

    /// Run `job` on every SCC of one level
    fn map_level<T, F>(&self, level: &[usize], job: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        #[cfg(feature = "parallel")]
        {
            if self.ctx.config.parallel && level.len() > 1 {
                use rayon::prelude::*;
                return level.par_iter().map(|&scc| job(scc)).collect();
            }
        }
        level.iter().map(|&scc| job(scc)).collect()
    }

    // ─────────────────────────────────────────────────────────────────
    // Bottom-up
    // ─────────────────────────────────────────────────────────────────

    fn bottom_up(&self, cancel: &CancellationToken) -> Result<(PublishedSummaries, usize, usize)> {
        let mut published = PublishedSummaries::default();
        let mut visits = 0;
        let mut rounds = 0;

        for level in self.ctx.call_graph.levels() {
            cancel.check()?;
            let results = self.map_level(&level, |scc| self.summarize_scc(scc, &published, cancel));
            for result in results {
                let scc = result?;
                visits += scc.visits;
                rounds += scc.rounds;
                for (function, summary) in scc.summaries {
                    published.insert(function, Arc::new(summary));
                }
            }
        }

        info!(
            "bottom-up: {} summaries, {} rounds, {} block visits",
            published.len(),
            rounds,
            visits
        );
        Ok((published, visits, rounds))
    }

    fn summarize_scc(
        &self,
        scc_index: usize,
        published: &PublishedSummaries,
        cancel: &CancellationToken,
    ) -> Result<SccSummaries> {
        let scc = &self.ctx.call_graph.sccs()[scc_index];

        if !scc.recursive {
            let mut summaries = Vec::with_capacity(scc.members.len());
            let mut visits = 0;
            for &function in &scc.members {
                let (mut summary, v) =
                    self.summarize(function, SummaryView::published(published), cancel)?;
                summary.rounds = 1;
                visits += v;
                summaries.push((function, summary));
            }
            return Ok(SccSummaries {
                summaries,
                visits,
                rounds: 1,
            });
        }

        let mut current: FxHashMap<FunctionId, FunctionSummary> = scc
            .members
            .iter()
            .map(|&f| {
                let info = self.ctx.index.function(f);
                (f, FunctionSummary::initial(info.name.clone(), info.params.clone()))
            })
            .collect();
        let mut visits = 0;
        let mut round = 0;

        loop {
            cancel.check()?;
            round += 1;
            if round > self.ctx.config.max_scc_iterations {
                warn!(
                    "SCC {:?} did not stabilize within {} rounds; forcing summaries to Top",
                    scc.members
                        .iter()
                        .map(|&f| self.ctx.index.name(f))
                        .collect::<Vec<_>>(),
                    self.ctx.config.max_scc_iterations
                );
                for &function in &scc.members {
                    if let Some(summary) = current.get_mut(&function) {
                        self.degrade(function, summary, "recursion did not stabilize");
                    }
                }
                round -= 1;
                break;
            }

            let view = SummaryView::with_in_progress(published, &current);
            let mut next = FxHashMap::default();
            for &function in &scc.members {
                let (summary, v) = self.summarize(function, view, cancel)?;
                visits += v;
                next.insert(function, summary);
            }

            let mut stable = true;
            for &function in &scc.members {
                let (Some(old), Some(new)) = (current.get(&function), next.get(&function)) else {
                    continue;
                };
                let candidate = if round > self.ctx.config.widening_threshold {
                    old.widen(new, round)
                } else {
                    new.clone()
                };
                if !candidate.same_interface(old) {
                    stable = false;
                }
                current.insert(function, candidate);
            }
            if stable {
                break;
            }
        }

        debug!("recursive SCC {} stabilized after {} rounds", scc_index, round);
        let summaries = scc
            .members
            .iter()
            .filter_map(|&f| {
                current.remove(&f).map(|mut s| {
                    s.rounds = round;
                    (f, s)
                })
            })
            .collect();
        Ok(SccSummaries {
            summaries,
            visits,
            rounds: round,
        })
    }

    /// Summary of one function with unknown parameters
    fn summarize(
        &self,
        function: FunctionId,
        summaries: SummaryView<'_>,
        cancel: &CancellationToken,
    ) -> Result<(FunctionSummary, usize)> {
        let info = self.ctx.index.function(function);
        let mut summary = FunctionSummary::initial(info.name.clone(), info.params.clone());
        let Some(cfg) = self.ctx.cfg(function) else {
            summary.degrade(self.unknown_effects());
            return Ok((summary, 0));
        };

        let transfer = InterproceduralTransfer::new(&self.ctx, function, cfg.exit, summaries);
        let result = self
            .solver()
            .solve(cfg, &transfer, self.entry_state(info, None), cancel)?;

        let exit = result.final_state();
        summary.return_value = if exit.is_reachable() {
            exit.env.get(RETURN_SLOT)
        } else {
            AbstractValue::bottom()
        };
        summary.effects = HeapEffects::from_exit(&HeapState::new(), &exit.heap);
        if !result.converged {
            self.degrade(function, &mut summary, "block visit limit reached");
        }
        Ok((summary, result.iterations))
    }

    fn degrade(&self, function: FunctionId, summary: &mut FunctionSummary, reason: &str) {
        let info = self.ctx.index.function(function);
        summary.degrade(self.unknown_effects());
        summary
            .diagnostics
            .push(Diagnostic::degraded(info.def_node, &info.name, reason));
    }

    /// Effects of a function nothing is known about: every object unknown
    fn unknown_effects(&self) -> HeapEffects {
        let count = self.ctx.pointer.objects().len();
        HeapEffects::unknown((0..count).map(|i| HeapObjectId(i as u32)))
    }

    fn entry_state(&self, info: &FunctionInfo<'a>, input: Option<&CallInput>) -> ProgramState {
        let mut env = AbstractState::new();
        let heap = match input {
            Some(input) => {
                for (param, value) in info.params.iter().zip(&input.args) {
                    if !value.is_bottom() {
                        env.set(param, value, self.ctx.domains());
                    }
                }
                input.heap.entry_view()
            }
            None => HeapState::new(),
        };
        ProgramState::new(env, heap)
    }

    // ─────────────────────────────────────────────────────────────────
    // Top-down
    // ─────────────────────────────────────────────────────────────────

    fn top_down(
        &self,
        published: &PublishedSummaries,
        cancel: &CancellationToken,
    ) -> Result<(Vec<FunctionSummary>, usize)> {
        let mut inputs: FxHashMap<FunctionId, CallInput> = FxHashMap::default();
        let mut finals: FxHashMap<FunctionId, FunctionSummary> = FxHashMap::default();
        let mut visits = 0;

        for level in self.ctx.call_graph.levels().iter().rev() {
            cancel.check()?;
            let results =
                self.map_level(level, |scc| self.report_scc(scc, published, &inputs, cancel));
            let mut calls = Observations::default();
            for result in results {
                for report in result? {
                    visits += report.visits;
                    calls.merge_calls(report.calls);
                    finals.insert(report.function, report.summary);
                }
            }
            for (callee, input) in calls.calls {
                let joined = match inputs.get(&callee) {
                    Some(existing) => existing.join(&input),
                    None => input,
                };
                inputs.insert(callee, joined);
            }
        }

        let summaries = self
            .ctx
            .index
            .functions()
            .iter()
            .map(|info| {
                finals.remove(&info.id).unwrap_or_else(|| {
                    FunctionSummary::initial(info.name.clone(), info.params.clone())
                })
            })
            .collect();
        info!("top-down: {} block visits", visits);
        Ok((summaries, visits))
    }

    fn report_scc(
        &self,
        scc_index: usize,
        published: &PublishedSummaries,
        inputs: &FxHashMap<FunctionId, CallInput>,
        cancel: &CancellationToken,
    ) -> Result<Vec<FunctionReport>> {
        let scc = &self.ctx.call_graph.sccs()[scc_index];
        scc.members
            .iter()
            .map(|&function| {
                // Recursive members see their own calls too; start them from Top
                let seed = if scc.recursive { None } else { inputs.get(&function) };
                self.report_function(function, seed, published, cancel)
            })
            .collect()
    }

    fn report_function(
        &self,
        function: FunctionId,
        seed: Option<&CallInput>,
        published: &PublishedSummaries,
        cancel: &CancellationToken,
    ) -> Result<FunctionReport> {
        let info = self.ctx.index.function(function);
        let mut summary = match published.get(&function) {
            Some(summary) => summary.as_ref().clone(),
            None => FunctionSummary::initial(info.name.clone(), info.params.clone()),
        };
        summary.input = info
            .params
            .iter()
            .enumerate()
            .map(|(i, param)| {
                let value = seed
                    .and_then(|s| s.args.get(i).copied())
                    .unwrap_or_else(AbstractValue::top);
                (param.clone(), value)
            })
            .collect();

        let Some(cfg) = self.ctx.cfg(function) else {
            return Ok(FunctionReport {
                function,
                summary,
                calls: FxHashMap::default(),
                visits: 0,
            });
        };

        let view = SummaryView::published(published);
        let transfer = InterproceduralTransfer::new(&self.ctx, function, cfg.exit, view);
        let result = self
            .solver()
            .solve(cfg, &transfer, self.entry_state(info, seed), cancel)?;

        let observer = CallObserver::new();
        let replay = InterproceduralTransfer::new(&self.ctx, function, cfg.exit, view)
            .with_observer(&observer);
        replay_blocks(&replay, cfg, &result);
        let observed = observer.into_observations();

        if !result.converged && !summary.degraded {
            self.degrade(function, &mut summary, "block visit limit reached");
        }
        if !summary.degraded {
            let exit = result.final_state();
            summary.exit_state = if exit.is_reachable() {
                exit.env
                    .variables()
                    .into_iter()
                    .filter(|v| v != RETURN_SLOT)
                    .map(|v| {
                        let value = exit.env.get(&v);
                        (v, value)
                    })
                    .collect()
            } else {
                Default::default()
            };
        }

        summary.diagnostics.extend(observed.diagnostics);
        summary.diagnostics.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        summary.diagnostics.dedup();
        summary.call_targets = observed.call_targets;

        Ok(FunctionReport {
            function,
            summary,
            calls: observed.calls,
            visits: result.iterations,
        })
    }
}

/// Re-run every reachable block once from its stabilized entry state
fn replay_blocks<'a, T>(
    transfer: &T,
    cfg: &ControlFlowGraph<'a>,
    result: &FixpointResult<ProgramState>,
) where
    T: TransferFunction<'a, ProgramState>,
{
    for block in &cfg.blocks {
        if !result.is_reachable(block.id) {
            continue;
        }
        let mut state = result.entry_states[block.id].clone();
        for item in &block.items {
            transfer.transfer_item(item, &mut state);
        }
    }
}
