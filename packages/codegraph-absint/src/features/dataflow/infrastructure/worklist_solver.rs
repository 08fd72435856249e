/*
 * Worklist Fixpoint Solver
 *
 * Kildall-style forward dataflow over one control-flow graph, generic in the
 * state lattice and the transfer function.
 *
 * Algorithm:
 * 1. entry_state[entry] = initial, every other state Bottom
 * 2. worklist = {entry}, ordered by reverse postorder position
 * 3. While worklist not empty:
 *    a. Pop the block earliest in reverse postorder
 *    b. Join: edge-refined exit states of all predecessors
 *    c. Widen: at loop headers visited more than `widening_threshold` times,
 *       entry = old_entry.widen(joined)
 *    d. Transfer: apply every block item in order
 *    e. If the exit state grew (or on first visit): enqueue successors
 * 4. Fixpoint when the worklist drains
 *
 * Termination:
 * - Loop headers cut every cycle and widen after the threshold, so every
 *   ascending chain through the graph is finite
 * - `max_block_visits` is a safety cap; exceeding it reports
 *   non-convergence instead of hanging
 *
 * References:
 * - Kildall, G. (1973). "A Unified Approach to Global Program Optimization"
 * - Cousot, P. & Cousot, R. (1977). "Abstract Interpretation"
 */

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::errors::Result;
use crate::features::dataflow::ports::TransferFunction;
use crate::features::flow_graph::domain::{BlockId, ControlFlowGraph};
use crate::features::lattice::Lattice;
use crate::shared::CancellationToken;

/// Solver limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolverConfig {
    /// Visits of a loop header before widening kicks in
    pub widening_threshold: usize,

    /// Visits of any single block before giving up
    pub max_block_visits: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            widening_threshold: 2,
            max_block_visits: 100_000,
        }
    }
}

/// Stabilized per-block states
#[derive(Debug, Clone)]
pub struct FixpointResult<S> {
    pub entry_states: Vec<S>,
    pub exit_states: Vec<S>,
    /// Visit count per block
    pub visits: Vec<usize>,
    /// False when `max_block_visits` stopped the iteration early
    pub converged: bool,
    /// Total worklist pops
    pub iterations: usize,
    exit: BlockId,
}

impl<S: Lattice> FixpointResult<S> {
    /// State on entry to the function's exit block
    pub fn final_state(&self) -> &S {
        &self.entry_states[self.exit]
    }

    pub fn is_reachable(&self, block: BlockId) -> bool {
        !self.entry_states[block].is_bottom()
    }
}

pub struct WorklistSolver {
    config: SolverConfig,
}

impl WorklistSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Run to fixpoint from `initial` at the entry block
    pub fn solve<'a, S, T>(
        &self,
        cfg: &ControlFlowGraph<'a>,
        transfer: &T,
        initial: S,
        cancel: &CancellationToken,
    ) -> Result<FixpointResult<S>>
    where
        S: Lattice,
        T: TransferFunction<'a, S> + ?Sized,
    {
        let n = cfg.len();
        let positions = cfg.rpo_positions();
        let mut entry_states = vec![S::bottom(); n];
        let mut exit_states = vec![S::bottom(); n];
        let mut visits = vec![0usize; n];
        let mut converged = true;
        let mut iterations = 0usize;

        let mut worklist: BTreeSet<(usize, BlockId)> = BTreeSet::new();
        worklist.insert((positions[cfg.entry], cfg.entry));

        while let Some((_, block_id)) = worklist.pop_first() {
            cancel.check()?;
            iterations += 1;
            visits[block_id] += 1;

            if visits[block_id] > self.config.max_block_visits {
                warn!(
                    "{}: block {} exceeded {} visits, stopping fixpoint",
                    cfg.function, block_id, self.config.max_block_visits
                );
                converged = false;
                break;
            }

            let block = cfg.block(block_id);
            let mut joined = if block_id == cfg.entry {
                initial.clone()
            } else {
                S::bottom()
            };
            for &edge_id in &block.incoming {
                let edge = cfg.edge(edge_id);
                let source_exit = &exit_states[edge.source];
                if source_exit.is_bottom() {
                    continue;
                }
                let flowing = transfer.transfer_edge(edge, cfg.block(edge.source), source_exit);
                joined = joined.join(&flowing);
            }

            let widen = cfg.is_loop_header(block_id)
                && visits[block_id] > self.config.widening_threshold;
            let new_entry = if widen {
                entry_states[block_id].widen(&joined, visits[block_id])
            } else {
                joined
            };

            let mut out = new_entry.clone();
            if !out.is_bottom() {
                for item in &block.items {
                    transfer.transfer_item(item, &mut out);
                }
            }

            let first_visit = visits[block_id] == 1;
            let grew = !out.leq(&exit_states[block_id]);
            entry_states[block_id] = new_entry;

            if first_visit || grew {
                exit_states[block_id] = out;
                for succ in cfg.successors(block_id) {
                    worklist.insert((positions[succ], succ));
                }
            }
        }

        debug!(
            "{}: fixpoint after {} iterations (converged: {})",
            cfg.function, iterations, converged
        );

        Ok(FixpointResult {
            entry_states,
            exit_states,
            visits,
            converged,
            iterations,
            exit: cfg.exit,
        })
    }
}
