use crate::features::flow_graph::domain::{BasicBlock, BlockItem, CFGEdge};
use crate::features::lattice::Lattice;

/// Abstract semantics of block items and edges for a state type `S`
///
/// Item transfer must be total: constructs it does not model evaluate to Top
/// rather than failing.
pub trait TransferFunction<'a, S: Lattice> {
    fn transfer_item(&self, item: &BlockItem<'a>, state: &mut S);

    /// State flowing along `edge`, given the exit state of its source block.
    /// Returning Bottom marks the edge as infeasible.
    fn transfer_edge(&self, edge: &CFGEdge, source: &BasicBlock<'a>, state: &S) -> S {
        let _ = (edge, source);
        state.clone()
    }
}
