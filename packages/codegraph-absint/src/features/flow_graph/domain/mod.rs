pub mod cfg;

pub use cfg::{
    BasicBlock, BlockId, BlockItem, BlockKind, CFGEdge, CFGEdgeKind, ControlFlowGraph, EdgeId,
};
