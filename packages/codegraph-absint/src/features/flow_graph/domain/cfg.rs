//! Control-flow graph of one function body
//!
//! Blocks hold ordered items that borrow the immutable syntax tree. The graph
//! is built once and never mutated afterwards.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::shared::models::{Expr, NodeId, Stmt};

pub type BlockId = usize;
pub type EdgeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CFGEdgeKind {
    Sequential,
    TrueBranch,
    FalseBranch,
    LoopBack,
    Break,
    Return,
}

impl CFGEdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CFGEdgeKind::Sequential => "SEQUENTIAL",
            CFGEdgeKind::TrueBranch => "TRUE",
            CFGEdgeKind::FalseBranch => "FALSE",
            CFGEdgeKind::LoopBack => "LOOP_BACK",
            CFGEdgeKind::Break => "BREAK",
            CFGEdgeKind::Return => "RETURN",
        }
    }

    /// Edge taken when a branch condition has a known outcome
    pub fn branch_outcome(&self) -> Option<bool> {
        match self {
            CFGEdgeKind::TrueBranch => Some(true),
            CFGEdgeKind::FalseBranch => Some(false),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockKind {
    Entry,
    Exit,
    Statement,
    LoopHeader,
    Join,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CFGEdge {
    pub source: BlockId,
    pub target: BlockId,
    pub kind: CFGEdgeKind,
}

/// Unit of work inside a block
#[derive(Debug, Clone, Copy)]
pub enum BlockItem<'a> {
    /// Simple statement (assignment, expression, return, definition, ...)
    Statement(&'a Stmt),

    /// Branch condition; always the last item of its block, refined along
    /// the outgoing TrueBranch/FalseBranch edges
    Condition(&'a Expr),

    /// Expression evaluated for its effects (a `for` iterable)
    Evaluate(&'a Expr),

    /// `for` target binding at the top of the loop body
    Bind {
        target: &'a str,
        iter: &'a Expr,
        node: NodeId,
    },
}

impl<'a> BlockItem<'a> {
    pub fn node_id(&self) -> NodeId {
        match self {
            BlockItem::Statement(stmt) => stmt.id,
            BlockItem::Condition(expr) | BlockItem::Evaluate(expr) => expr.id,
            BlockItem::Bind { node, .. } => *node,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BasicBlock<'a> {
    pub id: BlockId,
    pub kind: BlockKind,
    pub items: Vec<BlockItem<'a>>,
    /// Incoming edge ids
    pub incoming: Vec<EdgeId>,
    /// Outgoing edge ids
    pub outgoing: Vec<EdgeId>,
}

impl<'a> BasicBlock<'a> {
    /// Condition evaluated at the end of this block, if any
    pub fn condition(&self) -> Option<&'a Expr> {
        match self.items.last() {
            Some(BlockItem::Condition(expr)) => Some(expr),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ControlFlowGraph<'a> {
    pub function: String,
    pub blocks: Vec<BasicBlock<'a>>,
    pub edges: Vec<CFGEdge>,
    pub entry: BlockId,
    pub exit: BlockId,
    pub loop_headers: BTreeSet<BlockId>,
    /// Reverse postorder from entry; blocks unreachable from entry
    /// (only ever the exit) come last
    pub reverse_postorder: Vec<BlockId>,
}

impl<'a> ControlFlowGraph<'a> {
    pub fn block(&self, id: BlockId) -> &BasicBlock<'a> {
        &self.blocks[id]
    }

    pub fn edge(&self, id: EdgeId) -> &CFGEdge {
        &self.edges[id]
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn is_loop_header(&self, id: BlockId) -> bool {
        self.loop_headers.contains(&id)
    }

    pub fn successors(&self, id: BlockId) -> impl Iterator<Item = BlockId> + '_ {
        self.blocks[id].outgoing.iter().map(|&e| self.edges[e].target)
    }

    pub fn predecessors(&self, id: BlockId) -> impl Iterator<Item = BlockId> + '_ {
        self.blocks[id].incoming.iter().map(|&e| self.edges[e].source)
    }

    /// Position of every block in [`Self::reverse_postorder`]
    pub fn rpo_positions(&self) -> Vec<usize> {
        let mut positions = vec![usize::MAX; self.blocks.len()];
        for (pos, &block) in self.reverse_postorder.iter().enumerate() {
            positions[block] = pos;
        }
        positions
    }

    /// Every item in block order (entry first)
    pub fn items(&self) -> impl Iterator<Item = (BlockId, &BlockItem<'a>)> + '_ {
        self.blocks
            .iter()
            .flat_map(|b| b.items.iter().map(move |item| (b.id, item)))
    }
}
