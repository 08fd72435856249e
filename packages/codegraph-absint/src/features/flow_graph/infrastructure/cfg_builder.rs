/*
 * CFG Builder
 *
 * Single pass over a function body:
 * - if:    condition ends the current block; TrueBranch/FalseBranch edges to
 *          fresh blocks; both arms flow into an explicit Join block
 * - while: loop header holds the condition; TrueBranch to the body,
 *          FalseBranch to the block after the loop; LoopBack from the body end
 * - for:   iterable evaluated in the pre-header, header without condition,
 *          Bind item at the top of the body
 * - return/break/continue: edge to exit/loop-after/loop-header, then the
 *          path is dead; following statements land in a block with no
 *          predecessors
 *
 * After lowering, blocks unreachable from entry are pruned (exit is always
 * kept) and the survivors are renumbered densely in creation order.
 */

use std::collections::BTreeSet;

use crate::errors::{AnalysisError, Result};
use crate::features::flow_graph::domain::{
    BasicBlock, BlockId, BlockItem, BlockKind, CFGEdge, CFGEdgeKind, ControlFlowGraph,
};
use crate::shared::models::{walk_stmts, NodeId, Stmt, StmtKind};

struct LoopFrame {
    header: BlockId,
    after: BlockId,
}

struct RawBlock<'a> {
    kind: BlockKind,
    items: Vec<BlockItem<'a>>,
}

/// Builds the CFG of one function body
pub struct CfgBuilder<'a> {
    function: String,
    allow_return: bool,
    blocks: Vec<RawBlock<'a>>,
    edges: Vec<(BlockId, BlockId, CFGEdgeKind)>,
    loops: Vec<LoopFrame>,
}

const ENTRY: BlockId = 0;
const EXIT: BlockId = 1;

impl<'a> CfgBuilder<'a> {
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            allow_return: true,
            blocks: Vec::new(),
            edges: Vec::new(),
            loops: Vec::new(),
        }
    }

    /// Module-level code: `return` is rejected
    pub fn for_module(function: impl Into<String>) -> Self {
        Self {
            allow_return: false,
            ..Self::new(function)
        }
    }

    pub fn build(mut self, body: &'a [Stmt]) -> Result<ControlFlowGraph<'a>> {
        self.new_block(BlockKind::Entry);
        self.new_block(BlockKind::Exit);

        if let Some(end) = self.lower_body(body, Some(ENTRY))? {
            self.edge(end, EXIT, CFGEdgeKind::Sequential);
        }

        Ok(self.finish())
    }

    fn new_block(&mut self, kind: BlockKind) -> BlockId {
        self.blocks.push(RawBlock {
            kind,
            items: Vec::new(),
        });
        self.blocks.len() - 1
    }

    fn edge(&mut self, from: BlockId, to: BlockId, kind: CFGEdgeKind) {
        self.edges.push((from, to, kind));
    }

    fn push(&mut self, block: BlockId, item: BlockItem<'a>) {
        self.blocks[block].items.push(item);
    }

    fn malformed(&self, node: NodeId, message: &str) -> AnalysisError {
        AnalysisError::malformed(self.function.clone(), node, message)
    }

    /// Lower `body` starting in `current`; returns the block control falls
    /// out of, or `None` if every path left through a jump
    fn lower_body(
        &mut self,
        body: &'a [Stmt],
        mut current: Option<BlockId>,
    ) -> Result<Option<BlockId>> {
        for stmt in body {
            // Code after a jump still gets a block; pruning removes it
            let block = match current {
                Some(block) => block,
                None => self.new_block(BlockKind::Statement),
            };
            current = self.lower_stmt(stmt, block)?;
        }
        Ok(current)
    }

    fn lower_stmt(&mut self, stmt: &'a Stmt, current: BlockId) -> Result<Option<BlockId>> {
        match &stmt.kind {
            StmtKind::Assign { .. } | StmtKind::Expr(_) | StmtKind::Pass => {
                self.push(current, BlockItem::Statement(stmt));
                Ok(Some(current))
            }

            StmtKind::FunctionDef(_) => {
                self.push(current, BlockItem::Statement(stmt));
                Ok(Some(current))
            }

            StmtKind::ClassDef(class) => {
                // Methods are separate units; a class body cannot return
                let mut offending = None;
                walk_stmts(&class.body, &mut |s| {
                    if offending.is_none() && matches!(s.kind, StmtKind::Return(_)) {
                        offending = Some(s.id);
                    }
                });
                if let Some(node) = offending {
                    return Err(self.malformed(
                        node,
                        &format!("'return' in body of class '{}'", class.name),
                    ));
                }
                self.push(current, BlockItem::Statement(stmt));
                Ok(Some(current))
            }

            StmtKind::Return(_) => {
                if !self.allow_return {
                    return Err(self.malformed(stmt.id, "'return' outside function"));
                }
                self.push(current, BlockItem::Statement(stmt));
                self.edge(current, EXIT, CFGEdgeKind::Return);
                Ok(None)
            }

            StmtKind::Break => {
                let after = match self.loops.last() {
                    Some(frame) => frame.after,
                    None => return Err(self.malformed(stmt.id, "'break' outside loop")),
                };
                self.edge(current, after, CFGEdgeKind::Break);
                Ok(None)
            }

            StmtKind::Continue => {
                let header = match self.loops.last() {
                    Some(frame) => frame.header,
                    None => return Err(self.malformed(stmt.id, "'continue' not properly in loop")),
                };
                self.edge(current, header, CFGEdgeKind::LoopBack);
                Ok(None)
            }

            StmtKind::If { test, body, orelse } => {
                self.push(current, BlockItem::Condition(test));
                let then_block = self.new_block(BlockKind::Statement);
                let else_block = self.new_block(BlockKind::Statement);
                self.edge(current, then_block, CFGEdgeKind::TrueBranch);
                self.edge(current, else_block, CFGEdgeKind::FalseBranch);

                let then_end = self.lower_body(body, Some(then_block))?;
                let else_end = self.lower_body(orelse, Some(else_block))?;

                let join = self.new_block(BlockKind::Join);
                for end in [then_end, else_end].into_iter().flatten() {
                    self.edge(end, join, CFGEdgeKind::Sequential);
                }
                Ok(Some(join))
            }

            StmtKind::While { test, body } => {
                let header = self.new_block(BlockKind::LoopHeader);
                self.edge(current, header, CFGEdgeKind::Sequential);
                self.push(header, BlockItem::Condition(test));

                let body_block = self.new_block(BlockKind::Statement);
                let after = self.new_block(BlockKind::Statement);
                self.edge(header, body_block, CFGEdgeKind::TrueBranch);
                self.edge(header, after, CFGEdgeKind::FalseBranch);

                self.loops.push(LoopFrame { header, after });
                let body_end = self.lower_body(body, Some(body_block))?;
                self.loops.pop();

                if let Some(end) = body_end {
                    self.edge(end, header, CFGEdgeKind::LoopBack);
                }
                Ok(Some(after))
            }

            StmtKind::For { target, iter, body } => {
                self.push(current, BlockItem::Evaluate(iter));
                let header = self.new_block(BlockKind::LoopHeader);
                self.edge(current, header, CFGEdgeKind::Sequential);

                let body_block = self.new_block(BlockKind::Statement);
                let after = self.new_block(BlockKind::Statement);
                self.edge(header, body_block, CFGEdgeKind::TrueBranch);
                self.edge(header, after, CFGEdgeKind::FalseBranch);
                self.push(
                    body_block,
                    BlockItem::Bind {
                        target,
                        iter,
                        node: stmt.id,
                    },
                );

                self.loops.push(LoopFrame { header, after });
                let body_end = self.lower_body(body, Some(body_block))?;
                self.loops.pop();

                if let Some(end) = body_end {
                    self.edge(end, header, CFGEdgeKind::LoopBack);
                }
                Ok(Some(after))
            }
        }
    }

    /// Prune unreachable blocks, renumber densely, compute loop headers and
    /// reverse postorder
    fn finish(self) -> ControlFlowGraph<'a> {
        let n = self.blocks.len();
        let mut successors: Vec<Vec<BlockId>> = vec![Vec::new(); n];
        for &(from, to, _) in &self.edges {
            successors[from].push(to);
        }

        let mut reachable = vec![false; n];
        let mut stack = vec![ENTRY];
        while let Some(block) = stack.pop() {
            if std::mem::replace(&mut reachable[block], true) {
                continue;
            }
            stack.extend(successors[block].iter().copied().filter(|&s| !reachable[s]));
        }
        reachable[EXIT] = true;

        let mut remap = vec![usize::MAX; n];
        let mut blocks = Vec::new();
        for (old, raw) in self.blocks.into_iter().enumerate() {
            if reachable[old] {
                remap[old] = blocks.len();
                blocks.push(BasicBlock {
                    id: blocks.len(),
                    kind: raw.kind,
                    items: raw.items,
                    incoming: Vec::new(),
                    outgoing: Vec::new(),
                });
            }
        }

        let mut edges = Vec::new();
        for (from, to, kind) in self.edges {
            if !reachable[from] || !reachable[to] {
                continue;
            }
            let edge = CFGEdge {
                source: remap[from],
                target: remap[to],
                kind,
            };
            let id = edges.len();
            blocks[edge.source].outgoing.push(id);
            blocks[edge.target].incoming.push(id);
            edges.push(edge);
        }

        let loop_headers: BTreeSet<BlockId> = blocks
            .iter()
            .filter(|b| b.kind == BlockKind::LoopHeader)
            .map(|b| b.id)
            .collect();

        let reverse_postorder = reverse_postorder(&blocks, &edges, remap[ENTRY]);

        ControlFlowGraph {
            function: self.function,
            blocks,
            edges,
            entry: remap[ENTRY],
            exit: remap[EXIT],
            loop_headers,
            reverse_postorder,
        }
    }
}

/// Iterative DFS postorder, reversed; blocks not reached are appended
fn reverse_postorder(blocks: &[BasicBlock<'_>], edges: &[CFGEdge], entry: BlockId) -> Vec<BlockId> {
    let mut visited = vec![false; blocks.len()];
    let mut postorder = Vec::with_capacity(blocks.len());
    // (block, next outgoing edge index)
    let mut stack: Vec<(BlockId, usize)> = vec![(entry, 0)];
    visited[entry] = true;

    while let Some(top) = stack.last_mut() {
        let (block, next) = *top;
        if let Some(&edge) = blocks[block].outgoing.get(next) {
            top.1 += 1;
            let succ = edges[edge].target;
            if !visited[succ] {
                visited[succ] = true;
                stack.push((succ, 0));
            }
        } else {
            postorder.push(block);
            stack.pop();
        }
    }

    postorder.reverse();
    postorder.extend((0..blocks.len()).filter(|&b| !visited[b]));
    postorder
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::SyntaxBuilder;

    fn kinds(cfg: &ControlFlowGraph<'_>) -> Vec<(BlockId, BlockId, CFGEdgeKind)> {
        cfg.edges.iter().map(|e| (e.source, e.target, e.kind)).collect()
    }

    #[test]
    fn test_straight_line_body() {
        let b = SyntaxBuilder::new();
        let body = vec![b.assign("x", b.int(1)), b.assign("y", b.int(2))];
        let cfg = CfgBuilder::new("f").build(&body).unwrap();

        assert_eq!(cfg.len(), 2);
        assert_eq!(cfg.entry, 0);
        assert_eq!(cfg.exit, 1);
        assert_eq!(cfg.block(0).items.len(), 2);
        assert_eq!(kinds(&cfg), vec![(0, 1, CFGEdgeKind::Sequential)]);
    }

    #[test]
    fn test_if_produces_branches_and_join() {
        let b = SyntaxBuilder::new();
        let body = vec![b.if_(
            b.name("c"),
            vec![b.assign("x", b.int(1))],
            vec![b.assign("x", b.int(2))],
        )];
        let cfg = CfgBuilder::new("f").build(&body).unwrap();

        // entry, exit, then, else, join
        assert_eq!(cfg.len(), 5);
        assert!(cfg.block(0).condition().is_some());
        assert_eq!(cfg.block(4).kind, BlockKind::Join);
        assert_eq!(
            kinds(&cfg),
            vec![
                (0, 2, CFGEdgeKind::TrueBranch),
                (0, 3, CFGEdgeKind::FalseBranch),
                (2, 4, CFGEdgeKind::Sequential),
                (3, 4, CFGEdgeKind::Sequential),
                (4, 1, CFGEdgeKind::Sequential),
            ]
        );
    }

    #[test]
    fn test_while_has_header_and_back_edge() {
        let b = SyntaxBuilder::new();
        let body = vec![
            b.assign("i", b.int(0)),
            b.while_(
                b.lt(b.name("i"), b.int(10)),
                vec![b.assign("i", b.add(b.name("i"), b.int(1)))],
            ),
        ];
        let cfg = CfgBuilder::new("f").build(&body).unwrap();

        let header = 2;
        assert!(cfg.is_loop_header(header));
        assert!(cfg.block(header).condition().is_some());
        assert!(cfg
            .edges
            .iter()
            .any(|e| e.target == header && e.kind == CFGEdgeKind::LoopBack));
        assert_eq!(cfg.reverse_postorder[0], cfg.entry);
    }

    #[test]
    fn test_for_binds_target_in_body() {
        let b = SyntaxBuilder::new();
        let body = vec![b.for_(
            "x",
            b.name("xs"),
            vec![b.expr_stmt(b.call_name("print", vec![b.name("x")]))],
        )];
        let cfg = CfgBuilder::new("f").build(&body).unwrap();

        assert!(matches!(cfg.block(0).items[0], BlockItem::Evaluate(_)));
        let body_block = cfg
            .blocks
            .iter()
            .find(|blk| matches!(blk.items.first(), Some(BlockItem::Bind { target: "x", .. })))
            .expect("body block with bind");
        assert_eq!(body_block.items.len(), 2);
    }

    #[test]
    fn test_code_after_return_is_pruned() {
        let b = SyntaxBuilder::new();
        let body = vec![b.ret(b.int(1)), b.assign("dead", b.int(2))];
        let cfg = CfgBuilder::new("f").build(&body).unwrap();

        assert_eq!(cfg.len(), 2);
        assert_eq!(kinds(&cfg), vec![(0, 1, CFGEdgeKind::Return)]);
    }

    #[test]
    fn test_break_and_continue_targets() {
        let b = SyntaxBuilder::new();
        let body = vec![b.while_(
            b.boolean(true),
            vec![b.if_(b.name("c"), vec![b.break_()], vec![b.continue_()])],
        )];
        let cfg = CfgBuilder::new("f").build(&body).unwrap();

        assert!(cfg.edges.iter().any(|e| e.kind == CFGEdgeKind::Break));
        let header = *cfg.loop_headers.iter().next().unwrap();
        assert!(cfg
            .edges
            .iter()
            .any(|e| e.kind == CFGEdgeKind::LoopBack && e.target == header));
    }

    #[test]
    fn test_break_outside_loop_is_malformed() {
        let b = SyntaxBuilder::new();
        let body = vec![b.break_()];
        let err = CfgBuilder::new("f").build(&body).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_module_return_is_malformed() {
        let b = SyntaxBuilder::new();
        let body = vec![b.ret_none()];
        assert!(CfgBuilder::for_module("<module>").build(&body).is_err());
    }

    #[test]
    fn test_numbering_is_deterministic() {
        let b = SyntaxBuilder::new();
        let body = vec![b.if_(b.name("c"), vec![b.ret(b.int(1))], vec![])];
        let first = CfgBuilder::new("f").build(&body).unwrap();
        let second = CfgBuilder::new("f").build(&body).unwrap();
        assert_eq!(kinds(&first), kinds(&second));
        assert_eq!(first.reverse_postorder, second.reverse_postorder);
    }
}
