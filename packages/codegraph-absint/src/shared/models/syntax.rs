//! Syntax tree consumed by the analysis engine
//!
//! The parser that produces this tree lives outside the crate; the engine only
//! reads it. Statement and expression kinds are closed enums so that adding a
//! new node kind forces every `match` in the transfer functions to be revisited.
//!
//! Every node carries a [`NodeId`] that diagnostics point back to.

use serde::{Deserialize, Serialize};

/// Node identifier (unique within a [`Program`])
pub type NodeId = u32;

/// A whole program: the top-level statement list of one module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub body: Vec<Stmt>,
}

impl Program {
    pub fn new(body: Vec<Stmt>) -> Self {
        Self { body }
    }

    /// Top-level function definitions
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDef> {
        self.body.iter().filter_map(|stmt| match &stmt.kind {
            StmtKind::FunctionDef(def) => Some(def),
            _ => None,
        })
    }

    /// Top-level class definitions
    pub fn classes(&self) -> impl Iterator<Item = &ClassDef> {
        self.body.iter().filter_map(|stmt| match &stmt.kind {
            StmtKind::ClassDef(def) => Some(def),
            _ => None,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Statements
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    pub id: NodeId,
    pub kind: StmtKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtKind {
    /// `target = value`
    Assign { target: Target, value: Expr },

    /// Expression evaluated for its effect: `f(x)`
    Expr(Expr),

    /// `if test: body else: orelse`
    If {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },

    /// `while test: body`
    While { test: Expr, body: Vec<Stmt> },

    /// `for target in iter: body`
    For {
        target: String,
        iter: Expr,
        body: Vec<Stmt>,
    },

    /// `return` / `return value`
    Return(Option<Expr>),

    Break,
    Continue,
    Pass,

    FunctionDef(FunctionDef),
    ClassDef(ClassDef),
}

/// Assignment target (the "NameWrite" side of a binding)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: NodeId,
    pub kind: TargetKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TargetKind {
    /// `x = ...`
    Name(String),

    /// `obj.field = ...`
    Attribute { value: Expr, attr: String },

    /// `arr[index] = ...`
    Subscript { value: Expr, index: Expr },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub id: NodeId,
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDef {
    pub id: NodeId,
    pub name: String,
    /// Base class names, in declaration order
    pub bases: Vec<String>,
    pub body: Vec<Stmt>,
}

impl ClassDef {
    /// Methods defined directly in the class body
    pub fn methods(&self) -> impl Iterator<Item = &FunctionDef> {
        self.body.iter().filter_map(|stmt| match &stmt.kind {
            StmtKind::FunctionDef(def) => Some(def),
            _ => None,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Expressions
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    /// Literal value: `42`, `"str"`, `True`, `None`
    Literal(Literal),

    /// Variable read: `x`
    Name(String),

    /// Binary operation: `a + b`
    BinOp {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Short-circuit boolean operation: `a and b`
    BoolOp {
        op: BoolOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Unary operation: `-a`, `not x`
    UnaryOp { op: UnaryOp, operand: Box<Expr> },

    /// Comparison: `a < b`, `x is None`
    Compare {
        op: CompOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Field access: `obj.field`
    Attribute { value: Box<Expr>, attr: String },

    /// Element access: `arr[i]`
    Subscript { value: Box<Expr>, index: Box<Expr> },

    /// Call: `f(args)`, `obj.m(args)`, `Class(args)`
    Call { func: Box<Expr>, args: Vec<Expr> },

    /// Collection literal: `[1, 2]`
    Collection {
        kind: CollectionKind,
        elements: Vec<Expr>,
    },

    /// Construct the parser recognized but the engine does not model
    /// (lambda, comprehension, ...). Evaluates to Top.
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Literal {
    Int(i64),
    Bool(bool),
    Str(String),
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    /// Floor division (`//`); the only division the numeric domains model
    FloorDiv,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
    Pos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Is,
    IsNot,
}

impl CompOp {
    /// Operator describing `not (a op b)`
    pub fn negate(self) -> Self {
        match self {
            CompOp::Eq => CompOp::NotEq,
            CompOp::NotEq => CompOp::Eq,
            CompOp::Lt => CompOp::GtE,
            CompOp::LtE => CompOp::Gt,
            CompOp::Gt => CompOp::LtE,
            CompOp::GtE => CompOp::Lt,
            CompOp::Is => CompOp::IsNot,
            CompOp::IsNot => CompOp::Is,
        }
    }

    /// Operator describing `b op' a` for `a op b`
    pub fn flip(self) -> Self {
        match self {
            CompOp::Lt => CompOp::Gt,
            CompOp::LtE => CompOp::GtE,
            CompOp::Gt => CompOp::Lt,
            CompOp::GtE => CompOp::LtE,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectionKind {
    List,
    Tuple,
    Set,
    Dict,
}

impl CollectionKind {
    /// Runtime type name used for method dispatch
    pub fn type_name(&self) -> &'static str {
        match self {
            CollectionKind::List => "list",
            CollectionKind::Tuple => "tuple",
            CollectionKind::Set => "set",
            CollectionKind::Dict => "dict",
        }
    }
}

impl Expr {
    /// Pre-order walk over this expression and all nested expressions
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expr)) {
        let mut stack = vec![self];
        while let Some(expr) = stack.pop() {
            visit(expr);
            match &expr.kind {
                ExprKind::Literal(_) | ExprKind::Name(_) | ExprKind::Unsupported(_) => {}
                ExprKind::BinOp { left, right, .. }
                | ExprKind::BoolOp { left, right, .. }
                | ExprKind::Compare { left, right, .. } => {
                    stack.push(right);
                    stack.push(left);
                }
                ExprKind::UnaryOp { operand, .. } => stack.push(operand),
                ExprKind::Attribute { value, .. } => stack.push(value),
                ExprKind::Subscript { value, index } => {
                    stack.push(index);
                    stack.push(value);
                }
                ExprKind::Call { func, args } => {
                    stack.extend(args.iter().rev());
                    stack.push(func);
                }
                ExprKind::Collection { elements, .. } => stack.extend(elements.iter().rev()),
            }
        }
    }

    /// Variable name if this is a plain name read
    pub fn as_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Name(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.kind, ExprKind::Literal(_))
    }
}

impl Stmt {
    /// Expressions evaluated directly by this statement (not nested bodies)
    pub fn own_exprs(&self) -> Vec<&Expr> {
        match &self.kind {
            StmtKind::Assign { target, value } => {
                let mut exprs = match &target.kind {
                    TargetKind::Name(_) => Vec::new(),
                    TargetKind::Attribute { value, .. } => vec![value],
                    TargetKind::Subscript { value, index } => vec![value, index],
                };
                exprs.push(value);
                exprs
            }
            StmtKind::Expr(expr) => vec![expr],
            StmtKind::If { test, .. } | StmtKind::While { test, .. } => vec![test],
            StmtKind::For { iter, .. } => vec![iter],
            StmtKind::Return(Some(expr)) => vec![expr],
            StmtKind::Return(None)
            | StmtKind::Break
            | StmtKind::Continue
            | StmtKind::Pass
            | StmtKind::FunctionDef(_)
            | StmtKind::ClassDef(_) => Vec::new(),
        }
    }

    /// Nested statement lists (if/while/for bodies); function and class
    /// bodies are separate analysis units and are not included
    pub fn nested_bodies(&self) -> Vec<&[Stmt]> {
        match &self.kind {
            StmtKind::If { body, orelse, .. } => vec![body.as_slice(), orelse.as_slice()],
            StmtKind::While { body, .. } | StmtKind::For { body, .. } => vec![body.as_slice()],
            _ => Vec::new(),
        }
    }
}

/// Visit every statement of a body, descending into control-flow bodies
/// but not into nested definitions
pub fn walk_stmts<'a>(body: &'a [Stmt], visit: &mut impl FnMut(&'a Stmt)) {
    let mut stack: Vec<&'a Stmt> = body.iter().rev().collect();
    while let Some(stmt) = stack.pop() {
        visit(stmt);
        for nested in stmt.nested_bodies().into_iter().rev() {
            stack.extend(nested.iter().rev());
        }
    }
}

/// Visit every expression reachable from a body (statement order, pre-order)
pub fn walk_body_exprs<'a>(body: &'a [Stmt], visit: &mut impl FnMut(&'a Stmt, &'a Expr)) {
    walk_stmts(body, &mut |stmt| {
        for expr in stmt.own_exprs() {
            expr.walk(&mut |e| visit(stmt, e));
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::SyntaxBuilder;

    #[test]
    fn test_walk_visits_nested_expressions_in_order() {
        let b = SyntaxBuilder::new();
        let call = b.call_name("f", vec![b.int(1), b.name("x")]);
        let mut seen = Vec::new();
        call.walk(&mut |e| seen.push(e.kind.clone()));

        assert_eq!(seen.len(), 4);
        assert!(matches!(seen[0], ExprKind::Call { .. }));
        assert_eq!(seen[1], ExprKind::Name("f".to_string()));
        assert_eq!(seen[2], ExprKind::Literal(Literal::Int(1)));
        assert_eq!(seen[3], ExprKind::Name("x".to_string()));
    }

    #[test]
    fn test_walk_stmts_skips_function_bodies() {
        let b = SyntaxBuilder::new();
        let inner = b.assign("hidden", b.int(1));
        let def = b.function("f", &[], vec![inner]);
        let visible = b.assign("x", b.int(2));
        let body_stmt = b.assign("y", b.int(3));
        let loop_stmt = b.while_(b.name("x"), vec![body_stmt]);
        let body = vec![def, visible, loop_stmt];

        let mut count = 0;
        walk_stmts(&body, &mut |_| count += 1);
        assert_eq!(count, 4);
    }

    #[test]
    fn test_comp_op_negate_and_flip() {
        assert_eq!(CompOp::Lt.negate(), CompOp::GtE);
        assert_eq!(CompOp::Is.negate(), CompOp::IsNot);
        assert_eq!(CompOp::Lt.flip(), CompOp::Gt);
        assert_eq!(CompOp::Eq.flip(), CompOp::Eq);
    }
}
