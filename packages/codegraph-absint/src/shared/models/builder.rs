//! Programmatic syntax tree construction
//!
//! Used by tests, benchmarks and embedders that have no parser at hand.
//! Node ids are handed out sequentially from a shared counter, so nested
//! builder calls can be written inline:
//!
//! ```rust,ignore
//! let b = SyntaxBuilder::new();
//! let stmt = b.assign("z", b.add(b.name("x"), b.int(1)));
//! ```

use std::cell::Cell;

use super::syntax::*;

/// Sequential-id syntax tree builder
#[derive(Debug, Default)]
pub struct SyntaxBuilder {
    next_id: Cell<NodeId>,
}

impl SyntaxBuilder {
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(1),
        }
    }

    /// Allocate a fresh node id
    pub fn next_id(&self) -> NodeId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    /// Id the next allocated node will receive
    pub fn peek_id(&self) -> NodeId {
        self.next_id.get()
    }

    fn expr(&self, kind: ExprKind) -> Expr {
        Expr {
            id: self.next_id(),
            kind,
        }
    }

    fn stmt(&self, kind: StmtKind) -> Stmt {
        Stmt {
            id: self.next_id(),
            kind,
        }
    }

    // ───────────────────────────────────────────────────────────────────────
    // Expressions
    // ───────────────────────────────────────────────────────────────────────

    pub fn int(&self, value: i64) -> Expr {
        self.expr(ExprKind::Literal(Literal::Int(value)))
    }

    pub fn boolean(&self, value: bool) -> Expr {
        self.expr(ExprKind::Literal(Literal::Bool(value)))
    }

    pub fn string(&self, value: &str) -> Expr {
        self.expr(ExprKind::Literal(Literal::Str(value.to_string())))
    }

    pub fn none(&self) -> Expr {
        self.expr(ExprKind::Literal(Literal::None))
    }

    pub fn name(&self, name: &str) -> Expr {
        self.expr(ExprKind::Name(name.to_string()))
    }

    pub fn binop(&self, op: BinOp, left: Expr, right: Expr) -> Expr {
        self.expr(ExprKind::BinOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn add(&self, left: Expr, right: Expr) -> Expr {
        self.binop(BinOp::Add, left, right)
    }

    pub fn sub(&self, left: Expr, right: Expr) -> Expr {
        self.binop(BinOp::Sub, left, right)
    }

    pub fn mul(&self, left: Expr, right: Expr) -> Expr {
        self.binop(BinOp::Mul, left, right)
    }

    pub fn bool_op(&self, op: BoolOp, left: Expr, right: Expr) -> Expr {
        self.expr(ExprKind::BoolOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn unary(&self, op: UnaryOp, operand: Expr) -> Expr {
        self.expr(ExprKind::UnaryOp {
            op,
            operand: Box::new(operand),
        })
    }

    pub fn not(&self, operand: Expr) -> Expr {
        self.unary(UnaryOp::Not, operand)
    }

    pub fn neg(&self, operand: Expr) -> Expr {
        self.unary(UnaryOp::Neg, operand)
    }

    pub fn compare(&self, op: CompOp, left: Expr, right: Expr) -> Expr {
        self.expr(ExprKind::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn lt(&self, left: Expr, right: Expr) -> Expr {
        self.compare(CompOp::Lt, left, right)
    }

    /// `value is None`
    pub fn is_none(&self, value: Expr) -> Expr {
        let none = self.none();
        self.compare(CompOp::Is, value, none)
    }

    /// `value is not None`
    pub fn is_not_none(&self, value: Expr) -> Expr {
        let none = self.none();
        self.compare(CompOp::IsNot, value, none)
    }

    pub fn attr(&self, value: Expr, attr: &str) -> Expr {
        self.expr(ExprKind::Attribute {
            value: Box::new(value),
            attr: attr.to_string(),
        })
    }

    pub fn subscript(&self, value: Expr, index: Expr) -> Expr {
        self.expr(ExprKind::Subscript {
            value: Box::new(value),
            index: Box::new(index),
        })
    }

    pub fn call(&self, func: Expr, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::Call {
            func: Box::new(func),
            args,
        })
    }

    /// `name(args)`
    pub fn call_name(&self, name: &str, args: Vec<Expr>) -> Expr {
        let func = self.name(name);
        self.call(func, args)
    }

    /// `receiver.method(args)`
    pub fn method_call(&self, receiver: Expr, method: &str, args: Vec<Expr>) -> Expr {
        let func = self.attr(receiver, method);
        self.call(func, args)
    }

    pub fn list(&self, elements: Vec<Expr>) -> Expr {
        self.collection(CollectionKind::List, elements)
    }

    pub fn collection(&self, kind: CollectionKind, elements: Vec<Expr>) -> Expr {
        self.expr(ExprKind::Collection { kind, elements })
    }

    pub fn unsupported(&self, description: &str) -> Expr {
        self.expr(ExprKind::Unsupported(description.to_string()))
    }

    // ───────────────────────────────────────────────────────────────────────
    // Statements
    // ───────────────────────────────────────────────────────────────────────

    /// `name = value`
    pub fn assign(&self, name: &str, value: Expr) -> Stmt {
        let target = Target {
            id: self.next_id(),
            kind: TargetKind::Name(name.to_string()),
        };
        self.stmt(StmtKind::Assign { target, value })
    }

    /// `object.attr = value`
    pub fn assign_attr(&self, object: Expr, attr: &str, value: Expr) -> Stmt {
        let target = Target {
            id: self.next_id(),
            kind: TargetKind::Attribute {
                value: object,
                attr: attr.to_string(),
            },
        };
        self.stmt(StmtKind::Assign { target, value })
    }

    /// `object[index] = value`
    pub fn assign_subscript(&self, object: Expr, index: Expr, value: Expr) -> Stmt {
        let target = Target {
            id: self.next_id(),
            kind: TargetKind::Subscript {
                value: object,
                index,
            },
        };
        self.stmt(StmtKind::Assign { target, value })
    }

    pub fn expr_stmt(&self, expr: Expr) -> Stmt {
        self.stmt(StmtKind::Expr(expr))
    }

    pub fn if_(&self, test: Expr, body: Vec<Stmt>, orelse: Vec<Stmt>) -> Stmt {
        self.stmt(StmtKind::If { test, body, orelse })
    }

    pub fn while_(&self, test: Expr, body: Vec<Stmt>) -> Stmt {
        self.stmt(StmtKind::While { test, body })
    }

    pub fn for_(&self, target: &str, iter: Expr, body: Vec<Stmt>) -> Stmt {
        self.stmt(StmtKind::For {
            target: target.to_string(),
            iter,
            body,
        })
    }

    pub fn ret(&self, value: Expr) -> Stmt {
        self.stmt(StmtKind::Return(Some(value)))
    }

    pub fn ret_none(&self) -> Stmt {
        self.stmt(StmtKind::Return(None))
    }

    pub fn break_(&self) -> Stmt {
        self.stmt(StmtKind::Break)
    }

    pub fn continue_(&self) -> Stmt {
        self.stmt(StmtKind::Continue)
    }

    pub fn pass(&self) -> Stmt {
        self.stmt(StmtKind::Pass)
    }

    pub fn function(&self, name: &str, params: &[&str], body: Vec<Stmt>) -> Stmt {
        let def = FunctionDef {
            id: self.next_id(),
            name: name.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
            body,
        };
        self.stmt(StmtKind::FunctionDef(def))
    }

    pub fn class(&self, name: &str, bases: &[&str], body: Vec<Stmt>) -> Stmt {
        let def = ClassDef {
            id: self.next_id(),
            name: name.to_string(),
            bases: bases.iter().map(|b| b.to_string()).collect(),
            body,
        };
        self.stmt(StmtKind::ClassDef(def))
    }

    pub fn program(&self, body: Vec<Stmt>) -> Program {
        Program::new(body)
    }
}
