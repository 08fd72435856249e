//! Concrete interpreter for module-level integer/None programs
//!
//! Runs a program the way Python would and records the concrete outcome
//! of every branch condition. Anything outside the subset (calls, heap
//! access, type errors, overflow, running out of fuel) aborts the run with
//! `None`, so callers treat it as "no concrete execution to compare with".

use std::collections::{BTreeMap, BTreeSet};

use codegraph_absint::shared::models::{
    BinOp, BoolOp, CompOp, Expr, ExprKind, Literal, NodeId, Program, Stmt, StmtKind, TargetKind,
    UnaryOp,
};
use codegraph_absint::AbstractValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Concrete {
    Int(i64),
    None,
}

impl Concrete {
    fn truthy(self) -> bool {
        !matches!(self, Concrete::None | Concrete::Int(0))
    }

    fn from_bool(b: bool) -> Self {
        Concrete::Int(i64::from(b))
    }

    /// Whether the abstract value over-approximates this value
    pub fn is_described_by(self, value: &AbstractValue) -> bool {
        match self {
            Concrete::Int(n) => value.contains_int(n),
            Concrete::None => value.contains_none(),
        }
    }
}

/// Result of one complete concrete run
#[derive(Debug, Default)]
pub struct Trace {
    pub env: BTreeMap<String, Concrete>,
    /// Outcomes observed per branch condition node
    pub outcomes: BTreeMap<NodeId, BTreeSet<bool>>,
}

/// Run the module body; `fuel` bounds the number of executed statements
pub fn run_module(program: &Program, fuel: usize) -> Option<Trace> {
    let mut machine = Machine {
        trace: Trace::default(),
        fuel,
    };
    machine.block(&program.body)?;
    Some(machine.trace)
}

struct Machine {
    trace: Trace,
    fuel: usize,
}

impl Machine {
    fn block(&mut self, body: &[Stmt]) -> Option<()> {
        body.iter().try_for_each(|stmt| self.stmt(stmt))
    }

    fn stmt(&mut self, stmt: &Stmt) -> Option<()> {
        self.fuel = self.fuel.checked_sub(1)?;
        match &stmt.kind {
            StmtKind::Assign { target, value } => {
                let TargetKind::Name(name) = &target.kind else {
                    return None;
                };
                let v = self.eval(value)?;
                self.trace.env.insert(name.clone(), v);
            }
            StmtKind::Expr(expr) => {
                self.eval(expr)?;
            }
            StmtKind::If { test, body, orelse } => {
                if self.branch(test)? {
                    self.block(body)?;
                } else {
                    self.block(orelse)?;
                }
            }
            StmtKind::While { test, body } => {
                while self.branch(test)? {
                    self.block(body)?;
                }
            }
            StmtKind::Pass => {}
            _ => return None,
        }
        Some(())
    }

    fn branch(&mut self, test: &Expr) -> Option<bool> {
        self.fuel = self.fuel.checked_sub(1)?;
        let outcome = self.eval(test)?.truthy();
        self.trace.outcomes.entry(test.id).or_default().insert(outcome);
        Some(outcome)
    }

    fn eval(&mut self, expr: &Expr) -> Option<Concrete> {
        match &expr.kind {
            ExprKind::Literal(Literal::Int(n)) => Some(Concrete::Int(*n)),
            ExprKind::Literal(Literal::Bool(b)) => Some(Concrete::from_bool(*b)),
            ExprKind::Literal(Literal::None) => Some(Concrete::None),
            ExprKind::Name(name) => self.trace.env.get(name).copied(),
            ExprKind::BinOp { op, left, right } => {
                let (Concrete::Int(l), Concrete::Int(r)) = (self.eval(left)?, self.eval(right)?)
                else {
                    return None;
                };
                let v = match op {
                    BinOp::Add => l.checked_add(r),
                    BinOp::Sub => l.checked_sub(r),
                    BinOp::Mul => l.checked_mul(r),
                    _ => None,
                }?;
                Some(Concrete::Int(v))
            }
            ExprKind::UnaryOp { op, operand } => {
                let v = self.eval(operand)?;
                match (op, v) {
                    (UnaryOp::Not, v) => Some(Concrete::from_bool(!v.truthy())),
                    (UnaryOp::Neg, Concrete::Int(n)) => n.checked_neg().map(Concrete::Int),
                    (UnaryOp::Pos, Concrete::Int(n)) => Some(Concrete::Int(n)),
                    _ => None,
                }
            }
            ExprKind::BoolOp { op, left, right } => {
                let l = self.eval(left)?;
                match (op, l.truthy()) {
                    (BoolOp::And, false) | (BoolOp::Or, true) => Some(l),
                    _ => self.eval(right),
                }
            }
            ExprKind::Compare { op, left, right } => {
                let (l, r) = (self.eval(left)?, self.eval(right)?);
                compare(*op, l, r).map(Concrete::from_bool)
            }
            _ => None,
        }
    }
}

fn compare(op: CompOp, l: Concrete, r: Concrete) -> Option<bool> {
    use Concrete::{Int, None as Nil};
    match (op, l, r) {
        (CompOp::Eq, l, r) => Some(l == r),
        (CompOp::NotEq, l, r) => Some(l != r),
        // Identity of two ints depends on interning; stay out of it
        (CompOp::Is | CompOp::IsNot, Int(_), Int(_)) => None,
        (CompOp::Is, l, r) => Some(l == r),
        (CompOp::IsNot, l, r) => Some(l != r),
        (_, Int(a), Int(b)) => Some(match op {
            CompOp::Lt => a < b,
            CompOp::LtE => a <= b,
            CompOp::Gt => a > b,
            _ => a >= b,
        }),
        // Ordering against None raises
        (_, Nil, _) | (_, _, Nil) => None,
    }
}

