//! Soundness against a concrete interpreter
//!
//! Random module-level programs over three integer/None variables are run
//! concretely and analyzed. Every concrete final value must lie in the
//! abstract value the analysis reports for that variable, and a condition
//! reported as always going one way must never have gone the other way.

mod common;

use codegraph_absint::shared::models::{BinOp, CompOp, Expr, Program, Stmt, MODULE_FUNCTION};
use codegraph_absint::{analyze, AnalysisConfig, DiagnosticKind, Preset, SyntaxBuilder};
use common::*;
use proptest::prelude::*;

const VARS: [&str; 3] = ["a", "b", "c"];

// ============================================================================
// Program shapes
// ============================================================================

#[derive(Debug, Clone)]
enum Operand {
    Var(usize),
    Int(i64),
    None,
}

#[derive(Debug, Clone)]
enum GenExpr {
    Atom(Operand),
    Binary(BinOp, Operand, Operand),
    Neg(usize),
}

#[derive(Debug, Clone)]
enum GenCond {
    Compare(CompOp, usize, i64),
    IsNone(usize),
    IsNotNone(usize),
    Truthy(usize),
    Not(Box<GenCond>),
    And(Box<GenCond>, Box<GenCond>),
    Or(Box<GenCond>, Box<GenCond>),
}

#[derive(Debug, Clone)]
enum GenStmt {
    Assign(usize, GenExpr),
    If(GenCond, Vec<GenStmt>, Vec<GenStmt>),
    /// Counted loop with its own counter variable
    Repeat(i64, Vec<GenStmt>),
}

fn var() -> impl Strategy<Value = usize> {
    0..VARS.len()
}

fn operand() -> impl Strategy<Value = Operand> {
    prop_oneof![
        3 => var().prop_map(Operand::Var),
        3 => (-4i64..=4).prop_map(Operand::Int),
        1 => Just(Operand::None),
    ]
}

fn expr() -> impl Strategy<Value = GenExpr> {
    let op = prop_oneof![Just(BinOp::Add), Just(BinOp::Sub), Just(BinOp::Mul)];
    prop_oneof![
        2 => operand().prop_map(GenExpr::Atom),
        3 => (op, operand(), operand()).prop_map(|(op, l, r)| GenExpr::Binary(op, l, r)),
        1 => var().prop_map(GenExpr::Neg),
    ]
}

fn cond() -> impl Strategy<Value = GenCond> {
    let op = prop_oneof![
        Just(CompOp::Lt),
        Just(CompOp::LtE),
        Just(CompOp::Gt),
        Just(CompOp::GtE),
        Just(CompOp::Eq),
        Just(CompOp::NotEq),
    ];
    let leaf = prop_oneof![
        3 => (op, var(), -4i64..=4).prop_map(|(op, v, k)| GenCond::Compare(op, v, k)),
        1 => var().prop_map(GenCond::IsNone),
        1 => var().prop_map(GenCond::IsNotNone),
        1 => var().prop_map(GenCond::Truthy),
    ];
    leaf.prop_recursive(2, 6, 2, |inner| {
        prop_oneof![
            inner.clone().prop_map(|c| GenCond::Not(Box::new(c))),
            (inner.clone(), inner.clone())
                .prop_map(|(l, r)| GenCond::And(Box::new(l), Box::new(r))),
            (inner.clone(), inner).prop_map(|(l, r)| GenCond::Or(Box::new(l), Box::new(r))),
        ]
    })
}

fn stmt() -> impl Strategy<Value = GenStmt> {
    let leaf = (var(), expr()).prop_map(|(v, e)| GenStmt::Assign(v, e));
    leaf.prop_recursive(3, 24, 3, |inner| {
        prop_oneof![
            (
                cond(),
                prop::collection::vec(inner.clone(), 0..3),
                prop::collection::vec(inner.clone(), 0..3),
            )
                .prop_map(|(c, then, orelse)| GenStmt::If(c, then, orelse)),
            (1i64..=5, prop::collection::vec(inner, 1..3))
                .prop_map(|(n, body)| GenStmt::Repeat(n, body)),
        ]
    })
}

fn program() -> impl Strategy<Value = (Vec<i64>, Vec<GenStmt>)> {
    (
        prop::collection::vec(-4i64..=4, VARS.len()),
        prop::collection::vec(stmt(), 1..6),
    )
}

// ============================================================================
// Lowering to syntax
// ============================================================================

struct Lowering {
    b: SyntaxBuilder,
    loops: usize,
}

impl Lowering {
    fn operand(&self, operand: &Operand) -> Expr {
        match operand {
            Operand::Var(v) => self.b.name(VARS[*v]),
            Operand::Int(n) => self.b.int(*n),
            Operand::None => self.b.none(),
        }
    }

    fn expr(&self, expr: &GenExpr) -> Expr {
        match expr {
            GenExpr::Atom(o) => self.operand(o),
            GenExpr::Binary(op, l, r) => self.b.binop(*op, self.operand(l), self.operand(r)),
            GenExpr::Neg(v) => self.b.neg(self.b.name(VARS[*v])),
        }
    }

    fn cond(&self, cond: &GenCond) -> Expr {
        use codegraph_absint::shared::models::BoolOp;
        match cond {
            GenCond::Compare(op, v, k) => {
                self.b.compare(*op, self.b.name(VARS[*v]), self.b.int(*k))
            }
            GenCond::IsNone(v) => self.b.is_none(self.b.name(VARS[*v])),
            GenCond::IsNotNone(v) => self.b.is_not_none(self.b.name(VARS[*v])),
            GenCond::Truthy(v) => self.b.name(VARS[*v]),
            GenCond::Not(c) => self.b.not(self.cond(c)),
            GenCond::And(l, r) => self.b.bool_op(BoolOp::And, self.cond(l), self.cond(r)),
            GenCond::Or(l, r) => self.b.bool_op(BoolOp::Or, self.cond(l), self.cond(r)),
        }
    }

    fn stmts(&mut self, stmts: &[GenStmt]) -> Vec<Stmt> {
        let mut out = Vec::new();
        for stmt in stmts {
            match stmt {
                GenStmt::Assign(v, e) => out.push(self.b.assign(VARS[*v], self.expr(e))),
                GenStmt::If(c, then, orelse) => {
                    let test = self.cond(c);
                    let then = self.stmts(then);
                    let orelse = self.stmts(orelse);
                    out.push(self.b.if_(test, then, orelse));
                }
                GenStmt::Repeat(n, body) => {
                    let counter = format!("k{}", self.loops);
                    self.loops += 1;
                    out.push(self.b.assign(&counter, self.b.int(0)));
                    let test = self.b.lt(self.b.name(&counter), self.b.int(*n));
                    let mut body = self.stmts(body);
                    body.push(self.b.assign(
                        &counter,
                        self.b.add(self.b.name(&counter), self.b.int(1)),
                    ));
                    out.push(self.b.while_(test, body));
                }
            }
        }
        out
    }
}

fn lower(init: &[i64], stmts: &[GenStmt]) -> Program {
    let mut lowering = Lowering {
        b: SyntaxBuilder::new(),
        loops: 0,
    };
    let mut body: Vec<Stmt> = VARS
        .iter()
        .zip(init)
        .map(|(v, n)| lowering.b.assign(v, lowering.b.int(*n)))
        .collect();
    body.extend(lowering.stmts(stmts));
    lowering.b.program(body)
}

fn preset() -> impl Strategy<Value = Preset> {
    prop_oneof![
        Just(Preset::Fast),
        Just(Preset::Balanced),
        Just(Preset::Thorough),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn final_values_are_over_approximated((init, stmts) in program(), preset in preset()) {
        let program = lower(&init, &stmts);
        // Programs that raise or overflow have no final state to compare
        let Some(trace) = run_module(&program, 100_000) else {
            return Ok(());
        };

        let report = analyze(&program, &AnalysisConfig::preset(preset)).unwrap();
        prop_assert!(report.errors.is_empty());
        let module = report.summary(MODULE_FUNCTION).unwrap();
        if module.degraded {
            return Ok(());
        }

        for (var, concrete) in &trace.env {
            let abstract_value = exit_value(&report, MODULE_FUNCTION, var);
            prop_assert!(
                concrete.is_described_by(&abstract_value),
                "{} = {:?} not in {}", var, concrete, abstract_value
            );
        }
    }

    #[test]
    fn fixed_branches_never_flip((init, stmts) in program()) {
        let program = lower(&init, &stmts);
        let Some(trace) = run_module(&program, 100_000) else {
            return Ok(());
        };

        let report = analyze(&program, &AnalysisConfig::default()).unwrap();
        for diagnostic in report.diagnostics_of(DiagnosticKind::UnreachableBranch) {
            if let Some(outcomes) = trace.outcomes.get(&diagnostic.location) {
                prop_assert!(
                    outcomes.len() <= 1,
                    "condition at {} took both ways: {}", diagnostic.location, diagnostic.message
                );
            }
        }
    }
}

#[test]
fn test_interpreter_agrees_on_a_known_program() {
    let program = counter_loop(10, 3);
    let trace = run_module(&program, 1_000).unwrap();
    assert_eq!(trace.env["i"], Concrete::Int(12));

    let report = analyze(&program, &AnalysisConfig::default()).unwrap();
    assert!(Concrete::Int(12).is_described_by(&exit_value(&report, MODULE_FUNCTION, "i")));
}

#[test]
fn test_interpreter_rejects_ordering_against_none() {
    let b = SyntaxBuilder::new();
    let program = b.program(vec![
        b.assign("x", b.none()),
        b.if_(b.lt(b.name("x"), b.int(1)), vec![b.pass()], vec![]),
    ]);
    assert!(run_module(&program, 100).is_none());
}
