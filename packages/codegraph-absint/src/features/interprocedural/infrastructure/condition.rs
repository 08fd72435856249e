//! Branch refinement
//!
//! Narrows variables along TrueBranch/FalseBranch edges for conditions of
//! the shape `x op e`, `e op x`, `x is None`, `x is not None`, bare `x`,
//! `not c`, `a and b` (true edge) and `a or b` (false edge). An edge whose
//! condition provably evaluates the other way carries Bottom.

use crate::features::lattice::{AbstractValue, DomainSet, Lattice};
use crate::shared::models::{BoolOp, Expr, ExprKind, Literal, UnaryOp};

use crate::features::interprocedural::domain::ProgramState;

/// State flowing along the edge taken when `cond` evaluates to `outcome`.
/// `eval` must be free of effects.
pub fn refine_condition<E>(
    state: &ProgramState,
    cond: &Expr,
    outcome: bool,
    domains: DomainSet,
    eval: &E,
) -> ProgramState
where
    E: Fn(&Expr, &ProgramState) -> AbstractValue,
{
    if !state.is_reachable() {
        return state.clone();
    }
    if let Some(known) = eval(cond, state).truthiness() {
        if known != outcome {
            return ProgramState::bottom();
        }
    }
    let mut refined = state.clone();
    narrow(&mut refined, cond, outcome, domains, eval);
    if !refined.env.is_reachable() {
        refined.mark_unreachable();
    }
    refined
}

fn narrow<E>(state: &mut ProgramState, cond: &Expr, outcome: bool, domains: DomainSet, eval: &E)
where
    E: Fn(&Expr, &ProgramState) -> AbstractValue,
{
    if !state.env.is_reachable() {
        return;
    }
    match &cond.kind {
        ExprKind::UnaryOp {
            op: UnaryOp::Not,
            operand,
        } => narrow(state, operand, !outcome, domains, eval),
        ExprKind::BoolOp { op, left, right } => {
            // Both operands hold only on the true edge of `and` and the
            // false edge of `or`
            if matches!((op, outcome), (BoolOp::And, true) | (BoolOp::Or, false)) {
                narrow(state, left, outcome, domains, eval);
                narrow(state, right, outcome, domains, eval);
            }
        }
        ExprKind::Compare { op, left, right } => {
            let op = if outcome { *op } else { op.negate() };
            if let Some(name) = left.as_name() {
                let other = eval(right, state);
                let narrowed = state.env.get(name).restrict(op, &other);
                state.env.refine(name, &narrowed, domains);
            }
            if let Some(name) = right.as_name() {
                let other = eval(left, state);
                let narrowed = state.env.get(name).restrict(op.flip(), &other);
                state.env.refine(name, &narrowed, domains);
            }
        }
        ExprKind::Name(name) => {
            let current = state.env.get(name);
            let narrowed = if outcome { truthy(&current) } else { falsy(&current) };
            state.env.refine(name, &narrowed, domains);
        }
        _ => {}
    }
}

/// Truthy values are never None and never integer zero
fn truthy(value: &AbstractValue) -> AbstractValue {
    let not_none = value.meet(&AbstractValue::not_null());
    if not_none.is_numeric() {
        not_none.exclude(0)
    } else {
        not_none
    }
}

/// A falsy integer is zero; other falsy values are not tracked
fn falsy(value: &AbstractValue) -> AbstractValue {
    if value.is_numeric() {
        value.meet(&AbstractValue::constant(0))
    } else {
        *value
    }
}
