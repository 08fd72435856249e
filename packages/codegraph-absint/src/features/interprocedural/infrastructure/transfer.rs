//! Transfer functions over `ProgramState`
//!
//! Evaluates expressions against the variable environment and the abstract
//! heap, applies callee summaries at call sites and refines branch edges.
//! With an observer attached (replay of a stabilized fixpoint) it also emits
//! diagnostics and records what each call site passes to its callees.
//!
//! Pure evaluations (condition refinement on edges, `range` bounds) run on a
//! scratch copy of the state with the observer muted.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::FxHashMap;
use tracing::warn;

use super::builtins::{is_known_pure, Builtin};
use super::condition::refine_condition;
use crate::features::call_graph::{CallKind, CallSite};
use crate::features::dataflow::TransferFunction;
use crate::features::flow_graph::{BasicBlock, BlockId, BlockItem, CFGEdge, CFGEdgeKind};
use crate::features::heap_analysis::{
    check_bounds, is_known_mutating, BoundsCheck, Field, HeapModel, HeapState,
};
use crate::features::interprocedural::domain::{
    AnalysisContext, Certainty, Diagnostic, ProgramState, SummaryView, RETURN_SLOT,
};
use crate::features::lattice::{AbstractValue, Lattice, Nullability};
use crate::shared::models::{
    BoolOp, Expr, ExprKind, FunctionId, FunctionInfo, Literal, NodeId, Stmt, StmtKind, TargetKind,
    UnaryOp,
};

/// Arguments and heap reaching a callee, joined over its call sites
#[derive(Debug, Clone)]
pub struct CallInput {
    /// One value per callee parameter
    pub args: Vec<AbstractValue>,
    pub heap: HeapState,
}

impl CallInput {
    pub fn join(&self, other: &Self) -> Self {
        let args = self
            .args
            .iter()
            .zip(&other.args)
            .map(|(a, b)| a.join(b))
            .collect();
        Self {
            args,
            heap: self.heap.join(&other.heap),
        }
    }
}

/// What one replay pass saw
#[derive(Debug, Default)]
pub struct Observations {
    pub diagnostics: Vec<Diagnostic>,
    pub calls: FxHashMap<FunctionId, CallInput>,
    pub call_targets: BTreeMap<NodeId, BTreeSet<String>>,
}

impl Observations {
    /// Fold another function's call records into this one
    pub fn merge_calls(&mut self, calls: FxHashMap<FunctionId, CallInput>) {
        for (callee, input) in calls {
            record_call(&mut self.calls, callee, input);
        }
    }
}

fn record_call(calls: &mut FxHashMap<FunctionId, CallInput>, callee: FunctionId, input: CallInput) {
    match calls.get_mut(&callee) {
        Some(existing) => *existing = existing.join(&input),
        None => {
            calls.insert(callee, input);
        }
    }
}

#[derive(Debug, Default)]
pub struct CallObserver {
    observed: RefCell<Observations>,
}

impl CallObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_observations(self) -> Observations {
        self.observed.into_inner()
    }
}

pub struct InterproceduralTransfer<'t, 'c, 'a> {
    ctx: &'t AnalysisContext<'c, 'a>,
    function: &'c FunctionInfo<'a>,
    summaries: SummaryView<'t>,
    exit: BlockId,
    observer: Option<&'t CallObserver>,
    quiet: Cell<bool>,
}

impl<'t, 'c, 'a> InterproceduralTransfer<'t, 'c, 'a> {
    pub fn new(
        ctx: &'t AnalysisContext<'c, 'a>,
        function: FunctionId,
        exit: BlockId,
        summaries: SummaryView<'t>,
    ) -> Self {
        Self {
            ctx,
            function: ctx.index.function(function),
            summaries,
            exit,
            observer: None,
            quiet: Cell::new(false),
        }
    }

    /// Attach an observer; only used for the replay pass
    pub fn with_observer(mut self, observer: &'t CallObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    fn model(&self) -> HeapModel<'c> {
        self.ctx.heap_model()
    }

    fn observing(&self) -> Option<&'t CallObserver> {
        self.observer.filter(|_| !self.quiet.get())
    }

    fn report(&self, diagnostic: Diagnostic) {
        if let Some(observer) = self.observing() {
            observer.observed.borrow_mut().diagnostics.push(diagnostic);
        }
    }

    /// Evaluate without touching `state` and without observing anything
    pub fn eval_pure(&self, expr: &Expr, state: &ProgramState) -> AbstractValue {
        let previous = self.quiet.replace(true);
        let mut scratch = state.clone();
        let value = self.eval(expr, &mut scratch);
        self.quiet.set(previous);
        value
    }

    // ─────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────

    pub fn eval(&self, expr: &Expr, state: &mut ProgramState) -> AbstractValue {
        if !state.is_reachable() {
            return AbstractValue::bottom();
        }
        match &expr.kind {
            ExprKind::Literal(literal) => match literal {
                Literal::Int(v) => AbstractValue::constant(*v),
                Literal::Bool(b) => AbstractValue::from_bool(*b),
                Literal::Str(_) => AbstractValue::not_null(),
                Literal::None => AbstractValue::none(),
            },

            ExprKind::Name(name) => state.env.get(name),

            ExprKind::BinOp { op, left, right } => {
                let l = self.eval(left, state);
                let r = self.eval(right, state);
                AbstractValue::binary(*op, &l, &r)
            }

            ExprKind::BoolOp { op, left, right } => self.eval_bool_op(*op, left, right, state),

            ExprKind::UnaryOp { op, operand } => {
                let v = self.eval(operand, state);
                if v.is_bottom() {
                    return v;
                }
                match op {
                    UnaryOp::Not => match v.truthiness() {
                        Some(b) => AbstractValue::from_bool(!b),
                        None => AbstractValue::boolean(),
                    },
                    UnaryOp::Neg => v.negate(),
                    UnaryOp::Pos if v.is_numeric() => v,
                    UnaryOp::Pos => AbstractValue::any_int(),
                }
            }

            ExprKind::Compare { op, left, right } => {
                let l = self.eval(left, state);
                let r = self.eval(right, state);
                if l.is_bottom() || r.is_bottom() {
                    return AbstractValue::bottom();
                }
                match AbstractValue::compare(*op, &l, &r) {
                    Some(b) => AbstractValue::from_bool(b),
                    None => AbstractValue::boolean(),
                }
            }

            ExprKind::Attribute { value, attr } => {
                let base = self.eval(value, state);
                self.check_deref(expr.id, value, &base, || format!("attribute '{}'", attr), state);
                self.model()
                    .load(&state.heap, value.id, &Field::Attr(attr.clone()))
            }

            ExprKind::Subscript { value, index } => {
                let base = self.eval(value, state);
                let idx = self.eval(index, state);
                self.check_deref(expr.id, value, &base, || "subscript".to_string(), state);
                self.check_index(expr.id, value.id, &idx, state);
                self.model().load(&state.heap, value.id, &Field::Elements)
            }

            ExprKind::Call { func, args } => self.eval_call(expr.id, func, args, state),

            ExprKind::Collection { elements, .. } => {
                let values: Vec<AbstractValue> =
                    elements.iter().map(|e| self.eval(e, state)).collect();
                if !state.is_reachable() {
                    return AbstractValue::bottom();
                }
                self.model().init_collection(&mut state.heap, expr.id, &values);
                AbstractValue::not_null()
            }

            ExprKind::Unsupported(description) => {
                if self.observing().is_some() {
                    warn!(
                        "{}: unsupported expression '{}' at node {} evaluates to Top",
                        self.function.name, description, expr.id
                    );
                }
                AbstractValue::top()
            }
        }
    }

    /// Short-circuit evaluation; an undecided left operand runs the right
    /// operand on the refined path and joins both outcomes
    fn eval_bool_op(
        &self,
        op: BoolOp,
        left: &Expr,
        right: &Expr,
        state: &mut ProgramState,
    ) -> AbstractValue {
        let l = self.eval(left, state);
        if l.is_bottom() {
            return l;
        }
        let continues_on = op == BoolOp::And;
        match l.truthiness() {
            Some(b) if b != continues_on => l,
            Some(_) => self.eval(right, state),
            None => {
                let mut taken = refine_condition(
                    state,
                    left,
                    continues_on,
                    self.ctx.domains(),
                    &|e, s| self.eval_pure(e, s),
                );
                let r = self.eval(right, &mut taken);
                *state = state.join(&taken);
                l.join(&r)
            }
        }
    }

    /// Report a dereference of a possibly-None receiver. Past a Nullable
    /// access the receiver is known non-None.
    fn check_deref(
        &self,
        location: NodeId,
        receiver: &Expr,
        value: &AbstractValue,
        access: impl FnOnce() -> String,
        state: &mut ProgramState,
    ) {
        let definite = match value.nullability {
            Nullability::DefinitelyNull => true,
            Nullability::Nullable => false,
            _ => return,
        };
        self.report(Diagnostic::null_deref(definite, location, &self.function.name, &access()));
        if !definite {
            if let Some(name) = receiver.as_name() {
                state
                    .env
                    .refine(name, &AbstractValue::not_null(), self.ctx.domains());
            }
        }
    }

    /// Index against the tracked length, for receivers that are all
    /// list/tuple objects
    fn check_index(
        &self,
        location: NodeId,
        base: NodeId,
        index: &AbstractValue,
        state: &ProgramState,
    ) {
        if self.observing().is_none() {
            return;
        }
        let model = self.model();
        let targets = model.targets(base);
        let pointer = model.pointer();
        if targets.is_empty()
            || !targets
                .iter()
                .all(|&o| pointer.object(o).kind.is_indexable_sequence())
        {
            return;
        }
        let length = model.length(&state.heap, base);
        let certainty = match check_bounds(&length, index) {
            BoundsCheck::InBounds => return,
            BoundsCheck::Possible => Certainty::Possible,
            BoundsCheck::Definite => Certainty::Definite,
        };
        self.report(Diagnostic::out_of_bounds(
            certainty,
            location,
            &self.function.name,
            &index.range.to_string(),
            &length.range.to_string(),
        ));
    }

    // ─────────────────────────────────────────────────────────────────
    // Calls
    // ─────────────────────────────────────────────────────────────────

    fn eval_call(
        &self,
        node: NodeId,
        func: &Expr,
        args: &[Expr],
        state: &mut ProgramState,
    ) -> AbstractValue {
        let receiver = match &func.kind {
            ExprKind::Attribute { value, attr } => {
                let v = self.eval(value, state);
                self.check_deref(func.id, value, &v, || format!("method '{}'", attr), state);
                Some((value.as_ref(), v))
            }
            _ => None,
        };
        let values: Vec<AbstractValue> = args.iter().map(|a| self.eval(a, state)).collect();
        if !state.is_reachable() {
            return AbstractValue::bottom();
        }
        let mut arg_nodes: Vec<NodeId> = args.iter().map(|a| a.id).collect();
        if let Some((recv, _)) = receiver {
            arg_nodes.push(recv.id);
        }

        let site = self.ctx.call_graph.site(node);
        if let Some(site) = site.filter(|s| !s.targets.is_empty()) {
            self.record_targets(site);
        }

        match site.map(|s| (&s.kind, s)) {
            Some((CallKind::Constructor { .. }, site)) => {
                self.model().allocate(&mut state.heap, node);
                let mut call_args = vec![AbstractValue::not_null()];
                call_args.extend(values);
                if !site.targets.is_empty() {
                    self.apply_targets(site, &call_args, &arg_nodes, state);
                }
                if state.is_reachable() {
                    AbstractValue::not_null()
                } else {
                    AbstractValue::bottom()
                }
            }
            Some((CallKind::Direct, site)) if !site.targets.is_empty() => {
                self.apply_targets(site, &values, &arg_nodes, state)
            }
            Some((CallKind::Virtual { .. }, site)) if !site.targets.is_empty() => {
                let self_value = receiver
                    .map(|(_, v)| v.meet(&AbstractValue::not_null()))
                    .filter(|v| !v.is_bottom())
                    .unwrap_or_else(AbstractValue::not_null);
                let mut call_args = vec![self_value];
                call_args.extend(values);
                self.apply_targets(site, &call_args, &arg_nodes, state)
            }
            Some((CallKind::Virtual { method, receiver }, _)) => {
                self.container_method(*receiver, method, &values, &arg_nodes, state)
            }
            _ => {
                let builtin = match (&receiver, func.as_name()) {
                    (None, Some(name)) => Builtin::lookup(name),
                    _ => None,
                };
                match builtin {
                    Some(builtin) => {
                        let length = match (builtin, args.first()) {
                            (Builtin::Len, Some(arg)) => {
                                Some(self.model().length(&state.heap, arg.id))
                            }
                            _ => None,
                        };
                        builtin.call(&values, length)
                    }
                    None => {
                        self.model().invalidate_escaping(&mut state.heap, &arg_nodes);
                        AbstractValue::top()
                    }
                }
            }
        }
    }

    /// Apply every possible callee's summary to a copy of the heap and join
    /// the outcomes. Callees that never return contribute nothing.
    fn apply_targets(
        &self,
        site: &CallSite,
        call_args: &[AbstractValue],
        arg_nodes: &[NodeId],
        state: &mut ProgramState,
    ) -> AbstractValue {
        let before = state.heap.clone();
        let mut heap = HeapState::bottom();
        let mut result = AbstractValue::bottom();

        for &target in &site.targets {
            self.record_call(target, call_args, &before);
            let mut after = before.clone();
            let returned = if self.ctx.is_malformed(target) {
                self.model().invalidate_escaping(&mut after, arg_nodes);
                AbstractValue::top()
            } else {
                match self.summaries.get(target) {
                    Some(summary) => {
                        summary.effects.apply(&mut after);
                        summary.return_value
                    }
                    // Member of the SCC under iteration not analyzed yet
                    None => AbstractValue::bottom(),
                }
            };
            if returned.is_bottom() {
                continue;
            }
            result = result.join(&returned);
            heap = heap.join(&after);
        }

        if result.is_bottom() {
            state.mark_unreachable();
        } else {
            state.heap = heap;
        }
        result
    }

    /// Methods on builtin containers (no program method matched)
    fn container_method(
        &self,
        receiver: NodeId,
        method: &str,
        values: &[AbstractValue],
        arg_nodes: &[NodeId],
        state: &mut ProgramState,
    ) -> AbstractValue {
        let model = self.model();
        if is_known_mutating(method) {
            let elements = model.load(&state.heap, receiver, &Field::Elements);
            model.apply_mutating_method(&mut state.heap, receiver, method, values);
            return match method {
                "pop" | "setdefault" => elements,
                _ => AbstractValue::none(),
            };
        }
        if is_known_pure(method) {
            return match method {
                "get" => model
                    .load(&state.heap, receiver, &Field::Elements)
                    .join(&AbstractValue::none()),
                _ => AbstractValue::top(),
            };
        }
        model.invalidate_escaping(&mut state.heap, arg_nodes);
        AbstractValue::top()
    }

    fn record_call(&self, callee: FunctionId, call_args: &[AbstractValue], heap: &HeapState) {
        let Some(observer) = self.observing() else {
            return;
        };
        let params = &self.ctx.index.function(callee).params;
        let args = (0..params.len())
            .map(|i| call_args.get(i).copied().unwrap_or_else(AbstractValue::top))
            .collect();
        let input = CallInput {
            args,
            heap: heap.entry_view(),
        };
        record_call(&mut observer.observed.borrow_mut().calls, callee, input);
    }

    fn record_targets(&self, site: &CallSite) {
        if let Some(observer) = self.observing() {
            let names = site
                .targets
                .iter()
                .map(|&t| self.ctx.index.name(t).to_string())
                .collect();
            observer.observed.borrow_mut().call_targets.insert(site.node, names);
        }
    }

    // ─────────────────────────────────────────────────────────────────
    // Statements and block items
    // ─────────────────────────────────────────────────────────────────

    fn transfer_stmt(&self, stmt: &Stmt, state: &mut ProgramState) {
        let domains = self.ctx.domains();
        match &stmt.kind {
            StmtKind::Assign { target, value } => {
                let v = self.eval(value, state);
                if !state.is_reachable() {
                    return;
                }
                match &target.kind {
                    TargetKind::Name(name) => state.env.set(name, &v, domains),
                    TargetKind::Attribute { value: base, attr } => {
                        let b = self.eval(base, state);
                        let what = || format!("attribute '{}'", attr);
                        self.check_deref(target.id, base, &b, what, state);
                        self.model().store(
                            &mut state.heap,
                            base.id,
                            Field::Attr(attr.clone()),
                            v,
                            Some(value.id),
                        );
                    }
                    TargetKind::Subscript { value: base, index } => {
                        let b = self.eval(base, state);
                        let idx = self.eval(index, state);
                        self.check_deref(target.id, base, &b, || "subscript".to_string(), state);
                        self.check_index(target.id, base.id, &idx, state);
                        self.model()
                            .store_element(&mut state.heap, base.id, v, Some(value.id));
                    }
                }
            }
            StmtKind::Expr(expr) => {
                self.eval(expr, state);
            }
            StmtKind::Return(value) => {
                let v = match value {
                    Some(expr) => self.eval(expr, state),
                    None => AbstractValue::none(),
                };
                if state.is_reachable() {
                    state.env.set(RETURN_SLOT, &v, domains);
                }
            }
            StmtKind::FunctionDef(def) => {
                state.env.set(&def.name, &AbstractValue::not_null(), domains)
            }
            StmtKind::ClassDef(def) => {
                state.env.set(&def.name, &AbstractValue::not_null(), domains)
            }
            StmtKind::If { .. }
            | StmtKind::While { .. }
            | StmtKind::For { .. }
            | StmtKind::Break
            | StmtKind::Continue
            | StmtKind::Pass => {}
        }
    }

    fn transfer_condition(&self, cond: &Expr, state: &mut ProgramState) {
        let value = self.eval(cond, state);
        if !self.ctx.config.report_unreachable_branches || !depends_on_state(cond) {
            return;
        }
        if let Some(outcome) = value.truthiness() {
            self.report(Diagnostic::unreachable_branch(cond.id, &self.function.name, outcome));
        }
    }

    fn transfer_bind(&self, target: &str, iter: &Expr, state: &mut ProgramState) {
        let value = match self.range_args(iter) {
            Some(args) => {
                let bounds: Vec<AbstractValue> =
                    args.iter().map(|a| self.eval_pure(a, state)).collect();
                Builtin::range_element(&bounds)
            }
            None => self.model().load(&state.heap, iter.id, &Field::Elements),
        };
        state.env.set(target, &value, self.ctx.domains());
    }

    /// Arguments of a call to the builtin `range`
    fn range_args<'e>(&self, iter: &'e Expr) -> Option<&'e [Expr]> {
        match &iter.kind {
            ExprKind::Call { func, args } if func.as_name() == Some("range") => {
                let unknown = self
                    .ctx
                    .call_graph
                    .site(iter.id)
                    .map_or(true, |s| matches!(s.kind, CallKind::Unknown { .. }));
                unknown.then_some(args.as_slice())
            }
            _ => None,
        }
    }
}

/// Whether the expression reads program state (literal-only conditions
/// such as `while True` are intentional)
fn depends_on_state(expr: &Expr) -> bool {
    let mut found = false;
    expr.walk(&mut |e| {
        if matches!(
            e.kind,
            ExprKind::Name(_)
                | ExprKind::Attribute { .. }
                | ExprKind::Subscript { .. }
                | ExprKind::Call { .. }
        ) {
            found = true;
        }
    });
    found
}

impl<'t, 'c, 'a> TransferFunction<'a, ProgramState> for InterproceduralTransfer<'t, 'c, 'a> {
    fn transfer_item(&self, item: &BlockItem<'a>, state: &mut ProgramState) {
        if !state.is_reachable() {
            return;
        }
        match item {
            BlockItem::Statement(stmt) => self.transfer_stmt(stmt, state),
            BlockItem::Condition(cond) => self.transfer_condition(cond, state),
            BlockItem::Evaluate(expr) => {
                self.eval(expr, state);
            }
            BlockItem::Bind { target, iter, .. } => self.transfer_bind(target, iter, state),
        }
    }

    fn transfer_edge(
        &self,
        edge: &CFGEdge,
        source: &BasicBlock<'a>,
        state: &ProgramState,
    ) -> ProgramState {
        if edge.target == self.exit && edge.kind == CFGEdgeKind::Sequential {
            // Falling off the end returns None
            let mut out = state.clone();
            out.env.set(RETURN_SLOT, &AbstractValue::none(), self.ctx.domains());
            return out;
        }
        match (edge.kind.branch_outcome(), source.condition()) {
            (Some(outcome), Some(cond)) => {
                refine_condition(state, cond, outcome, self.ctx.domains(), &|e, s| {
                    self.eval_pure(e, s)
                })
            }
            _ => state.clone(),
        }
    }
}
