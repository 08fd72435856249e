//! Whole-program pointer analysis
//!
//! Generates constraints for each (function, context) pair as it becomes
//! reachable and drives [`AndersenSolver`] rounds to a fixpoint. Every
//! function is reachable in its own root context, so functions nobody calls
//! (and parameters nobody passes) are still covered.
//!
//! A name a function reads without binding it is the module's variable of
//! that name, so stores through it reach the module's objects.
//!
//! # Usage
//! ```text
//! let graph = PointerAnalysis::new(&index, &hierarchy, &call_graph, 1).run(&cancel)?;
//! graph.points_to(f, "x");
//! graph.may_alias_vars(f, "x", "y");
//! ```

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info};

use crate::errors::Result;
use crate::features::call_graph::{CallGraph, CallKind};
use crate::features::points_to::domain::{
    CallConstraint, CallTarget, Constraint, ContextId, ContextTable, FieldKey, HeapObject,
    HeapObjectId, ObjectKind, PointsToGraph, PointsToStats, PtrVar,
};
use crate::features::points_to::infrastructure::{AndersenSolver, SolverEnv};
use crate::features::virtual_dispatch::ClassHierarchy;
use crate::shared::models::{
    walk_stmts, Expr, ExprKind, FunctionId, NodeId, ProgramIndex, StmtKind, TargetKind,
};
use crate::shared::CancellationToken;

/// Container methods that store their argument into `Elements`
/// (argument position of the stored value)
const STORING_METHODS: &[(&str, usize)] = &[("append", 0), ("add", 0), ("insert", 1)];

/// Container methods that copy another container's elements in
const EXTENDING_METHODS: &[&str] = &["extend", "update"];

/// Container methods that return one of the elements
const LOADING_METHODS: &[&str] = &["pop", "get", "setdefault"];

pub struct PointerAnalysis<'i, 'a> {
    index: &'i ProgramIndex<'a>,
    hierarchy: &'i ClassHierarchy,
    call_graph: &'i CallGraph,
    context_depth: usize,
}

impl<'i, 'a> PointerAnalysis<'i, 'a> {
    pub fn new(
        index: &'i ProgramIndex<'a>,
        hierarchy: &'i ClassHierarchy,
        call_graph: &'i CallGraph,
        context_depth: usize,
    ) -> Self {
        Self {
            index,
            hierarchy,
            call_graph,
            context_depth,
        }
    }

    pub fn run(&self, cancel: &CancellationToken) -> Result<PointsToGraph> {
        let mut contexts = ContextTable::new(self.context_depth);
        let mut generator = ConstraintGenerator {
            index: self.index,
            call_graph: self.call_graph,
            module_context: contexts.root(FunctionId::MODULE),
            objects: Vec::new(),
            object_ids: FxHashMap::default(),
        };
        let mut solver = AndersenSolver::new();

        let mut reached: FxHashSet<(FunctionId, ContextId)> = FxHashSet::default();
        let mut pending: Vec<(FunctionId, ContextId)> = self
            .index
            .functions()
            .iter()
            .map(|f| (f.id, contexts.root(f.id)))
            .collect();

        let mut iterations = 0;
        loop {
            cancel.check()?;
            for (function, context) in pending.drain(..) {
                if reached.insert((function, context)) {
                    generator.generate(function, context, &mut solver);
                }
            }

            iterations += 1;
            let env = SolverEnv {
                index: self.index,
                hierarchy: self.hierarchy,
                objects: &generator.objects,
            };
            let (changed, calls) = solver.round(&env, &mut contexts);
            pending.extend(calls.into_iter().filter(|pair| !reached.contains(pair)));

            if !changed && pending.is_empty() {
                break;
            }
            debug!("points-to round {}: {} pending contexts", iterations, pending.len());
        }

        let stats = PointsToStats {
            objects: generator.objects.len(),
            contexts: reached.len(),
            constraints: solver.num_constraints(),
            iterations,
        };
        info!(
            "points-to: {} objects, {} contexts, {} constraints, {} rounds",
            stats.objects, stats.contexts, stats.constraints, stats.iterations
        );
        Ok(collapse(generator.objects, solver, stats))
    }
}

/// Drop contexts from the solved relation
fn collapse(
    objects: Vec<HeapObject>,
    solver: AndersenSolver,
    stats: PointsToStats,
) -> PointsToGraph {
    let mut graph = PointsToGraph {
        stats,
        ..PointsToGraph::default()
    };
    for (var, set) in solver.pts {
        let slot = match var {
            PtrVar::Local { function, name, .. } => {
                graph.locals.entry((function, name)).or_default()
            }
            PtrVar::Expr { node, .. } => graph.nodes.entry(node).or_default(),
            PtrVar::Return { function, .. } => graph.returns.entry(function).or_default(),
        };
        slot.extend(set);
    }
    for (key, set) in solver.field_pts {
        graph.fields.entry(key).or_default().extend(set);
    }
    for object in &objects {
        graph.sites.entry(object.site).or_default().push(object.id);
    }
    graph.call_targets = solver.call_targets;
    graph.objects = objects;
    graph
}

struct ConstraintGenerator<'i, 'a> {
    index: &'i ProgramIndex<'a>,
    call_graph: &'i CallGraph,
    /// Context of the module's own variables
    module_context: ContextId,
    objects: Vec<HeapObject>,
    object_ids: FxHashMap<(NodeId, ContextId), HeapObjectId>,
}

impl<'i, 'a> ConstraintGenerator<'i, 'a> {
    fn generate(&mut self, function: FunctionId, context: ContextId, solver: &mut AndersenSolver) {
        let index = self.index;
        let info = index.function(function);
        let mut cx = FunctionScope {
            function,
            context,
            module_context: self.module_context,
            bound: info.bound_names(),
            out: Vec::new(),
        };

        walk_stmts(info.body, &mut |stmt| match &stmt.kind {
            StmtKind::Assign { target, value } => {
                let value = self.lower(&mut cx, value);
                match &target.kind {
                    TargetKind::Name(name) => cx.emit(Constraint::Copy {
                        from: value,
                        to: cx.local(name),
                    }),
                    TargetKind::Attribute { value: base, attr } => {
                        let base = self.lower(&mut cx, base);
                        cx.emit(Constraint::Store {
                            base,
                            field: FieldKey::Attr(attr.clone()),
                            from: value,
                        });
                    }
                    TargetKind::Subscript { value: base, index } => {
                        let base = self.lower(&mut cx, base);
                        self.lower(&mut cx, index);
                        cx.emit(Constraint::Store {
                            base,
                            field: FieldKey::Elements,
                            from: value,
                        });
                    }
                }
            }
            StmtKind::Expr(expr)
            | StmtKind::If { test: expr, .. }
            | StmtKind::While { test: expr, .. } => {
                self.lower(&mut cx, expr);
            }
            StmtKind::For { target, iter, .. } => {
                let iter = self.lower(&mut cx, iter);
                cx.emit(Constraint::Load {
                    base: iter,
                    field: FieldKey::Elements,
                    to: cx.local(target),
                });
            }
            StmtKind::Return(Some(expr)) => {
                let value = self.lower(&mut cx, expr);
                cx.emit(Constraint::Copy {
                    from: value,
                    to: PtrVar::Return { function, context },
                });
            }
            StmtKind::Return(None)
            | StmtKind::Break
            | StmtKind::Continue
            | StmtKind::Pass
            | StmtKind::FunctionDef(_)
            | StmtKind::ClassDef(_) => {}
        });

        for constraint in cx.out {
            solver.add(constraint);
        }
    }

    fn allocate(&mut self, site: NodeId, cx: &FunctionScope<'_>, kind: ObjectKind) -> HeapObjectId {
        if let Some(&id) = self.object_ids.get(&(site, cx.context)) {
            return id;
        }
        let id = HeapObjectId(self.objects.len() as u32);
        self.objects.push(HeapObject {
            id,
            site,
            context: cx.context,
            function: cx.function,
            kind,
        });
        self.object_ids.insert((site, cx.context), id);
        id
    }

    /// Emit constraints for `expr`; returns the variable holding its value
    fn lower(&mut self, cx: &mut FunctionScope<'_>, expr: &Expr) -> PtrVar {
        let result = cx.expr(expr.id);
        match &expr.kind {
            ExprKind::Name(name) => cx.emit(Constraint::Copy {
                from: cx.local(name),
                to: result.clone(),
            }),
            ExprKind::Collection { kind, elements } => {
                let object = self.allocate(expr.id, cx, ObjectKind::Collection(*kind));
                cx.emit(Constraint::Alloc {
                    object,
                    to: result.clone(),
                });
                for element in elements {
                    let from = self.lower(cx, element);
                    cx.emit(Constraint::Store {
                        base: result.clone(),
                        field: FieldKey::Elements,
                        from,
                    });
                }
            }
            ExprKind::Attribute { value, attr } => {
                let base = self.lower(cx, value);
                cx.emit(Constraint::Load {
                    base,
                    field: FieldKey::Attr(attr.clone()),
                    to: result.clone(),
                });
            }
            ExprKind::Subscript { value, index } => {
                let base = self.lower(cx, value);
                self.lower(cx, index);
                cx.emit(Constraint::Load {
                    base,
                    field: FieldKey::Elements,
                    to: result.clone(),
                });
            }
            ExprKind::BoolOp { left, right, .. } => {
                for operand in [left, right] {
                    let from = self.lower(cx, operand);
                    cx.emit(Constraint::Copy {
                        from,
                        to: result.clone(),
                    });
                }
            }
            ExprKind::Call { func, args } => self.lower_call(cx, expr.id, func, args, &result),
            ExprKind::BinOp { left, right, .. } | ExprKind::Compare { left, right, .. } => {
                self.lower(cx, left);
                self.lower(cx, right);
            }
            ExprKind::UnaryOp { operand, .. } => {
                self.lower(cx, operand);
            }
            ExprKind::Literal(_) | ExprKind::Unsupported(_) => {}
        }
        result
    }

    fn lower_call(
        &mut self,
        cx: &mut FunctionScope<'_>,
        node: NodeId,
        func: &Expr,
        args: &[Expr],
        result: &PtrVar,
    ) {
        let receiver = match &func.kind {
            ExprKind::Attribute { value, .. } => Some(self.lower(cx, value)),
            _ => None,
        };
        let args: Vec<PtrVar> = args.iter().map(|a| self.lower(cx, a)).collect();
        let call_graph = self.call_graph;
        let Some(site) = call_graph.site(node) else {
            return;
        };

        let target = match &site.kind {
            CallKind::Direct => CallTarget::Static(site.targets.iter().copied().collect()),
            CallKind::Constructor { class } => {
                let object = self.allocate(node, cx, ObjectKind::Instance(class.clone()));
                CallTarget::Construct {
                    object,
                    init: site.targets.iter().next().copied(),
                }
            }
            CallKind::Virtual { method, .. } => {
                let Some(receiver) = receiver else {
                    return;
                };
                self.lower_container_method(cx, method, &receiver, &args, result);
                CallTarget::Dispatch {
                    method: method.clone(),
                    receiver,
                }
            }
            CallKind::Unknown { .. } => return,
        };
        cx.emit(Constraint::Call(CallConstraint {
            site: node,
            caller: cx.function,
            context: cx.context,
            target,
            args,
            result: result.clone(),
        }));
    }

    /// Element flow of builtin container methods; harmless over-approximation
    /// when the receiver turns out to be a program class
    fn lower_container_method(
        &self,
        cx: &mut FunctionScope<'_>,
        method: &str,
        receiver: &PtrVar,
        args: &[PtrVar],
        result: &PtrVar,
    ) {
        if let Some(&(_, position)) = STORING_METHODS.iter().find(|(m, _)| *m == method) {
            if let Some(from) = args.get(position) {
                cx.emit(Constraint::Store {
                    base: receiver.clone(),
                    field: FieldKey::Elements,
                    from: from.clone(),
                });
            }
        } else if EXTENDING_METHODS.contains(&method) {
            if let Some(source) = args.first() {
                cx.emit(Constraint::Load {
                    base: source.clone(),
                    field: FieldKey::Elements,
                    to: result.clone(),
                });
                cx.emit(Constraint::Store {
                    base: receiver.clone(),
                    field: FieldKey::Elements,
                    from: result.clone(),
                });
            }
        } else if LOADING_METHODS.contains(&method) {
            cx.emit(Constraint::Load {
                base: receiver.clone(),
                field: FieldKey::Elements,
                to: result.clone(),
            });
            if method == "setdefault" {
                if let Some(default) = args.get(1) {
                    cx.emit(Constraint::Store {
                        base: receiver.clone(),
                        field: FieldKey::Elements,
                        from: default.clone(),
                    });
                }
            }
        }
    }
}

/// Function and context constraints are being generated for
struct FunctionScope<'s> {
    function: FunctionId,
    context: ContextId,
    module_context: ContextId,
    /// Names the function binds itself
    bound: FxHashSet<&'s str>,
    out: Vec<Constraint>,
}

impl FunctionScope<'_> {
    fn emit(&mut self, constraint: Constraint) {
        self.out.push(constraint);
    }

    /// Variable a name refers to: the function's own, or the module's
    fn local(&self, name: &str) -> PtrVar {
        if self.function == FunctionId::MODULE || self.bound.contains(name) {
            return PtrVar::Local {
                function: self.function,
                context: self.context,
                name: name.to_string(),
            };
        }
        PtrVar::Local {
            function: FunctionId::MODULE,
            context: self.module_context,
            name: name.to_string(),
        }
    }

    fn expr(&self, node: NodeId) -> PtrVar {
        PtrVar::Expr {
            node,
            context: self.context,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::features::call_graph::CallGraphBuilder;
    use crate::shared::models::{Program, SyntaxBuilder};

    fn analyze(program: &Program, k: usize) -> (ProgramIndex<'_>, CallGraph, PointsToGraph) {
        let index = ProgramIndex::build(program);
        let hierarchy = ClassHierarchy::build(&index);
        let call_graph = CallGraphBuilder::new(&index, &hierarchy).build();
        let graph = PointerAnalysis::new(&index, &hierarchy, &call_graph, k)
            .run(&CancellationToken::new())
            .unwrap();
        (index, call_graph, graph)
    }

    fn class_with_m(b: &SyntaxBuilder, name: &str, value: i64) -> crate::shared::models::Stmt {
        b.class(name, &[], vec![b.function("m", &["self"], vec![b.ret(b.int(value))])])
    }

    #[test]
    fn test_dispatch_on_both_branches() {
        let b = SyntaxBuilder::new();
        let call = b.method_call(b.name("x"), "m", vec![]);
        let site = call.id;
        let program = b.program(vec![
            class_with_m(&b, "A", 1),
            class_with_m(&b, "B", 2),
            b.if_(
                b.name("c"),
                vec![b.assign("x", b.call_name("A", vec![]))],
                vec![b.assign("x", b.call_name("B", vec![]))],
            ),
            b.assign("r", call),
        ]);
        let (index, _, graph) = analyze(&program, 1);

        let expected: BTreeSet<FunctionId> =
            [index.lookup("A.m").unwrap(), index.lookup("B.m").unwrap()].into();
        assert_eq!(graph.dispatch_targets(site), Some(&expected));
        assert_eq!(graph.points_to(FunctionId::MODULE, "x").len(), 2);
    }

    #[test]
    fn test_self_receives_only_dispatching_objects() {
        let b = SyntaxBuilder::new();
        let program = b.program(vec![
            class_with_m(&b, "A", 1),
            b.class("B", &[], vec![b.function("m", &["self"], vec![b.ret(b.name("self"))])]),
            b.assign("a", b.call_name("A", vec![])),
            b.assign("x", b.call_name("B", vec![])),
            b.if_(b.name("c"), vec![b.assign("x", b.name("a"))], vec![]),
            b.assign("r", b.method_call(b.name("x"), "m", vec![])),
        ]);
        let (index, _, graph) = analyze(&program, 1);

        let b_m = index.lookup("B.m").unwrap();
        let selves = graph.points_to(b_m, "self");
        assert_eq!(selves.len(), 1);
        let only = *selves.iter().next().unwrap();
        assert_eq!(graph.object(only).type_name(), "B");
    }

    #[test]
    fn test_field_store_and_load() {
        let b = SyntaxBuilder::new();
        let program = b.program(vec![
            b.class("Box", &[], vec![b.pass()]),
            b.assign("bx", b.call_name("Box", vec![])),
            b.assign("item", b.list(vec![])),
            b.assign_attr(b.name("bx"), "content", b.name("item")),
            b.assign("out", b.attr(b.name("bx"), "content")),
        ]);
        let (_, _, graph) = analyze(&program, 1);

        assert!(graph.may_alias_vars(FunctionId::MODULE, "out", "item"));
        assert!(!graph.may_alias_vars(FunctionId::MODULE, "out", "bx"));
    }

    #[test]
    fn test_list_append_then_iterate() {
        let b = SyntaxBuilder::new();
        let program = b.program(vec![
            b.class("Node", &[], vec![b.pass()]),
            b.assign("xs", b.list(vec![])),
            b.expr_stmt(b.method_call(
                b.name("xs"),
                "append",
                vec![b.call_name("Node", vec![])],
            )),
            b.for_("n", b.name("xs"), vec![b.pass()]),
        ]);
        let (_, _, graph) = analyze(&program, 1);

        let ns = graph.points_to(FunctionId::MODULE, "n");
        assert_eq!(ns.len(), 1);
        assert_eq!(graph.object(*ns.iter().next().unwrap()).type_name(), "Node");
    }

    #[test]
    fn test_arguments_flow_to_parameters_and_back() {
        let b = SyntaxBuilder::new();
        let program = b.program(vec![
            b.function("identity", &["v"], vec![b.ret(b.name("v"))]),
            b.assign("xs", b.list(vec![])),
            b.assign("ys", b.call_name("identity", vec![b.name("xs")])),
        ]);
        let (_, _, graph) = analyze(&program, 1);
        assert!(graph.may_alias_vars(FunctionId::MODULE, "xs", "ys"));
    }

    #[test]
    fn test_context_depth_separates_allocations() {
        let b = SyntaxBuilder::new();
        let program = b.program(vec![
            b.function("make", &[], vec![b.ret(b.list(vec![]))]),
            b.function("f", &[], vec![b.ret(b.call_name("make", vec![]))]),
            b.function("g", &[], vec![b.ret(b.call_name("make", vec![]))]),
            b.assign("a", b.call_name("f", vec![])),
            b.assign("c", b.call_name("g", vec![])),
        ]);

        let (_, _, insensitive) = analyze(&program, 1);
        assert!(insensitive.may_alias_vars(FunctionId::MODULE, "a", "c"));

        let (_, _, sensitive) = analyze(&program, 2);
        assert!(!sensitive.may_alias_vars(FunctionId::MODULE, "a", "c"));
    }

    #[test]
    fn test_free_names_resolve_to_module_variables() {
        let b = SyntaxBuilder::new();
        let global_read = b.name("g");
        let global_node = global_read.id;
        let local_read = b.name("g");
        let local_node = local_read.id;
        let program = b.program(vec![
            b.class("A", &[], vec![b.pass()]),
            b.assign("g", b.call_name("A", vec![])),
            b.function(
                "set",
                &[],
                vec![b.assign_attr(global_read, "x", b.call_name("A", vec![]))],
            ),
            b.function(
                "shadow",
                &[],
                vec![b.assign("g", b.list(vec![])), b.expr_stmt(local_read)],
            ),
            b.expr_stmt(b.call_name("set", vec![])),
            b.assign("out", b.attr(b.name("g"), "x")),
        ]);
        let (_, _, graph) = analyze(&program, 1);

        let module_g = graph.points_to(FunctionId::MODULE, "g");
        assert_eq!(module_g.len(), 1);
        assert_eq!(graph.points_to_node(global_node), module_g);
        assert!(graph.points_to_node(local_node).is_disjoint(module_g));
        // The store in `set` is visible through the module's `g`
        let out = graph.points_to(FunctionId::MODULE, "out");
        assert_eq!(out.len(), 1);
        assert_eq!(graph.object(*out.iter().next().unwrap()).type_name(), "A");
    }
}
