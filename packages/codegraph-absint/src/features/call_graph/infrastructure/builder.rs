use std::collections::BTreeSet;

use tracing::debug;

use crate::features::call_graph::domain::{CallGraph, CallKind, CallSite};
use crate::features::call_graph::infrastructure::scc::condense;
use crate::features::virtual_dispatch::ClassHierarchy;
use crate::shared::models::{walk_body_exprs, Expr, ExprKind, FunctionId, NodeId, ProgramIndex};

/// Static call-graph pass over every indexed function
pub struct CallGraphBuilder<'i, 'a> {
    index: &'i ProgramIndex<'a>,
    hierarchy: &'i ClassHierarchy,
}

impl<'i, 'a> CallGraphBuilder<'i, 'a> {
    pub fn new(index: &'i ProgramIndex<'a>, hierarchy: &'i ClassHierarchy) -> Self {
        Self { index, hierarchy }
    }

    pub fn build(&self) -> CallGraph {
        let names = self.index.functions().iter().map(|f| f.name.clone()).collect();
        let mut graph = CallGraph::new(names);

        for function in self.index.functions() {
            walk_body_exprs(function.body, &mut |_, expr| {
                if let ExprKind::Call { func, .. } = &expr.kind {
                    graph.add_site(self.classify(function.id, expr.id, func));
                }
            });
        }

        condense(&mut graph);
        debug!(
            "call graph: {} functions, {} sites, {} SCCs",
            graph.num_functions(),
            graph.sites().count(),
            graph.sccs().len()
        );
        graph
    }

    fn classify(&self, caller: FunctionId, node: NodeId, func: &Expr) -> CallSite {
        let (kind, targets, resolved) = match &func.kind {
            ExprKind::Name(name) if self.hierarchy.contains(name) => (
                CallKind::Constructor {
                    class: name.clone(),
                },
                self.hierarchy.constructor(name).into_iter().collect(),
                true,
            ),
            ExprKind::Name(name) => match self.index.lookup_free_function(name) {
                Some(target) => (CallKind::Direct, BTreeSet::from([target]), true),
                None => (
                    CallKind::Unknown {
                        callee: Some(name.clone()),
                    },
                    BTreeSet::new(),
                    true,
                ),
            },
            // `Class.method(obj, ...)`: explicit call through the class
            ExprKind::Attribute { value, attr }
                if value.as_name().is_some_and(|c| self.hierarchy.contains(c)) =>
            {
                let class = value.as_name().unwrap_or_default();
                match self.hierarchy.lookup(class, attr) {
                    Some(target) => (CallKind::Direct, BTreeSet::from([target]), true),
                    None => (
                        CallKind::Unknown {
                            callee: Some(format!("{class}.{attr}")),
                        },
                        BTreeSet::new(),
                        true,
                    ),
                }
            }
            ExprKind::Attribute { value, attr } => (
                CallKind::Virtual {
                    method: attr.clone(),
                    receiver: value.id,
                },
                BTreeSet::new(),
                false,
            ),
            _ => (CallKind::Unknown { callee: None }, BTreeSet::new(), true),
        };
        CallSite {
            node,
            caller,
            kind,
            targets,
            resolved,
        }
    }
}
