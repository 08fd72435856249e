//! SCC condensation of the call graph
//!
//! `petgraph::algo::tarjan_scc` emits components in reverse topological
//! order of the caller → callee graph, so callees come before their callers.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::features::call_graph::domain::{CallGraph, Scc};
use crate::shared::models::FunctionId;

/// Compute SCCs and levels and store them on the graph
pub fn condense(call_graph: &mut CallGraph) {
    let sccs = compute_sccs(call_graph);
    call_graph.set_sccs(sccs);
}

pub fn compute_sccs(call_graph: &CallGraph) -> Vec<Scc> {
    let n = call_graph.num_functions();
    let mut graph: DiGraph<FunctionId, ()> = DiGraph::with_capacity(n, 0);
    for i in 0..n {
        graph.add_node(FunctionId(i as u32));
    }
    let edges = call_graph.edges();
    for &(caller, callee) in &edges {
        graph.add_edge(NodeIndex::new(caller.index()), NodeIndex::new(callee.index()), ());
    }

    let components = tarjan_scc(&graph);

    let mut scc_of = vec![0usize; n];
    for (i, component) in components.iter().enumerate() {
        for node in component {
            scc_of[node.index()] = i;
        }
    }

    let mut sccs: Vec<Scc> = Vec::with_capacity(components.len());
    for (i, component) in components.iter().enumerate() {
        let mut members: Vec<FunctionId> = component.iter().map(|&node| graph[node]).collect();
        members.sort();

        let mut level = 0;
        let mut recursive = members.len() > 1;
        for &(caller, callee) in &edges {
            if scc_of[caller.index()] != i {
                continue;
            }
            let target = scc_of[callee.index()];
            if target == i {
                recursive |= caller == callee || members.len() > 1;
            } else {
                // Callee components precede this one
                level = level.max(sccs[target].level + 1);
            }
        }

        sccs.push(Scc {
            members,
            recursive,
            level,
        });
    }
    sccs
}
