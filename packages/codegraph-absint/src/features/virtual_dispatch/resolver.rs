//! Virtual call target resolution
//!
//! The target set of `recv.m(...)` is the union, over the runtime types the
//! receiver may have, of the nearest definition of `m`. When nothing is known
//! about the receiver, every class defining `m` is a candidate.

use std::collections::BTreeSet;

use tracing::debug;

use super::class_hierarchy::ClassHierarchy;
use crate::features::call_graph::{condense, CallGraph, CallKind};
use crate::features::points_to::PointsToGraph;
use crate::shared::models::{FunctionId, NodeId};

pub struct VirtualDispatchResolver<'h> {
    hierarchy: &'h ClassHierarchy,
}

impl<'h> VirtualDispatchResolver<'h> {
    pub fn new(hierarchy: &'h ClassHierarchy) -> Self {
        Self { hierarchy }
    }

    /// Targets of `method` for receivers of the given runtime types
    pub fn resolve<'t>(
        &self,
        method: &str,
        types: impl IntoIterator<Item = &'t str>,
    ) -> BTreeSet<FunctionId> {
        types
            .into_iter()
            .filter_map(|t| self.hierarchy.lookup(t, method))
            .collect()
    }

    /// Hierarchy-only candidates for an unknown receiver
    pub fn fallback(&self, method: &str) -> BTreeSet<FunctionId> {
        self.hierarchy.classes_defining(method)
    }

    /// Targets for one virtual site given the receiver expression
    pub fn resolve_site(
        &self,
        method: &str,
        receiver: NodeId,
        points_to: &PointsToGraph,
    ) -> BTreeSet<FunctionId> {
        let objects = points_to.points_to_node(receiver);
        if objects.is_empty() {
            return self.fallback(method);
        }
        // Builtin receivers (lists, dicts, ...) resolve to no program method
        self.resolve(method, objects.iter().filter_map(|&o| points_to.object(o).kind.class()))
    }

    /// Write resolved targets of every virtual site back into the call graph
    /// and recompute its SCCs
    pub fn refine(&self, call_graph: &mut CallGraph, points_to: &PointsToGraph) {
        let virtual_sites: Vec<(NodeId, String, NodeId)> = call_graph
            .sites()
            .filter_map(|site| match &site.kind {
                CallKind::Virtual { method, receiver } => {
                    Some((site.node, method.clone(), *receiver))
                }
                _ => None,
            })
            .collect();

        for (node, method, receiver) in &virtual_sites {
            let targets = self.resolve_site(method, *receiver, points_to);
            call_graph.resolve_site(*node, targets);
        }
        condense(call_graph);
        debug!(
            "resolved {} virtual call sites, {} call edges",
            virtual_sites.len(),
            call_graph.num_edges()
        );
    }
}
