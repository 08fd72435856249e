//! Whole-program call graph
//!
//! Nodes are the functions of a [`ProgramIndex`](crate::shared::models::ProgramIndex);
//! edges are call sites keyed by the call expression's node id. The site
//! structure is fixed after construction. Only the target sets of virtual
//! sites are refined later, after which the SCC condensation is recomputed.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Serialize, Serializer};

use crate::shared::models::{FunctionId, NodeId};

/// How a call site names its callee
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CallKind {
    /// `f(...)` on a program function
    Direct,

    /// `C(...)` on a program class; targets the nearest `__init__`
    Constructor { class: String },

    /// `recv.m(...)`; targets depend on the receiver's runtime type
    Virtual { method: String, receiver: NodeId },

    /// Anything else (builtins, unknown callables)
    Unknown { callee: Option<String> },
}

#[derive(Debug, Clone, Serialize)]
pub struct CallSite {
    pub node: NodeId,
    pub caller: FunctionId,
    #[serde(flatten)]
    pub kind: CallKind,
    pub targets: BTreeSet<FunctionId>,
    /// False for virtual sites not yet refined by dispatch resolution
    pub resolved: bool,
}

/// Strongly connected component of the call graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scc {
    pub members: Vec<FunctionId>,
    /// More than one member, or a self call
    pub recursive: bool,
    /// 0 for SCCs calling no other SCC; otherwise one above the highest callee
    pub level: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CallGraph {
    /// Function names, indexed by `FunctionId`
    pub functions: Vec<String>,
    #[serde(serialize_with = "serialize_sites")]
    sites: BTreeMap<NodeId, CallSite>,
    /// Callee-first order
    sccs: Vec<Scc>,
    #[serde(skip)]
    scc_of: Vec<usize>,
}

fn serialize_sites<S: Serializer>(
    sites: &BTreeMap<NodeId, CallSite>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(sites.values())
}

impl CallGraph {
    pub fn new(functions: Vec<String>) -> Self {
        Self {
            functions,
            sites: BTreeMap::new(),
            sccs: Vec::new(),
            scc_of: Vec::new(),
        }
    }

    pub fn num_functions(&self) -> usize {
        self.functions.len()
    }

    /// Qualified name of a function (`Class.method` for methods)
    pub fn name(&self, function: FunctionId) -> &str {
        self.functions.get(function.index()).map_or("<unknown>", String::as_str)
    }

    pub fn add_site(&mut self, site: CallSite) {
        self.sites.insert(site.node, site);
    }

    pub fn site(&self, node: NodeId) -> Option<&CallSite> {
        self.sites.get(&node)
    }

    pub fn sites(&self) -> impl Iterator<Item = &CallSite> {
        self.sites.values()
    }

    /// Call sites located in `caller`, in node order
    pub fn sites_in(&self, caller: FunctionId) -> impl Iterator<Item = &CallSite> {
        self.sites.values().filter(move |s| s.caller == caller)
    }

    /// Replace the targets of a site and mark it resolved
    pub fn resolve_site(&mut self, node: NodeId, targets: BTreeSet<FunctionId>) {
        if let Some(site) = self.sites.get_mut(&node) {
            site.targets = targets;
            site.resolved = true;
        }
    }

    pub fn targets(&self, node: NodeId) -> Option<&BTreeSet<FunctionId>> {
        self.sites.get(&node).map(|s| &s.targets)
    }

    pub fn callees(&self, caller: FunctionId) -> BTreeSet<FunctionId> {
        self.sites_in(caller)
            .flat_map(|s| s.targets.iter().copied())
            .collect()
    }

    pub fn callers(&self, callee: FunctionId) -> BTreeSet<FunctionId> {
        self.sites
            .values()
            .filter(|s| s.targets.contains(&callee))
            .map(|s| s.caller)
            .collect()
    }

    /// Caller → callee pairs, one per distinct pair
    pub fn edges(&self) -> BTreeSet<(FunctionId, FunctionId)> {
        self.sites
            .values()
            .flat_map(|s| s.targets.iter().map(move |&t| (s.caller, t)))
            .collect()
    }

    pub fn num_edges(&self) -> usize {
        self.edges().len()
    }

    pub fn set_sccs(&mut self, sccs: Vec<Scc>) {
        let mut scc_of = vec![0; self.functions.len()];
        for (i, scc) in sccs.iter().enumerate() {
            for member in &scc.members {
                scc_of[member.index()] = i;
            }
        }
        self.sccs = sccs;
        self.scc_of = scc_of;
    }

    /// SCCs in callee-first order
    pub fn sccs(&self) -> &[Scc] {
        &self.sccs
    }

    pub fn scc_index(&self, function: FunctionId) -> usize {
        self.scc_of[function.index()]
    }

    pub fn is_recursive(&self, function: FunctionId) -> bool {
        self.sccs
            .get(self.scc_index(function))
            .is_some_and(|scc| scc.recursive)
    }

    /// SCC indices grouped by level, lowest level (leaves) first. SCCs of
    /// one level share no call edges.
    pub fn levels(&self) -> Vec<Vec<usize>> {
        let depth = self.sccs.iter().map(|s| s.level + 1).max().unwrap_or(0);
        let mut levels = vec![Vec::new(); depth];
        for (i, scc) in self.sccs.iter().enumerate() {
            levels[scc.level].push(i);
        }
        levels
    }
}
