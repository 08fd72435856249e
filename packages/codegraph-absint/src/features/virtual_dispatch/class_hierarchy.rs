//! Class hierarchy over the program's class definitions
//!
//! Method lookup follows the nearest ancestor: the class itself, then its
//! bases depth-first, left to right. Bases that are not defined in the
//! program contribute nothing.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::shared::models::{FunctionId, ProgramIndex};

/// Name of the method constructor calls dispatch to
pub const CONSTRUCTOR: &str = "__init__";

#[derive(Debug, Clone, Serialize)]
pub struct ClassInfo {
    pub name: String,
    pub bases: Vec<String>,
    /// Methods defined directly in the class body
    pub methods: BTreeMap<String, FunctionId>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ClassHierarchy {
    classes: BTreeMap<String, ClassInfo>,
}

impl ClassHierarchy {
    pub fn build(index: &ProgramIndex<'_>) -> Self {
        let mut classes = BTreeMap::new();
        for class in index.classes() {
            let methods = class
                .methods()
                .filter_map(|m| {
                    index
                        .lookup(&format!("{}.{}", class.name, m.name))
                        .map(|id| (m.name.clone(), id))
                })
                .collect();
            classes.insert(
                class.name.clone(),
                ClassInfo {
                    name: class.name.clone(),
                    bases: class.bases.clone(),
                    methods,
                },
            );
        }
        Self { classes }
    }

    pub fn class(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Classes in lookup order starting at `class` (each at most once, so
    /// cyclic base lists terminate)
    pub fn ancestors(&self, class: &str) -> Vec<&str> {
        let mut order = Vec::new();
        let mut visited = BTreeSet::new();
        let mut stack = vec![class];
        while let Some(current) = stack.pop() {
            let Some(info) = self.classes.get(current) else {
                continue;
            };
            if !visited.insert(current) {
                continue;
            }
            order.push(info.name.as_str());
            stack.extend(info.bases.iter().rev().map(String::as_str));
        }
        order
    }

    /// Nearest definition of `method` visible from `class`
    pub fn lookup(&self, class: &str, method: &str) -> Option<FunctionId> {
        self.ancestors(class)
            .into_iter()
            .find_map(|c| self.classes.get(c)?.methods.get(method).copied())
    }

    /// `__init__` that `class(...)` runs, if any
    pub fn constructor(&self, class: &str) -> Option<FunctionId> {
        self.lookup(class, CONSTRUCTOR)
    }

    /// Every definition of `method` in any class (hierarchy-only fallback)
    pub fn classes_defining(&self, method: &str) -> BTreeSet<FunctionId> {
        self.classes
            .values()
            .filter_map(|info| info.methods.get(method).copied())
            .collect()
    }

    pub fn is_subclass(&self, class: &str, ancestor: &str) -> bool {
        self.ancestors(class).contains(&ancestor)
    }
}
