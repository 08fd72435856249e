//! k-limited call-string contexts
//!
//! A context is the string of functions on the call path, ending with the
//! function being analyzed, truncated to its last `k` entries. Contexts are
//! interned so that variables and heap objects carry a small id.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::shared::models::FunctionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(pub u32);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct ContextTable {
    k: usize,
    strings: Vec<Vec<FunctionId>>,
    ids: FxHashMap<Vec<FunctionId>, ContextId>,
}

impl ContextTable {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            strings: Vec::new(),
            ids: FxHashMap::default(),
        }
    }

    pub fn depth(&self) -> usize {
        self.k
    }

    fn intern(&mut self, mut string: Vec<FunctionId>) -> ContextId {
        if string.len() > self.k {
            string.drain(..string.len() - self.k);
        }
        if let Some(&id) = self.ids.get(&string) {
            return id;
        }
        let id = ContextId(self.strings.len() as u32);
        self.strings.push(string.clone());
        self.ids.insert(string, id);
        id
    }

    /// Context a function is analyzed in when nothing calls it
    pub fn root(&mut self, function: FunctionId) -> ContextId {
        self.intern(vec![function])
    }

    /// Context of `callee` when called from `caller`
    pub fn push(&mut self, caller: ContextId, callee: FunctionId) -> ContextId {
        let mut string = self.strings[caller.0 as usize].clone();
        string.push(callee);
        self.intern(string)
    }

    pub fn string(&self, id: ContextId) -> &[FunctionId] {
        &self.strings[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}
