//! Function arena over an immutable [`Program`]
//!
//! Every analysis unit gets a dense [`FunctionId`]:
//! - id 0 is the synthetic `<module>` function holding top-level statements
//! - top-level functions keep their declared name
//! - methods are named `Class.method`
//!
//! Nested function definitions are not indexed; they bind an opaque value in
//! the enclosing function.
//!
//! A name a function reads but never binds refers to the module-level
//! binding of that name (see [`FunctionInfo::bound_names`]).

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use super::syntax::{walk_stmts, ClassDef, NodeId, Program, Stmt, StmtKind, TargetKind};

/// Dense function identifier (index into [`ProgramIndex::functions`])
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FunctionId(pub u32);

impl FunctionId {
    pub const MODULE: FunctionId = FunctionId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for FunctionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fn#{}", self.0)
    }
}

/// Name of the synthetic function for module-level code
pub const MODULE_FUNCTION: &str = "<module>";

/// One analysis unit
#[derive(Debug, Clone)]
pub struct FunctionInfo<'a> {
    pub id: FunctionId,
    /// Qualified name (`f`, `Class.m`, `<module>`)
    pub name: String,
    /// Defining class for methods
    pub class: Option<String>,
    pub params: Vec<String>,
    pub body: &'a [Stmt],
    /// Node of the definition (statement id for `<module>`-less programs: 0)
    pub def_node: NodeId,
}

impl<'a> FunctionInfo<'a> {
    pub fn is_module(&self) -> bool {
        self.id == FunctionId::MODULE
    }

    pub fn is_method(&self) -> bool {
        self.class.is_some()
    }

    /// Short method name (`m` for `Class.m`)
    pub fn short_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// Names local to this function: parameters plus every name bound
    /// anywhere in the body (assignment, `for` target, nested definition)
    pub fn bound_names(&self) -> FxHashSet<&str> {
        let mut names: FxHashSet<&str> = self.params.iter().map(String::as_str).collect();
        walk_stmts(self.body, &mut |stmt| match &stmt.kind {
            StmtKind::Assign { target, .. } => {
                if let TargetKind::Name(name) = &target.kind {
                    names.insert(name);
                }
            }
            StmtKind::For { target, .. } => {
                names.insert(target);
            }
            StmtKind::FunctionDef(def) => {
                names.insert(&def.name);
            }
            StmtKind::ClassDef(def) => {
                names.insert(&def.name);
            }
            _ => {}
        });
        names
    }
}

/// Arena of functions and classes of one program
#[derive(Debug, Clone)]
pub struct ProgramIndex<'a> {
    functions: Vec<FunctionInfo<'a>>,
    by_name: FxHashMap<String, FunctionId>,
    classes: Vec<&'a ClassDef>,
    class_by_name: FxHashMap<String, usize>,
}

impl<'a> ProgramIndex<'a> {
    pub fn build(program: &'a Program) -> Self {
        let mut index = Self {
            functions: Vec::new(),
            by_name: FxHashMap::default(),
            classes: Vec::new(),
            class_by_name: FxHashMap::default(),
        };

        index.push(MODULE_FUNCTION.to_string(), None, Vec::new(), &program.body, 0);

        for stmt in &program.body {
            match &stmt.kind {
                StmtKind::FunctionDef(def) => {
                    index.push(def.name.clone(), None, def.params.clone(), &def.body, def.id);
                }
                StmtKind::ClassDef(class) => {
                    index
                        .class_by_name
                        .insert(class.name.clone(), index.classes.len());
                    index.classes.push(class);
                    for method in class.methods() {
                        index.push(
                            format!("{}.{}", class.name, method.name),
                            Some(class.name.clone()),
                            method.params.clone(),
                            &method.body,
                            method.id,
                        );
                    }
                }
                _ => {}
            }
        }

        index
    }

    fn push(
        &mut self,
        name: String,
        class: Option<String>,
        params: Vec<String>,
        body: &'a [Stmt],
        def_node: NodeId,
    ) {
        let id = FunctionId(self.functions.len() as u32);
        // Later definitions shadow earlier ones, as rebinding does at runtime
        self.by_name.insert(name.clone(), id);
        self.functions.push(FunctionInfo {
            id,
            name,
            class,
            params,
            body,
            def_node,
        });
    }

    pub fn functions(&self) -> &[FunctionInfo<'a>] {
        &self.functions
    }

    pub fn function(&self, id: FunctionId) -> &FunctionInfo<'a> {
        &self.functions[id.index()]
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Look up a function by qualified name
    pub fn lookup(&self, name: &str) -> Option<FunctionId> {
        self.by_name.get(name).copied()
    }

    /// Look up a top-level (non-method) function callable by bare name
    pub fn lookup_free_function(&self, name: &str) -> Option<FunctionId> {
        self.lookup(name)
            .filter(|id| !self.function(*id).is_method() && *id != FunctionId::MODULE)
    }

    pub fn classes(&self) -> &[&'a ClassDef] {
        &self.classes
    }

    pub fn class(&self, name: &str) -> Option<&'a ClassDef> {
        self.class_by_name.get(name).map(|&i| self.classes[i])
    }

    pub fn is_class(&self, name: &str) -> bool {
        self.class_by_name.contains_key(name)
    }

    pub fn name(&self, id: FunctionId) -> &str {
        &self.functions[id.index()].name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::SyntaxBuilder;

    #[test]
    fn test_index_names_module_functions_and_methods() {
        let b = SyntaxBuilder::new();
        let program = b.program(vec![
            b.function("get", &[], vec![b.ret(b.none())]),
            b.class(
                "A",
                &[],
                vec![b.function("m", &["self"], vec![b.ret(b.int(1))])],
            ),
            b.assign("v", b.call_name("get", vec![])),
        ]);

        let index = ProgramIndex::build(&program);
        let names: Vec<&str> = index.functions().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["<module>", "get", "A.m"]);

        let method = index.function(index.lookup("A.m").unwrap());
        assert_eq!(method.class.as_deref(), Some("A"));
        assert_eq!(method.short_name(), "m");
        assert_eq!(method.params, vec!["self".to_string()]);

        assert!(index.is_class("A"));
        assert_eq!(index.lookup_free_function("get"), Some(FunctionId(1)));
        assert_eq!(index.lookup_free_function("A.m"), None);
    }

    #[test]
    fn test_bound_names_cover_params_targets_and_definitions() {
        let b = SyntaxBuilder::new();
        let program = b.program(vec![b.function(
            "f",
            &["p"],
            vec![
                b.assign("x", b.name("g")),
                b.assign_attr(b.name("h"), "val", b.int(1)),
                b.if_(b.name("p"), vec![b.for_("i", b.name("xs"), vec![b.pass()])], vec![]),
                b.function("inner", &["q"], vec![b.assign("hidden", b.int(1))]),
            ],
        )]);

        let index = ProgramIndex::build(&program);
        let f = index.function(index.lookup("f").unwrap());
        let bound = f.bound_names();
        for name in ["p", "x", "i", "inner"] {
            assert!(bound.contains(name), "{} should be bound", name);
        }
        for name in ["g", "h", "xs", "q", "hidden"] {
            assert!(!bound.contains(name), "{} should be free", name);
        }
    }

    #[test]
    fn test_nested_definitions_are_not_indexed() {
        let b = SyntaxBuilder::new();
        let inner = b.function("inner", &[], vec![b.pass()]);
        let program = b.program(vec![b.function("outer", &[], vec![inner])]);

        let index = ProgramIndex::build(&program);
        assert_eq!(index.len(), 2);
        assert!(index.lookup("inner").is_none());
    }
}
