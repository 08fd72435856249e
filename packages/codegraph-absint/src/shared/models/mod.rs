//! Shared models

pub mod builder;
pub mod program_index;
pub mod syntax;

pub use builder::SyntaxBuilder;
pub use program_index::{FunctionId, FunctionInfo, ProgramIndex, MODULE_FUNCTION};
pub use syntax::{
    walk_body_exprs, walk_stmts, BinOp, BoolOp, ClassDef, CollectionKind, CompOp, Expr, ExprKind,
    FunctionDef, Literal, NodeId, Program, Stmt, StmtKind, Target, TargetKind, UnaryOp,
};
