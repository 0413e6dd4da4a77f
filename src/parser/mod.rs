//! Parser
//!
//! Turns an include-expanded token stream into an immutable syntax tree.
//! Function bodies are parsed exactly once; the code generator re-lowers the
//! same tree at every call site.

mod ast;
mod source_parser;

pub use ast::{
    Access, Accessor, BinaryOp, CaseLabel, Declaration, ExprKind, Expression, FieldDef,
    FunctionDef, Initializer, Parameter, Program, ReturnKind, Statement, StructDef, SwitchCase,
    TypeName, UnaryOp, UpdateOp,
};
pub use source_parser::SourceParser;
