//! Vellum IR - the validated template tree
//!
//! This crate contains the data structures the code generator consumes:
//! - Content kinds (type-system and runtime flavours)
//! - Templates, parameters and state variables
//! - Expressions and nodes of a template body
//! - Template metadata records emitted next to compiled code
//! - A visitor for read-only traversal
//!
//! # Design Philosophy
//!
//! The tree arrives here already parsed, type-checked and validated by the
//! front end. Nothing in this crate performs validation beyond the
//! structural checks the code generator needs; names are fully qualified
//! and variable references are already classified (param, state, local,
//! injected).
//!
//! The tree is plain owned data. Compilation only ever borrows it.

pub mod ast;
mod content_kind;
mod metadata;
pub mod visitor;

pub use ast::{
    BinaryOp, BuiltinFn, CallData, CallNode, CallParam, CallTarget, DelegateInfo, Expr, ForNode,
    IfBranch, IfNode, LetNode, Literal, Node, OpenTagNode, SwitchCase, SwitchNode, Template,
    TemplateFile, TemplateParam, TemplateStateVar, UnaryOp, VarRef, VarType, Visibility,
};
pub use content_kind::{ContentKind, SanitizedContentKind};
pub use metadata::{DelegateMetadata, TemplateMetadata};
pub use visitor::Visitor;
