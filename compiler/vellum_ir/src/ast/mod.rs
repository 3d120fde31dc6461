//! Template tree types.
//!
//! - [`Template`] / [`TemplateFile`]: compilation inputs
//! - [`Expr`]: value expressions
//! - [`Node`]: body statements

mod expr;
mod node;
mod template;

pub use expr::{BinaryOp, BuiltinFn, Expr, Literal, UnaryOp, VarRef};
pub use node::{
    CallData, CallNode, CallParam, CallTarget, ForNode, IfBranch, IfNode, LetNode, Node,
    OpenTagNode, SwitchCase, SwitchNode,
};
pub use template::{
    DelegateInfo, Template, TemplateFile, TemplateParam, TemplateStateVar, VarType, Visibility,
};
