//! Compile errors.

use thiserror::Error;
use vellum_runtime::InternalError;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("`{name}` is already declared in this scope of `{template}`")]
    DuplicateLocal { template: String, name: String },

    /// A parameter default or state initializer needs runtime evaluation.
    #[error("initial value of `{name}` in `{template}` is not a compile-time constant")]
    DefaultRequiresSuspension { template: String, name: String },

    #[error("template `{name}` is defined more than once in this unit")]
    DuplicateTemplate { name: String },

    /// The input tree violates a structural guarantee of the front end.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl CompileError {
    pub(crate) fn internal(template: &str, detail: impl Into<String>) -> Self {
        CompileError::Internal(InternalError::new(template, detail))
    }
}
