//! Render errors.
//!
//! Suspension is not an error and never appears here; see
//! [`Step`](crate::Step) and [`RenderOutcome`](crate::RenderOutcome).
//!
//! Three families:
//! - recoverable data and lookup failures (`Data`, `TemplateNotFound`, ...)
//! - `Internal`: a compiled artefact contradicts itself; fatal, never retry
//! - `Contract`: the caller misused the suspend/resume protocol

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Data(#[from] DataError),

    /// Sink failure, passed through unchanged.
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("no template named `{name}` is available to the render context")]
    TemplateNotFound { name: String },

    #[error("no implementation of delegate `{name}` for variant `{variant}`")]
    DelegateNotFound { name: String, variant: String },

    #[error("no visual element metadata for element {element_id} in `{metadata_id}`")]
    VeMetadataNotFound { metadata_id: String, element_id: u64 },

    #[error("call depth limit of {limit} exceeded while calling `{callee}`")]
    CallDepthExceeded { callee: String, limit: usize },

    #[error(transparent)]
    Internal(#[from] InternalError),

    #[error(transparent)]
    Contract(#[from] ContractViolation),
}

impl RenderError {
    /// Internal-consistency failures indicate a broken compiled artefact.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RenderError::Internal(_))
    }
}

/// A type or value error caused by template data.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DataError {
    message: String,
}

impl DataError {
    pub fn new(message: impl Into<String>) -> Self {
        DataError {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    // Constructors

    pub fn binary_type_mismatch(op: &str, left: &str, right: &str) -> Self {
        DataError::new(format!("operator `{op}` cannot be applied to {left} and {right}"))
    }

    pub fn unary_type_mismatch(op: &str, operand: &str) -> Self {
        DataError::new(format!("operator `{op}` cannot be applied to {operand}"))
    }

    pub fn integer_overflow(op: &str) -> Self {
        DataError::new(format!("integer overflow in `{op}`"))
    }

    pub fn modulo_by_zero() -> Self {
        DataError::new("modulo by zero")
    }

    pub fn cannot_access_field(field: &str, on: &str) -> Self {
        DataError::new(format!("cannot read field `{field}` of {on}"))
    }

    pub fn cannot_index(on: &str, index: &str) -> Self {
        DataError::new(format!("cannot index {on} with {index}"))
    }

    pub fn not_iterable(got: &str) -> Self {
        DataError::new(format!("`for` requires a list, got {got}"))
    }

    pub fn not_a_record(got: &str) -> Self {
        DataError::new(format!("call data must be a record, got {got}"))
    }

    pub fn bad_builtin_arg(func: &str, got: &str) -> Self {
        DataError::new(format!("`{func}` cannot be applied to {got}"))
    }
}

/// A compiled artefact or its resume state contradicts itself.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("internal consistency failure in `{template}`: {detail}")]
pub struct InternalError {
    pub template: String,
    pub detail: String,
}

impl InternalError {
    pub fn new(template: impl Into<String>, detail: impl Into<String>) -> Self {
        InternalError {
            template: template.into(),
            detail: detail.into(),
        }
    }
}

/// Misuse of the suspend/resume protocol.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ContractViolation {
    #[error("cannot resume a render that already completed")]
    AlreadyComplete,
    #[error("resume state was already consumed by an earlier resume")]
    DoubleResume,
    #[error("resume state belongs to `{expected}`, not `{actual}`")]
    WrongTemplate { expected: String, actual: String },
}
