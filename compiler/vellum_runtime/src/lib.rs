//! Render-time contracts for compiled templates.
//!
//! Everything a compiled template touches while rendering is defined here:
//!
//! - [`Value`] and [`Record`]: expression results and parameter records
//! - [`ValueProvider`] / [`LazyValue`]: values that may not be ready yet
//! - [`Sink`]: the output channel, with a readiness check before each write
//! - [`Renderable`]: `render` / `resume` over a [`StackFrame`] chain
//! - [`RenderOutcome`] / [`ResumeState`]: what a caller gets back
//! - [`RenderContext`] / [`TemplateLookup`]: name-keyed fallback services
//! - [`RenderError`]: everything that can go wrong, minus suspension
//!
//! # Suspension
//!
//! Suspension is a value, not an error. Internally it travels as
//! [`Step::Suspend`]; at the API boundary it is
//! [`RenderOutcome::Suspended`].

mod context;
mod error;
mod outcome;
mod provider;
mod renderable;
mod sink;
mod stack;
pub mod testing;
mod value;

pub use context::{CallGuard, EmptyLookup, RenderConfig, RenderContext, TemplateLookup};
pub use error::{ContractViolation, DataError, InternalError, RenderError};
pub use outcome::{
    Continuation, FrameOutcome, Local, RenderOutcome, ResumePoint, ResumeState, StackFrame, Step,
    SuspendReason,
};
pub use provider::{Forced, LazyValue, ValueProvider};
pub use renderable::{Renderable, TemplateHandle};
pub use sink::{BufferSink, CaptureSink, Readiness, Sink, WriterSink};
pub use stack::ensure_sufficient_stack;
pub use value::{Record, SanitizedContent, TemplateValue, Value, VeMetadata, VisualElement};
