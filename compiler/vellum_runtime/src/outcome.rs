//! Render outcomes and resume state.
//!
//! # Architecture
//!
//! A suspended render is a chain of [`StackFrame`]s, outermost first. Each
//! frame names its template, the resume point it stopped at, and the values
//! of the locals live there. A frame stopped inside a call also carries a
//! [`Continuation`]: the callee handle it already resolved, the params
//! record it built, and the callee's own frame. Resuming re-enters each
//! template at its resume point, so nothing before it runs again and no
//! lookup is repeated.
//!
//! Frames are plain data. Dropping a [`ResumeState`] abandons the render
//! and releases nothing else.

use std::sync::Arc;

use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::error::ContractViolation;
use crate::renderable::TemplateHandle;
use crate::{Record, Value};

/// A compile-time numbered place where a render may suspend.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ResumePoint(u32);

impl ResumePoint {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        ResumePoint(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Why a render suspended.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SuspendReason {
    SinkNotReady,
    ValueNotReady,
}

/// Contents of one local slot in a saved frame.
#[derive(Clone, Debug, Default)]
pub enum Local {
    #[default]
    Unset,
    Value(Value),
    /// A partially rendered capture buffer.
    Buffer(String),
}

/// Saved state of one template activation.
#[derive(Debug)]
pub struct StackFrame {
    template: Arc<str>,
    point: ResumePoint,
    locals: SmallVec<[Local; 4]>,
    child: Option<Box<Continuation>>,
}

impl StackFrame {
    pub fn new(
        template: Arc<str>,
        point: ResumePoint,
        locals: SmallVec<[Local; 4]>,
        child: Option<Continuation>,
    ) -> Self {
        StackFrame {
            template,
            point,
            locals,
            child: child.map(Box::new),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn point(&self) -> ResumePoint {
        self.point
    }

    /// Saved live locals, in ascending slot order.
    pub fn locals(&self) -> &[Local] {
        &self.locals
    }

    pub fn child(&self) -> Option<&Continuation> {
        self.child.as_deref()
    }

    /// Number of frames in this chain, including this one.
    pub fn depth(&self) -> usize {
        1 + self.child.as_ref().map_or(0, |c| c.frame.depth())
    }

    pub fn into_parts(self) -> (Arc<str>, ResumePoint, SmallVec<[Local; 4]>, Option<Continuation>) {
        (self.template, self.point, self.locals, self.child.map(|c| *c))
    }
}

/// A call that was in progress when the caller's frame was saved.
#[derive(Debug)]
pub struct Continuation {
    pub callee: TemplateHandle,
    pub params: Record,
    pub frame: StackFrame,
}

/// What a single template activation reports back.
#[derive(Debug)]
pub enum FrameOutcome {
    Done,
    Suspended {
        frame: StackFrame,
        reason: SuspendReason,
    },
}

/// What `render` and `resume` return to the caller.
#[derive(Clone, Debug)]
pub enum RenderOutcome {
    Done,
    Suspended(ResumeState),
}

impl RenderOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, RenderOutcome::Done)
    }

    pub fn resume_state(&self) -> Option<&ResumeState> {
        match self {
            RenderOutcome::Done => None,
            RenderOutcome::Suspended(state) => Some(state),
        }
    }
}

impl From<FrameOutcome> for RenderOutcome {
    fn from(outcome: FrameOutcome) -> Self {
        match outcome {
            FrameOutcome::Done => RenderOutcome::Done,
            FrameOutcome::Suspended { frame, reason } => {
                RenderOutcome::Suspended(ResumeState::new(frame, reason))
            }
        }
    }
}

/// Opaque state of a suspended render. May be resumed at most once.
///
/// Clones share the consumed flag, so resuming a clone of an already
/// resumed state is rejected too.
#[derive(Clone, Debug)]
pub struct ResumeState {
    template: Arc<str>,
    reason: SuspendReason,
    depth: usize,
    frame: Arc<FrameCell>,
}

impl ResumeState {
    fn new(frame: StackFrame, reason: SuspendReason) -> Self {
        ResumeState {
            template: Arc::clone(&frame.template),
            reason,
            depth: frame.depth(),
            frame: Arc::new(FrameCell::new(frame)),
        }
    }

    pub fn reason(&self) -> SuspendReason {
        self.reason
    }

    /// Name of the template `render` was called on.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Number of nested template activations that were suspended.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_consumed(&self) -> bool {
        self.frame.is_taken()
    }

    /// Takes the saved frame. Fails if any clone already took it.
    pub fn claim(&self) -> Result<StackFrame, ContractViolation> {
        self.frame.take().ok_or(ContractViolation::DoubleResume)
    }

    /// Live-slot layout of the outermost frame: its resume point and the
    /// number of locals saved. `None` once consumed.
    pub fn layout(&self) -> Option<(ResumePoint, usize)> {
        self.frame.with(|f| (f.point(), f.locals().len()))
    }
}

/// One-shot frame storage shared between clones of a `ResumeState`.
#[derive(Debug)]
struct FrameCell(Mutex<Option<StackFrame>>);

impl FrameCell {
    fn new(frame: StackFrame) -> Self {
        FrameCell(Mutex::new(Some(frame)))
    }

    fn is_taken(&self) -> bool {
        self.0.lock().is_none()
    }

    fn take(&self) -> Option<StackFrame> {
        self.0.lock().take()
    }

    fn with<R>(&self, f: impl FnOnce(&StackFrame) -> R) -> Option<R> {
        self.0.lock().as_ref().map(f)
    }
}

/// Result of an operation that may need to suspend.
#[derive(Clone, Debug, PartialEq)]
pub enum Step<T> {
    Ready(T),
    Suspend(SuspendReason),
}

impl<T> Step<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Step::Ready(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Step<U> {
        match self {
            Step::Ready(v) => Step::Ready(f(v)),
            Step::Suspend(reason) => Step::Suspend(reason),
        }
    }
}

/// Unwraps a `Step::Ready`, or returns `Ok(Step::Suspend(..))` from the
/// enclosing function.
#[macro_export]
macro_rules! ready {
    ($step:expr) => {
        match $step {
            $crate::Step::Ready(value) => value,
            $crate::Step::Suspend(reason) => return Ok($crate::Step::Suspend(reason)),
        }
    };
}
