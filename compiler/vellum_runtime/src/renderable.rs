//! The render entry point shared by every compiled template.

use std::fmt;
use std::sync::Arc;

use crate::context::RenderContext;
use crate::error::{ContractViolation, RenderError};
use crate::outcome::{FrameOutcome, RenderOutcome, StackFrame};
use crate::sink::Sink;
use crate::Record;

/// Something that can render into a sink and suspend.
///
/// Implementations are immutable and shared across concurrent renders;
/// all per-render state lives in the frames passed in and returned.
pub trait Renderable: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Runs one activation. `frame` is `None` for a fresh render and the
    /// saved frame when resuming.
    fn render_frame(
        &self,
        frame: Option<StackFrame>,
        params: &Record,
        injected: &Record,
        sink: &mut dyn Sink,
        ctx: &RenderContext,
    ) -> Result<FrameOutcome, RenderError>;

    /// Starts a render.
    fn render(
        &self,
        params: &Record,
        injected: &Record,
        sink: &mut dyn Sink,
        ctx: &RenderContext,
    ) -> Result<RenderOutcome, RenderError> {
        // A hold left over from an earlier render on this context is stale.
        ctx.take_sink_hold();
        self.render_frame(None, params, injected, sink, ctx)
            .map(RenderOutcome::from)
    }

    /// Continues a suspended render with the same `params` and `injected`
    /// records it was started with.
    ///
    /// Rejects `Done` outcomes, states that were already resumed, and states
    /// produced by another template. A state rejected for belonging to
    /// another template is left intact.
    fn resume(
        &self,
        outcome: &RenderOutcome,
        params: &Record,
        injected: &Record,
        sink: &mut dyn Sink,
        ctx: &RenderContext,
    ) -> Result<RenderOutcome, RenderError> {
        let state = match outcome {
            RenderOutcome::Done => return Err(ContractViolation::AlreadyComplete.into()),
            RenderOutcome::Suspended(state) => state,
        };
        if state.template() != self.name() {
            return Err(ContractViolation::WrongTemplate {
                expected: state.template().to_owned(),
                actual: self.name().to_owned(),
            }
            .into());
        }
        let frame = state.claim()?;
        tracing::trace!(
            template = self.name(),
            point = frame.point().raw(),
            "resuming render"
        );
        self.render_frame(Some(frame), params, injected, sink, ctx)
            .map(RenderOutcome::from)
    }
}

/// Shared handle to a renderable template.
pub type TemplateHandle = Arc<dyn Renderable>;
