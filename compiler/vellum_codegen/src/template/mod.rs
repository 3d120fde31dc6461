//! Compiled templates.
//!
//! [`assemble`] turns one IR template into an [`AssembledTemplate`]: the
//! header bindings, the compiled body, and the template's metadata. The
//! unit compiler then links every assembled template to its unit, which
//! yields the [`CompiledTemplate`]s callers render.

mod assemble;

use std::sync::{Arc, Weak};

use tracing::debug_span;
use vellum_ir::{ContentKind, Visibility};
use vellum_runtime::{FrameOutcome, Record, RenderContext, RenderError, Renderable, Sink, StackFrame};

use crate::dispatch::{BindingKind, TemplateSite};
use crate::procedure::{exec, Procedure};
use crate::unit::UnitLinks;

pub(crate) use assemble::assemble;

/// A template ready to render.
///
/// Immutable once linked; any number of renders may run against it at the
/// same time, each with its own frames.
#[derive(Debug)]
pub struct CompiledTemplate {
    name: Arc<str>,
    visibility: Visibility,
    content_kind: ContentKind,
    procedure: Procedure,
    call_sites: Vec<Arc<TemplateSite>>,
    unit: Weak<UnitLinks>,
}

impl CompiledTemplate {
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn content_kind(&self) -> ContentKind {
        self.content_kind
    }

    pub fn procedure(&self) -> &Procedure {
        &self.procedure
    }

    pub fn resume_point_count(&self) -> usize {
        self.procedure.resume_point_count()
    }

    /// Each `call` site in emission order, with its binding so far.
    pub fn call_sites(&self) -> impl Iterator<Item = (&str, Option<BindingKind>)> + '_ {
        self.call_sites
            .iter()
            .map(|site| (site.callee(), site.binding_kind()))
    }

    pub(crate) fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    pub(crate) fn unit(&self) -> &Weak<UnitLinks> {
        &self.unit
    }
}

impl Renderable for CompiledTemplate {
    fn name(&self) -> &str {
        &self.name
    }

    fn render_frame(
        &self,
        frame: Option<StackFrame>,
        params: &Record,
        injected: &Record,
        sink: &mut dyn Sink,
        ctx: &RenderContext,
    ) -> Result<FrameOutcome, RenderError> {
        let _span = debug_span!(
            "render",
            template = &*self.name,
            resumed = frame.is_some(),
            depth = ctx.call_depth()
        )
        .entered();
        exec::run(self, frame, params, injected, sink, ctx)
    }
}

#[cfg(test)]
mod tests;
