//! Runs a [`Procedure`](super::Procedure) for one activation.
//!
//! An activation owns a fresh locals vector. Params and state are written
//! into it on every entry; on resume the saved live slots are put back and
//! execution jumps to the resume point's op. Suspending moves the live
//! slots out again into a [`StackFrame`].

use std::mem;
use std::sync::Arc;

use smallvec::SmallVec;
use tracing::trace;
use vellum_ir::ContentKind;
use vellum_runtime::{
    ensure_sufficient_stack, ready, CaptureSink, Continuation, DataError, FrameOutcome,
    InternalError, Local, Readiness, Record, RenderContext, RenderError, Renderable, ResumePoint,
    Sink, StackFrame, Step, SuspendReason, TemplateHandle, Value,
};

use super::{ArgSource, Callee, Op, Output, ParamSource, ParamsBase};
use crate::expr::{EvalScope, ValueProcedure};
use crate::scope::Slot;
use crate::template::CompiledTemplate;

/// Unwraps a ready step, or suspends the activation at `$point`.
macro_rules! or_suspend {
    ($activation:ident, $point:expr, $step:expr) => {
        match $step {
            Step::Ready(value) => value,
            Step::Suspend(reason) => return $activation.suspend($point, None, reason),
        }
    };
}

pub(crate) fn run(
    template: &CompiledTemplate,
    frame: Option<StackFrame>,
    params: &Record,
    injected: &Record,
    sink: &mut dyn Sink,
    ctx: &RenderContext,
) -> Result<FrameOutcome, RenderError> {
    let mut activation = Activation {
        template,
        params,
        injected,
        sink,
        ctx,
        locals: vec![Local::Unset; template.procedure().slot_count()],
        pending: None,
    };
    activation.materialize_header()?;
    let pc = match frame {
        Some(frame) => activation.restore(frame)?,
        None => 0,
    };
    activation.execute(pc)
}

struct Activation<'r> {
    template: &'r CompiledTemplate,
    params: &'r Record,
    injected: &'r Record,
    sink: &'r mut dyn Sink,
    ctx: &'r RenderContext,
    locals: Vec<Local>,
    /// The suspended callee of the call op at the resume point, taken by
    /// that op when it re-executes.
    pending: Option<(ResumePoint, Continuation)>,
}

impl Activation<'_> {
    fn materialize_header(&mut self) -> Result<(), RenderError> {
        let template = self.template;
        let procedure = template.procedure();
        for binding in &procedure.params {
            let source = match binding.source {
                ParamSource::Params => self.params,
                ParamSource::Injected => self.injected,
            };
            let value = match source.get(&binding.name) {
                Some(value) if !value.is_null() => value.clone(),
                _ => binding.default.clone().unwrap_or(Value::Null),
            };
            *self.local_mut(binding.slot)? = Local::Value(value);
        }
        for binding in &procedure.state {
            *self.local_mut(binding.slot)? = Local::Value(binding.value.clone());
        }
        Ok(())
    }

    fn restore(&mut self, frame: StackFrame) -> Result<usize, RenderError> {
        let template = self.template;
        let (name, point, saved, child) = frame.into_parts();
        if &*name != template.name() {
            return Err(self.internal(format!("cannot resume a frame of `{name}`")));
        }
        let entry = template
            .procedure()
            .resume_entry(point)
            .ok_or_else(|| self.internal(format!("unknown resume point {}", point.raw())))?;
        if entry.live.len() != saved.len() {
            return Err(self.internal(format!(
                "resume point {} saves {} slots, frame has {}",
                point.raw(),
                entry.live.len(),
                saved.len()
            )));
        }
        for (slot, local) in entry.live.iter().zip(saved) {
            *self.local_mut(*slot)? = local;
        }
        self.pending = child.map(|child| (point, child));
        trace!(template = template.name(), point = point.raw(), "resuming");
        Ok(entry.pc)
    }

    fn execute(&mut self, mut pc: usize) -> Result<FrameOutcome, RenderError> {
        let template = self.template;
        let ops = &template.procedure().ops;
        while let Some(op) = ops.get(pc) {
            pc = match op {
                Op::Text { point, out, text } => {
                    if let Some(reason) = self.poll(*out) {
                        return self.suspend(*point, None, reason);
                    }
                    self.write(*out, text)?;
                    pc + 1
                }
                Op::Print { point, out, value } => {
                    let value = or_suspend!(self, *point, self.eval(value)?);
                    if let Some(reason) = self.poll(*out) {
                        return self.suspend(*point, None, reason);
                    }
                    self.write(*out, &value.to_string())?;
                    pc + 1
                }
                Op::Store {
                    point,
                    slot,
                    value,
                    force,
                } => {
                    let step = if *force {
                        self.eval(value)?
                    } else {
                        value.eval_unforced(&self.scope())?
                    };
                    let value = or_suspend!(self, *point, step);
                    *self.local_mut(*slot)? = Local::Value(value);
                    pc + 1
                }
                Op::BranchUnless {
                    point,
                    cond,
                    target,
                } => {
                    let cond = or_suspend!(self, *point, self.eval(cond)?);
                    if cond.is_truthy() {
                        pc + 1
                    } else {
                        *target
                    }
                }
                Op::BranchUnlessMatch {
                    point,
                    subject,
                    cases,
                    target,
                } => {
                    let subject = self.read(*subject)?;
                    let mut matched = false;
                    for case in cases {
                        let candidate = or_suspend!(self, *point, self.eval(case)?);
                        if subject.loose_eq(&candidate) {
                            matched = true;
                            break;
                        }
                    }
                    if matched {
                        pc + 1
                    } else {
                        *target
                    }
                }
                Op::Jump { target } => *target,
                Op::ForInit {
                    point,
                    items,
                    list,
                    cursor,
                    on_empty,
                } => {
                    let items = match or_suspend!(self, *point, self.eval(items)?) {
                        Value::List(items) => items,
                        other => return Err(DataError::not_iterable(other.type_name()).into()),
                    };
                    let empty = items.is_empty();
                    *self.local_mut(*list)? = Local::Value(Value::List(items));
                    *self.local_mut(*cursor)? = Local::Value(Value::Int(0));
                    match on_empty {
                        Some(target) if empty => *target,
                        _ => pc + 1,
                    }
                }
                Op::ForNext {
                    list,
                    cursor,
                    item,
                    index,
                    exit,
                } => {
                    let position = self.cursor(*cursor)?;
                    let next = match self.read(*list)? {
                        Value::List(items) => items.get(position).cloned(),
                        other => {
                            return Err(self.internal(format!(
                                "loop list slot holds a {}",
                                other.type_name()
                            )))
                        }
                    };
                    match next {
                        Some(value) => {
                            *self.local_mut(*item)? = Local::Value(value);
                            let position = i64::try_from(position)
                                .map_err(|_| self.internal("loop index overflow"))?;
                            if let Some(index) = index {
                                *self.local_mut(*index)? = Local::Value(Value::Int(position));
                            }
                            *self.local_mut(*cursor)? = Local::Value(Value::Int(position + 1));
                            pc + 1
                        }
                        None => *exit,
                    }
                }
                Op::BeginCapture { buffer } => {
                    *self.local_mut(*buffer)? = Local::Buffer(String::new());
                    pc + 1
                }
                Op::EndCapture { buffer, dest, kind } => {
                    let text = match mem::take(self.local_mut(*buffer)?) {
                        Local::Buffer(text) => text,
                        _ => return Err(self.internal("capture ended without a buffer")),
                    };
                    *self.local_mut(*dest)? = Local::Value(captured(*kind, text));
                    pc + 1
                }
                Op::Call {
                    point,
                    out,
                    callee,
                    base,
                    args,
                } => {
                    if let Some(outcome) = self.call(*point, *out, callee, base, args)? {
                        return Ok(outcome);
                    }
                    pc + 1
                }
            };
        }
        Ok(FrameOutcome::Done)
    }

    /// Runs a call op. `Some` means the activation suspends with that
    /// outcome.
    fn call(
        &mut self,
        point: ResumePoint,
        out: Output,
        callee: &Callee,
        base: &ParamsBase,
        args: &[(Arc<str>, ArgSource)],
    ) -> Result<Option<FrameOutcome>, RenderError> {
        let (handle, params, frame) = match self.take_pending(point) {
            Some(child) => (child.callee, child.params, Some(child.frame)),
            None => {
                let params = match self.call_params(base, args)? {
                    Step::Ready(params) => params,
                    Step::Suspend(reason) => return self.suspend(point, None, reason).map(Some),
                };
                let handle = match callee {
                    Callee::Template(site) => {
                        site.resolve(self.template.unit(), self.ctx, self.template.name())?
                    }
                    Callee::Delegate { site, variant } => {
                        let variant = match variant {
                            None => String::new(),
                            Some(variant) => match self.eval(variant)? {
                                Step::Ready(Value::Null) => String::new(),
                                Step::Ready(value) => value.to_string(),
                                Step::Suspend(reason) => {
                                    return self.suspend(point, None, reason).map(Some)
                                }
                            },
                        };
                        match site.select(self.ctx, &variant)? {
                            Some(handle) => handle,
                            None => return Ok(None),
                        }
                    }
                };
                (handle, params, None)
            }
        };

        let ctx = self.ctx;
        let _depth = ctx.enter_call(handle.name())?;
        let outcome = ensure_sufficient_stack(|| self.invoke(out, &handle, frame, &params))?;
        match outcome {
            FrameOutcome::Done => Ok(None),
            FrameOutcome::Suspended { frame, reason } => {
                let child = Continuation {
                    callee: handle,
                    params,
                    frame,
                };
                self.suspend(point, Some(child), reason).map(Some)
            }
        }
    }

    fn invoke(
        &mut self,
        out: Output,
        callee: &TemplateHandle,
        frame: Option<StackFrame>,
        params: &Record,
    ) -> Result<FrameOutcome, RenderError> {
        let injected = self.injected;
        let ctx = self.ctx;
        match out {
            Output::Sink => callee.render_frame(frame, params, injected, &mut *self.sink, ctx),
            Output::Capture(slot) => {
                let mut capture = CaptureSink::new(self.buffer_mut(slot)?);
                callee.render_frame(frame, params, injected, &mut capture, ctx)
            }
        }
    }

    /// Explicit args override same-named fields of the base record.
    fn call_params(
        &self,
        base: &ParamsBase,
        args: &[(Arc<str>, ArgSource)],
    ) -> Result<Step<Record>, RenderError> {
        let mut params = match base {
            ParamsBase::None => Record::new(),
            ParamsBase::All => self.params.clone(),
            ParamsBase::Expr(data) => match ready!(self.eval(data)?) {
                Value::Record(record) => record,
                Value::Null => Record::new(),
                other => return Err(DataError::not_a_record(other.type_name()).into()),
            },
        };
        for (name, arg) in args {
            let value = match arg {
                ArgSource::Expr(value) => ready!(value.eval_unforced(&self.scope())?),
                ArgSource::Slot(slot) => self.read(*slot)?,
            };
            params.insert(Arc::clone(name), value);
        }
        Ok(Step::Ready(params))
    }

    fn take_pending(&mut self, point: ResumePoint) -> Option<Continuation> {
        match self.pending.take() {
            Some((at, child)) if at == point => Some(child),
            other => {
                self.pending = other;
                None
            }
        }
    }

    fn suspend(
        &mut self,
        point: ResumePoint,
        child: Option<Continuation>,
        reason: SuspendReason,
    ) -> Result<FrameOutcome, RenderError> {
        let template = self.template;
        let live = template
            .procedure()
            .live_slots(point)
            .ok_or_else(|| self.internal(format!("unknown resume point {}", point.raw())))?;
        let locals: SmallVec<[Local; 4]> = live
            .iter()
            .map(|slot| {
                self.locals
                    .get_mut(slot.index())
                    .map(mem::take)
                    .unwrap_or_default()
            })
            .collect();
        trace!(
            template = template.name(),
            point = point.raw(),
            ?reason,
            saved = locals.len(),
            "suspending"
        );
        let frame = StackFrame::new(template.name_arc(), point, locals, child);
        Ok(FrameOutcome::Suspended { frame, reason })
    }

    fn poll(&mut self, out: Output) -> Option<SuspendReason> {
        match out {
            Output::Capture(_) => None,
            Output::Sink if self.ctx.take_sink_hold() => Some(SuspendReason::SinkNotReady),
            Output::Sink => match self.sink.poll_ready() {
                Readiness::Ready => None,
                Readiness::NotReady => Some(SuspendReason::SinkNotReady),
            },
        }
    }

    fn write(&mut self, out: Output, text: &str) -> Result<(), RenderError> {
        match out {
            Output::Sink => {
                if self.sink.append(text)? == Readiness::NotReady {
                    self.ctx.hold_sink();
                }
            }
            Output::Capture(slot) => self.buffer_mut(slot)?.push_str(text),
        }
        Ok(())
    }

    fn eval(&self, value: &ValueProcedure) -> Result<Step<Value>, RenderError> {
        value.eval(&self.scope())
    }

    fn scope(&self) -> EvalScope<'_> {
        EvalScope {
            locals: &self.locals,
            injected: self.injected,
            ctx: self.ctx,
            unit: self.template.unit(),
            template: self.template.name(),
        }
    }

    fn read(&self, slot: Slot) -> Result<Value, RenderError> {
        match self.locals.get(slot.index()) {
            Some(Local::Value(value)) => Ok(value.clone()),
            _ => Err(self.internal(format!("slot {} is not a value", slot.raw()))),
        }
    }

    fn cursor(&self, slot: Slot) -> Result<usize, RenderError> {
        match self.read(slot)? {
            Value::Int(n) => usize::try_from(n).map_err(|_| self.internal("negative loop cursor")),
            other => Err(self.internal(format!("loop cursor holds a {}", other.type_name()))),
        }
    }

    fn local_mut(&mut self, slot: Slot) -> Result<&mut Local, RenderError> {
        let template = self.template;
        self.locals.get_mut(slot.index()).ok_or_else(|| {
            InternalError::new(template.name(), format!("slot {} out of range", slot.raw())).into()
        })
    }

    fn buffer_mut(&mut self, slot: Slot) -> Result<&mut String, RenderError> {
        let template = self.template;
        match self.locals.get_mut(slot.index()) {
            Some(Local::Buffer(buffer)) => Ok(buffer),
            _ => Err(InternalError::new(
                template.name(),
                format!("slot {} is not a capture buffer", slot.raw()),
            )
            .into()),
        }
    }

    fn internal(&self, detail: impl Into<String>) -> RenderError {
        InternalError::new(self.template.name(), detail).into()
    }
}

/// `text` captures are plain strings; every other kind stays sanitized.
fn captured(kind: ContentKind, text: String) -> Value {
    match kind {
        ContentKind::Text => Value::string(text),
        kind => Value::content(kind, text),
    }
}
