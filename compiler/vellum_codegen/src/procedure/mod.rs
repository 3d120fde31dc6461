//! Render procedures: a flat op list plus the resume table.
//!
//! # Architecture
//!
//! A template body compiles to a [`Procedure`]: a vector of [`Op`]s with
//! explicit jump targets, and a resume table with one entry per resume
//! point. Each entry records the op to re-enter at and the live slots
//! whose values are saved when the render suspends there.
//!
//! ```text
//!   Procedure
//!   ├── params / state     re-materialized on every entry
//!   ├── ops[pc]            straight-line code with jumps
//!   └── resume_table[rp]   rp → (pc, live slots)
//! ```
//!
//! Every op that can suspend carries its own [`ResumePoint`]. Re-entering
//! at a point re-executes that op from the start, so a suspendable op has
//! no side effects before its last suspension check.

pub(crate) mod exec;

use std::sync::Arc;

use smallvec::SmallVec;
use vellum_ir::ContentKind;
use vellum_runtime::{ResumePoint, Value};

use crate::dispatch::{DelegateSite, TemplateSite};
use crate::expr::ValueProcedure;
use crate::scope::{Slot, SlotInfo};
use crate::CompileError;

/// Where an op writes its output.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Output {
    Sink,
    /// Appends to the string buffer held in a slot.
    Capture(Slot),
}

#[derive(Debug)]
pub(crate) enum Callee {
    Template(Arc<TemplateSite>),
    Delegate {
        site: DelegateSite,
        variant: Option<ValueProcedure>,
    },
}

/// The record a call's explicit params are layered on.
#[derive(Debug)]
pub(crate) enum ParamsBase {
    None,
    /// The caller's own params.
    All,
    Expr(ValueProcedure),
}

#[derive(Debug)]
pub(crate) enum ArgSource {
    Expr(ValueProcedure),
    /// A content param already rendered into a slot.
    Slot(Slot),
}

#[derive(Debug)]
pub(crate) enum Op {
    Text {
        point: ResumePoint,
        out: Output,
        text: Box<str>,
    },
    Print {
        point: ResumePoint,
        out: Output,
        value: ValueProcedure,
    },
    Store {
        point: ResumePoint,
        slot: Slot,
        value: ValueProcedure,
        /// `false` keeps a lazy value pending in the slot.
        force: bool,
    },
    BranchUnless {
        point: ResumePoint,
        cond: ValueProcedure,
        target: usize,
    },
    /// Falls through if the value in `subject` equals any of `cases`.
    BranchUnlessMatch {
        point: ResumePoint,
        subject: Slot,
        cases: Vec<ValueProcedure>,
        target: usize,
    },
    Jump {
        target: usize,
    },
    ForInit {
        point: ResumePoint,
        items: ValueProcedure,
        list: Slot,
        cursor: Slot,
        on_empty: Option<usize>,
    },
    ForNext {
        list: Slot,
        cursor: Slot,
        item: Slot,
        index: Option<Slot>,
        exit: usize,
    },
    BeginCapture {
        buffer: Slot,
    },
    /// Moves a finished buffer into `dest` as content of `kind`.
    EndCapture {
        buffer: Slot,
        dest: Slot,
        kind: ContentKind,
    },
    Call {
        point: ResumePoint,
        out: Output,
        callee: Callee,
        base: ParamsBase,
        args: Vec<(Arc<str>, ArgSource)>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ResumeEntry {
    pub pc: usize,
    pub live: SmallVec<[Slot; 8]>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum ParamSource {
    Params,
    Injected,
}

#[derive(Debug)]
pub(crate) struct ParamBinding {
    pub slot: Slot,
    pub name: Arc<str>,
    pub source: ParamSource,
    pub default: Option<Value>,
}

#[derive(Debug)]
pub(crate) struct StateBinding {
    pub slot: Slot,
    pub value: Value,
}

/// The compiled body of one template.
#[derive(Debug)]
pub struct Procedure {
    pub(crate) ops: Vec<Op>,
    pub(crate) resume_table: Vec<ResumeEntry>,
    pub(crate) layout: Vec<SlotInfo>,
    pub(crate) params: Vec<ParamBinding>,
    pub(crate) state: Vec<StateBinding>,
}

impl Procedure {
    pub fn op_count(&self) -> usize {
        self.ops.len()
    }

    pub fn resume_point_count(&self) -> usize {
        self.resume_table.len()
    }

    pub fn slot_count(&self) -> usize {
        self.layout.len()
    }

    /// Frame layout, indexed by slot.
    pub fn layout(&self) -> &[SlotInfo] {
        &self.layout
    }

    /// Slots saved when suspending at `point`.
    pub fn live_slots(&self, point: ResumePoint) -> Option<&[Slot]> {
        self.resume_entry(point).map(|entry| entry.live.as_slice())
    }

    pub(crate) fn resume_entry(&self, point: ResumePoint) -> Option<&ResumeEntry> {
        self.resume_table.get(point.index())
    }
}

/// Accumulates ops and resume points in emission order.
pub(crate) struct ProcedureBuilder {
    template: Arc<str>,
    ops: Vec<Op>,
    resume_table: Vec<ResumeEntry>,
}

impl ProcedureBuilder {
    pub(crate) fn new(template: &str) -> Self {
        ProcedureBuilder {
            template: Arc::from(template),
            ops: Vec::new(),
            resume_table: Vec::new(),
        }
    }

    /// Index the next op will get.
    pub(crate) fn pc(&self) -> usize {
        self.ops.len()
    }

    pub(crate) fn emit(&mut self, op: Op) -> usize {
        let pc = self.ops.len();
        self.ops.push(op);
        pc
    }

    /// Emits a suspendable op under a fresh resume point whose live set is
    /// `live`.
    pub(crate) fn emit_suspendable(
        &mut self,
        live: SmallVec<[Slot; 8]>,
        make: impl FnOnce(ResumePoint) -> Op,
    ) -> Result<usize, CompileError> {
        let raw = u32::try_from(self.resume_table.len())
            .map_err(|_| CompileError::internal(&self.template, "too many resume points"))?;
        let pc = self.pc();
        self.resume_table.push(ResumeEntry { pc, live });
        Ok(self.emit(make(ResumePoint::new(raw))))
    }

    /// Points the jump in `ops[at]` to `target`.
    pub(crate) fn patch(&mut self, at: usize, to: usize) -> Result<(), CompileError> {
        let slot = match self.ops.get_mut(at) {
            Some(
                Op::BranchUnless { target, .. }
                | Op::BranchUnlessMatch { target, .. }
                | Op::Jump { target },
            ) => target,
            Some(Op::ForInit {
                on_empty: Some(target),
                ..
            }) => target,
            Some(Op::ForNext { exit, .. }) => exit,
            _ => {
                return Err(CompileError::internal(
                    &self.template,
                    format!("op {at} has no jump target to patch"),
                ))
            }
        };
        *slot = to;
        Ok(())
    }

    pub(crate) fn finish(self, layout: Vec<SlotInfo>) -> Body {
        Body {
            ops: self.ops,
            resume_table: self.resume_table,
            layout,
        }
    }
}

/// A compiled body before its header bindings are attached.
pub(crate) struct Body {
    pub ops: Vec<Op>,
    pub resume_table: Vec<ResumeEntry>,
    pub layout: Vec<SlotInfo>,
}

impl Body {
    pub(crate) fn into_procedure(
        self,
        params: Vec<ParamBinding>,
        state: Vec<StateBinding>,
    ) -> Procedure {
        Procedure {
            ops: self.ops,
            resume_table: self.resume_table,
            layout: self.layout,
            params,
            state,
        }
    }
}
