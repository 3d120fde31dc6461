//! Statement compilation: template nodes to ops.
//!
//! [`StmtCompiler`] walks a template body and emits the op list together
//! with its resume points. The control-flow shapes it produces:
//!
//! ```text
//!   if c1 {A} elseif c2 {B} else {C}     switch v {case x: A} default {D}
//!
//!       BranchUnless c1 → L1                 Store subject ← v
//!       A                                    BranchUnlessMatch x → L1
//!       Jump → END                           A
//!   L1: BranchUnless c2 → L2                 Jump → END
//!       B                                L1: D
//!       Jump → END                       END:
//!   L2: C
//!   END:
//!
//!   for x in items {A} ifempty {E}
//!
//!       ForInit list, cursor ← items (→ EMPTY if none)
//!   HEAD: ForNext x ← list[cursor] → EXIT
//!       A
//!       Jump → HEAD
//!   EXIT: Jump → END
//!   EMPTY: E
//!   END:
//! ```
//!
//! Each node gets its own lexical scope, so variables declared inside a
//! branch or loop body stop being live at its end.

use std::mem;
use std::sync::Arc;

use vellum_ir::{
    CallData, CallNode, CallParam, CallTarget, ContentKind, Expr, ForNode, IfNode, LetNode, Node,
    OpenTagNode, SwitchNode, VarType,
};
use vellum_runtime::{ensure_sufficient_stack, ResumePoint};

use crate::dispatch::{DelegateSite, TemplateSite};
use crate::expr::{ExprCompiler, ExprMode, ValueProcedure};
use crate::procedure::{ArgSource, Body, Callee, Op, Output, ParamsBase, ProcedureBuilder};
use crate::scope::{LocalVariableManager, ScopeId, Slot, SlotKind};
use crate::{CompileError, CompileOptions};

/// Compiles one template body. Header variables must already be declared
/// in `vars`.
pub struct StmtCompiler<'o> {
    vars: LocalVariableManager,
    builder: ProcedureBuilder,
    options: &'o CompileOptions,
    out: Output,
    call_sites: Vec<Arc<TemplateSite>>,
}

/// What [`StmtCompiler::finish`] hands back.
pub struct CompiledBody {
    pub(crate) body: Body,
    pub(crate) call_sites: Vec<Arc<TemplateSite>>,
}

impl CompiledBody {
    /// Number of places the body can suspend.
    pub fn resume_point_count(&self) -> usize {
        self.body.resume_table.len()
    }
}

impl<'o> StmtCompiler<'o> {
    pub fn new(vars: LocalVariableManager, options: &'o CompileOptions) -> Self {
        let builder = ProcedureBuilder::new(vars.template());
        StmtCompiler {
            vars,
            builder,
            options,
            out: Output::Sink,
            call_sites: Vec::new(),
        }
    }

    /// Closes the header scope and returns the finished body.
    pub fn finish(mut self, header: ScopeId) -> Result<CompiledBody, CompileError> {
        self.vars.exit_scope(header)?;
        if self.vars.depth() != 0 {
            return Err(CompileError::internal(
                self.vars.template(),
                "scopes left open after the template body",
            ));
        }
        Ok(CompiledBody {
            body: self.builder.finish(self.vars.into_layout()),
            call_sites: self.call_sites,
        })
    }

    pub fn compile_body(&mut self, body: &[Node]) -> Result<(), CompileError> {
        let mut pending = String::new();
        for node in body {
            match node {
                Node::RawText(text) if self.options.coalesce_raw_text => pending.push_str(text),
                _ => {
                    self.flush_text(&mut pending)?;
                    ensure_sufficient_stack(|| self.compile_node(node))?;
                }
            }
        }
        self.flush_text(&mut pending)
    }

    fn compile_node(&mut self, node: &Node) -> Result<(), CompileError> {
        match node {
            Node::RawText(text) => self.emit_text(text),
            Node::Print(expr) => {
                let value = self.instance(expr)?;
                let out = self.out;
                self.emit_suspendable(|point| Op::Print { point, out, value })
            }
            Node::If(node) => self.compile_if(node),
            Node::Switch(node) => self.compile_switch(node),
            Node::For(node) => self.compile_for(node),
            Node::Let(node) => self.compile_let(node),
            Node::Call(node) => self.compile_call(node),
            Node::OpenTag(node) => self.compile_open_tag(node),
            Node::Key(_) => Err(CompileError::internal(
                self.vars.template(),
                "`key` is only valid as a direct child of an open tag",
            )),
        }
    }

    fn compile_if(&mut self, node: &IfNode) -> Result<(), CompileError> {
        let mut end_jumps = Vec::with_capacity(node.branches.len());
        for branch in &node.branches {
            let cond = self.instance(&branch.cond)?;
            let test = self.emit_suspendable_at(|point| Op::BranchUnless {
                point,
                cond,
                target: 0,
            })?;
            self.scoped(|this| this.compile_body(&branch.body))?;
            end_jumps.push(self.builder.emit(Op::Jump { target: 0 }));
            let next = self.builder.pc();
            self.builder.patch(test, next)?;
        }
        if let Some(body) = &node.else_body {
            self.scoped(|this| this.compile_body(body))?;
        }
        self.patch_all(&end_jumps)
    }

    fn compile_switch(&mut self, node: &SwitchNode) -> Result<(), CompileError> {
        self.scoped(|this| {
            let value = this.instance(&node.value)?;
            let subject = this.vars.synthetic("switch subject")?;
            this.emit_suspendable(|point| Op::Store {
                point,
                slot: subject,
                value,
                force: true,
            })?;

            let mut end_jumps = Vec::with_capacity(node.cases.len());
            for case in &node.cases {
                let cases = case
                    .values
                    .iter()
                    .map(|v| this.instance(v))
                    .collect::<Result<Vec<_>, _>>()?;
                let test = this.emit_suspendable_at(|point| Op::BranchUnlessMatch {
                    point,
                    subject,
                    cases,
                    target: 0,
                })?;
                this.scoped(|this| this.compile_body(&case.body))?;
                end_jumps.push(this.builder.emit(Op::Jump { target: 0 }));
                let next = this.builder.pc();
                this.builder.patch(test, next)?;
            }
            if let Some(body) = &node.default {
                this.scoped(|this| this.compile_body(body))?;
            }
            this.patch_all(&end_jumps)
        })
    }

    fn compile_for(&mut self, node: &ForNode) -> Result<(), CompileError> {
        let items = self.instance(&node.items)?;
        let init = self.scoped(|this| {
            let list = this.vars.synthetic("loop list")?;
            let cursor = this.vars.synthetic("loop cursor")?;
            let on_empty = node.if_empty.as_ref().map(|_| 0);
            let init = this.emit_suspendable_at(|point| Op::ForInit {
                point,
                items,
                list,
                cursor,
                on_empty,
            })?;

            let item = this.vars.declare(&node.var, VarType::Unknown, SlotKind::Local)?;
            let index = node
                .index_var
                .as_deref()
                .map(|name| this.vars.declare(name, VarType::Int, SlotKind::Local))
                .transpose()?;
            let head = this.builder.pc();
            let next = this.builder.emit(Op::ForNext {
                list,
                cursor,
                item,
                index,
                exit: 0,
            });
            this.scoped(|this| this.compile_body(&node.body))?;
            this.builder.emit(Op::Jump { target: head });
            let exit = this.builder.pc();
            this.builder.patch(next, exit)?;
            Ok(init)
        })?;

        if let Some(body) = &node.if_empty {
            let skip = self.builder.emit(Op::Jump { target: 0 });
            let empty = self.builder.pc();
            self.builder.patch(init, empty)?;
            self.scoped(|this| this.compile_body(body))?;
            let end = self.builder.pc();
            self.builder.patch(skip, end)?;
        }
        Ok(())
    }

    fn compile_let(&mut self, node: &LetNode) -> Result<(), CompileError> {
        match node {
            LetNode::Value { name, value } => {
                let value = self.instance(value)?;
                let slot = self.vars.declare(name, VarType::Unknown, SlotKind::Local)?;
                self.emit_suspendable(|point| Op::Store {
                    point,
                    slot,
                    value,
                    force: false,
                })
            }
            LetNode::Content { name, kind, body } => {
                let buffer = self.vars.synthetic("let content")?;
                self.capture(buffer, body)?;
                let dest = self
                    .vars
                    .declare(name, VarType::Content(*kind), SlotKind::Local)?;
                self.builder.emit(Op::EndCapture {
                    buffer,
                    dest,
                    kind: ContentKind::from(*kind),
                });
                Ok(())
            }
        }
    }

    fn compile_call(&mut self, node: &CallNode) -> Result<(), CompileError> {
        self.scoped(|this| {
            let mut args = Vec::with_capacity(node.params.len());
            for param in &node.params {
                let source = match param {
                    CallParam::Value { value, .. } => ArgSource::Expr(this.instance(value)?),
                    CallParam::Content { kind, body, .. } => {
                        let buffer = this.vars.synthetic("call param")?;
                        this.capture(buffer, body)?;
                        this.builder.emit(Op::EndCapture {
                            buffer,
                            dest: buffer,
                            kind: ContentKind::from(*kind),
                        });
                        ArgSource::Slot(buffer)
                    }
                };
                args.push((Arc::from(param.name()), source));
            }

            let base = match &node.data {
                CallData::None => ParamsBase::None,
                CallData::All => ParamsBase::All,
                CallData::Expr(data) => ParamsBase::Expr(this.instance(data)?),
            };
            let callee = match &node.target {
                CallTarget::Template(name) => {
                    let site = Arc::new(TemplateSite::new(name));
                    this.call_sites.push(Arc::clone(&site));
                    Callee::Template(site)
                }
                CallTarget::Delegate {
                    name,
                    variant,
                    allow_empty_default,
                } => Callee::Delegate {
                    site: DelegateSite::new(name, *allow_empty_default),
                    variant: variant.as_ref().map(|v| this.instance(v)).transpose()?,
                },
            };
            let out = this.out;
            this.emit_suspendable(|point| Op::Call {
                point,
                out,
                callee,
                base,
                args,
            })
        })
    }

    fn compile_open_tag(&mut self, node: &OpenTagNode) -> Result<(), CompileError> {
        self.emit_text(&format!("<{}", node.tag))?;
        for child in &node.children {
            match child {
                // Keys feed incremental DOM only; string output drops them.
                Node::Key(expr) => {
                    self.instance(expr)?;
                }
                other => self.compile_node(other)?,
            }
        }
        self.emit_text(if node.self_closing { "/>" } else { ">" })
    }

    /// Renders `body` into the buffer in `buffer`.
    fn capture(&mut self, buffer: Slot, body: &[Node]) -> Result<(), CompileError> {
        self.builder.emit(Op::BeginCapture { buffer });
        let saved = mem::replace(&mut self.out, Output::Capture(buffer));
        let result = self.scoped(|this| this.compile_body(body));
        self.out = saved;
        result
    }

    fn scoped<R>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<R, CompileError>,
    ) -> Result<R, CompileError> {
        let scope = self.vars.enter_scope();
        let result = f(self)?;
        self.vars.exit_scope(scope)?;
        Ok(result)
    }

    fn instance(&self, expr: &Expr) -> Result<ValueProcedure, CompileError> {
        ExprCompiler::new(&self.vars).compile(expr, ExprMode::Instance)
    }

    fn flush_text(&mut self, pending: &mut String) -> Result<(), CompileError> {
        if pending.is_empty() {
            return Ok(());
        }
        let text = mem::take(pending);
        self.emit_text(&text)
    }

    fn emit_text(&mut self, text: &str) -> Result<(), CompileError> {
        if text.is_empty() {
            return Ok(());
        }
        let out = self.out;
        self.emit_suspendable(|point| Op::Text {
            point,
            out,
            text: Box::from(text),
        })
    }

    fn emit_suspendable(
        &mut self,
        make: impl FnOnce(ResumePoint) -> Op,
    ) -> Result<(), CompileError> {
        self.emit_suspendable_at(make).map(drop)
    }

    /// Like `emit_suspendable`, returning the op's index for patching.
    fn emit_suspendable_at(
        &mut self,
        make: impl FnOnce(ResumePoint) -> Op,
    ) -> Result<usize, CompileError> {
        let live = self.vars.live_slots();
        self.builder.emit_suspendable(live, make)
    }

    fn patch_all(&mut self, jumps: &[usize]) -> Result<(), CompileError> {
        let end = self.builder.pc();
        jumps
            .iter()
            .try_for_each(|&jump| self.builder.patch(jump, end))
    }
}
