//! Expression compilation.
//!
//! [`ExprCompiler`] lowers IR expressions into [`ValueProcedure`]s: small
//! trees with variable references already resolved to frame slots and
//! template or visual-element references already attached to their
//! dispatch sites.
//!
//! # Modes
//!
//! - [`ExprMode::Instance`] compiles an expression evaluated while the
//!   render runs. It may read locals and may suspend on a lazy value.
//! - [`ExprMode::Constant`] compiles a parameter default or state
//!   initializer. These run while the frame is being set up, before any
//!   resume point exists, so they must fold to a value at compile time;
//!   anything else is [`CompileError::DefaultRequiresSuspension`].
//!
//! In both modes constant subtrees are folded eagerly.

mod const_fold;
mod eval;
mod ops;

use std::sync::Arc;

use vellum_ir::{BinaryOp, BuiltinFn, Expr, UnaryOp, VarRef};
use vellum_runtime::Value;

use crate::dispatch::{TemplateSite, VeSite};
use crate::scope::{LocalVariableManager, Slot, SlotKind};
use crate::CompileError;

pub(crate) use eval::EvalScope;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExprMode<'a> {
    Instance,
    /// `owner` names the parameter or state variable being initialized.
    Constant { owner: &'a str },
}

/// A compiled expression.
#[derive(Debug)]
pub struct ValueProcedure {
    root: CompiledExpr,
}

impl ValueProcedure {
    /// The folded value, if the whole expression was constant.
    pub fn as_constant(&self) -> Option<&Value> {
        match &self.root {
            CompiledExpr::Const(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_constant(self) -> Option<Value> {
        match self.root {
            CompiledExpr::Const(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub(crate) enum CompiledExpr {
    Const(Value),
    Slot(Slot),
    /// An `$ij` read with no declared injected parameter behind it.
    Injected(Arc<str>),
    Binary {
        op: BinaryOp,
        left: Box<CompiledExpr>,
        right: Box<CompiledExpr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<CompiledExpr>,
    },
    Conditional {
        cond: Box<CompiledExpr>,
        then_branch: Box<CompiledExpr>,
        else_branch: Box<CompiledExpr>,
    },
    List(Vec<CompiledExpr>),
    Record(Vec<(Arc<str>, CompiledExpr)>),
    Field {
        base: Box<CompiledExpr>,
        field: Arc<str>,
        null_safe: bool,
    },
    Index {
        base: Box<CompiledExpr>,
        index: Box<CompiledExpr>,
    },
    Builtin {
        func: BuiltinFn,
        args: Vec<CompiledExpr>,
    },
    Template(Arc<TemplateSite>),
    Ve {
        id: u64,
        name: Arc<str>,
        metadata: Option<Arc<VeSite>>,
    },
}

/// Compiles expressions against the scopes currently open in `vars`.
pub struct ExprCompiler<'a> {
    vars: &'a LocalVariableManager,
}

impl<'a> ExprCompiler<'a> {
    pub fn new(vars: &'a LocalVariableManager) -> Self {
        ExprCompiler { vars }
    }

    pub fn compile(&self, expr: &Expr, mode: ExprMode<'_>) -> Result<ValueProcedure, CompileError> {
        let root = match mode {
            ExprMode::Instance => self.lower(expr)?,
            ExprMode::Constant { owner } => {
                let value = const_fold::try_fold(expr).ok_or_else(|| {
                    CompileError::DefaultRequiresSuspension {
                        template: self.vars.template().to_owned(),
                        name: owner.to_owned(),
                    }
                })?;
                CompiledExpr::Const(value)
            }
        };
        Ok(ValueProcedure { root })
    }

    fn lower(&self, expr: &Expr) -> Result<CompiledExpr, CompileError> {
        if let Some(value) = const_fold::try_fold(expr) {
            return Ok(CompiledExpr::Const(value));
        }
        Ok(match expr {
            Expr::Literal(lit) => CompiledExpr::Const(const_fold::literal(lit)),
            Expr::Var(var) => self.lower_var(var)?,
            Expr::Binary { op, left, right } => CompiledExpr::Binary {
                op: *op,
                left: Box::new(self.lower(left)?),
                right: Box::new(self.lower(right)?),
            },
            Expr::Unary { op, operand } => CompiledExpr::Unary {
                op: *op,
                operand: Box::new(self.lower(operand)?),
            },
            Expr::Conditional {
                cond,
                then_branch,
                else_branch,
            } => CompiledExpr::Conditional {
                cond: Box::new(self.lower(cond)?),
                then_branch: Box::new(self.lower(then_branch)?),
                else_branch: Box::new(self.lower(else_branch)?),
            },
            Expr::List(items) => CompiledExpr::List(self.lower_all(items)?),
            Expr::Record(fields) => CompiledExpr::Record(
                fields
                    .iter()
                    .map(|(name, e)| Ok((Arc::from(name.as_str()), self.lower(e)?)))
                    .collect::<Result<_, CompileError>>()?,
            ),
            Expr::Field {
                base,
                field,
                null_safe,
            } => CompiledExpr::Field {
                base: Box::new(self.lower(base)?),
                field: Arc::from(field.as_str()),
                null_safe: *null_safe,
            },
            Expr::Index { base, index } => CompiledExpr::Index {
                base: Box::new(self.lower(base)?),
                index: Box::new(self.lower(index)?),
            },
            Expr::Builtin { func, args } => CompiledExpr::Builtin {
                func: *func,
                args: self.lower_all(args)?,
            },
            Expr::TemplateLiteral(name) => CompiledExpr::Template(Arc::new(TemplateSite::new(name))),
            Expr::Ve { id, name, metadata } => CompiledExpr::Ve {
                id: *id,
                name: Arc::from(name.as_str()),
                metadata: metadata
                    .as_deref()
                    .map(|table| Arc::new(VeSite::new(table, *id))),
            },
        })
    }

    fn lower_all(&self, exprs: &[Expr]) -> Result<Vec<CompiledExpr>, CompileError> {
        exprs.iter().map(|e| self.lower(e)).collect()
    }

    fn lower_var(&self, var: &VarRef) -> Result<CompiledExpr, CompileError> {
        let (name, kind) = match var {
            VarRef::Param(name) => (name, SlotKind::Param),
            VarRef::State(name) => (name, SlotKind::State),
            VarRef::Local(name) => (name, SlotKind::Local),
            // `$ij.name` only binds to params declared `@inject`.
            VarRef::Injected(name) => {
                return Ok(match self.vars.lookup_kind(name, SlotKind::Injected) {
                    Some(slot) => CompiledExpr::Slot(slot),
                    None => CompiledExpr::Injected(Arc::from(name.as_str())),
                });
            }
        };
        let slot = match kind {
            SlotKind::Param => self
                .vars
                .lookup_kind(name, SlotKind::Param)
                .or_else(|| self.vars.lookup_kind(name, SlotKind::Injected)),
            _ => self.vars.lookup_kind(name, kind),
        };
        slot.map(CompiledExpr::Slot).ok_or_else(|| {
            CompileError::internal(
                self.vars.template(),
                format!("unresolved {kind:?} reference `{name}`"),
            )
        })
    }
}

#[cfg(test)]
mod tests;
