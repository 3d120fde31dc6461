//! Render-time evaluation of compiled expressions.

use std::sync::{Arc, Weak};

use vellum_ir::BinaryOp;
use vellum_runtime::{
    ready, Forced, InternalError, Local, Record, RenderContext, RenderError, Step, SuspendReason,
    TemplateValue, Value, VisualElement,
};

use super::{ops, CompiledExpr, ValueProcedure};
use crate::scope::Slot;
use crate::unit::UnitLinks;

/// Everything an expression can read while the render runs.
pub(crate) struct EvalScope<'r> {
    pub locals: &'r [Local],
    pub injected: &'r Record,
    pub ctx: &'r RenderContext,
    pub unit: &'r Weak<UnitLinks>,
    pub template: &'r str,
}

impl EvalScope<'_> {
    fn read(&self, slot: Slot) -> Result<Value, RenderError> {
        match self.locals.get(slot.index()) {
            Some(Local::Value(value)) => Ok(value.clone()),
            _ => Err(InternalError::new(
                self.template,
                format!("slot {} read before it was written", slot.raw()),
            )
            .into()),
        }
    }
}

impl ValueProcedure {
    /// Evaluates and forces the result.
    pub(crate) fn eval(&self, scope: &EvalScope<'_>) -> Result<Step<Value>, RenderError> {
        self.root.eval(scope)
    }

    /// Evaluates without forcing a lazy value read straight out of a
    /// variable, so it can be passed along still pending.
    pub(crate) fn eval_unforced(&self, scope: &EvalScope<'_>) -> Result<Step<Value>, RenderError> {
        self.root.eval_unforced(scope)
    }
}

impl CompiledExpr {
    fn eval(&self, scope: &EvalScope<'_>) -> Result<Step<Value>, RenderError> {
        let value = ready!(self.eval_unforced(scope)?);
        Ok(force(value))
    }

    fn eval_unforced(&self, scope: &EvalScope<'_>) -> Result<Step<Value>, RenderError> {
        let value = match self {
            CompiledExpr::Const(value) => value.clone(),
            CompiledExpr::Slot(slot) => scope.read(*slot)?,
            CompiledExpr::Injected(name) => scope.injected.get(name).cloned().unwrap_or(Value::Null),
            CompiledExpr::Binary { op, left, right } => {
                let left = ready!(left.eval(scope)?);
                match op {
                    BinaryOp::And if !left.is_truthy() => Value::Bool(false),
                    BinaryOp::Or if left.is_truthy() => Value::Bool(true),
                    BinaryOp::And | BinaryOp::Or => Value::Bool(ready!(right.eval(scope)?).is_truthy()),
                    BinaryOp::NullCoalesce if !left.is_null() => left,
                    BinaryOp::NullCoalesce => return right.eval(scope),
                    _ => {
                        let right = ready!(right.eval(scope)?);
                        ops::binary(*op, &left, &right)?
                    }
                }
            }
            CompiledExpr::Unary { op, operand } => ops::unary(*op, &ready!(operand.eval(scope)?))?,
            CompiledExpr::Conditional {
                cond,
                then_branch,
                else_branch,
            } => {
                return if ready!(cond.eval(scope)?).is_truthy() {
                    then_branch.eval(scope)
                } else {
                    else_branch.eval(scope)
                };
            }
            CompiledExpr::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(ready!(item.eval(scope)?));
                }
                Value::List(Arc::from(values))
            }
            CompiledExpr::Record(fields) => {
                let mut record = Record::new();
                for (name, field) in fields {
                    record.insert(Arc::clone(name), ready!(field.eval(scope)?));
                }
                Value::Record(record)
            }
            CompiledExpr::Field {
                base,
                field,
                null_safe,
            } => ops::field(&ready!(base.eval(scope)?), field, *null_safe)?,
            CompiledExpr::Index { base, index } => {
                let base = ready!(base.eval(scope)?);
                let index = ready!(index.eval(scope)?);
                ops::index(&base, &index)?
            }
            CompiledExpr::Builtin { func, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(ready!(arg.eval(scope)?));
                }
                ops::builtin(*func, &values)?
            }
            CompiledExpr::Template(site) => {
                let handle = site.resolve(scope.unit, scope.ctx, scope.template)?;
                Value::Template(TemplateValue::new(handle))
            }
            CompiledExpr::Ve { id, name, metadata } => Value::Ve(VisualElement {
                id: *id,
                name: Arc::clone(name),
                metadata: metadata
                    .as_ref()
                    .map(|site| site.resolve(scope.unit, scope.ctx, scope.template))
                    .transpose()?,
            }),
        };
        Ok(Step::Ready(value))
    }
}

/// Forces a lazy value, following chains of providers.
fn force(mut value: Value) -> Step<Value> {
    loop {
        match value {
            Value::Lazy(lazy) => match lazy.force() {
                Forced::Ready(next) => value = next,
                Forced::NotReady => return Step::Suspend(SuspendReason::ValueNotReady),
            },
            other => return Step::Ready(other),
        }
    }
}
