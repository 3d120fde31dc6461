//! Compile-time evaluation of expressions with no runtime inputs.
//!
//! Classification is separate from folding: an expression is [`Constness::Const`]
//! when none of its leaves read a variable, a template, or a visual element.
//! A constant expression may still fail to fold (integer overflow, type
//! mismatch); such expressions are left for the renderer so the error
//! surfaces at the point of use.

use std::sync::Arc;

use vellum_ir::{BinaryOp, Expr, Literal};
use vellum_runtime::{Record, Value};

use super::ops;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Constness {
    Const,
    Runtime,
}

impl Constness {
    fn and(self, other: Constness) -> Constness {
        match (self, other) {
            (Constness::Const, Constness::Const) => Constness::Const,
            _ => Constness::Runtime,
        }
    }

    fn all<'a>(exprs: impl IntoIterator<Item = &'a Expr>) -> Constness {
        exprs
            .into_iter()
            .fold(Constness::Const, |acc, e| acc.and(classify(e)))
    }
}

pub(crate) fn classify(expr: &Expr) -> Constness {
    match expr {
        Expr::Literal(_) => Constness::Const,
        Expr::Var(_) | Expr::TemplateLiteral(_) | Expr::Ve { .. } => Constness::Runtime,
        Expr::Binary { left, right, .. } => classify(left).and(classify(right)),
        Expr::Unary { operand, .. } => classify(operand),
        Expr::Conditional {
            cond,
            then_branch,
            else_branch,
        } => classify(cond)
            .and(classify(then_branch))
            .and(classify(else_branch)),
        Expr::List(items) => Constness::all(items),
        Expr::Record(fields) => Constness::all(fields.iter().map(|(_, e)| e)),
        Expr::Field { base, .. } => classify(base),
        Expr::Index { base, index } => classify(base).and(classify(index)),
        Expr::Builtin { args, .. } => Constness::all(args),
    }
}

/// Folds `expr` to a value, or returns `None` if it is not constant or its
/// evaluation fails.
pub(crate) fn try_fold(expr: &Expr) -> Option<Value> {
    match classify(expr) {
        Constness::Const => fold(expr),
        Constness::Runtime => None,
    }
}

pub(crate) fn literal(lit: &Literal) -> Value {
    match lit {
        Literal::Null => Value::Null,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(n) => Value::Int(*n),
        Literal::Float(f) => Value::Float(*f),
        Literal::Str(s) => Value::string(s.as_str()),
    }
}

fn fold(expr: &Expr) -> Option<Value> {
    match expr {
        Expr::Literal(lit) => Some(literal(lit)),
        Expr::Binary { op, left, right } => {
            let left = fold(left)?;
            match op {
                BinaryOp::And if !left.is_truthy() => Some(Value::Bool(false)),
                BinaryOp::Or if left.is_truthy() => Some(Value::Bool(true)),
                BinaryOp::NullCoalesce if !left.is_null() => Some(left),
                _ => ops::binary(*op, &left, &fold(right)?).ok(),
            }
        }
        Expr::Unary { op, operand } => ops::unary(*op, &fold(operand)?).ok(),
        Expr::Conditional {
            cond,
            then_branch,
            else_branch,
        } => {
            if fold(cond)?.is_truthy() {
                fold(then_branch)
            } else {
                fold(else_branch)
            }
        }
        Expr::List(items) => items
            .iter()
            .map(fold)
            .collect::<Option<Vec<_>>>()
            .map(Value::list),
        Expr::Record(fields) => fields
            .iter()
            .map(|(name, e)| fold(e).map(|v| (Arc::<str>::from(name.as_str()), v)))
            .collect::<Option<Record>>()
            .map(Value::Record),
        Expr::Field {
            base,
            field,
            null_safe,
        } => ops::field(&fold(base)?, field, *null_safe).ok(),
        Expr::Index { base, index } => ops::index(&fold(base)?, &fold(index)?).ok(),
        Expr::Builtin { func, args } => {
            let args = args.iter().map(fold).collect::<Option<Vec<_>>>()?;
            ops::builtin(*func, &args).ok()
        }
        Expr::Var(_) | Expr::TemplateLiteral(_) | Expr::Ve { .. } => None,
    }
}
