//! Operator semantics shared by constant folding and render-time evaluation.
//!
//! All functions take already-forced operands. Short-circuit operators are
//! handled by the callers; the versions here assume both sides are known.

use std::cmp::Ordering;

use vellum_ir::{BinaryOp, BuiltinFn, UnaryOp};
use vellum_runtime::{DataError, Value};

pub(crate) fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, DataError> {
    match op {
        BinaryOp::Add => add(left, right),
        BinaryOp::Sub => arithmetic(op, left, right, i64::checked_sub, |a, b| a - b),
        BinaryOp::Mul => arithmetic(op, left, right, i64::checked_mul, |a, b| a * b),
        BinaryOp::Div => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => Ok(Value::Float(a / b)),
            _ => Err(mismatch(op, left, right)),
        },
        BinaryOp::Mod => match (left, right) {
            (Value::Int(_), Value::Int(0)) => Err(DataError::modulo_by_zero()),
            (Value::Int(a), Value::Int(b)) => a
                .checked_rem(*b)
                .map(Value::Int)
                .ok_or_else(|| DataError::integer_overflow(op.as_symbol())),
            _ => match (left.as_f64(), right.as_f64()) {
                (Some(a), Some(b)) => Ok(Value::Float(a % b)),
                _ => Err(mismatch(op, left, right)),
            },
        },
        BinaryOp::Eq => Ok(Value::Bool(left.loose_eq(right))),
        BinaryOp::NotEq => Ok(Value::Bool(!left.loose_eq(right))),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            let ordering = compare(left, right).ok_or_else(|| mismatch(op, left, right))?;
            Ok(Value::Bool(match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::LtEq => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }))
        }
        BinaryOp::And => Ok(Value::Bool(left.is_truthy() && right.is_truthy())),
        BinaryOp::Or => Ok(Value::Bool(left.is_truthy() || right.is_truthy())),
        BinaryOp::NullCoalesce => Ok(if left.is_null() {
            right.clone()
        } else {
            left.clone()
        }),
    }
}

/// `+` adds numbers and concatenates as soon as either side is text.
fn add(left: &Value, right: &Value) -> Result<Value, DataError> {
    if left.as_text().is_some() || right.as_text().is_some() {
        return Ok(Value::string(format!("{left}{right}")));
    }
    arithmetic(BinaryOp::Add, left, right, i64::checked_add, |a, b| a + b)
}

fn arithmetic(
    op: BinaryOp,
    left: &Value,
    right: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, DataError> {
    if let (Value::Int(a), Value::Int(b)) = (left, right) {
        return int_op(*a, *b)
            .map(Value::Int)
            .ok_or_else(|| DataError::integer_overflow(op.as_symbol()));
    }
    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => Ok(Value::Float(float_op(a, b))),
        _ => Err(mismatch(op, left, right)),
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => match (left.as_text(), right.as_text()) {
                (Some(a), Some(b)) => Some(a.cmp(b)),
                _ => None,
            },
        },
    }
}

fn mismatch(op: BinaryOp, left: &Value, right: &Value) -> DataError {
    DataError::binary_type_mismatch(op.as_symbol(), left.type_name(), right.type_name())
}

pub(crate) fn unary(op: UnaryOp, operand: &Value) -> Result<Value, DataError> {
    match (op, operand) {
        (UnaryOp::Not, v) => Ok(Value::Bool(!v.is_truthy())),
        (UnaryOp::Neg, Value::Int(n)) => n
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| DataError::integer_overflow("-")),
        (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::Neg, v) => Err(DataError::unary_type_mismatch("-", v.type_name())),
    }
}

pub(crate) fn field(base: &Value, name: &str, null_safe: bool) -> Result<Value, DataError> {
    match base {
        Value::Record(record) => Ok(record.get(name).cloned().unwrap_or(Value::Null)),
        Value::Null if null_safe => Ok(Value::Null),
        other => Err(DataError::cannot_access_field(name, other.type_name())),
    }
}

/// Out-of-range list indices and missing record keys read as null.
pub(crate) fn index(base: &Value, index: &Value) -> Result<Value, DataError> {
    match (base, index) {
        (Value::List(items), Value::Int(i)) => Ok(usize::try_from(*i)
            .ok()
            .and_then(|i| items.get(i))
            .cloned()
            .unwrap_or(Value::Null)),
        (Value::Record(record), key) if key.as_text().is_some() => Ok(key
            .as_text()
            .and_then(|k| record.get(k))
            .cloned()
            .unwrap_or(Value::Null)),
        (base, index) => Err(DataError::cannot_index(base.type_name(), index.type_name())),
    }
}

pub(crate) fn builtin(func: BuiltinFn, args: &[Value]) -> Result<Value, DataError> {
    let bad_arg = |got: &Value| DataError::bad_builtin_arg(func.name(), got.type_name());
    let [arg] = args else {
        return Err(DataError::new(format!(
            "`{}` takes exactly one argument, got {}",
            func.name(),
            args.len()
        )));
    };
    match func {
        BuiltinFn::Length => {
            let len = match arg {
                Value::List(items) => items.len(),
                Value::Record(record) => record.len(),
                v => v.as_text().map(|s| s.chars().count()).ok_or_else(|| bad_arg(v))?,
            };
            i64::try_from(len)
                .map(Value::Int)
                .map_err(|_| DataError::integer_overflow(func.name()))
        }
        BuiltinFn::IsNonnull => Ok(Value::Bool(!arg.is_null())),
        BuiltinFn::Str => Ok(Value::string(arg.to_string())),
    }
}
