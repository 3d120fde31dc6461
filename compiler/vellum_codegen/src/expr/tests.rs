#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use std::sync::{Arc, Weak};

use pretty_assertions::assert_eq;
use vellum_ir::{BinaryOp, BuiltinFn, Expr, UnaryOp, VarType};
use vellum_runtime::testing::DeferredValue;
use vellum_runtime::{
    LazyValue, Local, Record, RenderContext, RenderError, Step, SuspendReason, Value,
};

use super::*;
use crate::scope::SlotKind;

// Test Helpers

/// A manager with params `a` and `b` in slots 0 and 1, and a local `item`
/// in slot 2.
fn vars() -> LocalVariableManager {
    let mut vars = LocalVariableManager::new("ns.t");
    vars.enter_scope();
    vars.declare("a", VarType::Unknown, SlotKind::Param).unwrap();
    vars.declare("b", VarType::Unknown, SlotKind::Param).unwrap();
    vars.enter_scope();
    vars.declare("item", VarType::Unknown, SlotKind::Local).unwrap();
    vars
}

fn instance(vars: &LocalVariableManager, expr: &Expr) -> ValueProcedure {
    ExprCompiler::new(vars)
        .compile(expr, ExprMode::Instance)
        .unwrap()
}

fn eval_with(
    expr: &Expr,
    locals: &[Local],
    injected: &Record,
) -> Result<Step<Value>, RenderError> {
    let vars = vars();
    let procedure = instance(&vars, expr);
    let ctx = RenderContext::isolated();
    let unit = Weak::new();
    let scope = EvalScope {
        locals,
        injected,
        ctx: &ctx,
        unit: &unit,
        template: "ns.t",
    };
    procedure.eval(&scope)
}

fn eval(expr: &Expr, locals: &[Local]) -> Value {
    match eval_with(expr, locals, &Record::new()).unwrap() {
        Step::Ready(value) => value,
        Step::Suspend(reason) => panic!("unexpected suspension: {reason:?}"),
    }
}

fn eval_err(expr: &Expr) -> RenderError {
    eval_with(expr, &[], &Record::new()).unwrap_err()
}

fn locals(a: impl Into<Value>, b: impl Into<Value>) -> Vec<Local> {
    vec![Local::Value(a.into()), Local::Value(b.into()), Local::Unset]
}

// Compilation

#[test]
fn test_constant_subtrees_fold() {
    let vars = vars();
    let expr = Expr::binary(
        BinaryOp::Add,
        Expr::int(1),
        Expr::binary(BinaryOp::Mul, Expr::int(2), Expr::int(3)),
    );
    assert_eq!(instance(&vars, &expr).as_constant(), Some(&Value::Int(7)));

    let list = Expr::List(vec![Expr::str("x"), Expr::bool(true)]);
    assert_eq!(
        instance(&vars, &list).as_constant(),
        Some(&Value::list([Value::string("x"), Value::Bool(true)]))
    );
}

#[test]
fn test_variable_reads_do_not_fold() {
    let vars = vars();
    let expr = Expr::binary(BinaryOp::Add, Expr::param("a"), Expr::int(1));
    assert!(instance(&vars, &expr).as_constant().is_none());
}

#[test]
fn test_failing_constant_is_left_for_render_time() {
    let vars = vars();
    let expr = Expr::binary(BinaryOp::Add, Expr::int(i64::MAX), Expr::int(1));
    assert!(instance(&vars, &expr).as_constant().is_none());
    assert!(matches!(eval_err(&expr), RenderError::Data(_)));
}

#[test]
fn test_constant_mode_requires_a_constant() {
    let vars = vars();
    let compiler = ExprCompiler::new(&vars);
    let owner = ExprMode::Constant { owner: "size" };

    let folded = compiler.compile(&Expr::int(4), owner).unwrap();
    assert_eq!(folded.into_constant(), Some(Value::Int(4)));

    let err = compiler.compile(&Expr::param("a"), owner).unwrap_err();
    assert_eq!(
        err,
        CompileError::DefaultRequiresSuspension {
            template: "ns.t".to_owned(),
            name: "size".to_owned(),
        }
    );
    assert!(compiler.compile(&Expr::template("ns.other"), owner).is_err());
}

#[test]
fn test_unresolved_variable_is_internal_error() {
    let vars = vars();
    let err = ExprCompiler::new(&vars)
        .compile(&Expr::local("missing"), ExprMode::Instance)
        .unwrap_err();
    assert!(matches!(err, CompileError::Internal(_)));

    // A param name does not resolve as a local.
    assert!(ExprCompiler::new(&vars)
        .compile(&Expr::local("a"), ExprMode::Instance)
        .is_err());
}

// Evaluation

#[test]
fn test_reads_slots() {
    let expr = Expr::binary(BinaryOp::Mul, Expr::param("a"), Expr::param("b"));
    assert_eq!(eval(&expr, &locals(6i64, 7i64)), Value::Int(42));
}

#[test]
fn test_unset_slot_is_internal_error() {
    let err = eval_with(&Expr::local("item"), &locals(1i64, 2i64), &Record::new()).unwrap_err();
    assert!(matches!(err, RenderError::Internal(_)));
}

#[test]
fn test_undeclared_injected_reads_ij_record() {
    let injected = Record::new().with("locale", "en");
    let step = eval_with(&Expr::injected("locale"), &[], &injected).unwrap();
    assert_eq!(step, Step::Ready(Value::string("en")));
    let missing = eval_with(&Expr::injected("other"), &[], &injected).unwrap();
    assert_eq!(missing, Step::Ready(Value::Null));
}

#[test]
fn test_and_or_short_circuit() {
    // The right side would fail if evaluated.
    let bad = Expr::field(Expr::param("a"), "x");
    let and = Expr::binary(BinaryOp::And, Expr::param("b"), bad.clone());
    let or = Expr::binary(BinaryOp::Or, Expr::param("a"), bad);
    assert_eq!(eval(&and, &locals(1i64, false)), Value::Bool(false));
    assert_eq!(eval(&or, &locals(1i64, false)), Value::Bool(true));
}

#[test]
fn test_null_coalesce() {
    let expr = Expr::binary(BinaryOp::NullCoalesce, Expr::param("a"), Expr::param("b"));
    assert_eq!(eval(&expr, &locals(Value::Null, "fallback")), Value::string("fallback"));
    assert_eq!(eval(&expr, &locals(0i64, "fallback")), Value::Int(0));
}

#[test]
fn test_arithmetic_rules() {
    let add = Expr::binary(BinaryOp::Add, Expr::param("a"), Expr::param("b"));
    assert_eq!(eval(&add, &locals(1i64, 2.5)), Value::Float(3.5));
    assert_eq!(eval(&add, &locals("n=", 3i64)), Value::string("n=3"));

    let div = Expr::binary(BinaryOp::Div, Expr::param("a"), Expr::param("b"));
    assert_eq!(eval(&div, &locals(7i64, 2i64)), Value::Float(3.5));

    let rem = Expr::binary(BinaryOp::Mod, Expr::param("a"), Expr::param("b"));
    assert_eq!(eval(&rem, &locals(7i64, 3i64)), Value::Int(1));
    let err = eval_with(&rem, &locals(7i64, 0i64), &Record::new()).unwrap_err();
    assert!(matches!(err, RenderError::Data(_)));

    let neg = Expr::unary(UnaryOp::Neg, Expr::param("a"));
    assert_eq!(eval(&neg, &locals(5i64, 0i64)), Value::Int(-5));
}

#[test]
fn test_comparisons() {
    let lt = Expr::binary(BinaryOp::Lt, Expr::param("a"), Expr::param("b"));
    assert_eq!(eval(&lt, &locals(1i64, 1.5)), Value::Bool(true));
    assert_eq!(eval(&lt, &locals("b", "a")), Value::Bool(false));
    let err = eval_with(&lt, &locals(1i64, "a"), &Record::new()).unwrap_err();
    assert!(matches!(err, RenderError::Data(_)));

    let eq = Expr::binary(BinaryOp::Eq, Expr::param("a"), Expr::param("b"));
    assert_eq!(eval(&eq, &locals(2i64, 2.0)), Value::Bool(true));
}

#[test]
fn test_field_and_index_access() {
    let record = Record::new().with("name", "Ada");
    let field = Expr::field(Expr::param("a"), "name");
    assert_eq!(eval(&field, &locals(record.clone(), 0i64)), Value::string("Ada"));

    let safe = Expr::null_safe_field(Expr::param("a"), "name");
    assert_eq!(eval(&safe, &locals(Value::Null, 0i64)), Value::Null);
    let unsafe_read = eval_with(&field, &locals(Value::Null, 0i64), &Record::new()).unwrap_err();
    assert!(matches!(unsafe_read, RenderError::Data(_)));

    let list = Value::list([Value::Int(10), Value::Int(20)]);
    let index = Expr::index(Expr::param("a"), Expr::param("b"));
    assert_eq!(eval(&index, &locals(list.clone(), 1i64)), Value::Int(20));
    assert_eq!(eval(&index, &locals(list, 5i64)), Value::Null);
    assert_eq!(eval(&index, &locals(record, "name")), Value::string("Ada"));
}

#[test]
fn test_builtins() {
    let len = Expr::builtin(BuiltinFn::Length, vec![Expr::param("a")]);
    assert_eq!(eval(&len, &locals("héllo", 0i64)), Value::Int(5));
    assert_eq!(
        eval(&len, &locals(Value::list([Value::Null]), 0i64)),
        Value::Int(1)
    );
    let nonnull = Expr::builtin(BuiltinFn::IsNonnull, vec![Expr::param("a")]);
    assert_eq!(eval(&nonnull, &locals(Value::Null, 0i64)), Value::Bool(false));
    let str_of = Expr::builtin(BuiltinFn::Str, vec![Expr::param("a")]);
    assert_eq!(eval(&str_of, &locals(12i64, 0i64)), Value::string("12"));
    assert!(matches!(
        eval_with(&len, &locals(3i64, 0i64), &Record::new()).unwrap_err(),
        RenderError::Data(_)
    ));
}

#[test]
fn test_lazy_value_suspends_until_ready() {
    let lazy = LazyValue::new(DeferredValue::new(5i64, 1));
    let expr = Expr::binary(BinaryOp::Add, Expr::param("a"), Expr::int(1));
    let slots = locals(lazy, 0i64);

    let first = eval_with(&expr, &slots, &Record::new()).unwrap();
    assert_eq!(first, Step::Suspend(SuspendReason::ValueNotReady));
    let second = eval_with(&expr, &slots, &Record::new()).unwrap();
    assert_eq!(second, Step::Ready(Value::Int(6)));
}

#[test]
fn test_eval_unforced_passes_lazy_through() {
    let provider = Arc::new(DeferredValue::new(5i64, 3));
    let lazy = LazyValue::from_arc(provider.clone());
    let vars = vars();
    let procedure = instance(&vars, &Expr::param("a"));
    let ctx = RenderContext::isolated();
    let unit = Weak::new();
    let slots = locals(lazy.clone(), 0i64);
    let scope = EvalScope {
        locals: &slots,
        injected: &Record::new(),
        ctx: &ctx,
        unit: &unit,
        template: "ns.t",
    };

    let step = procedure.eval_unforced(&scope).unwrap();
    assert_eq!(step, Step::Ready(Value::Lazy(lazy)));
    assert_eq!(provider.forces(), 0);
}

#[test]
fn test_template_literal_without_unit_is_internal_error() {
    let err = eval_err(&Expr::template("ns.other"));
    assert!(err.is_fatal());
}
