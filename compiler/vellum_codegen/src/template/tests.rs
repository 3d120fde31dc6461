#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use std::io;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use vellum_ir::{
    BinaryOp, BuiltinFn, CallData, CallNode, Expr, ForNode, IfBranch, IfNode, Node,
    SanitizedContentKind, SwitchCase, SwitchNode, Template, TemplateFile, TemplateParam,
    TemplateStateVar,
};
use vellum_runtime::testing::{render_string, render_to_completion, ThrottledSink};
use vellum_runtime::{BufferSink, Readiness, RenderOutcome, SuspendReason, Value};

use super::*;
use crate::{CompileError, CompiledUnit, TemplateRegistry, UnitCompiler};

// Test Helpers

fn unit(templates: Vec<Template>) -> CompiledUnit {
    let file = templates
        .into_iter()
        .fold(TemplateFile::new("ns"), TemplateFile::with_template);
    UnitCompiler::new().file(file).compile().unwrap()
}

fn render_in(
    unit: &CompiledUnit,
    name: &str,
    params: &Record,
    ctx: &RenderContext,
) -> Result<String, RenderError> {
    let template = unit.template(name).unwrap();
    render_string(&*template, params, &Record::new(), ctx)
}

fn render(unit: &CompiledUnit, name: &str, params: &Record) -> String {
    render_in(unit, name, params, &RenderContext::isolated()).unwrap()
}

/// Always ready when polled, but asks for a pause after every append.
#[derive(Default)]
struct AppendBackpressureSink {
    buffer: String,
    writes: usize,
}

impl Sink for AppendBackpressureSink {
    fn poll_ready(&mut self) -> Readiness {
        Readiness::Ready
    }

    fn append(&mut self, content: &str) -> io::Result<Readiness> {
        self.buffer.push_str(content);
        self.writes += 1;
        Ok(Readiness::NotReady)
    }
}

fn for_each(var: &str, items: Expr, body: Vec<Node>) -> ForNode {
    ForNode {
        var: var.to_owned(),
        index_var: None,
        items,
        body,
        if_empty: None,
    }
}

// Header bindings

#[test]
fn test_text_and_prints() {
    let unit = unit(vec![Template::new("ns.hello")
        .with_param(TemplateParam::required("name"))
        .with_body(vec![
            Node::text("Hello, "),
            Node::print(Expr::param("name")),
            Node::text("!"),
        ])]);
    let params = Record::new().with("name", "World");
    assert_eq!(render(&unit, "ns.hello", &params), "Hello, World!");
}

#[test]
fn test_defaults_apply_to_missing_and_null_params() {
    let unit = unit(vec![Template::new("ns.greet")
        .with_param(TemplateParam::optional("who").with_default(Expr::str("friend")))
        .with_body(vec![Node::print(Expr::param("who"))])]);
    assert_eq!(render(&unit, "ns.greet", &Record::new()), "friend");
    assert_eq!(
        render(&unit, "ns.greet", &Record::new().with("who", Value::Null)),
        "friend"
    );
    assert_eq!(render(&unit, "ns.greet", &Record::new().with("who", "Ada")), "Ada");
}

#[test]
fn test_missing_required_param_reads_as_null() {
    let unit = unit(vec![Template::new("ns.t")
        .with_param(TemplateParam::required("x"))
        .with_body(vec![Node::if_else(
            Expr::builtin(BuiltinFn::IsNonnull, vec![Expr::param("x")]),
            vec![Node::text("set")],
            Some(vec![Node::text("unset")]),
        )])]);
    assert_eq!(render(&unit, "ns.t", &Record::new()), "unset");
}

#[test]
fn test_state_and_injected_params() {
    let unit = unit(vec![Template::new("ns.t")
        .with_param(TemplateParam::injected("locale"))
        .with_state(TemplateStateVar::new(
            "count",
            Expr::binary(BinaryOp::Mul, Expr::int(6), Expr::int(7)),
        ))
        .with_body(vec![
            Node::print(Expr::state("count")),
            Node::text(" "),
            Node::print(Expr::injected("locale")),
        ])]);
    let template = unit.template("ns.t").unwrap();
    let injected = Record::new().with("locale", "fr");
    let text = render_string(&*template, &Record::new(), &injected, &RenderContext::isolated());
    assert_eq!(text.unwrap(), "42 fr");
}

#[test]
fn test_ij_read_ignores_regular_param_of_same_name() {
    let unit = unit(vec![Template::new("ns.t")
        .with_param(TemplateParam::required("foo"))
        .with_body(vec![
            Node::print(Expr::injected("foo")),
            Node::text(" "),
            Node::print(Expr::param("foo")),
        ])]);
    let template = unit.template("ns.t").unwrap();
    let params = Record::new().with("foo", "from-params");
    let injected = Record::new().with("foo", "from-ij");
    let text = render_string(&*template, &params, &injected, &RenderContext::isolated());
    assert_eq!(text.unwrap(), "from-ij from-params");
}

#[test]
fn test_non_constant_default_is_rejected() {
    let file = TemplateFile::new("ns").with_template(
        Template::new("ns.t")
            .with_param(TemplateParam::optional("a"))
            .with_param(TemplateParam::optional("b").with_default(Expr::param("a"))),
    );
    let err = UnitCompiler::new().file(file).compile().unwrap_err();
    assert_eq!(
        err,
        CompileError::DefaultRequiresSuspension {
            template: "ns.t".to_owned(),
            name: "b".to_owned(),
        }
    );
}

// Control flow

#[test]
fn test_if_elseif_else() {
    let body = vec![Node::If(IfNode {
        branches: vec![
            IfBranch {
                cond: Expr::binary(BinaryOp::Lt, Expr::param("n"), Expr::int(0)),
                body: vec![Node::text("negative")],
            },
            IfBranch {
                cond: Expr::binary(BinaryOp::Eq, Expr::param("n"), Expr::int(0)),
                body: vec![Node::text("zero")],
            },
        ],
        else_body: Some(vec![Node::text("positive")]),
    })];
    let unit = unit(vec![Template::new("ns.sign")
        .with_param(TemplateParam::required("n"))
        .with_body(body)]);
    let sign = |n: i64| render(&unit, "ns.sign", &Record::new().with("n", n));
    assert_eq!(sign(-3), "negative");
    assert_eq!(sign(0), "zero");
    assert_eq!(sign(9), "positive");
}

#[test]
fn test_switch_with_default() {
    let body = vec![Node::Switch(SwitchNode {
        value: Expr::param("c"),
        cases: vec![
            SwitchCase {
                values: vec![Expr::str("r"), Expr::str("red")],
                body: vec![Node::text("#f00")],
            },
            SwitchCase {
                values: vec![Expr::str("g")],
                body: vec![Node::text("#0f0")],
            },
        ],
        default: Some(vec![Node::text("?")]),
    })];
    let unit = unit(vec![Template::new("ns.color")
        .with_param(TemplateParam::required("c"))
        .with_body(body)]);
    let color = |c: &str| render(&unit, "ns.color", &Record::new().with("c", c));
    assert_eq!(color("red"), "#f00");
    assert_eq!(color("g"), "#0f0");
    assert_eq!(color("b"), "?");
}

#[test]
fn test_for_with_index_and_ifempty() {
    let body = vec![Node::For(
        for_each(
            "item",
            Expr::param("items"),
            vec![
                Node::print(Expr::local("i")),
                Node::text("="),
                Node::print(Expr::local("item")),
                Node::text(";"),
            ],
        )
        .with_index("i")
        .with_if_empty(vec![Node::text("empty")]),
    )];
    let unit = unit(vec![Template::new("ns.list")
        .with_param(TemplateParam::required("items"))
        .with_body(body)]);

    let items = Value::list([Value::string("a"), Value::string("b")]);
    assert_eq!(
        render(&unit, "ns.list", &Record::new().with("items", items)),
        "0=a;1=b;"
    );
    let none = Value::list([]);
    assert_eq!(render(&unit, "ns.list", &Record::new().with("items", none)), "empty");

    let err = render_in(
        &unit,
        "ns.list",
        &Record::new().with("items", 3i64),
        &RenderContext::isolated(),
    )
    .unwrap_err();
    assert!(matches!(err, RenderError::Data(_)));
}

#[test]
fn test_let_content_kinds() {
    let unit = unit(vec![Template::new("ns.t").with_body(vec![
        Node::let_content("plain", SanitizedContentKind::Text, vec![Node::text("a<b")]),
        Node::let_value("copy", Expr::local("plain")),
        Node::print(Expr::binary(BinaryOp::Add, Expr::local("copy"), Expr::str("!"))),
    ])]);
    assert_eq!(render(&unit, "ns.t", &Record::new()), "a<b!");
}

// Calls

#[test]
fn test_call_within_unit_binds_directly() {
    let unit = unit(vec![
        Template::new("ns.outer").with_body(vec![
            Node::text("["),
            CallNode::template("ns.inner")
                .with_data(CallData::All)
                .with_param("b", Expr::str("B"))
                .into(),
            Node::text("]"),
        ]),
        Template::new("ns.inner")
            .private()
            .with_param(TemplateParam::required("a"))
            .with_param(TemplateParam::required("b"))
            .with_body(vec![Node::print(Expr::param("a")), Node::print(Expr::param("b"))]),
    ]);
    let outer = unit.template("ns.outer").unwrap();
    assert_eq!(outer.call_sites().collect::<Vec<_>>(), vec![("ns.inner", None)]);

    let params = Record::new().with("a", "A").with("b", "overridden");
    assert_eq!(render(&unit, "ns.outer", &params), "[AB]");
    assert_eq!(
        outer.call_sites().collect::<Vec<_>>(),
        vec![("ns.inner", Some(BindingKind::Direct))]
    );
}

#[test]
fn test_call_outside_unit_needs_the_context() {
    let unit = unit(vec![Template::new("ns.t")
        .with_body(vec![CallNode::template("other.t").into()])]);
    let err = render_in(&unit, "ns.t", &Record::new(), &RenderContext::isolated()).unwrap_err();
    assert!(matches!(err, RenderError::TemplateNotFound { .. }));

    let other = UnitCompiler::new()
        .file(
            TemplateFile::new("other")
                .with_template(Template::new("other.t").with_body(vec![Node::text("found")])),
        )
        .compile()
        .unwrap();
    let registry = TemplateRegistry::new();
    registry.load(other);
    let ctx = RenderContext::new(Arc::new(registry));
    assert_eq!(render_in(&unit, "ns.t", &Record::new(), &ctx).unwrap(), "found");
    let template = unit.template("ns.t").unwrap();
    let sites: Vec<_> = template.call_sites().collect();
    assert_eq!(sites, vec![("other.t", Some(BindingKind::Fallback))]);
}

#[test]
fn test_template_outliving_its_unit_cannot_call() {
    let unit = unit(vec![
        Template::new("ns.a").with_body(vec![CallNode::template("ns.b").into()]),
        Template::new("ns.b").with_body(vec![Node::text("b")]),
    ]);
    let a = unit.template("ns.a").unwrap();
    drop(unit);

    let err = render_string(&*a, &Record::new(), &Record::new(), &RenderContext::isolated())
        .unwrap_err();
    assert!(err.is_fatal());
}

#[test]
fn test_call_with_content_param() {
    let unit = unit(vec![
        Template::new("ns.card").with_body(vec![CallNode::template("ns.frame")
            .with_content_param("body", SanitizedContentKind::Html, vec![Node::text("<p>hi</p>")])
            .into()]),
        Template::new("ns.frame")
            .with_param(TemplateParam::required("body"))
            .with_body(vec![
                Node::text("<div>"),
                Node::print(Expr::param("body")),
                Node::text("</div>"),
            ]),
    ]);
    assert_eq!(render(&unit, "ns.card", &Record::new()), "<div><p>hi</p></div>");
}

#[test]
fn test_delegate_calls() {
    let unit = unit(vec![
        Template::new("ns.page")
            .with_param(TemplateParam::optional("variant"))
            .with_body(vec![
                CallNode::delegate("ns.menu", Some(Expr::param("variant"))).into(),
                CallNode::delegate("ns.absent", None)
                    .allow_empty_default()
                    .into(),
            ]),
        Template::delegate(None, "ns.menu", "").with_body(vec![Node::text("default")]),
        Template::delegate(None, "ns.menu", "mobile").with_body(vec![Node::text("mobile")]),
    ]);
    let registry = TemplateRegistry::new();
    registry.load(unit.clone());
    let ctx = RenderContext::new(Arc::new(registry));

    let page = |variant: Value| {
        let params = Record::new().with("variant", variant);
        render_in(&unit, "ns.page", &params, &ctx).unwrap()
    };
    assert_eq!(page(Value::string("mobile")), "mobile");
    assert_eq!(page(Value::string("desktop")), "default");
    assert_eq!(page(Value::Null), "default");
}

#[test]
fn test_template_values_print_their_name() {
    let unit = unit(vec![
        Template::new("ns.a").with_body(vec![Node::print(Expr::template("ns.b"))]),
        Template::new("ns.b"),
    ]);
    assert_eq!(render(&unit, "ns.a", &Record::new()), "** ns.b **");
}

// Suspension

#[test]
fn test_sink_backpressure_suspends_and_resumes() {
    let unit = unit(vec![
        Template::new("ns.outer").with_body(vec![
            Node::text("a"),
            CallNode::template("ns.inner").into(),
            Node::text("d"),
        ]),
        Template::new("ns.inner").with_body(vec![
            Node::text("b"),
            Node::print(Expr::str("c")),
        ]),
    ]);
    let outer = unit.template("ns.outer").unwrap();
    let ctx = RenderContext::isolated();
    let mut sink = ThrottledSink::new([2]);

    let outcome = outer
        .render(&Record::new(), &Record::new(), &mut sink, &ctx)
        .unwrap();
    let RenderOutcome::Suspended(state) = &outcome else {
        panic!("render finished without suspending");
    };
    assert_eq!(state.reason(), SuspendReason::SinkNotReady);
    assert_eq!(state.depth(), 2);
    assert_eq!(sink.as_str(), "ab");

    let outcome = outer
        .resume(&outcome, &Record::new(), &Record::new(), &mut sink, &ctx)
        .unwrap();
    assert!(outcome.is_done());
    assert_eq!(sink.as_str(), "abcd");
    assert_eq!(ctx.call_depth(), 0);
}

#[test]
fn test_every_pause_position_renders_the_same_text() {
    let unit = unit(vec![Template::new("ns.t")
        .with_param(TemplateParam::required("items"))
        .with_body(vec![Node::For(for_each(
            "x",
            Expr::param("items"),
            vec![Node::print(Expr::local("x")), Node::text(",")],
        ))])]);
    let template = unit.template("ns.t").unwrap();
    let params = Record::new().with(
        "items",
        Value::list([Value::Int(1), Value::Int(2), Value::Int(3)]),
    );
    for pause in 0..6 {
        let mut sink = ThrottledSink::new([pause]);
        let ctx = RenderContext::isolated();
        let suspensions =
            render_to_completion(&*template, &params, &Record::new(), &mut sink, &ctx).unwrap();
        assert_eq!(suspensions, 1);
        assert_eq!(sink.as_str(), "1,2,3,");
        assert_eq!(sink.writes(), 6);
    }
}

#[test]
fn test_append_not_ready_suspends_before_next_write() {
    let unit = unit(vec![Template::new("ns.t").with_body(vec![
        Node::text("a"),
        Node::print(Expr::int(1)),
        Node::text("b"),
    ])]);
    let template = unit.template("ns.t").unwrap();
    let ctx = RenderContext::isolated();
    let mut sink = AppendBackpressureSink::default();

    let outcome = template
        .render(&Record::new(), &Record::new(), &mut sink, &ctx)
        .unwrap();
    let RenderOutcome::Suspended(state) = &outcome else {
        panic!("render ignored the sink's pause request");
    };
    assert_eq!(state.reason(), SuspendReason::SinkNotReady);
    assert_eq!(sink.buffer, "a");

    let outcome = template
        .resume(&outcome, &Record::new(), &Record::new(), &mut sink, &ctx)
        .unwrap();
    assert!(!outcome.is_done());
    assert_eq!(sink.buffer, "a1");

    let outcome = template
        .resume(&outcome, &Record::new(), &Record::new(), &mut sink, &ctx)
        .unwrap();
    assert!(outcome.is_done());
    assert_eq!(sink.buffer, "a1b");
    assert_eq!(sink.writes, 3);
}

#[test]
fn test_append_not_ready_inside_callee_pauses_caller() {
    let unit = unit(vec![
        Template::new("ns.outer").with_body(vec![
            CallNode::template("ns.inner").into(),
            Node::text("b"),
        ]),
        Template::new("ns.inner").with_body(vec![Node::text("a")]),
    ]);
    let outer = unit.template("ns.outer").unwrap();
    let ctx = RenderContext::isolated();
    let mut sink = AppendBackpressureSink::default();

    let suspensions =
        render_to_completion(&*outer, &Record::new(), &Record::new(), &mut sink, &ctx).unwrap();
    assert_eq!(suspensions, 1);
    assert_eq!(sink.buffer, "ab");
    assert_eq!(sink.writes, 2);

    // The hold left by the final write does not leak into the next render.
    let mut fresh = BufferSink::new();
    let outcome = outer
        .render(&Record::new(), &Record::new(), &mut fresh, &ctx)
        .unwrap();
    assert!(outcome.is_done());
}
