//! Property-based tests for suspend/resume.
//!
//! For any pause schedule and any mix of lazy values, rendering to
//! completion produces exactly the output of an uninterrupted render, with
//! every write performed once.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Tests can panic and use unwrap for brevity"
)]

use proptest::prelude::*;
use vellum_codegen::{CompiledUnit, UnitCompiler};
use vellum_ir::{CallData, CallNode, Expr, Node, Template, TemplateFile, TemplateParam};
use vellum_runtime::testing::{render_to_completion, DeferredValue, ThrottledSink};
use vellum_runtime::{
    BufferSink, LazyValue, Record, RenderContext, Renderable, SuspendReason, Value,
};

// -- Fixture --

/// `ns.Page` prints a heading, then calls `ns.Row` for every item.
fn unit() -> CompiledUnit {
    let row = Template::new("ns.Row")
        .with_param(TemplateParam::required("item"))
        .with_param(TemplateParam::required("suffix"))
        .with_body(vec![
            Node::text("<li>"),
            Node::print(Expr::param("item")),
            Node::print(Expr::param("suffix")),
            Node::text("</li>"),
        ]);
    let page = Template::new("ns.Page")
        .with_param(TemplateParam::required("title"))
        .with_param(TemplateParam::required("items"))
        .with_param(TemplateParam::optional("suffix").with_default(Expr::str("")))
        .with_body(vec![
            Node::text("<h1>"),
            Node::print(Expr::param("title")),
            Node::text("</h1><ul>"),
            Node::for_each(
                "item",
                Expr::param("items"),
                vec![CallNode::template("ns.Row")
                    .with_data(CallData::All)
                    .with_param("item", Expr::local("item"))
                    .into()],
            ),
            Node::text("</ul>"),
        ]);
    let file = TemplateFile::new("ns").with_template(page).with_template(row);
    UnitCompiler::new().file(file).compile().unwrap()
}

/// Wraps `value` in a provider that reports not-ready `pending` times.
fn maybe_lazy(value: Value, pending: usize) -> Value {
    if pending == 0 {
        value
    } else {
        Value::Lazy(LazyValue::new(DeferredValue::new(value, pending)))
    }
}

fn params(title: &str, items: &[(String, usize)], suffix_pending: usize) -> Record {
    let items = items
        .iter()
        .map(|(text, pending)| maybe_lazy(Value::string(text.as_str()), *pending));
    Record::new()
        .with("title", title)
        .with("items", Value::list(items))
        .with("suffix", maybe_lazy(Value::string("."), suffix_pending))
}

fn reference(title: &str, items: &[(String, usize)]) -> (String, usize) {
    let unit = unit();
    let page = unit.template("ns.Page").unwrap();
    let plain: Vec<_> = items.iter().map(|(text, _)| (text.clone(), 0)).collect();
    let mut sink = ThrottledSink::new(std::iter::empty::<usize>());
    let suspensions = render_to_completion(
        &*page,
        &params(title, &plain, 0),
        &Record::new(),
        &mut sink,
        &RenderContext::isolated(),
    )
    .unwrap();
    assert_eq!(suspensions, 0);
    (sink.as_str().to_owned(), sink.writes())
}

// -- Strategies --

fn word() -> impl Strategy<Value = String> {
    "[a-z<&]{0,6}"
}

fn items() -> impl Strategy<Value = Vec<(String, usize)>> {
    prop::collection::vec((word(), 0..3usize), 0..5)
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, ..ProptestConfig::default() })]

    // -- Resume equivalence --

    #[test]
    fn prop_pause_anywhere_matches_uninterrupted(
        title in word(),
        items in items(),
        pauses in prop::collection::btree_set(0..24usize, 0..6),
    ) {
        let (expected, writes) = reference(&title, &items);

        let unit = unit();
        let page = unit.template("ns.Page").unwrap();
        let mut sink = ThrottledSink::new(pauses.iter().copied());
        let suspensions = render_to_completion(
            &*page,
            &params(&title, &items, 0),
            &Record::new(),
            &mut sink,
            &RenderContext::isolated(),
        )
        .unwrap();

        prop_assert_eq!(sink.as_str(), expected.as_str());
        prop_assert_eq!(sink.writes(), writes);
        let reachable = pauses.iter().filter(|&&at| at < writes).count();
        prop_assert_eq!(suspensions, reachable + items.iter().map(|(_, n)| n).sum::<usize>());
    }

    #[test]
    fn prop_lazy_values_match_uninterrupted(
        title in word(),
        items in items(),
        suffix_pending in 0..3usize,
    ) {
        let (expected, writes) = reference(&title, &items);

        let unit = unit();
        let page = unit.template("ns.Page").unwrap();
        let params = params(&title, &items, suffix_pending);
        let ctx = RenderContext::isolated();
        let mut sink = ThrottledSink::new(std::iter::empty::<usize>());
        let mut outcome = page.render(&params, &Record::new(), &mut sink, &ctx).unwrap();
        while let Some(state) = outcome.resume_state() {
            prop_assert_eq!(state.reason(), SuspendReason::ValueNotReady);
            outcome = page.resume(&outcome, &params, &Record::new(), &mut sink, &ctx).unwrap();
        }

        prop_assert_eq!(sink.as_str(), expected.as_str());
        prop_assert_eq!(sink.writes(), writes);
    }

    // -- Suspended states --

    #[test]
    fn prop_every_state_resumes_once(pause in 0..12usize) {
        let items = vec![("a".to_owned(), 0), ("b".to_owned(), 0)];
        let unit = unit();
        let page = unit.template("ns.Page").unwrap();
        let params = params("t", &items, 0);
        let ctx = RenderContext::isolated();
        let mut sink = ThrottledSink::new([pause]);

        let first = page.render(&params, &Record::new(), &mut sink, &ctx).unwrap();
        if let Some(state) = first.resume_state() {
            prop_assert_eq!(state.reason(), SuspendReason::SinkNotReady);
            let second = page.resume(&first, &params, &Record::new(), &mut sink, &ctx).unwrap();
            prop_assert!(second.is_done());
            prop_assert!(state.is_consumed());
            prop_assert!(page.resume(&first, &params, &Record::new(), &mut sink, &ctx).is_err());
        }

        let mut plain = BufferSink::new();
        page.render(&params, &Record::new(), &mut plain, &ctx).unwrap();
        prop_assert_eq!(sink.as_str(), plain.as_str());
        prop_assert_eq!(ctx.call_depth(), 0);
    }
}
