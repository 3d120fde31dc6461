//! Template tree visitor
//!
//! Read-only traversal over templates, nodes and expressions.
//!
//! # Design
//!
//! Default `visit_*` implementations call the matching `walk_*` function,
//! which visits children. Override a `visit_*` method to observe a node and
//! call the `walk_*` function to keep descending.
//!
//! # Example
//!
//! ```text
//! struct CountPrints {
//!     count: usize,
//! }
//!
//! impl<'ast> Visitor<'ast> for CountPrints {
//!     fn visit_node(&mut self, node: &'ast Node) {
//!         if matches!(node, Node::Print(_)) {
//!             self.count += 1;
//!         }
//!         walk_node(self, node);
//!     }
//! }
//! ```

use crate::ast::{
    CallData, CallNode, CallParam, CallTarget, Expr, LetNode, Node, Template, TemplateParam,
    TemplateStateVar,
};

pub trait Visitor<'ast> {
    fn visit_template(&mut self, template: &'ast Template) {
        walk_template(self, template);
    }

    fn visit_param(&mut self, param: &'ast TemplateParam) {
        if let Some(default) = &param.default {
            self.visit_expr(default);
        }
    }

    fn visit_state_var(&mut self, state: &'ast TemplateStateVar) {
        self.visit_expr(&state.initial_value);
    }

    fn visit_node(&mut self, node: &'ast Node) {
        walk_node(self, node);
    }

    fn visit_call(&mut self, call: &'ast CallNode) {
        walk_call(self, call);
    }

    fn visit_expr(&mut self, expr: &'ast Expr) {
        walk_expr(self, expr);
    }
}

// Walk Functions
//
// Children are visited depth-first in source order: header before body,
// conditions before the blocks they guard.

pub fn walk_template<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, template: &'ast Template) {
    for param in &template.params {
        visitor.visit_param(param);
    }
    for state in &template.state_vars {
        visitor.visit_state_var(state);
    }
    walk_body(visitor, &template.body);
}

pub fn walk_body<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, body: &'ast [Node]) {
    for node in body {
        visitor.visit_node(node);
    }
}

pub fn walk_node<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, node: &'ast Node) {
    match node {
        Node::RawText(_) => {}
        Node::Print(expr) | Node::Key(expr) => visitor.visit_expr(expr),
        Node::If(if_node) => {
            for branch in &if_node.branches {
                visitor.visit_expr(&branch.cond);
                walk_body(visitor, &branch.body);
            }
            if let Some(else_body) = &if_node.else_body {
                walk_body(visitor, else_body);
            }
        }
        Node::Switch(switch) => {
            visitor.visit_expr(&switch.value);
            for case in &switch.cases {
                for value in &case.values {
                    visitor.visit_expr(value);
                }
                walk_body(visitor, &case.body);
            }
            if let Some(default) = &switch.default {
                walk_body(visitor, default);
            }
        }
        Node::For(for_node) => {
            visitor.visit_expr(&for_node.items);
            walk_body(visitor, &for_node.body);
            if let Some(if_empty) = &for_node.if_empty {
                walk_body(visitor, if_empty);
            }
        }
        Node::Let(LetNode::Value { value, .. }) => visitor.visit_expr(value),
        Node::Let(LetNode::Content { body, .. }) => walk_body(visitor, body),
        Node::Call(call) => visitor.visit_call(call),
        Node::OpenTag(tag) => walk_body(visitor, &tag.children),
    }
}

pub fn walk_call<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, call: &'ast CallNode) {
    if let CallTarget::Delegate {
        variant: Some(variant),
        ..
    } = &call.target
    {
        visitor.visit_expr(variant);
    }
    if let CallData::Expr(data) = &call.data {
        visitor.visit_expr(data);
    }
    for param in &call.params {
        match param {
            CallParam::Value { value, .. } => visitor.visit_expr(value),
            CallParam::Content { body, .. } => walk_body(visitor, body),
        }
    }
}

pub fn walk_expr<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, expr: &'ast Expr) {
    match expr {
        Expr::Literal(_) | Expr::Var(_) | Expr::TemplateLiteral(_) | Expr::Ve { .. } => {}
        Expr::Binary { left, right, .. } => {
            visitor.visit_expr(left);
            visitor.visit_expr(right);
        }
        Expr::Unary { operand, .. } => visitor.visit_expr(operand),
        Expr::Conditional {
            cond,
            then_branch,
            else_branch,
        } => {
            visitor.visit_expr(cond);
            visitor.visit_expr(then_branch);
            visitor.visit_expr(else_branch);
        }
        Expr::List(items) | Expr::Builtin { args: items, .. } => {
            for item in items {
                visitor.visit_expr(item);
            }
        }
        Expr::Record(fields) => {
            for (_, value) in fields {
                visitor.visit_expr(value);
            }
        }
        Expr::Field { base, .. } => visitor.visit_expr(base),
        Expr::Index { base, index } => {
            visitor.visit_expr(base);
            visitor.visit_expr(index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{OpenTagNode, VarRef};
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct VarCollector {
        vars: Vec<String>,
    }

    impl<'ast> Visitor<'ast> for VarCollector {
        fn visit_expr(&mut self, expr: &'ast Expr) {
            if let Expr::Var(var) = expr {
                self.vars.push(var.name().to_owned());
            }
            walk_expr(self, expr);
        }
    }

    #[test]
    fn test_walk_visits_in_source_order() {
        let template = Template::new("ns.t")
            .with_param(TemplateParam::optional("a").with_default(Expr::local("d")))
            .with_body(vec![
                Node::print(Expr::param("a")),
                Node::if_else(
                    Expr::param("b"),
                    vec![Node::print(Expr::injected("c"))],
                    Some(vec![Node::print(Expr::state("e"))]),
                ),
                OpenTagNode::new("div", vec![Node::Key(Expr::local("k"))]).into(),
                CallNode::template("ns.callee")
                    .with_param("x", Expr::local("f"))
                    .into(),
            ]);

        let mut collector = VarCollector::default();
        collector.visit_template(&template);
        assert_eq!(collector.vars, vec!["d", "a", "b", "c", "e", "k", "f"]);
    }

    #[test]
    fn test_walk_descends_into_nested_exprs() {
        let expr = Expr::conditional(
            Expr::Var(VarRef::Param("p".to_owned())),
            Expr::field(Expr::local("r"), "x"),
            Expr::index(Expr::List(vec![Expr::local("l")]), Expr::int(0)),
        );
        let mut collector = VarCollector::default();
        collector.visit_expr(&expr);
        assert_eq!(collector.vars, vec!["p", "r", "l"]);
    }
}
