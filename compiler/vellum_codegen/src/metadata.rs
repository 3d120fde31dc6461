//! Collects [`TemplateMetadata`] from a template tree.

use rustc_hash::FxHashSet;
use vellum_ir::visitor::{walk_call, walk_expr, Visitor};
use vellum_ir::{
    CallNode, CallTarget, ContentKind, DelegateMetadata, Expr, Template, TemplateFile,
    TemplateMetadata, VarRef,
};

/// Names in first-seen order, without duplicates.
#[derive(Default)]
struct OrderedNames {
    seen: FxHashSet<String>,
    names: Vec<String>,
}

impl OrderedNames {
    fn insert(&mut self, name: &str) {
        if !self.seen.contains(name) {
            self.seen.insert(name.to_owned());
            self.names.push(name.to_owned());
        }
    }
}

struct Collector<'t> {
    /// Params declared `@inject`; reading one by name counts as an
    /// injected read.
    injected_decls: FxHashSet<&'t str>,
    injected: OrderedNames,
    callees: OrderedNames,
    delegate_callees: OrderedNames,
}

impl<'ast> Visitor<'ast> for Collector<'ast> {
    fn visit_call(&mut self, call: &'ast CallNode) {
        match &call.target {
            CallTarget::Template(name) => self.callees.insert(name),
            CallTarget::Delegate { name, .. } => self.delegate_callees.insert(name),
        }
        walk_call(self, call);
    }

    fn visit_expr(&mut self, expr: &'ast Expr) {
        match expr {
            Expr::Var(VarRef::Injected(name)) => self.injected.insert(name),
            Expr::Var(VarRef::Param(name)) if self.injected_decls.contains(name.as_str()) => {
                self.injected.insert(name);
            }
            Expr::TemplateLiteral(name) => self.callees.insert(name),
            _ => {}
        }
        walk_expr(self, expr);
    }
}

pub(crate) fn collect(file: &TemplateFile, template: &Template) -> TemplateMetadata {
    let mut collector = Collector {
        injected_decls: template
            .params
            .iter()
            .filter(|p| p.injected)
            .map(|p| p.name.as_str())
            .collect(),
        injected: OrderedNames::default(),
        callees: OrderedNames::default(),
        delegate_callees: OrderedNames::default(),
    };
    collector.visit_template(template);

    let mut css = OrderedNames::default();
    for namespace in file.required_css.iter().chain(&template.required_css) {
        css.insert(namespace);
    }

    let delegate = template
        .delegate
        .as_ref()
        .map(|info| DelegateMetadata {
            package: info.package.clone().unwrap_or_default(),
            name: info.name.clone(),
            variant: info.variant.clone(),
        })
        .unwrap_or_default();

    TemplateMetadata {
        name: template.name.clone(),
        content_kind: ContentKind::from(template.content_kind),
        visibility: template.visibility,
        css_namespaces: css.names,
        injected_params: collector.injected.names,
        callees: collector.callees.names,
        delegate_callees: collector.delegate_callees.names,
        delegate,
    }
}
