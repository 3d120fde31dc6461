//! Templates, their headers, and files.

use super::{Expr, Node};
use crate::SanitizedContentKind;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    #[default]
    Public,
    /// Callable only from templates in the same file.
    Private,
}

/// Declared type of a parameter, state variable or local.
///
/// The code generator does not type-check; it records types for slot
/// layouts and diagnostics.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum VarType {
    #[default]
    Unknown,
    Null,
    Bool,
    Int,
    Float,
    String,
    List,
    Record,
    Content(SanitizedContentKind),
    Template,
    Ve,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TemplateParam {
    pub name: String,
    pub required: bool,
    /// Read from the injected-parameters record rather than `params`.
    pub injected: bool,
    pub default: Option<Expr>,
    pub ty: VarType,
}

impl TemplateParam {
    pub fn required(name: impl Into<String>) -> Self {
        TemplateParam {
            name: name.into(),
            required: true,
            injected: false,
            default: None,
            ty: VarType::Unknown,
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        TemplateParam {
            required: false,
            ..TemplateParam::required(name)
        }
    }

    pub fn injected(name: impl Into<String>) -> Self {
        TemplateParam {
            injected: true,
            ..TemplateParam::optional(name)
        }
    }

    #[must_use]
    pub fn with_default(mut self, default: Expr) -> Self {
        self.default = Some(default);
        self
    }

    #[must_use]
    pub fn with_type(mut self, ty: VarType) -> Self {
        self.ty = ty;
        self
    }
}

/// A template-scoped state variable with a constant initializer.
#[derive(Clone, Debug, PartialEq)]
pub struct TemplateStateVar {
    pub name: String,
    pub ty: VarType,
    pub initial_value: Expr,
}

impl TemplateStateVar {
    pub fn new(name: impl Into<String>, initial_value: Expr) -> Self {
        TemplateStateVar {
            name: name.into(),
            ty: VarType::Unknown,
            initial_value,
        }
    }
}

/// Identity of a delegate implementation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DelegateInfo {
    pub package: Option<String>,
    pub name: String,
    /// Empty for the default implementation.
    pub variant: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Template {
    /// Fully-qualified name.
    pub name: String,
    pub visibility: Visibility,
    pub content_kind: SanitizedContentKind,
    pub params: Vec<TemplateParam>,
    pub state_vars: Vec<TemplateStateVar>,
    pub body: Vec<Node>,
    /// Css namespaces required by this template, in declaration order.
    pub required_css: Vec<String>,
    pub delegate: Option<DelegateInfo>,
}

impl Template {
    pub fn new(name: impl Into<String>) -> Self {
        Template {
            name: name.into(),
            visibility: Visibility::Public,
            content_kind: SanitizedContentKind::Html,
            params: Vec::new(),
            state_vars: Vec::new(),
            body: Vec::new(),
            required_css: Vec::new(),
            delegate: None,
        }
    }

    /// A delegate implementation. The template's own name is derived from
    /// the delegate name and variant so every implementation is distinct.
    pub fn delegate(package: Option<&str>, name: &str, variant: &str) -> Self {
        let mut full = name.to_owned();
        if let Some(package) = package {
            full = format!("{package}::{full}");
        }
        if !variant.is_empty() {
            full = format!("{full}:{variant}");
        }
        Template {
            delegate: Some(DelegateInfo {
                package: package.map(str::to_owned),
                name: name.to_owned(),
                variant: variant.to_owned(),
            }),
            ..Template::new(full)
        }
    }

    #[must_use]
    pub fn private(mut self) -> Self {
        self.visibility = Visibility::Private;
        self
    }

    #[must_use]
    pub fn with_kind(mut self, kind: SanitizedContentKind) -> Self {
        self.content_kind = kind;
        self
    }

    #[must_use]
    pub fn with_param(mut self, param: TemplateParam) -> Self {
        self.params.push(param);
        self
    }

    #[must_use]
    pub fn with_state(mut self, state: TemplateStateVar) -> Self {
        self.state_vars.push(state);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Vec<Node>) -> Self {
        self.body = body;
        self
    }

    #[must_use]
    pub fn require_css(mut self, namespace: impl Into<String>) -> Self {
        self.required_css.push(namespace.into());
        self
    }
}

/// A source file: the unit css requirements are inherited from.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct TemplateFile {
    pub namespace: String,
    pub required_css: Vec<String>,
    pub templates: Vec<Template>,
}

impl TemplateFile {
    pub fn new(namespace: impl Into<String>) -> Self {
        TemplateFile {
            namespace: namespace.into(),
            required_css: Vec::new(),
            templates: Vec::new(),
        }
    }

    #[must_use]
    pub fn require_css(mut self, namespace: impl Into<String>) -> Self {
        self.required_css.push(namespace.into());
        self
    }

    #[must_use]
    pub fn with_template(mut self, template: Template) -> Self {
        self.templates.push(template);
        self
    }
}
