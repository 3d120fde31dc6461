//! Body nodes.

use super::Expr;
use crate::SanitizedContentKind;

/// A statement in a template body.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    RawText(String),
    Print(Expr),
    If(IfNode),
    Switch(SwitchNode),
    For(ForNode),
    Let(LetNode),
    Call(CallNode),
    OpenTag(OpenTagNode),
    /// `{key expr}`. Only meaningful as a direct child of an [`OpenTagNode`].
    Key(Expr),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::RawText(text.into())
    }

    pub fn print(expr: Expr) -> Self {
        Node::Print(expr)
    }

    pub fn let_value(name: impl Into<String>, value: Expr) -> Self {
        Node::Let(LetNode::Value {
            name: name.into(),
            value,
        })
    }

    pub fn let_content(name: impl Into<String>, kind: SanitizedContentKind, body: Vec<Node>) -> Self {
        Node::Let(LetNode::Content {
            name: name.into(),
            kind,
            body,
        })
    }

    pub fn if_else(cond: Expr, then_body: Vec<Node>, else_body: Option<Vec<Node>>) -> Self {
        Node::If(IfNode {
            branches: vec![IfBranch {
                cond,
                body: then_body,
            }],
            else_body,
        })
    }

    pub fn for_each(var: impl Into<String>, items: Expr, body: Vec<Node>) -> Self {
        Node::For(ForNode {
            var: var.into(),
            index_var: None,
            items,
            body,
            if_empty: None,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct IfBranch {
    pub cond: Expr,
    pub body: Vec<Node>,
}

/// `if` / `elseif`* / `else`?
#[derive(Clone, Debug, PartialEq)]
pub struct IfNode {
    pub branches: Vec<IfBranch>,
    pub else_body: Option<Vec<Node>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SwitchCase {
    pub values: Vec<Expr>,
    pub body: Vec<Node>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SwitchNode {
    pub value: Expr,
    pub cases: Vec<SwitchCase>,
    pub default: Option<Vec<Node>>,
}

/// `for var[, index_var] in items` with an optional `ifempty` block.
#[derive(Clone, Debug, PartialEq)]
pub struct ForNode {
    pub var: String,
    pub index_var: Option<String>,
    pub items: Expr,
    pub body: Vec<Node>,
    pub if_empty: Option<Vec<Node>>,
}

impl ForNode {
    #[must_use]
    pub fn with_index(mut self, name: impl Into<String>) -> Self {
        self.index_var = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_if_empty(mut self, body: Vec<Node>) -> Self {
        self.if_empty = Some(body);
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum LetNode {
    Value {
        name: String,
        value: Expr,
    },
    /// Renders `body` into a content value of `kind`.
    Content {
        name: String,
        kind: SanitizedContentKind,
        body: Vec<Node>,
    },
}

impl LetNode {
    pub fn name(&self) -> &str {
        match self {
            LetNode::Value { name, .. } | LetNode::Content { name, .. } => name,
        }
    }
}

/// Who a call renders.
#[derive(Clone, Debug, PartialEq)]
pub enum CallTarget {
    /// A basic template by fully-qualified name.
    Template(String),
    /// A delegate template, selected at render time by name and variant.
    Delegate {
        name: String,
        variant: Option<Expr>,
        /// Render nothing when no implementation is registered.
        allow_empty_default: bool,
    },
}

/// Where the callee's params record starts from.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum CallData {
    #[default]
    None,
    /// `data="all"`: the caller's own params record.
    All,
    /// `data="expr"`: a record-valued expression.
    Expr(Expr),
}

#[derive(Clone, Debug, PartialEq)]
pub enum CallParam {
    Value {
        name: String,
        value: Expr,
    },
    Content {
        name: String,
        kind: SanitizedContentKind,
        body: Vec<Node>,
    },
}

impl CallParam {
    pub fn name(&self) -> &str {
        match self {
            CallParam::Value { name, .. } | CallParam::Content { name, .. } => name,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CallNode {
    pub target: CallTarget,
    pub data: CallData,
    pub params: Vec<CallParam>,
}

impl CallNode {
    pub fn template(name: impl Into<String>) -> Self {
        CallNode {
            target: CallTarget::Template(name.into()),
            data: CallData::None,
            params: Vec::new(),
        }
    }

    pub fn delegate(name: impl Into<String>, variant: Option<Expr>) -> Self {
        CallNode {
            target: CallTarget::Delegate {
                name: name.into(),
                variant,
                allow_empty_default: false,
            },
            data: CallData::None,
            params: Vec::new(),
        }
    }

    #[must_use]
    pub fn allow_empty_default(mut self) -> Self {
        if let CallTarget::Delegate {
            allow_empty_default,
            ..
        } = &mut self.target
        {
            *allow_empty_default = true;
        }
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: CallData) -> Self {
        self.data = data;
        self
    }

    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: Expr) -> Self {
        self.params.push(CallParam::Value {
            name: name.into(),
            value,
        });
        self
    }

    #[must_use]
    pub fn with_content_param(
        mut self,
        name: impl Into<String>,
        kind: SanitizedContentKind,
        body: Vec<Node>,
    ) -> Self {
        self.params.push(CallParam::Content {
            name: name.into(),
            kind,
            body,
        });
        self
    }
}

impl From<CallNode> for Node {
    fn from(call: CallNode) -> Self {
        Node::Call(call)
    }
}

/// An HTML open tag. Children render between `<tag` and `>`.
#[derive(Clone, Debug, PartialEq)]
pub struct OpenTagNode {
    pub tag: String,
    pub children: Vec<Node>,
    pub self_closing: bool,
}

impl OpenTagNode {
    pub fn new(tag: impl Into<String>, children: Vec<Node>) -> Self {
        OpenTagNode {
            tag: tag.into(),
            children,
            self_closing: false,
        }
    }
}

impl From<OpenTagNode> for Node {
    fn from(tag: OpenTagNode) -> Self {
        Node::OpenTag(tag)
    }
}
