//! Expressions.

use std::fmt;

/// Literal constants.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

/// Binary operators.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    /// `a ?: b`
    NullCoalesce,
}

impl BinaryOp {
    pub fn as_symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::NullCoalesce => "?:",
        }
    }

    /// Operators whose right operand is evaluated only when the left one
    /// does not decide the result.
    pub fn is_short_circuit(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or | BinaryOp::NullCoalesce)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_symbol())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "not",
        })
    }
}

/// Pure builtin functions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BuiltinFn {
    /// Length of a list, string or record.
    Length,
    IsNonnull,
    /// String coercion.
    Str,
}

impl BuiltinFn {
    pub fn name(self) -> &'static str {
        match self {
            BuiltinFn::Length => "length",
            BuiltinFn::IsNonnull => "isNonnull",
            BuiltinFn::Str => "str",
        }
    }
}

/// A resolved variable reference.
///
/// The front end classifies every reference, so the code generator never
/// has to guess whether a name is a parameter or a local.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum VarRef {
    Param(String),
    State(String),
    /// `let` variables and loop variables.
    Local(String),
    /// Read from the injected-parameters record.
    Injected(String),
}

impl VarRef {
    pub fn name(&self) -> &str {
        match self {
            VarRef::Param(name)
            | VarRef::State(name)
            | VarRef::Local(name)
            | VarRef::Injected(name) => name,
        }
    }
}

/// Value expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Var(VarRef),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    List(Vec<Expr>),
    Record(Vec<(String, Expr)>),
    Field {
        base: Box<Expr>,
        field: String,
        /// `base?.field`
        null_safe: bool,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    Builtin {
        func: BuiltinFn,
        args: Vec<Expr>,
    },
    /// A first-class reference to a template by fully-qualified name.
    TemplateLiteral(String),
    /// A visual-element literal. `metadata` names the metadata table the
    /// element's logging metadata lives in, if any.
    Ve {
        id: u64,
        name: String,
        metadata: Option<String>,
    },
}

impl Expr {
    pub fn null() -> Self {
        Expr::Literal(Literal::Null)
    }

    pub fn bool(value: bool) -> Self {
        Expr::Literal(Literal::Bool(value))
    }

    pub fn int(value: i64) -> Self {
        Expr::Literal(Literal::Int(value))
    }

    pub fn float(value: f64) -> Self {
        Expr::Literal(Literal::Float(value))
    }

    pub fn str(value: impl Into<String>) -> Self {
        Expr::Literal(Literal::Str(value.into()))
    }

    pub fn param(name: impl Into<String>) -> Self {
        Expr::Var(VarRef::Param(name.into()))
    }

    pub fn state(name: impl Into<String>) -> Self {
        Expr::Var(VarRef::State(name.into()))
    }

    pub fn local(name: impl Into<String>) -> Self {
        Expr::Var(VarRef::Local(name.into()))
    }

    pub fn injected(name: impl Into<String>) -> Self {
        Expr::Var(VarRef::Injected(name.into()))
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn conditional(cond: Expr, then_branch: Expr, else_branch: Expr) -> Self {
        Expr::Conditional {
            cond: Box::new(cond),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        }
    }

    pub fn field(base: Expr, field: impl Into<String>) -> Self {
        Expr::Field {
            base: Box::new(base),
            field: field.into(),
            null_safe: false,
        }
    }

    pub fn null_safe_field(base: Expr, field: impl Into<String>) -> Self {
        Expr::Field {
            base: Box::new(base),
            field: field.into(),
            null_safe: true,
        }
    }

    pub fn index(base: Expr, index: Expr) -> Self {
        Expr::Index {
            base: Box::new(base),
            index: Box::new(index),
        }
    }

    pub fn builtin(func: BuiltinFn, args: Vec<Expr>) -> Self {
        Expr::Builtin { func, args }
    }

    pub fn template(name: impl Into<String>) -> Self {
        Expr::TemplateLiteral(name.into())
    }

    pub fn ve(id: u64, name: impl Into<String>, metadata: Option<&str>) -> Self {
        Expr::Ve {
            id,
            name: name.into(),
            metadata: metadata.map(str::to_owned),
        }
    }

    pub fn is_null_literal(&self) -> bool {
        matches!(self, Expr::Literal(Literal::Null))
    }
}
