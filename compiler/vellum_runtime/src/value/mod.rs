//! Runtime values.
//!
//! [`Value`] is what expressions evaluate to and what `params` /
//! injected-params records hold. All variants are cheap to clone: strings,
//! lists and records share their storage behind `Arc`.
//!
//! A [`Value::Lazy`] wraps a [`ValueProvider`](crate::ValueProvider) that may
//! not be ready yet. Forcing it is the only way expression evaluation can
//! suspend.

mod record;

use std::fmt;
use std::sync::Arc;

use vellum_ir::ContentKind;

use crate::provider::LazyValue;
use crate::renderable::TemplateHandle;

pub use record::Record;

#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    List(Arc<[Value]>),
    Record(Record),
    Content(SanitizedContent),
    Template(TemplateValue),
    Ve(VisualElement),
    Lazy(LazyValue),
}

impl Value {
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Value::Str(s.into())
    }

    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Value::List(items.into_iter().collect())
    }

    pub fn content(kind: ContentKind, text: impl Into<Arc<str>>) -> Self {
        Value::Content(SanitizedContent::new(kind, text))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Truthiness used by conditions, `and`, `or` and `not`.
    ///
    /// Null, `false`, zero, NaN, the empty string and empty content are
    /// falsy. Collections are always truthy. Lazy values must be forced
    /// before asking.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0 && !f.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Content(c) => !c.text.is_empty(),
            Value::List(_)
            | Value::Record(_)
            | Value::Template(_)
            | Value::Ve(_)
            | Value::Lazy(_) => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Record(_) => "record",
            Value::Content(_) => "content",
            Value::Template(_) => "template",
            Value::Ve(_) => "ve",
            Value::Lazy(_) => "lazy",
        }
    }

    /// Numeric value widened to `f64`.
    #[allow(
        clippy::cast_precision_loss,
        reason = "mixed int/float arithmetic is done in f64"
    )]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Text of a string-like value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            Value::Content(c) => Some(&c.text),
            _ => None,
        }
    }

    /// Loose equality used by `==` and `switch`.
    ///
    /// Numbers compare across int/float; strings compare equal to content
    /// with the same text. Templates compare by name.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                self.as_f64() == other.as_f64()
            }
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.loose_eq(y))
            }
            (Value::Record(a), Value::Record(b)) => a == b,
            (Value::Template(a), Value::Template(b)) => a.name == b.name,
            (Value::Ve(a), Value::Ve(b)) => a.id == b.id,
            (a, b) => match (a.as_text(), b.as_text()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Content(a), Value::Content(b)) => a == b,
            (Value::Content(_), _) | (_, Value::Content(_)) => false,
            (Value::Lazy(a), Value::Lazy(b)) => a.ptr_eq(b),
            _ => self.loose_eq(other) && self.type_name() == other.type_name(),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Self {
        Value::Record(r)
    }
}

impl From<LazyValue> for Value {
    fn from(lazy: LazyValue) -> Self {
        Value::Lazy(lazy)
    }
}

/// Printed form of a value.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => f.write_str(s),
            Value::Content(c) => f.write_str(&c.text),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Record(record) => write!(f, "{record}"),
            Value::Template(t) => write!(f, "** {} **", t.name),
            Value::Ve(ve) => write!(f, "ve({})", ve.name),
            Value::Lazy(_) => f.write_str("<pending>"),
        }
    }
}

/// Text already validated as being of a given content kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SanitizedContent {
    pub kind: ContentKind,
    pub text: Arc<str>,
}

impl SanitizedContent {
    pub fn new(kind: ContentKind, text: impl Into<Arc<str>>) -> Self {
        SanitizedContent {
            kind,
            text: text.into(),
        }
    }
}

/// A first-class template reference, bound to the template it names.
#[derive(Clone, Debug)]
pub struct TemplateValue {
    pub name: Arc<str>,
    pub handle: TemplateHandle,
}

impl TemplateValue {
    pub fn new(handle: TemplateHandle) -> Self {
        TemplateValue {
            name: Arc::from(handle.name()),
            handle,
        }
    }
}

/// Opaque logging metadata attached to a visual element.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VeMetadata(Arc<str>);

impl VeMetadata {
    pub fn new(payload: impl Into<Arc<str>>) -> Self {
        VeMetadata(payload.into())
    }

    pub fn payload(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VisualElement {
    pub id: u64,
    pub name: Arc<str>,
    pub metadata: Option<VeMetadata>,
}
