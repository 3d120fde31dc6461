//! Value providers.
//!
//! A provider stands for a value that may not be available yet (an RPC
//! result, a streamed chunk). Forcing a provider never blocks: it reports
//! [`Forced::NotReady`] and the render suspends at the current resume point.

use std::fmt;
use std::sync::Arc;

use crate::Value;

/// Result of forcing a provider.
#[derive(Clone, Debug, PartialEq)]
pub enum Forced {
    Ready(Value),
    NotReady,
}

/// A possibly-unready value.
///
/// Implementations must be idempotent once ready: after returning
/// `Ready(v)` every later `force` returns an equal value.
pub trait ValueProvider: Send + Sync + fmt::Debug {
    fn force(&self) -> Forced;
}

/// A shared handle to a [`ValueProvider`], stored inside [`Value::Lazy`].
#[derive(Clone)]
pub struct LazyValue(Arc<dyn ValueProvider>);

impl LazyValue {
    pub fn new(provider: impl ValueProvider + 'static) -> Self {
        LazyValue(Arc::new(provider))
    }

    pub fn from_arc(provider: Arc<dyn ValueProvider>) -> Self {
        LazyValue(provider)
    }

    pub fn force(&self) -> Forced {
        self.0.force()
    }

    pub fn ptr_eq(&self, other: &LazyValue) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for LazyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LazyValue").field(&self.0).finish()
    }
}
