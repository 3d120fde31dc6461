//! Render context and the lookup service behind fallback dispatch.
//!
//! A [`RenderContext`] is created per render. It carries the
//! [`TemplateLookup`] service used when a call site cannot bind directly to
//! a template compiled in its own unit, plus the render configuration and
//! the current call depth.

use std::cell::Cell;
use std::sync::Arc;

use crate::error::RenderError;
use crate::renderable::TemplateHandle;
use crate::value::VeMetadata;

/// Name-keyed access to everything a render may need from other units.
pub trait TemplateLookup: Send + Sync {
    fn get_template(&self, name: &str) -> Option<TemplateHandle>;

    fn get_ve_metadata(&self, metadata_id: &str, element_id: u64) -> Option<VeMetadata>;

    /// Picks a delegate implementation. `variant` is empty for the default.
    fn select_delegate(&self, name: &str, variant: &str) -> Option<TemplateHandle> {
        let _ = (name, variant);
        None
    }
}

/// A lookup service that knows nothing. Every fallback misses.
#[derive(Copy, Clone, Debug, Default)]
pub struct EmptyLookup;

impl TemplateLookup for EmptyLookup {
    fn get_template(&self, _name: &str) -> Option<TemplateHandle> {
        None
    }

    fn get_ve_metadata(&self, _metadata_id: &str, _element_id: u64) -> Option<VeMetadata> {
        None
    }
}

/// Limits applied to one render.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RenderConfig {
    /// Maximum nesting of template calls.
    pub max_call_depth: usize,
}

impl RenderConfig {
    pub const DEFAULT_MAX_CALL_DEPTH: usize = 512;

    #[must_use]
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            max_call_depth: Self::DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

/// Per-render services. Not shared between concurrent renders.
pub struct RenderContext {
    lookup: Arc<dyn TemplateLookup>,
    config: RenderConfig,
    depth: Cell<usize>,
    /// Set when a sink write answered `NotReady`.
    sink_held: Cell<bool>,
}

impl RenderContext {
    pub fn new(lookup: Arc<dyn TemplateLookup>) -> Self {
        Self::with_config(lookup, RenderConfig::default())
    }

    pub fn with_config(lookup: Arc<dyn TemplateLookup>, config: RenderConfig) -> Self {
        RenderContext {
            lookup,
            config,
            depth: Cell::new(0),
            sink_held: Cell::new(false),
        }
    }

    /// A context whose lookups always miss.
    pub fn isolated() -> Self {
        Self::new(Arc::new(EmptyLookup))
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn lookup(&self) -> &Arc<dyn TemplateLookup> {
        &self.lookup
    }

    pub fn get_template(&self, name: &str) -> Result<TemplateHandle, RenderError> {
        self.lookup
            .get_template(name)
            .ok_or_else(|| RenderError::TemplateNotFound {
                name: name.to_owned(),
            })
    }

    pub fn get_ve_metadata(
        &self,
        metadata_id: &str,
        element_id: u64,
    ) -> Result<VeMetadata, RenderError> {
        self.lookup
            .get_ve_metadata(metadata_id, element_id)
            .ok_or_else(|| RenderError::VeMetadataNotFound {
                metadata_id: metadata_id.to_owned(),
                element_id,
            })
    }

    pub fn select_delegate(&self, name: &str, variant: &str) -> Option<TemplateHandle> {
        self.lookup.select_delegate(name, variant)
    }

    pub fn call_depth(&self) -> usize {
        self.depth.get()
    }

    /// Remembers that the sink asked to pause after a completed write. The
    /// next write to the sink suspends instead of polling it.
    pub fn hold_sink(&self) {
        self.sink_held.set(true);
    }

    /// Clears and returns the pending sink hold.
    pub fn take_sink_hold(&self) -> bool {
        self.sink_held.replace(false)
    }

    /// Records entry into `callee`; the depth drops again when the guard
    /// goes out of scope.
    pub fn enter_call(&self, callee: &str) -> Result<CallGuard<'_>, RenderError> {
        let depth = self.depth.get();
        if depth >= self.config.max_call_depth {
            return Err(RenderError::CallDepthExceeded {
                callee: callee.to_owned(),
                limit: self.config.max_call_depth,
            });
        }
        self.depth.set(depth + 1);
        Ok(CallGuard { ctx: self })
    }
}

impl std::fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderContext")
            .field("config", &self.config)
            .field("depth", &self.depth.get())
            .field("sink_held", &self.sink_held.get())
            .finish_non_exhaustive()
    }
}

/// RAII guard for one level of call nesting.
#[must_use = "the call depth is released when the guard is dropped"]
pub struct CallGuard<'a> {
    ctx: &'a RenderContext,
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.ctx.depth.set(self.ctx.depth.get().saturating_sub(1));
    }
}
