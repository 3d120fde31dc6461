//! Call-site binding: direct first, lookup fallback second.
//!
//! Every reference a template makes to another template or to a
//! visual-element metadata table is compiled into a *site*. A site binds
//! lazily, on its first use, and never rebinds:
//!
//! - If the target was compiled in the same unit as the caller, the site
//!   binds **directly** and later uses skip the render context entirely.
//! - Otherwise the site is marked **fallback** and every use asks the
//!   [`RenderContext`] by name.
//!
//! A direct binding is observably identical to a fallback lookup that finds
//! the same template, except that it cannot miss.
//!
//! Delegate calls never bind directly: the implementation is chosen per
//! render by the lookup service.
//!
//! # Ownership
//!
//! Sites reach their unit through a `Weak`, and direct template bindings
//! are `Weak` too, so templates that call each other (or themselves) do
//! not keep each other alive. Losing the unit mid-render is an internal
//! error.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::{debug, trace};
use vellum_runtime::{InternalError, RenderContext, RenderError, TemplateHandle, VeMetadata};

use crate::template::CompiledTemplate;
use crate::unit::UnitLinks;

/// How a site ended up bound.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BindingKind {
    Direct,
    Fallback,
}

#[derive(Clone, Debug)]
enum TemplateBinding {
    Unresolved,
    Direct(Weak<CompiledTemplate>),
    Fallback,
}

/// A reference to a template by name: a `call` or a template literal.
#[derive(Debug)]
pub struct TemplateSite {
    callee: Arc<str>,
    binding: RwLock<TemplateBinding>,
}

impl TemplateSite {
    pub(crate) fn new(callee: &str) -> Self {
        TemplateSite {
            callee: Arc::from(callee),
            binding: RwLock::new(TemplateBinding::Unresolved),
        }
    }

    pub fn callee(&self) -> &str {
        &self.callee
    }

    /// `None` until the site is first used.
    pub fn binding_kind(&self) -> Option<BindingKind> {
        match &*self.binding.read() {
            TemplateBinding::Unresolved => None,
            TemplateBinding::Direct(_) => Some(BindingKind::Direct),
            TemplateBinding::Fallback => Some(BindingKind::Fallback),
        }
    }

    /// Finds the callee, binding the site on first use.
    pub(crate) fn resolve(
        &self,
        unit: &Weak<UnitLinks>,
        ctx: &RenderContext,
        caller: &str,
    ) -> Result<TemplateHandle, RenderError> {
        let binding = self.binding.read().clone();
        match binding {
            TemplateBinding::Direct(target) => upgrade(&target, caller),
            TemplateBinding::Fallback => self.lookup(ctx),
            TemplateBinding::Unresolved => self.bind(unit, ctx, caller),
        }
    }

    fn bind(
        &self,
        unit: &Weak<UnitLinks>,
        ctx: &RenderContext,
        caller: &str,
    ) -> Result<TemplateHandle, RenderError> {
        let links = unit_links(unit, caller)?;
        let local = links.template(&self.callee);
        {
            let mut binding = self.binding.write();
            if matches!(*binding, TemplateBinding::Unresolved) {
                *binding = match local {
                    Some(target) => TemplateBinding::Direct(Arc::downgrade(target)),
                    None => TemplateBinding::Fallback,
                };
                debug!(
                    caller,
                    callee = &*self.callee,
                    direct = local.is_some(),
                    "bound template site"
                );
            }
        }
        match local {
            Some(target) => Ok(Arc::clone(target) as TemplateHandle),
            None => self.lookup(ctx),
        }
    }

    fn lookup(&self, ctx: &RenderContext) -> Result<TemplateHandle, RenderError> {
        trace!(callee = &*self.callee, "fallback template lookup");
        ctx.get_template(&self.callee)
    }
}

fn upgrade(target: &Weak<CompiledTemplate>, caller: &str) -> Result<TemplateHandle, RenderError> {
    target
        .upgrade()
        .map(|t| t as TemplateHandle)
        .ok_or_else(|| InternalError::new(caller, "directly bound callee was dropped").into())
}

fn unit_links(unit: &Weak<UnitLinks>, caller: &str) -> Result<Arc<UnitLinks>, RenderError> {
    unit.upgrade().ok_or_else(|| {
        InternalError::new(caller, "compiled unit was dropped while rendering").into()
    })
}

#[derive(Clone, Debug)]
enum VeBinding {
    Unresolved,
    Direct(VeMetadata),
    Fallback,
}

/// A visual-element literal's reference into a metadata table.
#[derive(Debug)]
pub struct VeSite {
    metadata_id: Arc<str>,
    element_id: u64,
    binding: RwLock<VeBinding>,
}

impl VeSite {
    pub(crate) fn new(metadata_id: &str, element_id: u64) -> Self {
        VeSite {
            metadata_id: Arc::from(metadata_id),
            element_id,
            binding: RwLock::new(VeBinding::Unresolved),
        }
    }

    pub fn binding_kind(&self) -> Option<BindingKind> {
        match &*self.binding.read() {
            VeBinding::Unresolved => None,
            VeBinding::Direct(_) => Some(BindingKind::Direct),
            VeBinding::Fallback => Some(BindingKind::Fallback),
        }
    }

    /// A table registered with the unit must contain the element; only a
    /// table the unit does not know goes through the render context.
    pub(crate) fn resolve(
        &self,
        unit: &Weak<UnitLinks>,
        ctx: &RenderContext,
        caller: &str,
    ) -> Result<VeMetadata, RenderError> {
        let binding = self.binding.read().clone();
        match binding {
            VeBinding::Direct(meta) => return Ok(meta),
            VeBinding::Fallback => return self.lookup(ctx),
            VeBinding::Unresolved => {}
        }

        let links = unit_links(unit, caller)?;
        let local = match links.ve_table(&self.metadata_id) {
            Some(table) => Some(table.get(self.element_id).cloned().ok_or_else(|| {
                InternalError::new(
                    caller,
                    format!(
                        "metadata table `{}` has no entry for element {}",
                        self.metadata_id, self.element_id
                    ),
                )
            })?),
            None => None,
        };
        {
            let mut binding = self.binding.write();
            if matches!(*binding, VeBinding::Unresolved) {
                *binding = match &local {
                    Some(meta) => VeBinding::Direct(meta.clone()),
                    None => VeBinding::Fallback,
                };
                debug!(
                    caller,
                    metadata_id = &*self.metadata_id,
                    element_id = self.element_id,
                    direct = local.is_some(),
                    "bound ve metadata site"
                );
            }
        }
        match local {
            Some(meta) => Ok(meta),
            None => self.lookup(ctx),
        }
    }

    fn lookup(&self, ctx: &RenderContext) -> Result<VeMetadata, RenderError> {
        ctx.get_ve_metadata(&self.metadata_id, self.element_id)
    }
}

/// A delegate call. Always resolved through the render context.
#[derive(Debug)]
pub(crate) struct DelegateSite {
    name: Arc<str>,
    allow_empty_default: bool,
}

impl DelegateSite {
    pub(crate) fn new(name: &str, allow_empty_default: bool) -> Self {
        DelegateSite {
            name: Arc::from(name),
            allow_empty_default,
        }
    }

    /// `Ok(None)` means no implementation exists and the call renders
    /// nothing.
    pub(crate) fn select(
        &self,
        ctx: &RenderContext,
        variant: &str,
    ) -> Result<Option<TemplateHandle>, RenderError> {
        match ctx.select_delegate(&self.name, variant) {
            Some(handle) => Ok(Some(handle)),
            None if self.allow_empty_default => {
                trace!(delegate = &*self.name, variant, "empty delegate call");
                Ok(None)
            }
            None => Err(RenderError::DelegateNotFound {
                name: self.name.to_string(),
                variant: variant.to_owned(),
            }),
        }
    }
}
