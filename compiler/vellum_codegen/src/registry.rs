//! A process-wide template registry.
//!
//! [`TemplateRegistry`] collects compiled units and serves them as the
//! [`TemplateLookup`] behind a [`RenderContext`](vellum_runtime::RenderContext),
//! so templates can call across units.
//!
//! Units loaded later shadow earlier ones by name. Loading is rare and
//! renders only read, so the units sit behind a read-mostly lock.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;
use vellum_ir::TemplateMetadata;
use vellum_runtime::{TemplateHandle, TemplateLookup, VeMetadata};

use crate::template::CompiledTemplate;
use crate::unit::CompiledUnit;

#[derive(Debug, Default)]
pub struct TemplateRegistry {
    units: RwLock<Vec<CompiledUnit>>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        TemplateRegistry::default()
    }

    pub fn load(&self, unit: CompiledUnit) {
        debug!(templates = unit.len(), "loading unit");
        self.units.write().push(unit);
    }

    pub fn unit_count(&self) -> usize {
        self.units.read().len()
    }

    pub fn template(&self, name: &str) -> Option<Arc<CompiledTemplate>> {
        self.units.read().iter().rev().find_map(|u| u.template(name))
    }

    pub fn metadata(&self, name: &str) -> Option<Arc<TemplateMetadata>> {
        self.units
            .read()
            .iter()
            .rev()
            .find_map(|u| u.metadata(name).cloned())
    }
}

impl TemplateLookup for TemplateRegistry {
    fn get_template(&self, name: &str) -> Option<TemplateHandle> {
        self.units.read().iter().rev().find_map(|u| u.handle(name))
    }

    fn get_ve_metadata(&self, metadata_id: &str, element_id: u64) -> Option<VeMetadata> {
        self.units
            .read()
            .iter()
            .rev()
            .find_map(|u| u.ve_metadata(metadata_id, element_id))
    }

    /// Exact variant first, then the default implementation.
    fn select_delegate(&self, name: &str, variant: &str) -> Option<TemplateHandle> {
        let units = self.units.read();
        let find = |variant: &str| units.iter().rev().find_map(|u| u.delegate(name, variant));
        find(variant).or_else(|| {
            if variant.is_empty() {
                None
            } else {
                find("")
            }
        })
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use vellum_ir::{Node, Template, TemplateFile};
    use vellum_runtime::testing::render_string;
    use vellum_runtime::{Record, RenderContext};

    use crate::UnitCompiler;

    fn unit(templates: Vec<Template>) -> CompiledUnit {
        let file = templates
            .into_iter()
            .fold(TemplateFile::new("ns"), TemplateFile::with_template);
        UnitCompiler::new().file(file).compile().unwrap()
    }

    #[test]
    fn test_later_units_shadow_earlier_ones() {
        let registry = TemplateRegistry::new();
        registry.load(unit(vec![
            Template::new("ns.a").with_body(vec![Node::text("old")])
        ]));
        registry.load(unit(vec![
            Template::new("ns.a").with_body(vec![Node::text("new")])
        ]));

        assert_eq!(registry.unit_count(), 2);
        let handle = registry.get_template("ns.a").unwrap();
        let text = render_string(&*handle, &Record::new(), &Record::new(), &RenderContext::isolated());
        assert_eq!(text.unwrap(), "new");
        assert!(registry.get_template("ns.missing").is_none());
        assert_eq!(registry.metadata("ns.a").unwrap().name, "ns.a");
    }

    #[test]
    fn test_delegate_selection_falls_back_to_default_variant() {
        let registry = TemplateRegistry::new();
        registry.load(unit(vec![
            Template::delegate(None, "ns.menu", ""),
            Template::delegate(None, "ns.menu", "mobile"),
        ]));

        let mobile = registry.select_delegate("ns.menu", "mobile").unwrap();
        assert_eq!(mobile.name(), "ns.menu:mobile");
        let fallback = registry.select_delegate("ns.menu", "tablet").unwrap();
        assert_eq!(fallback.name(), "ns.menu");
        assert!(registry.select_delegate("ns.other", "").is_none());
    }
}
