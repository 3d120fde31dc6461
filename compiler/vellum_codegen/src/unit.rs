//! Compilation units.
//!
//! A unit is the set of templates compiled together. Call sites bind
//! directly to templates of their own unit; everything else is found
//! through the render context at render time.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, instrument};
use vellum_ir::{TemplateFile, TemplateMetadata};
use vellum_runtime::{TemplateHandle, VeMetadata};

use crate::template::{assemble, CompiledTemplate};
use crate::{CompileError, CompileOptions};

/// Logging metadata for visual elements, keyed by element id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VeMetadataTable {
    entries: FxHashMap<u64, VeMetadata>,
}

impl VeMetadataTable {
    pub fn new() -> Self {
        VeMetadataTable::default()
    }

    #[must_use]
    pub fn with(mut self, element_id: u64, metadata: VeMetadata) -> Self {
        self.insert(element_id, metadata);
        self
    }

    pub fn insert(&mut self, element_id: u64, metadata: VeMetadata) {
        self.entries.insert(element_id, metadata);
    }

    pub fn get(&self, element_id: u64) -> Option<&VeMetadata> {
        self.entries.get(&element_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What call sites of a unit can bind to directly.
#[derive(Debug)]
pub(crate) struct UnitLinks {
    templates: FxHashMap<Arc<str>, Arc<CompiledTemplate>>,
    ve_tables: FxHashMap<Arc<str>, VeMetadataTable>,
}

impl UnitLinks {
    pub(crate) fn template(&self, name: &str) -> Option<&Arc<CompiledTemplate>> {
        self.templates.get(name)
    }

    pub(crate) fn ve_table(&self, metadata_id: &str) -> Option<&VeMetadataTable> {
        self.ve_tables.get(metadata_id)
    }
}

/// Builder for a [`CompiledUnit`].
#[derive(Debug, Default)]
pub struct UnitCompiler {
    options: CompileOptions,
    files: Vec<TemplateFile>,
    ve_tables: FxHashMap<Arc<str>, VeMetadataTable>,
}

impl UnitCompiler {
    pub fn new() -> Self {
        UnitCompiler::default()
    }

    #[must_use]
    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn file(mut self, file: TemplateFile) -> Self {
        self.files.push(file);
        self
    }

    /// Registers a metadata table that visual elements in this unit bind to
    /// directly.
    #[must_use]
    pub fn ve_metadata(mut self, metadata_id: &str, table: VeMetadataTable) -> Self {
        self.ve_tables.insert(Arc::from(metadata_id), table);
        self
    }

    #[instrument(level = "debug", skip_all, fields(files = self.files.len()))]
    pub fn compile(self) -> Result<CompiledUnit, CompileError> {
        let mut seen = FxHashSet::default();
        let mut assembled = Vec::new();
        for file in &self.files {
            for template in &file.templates {
                if !seen.insert(template.name.as_str()) {
                    return Err(CompileError::DuplicateTemplate {
                        name: template.name.clone(),
                    });
                }
                assembled.push(assemble(file, template, &self.options)?);
            }
        }

        let mut metadata = Vec::with_capacity(assembled.len());
        let ve_tables = self.ve_tables;
        let links = Arc::new_cyclic(|unit| {
            let mut templates = FxHashMap::default();
            for template in assembled {
                let name = Arc::clone(template.name());
                let (compiled, meta) = template.link(unit.clone());
                metadata.push(Arc::new(meta));
                templates.insert(name, Arc::new(compiled));
            }
            UnitLinks {
                templates,
                ve_tables,
            }
        });
        debug!(templates = metadata.len(), "compiled unit");

        let index = metadata
            .iter()
            .enumerate()
            .map(|(i, meta)| (Arc::from(meta.name.as_str()), i))
            .collect();
        Ok(CompiledUnit {
            links,
            metadata,
            index,
        })
    }
}

/// The output of [`UnitCompiler::compile`].
///
/// Cloning is cheap and shares the templates.
#[derive(Clone, Debug)]
pub struct CompiledUnit {
    links: Arc<UnitLinks>,
    /// In declaration order.
    metadata: Vec<Arc<TemplateMetadata>>,
    index: FxHashMap<Arc<str>, usize>,
}

impl CompiledUnit {
    /// The template named `name`.
    ///
    /// Templates link to their unit weakly, so keep the unit (or a
    /// [`TemplateRegistry`](crate::TemplateRegistry) holding it) alive while
    /// rendering. Once every clone of the unit is dropped, calls, template
    /// literals and VE lookups in the returned template fail with a fatal
    /// internal error.
    pub fn template(&self, name: &str) -> Option<Arc<CompiledTemplate>> {
        self.links.template(name).cloned()
    }

    /// [`template`](Self::template) as a shared handle; the same lifetime
    /// rule applies.
    pub fn handle(&self, name: &str) -> Option<TemplateHandle> {
        self.template(name).map(|t| t as TemplateHandle)
    }

    pub fn metadata(&self, name: &str) -> Option<&Arc<TemplateMetadata>> {
        self.index.get(name).and_then(|&i| self.metadata.get(i))
    }

    /// Metadata for every template, in declaration order.
    pub fn all_metadata(&self) -> &[Arc<TemplateMetadata>] {
        &self.metadata
    }

    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    pub fn ve_metadata(&self, metadata_id: &str, element_id: u64) -> Option<VeMetadata> {
        self.links
            .ve_table(metadata_id)
            .and_then(|table| table.get(element_id))
            .cloned()
    }

    /// The implementation of delegate `name` registered for exactly
    /// `variant`.
    pub fn delegate(&self, name: &str, variant: &str) -> Option<TemplateHandle> {
        self.metadata
            .iter()
            .find(|meta| meta.delegate.name == name && meta.delegate.variant == variant)
            .and_then(|meta| self.handle(&meta.name))
    }
}
