//! Template metadata records.
//!
//! Emitted by the code generator next to each compiled template and served
//! to runtime consumers (dependency analysis, css loading, delegate
//! selection) without loading template code.

use crate::{ContentKind, Visibility};

/// Identity of a delegate implementation as recorded in metadata.
///
/// Templates that are not delegates carry [`DelegateMetadata::default`]:
/// empty package, name and variant.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct DelegateMetadata {
    pub package: String,
    pub name: String,
    pub variant: String,
}

impl DelegateMetadata {
    pub fn is_delegate(&self) -> bool {
        !self.name.is_empty()
    }
}

/// Compile-time facts about one template.
///
/// Every list is ordered by first occurrence and free of duplicates.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct TemplateMetadata {
    pub name: String,
    pub content_kind: ContentKind,
    pub visibility: Visibility,
    /// File-level css requirements first, then the template's own.
    pub css_namespaces: Vec<String>,
    /// Injected parameters the template reads.
    pub injected_params: Vec<String>,
    /// Templates referenced by `call` or by template literals.
    pub callees: Vec<String>,
    /// Delegate names this template may call.
    pub delegate_callees: Vec<String>,
    pub delegate: DelegateMetadata,
}
