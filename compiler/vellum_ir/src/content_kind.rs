//! Content kinds.
//!
//! The type system distinguishes more kinds than the runtime does: an
//! `html` element block is still `html` once rendered. [`ContentKind`] is
//! the runtime flavour recorded in metadata and carried by content values.

use std::fmt;

/// Content kind as declared in template signatures and `let`/param blocks.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum SanitizedContentKind {
    #[default]
    Html,
    /// A single HTML element; renders as [`ContentKind::Html`].
    HtmlElement,
    Attributes,
    Js,
    Css,
    Uri,
    TrustedResourceUri,
    Text,
}

/// Content kind as seen by the runtime and by metadata consumers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum ContentKind {
    #[default]
    Html,
    Attributes,
    Js,
    Css,
    Uri,
    TrustedResourceUri,
    Text,
}

impl ContentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Html => "html",
            ContentKind::Attributes => "attributes",
            ContentKind::Js => "js",
            ContentKind::Css => "css",
            ContentKind::Uri => "uri",
            ContentKind::TrustedResourceUri => "trusted_resource_uri",
            ContentKind::Text => "text",
        }
    }
}

impl From<SanitizedContentKind> for ContentKind {
    fn from(kind: SanitizedContentKind) -> Self {
        match kind {
            SanitizedContentKind::Html | SanitizedContentKind::HtmlElement => ContentKind::Html,
            SanitizedContentKind::Attributes => ContentKind::Attributes,
            SanitizedContentKind::Js => ContentKind::Js,
            SanitizedContentKind::Css => ContentKind::Css,
            SanitizedContentKind::Uri => ContentKind::Uri,
            SanitizedContentKind::TrustedResourceUri => ContentKind::TrustedResourceUri,
            SanitizedContentKind::Text => ContentKind::Text,
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_element_renders_as_html() {
        assert_eq!(
            ContentKind::from(SanitizedContentKind::HtmlElement),
            ContentKind::Html
        );
        assert_eq!(ContentKind::from(SanitizedContentKind::Html), ContentKind::Html);
    }

    #[test]
    fn test_other_kinds_map_one_to_one() {
        assert_eq!(ContentKind::from(SanitizedContentKind::Css), ContentKind::Css);
        assert_eq!(ContentKind::from(SanitizedContentKind::Text), ContentKind::Text);
        assert_eq!(
            ContentKind::from(SanitizedContentKind::TrustedResourceUri).to_string(),
            "trusted_resource_uri"
        );
    }
}
