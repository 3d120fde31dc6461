//! Compilation options.

/// Knobs for [`UnitCompiler`](crate::UnitCompiler).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileOptions {
    /// Merge adjacent raw text nodes into one output op.
    pub coalesce_raw_text: bool,
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn coalesce_raw_text(mut self, enabled: bool) -> Self {
        self.coalesce_raw_text = enabled;
        self
    }
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            coalesce_raw_text: true,
        }
    }
}
