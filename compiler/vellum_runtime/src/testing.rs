//! Test doubles for sinks, value providers and the lookup service.
//!
//! Used by this workspace's own tests and available to embedders that want
//! to exercise suspend/resume paths deterministically.

use std::collections::BTreeSet;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};

use rustc_hash::FxHashMap;

use crate::{
    Forced, Readiness, Record, RenderContext, RenderError, Renderable, Sink,
    TemplateHandle, TemplateLookup, Value, ValueProvider, VeMetadata,
};

/// A buffer sink that reports `NotReady` exactly once before each chosen
/// write (counted from zero).
#[derive(Debug, Default)]
pub struct ThrottledSink {
    buffer: String,
    writes: usize,
    pause_before: BTreeSet<usize>,
    paused_at: Option<usize>,
    pauses: usize,
}

impl ThrottledSink {
    pub fn new(pause_before: impl IntoIterator<Item = usize>) -> Self {
        ThrottledSink {
            pause_before: pause_before.into_iter().collect(),
            ..ThrottledSink::default()
        }
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    /// Number of `append` calls so far.
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Number of times the sink reported `NotReady`.
    pub fn pauses(&self) -> usize {
        self.pauses
    }
}

impl Sink for ThrottledSink {
    fn poll_ready(&mut self) -> Readiness {
        if self.pause_before.contains(&self.writes) && self.paused_at != Some(self.writes) {
            self.paused_at = Some(self.writes);
            self.pauses += 1;
            return Readiness::NotReady;
        }
        Readiness::Ready
    }

    fn append(&mut self, content: &str) -> io::Result<Readiness> {
        self.buffer.push_str(content);
        self.writes += 1;
        Ok(Readiness::Ready)
    }
}

/// A provider that is not ready for its first `pending` forces.
#[derive(Debug)]
pub struct DeferredValue {
    value: Value,
    pending: AtomicUsize,
    forces: AtomicUsize,
}

impl DeferredValue {
    pub fn new(value: impl Into<Value>, pending: usize) -> Self {
        DeferredValue {
            value: value.into(),
            pending: AtomicUsize::new(pending),
            forces: AtomicUsize::new(0),
        }
    }

    /// Total number of `force` calls, ready or not.
    pub fn forces(&self) -> usize {
        self.forces.load(Ordering::Relaxed)
    }
}

impl ValueProvider for DeferredValue {
    fn force(&self) -> Forced {
        self.forces.fetch_add(1, Ordering::Relaxed);
        let was_pending = self
            .pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok();
        if was_pending {
            Forced::NotReady
        } else {
            Forced::Ready(self.value.clone())
        }
    }
}

/// A fixed lookup service that counts template lookups.
#[derive(Default)]
pub struct StaticLookup {
    templates: FxHashMap<String, TemplateHandle>,
    delegates: FxHashMap<(String, String), TemplateHandle>,
    ve_metadata: FxHashMap<(String, u64), VeMetadata>,
    template_lookups: AtomicUsize,
}

impl StaticLookup {
    pub fn new() -> Self {
        StaticLookup::default()
    }

    #[must_use]
    pub fn with_template(mut self, handle: TemplateHandle) -> Self {
        self.templates.insert(handle.name().to_owned(), handle);
        self
    }

    #[must_use]
    pub fn with_delegate(mut self, name: &str, variant: &str, handle: TemplateHandle) -> Self {
        self.delegates
            .insert((name.to_owned(), variant.to_owned()), handle);
        self
    }

    #[must_use]
    pub fn with_ve_metadata(mut self, metadata_id: &str, element_id: u64, meta: VeMetadata) -> Self {
        self.ve_metadata
            .insert((metadata_id.to_owned(), element_id), meta);
        self
    }

    /// Number of `get_template` calls served so far.
    pub fn template_lookups(&self) -> usize {
        self.template_lookups.load(Ordering::Relaxed)
    }
}

impl TemplateLookup for StaticLookup {
    fn get_template(&self, name: &str) -> Option<TemplateHandle> {
        self.template_lookups.fetch_add(1, Ordering::Relaxed);
        self.templates.get(name).cloned()
    }

    fn get_ve_metadata(&self, metadata_id: &str, element_id: u64) -> Option<VeMetadata> {
        self.ve_metadata
            .get(&(metadata_id.to_owned(), element_id))
            .cloned()
    }

    fn select_delegate(&self, name: &str, variant: &str) -> Option<TemplateHandle> {
        self.delegates
            .get(&(name.to_owned(), variant.to_owned()))
            .or_else(|| self.delegates.get(&(name.to_owned(), String::new())))
            .cloned()
    }
}

/// Upper bound on resumes before [`render_to_completion`] gives up.
pub const MAX_RESUMES: usize = 100_000;

/// Renders, resuming after every suspension until done. Returns the number
/// of suspensions.
///
/// # Panics
///
/// Panics if the render is still suspended after [`MAX_RESUMES`] resumes.
pub fn render_to_completion(
    template: &dyn Renderable,
    params: &Record,
    injected: &Record,
    sink: &mut dyn Sink,
    ctx: &RenderContext,
) -> Result<usize, RenderError> {
    let mut outcome = template.render(params, injected, sink, ctx)?;
    let mut suspensions = 0;
    while !outcome.is_done() {
        assert!(
            suspensions < MAX_RESUMES,
            "render of `{}` never completed",
            template.name()
        );
        suspensions += 1;
        outcome = template.resume(&outcome, params, injected, sink, ctx)?;
    }
    Ok(suspensions)
}

/// Convenience for tests that only need the final text.
pub fn render_string(
    template: &dyn Renderable,
    params: &Record,
    injected: &Record,
    ctx: &RenderContext,
) -> Result<String, RenderError> {
    let mut sink = crate::BufferSink::new();
    render_to_completion(template, params, injected, &mut sink, ctx)?;
    Ok(sink.into_string())
}

