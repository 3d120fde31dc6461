//! Output sinks.
//!
//! Compiled templates stream output into a [`Sink`]. Before every write the
//! render asks [`Sink::poll_ready`]; a `NotReady` answer suspends the render
//! *before* the write, so a write is never split or repeated across a
//! suspension. [`Sink::append`] always accepts the whole chunk; if it
//! answers `NotReady`, the render suspends before its next write to the
//! sink without polling again.
//!
//! I/O failures are returned as `io::Error` and propagate unchanged to the
//! caller of `render`.

use std::io;

/// Whether a sink wants more output now.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    NotReady,
}

pub trait Sink {
    /// Backpressure check performed before each write.
    fn poll_ready(&mut self) -> Readiness;

    /// Appends `content`. `NotReady` asks the render to pause before the
    /// next write.
    fn append(&mut self, content: &str) -> io::Result<Readiness>;
}

/// Collects output in memory. Always ready.
#[derive(Debug, Default)]
pub struct BufferSink {
    buffer: String,
}

impl BufferSink {
    pub fn new() -> Self {
        BufferSink::default()
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn into_string(self) -> String {
        self.buffer
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Sink for BufferSink {
    fn poll_ready(&mut self) -> Readiness {
        Readiness::Ready
    }

    fn append(&mut self, content: &str) -> io::Result<Readiness> {
        self.buffer.push_str(content);
        Ok(Readiness::Ready)
    }
}

/// Writes into a caller-owned string. Used for `let` content blocks and
/// content call parameters, which render into a buffer slot.
#[derive(Debug)]
pub struct CaptureSink<'a> {
    buffer: &'a mut String,
}

impl<'a> CaptureSink<'a> {
    pub fn new(buffer: &'a mut String) -> Self {
        CaptureSink { buffer }
    }
}

impl Sink for CaptureSink<'_> {
    fn poll_ready(&mut self) -> Readiness {
        Readiness::Ready
    }

    fn append(&mut self, content: &str) -> io::Result<Readiness> {
        self.buffer.push_str(content);
        Ok(Readiness::Ready)
    }
}

/// Adapts any [`io::Write`]. Blocking writers are always ready.
#[derive(Debug)]
pub struct WriterSink<W> {
    writer: W,
}

impl<W: io::Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        WriterSink { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: io::Write> Sink for WriterSink<W> {
    fn poll_ready(&mut self) -> Readiness {
        Readiness::Ready
    }

    fn append(&mut self, content: &str) -> io::Result<Readiness> {
        self.writer.write_all(content.as_bytes())?;
        Ok(Readiness::Ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingWriter;

    impl io::Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_buffer_sink_collects() {
        let mut sink = BufferSink::new();
        assert_eq!(sink.poll_ready(), Readiness::Ready);
        sink.append("a").ok();
        sink.append("b").ok();
        assert_eq!(sink.as_str(), "ab");
        sink.clear();
        assert_eq!(sink.into_string(), "");
    }

    #[test]
    fn test_capture_sink_writes_through() {
        let mut buffer = String::from("x");
        let mut sink = CaptureSink::new(&mut buffer);
        sink.append("y").ok();
        assert_eq!(buffer, "xy");
    }

    #[test]
    fn test_writer_sink_propagates_io_errors() {
        let mut sink = WriterSink::new(Vec::new());
        sink.append("hi").ok();
        assert_eq!(sink.into_inner(), b"hi".to_vec());

        let mut failing = WriterSink::new(FailingWriter);
        let err = failing.append("x").err().map(|e| e.kind());
        assert_eq!(err, Some(io::ErrorKind::BrokenPipe));
    }
}
