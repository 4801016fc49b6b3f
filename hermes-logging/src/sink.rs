use std::{
    any::Any,
    cell::RefCell,
    io::{self, Write},
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};
use tracing::{Event, Subscriber};
use tracing_subscriber::{
    fmt::MakeWriter,
    layer::{Context, Layer},
};

thread_local! {
    static DEFERRED_PANIC: RefCell<Option<Box<dyn Any + Send>>> = const { RefCell::new(None) };
}

/// A destination for formatted log lines.
///
/// `write_line` receives one complete, already formatted line and reports how
/// many bytes were accepted.
pub trait LogSink: Send + Sync {
    fn write_line(&self, line: &[u8]) -> io::Result<usize>;
}

/// Writes lines to standard output.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn write_line(&self, line: &[u8]) -> io::Result<usize> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(line)?;
        stdout.flush()?;
        Ok(line.len())
    }
}

// --- Writer adapter for the fmt layer ---
pub struct SinkWriter<'a> {
    sink: &'a dyn LogSink,
}

impl Write for SinkWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // The fmt layer reuses a per-thread buffer and clears it only after
        // the write returns, so a panicking sink must not unwind through it.
        match panic::catch_unwind(AssertUnwindSafe(|| self.sink.write_line(buf))) {
            Ok(result) => result,
            Err(payload) => {
                DEFERRED_PANIC.with(|slot| *slot.borrow_mut() = Some(payload));
                Err(io::Error::other("log sink panicked"))
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Hands a shared [`LogSink`] to `tracing_subscriber::fmt` as its writer.
#[derive(Clone)]
pub struct MakeSinkWriter {
    sink: Arc<dyn LogSink>,
}

impl MakeSinkWriter {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }
}

impl<'a> MakeWriter<'a> for MakeSinkWriter {
    type Writer = SinkWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        SinkWriter {
            sink: self.sink.as_ref(),
        }
    }
}

/// Re-raises a panic caught by [`SinkWriter`] once the fmt layer is done
/// with the event. Must be layered on top of that fmt layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SinkPanicLayer;

impl<S: Subscriber> Layer<S> for SinkPanicLayer {
    fn on_event(&self, _event: &Event<'_>, _ctx: Context<'_, S>) {
        if let Some(payload) = DEFERRED_PANIC.with(|slot| slot.borrow_mut().take()) {
            panic::resume_unwind(payload);
        }
    }
}
