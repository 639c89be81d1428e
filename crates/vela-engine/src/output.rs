//! Output sink shared by `print` and the profiler report builtins.
//!
//! Defaults to stdout; tests swap in a capturing writer to observe what a
//! target printed.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

/// Cloneable handle to the interpreter's output stream.
#[derive(Clone)]
pub struct OutputSink {
    inner: Rc<RefCell<dyn Write>>,
}

impl OutputSink {
    /// Sink writing to the process's stdout.
    pub fn stdout() -> Self {
        Self::from_writer(io::stdout())
    }

    /// Sink writing to an arbitrary writer.
    pub fn from_writer<W: Write + 'static>(writer: W) -> Self {
        Self {
            inner: Rc::new(RefCell::new(writer)),
        }
    }

    /// Sink writing into an in-memory buffer, plus a handle to read it.
    pub fn capture() -> (Self, CapturedOutput) {
        let captured = CapturedOutput::default();
        (Self::from_writer(CaptureWriter(captured.clone())), captured)
    }

    /// Write a string, ignoring I/O errors (matching stdout printing).
    pub fn write_str(&self, text: &str) {
        let _ = self.inner.borrow_mut().write_all(text.as_bytes());
    }
}

/// Readable handle to output captured by [`OutputSink::capture`].
#[derive(Clone, Default)]
pub struct CapturedOutput(Rc<RefCell<Vec<u8>>>);

impl CapturedOutput {
    /// Everything written so far, lossily decoded as UTF-8.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

struct CaptureWriter(CapturedOutput);

impl Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0 .0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
