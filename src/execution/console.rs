//! Console output of generators
//!
//! The process has one console shared by every worker. When several units run
//! concurrently each worker installs a `ConsoleRedirect` that prefixes every
//! line it writes with the unit label, so interleaved output stays readable.
//! The redirect is thread-scoped: it never affects other workers.

use parking_lot::Mutex;
use std::cell::RefCell;
use std::io::{self, Write};
use std::sync::{Arc, OnceLock};

type Sink = Arc<Mutex<Box<dyn Write + Send>>>;

/// Pair of output sinks
#[derive(Clone)]
pub struct Console {
    out: Sink,
    err: Sink,
}

impl Console {
    pub fn new(out: impl Write + Send + 'static, err: impl Write + Send + 'static) -> Self {
        Self {
            out: Arc::new(Mutex::new(Box::new(out))),
            err: Arc::new(Mutex::new(Box::new(err))),
        }
    }

    /// Process-wide console over stdout/stderr
    pub fn standard() -> Self {
        static STANDARD: OnceLock<Console> = OnceLock::new();
        STANDARD
            .get_or_init(|| Console::new(io::stdout(), io::stderr()))
            .clone()
    }
}

/// In-memory sink, shareable between a console and a test
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Clone)]
struct Redirect {
    prefix: Option<String>,
    console: Console,
}

thread_local! {
    static REDIRECT: RefCell<Option<Redirect>> = const { RefCell::new(None) };
}

/// Scoped console redirect for the current thread
///
/// Restores whatever was installed before when dropped.
pub struct ConsoleRedirect {
    previous: Option<Redirect>,
}

impl ConsoleRedirect {
    /// Redirect to the standard console, prefixing lines when `prefix` is set
    pub fn install(prefix: Option<String>) -> Self {
        Self::install_with(prefix, Console::standard())
    }

    pub fn install_with(prefix: Option<String>, console: Console) -> Self {
        let previous =
            REDIRECT.with(|slot| slot.borrow_mut().replace(Redirect { prefix, console }));
        Self { previous }
    }
}

impl Drop for ConsoleRedirect {
    fn drop(&mut self) {
        let previous = self.previous.take();
        REDIRECT.with(|slot| *slot.borrow_mut() = previous);
    }
}

/// The current thread's redirect, carried to a helper thread
#[derive(Clone)]
pub struct InheritedConsole(Option<Redirect>);

/// Capture the redirect installed on this thread, if any
pub fn inherit() -> InheritedConsole {
    InheritedConsole(REDIRECT.with(|slot| slot.borrow().clone()))
}

impl InheritedConsole {
    /// Install on the calling thread until the returned guard drops
    pub fn install(self) -> ConsoleRedirect {
        let previous = REDIRECT.with(|slot| std::mem::replace(&mut *slot.borrow_mut(), self.0));
        ConsoleRedirect { previous }
    }
}

#[derive(Clone, Copy)]
enum Stream {
    Out,
    Err,
}

/// Line-oriented writer over the current thread's console
pub struct ConsoleWriter {
    stream: Stream,
    pending: Vec<u8>,
}

/// Writer for generator standard output
pub fn stdout() -> ConsoleWriter {
    ConsoleWriter {
        stream: Stream::Out,
        pending: Vec::new(),
    }
}

/// Writer for generator error output
pub fn stderr() -> ConsoleWriter {
    ConsoleWriter {
        stream: Stream::Err,
        pending: Vec::new(),
    }
}

impl ConsoleWriter {
    fn emit(&self, line: &[u8]) -> io::Result<()> {
        let redirect = REDIRECT.with(|slot| slot.borrow().clone());
        let redirect = redirect.unwrap_or_else(|| Redirect {
            prefix: None,
            console: Console::standard(),
        });
        let sink = match self.stream {
            Stream::Out => &redirect.console.out,
            Stream::Err => &redirect.console.err,
        };
        // one lock per line keeps lines from different workers whole
        let mut sink = sink.lock();
        if let Some(prefix) = &redirect.prefix {
            write!(sink, "[{}] ", prefix)?;
        }
        sink.write_all(line)?;
        sink.write_all(b"\n")?;
        sink.flush()
    }
}

impl Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.emit(&line[..line.len() - 1])?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            self.emit(&line)?;
        }
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
