//! Explicit logging context.
//!
//! A [`Logger`] is created once when a run starts and handed to every
//! component that needs to report something. Child loggers created with
//! [`Logger::with`] share the same sink and carry extra `key=value` fields,
//! which is how plugin-scoped messages are tagged.
//!
//! Log lines go to stderr by default, with the same colored prefixes the CLI
//! uses for user-facing warnings. [`Logger::print`] output is part of the
//! command's result and goes to stdout. Tests use [`Logger::capture`] to read
//! back both streams from one buffer.

use std::{
    fmt::{self, Display},
    io::{self, Write},
    sync::{Arc, Mutex},
};

use colored::Colorize;

/// Severity of a log line. Ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

type Sink = Arc<Mutex<Box<dyn Write + Send>>>;

#[derive(Clone)]
pub struct Logger {
    level: LogLevel,
    color: bool,
    fields: Vec<(String, String)>,
    sink: Sink,
    out: Sink,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

impl Logger {
    /// Logger writing colored lines to stderr and printed output to stdout.
    pub fn stderr(level: LogLevel) -> Self {
        Self::with_sinks(level, true, Box::new(io::stderr()), Box::new(io::stdout()))
    }

    /// Logger writing plain lines and printed output into one in-memory
    /// buffer.
    pub fn capture(level: LogLevel) -> (Self, LogBuffer) {
        let buffer = LogBuffer::default();
        let boxed: Box<dyn Write + Send> = Box::new(buffer.clone());
        let sink: Sink = Arc::new(Mutex::new(boxed));
        let logger = Self {
            level,
            color: false,
            fields: Vec::new(),
            sink: sink.clone(),
            out: sink,
        };
        (logger, buffer)
    }

    fn with_sinks(
        level: LogLevel,
        color: bool,
        sink: Box<dyn Write + Send>,
        out: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            level,
            color,
            fields: Vec::new(),
            sink: Arc::new(Mutex::new(sink)),
            out: Arc::new(Mutex::new(out)),
        }
    }

    /// Child logger sharing this sink, tagged with an extra field.
    pub fn with(&self, key: &str, value: impl Display) -> Self {
        let mut child = self.clone();
        child.fields.push((key.to_string(), value.to_string()));
        child
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level <= self.level
    }

    pub fn error(&self, msg: impl Display) {
        self.log(LogLevel::Error, msg);
    }

    pub fn warn(&self, msg: impl Display) {
        self.log(LogLevel::Warn, msg);
    }

    pub fn info(&self, msg: impl Display) {
        self.log(LogLevel::Info, msg);
    }

    pub fn debug(&self, msg: impl Display) {
        self.log(LogLevel::Debug, msg);
    }

    /// Unconditional user-facing output on the output stream, no prefix and
    /// no fields.
    pub fn print(&self, msg: impl Display) {
        write_line(&self.out, &msg.to_string());
    }

    fn log(&self, level: LogLevel, msg: impl Display) {
        if !self.enabled(level) {
            return;
        }
        let mut line = format!("{} {}", self.prefix(level), msg);
        for (key, value) in &self.fields {
            line.push_str(&format!(" {}={}", key, value));
        }
        write_line(&self.sink, &line);
    }

    fn prefix(&self, level: LogLevel) -> String {
        let label = match level {
            LogLevel::Error => "error:",
            LogLevel::Warn => "warning:",
            LogLevel::Info => "info:",
            LogLevel::Debug => "debug:",
        };
        if !self.color {
            return label.to_string();
        }
        match level {
            LogLevel::Error => label.bold().red().to_string(),
            LogLevel::Warn => label.bold().yellow().to_string(),
            LogLevel::Info => label.bold().cyan().to_string(),
            LogLevel::Debug => label.dimmed().to_string(),
        }
    }

}

fn write_line(sink: &Sink, line: &str) {
    let mut sink = sink.lock().unwrap_or_else(|e| e.into_inner());
    // a failing sink never aborts generation
    let _ = writeln!(sink, "{}", line);
}

/// Shared in-memory sink used by [`Logger::capture`].
#[derive(Debug, Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
