//! Line-oriented outputs for the dispatcher: the console in interactive mode
//! and the micro-benchmark log in batch mode.

use std::fmt;
use std::io::Write;
use std::path::Path;

use parking_lot::Mutex;
use tracing_appender::rolling::{self, RollingFileAppender};

use crate::utils::prelude::*;

/// An append-only sink of text lines
pub trait LogSink: Send + Sync {
    fn write_line(&self, line: &str) -> Result<()>;
}

/// Prints to stdout
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn write_line(&self, line: &str) -> Result<()> {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        writeln!(out, "{}", line)?;
        out.flush()?;
        Ok(())
    }
}

/// Appends to a file that is never rotated
pub struct FileSink {
    writer: Mutex<RollingFileAppender>,
}

impl FileSink {
    pub fn new(directory: impl AsRef<Path>, file: impl AsRef<Path>) -> Self {
        FileSink {
            writer: Mutex::new(rolling::never(directory, file)),
        }
    }
}

impl fmt::Debug for FileSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FileSink")
    }
}

impl LogSink for FileSink {
    fn write_line(&self, line: &str) -> Result<()> {
        let mut writer = self.writer.lock();
        writeln!(writer, "{} {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"), line)?;
        writer.flush()?;
        Ok(())
    }
}

/// Keeps lines in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

impl LogSink for MemorySink {
    fn write_line(&self, line: &str) -> Result<()> {
        self.lines.lock().push(line.to_owned());
        Ok(())
    }
}

/// Discards everything
#[derive(Debug, Default)]
pub struct NullSink;

impl LogSink for NullSink {
    fn write_line(&self, _line: &str) -> Result<()> {
        Ok(())
    }
}
