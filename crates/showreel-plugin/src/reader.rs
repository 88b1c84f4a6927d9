//! Reader loop for a plugin's shared output stream.
//!
//! One reader runs per plugin invocation, on its own thread, until the
//! stream closes. Log lines are handed to the [`LogSink`] synchronously so
//! ordering is preserved; progress updates go through a bounded channel
//! with a non-blocking send, so a slow consumer loses updates instead of
//! stalling the subprocess.

use std::io::BufRead;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::PluginError;
use crate::level::LogLevel;
use crate::wire::decode_line;

/// Destination for plugin log lines.
///
/// Implementations must not filter by severity; every line the reader
/// dispatches is forwarded.
pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);
}

/// Consumes a plugin output stream line by line.
pub struct StreamReader {
    plugin_name: String,
    sink: Arc<dyn LogSink>,
    progress: Option<mpsc::Sender<f64>>,
    default_level: LogLevel,
}

impl StreamReader {
    /// Create a reader for the named plugin. Unleveled lines are attributed
    /// to Info unless [`with_default_level`](Self::with_default_level)
    /// overrides it.
    pub fn new(plugin_name: impl Into<String>, sink: Arc<dyn LogSink>) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            sink,
            progress: None,
            default_level: LogLevel::Info,
        }
    }

    /// Deliver progress updates to the given channel.
    pub fn with_progress(mut self, progress: mpsc::Sender<f64>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Attribute unleveled lines to this level. `LogLevel::None` drops them.
    pub fn with_default_level(mut self, level: LogLevel) -> Self {
        self.default_level = level;
        self
    }

    /// Read the stream until EOF, dispatching every non-empty line.
    ///
    /// The reader owns the stream: it is dropped (closed) when this
    /// returns. An I/O failure terminates the loop, is reported to the
    /// sink, and is returned as [`PluginError::Stream`]; a malformed line
    /// never does either.
    pub fn consume<R: BufRead>(&self, stream: R) -> Result<(), PluginError> {
        tracing::debug!(plugin = %self.plugin_name, "reading plugin output");
        for line in stream.lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    self.sink.log(
                        LogLevel::Error,
                        &self.tagged(&format!("error reading plugin output: {e}")),
                    );
                    return Err(PluginError::Stream(e));
                }
            };
            if line.is_empty() {
                continue;
            }

            let decoded = decode_line(&line);
            match decoded.level {
                Some(LogLevel::Progress) => self.handle_progress(&decoded.payload),
                Some(level) => self.dispatch(level, &decoded.payload),
                None => self.dispatch(self.default_level, &decoded.payload),
            }
        }
        tracing::debug!(plugin = %self.plugin_name, "plugin output stream closed");
        Ok(())
    }

    fn dispatch(&self, level: LogLevel, payload: &str) {
        if level == LogLevel::None || payload.is_empty() {
            return;
        }
        self.sink.log(level, &self.tagged(payload));
    }

    /// Parse, clamp and send a progress payload. Malformed payloads are
    /// logged as errors; the stream keeps going.
    fn handle_progress(&self, payload: &str) {
        let value = match payload.parse::<f64>() {
            Ok(v) if v.is_finite() => v.clamp(0.0, 1.0),
            _ => {
                self.sink.log(
                    LogLevel::Error,
                    &self.tagged(&format!("invalid progress value \"{payload}\"")),
                );
                return;
            }
        };
        if let Some(progress) = &self.progress {
            // Lossy by design of the channel: no receiver ready, no update.
            let _ = progress.try_send(value);
        }
    }

    fn tagged(&self, message: &str) -> String {
        format!("[Plugin / {}] {}", self.plugin_name, message)
    }
}
