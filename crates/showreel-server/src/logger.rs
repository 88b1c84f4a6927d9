//! Bridges plugin log output into the host's tracing subscriber.

use showreel_plugin::{LogLevel, LogSink};

/// Forwards every plugin log line to `tracing` at the matching level.
///
/// Progress updates that reach a sink (rather than the progress channel)
/// are surfaced at info. [`LogLevel::None`] lines are dropped.
pub struct TracingLog;

impl LogSink for TracingLog {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Trace => tracing::trace!(target: "showreel::plugin", "{message}"),
            LogLevel::Debug => tracing::debug!(target: "showreel::plugin", "{message}"),
            LogLevel::Info | LogLevel::Progress => {
                tracing::info!(target: "showreel::plugin", "{message}")
            }
            LogLevel::Warning => tracing::warn!(target: "showreel::plugin", "{message}"),
            LogLevel::Error => tracing::error!(target: "showreel::plugin", "{message}"),
            LogLevel::None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_levels_accepted() {
        // Dispatch must not panic regardless of subscriber state.
        let sink = TracingLog;
        for level in [
            LogLevel::Trace,
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warning,
            LogLevel::Error,
            LogLevel::Progress,
            LogLevel::None,
        ] {
            sink.log(level, "message");
        }
    }
}
