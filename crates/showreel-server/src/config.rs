//! Environment-driven server configuration.

use showreel_plugin::LogLevel;

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    pub bind_addr: String,
    /// Level attributed to plugin output lines that carry no level header.
    pub plugin_log_level: LogLevel,
    /// Capacity of the shared progress channel.
    pub progress_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:9780".to_string(),
            plugin_log_level: LogLevel::Info,
            progress_buffer: 64,
        }
    }
}

impl ServerConfig {
    /// Read configuration from `SHOWREEL_*` environment variables,
    /// falling back to defaults. Unparseable values are logged and
    /// ignored rather than aborting startup.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bind_addr =
            std::env::var("SHOWREEL_BIND").unwrap_or(defaults.bind_addr);

        let plugin_log_level = match std::env::var("SHOWREEL_PLUGIN_LOG_LEVEL") {
            Ok(name) => match LogLevel::from_name(&name) {
                Some(level) => level,
                None => {
                    tracing::warn!(value = %name, "unknown SHOWREEL_PLUGIN_LOG_LEVEL, using default");
                    defaults.plugin_log_level
                }
            },
            Err(_) => defaults.plugin_log_level,
        };

        let progress_buffer = match std::env::var("SHOWREEL_PROGRESS_BUFFER") {
            Ok(raw) => match raw.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    tracing::warn!(value = %raw, "invalid SHOWREEL_PROGRESS_BUFFER, using default");
                    defaults.progress_buffer
                }
            },
            Err(_) => defaults.progress_buffer,
        };

        Self {
            bind_addr,
            plugin_log_level,
            progress_buffer,
        }
    }
}
