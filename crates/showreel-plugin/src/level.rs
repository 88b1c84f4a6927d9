//! Log severities and their single-character wire codes.

use std::fmt;
use std::str::FromStr;

use crate::error::PluginError;

/// Severity of a plugin log line.
///
/// Every decodable level carries a unique single-character wire code.
/// `None` has no code; it exists so a plugin's default level can be
/// configured to "drop unleveled output entirely".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
    /// Numeric progress updates, not a text severity.
    Progress,
    /// Disables attribution; lines mapped to this level are dropped.
    None,
}

impl LogLevel {
    /// All levels that can appear on the wire.
    pub const DECODABLE: &'static [LogLevel] = &[
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warning,
        LogLevel::Error,
        LogLevel::Progress,
    ];

    /// The wire code for this level, if it has one.
    pub fn code(&self) -> Option<char> {
        match self {
            LogLevel::Trace => Some('t'),
            LogLevel::Debug => Some('d'),
            LogLevel::Info => Some('i'),
            LogLevel::Warning => Some('w'),
            LogLevel::Error => Some('e'),
            LogLevel::Progress => Some('p'),
            LogLevel::None => None,
        }
    }

    /// Look up a level by its wire code.
    pub fn from_code(code: char) -> Option<LogLevel> {
        Self::DECODABLE.iter().copied().find(|l| l.code() == Some(code))
    }

    /// Look up a level by name, case-insensitively.
    pub fn from_name(name: &str) -> Option<LogLevel> {
        match name.to_ascii_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warning" => Some(LogLevel::Warning),
            "error" => Some(LogLevel::Error),
            "progress" => Some(LogLevel::Progress),
            "none" => Some(LogLevel::None),
            _ => None,
        }
    }

    /// The configuration name of this level.
    pub fn name(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Progress => "progress",
            LogLevel::None => "none",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LogLevel {
    type Err = PluginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| PluginError::UnknownLevel(s.to_string()))
    }
}
