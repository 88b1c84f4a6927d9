//! Plugin protocol error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PluginError {
    #[error("error reading plugin output: {0}")]
    Stream(#[from] std::io::Error),

    #[error("unknown log level: {0}")]
    UnknownLevel(String),
}
