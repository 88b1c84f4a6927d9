//! Script runtime error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScriptError {
    /// Malformed guest source. Fatal to the invocation, carries the
    /// program's name.
    #[error("compile error in {name}: {message}")]
    Compile { name: String, message: String },

    /// The guest threw, or a bridge call failed and the guest did not
    /// catch it.
    #[error("runtime error: {0}")]
    Runtime(String),

    /// GraphQL replay failure, with enough context to debug without a
    /// network capture.
    #[error("graphql request failed: {message} (query: {query}, variables: {variables})")]
    Gql {
        message: String,
        query: String,
        variables: String,
    },

    /// The in-process request handler collaborator failed.
    #[error("request handler error: {0}")]
    Handler(String),

    #[error("script engine error: {0}")]
    Engine(#[from] mlua::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
