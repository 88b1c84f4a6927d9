//! Showreel embedded script runtime.
//!
//! Plugins can run as Lua scripts inside the host process instead of as
//! subprocesses. Each invocation gets a fresh, isolated execution context
//! with four bridge namespaces (`console`, `log`, `util`, `gql`) installed
//! before any guest code runs. Guest values cross the boundary through the
//! [`GuestValue`] sum type; guest failures unwind as native Lua errors and
//! surface to the host as [`ScriptError::Runtime`].

pub mod bridge;
pub mod error;
pub mod gql;
pub mod host;
pub mod value;

pub use error::ScriptError;
pub use gql::{ApiRequest, ApiResponse, GqlClient, RequestHandler, GRAPHQL_PATH};
pub use host::{CompiledProgram, ExecutionContext, ExecutionOptions, ScriptHost};
pub use value::GuestValue;
