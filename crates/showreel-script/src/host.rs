//! Script host — compiles guest source and runs it in isolated contexts.
//!
//! Programs are compiled once and cached by name; execution contexts are
//! created per invocation and discarded afterwards, so no guest state can
//! leak between runs. The cache only needs synchronization while it is
//! being populated; cached programs are immutable.

use std::collections::HashMap;
use std::sync::Arc;

use mlua::Lua;
use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::bridge;
use crate::error::ScriptError;
use crate::gql::RequestHandler;
use crate::value::GuestValue;
use showreel_plugin::LogSink;

/// A compiled guest program. Immutable once created; shared freely across
/// concurrent invocations.
#[derive(Debug)]
pub struct CompiledProgram {
    name: String,
    source: String,
}

impl CompiledProgram {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn source(&self) -> &str {
        &self.source
    }
}

/// Per-invocation wiring for the capability bridge.
pub struct ExecutionOptions {
    /// Plugin identity used in log tags.
    pub plugin_name: String,
    /// Destination for console/log output.
    pub sink: Arc<dyn LogSink>,
    /// Progress channel; updates are clamped and sent non-blockingly.
    pub progress: Option<mpsc::Sender<f64>>,
    /// In-process API handler backing `gql.Do`. When absent, `gql.Do`
    /// throws inside the guest.
    pub handler: Option<Arc<dyn RequestHandler>>,
    /// Session cookie replayed with GQL calls so they run with the
    /// invoking user's authorization.
    pub session_cookie: Option<String>,
}

/// Compiles and caches guest programs, creates execution contexts.
pub struct ScriptHost {
    programs: RwLock<HashMap<String, Arc<CompiledProgram>>>,
}

impl ScriptHost {
    pub fn new() -> Self {
        Self {
            programs: RwLock::new(HashMap::new()),
        }
    }

    /// Compile guest source, or return the cached program when the same
    /// source was already compiled under this name. Changed source under
    /// the same name recompiles and replaces the cache entry.
    pub fn compile(&self, source: &str, name: &str) -> Result<Arc<CompiledProgram>, ScriptError> {
        if let Some(program) = self.programs.read().get(name) {
            if program.source() == source {
                return Ok(program.clone());
            }
        }

        // Syntax check in a throwaway state; nothing is executed.
        let lua = sandboxed_lua()?;
        if let Err(e) = lua.load(source).set_name(name).into_function() {
            let message = match e {
                mlua::Error::SyntaxError { message, .. } => message,
                other => other.to_string(),
            };
            return Err(ScriptError::Compile {
                name: name.to_string(),
                message,
            });
        }

        let program = Arc::new(CompiledProgram {
            name: name.to_string(),
            source: source.to_string(),
        });
        self.programs
            .write()
            .insert(name.to_string(), program.clone());
        tracing::debug!(program = %name, "compiled guest program");
        Ok(program)
    }

    /// Create a fresh, isolated execution context with the bridge
    /// namespaces installed. Contexts are single-owner and must not be
    /// reused across invocations.
    pub fn execution(&self, options: ExecutionOptions) -> Result<ExecutionContext, ScriptError> {
        let lua = sandboxed_lua()?;
        bridge::install(&lua, &options)?;
        Ok(ExecutionContext {
            lua,
            plugin_name: options.plugin_name,
        })
    }
}

impl Default for ScriptHost {
    fn default() -> Self {
        Self::new()
    }
}

/// A single invocation's guest environment.
pub struct ExecutionContext {
    lua: Lua,
    plugin_name: String,
}

impl ExecutionContext {
    /// Run a compiled program to completion and convert its result.
    ///
    /// Blocks for the full duration, including any `util.Sleep` or
    /// `gql.Do` the guest makes. An uncaught guest error becomes
    /// [`ScriptError::Runtime`] carrying its string form.
    pub fn run(&self, program: &CompiledProgram) -> Result<GuestValue, ScriptError> {
        tracing::debug!(plugin = %self.plugin_name, program = %program.name(), "running guest program");
        let value = self
            .lua
            .load(program.source())
            .set_name(program.name())
            .eval::<mlua::Value>()
            .map_err(|e| ScriptError::Runtime(e.to_string()))?;
        GuestValue::from_lua(&value)
    }
}

/// Build a guest Lua state with only the safe stdlib subset loaded.
fn sandboxed_lua() -> Result<Lua, ScriptError> {
    let libs = mlua::StdLib::COROUTINE
        | mlua::StdLib::STRING
        | mlua::StdLib::UTF8
        | mlua::StdLib::TABLE
        | mlua::StdLib::MATH;
    let lua = Lua::new_with(libs, mlua::LuaOptions::default())?;

    // No loading of external chunks from guest code.
    let globals = lua.globals();
    globals.set("loadfile", mlua::Value::Nil)?;
    globals.set("dofile", mlua::Value::Nil)?;
    globals.set("collectgarbage", mlua::Value::Nil)?;

    Ok(lua)
}
