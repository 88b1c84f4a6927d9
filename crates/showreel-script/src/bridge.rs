//! Capability bridge installed into every execution context.
//!
//! Four fixed namespaces — `console`, `log`, `util`, `gql` — are set up
//! before any guest code runs. Renaming any of them is a breaking contract
//! change. Bridge internals return `Result`; conversion into a native Lua
//! error happens only at the `create_function` boundary, so guest code can
//! `pcall` around any bridge call.

use std::sync::Arc;
use std::time::Duration;

use mlua::Lua;
use tokio::sync::mpsc;

use crate::error::ScriptError;
use crate::gql::GqlClient;
use crate::host::ExecutionOptions;
use crate::value::GuestValue;
use showreel_plugin::{LogLevel, LogSink};

/// Prefix applied to every textual message before it reaches the sink, so
/// plugin-origin lines stand out in the shared log stream.
const PLUGIN_PREFIX: &str = "[Plugin] ";

struct BridgeState {
    sink: Arc<dyn LogSink>,
    progress: Option<mpsc::Sender<f64>>,
}

impl BridgeState {
    fn emit(&self, level: LogLevel, value: &GuestValue) {
        self.sink
            .log(level, &format!("{PLUGIN_PREFIX}{}", value.stringify()));
    }

    /// Clamp-then-non-blocking-send, same policy as the wire decoder's
    /// progress path.
    fn send_progress(&self, value: f64) {
        if !value.is_finite() {
            self.sink.log(
                LogLevel::Error,
                &format!("{PLUGIN_PREFIX}invalid progress value \"{value}\""),
            );
            return;
        }
        let value = value.clamp(0.0, 1.0);
        if let Some(progress) = &self.progress {
            let _ = progress.try_send(value);
        }
    }
}

/// Install the bridge namespaces into a fresh guest state.
pub(crate) fn install(lua: &Lua, options: &ExecutionOptions) -> Result<(), ScriptError> {
    let state = Arc::new(BridgeState {
        sink: options.sink.clone(),
        progress: options.progress.clone(),
    });
    let globals = lua.globals();

    // console.* mirrors what subprocess plugins get from their stdio.
    let console = lua.create_table()?;
    for (name, level) in [
        ("log", LogLevel::Info),
        ("info", LogLevel::Info),
        ("debug", LogLevel::Debug),
        ("warn", LogLevel::Warning),
        ("error", LogLevel::Error),
    ] {
        console.set(name, log_fn(lua, state.clone(), level)?)?;
    }
    globals.set("console", console)?;

    let log = lua.create_table()?;
    for (name, level) in [
        ("Trace", LogLevel::Trace),
        ("Debug", LogLevel::Debug),
        ("Info", LogLevel::Info),
        ("Warn", LogLevel::Warning),
        ("Error", LogLevel::Error),
    ] {
        log.set(name, log_fn(lua, state.clone(), level)?)?;
    }
    let progress_state = state.clone();
    log.set(
        "Progress",
        lua.create_function(move |_, value: f64| {
            progress_state.send_progress(value);
            Ok(())
        })?,
    )?;
    globals.set("log", log)?;

    let util = lua.create_table()?;
    util.set(
        "Sleep",
        lua.create_function(|_, milliseconds: u64| {
            // Occupies the invocation's host thread; no cooperative yield.
            std::thread::sleep(Duration::from_millis(milliseconds));
            Ok(())
        })?,
    )?;
    globals.set("util", util)?;

    let gql = lua.create_table()?;
    let client = options
        .handler
        .clone()
        .map(|handler| GqlClient::new(handler, options.session_cookie.clone()));
    gql.set(
        "Do",
        lua.create_function(
            move |lua, (query, variables): (String, Option<mlua::Value>)| {
                let client = client.as_ref().ok_or_else(|| {
                    mlua::Error::RuntimeError(
                        "gql.Do: no API handler bound to this invocation".into(),
                    )
                })?;
                let variables = match &variables {
                    Some(v) if !matches!(v, mlua::Value::Nil) => {
                        Some(GuestValue::from_lua(v).map_err(mlua::Error::external)?)
                    }
                    _ => None,
                };
                let data = client
                    .execute(&query, variables)
                    .map_err(mlua::Error::external)?;
                data.to_lua(lua)
            },
        )?,
    )?;
    globals.set("gql", gql)?;

    // Stray print() calls land in the log stream instead of host stdout.
    globals.set("print", log_fn(lua, state, LogLevel::Info)?)?;

    Ok(())
}

fn log_fn(
    lua: &Lua,
    state: Arc<BridgeState>,
    level: LogLevel,
) -> mlua::Result<mlua::Function> {
    lua.create_function(move |_, value: mlua::Value| {
        let value = GuestValue::from_lua(&value).map_err(mlua::Error::external)?;
        state.emit(level, &value);
        Ok(())
    })
}
