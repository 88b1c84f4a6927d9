//! Guest value representation.
//!
//! Everything crossing the host/guest boundary goes through this tagged
//! union rather than through engine reflection. Maps preserve insertion
//! order so GraphQL variables replay in the order the guest built them.

use mlua::Lua;

use crate::error::ScriptError;

/// Nesting limit for guest-to-host conversion. Lua tables can be cyclic;
/// conversion of anything deeper than this fails instead of recursing
/// forever.
const MAX_DEPTH: usize = 32;

/// A duck-typed guest value.
#[derive(Debug, Clone, PartialEq)]
pub enum GuestValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<GuestValue>),
    Map(Vec<(String, GuestValue)>),
}

impl GuestValue {
    // ── JSON conversions ─────────────────────────────────────────────

    pub fn from_json(value: &serde_json::Value) -> GuestValue {
        match value {
            serde_json::Value::Null => GuestValue::Null,
            serde_json::Value::Bool(b) => GuestValue::Bool(*b),
            serde_json::Value::Number(n) => GuestValue::Number(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::String(s) => GuestValue::String(s.clone()),
            serde_json::Value::Array(items) => {
                GuestValue::List(items.iter().map(GuestValue::from_json).collect())
            }
            serde_json::Value::Object(entries) => GuestValue::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), GuestValue::from_json(v)))
                    .collect(),
            ),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            GuestValue::Null => serde_json::Value::Null,
            GuestValue::Bool(b) => serde_json::Value::Bool(*b),
            GuestValue::Number(n) => json_number(*n),
            GuestValue::String(s) => serde_json::Value::String(s.clone()),
            GuestValue::List(items) => {
                serde_json::Value::Array(items.iter().map(GuestValue::to_json).collect())
            }
            GuestValue::Map(entries) => {
                let mut map = serde_json::Map::new();
                for (k, v) in entries {
                    map.insert(k.clone(), v.to_json());
                }
                serde_json::Value::Object(map)
            }
        }
    }

    // ── Lua conversions ──────────────────────────────────────────────

    /// Convert a Lua value into a guest value.
    ///
    /// Non-data values (functions, coroutines, userdata) convert to
    /// `Null`. A table is a `List` iff its keys are exactly 1..=n.
    pub fn from_lua(value: &mlua::Value) -> Result<GuestValue, ScriptError> {
        Self::from_lua_depth(value, 0)
    }

    fn from_lua_depth(value: &mlua::Value, depth: usize) -> Result<GuestValue, ScriptError> {
        if depth > MAX_DEPTH {
            return Err(ScriptError::Runtime(format!(
                "guest value nesting exceeds {MAX_DEPTH} levels"
            )));
        }
        Ok(match value {
            mlua::Value::Nil => GuestValue::Null,
            mlua::Value::Boolean(b) => GuestValue::Bool(*b),
            mlua::Value::Integer(i) => GuestValue::Number(*i as f64),
            mlua::Value::Number(n) => GuestValue::Number(*n),
            mlua::Value::String(s) => GuestValue::String(s.to_string_lossy()),
            mlua::Value::Table(table) => Self::table_to_guest(table, depth)?,
            _ => GuestValue::Null,
        })
    }

    fn table_to_guest(table: &mlua::Table, depth: usize) -> Result<GuestValue, ScriptError> {
        let mut integer_keyed: Vec<(i64, GuestValue)> = Vec::new();
        let mut entries: Vec<(String, GuestValue)> = Vec::new();
        let mut is_list = true;

        for pair in table.clone().pairs::<mlua::Value, mlua::Value>() {
            let (key, value) = pair.map_err(|e| ScriptError::Runtime(e.to_string()))?;
            let converted = Self::from_lua_depth(&value, depth + 1)?;
            match &key {
                mlua::Value::Integer(i) if *i >= 1 => {
                    integer_keyed.push((*i, converted.clone()));
                }
                _ => is_list = false,
            }
            entries.push((lua_key_to_string(&key), converted));
        }

        if is_list && !integer_keyed.is_empty() {
            integer_keyed.sort_by_key(|(i, _)| *i);
            let contiguous = integer_keyed
                .iter()
                .enumerate()
                .all(|(idx, (i, _))| *i == idx as i64 + 1);
            if contiguous {
                return Ok(GuestValue::List(
                    integer_keyed.into_iter().map(|(_, v)| v).collect(),
                ));
            }
        }
        Ok(GuestValue::Map(entries))
    }

    /// Build the Lua representation of this value.
    pub fn to_lua(&self, lua: &Lua) -> mlua::Result<mlua::Value> {
        Ok(match self {
            GuestValue::Null => mlua::Value::Nil,
            GuestValue::Bool(b) => mlua::Value::Boolean(*b),
            GuestValue::Number(n) => mlua::Value::Number(*n),
            GuestValue::String(s) => mlua::Value::String(lua.create_string(s)?),
            GuestValue::List(items) => {
                let table = lua.create_table()?;
                for (i, item) in items.iter().enumerate() {
                    table.raw_set(i as i64 + 1, item.to_lua(lua)?)?;
                }
                mlua::Value::Table(table)
            }
            GuestValue::Map(entries) => {
                let table = lua.create_table()?;
                for (k, v) in entries {
                    table.raw_set(k.as_str(), v.to_lua(lua)?)?;
                }
                mlua::Value::Table(table)
            }
        })
    }

    // ── Display for the log bridge ───────────────────────────────────

    /// Render for the log stream: primitives directly, structured values
    /// as JSON so they stay greppable.
    pub fn stringify(&self) -> String {
        match self {
            GuestValue::Null => "nil".to_string(),
            GuestValue::Bool(b) => b.to_string(),
            GuestValue::Number(n) => format_number(*n),
            GuestValue::String(s) => s.clone(),
            GuestValue::List(_) | GuestValue::Map(_) => {
                serde_json::to_string(&self.to_json()).unwrap_or_else(|_| "<unserializable>".into())
            }
        }
    }
}

/// Integral floats serialize as JSON integers, matching how guests wrote
/// them.
fn json_number(n: f64) -> serde_json::Value {
    if n.is_finite() && n.fract() == 0.0 && (i64::MIN as f64..=i64::MAX as f64).contains(&n) {
        serde_json::Value::Number(serde_json::Number::from(n as i64))
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && (i64::MIN as f64..=i64::MAX as f64).contains(&n) {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn lua_key_to_string(key: &mlua::Value) -> String {
    match key {
        mlua::Value::String(s) => s.to_string_lossy(),
        mlua::Value::Integer(i) => i.to_string(),
        mlua::Value::Number(n) => format_number(*n),
        mlua::Value::Boolean(b) => b.to_string(),
        other => format!("<{}>", other.type_name()),
    }
}
