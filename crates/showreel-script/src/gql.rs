//! GraphQL replay adapter.
//!
//! `gql.Do` never opens a socket: the call is marshalled to JSON and
//! replayed as an in-process POST against the host's own API handler,
//! with the invocation's session cookie attached so it runs with the
//! invoking user's authorization.

use std::sync::Arc;

use serde::Deserialize;

use crate::error::ScriptError;
use crate::value::GuestValue;

/// Virtual path the replay targets.
pub const GRAPHQL_PATH: &str = "/graphql";

/// An in-process API request.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// An in-process API response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// The host's API handler collaborator. Implementations serve the call
/// in-process; no network round trip is involved.
pub trait RequestHandler: Send + Sync {
    fn handle(&self, request: ApiRequest) -> Result<ApiResponse, ScriptError>;
}

#[derive(Debug, Deserialize)]
struct GqlResponse {
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    errors: Option<Vec<GqlResponseError>>,
}

#[derive(Debug, Deserialize)]
struct GqlResponseError {
    #[serde(default)]
    message: String,
}

/// Executes GraphQL calls for one invocation.
pub struct GqlClient {
    handler: Arc<dyn RequestHandler>,
    session_cookie: Option<String>,
}

impl GqlClient {
    pub fn new(handler: Arc<dyn RequestHandler>, session_cookie: Option<String>) -> Self {
        Self {
            handler,
            session_cookie,
        }
    }

    /// Execute a query and return its `data`.
    ///
    /// Non-empty `errors` always fails, even when `data` is populated. A
    /// non-2xx status with a non-empty body fails with the raw body text
    /// attached. Failure messages carry the query and variables so guest
    /// errors are debuggable without a network capture.
    pub fn execute(
        &self,
        query: &str,
        variables: Option<GuestValue>,
    ) -> Result<GuestValue, ScriptError> {
        let variables_json = variables
            .as_ref()
            .map(GuestValue::to_json)
            .unwrap_or(serde_json::Value::Null);

        let mut payload = serde_json::Map::new();
        payload.insert("query".into(), serde_json::Value::String(query.into()));
        if !variables_json.is_null() {
            payload.insert("variables".into(), variables_json.clone());
        }
        let body = serde_json::to_vec(&serde_json::Value::Object(payload))?;

        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        if let Some(cookie) = &self.session_cookie {
            headers.push(("Cookie".to_string(), format!("session={cookie}")));
        }

        let response = self.handler.handle(ApiRequest {
            method: "POST".into(),
            path: GRAPHQL_PATH.into(),
            headers,
            body,
        })?;

        let gql_error = |message: String| ScriptError::Gql {
            message,
            query: query.to_string(),
            variables: variables_json.to_string(),
        };

        let body_text = String::from_utf8_lossy(&response.body);
        if !(200..300).contains(&response.status) && !response.body.is_empty() {
            return Err(gql_error(format!(
                "status {}: {}",
                response.status, body_text
            )));
        }

        let parsed: GqlResponse = serde_json::from_slice(&response.body)?;
        if let Some(errors) = &parsed.errors {
            if !errors.is_empty() {
                let joined = errors
                    .iter()
                    .map(|e| e.message.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(gql_error(joined));
            }
        }

        Ok(parsed
            .data
            .as_ref()
            .map(GuestValue::from_json)
            .unwrap_or(GuestValue::Null))
    }
}
