//! API Gateway HTTP API (payload v2) event accessors and proxy responses.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::types::UserId;

pub const DEFAULT_PAGINATION_LIMIT: i32 = 50;

const ALLOW_HEADERS: &str = "Content-Type,Authorization,X-Amz-Date,X-Api-Key,X-Amz-Security-Token";
const ALLOW_METHODS: &str = "OPTIONS,GET,PUT,POST";

pub type PathParams = BTreeMap<String, String>;
pub type QueryParams = BTreeMap<String, String>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiGatewayResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl ApiGatewayResponse {
    /// Parses the body back into JSON. Mostly useful in tests.
    pub fn json_body(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    AuthenticationFailed,
    AuthorizationFailed,
    ResourceNotFound,
    MethodNotAllowed,
    RateLimitExceeded,
    InternalError,
    AiServiceUnavailable,
}

impl ErrorCode {
    pub fn status_code(self) -> u16 {
        match self {
            Self::ValidationError => 400,
            Self::AuthenticationFailed => 401,
            Self::AuthorizationFailed => 403,
            Self::ResourceNotFound => 404,
            Self::MethodNotAllowed => 405,
            Self::RateLimitExceeded => 429,
            Self::InternalError => 500,
            Self::AiServiceUnavailable => 503,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::AuthenticationFailed => "AUTHENTICATION_FAILED",
            Self::AuthorizationFailed => "AUTHORIZATION_FAILED",
            Self::ResourceNotFound => "RESOURCE_NOT_FOUND",
            Self::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::InternalError => "INTERNAL_ERROR",
            Self::AiServiceUnavailable => "AI_SERVICE_UNAVAILABLE",
        }
    }

    pub fn default_message(self) -> &'static str {
        match self {
            Self::ValidationError => "The request is invalid.",
            Self::AuthenticationFailed => "Authentication failed.",
            Self::AuthorizationFailed => "You are not allowed to access this resource.",
            Self::ResourceNotFound => "The requested resource was not found.",
            Self::MethodNotAllowed => "Method not allowed.",
            Self::RateLimitExceeded => "Too many requests. Please try again later.",
            Self::InternalError => "An internal error occurred.",
            Self::AiServiceUnavailable => "The AI feedback service is currently unavailable.",
        }
    }
}

fn http_field<'a>(event: &'a Value, field: &str) -> Option<&'a str> {
    event
        .get("requestContext")
        .and_then(|context| context.get("http"))
        .and_then(|http| http.get(field))
        .and_then(Value::as_str)
}

pub fn method(event: &Value) -> String {
    http_field(event, "method").unwrap_or("UNKNOWN").to_string()
}

pub fn path(event: &Value) -> String {
    http_field(event, "path").unwrap_or_default().to_string()
}

fn string_map(event: &Value, field: &str) -> BTreeMap<String, String> {
    event
        .get(field)
        .and_then(Value::as_object)
        .map(|object| {
            object
                .iter()
                .filter_map(|(key, value)| {
                    value.as_str().map(|text| (key.clone(), text.to_string()))
                })
                .collect()
        })
        .unwrap_or_default()
}

pub fn path_parameters(event: &Value) -> PathParams {
    string_map(event, "pathParameters")
}

pub fn query_parameters(event: &Value) -> QueryParams {
    string_map(event, "queryStringParameters")
}

/// Raw request body, base64-decoded when the gateway flagged it. `None` when
/// there is no body or it is empty.
pub fn body_bytes(event: &Value) -> Option<Vec<u8>> {
    let body = event.get("body").and_then(Value::as_str)?;
    if body.is_empty() {
        return None;
    }
    let encoded = event
        .get("isBase64Encoded")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if encoded {
        STANDARD.decode(body).ok()
    } else {
        Some(body.as_bytes().to_vec())
    }
}

pub fn body_text(event: &Value) -> Option<String> {
    body_bytes(event).and_then(|bytes| String::from_utf8(bytes).ok())
}

/// `limit` query parameter. Anything but a positive integer falls back to
/// the default page size.
pub fn pagination_limit(query: &QueryParams) -> i32 {
    let Some(raw) = query.get("limit") else {
        return DEFAULT_PAGINATION_LIMIT;
    };
    match raw.trim().parse::<i32>() {
        Ok(limit) if limit > 0 => limit,
        _ => {
            tracing::warn!(event = "invalid_limit_param", limit = %raw);
            DEFAULT_PAGINATION_LIMIT
        }
    }
}

pub fn last_evaluated_key(query: &QueryParams) -> Option<Value> {
    let raw = query.get("lastEvaluatedKey")?;
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => {
            tracing::warn!(event = "invalid_last_evaluated_key_param");
            None
        }
    }
}

/// `sub` claim the authorizer placed into the request context.
pub fn user_id(event: &Value) -> Option<UserId> {
    let sub = event
        .get("requestContext")
        .and_then(|context| context.get("authorizer"))
        .and_then(|authorizer| authorizer.get("lambda"))
        .and_then(|lambda| lambda.get("sub"))?;
    let user = match sub {
        Value::String(text) if !text.is_empty() => text.clone(),
        Value::Number(number) => number.to_string(),
        _ => return None,
    };
    Some(user)
}

/// Echoes the `origin` header when it is a local dev server or a GitHub Pages
/// site. Requests without an origin get `*`; anything else gets `"null"`.
pub fn allowed_origin(event: &Value) -> String {
    let origin = event
        .get("headers")
        .and_then(|headers| headers.get("origin"))
        .and_then(Value::as_str)
        .unwrap_or_default();

    if origin.is_empty() {
        return "*".to_string();
    }
    if origin.starts_with("http://localhost:") || origin.starts_with("http://127.0.0.1:") {
        return origin.to_string();
    }
    let is_github_pages = origin
        .strip_prefix("https://")
        .and_then(|host| host.strip_suffix(".github.io"))
        .map(|name| !name.is_empty() && !name.contains('/'))
        .unwrap_or(false);
    if is_github_pages {
        return origin.to_string();
    }

    tracing::warn!(event = "origin_rejected", origin = %origin);
    "null".to_string()
}

pub fn format_response(
    status_code: u16,
    body: &impl Serialize,
    event: Option<&Value>,
) -> ApiGatewayResponse {
    let origin = event.map(allowed_origin).unwrap_or_else(|| "*".to_string());
    let headers = BTreeMap::from([
        ("Content-Type".to_string(), "application/json".to_string()),
        ("Access-Control-Allow-Origin".to_string(), origin),
        (
            "Access-Control-Allow-Headers".to_string(),
            ALLOW_HEADERS.to_string(),
        ),
        (
            "Access-Control-Allow-Methods".to_string(),
            ALLOW_METHODS.to_string(),
        ),
    ]);
    let body = match serde_json::to_string(body) {
        Ok(text) => text,
        Err(error) => {
            tracing::error!(event = "response_serialization_failed", error = %error);
            return error_response(ErrorCode::InternalError, None, None, event);
        }
    };
    ApiGatewayResponse {
        status_code,
        headers,
        body,
    }
}

pub fn error_response(
    code: ErrorCode,
    message: Option<&str>,
    details: Option<Value>,
    event: Option<&Value>,
) -> ApiGatewayResponse {
    let mut payload = json!({
        "message": message.unwrap_or(code.default_message()),
        "code": code.as_str(),
    });
    if let (Some(details), Some(object)) = (details, payload.as_object_mut()) {
        object.insert("details".to_string(), details);
    }
    format_response(code.status_code(), &payload, event)
}
