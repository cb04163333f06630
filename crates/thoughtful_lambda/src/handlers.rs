//! One module per Lambda function. Handlers are synchronous functions over
//! trait objects and turn every request-level failure into an API Gateway
//! response.

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use thoughtful_core::apigw::{self, error_response, ApiGatewayResponse, ErrorCode};
use thoughtful_core::throttle::RateLimitExceeded;

use crate::adapters::chatbot::ChatBotError;
use crate::throttle::ThrottleError;

pub mod auth;
pub mod authorizer;
pub mod instructor_portal;
pub mod learning_entries;
pub mod primm_feedback;
pub mod user_progress;

/// Parses the JSON request body. A missing body or one that does not match
/// `T` becomes a 400 response.
pub(crate) fn parse_body<T: DeserializeOwned>(event: &Value) -> Result<T, ApiGatewayResponse> {
    let Some(body) = apigw::body_text(event) else {
        tracing::warn!(event = "request_body_missing", path = %apigw::path(event));
        return Err(error_response(
            ErrorCode::ValidationError,
            Some("Request body is missing."),
            None,
            Some(event),
        ));
    };
    serde_json::from_str(&body).map_err(|error| {
        tracing::warn!(event = "request_body_invalid", path = %apigw::path(event), error = %error);
        error_response(
            ErrorCode::ValidationError,
            None,
            Some(json!([{ "msg": error.to_string() }])),
            Some(event),
        )
    })
}

pub(crate) fn internal_error(
    event: &Value,
    context: &str,
    error: impl fmt::Display,
) -> ApiGatewayResponse {
    tracing::error!(event = "request_failed", context = %context, error = %error);
    error_response(ErrorCode::InternalError, None, None, Some(event))
}

pub(crate) fn rate_limited(event: &Value, limit: RateLimitExceeded) -> ApiGatewayResponse {
    error_response(
        ErrorCode::RateLimitExceeded,
        Some(limit.limit.user_message()),
        Some(json!({ "limitType": limit.limit.as_str() })),
        Some(event),
    )
}

/// 503 for every AI failure except timeouts, which keep their 504.
pub(crate) fn ai_unavailable(event: &Value, error: &ChatBotError) -> ApiGatewayResponse {
    tracing::error!(event = "ai_service_failed", error = %error);
    let mut response = error_response(
        ErrorCode::AiServiceUnavailable,
        Some(error.to_string().as_str()),
        None,
        Some(event),
    );
    response.status_code = error.status_code();
    response
}

pub(crate) fn throttled_ai_failure(
    event: &Value,
    error: ThrottleError<ChatBotError>,
) -> ApiGatewayResponse {
    match error {
        ThrottleError::Limited(limit) => rate_limited(event, limit),
        ThrottleError::Store(error) => internal_error(event, "throttle_state", error),
        ThrottleError::Operation(error) => ai_unavailable(event, &error),
    }
}
