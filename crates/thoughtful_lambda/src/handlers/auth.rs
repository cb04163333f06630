//! `/auth/login`, `/auth/refresh` and `/auth/logout`.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use thoughtful_core::apigw::{self, error_response, format_response, ApiGatewayResponse, ErrorCode};
use thoughtful_core::models::auth::{LoginRequest, RefreshRequest, TokenPayload};
use thoughtful_core::models::profile::ProfileUpdate;
use thoughtful_core::timestamps::to_iso;
use thoughtful_core::types::UserId;

use super::{internal_error, parse_body};
use crate::adapters::google::GoogleTokenVerifier;
use crate::adapters::stores::{RefreshTokenStore, SecretsStore, UserProfileStore};
use crate::jwt;
use crate::metrics::MetricsManager;

pub struct AuthDependencies<'a> {
    pub secrets: &'a dyn SecretsStore,
    pub refresh_tokens: &'a dyn RefreshTokenStore,
    pub profiles: &'a dyn UserProfileStore,
    pub google: &'a dyn GoogleTokenVerifier,
    pub metrics: &'a MetricsManager,
}

pub fn handle_auth_event(
    event: &Value,
    deps: &AuthDependencies<'_>,
    now: DateTime<Utc>,
) -> ApiGatewayResponse {
    let method = apigw::method(event);
    let path = apigw::path(event);
    tracing::info!(component = "auth", event = "request_received", method = %method, path = %path);

    if method == "POST" {
        match path.as_str() {
            "/auth/login" => return handle_login(event, deps, now),
            "/auth/refresh" => return handle_refresh(event, deps, now),
            "/auth/logout" => return handle_logout(event, deps),
            _ => {}
        }
    }
    error_response(
        ErrorCode::ResourceNotFound,
        Some("Auth route not found"),
        None,
        Some(event),
    )
}

fn handle_login(
    event: &Value,
    deps: &AuthDependencies<'_>,
    now: DateTime<Utc>,
) -> ApiGatewayResponse {
    let login_failed = |response: ApiGatewayResponse| {
        deps.metrics.put_metric("LoginFailure", 1.0);
        response
    };

    let request: LoginRequest = match parse_body(event) {
        Ok(request) => request,
        Err(response) => return login_failed(response),
    };

    let identity = match deps.google.verify(&request.google_id_token) {
        Ok(identity) => identity,
        Err(error) => {
            tracing::warn!(component = "auth", event = "google_token_rejected", error = %error);
            return login_failed(error_response(
                ErrorCode::AuthenticationFailed,
                Some("Invalid Google token or missing email."),
                None,
                Some(event),
            ));
        }
    };
    let user_id: UserId = identity.email;

    let secret = match deps.secrets.jwt_secret() {
        Ok(secret) => secret,
        Err(error) => return login_failed(internal_error(event, "jwt_secret", error)),
    };
    let tokens = jwt::create_access_token(&user_id, &secret, now).and_then(|access| {
        jwt::create_refresh_token(&user_id, &secret, now).map(|refresh| (access, refresh))
    });
    let (access_token, refresh) = match tokens {
        Ok(tokens) => tokens,
        Err(error) => return login_failed(internal_error(event, "token_signing", error)),
    };

    if let Err(error) = deps
        .refresh_tokens
        .save_token(&user_id, &refresh.token_id, refresh.expires_at)
    {
        tracing::error!(
            component = "auth",
            event = "refresh_token_save_failed",
            user_id = %user_id,
            error = %error,
        );
        return login_failed(error_response(
            ErrorCode::InternalError,
            Some("Could not save session"),
            None,
            Some(event),
        ));
    }

    record_login(deps.profiles, &user_id, now);

    deps.metrics.put_metric("LoginSuccess", 1.0);
    deps.metrics.put_metric("RefreshTokenSaved", 1.0);
    tracing::info!(component = "auth", event = "login_succeeded", user_id = %user_id);
    format_response(
        200,
        &TokenPayload {
            access_token,
            refresh_token: refresh.token,
        },
        Some(event),
    )
}

/// First login marks the profile initialized; later ones only move
/// `lastLoginAt`. Profile failures never block the login.
fn record_login(profiles: &dyn UserProfileStore, user_id: &UserId, now: DateTime<Utc>) {
    let timestamp = to_iso(now);
    let existing = match profiles.get_profile(user_id) {
        Ok(profile) => profile,
        Err(error) => {
            tracing::error!(
                component = "auth",
                event = "profile_lookup_failed",
                user_id = %user_id,
                error = %error,
            );
            return;
        }
    };

    let update = match existing {
        Some(profile) if profile.initialized => ProfileUpdate {
            last_login_at: Some(timestamp),
            ..ProfileUpdate::default()
        },
        Some(_) => ProfileUpdate {
            initialized: Some(true),
            last_login_at: Some(timestamp),
            ..ProfileUpdate::default()
        },
        None => ProfileUpdate {
            initialized: Some(true),
            created_at: Some(timestamp.clone()),
            last_login_at: Some(timestamp),
            ..ProfileUpdate::default()
        },
    };

    if let Err(error) = profiles.update_profile(user_id, &update) {
        tracing::error!(
            component = "auth",
            event = "profile_update_failed",
            user_id = %user_id,
            error = %error,
        );
    }
}

fn handle_refresh(
    event: &Value,
    deps: &AuthDependencies<'_>,
    now: DateTime<Utc>,
) -> ApiGatewayResponse {
    let refresh_failed = |response: ApiGatewayResponse| {
        deps.metrics.put_metric("RefreshFailure", 1.0);
        response
    };

    let request: RefreshRequest = match parse_body(event) {
        Ok(request) => request,
        Err(response) => return refresh_failed(response),
    };
    let secret = match deps.secrets.jwt_secret() {
        Ok(secret) => secret,
        Err(error) => return refresh_failed(internal_error(event, "jwt_secret", error)),
    };

    let identity = match jwt::verify_refresh_token(&request.refresh_token, &secret) {
        Ok(identity) => identity,
        Err(error) => {
            tracing::warn!(component = "auth", event = "refresh_token_invalid", error = %error);
            return refresh_failed(error_response(
                ErrorCode::AuthenticationFailed,
                Some("Invalid refresh token"),
                None,
                Some(event),
            ));
        }
    };

    let user_id = &identity.user_id;
    let token_id = &identity.token_id;
    match deps.refresh_tokens.token_exists(user_id, token_id) {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(
                component = "auth",
                event = "refresh_token_unknown",
                user_id = %user_id,
            );
            return refresh_failed(error_response(
                ErrorCode::AuthenticationFailed,
                Some("Refresh token not found or expired"),
                None,
                Some(event),
            ));
        }
        Err(error) => return refresh_failed(internal_error(event, "refresh_token_lookup", error)),
    }

    let access_token = match jwt::create_access_token(user_id, &secret, now) {
        Ok(token) => token,
        Err(error) => return refresh_failed(internal_error(event, "token_signing", error)),
    };

    deps.metrics.put_metric("RefreshSuccess", 1.0);
    tracing::info!(component = "auth", event = "refresh_succeeded", user_id = %user_id);
    format_response(
        200,
        &TokenPayload {
            access_token,
            refresh_token: request.refresh_token,
        },
        Some(event),
    )
}

/// Always answers 200. The stored token is deleted only when the presented
/// refresh token verifies.
fn handle_logout(event: &Value, deps: &AuthDependencies<'_>) -> ApiGatewayResponse {
    let revoked = parse_body::<RefreshRequest>(event)
        .map_err(|_| "logout body missing or invalid".to_string())
        .and_then(|request| {
            let secret = deps
                .secrets
                .jwt_secret()
                .map_err(|error| error.to_string())?;
            jwt::verify_refresh_token(&request.refresh_token, &secret)
                .map_err(|error| error.to_string())
        })
        .and_then(|identity| {
            deps.refresh_tokens
                .delete_token(&identity.user_id, &identity.token_id)
                .map_err(|error| error.to_string())
        });

    match revoked {
        Ok(()) => {
            let body = json!({ "message": "Successfully logged out" });
            format_response(200, &body, Some(event))
        }
        Err(reason) => {
            tracing::warn!(
                component = "auth",
                event = "logout_without_revocation",
                reason = %reason,
            );
            format_response(200, &json!({ "message": "Logout completed" }), Some(event))
        }
    }
}
