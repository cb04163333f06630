//! Runs an AI call under the per-user and global rate limits.

use std::fmt;

use chrono::{DateTime, Utc};
use thoughtful_core::throttle::{daily_item_ttl, RateLimitExceeded, ThrottleAction, ThrottlePolicy};
use thoughtful_core::timestamps::date_key;
use thoughtful_core::types::UserId;

use crate::adapters::stores::{StoreError, ThrottleStore};

#[derive(Debug)]
pub enum ThrottleError<E> {
    Limited(RateLimitExceeded),
    /// Reading the counters failed; the operation was not attempted.
    Store(StoreError),
    Operation(E),
}

impl<E: fmt::Display> fmt::Display for ThrottleError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limited(limit) => write!(f, "{limit}"),
            Self::Store(error) => write!(f, "throttle state unavailable: {error}"),
            Self::Operation(error) => write!(f, "{error}"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for ThrottleError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Limited(limit) => Some(limit),
            Self::Store(error) => Some(error),
            Self::Operation(error) => Some(error),
        }
    }
}

/// Checks every limit, runs `operation`, and on success records the call.
///
/// Counter writes happen only after a successful operation. Write failures
/// are logged and do not affect the result.
pub fn run_throttled<T, E, F>(
    store: &dyn ThrottleStore,
    policy: &ThrottlePolicy,
    user_id: &UserId,
    action: ThrottleAction,
    now: DateTime<Utc>,
    operation: F,
) -> Result<T, ThrottleError<E>>
where
    F: FnOnce() -> Result<T, E>,
{
    let now_epoch = now.timestamp();
    let today = date_key(now);

    let last_call = store
        .user_minute_timestamp(user_id, action)
        .map_err(ThrottleError::Store)?;
    policy
        .check_minute(last_call, now_epoch)
        .map_err(|limit| limit_hit(limit, user_id, action))?;

    let user_count = store
        .user_daily_count(user_id, action, &today)
        .map_err(ThrottleError::Store)?;
    policy
        .check_user_daily(user_count)
        .map_err(|limit| limit_hit(limit, user_id, action))?;

    let global_count = store
        .global_daily_count(action, &today)
        .map_err(ThrottleError::Store)?;
    policy
        .check_global_daily(global_count)
        .map_err(|limit| limit_hit(limit, user_id, action))?;

    let value = operation().map_err(ThrottleError::Operation)?;

    record_call(store, policy, user_id, action, now, &today);
    Ok(value)
}

fn limit_hit<E>(
    limit: RateLimitExceeded,
    user_id: &UserId,
    action: ThrottleAction,
) -> ThrottleError<E> {
    tracing::warn!(
        component = "throttle",
        event = "throttle_limit_hit",
        user_id = %user_id,
        action = %action,
        limit = limit.limit.as_str(),
    );
    ThrottleError::Limited(limit)
}

fn record_call(
    store: &dyn ThrottleStore,
    policy: &ThrottlePolicy,
    user_id: &UserId,
    action: ThrottleAction,
    now: DateTime<Utc>,
    today: &str,
) {
    let ttl = daily_item_ttl(now);

    if let Err(error) = store.set_user_minute_timestamp(user_id, action, now.timestamp()) {
        tracing::error!(
            component = "throttle",
            event = "minute_timestamp_update_failed",
            user_id = %user_id,
            error = %error,
        );
    }
    if let Err(error) = store.increment_user_daily_count(user_id, action, today, ttl) {
        tracing::error!(
            component = "throttle",
            event = "user_daily_increment_failed",
            user_id = %user_id,
            error = %error,
        );
    }
    match store.increment_global_daily_count(action, today, ttl, policy.global_daily_limit) {
        Ok(_) => {}
        Err(StoreError::ConditionFailed) => {
            tracing::warn!(
                component = "throttle",
                event = "global_daily_limit_reached_on_increment",
                action = %action,
            );
        }
        Err(error) => {
            tracing::error!(
                component = "throttle",
                event = "global_daily_increment_failed",
                action = %action,
                error = %error,
            );
        }
    }
}
