//! Rate limits for AI feedback calls.
//!
//! A call is allowed when the user has not made one in the last minute, the
//! user is below the daily cap and the whole service is below its daily cap.
//! Day boundaries are UTC.

use std::fmt;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

pub const USER_MINUTE_LIMIT_SECONDS: i64 = 60;
pub const USER_DAILY_LIMIT_CALLS: u64 = 20;
pub const GLOBAL_DAILY_LIMIT_CALLS: u64 = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThrottleAction {
    ReflectionFeedbackChatbotApiCall,
    PrimmFeedbackChatbotApiCall,
}

impl ThrottleAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReflectionFeedbackChatbotApiCall => "REFLECTION_FEEDBACK_CHATBOT_API_CALL",
            Self::PrimmFeedbackChatbotApiCall => "PRIMM_FEEDBACK_CHATBOT_API_CALL",
        }
    }
}

impl fmt::Display for ThrottleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LimitType {
    UserMinuteLimit,
    UserDailyLimit,
    GlobalDailyLimit,
}

impl LimitType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserMinuteLimit => "USER_MINUTE_LIMIT",
            Self::UserDailyLimit => "USER_DAILY_LIMIT",
            Self::GlobalDailyLimit => "GLOBAL_DAILY_LIMIT",
        }
    }

    pub fn user_message(self) -> &'static str {
        match self {
            Self::UserMinuteLimit => "Too many requests per minute.",
            Self::UserDailyLimit => "You've reached the daily usage.",
            Self::GlobalDailyLimit => "Service is experiencing high demand.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitExceeded {
    pub limit: LimitType,
}

impl fmt::Display for RateLimitExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.limit.user_message(), self.limit.as_str())
    }
}

impl std::error::Error for RateLimitExceeded {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottlePolicy {
    pub minute_window_seconds: i64,
    pub user_daily_limit: u64,
    pub global_daily_limit: u64,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            minute_window_seconds: USER_MINUTE_LIMIT_SECONDS,
            user_daily_limit: USER_DAILY_LIMIT_CALLS,
            global_daily_limit: GLOBAL_DAILY_LIMIT_CALLS,
        }
    }
}

impl ThrottlePolicy {
    pub fn check_minute(
        &self,
        last_call_epoch: Option<i64>,
        now_epoch: i64,
    ) -> Result<(), RateLimitExceeded> {
        match last_call_epoch {
            Some(last) if now_epoch - last < self.minute_window_seconds => Err(RateLimitExceeded {
                limit: LimitType::UserMinuteLimit,
            }),
            _ => Ok(()),
        }
    }

    pub fn check_user_daily(&self, count: u64) -> Result<(), RateLimitExceeded> {
        if count >= self.user_daily_limit {
            return Err(RateLimitExceeded {
                limit: LimitType::UserDailyLimit,
            });
        }
        Ok(())
    }

    pub fn check_global_daily(&self, count: u64) -> Result<(), RateLimitExceeded> {
        if count >= self.global_daily_limit {
            return Err(RateLimitExceeded {
                limit: LimitType::GlobalDailyLimit,
            });
        }
        Ok(())
    }

    /// Runs the three checks in order; the first failing limit wins.
    pub fn check_all(
        &self,
        last_call_epoch: Option<i64>,
        user_daily_count: u64,
        global_daily_count: u64,
        now_epoch: i64,
    ) -> Result<(), RateLimitExceeded> {
        self.check_minute(last_call_epoch, now_epoch)?;
        self.check_user_daily(user_daily_count)?;
        self.check_global_daily(global_daily_count)
    }
}

/// Expiry for daily counter items: the start of the UTC day plus 25 hours.
pub fn daily_item_ttl(now: DateTime<Utc>) -> i64 {
    let start_of_day = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    (start_of_day + Duration::hours(25)).timestamp()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn minute_window_blocks_recent_calls() {
        let policy = ThrottlePolicy::default();
        assert_eq!(
            policy.check_minute(Some(1_000), 1_059),
            Err(RateLimitExceeded {
                limit: LimitType::UserMinuteLimit
            })
        );
        assert!(policy.check_minute(Some(1_000), 1_060).is_ok());
        assert!(policy.check_minute(None, 1_000).is_ok());
    }

    #[test]
    fn daily_limits_are_inclusive_caps() {
        let policy = ThrottlePolicy::default();
        assert!(policy.check_user_daily(19).is_ok());
        assert!(policy.check_user_daily(20).is_err());
        assert!(policy.check_global_daily(99).is_ok());
        assert!(policy.check_global_daily(100).is_err());
    }

    #[test]
    fn first_failing_limit_wins() {
        let policy = ThrottlePolicy::default();
        let error = policy
            .check_all(Some(100), 50, 500, 110)
            .expect_err("all limits exceeded");
        assert_eq!(error.limit, LimitType::UserMinuteLimit);

        let error = policy.check_all(None, 20, 500, 110).expect_err("daily");
        assert_eq!(error.limit, LimitType::UserDailyLimit);

        let error = policy.check_all(None, 0, 100, 110).expect_err("global");
        assert_eq!(error.limit, LimitType::GlobalDailyLimit);
    }

    #[test]
    fn ttl_is_start_of_day_plus_25_hours() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 17, 30, 0).unwrap();
        let expected = Utc.with_ymd_and_hms(2025, 6, 2, 1, 0, 0).unwrap();
        assert_eq!(daily_item_ttl(now), expected.timestamp());
    }

    #[test]
    fn limit_messages_are_user_facing() {
        let error = RateLimitExceeded {
            limit: LimitType::GlobalDailyLimit,
        };
        assert_eq!(
            error.to_string(),
            "Service is experiencing high demand. (GLOBAL_DAILY_LIMIT)"
        );
    }
}
