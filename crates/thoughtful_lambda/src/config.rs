//! Environment configuration. Each handler reads only the variables it uses.

use thiserror::Error;

pub const USER_PROGRESS_TABLE: &str = "USER_PROGRESS_TABLE_NAME";
pub const LEARNING_ENTRIES_TABLE: &str = "LEARNING_ENTRIES_TABLE_NAME";
pub const PRIMM_SUBMISSIONS_TABLE: &str = "PRIMM_SUBMISSIONS_TABLE_NAME";
pub const THROTTLE_TABLE: &str = "THROTTLE_TABLE_NAME";
pub const REFRESH_TOKEN_TABLE: &str = "REFRESH_TOKEN_TABLE_NAME";
pub const USER_PERMISSIONS_TABLE: &str = "USER_PERMISSIONS_TABLE_NAME";
pub const USER_PROFILE_TABLE: &str = "USER_PROFILE_TABLE_NAME";
pub const FIRST_SOLUTIONS_TABLE: &str = "FIRST_SOLUTIONS_TABLE_NAME";
pub const SECRETS_TABLE: &str = "SECRETS_TABLE_NAME";
pub const GOOGLE_CLIENT_ID: &str = "GOOGLE_CLIENT_ID";
pub const AWS_REGION: &str = "AWS_REGION";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} must be configured")]
    Missing(&'static str),
}

/// Reads a required, non-blank variable through `lookup`.
pub fn required(
    lookup: &dyn Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::Missing(name))
}

pub fn from_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub refresh_token_table: String,
    pub user_profile_table: String,
    pub secrets_table: String,
    pub google_client_id: String,
}

impl AuthConfig {
    pub fn load(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            refresh_token_table: required(lookup, REFRESH_TOKEN_TABLE)?,
            user_profile_table: required(lookup, USER_PROFILE_TABLE)?,
            secrets_table: required(lookup, SECRETS_TABLE)?,
            google_client_id: required(lookup, GOOGLE_CLIENT_ID)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizerConfig {
    pub secrets_table: String,
    pub region: String,
}

impl AuthorizerConfig {
    pub fn load(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            secrets_table: required(lookup, SECRETS_TABLE)?,
            region: required(lookup, AWS_REGION)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProgressConfig {
    pub user_progress_table: String,
    pub first_solutions_table: String,
}

impl UserProgressConfig {
    pub fn load(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            user_progress_table: required(lookup, USER_PROGRESS_TABLE)?,
            first_solutions_table: required(lookup, FIRST_SOLUTIONS_TABLE)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LearningEntriesConfig {
    pub learning_entries_table: String,
    pub throttle_table: String,
    pub secrets_table: String,
}

impl LearningEntriesConfig {
    pub fn load(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            learning_entries_table: required(lookup, LEARNING_ENTRIES_TABLE)?,
            throttle_table: required(lookup, THROTTLE_TABLE)?,
            secrets_table: required(lookup, SECRETS_TABLE)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimmFeedbackConfig {
    pub primm_submissions_table: String,
    pub throttle_table: String,
    pub secrets_table: String,
}

impl PrimmFeedbackConfig {
    pub fn load(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            primm_submissions_table: required(lookup, PRIMM_SUBMISSIONS_TABLE)?,
            throttle_table: required(lookup, THROTTLE_TABLE)?,
            secrets_table: required(lookup, SECRETS_TABLE)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructorPortalConfig {
    pub user_permissions_table: String,
    pub user_progress_table: String,
    pub learning_entries_table: String,
    pub primm_submissions_table: String,
    pub first_solutions_table: String,
}

impl InstructorPortalConfig {
    pub fn load(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            user_permissions_table: required(lookup, USER_PERMISSIONS_TABLE)?,
            user_progress_table: required(lookup, USER_PROGRESS_TABLE)?,
            learning_entries_table: required(lookup, LEARNING_ENTRIES_TABLE)?,
            primm_submissions_table: required(lookup, PRIMM_SUBMISSIONS_TABLE)?,
            first_solutions_table: required(lookup, FIRST_SOLUTIONS_TABLE)?,
        })
    }
}
