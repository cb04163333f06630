use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// The callable the container invokes. Each variant maps to one Lambda
/// function behind API Gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryPoint {
    Auth,
    Authorizer,
    UserProgress,
    LearningEntries,
    PrimmFeedback,
    InstructorPortal,
}

impl EntryPoint {
    pub const ALL: [EntryPoint; 6] = [
        EntryPoint::Auth,
        EntryPoint::Authorizer,
        EntryPoint::UserProgress,
        EntryPoint::LearningEntries,
        EntryPoint::PrimmFeedback,
        EntryPoint::InstructorPortal,
    ];

    pub const DEFAULT: EntryPoint = EntryPoint::Auth;

    /// Canonical dotted reference, as written in the image `CMD`.
    pub fn reference(self) -> &'static str {
        match self {
            Self::Auth => "handlers.auth",
            Self::Authorizer => "handlers.authorizer",
            Self::UserProgress => "handlers.user_progress",
            Self::LearningEntries => "handlers.learning_entries",
            Self::PrimmFeedback => "handlers.primm_feedback",
            Self::InstructorPortal => "handlers.instructor_portal",
        }
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reference())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryPointError {
    #[error("no handler reference configured; set _HANDLER or pass it as the first argument")]
    Missing,
    #[error("unknown handler reference '{0}'")]
    Unknown(String),
}

impl FromStr for EntryPoint {
    type Err = EntryPointError;

    fn from_str(reference: &str) -> Result<Self, Self::Err> {
        let trimmed = reference.trim();
        if trimmed.is_empty() {
            return Err(EntryPointError::Missing);
        }
        Self::ALL
            .into_iter()
            .find(|entry| entry.reference() == trimmed)
            .ok_or_else(|| EntryPointError::Unknown(trimmed.to_string()))
    }
}

impl Serialize for EntryPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.reference())
    }
}

impl<'de> Deserialize<'de> for EntryPoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let reference = String::deserialize(deserializer)?;
        reference.parse().map_err(serde::de::Error::custom)
    }
}

/// Resolves the entry point from the `_HANDLER` value the Lambda container
/// runtime exports, falling back to the first process argument.
pub fn resolve(
    handler_env: Option<&str>,
    mut args: impl Iterator<Item = String>,
) -> Result<EntryPoint, EntryPointError> {
    if let Some(reference) = handler_env.filter(|value| !value.trim().is_empty()) {
        return reference.parse();
    }
    match args.next() {
        Some(reference) => reference.parse(),
        None => Err(EntryPointError::Missing),
    }
}
