//! Request, response and stored-item shapes. Field names are camelCase on the
//! wire and in DynamoDB.

pub mod auth;
pub mod first_solution;
pub mod instructor;
pub mod learning_entry;
pub mod permissions;
pub mod primm;
pub mod profile;
pub mod progress;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AssessmentLevel {
    Achieves,
    Mostly,
    Developing,
    Insufficient,
}

impl AssessmentLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Achieves => "achieves",
            Self::Mostly => "mostly",
            Self::Developing => "developing",
            Self::Insufficient => "insufficient",
        }
    }
}
