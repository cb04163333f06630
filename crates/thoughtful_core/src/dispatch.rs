//! GitHub `repository_dispatch` notification for the downstream deploy
//! pipeline.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const TOKEN_VAR: &str = "DISPATCH_TOKEN";
pub const OWNER_VAR: &str = "DISPATCH_OWNER";
pub const REPO_VAR: &str = "DISPATCH_REPO";
pub const DEFAULT_EVENT_TYPE: &str = "deploy-backend";
pub const GITHUB_API_BASE: &str = "https://api.github.com";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientPayload {
    pub sha: String,
    pub tag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepositoryDispatch {
    pub event_type: String,
    pub client_payload: ClientPayload,
}

impl RepositoryDispatch {
    pub fn new(
        event_type: impl Into<String>,
        sha: impl Into<String>,
        tag: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let dispatch = Self {
            event_type: event_type.into().trim().to_string(),
            client_payload: ClientPayload {
                sha: sha.into().trim().to_string(),
                tag: tag.into().trim().to_string(),
            },
        };
        if dispatch.event_type.is_empty() {
            return Err(ValidationError::new("event_type cannot be empty"));
        }
        if dispatch.client_payload.sha.is_empty() {
            return Err(ValidationError::new("sha cannot be empty"));
        }
        if dispatch.client_payload.tag.is_empty() {
            return Err(ValidationError::new("tag cannot be empty"));
        }
        Ok(dispatch)
    }
}

/// Credentials and target for the dispatch call. The token is kept out of
/// `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct DispatchSecrets {
    pub token: String,
    pub owner: String,
    pub repo: String,
}

impl std::fmt::Debug for DispatchSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchSecrets")
            .field("token", &"<redacted>")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .finish()
    }
}

impl DispatchSecrets {
    /// Reads the three secrets through `lookup` (usually the process
    /// environment). The first missing or blank one is named in the error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ValidationError> {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or_else(|| ValidationError::new(format!("{name} must be configured")))
        };
        Ok(Self {
            token: read(TOKEN_VAR)?,
            owner: read(OWNER_VAR)?,
            repo: read(REPO_VAR)?,
        })
    }

    pub fn endpoint(&self, api_base: &str) -> String {
        format!(
            "{}/repos/{}/{}/dispatches",
            api_base.trim_end_matches('/'),
            self.owner,
            self.repo
        )
    }
}
