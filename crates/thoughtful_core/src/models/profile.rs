use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{IsoTimestamp, UserId};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: UserId,
    #[serde(default)]
    pub initialized: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<IsoTimestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<IsoTimestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// Partial profile write. Only `Some` fields are touched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub initialized: Option<bool>,
    pub created_at: Option<IsoTimestamp>,
    pub last_login_at: Option<IsoTimestamp>,
    pub preferences: Option<Value>,
    pub metadata: Option<Value>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.initialized.is_none()
            && self.created_at.is_none()
            && self.last_login_at.is_none()
            && self.preferences.is_none()
            && self.metadata.is_none()
    }
}
