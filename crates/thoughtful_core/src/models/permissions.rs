use serde::{Deserialize, Serialize};

use crate::types::{InstructorId, IsoTimestamp, UserId};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionType {
    ViewStudentDataFull,
    ViewStudentProgressSummary,
    ViewStudentFinalLearningEntries,
}

impl PermissionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ViewStudentDataFull => "VIEW_STUDENT_DATA_FULL",
            Self::ViewStudentProgressSummary => "VIEW_STUDENT_PROGRESS_SUMMARY",
            Self::ViewStudentFinalLearningEntries => "VIEW_STUDENT_FINAL_LEARNING_ENTRIES",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionStatus {
    Active,
    Inactive,
    Revoked,
    Pending,
    Expired,
}

/// A grant from a student (granter) to an instructor (grantee).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PermissionItem {
    pub granter_user_id: UserId,
    pub grantee_permission_type_composite: String,
    pub grantee_user_id: InstructorId,
    pub granter_permission_type_composite: String,
    pub permission_type: PermissionType,
    pub status: PermissionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<IsoTimestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<IsoTimestamp>,
}

impl PermissionItem {
    pub fn is_active(&self) -> bool {
        self.status == PermissionStatus::Active
    }
}
