use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::AssessmentLevel;
use crate::timestamps::{deserialize_iso, deserialize_optional_iso};
use crate::types::{IsoTimestamp, LessonId, SectionId, UserId};

/// Feedback returned by the AI model for a reflection draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatBotFeedback {
    pub ai_feedback: String,
    pub ai_assessment: AssessmentLevel,
}

/// Body of `POST /reflections/{lessonId}/sections/{sectionId}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReflectionInteractionInput {
    pub user_topic: String,
    #[serde(default)]
    pub is_user_topic_predefined: bool,
    pub user_code: String,
    #[serde(default)]
    pub is_user_code_predefined: bool,
    pub user_explanation: String,
    #[serde(default)]
    pub is_final: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_version_id: Option<String>,
}

/// A reflection version as stored in the learning entries table. `versionId`
/// is the sort key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReflectionVersionItem {
    pub version_id: String,
    pub user_id: UserId,
    pub lesson_id: LessonId,
    pub section_id: SectionId,
    pub user_topic: String,
    pub user_code: String,
    pub user_explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_assessment: Option<AssessmentLevel>,
    #[serde(deserialize_with = "deserialize_iso")]
    pub created_at: IsoTimestamp,
    pub is_final: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_version_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_iso",
        skip_serializing_if = "Option::is_none"
    )]
    pub final_entry_created_at: Option<IsoTimestamp>,
}

impl ReflectionVersionItem {
    pub fn has_ai_feedback(&self) -> bool {
        self.ai_feedback.is_some() && self.ai_assessment.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ListOfReflectionDraftsResponse {
    pub versions: Vec<ReflectionVersionItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_evaluated_key: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ListOfFinalLearningEntriesResponse {
    pub entries: Vec<ReflectionVersionItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_evaluated_key: Option<Value>,
}
