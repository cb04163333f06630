use serde::{Deserialize, Serialize};

use super::AssessmentLevel;
use crate::types::{IsoTimestamp, LessonId, SectionId, UserId};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PrimmEvaluationRequest {
    pub lesson_id: LessonId,
    pub section_id: SectionId,
    pub primm_example_id: String,
    pub code_snippet: String,
    pub user_prediction_prompt_text: String,
    pub user_prediction_text: String,
    pub user_explanation_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_output_summary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PrimmEvaluationResponse {
    pub ai_prediction_assessment: AssessmentLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_explanation_assessment: Option<AssessmentLevel>,
    pub ai_overall_comment: String,
}

/// Full PRIMM submission item. `submissionCompositeKey` is the sort key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoredPrimmSubmission {
    pub user_id: UserId,
    pub submission_composite_key: String,
    pub lesson_id: LessonId,
    pub section_id: SectionId,
    pub primm_example_id: String,
    pub timestamp_iso: IsoTimestamp,
    pub created_at: IsoTimestamp,
    pub code_snippet: String,
    pub user_prediction_prompt_text: String,
    pub user_prediction_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_output_summary: Option<String>,
    pub user_explanation_text: String,
    pub ai_prediction_assessment: AssessmentLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_explanation_assessment: Option<AssessmentLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_overall_comment: Option<String>,
}
