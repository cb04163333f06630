use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;
use crate::types::{IsoTimestamp, LessonId, SectionId, UnitId, UserId};

pub const MAX_SOLUTION_CHARS: usize = 1000;

/// Body of `POST /first-solutions`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FirstSolutionInput {
    pub unit_id: UnitId,
    pub lesson_id: LessonId,
    pub section_id: SectionId,
    pub solution: String,
    pub question_type: String,
}

impl FirstSolutionInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.unit_id.is_empty() || self.lesson_id.is_empty() || self.section_id.is_empty() {
            return Err(ValidationError::new(
                "unitId, lessonId and sectionId are required",
            ));
        }
        if self.solution.chars().count() > MAX_SOLUTION_CHARS {
            return Err(ValidationError::new(format!(
                "Solution exceeds maximum length of {MAX_SOLUTION_CHARS} characters"
            )));
        }
        Ok(())
    }
}

/// First solution as stored. Keyed by `sectionCompositeKey` + `userId`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoredFirstSolution {
    pub section_composite_key: String,
    pub user_id: UserId,
    pub unit_id: UnitId,
    pub lesson_id: LessonId,
    pub section_id: SectionId,
    pub solution: String,
    pub question_type: String,
    pub submitted_at: IsoTimestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FirstSolutionSubmissionResponse {
    pub submissions: Vec<StoredFirstSolution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_evaluated_key: Option<Value>,
}
