use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::progress::UnitCompletion;
use crate::types::{IsoTimestamp, LessonId, SectionId, UnitId, UserId};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InstructorStudentInfo {
    pub student_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListOfInstructorStudentsResponse {
    pub students: Vec<InstructorStudentInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StudentUnitCompletionData {
    pub student_id: UserId,
    pub completed_sections_in_unit: UnitCompletion,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClassUnitProgressResponse {
    pub unit_id: UnitId,
    pub student_progress_data: Vec<StudentUnitCompletionData>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AssignmentType {
    Reflection,
    #[serde(rename = "PRIMM")]
    Primm,
}

impl std::str::FromStr for AssignmentType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Reflection" => Ok(Self::Reflection),
            "PRIMM" => Ok(Self::Primm),
            other => Err(format!("unsupported assignmentType '{other}'")),
        }
    }
}

/// One student's submission for an assignment. For reflections `details` is
/// the list of versions, for PRIMM a single stored submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentSubmission {
    pub student_id: UserId,
    pub submission_timestamp: IsoTimestamp,
    pub submission_details: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentSubmissionsResponse {
    pub assignment_type: AssignmentType,
    pub unit_id: UnitId,
    pub lesson_id: LessonId,
    pub section_id: SectionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primm_example_id: Option<String>,
    pub submissions: Vec<AssignmentSubmission>,
}
