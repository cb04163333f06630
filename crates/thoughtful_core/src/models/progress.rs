use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{IsoTimestamp, LessonId, SectionId, UnitId, UserId};

/// lessonId -> sectionId -> time first completed
pub type UnitCompletion = BTreeMap<LessonId, BTreeMap<SectionId, IsoTimestamp>>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SectionCompletionInput {
    pub unit_id: UnitId,
    pub lesson_id: LessonId,
    pub section_id: SectionId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchCompletionsInput {
    pub completions: Vec<SectionCompletionInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserUnitProgress {
    pub user_id: UserId,
    pub unit_id: UnitId,
    #[serde(default)]
    pub completion: UnitCompletion,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    pub user_id: UserId,
    #[serde(default)]
    pub completion: BTreeMap<UnitId, UnitCompletion>,
}
