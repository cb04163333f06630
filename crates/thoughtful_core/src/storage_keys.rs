//! Partition and sort key layouts for the DynamoDB tables.

use crate::types::{LessonId, SectionId, UnitId, UserId};

pub const FINAL_ENTRIES_INDEX: &str = "UserFinalLearningEntriesIndex";
pub const GRANTEE_PERMISSIONS_INDEX: &str = "GranteePermissionsIndex";

pub const MINUTE_TRACK_SK: &str = "MINUTE_TRACK#LATEST";
const DAILY_COUNT_SK_PREFIX: &str = "DAILY_COUNT#";

pub fn reflection_section_prefix(lesson_id: &str, section_id: &str) -> String {
    format!("{lesson_id}#{section_id}#")
}

pub fn reflection_version_id(
    lesson_id: &LessonId,
    section_id: &SectionId,
    created_at: &str,
) -> String {
    format!(
        "{}{created_at}",
        reflection_section_prefix(lesson_id, section_id)
    )
}

pub fn primm_submission_key(
    lesson_id: &str,
    section_id: &str,
    primm_example_id: &str,
    timestamp_iso: &str,
) -> String {
    format!("{lesson_id}#{section_id}#{primm_example_id}#{timestamp_iso}")
}

/// Sort key prefix for narrowing a student's PRIMM submissions. Each level
/// only applies when every level above it is present.
pub fn primm_submission_prefix(
    lesson_id: Option<&str>,
    section_id: Option<&str>,
    primm_example_id: Option<&str>,
) -> Option<String> {
    let mut parts = Vec::with_capacity(3);
    if let Some(lesson) = lesson_id.filter(|value| !value.is_empty()) {
        parts.push(lesson);
        if let Some(section) = section_id.filter(|value| !value.is_empty()) {
            parts.push(section);
            if let Some(example) = primm_example_id.filter(|value| !value.is_empty()) {
                parts.push(example);
            }
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(format!("{}#", parts.join("#")))
    }
}

pub fn first_solution_section_key(
    unit_id: &UnitId,
    lesson_id: &LessonId,
    section_id: &SectionId,
) -> String {
    format!("{unit_id}#{lesson_id}#{section_id}")
}

/// Main-table sort key of a permission: `{type}#{grantee}`.
pub fn permission_main_sk(permission_type: &str, grantee_user_id: &str) -> String {
    format!("{permission_type}#{grantee_user_id}")
}

/// GSI sort key of a permission: `{type}#{granter}`.
pub fn permission_gsi_sk(permission_type: &str, granter_user_id: &str) -> String {
    format!("{permission_type}#{granter_user_id}")
}

/// Recovers the granter from a GSI sort key when the attribute itself is not
/// projected.
pub fn granter_from_gsi_sk(gsi_sk: &str) -> Option<&str> {
    gsi_sk
        .split_once('#')
        .map(|(_, granter)| granter)
        .filter(|granter| !granter.is_empty())
}

pub fn throttle_user_pk(user_id: &UserId, action: &str) -> String {
    format!("USER#{user_id}#{action}")
}

pub fn throttle_global_pk(action: &str) -> String {
    format!("GLOBAL#{action}")
}

pub fn throttle_daily_sk(date_key: &str) -> String {
    format!("{DAILY_COUNT_SK_PREFIX}{date_key}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reflection_keys_share_section_prefix() {
        let version = reflection_version_id(
            &"lesson_1".to_string(),
            &"reflect".to_string(),
            "2025-01-01T00:00:00.000000Z",
        );
        assert_eq!(version, "lesson_1#reflect#2025-01-01T00:00:00.000000Z");
        assert!(version.starts_with(&reflection_section_prefix("lesson_1", "reflect")));
    }

    #[test]
    fn primm_prefix_is_hierarchical() {
        assert_eq!(primm_submission_prefix(None, Some("s"), Some("e")), None);
        assert_eq!(
            primm_submission_prefix(Some("l"), None, Some("e")).as_deref(),
            Some("l#")
        );
        assert_eq!(
            primm_submission_prefix(Some("l"), Some("s"), Some("e")).as_deref(),
            Some("l#s#e#")
        );
        assert!(primm_submission_key("l", "s", "e", "t").starts_with("l#s#e#"));
    }

    #[test]
    fn permission_keys_and_granter_recovery() {
        assert_eq!(
            permission_main_sk("VIEW_STUDENT_DATA_FULL", "instr-1"),
            "VIEW_STUDENT_DATA_FULL#instr-1"
        );
        let gsi = permission_gsi_sk("VIEW_STUDENT_DATA_FULL", "student#1");
        assert_eq!(granter_from_gsi_sk(&gsi), Some("student#1"));
        assert_eq!(granter_from_gsi_sk("VIEW_STUDENT_DATA_FULL"), None);
    }

    #[test]
    fn throttle_keys() {
        let user = "u@example.com".to_string();
        assert_eq!(
            throttle_user_pk(&user, "PRIMM_FEEDBACK_CHATBOT_API_CALL"),
            "USER#u@example.com#PRIMM_FEEDBACK_CHATBOT_API_CALL"
        );
        assert_eq!(throttle_global_pk("X"), "GLOBAL#X");
        assert_eq!(throttle_daily_sk("2025-03-01"), "DAILY_COUNT#2025-03-01");
        assert_eq!(
            first_solution_section_key(&"u".to_string(), &"l".to_string(), &"s".to_string()),
            "u#l#s"
        );
    }
}
