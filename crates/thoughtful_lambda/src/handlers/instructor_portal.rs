//! Read-only views of student work for instructors. Every view is limited to
//! students who granted the instructor `VIEW_STUDENT_DATA_FULL`.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::{json, Value};
use thoughtful_core::apigw::{self, error_response, format_response, ApiGatewayResponse, ErrorCode};
use thoughtful_core::models::first_solution::FirstSolutionSubmissionResponse;
use thoughtful_core::models::instructor::{
    AssignmentSubmission, AssignmentSubmissionsResponse, AssignmentType, ClassUnitProgressResponse,
    InstructorStudentInfo, ListOfInstructorStudentsResponse, StudentUnitCompletionData,
};
use thoughtful_core::models::learning_entry::ListOfFinalLearningEntriesResponse;
use thoughtful_core::models::permissions::PermissionType;
use thoughtful_core::types::{InstructorId, UnitId, UserId};

use super::internal_error;
use crate::adapters::stores::{
    FirstSolutionStore, LearningEntryStore, PermissionStore, PrimmSubmissionStore, StoreError,
    UserProgressStore, VersionFilter,
};

const REQUIRED_PERMISSION: PermissionType = PermissionType::ViewStudentDataFull;
/// Reflection versions returned per student in assignment views.
pub const REFLECTION_VERSION_LIMIT: i32 = 20;

pub struct InstructorPortalDependencies<'a> {
    pub permissions: &'a dyn PermissionStore,
    pub progress: &'a dyn UserProgressStore,
    pub entries: &'a dyn LearningEntryStore,
    pub submissions: &'a dyn PrimmSubmissionStore,
    pub first_solutions: &'a dyn FirstSolutionStore,
}

/// A section addressed by `/instructor/units/{u}/lessons/{l}/sections/{s}/...`.
struct SectionPath<'p> {
    unit_id: &'p str,
    lesson_id: &'p str,
    section_id: &'p str,
}

fn section_path<'p>(parts: &[&'p str]) -> Option<SectionPath<'p>> {
    match parts {
        ["instructor", "units", unit_id, "lessons", lesson_id, "sections", section_id, _]
            if !unit_id.is_empty() && !lesson_id.is_empty() && !section_id.is_empty() =>
        {
            Some(SectionPath {
                unit_id: *unit_id,
                lesson_id: *lesson_id,
                section_id: *section_id,
            })
        }
        _ => None,
    }
}

pub fn handle_instructor_portal_event(
    event: &Value,
    deps: &InstructorPortalDependencies<'_>,
) -> ApiGatewayResponse {
    let Some(instructor_id) = apigw::user_id(event) else {
        return error_response(ErrorCode::AuthenticationFailed, None, None, Some(event));
    };
    let method = apigw::method(event);
    let path = apigw::path(event);
    let parts: Vec<&str> = path.trim_matches('/').split('/').collect();
    tracing::info!(
        component = "instructor_portal",
        event = "request_received",
        method = %method,
        path = %path,
        instructor_id = %instructor_id,
    );

    if method != "GET" {
        return error_response(ErrorCode::ResourceNotFound, None, None, Some(event));
    }

    if path == "/instructor/students" {
        return permitted_students(event, deps, &instructor_id);
    }
    if path.starts_with("/instructor/units/") && path.ends_with("/class-progress") {
        return match parts.as_slice() {
            ["instructor", "units", unit_id, "class-progress"] => {
                class_unit_progress(event, deps, &instructor_id, &unit_id.to_string())
            }
            _ => error_response(
                ErrorCode::ValidationError,
                Some("Malformed URL for class unit progress."),
                None,
                Some(event),
            ),
        };
    }
    if path.starts_with("/instructor/students/") && path.ends_with("/learning-entries") {
        return match parts.as_slice() {
            ["instructor", "students", student_id, "learning-entries"] => {
                student_learning_entries(event, deps, &instructor_id, &student_id.to_string())
            }
            _ => error_response(
                ErrorCode::ValidationError,
                Some("Malformed URL for finalized learning entries."),
                None,
                Some(event),
            ),
        };
    }
    if parts.len() == 8 && path.ends_with("/assignment-submissions") {
        return assignment_submissions(event, deps, &instructor_id, section_path(&parts));
    }
    if parts.len() == 8 && path.ends_with("/first-solutions") {
        return section_first_solutions(event, deps, &instructor_id, section_path(&parts));
    }

    tracing::warn!(
        component = "instructor_portal",
        event = "route_not_found",
        method = %method,
        path = %path,
    );
    error_response(ErrorCode::ResourceNotFound, None, None, Some(event))
}

fn students_of(
    deps: &InstructorPortalDependencies<'_>,
    instructor_id: &InstructorId,
) -> Result<Vec<UserId>, StoreError> {
    deps.permissions
        .permitted_students(instructor_id, REQUIRED_PERMISSION)
}

fn permitted_students(
    event: &Value,
    deps: &InstructorPortalDependencies<'_>,
    instructor_id: &InstructorId,
) -> ApiGatewayResponse {
    match students_of(deps, instructor_id) {
        Ok(students) => {
            let students = students
                .into_iter()
                .map(|student_id| InstructorStudentInfo {
                    student_id,
                    student_name: None,
                    student_email: None,
                })
                .collect();
            format_response(
                200,
                &ListOfInstructorStudentsResponse { students },
                Some(event),
            )
        }
        Err(error) => internal_error(event, "permitted_students", error),
    }
}

fn class_unit_progress(
    event: &Value,
    deps: &InstructorPortalDependencies<'_>,
    instructor_id: &InstructorId,
    unit_id: &UnitId,
) -> ApiGatewayResponse {
    let students = match students_of(deps, instructor_id) {
        Ok(students) => students,
        Err(error) => return internal_error(event, "permitted_students", error),
    };

    let mut student_progress_data = Vec::with_capacity(students.len());
    for student_id in students {
        let completion = match deps.progress.get_unit_progress(&student_id, unit_id) {
            Ok(unit) => unit.map(|unit| unit.completion).unwrap_or_default(),
            Err(error) => return internal_error(event, "get_unit_progress", error),
        };
        student_progress_data.push(StudentUnitCompletionData {
            student_id,
            completed_sections_in_unit: completion,
        });
    }

    format_response(
        200,
        &ClassUnitProgressResponse {
            unit_id: unit_id.clone(),
            student_progress_data,
        },
        Some(event),
    )
}

fn student_learning_entries(
    event: &Value,
    deps: &InstructorPortalDependencies<'_>,
    instructor_id: &InstructorId,
    student_id: &UserId,
) -> ApiGatewayResponse {
    let permitted = deps
        .permissions
        .has_permission(student_id, instructor_id, REQUIRED_PERMISSION);
    match permitted {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(
                component = "instructor_portal",
                event = "student_access_denied",
                instructor_id = %instructor_id,
                student_id = %student_id,
            );
            return error_response(ErrorCode::AuthorizationFailed, None, None, Some(event));
        }
        Err(error) => return internal_error(event, "has_permission", error),
    }

    let query = apigw::query_parameters(event);
    let limit = apigw::pagination_limit(&query);
    let start_key = apigw::last_evaluated_key(&query);
    match deps.entries.finalized_entries(student_id, limit, start_key) {
        Ok(page) => format_response(
            200,
            &ListOfFinalLearningEntriesResponse {
                entries: page.items,
                last_evaluated_key: page.last_evaluated_key,
            },
            Some(event),
        ),
        Err(error) => internal_error(event, "finalized_entries", error),
    }
}

fn assignment_submissions(
    event: &Value,
    deps: &InstructorPortalDependencies<'_>,
    instructor_id: &InstructorId,
    section: Option<SectionPath<'_>>,
) -> ApiGatewayResponse {
    let query = apigw::query_parameters(event);
    let assignment_type = query
        .get("assignmentType")
        .filter(|value| !value.is_empty());
    let (Some(section), Some(assignment_type)) = (section, assignment_type) else {
        return error_response(
            ErrorCode::ValidationError,
            Some("Missing required path or query parameters."),
            None,
            Some(event),
        );
    };
    let assignment_type: AssignmentType = match assignment_type.parse() {
        Ok(assignment_type) => assignment_type,
        Err(message) => {
            tracing::warn!(
                component = "instructor_portal",
                event = "invalid_assignment_type"
            );
            return error_response(
                ErrorCode::ValidationError,
                Some(message.as_str()),
                None,
                Some(event),
            );
        }
    };
    let primm_example_id = query
        .get("primmExampleId")
        .filter(|value| !value.is_empty())
        .cloned();
    if assignment_type == AssignmentType::Primm && primm_example_id.is_none() {
        return error_response(
            ErrorCode::ValidationError,
            Some("primmExampleId is required for PRIMM submissions."),
            None,
            Some(event),
        );
    }

    let students = match students_of(deps, instructor_id) {
        Ok(students) => students,
        Err(error) => return internal_error(event, "permitted_students", error),
    };
    if students.is_empty() {
        return format_response(200, &json!({ "submissions": [] }), Some(event));
    }

    let collected = match assignment_type {
        AssignmentType::Reflection => reflection_submissions(deps, &students, &section),
        AssignmentType::Primm => {
            primm_submissions(deps, &students, &section, primm_example_id.as_deref())
        }
    };
    let mut submissions = match collected {
        Ok(submissions) => submissions,
        Err(error) => return internal_error(event, "assignment_submissions", error),
    };
    submissions.sort_by(|left, right| right.submission_timestamp.cmp(&left.submission_timestamp));

    format_response(
        200,
        &AssignmentSubmissionsResponse {
            assignment_type,
            unit_id: section.unit_id.to_string(),
            lesson_id: section.lesson_id.to_string(),
            section_id: section.section_id.to_string(),
            primm_example_id,
            submissions,
        },
        Some(event),
    )
}

fn as_details(value: &impl Serialize) -> Result<Value, StoreError> {
    serde_json::to_value(value).map_err(|error| StoreError::Serialization(error.to_string()))
}

/// One entry per student holding the section's newest versions, newest
/// first. The newest version's time is the submission time.
fn reflection_submissions(
    deps: &InstructorPortalDependencies<'_>,
    students: &[UserId],
    section: &SectionPath<'_>,
) -> Result<Vec<AssignmentSubmission>, StoreError> {
    let lesson_id = section.lesson_id.to_string();
    let section_id = section.section_id.to_string();
    let mut submissions = Vec::new();
    for student_id in students {
        let page = deps.entries.versions_for_section(
            student_id,
            &lesson_id,
            &section_id,
            VersionFilter::All,
            REFLECTION_VERSION_LIMIT,
            None,
        )?;
        let Some(newest) = page.items.first() else {
            continue;
        };
        let submission_timestamp = newest.created_at.clone();
        submissions.push(AssignmentSubmission {
            student_id: student_id.clone(),
            submission_timestamp,
            submission_details: as_details(&page.items)?,
        });
    }
    Ok(submissions)
}

fn primm_submissions(
    deps: &InstructorPortalDependencies<'_>,
    students: &[UserId],
    section: &SectionPath<'_>,
    primm_example_id: Option<&str>,
) -> Result<Vec<AssignmentSubmission>, StoreError> {
    let mut submissions = Vec::new();
    for student_id in students {
        let stored = deps.submissions.submissions_for_student(
            student_id,
            Some(section.lesson_id),
            Some(section.section_id),
            primm_example_id,
        )?;
        for submission in stored {
            let submission_details = as_details(&submission)?;
            submissions.push(AssignmentSubmission {
                student_id: student_id.clone(),
                submission_timestamp: submission.timestamp_iso,
                submission_details,
            });
        }
    }
    Ok(submissions)
}

fn section_first_solutions(
    event: &Value,
    deps: &InstructorPortalDependencies<'_>,
    instructor_id: &InstructorId,
    section: Option<SectionPath<'_>>,
) -> ApiGatewayResponse {
    let Some(section) = section else {
        return error_response(
            ErrorCode::ValidationError,
            Some("Malformed URL for first solutions."),
            None,
            Some(event),
        );
    };
    let students: BTreeSet<UserId> = match students_of(deps, instructor_id) {
        Ok(students) => students.into_iter().collect(),
        Err(error) => return internal_error(event, "permitted_students", error),
    };

    let query = apigw::query_parameters(event);
    let limit = query
        .contains_key("limit")
        .then(|| apigw::pagination_limit(&query));
    let page = deps.first_solutions.solutions_for_section(
        &section.unit_id.to_string(),
        &section.lesson_id.to_string(),
        &section.section_id.to_string(),
        limit,
        apigw::last_evaluated_key(&query),
    );
    match page {
        Ok(page) => {
            let submissions = page
                .items
                .into_iter()
                .filter(|solution| students.contains(&solution.user_id))
                .collect();
            format_response(
                200,
                &FirstSolutionSubmissionResponse {
                    submissions,
                    last_evaluated_key: page.last_evaluated_key,
                },
                Some(event),
            )
        }
        Err(error) => internal_error(event, "solutions_for_section", error),
    }
}
