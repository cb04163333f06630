//! `/progress` and `/first-solutions` for the signed-in student.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use thoughtful_core::apigw::{self, error_response, format_response, ApiGatewayResponse, ErrorCode};
use thoughtful_core::models::first_solution::{FirstSolutionInput, StoredFirstSolution};
use thoughtful_core::models::progress::{BatchCompletionsInput, UserUnitProgress};
use thoughtful_core::progress::{aggregate, apply_completions, group_by_unit};
use thoughtful_core::storage_keys::first_solution_section_key;
use thoughtful_core::timestamps::to_iso;
use thoughtful_core::types::UserId;

use super::{internal_error, parse_body};
use crate::adapters::stores::{FirstSolutionStore, SaveOutcome, UserProgressStore};

pub struct UserProgressDependencies<'a> {
    pub progress: &'a dyn UserProgressStore,
    pub first_solutions: &'a dyn FirstSolutionStore,
}

pub fn handle_user_progress_event(
    event: &Value,
    deps: &UserProgressDependencies<'_>,
    now: DateTime<Utc>,
) -> ApiGatewayResponse {
    let Some(user_id) = apigw::user_id(event) else {
        return error_response(ErrorCode::AuthenticationFailed, None, None, Some(event));
    };
    let method = apigw::method(event);
    let path = apigw::path(event);
    tracing::info!(
        component = "user_progress",
        event = "request_received",
        method = %method,
        path = %path,
        user_id = %user_id,
    );

    match (method.as_str(), path.as_str()) {
        ("GET", "/progress") => current_progress(event, deps.progress, &user_id),
        ("PUT", "/progress") => record_completions(event, deps.progress, &user_id, now),
        ("POST", "/first-solutions") => {
            record_first_solution(event, deps.first_solutions, &user_id, now)
        }
        _ => error_response(ErrorCode::ResourceNotFound, None, None, Some(event)),
    }
}

fn current_progress(
    event: &Value,
    store: &dyn UserProgressStore,
    user_id: &UserId,
) -> ApiGatewayResponse {
    match store.list_unit_progress(user_id) {
        Ok(units) => format_response(200, &aggregate(user_id, units), Some(event)),
        Err(error) => internal_error(event, "list_unit_progress", error),
    }
}

/// Get-modify-put per touched unit. Sections already completed keep their
/// original timestamp.
fn record_completions(
    event: &Value,
    store: &dyn UserProgressStore,
    user_id: &UserId,
    now: DateTime<Utc>,
) -> ApiGatewayResponse {
    let batch: BatchCompletionsInput = match parse_body(event) {
        Ok(batch) => batch,
        Err(response) => return response,
    };
    if batch.completions.is_empty() {
        return current_progress(event, store, user_id);
    }

    let timestamp = to_iso(now);
    for (unit_id, completions) in group_by_unit(&batch.completions) {
        let mut unit = match store.get_unit_progress(user_id, &unit_id) {
            Ok(Some(unit)) => unit,
            Ok(None) => UserUnitProgress {
                user_id: user_id.clone(),
                unit_id: unit_id.clone(),
                completion: Default::default(),
            },
            Err(error) => return internal_error(event, "get_unit_progress", error),
        };
        let added = apply_completions(&mut unit, &completions, &timestamp);
        if added == 0 {
            continue;
        }
        if let Err(error) = store.put_unit_progress(&unit) {
            return internal_error(event, "put_unit_progress", error);
        }
        tracing::info!(
            component = "user_progress",
            event = "unit_progress_updated",
            user_id = %user_id,
            unit_id = %unit_id,
            added,
        );
    }

    current_progress(event, store, user_id)
}

fn record_first_solution(
    event: &Value,
    store: &dyn FirstSolutionStore,
    user_id: &UserId,
    now: DateTime<Utc>,
) -> ApiGatewayResponse {
    let input: FirstSolutionInput = match parse_body(event) {
        Ok(input) => input,
        Err(response) => return response,
    };
    if let Err(error) = input.validate() {
        return error_response(
            ErrorCode::ValidationError,
            Some(error.message()),
            None,
            Some(event),
        );
    }

    let section_composite_key =
        first_solution_section_key(&input.unit_id, &input.lesson_id, &input.section_id);
    let stored = StoredFirstSolution {
        section_composite_key,
        user_id: user_id.clone(),
        unit_id: input.unit_id,
        lesson_id: input.lesson_id,
        section_id: input.section_id,
        solution: input.solution,
        question_type: input.question_type,
        submitted_at: to_iso(now),
    };

    match store.save_first_solution(&stored) {
        Ok(SaveOutcome::Recorded) => {
            let body = json!({ "recorded": true, "submission": stored });
            format_response(201, &body, Some(event))
        }
        Ok(SaveOutcome::AlreadyExists) => {
            format_response(200, &json!({ "recorded": false }), Some(event))
        }
        Err(error) => internal_error(event, "save_first_solution", error),
    }
}
