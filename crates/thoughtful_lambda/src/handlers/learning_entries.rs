//! Reflection drafts, final learning entries and AI feedback on drafts.

use chrono::{DateTime, Utc};
use serde_json::Value;
use thoughtful_core::apigw::{self, error_response, format_response, ApiGatewayResponse, ErrorCode};
use thoughtful_core::input_validator::validate_reflection_input;
use thoughtful_core::models::learning_entry::{
    ListOfFinalLearningEntriesResponse, ListOfReflectionDraftsResponse, ReflectionInteractionInput,
    ReflectionVersionItem,
};
use thoughtful_core::storage_keys::reflection_version_id;
use thoughtful_core::throttle::{ThrottleAction, ThrottlePolicy};
use thoughtful_core::timestamps::to_iso;
use thoughtful_core::types::{LessonId, SectionId, UserId};

use super::{internal_error, parse_body, throttled_ai_failure};
use crate::adapters::chatbot::ChatBot;
use crate::adapters::stores::{LearningEntryStore, SecretsStore, ThrottleStore, VersionFilter};
use crate::throttle::run_throttled;

pub struct LearningEntriesDependencies<'a> {
    pub entries: &'a dyn LearningEntryStore,
    pub throttle: &'a dyn ThrottleStore,
    pub secrets: &'a dyn SecretsStore,
    pub chatbot: &'a dyn ChatBot,
    pub throttle_policy: ThrottlePolicy,
}

struct SectionRef {
    lesson_id: LessonId,
    section_id: SectionId,
}

fn section_from_path(event: &Value) -> Option<SectionRef> {
    let params = apigw::path_parameters(event);
    let lesson_id = params.get("lessonId").filter(|id| !id.is_empty())?;
    let section_id = params.get("sectionId").filter(|id| !id.is_empty())?;
    Some(SectionRef {
        lesson_id: lesson_id.clone(),
        section_id: section_id.clone(),
    })
}

pub fn handle_learning_entries_event(
    event: &Value,
    deps: &LearningEntriesDependencies<'_>,
    now: DateTime<Utc>,
) -> ApiGatewayResponse {
    let Some(user_id) = apigw::user_id(event) else {
        return error_response(ErrorCode::AuthenticationFailed, None, None, Some(event));
    };
    let method = apigw::method(event);
    let path = apigw::path(event);
    tracing::info!(
        component = "learning_entries",
        event = "request_received",
        method = %method,
        path = %path,
        user_id = %user_id,
    );

    match method.as_str() {
        "GET" if path == "/learning-entries" => finalized_entries(event, deps.entries, &user_id),
        "GET" => match section_from_path(event) {
            Some(section) => section_drafts(event, deps.entries, &user_id, &section),
            None => error_response(ErrorCode::ResourceNotFound, None, None, Some(event)),
        },
        "POST" => match section_from_path(event) {
            Some(section) => submit_reflection(event, deps, &user_id, &section, now),
            None => error_response(
                ErrorCode::ValidationError,
                Some("lessonId and sectionId are required in the path."),
                None,
                Some(event),
            ),
        },
        _ => error_response(ErrorCode::MethodNotAllowed, None, None, Some(event)),
    }
}

fn finalized_entries(
    event: &Value,
    store: &dyn LearningEntryStore,
    user_id: &UserId,
) -> ApiGatewayResponse {
    let query = apigw::query_parameters(event);
    let limit = apigw::pagination_limit(&query);
    let start_key = apigw::last_evaluated_key(&query);
    match store.finalized_entries(user_id, limit, start_key) {
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

fn section_drafts(
    event: &Value,
    store: &dyn LearningEntryStore,
    user_id: &UserId,
    section: &SectionRef,
) -> ApiGatewayResponse {
    let query = apigw::query_parameters(event);
    let page = store.versions_for_section(
        user_id,
        &section.lesson_id,
        &section.section_id,
        VersionFilter::Drafts,
        apigw::pagination_limit(&query),
        apigw::last_evaluated_key(&query),
    );
    match page {
        Ok(page) => format_response(
            200,
            &ListOfReflectionDraftsResponse {
                versions: page.items,
                last_evaluated_key: page.last_evaluated_key,
            },
            Some(event),
        ),
        Err(error) => internal_error(event, "versions_for_section", error),
    }
}

fn submit_reflection(
    event: &Value,
    deps: &LearningEntriesDependencies<'_>,
    user_id: &UserId,
    section: &SectionRef,
    now: DateTime<Utc>,
) -> ApiGatewayResponse {
    let input: ReflectionInteractionInput = match parse_body(event) {
        Ok(input) => input,
        Err(response) => return response,
    };
    let validation = validate_reflection_input(
        &input.user_topic,
        &input.user_code,
        &input.user_explanation,
        None,
    );
    if let Err(error) = validation {
        return error_response(
            ErrorCode::ValidationError,
            Some(error.0.as_str()),
            None,
            Some(event),
        );
    }

    if input.is_final {
        finalize_reflection(event, deps.entries, user_id, section, input, now)
    } else {
        create_draft(event, deps, user_id, section, input, now)
    }
}

fn create_draft(
    event: &Value,
    deps: &LearningEntriesDependencies<'_>,
    user_id: &UserId,
    section: &SectionRef,
    input: ReflectionInteractionInput,
    now: DateTime<Utc>,
) -> ApiGatewayResponse {
    let api_key = match deps.secrets.chatbot_api_key() {
        Ok(key) => key,
        Err(error) => return internal_error(event, "chatbot_api_key", error),
    };
    let feedback = run_throttled(
        deps.throttle,
        &deps.throttle_policy,
        user_id,
        ThrottleAction::ReflectionFeedbackChatbotApiCall,
        now,
        || deps.chatbot.reflection_feedback(&api_key, &input),
    );
    let feedback = match feedback {
        Ok(feedback) => feedback,
        Err(error) => return throttled_ai_failure(event, error),
    };

    let created_at = to_iso(now);
    let item = ReflectionVersionItem {
        version_id: reflection_version_id(&section.lesson_id, &section.section_id, &created_at),
        user_id: user_id.clone(),
        lesson_id: section.lesson_id.clone(),
        section_id: section.section_id.clone(),
        user_topic: input.user_topic,
        user_code: input.user_code,
        user_explanation: input.user_explanation,
        ai_feedback: Some(feedback.ai_feedback),
        ai_assessment: Some(feedback.ai_assessment),
        created_at,
        is_final: false,
        source_version_id: None,
        final_entry_created_at: None,
    };
    save_and_respond(event, deps.entries, item)
}

/// A final entry must point at one of the student's own drafts for the same
/// section that already received AI feedback. The feedback is copied over.
fn finalize_reflection(
    event: &Value,
    store: &dyn LearningEntryStore,
    user_id: &UserId,
    section: &SectionRef,
    input: ReflectionInteractionInput,
    now: DateTime<Utc>,
) -> ApiGatewayResponse {
    let invalid = |message: &str| {
        error_response(ErrorCode::ValidationError, Some(message), None, Some(event))
    };

    let source_version_id = input.source_version_id.clone().filter(|id| !id.is_empty());
    let Some(source_version_id) = source_version_id else {
        return invalid("sourceVersionId is required for a final learning entry.");
    };
    let source = match store.get_version(user_id, &source_version_id) {
        Ok(Some(source)) => source,
        Ok(None) => return invalid("Source draft not found."),
        Err(error) => return internal_error(event, "get_version", error),
    };
    if source.lesson_id != section.lesson_id
        || source.section_id != section.section_id
        || source.is_final
    {
        return invalid("Source draft does not belong to this section.");
    }
    if !source.has_ai_feedback() {
        return invalid("Source draft has no AI feedback.");
    }

    let created_at = to_iso(now);
    let item = ReflectionVersionItem {
        version_id: reflection_version_id(&section.lesson_id, &section.section_id, &created_at),
        user_id: user_id.clone(),
        lesson_id: section.lesson_id.clone(),
        section_id: section.section_id.clone(),
        user_topic: input.user_topic,
        user_code: input.user_code,
        user_explanation: input.user_explanation,
        ai_feedback: source.ai_feedback,
        ai_assessment: source.ai_assessment,
        created_at: created_at.clone(),
        is_final: true,
        source_version_id: Some(source_version_id),
        final_entry_created_at: Some(created_at),
    };
    save_and_respond(event, store, item)
}

fn save_and_respond(
    event: &Value,
    store: &dyn LearningEntryStore,
    item: ReflectionVersionItem,
) -> ApiGatewayResponse {
    match store.save_item(&item) {
        Ok(()) => {
            tracing::info!(
                component = "learning_entries",
                event = "reflection_version_saved",
                user_id = %item.user_id,
                version_id = %item.version_id,
                is_final = item.is_final,
            );
            format_response(201, &item, Some(event))
        }
        Err(error) => internal_error(event, "save_item", error),
    }
}
