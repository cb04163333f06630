//! `POST /primm-feedback`: AI evaluation of a PRIMM prediction and
//! explanation.

use chrono::{DateTime, Utc};
use serde_json::Value;
use thoughtful_core::apigw::{self, error_response, format_response, ApiGatewayResponse, ErrorCode};
use thoughtful_core::input_validator::validate_primm_input;
use thoughtful_core::models::primm::{
    PrimmEvaluationRequest, PrimmEvaluationResponse, StoredPrimmSubmission,
};
use thoughtful_core::storage_keys::primm_submission_key;
use thoughtful_core::throttle::{ThrottleAction, ThrottlePolicy};
use thoughtful_core::timestamps::to_iso;
use thoughtful_core::types::UserId;

use super::{internal_error, parse_body, throttled_ai_failure};
use crate::adapters::chatbot::ChatBot;
use crate::adapters::stores::{PrimmSubmissionStore, SecretsStore, ThrottleStore};
use crate::metrics::MetricsManager;
use crate::throttle::{run_throttled, ThrottleError};

pub struct PrimmFeedbackDependencies<'a> {
    pub submissions: &'a dyn PrimmSubmissionStore,
    pub throttle: &'a dyn ThrottleStore,
    pub secrets: &'a dyn SecretsStore,
    pub chatbot: &'a dyn ChatBot,
    pub metrics: &'a MetricsManager,
    pub throttle_policy: ThrottlePolicy,
}

pub fn handle_primm_feedback_event(
    event: &Value,
    deps: &PrimmFeedbackDependencies<'_>,
    now: DateTime<Utc>,
) -> ApiGatewayResponse {
    let Some(user_id) = apigw::user_id(event) else {
        return error_response(ErrorCode::AuthenticationFailed, None, None, Some(event));
    };
    let method = apigw::method(event).to_uppercase();
    tracing::info!(
        component = "primm_feedback",
        event = "request_received",
        method = %method,
        user_id = %user_id,
    );
    if method != "POST" {
        return error_response(ErrorCode::MethodNotAllowed, None, None, Some(event));
    }

    let request: PrimmEvaluationRequest = match parse_body(event) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let suspicious = validate_primm_input(
        &request.code_snippet,
        &request.user_prediction_text,
        &request.user_explanation_text,
        &request.user_prediction_prompt_text,
        request.actual_output_summary.as_deref(),
    );
    if let Err(error) = suspicious {
        return error_response(
            ErrorCode::ValidationError,
            Some(error.0.as_str()),
            None,
            Some(event),
        );
    }

    let api_key = match deps.secrets.chatbot_api_key() {
        Ok(key) => key,
        Err(error) => return internal_error(event, "chatbot_api_key", error),
    };
    let evaluation = run_throttled(
        deps.throttle,
        &deps.throttle_policy,
        &user_id,
        ThrottleAction::PrimmFeedbackChatbotApiCall,
        now,
        || deps.chatbot.primm_evaluation(&api_key, &request),
    );
    let evaluation = match evaluation {
        Ok(evaluation) => evaluation,
        Err(error) => {
            match &error {
                ThrottleError::Limited(_) => deps.metrics.put_metric("ThrottledRequest", 1.0),
                ThrottleError::Operation(_) => deps.metrics.put_metric("ChatBotApiFailure", 1.0),
                ThrottleError::Store(_) => {}
            }
            return throttled_ai_failure(event, error);
        }
    };

    save_submission(deps.submissions, &user_id, &request, &evaluation, now);
    format_response(200, &evaluation, Some(event))
}

/// The student already has their feedback, so a failed write is only logged.
fn save_submission(
    store: &dyn PrimmSubmissionStore,
    user_id: &UserId,
    request: &PrimmEvaluationRequest,
    evaluation: &PrimmEvaluationResponse,
    now: DateTime<Utc>,
) {
    let timestamp = to_iso(now);
    let submission = StoredPrimmSubmission {
        user_id: user_id.clone(),
        submission_composite_key: primm_submission_key(
            &request.lesson_id,
            &request.section_id,
            &request.primm_example_id,
            &timestamp,
        ),
        lesson_id: request.lesson_id.clone(),
        section_id: request.section_id.clone(),
        primm_example_id: request.primm_example_id.clone(),
        timestamp_iso: timestamp.clone(),
        created_at: timestamp,
        code_snippet: request.code_snippet.clone(),
        user_prediction_prompt_text: request.user_prediction_prompt_text.clone(),
        user_prediction_text: request.user_prediction_text.clone(),
        actual_output_summary: request.actual_output_summary.clone(),
        user_explanation_text: request.user_explanation_text.clone(),
        ai_prediction_assessment: evaluation.ai_prediction_assessment,
        ai_explanation_assessment: evaluation.ai_explanation_assessment,
        ai_overall_comment: Some(evaluation.ai_overall_comment.clone()),
    };

    match store.save_submission(&submission) {
        Ok(()) => tracing::info!(
            component = "primm_feedback",
            event = "submission_saved",
            user_id = %user_id,
            key = %submission.submission_composite_key,
        ),
        Err(error) => tracing::error!(
            component = "primm_feedback",
            event = "submission_save_failed",
            user_id = %user_id,
            error = %error,
        ),
    }
}
