//! Gemini `generateContent` client for reflection and PRIMM feedback.

use std::time::Duration;

use serde_json::{json, Value};
use thiserror::Error;
use thoughtful_core::input_validator::sanitize_for_logging;
use thoughtful_core::models::learning_entry::{ChatBotFeedback, ReflectionInteractionInput};
use thoughtful_core::models::primm::{PrimmEvaluationRequest, PrimmEvaluationResponse};
use thoughtful_core::prompts::{
    extract_json_object, parse_primm_evaluation, parse_reflection_feedback, primm_prompt,
    reflection_prompt,
};

pub const CHATBOT_MODEL: &str = "gemini-2.0-flash";
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const MAX_OUTPUT_TOKENS: u32 = 200;
const REFLECTION_TIMEOUT: Duration = Duration::from_secs(45);
const PRIMM_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatBotError {
    #[error("AI service request timed out.")]
    Timeout,
    #[error("Failed to communicate with AI service: {0}")]
    Transport(String),
    #[error("AI service returned an unexpected response structure ({0}).")]
    UnexpectedResponse(&'static str),
    #[error("AI returned non-JSON response. Content: {0}")]
    NonJson(String),
    #[error("{0}")]
    InvalidShape(String),
}

impl ChatBotError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Timeout => 504,
            _ => 503,
        }
    }
}

pub trait ChatBot {
    fn reflection_feedback(
        &self,
        api_key: &str,
        input: &ReflectionInteractionInput,
    ) -> Result<ChatBotFeedback, ChatBotError>;

    fn primm_evaluation(
        &self,
        api_key: &str,
        request: &PrimmEvaluationRequest,
    ) -> Result<PrimmEvaluationResponse, ChatBotError>;
}

/// Pulls `candidates[0].content.parts[0].text` out of a `generateContent`
/// reply.
pub fn generated_text(response: &Value) -> Result<&str, ChatBotError> {
    let content = response
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.get("content"))
        .filter(|content| !content.is_null())
        .ok_or(ChatBotError::UnexpectedResponse("no candidates/content"))?;
    content
        .get("parts")
        .and_then(Value::as_array)
        .and_then(|parts| parts.first())
        .and_then(|part| part.get("text"))
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .ok_or(ChatBotError::UnexpectedResponse("no parts/text"))
}

/// Model output parsed as JSON, tolerating surrounding prose.
pub fn generated_json(response: &Value) -> Result<Value, ChatBotError> {
    let text = generated_text(response)?;
    tracing::info!(
        component = "chatbot",
        event = "model_reply_received",
        preview = %sanitize_for_logging(text, 500),
    );
    extract_json_object(text).map_err(|error| {
        tracing::error!(component = "chatbot", event = "model_reply_not_json", error = %error);
        ChatBotError::NonJson(sanitize_for_logging(text, 500))
    })
}

pub struct GeminiChatBot {
    client: reqwest::Client,
    api_base: String,
}

impl GeminiChatBot {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_api_base(client, GEMINI_API_BASE)
    }

    pub fn with_api_base(client: reqwest::Client, api_base: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into(),
        }
    }

    /// The API key travels in the `x-goog-api-key` header so it never shows
    /// up in a request URL.
    fn generate(
        &self,
        api_key: &str,
        prompt: String,
        timeout: Duration,
    ) -> Result<Value, ChatBotError> {
        let endpoint = format!(
            "{}/{CHATBOT_MODEL}:generateContent",
            self.api_base.trim_end_matches('/')
        );
        let payload = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "maxOutputTokens": MAX_OUTPUT_TOKENS },
        });
        let client = self.client.clone();
        let api_key = api_key.to_string();

        let response = tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let response = client
                    .post(endpoint)
                    .header("x-goog-api-key", api_key)
                    .timeout(timeout)
                    .json(&payload)
                    .send()
                    .await?
                    .error_for_status()?;
                response.json::<Value>().await
            })
        })
        .map_err(|error| {
            let error = error.without_url();
            if error.is_timeout() {
                tracing::error!(component = "chatbot", event = "model_request_timed_out");
                ChatBotError::Timeout
            } else {
                tracing::error!(
                    component = "chatbot",
                    event = "model_request_failed",
                    error = %error
                );
                ChatBotError::Transport(error.to_string())
            }
        })?;

        generated_json(&response)
    }
}

impl ChatBot for GeminiChatBot {
    fn reflection_feedback(
        &self,
        api_key: &str,
        input: &ReflectionInteractionInput,
    ) -> Result<ChatBotFeedback, ChatBotError> {
        let prompt = reflection_prompt(
            &input.user_topic,
            &input.user_code,
            &input.user_explanation,
            input.is_user_code_predefined,
        );
        let value = self.generate(api_key, prompt, REFLECTION_TIMEOUT)?;
        parse_reflection_feedback(value)
            .map_err(|error| ChatBotError::InvalidShape(error.message().to_string()))
    }

    fn primm_evaluation(
        &self,
        api_key: &str,
        request: &PrimmEvaluationRequest,
    ) -> Result<PrimmEvaluationResponse, ChatBotError> {
        let prompt = primm_prompt(
            &request.code_snippet,
            &request.user_prediction_prompt_text,
            &request.user_prediction_text,
            &request.user_explanation_text,
            request.actual_output_summary.as_deref(),
        );
        let value = self.generate(api_key, prompt, PRIMM_TIMEOUT)?;
        parse_primm_evaluation(value)
            .map_err(|error| ChatBotError::InvalidShape(error.message().to_string()))
    }
}
