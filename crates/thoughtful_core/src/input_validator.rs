//! Objective checks on free-text fields before they reach a prompt.

use thiserror::Error;

pub const MAX_MARKDOWN_HEADERS: usize = 3;
pub const MAX_CODE_BLOCKS: usize = 2;
pub const MAX_CONTROL_CHAR_PERCENTAGE: f64 = 5.0;
pub const MAX_CONSECUTIVE_SPECIAL_CHARS: usize = 10;
const DEFAULT_MAX_LENGTH: usize = 2000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct SuspiciousInputError(pub String);

/// Field kinds with their own length limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Topic,
    Code,
    Explanation,
    ExtraContext,
    Prediction,
    OutputSummary,
    Other,
}

impl FieldKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Topic => "topic",
            Self::Code => "code",
            Self::Explanation => "explanation",
            Self::ExtraContext => "extra_context",
            Self::Prediction => "prediction",
            Self::OutputSummary => "output_summary",
            Self::Other => "field",
        }
    }

    pub fn max_length(self) -> usize {
        match self {
            Self::Topic => 200,
            Self::Code => 5000,
            Self::Explanation => 2000,
            Self::ExtraContext => 1000,
            Self::Prediction => 1000,
            Self::OutputSummary => 500,
            Self::Other => DEFAULT_MAX_LENGTH,
        }
    }
}

pub fn validate_field(text: &str, kind: FieldKind) -> Result<(), SuspiciousInputError> {
    let name = kind.name();
    let length = text.chars().count();
    let max_length = kind.max_length();
    if length > max_length {
        tracing::warn!(
            event = "input_length_violation",
            field = name,
            length,
            max_length
        );
        return Err(SuspiciousInputError(format!(
            "{name} exceeds maximum length of {max_length} characters"
        )));
    }

    if text.is_empty() {
        return Ok(());
    }

    let control_chars = text
        .chars()
        .filter(|c| (*c as u32) < 32 && !matches!(c, '\n' | '\r' | '\t'))
        .count();
    if control_chars > 0 {
        let percentage = control_chars as f64 / length as f64 * 100.0;
        if percentage > MAX_CONTROL_CHAR_PERCENTAGE {
            tracing::warn!(event = "input_control_chars", field = name, percentage);
            return Err(SuspiciousInputError(format!(
                "{name} contains too many control characters"
            )));
        }
    }

    let headers = text.matches("###").count();
    if headers > MAX_MARKDOWN_HEADERS {
        tracing::warn!(event = "input_excessive_headers", field = name, headers);
        return Err(SuspiciousInputError(format!(
            "{name} contains too many section headers"
        )));
    }

    if kind != FieldKind::Code {
        let fences = text.matches("```").count();
        if fences > MAX_CODE_BLOCKS {
            tracing::warn!(event = "input_excessive_code_blocks", field = name, fences);
            return Err(SuspiciousInputError(format!(
                "{name} contains too many code block markers"
            )));
        }
    }

    let mut longest = 0usize;
    let mut current = 0usize;
    for c in text.chars() {
        if !c.is_alphanumeric() && !c.is_whitespace() {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    if longest > MAX_CONSECUTIVE_SPECIAL_CHARS {
        tracing::warn!(event = "input_special_char_run", field = name, longest);
        return Err(SuspiciousInputError(format!(
            "{name} contains unusual character sequences"
        )));
    }

    Ok(())
}

pub fn validate_reflection_input(
    topic: &str,
    code: &str,
    explanation: &str,
    extra_context: Option<&str>,
) -> Result<(), SuspiciousInputError> {
    validate_field(topic, FieldKind::Topic)?;
    validate_field(code, FieldKind::Code)?;
    validate_field(explanation, FieldKind::Explanation)?;
    if let Some(context) = extra_context.filter(|value| !value.is_empty()) {
        validate_field(context, FieldKind::ExtraContext)?;
    }
    Ok(())
}

pub fn validate_primm_input(
    code_snippet: &str,
    prediction: &str,
    explanation: &str,
    prediction_prompt: &str,
    actual_output_summary: Option<&str>,
) -> Result<(), SuspiciousInputError> {
    validate_field(code_snippet, FieldKind::Code)?;
    validate_field(prediction, FieldKind::Prediction)?;
    validate_field(explanation, FieldKind::Explanation)?;
    validate_field(prediction_prompt, FieldKind::Topic)?;
    if let Some(summary) = actual_output_summary.filter(|value| !value.is_empty()) {
        validate_field(summary, FieldKind::OutputSummary)?;
    }
    Ok(())
}

/// Truncates to `max_chars` characters, appending `...` when cut.
pub fn sanitize_for_logging(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
