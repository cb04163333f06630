//! Prompt construction for AI feedback and parsing of the model's JSON reply.

use serde::Deserialize;
use serde_json::Value;

use crate::error::ValidationError;
use crate::models::learning_entry::ChatBotFeedback;
use crate::models::primm::PrimmEvaluationResponse;
use crate::models::AssessmentLevel;

const REFLECTION_PREDEFINED_CODE_TEMPLATE: &str =
    include_str!("../prompts/reflection_predefined_code.txt");
const REFLECTION_SELF_CREATED_TEMPLATE: &str =
    include_str!("../prompts/reflection_self_created.txt");
const PRIMM_EVALUATION_TEMPLATE: &str = include_str!("../prompts/primm_evaluation.txt");

const MISSING_OUTPUT_SUMMARY: &str = "Not provided.";

/// Substitutes `{name}` placeholders in a single pass, so text inserted from
/// a value is never expanded again. `{{` and `}}` produce literal braces.
/// Unknown placeholders are left as written.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(index) = rest.find(&['{', '}'][..]) {
        out.push_str(&rest[..index]);
        let tail = &rest[index..];
        if tail.starts_with("{{") {
            out.push('{');
            rest = &tail[2..];
            continue;
        }
        if tail.starts_with("}}") {
            out.push('}');
            rest = &tail[2..];
            continue;
        }
        if tail.starts_with('{') {
            if let Some(close) = tail.find('}') {
                let name = &tail[1..close];
                if let Some((_, value)) = values.iter().find(|(key, _)| *key == name) {
                    out.push_str(value);
                    rest = &tail[close + 1..];
                    continue;
                }
            }
        }
        out.push_str(&tail[..1]);
        rest = &tail[1..];
    }
    out.push_str(rest);
    out
}

pub fn reflection_prompt(
    topic: &str,
    code: &str,
    explanation: &str,
    is_code_predefined: bool,
) -> String {
    let template = if is_code_predefined {
        REFLECTION_PREDEFINED_CODE_TEMPLATE
    } else {
        REFLECTION_SELF_CREATED_TEMPLATE
    };
    fill_template(
        template,
        &[
            ("topic", topic),
            ("code", code),
            ("explanation", explanation),
        ],
    )
}

pub fn primm_prompt(
    code_snippet: &str,
    prediction_prompt_text: &str,
    user_prediction_text: &str,
    user_explanation_text: &str,
    actual_output_summary: Option<&str>,
) -> String {
    let summary = actual_output_summary
        .filter(|value| !value.is_empty())
        .unwrap_or(MISSING_OUTPUT_SUMMARY);
    fill_template(
        PRIMM_EVALUATION_TEMPLATE,
        &[
            ("code_snippet", code_snippet),
            ("prediction_prompt_text", prediction_prompt_text),
            ("user_prediction_text", user_prediction_text),
            ("user_explanation_text", user_explanation_text),
            ("actual_output_summary", summary),
        ],
    )
}

/// Pulls the JSON object out of free-form model output. Text between the
/// first `{` and the last `}` is parsed when both exist, otherwise the whole
/// reply is.
pub fn extract_json_object(text: &str) -> Result<Value, serde_json::Error> {
    let candidate = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => &text[start..=end],
        _ => text,
    };
    serde_json::from_str(candidate)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReflectionFeedback {
    ai_feedback: String,
    ai_assessment: AssessmentLevel,
}

pub fn parse_reflection_feedback(value: Value) -> Result<ChatBotFeedback, ValidationError> {
    let raw: RawReflectionFeedback = serde_json::from_value(value).map_err(|error| {
        ValidationError::new(format!(
            "Invalid or unexpected response structure from AI: {error}"
        ))
    })?;
    Ok(ChatBotFeedback {
        ai_feedback: raw.ai_feedback,
        ai_assessment: raw.ai_assessment,
    })
}

pub fn parse_primm_evaluation(value: Value) -> Result<PrimmEvaluationResponse, ValidationError> {
    serde_json::from_value(value).map_err(|error| {
        ValidationError::new(format!(
            "Invalid or unexpected response structure from AI for PRIMM: {error}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn fill_template_is_single_pass() {
        let filled = fill_template(
            "{{literal}} {a} and {b} {unknown}",
            &[("a", "{b}"), ("b", "two")],
        );
        assert_eq!(filled, "{literal} {b} and two {unknown}");
    }

    #[test]
    fn reflection_prompt_picks_template_by_code_origin() {
        let given = reflection_prompt("Loops", "for x in y: pass", "It loops", true);
        let own = reflection_prompt("Loops", "for x in y: pass", "It loops", false);
        assert!(given.contains("**Code Student Was Given to Analyze:**"));
        assert!(own.contains("**Student's Code:**"));
        assert!(given.contains("for x in y: pass"));
        assert!(own.contains("\"aiAssessment\": \"mostly\""));
        assert!(!own.contains("{topic}"));
    }

    #[test]
    fn primm_prompt_defaults_missing_output_summary() {
        let prompt = primm_prompt("print(1)", "What prints?", "1", "It printed 1", None);
        assert!(prompt.contains("Not provided."));
        assert!(prompt.contains("print(1)"));
        assert!(!prompt.contains("{actual_output_summary}"));
    }

    #[test]
    fn extracts_json_embedded_in_prose() {
        let reply = "Sure!\n```json\n{\"aiFeedback\": \"ok\", \"aiAssessment\": \"achieves\"}\n```";
        let value = extract_json_object(reply).expect("embedded json");
        let feedback = parse_reflection_feedback(value).expect("valid feedback");
        assert_eq!(feedback.ai_assessment, AssessmentLevel::Achieves);
        assert!(extract_json_object("no json here").is_err());
    }

    #[test]
    fn primm_explanation_assessment_may_be_null() {
        let value = json!({
            "aiPredictionAssessment": "developing",
            "aiExplanationAssessment": null,
            "aiOverallComment": "Keep going"
        });
        let evaluation = parse_primm_evaluation(value).expect("valid");
        assert_eq!(evaluation.ai_explanation_assessment, None);
    }

    #[test]
    fn rejects_unknown_assessment_level() {
        let value = json!({"aiFeedback": "x", "aiAssessment": "excellent"});
        assert!(parse_reflection_feedback(value).is_err());
    }
}
