mod support;

use serde_json::{json, Value};
use thoughtful_core::throttle::{ThrottleAction, ThrottlePolicy};
use thoughtful_lambda::adapters::chatbot::ChatBotError;
use thoughtful_lambda::handlers::primm_feedback::{
    handle_primm_feedback_event, PrimmFeedbackDependencies,
};
use thoughtful_lambda::metrics::{MetricsManager, AUTH_NAMESPACE};

use support::{api_event, noon, FakeChatBot, MemoryPrimmSubmissions, MemorySecrets, MemoryThrottle};

struct Harness {
    submissions: MemoryPrimmSubmissions,
    throttle: MemoryThrottle,
    secrets: MemorySecrets,
    chatbot: FakeChatBot,
    metrics: MetricsManager,
    policy: ThrottlePolicy,
}

impl Harness {
    fn new(chatbot: FakeChatBot) -> Self {
        Self {
            submissions: MemoryPrimmSubmissions::default(),
            throttle: MemoryThrottle::default(),
            secrets: MemorySecrets::with_defaults(),
            chatbot,
            metrics: MetricsManager::new(AUTH_NAMESPACE),
            policy: ThrottlePolicy::default(),
        }
    }

    fn deps(&self) -> PrimmFeedbackDependencies<'_> {
        PrimmFeedbackDependencies {
            submissions: &self.submissions,
            throttle: &self.throttle,
            secrets: &self.secrets,
            chatbot: &self.chatbot,
            metrics: &self.metrics,
            throttle_policy: self.policy,
        }
    }

    fn emitted(&self, metric: &str) -> bool {
        self.metrics
            .take_document(noon())
            .map_or(false, |document| document.get(metric).is_some())
    }
}

fn request_body() -> Value {
    json!({
        "lessonId": "l2",
        "sectionId": "predict",
        "primmExampleId": "ex-1",
        "codeSnippet": "print(2 + 3)",
        "userPredictionPromptText": "What will this print?",
        "userPredictionText": "5",
        "userExplanationText": "It adds the numbers first.",
        "actualOutputSummary": "5",
    })
}

fn post(body: Value) -> Value {
    api_event("POST", "/primm-feedback", Some("alice"), Some(body))
}

#[test]
fn evaluation_is_returned_and_stored() {
    let harness = Harness::new(FakeChatBot::answering());
    let response = handle_primm_feedback_event(&post(request_body()), &harness.deps(), noon());

    assert_eq!(response.status_code, 200);
    let body = response.json_body();
    assert_eq!(body["aiPredictionAssessment"], "mostly");
    assert_eq!(body["aiExplanationAssessment"], "developing");
    assert_eq!(body["aiOverallComment"], "Close prediction.");

    let stored = harness.submissions.items.lock().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(
        stored[0].submission_composite_key,
        "l2#predict#ex-1#2025-03-10T12:00:00.000000Z"
    );
    let comment = stored[0].ai_overall_comment.as_deref();
    assert_eq!(comment, Some("Close prediction."));
}

#[test]
fn storage_failure_does_not_hide_the_evaluation() {
    let mut harness = Harness::new(FakeChatBot::answering());
    harness.submissions.fail_saves = true;
    let response = handle_primm_feedback_event(&post(request_body()), &harness.deps(), noon());

    assert_eq!(response.status_code, 200);
    let body = response.json_body();
    assert_eq!(body["aiOverallComment"], "Close prediction.");
}

#[test]
fn exhausted_user_daily_quota_is_rate_limited() {
    let harness = Harness::new(FakeChatBot::answering());
    let key = (
        "alice".to_string(),
        ThrottleAction::PrimmFeedbackChatbotApiCall,
        "2025-03-10".to_string(),
    );
    let mut user_daily = harness.throttle.user_daily.lock().unwrap();
    user_daily.insert(key, 20);
    drop(user_daily);

    let response = handle_primm_feedback_event(&post(request_body()), &harness.deps(), noon());

    assert_eq!(response.status_code, 429);
    let body = response.json_body();
    assert_eq!(body["code"], "RATE_LIMIT_EXCEEDED");
    assert_eq!(body["details"]["limitType"], "USER_DAILY_LIMIT");
    assert_eq!(harness.chatbot.call_count(), 0);
    assert!(harness.emitted("ThrottledRequest"));
}

#[test]
fn exhausted_global_quota_is_rate_limited() {
    let harness = Harness::new(FakeChatBot::answering());
    let key = (
        ThrottleAction::PrimmFeedbackChatbotApiCall,
        "2025-03-10".to_string(),
    );
    let mut global_daily = harness.throttle.global_daily.lock().unwrap();
    global_daily.insert(key, 100);
    drop(global_daily);

    let response = handle_primm_feedback_event(&post(request_body()), &harness.deps(), noon());

    assert_eq!(response.status_code, 429);
    let body = response.json_body();
    assert_eq!(body["details"]["limitType"], "GLOBAL_DAILY_LIMIT");
}

#[test]
fn reflection_quota_does_not_affect_primm() {
    let harness = Harness::new(FakeChatBot::answering());
    let key = (
        "alice".to_string(),
        ThrottleAction::ReflectionFeedbackChatbotApiCall,
    );
    let mut minute = harness.throttle.minute.lock().unwrap();
    minute.insert(key, noon().timestamp());
    drop(minute);

    let response = handle_primm_feedback_event(&post(request_body()), &harness.deps(), noon());
    assert_eq!(response.status_code, 200);
}

#[test]
fn ai_failure_is_reported_and_nothing_is_stored() {
    let chatbot = FakeChatBot::failing(ChatBotError::Transport("connection reset".into()));
    let harness = Harness::new(chatbot);
    let response = handle_primm_feedback_event(&post(request_body()), &harness.deps(), noon());

    assert_eq!(response.status_code, 503);
    assert_eq!(response.json_body()["code"], "AI_SERVICE_UNAVAILABLE");
    assert!(harness.submissions.items.lock().unwrap().is_empty());
    assert!(harness.emitted("ChatBotApiFailure"));
}

#[test]
fn oversized_prediction_is_rejected() {
    let harness = Harness::new(FakeChatBot::answering());
    let mut body = request_body();
    body["userPredictionText"] = json!("a".repeat(1001));
    let response = handle_primm_feedback_event(&post(body), &harness.deps(), noon());

    assert_eq!(response.status_code, 400);
    assert_eq!(harness.chatbot.call_count(), 0);
}

#[test]
fn missing_fields_are_rejected() {
    let harness = Harness::new(FakeChatBot::answering());
    let event = post(json!({ "lessonId": "l2" }));
    let response = handle_primm_feedback_event(&event, &harness.deps(), noon());
    assert_eq!(response.status_code, 400);
}

#[test]
fn only_post_is_allowed() {
    let harness = Harness::new(FakeChatBot::answering());
    let event = api_event("GET", "/primm-feedback", Some("alice"), None);
    let response = handle_primm_feedback_event(&event, &harness.deps(), noon());
    assert_eq!(response.status_code, 405);
}

#[test]
fn anonymous_request_is_unauthorized() {
    let harness = Harness::new(FakeChatBot::answering());
    let event = api_event("POST", "/primm-feedback", None, Some(request_body()));
    let response = handle_primm_feedback_event(&event, &harness.deps(), noon());
    assert_eq!(response.status_code, 401);
}
