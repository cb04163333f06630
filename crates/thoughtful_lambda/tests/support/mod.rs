#![allow(dead_code)]

//! In-memory stand-ins for every store and remote service the handlers use.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Map, Value};
use thoughtful_core::models::first_solution::StoredFirstSolution;
use thoughtful_core::models::learning_entry::{
    ChatBotFeedback, ReflectionInteractionInput, ReflectionVersionItem,
};
use thoughtful_core::models::permissions::PermissionType;
use thoughtful_core::models::primm::{
    PrimmEvaluationRequest, PrimmEvaluationResponse, StoredPrimmSubmission,
};
use thoughtful_core::models::profile::{ProfileUpdate, UserProfile};
use thoughtful_core::models::progress::UserUnitProgress;
use thoughtful_core::models::AssessmentLevel;
use thoughtful_core::storage_keys::{first_solution_section_key, reflection_section_prefix};
use thoughtful_core::throttle::ThrottleAction;
use thoughtful_core::types::{InstructorId, LessonId, SectionId, UnitId, UserId};
use thoughtful_lambda::adapters::chatbot::{ChatBot, ChatBotError};
use thoughtful_lambda::adapters::google::{GoogleAuthError, GoogleIdentity, GoogleTokenVerifier};
use thoughtful_lambda::adapters::stores::{
    FirstSolutionStore, LearningEntryStore, Page, PermissionStore, PrimmSubmissionStore,
    RefreshTokenStore, SaveOutcome, SecretsStore, StoreError, ThrottleStore, UserProfileStore,
    UserProgressStore, VersionFilter,
};

pub const JWT_SECRET: &str = "integration-secret";

pub fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
}

/// API Gateway v2 event with an optional authorizer subject and JSON body.
pub fn api_event(method: &str, path: &str, user: Option<&str>, body: Option<Value>) -> Value {
    let mut context = json!({ "http": { "method": method, "path": path } });
    if let Some(user) = user {
        context["authorizer"] = json!({ "lambda": { "sub": user } });
    }
    let mut event = json!({
        "requestContext": context,
        "headers": { "origin": "http://localhost:5173" },
    });
    if let Some(body) = body {
        event["body"] = Value::String(body.to_string());
    }
    event
}

pub fn with_path_params(mut event: Value, params: &[(&str, &str)]) -> Value {
    let params: Map<String, Value> = params
        .iter()
        .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
        .collect();
    event["pathParameters"] = Value::Object(params);
    event
}

pub fn with_query(mut event: Value, params: &[(&str, &str)]) -> Value {
    let params: Map<String, Value> = params
        .iter()
        .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
        .collect();
    event["queryStringParameters"] = Value::Object(params);
    event
}

// ── secrets ────────────────────────────────────────────────────────

pub struct MemorySecrets {
    values: HashMap<String, String>,
}

impl MemorySecrets {
    pub fn with_defaults() -> Self {
        Self {
            values: HashMap::from([
                ("JWT_SECRET".to_string(), JWT_SECRET.to_string()),
                ("CHATBOT_API_KEY".to_string(), "gemini-key".to_string()),
            ]),
        }
    }

    pub fn empty() -> Self {
        Self {
            values: HashMap::new(),
        }
    }
}

impl SecretsStore for MemorySecrets {
    fn secret(&self, key: &str) -> Result<String, StoreError> {
        self.values
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }
}

// ── refresh tokens ─────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryRefreshTokens {
    pub tokens: Mutex<BTreeMap<(UserId, String), i64>>,
    pub fail_saves: bool,
}

impl RefreshTokenStore for MemoryRefreshTokens {
    fn save_token(
        &self,
        user_id: &UserId,
        token_id: &str,
        ttl_epoch: i64,
    ) -> Result<(), StoreError> {
        if self.fail_saves {
            return Err(StoreError::Backend("refresh table unavailable".into()));
        }
        self.tokens
            .lock()
            .unwrap()
            .insert((user_id.clone(), token_id.to_string()), ttl_epoch);
        Ok(())
    }

    fn token_exists(&self, user_id: &UserId, token_id: &str) -> Result<bool, StoreError> {
        Ok(self
            .tokens
            .lock()
            .unwrap()
            .contains_key(&(user_id.clone(), token_id.to_string())))
    }

    fn delete_token(&self, user_id: &UserId, token_id: &str) -> Result<(), StoreError> {
        self.tokens
            .lock()
            .unwrap()
            .remove(&(user_id.clone(), token_id.to_string()));
        Ok(())
    }
}

// ── profiles ───────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryProfiles {
    pub profiles: Mutex<HashMap<UserId, UserProfile>>,
}

impl UserProfileStore for MemoryProfiles {
    fn get_profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.profiles.lock().unwrap().get(user_id).cloned())
    }

    fn update_profile(&self, user_id: &UserId, update: &ProfileUpdate) -> Result<(), StoreError> {
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles.entry(user_id.clone()).or_insert_with(|| UserProfile {
            user_id: user_id.clone(),
            initialized: false,
            created_at: None,
            last_login_at: None,
            preferences: None,
            metadata: None,
        });
        if let Some(initialized) = update.initialized {
            profile.initialized = initialized;
        }
        if let Some(created_at) = &update.created_at {
            profile.created_at = Some(created_at.clone());
        }
        if let Some(last_login_at) = &update.last_login_at {
            profile.last_login_at = Some(last_login_at.clone());
        }
        Ok(())
    }
}

// ── progress ───────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryProgress {
    pub units: Mutex<BTreeMap<(UserId, UnitId), UserUnitProgress>>,
    pub puts: Mutex<usize>,
}

impl MemoryProgress {
    pub fn seed(&self, unit: UserUnitProgress) {
        self.units
            .lock()
            .unwrap()
            .insert((unit.user_id.clone(), unit.unit_id.clone()), unit);
    }
}

impl UserProgressStore for MemoryProgress {
    fn get_unit_progress(
        &self,
        user_id: &UserId,
        unit_id: &UnitId,
    ) -> Result<Option<UserUnitProgress>, StoreError> {
        Ok(self
            .units
            .lock()
            .unwrap()
            .get(&(user_id.clone(), unit_id.clone()))
            .cloned())
    }

    fn list_unit_progress(&self, user_id: &UserId) -> Result<Vec<UserUnitProgress>, StoreError> {
        Ok(self
            .units
            .lock()
            .unwrap()
            .values()
            .filter(|unit| &unit.user_id == user_id)
            .cloned()
            .collect())
    }

    fn put_unit_progress(&self, progress: &UserUnitProgress) -> Result<(), StoreError> {
        *self.puts.lock().unwrap() += 1;
        self.seed(progress.clone());
        Ok(())
    }
}

// ── learning entries ───────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryLearningEntries {
    pub items: Mutex<Vec<ReflectionVersionItem>>,
}

impl MemoryLearningEntries {
    pub fn seed(&self, item: ReflectionVersionItem) {
        self.items.lock().unwrap().push(item);
    }

    pub fn all(&self) -> Vec<ReflectionVersionItem> {
        self.items.lock().unwrap().clone()
    }
}

fn take_page<T>(mut items: Vec<T>, limit: i32) -> Page<T> {
    let limit = usize::try_from(limit).unwrap_or(0);
    if items.len() > limit {
        items.truncate(limit);
        return Page::new(items, Some(json!({ "truncated": true })));
    }
    Page::new(items, None)
}

impl LearningEntryStore for MemoryLearningEntries {
    fn save_item(&self, item: &ReflectionVersionItem) -> Result<(), StoreError> {
        self.seed(item.clone());
        Ok(())
    }

    fn get_version(
        &self,
        user_id: &UserId,
        version_id: &str,
    ) -> Result<Option<ReflectionVersionItem>, StoreError> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .find(|item| &item.user_id == user_id && item.version_id == version_id)
            .cloned())
    }

    fn versions_for_section(
        &self,
        user_id: &UserId,
        lesson_id: &LessonId,
        section_id: &SectionId,
        filter: VersionFilter,
        limit: i32,
        _last_evaluated_key: Option<Value>,
    ) -> Result<Page<ReflectionVersionItem>, StoreError> {
        let prefix = reflection_section_prefix(lesson_id, section_id);
        let mut items: Vec<ReflectionVersionItem> = self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|item| &item.user_id == user_id && item.version_id.starts_with(&prefix))
            .filter(|item| filter == VersionFilter::All || !item.is_final)
            .cloned()
            .collect();
        items.sort_by(|left, right| right.version_id.cmp(&left.version_id));
        Ok(take_page(items, limit))
    }

    fn finalized_entries(
        &self,
        user_id: &UserId,
        limit: i32,
        _last_evaluated_key: Option<Value>,
    ) -> Result<Page<ReflectionVersionItem>, StoreError> {
        let mut items: Vec<ReflectionVersionItem> = self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|item| &item.user_id == user_id && item.is_final)
            .cloned()
            .collect();
        items.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(take_page(items, limit))
    }
}

pub fn reflection_item(
    user: &str,
    lesson: &str,
    section: &str,
    created_at: &str,
    is_final: bool,
) -> ReflectionVersionItem {
    ReflectionVersionItem {
        version_id: format!("{lesson}#{section}#{created_at}"),
        user_id: user.to_string(),
        lesson_id: lesson.to_string(),
        section_id: section.to_string(),
        user_topic: "Loops".to_string(),
        user_code: "for i in range(3):\n    print(i)".to_string(),
        user_explanation: "Prints zero to two.".to_string(),
        ai_feedback: Some("Clear explanation.".to_string()),
        ai_assessment: Some(AssessmentLevel::Mostly),
        created_at: created_at.to_string(),
        is_final,
        source_version_id: None,
        final_entry_created_at: None,
    }
}

// ── PRIMM submissions ──────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryPrimmSubmissions {
    pub items: Mutex<Vec<StoredPrimmSubmission>>,
    pub fail_saves: bool,
}

impl PrimmSubmissionStore for MemoryPrimmSubmissions {
    fn save_submission(&self, submission: &StoredPrimmSubmission) -> Result<(), StoreError> {
        if self.fail_saves {
            return Err(StoreError::Backend("primm table unavailable".into()));
        }
        self.items.lock().unwrap().push(submission.clone());
        Ok(())
    }

    fn submissions_for_student(
        &self,
        user_id: &UserId,
        lesson_id: Option<&str>,
        section_id: Option<&str>,
        primm_example_id: Option<&str>,
    ) -> Result<Vec<StoredPrimmSubmission>, StoreError> {
        let mut items: Vec<StoredPrimmSubmission> = self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|item| &item.user_id == user_id)
            .filter(|item| lesson_id.map_or(true, |lesson| item.lesson_id == lesson))
            .filter(|item| section_id.map_or(true, |section| item.section_id == section))
            .filter(|item| {
                primm_example_id.map_or(true, |example| item.primm_example_id == example)
            })
            .cloned()
            .collect();
        items.sort_by_key(|item| Reverse(item.submission_composite_key.clone()));
        Ok(items)
    }
}

// ── permissions ────────────────────────────────────────────────────

/// Active grants as (student, instructor) pairs.
#[derive(Default)]
pub struct MemoryPermissions {
    pub grants: Vec<(UserId, InstructorId)>,
    pub fail: bool,
}

impl MemoryPermissions {
    pub fn granting(grants: &[(&str, &str)]) -> Self {
        Self {
            grants: grants
                .iter()
                .map(|(student, instructor)| (student.to_string(), instructor.to_string()))
                .collect(),
            fail: false,
        }
    }
}

impl PermissionStore for MemoryPermissions {
    fn has_permission(
        &self,
        student_id: &UserId,
        instructor_id: &InstructorId,
        _permission_type: PermissionType,
    ) -> Result<bool, StoreError> {
        Ok(self
            .grants
            .iter()
            .any(|(student, instructor)| student == student_id && instructor == instructor_id))
    }

    fn permitted_students(
        &self,
        instructor_id: &InstructorId,
        _permission_type: PermissionType,
    ) -> Result<Vec<UserId>, StoreError> {
        if self.fail {
            return Err(StoreError::Backend("permissions index unavailable".into()));
        }
        let students: BTreeSet<UserId> = self
            .grants
            .iter()
            .filter(|(_, instructor)| instructor == instructor_id)
            .map(|(student, _)| student.clone())
            .collect();
        Ok(students.into_iter().collect())
    }
}

// ── first solutions ────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryFirstSolutions {
    pub items: Mutex<BTreeMap<(String, UserId), StoredFirstSolution>>,
}

impl FirstSolutionStore for MemoryFirstSolutions {
    fn save_first_solution(
        &self,
        solution: &StoredFirstSolution,
    ) -> Result<SaveOutcome, StoreError> {
        let mut items = self.items.lock().unwrap();
        let key = (
            solution.section_composite_key.clone(),
            solution.user_id.clone(),
        );
        if items.contains_key(&key) {
            return Ok(SaveOutcome::AlreadyExists);
        }
        items.insert(key, solution.clone());
        Ok(SaveOutcome::Recorded)
    }

    fn solutions_for_section(
        &self,
        unit_id: &UnitId,
        lesson_id: &LessonId,
        section_id: &SectionId,
        limit: Option<i32>,
        _last_evaluated_key: Option<Value>,
    ) -> Result<Page<StoredFirstSolution>, StoreError> {
        let section_key = first_solution_section_key(unit_id, lesson_id, section_id);
        let items: Vec<StoredFirstSolution> = self
            .items
            .lock()
            .unwrap()
            .values()
            .filter(|solution| solution.section_composite_key == section_key)
            .cloned()
            .collect();
        Ok(match limit {
            Some(limit) => take_page(items, limit),
            None => Page::new(items, None),
        })
    }
}

// ── throttle ───────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryThrottle {
    pub minute: Mutex<HashMap<(UserId, ThrottleAction), i64>>,
    pub user_daily: Mutex<HashMap<(UserId, ThrottleAction, String), u64>>,
    pub global_daily: Mutex<HashMap<(ThrottleAction, String), u64>>,
}

impl ThrottleStore for MemoryThrottle {
    fn user_minute_timestamp(
        &self,
        user_id: &UserId,
        action: ThrottleAction,
    ) -> Result<Option<i64>, StoreError> {
        Ok(self
            .minute
            .lock()
            .unwrap()
            .get(&(user_id.clone(), action))
            .copied())
    }

    fn user_daily_count(
        &self,
        user_id: &UserId,
        action: ThrottleAction,
        date_key: &str,
    ) -> Result<u64, StoreError> {
        Ok(self
            .user_daily
            .lock()
            .unwrap()
            .get(&(user_id.clone(), action, date_key.to_string()))
            .copied()
            .unwrap_or(0))
    }

    fn global_daily_count(
        &self,
        action: ThrottleAction,
        date_key: &str,
    ) -> Result<u64, StoreError> {
        Ok(self
            .global_daily
            .lock()
            .unwrap()
            .get(&(action, date_key.to_string()))
            .copied()
            .unwrap_or(0))
    }

    fn set_user_minute_timestamp(
        &self,
        user_id: &UserId,
        action: ThrottleAction,
        epoch_seconds: i64,
    ) -> Result<(), StoreError> {
        self.minute
            .lock()
            .unwrap()
            .insert((user_id.clone(), action), epoch_seconds);
        Ok(())
    }

    fn increment_user_daily_count(
        &self,
        user_id: &UserId,
        action: ThrottleAction,
        date_key: &str,
        _ttl_epoch: i64,
    ) -> Result<u64, StoreError> {
        let mut counts = self.user_daily.lock().unwrap();
        let count = counts
            .entry((user_id.clone(), action, date_key.to_string()))
            .or_insert(0);
        *count += 1;
        Ok(*count)
    }

    fn increment_global_daily_count(
        &self,
        action: ThrottleAction,
        date_key: &str,
        _ttl_epoch: i64,
        limit: u64,
    ) -> Result<u64, StoreError> {
        let mut counts = self.global_daily.lock().unwrap();
        let count = counts.entry((action, date_key.to_string())).or_insert(0);
        if *count >= limit {
            return Err(StoreError::ConditionFailed);
        }
        *count += 1;
        Ok(*count)
    }
}

// ── remote services ────────────────────────────────────────────────

pub struct FakeChatBot {
    pub reflection: Result<ChatBotFeedback, ChatBotError>,
    pub primm: Result<PrimmEvaluationResponse, ChatBotError>,
    pub calls: Mutex<usize>,
}

impl FakeChatBot {
    pub fn answering() -> Self {
        Self {
            reflection: Ok(ChatBotFeedback {
                ai_feedback: "Good use of a loop.".to_string(),
                ai_assessment: AssessmentLevel::Achieves,
            }),
            primm: Ok(PrimmEvaluationResponse {
                ai_prediction_assessment: AssessmentLevel::Mostly,
                ai_explanation_assessment: Some(AssessmentLevel::Developing),
                ai_overall_comment: "Close prediction.".to_string(),
            }),
            calls: Mutex::new(0),
        }
    }

    pub fn failing(error: ChatBotError) -> Self {
        Self {
            reflection: Err(error.clone()),
            primm: Err(error),
            calls: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl ChatBot for FakeChatBot {
    fn reflection_feedback(
        &self,
        _api_key: &str,
        _input: &ReflectionInteractionInput,
    ) -> Result<ChatBotFeedback, ChatBotError> {
        *self.calls.lock().unwrap() += 1;
        self.reflection.clone()
    }

    fn primm_evaluation(
        &self,
        _api_key: &str,
        _request: &PrimmEvaluationRequest,
    ) -> Result<PrimmEvaluationResponse, ChatBotError> {
        *self.calls.lock().unwrap() += 1;
        self.primm.clone()
    }
}

/// Accepts exactly one ID token and maps it to `email`.
pub struct FakeGoogle {
    pub accepted_token: String,
    pub email: String,
}

impl GoogleTokenVerifier for FakeGoogle {
    fn verify(&self, id_token: &str) -> Result<GoogleIdentity, GoogleAuthError> {
        if id_token != self.accepted_token {
            return Err(GoogleAuthError::AudienceMismatch);
        }
        Ok(GoogleIdentity {
            email: self.email.clone(),
            email_verified: true,
        })
    }
}
