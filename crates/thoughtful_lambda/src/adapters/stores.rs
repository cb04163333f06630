//! Storage seams. Each trait matches one DynamoDB table; implementations
//! block on the async SDK so handlers stay synchronous.

use serde_json::Value;
use thiserror::Error;
use thoughtful_core::models::first_solution::StoredFirstSolution;
use thoughtful_core::models::learning_entry::ReflectionVersionItem;
use thoughtful_core::models::permissions::PermissionType;
use thoughtful_core::models::primm::StoredPrimmSubmission;
use thoughtful_core::models::profile::{ProfileUpdate, UserProfile};
use thoughtful_core::models::progress::UserUnitProgress;
use thoughtful_core::throttle::ThrottleAction;
use thoughtful_core::types::{InstructorId, LessonId, SectionId, UnitId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conditional check failed")]
    ConditionFailed,
    #[error("dynamodb request failed: {0}")]
    Backend(String),
    #[error("stored item could not be converted: {0}")]
    Serialization(String),
}

/// One page of query results plus the key to resume from.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub last_evaluated_key: Option<Value>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, last_evaluated_key: Option<Value>) -> Self {
        Self {
            items,
            last_evaluated_key,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionFilter {
    Drafts,
    All,
}

pub trait SecretsStore {
    fn secret(&self, key: &str) -> Result<String, StoreError>;

    fn jwt_secret(&self) -> Result<String, StoreError> {
        self.secret("JWT_SECRET")
    }

    fn chatbot_api_key(&self) -> Result<String, StoreError> {
        self.secret("CHATBOT_API_KEY")
    }
}

pub trait RefreshTokenStore {
    fn save_token(
        &self,
        user_id: &UserId,
        token_id: &str,
        ttl_epoch: i64,
    ) -> Result<(), StoreError>;
    fn token_exists(&self, user_id: &UserId, token_id: &str) -> Result<bool, StoreError>;
    fn delete_token(&self, user_id: &UserId, token_id: &str) -> Result<(), StoreError>;
}

pub trait UserProfileStore {
    fn get_profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, StoreError>;
    fn update_profile(&self, user_id: &UserId, update: &ProfileUpdate) -> Result<(), StoreError>;
}

pub trait UserProgressStore {
    fn get_unit_progress(
        &self,
        user_id: &UserId,
        unit_id: &UnitId,
    ) -> Result<Option<UserUnitProgress>, StoreError>;
    fn list_unit_progress(&self, user_id: &UserId) -> Result<Vec<UserUnitProgress>, StoreError>;
    fn put_unit_progress(&self, progress: &UserUnitProgress) -> Result<(), StoreError>;
}

pub trait LearningEntryStore {
    fn save_item(&self, item: &ReflectionVersionItem) -> Result<(), StoreError>;
    fn get_version(
        &self,
        user_id: &UserId,
        version_id: &str,
    ) -> Result<Option<ReflectionVersionItem>, StoreError>;
    /// Versions for one section, newest first.
    fn versions_for_section(
        &self,
        user_id: &UserId,
        lesson_id: &LessonId,
        section_id: &SectionId,
        filter: VersionFilter,
        limit: i32,
        last_evaluated_key: Option<Value>,
    ) -> Result<Page<ReflectionVersionItem>, StoreError>;
    /// Finalized entries across all sections, newest first.
    fn finalized_entries(
        &self,
        user_id: &UserId,
        limit: i32,
        last_evaluated_key: Option<Value>,
    ) -> Result<Page<ReflectionVersionItem>, StoreError>;
}

pub trait PrimmSubmissionStore {
    fn save_submission(&self, submission: &StoredPrimmSubmission) -> Result<(), StoreError>;
    /// Every matching submission newest first, narrowed hierarchically by
    /// lesson, section and example.
    fn submissions_for_student(
        &self,
        user_id: &UserId,
        lesson_id: Option<&str>,
        section_id: Option<&str>,
        primm_example_id: Option<&str>,
    ) -> Result<Vec<StoredPrimmSubmission>, StoreError>;
}

pub trait PermissionStore {
    /// True only for an ACTIVE grant from `student_id` to `instructor_id`.
    fn has_permission(
        &self,
        student_id: &UserId,
        instructor_id: &InstructorId,
        permission_type: PermissionType,
    ) -> Result<bool, StoreError>;
    /// De-duplicated students with an ACTIVE grant to the instructor.
    fn permitted_students(
        &self,
        instructor_id: &InstructorId,
        permission_type: PermissionType,
    ) -> Result<Vec<UserId>, StoreError>;
}

/// Returned by [`FirstSolutionStore::save_first_solution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Recorded,
    AlreadyExists,
}

pub trait FirstSolutionStore {
    fn save_first_solution(
        &self,
        solution: &StoredFirstSolution,
    ) -> Result<SaveOutcome, StoreError>;
    fn solutions_for_section(
        &self,
        unit_id: &UnitId,
        lesson_id: &LessonId,
        section_id: &SectionId,
        limit: Option<i32>,
        last_evaluated_key: Option<Value>,
    ) -> Result<Page<StoredFirstSolution>, StoreError>;
}

pub trait ThrottleStore {
    fn user_minute_timestamp(
        &self,
        user_id: &UserId,
        action: ThrottleAction,
    ) -> Result<Option<i64>, StoreError>;
    fn user_daily_count(
        &self,
        user_id: &UserId,
        action: ThrottleAction,
        date_key: &str,
    ) -> Result<u64, StoreError>;
    fn global_daily_count(&self, action: ThrottleAction, date_key: &str) -> Result<u64, StoreError>;
    fn set_user_minute_timestamp(
        &self,
        user_id: &UserId,
        action: ThrottleAction,
        epoch_seconds: i64,
    ) -> Result<(), StoreError>;
    fn increment_user_daily_count(
        &self,
        user_id: &UserId,
        action: ThrottleAction,
        date_key: &str,
        ttl_epoch: i64,
    ) -> Result<u64, StoreError>;
    /// Increments only while the count is below `limit`. A failed condition
    /// is `StoreError::ConditionFailed`.
    fn increment_global_daily_count(
        &self,
        action: ThrottleAction,
        date_key: &str,
        ttl_epoch: i64,
        limit: u64,
    ) -> Result<u64, StoreError>;
}
