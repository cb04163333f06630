//! Shared domain primitives for the Thoughtful Python backend.
//!
//! This crate owns request/response contracts, storage key layout, throttling
//! policy, prompt construction and the container entry-point registry. It
//! intentionally excludes AWS SDK and Lambda runtime concerns.

pub mod apigw;
pub mod container;
pub mod dispatch;
pub mod entry_point;
pub mod error;
pub mod input_validator;
pub mod models;
pub mod progress;
pub mod prompts;
pub mod storage_keys;
pub mod throttle;
pub mod timestamps;
pub mod types;
