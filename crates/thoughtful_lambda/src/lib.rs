//! AWS-facing adapters and per-route handlers for the Thoughtful Python
//! backend.
//!
//! Handlers are plain functions over `&dyn` store traits and return API
//! Gateway responses, so they run the same against DynamoDB in the
//! `bootstrap` binary and against in-memory fakes in tests. Domain contracts
//! come from `thoughtful_core`.

pub mod adapters;
pub mod config;
pub mod handlers;
pub mod jwt;
pub mod metrics;
pub mod throttle;
