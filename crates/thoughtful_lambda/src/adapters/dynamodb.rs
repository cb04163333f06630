//! DynamoDB implementations of the store traits.
//!
//! Every store blocks on the async SDK from inside the Lambda runtime's
//! multi-threaded executor, the same way the other AWS adapters do.

use std::collections::HashMap;
use std::future::Future;

use aws_sdk_dynamodb::types::AttributeValue;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::stores::StoreError;

pub mod first_solutions;
pub mod learning_entries;
pub mod permissions;
pub mod primm_submissions;
pub mod profiles;
pub mod progress;
pub mod refresh_tokens;
pub mod secrets;
pub mod throttle;

pub use first_solutions::DynamoFirstSolutionStore;
pub use learning_entries::DynamoLearningEntryStore;
pub use permissions::DynamoPermissionStore;
pub use primm_submissions::DynamoPrimmSubmissionStore;
pub use profiles::DynamoUserProfileStore;
pub use progress::DynamoUserProgressStore;
pub use refresh_tokens::DynamoRefreshTokenStore;
pub use secrets::DynamoSecretsStore;
pub use throttle::DynamoThrottleStore;

pub type Item = HashMap<String, AttributeValue>;

pub(crate) fn block_on<F: Future>(future: F) -> F::Output {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

pub(crate) fn string(value: impl Into<String>) -> AttributeValue {
    AttributeValue::S(value.into())
}

pub(crate) fn backend(table: &str, operation: &str, error: impl std::fmt::Display) -> StoreError {
    tracing::error!(
        component = "dynamodb",
        event = "request_failed",
        table = %table,
        operation = %operation,
        error = %error,
    );
    StoreError::Backend(format!("{operation} on {table}: {error}"))
}

pub(crate) fn to_item<T: Serialize>(value: &T) -> Result<Item, StoreError> {
    serde_dynamo::to_item(value).map_err(|error| StoreError::Serialization(error.to_string()))
}

pub(crate) fn from_item<T: DeserializeOwned>(item: Item) -> Result<T, StoreError> {
    serde_dynamo::from_item(item).map_err(|error| StoreError::Serialization(error.to_string()))
}

/// Converts query results, skipping (and logging) items that do not match
/// the model.
pub(crate) fn parse_items<T: DeserializeOwned>(table: &str, items: &[Item]) -> Vec<T> {
    items
        .iter()
        .filter_map(|item| match from_item::<T>(item.clone()) {
            Ok(parsed) => Some(parsed),
            Err(error) => {
                tracing::error!(
                    component = "dynamodb",
                    event = "item_validation_failed",
                    table = %table,
                    error = %error,
                );
                None
            }
        })
        .collect()
}

/// Calls `fetch` with each page's `ExclusiveStartKey` until the table stops
/// returning a `LastEvaluatedKey`, concatenating the pages.
pub(crate) fn collect_pages<T>(
    mut fetch: impl FnMut(Option<Item>) -> Result<(Vec<T>, Option<Item>), StoreError>,
) -> Result<Vec<T>, StoreError> {
    let mut collected = Vec::new();
    let mut start_key = None;
    loop {
        let (page, last_key) = fetch(start_key.take())?;
        collected.extend(page);
        match last_key {
            Some(key) if !key.is_empty() => start_key = Some(key),
            _ => return Ok(collected),
        }
    }
}

/// `LastEvaluatedKey` as plain JSON for API responses.
pub(crate) fn key_to_json(key: Option<&Item>) -> Option<Value> {
    let key = key.filter(|key| !key.is_empty())?;
    match serde_dynamo::from_item::<_, Value>(key.clone()) {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::warn!(
                component = "dynamodb",
                event = "last_evaluated_key_unreadable",
                error = %error,
            );
            None
        }
    }
}

/// JSON `lastEvaluatedKey` from a client back into an `ExclusiveStartKey`.
pub(crate) fn key_from_json(key: Option<Value>) -> Result<Option<Item>, StoreError> {
    match key {
        Some(Value::Object(object)) if !object.is_empty() => {
            let item = serde_dynamo::to_item(Value::Object(object)).map_err(|error| {
                StoreError::Serialization(format!("invalid lastEvaluatedKey: {error}"))
            })?;
            Ok(Some(item))
        }
        _ => Ok(None),
    }
}

/// Reads a numeric attribute, treating a missing one as zero.
pub(crate) fn number_attribute(item: Option<&Item>, name: &str) -> u64 {
    item.and_then(|item| item.get(name))
        .and_then(|value| value.as_n().ok())
        .and_then(|raw| raw.parse::<u64>().ok())
        .unwrap_or(0)
}
