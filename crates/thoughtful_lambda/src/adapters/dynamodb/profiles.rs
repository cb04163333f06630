use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use thoughtful_core::models::profile::{ProfileUpdate, UserProfile};
use thoughtful_core::types::UserId;

use super::{backend, block_on, from_item, string};
use crate::adapters::stores::{StoreError, UserProfileStore};

/// User profile table keyed by `userId`.
pub struct DynamoUserProfileStore {
    client: Client,
    table_name: String,
}

impl DynamoUserProfileStore {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

/// `SET` clauses for the fields present in `update`, with their attribute
/// names and values.
pub(crate) fn update_clauses(
    update: &ProfileUpdate,
) -> Result<Vec<(&'static str, AttributeValue)>, StoreError> {
    let json = |value: &serde_json::Value| {
        serde_dynamo::to_attribute_value(value)
            .map_err(|error| StoreError::Serialization(error.to_string()))
    };
    let mut clauses = Vec::new();
    if let Some(initialized) = update.initialized {
        clauses.push(("initialized", AttributeValue::Bool(initialized)));
    }
    if let Some(created_at) = &update.created_at {
        clauses.push(("createdAt", string(created_at)));
    }
    if let Some(last_login_at) = &update.last_login_at {
        clauses.push(("lastLoginAt", string(last_login_at)));
    }
    if let Some(preferences) = &update.preferences {
        clauses.push(("preferences", json(preferences)?));
    }
    if let Some(metadata) = &update.metadata {
        clauses.push(("metadata", json(metadata)?));
    }
    Ok(clauses)
}

impl UserProfileStore for DynamoUserProfileStore {
    fn get_profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, StoreError> {
        let output = block_on(
            self.client
                .get_item()
                .table_name(&self.table_name)
                .key("userId", string(user_id))
                .send(),
        )
        .map_err(|error| backend(&self.table_name, "GetItem", error))?;

        let Some(item) = output.item().cloned() else {
            return Ok(None);
        };
        match from_item::<UserProfile>(item) {
            Ok(profile) => Ok(Some(profile)),
            Err(error) => {
                tracing::error!(
                    component = "user_profile",
                    event = "profile_invalid",
                    user_id = %user_id,
                    error = %error,
                );
                Ok(None)
            }
        }
    }

    fn update_profile(&self, user_id: &UserId, update: &ProfileUpdate) -> Result<(), StoreError> {
        let clauses = update_clauses(update)?;
        if clauses.is_empty() {
            tracing::warn!(
                component = "user_profile",
                event = "empty_profile_update",
                user_id = %user_id,
            );
            return Ok(());
        }

        let mut request = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("userId", string(user_id));
        let mut assignments = Vec::with_capacity(clauses.len());
        for (name, value) in clauses {
            assignments.push(format!("#{name} = :{name}"));
            request = request
                .expression_attribute_names(format!("#{name}"), name)
                .expression_attribute_values(format!(":{name}"), value);
        }
        request = request.update_expression(format!("SET {}", assignments.join(", ")));

        block_on(request.send())
            .map(|_| ())
            .map_err(|error| backend(&self.table_name, "UpdateItem", error))
    }
}
