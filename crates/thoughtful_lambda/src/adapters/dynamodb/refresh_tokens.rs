use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use thoughtful_core::types::UserId;

use super::{backend, block_on, string};
use crate::adapters::stores::{RefreshTokenStore, StoreError};

/// Refresh token table: `userId` + `tokenId`, expired through `ttl`.
pub struct DynamoRefreshTokenStore {
    client: Client,
    table_name: String,
}

impl DynamoRefreshTokenStore {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

impl RefreshTokenStore for DynamoRefreshTokenStore {
    fn save_token(
        &self,
        user_id: &UserId,
        token_id: &str,
        ttl_epoch: i64,
    ) -> Result<(), StoreError> {
        block_on(
            self.client
                .put_item()
                .table_name(&self.table_name)
                .item("userId", string(user_id))
                .item("tokenId", string(token_id))
                .item("ttl", AttributeValue::N(ttl_epoch.to_string()))
                .send(),
        )
        .map(|_| ())
        .map_err(|error| backend(&self.table_name, "PutItem", error))
    }

    fn token_exists(&self, user_id: &UserId, token_id: &str) -> Result<bool, StoreError> {
        let output = block_on(
            self.client
                .get_item()
                .table_name(&self.table_name)
                .key("userId", string(user_id))
                .key("tokenId", string(token_id))
                .send(),
        )
        .map_err(|error| backend(&self.table_name, "GetItem", error))?;
        Ok(output.item().is_some())
    }

    fn delete_token(&self, user_id: &UserId, token_id: &str) -> Result<(), StoreError> {
        block_on(
            self.client
                .delete_item()
                .table_name(&self.table_name)
                .key("userId", string(user_id))
                .key("tokenId", string(token_id))
                .send(),
        )
        .map(|_| ())
        .map_err(|error| backend(&self.table_name, "DeleteItem", error))
    }
}
