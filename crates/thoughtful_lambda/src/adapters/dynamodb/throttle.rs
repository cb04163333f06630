use aws_sdk_dynamodb::operation::update_item::builders::UpdateItemFluentBuilder;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use aws_sdk_dynamodb::Client;
use thoughtful_core::storage_keys::{
    throttle_daily_sk, throttle_global_pk, throttle_user_pk, MINUTE_TRACK_SK,
};
use thoughtful_core::throttle::ThrottleAction;
use thoughtful_core::types::UserId;

use super::{backend, block_on, number_attribute, string, Item};
use crate::adapters::stores::{StoreError, ThrottleStore};

const PK: &str = "entityActionId";
const SK: &str = "periodType#periodIdentifier";

/// Rate limit counters. Minute tracking lives under
/// `MINUTE_TRACK#LATEST`, daily counts under `DAILY_COUNT#{date}` with a TTL.
pub struct DynamoThrottleStore {
    client: Client,
    table_name: String,
}

impl DynamoThrottleStore {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    fn get(&self, pk: String, sk: String) -> Result<Option<Item>, StoreError> {
        let output = block_on(
            self.client
                .get_item()
                .table_name(&self.table_name)
                .key(PK, string(pk))
                .key(SK, string(sk))
                .send(),
        )
        .map_err(|error| backend(&self.table_name, "GetItem", error))?;
        Ok(output.item().cloned())
    }

    fn increment(&self, pk: String, sk: String, ttl_epoch: i64) -> UpdateItemFluentBuilder {
        self.client
            .update_item()
            .table_name(&self.table_name)
            .key(PK, string(pk))
            .key(SK, string(sk))
            .update_expression("ADD callCount :inc SET #ttl_attr = :ttl_val")
            .expression_attribute_names("#ttl_attr", "ttl")
            .expression_attribute_values(":inc", AttributeValue::N("1".to_string()))
            .expression_attribute_values(":ttl_val", AttributeValue::N(ttl_epoch.to_string()))
            .return_values(ReturnValue::UpdatedNew)
    }
}

impl ThrottleStore for DynamoThrottleStore {
    fn user_minute_timestamp(
        &self,
        user_id: &UserId,
        action: ThrottleAction,
    ) -> Result<Option<i64>, StoreError> {
        let pk = throttle_user_pk(user_id, action.as_str());
        let item = self.get(pk, MINUTE_TRACK_SK.to_string())?;
        Ok(item
            .as_ref()
            .and_then(|item| item.get("lastCallTimestamp"))
            .and_then(|value| value.as_n().ok())
            .and_then(|raw| raw.parse::<i64>().ok()))
    }

    fn user_daily_count(
        &self,
        user_id: &UserId,
        action: ThrottleAction,
        date_key: &str,
    ) -> Result<u64, StoreError> {
        let pk = throttle_user_pk(user_id, action.as_str());
        let item = self.get(pk, throttle_daily_sk(date_key))?;
        Ok(number_attribute(item.as_ref(), "callCount"))
    }

    fn global_daily_count(
        &self,
        action: ThrottleAction,
        date_key: &str,
    ) -> Result<u64, StoreError> {
        let pk = throttle_global_pk(action.as_str());
        let item = self.get(pk, throttle_daily_sk(date_key))?;
        Ok(number_attribute(item.as_ref(), "callCount"))
    }

    fn set_user_minute_timestamp(
        &self,
        user_id: &UserId,
        action: ThrottleAction,
        epoch_seconds: i64,
    ) -> Result<(), StoreError> {
        block_on(
            self.client
                .update_item()
                .table_name(&self.table_name)
                .key(PK, string(throttle_user_pk(user_id, action.as_str())))
                .key(SK, string(MINUTE_TRACK_SK))
                .update_expression("SET lastCallTimestamp = :ts")
                .expression_attribute_values(":ts", AttributeValue::N(epoch_seconds.to_string()))
                .send(),
        )
        .map(|_| ())
        .map_err(|error| backend(&self.table_name, "UpdateItem", error))
    }

    fn increment_user_daily_count(
        &self,
        user_id: &UserId,
        action: ThrottleAction,
        date_key: &str,
        ttl_epoch: i64,
    ) -> Result<u64, StoreError> {
        let output = block_on(
            self.increment(
                throttle_user_pk(user_id, action.as_str()),
                throttle_daily_sk(date_key),
                ttl_epoch,
            )
            .send(),
        )
        .map_err(|error| backend(&self.table_name, "UpdateItem", error))?;
        Ok(number_attribute(output.attributes(), "callCount"))
    }

    fn increment_global_daily_count(
        &self,
        action: ThrottleAction,
        date_key: &str,
        ttl_epoch: i64,
        limit: u64,
    ) -> Result<u64, StoreError> {
        let pk = throttle_global_pk(action.as_str());
        let result = block_on(
            self.increment(pk, throttle_daily_sk(date_key), ttl_epoch)
                .condition_expression("attribute_not_exists(callCount) OR callCount < :limit_val")
                .expression_attribute_values(":limit_val", AttributeValue::N(limit.to_string()))
                .send(),
        );
        match result {
            Ok(output) => Ok(number_attribute(output.attributes(), "callCount")),
            Err(error) => {
                let error = error.into_service_error();
                if error.is_conditional_check_failed_exception() {
                    Err(StoreError::ConditionFailed)
                } else {
                    Err(backend(&self.table_name, "UpdateItem", error))
                }
            }
        }
    }
}
