use aws_sdk_dynamodb::Client;
use thoughtful_core::models::progress::UserUnitProgress;
use thoughtful_core::types::{UnitId, UserId};

use super::{backend, block_on, collect_pages, from_item, parse_items, string, to_item};
use crate::adapters::stores::{StoreError, UserProgressStore};

/// One item per user and unit: `userId` + `unitId`, with the nested
/// `completion` map.
pub struct DynamoUserProgressStore {
    client: Client,
    table_name: String,
}

impl DynamoUserProgressStore {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

impl UserProgressStore for DynamoUserProgressStore {
    fn get_unit_progress(
        &self,
        user_id: &UserId,
        unit_id: &UnitId,
    ) -> Result<Option<UserUnitProgress>, StoreError> {
        let output = block_on(
            self.client
                .get_item()
                .table_name(&self.table_name)
                .key("userId", string(user_id))
                .key("unitId", string(unit_id))
                .send(),
        )
        .map_err(|error| backend(&self.table_name, "GetItem", error))?;
        output
            .item()
            .cloned()
            .map(from_item::<UserUnitProgress>)
            .transpose()
    }

    fn list_unit_progress(&self, user_id: &UserId) -> Result<Vec<UserUnitProgress>, StoreError> {
        collect_pages(|start_key| {
            let output = block_on(
                self.client
                    .query()
                    .table_name(&self.table_name)
                    .key_condition_expression("userId = :uid")
                    .expression_attribute_values(":uid", string(user_id))
                    .set_exclusive_start_key(start_key)
                    .send(),
            )
            .map_err(|error| backend(&self.table_name, "Query", error))?;
            Ok((
                parse_items::<UserUnitProgress>(&self.table_name, output.items()),
                output.last_evaluated_key().cloned(),
            ))
        })
    }

    fn put_unit_progress(&self, progress: &UserUnitProgress) -> Result<(), StoreError> {
        let item = to_item(progress)?;
        block_on(
            self.client
                .put_item()
                .table_name(&self.table_name)
                .set_item(Some(item))
                .send(),
        )
        .map(|_| ())
        .map_err(|error| backend(&self.table_name, "PutItem", error))
    }
}
