use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use serde_json::Value;
use thoughtful_core::models::learning_entry::ReflectionVersionItem;
use thoughtful_core::storage_keys::{reflection_section_prefix, FINAL_ENTRIES_INDEX};
use thoughtful_core::types::{LessonId, SectionId, UserId};

use super::{backend, block_on, from_item, key_from_json, key_to_json, parse_items, string, to_item};
use crate::adapters::stores::{LearningEntryStore, Page, StoreError, VersionFilter};

/// Reflection versions: `userId` + `versionId`
/// (`{lessonId}#{sectionId}#{createdAt}`). Final entries are also reachable
/// through the `UserFinalLearningEntriesIndex` GSI.
pub struct DynamoLearningEntryStore {
    client: Client,
    table_name: String,
}

impl DynamoLearningEntryStore {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

impl LearningEntryStore for DynamoLearningEntryStore {
    fn save_item(&self, item: &ReflectionVersionItem) -> Result<(), StoreError> {
        let attributes = to_item(item)?;
        block_on(
            self.client
                .put_item()
                .table_name(&self.table_name)
                .set_item(Some(attributes))
                .send(),
        )
        .map_err(|error| backend(&self.table_name, "PutItem", error))?;
        tracing::info!(
            component = "learning_entries_table",
            event = "version_saved",
            user_id = %item.user_id,
            version_id = %item.version_id,
        );
        Ok(())
    }

    fn get_version(
        &self,
        user_id: &UserId,
        version_id: &str,
    ) -> Result<Option<ReflectionVersionItem>, StoreError> {
        let output = block_on(
            self.client
                .get_item()
                .table_name(&self.table_name)
                .key("userId", string(user_id))
                .key("versionId", string(version_id))
                .send(),
        )
        .map_err(|error| backend(&self.table_name, "GetItem", error))?;

        let Some(item) = output.item().cloned() else {
            return Ok(None);
        };
        match from_item::<ReflectionVersionItem>(item) {
            Ok(version) => Ok(Some(version)),
            Err(error) => {
                tracing::error!(
                    component = "learning_entries_table",
                    event = "item_validation_failed",
                    version_id = %version_id,
                    error = %error,
                );
                Ok(None)
            }
        }
    }

    fn versions_for_section(
        &self,
        user_id: &UserId,
        lesson_id: &LessonId,
        section_id: &SectionId,
        filter: VersionFilter,
        limit: i32,
        last_evaluated_key: Option<Value>,
    ) -> Result<Page<ReflectionVersionItem>, StoreError> {
        let prefix = reflection_section_prefix(lesson_id, section_id);
        let mut request = self
            .client
            .query()
            .table_name(&self.table_name)
            .key_condition_expression("userId = :uid AND begins_with(versionId, :prefix)")
            .expression_attribute_values(":uid", string(user_id))
            .expression_attribute_values(":prefix", string(prefix))
            .scan_index_forward(false)
            .limit(limit)
            .set_exclusive_start_key(key_from_json(last_evaluated_key)?);
        if filter == VersionFilter::Drafts {
            request = request
                .filter_expression("isFinal = :final")
                .expression_attribute_values(":final", AttributeValue::Bool(false));
        }

        let output =
            block_on(request.send()).map_err(|error| backend(&self.table_name, "Query", error))?;
        Ok(Page::new(
            parse_items(&self.table_name, output.items()),
            key_to_json(output.last_evaluated_key()),
        ))
    }

    fn finalized_entries(
        &self,
        user_id: &UserId,
        limit: i32,
        last_evaluated_key: Option<Value>,
    ) -> Result<Page<ReflectionVersionItem>, StoreError> {
        let output = block_on(
            self.client
                .query()
                .table_name(&self.table_name)
                .index_name(FINAL_ENTRIES_INDEX)
                .key_condition_expression("userId = :uid")
                .expression_attribute_values(":uid", string(user_id))
                .scan_index_forward(false)
                .limit(limit)
                .set_exclusive_start_key(key_from_json(last_evaluated_key)?)
                .send(),
        )
        .map_err(|error| backend(&self.table_name, "Query", error))?;
        Ok(Page::new(
            parse_items(&self.table_name, output.items()),
            key_to_json(output.last_evaluated_key()),
        ))
    }
}
