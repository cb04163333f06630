use aws_sdk_dynamodb::Client;
use serde_json::Value;
use thoughtful_core::models::first_solution::StoredFirstSolution;
use thoughtful_core::storage_keys::first_solution_section_key;
use thoughtful_core::types::{LessonId, SectionId, UnitId};

use super::{backend, block_on, key_from_json, key_to_json, parse_items, string, to_item};
use crate::adapters::stores::{FirstSolutionStore, Page, SaveOutcome, StoreError};

/// Write-once first solutions: `sectionCompositeKey` + `userId`.
pub struct DynamoFirstSolutionStore {
    client: Client,
    table_name: String,
}

impl DynamoFirstSolutionStore {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

impl FirstSolutionStore for DynamoFirstSolutionStore {
    fn save_first_solution(
        &self,
        solution: &StoredFirstSolution,
    ) -> Result<SaveOutcome, StoreError> {
        let item = to_item(solution)?;
        let result = block_on(
            self.client
                .put_item()
                .table_name(&self.table_name)
                .set_item(Some(item))
                .condition_expression(
                    "attribute_not_exists(sectionCompositeKey) AND attribute_not_exists(userId)",
                )
                .send(),
        );
        match result {
            Ok(_) => Ok(SaveOutcome::Recorded),
            Err(error) => {
                let error = error.into_service_error();
                if error.is_conditional_check_failed_exception() {
                    tracing::info!(
                        component = "first_solutions_table",
                        event = "first_solution_exists",
                        user_id = %solution.user_id,
                        section = %solution.section_composite_key,
                    );
                    Ok(SaveOutcome::AlreadyExists)
                } else {
                    Err(backend(&self.table_name, "PutItem", error))
                }
            }
        }
    }

    fn solutions_for_section(
        &self,
        unit_id: &UnitId,
        lesson_id: &LessonId,
        section_id: &SectionId,
        limit: Option<i32>,
        last_evaluated_key: Option<Value>,
    ) -> Result<Page<StoredFirstSolution>, StoreError> {
        let output = block_on(
            self.client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression("sectionCompositeKey = :section")
                .expression_attribute_values(
                    ":section",
                    string(first_solution_section_key(unit_id, lesson_id, section_id)),
                )
                .set_limit(limit)
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
