use aws_sdk_dynamodb::Client;
use thoughtful_core::models::primm::StoredPrimmSubmission;
use thoughtful_core::storage_keys::primm_submission_prefix;
use thoughtful_core::types::UserId;

use super::{backend, block_on, collect_pages, parse_items, string, to_item};
use crate::adapters::stores::{PrimmSubmissionStore, StoreError};

const PREFIX_CONDITION: &str = "userId = :uid AND begins_with(submissionCompositeKey, :prefix)";

/// PRIMM submissions: `userId` + `submissionCompositeKey`.
pub struct DynamoPrimmSubmissionStore {
    client: Client,
    table_name: String,
}

impl DynamoPrimmSubmissionStore {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

impl PrimmSubmissionStore for DynamoPrimmSubmissionStore {
    fn save_submission(&self, submission: &StoredPrimmSubmission) -> Result<(), StoreError> {
        let item = to_item(submission)?;
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

    fn submissions_for_student(
        &self,
        user_id: &UserId,
        lesson_id: Option<&str>,
        section_id: Option<&str>,
        primm_example_id: Option<&str>,
    ) -> Result<Vec<StoredPrimmSubmission>, StoreError> {
        let mut request = self
            .client
            .query()
            .table_name(&self.table_name)
            .expression_attribute_values(":uid", string(user_id))
            .scan_index_forward(false);
        request = match primm_submission_prefix(lesson_id, section_id, primm_example_id) {
            Some(prefix) => request
                .key_condition_expression(PREFIX_CONDITION)
                .expression_attribute_values(":prefix", string(prefix)),
            None => request.key_condition_expression("userId = :uid"),
        };

        collect_pages(|start_key| {
            let output = block_on(request.clone().set_exclusive_start_key(start_key).send())
                .map_err(|error| backend(&self.table_name, "Query", error))?;
            Ok((
                parse_items(&self.table_name, output.items()),
                output.last_evaluated_key().cloned(),
            ))
        })
    }
}
