use std::collections::BTreeSet;

use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use thoughtful_core::models::permissions::PermissionType;
use thoughtful_core::storage_keys::{
    granter_from_gsi_sk, permission_main_sk, GRANTEE_PERMISSIONS_INDEX,
};
use thoughtful_core::types::{InstructorId, UserId};

use super::{backend, block_on, collect_pages, string, Item};
use crate::adapters::stores::{PermissionStore, StoreError};

const ACTIVE: &str = "ACTIVE";
const GRANTEE_CONDITION: &str =
    "granteeUserId = :grantee AND begins_with(granterPermissionTypeComposite, :prefix)";

/// Permission grants: `granterUserId` (student) +
/// `granteePermissionTypeComposite`, with the `GranteePermissionsIndex` GSI
/// keyed by instructor.
pub struct DynamoPermissionStore {
    client: Client,
    table_name: String,
}

impl DynamoPermissionStore {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

/// Student id of a GSI item, falling back to the sort key when the
/// attribute is not projected.
pub(crate) fn granter_of(item: &Item) -> Option<String> {
    if let Some(AttributeValue::S(granter)) = item.get("granterUserId") {
        return Some(granter.clone());
    }
    match item.get("granterPermissionTypeComposite") {
        Some(AttributeValue::S(sk)) => granter_from_gsi_sk(sk).map(str::to_string),
        _ => None,
    }
}

impl PermissionStore for DynamoPermissionStore {
    fn has_permission(
        &self,
        student_id: &UserId,
        instructor_id: &InstructorId,
        permission_type: PermissionType,
    ) -> Result<bool, StoreError> {
        let output = block_on(
            self.client
                .get_item()
                .table_name(&self.table_name)
                .key("granterUserId", string(student_id))
                .key(
                    "granteePermissionTypeComposite",
                    string(permission_main_sk(permission_type.as_str(), instructor_id)),
                )
                .send(),
        );
        match output {
            Ok(output) => Ok(output
                .item()
                .and_then(|item| item.get("status"))
                .and_then(|status| status.as_s().ok())
                .is_some_and(|status| status == ACTIVE)),
            Err(error) => {
                tracing::error!(
                    component = "permissions_table",
                    event = "permission_check_failed",
                    student_id = %student_id,
                    instructor_id = %instructor_id,
                    error = %error,
                );
                Ok(false)
            }
        }
    }

    fn permitted_students(
        &self,
        instructor_id: &InstructorId,
        permission_type: PermissionType,
    ) -> Result<Vec<UserId>, StoreError> {
        let prefix = format!("{}#", permission_type.as_str());
        let granters: Vec<UserId> = collect_pages(|start_key| {
            let output = block_on(
                self.client
                    .query()
                    .table_name(&self.table_name)
                    .index_name(GRANTEE_PERMISSIONS_INDEX)
                    .key_condition_expression(GRANTEE_CONDITION)
                    .filter_expression("#status = :active")
                    .expression_attribute_names("#status", "status")
                    .expression_attribute_values(":grantee", string(instructor_id))
                    .expression_attribute_values(":prefix", string(&prefix))
                    .expression_attribute_values(":active", string(ACTIVE))
                    .set_exclusive_start_key(start_key)
                    .send(),
            )
            .map_err(|error| backend(&self.table_name, "Query", error))?;
            Ok((
                output.items().iter().filter_map(granter_of).collect(),
                output.last_evaluated_key().cloned(),
            ))
        })?;
        let students: BTreeSet<UserId> = granters.into_iter().collect();
        tracing::info!(
            component = "permissions_table",
            event = "permitted_students_loaded",
            instructor_id = %instructor_id,
            count = students.len(),
        );
        Ok(students.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn granter_prefers_projected_attribute() {
        let item = Item::from([
            ("granterUserId".to_string(), string("student-a")),
            (
                "granterPermissionTypeComposite".to_string(),
                string("VIEW_STUDENT_DATA_FULL#other"),
            ),
        ]);
        assert_eq!(granter_of(&item).as_deref(), Some("student-a"));
    }

    #[test]
    fn granter_falls_back_to_sort_key() {
        let item = Item::from([(
            "granterPermissionTypeComposite".to_string(),
            string("VIEW_STUDENT_DATA_FULL#student-b"),
        )]);
        assert_eq!(granter_of(&item).as_deref(), Some("student-b"));
        assert_eq!(granter_of(&Item::new()), None);
    }
}
