use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use aws_sdk_dynamodb::Client;

use super::{backend, block_on, string};
use crate::adapters::stores::{SecretsStore, StoreError};

/// Secret values live as long as the container does.
static SECRET_CACHE: OnceLock<Mutex<HashMap<String, String>>> = OnceLock::new();

fn cache() -> &'static Mutex<HashMap<String, String>> {
    SECRET_CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

fn cached_secret(key: &str) -> Option<String> {
    let cached = cache().lock().ok()?;
    cached.get(key).cloned()
}

/// Read-only view of the secrets table (`secretKey` -> `secretValue`).
pub struct DynamoSecretsStore {
    client: Client,
    table_name: String,
}

impl DynamoSecretsStore {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

impl SecretsStore for DynamoSecretsStore {
    fn secret(&self, key: &str) -> Result<String, StoreError> {
        if let Some(value) = cached_secret(key) {
            return Ok(value);
        }

        tracing::info!(component = "secrets", event = "secret_fetch", secret_key = %key);
        let output = block_on(
            self.client
                .get_item()
                .table_name(&self.table_name)
                .key("secretKey", string(key))
                .send(),
        )
        .map_err(|error| backend(&self.table_name, "GetItem", error))?;

        let value = output
            .item()
            .and_then(|item| item.get("secretValue"))
            .and_then(|value| value.as_s().ok())
            .filter(|value| !value.is_empty())
            .cloned()
            .ok_or_else(|| {
                tracing::error!(component = "secrets", event = "secret_missing", secret_key = %key);
                StoreError::NotFound(format!("secret '{key}'"))
            })?;

        if let Ok(mut cached) = cache().lock() {
            cached.insert(key.to_string(), value.clone());
        }
        Ok(value)
    }
}
