//! CloudWatch Embedded Metric Format emitter.
//!
//! Metrics are queued during an invocation and written as a single JSON line
//! on stdout by [`MetricsManager::flush`]; the Lambda log agent turns that
//! line into CloudWatch metrics.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

pub const AUTH_NAMESPACE: &str = "ThoughtfulPython/Authentication";
pub const SERVICE_DIMENSION: &str = "Service";
const COUNT_UNIT: &str = "Count";

#[derive(Debug, Default)]
struct Pending {
    counters: BTreeMap<String, f64>,
    dimensions: BTreeMap<String, String>,
}

#[derive(Debug)]
pub struct MetricsManager {
    namespace: String,
    pending: Mutex<Pending>,
}

impl MetricsManager {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            pending: Mutex::new(Pending::default()),
        }
    }

    /// Manager whose documents carry a `Service` dimension naming the
    /// invoked handler.
    pub fn for_service(namespace: impl Into<String>, service: &str) -> Self {
        let metrics = Self::new(namespace);
        metrics.set_dimension(SERVICE_DIMENSION, service);
        metrics
    }

    /// Adds `value` to the named counter. Repeated names accumulate.
    pub fn put_metric(&self, name: &str, value: f64) {
        if let Ok(mut pending) = self.pending.lock() {
            *pending.counters.entry(name.to_string()).or_insert(0.0) += value;
        }
    }

    pub fn set_dimension(&self, name: &str, value: &str) {
        if let Ok(mut pending) = self.pending.lock() {
            pending
                .dimensions
                .insert(name.to_string(), value.to_string());
        }
    }

    /// Drains the queue into an EMF document. `None` when nothing was queued.
    pub fn take_document(&self, now: DateTime<Utc>) -> Option<Value> {
        let pending = match self.pending.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(_) => return None,
        };
        if pending.counters.is_empty() {
            return None;
        }

        let definitions: Vec<Value> = pending
            .counters
            .keys()
            .map(|name| json!({ "Name": name, "Unit": COUNT_UNIT }))
            .collect();
        let dimension_keys: Vec<&String> = pending.dimensions.keys().collect();

        let mut document = Map::new();
        document.insert(
            "_aws".to_string(),
            json!({
                "Timestamp": now.timestamp_millis(),
                "CloudWatchMetrics": [{
                    "Namespace": self.namespace,
                    "Dimensions": [dimension_keys],
                    "Metrics": definitions,
                }],
            }),
        );
        for (name, value) in &pending.dimensions {
            document.insert(name.clone(), Value::String(value.clone()));
        }
        for (name, value) in pending.counters {
            document.insert(name, json!(value));
        }
        Some(Value::Object(document))
    }

    pub fn flush(&self) {
        if let Some(document) = self.take_document(Utc::now()) {
            println!("{document}");
        }
    }
}
