pub mod mongo;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A metadata document as stored in the backing collection, keyed by `_id`.
/// The store is schemaless; every field is optional and the resolver decides
/// what a missing or falsy field means.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// The payload returned to callers. Arbitrary scalar (string, number, bool).
    #[serde(default)]
    pub value: Option<serde_json::Value>,

    /// IP addresses or CIDR ranges allowed to read this record.
    /// Presence of the field (even empty) restricts access.
    #[serde(default)]
    pub whitelist: Option<Vec<String>>,

    /// When truthy, the value is encrypted before being returned.
    /// Kept as a raw scalar since operators write documents by hand.
    #[serde(default)]
    pub encrypt: Option<serde_json::Value>,

    /// Expected request header name. Only meaningful on `metadata_verify`.
    #[serde(default)]
    pub header: Option<String>,

    /// Expected request header value. Only meaningful on `metadata_verify`.
    #[serde(default)]
    pub content: Option<String>,
}

impl MetadataRecord {
    /// The record's value as response text, or `None` if the value is absent
    /// or falsy (null, empty string, false, zero, empty array/object) —
    /// callers cannot distinguish such a record from a missing one.
    pub fn value_text(&self) -> Option<String> {
        let value = self.value.as_ref()?;
        if is_falsy(value) {
            return None;
        }
        Some(stringify(value))
    }

    /// Whether the encrypt flag is present and truthy.
    pub fn encrypt_requested(&self) -> bool {
        self.encrypt.as_ref().is_some_and(|v| !is_falsy(v))
    }
}

/// Scalars rendered in their canonical JSON text form; strings byte-for-byte.
fn stringify(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_falsy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Bool(b) => !b,
        serde_json::Value::Number(n) => {
            n.as_f64().is_some_and(|f| f == 0.0)
        }
        serde_json::Value::String(s) => s.is_empty(),
        serde_json::Value::Array(a) => a.is_empty(),
        serde_json::Value::Object(o) => o.is_empty(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store connection failed: {0}")]
    Connect(String),

    #[error("store query failed: {0}")]
    Query(String),

    #[error("malformed store document: {0}")]
    Decode(String),
}

/// Exact-key point lookup against the backing key/value store.
/// The resolver needs nothing else: no writes, no scans, no transactions.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<MetadataRecord>, StoreError>;
}

/// Backing store connection parameters, loaded from the `[store]` config
/// section. Also consumed by the backup routine to drive `mongodump`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store hostname or IP (default: "127.0.0.1")
    #[serde(default = "default_store_host")]
    pub host: String,

    /// Store port (default: 27017)
    #[serde(default = "default_store_port")]
    pub port: u16,

    /// Database name (default: "metadata")
    #[serde(default = "default_store_database")]
    pub database: String,

    /// Collection name (default: "metadata")
    #[serde(default = "default_store_collection")]
    pub collection: String,

    /// Optional username; credentials are used only when both are set.
    #[serde(default)]
    pub user: Option<String>,

    /// Optional password
    #[serde(default)]
    pub password: Option<String>,

    /// Bound on server selection when opening a connection (default: 5).
    /// The original service blocked without limit; this caps it.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: default_store_host(),
            port: default_store_port(),
            database: default_store_database(),
            collection: default_store_collection(),
            user: None,
            password: None,
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

fn default_store_host() -> String {
    "127.0.0.1".to_string()
}

fn default_store_port() -> u16 {
    27017
}

fn default_store_database() -> String {
    "metadata".to_string()
}

fn default_store_collection() -> String {
    "metadata".to_string()
}

fn default_connect_timeout() -> u64 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record_with_value(value: serde_json::Value) -> MetadataRecord {
        MetadataRecord {
            value: Some(value),
            ..Default::default()
        }
    }

    #[test]
    fn test_string_value_returned_byte_for_byte() {
        let rec = record_with_value(json!("us-east-1"));
        assert_eq!(rec.value_text().as_deref(), Some("us-east-1"));
    }

    #[test]
    fn test_scalar_values_stringified() {
        assert_eq!(record_with_value(json!(42)).value_text().as_deref(), Some("42"));
        assert_eq!(record_with_value(json!(1.5)).value_text().as_deref(), Some("1.5"));
        assert_eq!(record_with_value(json!(true)).value_text().as_deref(), Some("true"));
    }

    #[test]
    fn test_falsy_values_are_not_found() {
        assert!(MetadataRecord::default().value_text().is_none());
        assert!(record_with_value(json!(null)).value_text().is_none());
        assert!(record_with_value(json!("")).value_text().is_none());
        assert!(record_with_value(json!(false)).value_text().is_none());
        assert!(record_with_value(json!(0)).value_text().is_none());
        assert!(record_with_value(json!([])).value_text().is_none());
    }

    #[test]
    fn test_encrypt_flag_truthiness() {
        let mut rec = record_with_value(json!("x"));
        assert!(!rec.encrypt_requested());
        rec.encrypt = Some(json!(false));
        assert!(!rec.encrypt_requested());
        rec.encrypt = Some(json!(0));
        assert!(!rec.encrypt_requested());
        rec.encrypt = Some(json!(true));
        assert!(rec.encrypt_requested());
        rec.encrypt = Some(json!(1));
        assert!(rec.encrypt_requested());
    }
}
