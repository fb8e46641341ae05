//! Request authorization and value resolution.
//!
//! Fixed, short-circuiting order per request: shared-secret header check
//! against the reserved `metadata_verify` record, record lookup, whitelist
//! evaluation (with localhost bypass), then optional encryption of the
//! returned value.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use axum::http::HeaderMap;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ipnet::IpNet;

use crate::crypto;
use crate::store::Store;

/// Reserved key holding the expected auth header name and value.
pub const VERIFY_KEY: &str = "metadata_verify";

/// Reserved key holding the symmetric key material for encrypted records.
pub const ENCRYPTION_KEY: &str = "key";

/// The only four request outcomes. Every failure is empty-bodied; the HTTP
/// layer maps these to 200/403/404/500 and nothing else.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Success(String),
    Forbidden,
    NotFound,
    ServerError,
}

pub struct Resolver {
    store: Arc<dyn Store>,
}

impl Resolver {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Resolve one metadata lookup. At most three store reads
    /// (`metadata_verify`, the target key, `key`); no writes, no caching.
    pub async fn resolve(&self, key: &str, caller_ip: IpAddr, headers: &HeaderMap) -> Outcome {
        // Auth fails closed: a missing or unreadable metadata_verify record
        // is indistinguishable from a bad secret.
        let verify = match self.store.get(VERIFY_KEY).await {
            Ok(Some(record)) => record,
            Ok(None) | Err(_) => return Outcome::Forbidden,
        };
        let (Some(header_name), Some(expected)) =
            (verify.header.as_deref(), verify.content.as_deref())
        else {
            return Outcome::Forbidden;
        };
        let presented = headers.get(header_name).and_then(|v| v.to_str().ok());
        if presented != Some(expected) {
            return Outcome::Forbidden;
        }

        let record = match self.store.get(key).await {
            Ok(Some(record)) => record,
            Ok(None) => return Outcome::NotFound,
            Err(e) => {
                tracing::warn!(key, error = %e, "store lookup failed");
                return Outcome::ServerError;
            }
        };
        // Records whose value is absent or falsy look exactly like missing
        // records to callers.
        let Some(value) = record.value_text() else {
            return Outcome::NotFound;
        };

        if let Some(whitelist) = &record.whitelist {
            match check_whitelist(whitelist, caller_ip) {
                WhitelistCheck::Allowed => {}
                WhitelistCheck::Denied => return Outcome::Forbidden,
                WhitelistCheck::Malformed(entry) => {
                    tracing::warn!(key, entry, "unparsable whitelist entry");
                    return Outcome::ServerError;
                }
            }
        }

        if record.encrypt_requested() {
            return Outcome::Success(self.encrypted_body(&value).await);
        }
        Outcome::Success(value)
    }

    /// Encrypt the value with key material from the reserved `key` record.
    /// Any failure (record missing or empty, store error, cipher error)
    /// degrades to plain base64 of the value rather than rejecting.
    async fn encrypted_body(&self, value: &str) -> String {
        match self.try_encrypt(value).await {
            Some(body) => body,
            None => STANDARD.encode(value.as_bytes()),
        }
    }

    async fn try_encrypt(&self, value: &str) -> Option<String> {
        let key_record = self.store.get(ENCRYPTION_KEY).await.ok()??;
        let material = key_record.value_text()?;
        let key_material = STANDARD.encode(material.as_bytes());
        crypto::encrypt_value(key_material.as_bytes(), value).ok()
    }
}

enum WhitelistCheck {
    Allowed,
    Denied,
    /// Carries the offending entry for the log line.
    Malformed(String),
}

/// Evaluate the caller against a record's whitelist. Localhost always
/// passes. Otherwise every entry must parse (bare IPs become /32 or /128
/// networks); one unparsable entry aborts the whole check even when an
/// earlier entry matched.
fn check_whitelist(entries: &[String], caller: IpAddr) -> WhitelistCheck {
    if caller == IpAddr::V4(Ipv4Addr::LOCALHOST) {
        return WhitelistCheck::Allowed;
    }
    let mut networks = Vec::with_capacity(entries.len());
    for entry in entries {
        match parse_net(entry) {
            Some(net) => networks.push(net),
            None => return WhitelistCheck::Malformed(entry.clone()),
        }
    }
    if networks.iter().any(|net| net.contains(&caller)) {
        WhitelistCheck::Allowed
    } else {
        WhitelistCheck::Denied
    }
}

fn parse_net(entry: &str) -> Option<IpNet> {
    entry
        .parse::<IpNet>()
        .ok()
        .or_else(|| entry.parse::<IpAddr>().ok().map(IpNet::from))
}
