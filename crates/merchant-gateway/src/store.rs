//! Store contract consumed by the gateway.
//!
//! The gateway only ever performs two operations against tenant storage: a
//! point lookup of an app by its raw API key, and an append of a failed
//! attempt. [`crate::db::Database`] is the SQLite implementation; tests
//! substitute their own.

use std::future::Future;

use sha2::{Digest, Sha256};

use crate::error::GatewayError;

/// Tenant app record, read-only to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AppRecord {
    pub app_id: String,
    pub vendor_address: String,
    /// Ordered allow-list of exact, wildcard (`*.example.com`) or dev patterns.
    pub allowed_domains: Vec<String>,
    pub active: bool,
}

/// Append-only record of a rejected external-route request.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FailedAttempt {
    pub api_key_attempt: Option<String>,
    pub origin_attempt: Option<String>,
    pub path: String,
    /// Stable rejection code, e.g. `invalid_api_key`
    pub reason: String,
    /// Unix seconds
    pub timestamp: i64,
}

/// Asynchronous tenant store.
///
/// Implementations must not cache: a deactivation or allow-list edit has to be
/// visible on the very next lookup.
pub trait AppStore: Send + Sync + 'static {
    /// Fetch the app owning `api_key`. `Ok(None)` when no row matches.
    fn find_app_by_api_key(
        &self,
        api_key: &str,
    ) -> impl Future<Output = Result<Option<AppRecord>, GatewayError>> + Send;

    /// Append a failed-attempt record.
    fn record_failed_attempt(
        &self,
        attempt: FailedAttempt,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;
}

/// Hex SHA-256 of a raw API key. Only digests are persisted.
pub fn hash_api_key(api_key: &str) -> String {
    let digest = Sha256::digest(api_key.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_api_key_is_stable_hex() {
        let h = hash_api_key("sk_test");
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(h, hash_api_key("sk_test"));
        assert_ne!(h, hash_api_key("sk_test2"));
    }

    #[test]
    fn test_hash_api_key_known_vector() {
        // sha256("abc")
        assert_eq!(
            hash_api_key("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
