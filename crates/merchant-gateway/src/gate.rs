//! Authorization decision: credential resolution followed by origin checks.
//!
//! Everything here is independent of actix's service plumbing so that each
//! branch of the decision can be tested on its own; [`crate::middleware`]
//! turns an [`Outcome`] into an HTTP response.

use std::time::Instant;

use actix_web::http::{header::HeaderMap, Method};

use crate::context::AppInfo;
use crate::error::GatewayError;
use crate::metrics::STORE_LOOKUP_SECONDS;
use crate::origin::{extract_host, find_matching_pattern};
use crate::store::{AppRecord, AppStore};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Preflight requests always terminate at the gateway with 200; actual
/// requests either continue downstream or are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    Preflight,
    Actual,
}

impl RequestPhase {
    pub fn of(method: &Method) -> Self {
        if method == Method::OPTIONS {
            RequestPhase::Preflight
        } else {
            RequestPhase::Actual
        }
    }
}

/// Why an external-route request was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateRejection {
    MissingCredential,
    InvalidCredential,
    InactiveTenant,
    MissingOrigin,
    UnauthorizedOrigin {
        origin: String,
        allowed_domains: Vec<String>,
    },
}

impl GateRejection {
    /// Stable code used for audit rows and metric labels.
    pub fn code(&self) -> &'static str {
        match self {
            GateRejection::MissingCredential => "missing_api_key",
            GateRejection::InvalidCredential => "invalid_api_key",
            GateRejection::InactiveTenant => "inactive_app",
            GateRejection::MissingOrigin => "missing_origin",
            GateRejection::UnauthorizedOrigin { .. } => "unauthorized_domain",
        }
    }

    /// Human summary for the `message` field of a 403.
    pub fn summary(&self) -> &'static str {
        match self {
            GateRejection::MissingCredential => "Request rejected: API key is required",
            GateRejection::InvalidCredential => "Request rejected: invalid API key",
            GateRejection::InactiveTenant => "Request rejected: app is inactive",
            GateRejection::MissingOrigin => "Request rejected: Origin header is required",
            GateRejection::UnauthorizedOrigin { .. } => "Request rejected: unauthorized domain",
        }
    }

    /// Reason-specific text for the `details` field of a 403.
    pub fn details(&self) -> String {
        match self {
            GateRejection::MissingCredential => "X-API-Key header is required".to_string(),
            GateRejection::InvalidCredential => "invalid API key".to_string(),
            GateRejection::InactiveTenant => "app is inactive".to_string(),
            GateRejection::MissingOrigin => "Origin header is required".to_string(),
            GateRejection::UnauthorizedOrigin { origin, .. } => format!(
                "Unauthorized domain — {} is not in the allowed domains list",
                origin
            ),
        }
    }

    /// Missing headers are client mistakes, not credential probing.
    pub fn is_audited(&self) -> bool {
        !matches!(
            self,
            GateRejection::MissingCredential | GateRejection::MissingOrigin
        )
    }
}

/// Result of running the gateway pipeline for one request.
#[derive(Debug)]
pub enum Outcome {
    Authorized(AppInfo),
    Unauthorized(GateRejection),
    /// The store failed; never audited as a security event.
    InfrastructureFailure(GatewayError),
}

/// Caller-supplied credentials, as read from the request headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: Option<String>,
    /// Verbatim `Origin` header value
    pub origin: Option<String>,
}

impl Credentials {
    /// Headers that are absent, non-ASCII or blank count as missing.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let read = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.trim().is_empty())
        };
        Self {
            api_key: read(API_KEY_HEADER).map(|k| k.trim().to_string()),
            origin: read("origin").map(str::to_string),
        }
    }
}

/// Resolve the API key to an active tenant.
///
/// `Err` carries the terminal outcome. No store query is issued when the key
/// is missing.
pub async fn resolve_credential<S: AppStore>(
    store: &S,
    api_key: Option<&str>,
) -> Result<AppRecord, Outcome> {
    let api_key = match api_key {
        Some(key) => key,
        None => return Err(Outcome::Unauthorized(GateRejection::MissingCredential)),
    };

    let started = Instant::now();
    let lookup = store.find_app_by_api_key(api_key).await;
    STORE_LOOKUP_SECONDS.observe(started.elapsed().as_secs_f64());

    match lookup {
        Ok(Some(record)) if record.active => Ok(record),
        Ok(Some(record)) => {
            tracing::debug!(app_id = %record.app_id, "rejecting inactive app");
            Err(Outcome::Unauthorized(GateRejection::InactiveTenant))
        }
        Ok(None) => Err(Outcome::Unauthorized(GateRejection::InvalidCredential)),
        Err(e) => Err(Outcome::InfrastructureFailure(e)),
    }
}

/// Match the caller's origin against the tenant allow-list.
pub fn authorize_origin(record: AppRecord, origin: Option<&str>) -> Result<AppInfo, GateRejection> {
    let origin = origin.ok_or(GateRejection::MissingOrigin)?;
    let host = extract_host(origin);

    match find_matching_pattern(host, &record.allowed_domains) {
        Some(pattern) => {
            tracing::debug!(app_id = %record.app_id, %origin, %pattern, "origin authorized");
            Ok(AppInfo {
                app_id: record.app_id,
                vendor_address: record.vendor_address,
                matched_origin: origin.to_string(),
            })
        }
        None => Err(GateRejection::UnauthorizedOrigin {
            origin: origin.to_string(),
            allowed_domains: record.allowed_domains,
        }),
    }
}

/// Full decision for an external-route request.
pub async fn authorize<S: AppStore>(store: &S, credentials: &Credentials) -> Outcome {
    let record = match resolve_credential(store, credentials.api_key.as_deref()).await {
        Ok(record) => record,
        Err(outcome) => return outcome,
    };

    match authorize_origin(record, credentials.origin.as_deref()) {
        Ok(info) => Outcome::Authorized(info),
        Err(rejection) => Outcome::Unauthorized(rejection),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FailedAttempt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedStore {
        record: Option<AppRecord>,
        fail: bool,
        lookups: AtomicUsize,
    }

    impl FixedStore {
        fn new(record: Option<AppRecord>) -> Self {
            Self {
                record,
                fail: false,
                lookups: AtomicUsize::new(0),
            }
        }
    }

    impl AppStore for FixedStore {
        async fn find_app_by_api_key(
            &self,
            _api_key: &str,
        ) -> Result<Option<AppRecord>, GatewayError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(GatewayError::Internal("connection refused".to_string()));
            }
            Ok(self.record.clone())
        }

        async fn record_failed_attempt(&self, _attempt: FailedAttempt) -> Result<(), GatewayError> {
            Ok(())
        }
    }

    fn record(active: bool) -> AppRecord {
        AppRecord {
            app_id: "app-1".to_string(),
            vendor_address: "0x1234567890123456789012345678901234567890".to_string(),
            allowed_domains: vec!["shop.example.com".to_string(), "*.cdn.io".to_string()],
            active,
        }
    }

    fn creds(api_key: Option<&str>, origin: Option<&str>) -> Credentials {
        Credentials {
            api_key: api_key.map(String::from),
            origin: origin.map(String::from),
        }
    }

    #[test]
    fn test_request_phase() {
        assert_eq!(RequestPhase::of(&Method::OPTIONS), RequestPhase::Preflight);
        assert_eq!(RequestPhase::of(&Method::GET), RequestPhase::Actual);
        assert_eq!(RequestPhase::of(&Method::POST), RequestPhase::Actual);
    }

    #[test]
    fn test_rejection_texts() {
        assert!(GateRejection::InvalidCredential
            .summary()
            .contains("invalid API key"));
        assert!(GateRejection::InactiveTenant.summary().contains("inactive"));
        assert_eq!(
            GateRejection::MissingCredential.details(),
            "X-API-Key header is required"
        );
        assert_eq!(
            GateRejection::MissingOrigin.details(),
            "Origin header is required"
        );
        let r = GateRejection::UnauthorizedOrigin {
            origin: "https://evil.io".to_string(),
            allowed_domains: vec![],
        };
        assert_eq!(
            r.details(),
            "Unauthorized domain — https://evil.io is not in the allowed domains list"
        );
    }

    #[test]
    fn test_audit_policy() {
        assert!(!GateRejection::MissingCredential.is_audited());
        assert!(!GateRejection::MissingOrigin.is_audited());
        assert!(GateRejection::InvalidCredential.is_audited());
        assert!(GateRejection::InactiveTenant.is_audited());
        assert!(GateRejection::UnauthorizedOrigin {
            origin: String::new(),
            allowed_domains: vec![],
        }
        .is_audited());
    }

    #[test]
    fn test_credentials_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(
            actix_web::http::header::HeaderName::from_static("x-api-key"),
            actix_web::http::header::HeaderValue::from_static("  sk_abc "),
        );
        headers.insert(
            actix_web::http::header::ORIGIN,
            actix_web::http::header::HeaderValue::from_static("https://Shop.Example.com"),
        );
        let c = Credentials::from_headers(&headers);
        assert_eq!(c.api_key.as_deref(), Some("sk_abc"));
        assert_eq!(c.origin.as_deref(), Some("https://Shop.Example.com"));

        let mut blank = HeaderMap::new();
        blank.insert(
            actix_web::http::header::HeaderName::from_static("x-api-key"),
            actix_web::http::header::HeaderValue::from_static(""),
        );
        assert_eq!(Credentials::from_headers(&blank), Credentials::default());
    }

    #[actix_rt::test]
    async fn test_missing_key_skips_store() {
        let store = FixedStore::new(Some(record(true)));
        let outcome = authorize(&store, &creds(None, Some("https://shop.example.com"))).await;
        assert!(matches!(
            outcome,
            Outcome::Unauthorized(GateRejection::MissingCredential)
        ));
        assert_eq!(store.lookups.load(Ordering::SeqCst), 0);
    }

    #[actix_rt::test]
    async fn test_unknown_key() {
        let store = FixedStore::new(None);
        let credentials = creds(Some("sk_nope"), Some("https://shop.example.com"));
        let outcome = authorize(&store, &credentials).await;
        assert!(matches!(
            outcome,
            Outcome::Unauthorized(GateRejection::InvalidCredential)
        ));
        assert_eq!(store.lookups.load(Ordering::SeqCst), 1);
    }

    #[actix_rt::test]
    async fn test_inactive_app_rejected_even_with_good_origin() {
        let store = FixedStore::new(Some(record(false)));
        let outcome = authorize(&store, &creds(Some("sk"), Some("https://shop.example.com"))).await;
        assert!(matches!(
            outcome,
            Outcome::Unauthorized(GateRejection::InactiveTenant)
        ));
    }

    #[actix_rt::test]
    async fn test_store_failure_is_infrastructure() {
        let mut store = FixedStore::new(None);
        store.fail = true;
        let outcome = authorize(&store, &creds(Some("sk"), Some("https://shop.example.com"))).await;
        assert!(matches!(outcome, Outcome::InfrastructureFailure(_)));
    }

    #[actix_rt::test]
    async fn test_missing_origin_after_valid_key() {
        let store = FixedStore::new(Some(record(true)));
        let outcome = authorize(&store, &creds(Some("sk"), None)).await;
        assert!(matches!(
            outcome,
            Outcome::Unauthorized(GateRejection::MissingOrigin)
        ));
    }

    #[actix_rt::test]
    async fn test_authorized_keeps_origin_verbatim() {
        let store = FixedStore::new(Some(record(true)));
        let outcome = authorize(&store, &creds(Some("sk"), Some("https://Img.CDN.io"))).await;
        match outcome {
            Outcome::Authorized(info) => {
                assert_eq!(info.app_id, "app-1");
                assert_eq!(info.matched_origin, "https://Img.CDN.io");
            }
            other => panic!("expected authorized, got {:?}", other),
        }
    }

    #[test]
    fn test_authorize_origin_mismatch_carries_allow_list() {
        let err = authorize_origin(record(true), Some("https://cdn.io")).unwrap_err();
        match err {
            GateRejection::UnauthorizedOrigin {
                origin,
                allowed_domains,
            } => {
                assert_eq!(origin, "https://cdn.io");
                assert_eq!(allowed_domains.len(), 2);
            }
            other => panic!("unexpected rejection {:?}", other),
        }
    }
}
