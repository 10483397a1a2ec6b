use std::sync::Arc;

use crate::gate::{Credentials, GateRejection};
use crate::metrics::AUDIT_WRITE_FAILURES;
use crate::store::{AppStore, FailedAttempt};

impl FailedAttempt {
    /// Audit row for a rejected request, stamped with the current time.
    pub fn from_rejection(
        credentials: &Credentials,
        path: &str,
        rejection: &GateRejection,
    ) -> Self {
        Self {
            api_key_attempt: credentials.api_key.clone(),
            origin_attempt: credentials.origin.clone(),
            path: path.to_string(),
            reason: rejection.code().to_string(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Persist `attempt` without holding up the caller's response.
///
/// A write failure is logged and counted, never propagated.
pub fn record_in_background<S: AppStore>(store: Arc<S>, attempt: FailedAttempt) {
    actix_web::rt::spawn(async move {
        let reason = attempt.reason.clone();
        let path = attempt.path.clone();
        if let Err(e) = store.record_failed_attempt(attempt).await {
            AUDIT_WRITE_FAILURES.inc();
            tracing::error!(
                error = %e,
                reason = %reason,
                path = %path,
                "failed to persist failed-attempt record"
            );
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rejection_copies_attempted_credentials() {
        let credentials = Credentials {
            api_key: Some("sk_wrong".to_string()),
            origin: Some("https://evil.io".to_string()),
        };
        let attempt = FailedAttempt::from_rejection(
            &credentials,
            "/api/v1/orders",
            &GateRejection::InvalidCredential,
        );
        assert_eq!(attempt.api_key_attempt.as_deref(), Some("sk_wrong"));
        assert_eq!(attempt.origin_attempt.as_deref(), Some("https://evil.io"));
        assert_eq!(attempt.path, "/api/v1/orders");
        assert_eq!(attempt.reason, "invalid_api_key");
        assert!(attempt.timestamp > 0);
    }
}
