use std::future::{ready, Ready};

use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};

use crate::error::GatewayError;

/// Authenticated caller, attached to the request by the gateway.
///
/// Handlers behind the gateway take it as an extractor. On routes the gateway
/// did not authorize, extraction fails with 401.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInfo {
    pub app_id: String,
    pub vendor_address: String,
    /// The `Origin` header exactly as the caller sent it
    pub matched_origin: String,
}

impl FromRequest for AppInfo {
    type Error = GatewayError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AppInfo>()
                .cloned()
                .ok_or(GatewayError::NotAuthenticated),
        )
    }
}
