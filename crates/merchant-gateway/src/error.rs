use actix_web::{HttpResponse, ResponseError};
use std::fmt;

#[derive(Debug)]
pub enum GatewayError {
    /// Database error
    Database(rusqlite::Error),
    /// Tenant app not found
    AppNotFound(String),
    /// Allow-list pattern rejected on write
    InvalidDomain(String),
    /// Vendor address is not a valid EVM address
    InvalidAddress(String),
    /// Malformed admin request
    InvalidRequest(String),
    /// Missing or wrong admin bearer token
    AdminUnauthorized,
    /// Handler expected an authenticated app but the gate did not attach one
    NotAuthenticated,
    /// Internal error
    Internal(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Database(e) => write!(f, "database error: {}", e),
            GatewayError::AppNotFound(id) => write!(f, "app not found: {}", id),
            GatewayError::InvalidDomain(msg) => write!(f, "invalid domain pattern: {}", msg),
            GatewayError::InvalidAddress(addr) => write!(f, "invalid vendor address: {}", addr),
            GatewayError::InvalidRequest(msg) => write!(f, "invalid request: {}", msg),
            GatewayError::AdminUnauthorized => write!(f, "admin authentication required"),
            GatewayError::NotAuthenticated => write!(f, "request was not authenticated"),
            GatewayError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for GatewayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GatewayError::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for GatewayError {
    fn from(e: rusqlite::Error) -> Self {
        GatewayError::Database(e)
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::Internal(format!("corrupt stored JSON: {}", e))
    }
}

impl ResponseError for GatewayError {
    fn error_response(&self) -> HttpResponse {
        match self {
            GatewayError::AppNotFound(id) => HttpResponse::NotFound().json(serde_json::json!({
                "error": "app_not_found",
                "message": format!("App '{}' not found", id)
            })),
            GatewayError::InvalidDomain(msg) => {
                HttpResponse::BadRequest().json(serde_json::json!({
                    "error": "invalid_domain",
                    "message": msg
                }))
            }
            GatewayError::InvalidAddress(addr) => {
                HttpResponse::BadRequest().json(serde_json::json!({
                    "error": "invalid_address",
                    "message": format!("'{}' is not a valid vendor address", addr)
                }))
            }
            GatewayError::InvalidRequest(msg) => {
                HttpResponse::BadRequest().json(serde_json::json!({
                    "error": "invalid_request",
                    "message": msg
                }))
            }
            GatewayError::AdminUnauthorized => {
                HttpResponse::Unauthorized().json(serde_json::json!({
                    "error": "unauthorized",
                    "message": "Valid Bearer token required for admin routes"
                }))
            }
            GatewayError::NotAuthenticated => {
                HttpResponse::Unauthorized().json(serde_json::json!({
                    "error": "not_authenticated",
                    "message": "This route requires an authenticated app"
                }))
            }
            GatewayError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "error": "internal_error",
                    "message": "An internal error occurred"
                }))
            }
            GatewayError::Database(e) => {
                tracing::error!("Database error: {}", e);
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "error": "internal_error",
                    "message": "An internal error occurred"
                }))
            }
        }
    }
}
