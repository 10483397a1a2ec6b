//! CORS header synthesis for gated routes, plus the static policy used on the
//! internal admin scope.

use actix_cors::Cors;
use actix_web::http::header::{
    HeaderMap, HeaderValue, ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
    ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, VARY,
};

pub const DEFAULT_ALLOWED_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"];
pub const DEFAULT_ALLOWED_HEADERS: &[&str] = &["Content-Type", "Authorization", "X-API-Key"];
pub const DEFAULT_MAX_AGE_SECS: u32 = 600;

/// Fixed, tenant-independent parts of the gateway's CORS responses.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub max_age_secs: u32,
    /// `Access-Control-Allow-Origin` sent on a failed preflight. Never an
    /// echo of the request origin. `None` omits the header.
    pub preflight_origin: Option<String>,
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self {
            allowed_methods: DEFAULT_ALLOWED_METHODS.iter().map(|m| m.to_string()).collect(),
            allowed_headers: DEFAULT_ALLOWED_HEADERS.iter().map(|h| h.to_string()).collect(),
            max_age_secs: DEFAULT_MAX_AGE_SECS,
            preflight_origin: Some("*".to_string()),
        }
    }
}

impl CorsPolicy {
    /// Headers for a request whose origin was verified. `origin` is echoed
    /// verbatim and credentials are allowed.
    pub fn apply_authorized(&self, headers: &mut HeaderMap, origin: &str) {
        if let Ok(value) = HeaderValue::from_str(origin) {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
            headers.insert(
                ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
            headers.append(VARY, HeaderValue::from_static("Origin"));
        }
    }

    /// Method, header and max-age fields shared by every preflight reply.
    pub fn apply_preflight(&self, headers: &mut HeaderMap) {
        if let Ok(value) = HeaderValue::from_str(&self.allowed_methods.join(", ")) {
            headers.insert(ACCESS_CONTROL_ALLOW_METHODS, value);
        }
        if let Ok(value) = HeaderValue::from_str(&self.allowed_headers.join(", ")) {
            headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, value);
        }
        headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from(self.max_age_secs));
    }

    /// Conservative defaults for a preflight that failed authorization.
    pub fn apply_preflight_defaults(&self, headers: &mut HeaderMap) {
        self.apply_preflight(headers);
        if let Some(value) = self
            .preflight_origin
            .as_deref()
            .and_then(|o| HeaderValue::from_str(o).ok())
        {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
        }
    }
}

/// Static CORS for the admin scope. Exact origins only.
pub fn build_admin_cors(allowed_origins: &[String]) -> Cors {
    let allowed = allowed_origins.to_vec();
    Cors::default()
        .allowed_origin_fn(move |origin, _req_head| {
            let origin_str = origin.to_str().unwrap_or("");
            allowed.iter().any(|a| a == origin_str)
        })
        .allowed_methods(vec!["GET", "POST", "PUT", "OPTIONS"])
        .allowed_headers(vec![
            actix_web::http::header::AUTHORIZATION,
            actix_web::http::header::ACCEPT,
            actix_web::http::header::CONTENT_TYPE,
        ])
        .max_age(3600)
}
