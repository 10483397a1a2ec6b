//! The gateway as an actix middleware.
//!
//! Mounted on the whole app with `from_fn(api_gate::<S, _>)` and a
//! `web::Data<Gate<S>>` registered as app data. Internal routes pass through
//! untouched; external routes are authorized on every request and either
//! continue downstream with [`AppInfo`](crate::context::AppInfo) attached or
//! are answered here.

use std::sync::Arc;

use actix_web::{
    body::{EitherBody, MessageBody},
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
    web, Error, HttpMessage, HttpResponse,
};

use crate::audit::record_in_background;
use crate::classify::{RouteClass, RouteClassifier};
use crate::cors::CorsPolicy;
use crate::gate::{authorize, Credentials, GateRejection, Outcome, RequestPhase};
use crate::metrics::{REJECTIONS_TOTAL, REQUESTS_TOTAL};
use crate::store::{AppStore, FailedAttempt};

/// Everything the gateway needs per request. Holds no per-request state.
pub struct Gate<S> {
    store: Arc<S>,
    classifier: RouteClassifier,
    cors: CorsPolicy,
}

impl<S: AppStore> Gate<S> {
    pub fn new(store: Arc<S>, classifier: RouteClassifier, cors: CorsPolicy) -> Self {
        Self {
            store,
            classifier,
            cors,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}

/// Gateway middleware function.
pub async fn api_gate<S, B>(
    gate: web::Data<Gate<S>>,
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, Error>
where
    S: AppStore,
    B: MessageBody + 'static,
{
    let route_class = gate.classifier.classify(req.path());
    if route_class == RouteClass::Internal {
        REQUESTS_TOTAL
            .with_label_values(&[route_class.as_str(), "passthrough"])
            .inc();
        return next.call(req).await.map(ServiceResponse::map_into_left_body);
    }

    let phase = RequestPhase::of(req.method());
    let credentials = Credentials::from_headers(req.headers());
    let outcome = authorize(gate.store.as_ref(), &credentials).await;

    match outcome {
        Outcome::Authorized(info) => {
            REQUESTS_TOTAL
                .with_label_values(&[route_class.as_str(), "authorized"])
                .inc();
            let origin = info.matched_origin.clone();

            match phase {
                RequestPhase::Preflight => {
                    let mut resp = HttpResponse::Ok().finish();
                    gate.cors.apply_preflight(resp.headers_mut());
                    gate.cors.apply_authorized(resp.headers_mut(), &origin);
                    Ok(req.into_response(resp).map_into_right_body())
                }
                RequestPhase::Actual => {
                    req.extensions_mut().insert(info);
                    let mut res = next.call(req).await?;
                    gate.cors.apply_authorized(res.headers_mut(), &origin);
                    Ok(res.map_into_left_body())
                }
            }
        }
        Outcome::Unauthorized(rejection) => {
            REQUESTS_TOTAL
                .with_label_values(&[route_class.as_str(), "unauthorized"])
                .inc();
            REJECTIONS_TOTAL
                .with_label_values(&[rejection.code()])
                .inc();
            tracing::warn!(
                path = %req.path(),
                method = %req.method(),
                reason = rejection.code(),
                origin = credentials.origin.as_deref().unwrap_or("-"),
                "gateway rejected request"
            );

            if rejection.is_audited() {
                let attempt = FailedAttempt::from_rejection(&credentials, req.path(), &rejection);
                record_in_background(Arc::clone(&gate.store), attempt);
            }

            let resp = match phase {
                RequestPhase::Preflight => preflight_default_response(&gate.cors),
                RequestPhase::Actual => rejection_response(&rejection),
            };
            Ok(req.into_response(resp).map_into_right_body())
        }
        Outcome::InfrastructureFailure(e) => {
            REQUESTS_TOTAL
                .with_label_values(&[route_class.as_str(), "store_unavailable"])
                .inc();
            tracing::error!(
                error = %e,
                path = %req.path(),
                "tenant store lookup failed"
            );

            let resp = match phase {
                RequestPhase::Preflight => preflight_default_response(&gate.cors),
                RequestPhase::Actual => HttpResponse::InternalServerError()
                    .json(serde_json::json!({ "error": "Internal Server Error" })),
            };
            Ok(req.into_response(resp).map_into_right_body())
        }
    }
}

/// 403 body for an actual request.
pub fn rejection_response(rejection: &GateRejection) -> HttpResponse {
    let mut body = serde_json::json!({
        "error": "Unauthorized",
        "message": rejection.summary(),
        "details": rejection.details(),
    });
    if let GateRejection::UnauthorizedOrigin {
        origin,
        allowed_domains,
    } = rejection
    {
        body["origin"] = serde_json::json!(origin);
        body["allowed_domains"] = serde_json::json!(allowed_domains);
    }
    HttpResponse::Forbidden().json(body)
}

/// 200 with tenant-independent headers; used whenever a preflight cannot be
/// authorized.
pub fn preflight_default_response(cors: &CorsPolicy) -> HttpResponse {
    let mut resp = HttpResponse::Ok().finish();
    cors.apply_preflight_defaults(resp.headers_mut());
    resp
}
