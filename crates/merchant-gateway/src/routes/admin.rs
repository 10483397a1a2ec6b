use actix_web::{
    body::{EitherBody, MessageBody},
    dev::{ServiceRequest, ServiceResponse},
    middleware::{from_fn, Next},
    web, Error, HttpResponse, ResponseError,
};
use serde::Deserialize;

use crate::cors::build_admin_cors;
use crate::error::GatewayError;
use crate::routes::health::bearer_matches;
use crate::state::AppState;
use crate::validation::{validate_domain_list, validate_vendor_address};

#[derive(Debug, Deserialize)]
pub struct CreateAppRequest {
    pub vendor_address: String,
    #[serde(default)]
    pub allowed_domains: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetDomainsRequest {
    pub allowed_domains: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Rejects admin requests without the configured bearer token.
/// With no token configured (insecure dev mode) everything passes.
///
/// Rejections are returned as responses, not errors, so the admin CORS
/// middleware still decorates them.
pub async fn admin_guard<B>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, Error>
where
    B: MessageBody + 'static,
{
    let rejection = match req.app_data::<web::Data<AppState>>() {
        None => Some(GatewayError::Internal("app state not registered".to_string())),
        Some(state) => match state.config.admin_token {
            Some(ref expected) if !bearer_matches(req.request(), expected) => {
                tracing::warn!(path = %req.path(), "admin request without valid token");
                Some(GatewayError::AdminUnauthorized)
            }
            _ => None,
        },
    };

    match rejection {
        Some(e) => Ok(req.into_response(e.error_response()).map_into_right_body()),
        None => next.call(req).await.map(ServiceResponse::map_into_left_body),
    }
}

/// POST /admin/apps - Register a new app. The raw key is only returned here.
pub async fn create_app(
    body: web::Json<CreateAppRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, GatewayError> {
    let body = body.into_inner();
    let vendor_address = validate_vendor_address(&body.vendor_address)?;
    let allowed_domains = validate_domain_list(&body.allowed_domains)?;

    let created = state.db.create_app(&vendor_address, &allowed_domains).await?;

    tracing::info!(
        app_id = %created.app.app_id,
        vendor = %created.app.vendor_address,
        domains = created.app.allowed_domains.len(),
        "app registered"
    );

    Ok(HttpResponse::Created().json(created))
}

/// GET /admin/apps/{app_id}
pub async fn get_app(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, GatewayError> {
    let app_id = path.into_inner();
    let app = state
        .db
        .get_app(&app_id)
        .await?
        .ok_or(GatewayError::AppNotFound(app_id))?;
    Ok(HttpResponse::Ok().json(app))
}

/// PUT /admin/apps/{app_id}/domains - Replace the allow-list
pub async fn set_domains(
    path: web::Path<String>,
    body: web::Json<SetDomainsRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, GatewayError> {
    let app_id = path.into_inner();
    let allowed_domains = validate_domain_list(&body.allowed_domains)?;

    let app = state.db.set_allowed_domains(&app_id, &allowed_domains).await?;

    tracing::info!(
        app_id = %app.app_id,
        domains = app.allowed_domains.len(),
        "allow-list replaced"
    );
    Ok(HttpResponse::Ok().json(app))
}

/// POST /admin/apps/{app_id}/deactivate
pub async fn deactivate(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, GatewayError> {
    let app_id = path.into_inner();
    state.db.deactivate_app(&app_id).await?;

    tracing::info!(app_id = %app_id, "app deactivated");
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "app_id": app_id,
        "active": false,
    })))
}

/// GET /admin/failed-attempts?limit=&offset=
pub async fn list_failed_attempts(
    query: web::Query<Pagination>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, GatewayError> {
    let limit = query.limit.unwrap_or(50);
    let offset = query.offset.unwrap_or(0);

    let attempts = state.db.list_failed_attempts(limit, offset).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "count": attempts.len(),
        "offset": offset,
        "attempts": attempts,
    })))
}

/// Small bodies only; malformed JSON answers in the crate's error shape.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(64 * 1024)
        .error_handler(|err, _req| GatewayError::InvalidRequest(err.to_string()).into())
}

/// Mount the admin scope. CORS wraps the token guard so browser preflights
/// are answered before authentication.
pub fn configure(allowed_origins: Vec<String>) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        cfg.service(
            web::scope("/admin")
                .app_data(json_config())
                .wrap(from_fn(admin_guard))
                .wrap(build_admin_cors(&allowed_origins))
                .route("/apps", web::post().to(create_app))
                .route("/apps/{app_id}", web::get().to(get_app))
                .route("/apps/{app_id}/domains", web::put().to(set_domains))
                .route("/apps/{app_id}/deactivate", web::post().to(deactivate))
                .route("/failed-attempts", web::get().to(list_failed_attempts)),
        );
    }
}
