use actix_web::{web, HttpResponse};

use crate::context::AppInfo;

/// GET /api/v1/whoami - Echo the app the gateway authorized
pub async fn whoami(app: AppInfo) -> HttpResponse {
    HttpResponse::Ok().json(app)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/v1/whoami", web::get().to(whoami));
}
