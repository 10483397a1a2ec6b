use crate::config::GatewayConfig;
use crate::db::Database;
use std::sync::Arc;

/// Shared state for the internal routes (health, metrics, admin)
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub db: Arc<Database>,
}

impl AppState {
    pub fn new(config: GatewayConfig, db: Arc<Database>) -> Self {
        Self {
            config: Arc::new(config),
            db,
        }
    }
}
