pub mod audit;
pub mod classify;
pub mod config;
pub mod context;
pub mod cors;
pub mod db;
pub mod error;
pub mod gate;
pub mod metrics;
pub mod middleware;
pub mod origin;
pub mod routes;
pub mod state;
pub mod store;
pub mod validation;

pub use config::GatewayConfig;
pub use context::AppInfo;
pub use db::Database;
pub use error::GatewayError;
pub use middleware::{api_gate, Gate};
pub use state::AppState;
pub use store::{AppRecord, AppStore, FailedAttempt};
