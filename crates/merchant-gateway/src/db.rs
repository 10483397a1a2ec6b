use rusqlite::{params, Connection, OptionalExtension, Row};
use std::future::Future;
use std::sync::{Arc, Mutex};

use crate::error::GatewayError;
use crate::store::{hash_api_key, AppRecord, AppStore, FailedAttempt};

/// Stored failed attempt, as listed by the admin API
#[derive(Debug, Clone, serde::Serialize)]
pub struct FailedAttemptRow {
    pub id: i64,
    #[serde(flatten)]
    pub attempt: FailedAttempt,
}

/// Newly registered app plus the raw key, which is never stored.
#[derive(Debug, Clone, serde::Serialize)]
pub struct NewApp {
    #[serde(flatten)]
    pub app: AppRecord,
    pub api_key: String,
}

/// SQLite database wrapper
///
/// Every query runs on Tokio's blocking pool so callers on the actix workers
/// only ever await.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

const APP_COLUMNS: &str = "app_id, vendor_address, allowed_domains, active";

fn app_from_row(row: &Row<'_>) -> rusqlite::Result<(String, String, String, bool)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get::<_, i32>(3)? == 1,
    ))
}

fn into_record(raw: (String, String, String, bool)) -> Result<AppRecord, GatewayError> {
    let (app_id, vendor_address, domains_json, active) = raw;
    Ok(AppRecord {
        app_id,
        vendor_address,
        allowed_domains: serde_json::from_str(&domains_json)?,
        active,
    })
}

impl Database {
    pub fn new(path: &str) -> Result<Self, GatewayError> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<(), GatewayError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| GatewayError::Internal("database lock poisoned".to_string()))?;

        // Enable WAL mode for better concurrent read/write performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS apps (
                app_id TEXT PRIMARY KEY,
                vendor_address TEXT NOT NULL,
                api_key_hash TEXT UNIQUE NOT NULL,
                allowed_domains TEXT NOT NULL DEFAULT '[]',
                active INTEGER NOT NULL DEFAULT 1,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_apps_vendor ON apps(vendor_address)",
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS failed_attempts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                api_key_attempt TEXT,
                origin_attempt TEXT,
                path TEXT NOT NULL,
                reason TEXT NOT NULL,
                timestamp INTEGER NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_failed_attempts_ts ON failed_attempts(timestamp)",
            [],
        )?;

        Ok(())
    }

    /// Run `f` against the connection on the blocking pool.
    async fn run_blocking<F, T>(&self, f: F) -> Result<T, GatewayError>
    where
        F: FnOnce(&Connection) -> Result<T, GatewayError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| GatewayError::Internal("database lock poisoned".to_string()))?;
            f(&conn)
        })
        .await
        .map_err(|e| GatewayError::Internal(format!("database task failed: {e}")))?
    }

    /// Register a new app. The raw API key is returned once and only its
    /// digest is stored.
    pub async fn create_app(
        &self,
        vendor_address: &str,
        allowed_domains: &[String],
    ) -> Result<NewApp, GatewayError> {
        let app = AppRecord {
            app_id: uuid::Uuid::new_v4().to_string(),
            vendor_address: vendor_address.to_string(),
            allowed_domains: allowed_domains.to_vec(),
            active: true,
        };
        let api_key = generate_api_key();
        let key_hash = hash_api_key(&api_key);
        let domains_json = serde_json::to_string(&app.allowed_domains)?;
        let row = app.clone();

        self.run_blocking(move |conn| {
            let now = chrono::Utc::now().timestamp();
            conn.execute(
                r#"
                INSERT INTO apps
                    (app_id, vendor_address, api_key_hash, allowed_domains,
                     active, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6)
                "#,
                params![row.app_id, row.vendor_address, key_hash, domains_json, now, now],
            )?;
            Ok(())
        })
        .await?;

        Ok(NewApp { app, api_key })
    }

    /// Insert an app with a caller-chosen key. Used by seeding and tests.
    pub async fn insert_app_with_key(
        &self,
        app: &AppRecord,
        api_key: &str,
    ) -> Result<(), GatewayError> {
        let key_hash = hash_api_key(api_key);
        let domains_json = serde_json::to_string(&app.allowed_domains)?;
        let row = app.clone();

        self.run_blocking(move |conn| {
            let now = chrono::Utc::now().timestamp();
            conn.execute(
                r#"
                INSERT INTO apps
                    (app_id, vendor_address, api_key_hash, allowed_domains,
                     active, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    row.app_id,
                    row.vendor_address,
                    key_hash,
                    domains_json,
                    row.active as i32,
                    now,
                    now
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Get app by id, active or not
    pub async fn get_app(&self, app_id: &str) -> Result<Option<AppRecord>, GatewayError> {
        let app_id = app_id.to_string();
        self.run_blocking(move |conn| {
            let raw = conn
                .query_row(
                    &format!("SELECT {APP_COLUMNS} FROM apps WHERE app_id = ?1"),
                    params![app_id],
                    app_from_row,
                )
                .optional()?;
            raw.map(into_record).transpose()
        })
        .await
    }

    /// Replace an app's allow-list
    pub async fn set_allowed_domains(
        &self,
        app_id: &str,
        allowed_domains: &[String],
    ) -> Result<AppRecord, GatewayError> {
        let app_id = app_id.to_string();
        let domains_json = serde_json::to_string(allowed_domains)?;

        self.run_blocking(move |conn| {
            let now = chrono::Utc::now().timestamp();
            let rows_affected = conn.execute(
                "UPDATE apps SET allowed_domains = ?1, updated_at = ?2 WHERE app_id = ?3",
                params![domains_json, now, app_id],
            )?;
            if rows_affected == 0 {
                return Err(GatewayError::AppNotFound(app_id));
            }

            // Re-read with the already-held connection
            let raw = conn.query_row(
                &format!("SELECT {APP_COLUMNS} FROM apps WHERE app_id = ?1"),
                params![app_id],
                app_from_row,
            )?;
            into_record(raw)
        })
        .await
    }

    /// Deactivate an app. Takes effect on the next gated request.
    pub async fn deactivate_app(&self, app_id: &str) -> Result<(), GatewayError> {
        let app_id = app_id.to_string();
        self.run_blocking(move |conn| {
            let now = chrono::Utc::now().timestamp();
            let rows_affected = conn.execute(
                "UPDATE apps SET active = 0, updated_at = ?1 WHERE app_id = ?2",
                params![now, app_id],
            )?;
            if rows_affected == 0 {
                return Err(GatewayError::AppNotFound(app_id));
            }
            Ok(())
        })
        .await
    }

    /// List failed attempts, newest first.
    /// `limit` is clamped to 1..=500.
    pub async fn list_failed_attempts(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<FailedAttemptRow>, GatewayError> {
        let limit = limit.clamp(1, 500);
        self.run_blocking(move |conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT id, api_key_attempt, origin_attempt, path, reason, timestamp
                FROM failed_attempts
                ORDER BY timestamp DESC, id DESC
                LIMIT ?1 OFFSET ?2
                "#,
            )?;

            let rows = stmt
                .query_map(params![limit, offset], |row| {
                    Ok(FailedAttemptRow {
                        id: row.get(0)?,
                        attempt: FailedAttempt {
                            api_key_attempt: row.get(1)?,
                            origin_attempt: row.get(2)?,
                            path: row.get(3)?,
                            reason: row.get(4)?,
                            timestamp: row.get(5)?,
                        },
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(rows)
        })
        .await
    }

    /// Delete failed attempts older than `max_age_secs`. Returns rows removed.
    pub async fn purge_failed_attempts(&self, max_age_secs: i64) -> Result<usize, GatewayError> {
        self.run_blocking(move |conn| {
            let cutoff = chrono::Utc::now().timestamp() - max_age_secs;
            let purged = conn.execute(
                "DELETE FROM failed_attempts WHERE timestamp < ?1",
                params![cutoff],
            )?;
            Ok(purged)
        })
        .await
    }

    /// Cheap liveness probe used by /health
    pub async fn ping(&self) -> Result<(), GatewayError> {
        self.run_blocking(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
        .await
    }
}

impl AppStore for Database {
    fn find_app_by_api_key(
        &self,
        api_key: &str,
    ) -> impl Future<Output = Result<Option<AppRecord>, GatewayError>> + Send {
        let key_hash = hash_api_key(api_key);
        async move {
            self.run_blocking(move |conn| {
                let raw = conn
                    .query_row(
                        &format!("SELECT {APP_COLUMNS} FROM apps WHERE api_key_hash = ?1"),
                        params![key_hash],
                        app_from_row,
                    )
                    .optional()?;
                raw.map(into_record).transpose()
            })
            .await
        }
    }

    fn record_failed_attempt(
        &self,
        attempt: FailedAttempt,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send {
        async move {
            self.run_blocking(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO failed_attempts
                        (api_key_attempt, origin_attempt, path, reason, timestamp)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    "#,
                    params![
                        attempt.api_key_attempt,
                        attempt.origin_attempt,
                        attempt.path,
                        attempt.reason,
                        attempt.timestamp
                    ],
                )?;
                Ok(())
            })
            .await
        }
    }
}

/// Opaque API key: `sk_` followed by 64 hex characters from two v4 UUIDs.
fn generate_api_key() -> String {
    format!(
        "sk_{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}
