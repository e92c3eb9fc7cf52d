//! Status endpoint for monitoring and deploy checks.

use diesel::RunQueryDsl;
use diesel::sql_query;
use rocket::{Route, serde::json::Json};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::orm::DbConn;

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct HealthStatus {
    pub status: String,
    pub database: String,
    pub version: String,
    pub built: String,
    pub git_commit: Option<String>,
}

/// Health Status endpoint.
///
/// - **URL:** `/api/1/status`
/// - **Method:** `GET`
/// - **Purpose:** Reports whether the server and its database answer
/// - **Authentication:** None required
///
/// `status` is `"running"` whenever the server responds; `database` is
/// `"ok"` or `"unavailable"`.
///
/// **Success (HTTP 200 OK):**
/// ```json
/// {
///   "status": "running",
///   "database": "ok",
///   "version": "0.3.0",
///   "built": "Thu, 16 Oct 2026 12:00:00 +0000",
///   "git_commit": "cd51275141a2e7d49737aa7dd4e8ff7c9a804d67"
/// }
/// ```
#[get("/1/status")]
pub async fn health_status(db: DbConn) -> Json<HealthStatus> {
    let database = match db.run(|conn| sql_query("SELECT 1").execute(conn)).await {
        Ok(_) => "ok",
        Err(e) => {
            error!("[status] Database check failed: {}", e);
            "unavailable"
        }
    };
    Json(HealthStatus {
        status: "running".to_string(),
        database: database.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        built: built_info::BUILT_TIME_UTC.to_string(),
        git_commit: built_info::GIT_COMMIT_HASH.map(str::to_string),
    })
}

pub fn routes() -> Vec<Route> {
    routes![health_status]
}
