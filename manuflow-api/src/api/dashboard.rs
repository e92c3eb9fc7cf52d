use chrono::Utc;
use rocket::Route;
use rocket::State;
use rocket::serde::json::Json;

use crate::config::AppConfig;
use crate::error::ApiResult;
use crate::models::DashboardSummary;
use crate::orm::DbConn;
use crate::orm::dashboard::dashboard_summary;
use crate::session_guards::AuthenticatedUser;
use crate::tenancy::ContractScope;

/// Dashboard endpoint.
///
/// - **URL:** `/api/1/dashboard`
/// - **Method:** `GET`
/// - **Purpose:** Headline counts over the contracts visible to the caller
/// - **Authentication:** Required
///
/// `reports_expiring` uses the same window as the expiration alerts.
/// Today's rondas are counted as they stand; nothing is generated here.
#[get("/1/dashboard")]
pub async fn dashboard(
    db: DbConn,
    auth_user: AuthenticatedUser,
    config: &State<AppConfig>,
) -> ApiResult<Json<DashboardSummary>> {
    let window = config.alert_window_days;
    let today = Utc::now().date_naive();
    db.run(move |conn| {
        let scope = ContractScope::for_user(conn, &auth_user.user)?;
        Ok(Json(dashboard_summary(conn, &scope, today, window)?))
    })
    .await
}

pub fn routes() -> Vec<Route> {
    routes![dashboard]
}
