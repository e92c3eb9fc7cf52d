//! Endpoints called by an external scheduler.
//!
//! They carry no session; the caller proves itself with
//! `Authorization: Bearer <cron_secret>`. While `cron_secret` is not
//! configured every call is rejected.

use rocket::Route;
use rocket::State;
use rocket::http::Status;
use rocket::request::{self, FromRequest, Outcome, Request};
use rocket::serde::json::Json;
use subtle::ConstantTimeEq;

use crate::config::AppConfig;
use crate::email::{Mailer, deliver, plan_alerts, record_outcomes};
use crate::error::ApiResult;
use crate::models::ExpirationSummary;
use crate::orm::report::process_expirations;
use crate::orm::{DbConn, now};

/// Request guard accepting only the configured cron bearer token.
pub struct CronCaller;

fn bearer_token<'a>(request: &'a Request<'_>) -> Option<&'a str> {
    request
        .headers()
        .get_one("Authorization")
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Compares in constant time for tokens of equal length.
fn token_matches(token: &str, secret: &str) -> bool {
    token.as_bytes().ct_eq(secret.as_bytes()).into()
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for CronCaller {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let Some(config) = request.rocket().state::<AppConfig>() else {
            error!("[cron] AppConfig is not managed");
            return Outcome::Error((Status::InternalServerError, ()));
        };
        let Some(secret) = config.cron_secret.as_deref().filter(|s| !s.is_empty()) else {
            warn!("[cron] Rejected {}: no cron_secret configured", request.uri().path());
            return Outcome::Error((Status::Unauthorized, ()));
        };
        if bearer_token(request).is_some_and(|token| token_matches(token, secret)) {
            Outcome::Success(CronCaller)
        } else {
            warn!("[cron] Rejected {}: bad or missing bearer token", request.uri().path());
            Outcome::Error((Status::Unauthorized, ()))
        }
    }
}

/// Report Expirations endpoint.
///
/// - **URL:** `/api/1/cron/report-expirations`
/// - **Method:** `POST`
/// - **Purpose:** Daily expiration batch
/// - **Authentication:** `Authorization: Bearer <cron_secret>`
///
/// Flips every overdue report to EXPIRED, then e-mails each OWNER and ADMIN
/// of the company about reports expiring within `alert_window_days`.
/// A report is alerted at most once per `alert_dedup_days`, and one run
/// sends at most `max_alert_emails` e-mails. Every attempt lands in the
/// e-mail log; failures are not retried.
///
/// # Response
///
/// ```json
/// { "expired": 2, "alerts_sent": 6, "alerts_failed": 0 }
/// ```
#[post("/1/cron/report-expirations")]
pub async fn report_expirations(
    db: DbConn,
    _caller: CronCaller,
    config: &State<AppConfig>,
    mailer: &State<Mailer>,
) -> ApiResult<Json<ExpirationSummary>> {
    let at = now();
    let config = config.inner().clone();
    let max_emails = usize::try_from(config.max_alert_emails).unwrap_or(0);
    let (expired, emails) = db
        .run(move |conn| -> ApiResult<_> {
            let run = process_expirations(conn, at, &config)?;
            let emails = plan_alerts(conn, &run.candidates, at, max_emails)?;
            Ok((run.expired, emails))
        })
        .await?;

    let outcomes = deliver(mailer.0.as_ref(), emails).await;

    let summary = db
        .run(move |conn| record_outcomes(conn, &outcomes, expired, at))
        .await?;
    info!(
        "[cron] Report expirations: {} expired, {} alerts sent, {} failed",
        summary.expired, summary.alerts_sent, summary.alerts_failed
    );
    Ok(Json(summary))
}

pub fn routes() -> Vec<Route> {
    routes![report_expirations]
}
