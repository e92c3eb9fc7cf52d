//! Outgoing e-mail.
//!
//! Expiration alerts go through an [`EmailSender`]. With an API key the
//! [`HttpEmailSender`] posts to a transactional e-mail API; without one the
//! [`LogEmailSender`] only logs. Every attempt is recorded in `email_queue`
//! and failures are not retried.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use diesel::prelude::*;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;

use crate::config::AppConfig;
use crate::models::{ExpirationSummary, Report, UserRole};
use crate::orm::contract::get_contract;
use crate::orm::email_queue::{OutgoingEmail, record_email};
use crate::orm::report::mark_alerted;
use crate::orm::user::list_users_with_roles;

#[derive(Debug, Clone, Error)]
pub enum EmailError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
}

#[rocket::async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), EmailError>;
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    text: &'a str,
}

pub struct HttpEmailSender {
    http: Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpEmailSender {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(api_url: String, api_key: String, from: String) -> Result<Self, EmailError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("manuflow/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| EmailError::Transport(e.to_string()))?;
        Ok(HttpEmailSender {
            http,
            api_url,
            api_key,
            from,
        })
    }
}

#[rocket::async_trait]
impl EmailSender for HttpEmailSender {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), EmailError> {
        let request = SendRequest {
            from: &self.from,
            to: vec![to],
            subject,
            text: body,
        };
        let res = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| EmailError::Transport(e.to_string()))?;

        let status = res.status();
        if status.is_success() {
            return Ok(());
        }
        let body = res.text().await.unwrap_or_default();
        Err(EmailError::Http {
            status: status.as_u16(),
            body,
        })
    }
}

/// Development sender: logs the message and reports success.
pub struct LogEmailSender;

#[rocket::async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<(), EmailError> {
        info!("[email] (not sent, no API key) to={} subject={}", to, subject);
        Ok(())
    }
}

/// Managed state handing the configured sender to request handlers.
#[derive(Clone)]
pub struct Mailer(pub Arc<dyn EmailSender>);

impl Mailer {
    pub fn from_config(config: &AppConfig) -> Result<Mailer, EmailError> {
        match &config.email_api_key {
            Some(key) if !key.trim().is_empty() => {
                info!("[email] Sending through {}", config.email_api_url);
                let sender = HttpEmailSender::new(
                    config.email_api_url.clone(),
                    key.clone(),
                    config.email_from.clone(),
                )?;
                Ok(Mailer(Arc::new(sender)))
            }
            _ => {
                warn!("[email] No email_api_key configured; e-mails will only be logged");
                Ok(Mailer(Arc::new(LogEmailSender)))
            }
        }
    }
}

fn alert_text(report: &Report, contract_name: &str, at: NaiveDateTime) -> (String, String) {
    let expires = report
        .expiration_date
        .map(|d| d.to_string())
        .unwrap_or_default();
    let expired = report.expiration_date.is_some_and(|d| d < at.date());
    let verb = if expired { "expired on" } else { "expires on" };
    let subject = format!("[ManuFlow] Report \"{}\" {} {}", report.title, verb, expires);
    let body = format!(
        "The report \"{}\" for contract \"{}\" {} {}.\n\nCurrent status: {}.\n",
        report.title, contract_name, verb, expires, report.status
    );
    (subject, body)
}

/// One e-mail per OWNER/ADMIN of the report's company, per candidate, at
/// most `max_emails` in total. Candidates are taken in order and a report
/// is planned for all its recipients or left for the next run. The first
/// report is the exception: it is cut to the cap so a company with more
/// managers than the cap cannot stall every run.
///
/// A report whose company has nobody to alert is stamped as alerted, so it
/// leaves the queue until the dedup window lapses.
pub fn plan_alerts(
    conn: &mut SqliteConnection,
    candidates: &[Report],
    at: NaiveDateTime,
    max_emails: usize,
) -> QueryResult<Vec<OutgoingEmail>> {
    let mut emails = Vec::new();
    for report in candidates {
        let recipients =
            list_users_with_roles(conn, report.company_id, &[UserRole::Owner, UserRole::Admin])?;
        if recipients.is_empty() {
            warn!(
                "[email] Report {} has no owner or admin to alert; skipped",
                report.id
            );
            mark_alerted(conn, report.id, at)?;
            continue;
        }
        let room = max_emails.saturating_sub(emails.len());
        if room == 0 || (recipients.len() > room && !emails.is_empty()) {
            info!(
                "[email] Alert cap of {} reached; report {} waits for the next run",
                max_emails, report.id
            );
            break;
        }
        let contract_name = get_contract(conn, report.contract_id)?
            .map(|c| c.name)
            .unwrap_or_default();
        let (subject, body) = alert_text(report, &contract_name, at);
        emails.extend(recipients.into_iter().take(room).map(|user| OutgoingEmail {
            company_id: Some(report.company_id),
            report_id: Some(report.id),
            recipient: user.email,
            subject: subject.clone(),
            body: body.clone(),
        }));
    }
    Ok(emails)
}

/// Sends every e-mail once, returning each with its error, if any.
pub async fn deliver(
    sender: &dyn EmailSender,
    emails: Vec<OutgoingEmail>,
) -> Vec<(OutgoingEmail, Option<String>)> {
    let mut outcomes = Vec::with_capacity(emails.len());
    for email in emails {
        let error = match sender.send(&email.recipient, &email.subject, &email.body).await {
            Ok(()) => None,
            Err(e) => {
                warn!("[email] Failed to send to {}: {}", email.recipient, e);
                Some(e.to_string())
            }
        };
        outcomes.push((email, error));
    }
    outcomes
}

/// Records every attempt and stamps `last_alert_at` on reports with at
/// least one delivered alert.
pub fn record_outcomes(
    conn: &mut SqliteConnection,
    outcomes: &[(OutgoingEmail, Option<String>)],
    expired: usize,
    at: NaiveDateTime,
) -> QueryResult<ExpirationSummary> {
    let mut summary = ExpirationSummary {
        expired,
        ..Default::default()
    };
    let mut alerted = HashSet::new();
    for (email, error) in outcomes {
        record_email(conn, email, error.clone())?;
        match error {
            None => {
                summary.alerts_sent += 1;
                if let Some(report_id) = email.report_id {
                    alerted.insert(report_id);
                }
            }
            Some(_) => summary.alerts_failed += 1,
        }
    }
    for report_id in alerted {
        mark_alerted(conn, report_id, at)?;
    }
    Ok(summary)
}
