use chrono::{Duration, NaiveDate, NaiveDateTime};
use diesel::prelude::*;

use crate::config::AppConfig;
use crate::models::{NewReport, Report, ReportChanges, ReportColumn, ReportInput, ReportStatus};
use crate::orm::db::{last_insert_id, now};
use crate::schema::{companies, reports};
use crate::tenancy::{ContractScope, apply_scope};

pub fn insert_report(
    conn: &mut SqliteConnection,
    company_id: i32,
    created_by: Option<i32>,
    input: ReportInput,
) -> QueryResult<Report> {
    let timestamp = now();
    diesel::insert_into(reports::table)
        .values(&NewReport {
            company_id,
            contract_id: input.contract_id,
            asset_id: input.asset_id,
            title: input.title.trim().to_string(),
            report_type: input.report_type,
            issuer: input.issuer,
            issue_date: input.issue_date,
            expiration_date: input.expiration_date,
            status: input.status.unwrap_or(ReportStatus::Draft),
            notes: input.notes,
            created_by,
            created_at: timestamp,
            updated_at: timestamp,
        })
        .execute(conn)?;
    let report_id = last_insert_id(conn)?;
    reports::table.find(report_id).select(Report::as_select()).first(conn)
}

pub fn get_report(conn: &mut SqliteConnection, report_id: i32) -> QueryResult<Option<Report>> {
    reports::table
        .filter(reports::id.eq(report_id))
        .filter(reports::deleted_at.is_null())
        .select(Report::as_select())
        .first(conn)
        .optional()
}

#[derive(Debug, Default, Clone)]
pub struct ReportFilter {
    pub contract_id: Option<i32>,
    pub status: Option<ReportStatus>,
    /// Only reports with an expiration date on or before this day.
    pub expires_by: Option<NaiveDate>,
}

/// Live reports visible through `scope`, soonest expiration first; reports
/// without an expiration date come last.
pub fn list_reports(
    conn: &mut SqliteConnection,
    scope: &ContractScope,
    filter: &ReportFilter,
) -> QueryResult<Vec<Report>> {
    let mut query = reports::table
        .filter(reports::deleted_at.is_null())
        .select(Report::as_select())
        .into_boxed();
    query = apply_scope!(query, scope, reports::company_id, reports::contract_id);
    if let Some(contract_id) = filter.contract_id {
        query = query.filter(reports::contract_id.eq(contract_id));
    }
    if let Some(status) = filter.status {
        query = query.filter(reports::status.eq(status));
    }
    if let Some(expires_by) = filter.expires_by {
        query = query
            .filter(reports::expiration_date.is_not_null())
            .filter(reports::expiration_date.le(expires_by));
    }
    query
        .order((
            reports::expiration_date.is_null().asc(),
            reports::expiration_date.asc(),
            reports::id.asc(),
        ))
        .load(conn)
}

/// Every status as a column, in kanban order, including empty ones.
pub fn report_kanban(conn: &mut SqliteConnection, scope: &ContractScope) -> QueryResult<Vec<ReportColumn>> {
    let mut all = list_reports(conn, scope, &ReportFilter::default())?;
    Ok(ReportStatus::ALL
        .iter()
        .map(|status| {
            let (column, rest): (Vec<Report>, Vec<Report>) =
                all.drain(..).partition(|r| r.status == *status);
            all = rest;
            ReportColumn {
                status: *status,
                reports: column,
            }
        })
        .collect())
}

pub fn update_report(
    conn: &mut SqliteConnection,
    report_id: i32,
    mut changes: ReportChanges,
) -> QueryResult<Report> {
    changes.title = changes.title.map(|t| t.trim().to_string());
    changes.updated_at = Some(now());
    diesel::update(reports::table.find(report_id))
        .set(&changes)
        .execute(conn)?;
    reports::table.find(report_id).select(Report::as_select()).first(conn)
}

/// Kanban move. Every status may follow every other.
pub fn set_report_status(
    conn: &mut SqliteConnection,
    report_id: i32,
    status: ReportStatus,
) -> QueryResult<Report> {
    update_report(
        conn,
        report_id,
        ReportChanges {
            status: Some(status),
            ..Default::default()
        },
    )
}

pub fn set_report_file(conn: &mut SqliteConnection, report_id: i32, file_url: String) -> QueryResult<Report> {
    update_report(
        conn,
        report_id,
        ReportChanges {
            file_url: Some(file_url),
            ..Default::default()
        },
    )
}

pub fn soft_delete_report(conn: &mut SqliteConnection, report_id: i32) -> QueryResult<bool> {
    let timestamp = now();
    let rows = diesel::update(
        reports::table
            .filter(reports::id.eq(report_id))
            .filter(reports::deleted_at.is_null()),
    )
    .set((reports::deleted_at.eq(Some(timestamp)), reports::updated_at.eq(timestamp)))
    .execute(conn)?;
    Ok(rows > 0)
}

/// Flips every live report that expired before `today` to EXPIRED, leaving
/// EXPIRED and RENEWED ones alone. Returns the number flipped.
pub fn expire_reports(conn: &mut SqliteConnection, today: NaiveDate) -> QueryResult<usize> {
    diesel::update(
        reports::table
            .filter(reports::deleted_at.is_null())
            .filter(reports::expiration_date.lt(today))
            .filter(reports::status.ne_all(vec![ReportStatus::Expired, ReportStatus::Renewed])),
    )
    .set((
        reports::status.eq(ReportStatus::Expired),
        reports::updated_at.eq(now()),
    ))
    .execute(conn)
}

/// Reports that deserve an expiration alert at `at`: expiring within the
/// alert window (already expired ones included), not renewed, not alerted
/// within the dedup window, in live companies. Soonest expiration first.
pub fn alert_candidates(
    conn: &mut SqliteConnection,
    at: NaiveDateTime,
    config: &AppConfig,
) -> QueryResult<Vec<Report>> {
    let horizon = at.date() + Duration::days(config.alert_window_days);
    let dedup_cutoff = at - Duration::days(config.alert_dedup_days);
    let live_companies = companies::table
        .filter(companies::deleted_at.is_null())
        .select(companies::id);

    reports::table
        .filter(reports::deleted_at.is_null())
        .filter(reports::expiration_date.is_not_null())
        .filter(reports::expiration_date.le(horizon))
        .filter(reports::status.ne(ReportStatus::Renewed))
        .filter(
            reports::last_alert_at
                .is_null()
                .or(reports::last_alert_at.lt(dedup_cutoff)),
        )
        .filter(reports::company_id.eq_any(live_companies))
        .order((reports::expiration_date.asc(), reports::id.asc()))
        .select(Report::as_select())
        .load(conn)
}

#[derive(Debug)]
pub struct ExpirationRun {
    pub expired: usize,
    pub candidates: Vec<Report>,
}

/// The expiration batch: flip what expired, then collect alert candidates.
pub fn process_expirations(
    conn: &mut SqliteConnection,
    at: NaiveDateTime,
    config: &AppConfig,
) -> QueryResult<ExpirationRun> {
    let expired = expire_reports(conn, at.date())?;
    let candidates = alert_candidates(conn, at, config)?;
    info!(
        "[reports] Expiration run: {} expired, {} alert candidates",
        expired,
        candidates.len()
    );
    Ok(ExpirationRun { expired, candidates })
}

pub fn mark_alerted(conn: &mut SqliteConnection, report_id: i32, at: NaiveDateTime) -> QueryResult<()> {
    diesel::update(reports::table.find(report_id))
        .set(reports::last_alert_at.eq(Some(at)))
        .execute(conn)?;
    Ok(())
}
