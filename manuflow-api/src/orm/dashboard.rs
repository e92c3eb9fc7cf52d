use chrono::{Duration, NaiveDate};
use diesel::dsl::count_star;
use diesel::prelude::*;

use crate::models::{
    DashboardSummary, RelevantItemStatus, ReportStatus, RondaCounts, WorkStatus,
};
use crate::schema::{
    assets, contracts, measurement_devices, relevant_items, reports, scheduled_inspections,
};
use crate::tenancy::{ContractScope, apply_scope};

/// Counts for the home screen. Today's rounds are only counted, not
/// materialized.
pub fn dashboard_summary(
    conn: &mut SqliteConnection,
    scope: &ContractScope,
    today: NaiveDate,
    alert_window_days: i64,
) -> QueryResult<DashboardSummary> {
    let contracts = apply_scope!(
        contracts::table
            .filter(contracts::deleted_at.is_null())
            .select(count_star())
            .into_boxed(),
        scope,
        contracts::company_id,
        contracts::id
    )
    .get_result::<i64>(conn)?;

    let assets = apply_scope!(
        assets::table
            .filter(assets::deleted_at.is_null())
            .select(count_star())
            .into_boxed(),
        scope,
        assets::company_id,
        assets::contract_id
    )
    .get_result::<i64>(conn)?;

    let horizon = today + Duration::days(alert_window_days);
    let reports_expiring = apply_scope!(
        reports::table
            .filter(reports::deleted_at.is_null())
            .filter(reports::expiration_date.ge(today))
            .filter(reports::expiration_date.le(horizon))
            .filter(reports::status.ne_all(vec![ReportStatus::Expired, ReportStatus::Renewed]))
            .select(count_star())
            .into_boxed(),
        scope,
        reports::company_id,
        reports::contract_id
    )
    .get_result::<i64>(conn)?;

    let reports_expired = apply_scope!(
        reports::table
            .filter(reports::deleted_at.is_null())
            .filter(
                reports::status.eq(ReportStatus::Expired).or(reports::expiration_date
                    .lt(today)
                    .and(reports::status.ne(ReportStatus::Renewed))),
            )
            .select(count_star())
            .into_boxed(),
        scope,
        reports::company_id,
        reports::contract_id
    )
    .get_result::<i64>(conn)?;

    let statuses: Vec<WorkStatus> = apply_scope!(
        scheduled_inspections::table
            .filter(scheduled_inspections::scheduled_date.eq(today))
            .select(scheduled_inspections::status)
            .into_boxed(),
        scope,
        scheduled_inspections::company_id,
        scheduled_inspections::contract_id
    )
    .load(conn)?;
    let mut rondas_today = RondaCounts::default();
    for status in statuses {
        match status {
            WorkStatus::Pending => rondas_today.pending += 1,
            WorkStatus::InProgress => rondas_today.in_progress += 1,
            WorkStatus::Completed => rondas_today.completed += 1,
        }
    }

    let open_relevant_items = apply_scope!(
        relevant_items::table
            .filter(relevant_items::deleted_at.is_null())
            .filter(relevant_items::status.ne_all(vec![
                RelevantItemStatus::Done,
                RelevantItemStatus::Rejected,
            ]))
            .select(count_star())
            .into_boxed(),
        scope,
        relevant_items::company_id,
        relevant_items::contract_id
    )
    .get_result::<i64>(conn)?;

    let devices = apply_scope!(
        measurement_devices::table
            .filter(measurement_devices::deleted_at.is_null())
            .select(count_star())
            .into_boxed(),
        scope,
        measurement_devices::company_id,
        measurement_devices::contract_id
    )
    .get_result::<i64>(conn)?;

    Ok(DashboardSummary {
        contracts,
        assets,
        reports_expiring,
        reports_expired,
        rondas_today,
        open_relevant_items,
        devices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ReportInput, UserRole};
    use crate::orm::report::insert_report;
    use crate::orm::testing::{
        insert_test_company, insert_test_contract, insert_test_user, setup_test_db,
    };
    use crate::orm::user::set_user_contracts;

    fn report(contract_id: i32, expires: NaiveDate, status: ReportStatus) -> ReportInput {
        ReportInput {
            contract_id,
            asset_id: None,
            title: "Laudo".to_string(),
            report_type: None,
            issuer: None,
            issue_date: None,
            expiration_date: Some(expires),
            status: Some(status),
            notes: None,
        }
    }

    #[test]
    fn test_summary_counts_respect_scope() {
        let mut conn = setup_test_db();
        let acme = insert_test_company(&mut conn, "Acme");
        let tower = insert_test_contract(&mut conn, acme.id, "Tower");
        let mall = insert_test_contract(&mut conn, acme.id, "Mall");
        let tech = insert_test_user(&mut conn, acme.id, "t@acme.com", UserRole::Technician, None);
        set_user_contracts(&mut conn, tech.id, &[tower.id]).expect("assign");

        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        insert_report(&mut conn, acme.id, None, report(tower.id, today + Duration::days(10), ReportStatus::Approved))
            .expect("insert");
        insert_report(&mut conn, acme.id, None, report(mall.id, today - Duration::days(1), ReportStatus::Approved))
            .expect("insert");
        insert_report(&mut conn, acme.id, None, report(tower.id, today - Duration::days(1), ReportStatus::Renewed))
            .expect("insert");

        let company = dashboard_summary(&mut conn, &ContractScope::Company(acme.id), today, 30)
            .expect("summary");
        assert_eq!(company.contracts, 2);
        assert_eq!(company.reports_expiring, 1);
        assert_eq!(company.reports_expired, 1);

        let scope = ContractScope::for_user(&mut conn, &tech).expect("scope");
        let own = dashboard_summary(&mut conn, &scope, today, 30).expect("summary");
        assert_eq!(own.contracts, 1);
        assert_eq!(own.reports_expiring, 1);
        assert_eq!(own.reports_expired, 0);
        assert_eq!(own.rondas_today, RondaCounts::default());
    }
}
