use diesel::prelude::*;

use crate::models::{
    InspectionSchedule, NewInspectionSchedule, NewScheduleStep, ScheduleChanges, ScheduleInput,
    ScheduleStep, ScheduleWithSteps, StepTemplateInput, normalize_category,
};
use crate::orm::db::{last_insert_id, now};
use crate::recurrence::WeekdaySet;
use crate::schema::{inspection_schedules, schedule_steps};
use crate::tenancy::{ContractScope, apply_scope};

fn insert_steps(
    conn: &mut SqliteConnection,
    schedule_id: i32,
    steps: &[StepTemplateInput],
) -> QueryResult<()> {
    let rows: Vec<NewScheduleStep> = steps
        .iter()
        .enumerate()
        .map(|(i, step)| NewScheduleStep {
            schedule_id,
            step_order: i as i32 + 1,
            title: step.title.trim().to_string(),
            description: step.description.clone(),
            asset_id: step.asset_id,
        })
        .collect();
    if !rows.is_empty() {
        diesel::insert_into(schedule_steps::table)
            .values(&rows)
            .execute(conn)?;
    }
    Ok(())
}

/// Creates a schedule with its step templates. `days` and `start_time`
/// must already be validated.
pub fn insert_schedule(
    conn: &mut SqliteConnection,
    company_id: i32,
    input: &ScheduleInput,
    days: &WeekdaySet,
    start_time: &str,
) -> QueryResult<ScheduleWithSteps> {
    conn.transaction(|conn| {
        let timestamp = now();
        diesel::insert_into(inspection_schedules::table)
            .values(&NewInspectionSchedule {
                company_id,
                contract_id: input.contract_id,
                asset_id: input.asset_id,
                name: input.name.trim().to_string(),
                description: input.description.clone(),
                category: normalize_category(input.category.clone()),
                days_of_week: days.to_string(),
                shift: input.shift,
                start_time: start_time.to_string(),
                active: true,
                created_at: timestamp,
                updated_at: timestamp,
            })
            .execute(conn)?;
        let schedule_id = last_insert_id(conn)?;
        insert_steps(conn, schedule_id, &input.steps)?;
        get_schedule_with_steps(conn, schedule_id)?.ok_or(diesel::result::Error::NotFound)
    })
}

pub fn get_schedule(conn: &mut SqliteConnection, schedule_id: i32) -> QueryResult<Option<InspectionSchedule>> {
    inspection_schedules::table
        .filter(inspection_schedules::id.eq(schedule_id))
        .filter(inspection_schedules::deleted_at.is_null())
        .select(InspectionSchedule::as_select())
        .first(conn)
        .optional()
}

pub fn get_schedule_steps(conn: &mut SqliteConnection, schedule_id: i32) -> QueryResult<Vec<ScheduleStep>> {
    schedule_steps::table
        .filter(schedule_steps::schedule_id.eq(schedule_id))
        .order((schedule_steps::step_order.asc(), schedule_steps::id.asc()))
        .select(ScheduleStep::as_select())
        .load(conn)
}

pub fn get_schedule_with_steps(
    conn: &mut SqliteConnection,
    schedule_id: i32,
) -> QueryResult<Option<ScheduleWithSteps>> {
    let Some(schedule) = get_schedule(conn, schedule_id)? else {
        return Ok(None);
    };
    let steps = get_schedule_steps(conn, schedule_id)?;
    Ok(Some(ScheduleWithSteps { schedule, steps }))
}

/// Live schedules visible through `scope`, by name.
pub fn list_schedules(
    conn: &mut SqliteConnection,
    scope: &ContractScope,
    contract_id: Option<i32>,
    active_only: bool,
) -> QueryResult<Vec<InspectionSchedule>> {
    let mut query = inspection_schedules::table
        .filter(inspection_schedules::deleted_at.is_null())
        .select(InspectionSchedule::as_select())
        .into_boxed();
    query = apply_scope!(
        query,
        scope,
        inspection_schedules::company_id,
        inspection_schedules::contract_id
    );
    if let Some(contract_id) = contract_id {
        query = query.filter(inspection_schedules::contract_id.eq(contract_id));
    }
    if active_only {
        query = query.filter(inspection_schedules::active.eq(true));
    }
    query
        .order((inspection_schedules::name.asc(), inspection_schedules::id.asc()))
        .load(conn)
}

/// Applies changes; when `steps` is given every step template is replaced.
/// Occurrences already materialized keep their own copy of the steps.
pub fn update_schedule(
    conn: &mut SqliteConnection,
    schedule_id: i32,
    mut changes: ScheduleChanges,
    steps: Option<&[StepTemplateInput]>,
) -> QueryResult<ScheduleWithSteps> {
    conn.transaction(|conn| {
        changes.category = normalize_category(changes.category.take());
        changes.updated_at = Some(now());
        diesel::update(inspection_schedules::table.find(schedule_id))
            .set(&changes)
            .execute(conn)?;
        if let Some(steps) = steps {
            diesel::delete(schedule_steps::table.filter(schedule_steps::schedule_id.eq(schedule_id)))
                .execute(conn)?;
            insert_steps(conn, schedule_id, steps)?;
        }
        get_schedule_with_steps(conn, schedule_id)?.ok_or(diesel::result::Error::NotFound)
    })
}

pub fn soft_delete_schedule(conn: &mut SqliteConnection, schedule_id: i32) -> QueryResult<bool> {
    let timestamp = now();
    let rows = diesel::update(
        inspection_schedules::table
            .filter(inspection_schedules::id.eq(schedule_id))
            .filter(inspection_schedules::deleted_at.is_null()),
    )
    .set((
        inspection_schedules::deleted_at.eq(Some(timestamp)),
        inspection_schedules::active.eq(false),
        inspection_schedules::updated_at.eq(timestamp),
    ))
    .execute(conn)?;
    Ok(rows > 0)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::Shift;
    use crate::orm::testing::{insert_test_company, insert_test_contract, setup_test_db};

    pub(crate) fn schedule_input(
        contract_id: i32,
        name: &str,
        days: Vec<u32>,
        shift: Shift,
        start_time: &str,
        category: Option<&str>,
        steps: &[&str],
    ) -> ScheduleInput {
        ScheduleInput {
            contract_id,
            asset_id: None,
            name: name.to_string(),
            description: None,
            category: category.map(str::to_string),
            days_of_week: days,
            shift,
            start_time: start_time.to_string(),
            steps: steps
                .iter()
                .map(|t| StepTemplateInput {
                    title: t.to_string(),
                    description: None,
                    asset_id: None,
                })
                .collect(),
        }
    }

    /// Inserts a schedule from raw test parameters.
    pub(crate) fn insert_test_schedule(
        conn: &mut SqliteConnection,
        company_id: i32,
        input: ScheduleInput,
    ) -> ScheduleWithSteps {
        let days = WeekdaySet::new(&input.days_of_week).expect("valid days");
        let start_time = input.start_time.clone();
        insert_schedule(conn, company_id, &input, &days, &start_time).expect("insert schedule")
    }

    #[test]
    fn test_insert_schedule_stores_normalized_fields() {
        let mut conn = setup_test_db();
        let acme = insert_test_company(&mut conn, "Acme");
        let tower = insert_test_contract(&mut conn, acme.id, "Tower");
        let created = insert_test_schedule(
            &mut conn,
            acme.id,
            schedule_input(tower.id, "Night walk", vec![5, 1, 3], Shift::Night, "22:00", Some("electrical"), &["Panel", "Lights"]),
        );
        assert_eq!(created.schedule.days_of_week, "1,3,5");
        assert_eq!(created.schedule.category.as_deref(), Some("ELECTRICAL"));
        assert!(created.schedule.active);
        let titles: Vec<&str> = created.steps.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Panel", "Lights"]);
    }

    #[test]
    fn test_update_schedule_replaces_steps_only_when_given() {
        let mut conn = setup_test_db();
        let acme = insert_test_company(&mut conn, "Acme");
        let tower = insert_test_contract(&mut conn, acme.id, "Tower");
        let created = insert_test_schedule(
            &mut conn,
            acme.id,
            schedule_input(tower.id, "Walk", vec![1], Shift::Morning, "08:00", None, &["A", "B"]),
        );
        let id = created.schedule.id;

        let renamed = update_schedule(
            &mut conn,
            id,
            ScheduleChanges { name: Some("Walk 2".to_string()), ..Default::default() },
            None,
        )
        .expect("update");
        assert_eq!(renamed.schedule.name, "Walk 2");
        assert_eq!(renamed.steps.len(), 2);

        let new_steps = vec![StepTemplateInput { title: "C".to_string(), description: None, asset_id: None }];
        let replaced = update_schedule(&mut conn, id, ScheduleChanges::default(), Some(&new_steps))
            .expect("replace");
        assert_eq!(replaced.steps.len(), 1);
        assert_eq!(replaced.steps[0].title, "C");
    }

    #[test]
    fn test_list_schedules_hides_deleted_and_inactive() {
        let mut conn = setup_test_db();
        let acme = insert_test_company(&mut conn, "Acme");
        let tower = insert_test_contract(&mut conn, acme.id, "Tower");
        let a = insert_test_schedule(
            &mut conn,
            acme.id,
            schedule_input(tower.id, "A", vec![1], Shift::Morning, "08:00", None, &["x"]),
        );
        let b = insert_test_schedule(
            &mut conn,
            acme.id,
            schedule_input(tower.id, "B", vec![1], Shift::Morning, "08:00", None, &["x"]),
        );
        update_schedule(
            &mut conn,
            b.schedule.id,
            ScheduleChanges { active: Some(false), ..Default::default() },
            None,
        )
        .expect("deactivate");

        let scope = ContractScope::Company(acme.id);
        assert_eq!(list_schedules(&mut conn, &scope, None, false).expect("all").len(), 2);
        assert_eq!(list_schedules(&mut conn, &scope, None, true).expect("active").len(), 1);
        soft_delete_schedule(&mut conn, a.schedule.id).expect("delete");
        assert_eq!(list_schedules(&mut conn, &scope, None, false).expect("all").len(), 1);
    }
}
