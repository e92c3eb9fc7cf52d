use diesel::prelude::*;

use crate::models::{
    Company, CompanySummary, NewCompany, SubscriptionChanges, SubscriptionPlan,
    SubscriptionStatus, User, UserInput,
};
use crate::orm::db::{last_insert_id, now};
use crate::orm::user::insert_user;
use crate::schema::{companies, contracts, users};

/// Find a live company by name. The column collates NOCASE so the match is
/// case-insensitive.
pub fn get_company_by_name(
    conn: &mut SqliteConnection,
    company_name: &str,
) -> QueryResult<Option<Company>> {
    companies::table
        .filter(companies::name.eq(company_name.trim()))
        .filter(companies::deleted_at.is_null())
        .select(Company::as_select())
        .first(conn)
        .optional()
}

/// Find a live company by id.
pub fn get_company_by_id(
    conn: &mut SqliteConnection,
    company_id: i32,
) -> QueryResult<Option<Company>> {
    companies::table
        .filter(companies::id.eq(company_id))
        .filter(companies::deleted_at.is_null())
        .select(Company::as_select())
        .first(conn)
        .optional()
}

/// Insert a new company on a trial subscription.
pub fn insert_company(
    conn: &mut SqliteConnection,
    company_name: String,
    document: Option<String>,
    plan: SubscriptionPlan,
) -> QueryResult<Company> {
    let timestamp = now();
    let new_company = NewCompany {
        name: company_name.trim().to_string(),
        document,
        subscription_plan: plan,
        subscription_status: SubscriptionStatus::Trial,
        subscription_expires_at: None,
        max_users: None,
        created_at: timestamp,
        updated_at: timestamp,
    };

    diesel::insert_into(companies::table)
        .values(&new_company)
        .execute(conn)?;
    let company_id = last_insert_id(conn)?;

    companies::table
        .find(company_id)
        .select(Company::as_select())
        .first(conn)
}

/// Creates a company together with its first OWNER in one transaction.
pub fn create_company_with_owner(
    conn: &mut SqliteConnection,
    company_name: String,
    document: Option<String>,
    plan: SubscriptionPlan,
    owner: UserInput,
) -> QueryResult<(Company, User)> {
    conn.transaction(|conn| {
        let company = insert_company(conn, company_name, document, plan)?;
        let owner = insert_user(conn, UserInput { company_id: company.id, ..owner })?;
        Ok((company, owner))
    })
}

/// All live companies in ascending order by id.
pub fn get_all_companies(conn: &mut SqliteConnection) -> QueryResult<Vec<Company>> {
    companies::table
        .filter(companies::deleted_at.is_null())
        .order(companies::id.asc())
        .select(Company::as_select())
        .load(conn)
}

/// Live companies with their live user and contract counts.
pub fn list_company_summaries(conn: &mut SqliteConnection) -> QueryResult<Vec<CompanySummary>> {
    let all = get_all_companies(conn)?;
    let mut summaries = Vec::with_capacity(all.len());
    for company in all {
        let user_count = users::table
            .filter(users::company_id.eq(company.id))
            .filter(users::deleted_at.is_null())
            .count()
            .get_result(conn)?;
        let contract_count = contracts::table
            .filter(contracts::company_id.eq(company.id))
            .filter(contracts::deleted_at.is_null())
            .count()
            .get_result(conn)?;
        summaries.push(CompanySummary {
            company,
            user_count,
            contract_count,
        });
    }
    Ok(summaries)
}

/// Applies subscription changes and returns the updated company.
pub fn update_subscription(
    conn: &mut SqliteConnection,
    company_id: i32,
    mut changes: SubscriptionChanges,
) -> QueryResult<Company> {
    changes.updated_at = Some(now());
    diesel::update(companies::table.find(company_id))
        .set(&changes)
        .execute(conn)?;
    companies::table
        .find(company_id)
        .select(Company::as_select())
        .first(conn)
}

/// Soft-deletes a company. Returns false when it does not exist or was
/// already deleted.
pub fn soft_delete_company(conn: &mut SqliteConnection, company_id: i32) -> QueryResult<bool> {
    let timestamp = now();
    let rows = diesel::update(
        companies::table
            .filter(companies::id.eq(company_id))
            .filter(companies::deleted_at.is_null()),
    )
    .set((
        companies::deleted_at.eq(Some(timestamp)),
        companies::updated_at.eq(timestamp),
    ))
    .execute(conn)?;
    Ok(rows > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;
    use crate::orm::testing::{insert_test_contract, insert_test_user, setup_test_db};

    #[test]
    fn test_insert_company_defaults_to_trial() {
        let mut conn = setup_test_db();
        let company = insert_company(&mut conn, "  Acme  ".to_string(), None, SubscriptionPlan::Basic)
            .expect("insert");
        assert_eq!(company.name, "Acme");
        assert_eq!(company.subscription_status, SubscriptionStatus::Trial);
        assert_eq!(company.subscription_plan, SubscriptionPlan::Basic);
    }

    #[test]
    fn test_get_company_by_name_is_case_insensitive() {
        let mut conn = setup_test_db();
        let company = insert_company(&mut conn, "Acme Facilities".to_string(), None, SubscriptionPlan::Free)
            .expect("insert");
        let found = get_company_by_name(&mut conn, "ACME facilities").expect("query");
        assert_eq!(found.map(|c| c.id), Some(company.id));
        assert!(get_company_by_name(&mut conn, "Globex").expect("query").is_none());
    }

    #[test]
    fn test_soft_delete_hides_company() {
        let mut conn = setup_test_db();
        let company = insert_company(&mut conn, "Acme".to_string(), None, SubscriptionPlan::Free)
            .expect("insert");
        assert!(soft_delete_company(&mut conn, company.id).expect("delete"));
        assert!(!soft_delete_company(&mut conn, company.id).expect("delete again"));
        assert!(get_company_by_id(&mut conn, company.id).expect("query").is_none());
        assert!(get_all_companies(&mut conn).expect("list").is_empty());
    }

    #[test]
    fn test_summaries_count_live_rows() {
        let mut conn = setup_test_db();
        let company = insert_company(&mut conn, "Acme".to_string(), None, SubscriptionPlan::Free)
            .expect("insert");
        insert_test_user(&mut conn, company.id, "a@acme.com", UserRole::Owner, None);
        let gone = insert_test_user(&mut conn, company.id, "b@acme.com", UserRole::Admin, None);
        crate::orm::user::soft_delete_user(&mut conn, gone.id).expect("delete user");
        insert_test_contract(&mut conn, company.id, "Tower");

        let summaries = list_company_summaries(&mut conn).expect("summaries");
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].user_count, 1);
        assert_eq!(summaries[0].contract_count, 1);
    }

    #[test]
    fn test_update_subscription() {
        let mut conn = setup_test_db();
        let company = insert_company(&mut conn, "Acme".to_string(), None, SubscriptionPlan::Free)
            .expect("insert");
        let updated = update_subscription(
            &mut conn,
            company.id,
            SubscriptionChanges {
                subscription_plan: Some(SubscriptionPlan::Enterprise),
                subscription_status: Some(SubscriptionStatus::Active),
                max_users: Some(10),
                ..Default::default()
            },
        )
        .expect("update");
        assert_eq!(updated.subscription_plan, SubscriptionPlan::Enterprise);
        assert_eq!(updated.subscription_status, SubscriptionStatus::Active);
        assert_eq!(updated.max_users, Some(10));
    }

    #[test]
    fn test_create_company_with_owner() {
        let mut conn = setup_test_db();
        let (company, owner) = create_company_with_owner(
            &mut conn,
            "Globex".to_string(),
            Some("12.345.678/0001-90".to_string()),
            SubscriptionPlan::Pro,
            UserInput {
                company_id: 0,
                name: "Owner".to_string(),
                email: "owner@globex.com".to_string(),
                password_hash: "hash".to_string(),
                role: UserRole::Owner,
                category: None,
            },
        )
        .expect("create");
        assert_eq!(owner.company_id, company.id);
        assert_eq!(owner.role, UserRole::Owner);
    }
}
