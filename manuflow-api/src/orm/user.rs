use diesel::prelude::*;

use crate::models::{NewUser, User, UserChanges, UserContract, UserInput, UserRole, normalize_category};
use crate::orm::db::{last_insert_id, now};
use crate::orm::login::revoke_user_sessions;
use crate::schema::{user_contracts, users};

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Insert a new active user. The e-mail is lower-cased and the category
/// upper-cased before storage.
pub fn insert_user(conn: &mut SqliteConnection, input: UserInput) -> QueryResult<User> {
    let timestamp = now();
    let new_user = NewUser {
        company_id: input.company_id,
        name: input.name.trim().to_string(),
        email: normalize_email(&input.email),
        password_hash: input.password_hash,
        role: input.role,
        category: normalize_category(input.category),
        active: true,
        created_at: timestamp,
        updated_at: timestamp,
    };

    diesel::insert_into(users::table)
        .values(&new_user)
        .execute(conn)?;
    let user_id = last_insert_id(conn)?;

    users::table
        .find(user_id)
        .select(User::as_select())
        .first(conn)
}

/// Live (not soft-deleted) user by id.
pub fn get_user(conn: &mut SqliteConnection, user_id: i32) -> QueryResult<Option<User>> {
    users::table
        .filter(users::id.eq(user_id))
        .filter(users::deleted_at.is_null())
        .select(User::as_select())
        .first(conn)
        .optional()
}

/// Live user by e-mail, compared case-insensitively.
pub fn get_user_by_email(conn: &mut SqliteConnection, email: &str) -> QueryResult<Option<User>> {
    users::table
        .filter(users::email.eq(normalize_email(email)))
        .filter(users::deleted_at.is_null())
        .select(User::as_select())
        .first(conn)
        .optional()
}

/// Any user row holding the e-mail, soft-deleted ones included. E-mail
/// uniqueness is enforced across deleted rows too.
pub fn email_taken(conn: &mut SqliteConnection, email: &str) -> QueryResult<bool> {
    let count: i64 = users::table
        .filter(users::email.eq(normalize_email(email)))
        .count()
        .get_result(conn)?;
    Ok(count > 0)
}

/// Live users, optionally restricted to one company, ordered by name.
pub fn list_users(conn: &mut SqliteConnection, company_id: Option<i32>) -> QueryResult<Vec<User>> {
    let mut query = users::table
        .filter(users::deleted_at.is_null())
        .select(User::as_select())
        .into_boxed();
    if let Some(company_id) = company_id {
        query = query.filter(users::company_id.eq(company_id));
    }
    query.order((users::name.asc(), users::id.asc())).load(conn)
}

/// Live users of a company holding one of `roles`.
pub fn list_users_with_roles(
    conn: &mut SqliteConnection,
    company_id: i32,
    roles: &[UserRole],
) -> QueryResult<Vec<User>> {
    users::table
        .filter(users::company_id.eq(company_id))
        .filter(users::deleted_at.is_null())
        .filter(users::active.eq(true))
        .filter(users::role.eq_any(roles.to_vec()))
        .order(users::id.asc())
        .select(User::as_select())
        .load(conn)
}

/// Number of live users in a company, used to enforce `max_users`.
pub fn count_company_users(conn: &mut SqliteConnection, company_id: i32) -> QueryResult<i64> {
    users::table
        .filter(users::company_id.eq(company_id))
        .filter(users::deleted_at.is_null())
        .count()
        .get_result(conn)
}

pub fn update_user(
    conn: &mut SqliteConnection,
    user_id: i32,
    mut changes: UserChanges,
) -> QueryResult<User> {
    changes.email = changes.email.map(|e| normalize_email(&e));
    changes.category = normalize_category(changes.category);
    changes.updated_at = Some(now());
    diesel::update(users::table.find(user_id))
        .set(&changes)
        .execute(conn)?;
    users::table
        .find(user_id)
        .select(User::as_select())
        .first(conn)
}

/// Soft-deletes a user, drops their contract assignments and revokes their
/// sessions. Returns false when the user does not exist or is already gone.
pub fn soft_delete_user(conn: &mut SqliteConnection, user_id: i32) -> QueryResult<bool> {
    conn.transaction(|conn| {
        let timestamp = now();
        let rows = diesel::update(
            users::table
                .filter(users::id.eq(user_id))
                .filter(users::deleted_at.is_null()),
        )
        .set((
            users::deleted_at.eq(Some(timestamp)),
            users::active.eq(false),
            users::updated_at.eq(timestamp),
        ))
        .execute(conn)?;
        if rows == 0 {
            return Ok(false);
        }
        diesel::delete(user_contracts::table.filter(user_contracts::user_id.eq(user_id)))
            .execute(conn)?;
        revoke_user_sessions(conn, user_id)?;
        Ok(true)
    })
}

/// Contract ids a user is assigned to.
pub fn get_user_contract_ids(conn: &mut SqliteConnection, user_id: i32) -> QueryResult<Vec<i32>> {
    user_contracts::table
        .filter(user_contracts::user_id.eq(user_id))
        .select(user_contracts::contract_id)
        .order(user_contracts::contract_id.asc())
        .load(conn)
}

/// Replaces every contract assignment of a user.
pub fn set_user_contracts(
    conn: &mut SqliteConnection,
    user_id: i32,
    contract_ids: &[i32],
) -> QueryResult<()> {
    let mut ids = contract_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    conn.transaction(|conn| {
        diesel::delete(user_contracts::table.filter(user_contracts::user_id.eq(user_id)))
            .execute(conn)?;
        let rows: Vec<UserContract> = ids
            .into_iter()
            .map(|contract_id| UserContract { user_id, contract_id })
            .collect();
        if !rows.is_empty() {
            diesel::insert_into(user_contracts::table)
                .values(&rows)
                .execute(conn)?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::testing::{
        insert_test_company, insert_test_contract, insert_test_user, setup_test_db,
    };

    #[test]
    fn test_insert_user_normalizes_fields() {
        let mut conn = setup_test_db();
        let company = insert_test_company(&mut conn, "Acme");
        let user = insert_test_user(&mut conn, company.id, " Tech@Acme.COM ", UserRole::Technician, Some(" hvac "));
        assert_eq!(user.email, "tech@acme.com");
        assert_eq!(user.category.as_deref(), Some("HVAC"));
        assert!(user.active);
        let found = get_user_by_email(&mut conn, "TECH@acme.com").expect("query");
        assert_eq!(found.map(|u| u.id), Some(user.id));
    }

    #[test]
    fn test_soft_delete_user_clears_assignments() {
        let mut conn = setup_test_db();
        let company = insert_test_company(&mut conn, "Acme");
        let contract = insert_test_contract(&mut conn, company.id, "Tower");
        let user = insert_test_user(&mut conn, company.id, "t@acme.com", UserRole::Technician, None);
        set_user_contracts(&mut conn, user.id, &[contract.id]).expect("assign");

        assert!(soft_delete_user(&mut conn, user.id).expect("delete"));
        assert!(get_user(&mut conn, user.id).expect("query").is_none());
        assert!(get_user_contract_ids(&mut conn, user.id).expect("ids").is_empty());
        assert!(email_taken(&mut conn, "t@acme.com").expect("taken"));
        assert_eq!(count_company_users(&mut conn, company.id).expect("count"), 0);
        assert!(!soft_delete_user(&mut conn, user.id).expect("delete again"));
    }

    #[test]
    fn test_set_user_contracts_replaces_and_dedups() {
        let mut conn = setup_test_db();
        let company = insert_test_company(&mut conn, "Acme");
        let a = insert_test_contract(&mut conn, company.id, "A");
        let b = insert_test_contract(&mut conn, company.id, "B");
        let user = insert_test_user(&mut conn, company.id, "s@acme.com", UserRole::Supervisor, None);

        set_user_contracts(&mut conn, user.id, &[a.id, a.id]).expect("assign");
        assert_eq!(get_user_contract_ids(&mut conn, user.id).expect("ids"), vec![a.id]);
        set_user_contracts(&mut conn, user.id, &[b.id]).expect("reassign");
        assert_eq!(get_user_contract_ids(&mut conn, user.id).expect("ids"), vec![b.id]);
        set_user_contracts(&mut conn, user.id, &[]).expect("clear");
        assert!(get_user_contract_ids(&mut conn, user.id).expect("ids").is_empty());
    }

    #[test]
    fn test_list_users_with_roles() {
        let mut conn = setup_test_db();
        let company = insert_test_company(&mut conn, "Acme");
        insert_test_user(&mut conn, company.id, "o@acme.com", UserRole::Owner, None);
        insert_test_user(&mut conn, company.id, "a@acme.com", UserRole::Admin, None);
        insert_test_user(&mut conn, company.id, "t@acme.com", UserRole::Technician, None);

        let managers = list_users_with_roles(&mut conn, company.id, &[UserRole::Owner, UserRole::Admin])
            .expect("query");
        assert_eq!(managers.len(), 2);
        assert_eq!(list_users(&mut conn, Some(company.id)).expect("all").len(), 3);
    }

    #[test]
    fn test_update_user() {
        let mut conn = setup_test_db();
        let company = insert_test_company(&mut conn, "Acme");
        let user = insert_test_user(&mut conn, company.id, "t@acme.com", UserRole::Technician, None);
        let updated = update_user(
            &mut conn,
            user.id,
            UserChanges {
                name: Some("Renamed".to_string()),
                category: Some("electrical".to_string()),
                active: Some(false),
                ..Default::default()
            },
        )
        .expect("update");
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.category.as_deref(), Some("ELECTRICAL"));
        assert!(!updated.active);
    }
}
