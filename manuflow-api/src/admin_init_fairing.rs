use diesel::prelude::*;
use dotenvy::dotenv;
use rocket::Rocket;
use rocket::fairing::AdHoc;

use crate::models::{Company, SubscriptionChanges, SubscriptionPlan, SubscriptionStatus, UserInput, UserRole};
use crate::orm::DbConn;
use crate::orm::company::{get_company_by_name, insert_company, update_subscription};
use crate::orm::login::hash_password;
use crate::orm::user::{get_user_by_email, insert_user};

pub const PLATFORM_COMPANY_NAME: &str = "ManuFlow";

/// Add the platform company and the super-admin user if needed.
///
/// The super-admin email/password come from MANUFLOW_DEFAULT_EMAIL and
/// MANUFLOW_DEFAULT_PASSWORD.
pub fn admin_init_fairing() -> AdHoc {
    AdHoc::try_on_ignite("Super Admin Initialization", |rocket| async {
        dotenv().ok();

        let Some(conn) = get_db_connection(&rocket).await else {
            return Err(rocket);
        };

        let admin_email = get_admin_email();
        let admin_password = get_admin_password();
        let result = conn
            .run(move |c| {
                let company = find_or_create_platform_company(c)?;
                create_admin_user_if_needed(c, &admin_email, &admin_password, &company)
            })
            .await;

        match result {
            Ok(()) => Ok(rocket),
            Err(e) => {
                error!("[admin-init] FATAL: Super admin initialization failed: {:?}", e);
                Err(rocket)
            }
        }
    })
}

async fn get_db_connection(rocket: &Rocket<rocket::Build>) -> Option<DbConn> {
    let conn = DbConn::get_one(rocket).await;
    if conn.is_none() {
        error!("[admin-init] ERROR: Could not get DB connection.");
    }
    conn
}

fn get_admin_email() -> String {
    std::env::var("MANUFLOW_DEFAULT_EMAIL").unwrap_or_else(|_| "superadmin@example.com".to_string())
}

fn get_admin_password() -> String {
    std::env::var("MANUFLOW_DEFAULT_PASSWORD").unwrap_or_else(|_| "admin".to_string())
}

fn find_or_create_platform_company(c: &mut SqliteConnection) -> QueryResult<Company> {
    if let Some(found) = get_company_by_name(c, PLATFORM_COMPANY_NAME)? {
        info!("[admin-init] Matched company: '{}'", found.name);
        return Ok(found);
    }

    info!("[admin-init] No platform company found. Creating '{}'.", PLATFORM_COMPANY_NAME);
    let company = insert_company(
        c,
        PLATFORM_COMPANY_NAME.to_string(),
        None,
        SubscriptionPlan::Enterprise,
    )?;
    update_subscription(
        c,
        company.id,
        SubscriptionChanges {
            subscription_status: Some(SubscriptionStatus::Active),
            ..Default::default()
        },
    )
}

fn create_admin_user_if_needed(
    c: &mut SqliteConnection,
    admin_email: &str,
    admin_password: &str,
    company: &Company,
) -> QueryResult<()> {
    if get_user_by_email(c, admin_email)?.is_some() {
        info!("[admin-init] Super admin '{}' already exists", admin_email);
        return Ok(());
    }

    insert_user(
        c,
        UserInput {
            company_id: company.id,
            name: "Super Admin".to_string(),
            email: admin_email.to_string(),
            password_hash: hash_password(admin_password),
            role: UserRole::SuperAdmin,
            category: None,
        },
    )?;
    info!("[admin-init] Created super admin '{}'", admin_email);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::testing::setup_test_db;
    use crate::schema::users;

    #[test]
    fn test_initialization_is_idempotent() {
        let mut conn = setup_test_db();

        let company = find_or_create_platform_company(&mut conn).expect("company");
        create_admin_user_if_needed(&mut conn, "root@example.com", "pw", &company).expect("first");
        let again = find_or_create_platform_company(&mut conn).expect("company again");
        create_admin_user_if_needed(&mut conn, "root@example.com", "pw", &again).expect("second");

        assert_eq!(company.id, again.id);
        assert_eq!(again.subscription_status, SubscriptionStatus::Active);
        let count: i64 = users::table.count().get_result(&mut conn).expect("count");
        assert_eq!(count, 1);
        let admin = get_user_by_email(&mut conn, "root@example.com")
            .expect("query")
            .expect("admin exists");
        assert_eq!(admin.role, UserRole::SuperAdmin);
    }
}
