//! Test harnesses: an in-memory database for ORM unit tests and a fully
//! wired Rocket instance with seeded tenants for API integration tests.
//!
//! Seeded fixtures (all passwords are [`FIXTURE_PASSWORD`] except the
//! super-admin, whose password is `admin`):
//!
//! | company          | status    | users                                                        | contracts              |
//! |------------------|-----------|--------------------------------------------------------------|------------------------|
//! | ManuFlow         | ACTIVE    | superadmin@example.com (SUPER_ADMIN)                         |                        |
//! | Acme Facilities  | ACTIVE    | owner@, admin@, supervisor@, tech@ (ELECTRICAL), hvac@ (HVAC) acme.com | Acme Tower, Acme Mall |
//! | Globex Services  | ACTIVE    | owner@globex.com                                             | Globex Plant           |
//! | Dormant Ltd      | SUSPENDED | owner@dormant.com                                            |                        |
//!
//! supervisor@, tech@ and hvac@acme.com are assigned to Acme Tower only.

use diesel::connection::SimpleConnection;
use diesel::sqlite::SqliteConnection;
use rocket::figment::{
    util::map,
    value::{Map, Value},
};
use rocket::{Build, Rocket, fairing::AdHoc};

use super::db::{DbConn, run_pending_migrations, set_foreign_keys};
use crate::admin_init_fairing::admin_init_fairing;
use crate::models::{
    Company, ContractInput, SubscriptionChanges, SubscriptionPlan, SubscriptionStatus, User,
    UserInput, UserRole,
};
use crate::orm::company::{get_company_by_name, insert_company, update_subscription};
use crate::orm::contract::insert_contract;
use crate::orm::login::hash_password;
use crate::orm::user::{get_user_by_email, insert_user, set_user_contracts};

pub const FIXTURE_PASSWORD: &str = "password123";
pub const TEST_CRON_SECRET: &str = "test-cron-secret";

/// Configures SQLite for faster but less durable operation; only for tests.
fn set_sqlite_test_pragmas(conn: &mut SqliteConnection) -> diesel::QueryResult<()> {
    conn.batch_execute(
        r#"
        PRAGMA synchronous = OFF;
        PRAGMA journal_mode = OFF;
        "#,
    )
}

fn set_sqlite_test_pragmas_fairing() -> AdHoc {
    AdHoc::on_ignite("Set SQLite Test Pragmas", |rocket| async {
        if let Some(conn) = DbConn::get_one(&rocket).await {
            if let Err(e) = conn.run(set_sqlite_test_pragmas).await {
                warn!("[test-data-init] Failed to set test pragmas: {}", e);
            }
        }
        rocket
    })
}

/// Seeds the tenants, users and contracts every integration test relies on.
fn test_data_init_fairing() -> AdHoc {
    AdHoc::try_on_ignite("Test Data Initialization", |rocket| async {
        let Some(conn) = DbConn::get_one(&rocket).await else {
            error!("[test-data-init] No database connection available");
            return Err(rocket);
        };
        match conn.run(create_test_data).await {
            Ok(()) => {
                info!("[test-data-init] Test data initialization completed");
                Ok(rocket)
            }
            Err(e) => {
                error!("[test-data-init] Failed to create test data: {:?}", e);
                Err(rocket)
            }
        }
    })
}

fn create_test_data(conn: &mut SqliteConnection) -> diesel::QueryResult<()> {
    // One hash for every fixture user keeps test start-up fast.
    let password_hash = hash_password(FIXTURE_PASSWORD);

    let acme = create_test_company(conn, "Acme Facilities", SubscriptionStatus::Active)?;
    let globex = create_test_company(conn, "Globex Services", SubscriptionStatus::Active)?;
    let dormant = create_test_company(conn, "Dormant Ltd", SubscriptionStatus::Suspended)?;

    create_test_user(conn, &password_hash, acme.id, "owner@acme.com", UserRole::Owner, None)?;
    create_test_user(conn, &password_hash, acme.id, "admin@acme.com", UserRole::Admin, None)?;
    let supervisor = create_test_user(
        conn,
        &password_hash,
        acme.id,
        "supervisor@acme.com",
        UserRole::Supervisor,
        None,
    )?;
    let tech = create_test_user(
        conn,
        &password_hash,
        acme.id,
        "tech@acme.com",
        UserRole::Technician,
        Some("ELECTRICAL"),
    )?;
    let hvac = create_test_user(
        conn,
        &password_hash,
        acme.id,
        "hvac@acme.com",
        UserRole::Technician,
        Some("HVAC"),
    )?;
    create_test_user(conn, &password_hash, globex.id, "owner@globex.com", UserRole::Owner, None)?;
    create_test_user(conn, &password_hash, dormant.id, "owner@dormant.com", UserRole::Owner, None)?;

    let tower = insert_contract(conn, acme.id, contract_input("Acme Tower"))?;
    insert_contract(conn, acme.id, contract_input("Acme Mall"))?;
    insert_contract(conn, globex.id, contract_input("Globex Plant"))?;

    for user in [&supervisor, &tech, &hvac] {
        set_user_contracts(conn, user.id, &[tower.id])?;
    }
    Ok(())
}

fn contract_input(name: &str) -> ContractInput {
    ContractInput {
        name: name.to_string(),
        code: None,
        client_name: Some(format!("{} Client", name)),
        address: None,
        company_id: None,
    }
}

fn create_test_company(
    conn: &mut SqliteConnection,
    name: &str,
    status: SubscriptionStatus,
) -> diesel::QueryResult<Company> {
    if let Some(company) = get_company_by_name(conn, name)? {
        return Ok(company);
    }
    let company = insert_company(conn, name.to_string(), None, SubscriptionPlan::Pro)?;
    update_subscription(
        conn,
        company.id,
        SubscriptionChanges {
            subscription_status: Some(status),
            ..Default::default()
        },
    )
}

fn create_test_user(
    conn: &mut SqliteConnection,
    password_hash: &str,
    company_id: i32,
    email: &str,
    role: UserRole,
    category: Option<&str>,
) -> diesel::QueryResult<User> {
    if let Some(user) = get_user_by_email(conn, email)? {
        return Ok(user);
    }
    let name = email.split('@').next().unwrap_or(email).to_string();
    insert_user(
        conn,
        UserInput {
            company_id,
            name,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            role,
            category: category.map(str::to_string),
        },
    )
}

/// Creates a Rocket instance for testing with a unique in-memory SQLite
/// database, migrations applied, the super-admin and fixtures seeded and all
/// API routes mounted.
pub fn test_rocket() -> Rocket<Build> {
    use uuid::Uuid;

    let unique_db_name = format!("file:test_db_{}?mode=memory&cache=shared", Uuid::new_v4());
    let db_config: Map<_, Value> = map! {
        "url" => unique_db_name.into(),
        "pool_size" => 5.into(),
        "timeout" => 5.into(),
    };
    let databases = map!["sqlite_db" => db_config];

    let upload_dir = std::env::temp_dir().join(format!("manuflow_uploads_{}", Uuid::new_v4()));
    let app_config: Map<_, Value> = map! {
        "cron_secret" => TEST_CRON_SECRET.into(),
        "upload_dir" => upload_dir.to_string_lossy().to_string().into(),
    };

    let figment = rocket::Config::figment()
        .merge(("databases", databases))
        .merge((crate::config::CONFIG_KEY, app_config));

    let rocket = rocket::custom(figment)
        .attach(DbConn::fairing())
        .attach(super::db::set_foreign_keys_fairing())
        .attach(set_sqlite_test_pragmas_fairing())
        .attach(super::db::run_migrations_fairing())
        .attach(admin_init_fairing())
        .attach(test_data_init_fairing());

    crate::mount_api_routes(rocket)
}

/// Creates a synchronous in-memory SQLite connection with all migrations
/// applied and foreign keys on. Each call returns an independent database.
pub fn setup_test_db() -> SqliteConnection {
    use diesel::Connection;

    let mut conn =
        SqliteConnection::establish(":memory:").expect("Failed to create in-memory SQLite database");
    set_foreign_keys(&mut conn).expect("Failed to enable foreign keys");
    run_pending_migrations(&mut conn).expect("Failed to run migrations");
    conn
}

/// Inserts a company and returns it; shorthand for unit tests.
pub fn insert_test_company(conn: &mut SqliteConnection, name: &str) -> Company {
    insert_company(conn, name.to_string(), None, SubscriptionPlan::Basic)
        .expect("Failed to insert test company")
}

/// Inserts a user with a dummy password hash; shorthand for unit tests.
pub fn insert_test_user(
    conn: &mut SqliteConnection,
    company_id: i32,
    email: &str,
    role: UserRole,
    category: Option<&str>,
) -> User {
    insert_user(
        conn,
        UserInput {
            company_id,
            name: email.to_string(),
            email: email.to_string(),
            password_hash: "not-a-real-hash".to_string(),
            role,
            category: category.map(str::to_string),
        },
    )
    .expect("Failed to insert test user")
}

/// Inserts a contract; shorthand for unit tests.
pub fn insert_test_contract(
    conn: &mut SqliteConnection,
    company_id: i32,
    name: &str,
) -> crate::models::Contract {
    insert_contract(conn, company_id, contract_input(name)).expect("Failed to insert test contract")
}
