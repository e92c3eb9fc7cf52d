mod common;

use common::{client, delete, get_json, login, login_as, login_super_admin, post_json, put_json};
use rocket::http::Status;
use serde_json::{Value, json};

fn find_company<'a>(list: &'a Value, name: &str) -> &'a Value {
    list.as_array()
        .expect("array")
        .iter()
        .find(|c| c["name"] == name)
        .unwrap_or_else(|| panic!("company {} missing", name))
}

#[rocket::async_test]
async fn test_company_admin_requires_super_admin() {
    let client = client().await;
    let owner = login(&client, "owner@acme.com").await;

    let (status, _) = get_json(&client, &owner, "/api/1/admin/companies").await;
    assert_eq!(status, Status::Forbidden);

    let (status, _) = post_json(
        &client,
        &owner,
        "/api/1/admin/companies",
        json!({
            "name": "Sneaky Co",
            "owner_name": "Sneaky",
            "owner_email": "sneaky@sneaky.com",
            "owner_password": "secret1"
        }),
    )
    .await;
    assert_eq!(status, Status::Forbidden);
}

#[rocket::async_test]
async fn test_list_companies_with_counts() {
    let client = client().await;
    let admin = login_super_admin(&client).await;

    let (status, list) = get_json(&client, &admin, "/api/1/admin/companies").await;
    assert_eq!(status, Status::Ok);

    let acme = find_company(&list, "Acme Facilities");
    assert_eq!(acme["user_count"], 5);
    assert_eq!(acme["contract_count"], 2);
    assert_eq!(acme["subscription_status"], "ACTIVE");

    let dormant = find_company(&list, "Dormant Ltd");
    assert_eq!(dormant["subscription_status"], "SUSPENDED");
    assert_eq!(dormant["contract_count"], 0);
}

#[rocket::async_test]
async fn test_create_company_with_owner() {
    let client = client().await;
    let admin = login_super_admin(&client).await;

    let (status, created) = post_json(
        &client,
        &admin,
        "/api/1/admin/companies",
        json!({
            "name": "Initech",
            "document": "12.345.678/0001-90",
            "plan": "BASIC",
            "owner_name": "Bill Lumbergh",
            "owner_email": "Bill@Initech.com",
            "owner_password": "tps-report"
        }),
    )
    .await;
    assert_eq!(status, Status::Created);
    assert_eq!(created["company"]["name"], "Initech");
    assert_eq!(created["company"]["subscription_plan"], "BASIC");
    assert_eq!(created["company"]["subscription_status"], "TRIAL");
    assert_eq!(created["owner"]["role"], "OWNER");
    assert_eq!(created["owner"]["email"], "bill@initech.com");
    assert_eq!(created["owner"]["company_id"], created["company"]["id"]);

    // The new owner can log in straight away and sees an empty company
    let owner = login_as(&client, "bill@initech.com", "tps-report").await;
    let (status, contracts) = get_json(&client, &owner, "/api/1/contracts").await;
    assert_eq!(status, Status::Ok);
    assert_eq!(contracts, json!([]));

    let (status, company) = get_json(&client, &owner, "/api/1/company").await;
    assert_eq!(status, Status::Ok);
    assert_eq!(company["name"], "Initech");
}

#[rocket::async_test]
async fn test_create_company_conflicts_and_validation() {
    let client = client().await;
    let admin = login_super_admin(&client).await;

    let (status, _) = post_json(
        &client,
        &admin,
        "/api/1/admin/companies",
        json!({
            "name": "acme facilities",
            "owner_name": "Dup",
            "owner_email": "dup@dup.com",
            "owner_password": "secret1"
        }),
    )
    .await;
    assert_eq!(status, Status::Conflict);

    let (status, _) = post_json(
        &client,
        &admin,
        "/api/1/admin/companies",
        json!({
            "name": "Fresh Co",
            "owner_name": "Dup",
            "owner_email": "owner@acme.com",
            "owner_password": "secret1"
        }),
    )
    .await;
    assert_eq!(status, Status::Conflict);

    let (status, _) = post_json(
        &client,
        &admin,
        "/api/1/admin/companies",
        json!({
            "name": "Fresh Co",
            "owner_name": "Short",
            "owner_email": "short@fresh.com",
            "owner_password": "123"
        }),
    )
    .await;
    assert_eq!(status, Status::BadRequest);
}

#[rocket::async_test]
async fn test_suspending_a_company_blocks_login() {
    let client = client().await;
    let admin = login_super_admin(&client).await;

    let (_, list) = get_json(&client, &admin, "/api/1/admin/companies").await;
    let globex_id = find_company(&list, "Globex Services")["id"].as_i64().expect("id");

    let (status, company) = put_json(
        &client,
        &admin,
        &format!("/api/1/admin/companies/{}/subscription", globex_id),
        json!({ "status": "SUSPENDED", "max_users": 10 }),
    )
    .await;
    assert_eq!(status, Status::Ok);
    assert_eq!(company["subscription_status"], "SUSPENDED");
    assert_eq!(company["max_users"], 10);

    let response = client
        .post("/api/1/login")
        .json(&json!({ "email": "owner@globex.com", "password": "password123" }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);

    let (status, _) = put_json(
        &client,
        &admin,
        &format!("/api/1/admin/companies/{}/subscription", globex_id),
        json!({ "max_users": 0 }),
    )
    .await;
    assert_eq!(status, Status::BadRequest);
}

#[rocket::async_test]
async fn test_delete_company() {
    let client = client().await;
    let admin = login_super_admin(&client).await;

    let (_, me) = get_json(&client, &admin, "/api/1/me").await;
    let platform_id = me["company"]["id"].as_i64().expect("id");
    let status = delete(&client, &admin, &format!("/api/1/admin/companies/{}", platform_id)).await;
    assert_eq!(status, Status::BadRequest);

    let (_, list) = get_json(&client, &admin, "/api/1/admin/companies").await;
    let dormant_id = find_company(&list, "Dormant Ltd")["id"].as_i64().expect("id");
    let uri = format!("/api/1/admin/companies/{}", dormant_id);
    assert_eq!(delete(&client, &admin, &uri).await, Status::NoContent);
    assert_eq!(delete(&client, &admin, &uri).await, Status::NotFound);

    let (_, list) = get_json(&client, &admin, "/api/1/admin/companies").await;
    assert!(list.as_array().expect("array").iter().all(|c| c["name"] != "Dormant Ltd"));
}

#[rocket::async_test]
async fn test_own_company_and_all_users() {
    let client = client().await;
    let tech = login(&client, "tech@acme.com").await;
    let (status, company) = get_json(&client, &tech, "/api/1/company").await;
    assert_eq!(status, Status::Ok);
    assert_eq!(company["name"], "Acme Facilities");

    let (status, _) = get_json(&client, &tech, "/api/1/admin/users").await;
    assert_eq!(status, Status::Forbidden);

    let admin = login_super_admin(&client).await;
    let (status, users) = get_json(&client, &admin, "/api/1/admin/users").await;
    assert_eq!(status, Status::Ok);
    // superadmin, five at Acme, one each at Globex and Dormant
    assert_eq!(users.as_array().map(Vec::len), Some(8));
}
