#![allow(dead_code)]

use manuflow_api::orm::testing::{FIXTURE_PASSWORD, test_rocket};
use rocket::http::{ContentType, Cookie, Header, Status};
use rocket::local::asynchronous::Client;
use serde_json::{Value, json};

pub const SUPER_ADMIN: (&str, &str) = ("superadmin@example.com", "admin");

pub async fn client() -> Client {
    Client::tracked(test_rocket()).await.expect("valid rocket instance")
}

/// Logs in and returns the session cookie.
pub async fn login_as(client: &Client, email: &str, password: &str) -> Cookie<'static> {
    let response = client
        .post("/api/1/login")
        .header(ContentType::JSON)
        .body(json!({ "email": email, "password": password }).to_string())
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok, "login of {} failed", email);
    response
        .cookies()
        .get("session")
        .expect("Session cookie should be set")
        .clone()
        .into_owned()
}

/// Logs in a seeded fixture user.
pub async fn login(client: &Client, email: &str) -> Cookie<'static> {
    login_as(client, email, FIXTURE_PASSWORD).await
}

pub async fn login_super_admin(client: &Client) -> Cookie<'static> {
    login_as(client, SUPER_ADMIN.0, SUPER_ADMIN.1).await
}

pub async fn get_json(client: &Client, cookie: &Cookie<'static>, uri: &str) -> (Status, Value) {
    let response = client.get(uri.to_string()).cookie(cookie.clone()).dispatch().await;
    let status = response.status();
    (status, response.into_json().await.unwrap_or(Value::Null))
}

pub async fn post_json(
    client: &Client,
    cookie: &Cookie<'static>,
    uri: &str,
    body: Value,
) -> (Status, Value) {
    let response = client
        .post(uri.to_string())
        .cookie(cookie.clone())
        .json(&body)
        .dispatch()
        .await;
    let status = response.status();
    (status, response.into_json().await.unwrap_or(Value::Null))
}

pub async fn put_json(
    client: &Client,
    cookie: &Cookie<'static>,
    uri: &str,
    body: Value,
) -> (Status, Value) {
    let response = client
        .put(uri.to_string())
        .cookie(cookie.clone())
        .json(&body)
        .dispatch()
        .await;
    let status = response.status();
    (status, response.into_json().await.unwrap_or(Value::Null))
}

pub async fn patch_json(
    client: &Client,
    cookie: &Cookie<'static>,
    uri: &str,
    body: Value,
) -> (Status, Value) {
    let response = client
        .patch(uri.to_string())
        .cookie(cookie.clone())
        .json(&body)
        .dispatch()
        .await;
    let status = response.status();
    (status, response.into_json().await.unwrap_or(Value::Null))
}

pub async fn delete(client: &Client, cookie: &Cookie<'static>, uri: &str) -> Status {
    client.delete(uri.to_string()).cookie(cookie.clone()).dispatch().await.status()
}

/// Sends a one-field multipart body (`file`) the way a browser form does.
pub async fn upload(
    client: &Client,
    cookie: &Cookie<'static>,
    uri: &str,
    file_name: &str,
    content: &[u8],
) -> (Status, Value) {
    const BOUNDARY: &str = "X-MANUFLOW-TEST-BOUNDARY";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
            b = BOUNDARY,
            f = file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    let content_type = ContentType::new("multipart", "form-data").with_params(("boundary", BOUNDARY));
    let response = client
        .post(uri.to_string())
        .cookie(cookie.clone())
        .header(content_type)
        .body(body)
        .dispatch()
        .await;
    let status = response.status();
    (status, response.into_json().await.unwrap_or(Value::Null))
}

pub fn bearer(token: &str) -> Header<'static> {
    Header::new("Authorization", format!("Bearer {}", token))
}

/// Id of a seeded contract, looked up through the super-admin.
pub async fn contract_id(client: &Client, name: &str) -> i32 {
    let admin = login_super_admin(client).await;
    let (status, contracts) = get_json(client, &admin, "/api/1/contracts").await;
    assert_eq!(status, Status::Ok);
    contracts
        .as_array()
        .expect("array")
        .iter()
        .find(|c| c["name"] == name)
        .and_then(|c| c["id"].as_i64())
        .unwrap_or_else(|| panic!("contract {} not seeded", name)) as i32
}

pub fn id_of(value: &Value) -> i64 {
    value["id"].as_i64().expect("body has an id")
}
