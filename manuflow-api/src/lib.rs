#[macro_use]
extern crate rocket;

use std::sync::Arc;

use rocket::fairing::AdHoc;
use rocket::figment::value::Map;
use rocket::figment::{Figment, providers::{Env, Format, Toml}};
use rocket::fs::FileServer;
use rocket::request::Request;
use rocket::serde::json::{Json, Value, json};
use rocket::{Build, Rocket};

pub mod admin_init_fairing;
pub mod api;
pub mod config;
pub mod email;
pub mod error;
pub mod logged_json;
pub mod models;
pub mod orm;
pub use orm::DbConn;
pub mod recurrence;
pub mod schema;
pub mod session_guards;
pub mod storage;
pub mod tenancy;
pub mod workflow;

#[cfg(test)]
pub mod generate_types;

use config::AppConfig;
use email::Mailer;
use storage::{BlobStorage, LocalBlobStore};

#[catch(401)]
fn unauthorized(req: &Request) -> Json<Value> {
    Json(json!({
        "error": "Unauthorized",
        "path": req.uri().path().to_string(),
        "status": 401
    }))
}

#[catch(403)]
fn forbidden(req: &Request) -> Json<Value> {
    Json(json!({
        "error": "Forbidden",
        "path": req.uri().path().to_string(),
        "status": 403
    }))
}

#[catch(404)]
fn not_found(req: &Request) -> Json<Value> {
    Json(json!({
        "error": "Not Found",
        "path": req.uri().path().to_string(),
        "status": 404
    }))
}

#[catch(422)]
fn unprocessable_entity(req: &Request) -> Json<Value> {
    Json(json!({
        "error": "Unprocessable Entity",
        "path": req.uri().path().to_string(),
        "status": 422
    }))
}

#[catch(500)]
fn internal_server_error(req: &Request) -> Json<Value> {
    Json(json!({
        "error": "Internal Server Error",
        "path": req.uri().path().to_string(),
        "status": 500
    }))
}

#[catch(default)]
fn default_catcher(status: rocket::http::Status, req: &Request) -> Json<Value> {
    Json(json!({
        "error": status.reason().unwrap_or("Unknown Error"),
        "path": req.uri().path().to_string(),
        "status": status.code
    }))
}

/// Reads the `manuflow` settings and manages them together with the
/// e-mail sender and the blob store built from them. The upload directory
/// is created and served under `public_upload_url`.
fn app_state_fairing() -> AdHoc {
    AdHoc::try_on_ignite("ManuFlow State", |rocket| async {
        let config = match AppConfig::from_figment(rocket.figment()) {
            Ok(config) => config,
            Err(e) => {
                error!("[config] Invalid manuflow configuration: {}", e);
                return Err(rocket);
            }
        };
        let mailer = match Mailer::from_config(&config) {
            Ok(mailer) => mailer,
            Err(e) => {
                error!("[email] Cannot build e-mail sender: {}", e);
                return Err(rocket);
            }
        };

        let store = LocalBlobStore::from_config(&config);
        if let Err(e) = rocket::tokio::fs::create_dir_all(store.root()).await {
            error!("[storage] Cannot create upload dir {}: {}", store.root().display(), e);
            return Err(rocket);
        }
        info!("[storage] Uploads stored in {}", store.root().display());

        let upload_base = match config.upload_url_prefix() {
            "" => "/uploads".to_string(),
            prefix => prefix.to_string(),
        };
        let files = FileServer::from(store.root().clone());

        Ok(rocket
            .mount(upload_base, files)
            .manage(mailer)
            .manage(BlobStorage(Arc::new(store)))
            .manage(config))
    })
}

/// Everything a running API needs on top of the database: settings,
/// collaborators, JSON catchers and the `/api` routes.
pub fn mount_api_routes(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .attach(app_state_fairing())
        .register(
            "/",
            catchers![
                unauthorized,
                forbidden,
                not_found,
                unprocessable_entity,
                internal_server_error,
                default_catcher
            ],
        )
        .mount("/api", api::routes())
}

fn log_rocket_info(rocket: &Rocket<Build>) {
    let figment = rocket.figment();

    if let Ok(address) = figment.extract_inner::<String>("address") {
        info!("Rocket is running at: {}", address);
    }

    if let Ok(port) = figment.extract_inner::<u16>("port") {
        info!("Rocket is listening on port: {}", port);
    }

    match figment.extract_inner::<Map<String, Value>>("databases.sqlite_db") {
        Ok(db_config) => {
            if let Some(Value::String(url)) = db_config.get("url") {
                info!("Database URL: {}", url);
            } else {
                warn!("Database URL not found in configuration");
            }
        }
        Err(e) => {
            warn!("Failed to extract database configuration: {}", e);
        }
    }
}

/// Builds the production server.
///
/// Tests do not go through here; they use `orm::testing::test_rocket`
/// with its in-memory database.
pub fn rocket() -> Rocket<Build> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| {
        warn!("DATABASE_URL not set, using manuflow.sqlite");
        "manuflow.sqlite".to_string()
    });

    let figment = Figment::from(rocket::Config::default())
        .merge(("limits.file", "10 MiB"))
        .merge(("limits.data-form", "12 MiB"))
        .merge(Toml::file("Rocket.toml").nested())
        .merge(Env::prefixed("ROCKET_").global())
        .merge(("databases.sqlite_db.url", database_url));

    let rocket = rocket::custom(figment)
        .attach(DbConn::fairing())
        .attach(orm::set_foreign_keys_fairing())
        .attach(orm::run_migrations_fairing())
        .attach(admin_init_fairing::admin_init_fairing());

    log_rocket_info(&rocket);

    let static_dir = std::env::var("MANUFLOW_STATIC_DIR").unwrap_or_else(|_| "static".to_string());
    let rocket = mount_api_routes(rocket);
    if std::path::Path::new(&static_dir).is_dir() {
        rocket.mount("/", FileServer::from(static_dir).rank(10))
    } else {
        rocket
    }
}
