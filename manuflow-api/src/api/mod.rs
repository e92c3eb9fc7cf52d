//! HTTP API, version 1.
//!
//! Every module exposes a `routes()` function; [`routes`] gathers them for
//! mounting under `/api`.

use rocket::Route;
use rocket::fs::TempFile;

pub mod asset;
pub mod company;
pub mod contract;
pub mod cron;
pub mod dashboard;
pub mod inspection;
pub mod login;
pub mod measurement;
pub mod relevant_item;
pub mod report;
pub mod ronda;
pub mod schedule;
pub mod status;
pub mod user;

/// Multipart body with a single `file` field.
#[derive(FromForm)]
pub struct FileUpload<'r> {
    pub file: TempFile<'r>,
}

impl FileUpload<'_> {
    /// Client supplied file name including its extension, if any.
    pub fn original_name(&self) -> Option<String> {
        self.file
            .raw_name()
            .map(|name| name.dangerous_unsafe_unsanitized_raw().as_str().to_string())
    }
}

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(status::routes());
    routes.extend(login::routes());
    routes.extend(company::routes());
    routes.extend(user::routes());
    routes.extend(contract::routes());
    routes.extend(asset::routes());
    routes.extend(inspection::routes());
    routes.extend(schedule::routes());
    routes.extend(ronda::routes());
    routes.extend(report::routes());
    routes.extend(cron::routes());
    routes.extend(measurement::routes());
    routes.extend(relevant_item::routes());
    routes.extend(dashboard::routes());
    routes
}
