use chrono::NaiveDateTime;
use diesel::{Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::email_queue;

text_enum! {
    pub enum EmailStatus {
        Sent => "SENT",
        Failed => "FAILED",
    }
}

/// Delivery record of an outgoing e-mail. Failed rows are kept for
/// inspection and are never retried automatically.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize, Deserialize, TS)]
#[diesel(table_name = email_queue)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[ts(export)]
pub struct EmailRecord {
    pub id: i32,
    pub company_id: Option<i32>,
    pub report_id: Option<i32>,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub status: EmailStatus,
    pub error: Option<String>,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
    #[ts(type = "string | null")]
    pub sent_at: Option<NaiveDateTime>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = email_queue)]
pub struct NewEmailRecord {
    pub company_id: Option<i32>,
    pub report_id: Option<i32>,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub status: EmailStatus,
    pub error: Option<String>,
    pub created_at: NaiveDateTime,
    pub sent_at: Option<NaiveDateTime>,
}

/// Result of one expiration batch run
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ExpirationSummary {
    pub expired: usize,
    pub alerts_sent: usize,
    pub alerts_failed: usize,
}
