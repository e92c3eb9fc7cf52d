use diesel::prelude::*;

use crate::models::{EmailRecord, EmailStatus, NewEmailRecord};
use crate::orm::db::{last_insert_id, now};
use crate::schema::email_queue;

/// What was sent (or attempted) to one recipient.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub company_id: Option<i32>,
    pub report_id: Option<i32>,
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Records the outcome of a delivery attempt. `error` is `None` on success.
pub fn record_email(
    conn: &mut SqliteConnection,
    email: &OutgoingEmail,
    error: Option<String>,
) -> QueryResult<EmailRecord> {
    let timestamp = now();
    let (status, sent_at) = match error {
        None => (EmailStatus::Sent, Some(timestamp)),
        Some(_) => (EmailStatus::Failed, None),
    };
    diesel::insert_into(email_queue::table)
        .values(&NewEmailRecord {
            company_id: email.company_id,
            report_id: email.report_id,
            recipient: email.recipient.clone(),
            subject: email.subject.clone(),
            body: email.body.clone(),
            status,
            error,
            created_at: timestamp,
            sent_at,
        })
        .execute(conn)?;
    let id = last_insert_id(conn)?;
    email_queue::table.find(id).select(EmailRecord::as_select()).first(conn)
}

/// Most recent records first, optionally for one company.
pub fn list_emails(
    conn: &mut SqliteConnection,
    company_id: Option<i32>,
    limit: i64,
) -> QueryResult<Vec<EmailRecord>> {
    let mut query = email_queue::table.select(EmailRecord::as_select()).into_boxed();
    if let Some(company_id) = company_id {
        query = query.filter(email_queue::company_id.eq(company_id));
    }
    query
        .order((email_queue::created_at.desc(), email_queue::id.desc()))
        .limit(limit)
        .load(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::testing::{insert_test_company, setup_test_db};

    #[test]
    fn test_record_sent_and_failed() {
        let mut conn = setup_test_db();
        let acme = insert_test_company(&mut conn, "Acme");
        let email = OutgoingEmail {
            company_id: Some(acme.id),
            report_id: None,
            recipient: "owner@acme.com".to_string(),
            subject: "Hello".to_string(),
            body: "Body".to_string(),
        };

        let sent = record_email(&mut conn, &email, None).expect("record");
        assert_eq!(sent.status, EmailStatus::Sent);
        assert!(sent.sent_at.is_some());

        let failed = record_email(&mut conn, &email, Some("timeout".to_string())).expect("record");
        assert_eq!(failed.status, EmailStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("timeout"));
        assert!(failed.sent_at.is_none());

        assert_eq!(list_emails(&mut conn, Some(acme.id), 10).expect("list").len(), 2);
        assert!(list_emails(&mut conn, Some(acme.id + 1), 10).expect("list").is_empty());
    }
}
