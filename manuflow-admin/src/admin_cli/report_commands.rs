use std::error::Error;

use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use diesel::sqlite::SqliteConnection;
use manuflow_api::orm::report::expire_reports;

#[derive(Subcommand)]
pub enum ReportAction {
    #[command(about = "Mark reports past their expiration date as EXPIRED (no e-mail is sent)")]
    Expire {
        #[arg(short, long, help = "Reference day (YYYY-MM-DD, defaults to today in UTC)")]
        date: Option<NaiveDate>,
    },
}

pub fn handle_report_command_with_conn(
    conn: &mut SqliteConnection,
    action: ReportAction,
) -> Result<(), Box<dyn Error>> {
    match action {
        ReportAction::Expire { date } => {
            let today = date.unwrap_or_else(|| Utc::now().date_naive());
            let expired = expire_reports(conn, today)?;
            println!("Marked {} report(s) as EXPIRED (reference day {}).", expired, today);
        }
    }
    Ok(())
}
