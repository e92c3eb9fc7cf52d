use std::error::Error;

use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use diesel::sqlite::SqliteConnection;
use manuflow_api::orm::company::get_all_companies;
use manuflow_api::orm::ronda::{RondaViewer, materialize_for_date};

use super::utils::resolve_company_id;

#[derive(Subcommand)]
pub enum RondaAction {
    #[command(about = "Create the rounds due on a day, as a company manager opening the day would")]
    Generate {
        #[arg(short, long, help = "Day to generate (YYYY-MM-DD, defaults to today in UTC)")]
        date: Option<NaiveDate>,
        #[arg(short, long, help = "Company ID or name (defaults to every company)")]
        company: Option<String>,
    },
}

pub fn handle_ronda_command_with_conn(
    conn: &mut SqliteConnection,
    action: RondaAction,
) -> Result<(), Box<dyn Error>> {
    match action {
        RondaAction::Generate { date, company } => {
            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            let company_ids = match company {
                Some(company) => vec![resolve_company_id(conn, &company)?],
                None => get_all_companies(conn)?.into_iter().map(|c| c.id).collect(),
            };
            generate_impl(conn, date, &company_ids)?;
        }
    }
    Ok(())
}

pub fn generate_impl(
    conn: &mut SqliteConnection,
    date: NaiveDate,
    company_ids: &[i32],
) -> Result<(), Box<dyn Error>> {
    let mut total = 0;
    for &company_id in company_ids {
        let viewer = RondaViewer::company_manager(company_id);
        let rondas = materialize_for_date(conn, &viewer, date)?;
        if rondas.is_empty() {
            continue;
        }
        println!("Company ID {}:", company_id);
        for ronda in &rondas {
            println!(
                "  ID: {}, Schedule: {}, Shift: {}, Start: {}, Contract ID: {}, Status: {}, Steps: {}",
                ronda.occurrence.id,
                ronda.schedule_name,
                ronda.shift,
                ronda.start_time,
                ronda.occurrence.contract_id,
                ronda.occurrence.status,
                ronda.steps.len()
            );
        }
        total += rondas.len();
    }

    println!("{} round(s) scheduled for {}.", total, date);
    Ok(())
}
