use std::error::Error;
use std::io::{self, Write};

use diesel::{prelude::*, sqlite::SqliteConnection};
use dotenvy::dotenv;
use manuflow_api::api::user::MIN_PASSWORD_LEN;
use manuflow_api::orm::company::{get_company_by_id, get_company_by_name};
use manuflow_api::orm::{run_pending_migrations, set_foreign_keys};
use regex::Regex;
use rpassword::read_password;

/// Opens the database named by DATABASE_URL, with foreign keys on and
/// every migration applied.
pub fn establish_connection() -> Result<SqliteConnection, Box<dyn Error>> {
    dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?;
    let mut conn = SqliteConnection::establish(&database_url)?;
    set_foreign_keys(&mut conn)?;
    run_pending_migrations(&mut conn).map_err(|e| format!("Migration failed: {}", e))?;
    Ok(conn)
}

/// Resolve a company identifier (either ID or name) to a company ID. A
/// number is treated as an ID and must exist; anything else is looked up
/// by name, case-insensitively.
pub fn resolve_company_id(
    conn: &mut SqliteConnection,
    company_identifier: &str,
) -> Result<i32, Box<dyn Error>> {
    if let Ok(id) = company_identifier.parse::<i32>() {
        match get_company_by_id(conn, id)? {
            Some(_company) => Ok(id),
            None => Err(format!("Company with ID {} does not exist", id).into()),
        }
    } else {
        match get_company_by_name(conn, company_identifier)? {
            Some(company) => Ok(company.id),
            None => {
                Err(format!("Company with name '{}' does not exist", company_identifier).into())
            }
        }
    }
}

/// Keeps the items whose key matches `search_term`, as a regex or, with
/// `fixed_string`, as a plain substring. No term keeps everything.
pub fn filter_by_term<T>(
    items: Vec<T>,
    search_term: Option<&str>,
    fixed_string: bool,
    key: impl Fn(&T) -> &str,
) -> Result<Vec<T>, Box<dyn Error>> {
    let Some(term) = search_term else {
        return Ok(items);
    };
    if fixed_string {
        return Ok(items.into_iter().filter(|item| key(item).contains(term)).collect());
    }
    let regex = Regex::new(term).map_err(|e| format!("Invalid regex pattern '{}': {}", term, e))?;
    Ok(items.into_iter().filter(|item| regex.is_match(key(item))).collect())
}

/// Asks a yes/no question on the terminal. Anything but y/yes is a no.
pub fn confirm(question: &str) -> io::Result<bool> {
    print!("{} [y/N]: ", question);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim().to_lowercase();
    Ok(input == "y" || input == "yes")
}

pub fn check_password(password: &str) -> Result<(), Box<dyn Error>> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!("Password must be at least {} characters", MIN_PASSWORD_LEN).into());
    }
    Ok(())
}

pub fn prompt_for_password() -> Result<String, Box<dyn Error>> {
    print!("Enter new password: ");
    io::stdout().flush()?;
    let password = read_password()?;
    check_password(&password)?;

    print!("Confirm new password: ");
    io::stdout().flush()?;
    let confirm_password = read_password()?;

    if password != confirm_password {
        return Err("Passwords do not match".into());
    }

    Ok(password)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        vec!["Acme Facilities".to_string(), "Globex Services".to_string(), "acme.org".to_string()]
    }

    #[test]
    fn test_filter_by_term_regex() {
        let found = filter_by_term(names(), Some("^[Aa]cme"), false, |s| s.as_str()).unwrap();
        assert_eq!(found, vec!["Acme Facilities".to_string(), "acme.org".to_string()]);
    }

    #[test]
    fn test_filter_by_term_fixed_string() {
        // "." is literal with -F
        let found = filter_by_term(names(), Some("."), true, |s| s.as_str()).unwrap();
        assert_eq!(found, vec!["acme.org".to_string()]);
    }

    #[test]
    fn test_filter_by_term_without_term_keeps_all() {
        assert_eq!(filter_by_term(names(), None, false, |s| s.as_str()).unwrap().len(), 3);
    }

    #[test]
    fn test_filter_by_term_rejects_bad_regex() {
        assert!(filter_by_term(names(), Some("(unclosed"), false, |s| s.as_str()).is_err());
    }

    #[test]
    fn test_check_password_length() {
        assert!(check_password("12345").is_err());
        assert!(check_password("123456").is_ok());
    }
}
