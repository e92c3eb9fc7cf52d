use std::error::Error;

use clap::Subcommand;
use diesel::sqlite::SqliteConnection;
use manuflow_api::models::{UserChanges, UserInput, UserRole};
use manuflow_api::orm::company::get_company_by_id;
use manuflow_api::orm::login::{hash_password, revoke_user_sessions};
use manuflow_api::orm::user::{
    count_company_users, email_taken, get_user_by_email, insert_user, list_users, normalize_email,
    soft_delete_user, update_user,
};

use super::utils::{check_password, confirm, filter_by_term, prompt_for_password, resolve_company_id};

#[derive(Subcommand)]
pub enum UserAction {
    #[command(about = "List users, optionally filtered by e-mail search term")]
    Ls {
        #[arg(help = "Search term (regex by default, use -F for fixed string)")]
        search_term: Option<String>,
        #[arg(
            short = 'F',
            long = "fixed-string",
            help = "Treat search term as fixed string instead of regex"
        )]
        fixed_string: bool,
        #[arg(short, long, help = "Only users of this company (ID or name)")]
        company: Option<String>,
    },
    #[command(about = "Add a new user")]
    Add {
        #[arg(short, long, help = "Email address")]
        email: String,
        #[arg(short, long, help = "Display name (defaults to the e-mail)")]
        name: Option<String>,
        #[arg(short, long, help = "Company ID or name")]
        company: String,
        #[arg(
            short,
            long,
            default_value = "TECHNICIAN",
            help = "Role: SUPER_ADMIN, OWNER, ADMIN, SUPERVISOR or TECHNICIAN"
        )]
        role: UserRole,
        #[arg(long, help = "Technician category, e.g. ELECTRICAL")]
        category: Option<String>,
        #[arg(short, long, help = "Password (will be prompted securely if not provided)")]
        password: Option<String>,
    },
    #[command(about = "Change user password")]
    Passwd {
        #[arg(short, long, help = "Email address")]
        email: String,
        #[arg(short, long, help = "New password (will be prompted securely if not provided)")]
        password: Option<String>,
    },
    #[command(about = "Remove users matching search term")]
    Rm {
        #[arg(
            help = "Search term to match user e-mails for removal (regex by default, use -F for fixed string)"
        )]
        search_term: String,
        #[arg(
            short = 'F',
            long = "fixed-string",
            help = "Treat search term as fixed string instead of regex"
        )]
        fixed_string: bool,
        #[arg(short = 'y', long = "yes", help = "Skip confirmation prompt")]
        yes: bool,
    },
}

pub fn handle_user_command_with_conn(
    conn: &mut SqliteConnection,
    action: UserAction,
) -> Result<(), Box<dyn Error>> {
    match action {
        UserAction::Ls { search_term, fixed_string, company } => {
            let company_id = company.map(|c| resolve_company_id(conn, &c)).transpose()?;
            list_users_impl(conn, search_term, fixed_string, company_id)?;
        }
        UserAction::Add {
            email,
            name,
            company,
            role,
            category,
            password,
        } => {
            let company_id = resolve_company_id(conn, &company)?;
            let input = UserInput {
                company_id,
                name: name.unwrap_or_else(|| email.clone()),
                email,
                password_hash: String::new(),
                role,
                category,
            };
            add_user_impl(conn, input, password)?;
        }
        UserAction::Passwd { email, password } => {
            change_password_impl(conn, &email, password)?;
        }
        UserAction::Rm { search_term, fixed_string, yes } => {
            remove_users_impl(conn, search_term, fixed_string, yes)?;
        }
    }
    Ok(())
}

pub fn list_users_impl(
    conn: &mut SqliteConnection,
    search_term: Option<String>,
    fixed_string: bool,
    company_id: Option<i32>,
) -> Result<(), Box<dyn Error>> {
    let users = list_users(conn, company_id)?;
    let filtered = filter_by_term(users, search_term.as_deref(), fixed_string, |u| u.email.as_str())?;

    if filtered.is_empty() {
        println!("No users found.");
    } else {
        println!("Users:");
        for user in filtered {
            println!(
                "  ID: {}, Email: {}, Name: {}, Role: {}, Category: {}, Company ID: {}, Active: {}",
                user.id,
                user.email,
                user.name,
                user.role,
                user.category.as_deref().unwrap_or("-"),
                user.company_id,
                user.active
            );
        }
    }

    Ok(())
}

/// Creates the user described by `input`. Its `password_hash` is ignored
/// and filled from `password`, prompting when none is given.
pub fn add_user_impl(
    conn: &mut SqliteConnection,
    mut input: UserInput,
    password: Option<String>,
) -> Result<(), Box<dyn Error>> {
    input.email = normalize_email(&input.email);
    if input.email.is_empty() || !input.email.contains('@') {
        return Err(format!("Invalid e-mail address '{}'", input.email).into());
    }
    if email_taken(conn, &input.email)? {
        return Err(format!("E-mail '{}' is already in use", input.email).into());
    }

    let company = get_company_by_id(conn, input.company_id)?
        .ok_or_else(|| format!("Company with ID {} does not exist", input.company_id))?;
    if let Some(max_users) = company.max_users {
        if count_company_users(conn, company.id)? >= i64::from(max_users) {
            return Err(format!(
                "Company '{}' reached its user limit of {}",
                company.name, max_users
            )
            .into());
        }
    }

    let password = match password {
        Some(p) => {
            check_password(&p)?;
            p
        }
        None => prompt_for_password()?,
    };
    input.password_hash = hash_password(&password);

    let created_user = insert_user(conn, input)?;

    println!("User created successfully!");
    println!("ID: {}", created_user.id);
    println!("Email: {}", created_user.email);
    println!("Role: {}", created_user.role);
    println!("Company: {} (ID: {})", company.name, created_user.company_id);

    Ok(())
}

pub fn change_password_impl(
    conn: &mut SqliteConnection,
    email: &str,
    password: Option<String>,
) -> Result<(), Box<dyn Error>> {
    let user = get_user_by_email(conn, email)?
        .ok_or_else(|| format!("User with e-mail '{}' does not exist", email))?;

    let password = match password {
        Some(p) => {
            check_password(&p)?;
            p
        }
        None => prompt_for_password()?,
    };

    update_user(
        conn,
        user.id,
        UserChanges {
            password_hash: Some(hash_password(&password)),
            ..Default::default()
        },
    )?;
    let revoked = revoke_user_sessions(conn, user.id)?;

    println!("Password changed successfully for user: {}", user.email);
    if revoked > 0 {
        println!("Revoked {} active session(s).", revoked);
    }
    Ok(())
}

pub fn remove_users_impl(
    conn: &mut SqliteConnection,
    search_term: String,
    fixed_string: bool,
    yes: bool,
) -> Result<(), Box<dyn Error>> {
    let users = list_users(conn, None)?;
    let matching = filter_by_term(users, Some(&search_term), fixed_string, |u| u.email.as_str())?;

    if matching.is_empty() {
        println!("No users found matching the search term.");
        return Ok(());
    }

    println!("Found {} user(s) matching the search term:", matching.len());
    for user in &matching {
        println!(
            "  ID: {}, Email: {}, Role: {}, Company ID: {}",
            user.id, user.email, user.role, user.company_id
        );
    }

    if !yes
        && !confirm(&format!(
            "Are you sure you want to delete these {} user(s)?",
            matching.len()
        ))?
    {
        println!("Operation cancelled.");
        return Ok(());
    }

    let mut deleted_count = 0;
    let mut errors = Vec::new();

    for user in matching {
        match soft_delete_user(conn, user.id) {
            Ok(true) => {
                deleted_count += 1;
                println!("Deleted user: {} (ID: {})", user.email, user.id);
            }
            Ok(false) => {}
            Err(e) => {
                errors.push(format!(
                    "Failed to delete user {} (ID: {}): {}",
                    user.email, user.id, e
                ));
            }
        }
    }

    println!("Successfully deleted {} user(s).", deleted_count);

    if !errors.is_empty() {
        println!("Errors encountered:");
        for error in errors {
            println!("  {}", error);
        }
        return Err("Some deletions failed".into());
    }

    Ok(())
}
