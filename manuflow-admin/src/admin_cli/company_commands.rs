use std::error::Error;

use chrono::NaiveDate;
use clap::Subcommand;
use diesel::sqlite::SqliteConnection;
use manuflow_api::admin_init_fairing::PLATFORM_COMPANY_NAME;
use manuflow_api::models::{SubscriptionChanges, SubscriptionPlan, SubscriptionStatus, UserInput, UserRole};
use manuflow_api::orm::company::{
    create_company_with_owner, get_company_by_id, get_company_by_name, insert_company,
    list_company_summaries, soft_delete_company, update_subscription,
};
use manuflow_api::orm::login::hash_password;
use manuflow_api::orm::user::{email_taken, normalize_email};

use super::utils::{check_password, confirm, filter_by_term, prompt_for_password, resolve_company_id};

#[derive(Subcommand)]
pub enum CompanyAction {
    #[command(about = "List companies, optionally filtered by search term")]
    Ls {
        #[arg(help = "Search term (regex by default, use -F for fixed string)")]
        search_term: Option<String>,
        #[arg(
            short = 'F',
            long = "fixed-string",
            help = "Treat search term as fixed string instead of regex"
        )]
        fixed_string: bool,
    },
    #[command(about = "Add a new company, optionally with its first owner")]
    Add {
        #[arg(short, long, help = "Company name")]
        name: String,
        #[arg(short, long, help = "Tax document (optional)")]
        document: Option<String>,
        #[arg(long, default_value = "FREE", help = "Subscription plan: FREE, BASIC, PRO or ENTERPRISE")]
        plan: SubscriptionPlan,
        #[arg(long, help = "E-mail of the owner account to create with the company")]
        owner_email: Option<String>,
        #[arg(long, help = "Display name of the owner (defaults to the e-mail)")]
        owner_name: Option<String>,
        #[arg(long, help = "Owner password (will be prompted securely if not provided)")]
        owner_password: Option<String>,
    },
    #[command(about = "Remove companies matching search term")]
    Rm {
        #[arg(
            help = "Search term to match companies for removal (regex by default, use -F for fixed string)"
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
    #[command(about = "Change the subscription of a company")]
    Subscription {
        #[arg(short, long, help = "Company ID or name")]
        company: String,
        #[arg(long, help = "New plan: FREE, BASIC, PRO or ENTERPRISE")]
        plan: Option<SubscriptionPlan>,
        #[arg(long, help = "New status: ACTIVE, TRIAL, SUSPENDED or CANCELLED")]
        status: Option<SubscriptionStatus>,
        #[arg(long, help = "Subscription expiry date (YYYY-MM-DD)")]
        expires: Option<NaiveDate>,
        #[arg(long, help = "Maximum number of live users")]
        max_users: Option<i32>,
    },
}

pub fn handle_company_command_with_conn(
    conn: &mut SqliteConnection,
    action: CompanyAction,
) -> Result<(), Box<dyn Error>> {
    match action {
        CompanyAction::Ls { search_term, fixed_string } => {
            company_ls_impl(conn, search_term, fixed_string)?;
        }
        CompanyAction::Add {
            name,
            document,
            plan,
            owner_email,
            owner_name,
            owner_password,
        } => {
            let owner = owner_email.map(|email| NewOwner {
                name: owner_name.unwrap_or_else(|| email.clone()),
                email,
                password: owner_password,
            });
            company_add_impl(conn, name, document, plan, owner)?;
        }
        CompanyAction::Rm { search_term, fixed_string, yes } => {
            company_rm_impl(conn, search_term, fixed_string, yes)?;
        }
        CompanyAction::Subscription {
            company,
            plan,
            status,
            expires,
            max_users,
        } => {
            let company_id = resolve_company_id(conn, &company)?;
            let changes = SubscriptionChanges {
                subscription_plan: plan,
                subscription_status: status,
                subscription_expires_at: expires,
                max_users,
                updated_at: None,
            };
            company_subscription_impl(conn, company_id, changes)?;
        }
    }
    Ok(())
}

pub struct NewOwner {
    pub name: String,
    pub email: String,
    pub password: Option<String>,
}

pub fn company_ls_impl(
    conn: &mut SqliteConnection,
    search_term: Option<String>,
    fixed_string: bool,
) -> Result<(), Box<dyn Error>> {
    let summaries = list_company_summaries(conn)?;
    let filtered = filter_by_term(summaries, search_term.as_deref(), fixed_string, |s| {
        s.company.name.as_str()
    })?;

    if filtered.is_empty() {
        println!("No companies found.");
    } else {
        println!("Companies:");
        for summary in filtered {
            let company = &summary.company;
            println!(
                "  ID: {}, Name: {}, Plan: {}, Status: {}, Users: {}, Contracts: {}, Created: {}",
                company.id,
                company.name,
                company.subscription_plan,
                company.subscription_status,
                summary.user_count,
                summary.contract_count,
                company.created_at
            );
        }
    }

    Ok(())
}

pub fn company_add_impl(
    conn: &mut SqliteConnection,
    name: String,
    document: Option<String>,
    plan: SubscriptionPlan,
    owner: Option<NewOwner>,
) -> Result<(), Box<dyn Error>> {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err("Company name is required".into());
    }

    if let Some(existing_company) = get_company_by_name(conn, &name)? {
        println!("Company already exists!");
        println!("ID: {}", existing_company.id);
        println!("Name: {}", existing_company.name);
        println!("Created: {}", existing_company.created_at);
        return Ok(());
    }

    let Some(owner) = owner else {
        let created_company = insert_company(conn, name, document, plan)?;
        println!("Company created successfully!");
        println!("ID: {}", created_company.id);
        println!("Name: {}", created_company.name);
        println!("Plan: {} ({})", created_company.subscription_plan, created_company.subscription_status);
        return Ok(());
    };

    let email = normalize_email(&owner.email);
    if email_taken(conn, &email)? {
        return Err(format!("E-mail '{}' is already in use", email).into());
    }
    let password = match owner.password {
        Some(p) => {
            check_password(&p)?;
            p
        }
        None => prompt_for_password()?,
    };

    let owner_input = UserInput {
        company_id: 0,
        name: owner.name,
        email,
        password_hash: hash_password(&password),
        role: UserRole::Owner,
        category: None,
    };
    let (company, owner) = create_company_with_owner(conn, name, document, plan, owner_input)?;

    println!("Company created successfully!");
    println!("ID: {}", company.id);
    println!("Name: {}", company.name);
    println!("Plan: {} ({})", company.subscription_plan, company.subscription_status);
    println!("Owner: {} (ID: {})", owner.email, owner.id);

    Ok(())
}

pub fn company_rm_impl(
    conn: &mut SqliteConnection,
    search_term: String,
    fixed_string: bool,
    yes: bool,
) -> Result<(), Box<dyn Error>> {
    let summaries = list_company_summaries(conn)?;
    let matching = filter_by_term(summaries, Some(&search_term), fixed_string, |s| {
        s.company.name.as_str()
    })?;

    let (platform, matching): (Vec<_>, Vec<_>) = matching
        .into_iter()
        .partition(|s| s.company.name.eq_ignore_ascii_case(PLATFORM_COMPANY_NAME));
    if !platform.is_empty() {
        println!("Skipping the platform company '{}'.", PLATFORM_COMPANY_NAME);
    }

    if matching.is_empty() {
        println!("No companies found matching the search term.");
        return Ok(());
    }

    println!("Found {} company(ies) matching the search term:", matching.len());
    for summary in &matching {
        println!(
            "  ID: {}, Name: {}, Users: {}, Contracts: {}",
            summary.company.id, summary.company.name, summary.user_count, summary.contract_count
        );
    }

    if !yes
        && !confirm(&format!(
            "Are you sure you want to delete these {} company(ies)? Their users will be locked out.",
            matching.len()
        ))?
    {
        println!("Operation cancelled.");
        return Ok(());
    }

    let mut deleted_count = 0;
    let mut errors = Vec::new();

    for summary in matching {
        let company = summary.company;
        match soft_delete_company(conn, company.id) {
            Ok(true) => {
                deleted_count += 1;
                println!("Deleted company: {} (ID: {})", company.name, company.id);
            }
            Ok(false) => {}
            Err(e) => {
                errors.push(format!(
                    "Failed to delete company {} (ID: {}): {}",
                    company.name, company.id, e
                ));
            }
        }
    }

    println!("Successfully deleted {} company(ies).", deleted_count);

    if !errors.is_empty() {
        println!("Errors encountered:");
        for error in errors {
            println!("  {}", error);
        }
        return Err("Some deletions failed".into());
    }

    Ok(())
}

pub fn company_subscription_impl(
    conn: &mut SqliteConnection,
    company_id: i32,
    changes: SubscriptionChanges,
) -> Result<(), Box<dyn Error>> {
    if changes.max_users.is_some_and(|max| max < 1) {
        return Err("max_users must be at least 1".into());
    }
    if changes.subscription_plan.is_none()
        && changes.subscription_status.is_none()
        && changes.subscription_expires_at.is_none()
        && changes.max_users.is_none()
    {
        println!("No fields specified for update. Use --plan, --status, --expires or --max-users.");
        return Ok(());
    }
    if get_company_by_id(conn, company_id)?.is_none() {
        return Err(format!("Company with ID {} does not exist", company_id).into());
    }

    let company = update_subscription(conn, company_id, changes)?;

    println!("Subscription updated successfully!");
    println!("ID: {}", company.id);
    println!("Name: {}", company.name);
    println!("Plan: {}", company.subscription_plan);
    println!("Status: {}", company.subscription_status);
    if let Some(expires) = company.subscription_expires_at {
        println!("Expires: {}", expires);
    }
    if let Some(max_users) = company.max_users {
        println!("Max users: {}", max_users);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use manuflow_api::orm::company::get_all_companies;
    use manuflow_api::orm::testing::setup_test_db;
    use manuflow_api::orm::user::get_user_by_email;

    #[test]
    fn test_company_add_impl_with_owner() {
        let mut conn = setup_test_db();
        let owner = NewOwner {
            name: "Olivia".to_string(),
            email: "Olivia@Acme.com".to_string(),
            password: Some("secret1".to_string()),
        };
        company_add_impl(&mut conn, " Acme ".to_string(), None, SubscriptionPlan::Pro, Some(owner))
            .expect("add company");

        let company = get_company_by_name(&mut conn, "acme").expect("query").expect("company");
        assert_eq!(company.name, "Acme");
        assert_eq!(company.subscription_plan, SubscriptionPlan::Pro);
        assert_eq!(company.subscription_status, SubscriptionStatus::Trial);

        let owner = get_user_by_email(&mut conn, "olivia@acme.com").expect("query").expect("owner");
        assert_eq!(owner.company_id, company.id);
        assert_eq!(owner.role, UserRole::Owner);
    }

    #[test]
    fn test_company_add_impl_existing_name_is_noop() {
        let mut conn = setup_test_db();
        company_add_impl(&mut conn, "Acme".to_string(), None, SubscriptionPlan::Free, None).expect("first");
        company_add_impl(&mut conn, "ACME".to_string(), None, SubscriptionPlan::Free, None).expect("second");
        assert_eq!(get_all_companies(&mut conn).expect("list").len(), 1);
    }

    #[test]
    fn test_company_rm_impl_skips_platform_company() {
        let mut conn = setup_test_db();
        insert_company(&mut conn, PLATFORM_COMPANY_NAME.to_string(), None, SubscriptionPlan::Enterprise)
            .expect("platform");
        insert_company(&mut conn, "Acme".to_string(), None, SubscriptionPlan::Free).expect("acme");

        company_rm_impl(&mut conn, ".*".to_string(), false, true).expect("rm");

        let names: Vec<String> = get_all_companies(&mut conn)
            .expect("list")
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec![PLATFORM_COMPANY_NAME.to_string()]);
    }

    #[test]
    fn test_company_subscription_impl() {
        let mut conn = setup_test_db();
        let company = insert_company(&mut conn, "Acme".to_string(), None, SubscriptionPlan::Free)
            .expect("acme");

        let bad = SubscriptionChanges {
            max_users: Some(0),
            ..Default::default()
        };
        assert!(company_subscription_impl(&mut conn, company.id, bad).is_err());

        let changes = SubscriptionChanges {
            subscription_status: Some(SubscriptionStatus::Suspended),
            max_users: Some(3),
            ..Default::default()
        };
        company_subscription_impl(&mut conn, company.id, changes).expect("update");

        let company = get_company_by_id(&mut conn, company.id).expect("query").expect("company");
        assert_eq!(company.subscription_status, SubscriptionStatus::Suspended);
        assert_eq!(company.max_users, Some(3));
    }
}
